//! Error types for the settler-core crate.

use settler_board::BoardError;
use settler_strategy::StrategyError;
use settler_types::{PlayerNumber, TypeError};

/// Errors raised while the brain processes one event.
///
/// None of these stop the brain. The event loop catches them, logs them,
/// and counts them as faults against the current turn.
#[derive(Debug, thiserror::Error)]
pub enum BrainError {
    /// The board mirror refused an engine-reported change.
    #[error("board mirror error: {0}")]
    Board(#[from] BoardError),

    /// A strategy component failed.
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),

    /// Hand arithmetic failed.
    #[error("resource error: {0}")]
    Types(#[from] TypeError),

    /// An event named a seat that is not at the table.
    #[error("unknown seat {0}")]
    UnknownSeat(PlayerNumber),

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot serialization failed: {source}")]
    Snapshot {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The dedicated thread or its runtime could not be started.
    #[error("failed to start brain thread: {source}")]
    Spawn {
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
