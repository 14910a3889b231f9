//! Error types for the analysis binary.

use settler_board::BoardError;
use settler_core::{BrainError, ConfigError};

/// Errors that can occur while building a report.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// The configuration file could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The board could not be generated.
    #[error("board error: {0}")]
    Board(#[from] BoardError),

    /// The brain could not be started.
    #[error("brain error: {0}")]
    Brain(#[from] BrainError),

    /// `BOARD_SEED` is not an unsigned integer.
    #[error("invalid BOARD_SEED {value:?}")]
    Seed {
        /// The raw environment value.
        value: String,
    },

    /// The brain thread could not be joined.
    #[error("failed to join brain thread: {reason}")]
    Join {
        /// Why the join task failed.
        reason: String,
    },

    /// The brain loop exited before an event could be queued.
    #[error("brain loop stopped before {event}")]
    Stopped {
        /// Label of the event that was dropped.
        event: &'static str,
    },

    /// The brain stopped before answering.
    #[error("brain sent no {expected} within {waited_ms} ms")]
    NoAnswer {
        /// What we waited for.
        expected: &'static str,
        /// How long we waited.
        waited_ms: u64,
    },
}
