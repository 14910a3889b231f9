//! Error types for the `settler-strategy` crate.
//!
//! Cutoffs and empty plans are ordinary values, not errors. These variants
//! cover only inconsistencies between a projection and the board mirror.

use settler_board::BoardError;
use settler_types::{PlayerNumber, TypeError};

/// Errors raised by projections and planning.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// A board mirror mutation failed.
    #[error("board error: {0}")]
    Board(#[from] BoardError),

    /// Resource arithmetic failed.
    #[error("resource error: {0}")]
    Types(#[from] TypeError),

    /// No projection exists for the player.
    #[error("no projection for {0}")]
    UnknownPlayer(PlayerNumber),
}
