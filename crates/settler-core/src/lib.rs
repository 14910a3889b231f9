//! Turn orchestration for the Settler game agent.
//!
//! This crate owns the per-seat [`Brain`]: the state machine that turns
//! engine events into requests, the local mirror of the game it reasons
//! over, and the dedicated-thread runner that drives it for one game.
//!
//! # Modules
//!
//! - [`brain`] -- The [`Brain`] state machine and its [`Strategies`].
//! - [`config`] -- Configuration loading from `settler-config.yaml` into
//!   strongly-typed structs.
//! - [`error`] -- Error type for event handling ([`BrainError`]).
//! - [`expectation`] -- Machine states and the single pending expectation.
//! - [`history`] -- Bounded record of recent traffic for the status dump.
//! - [`mirror`] -- The [`GameMirror`] of board, hands, and cards.
//! - [`runner`] -- Dedicated thread, event queue, and [`KillSwitch`].
//! - [`status`] -- Status dump and snapshot data.

pub mod brain;
pub mod config;
pub mod error;
pub mod expectation;
pub mod history;
pub mod mirror;
pub mod runner;
pub mod status;

// Re-export primary types at crate root for convenience.
pub use brain::{Brain, Strategies};
pub use config::{BrainConfig, ConfigError};
pub use error::BrainError;
pub use expectation::{Expectation, MachineState, Pending};
pub use history::{Direction, History, HistoryEntry};
pub use mirror::{BoardChange, GameMirror, HandKnowledge, HeldCard, PlayerFacts};
pub use runner::{BrainHandle, KillSwitch, spawn};
pub use status::{BrainSnapshot, BrainStatus, SpareCopy, TurnState};
