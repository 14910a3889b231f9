//! Decision logic for the Settler game agent.
//!
//! Everything here is pure computation over a board mirror and a few
//! per-player facts: no I/O, no clocks, no channels. The orchestrating
//! brain in `settler-core` owns one instance of each stateful component and
//! passes read-only context in.
//!
//! # Modules
//!
//! - [`cards`] -- When to play development cards and what to pick ([`CardStrategy`])
//! - [`config`] -- Tunable weights, cutoffs, and timeout windows ([`StrategyConfig`])
//! - [`discard`] -- Choosing cards to give up after a seven ([`DiscardStrategy`])
//! - [`error`] -- Error type for strategy operations ([`StrategyError`])
//! - [`estimator`] -- Resource speed estimation ([`Estimator`], [`RollOutcome`])
//! - [`negotiator`] -- Trade offers, responses, and willingness beliefs ([`Negotiator`])
//! - [`opening`] -- Opening settlement and road placement ([`OpeningStrategy`])
//! - [`planner`] -- One-ply and two-ply build planning ([`PlanningStrategy`], [`BuildPlan`])
//! - [`robber`] -- Robber relocation and victim choice ([`RobberStrategy`])
//! - [`tracker`] -- Per-player projections of reachable pieces ([`Tracker`])

pub mod cards;
pub mod config;
pub mod discard;
pub mod error;
pub mod estimator;
pub mod negotiator;
pub mod opening;
pub mod planner;
pub mod robber;
pub mod tracker;

// Re-export primary types at crate root for convenience.
pub use cards::{CardStrategy, DISCOVERY_PICKS, PlanDrivenCards};
pub use config::{PlannerKind, StrategyConfig};
pub use discard::{DiscardStrategy, KeepPlanDiscard};
pub use error::StrategyError;
pub use estimator::{
    Estimator, Gains, ResourceTable, RollOutcome, UNREACHABLE_ROLLS, recompute, rolls_for_ways,
    seeded_dice,
};
pub use negotiator::{
    BankOffer, Negotiator, OfferResponse, Outstanding, PulseOutcome, TradeContext,
};
pub use opening::{OpeningStrategy, ProductionOpening};
pub use planner::{BuildPlan, OnePly, PlanContext, PlanningStrategy, TwoPly};
pub use robber::{LeaderRobber, RobberStrategy};
pub use tracker::{PossiblePiece, Projection, Tracker};
