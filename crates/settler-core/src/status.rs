//! Plain-data views of a brain: the diagnostic status dump and the
//! checkpoint snapshot.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use settler_strategy::{BuildPlan, Negotiator, Tracker};
use settler_types::{GamePhase, NodeId, PieceKey, PlayerNumber, RequestKind};

use crate::config::BrainConfig;
use crate::error::BrainError;
use crate::expectation::{Expectation, MachineState, Pending};
use crate::history::{History, HistoryEntry};
use crate::mirror::GameMirror;

/// The second copy of a resent request, still owed an answer after the
/// first copy was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpareCopy {
    /// Kind of the resent request.
    pub kind: RequestKind,
    /// Pulse at which the first copy was settled.
    pub since: u64,
}

impl SpareCopy {
    /// Whether a denial of `kind` at `pulse` is this copy's answer.
    pub fn answers(&self, kind: RequestKind, pulse: u64, window: u64) -> bool {
        self.kind == kind && pulse.saturating_sub(self.since) <= window
    }
}

/// Per-turn counters and flags. Reset on every turn change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    /// Turn changes seen so far in this game.
    pub number: u64,
    /// Pulses since the turn began.
    pub pulses: u64,
    /// Requests denied this turn.
    pub denials: u32,
    /// Faults caught this turn.
    pub faults: u32,
    /// Pieces the engine refused this turn.
    pub denied: BTreeSet<PieceKey>,
    /// A development card was played (or refused) this turn.
    pub card_played: bool,
    /// Our dice are rolled.
    pub rolled: bool,
    /// `EndTurn` was sent.
    pub ended: bool,
    /// The bank refused a trade this turn.
    pub bank_denied: bool,
    /// Cards we still have to discard.
    pub discard_owed: u32,
    /// Who we may rob, once the engine says.
    pub rob_candidates: Option<BTreeSet<PlayerNumber>>,
    /// A phase already acted on and confirmed; cleared by the next phase
    /// change.
    pub stale_phase: Option<GamePhase>,
    /// A resent request whose spare copy may still be denied. Its denial
    /// is swallowed instead of blamed on the request pending now.
    pub spare_copy: Option<SpareCopy>,
}

/// Everything needed to diagnose a stuck brain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainStatus {
    /// Our seat.
    pub seat: PlayerNumber,
    /// Machine state.
    pub state: MachineState,
    /// Last engine phase seen.
    pub phase: GamePhase,
    /// Whose turn it is.
    pub current: Option<PlayerNumber>,
    /// What the pending request waits for.
    pub expectation: Option<Expectation>,
    /// Kind of the pending request.
    pub pending_request: Option<RequestKind>,
    /// Pulses seen in this game.
    pub pulse: u64,
    /// Pulses seen this turn.
    pub turn_pulses: u64,
    /// Denials this turn.
    pub denials: u32,
    /// Faults this turn.
    pub faults: u32,
    /// Denied opening placements so far.
    pub opening_denials: u32,
    /// Build plan steps, lead first.
    pub plan: Vec<PieceKey>,
    /// Whether one of our trade offers awaits answers.
    pub offer_outstanding: bool,
    /// Turns ended so far.
    pub turns_ended: u64,
    /// Recent events, requests, and faults, oldest first.
    pub history: Vec<HistoryEntry>,
}

impl Default for BrainStatus {
    fn default() -> Self {
        Self {
            seat: PlayerNumber(0),
            state: MachineState::Idle,
            phase: GamePhase::NewGame,
            current: None,
            expectation: None,
            pending_request: None,
            pulse: 0,
            turn_pulses: 0,
            denials: 0,
            faults: 0,
            opening_denials: 0,
            plan: Vec::new(),
            offer_outstanding: false,
            turns_ended: 0,
            history: Vec::new(),
        }
    }
}

/// A brain reduced to plain data.
///
/// Strategy components are code, not state, and are supplied again on
/// restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrainSnapshot {
    /// Our seat.
    pub me: PlayerNumber,
    /// Configuration.
    pub config: BrainConfig,
    /// Board and player facts.
    pub mirror: GameMirror,
    /// Per-player projections.
    pub tracker: Tracker,
    /// Trade beliefs and the outstanding offer.
    pub negotiator: Negotiator,
    /// Current build plan.
    pub plan: BuildPlan,
    /// Machine state.
    pub state: MachineState,
    /// The request awaiting confirmation.
    pub pending: Option<Pending>,
    /// Per-turn counters.
    pub turn: TurnState,
    /// Denied opening placements so far.
    pub opening_denials: u32,
    /// Our latest opening settlement, for its road.
    pub opening_settlement: Option<NodeId>,
    /// Pulses seen in this game.
    pub pulse: u64,
    /// Turns ended so far.
    pub turns_ended: u64,
    /// Recent history.
    pub history: History,
}

impl BrainSnapshot {
    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Snapshot`] if encoding fails.
    pub fn to_json(&self) -> Result<String, BrainError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Snapshot`] if the text is not a snapshot.
    pub fn from_json(json: &str) -> Result<Self, BrainError> {
        Ok(serde_json::from_str(json)?)
    }
}
