//! Inbound events from the rule engine.
//!
//! The engine delivers these on a single ordered queue per agent. Order is
//! significant: the brain detects interleaved turn changes by position in
//! the stream, so events are never reordered or batched.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::enums::{GamePhase, RequestKind, SeatKind, SpecialItem};
use crate::ids::{GameId, HexId, PlayerNumber};
use crate::structs::{CardEvent, Piece, ResourceChange, TradeOffer};

/// A fact reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameEvent {
    /// Seats are filled and the game begins.
    GameStarted {
        /// The game.
        game: GameId,
        /// Every occupied seat and who controls it.
        seats: BTreeMap<PlayerNumber, SeatKind>,
    },
    /// A new turn (or opening placement) belongs to `player`.
    TurnChanged {
        /// Whose turn it now is.
        player: PlayerNumber,
    },
    /// The engine moved to a new phase.
    StateChanged {
        /// The new phase.
        phase: GamePhase,
    },
    /// A piece was put on the board (or a card bought).
    PiecePlaced {
        /// The placed piece.
        piece: Piece,
    },
    /// The robber moved.
    RobberMoved {
        /// Its new hex.
        hex: HexId,
    },
    /// One player's hand changed.
    ResourceDelta {
        /// Whose hand.
        player: PlayerNumber,
        /// What changed.
        change: ResourceChange,
    },
    /// Several hands changed at once (dice production, trades).
    ResourceBatch {
        /// Changes in engine order.
        changes: Vec<(PlayerNumber, ResourceChange)>,
    },
    /// The dice were rolled.
    DiceResult {
        /// Who rolled.
        player: PlayerNumber,
        /// Sum of both dice.
        sum: u8,
    },
    /// A player made a trade offer.
    TradeOfferAnnounced {
        /// The offer.
        offer: TradeOffer,
    },
    /// A player accepted an offer and the trade was executed.
    TradeAccepted {
        /// Who made the offer.
        offerer: PlayerNumber,
        /// Who accepted it.
        accepter: PlayerNumber,
    },
    /// A player rejected the offers addressed to them.
    TradeRejected {
        /// Who rejected.
        player: PlayerNumber,
    },
    /// A player withdrew their offer.
    TradeCleared {
        /// Whose offer was withdrawn.
        player: PlayerNumber,
    },
    /// The engine refused one of our requests.
    RequestDenied {
        /// Which kind of request.
        request: RequestKind,
        /// Engine-supplied explanation.
        reason: String,
    },
    /// A development card was bought, played, or refused.
    CardAction {
        /// The acting player.
        player: PlayerNumber,
        /// What happened.
        action: CardEvent,
    },
    /// Longest road or largest army changed hands.
    SpecialItem {
        /// The affected player.
        player: PlayerNumber,
        /// Which award.
        item: SpecialItem,
        /// Whether the player now holds it.
        held: bool,
    },
    /// We must discard this many cards.
    DiscardRequired {
        /// Cards to discard.
        count: u32,
    },
    /// We moved the robber and must pick a victim among these.
    RobChoice {
        /// Players adjacent to the robber with cards.
        candidates: BTreeSet<PlayerNumber>,
    },
    /// A player's public victory points.
    VictoryPoints {
        /// The player.
        player: PlayerNumber,
        /// Their public score.
        points: u32,
    },
    /// Periodic timing pulse, the agent's only clock.
    Pulse,
    /// The game is over.
    GameOver {
        /// The winner, if any.
        winner: Option<PlayerNumber>,
    },
}

impl GameEvent {
    /// Short label for the event history and logs.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::GameStarted { .. } => "game_started",
            Self::TurnChanged { .. } => "turn_changed",
            Self::StateChanged { .. } => "state_changed",
            Self::PiecePlaced { .. } => "piece_placed",
            Self::RobberMoved { .. } => "robber_moved",
            Self::ResourceDelta { .. } => "resource_delta",
            Self::ResourceBatch { .. } => "resource_batch",
            Self::DiceResult { .. } => "dice_result",
            Self::TradeOfferAnnounced { .. } => "trade_offer",
            Self::TradeAccepted { .. } => "trade_accepted",
            Self::TradeRejected { .. } => "trade_rejected",
            Self::TradeCleared { .. } => "trade_cleared",
            Self::RequestDenied { .. } => "request_denied",
            Self::CardAction { .. } => "card_action",
            Self::SpecialItem { .. } => "special_item",
            Self::DiscardRequired { .. } => "discard_required",
            Self::RobChoice { .. } => "rob_choice",
            Self::VictoryPoints { .. } => "victory_points",
            Self::Pulse => "pulse",
            Self::GameOver { .. } => "game_over",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::enums::GamePhase;

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = GameEvent::StateChanged {
            phase: GamePhase::Main,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "state_changed");
        assert_eq!(event.label(), "state_changed");
    }

    #[test]
    fn pulse_has_no_payload() {
        let json = serde_json::to_string(&GameEvent::Pulse).unwrap();
        assert_eq!(json, r#"{"kind":"pulse"}"#);
    }
}
