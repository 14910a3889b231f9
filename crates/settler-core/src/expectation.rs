//! Machine states and the single pending expectation.
//!
//! The brain is always in exactly one [`MachineState`] and has at most one
//! [`Pending`] request. Each outbound request that the engine confirms
//! carries the [`Expectation`] of what that confirmation looks like, so a
//! brain waiting for two contradictory answers cannot be represented.

use serde::{Deserialize, Serialize};
use settler_types::{
    CardEvent, CardType, GameEvent, GamePhase, PieceKey, PieceType, PlayerNumber, Request,
};

/// Where the brain is in the turn lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// Someone else's turn, or the game has not started.
    Idle,
    /// Placing opening settlements and roads.
    Opening,
    /// Our turn has started: roll, or play a card first.
    RollOrAct,
    /// We owe the engine a discard.
    Discard,
    /// We must move the robber.
    RelocateHazard,
    /// We must pick whom to rob.
    ChooseVictim,
    /// Plan, trade, build.
    MainPhase,
    /// A played card needs a resource choice.
    CardPick,
    /// We asked to end the turn.
    EndTurn,
    /// The game is over or we left it.
    Finished,
}

/// The confirmation we are waiting for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expectation {
    /// Our piece appearing on the board.
    Placement {
        /// The piece we put.
        piece: PieceKey,
    },
    /// The engine moving into the placing phase for a bought piece.
    PlacingPhase {
        /// The piece type we paid for.
        piece: PieceType,
    },
    /// Our dice result.
    Dice,
    /// A development card drawn by us.
    CardBought,
    /// Our card being played.
    CardPlayed {
        /// The card.
        card: CardType,
    },
    /// The robber moving.
    RobberMoved,
    /// The robbery finishing.
    VictimRobbed,
    /// Someone accepting our trade offer.
    TradeAnswer,
    /// The offer we accepted being executed.
    TradeDone {
        /// Who made the offer.
        offerer: PlayerNumber,
    },
    /// Our hand changing after a bank trade.
    BankTrade,
    /// The engine leaving the card-pick phase.
    PicksApplied,
    /// Our hand shrinking after a discard.
    Discarded,
    /// The turn passing on.
    TurnOver,
}

impl Expectation {
    /// Whether confirmation leaves the engine about to change phase, so
    /// the phase we acted in must not be acted on again.
    pub const fn precedes_phase_change(&self) -> bool {
        matches!(
            self,
            Self::Placement { .. } | Self::Dice | Self::RobberMoved | Self::CardPlayed { .. }
        )
    }

    /// Whether `event` is the confirmation this expectation waits for.
    pub fn is_met_by(&self, event: &GameEvent, me: PlayerNumber) -> bool {
        match (self, event) {
            (Self::Placement { piece }, GameEvent::PiecePlaced { piece: placed }) => {
                placed.owner == me && placed.key == *piece
            }
            (Self::PlacingPhase { piece }, GameEvent::StateChanged { phase }) => {
                placing_phase(*piece) == Some(*phase)
            }
            (Self::Dice, GameEvent::DiceResult { player, .. }) => *player == me,
            (
                Self::CardBought,
                GameEvent::CardAction {
                    player,
                    action: CardEvent::Drawn(_),
                },
            ) => *player == me,
            (
                Self::CardPlayed { card },
                GameEvent::CardAction {
                    player,
                    action: CardEvent::Played(played),
                },
            ) => *player == me && played == card,
            (Self::RobberMoved, GameEvent::RobberMoved { .. }) => true,
            (Self::VictimRobbed, GameEvent::StateChanged { phase }) => {
                *phase != GamePhase::WaitingForRobChoice
            }
            (Self::TradeAnswer, GameEvent::TradeAccepted { offerer, .. }) => *offerer == me,
            (Self::TradeDone { offerer }, GameEvent::TradeAccepted { offerer: o, accepter }) => {
                o == offerer && *accepter == me
            }
            (Self::BankTrade | Self::Discarded, GameEvent::ResourceDelta { player, .. }) => {
                *player == me
            }
            (Self::BankTrade | Self::Discarded, GameEvent::ResourceBatch { changes }) => {
                changes.iter().any(|(p, _)| *p == me)
            }
            (Self::PicksApplied, GameEvent::StateChanged { phase }) => !matches!(
                phase,
                GamePhase::WaitingForDiscovery | GamePhase::WaitingForMonopoly
            ),
            (Self::TurnOver, GameEvent::TurnChanged { .. }) => true,
            _ => false,
        }
    }
}

/// The engine phase that asks for a bought piece of this type.
pub const fn placing_phase(piece: PieceType) -> Option<GamePhase> {
    match piece {
        PieceType::Road => Some(GamePhase::PlacingRoad),
        PieceType::Settlement => Some(GamePhase::PlacingSettlement),
        PieceType::City => Some(GamePhase::PlacingCity),
        PieceType::Ship => Some(GamePhase::PlacingShip),
        PieceType::DevCard => None,
    }
}

/// The piece type a placing phase asks for.
pub const fn placed_in(phase: GamePhase) -> Option<PieceType> {
    match phase {
        GamePhase::PlacingRoad | GamePhase::PlacingFreeRoad { .. } => Some(PieceType::Road),
        GamePhase::PlacingSettlement => Some(PieceType::Settlement),
        GamePhase::PlacingCity => Some(PieceType::City),
        GamePhase::PlacingShip => Some(PieceType::Ship),
        _ => None,
    }
}

/// A request awaiting its confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pending {
    /// What confirms it.
    pub expectation: Expectation,
    /// The request as sent, kept for one resend on stall.
    pub request: Request,
    /// Engine phase when it was sent.
    pub phase: GamePhase,
    /// Pulse count when it was sent.
    pub sent_pulse: u64,
    /// Whether it was already sent a second time.
    pub resent: bool,
}

impl Pending {
    /// Pulses since the request went out.
    pub const fn waited(&self, pulse: u64) -> u64 {
        pulse.saturating_sub(self.sent_pulse)
    }
}

#[cfg(test)]
mod tests {
    use settler_types::{NodeId, Piece, ResourceChange, ResourceSet};

    use super::*;

    const ME: PlayerNumber = PlayerNumber(2);

    #[test]
    fn placement_needs_our_exact_piece() {
        let expect = Expectation::Placement {
            piece: PieceKey::Settlement(NodeId(4)),
        };
        let ours = GameEvent::PiecePlaced {
            piece: Piece {
                owner: ME,
                key: PieceKey::Settlement(NodeId(4)),
            },
        };
        let theirs = GameEvent::PiecePlaced {
            piece: Piece {
                owner: PlayerNumber(1),
                key: PieceKey::Settlement(NodeId(4)),
            },
        };
        assert!(expect.is_met_by(&ours, ME));
        assert!(!expect.is_met_by(&theirs, ME));
    }

    #[test]
    fn build_request_waits_for_matching_phase() {
        let expect = Expectation::PlacingPhase {
            piece: PieceType::City,
        };
        let city = GameEvent::StateChanged {
            phase: GamePhase::PlacingCity,
        };
        let road = GameEvent::StateChanged {
            phase: GamePhase::PlacingRoad,
        };
        assert!(expect.is_met_by(&city, ME));
        assert!(!expect.is_met_by(&road, ME));
    }

    #[test]
    fn discard_is_met_by_our_hand_change() {
        let event = GameEvent::ResourceBatch {
            changes: vec![
                (PlayerNumber(0), ResourceChange::LoseUnknown(4)),
                (ME, ResourceChange::Lose(ResourceSet::new())),
            ],
        };
        assert!(Expectation::Discarded.is_met_by(&event, ME));
        assert!(!Expectation::Dice.is_met_by(&event, ME));
    }

    #[test]
    fn phases_round_trip_through_piece_types() {
        for piece in [PieceType::Road, PieceType::Settlement, PieceType::City, PieceType::Ship] {
            let phase = placing_phase(piece).unwrap_or(GamePhase::Main);
            assert_eq!(placed_in(phase), Some(piece));
        }
        assert_eq!(placing_phase(PieceType::DevCard), None);
    }
}
