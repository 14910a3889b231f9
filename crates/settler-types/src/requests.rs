//! Outbound requests from the agent to the rule engine.
//!
//! Every request is answered by either its confirmation event or a
//! `RequestDenied` naming the request's [`RequestKind`].

use serde::{Deserialize, Serialize};

use crate::enums::{CardType, PieceType, RequestKind, Resource};
use crate::ids::{HexId, PlayerNumber};
use crate::resources::ResourceSet;
use crate::structs::{PieceKey, TradeOffer};

/// An action the agent asks the engine to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    /// Roll the dice.
    RollDice,
    /// Pay for a piece; the engine answers with a placing phase.
    BuildRequest {
        /// The piece to buy.
        piece: PieceType,
    },
    /// Buy a development card.
    BuyCard,
    /// Put a piece at a location.
    PutPiece {
        /// Piece type and location.
        piece: PieceKey,
    },
    /// Move the robber to a hex.
    MoveRobber {
        /// Destination hex.
        hex: HexId,
    },
    /// Play a development card.
    PlayCard {
        /// The card to play.
        card: CardType,
    },
    /// Offer a trade (replaces any earlier offer of ours).
    OfferTrade {
        /// The offer.
        offer: TradeOffer,
    },
    /// Accept the offer made by `offerer`.
    AcceptTrade {
        /// The offering player.
        offerer: PlayerNumber,
    },
    /// Reject offers addressed to us.
    RejectTrade,
    /// Withdraw our outstanding offer.
    ClearOffer,
    /// Trade with the bank or a port.
    BankTrade {
        /// What we give.
        give: ResourceSet,
        /// What we get.
        get: ResourceSet,
    },
    /// Rob this player.
    ChoosePlayer {
        /// The victim.
        target: PlayerNumber,
    },
    /// Pick free resources (discovery card).
    PickResources {
        /// The resources picked.
        resources: ResourceSet,
    },
    /// Name the monopolised resource.
    PickMonopoly {
        /// The resource.
        resource: Resource,
    },
    /// Discard these cards.
    Discard {
        /// Cards to discard.
        resources: ResourceSet,
    },
    /// End the turn.
    EndTurn,
    /// Leave the game.
    LeaveGame,
}

impl Request {
    /// The fieldless kind tag of this request.
    pub const fn kind(&self) -> RequestKind {
        match self {
            Self::RollDice => RequestKind::RollDice,
            Self::BuildRequest { .. } => RequestKind::BuildRequest,
            Self::BuyCard => RequestKind::BuyCard,
            Self::PutPiece { .. } => RequestKind::PutPiece,
            Self::MoveRobber { .. } => RequestKind::MoveRobber,
            Self::PlayCard { .. } => RequestKind::PlayCard,
            Self::OfferTrade { .. } => RequestKind::OfferTrade,
            Self::AcceptTrade { .. } => RequestKind::AcceptTrade,
            Self::RejectTrade => RequestKind::RejectTrade,
            Self::ClearOffer => RequestKind::ClearOffer,
            Self::BankTrade { .. } => RequestKind::BankTrade,
            Self::ChoosePlayer { .. } => RequestKind::ChoosePlayer,
            Self::PickResources { .. } => RequestKind::PickResources,
            Self::PickMonopoly { .. } => RequestKind::PickMonopoly,
            Self::Discard { .. } => RequestKind::Discard,
            Self::EndTurn => RequestKind::EndTurn,
            Self::LeaveGame => RequestKind::LeaveGame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(Request::EndTurn.kind(), RequestKind::EndTurn);
        assert_eq!(
            Request::BuildRequest {
                piece: PieceType::City
            }
            .kind(),
            RequestKind::BuildRequest
        );
        assert_eq!(
            Request::PutPiece {
                piece: PieceKey::DevCard
            }
            .kind(),
            RequestKind::PutPiece
        );
    }
}
