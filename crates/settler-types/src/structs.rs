//! Core structs exchanged between the engine and the agent.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{CardType, PieceType};
use crate::ids::{EdgeId, NodeId, OfferId, PlayerNumber};
use crate::resources::{ResourceSet, cost_of};

/// Where a piece goes (or, for cards, that it is a purchase).
///
/// This is the identity of a Possible Piece: two candidates with the same
/// key are the same candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PieceKey {
    /// A road on an edge.
    Road(EdgeId),
    /// A ship on an edge.
    Ship(EdgeId),
    /// A settlement on a node.
    Settlement(NodeId),
    /// A city on a node.
    City(NodeId),
    /// A development card purchase.
    DevCard,
}

impl PieceKey {
    /// The kind of piece this key places.
    pub const fn piece_type(self) -> PieceType {
        match self {
            Self::Road(_) => PieceType::Road,
            Self::Ship(_) => PieceType::Ship,
            Self::Settlement(_) => PieceType::Settlement,
            Self::City(_) => PieceType::City,
            Self::DevCard => PieceType::DevCard,
        }
    }

    /// The node this key occupies, if any.
    pub const fn node(self) -> Option<NodeId> {
        match self {
            Self::Settlement(node) | Self::City(node) => Some(node),
            Self::Road(_) | Self::Ship(_) | Self::DevCard => None,
        }
    }

    /// The edge this key occupies, if any.
    pub const fn edge(self) -> Option<EdgeId> {
        match self {
            Self::Road(edge) | Self::Ship(edge) => Some(edge),
            Self::Settlement(_) | Self::City(_) | Self::DevCard => None,
        }
    }

    /// The resource cost of this piece.
    pub fn cost(self) -> ResourceSet {
        cost_of(self.piece_type())
    }
}

impl core::fmt::Display for PieceKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Road(edge) => write!(f, "road@{edge}"),
            Self::Ship(edge) => write!(f, "ship@{edge}"),
            Self::Settlement(node) => write!(f, "settlement@{node}"),
            Self::City(node) => write!(f, "city@{node}"),
            Self::DevCard => write!(f, "dev-card"),
        }
    }
}

/// A piece owned by a player on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Piece {
    /// The owning player.
    pub owner: PlayerNumber,
    /// Where it stands.
    pub key: PieceKey,
}

/// A proposed resource exchange.
///
/// `give` is what the offering player hands over, `get` is what they want in
/// return. `to` is the offered-to set; the engine only lets those seats
/// accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeOffer {
    /// Unique identifier.
    pub id: OfferId,
    /// The offering player.
    pub from: PlayerNumber,
    /// Seats the offer is addressed to.
    pub to: BTreeSet<PlayerNumber>,
    /// Resources the offering player gives.
    pub give: ResourceSet,
    /// Resources the offering player wants.
    pub get: ResourceSet,
    /// Wall-clock creation time, for history and logs.
    pub created_at: DateTime<Utc>,
    /// Pulse count at creation; timeouts are measured from here.
    pub created_pulse: u64,
}

impl TradeOffer {
    /// Create an offer stamped with the current time.
    pub fn new(
        from: PlayerNumber,
        to: BTreeSet<PlayerNumber>,
        give: ResourceSet,
        get: ResourceSet,
        created_pulse: u64,
    ) -> Self {
        Self {
            id: OfferId::new(),
            from,
            to,
            give,
            get,
            created_at: Utc::now(),
            created_pulse,
        }
    }

    /// Whether `player` is one of the recipients.
    pub fn is_offered_to(&self, player: PlayerNumber) -> bool {
        self.to.contains(&player)
    }

    /// Whether two offers exchange the same resources with the same seats.
    pub fn same_terms(&self, other: &Self) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.give == other.give
            && self.get == other.get
    }
}

/// A change to one player's hand, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceChange {
    /// Known cards gained.
    Gain(ResourceSet),
    /// Known cards lost.
    Lose(ResourceSet),
    /// Cards gained that this observer cannot see.
    GainUnknown(u32),
    /// Cards lost that this observer cannot see.
    LoseUnknown(u32),
    /// The full hand, replacing whatever was known.
    Set(ResourceSet),
}

/// A development-card event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardEvent {
    /// A card was bought; the kind is only visible to its owner.
    Drawn(Option<CardType>),
    /// A card was played.
    Played(CardType),
    /// A card play was refused by the engine.
    Rejected(CardType),
}
