//! Enumeration types shared by the board, strategy, and brain crates.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A resource kind produced by land hexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Produced by hills.
    Clay,
    /// Produced by mountains.
    Ore,
    /// Produced by pasture.
    Sheep,
    /// Produced by fields.
    Wheat,
    /// Produced by forest.
    Wood,
}

impl Resource {
    /// Every resource kind, in canonical order.
    pub const ALL: [Self; 5] = [Self::Clay, Self::Ore, Self::Sheep, Self::Wheat, Self::Wood];

    /// Lower-case name used in logs and analysis output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clay => "clay",
            Self::Ore => "ore",
            Self::Sheep => "sheep",
            Self::Wheat => "wheat",
            Self::Wood => "wood",
        }
    }
}

// ---------------------------------------------------------------------------
// Pieces and cards
// ---------------------------------------------------------------------------

/// Something a player can spend resources on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PieceType {
    /// A road on an edge.
    Road,
    /// A settlement on a node (1 victory point).
    Settlement,
    /// A city upgrading an owned settlement (2 victory points).
    City,
    /// A ship on a coastal edge (sea-board games only).
    Ship,
    /// A development card purchase.
    DevCard,
}

impl PieceType {
    /// Every purchasable kind.
    pub const ALL: [Self; 5] = [
        Self::Road,
        Self::Settlement,
        Self::City,
        Self::Ship,
        Self::DevCard,
    ];

    /// Number of this piece each player starts with, `None` for cards
    /// (limited by the deck, not the player's supply).
    pub const fn supply(self) -> Option<u32> {
        match self {
            Self::Road | Self::Ship => Some(15),
            Self::Settlement => Some(5),
            Self::City => Some(4),
            Self::DevCard => None,
        }
    }

    /// Victory points gained directly by building this piece.
    pub const fn victory_points(self) -> u32 {
        match self {
            Self::Settlement | Self::City => 1,
            Self::Road | Self::Ship | Self::DevCard => 0,
        }
    }
}

/// A development card kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CardType {
    /// Move the robber and steal one card.
    Knight,
    /// Place two roads for free.
    RoadBuilding,
    /// Take any two resources from the bank (year of plenty).
    Discovery,
    /// Take every card of one resource from all opponents.
    Monopoly,
    /// One hidden victory point.
    VictoryPoint,
}

impl CardType {
    /// Whether playing this card is an action (victory points are never played).
    pub const fn is_playable(self) -> bool {
        !matches!(self, Self::VictoryPoint)
    }
}

// ---------------------------------------------------------------------------
// Seats and game phases
// ---------------------------------------------------------------------------

/// Who controls a seat. Drives the trade-response timeout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeatKind {
    /// A person at a client.
    Human,
    /// An automated agent.
    Robot,
}

/// The engine's view of where the game currently is.
///
/// The engine reports this through `StateChanged`; the brain derives its own
/// machine state from it together with whose turn it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Seats are being filled.
    NewGame,
    /// Opening round: the current player places a free settlement.
    OpeningSettlement {
        /// Opening round, starting at 1.
        round: u8,
    },
    /// Opening round: the current player places a road next to it.
    OpeningRoad {
        /// Opening round, starting at 1.
        round: u8,
    },
    /// Start of a turn: roll the dice or play a card first.
    RollOrCard,
    /// After the roll: build, trade, play cards, or end the turn.
    Main,
    /// A bought road must be placed.
    PlacingRoad,
    /// A bought settlement must be placed.
    PlacingSettlement,
    /// A bought city must be placed.
    PlacingCity,
    /// A bought ship must be placed.
    PlacingShip,
    /// A free road from a road-building card must be placed.
    PlacingFreeRoad {
        /// Free roads still to place (2 or 1).
        remaining: u8,
    },
    /// The robber must be moved.
    PlacingRobber,
    /// The player who moved the robber chooses whom to rob.
    WaitingForRobChoice,
    /// Players holding too many cards discard.
    WaitingForDiscards,
    /// Discovery card: pick two resources.
    WaitingForDiscovery,
    /// Monopoly card: name a resource.
    WaitingForMonopoly,
    /// The game has ended.
    Over,
}

impl GamePhase {
    /// Whether this is one of the opening-placement phases.
    pub const fn is_opening(self) -> bool {
        matches!(
            self,
            Self::OpeningSettlement { .. } | Self::OpeningRoad { .. }
        )
    }
}

/// Awards that move between players during the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpecialItem {
    /// Longest continuous road (2 victory points).
    LongestRoad,
    /// Most knights played (2 victory points).
    LargestArmy,
}

/// A fieldless tag for every outbound request kind.
///
/// Denial events name the kind of request they refuse, which is how the
/// brain matches a denial to its pending expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    /// Roll the dice.
    RollDice,
    /// Buy a piece (moves the engine into a placing phase).
    BuildRequest,
    /// Buy a development card.
    BuyCard,
    /// Put a piece on the board.
    PutPiece,
    /// Move the robber.
    MoveRobber,
    /// Play a development card.
    PlayCard,
    /// Offer a trade to other players.
    OfferTrade,
    /// Accept another player's offer.
    AcceptTrade,
    /// Reject another player's offer.
    RejectTrade,
    /// Withdraw our own offer.
    ClearOffer,
    /// Trade with the bank or a port.
    BankTrade,
    /// Choose a player to rob.
    ChoosePlayer,
    /// Pick resources (discovery card).
    PickResources,
    /// Name a resource (monopoly card).
    PickMonopoly,
    /// Discard down to the hand limit.
    Discard,
    /// End the turn.
    EndTurn,
    /// Leave the game.
    LeaveGame,
}

impl RequestKind {
    /// Short label for the event history and logs.
    pub const fn label(self) -> &'static str {
        match self {
            Self::RollDice => "roll_dice",
            Self::BuildRequest => "build_request",
            Self::BuyCard => "buy_card",
            Self::PutPiece => "put_piece",
            Self::MoveRobber => "move_robber",
            Self::PlayCard => "play_card",
            Self::OfferTrade => "offer_trade",
            Self::AcceptTrade => "accept_trade",
            Self::RejectTrade => "reject_trade",
            Self::ClearOffer => "clear_offer",
            Self::BankTrade => "bank_trade",
            Self::ChoosePlayer => "choose_player",
            Self::PickResources => "pick_resources",
            Self::PickMonopoly => "pick_monopoly",
            Self::Discard => "discard",
            Self::EndTurn => "end_turn",
            Self::LeaveGame => "leave_game",
        }
    }
}
