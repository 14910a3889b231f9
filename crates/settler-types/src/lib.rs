//! Shared type definitions for the Settler game agent.
//!
//! This crate is the single source of truth for the vocabulary spoken
//! between the rule engine and the agent: identifiers, resources, pieces,
//! the inbound event stream, and the outbound request set.
//!
//! # Modules
//!
//! - [`ids`] -- UUID and index newtypes for games, offers, seats, and board coordinates
//! - [`enums`] -- Resources, pieces, cards, seat kinds, and engine phases
//! - [`resources`] -- [`ResourceSet`] multisets and piece costs
//! - [`structs`] -- Piece keys, placed pieces, trade offers, hand changes
//! - [`events`] -- Inbound [`GameEvent`] stream
//! - [`requests`] -- Outbound [`Request`] set
//! - [`error`] -- [`TypeError`]

pub mod enums;
pub mod error;
pub mod events;
pub mod ids;
pub mod requests;
pub mod resources;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{CardType, GamePhase, PieceType, RequestKind, Resource, SeatKind, SpecialItem};
pub use error::TypeError;
pub use events::GameEvent;
pub use ids::{EdgeId, GameId, HexId, NodeId, OfferId, PlayerNumber};
pub use requests::Request;
pub use resources::{ResourceSet, cost_of};
pub use structs::{CardEvent, Piece, PieceKey, ResourceChange, TradeOffer};
