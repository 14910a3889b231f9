//! Board topology and the agent's local board mirror.
//!
//! # Modules
//!
//! - [`layout`] -- Hex layout, node/edge graph, ports, and seeded standard
//!   board generation.
//! - [`board`] -- [`Board`] mirror of placed pieces and the robber, with
//!   legality queries, production contacts, and port ratios.
//! - [`error`] -- [`BoardError`].

pub mod board;
pub mod error;
pub mod layout;

// Re-export primary types at crate root.
pub use board::{
    Board, Building, Contact, DEFAULT_TRADE_RATIO, GENERIC_PORT_RATIO, PortRatios, Route,
    SPECIFIC_PORT_RATIO, dice_ways,
};
pub use error::BoardError;
pub use layout::{EdgeInfo, HexSpec, HexTile, Layout, NodeInfo, Port};
