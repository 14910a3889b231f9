//! Error types for the `settler-board` crate.
//!
//! Legality queries return `bool`; these errors are raised only by
//! mutations of the board mirror and by layout construction.

use settler_types::{EdgeId, HexId, NodeId, PieceKey, PlayerNumber};

/// Errors that can occur while building or mutating a board.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// A layout must contain at least one hex.
    #[error("layout has no hexes")]
    EmptyLayout,

    /// Two hexes were given the same axial position.
    #[error("duplicate hex at ({q}, {r})")]
    DuplicateHex {
        /// Axial column.
        q: i32,
        /// Axial row.
        r: i32,
    },

    /// The layout has more hexes, nodes, or edges than identifiers allow.
    #[error("layout too large for identifier range")]
    LayoutTooLarge,

    /// A hex identifier is not on this board.
    #[error("unknown hex: {0}")]
    UnknownHex(HexId),

    /// A node identifier is not on this board.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// An edge identifier is not on this board.
    #[error("unknown edge: {0}")]
    UnknownEdge(EdgeId),

    /// Ports may only sit on coastal edges.
    #[error("edge {0} is not coastal")]
    NotCoastal(EdgeId),

    /// The location is already occupied.
    #[error("{key} is occupied")]
    Occupied {
        /// The attempted placement.
        key: PieceKey,
    },

    /// A city must replace a settlement owned by the same player.
    #[error("{owner} has no settlement at {node}")]
    NoSettlement {
        /// The would-be city owner.
        owner: PlayerNumber,
        /// The node.
        node: NodeId,
    },

    /// Development cards are not board pieces.
    #[error("{0} is not a board piece")]
    NotABoardPiece(PieceKey),

    /// The piece to remove is not on the board.
    #[error("{key} owned by {owner} is not on the board")]
    NotPlaced {
        /// The expected owner.
        owner: PlayerNumber,
        /// The piece.
        key: PieceKey,
    },
}
