//! Opening analysis of a seeded board.
//!
//! For every legal opening spot the report gives the opening score, the
//! hexes it would produce from, its port, and how many rolls a lone
//! settlement there needs per resource and per piece.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use serde::Serialize;
use settler_board::{Board, HexTile, Port, PortRatios};
use settler_strategy::{Estimator, ProductionOpening, StrategyConfig};
use settler_types::{HexId, NodeId, PieceType, PlayerNumber, Resource};

/// Seat the analysis pretends to play.
const ANALYST: PlayerNumber = PlayerNumber(0);

/// Pieces whose time-to-afford is reported.
const REPORTED_PIECES: [PieceType; 4] = [
    PieceType::Road,
    PieceType::Settlement,
    PieceType::City,
    PieceType::DevCard,
];

/// One hex a spot would produce from.
#[derive(Debug, Clone, Serialize)]
pub struct Production {
    /// The hex.
    pub hex: HexId,
    /// What it yields.
    pub resource: Resource,
    /// Its number token.
    pub number: u8,
}

/// Analysis of one opening spot.
#[derive(Debug, Clone, Serialize)]
pub struct SpotReport {
    /// The node.
    pub node: NodeId,
    /// Opening score (production, diversity, port).
    pub score: u32,
    /// Producing hexes.
    pub production: Vec<Production>,
    /// Port at the node.
    pub port: Option<Port>,
    /// Rolls per unit of each resource from this spot alone.
    pub rolls_per_resource: BTreeMap<Resource, u32>,
    /// Rolls to afford each piece from an empty hand.
    pub rolls_to_afford: BTreeMap<PieceType, u32>,
}

/// Whole-board analysis.
#[derive(Debug, Clone, Serialize)]
pub struct BoardReport {
    /// Seed the board was generated from.
    pub seed: u64,
    /// Where the robber starts.
    pub robber: Option<HexId>,
    /// Every land hex.
    pub hexes: Vec<HexTile>,
    /// The best opening spots, best first.
    pub spots: Vec<SpotReport>,
}

/// Analyse `board` and keep the `top` best opening spots.
pub fn analyze(board: &Board, seed: u64, config: &StrategyConfig, top: usize) -> BoardReport {
    let mut scored: Vec<(u32, NodeId)> = board
        .layout()
        .node_ids()
        .filter(|n| board.can_place_settlement(ANALYST, *n, true))
        .map(|n| (ProductionOpening::node_score(board, ANALYST, n), n))
        .collect();
    scored.sort_by_key(|(score, node)| (Reverse(*score), *node));

    let spots = scored
        .into_iter()
        .take(top)
        .map(|(score, node)| spot(board, node, score, config))
        .collect();

    BoardReport {
        seed,
        robber: board.robber(),
        hexes: board.layout().hexes().cloned().collect(),
        spots,
    }
}

fn spot(board: &Board, node: NodeId, score: u32, config: &StrategyConfig) -> SpotReport {
    let contacts = board.node_contacts(node);
    let port = board.layout().node(node).and_then(|info| info.port);
    let mut ports = PortRatios::bank();
    if let Some(port) = port {
        ports.apply(port);
    }

    let mut estimator = Estimator::new(&contacts, board.robber());
    let rolls_per_resource = Resource::ALL
        .into_iter()
        .map(|r| (r, estimator.table().rolls_per_resource(r)))
        .collect();
    let rolls_to_afford = REPORTED_PIECES
        .into_iter()
        .map(|piece| {
            (
                piece,
                estimator.from_nothing(piece, config.eta_cutoff, &ports),
            )
        })
        .collect();

    SpotReport {
        node,
        score,
        production: contacts
            .iter()
            .map(|c| Production {
                hex: c.hex,
                resource: c.resource,
                number: c.number,
            })
            .collect(),
        port,
        rolls_per_resource,
        rolls_to_afford,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use settler_board::Layout;

    use super::*;

    #[test]
    fn spots_are_sorted_best_first() {
        let board = Board::new(Layout::standard(42).unwrap());
        let report = analyze(&board, 42, &StrategyConfig::default(), 5);
        assert_eq!(report.spots.len(), 5);
        assert!(report.spots.windows(2).all(|w| match w {
            [a, b] => a.score >= b.score,
            _ => true,
        }));
        assert_eq!(report.hexes.len(), 19);
    }

    #[test]
    fn productive_spot_reaches_every_piece_within_cutoff() {
        let board = Board::new(Layout::standard(42).unwrap());
        let config = StrategyConfig::default();
        let report = analyze(&board, 42, &config, 1);
        let best = report.spots.first().unwrap();
        assert!(!best.production.is_empty());
        assert!(
            best.rolls_to_afford
                .values()
                .all(|rolls| *rolls <= config.eta_cutoff)
        );
    }
}
