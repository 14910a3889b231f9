//! Opening placement: where the two free settlements and roads go.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use settler_board::{Board, Port, dice_ways};
use settler_types::{EdgeId, NodeId, PieceKey, PlayerNumber, Resource};

/// Points per way-out-of-36 of production.
const PRODUCTION_WEIGHT: u32 = 10;
/// Bonus per resource kind we do not produce yet.
const DIVERSITY_BONUS: u32 = 8;
/// Bonus for a 3:1 port.
const GENERIC_PORT_BONUS: u32 = 3;
/// Bonus for a 2:1 port in a resource we will produce.
const SPECIFIC_PORT_BONUS: u32 = 6;

/// Chooses opening settlement and road spots.
pub trait OpeningStrategy {
    /// Where to put an opening settlement, or `None` if nothing is legal.
    /// Spots in `denied` were refused by the engine and are skipped.
    fn choose_settlement(
        &self,
        board: &Board,
        me: PlayerNumber,
        denied: &BTreeSet<PieceKey>,
    ) -> Option<NodeId>;

    /// Which edge next to our new `settlement` gets the opening road.
    fn choose_road(
        &self,
        board: &Board,
        me: PlayerNumber,
        settlement: NodeId,
        denied: &BTreeSet<PieceKey>,
    ) -> Option<EdgeId>;
}

/// Maximises production and resource diversity, with a small port bonus.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductionOpening;

impl ProductionOpening {
    /// How attractive a settlement on `node` is for `me`.
    pub fn node_score(board: &Board, me: PlayerNumber, node: NodeId) -> u32 {
        let owned: BTreeSet<Resource> = board.contacts(me).iter().map(|c| c.resource).collect();
        let contacts = board.node_contacts(node);

        let production = contacts.iter().fold(0_u32, |acc, c| {
            acc.saturating_add(dice_ways(c.number).saturating_mul(PRODUCTION_WEIGHT))
        });
        let fresh: BTreeSet<Resource> = contacts
            .iter()
            .map(|c| c.resource)
            .filter(|r| !owned.contains(r))
            .collect();
        let diversity = u32::try_from(fresh.len())
            .unwrap_or(0)
            .saturating_mul(DIVERSITY_BONUS);

        let port = match board.layout().node(node).and_then(|info| info.port) {
            Some(Port::Generic) => GENERIC_PORT_BONUS,
            Some(Port::Specific(r)) if owned.contains(&r) || fresh.contains(&r) => SPECIFIC_PORT_BONUS,
            Some(Port::Specific(_)) | None => 0,
        };

        production.saturating_add(diversity).saturating_add(port)
    }
}

impl OpeningStrategy for ProductionOpening {
    fn choose_settlement(
        &self,
        board: &Board,
        me: PlayerNumber,
        denied: &BTreeSet<PieceKey>,
    ) -> Option<NodeId> {
        board
            .layout()
            .node_ids()
            .filter(|n| !denied.contains(&PieceKey::Settlement(*n)))
            .filter(|n| board.can_place_settlement(me, *n, true))
            .max_by_key(|n| (Self::node_score(board, me, *n), Reverse(*n)))
    }

    fn choose_road(
        &self,
        board: &Board,
        me: PlayerNumber,
        settlement: NodeId,
        denied: &BTreeSet<PieceKey>,
    ) -> Option<EdgeId> {
        let layout = board.layout();
        let info = layout.node(settlement)?;
        info.edges
            .iter()
            .copied()
            .filter(|e| !denied.contains(&PieceKey::Road(*e)))
            .filter(|e| board.can_place_opening_road(me, *e, settlement))
            .max_by_key(|e| {
                let beyond = layout
                    .edge(*e)
                    .and_then(|edge| edge.other_end(settlement))
                    .and_then(|end| layout.node(end))
                    .map_or(0, |end| {
                        end.neighbours
                            .iter()
                            .filter(|n| board.node_free_for_settlement(**n))
                            .map(|n| Self::node_score(board, me, *n))
                            .max()
                            .unwrap_or(0)
                    });
                (beyond, Reverse(*e))
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use settler_board::Layout;
    use settler_types::Piece;

    use super::*;

    const ME: PlayerNumber = PlayerNumber(0);

    fn none() -> BTreeSet<PieceKey> {
        BTreeSet::new()
    }

    #[test]
    fn opening_picks_a_legal_productive_spot() {
        let board = Board::new(Layout::standard(21).unwrap());
        let node = ProductionOpening.choose_settlement(&board, ME, &none()).unwrap();
        assert!(board.can_place_settlement(ME, node, true));
        let best = board
            .layout()
            .node_ids()
            .map(|n| ProductionOpening::node_score(&board, ME, n))
            .max()
            .unwrap();
        assert_eq!(ProductionOpening::node_score(&board, ME, node), best);
    }

    #[test]
    fn second_settlement_respects_distance_rule() {
        let mut board = Board::new(Layout::standard(21).unwrap());
        let first = ProductionOpening.choose_settlement(&board, ME, &none()).unwrap();
        board.place(Piece { owner: ME, key: PieceKey::Settlement(first) }).unwrap();
        let second = ProductionOpening.choose_settlement(&board, ME, &none()).unwrap();
        assert_ne!(first, second);
        assert!(!board.layout().node(first).unwrap().neighbours.contains(&second));
    }

    #[test]
    fn opening_road_touches_the_settlement() {
        let mut board = Board::new(Layout::standard(21).unwrap());
        let node = ProductionOpening.choose_settlement(&board, ME, &none()).unwrap();
        board.place(Piece { owner: ME, key: PieceKey::Settlement(node) }).unwrap();
        let edge = ProductionOpening.choose_road(&board, ME, node, &none()).unwrap();
        assert!(board.layout().node(node).unwrap().edges.contains(&edge));
    }

    #[test]
    fn denied_spots_are_skipped() {
        let board = Board::new(Layout::standard(21).unwrap());
        let first = ProductionOpening.choose_settlement(&board, ME, &none()).unwrap();
        let denied = BTreeSet::from([PieceKey::Settlement(first)]);
        let second = ProductionOpening.choose_settlement(&board, ME, &denied).unwrap();
        assert_ne!(first, second);
    }
}
