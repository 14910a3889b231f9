//! Robber relocation and victim choice.

use std::collections::{BTreeMap, BTreeSet};

use settler_board::{Board, dice_ways};
use settler_types::{HexId, PlayerNumber};

/// Chooses where the robber goes and whom it robs.
pub trait RobberStrategy {
    /// The hex to move the robber to.
    fn choose_hex(
        &self,
        board: &Board,
        me: PlayerNumber,
        scores: &BTreeMap<PlayerNumber, u32>,
    ) -> Option<HexId>;

    /// The player to rob among `candidates`.
    fn choose_victim(
        &self,
        me: PlayerNumber,
        candidates: &BTreeSet<PlayerNumber>,
        scores: &BTreeMap<PlayerNumber, u32>,
        hand_sizes: &BTreeMap<PlayerNumber, u32>,
    ) -> Option<PlayerNumber>;
}

/// Blocks the best-producing hex of the leaders and robs the leader.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeaderRobber;

impl RobberStrategy for LeaderRobber {
    fn choose_hex(
        &self,
        board: &Board,
        me: PlayerNumber,
        scores: &BTreeMap<PlayerNumber, u32>,
    ) -> Option<HexId> {
        let current = board.robber();
        board
            .layout()
            .hexes()
            .filter(|h| Some(h.id) != current)
            .filter(|h| !board.players_touching(h.id).contains(&me))
            .map(|h| {
                let ways = h.number.map_or(0, dice_ways);
                let pressure = board
                    .players_touching(h.id)
                    .iter()
                    .map(|p| scores.get(p).copied().unwrap_or(0).saturating_add(1))
                    .fold(0_u32, u32::saturating_add);
                (pressure.saturating_mul(ways), h.id)
            })
            .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
            .map(|(_, hex)| hex)
            .or_else(|| {
                // Every other hex touches us: pick any hex but the current one.
                board
                    .layout()
                    .hexes()
                    .map(|h| h.id)
                    .find(|id| Some(*id) != current)
            })
    }

    fn choose_victim(
        &self,
        me: PlayerNumber,
        candidates: &BTreeSet<PlayerNumber>,
        scores: &BTreeMap<PlayerNumber, u32>,
        hand_sizes: &BTreeMap<PlayerNumber, u32>,
    ) -> Option<PlayerNumber> {
        candidates
            .iter()
            .copied()
            .filter(|p| *p != me)
            .max_by_key(|p| {
                (
                    scores.get(p).copied().unwrap_or(0),
                    hand_sizes.get(p).copied().unwrap_or(0),
                    std::cmp::Reverse(*p),
                )
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use settler_board::Layout;
    use settler_types::{Piece, PieceKey};

    use super::*;

    const ME: PlayerNumber = PlayerNumber(0);
    const RIVAL: PlayerNumber = PlayerNumber(1);

    #[test]
    fn robber_targets_rival_not_us() {
        let mut board = Board::new(Layout::standard(4).unwrap());
        let node = board
            .layout()
            .node_ids()
            .find(|n| {
                board
                    .node_contacts(*n)
                    .iter()
                    .any(|c| dice_ways(c.number) >= 4)
            })
            .unwrap();
        board.place(Piece { owner: RIVAL, key: PieceKey::Settlement(node) }).unwrap();
        let scores = BTreeMap::from([(RIVAL, 5), (ME, 2)]);
        let hex = LeaderRobber.choose_hex(&board, ME, &scores).unwrap();
        assert!(board.players_touching(hex).contains(&RIVAL));
        assert_ne!(Some(hex), board.robber());
    }

    #[test]
    fn victim_is_the_leader() {
        let candidates = BTreeSet::from([PlayerNumber(1), PlayerNumber(2), ME]);
        let scores = BTreeMap::from([(PlayerNumber(1), 3), (PlayerNumber(2), 6), (ME, 9)]);
        let hands = BTreeMap::new();
        assert_eq!(
            LeaderRobber.choose_victim(ME, &candidates, &scores, &hands),
            Some(PlayerNumber(2))
        );
        assert_eq!(
            LeaderRobber.choose_victim(ME, &BTreeSet::new(), &scores, &hands),
            None
        );
    }
}
