//! Development card decisions: when to play a card and what to pick with it.

use std::collections::BTreeMap;

use settler_board::Board;
use settler_types::{PieceType, PlayerNumber, Resource, ResourceSet};

use crate::estimator::ResourceTable;
use crate::planner::BuildPlan;

/// Units granted by a discovery card.
pub const DISCOVERY_PICKS: u32 = 2;

/// Chooses when and how to play development cards.
pub trait CardStrategy {
    /// Whether to play a knight before rolling.
    fn knight_before_roll(&self, board: &Board, me: PlayerNumber) -> bool;

    /// Whether a road-building card advances the plan.
    fn wants_road_building(&self, plan: &BuildPlan) -> bool;

    /// The two resources to take with a discovery card.
    fn choose_discovery(&self, hand: &ResourceSet, plan: &BuildPlan, table: &ResourceTable) -> ResourceSet;

    /// The resource to name with a monopoly card, if any is worth naming.
    fn choose_monopoly(
        &self,
        me: PlayerNumber,
        known: &BTreeMap<PlayerNumber, ResourceSet>,
        hand: &ResourceSet,
        plan: &BuildPlan,
    ) -> Option<Resource>;
}

/// Plays cards only when they move the current build plan forward.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanDrivenCards;

impl CardStrategy for PlanDrivenCards {
    fn knight_before_roll(&self, board: &Board, me: PlayerNumber) -> bool {
        board
            .robber()
            .is_some_and(|hex| board.players_touching(hex).contains(&me))
    }

    fn wants_road_building(&self, plan: &BuildPlan) -> bool {
        plan.lead()
            .is_some_and(|step| matches!(step.piece_type(), PieceType::Road | PieceType::Ship))
    }

    fn choose_discovery(&self, hand: &ResourceSet, plan: &BuildPlan, table: &ResourceTable) -> ResourceSet {
        let mut picks = ResourceSet::new();
        let mut gap = hand.gap(&plan.lead_cost());

        for _ in 0..DISCOVERY_PICKS {
            let pick = gap
                .iter()
                .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                .map(|(r, _)| r)
                .or_else(|| {
                    // Nothing missing: take what we produce slowest.
                    Resource::ALL
                        .iter()
                        .copied()
                        .max_by_key(|r| (table.rolls_per_resource(*r), std::cmp::Reverse(*r)))
                });
            let Some(resource) = pick else {
                break;
            };
            gap.take_up_to(resource, 1);
            picks.add(resource, 1);
        }
        picks
    }

    fn choose_monopoly(
        &self,
        me: PlayerNumber,
        known: &BTreeMap<PlayerNumber, ResourceSet>,
        hand: &ResourceSet,
        plan: &BuildPlan,
    ) -> Option<Resource> {
        let gap = hand.gap(&plan.lead_cost());
        let mut held = ResourceSet::new();
        for (_, set) in known.iter().filter(|(p, _)| **p != me) {
            held.add_set(set);
        }

        let needed = gap
            .kinds()
            .filter(|r| held.amount(*r) > 0)
            .max_by_key(|r| (held.amount(*r), std::cmp::Reverse(*r)));
        // Outside the plan a haul of three is still worth the card.
        needed.or_else(|| {
            held.iter()
                .filter(|(_, n)| *n >= 3)
                .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                .map(|(r, _)| r)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use settler_board::Layout;
    use settler_types::{Piece, PieceKey};

    use super::*;
    use crate::tracker::PossiblePiece;

    const ME: PlayerNumber = PlayerNumber(0);

    fn city_plan() -> BuildPlan {
        let mut plan = BuildPlan::new();
        plan.push(PossiblePiece::new(ME, PieceKey::City(settler_types::NodeId(3)), 4));
        plan
    }

    #[test]
    fn discovery_fills_the_gap_first() {
        let hand = ResourceSet::from_pairs(&[(Resource::Ore, 2), (Resource::Wheat, 1)]);
        let picks = PlanDrivenCards.choose_discovery(&hand, &city_plan(), &ResourceTable::from_contacts(&[], None));
        assert_eq!(picks.total(), DISCOVERY_PICKS);
        assert_eq!(picks.amount(Resource::Ore), 1);
        assert_eq!(picks.amount(Resource::Wheat), 1);
    }

    #[test]
    fn monopoly_names_a_needed_resource_others_hold() {
        let hand = ResourceSet::from_pairs(&[(Resource::Ore, 3)]);
        let known = BTreeMap::from([
            (PlayerNumber(1), ResourceSet::single(Resource::Wheat, 2)),
            (PlayerNumber(2), ResourceSet::single(Resource::Sheep, 1)),
            (ME, ResourceSet::single(Resource::Wood, 9)),
        ]);
        assert_eq!(
            PlanDrivenCards.choose_monopoly(ME, &known, &hand, &city_plan()),
            Some(Resource::Wheat)
        );
        assert_eq!(
            PlanDrivenCards.choose_monopoly(ME, &BTreeMap::new(), &hand, &city_plan()),
            None
        );
    }

    #[test]
    fn knight_only_when_robber_blocks_us() {
        let mut board = Board::new(Layout::standard(9).unwrap());
        assert!(!PlanDrivenCards.knight_before_roll(&board, ME));

        let hex = board.layout().hexes().find(|h| h.number.is_some()).unwrap().id;
        let node = board.layout().nodes_of_hex(hex).first().copied().unwrap();
        board.place(Piece { owner: ME, key: PieceKey::Settlement(node) }).unwrap();
        board.move_robber(hex).unwrap();
        assert!(PlanDrivenCards.knight_before_roll(&board, ME));
    }

    #[test]
    fn road_building_follows_the_lead_step() {
        let mut plan = BuildPlan::new();
        assert!(!PlanDrivenCards.wants_road_building(&plan));
        plan.push(PossiblePiece::new(ME, PieceKey::Road(settler_types::EdgeId(1)), 2));
        assert!(PlanDrivenCards.wants_road_building(&plan));
    }
}
