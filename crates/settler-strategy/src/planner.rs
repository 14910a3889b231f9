//! Build planning.
//!
//! A [`PlanningStrategy`] turns the tracker's projection of our own
//! candidates into an ordered [`BuildPlan`]. Two strategies exist:
//!
//! - [`OnePly`] scores each feasible candidate on its own.
//! - [`TwoPly`] adds a discounted share of the best follow-up the candidate
//!   enables (the city a settlement allows, the settlement a road leads to).
//!
//! Utility is an integer: victory points, speedup, and race pressure raise
//! it, rolls to afford the piece from the current hand lower it. Ties go
//! to the lower ETA, then to the lower key, so plans are deterministic.
//! Strategies hold no state; the brain re-plans whenever a plan is
//! invalidated.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};
use settler_board::Board;
use settler_types::{PieceKey, PieceType, PlayerNumber, ResourceSet, cost_of};
use tracing::debug;

use crate::config::{PlannerKind, StrategyConfig};
use crate::estimator::{Estimator, Gains};
use crate::tracker::{PossiblePiece, Projection, Tracker};

// ---------------------------------------------------------------------------
// Build plan
// ---------------------------------------------------------------------------

/// Ordered pieces we intend to build, lead first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    steps: VecDeque<PossiblePiece>,
}

impl BuildPlan {
    /// An empty plan.
    pub const fn new() -> Self {
        Self {
            steps: VecDeque::new(),
        }
    }

    /// The next piece to build.
    pub fn lead(&self) -> Option<&PossiblePiece> {
        self.steps.front()
    }

    /// Remove and return the lead piece.
    pub fn pop_lead(&mut self) -> Option<PossiblePiece> {
        self.steps.pop_front()
    }

    /// Append a step.
    pub fn push(&mut self, step: PossiblePiece) {
        self.steps.push_back(step);
    }

    /// Whether nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Steps in order.
    pub fn iter(&self) -> impl Iterator<Item = &PossiblePiece> {
        self.steps.iter()
    }

    /// Drop every step.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Whether any step places `key`.
    pub fn contains(&self, key: PieceKey) -> bool {
        self.steps.iter().any(|s| s.key == key)
    }

    /// Cost of the lead step, empty if there is none.
    pub fn lead_cost(&self) -> ResourceSet {
        self.lead().map(|s| s.cost.clone()).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Context and strategy trait
// ---------------------------------------------------------------------------

/// Read-only view the planner needs from the brain.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    /// Board mirror.
    pub board: &'a Board,
    /// Projections for every seat.
    pub tracker: &'a Tracker,
    /// Our seat.
    pub me: PlayerNumber,
    /// Our exact hand.
    pub hand: &'a ResourceSet,
    /// Pieces we have left, by type.
    pub supply: &'a BTreeMap<PieceType, u32>,
    /// Development cards left in the deck.
    pub dev_cards_left: u32,
    /// Pieces the engine refused this turn.
    pub denied: &'a BTreeSet<PieceKey>,
    /// Strategy parameters.
    pub config: &'a StrategyConfig,
}

/// A way of choosing what to build next.
pub trait PlanningStrategy {
    /// Produce a plan. An empty plan means nothing is worth building.
    fn plan(&self, ctx: &PlanContext<'_>) -> BuildPlan;
}

/// Score each candidate directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePly;

/// Score each candidate plus its best follow-up.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoPly;

impl PlannerKind {
    /// The strategy for this kind.
    pub fn strategy(self) -> &'static dyn PlanningStrategy {
        match self {
            Self::OnePly => &OnePly,
            Self::TwoPly => &TwoPly,
        }
    }

    /// Plan with the strategy for this kind.
    pub fn plan(self, ctx: &PlanContext<'_>) -> BuildPlan {
        self.strategy().plan(ctx)
    }
}

impl PlanningStrategy for OnePly {
    fn plan(&self, ctx: &PlanContext<'_>) -> BuildPlan {
        plan_with(ctx, |_, _| 0)
    }
}

impl PlanningStrategy for TwoPly {
    fn plan(&self, ctx: &PlanContext<'_>) -> BuildPlan {
        plan_with(ctx, |projection, candidate| follow_up(ctx, projection, candidate))
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// A candidate with its score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    /// The candidate.
    pub key: PieceKey,
    /// Composite utility.
    pub utility: i64,
    /// Rolls to afford it from the current hand.
    pub eta: u32,
}

impl Scored {
    /// Preference order: higher utility, then lower ETA, then lower key.
    pub fn preference(&self, other: &Self) -> Ordering {
        self.utility
            .cmp(&other.utility)
            .then_with(|| other.eta.cmp(&self.eta))
            .then_with(|| other.key.cmp(&self.key))
    }
}

fn plan_with(ctx: &PlanContext<'_>, follow: impl Fn(&Projection, &PossiblePiece) -> i64) -> BuildPlan {
    let Some(projection) = ctx.tracker.projection(ctx.me) else {
        return BuildPlan::new();
    };

    let best = projection
        .pieces()
        .iter()
        .filter(|c| feasible(ctx, c))
        .map(|c| {
            let eta = eta_now(ctx, projection, c);
            let extra = follow(projection, c)
                .max(0)
                .saturating_mul(ctx.config.lookahead_percent)
                .checked_div(100)
                .unwrap_or(0);
            let scored = Scored {
                key: c.key,
                utility: base_utility(ctx.config, c, eta).saturating_add(extra),
                eta,
            };
            (scored, c)
        })
        .max_by(|a, b| a.0.preference(&b.0));

    let Some((scored, candidate)) = best else {
        debug!(seat = %ctx.me, "nothing to plan");
        return BuildPlan::new();
    };
    debug!(
        seat = %ctx.me,
        piece = %scored.key,
        utility = scored.utility,
        eta = scored.eta,
        "plan chosen"
    );
    expand(candidate)
}

/// Utility of `candidate` on its own, given its ETA from the current hand.
pub fn base_utility(config: &StrategyConfig, candidate: &PossiblePiece, eta: u32) -> i64 {
    let vp = i64::from(candidate.piece_type().victory_points());
    let speedup = i64::from(candidate.speedup_total());
    let threats = i64::try_from(candidate.threats.len()).unwrap_or(i64::MAX);
    let card = if candidate.key == PieceKey::DevCard {
        config.dev_card_value
    } else {
        0
    };
    config
        .vp_weight
        .saturating_mul(vp)
        .saturating_add(config.speedup_weight.saturating_mul(speedup))
        .saturating_add(config.threat_weight.saturating_mul(threats))
        .saturating_add(card)
        .saturating_sub(config.eta_weight.saturating_mul(i64::from(eta)))
}

fn eta_now(ctx: &PlanContext<'_>, projection: &Projection, candidate: &PossiblePiece) -> u32 {
    projection
        .estimator()
        .estimate_rolls(
            ctx.hand,
            &candidate.cost,
            ctx.config.eta_cutoff,
            projection.ports(),
            Gains::Expected,
        )
        .eta()
}

/// Whether `candidate` can be built now as far as the mirror knows.
pub fn feasible(ctx: &PlanContext<'_>, candidate: &PossiblePiece) -> bool {
    if ctx.denied.contains(&candidate.key)
        || candidate
            .roads_needed
            .iter()
            .any(|e| ctx.denied.contains(&PieceKey::Road(*e)))
    {
        return false;
    }

    let left = |pt: PieceType| ctx.supply.get(&pt).copied().unwrap_or(0);
    let roads = u32::try_from(candidate.roads_needed.len()).unwrap_or(u32::MAX);
    let supplied = match candidate.piece_type() {
        PieceType::DevCard => ctx.dev_cards_left > 0,
        PieceType::Road => left(PieceType::Road) > 0,
        PieceType::Settlement => left(PieceType::Settlement) > 0 && left(PieceType::Road) >= roads,
        other => left(other) > 0,
    };
    if !supplied {
        return false;
    }

    let board = ctx.board;
    match candidate.key {
        PieceKey::Road(edge) => board.can_place_road(ctx.me, edge),
        PieceKey::Ship(edge) => board.can_place_ship(ctx.me, edge),
        PieceKey::City(node) => board.can_place_city(ctx.me, node),
        PieceKey::Settlement(node) => match candidate.roads_needed.first() {
            None => board.can_place_settlement(ctx.me, node, false),
            Some(edge) => board.can_place_road(ctx.me, *edge) && board.node_free_for_settlement(node),
        },
        PieceKey::DevCard => true,
    }
}

/// Best follow-up utility `candidate` enables.
fn follow_up(ctx: &PlanContext<'_>, projection: &Projection, candidate: &PossiblePiece) -> i64 {
    let config = ctx.config;
    match candidate.key {
        PieceKey::Settlement(node) => {
            let mut contacts = ctx.board.contacts(ctx.me);
            contacts.extend(ctx.board.node_contacts(node));
            let after = Estimator::new(&contacts, ctx.board.robber());
            let eta = after.eta_for_cost(&cost_of(PieceType::City), config.eta_cutoff, projection.ports());
            config
                .vp_weight
                .saturating_sub(config.eta_weight.saturating_mul(i64::from(eta)))
        }
        PieceKey::Road(edge) => projection
            .pieces()
            .iter()
            .filter(|c| c.roads_needed.first() == Some(&edge))
            .map(|c| base_utility(config, c, c.eta))
            .max()
            .unwrap_or(0),
        PieceKey::City(_) | PieceKey::Ship(_) | PieceKey::DevCard => 0,
    }
}

/// A settlement that needs roads becomes its roads, then the settlement.
fn expand(candidate: &PossiblePiece) -> BuildPlan {
    let mut plan = BuildPlan::new();
    if candidate.roads_needed.is_empty() {
        plan.push(candidate.clone());
        return plan;
    }
    for edge in &candidate.roads_needed {
        plan.push(PossiblePiece::new(
            candidate.owner,
            PieceKey::Road(*edge),
            candidate.eta,
        ));
    }
    let mut settlement = candidate.clone();
    settlement.cost = candidate.key.cost();
    settlement.roads_needed.clear();
    plan.push(settlement);
    plan
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use settler_board::Layout;
    use settler_types::{NodeId, Piece, Resource};

    use super::*;

    const ME: PlayerNumber = PlayerNumber(0);

    struct Fixture {
        board: Board,
        tracker: Tracker,
        hand: ResourceSet,
        supply: BTreeMap<PieceType, u32>,
        denied: BTreeSet<PieceKey>,
        config: StrategyConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let config = StrategyConfig::default();
            let mut board = Board::new(Layout::standard(5).unwrap());
            let mut tracker = Tracker::new(&config, [ME]);
            let node: NodeId = board
                .layout()
                .node_ids()
                .find(|n| board.layout().node(*n).unwrap().hexes.len() == 3)
                .unwrap();
            for key in [
                PieceKey::Settlement(node),
                PieceKey::Road(board.layout().node(node).unwrap().edges.first().copied().unwrap()),
            ] {
                let piece = Piece { owner: ME, key };
                board.place(piece).unwrap();
                tracker.on_piece_placed(&board, piece);
            }
            let supply = PieceType::ALL
                .iter()
                .filter_map(|pt| pt.supply().map(|s| (*pt, s)))
                .collect();
            Self {
                board,
                tracker,
                hand: ResourceSet::new(),
                supply,
                denied: BTreeSet::new(),
                config,
            }
        }

        fn ctx(&self) -> PlanContext<'_> {
            PlanContext {
                board: &self.board,
                tracker: &self.tracker,
                me: ME,
                hand: &self.hand,
                supply: &self.supply,
                dev_cards_left: 25,
                denied: &self.denied,
                config: &self.config,
            }
        }
    }

    #[test]
    fn both_strategies_produce_a_plan() {
        let fixture = Fixture::new();
        assert!(!PlannerKind::OnePly.plan(&fixture.ctx()).is_empty());
        assert!(!PlannerKind::TwoPly.plan(&fixture.ctx()).is_empty());
    }

    #[test]
    fn nothing_feasible_gives_an_empty_plan() {
        let mut fixture = Fixture::new();
        fixture.supply.clear();
        let mut ctx = fixture.ctx();
        ctx.dev_cards_left = 0;
        assert!(PlannerKind::TwoPly.plan(&ctx).is_empty());
    }

    #[test]
    fn denied_pieces_are_not_selected_again() {
        let mut fixture = Fixture::new();
        for _ in 0..3 {
            let plan = PlannerKind::TwoPly.plan(&fixture.ctx());
            let Some(lead) = plan.lead() else {
                break;
            };
            for denied in &fixture.denied {
                assert!(!plan.contains(*denied));
            }
            let key = lead.key;
            fixture.denied.insert(key);
            fixture
                .tracker
                .on_piece_retracted(&mut fixture.board, Piece { owner: ME, key })
                .unwrap();
        }
    }

    #[test]
    fn settlement_behind_roads_expands_roads_first() {
        let fixture = Fixture::new();
        let candidate = fixture
            .tracker
            .possible_pieces(ME)
            .iter()
            .find(|c| matches!(c.key, PieceKey::Settlement(_)) && !c.roads_needed.is_empty())
            .unwrap();
        let plan = expand(candidate);
        assert_eq!(plan.len(), candidate.roads_needed.len() + 1);
        let steps: Vec<_> = plan.iter().collect();
        assert!(matches!(steps.first().unwrap().key, PieceKey::Road(_)));
        assert_eq!(steps.last().unwrap().key, candidate.key);
        assert_eq!(steps.last().unwrap().cost, cost_of(PieceType::Settlement));
    }

    #[test]
    fn ties_go_to_lower_eta() {
        let a = Scored { key: PieceKey::DevCard, utility: 10, eta: 3 };
        let b = Scored { key: PieceKey::Settlement(NodeId(1)), utility: 10, eta: 5 };
        assert_eq!(a.preference(&b), Ordering::Greater);
        let c = Scored { key: PieceKey::DevCard, utility: 11, eta: 9 };
        assert_eq!(c.preference(&a), Ordering::Greater);
    }

    #[test]
    fn affordable_city_beats_distant_settlement() {
        let mut fixture = Fixture::new();
        fixture.hand = ResourceSet::from_pairs(&[(Resource::Ore, 3), (Resource::Wheat, 2)]);
        fixture.config.speedup_weight = 0;
        fixture.config.threat_weight = 0;
        let plan = PlannerKind::OnePly.plan(&fixture.ctx());
        assert!(matches!(plan.lead().unwrap().key, PieceKey::City(_)));
    }
}
