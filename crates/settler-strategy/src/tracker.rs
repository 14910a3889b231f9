//! Player projections: what each player could build next, and how soon.
//!
//! The [`Tracker`] keeps one [`Projection`] per seat. A projection lists the
//! player's [`PossiblePiece`]s (roads off their network, settlement spots
//! within a few road hops, cities on their settlements, a card purchase,
//! ships when enabled), each with an ETA from the player's own production,
//! the speedup building it would bring, and the opponents racing for the
//! same spot. It also carries a greedy turns-to-win estimate.
//!
//! The tracker is updated on every placement anywhere on the board:
//!
//! 1. Candidates made illegal by the placement are dropped for every player.
//! 2. The placing player, and any player whose road network touches the new
//!    piece, is re-projected from the board.
//! 3. Threats are recomputed across all players.
//!
//! A placement the engine later denies is undone with
//! [`Tracker::on_piece_retracted`], which removes the piece from the board
//! mirror, re-projects everyone, and withdraws that exact candidate for the
//! rest of the turn. Retracting twice leaves the same state as once.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use settler_board::{Board, Contact, PortRatios};
use settler_types::{EdgeId, NodeId, Piece, PieceKey, PieceType, PlayerNumber, ResourceSet, cost_of};
use tracing::{debug, trace};

use crate::config::StrategyConfig;
use crate::error::StrategyError;
use crate::estimator::Estimator;

/// Piece types whose "from nothing" ETA feeds the speedup vector.
const SPEEDUP_TYPES: [PieceType; 4] = [
    PieceType::Road,
    PieceType::Settlement,
    PieceType::City,
    PieceType::DevCard,
];

// ---------------------------------------------------------------------------
// Possible pieces
// ---------------------------------------------------------------------------

/// A candidate piece for one player, with planning metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossiblePiece {
    /// The player who could build it.
    pub owner: PlayerNumber,
    /// What and where.
    pub key: PieceKey,
    /// Rolls to afford it (including needed roads) from an empty hand.
    pub eta: u32,
    /// Total cost, including needed roads.
    pub cost: ResourceSet,
    /// Rolls saved per piece type once this is built.
    pub speedup: BTreeMap<PieceType, u32>,
    /// Roads to build first, in order from the network outwards.
    pub roads_needed: Vec<EdgeId>,
    /// Opponents who could reach this spot (or a neighbour) sooner.
    pub threats: BTreeSet<PlayerNumber>,
}

impl PossiblePiece {
    /// A bare candidate costing exactly its own piece.
    pub fn new(owner: PlayerNumber, key: PieceKey, eta: u32) -> Self {
        Self {
            owner,
            key,
            eta,
            cost: key.cost(),
            speedup: BTreeMap::new(),
            roads_needed: Vec::new(),
            threats: BTreeSet::new(),
        }
    }

    /// The kind of piece.
    pub const fn piece_type(&self) -> PieceType {
        self.key.piece_type()
    }

    /// Sum of the speedup vector.
    pub fn speedup_total(&self) -> u32 {
        self.speedup
            .values()
            .fold(0_u32, |acc, s| acc.saturating_add(*s))
    }
}

/// Everything projected for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    player: PlayerNumber,
    estimator: Estimator,
    ports: PortRatios,
    pieces: Vec<PossiblePiece>,
    turns_to_win: u32,
}

impl Projection {
    fn empty(player: PlayerNumber, cutoff: u32) -> Self {
        Self {
            player,
            estimator: Estimator::default(),
            ports: PortRatios::bank(),
            pieces: Vec::new(),
            turns_to_win: cutoff,
        }
    }

    /// The projected player.
    pub const fn player(&self) -> PlayerNumber {
        self.player
    }

    /// Estimator built from the player's current contacts.
    pub const fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    /// The player's bank trade ratios.
    pub const fn ports(&self) -> &PortRatios {
        &self.ports
    }

    /// Reachable candidates, ordered by key.
    pub fn pieces(&self) -> &[PossiblePiece] {
        &self.pieces
    }

    /// The candidate with this key, if reachable.
    pub fn piece(&self, key: PieceKey) -> Option<&PossiblePiece> {
        self.pieces.iter().find(|p| p.key == key)
    }

    /// Greedy estimate of rolls until the player wins, capped by the cutoff.
    pub const fn turns_to_win(&self) -> u32 {
        self.turns_to_win
    }
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// Tracker settings taken from [`StrategyConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Settings {
    cutoff: u32,
    winning_score: u32,
    hops: u32,
    ships: bool,
}

/// Projections for every seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    settings: Settings,
    projections: BTreeMap<PlayerNumber, Projection>,
    scores: BTreeMap<PlayerNumber, u32>,
    withdrawn: BTreeMap<PlayerNumber, BTreeSet<PieceKey>>,
}

impl Tracker {
    /// A tracker for `players`, with empty projections.
    pub fn new(config: &StrategyConfig, players: impl IntoIterator<Item = PlayerNumber>) -> Self {
        let settings = Settings {
            cutoff: config.eta_cutoff,
            winning_score: config.winning_score,
            hops: config.settlement_search_hops,
            ships: config.ships_enabled,
        };
        let projections = players
            .into_iter()
            .map(|p| (p, Projection::empty(p, settings.cutoff)))
            .collect();
        Self {
            settings,
            projections,
            scores: BTreeMap::new(),
            withdrawn: BTreeMap::new(),
        }
    }

    /// The projection for `player`.
    pub fn projection(&self, player: PlayerNumber) -> Option<&Projection> {
        self.projections.get(&player)
    }

    /// All projections by seat.
    pub const fn projections(&self) -> &BTreeMap<PlayerNumber, Projection> {
        &self.projections
    }

    /// Reachable candidates of `player`.
    pub fn possible_pieces(&self, player: PlayerNumber) -> &[PossiblePiece] {
        self.projections
            .get(&player)
            .map_or(&[], |p| p.pieces())
    }

    /// Turns-to-win of `player`, or the cutoff if unknown.
    pub fn turns_to_win(&self, player: PlayerNumber) -> u32 {
        self.projections
            .get(&player)
            .map_or(self.settings.cutoff, Projection::turns_to_win)
    }

    /// Candidates withdrawn this turn for `player`.
    pub fn withdrawn(&self, player: PlayerNumber) -> impl Iterator<Item = &PieceKey> {
        self.withdrawn.get(&player).into_iter().flatten()
    }

    /// Record a player's public victory points.
    pub fn set_score(&mut self, player: PlayerNumber, points: u32) {
        self.scores.insert(player, points);
    }

    // -------------------------------------------------------------------
    // Updates
    // -------------------------------------------------------------------

    /// Update projections after `piece` was put on `board`.
    pub fn on_piece_placed(&mut self, board: &Board, piece: Piece) {
        self.projections
            .entry(piece.owner)
            .or_insert_with(|| Projection::empty(piece.owner, self.settings.cutoff));

        let blocked_nodes: BTreeSet<NodeId> = match piece.key {
            PieceKey::Settlement(node) => {
                let mut nodes: BTreeSet<NodeId> = board
                    .layout()
                    .node(node)
                    .map(|info| info.neighbours.iter().copied().collect())
                    .unwrap_or_default();
                nodes.insert(node);
                nodes
            }
            _ => BTreeSet::new(),
        };
        let placed_edge = piece.key.edge();

        for projection in self.projections.values_mut() {
            let before = projection.pieces.len();
            projection.pieces.retain(|c| {
                if c.key == piece.key {
                    return false;
                }
                if let PieceKey::Settlement(node) = c.key {
                    if blocked_nodes.contains(&node) {
                        return false;
                    }
                }
                placed_edge.is_none_or(|edge| c.key.edge() != Some(edge) && !c.roads_needed.contains(&edge))
            });
            let dropped = before.saturating_sub(projection.pieces.len());
            if dropped > 0 {
                trace!(player = %projection.player, dropped, piece = %piece.key, "candidates invalidated");
            }
        }

        let mut stale = BTreeSet::from([piece.owner]);
        if let Some(node) = piece.key.node() {
            if let Some(info) = board.layout().node(node) {
                for edge in &info.edges {
                    if let Some(route) = board.route(*edge) {
                        stale.insert(route.owner);
                    }
                }
            }
        }
        for player in stale {
            self.refresh(board, player);
        }
        self.recompute_threats(board);
        debug!(owner = %piece.owner, piece = %piece.key, "projections updated for placement");
    }

    /// Undo a placement the engine denied.
    ///
    /// Removes `piece` from `board` if present, withdraws it as a candidate
    /// for the rest of the turn, and re-projects every player.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Board`] if the mirror refuses the removal.
    pub fn on_piece_retracted(&mut self, board: &mut Board, piece: Piece) -> Result<(), StrategyError> {
        if board.contains(piece) {
            board.remove(piece)?;
        }
        self.withdrawn
            .entry(piece.owner)
            .or_default()
            .insert(piece.key);
        self.rebuild_all(board);
        debug!(owner = %piece.owner, piece = %piece.key, "candidate retracted");
        Ok(())
    }

    /// The robber moved; every ETA may change.
    pub fn on_robber_moved(&mut self, board: &Board) {
        self.rebuild_all(board);
    }

    /// Start of a new turn: withdrawn candidates become eligible again.
    pub fn new_turn(&mut self, board: &Board) {
        self.withdrawn.clear();
        self.rebuild_all(board);
    }

    /// Re-project every player from the board.
    pub fn rebuild_all(&mut self, board: &Board) {
        let players: Vec<PlayerNumber> = self.projections.keys().copied().collect();
        for player in players {
            self.refresh(board, player);
        }
        self.recompute_threats(board);
    }

    // -------------------------------------------------------------------
    // Projection
    // -------------------------------------------------------------------

    fn score(&self, board: &Board, player: PlayerNumber) -> u32 {
        self.scores.get(&player).copied().unwrap_or_else(|| {
            let settlements = u32::try_from(board.settlements_of(player).len()).unwrap_or(u32::MAX);
            let cities = u32::try_from(board.cities_of(player).len()).unwrap_or(u32::MAX);
            settlements.saturating_add(cities.saturating_mul(2))
        })
    }

    fn refresh(&mut self, board: &Board, player: PlayerNumber) {
        let Settings { cutoff, hops, ships, .. } = self.settings;
        let withdrawn = self.withdrawn.get(&player).cloned().unwrap_or_default();
        let ports = board.port_ratios(player);
        let mut estimator = Estimator::new(&board.contacts(player), board.robber());
        let mut pieces = Vec::new();

        let network = board.network_nodes(player);
        let mut road_edges = BTreeSet::new();
        let mut ship_edges = BTreeSet::new();
        for node in &network {
            let Some(info) = board.layout().node(*node) else {
                continue;
            };
            for edge in &info.edges {
                if board.can_place_road(player, *edge) {
                    road_edges.insert(*edge);
                }
                if ships && board.can_place_ship(player, *edge) {
                    ship_edges.insert(*edge);
                }
            }
        }
        let road_eta = estimator.from_nothing(PieceType::Road, cutoff, &ports);
        pieces.extend(
            road_edges
                .into_iter()
                .map(|e| PossiblePiece::new(player, PieceKey::Road(e), road_eta)),
        );
        let ship_eta = estimator.from_nothing(PieceType::Ship, cutoff, &ports);
        pieces.extend(
            ship_edges
                .into_iter()
                .map(|e| PossiblePiece::new(player, PieceKey::Ship(e), ship_eta)),
        );

        for (node, path) in settlement_spots(board, player, hops) {
            let roads = u32::try_from(path.len()).unwrap_or(u32::MAX);
            let mut cost = cost_of(PieceType::Settlement);
            cost.add_set(&cost_of(PieceType::Road).scaled(roads));
            let mut candidate = PossiblePiece::new(
                player,
                PieceKey::Settlement(node),
                estimator.eta_for_cost(&cost, cutoff, &ports),
            );
            candidate.cost = cost;
            candidate.roads_needed = path;
            candidate.speedup = speedup_at(board, player, node, &mut estimator, &ports, cutoff);
            pieces.push(candidate);
        }

        let city_eta = estimator.from_nothing(PieceType::City, cutoff, &ports);
        for node in board.settlements_of(player) {
            let mut candidate = PossiblePiece::new(player, PieceKey::City(node), city_eta);
            candidate.speedup = speedup_at(board, player, node, &mut estimator, &ports, cutoff);
            pieces.push(candidate);
        }

        let card_eta = estimator.from_nothing(PieceType::DevCard, cutoff, &ports);
        pieces.push(PossiblePiece::new(player, PieceKey::DevCard, card_eta));

        pieces.retain(|c| !withdrawn.contains(&c.key));
        pieces.sort_by_key(|c| c.key);

        let turns_to_win = greedy_turns_to_win(
            board,
            player,
            self.score(board, player),
            &pieces,
            self.settings,
        );
        trace!(player = %player, candidates = pieces.len(), turns_to_win, "player projected");

        self.projections.insert(
            player,
            Projection {
                player,
                estimator,
                ports,
                pieces,
                turns_to_win,
            },
        );
    }

    fn recompute_threats(&mut self, board: &Board) {
        let mut contenders: BTreeMap<NodeId, Vec<(PlayerNumber, u32)>> = BTreeMap::new();
        for projection in self.projections.values() {
            for candidate in &projection.pieces {
                if let PieceKey::Settlement(node) = candidate.key {
                    contenders
                        .entry(node)
                        .or_default()
                        .push((candidate.owner, candidate.eta));
                }
            }
        }

        for projection in self.projections.values_mut() {
            for candidate in &mut projection.pieces {
                let PieceKey::Settlement(node) = candidate.key else {
                    continue;
                };
                let mut nearby = vec![node];
                if let Some(info) = board.layout().node(node) {
                    nearby.extend(info.neighbours.iter().copied());
                }
                candidate.threats = nearby
                    .iter()
                    .filter_map(|n| contenders.get(n))
                    .flatten()
                    .filter(|(other, eta)| *other != candidate.owner && *eta < candidate.eta)
                    .map(|(other, _)| *other)
                    .collect();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Free settlement spots within `hops` new roads of `player`'s network,
/// each with the roads that lead there.
fn settlement_spots(board: &Board, player: PlayerNumber, hops: u32) -> BTreeMap<NodeId, Vec<EdgeId>> {
    let layout = board.layout();
    let mut paths: BTreeMap<NodeId, Vec<EdgeId>> = BTreeMap::new();
    let mut frontier: Vec<NodeId> = Vec::new();
    for node in board.network_nodes(player) {
        paths.insert(node, Vec::new());
        frontier.push(node);
    }

    for _ in 0..hops {
        let mut next = Vec::new();
        for node in frontier {
            let Some(path) = paths.get(&node).cloned() else {
                continue;
            };
            let Some(info) = layout.node(node) else {
                continue;
            };
            for edge in &info.edges {
                if board.route(*edge).is_some() {
                    continue;
                }
                let Some(other) = layout.edge(*edge).and_then(|e| e.other_end(node)) else {
                    continue;
                };
                if paths.contains_key(&other) || board.building(other).is_some_and(|b| b.owner != player) {
                    continue;
                }
                let mut extended = path.clone();
                extended.push(*edge);
                paths.insert(other, extended);
                next.push(other);
            }
        }
        frontier = next;
    }

    paths.retain(|node, path| {
        board.node_free_for_settlement(*node)
            && (!path.is_empty() || board.can_place_settlement(player, *node, false))
    });
    paths
}

/// Rolls saved per piece type if `player` gained a settlement (or city
/// upgrade) on `node`.
fn speedup_at(
    board: &Board,
    player: PlayerNumber,
    node: NodeId,
    base: &mut Estimator,
    ports: &PortRatios,
    cutoff: u32,
) -> BTreeMap<PieceType, u32> {
    let mut contacts: Vec<Contact> = board.contacts(player);
    contacts.extend(board.node_contacts(node));
    let mut after_ports = ports.clone();
    if let Some(port) = board.layout().node(node).and_then(|info| info.port) {
        after_ports.apply(port);
    }
    let mut after = Estimator::new(&contacts, board.robber());

    SPEEDUP_TYPES
        .iter()
        .filter_map(|pt| {
            let before = base.from_nothing(*pt, cutoff, ports);
            let now = after.from_nothing(*pt, cutoff, &after_ports);
            let saved = before.saturating_sub(now);
            (saved > 0).then_some((*pt, saved))
        })
        .collect()
}

/// Rolls until `player` reaches the winning score by repeatedly taking the
/// quickest victory-point piece, capped at the cutoff.
fn greedy_turns_to_win(
    board: &Board,
    player: PlayerNumber,
    score: u32,
    pieces: &[PossiblePiece],
    settings: Settings,
) -> u32 {
    let cutoff = settings.cutoff;
    let mut score = score;
    let mut contacts = board.contacts(player);
    let mut ports = board.port_ratios(player);
    let mut spots: Vec<(NodeId, ResourceSet)> = pieces
        .iter()
        .filter_map(|c| c.key.node().filter(|_| c.piece_type() == PieceType::Settlement).map(|n| (n, c.cost.clone())))
        .collect();
    let mut cities: Vec<NodeId> = board.settlements_of(player);
    let mut cities_left = PieceType::City
        .supply()
        .unwrap_or(0)
        .saturating_sub(u32::try_from(board.cities_of(player).len()).unwrap_or(u32::MAX));
    let mut rolls = 0_u32;

    while score < settings.winning_score {
        let estimator = Estimator::new(&contacts, board.robber());
        let city_cost = cost_of(PieceType::City);
        let best_spot = spots
            .iter()
            .enumerate()
            .map(|(i, (node, cost))| (estimator.eta_for_cost(cost, cutoff, &ports), i, *node))
            .min();
        let best_city = if cities_left > 0 {
            cities
                .iter()
                .enumerate()
                .map(|(i, node)| (estimator.eta_for_cost(&city_cost, cutoff, &ports), i, *node))
                .min()
        } else {
            None
        };

        let take_city = match (best_spot, best_city) {
            (Some(s), Some(c)) => c.0 < s.0,
            (None, Some(_)) => true,
            (_, None) => false,
        };
        let Some((eta, index, node)) = (if take_city { best_city } else { best_spot }) else {
            return cutoff;
        };

        rolls = rolls.saturating_add(eta);
        if rolls >= cutoff {
            return cutoff;
        }
        score = score.saturating_add(1);
        contacts.extend(board.node_contacts(node));

        if take_city {
            if index < cities.len() {
                cities.remove(index);
            }
            cities_left = cities_left.saturating_sub(1);
        } else {
            if index < spots.len() {
                spots.remove(index);
            }
            if let Some(info) = board.layout().node(node) {
                spots.retain(|(n, _)| !info.neighbours.contains(n));
                if let Some(port) = info.port {
                    ports.apply(port);
                }
            }
            cities.push(node);
        }
    }
    rolls.min(cutoff)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use settler_board::Layout;

    use super::*;

    const P0: PlayerNumber = PlayerNumber(0);
    const P1: PlayerNumber = PlayerNumber(1);

    fn setup() -> (Board, Tracker) {
        let board = Board::new(Layout::standard(11).unwrap());
        let tracker = Tracker::new(&StrategyConfig::default(), [P0, P1]);
        (board, tracker)
    }

    fn inland_node(board: &Board) -> NodeId {
        board
            .layout()
            .node_ids()
            .find(|n| board.layout().node(*n).unwrap().hexes.len() == 3 && board.node_free_for_settlement(*n))
            .unwrap()
    }

    fn place(board: &mut Board, tracker: &mut Tracker, piece: Piece) {
        board.place(piece).unwrap();
        tracker.on_piece_placed(board, piece);
    }

    fn settle_with_road(board: &mut Board, tracker: &mut Tracker, player: PlayerNumber) -> (NodeId, EdgeId) {
        let node = inland_node(board);
        place(board, tracker, Piece { owner: player, key: PieceKey::Settlement(node) });
        let edge = board.layout().node(node).unwrap().edges.first().copied().unwrap();
        place(board, tracker, Piece { owner: player, key: PieceKey::Road(edge) });
        (node, edge)
    }

    #[test]
    fn settlement_yields_city_road_and_spot_candidates() {
        let (mut board, mut tracker) = setup();
        let (node, _) = settle_with_road(&mut board, &mut tracker, P0);
        let pieces = tracker.possible_pieces(P0);
        assert!(pieces.iter().any(|c| c.key == PieceKey::City(node)));
        assert!(pieces.iter().any(|c| matches!(c.key, PieceKey::Road(_))));
        assert!(pieces.iter().any(|c| matches!(c.key, PieceKey::Settlement(_))));
        assert!(pieces.iter().any(|c| c.key == PieceKey::DevCard));
        assert!(pieces.iter().all(|c| c.eta <= 40));
    }

    #[test]
    fn settlement_spots_carry_their_roads() {
        let (mut board, mut tracker) = setup();
        settle_with_road(&mut board, &mut tracker, P0);
        for candidate in tracker.possible_pieces(P0) {
            if let PieceKey::Settlement(node) = candidate.key {
                assert!(board.node_free_for_settlement(node));
                assert!(candidate.roads_needed.len() <= 2);
                let roads = u32::try_from(candidate.roads_needed.len()).unwrap();
                assert_eq!(candidate.cost.amount(settler_types::Resource::Wood), 1 + roads);
            }
        }
    }

    #[test]
    fn placement_invalidates_nearby_candidates() {
        let (mut board, mut tracker) = setup();
        settle_with_road(&mut board, &mut tracker, P0);
        let target = tracker
            .possible_pieces(P0)
            .iter()
            .find_map(|c| match c.key {
                PieceKey::Settlement(node) => Some(node),
                _ => None,
            })
            .unwrap();
        place(&mut board, &mut tracker, Piece { owner: P1, key: PieceKey::Settlement(target) });
        let neighbours = board.layout().node(target).unwrap().neighbours.clone();
        assert!(tracker.possible_pieces(P0).iter().all(|c| match c.key {
            PieceKey::Settlement(node) => node != target && !neighbours.contains(&node),
            _ => true,
        }));
    }

    #[test]
    fn retract_twice_equals_retract_once() {
        let (mut board, mut tracker) = setup();
        let (node, edge) = settle_with_road(&mut board, &mut tracker, P0);
        let city = Piece { owner: P0, key: PieceKey::City(node) };
        place(&mut board, &mut tracker, city);

        tracker.on_piece_retracted(&mut board, city).unwrap();
        let (board_once, tracker_once) = (board.clone(), tracker.clone());
        tracker.on_piece_retracted(&mut board, city).unwrap();
        assert_eq!(board, board_once);
        assert_eq!(tracker, tracker_once);

        assert!(board.can_place_city(P0, node));
        assert!(tracker.projection(P0).unwrap().piece(city.key).is_none());
        assert!(tracker.withdrawn(P0).any(|k| *k == city.key));
        assert!(board.contains(Piece { owner: P0, key: PieceKey::Road(edge) }));
    }

    #[test]
    fn new_turn_restores_withdrawn_candidates() {
        let (mut board, mut tracker) = setup();
        settle_with_road(&mut board, &mut tracker, P0);
        let card = Piece { owner: P0, key: PieceKey::DevCard };
        tracker.on_piece_retracted(&mut board, card).unwrap();
        assert!(tracker.projection(P0).unwrap().piece(PieceKey::DevCard).is_none());
        tracker.new_turn(&board);
        assert!(tracker.projection(P0).unwrap().piece(PieceKey::DevCard).is_some());
    }

    #[test]
    fn turns_to_win_is_capped_by_cutoff() {
        let (mut board, mut tracker) = setup();
        settle_with_road(&mut board, &mut tracker, P0);
        assert!(tracker.turns_to_win(P0) <= 40);
        assert_eq!(tracker.turns_to_win(PlayerNumber(9)), 40);
        tracker.set_score(P0, 10);
        tracker.rebuild_all(&board);
        assert_eq!(tracker.turns_to_win(P0), 0);
    }

    #[test]
    fn faster_opponent_is_a_threat() {
        let (mut board, mut tracker) = setup();
        let layout = board.layout().clone();

        // P0 sits alone on a hex the robber blocks, so it produces nothing.
        let (weak, blocked) = layout
            .node_ids()
            .find_map(|n| match layout.node(n)?.hexes.as_slice() {
                [hex] => Some((n, *hex)),
                _ => None,
            })
            .unwrap();
        board.move_robber(blocked).unwrap();
        place(&mut board, &mut tracker, Piece { owner: P0, key: PieceKey::Settlement(weak) });

        let productive = |board: &Board, n: NodeId| {
            board.node_free_for_settlement(n)
                && layout
                    .node(n)
                    .is_some_and(|info| info.hexes.len() == 3 && !info.hexes.contains(&blocked))
        };

        // P1 builds a city two roads away from one of P0's spots.
        let (spot, home) = tracker
            .possible_pieces(P0)
            .iter()
            .filter_map(|c| c.key.node().filter(|_| c.piece_type() == PieceType::Settlement))
            .find_map(|spot| {
                layout
                    .node(spot)?
                    .neighbours
                    .iter()
                    .find_map(|mid| {
                        layout
                            .node(*mid)?
                            .neighbours
                            .iter()
                            .copied()
                            .find(|home| *home != spot && productive(&board, *home))
                    })
                    .map(|home| (spot, home))
            })
            .unwrap();
        place(&mut board, &mut tracker, Piece { owner: P1, key: PieceKey::Settlement(home) });
        place(&mut board, &mut tracker, Piece { owner: P1, key: PieceKey::City(home) });

        // More P1 production, kept clear of the contested spot.
        let mut reserved: BTreeSet<NodeId> = layout.node(spot).unwrap().neighbours.iter().copied().collect();
        reserved.insert(spot);
        let extra: Vec<NodeId> = layout.node_ids().filter(|n| !reserved.contains(n)).collect();
        let mut added = 0_u32;
        for node in extra {
            if added == 4 {
                break;
            }
            if productive(&board, node) {
                place(&mut board, &mut tracker, Piece { owner: P1, key: PieceKey::Settlement(node) });
                added = added.saturating_add(1);
            }
        }
        tracker.rebuild_all(&board);

        let candidate = |player: PlayerNumber| {
            tracker
                .projection(player)
                .unwrap()
                .piece(PieceKey::Settlement(spot))
                .cloned()
                .unwrap()
        };
        let ours = candidate(P0);
        let theirs = candidate(P1);
        assert!(theirs.eta < ours.eta, "P1 eta {} vs P0 eta {}", theirs.eta, ours.eta);
        assert!(ours.threats.contains(&P1));
        assert!(!theirs.threats.contains(&P0));
    }
}
