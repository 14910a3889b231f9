//! The agent's local mirror of the board.
//!
//! The [`Board`] holds the immutable [`Layout`] plus every placed building,
//! road, and ship, and the robber. It is fed from engine events and from
//! our own optimistic placements, which are undone with [`Board::remove`]
//! when the engine denies them.
//!
//! The mirror only enforces occupancy on mutation. Full legality (distance
//! rule, connectivity) is answered by the `can_place_*` queries, which the
//! planner uses to stay inside what the engine will accept. The engine
//! remains the final word.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use settler_types::{EdgeId, HexId, NodeId, Piece, PieceKey, PlayerNumber, Resource};
use tracing::trace;

use crate::error::BoardError;
use crate::layout::{Layout, Port};

/// Bank trade ratio without any port.
pub const DEFAULT_TRADE_RATIO: u32 = 4;
/// Trade ratio at a generic port.
pub const GENERIC_PORT_RATIO: u32 = 3;
/// Trade ratio at a resource-specific port.
pub const SPECIFIC_PORT_RATIO: u32 = 2;

/// Number of ways (out of 36) two dice roll `sum`.
pub const fn dice_ways(sum: u8) -> u32 {
    match sum {
        2 | 12 => 1,
        3 | 11 => 2,
        4 | 10 => 3,
        5 | 9 => 4,
        6 | 8 => 5,
        7 => 6,
        _ => 0,
    }
}

/// A settlement or city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Owning player.
    pub owner: PlayerNumber,
    /// Whether the settlement has been upgraded.
    pub city: bool,
}

/// A road or ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Owning player.
    pub owner: PlayerNumber,
    /// Whether this is a ship rather than a road.
    pub ship: bool,
}

/// One producing hex touching a player's building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Contact {
    /// The producing hex.
    pub hex: HexId,
    /// Resource it yields.
    pub resource: Resource,
    /// Its number token.
    pub number: u8,
    /// Units per production: 1 for a settlement, 2 for a city.
    pub multiplier: u32,
}

/// Per-resource bank trade ratios for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRatios(BTreeMap<Resource, u32>);

impl PortRatios {
    /// Ratios with no port access (4:1 everywhere).
    pub fn bank() -> Self {
        Self(
            Resource::ALL
                .iter()
                .map(|r| (*r, DEFAULT_TRADE_RATIO))
                .collect(),
        )
    }

    /// Units of `resource` needed for one unit of anything else.
    pub fn ratio(&self, resource: Resource) -> u32 {
        self.0
            .get(&resource)
            .copied()
            .unwrap_or(DEFAULT_TRADE_RATIO)
    }

    /// Lower the ratio for `resource` to `ratio` if that improves it.
    pub fn improve(&mut self, resource: Resource, ratio: u32) {
        let entry = self.0.entry(resource).or_insert(DEFAULT_TRADE_RATIO);
        *entry = (*entry).min(ratio);
    }

    /// Apply the effect of standing on `port`.
    pub fn apply(&mut self, port: Port) {
        match port {
            Port::Generic => {
                for r in Resource::ALL {
                    self.improve(r, GENERIC_PORT_RATIO);
                }
            }
            Port::Specific(r) => self.improve(r, SPECIFIC_PORT_RATIO),
        }
    }
}

impl Default for PortRatios {
    fn default() -> Self {
        Self::bank()
    }
}

/// Mirror of all pieces on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    layout: Layout,
    buildings: BTreeMap<NodeId, Building>,
    routes: BTreeMap<EdgeId, Route>,
    robber: Option<HexId>,
}

impl Board {
    /// An empty board with the robber on the desert.
    pub fn new(layout: Layout) -> Self {
        let robber = layout.desert();
        Self {
            layout,
            buildings: BTreeMap::new(),
            routes: BTreeMap::new(),
            robber,
        }
    }

    /// The immutable geometry.
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Where the robber stands.
    pub const fn robber(&self) -> Option<HexId> {
        self.robber
    }

    /// The building on `node`, if any.
    pub fn building(&self, node: NodeId) -> Option<&Building> {
        self.buildings.get(&node)
    }

    /// The road or ship on `edge`, if any.
    pub fn route(&self, edge: EdgeId) -> Option<&Route> {
        self.routes.get(&edge)
    }

    // -------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------

    /// Put a piece on the board.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Occupied`] if the spot is taken,
    /// [`BoardError::NoSettlement`] for a city without a settlement under it,
    /// [`BoardError::NotABoardPiece`] for a card, or an unknown-id error.
    pub fn place(&mut self, piece: Piece) -> Result<(), BoardError> {
        let Piece { owner, key } = piece;
        match key {
            PieceKey::Settlement(node) => {
                self.layout.node(node).ok_or(BoardError::UnknownNode(node))?;
                if self.buildings.contains_key(&node) {
                    return Err(BoardError::Occupied { key });
                }
                self.buildings.insert(node, Building { owner, city: false });
            }
            PieceKey::City(node) => {
                let building = self
                    .buildings
                    .get_mut(&node)
                    .filter(|b| b.owner == owner && !b.city)
                    .ok_or(BoardError::NoSettlement { owner, node })?;
                building.city = true;
            }
            PieceKey::Road(edge) | PieceKey::Ship(edge) => {
                self.layout.edge(edge).ok_or(BoardError::UnknownEdge(edge))?;
                if self.routes.contains_key(&edge) {
                    return Err(BoardError::Occupied { key });
                }
                let ship = matches!(key, PieceKey::Ship(_));
                self.routes.insert(edge, Route { owner, ship });
            }
            PieceKey::DevCard => return Err(BoardError::NotABoardPiece(key)),
        }
        trace!(owner = %owner, piece = %key, "piece placed on mirror");
        Ok(())
    }

    /// Undo a placement. A city reverts to a settlement.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::NotPlaced`] if the exact piece is not present.
    pub fn remove(&mut self, piece: Piece) -> Result<(), BoardError> {
        if !self.contains(piece) {
            return Err(BoardError::NotPlaced {
                owner: piece.owner,
                key: piece.key,
            });
        }
        match piece.key {
            PieceKey::Settlement(node) => {
                self.buildings.remove(&node);
            }
            PieceKey::City(node) => {
                if let Some(building) = self.buildings.get_mut(&node) {
                    building.city = false;
                }
            }
            PieceKey::Road(edge) | PieceKey::Ship(edge) => {
                self.routes.remove(&edge);
            }
            PieceKey::DevCard => return Err(BoardError::NotABoardPiece(piece.key)),
        }
        trace!(owner = %piece.owner, piece = %piece.key, "piece removed from mirror");
        Ok(())
    }

    /// Whether exactly this piece is on the board.
    pub fn contains(&self, piece: Piece) -> bool {
        match piece.key {
            PieceKey::Settlement(node) => self
                .buildings
                .get(&node)
                .is_some_and(|b| b.owner == piece.owner && !b.city),
            PieceKey::City(node) => self
                .buildings
                .get(&node)
                .is_some_and(|b| b.owner == piece.owner && b.city),
            PieceKey::Road(edge) => self
                .routes
                .get(&edge)
                .is_some_and(|r| r.owner == piece.owner && !r.ship),
            PieceKey::Ship(edge) => self
                .routes
                .get(&edge)
                .is_some_and(|r| r.owner == piece.owner && r.ship),
            PieceKey::DevCard => false,
        }
    }

    /// Move the robber.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownHex`] if `hex` is not on the board.
    pub fn move_robber(&mut self, hex: HexId) -> Result<(), BoardError> {
        self.layout.hex(hex).ok_or(BoardError::UnknownHex(hex))?;
        self.robber = Some(hex);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Ownership queries
    // -------------------------------------------------------------------

    /// Every piece owned by `player`, buildings first.
    pub fn pieces_of(&self, player: PlayerNumber) -> Vec<Piece> {
        let buildings = self
            .buildings
            .iter()
            .filter(|(_, b)| b.owner == player)
            .map(|(node, b)| Piece {
                owner: player,
                key: if b.city {
                    PieceKey::City(*node)
                } else {
                    PieceKey::Settlement(*node)
                },
            });
        let routes = self
            .routes
            .iter()
            .filter(|(_, r)| r.owner == player)
            .map(|(edge, r)| Piece {
                owner: player,
                key: if r.ship {
                    PieceKey::Ship(*edge)
                } else {
                    PieceKey::Road(*edge)
                },
            });
        buildings.chain(routes).collect()
    }

    /// Nodes holding a settlement (not a city) of `player`.
    pub fn settlements_of(&self, player: PlayerNumber) -> Vec<NodeId> {
        self.buildings
            .iter()
            .filter(|(_, b)| b.owner == player && !b.city)
            .map(|(node, _)| *node)
            .collect()
    }

    /// Nodes holding a city of `player`.
    pub fn cities_of(&self, player: PlayerNumber) -> Vec<NodeId> {
        self.buildings
            .iter()
            .filter(|(_, b)| b.owner == player && b.city)
            .map(|(node, _)| *node)
            .collect()
    }

    /// Players with a building on any corner of `hex`.
    pub fn players_touching(&self, hex: HexId) -> BTreeSet<PlayerNumber> {
        self.buildings
            .iter()
            .filter(|(node, _)| {
                self.layout
                    .node(**node)
                    .is_some_and(|info| info.hexes.contains(&hex))
            })
            .map(|(_, b)| b.owner)
            .collect()
    }

    /// Nodes from which `player` can extend a road or ship network: their
    /// buildings plus road ends not blocked by an opponent's building.
    pub fn network_nodes(&self, player: PlayerNumber) -> BTreeSet<NodeId> {
        let mut nodes: BTreeSet<NodeId> = self
            .buildings
            .iter()
            .filter(|(_, b)| b.owner == player)
            .map(|(node, _)| *node)
            .collect();
        for (edge, route) in &self.routes {
            if route.owner != player {
                continue;
            }
            let Some(info) = self.layout.edge(*edge) else {
                continue;
            };
            for end in [info.ends.0, info.ends.1] {
                let blocked = self.buildings.get(&end).is_some_and(|b| b.owner != player);
                if !blocked {
                    nodes.insert(end);
                }
            }
        }
        nodes
    }

    // -------------------------------------------------------------------
    // Legality
    // -------------------------------------------------------------------

    /// Whether `node` is empty and no neighbour holds a building.
    pub fn node_free_for_settlement(&self, node: NodeId) -> bool {
        let Some(info) = self.layout.node(node) else {
            return false;
        };
        !self.buildings.contains_key(&node)
            && info
                .neighbours
                .iter()
                .all(|n| !self.buildings.contains_key(n))
    }

    /// Whether `player` may put a settlement on `node`. During the opening
    /// no road connection is needed.
    pub fn can_place_settlement(&self, player: PlayerNumber, node: NodeId, opening: bool) -> bool {
        if !self.node_free_for_settlement(node) {
            return false;
        }
        if opening {
            return true;
        }
        self.layout.node(node).is_some_and(|info| {
            info.edges
                .iter()
                .any(|e| self.routes.get(e).is_some_and(|r| r.owner == player))
        })
    }

    /// Whether `player` may upgrade a settlement on `node`.
    pub fn can_place_city(&self, player: PlayerNumber, node: NodeId) -> bool {
        self.buildings
            .get(&node)
            .is_some_and(|b| b.owner == player && !b.city)
    }

    /// Whether `player` may put a road on `edge` connected to their network.
    pub fn can_place_road(&self, player: PlayerNumber, edge: EdgeId) -> bool {
        self.route_connects(player, edge, false)
    }

    /// Whether `player` may put a ship on coastal `edge` connected to their
    /// buildings or ships.
    pub fn can_place_ship(&self, player: PlayerNumber, edge: EdgeId) -> bool {
        self.layout.edge(edge).is_some_and(|info| info.is_coastal())
            && self.route_connects(player, edge, true)
    }

    /// Whether an opening road on `edge` touches the settlement on `node`.
    pub fn can_place_opening_road(&self, player: PlayerNumber, edge: EdgeId, node: NodeId) -> bool {
        !self.routes.contains_key(&edge)
            && self.buildings.get(&node).is_some_and(|b| b.owner == player)
            && self
                .layout
                .edge(edge)
                .is_some_and(|info| info.other_end(node).is_some())
    }

    fn route_connects(&self, player: PlayerNumber, edge: EdgeId, ship: bool) -> bool {
        if self.routes.contains_key(&edge) {
            return false;
        }
        let Some(info) = self.layout.edge(edge) else {
            return false;
        };
        [info.ends.0, info.ends.1].into_iter().any(|end| {
            match self.buildings.get(&end) {
                Some(b) if b.owner == player => return true,
                Some(_) => return false,
                None => {}
            }
            self.layout.node(end).is_some_and(|node| {
                node.edges.iter().any(|e| {
                    *e != edge
                        && self
                            .routes
                            .get(e)
                            .is_some_and(|r| r.owner == player && r.ship == ship)
                })
            })
        })
    }

    // -------------------------------------------------------------------
    // Production and ports
    // -------------------------------------------------------------------

    /// Producing hexes touching a hypothetical settlement on `node`.
    pub fn node_contacts(&self, node: NodeId) -> Vec<Contact> {
        self.contacts_at(node, 1)
    }

    /// Every production contact of `player`, cities counting twice.
    pub fn contacts(&self, player: PlayerNumber) -> Vec<Contact> {
        self.buildings
            .iter()
            .filter(|(_, b)| b.owner == player)
            .flat_map(|(node, b)| self.contacts_at(*node, if b.city { 2 } else { 1 }))
            .collect()
    }

    fn contacts_at(&self, node: NodeId, multiplier: u32) -> Vec<Contact> {
        let Some(info) = self.layout.node(node) else {
            return Vec::new();
        };
        info.hexes
            .iter()
            .filter_map(|hex| {
                let tile = self.layout.hex(*hex)?;
                Some(Contact {
                    hex: *hex,
                    resource: tile.resource?,
                    number: tile.number?,
                    multiplier,
                })
            })
            .collect()
    }

    /// Trade ratios available to `player` from the ports they touch.
    pub fn port_ratios(&self, player: PlayerNumber) -> PortRatios {
        let mut ratios = PortRatios::bank();
        for (node, building) in &self.buildings {
            if building.owner != player {
                continue;
            }
            if let Some(port) = self.layout.node(*node).and_then(|info| info.port) {
                ratios.apply(port);
            }
        }
        ratios
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::layout::HexSpec;

    const P0: PlayerNumber = PlayerNumber(0);
    const P1: PlayerNumber = PlayerNumber(1);

    fn two_hex_board() -> Board {
        let layout = Layout::from_specs(&[
            HexSpec { q: 0, r: 0, resource: Some(Resource::Clay), number: Some(6) },
            HexSpec { q: 1, r: 0, resource: Some(Resource::Ore), number: Some(8) },
        ])
        .unwrap();
        Board::new(layout)
    }

    fn shared_node(board: &Board) -> NodeId {
        board
            .layout()
            .node_ids()
            .find(|n| board.layout().node(*n).unwrap().hexes.len() == 2)
            .unwrap()
    }

    #[test]
    fn dice_ways_sum_to_thirty_six() {
        let total: u32 = (2..=12).map(dice_ways).sum();
        assert_eq!(total, 36);
        assert_eq!(dice_ways(7), 6);
        assert_eq!(dice_ways(1), 0);
    }

    #[test]
    fn distance_rule_blocks_neighbours() {
        let mut board = two_hex_board();
        let node = shared_node(&board);
        board.place(Piece { owner: P0, key: PieceKey::Settlement(node) }).unwrap();
        let neighbour = board.layout().node(node).unwrap().neighbours[0];
        assert!(!board.can_place_settlement(P1, neighbour, true));
        assert!(!board.can_place_settlement(P1, node, true));
    }

    #[test]
    fn city_doubles_contacts() {
        let mut board = two_hex_board();
        let node = shared_node(&board);
        board.place(Piece { owner: P0, key: PieceKey::Settlement(node) }).unwrap();
        assert_eq!(board.contacts(P0).len(), 2);
        board.place(Piece { owner: P0, key: PieceKey::City(node) }).unwrap();
        assert!(board.contacts(P0).iter().all(|c| c.multiplier == 2));
        assert!(!board.can_place_city(P0, node));
    }

    #[test]
    fn remove_undoes_place() {
        let mut board = two_hex_board();
        let node = shared_node(&board);
        let before = board.clone();
        let piece = Piece { owner: P0, key: PieceKey::Settlement(node) };
        board.place(piece).unwrap();
        board.remove(piece).unwrap();
        assert_eq!(board, before);
        assert!(matches!(board.remove(piece), Err(BoardError::NotPlaced { .. })));
    }

    #[test]
    fn roads_extend_from_buildings_but_not_through_opponents() {
        let mut board = two_hex_board();
        let node = shared_node(&board);
        board.place(Piece { owner: P0, key: PieceKey::Settlement(node) }).unwrap();
        let edge = board.layout().node(node).unwrap().edges[0];
        assert!(board.can_place_road(P0, edge));
        assert!(!board.can_place_road(P1, edge));
        board.place(Piece { owner: P0, key: PieceKey::Road(edge) }).unwrap();
        assert!(board.network_nodes(P0).len() >= 2);
        assert!(matches!(
            board.place(Piece { owner: P1, key: PieceKey::Road(edge) }),
            Err(BoardError::Occupied { .. })
        ));
    }

    #[test]
    fn ports_improve_ratios() {
        let mut ratios = PortRatios::bank();
        assert_eq!(ratios.ratio(Resource::Wood), 4);
        ratios.apply(Port::Generic);
        ratios.apply(Port::Specific(Resource::Wood));
        assert_eq!(ratios.ratio(Resource::Wood), 2);
        assert_eq!(ratios.ratio(Resource::Ore), 3);
        ratios.apply(Port::Generic);
        assert_eq!(ratios.ratio(Resource::Wood), 2);
    }

    #[test]
    fn players_touching_reports_adjacent_owners() {
        let mut board = two_hex_board();
        let node = shared_node(&board);
        board.place(Piece { owner: P1, key: PieceKey::Settlement(node) }).unwrap();
        assert!(board.players_touching(HexId(0)).contains(&P1));
        assert!(board.players_touching(HexId(1)).contains(&P1));
    }
}
