//! Board layout: land hexes and the node/edge graph derived from them.
//!
//! Hexes use pointy-top axial coordinates `(q, r)`. Every hex corner is
//! named canonically as the north or south corner of exactly one hex
//! position, so corners shared by up to three hexes collapse into a single
//! [`NodeId`]. Edges are the six corner-to-corner sides of each hex.
//!
//! Node and edge identifiers are assigned in sorted coordinate order, which
//! makes them stable for a given set of hex positions regardless of the
//! order hexes were listed in.

use std::collections::{BTreeMap, BTreeSet};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use settler_types::{EdgeId, HexId, NodeId, Resource};
use tracing::debug;

use crate::error::BoardError;

/// Number of ports placed on a generated standard board.
const STANDARD_PORT_COUNT: usize = 9;

/// Number tokens on a standard board, one per producing hex.
const STANDARD_NUMBERS: [u8; 18] = [2, 3, 3, 4, 4, 5, 5, 6, 6, 8, 8, 9, 9, 10, 10, 11, 11, 12];

/// Which of a hex position's two owned corners a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Corner {
    North,
    South,
}

/// Canonical corner coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct VertexKey {
    q: i32,
    r: i32,
    corner: Corner,
}

impl VertexKey {
    const fn new(q: i32, r: i32, corner: Corner) -> Self {
        Self { q, r, corner }
    }

    /// Cartesian position with unit hex size, y pointing down.
    fn point(self) -> (f64, f64) {
        let (cx, cy) = hex_center(self.q, self.r);
        match self.corner {
            Corner::North => (cx, cy - 1.0),
            Corner::South => (cx, cy + 1.0),
        }
    }
}

/// Cartesian centre of a pointy-top hex with unit size.
fn hex_center(q: i32, r: i32) -> (f64, f64) {
    let q = f64::from(q);
    let r = f64::from(r);
    (3.0_f64.sqrt() * (q + r / 2.0), 1.5 * r)
}

/// The six corners of hex `(q, r)` in clockwise order starting at north.
fn corners(q: i32, r: i32) -> [VertexKey; 6] {
    let q_next = q.saturating_add(1);
    let q_prev = q.saturating_sub(1);
    let r_next = r.saturating_add(1);
    let r_prev = r.saturating_sub(1);
    [
        VertexKey::new(q, r, Corner::North),
        VertexKey::new(q_next, r_prev, Corner::South),
        VertexKey::new(q, r_next, Corner::North),
        VertexKey::new(q, r, Corner::South),
        VertexKey::new(q_prev, r_next, Corner::North),
        VertexKey::new(q, r_prev, Corner::South),
    ]
}

/// A harbour letting adjacent players trade with the bank at a better ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Port {
    /// Any resource at 3:1.
    Generic,
    /// One resource at 2:1.
    Specific(Resource),
}

/// Input description of one land hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexSpec {
    /// Axial column.
    pub q: i32,
    /// Axial row.
    pub r: i32,
    /// Produced resource, `None` for desert.
    pub resource: Option<Resource>,
    /// Number token (2..=12, never 7), `None` for desert.
    pub number: Option<u8>,
}

/// A land hex on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexTile {
    /// Identifier.
    pub id: HexId,
    /// Axial column.
    pub q: i32,
    /// Axial row.
    pub r: i32,
    /// Produced resource, `None` for desert.
    pub resource: Option<Resource>,
    /// Number token, `None` for desert.
    pub number: Option<u8>,
}

/// Adjacency of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// Land hexes touching this node (1 to 3).
    pub hexes: Vec<HexId>,
    /// Nodes one edge away.
    pub neighbours: Vec<NodeId>,
    /// Edges ending here.
    pub edges: Vec<EdgeId>,
    /// Port at this node, if any.
    pub port: Option<Port>,
}

/// Adjacency of one edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeInfo {
    /// The two end nodes, lower id first.
    pub ends: (NodeId, NodeId),
    /// Land hexes on either side (1 for a coastal edge, 2 inland).
    pub hexes: Vec<HexId>,
}

impl EdgeInfo {
    /// Whether the edge touches only one land hex.
    pub fn is_coastal(&self) -> bool {
        self.hexes.len() == 1
    }

    /// The end opposite `node`, or `None` if `node` is not an end.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.ends.0 == node {
            Some(self.ends.1)
        } else if self.ends.1 == node {
            Some(self.ends.0)
        } else {
            None
        }
    }
}

/// Immutable board geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    hexes: Vec<HexTile>,
    nodes: Vec<NodeInfo>,
    edges: Vec<EdgeInfo>,
}

impl Layout {
    /// Build a layout from explicit hex descriptions.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::EmptyLayout`] for no hexes,
    /// [`BoardError::DuplicateHex`] for a repeated position, and
    /// [`BoardError::LayoutTooLarge`] if identifiers would overflow.
    pub fn from_specs(specs: &[HexSpec]) -> Result<Self, BoardError> {
        if specs.is_empty() {
            return Err(BoardError::EmptyLayout);
        }

        let mut positions = BTreeSet::new();
        let mut hexes = Vec::with_capacity(specs.len());
        let mut node_hexes: BTreeMap<VertexKey, Vec<HexId>> = BTreeMap::new();
        let mut edge_hexes: BTreeMap<(VertexKey, VertexKey), Vec<HexId>> = BTreeMap::new();

        for (index, spec) in specs.iter().enumerate() {
            if !positions.insert((spec.q, spec.r)) {
                return Err(BoardError::DuplicateHex {
                    q: spec.q,
                    r: spec.r,
                });
            }
            let id = HexId(u8::try_from(index).map_err(|_err| BoardError::LayoutTooLarge)?);
            hexes.push(HexTile {
                id,
                q: spec.q,
                r: spec.r,
                resource: spec.resource,
                number: spec.number,
            });

            let ring = corners(spec.q, spec.r);
            for (a, b) in ring.iter().zip(ring.iter().cycle().skip(1)) {
                node_hexes.entry(*a).or_default().push(id);
                let key = if a < b { (*a, *b) } else { (*b, *a) };
                edge_hexes.entry(key).or_default().push(id);
            }
        }

        let mut node_ids = BTreeMap::new();
        let mut nodes = Vec::with_capacity(node_hexes.len());
        for (index, (key, touching)) in node_hexes.into_iter().enumerate() {
            let id = NodeId(u16::try_from(index).map_err(|_err| BoardError::LayoutTooLarge)?);
            node_ids.insert(key, id);
            nodes.push(NodeInfo {
                hexes: touching,
                neighbours: Vec::new(),
                edges: Vec::new(),
                port: None,
            });
        }

        let mut edges = Vec::with_capacity(edge_hexes.len());
        for (index, ((a, b), touching)) in edge_hexes.into_iter().enumerate() {
            let id = EdgeId(u16::try_from(index).map_err(|_err| BoardError::LayoutTooLarge)?);
            let (Some(&na), Some(&nb)) = (node_ids.get(&a), node_ids.get(&b)) else {
                return Err(BoardError::LayoutTooLarge);
            };
            let ends = if na < nb { (na, nb) } else { (nb, na) };
            for (node, other) in [(ends.0, ends.1), (ends.1, ends.0)] {
                let info = nodes
                    .get_mut(usize::from(node.0))
                    .ok_or(BoardError::UnknownNode(node))?;
                info.edges.push(id);
                info.neighbours.push(other);
            }
            edges.push(EdgeInfo {
                ends,
                hexes: touching,
            });
        }

        Ok(Self {
            hexes,
            nodes,
            edges,
        })
    }

    /// Generate the standard 19-hex board, shuffled by `seed`.
    ///
    /// Terrain and number tokens are shuffled independently; nine ports
    /// (four generic, one per resource) are spread evenly around the coast.
    ///
    /// # Errors
    ///
    /// Propagates [`Layout::from_specs`] errors (none occur for this shape).
    pub fn standard(seed: u64) -> Result<Self, BoardError> {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut terrain: Vec<Option<Resource>> = Vec::with_capacity(19);
        for (resource, count) in [
            (Resource::Wood, 4),
            (Resource::Sheep, 4),
            (Resource::Wheat, 4),
            (Resource::Clay, 3),
            (Resource::Ore, 3),
        ] {
            terrain.extend(std::iter::repeat_n(Some(resource), count));
        }
        terrain.push(None);
        terrain.shuffle(&mut rng);

        let mut numbers = STANDARD_NUMBERS.to_vec();
        numbers.shuffle(&mut rng);
        let mut number_iter = numbers.into_iter();

        let mut specs = Vec::with_capacity(terrain.len());
        let mut terrain_iter = terrain.into_iter();
        for q in -2_i32..=2 {
            for r in -2_i32..=2 {
                if q.saturating_add(r).abs() > 2 {
                    continue;
                }
                let resource = terrain_iter.next().flatten();
                let number = resource.and_then(|_| number_iter.next());
                specs.push(HexSpec {
                    q,
                    r,
                    resource,
                    number,
                });
            }
        }

        let mut layout = Self::from_specs(&specs)?;

        let mut kinds = vec![Port::Generic; 4];
        kinds.extend(Resource::ALL.iter().map(|r| Port::Specific(*r)));
        kinds.shuffle(&mut rng);

        let coast = layout.coastal_edges_by_angle();
        let step = coast
            .len()
            .checked_div(STANDARD_PORT_COUNT)
            .unwrap_or(1)
            .max(1);
        let chosen: Vec<EdgeId> = coast.into_iter().step_by(step).take(STANDARD_PORT_COUNT).collect();
        for (edge, port) in chosen.into_iter().zip(kinds) {
            layout.set_port(edge, port)?;
        }

        debug!(
            seed,
            hexes = layout.hexes.len(),
            nodes = layout.nodes.len(),
            edges = layout.edges.len(),
            "standard layout generated"
        );
        Ok(layout)
    }

    /// Put a port on both end nodes of a coastal edge.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::UnknownEdge`] or [`BoardError::NotCoastal`].
    pub fn set_port(&mut self, edge: EdgeId, port: Port) -> Result<(), BoardError> {
        let info = self.edge(edge).ok_or(BoardError::UnknownEdge(edge))?;
        if !info.is_coastal() {
            return Err(BoardError::NotCoastal(edge));
        }
        let (a, b) = info.ends;
        for node in [a, b] {
            let node_info = self
                .nodes
                .get_mut(usize::from(node.0))
                .ok_or(BoardError::UnknownNode(node))?;
            node_info.port = Some(port);
        }
        Ok(())
    }

    /// Coastal edges ordered by the angle of their midpoint around the
    /// board centre.
    fn coastal_edges_by_angle(&self) -> Vec<EdgeId> {
        let keys = self.vertex_points();
        let mut coast: Vec<(EdgeId, f64)> = self
            .edge_ids()
            .filter_map(|id| {
                let info = self.edge(id)?;
                if !info.is_coastal() {
                    return None;
                }
                let (ax, ay) = keys.get(usize::from(info.ends.0.0)).copied()?;
                let (bx, by) = keys.get(usize::from(info.ends.1.0)).copied()?;
                Some((id, f64::atan2((ay + by) / 2.0, (ax + bx) / 2.0)))
            })
            .collect();
        coast.sort_by(|a, b| a.1.total_cmp(&b.1));
        coast.into_iter().map(|(id, _)| id).collect()
    }

    /// Cartesian positions of all nodes, indexed by node id.
    fn vertex_points(&self) -> Vec<(f64, f64)> {
        let mut keys: BTreeSet<VertexKey> = BTreeSet::new();
        for hex in &self.hexes {
            keys.extend(corners(hex.q, hex.r));
        }
        keys.into_iter().map(VertexKey::point).collect()
    }

    /// Look up a hex.
    pub fn hex(&self, id: HexId) -> Option<&HexTile> {
        self.hexes.get(usize::from(id.0))
    }

    /// Look up a node.
    pub fn node(&self, id: NodeId) -> Option<&NodeInfo> {
        self.nodes.get(usize::from(id.0))
    }

    /// Look up an edge.
    pub fn edge(&self, id: EdgeId) -> Option<&EdgeInfo> {
        self.edges.get(usize::from(id.0))
    }

    /// All hexes in id order.
    pub fn hexes(&self) -> impl Iterator<Item = &HexTile> {
        self.hexes.iter()
    }

    /// All node ids.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).filter_map(|i| u16::try_from(i).ok().map(NodeId))
    }

    /// All edge ids.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edges.len()).filter_map(|i| u16::try_from(i).ok().map(EdgeId))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The desert hex, where the robber starts.
    pub fn desert(&self) -> Option<HexId> {
        self.hexes.iter().find(|h| h.resource.is_none()).map(|h| h.id)
    }

    /// The edge joining two nodes, if they are neighbours.
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.node(a)?
            .edges
            .iter()
            .copied()
            .find(|e| self.edge(*e).is_some_and(|info| info.other_end(a) == Some(b)))
    }

    /// The node ids of every node touching `hex`.
    pub fn nodes_of_hex(&self, hex: HexId) -> Vec<NodeId> {
        self.node_ids()
            .filter(|n| self.node(*n).is_some_and(|info| info.hexes.contains(&hex)))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn single_hex() -> Layout {
        Layout::from_specs(&[HexSpec {
            q: 0,
            r: 0,
            resource: Some(Resource::Clay),
            number: Some(6),
        }])
        .unwrap()
    }

    #[test]
    fn one_hex_has_six_nodes_and_six_edges() {
        let layout = single_hex();
        assert_eq!(layout.node_count(), 6);
        assert_eq!(layout.edge_count(), 6);
        for node in layout.node_ids() {
            assert_eq!(layout.node(node).unwrap().neighbours.len(), 2);
        }
        assert!(layout.edge_ids().all(|e| layout.edge(e).unwrap().is_coastal()));
    }

    #[test]
    fn neighbouring_hexes_share_two_nodes() {
        let layout = Layout::from_specs(&[
            HexSpec { q: 0, r: 0, resource: Some(Resource::Clay), number: Some(6) },
            HexSpec { q: 1, r: 0, resource: Some(Resource::Ore), number: Some(8) },
        ])
        .unwrap();
        assert_eq!(layout.node_count(), 10);
        assert_eq!(layout.edge_count(), 11);
        let shared = layout
            .node_ids()
            .filter(|n| layout.node(*n).unwrap().hexes.len() == 2)
            .count();
        assert_eq!(shared, 2);
    }

    #[test]
    fn standard_board_has_expected_shape() {
        let layout = Layout::standard(7).unwrap();
        assert_eq!(layout.hexes().count(), 19);
        assert_eq!(layout.node_count(), 54);
        assert_eq!(layout.edge_count(), 72);
        assert!(layout.desert().is_some());
        let ports = layout
            .node_ids()
            .filter(|n| layout.node(*n).unwrap().port.is_some())
            .count();
        assert_eq!(ports, 18);
        let numbered = layout.hexes().filter(|h| h.number.is_some()).count();
        assert_eq!(numbered, 18);
    }

    #[test]
    fn standard_board_is_seed_deterministic() {
        assert_eq!(Layout::standard(3).unwrap(), Layout::standard(3).unwrap());
    }

    #[test]
    fn duplicate_positions_are_rejected() {
        let spec = HexSpec { q: 0, r: 0, resource: None, number: None };
        assert!(matches!(
            Layout::from_specs(&[spec, spec]),
            Err(BoardError::DuplicateHex { q: 0, r: 0 })
        ));
    }

    #[test]
    fn edge_between_finds_shared_side() {
        let layout = single_hex();
        let edge = layout.edge(EdgeId(0)).unwrap().clone();
        assert_eq!(layout.edge_between(edge.ends.0, edge.ends.1), Some(EdgeId(0)));
        assert_eq!(layout.nodes_of_hex(HexId(0)).len(), 6);
    }
}
