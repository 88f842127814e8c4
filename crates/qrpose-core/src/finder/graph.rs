//! Pattern graph: pooled square nodes and the connections between them.
//!
//! Nodes and edges are addressed by index handles. Node storage is cleared
//! (capacity retained) at the start of each detection cycle; edges live in
//! a slab with tombstones so a better connection can displace a worse one
//! without invalidating handles.

use serde::{Deserialize, Serialize};

use crate::geometry;

pub type NodeId = usize;
pub type EdgeId = usize;

/// Generic graph-node geometry for a detected quadrilateral.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquareNode {
    /// Corner points with consistent winding.
    pub square: [[f64; 2]; 4],
    /// Intersection of the two diagonals; the geometric center under
    /// projective distortion.
    pub center: [f64; 2],
    /// Length of side i, from corner i to corner (i + 1) mod 4.
    pub side_lengths: [f64; 4],
    pub largest_side: f64,
    pub smallest_side: f64,
    /// Edge handle per side; at most one connection per side.
    #[serde(skip)]
    pub(crate) edges: [Option<EdgeId>; 4],
}

impl SquareNode {
    /// Build node geometry from corners and a precomputed center.
    pub(crate) fn from_square(square: [[f64; 2]; 4], center: [f64; 2]) -> Self {
        let side_lengths: [f64; 4] =
            std::array::from_fn(|i| geometry::distance(square[i], square[(i + 1) % 4]));
        let largest_side = side_lengths.iter().fold(0.0f64, |m, &l| m.max(l));
        let smallest_side = side_lengths.iter().fold(f64::INFINITY, |m, &l| m.min(l));
        Self {
            square,
            center,
            side_lengths,
            largest_side,
            smallest_side,
            edges: [None; 4],
        }
    }

    /// Direction of side i (not normalized).
    fn side_direction(&self, side: usize) -> [f64; 2] {
        let a = self.square[side];
        let b = self.square[(side + 1) % 4];
        [b[0] - a[0], b[1] - a[1]]
    }
}

/// A square that passed the position-pattern appearance check.
///
/// Composition of the generic node geometry with the detection payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSquare {
    pub node: SquareNode,
    /// Binary classification boundary used by the appearance check: mean of
    /// the inside and outside edge intensities.
    pub gray_threshold: f64,
}

/// A recorded connection between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub a: NodeId,
    pub b: NodeId,
    /// Side of `a` the connection passes through.
    pub side_a: usize,
    /// Side of `b` the connection passes through.
    pub side_b: usize,
    /// Squared center distance; usable for pruning or ranking downstream.
    pub distance_sq: f64,
}

/// Graph of position-pattern candidates, rebuilt every detection cycle.
#[derive(Debug, Default)]
pub struct PatternGraph {
    nodes: Vec<PositionSquare>,
    edges: Vec<Option<Connection>>,
}

/// Serialization-friendly flattened view of a [`PatternGraph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<PositionSquare>,
    pub connections: Vec<Connection>,
}

impl PatternGraph {
    pub fn nodes(&self) -> &[PositionSquare] {
        &self.nodes
    }

    /// Live connections (detached slots are skipped).
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.edges.iter().filter_map(|e| e.as_ref())
    }

    pub fn n_connections(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }

    pub fn export(&self) -> GraphExport {
        GraphExport {
            nodes: self.nodes.clone(),
            connections: self.connections().copied().collect(),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    pub(crate) fn add_node(&mut self, square: PositionSquare) -> NodeId {
        self.nodes.push(square);
        self.nodes.len() - 1
    }

    /// Which side of `node` the segment `a→b` crosses, and where.
    pub(crate) fn find_side_intersect(
        &self,
        node: NodeId,
        a: [f64; 2],
        b: [f64; 2],
    ) -> Option<(usize, [f64; 2])> {
        let quad = &self.nodes[node].node.square;
        for i in 0..4 {
            let j = (i + 1) % 4;
            if let Some(p) = geometry::segment_intersection(a, b, quad[i], quad[j]) {
                return Some((i, p));
            }
        }
        None
    }

    /// Whether side `side_a` of `a` and side `side_b` of `b` are mutually
    /// the most-parallel pairing: neither side paired with one of the other
    /// square's adjacent sides may be closer to parallel. Perspective
    /// distortion bends the angles but preserves this ordering for genuine
    /// neighbor connections.
    pub(crate) fn mutually_most_parallel(
        &self,
        a: NodeId,
        side_a: usize,
        b: NodeId,
        side_b: usize,
    ) -> bool {
        let na = &self.nodes[a].node;
        let nb = &self.nodes[b].node;
        let selected = geometry::acute_angle(na.side_direction(side_a), nb.side_direction(side_b));
        for delta in [1usize, 3] {
            let shifted_a = geometry::acute_angle(
                na.side_direction((side_a + delta) % 4),
                nb.side_direction(side_b),
            );
            let shifted_b = geometry::acute_angle(
                na.side_direction(side_a),
                nb.side_direction((side_b + delta) % 4),
            );
            if shifted_a < selected || shifted_b < selected {
                return false;
            }
        }
        true
    }

    /// Record a connection, keeping at most one edge per side and
    /// preferring shorter connections.
    ///
    /// If a side already holds a longer edge, that edge is detached first;
    /// the new edge is created only when both sides end up free. Evaluating
    /// the same pair twice is therefore harmless.
    pub(crate) fn check_connect(
        &mut self,
        a: NodeId,
        side_a: usize,
        b: NodeId,
        side_b: usize,
        distance_sq: f64,
    ) {
        if let Some(eid) = self.nodes[a].node.edges[side_a] {
            if self.edges[eid].map_or(true, |c| c.distance_sq > distance_sq) {
                self.detach(eid);
            }
        }
        if let Some(eid) = self.nodes[b].node.edges[side_b] {
            if self.edges[eid].map_or(true, |c| c.distance_sq > distance_sq) {
                self.detach(eid);
            }
        }
        if self.nodes[a].node.edges[side_a].is_none() && self.nodes[b].node.edges[side_b].is_none()
        {
            let eid = self.edges.len();
            self.edges.push(Some(Connection {
                a,
                b,
                side_a,
                side_b,
                distance_sq,
            }));
            self.nodes[a].node.edges[side_a] = Some(eid);
            self.nodes[b].node.edges[side_b] = Some(eid);
        }
    }

    fn detach(&mut self, edge: EdgeId) {
        if let Some(conn) = self.edges[edge].take() {
            self.nodes[conn.a].node.edges[conn.side_a] = None;
            self.nodes[conn.b].node.edges[conn.side_b] = None;
        }
    }
}
