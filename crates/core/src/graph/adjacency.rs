//! Adjacency-list graph.

use super::{Edge, FxIndexMap, Link, NodeId, ReferenceGraph};
use crate::error::{JoinError, Result};

#[derive(Clone, Debug, Default)]
struct Adjacency {
    outgoing: Vec<Link>,
    incoming: Vec<Link>,
}

/// In-memory weighted graph keyed by external node id.
///
/// Undirected graphs store every edge in both directions, so `outgoing` and
/// `incoming` enumerate the same neighbours.
#[derive(Clone, Debug)]
pub struct AdjacencyGraph {
    directed: bool,
    nodes: FxIndexMap<NodeId, Adjacency>,
    edge_count: usize,
}

impl AdjacencyGraph {
    pub fn new_directed() -> Self {
        Self::new(true)
    }

    pub fn new_undirected() -> Self {
        Self::new(false)
    }

    fn new(directed: bool) -> Self {
        Self {
            directed,
            nodes: FxIndexMap::default(),
            edge_count: 0,
        }
    }

    pub const fn is_directed(&self) -> bool {
        self.directed
    }

    /// Number of edges as added (an undirected edge counts once).
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Register an isolated node. Adding an existing node is a no-op.
    pub fn add_node(&mut self, node: NodeId) {
        self.nodes.entry(node).or_default();
    }

    /// Add a weighted edge. Weights must be finite and non-negative.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, weight: f32) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(JoinError::invalid(format!(
                "edge {from}->{to} has weight {weight}; weights must be finite and non-negative"
            )));
        }
        self.link(from, to, weight);
        if !self.directed {
            self.link(to, from, weight);
        }
        self.edge_count += 1;
        Ok(())
    }

    fn link(&mut self, from: NodeId, to: NodeId, weight: f32) {
        self.nodes.entry(from).or_default().outgoing.push(Link { node: to, weight });
        self.nodes.entry(to).or_default().incoming.push(Link {
            node: from,
            weight,
        });
    }

    /// Every stored directed edge, in node insertion order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.nodes.iter().flat_map(|(&from, adj)| {
            adj.outgoing
                .iter()
                .map(move |link| Edge::new(from, link.node, link.weight))
        })
    }
}

impl ReferenceGraph for AdjacencyGraph {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    fn outgoing(&self, node: NodeId) -> &[Link] {
        self.nodes
            .get(&node)
            .map(|adj| adj.outgoing.as_slice())
            .unwrap_or(&[])
    }

    fn incoming(&self, node: NodeId) -> &[Link] {
        self.nodes
            .get(&node)
            .map(|adj| adj.incoming.as_slice())
            .unwrap_or(&[])
    }
}
