//! Weighted reference graph consumed by the partitioner and the joins.
//!
//! - `ReferenceGraph` - edge enumeration and path-cost oracle
//! - `AdjacencyGraph` - in-memory directed/undirected implementation
//! - `search` - bounded Dijkstra shared by the graph and the join engines
//! - `io` - whitespace-separated edge list and coordinate loaders

mod adjacency;
pub mod io;
pub(crate) mod search;

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use rustc_hash::FxBuildHasher;

pub use adjacency::AdjacencyGraph;
pub use search::distances_from;

/// External node identifier.
pub type NodeId = u64;

/// Insertion-ordered map with the Fx hasher.
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// One adjacency entry: the node at the other end and the edge weight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Link {
    pub node: NodeId,
    pub weight: f32,
}

/// A weighted edge `from -> to`.
///
/// Identity is the endpoint pair; the weight is payload. Result pairs
/// `(r, s, distance)` are carried as edges as well.
#[derive(Clone, Copy, Debug)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f32,
}

impl Edge {
    pub const fn new(from: NodeId, to: NodeId, weight: f32) -> Self {
        Self { from, to, weight }
    }

    pub const fn endpoints(&self) -> (NodeId, NodeId) {
        (self.from, self.to)
    }

    /// Total order by weight, then endpoints.
    pub fn cmp_by_weight(&self, other: &Self) -> Ordering {
        OrderedFloat(self.weight)
            .cmp(&OrderedFloat(other.weight))
            .then(self.from.cmp(&other.from))
            .then(self.to.cmp(&other.to))
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.endpoints() == other.endpoints()
    }
}
impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.endpoints().hash(state);
    }
}

/// Read-only weighted graph.
///
/// Implementations must be shareable across worker threads; the join never
/// mutates the graph.
pub trait ReferenceGraph: Send + Sync {
    fn node_count(&self) -> usize;

    fn contains(&self, node: NodeId) -> bool;

    fn nodes(&self) -> impl Iterator<Item = NodeId> + '_;

    /// Edges leaving `node`. Unknown nodes have none.
    fn outgoing(&self, node: NodeId) -> &[Link];

    /// Edges entering `node`, with `Link::node` set to the edge source.
    fn incoming(&self, node: NodeId) -> &[Link];

    /// Shortest path cost `from -> to`, or None if unreachable.
    fn path_cost(&self, from: NodeId, to: NodeId) -> Option<f32>
    where
        Self: Sized,
    {
        search::path_cost(self, from, to)
    }
}
