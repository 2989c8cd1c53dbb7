//! Partition tree nodes.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::graph::{Edge, NodeId, ReferenceGraph};
use crate::spatial::SpatialIndex;

/// Node in a binary partition tree over the reference graph.
///
/// Leaves own disjoint vertex sets whose union is the indexed vertex set.
/// Internal nodes own both subtrees and keep an empty vertex set. Every
/// node carries the cross-edges separating it from the rest of the graph,
/// sorted by ascending weight.
#[derive(Clone, Debug)]
pub struct PartitionNode {
    pub(crate) left: Option<Box<PartitionNode>>,
    pub(crate) right: Option<Box<PartitionNode>>,
    pub(crate) vertices: SpatialIndex,
    pub(crate) crossedges: Vec<Edge>,
    pub(crate) separation_degree: f32,
    pub(crate) hierarchy_size: usize,
}

impl PartitionNode {
    /// A single leaf holding `vertices`, with no cross-edges.
    pub fn leaf(vertices: SpatialIndex) -> Self {
        Self::with_edges(vertices, Vec::new(), f32::INFINITY)
    }

    pub(crate) fn with_edges(
        vertices: SpatialIndex,
        mut crossedges: Vec<Edge>,
        separation_degree: f32,
    ) -> Self {
        crossedges.sort_by(Edge::cmp_by_weight);
        Self {
            left: None,
            right: None,
            vertices,
            crossedges,
            separation_degree,
            hierarchy_size: 1,
        }
    }

    pub(crate) fn attach(&mut self, left: Self, right: Self) {
        self.hierarchy_size = 1 + left.hierarchy_size + right.hierarchy_size;
        self.left = Some(Box::new(left));
        self.right = Some(Box::new(right));
    }

    pub const fn is_leaf(&self) -> bool {
        self.left.is_none()
    }

    pub fn children(&self) -> Option<(&Self, &Self)> {
        match (self.left.as_deref(), self.right.as_deref()) {
            (Some(l), Some(r)) => Some((l, r)),
            _ => None,
        }
    }

    pub const fn vertices(&self) -> &SpatialIndex {
        &self.vertices
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        self.vertices.contains(node)
    }

    /// Cross-edges in non-decreasing weight order.
    pub fn crossedges(&self) -> &[Edge] {
        &self.crossedges
    }

    /// Minimum cross-edge weight found when this node was split off its
    /// parent; infinite for the root.
    pub const fn separation_degree(&self) -> f32 {
        self.separation_degree
    }

    /// Number of tree nodes in this subtree, this node included.
    pub const fn hierarchy_size(&self) -> usize {
        self.hierarchy_size
    }

    /// Leaves in breadth-first order.
    pub fn leaves(&self) -> Vec<&Self> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([self]);
        while let Some(node) = queue.pop_front() {
            match node.children() {
                Some((l, r)) => {
                    queue.push_back(l);
                    queue.push_back(r);
                }
                None => out.push(node),
            }
        }
        out
    }

    pub fn depth(&self) -> usize {
        match self.children() {
            Some((l, r)) => 1 + l.depth().max(r.depth()),
            None => 0,
        }
    }

    /// Cross-edges of a leaf that start inside it and end outside it.
    pub fn leaving_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.crossedges
            .iter()
            .filter(|e| self.contains(e.from) && !self.contains(e.to))
    }

    /// Cross-edges created by this node's own split: present in a child but
    /// not inherited from this node. Sorted by ascending weight.
    pub fn split_edges(&self) -> Vec<Edge> {
        let Some((left, right)) = self.children() else {
            return Vec::new();
        };
        let inherited: FxHashSet<Edge> = self.crossedges.iter().copied().collect();
        let mut own: Vec<Edge> = left
            .crossedges
            .iter()
            .chain(&right.crossedges)
            .filter(|e| !inherited.contains(e))
            .copied()
            .collect();
        own.sort_by(Edge::cmp_by_weight);
        own
    }
}

/// A partition tree together with the graph it was built over.
#[derive(Debug)]
pub struct PartitionTree<G> {
    graph: Arc<G>,
    root: PartitionNode,
}

impl<G> Clone for PartitionTree<G> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            root: self.root.clone(),
        }
    }
}

impl<G: ReferenceGraph> PartitionTree<G> {
    pub fn new(graph: Arc<G>, root: PartitionNode) -> Self {
        Self { graph, root }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn shared_graph(&self) -> Arc<G> {
        Arc::clone(&self.graph)
    }

    pub const fn root(&self) -> &PartitionNode {
        &self.root
    }

    /// Total number of tree nodes.
    pub const fn partition_size(&self) -> usize {
        self.root.hierarchy_size
    }

    pub fn leaf_count(&self) -> usize {
        self.root.leaves().len()
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    /// Leaf owning `node`, if the node was indexed.
    pub fn leaf_of(&self, node: NodeId) -> Option<&PartitionNode> {
        self.root.leaves().into_iter().find(|leaf| leaf.contains(node))
    }
}
