//! Partition tree construction by balanced competitive growth.
//!
//! Leaves are split in order of spatial spread. Each split grows two
//! clusters from the extreme vertices of the leaf's most-spread axis, always
//! extending whichever cluster has the cheaper size-normalized frontier edge.
//! Edges found between the clusters become cross-edges of the side that
//! discovered them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use itertools::Itertools;
use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use super::node::{PartitionNode, PartitionTree};
use crate::error::{JoinError, Result};
use crate::graph::{Edge, NodeId, ReferenceGraph};
use crate::spatial::SpatialIndex;

/// Parameters for partition tree construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildParams {
    /// Approximate number of leaves. The builder stops early when no leaf
    /// with two or more vertices remains.
    pub leaf_count: usize,

    /// Size-balance smoothing in [0, 1]. 0 grows by raw edge weight only,
    /// 1 fully penalizes the larger cluster.
    pub alpha: f64,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            leaf_count: 16,
            alpha: 0.5,
        }
    }
}

impl BuildParams {
    pub const fn new(leaf_count: usize, alpha: f64) -> Self {
        Self { leaf_count, alpha }
    }

    pub fn validate(&self) -> Result<()> {
        if self.leaf_count < 1 {
            return Err(JoinError::invalid("leaf count must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(JoinError::invalid(format!(
                "alpha must be within [0, 1], got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Leaf awaiting a split, ordered by spread then size.
#[derive(Debug)]
struct SplitCandidate {
    spread: OrderedFloat<f64>,
    size: usize,
    slot: usize,
}

impl PartialEq for SplitCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for SplitCandidate {}

impl PartialOrd for SplitCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SplitCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap on spread and size; earlier slots first on ties
        self.spread
            .cmp(&other.spread)
            .then(self.size.cmp(&other.size))
            .then(other.slot.cmp(&self.slot))
    }
}

/// Edge on a cluster frontier. Reversed for min-heap behaviour.
#[derive(Debug, Clone, Copy)]
struct FrontierEdge(Edge);

impl PartialEq for FrontierEdge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for FrontierEdge {}

impl PartialOrd for FrontierEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp_by_weight(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Lo,
    Hi,
}

impl Side {
    const fn idx(self) -> usize {
        match self {
            Self::Lo => 0,
            Self::Hi => 1,
        }
    }

    const fn other(self) -> Self {
        match self {
            Self::Lo => Self::Hi,
            Self::Hi => Self::Lo,
        }
    }
}

#[derive(Default)]
struct Cluster {
    size: usize,
    frontier: BinaryHeap<FrontierEdge>,
    crossedges: Vec<Edge>,
}

/// Result of splitting one leaf.
struct Split {
    lo: SpatialIndex,
    hi: SpatialIndex,
    lo_edges: Vec<Edge>,
    hi_edges: Vec<Edge>,
    separation: f32,
}

/// Two-cluster growth state over one leaf's vertices.
struct Growth<'a, G> {
    graph: &'a G,
    vertices: &'a SpatialIndex,
    alpha: f64,
    clusters: [Cluster; 2],
    owner: FxHashMap<NodeId, Side>,
    separation: f32,
}

impl<'a, G: ReferenceGraph> Growth<'a, G> {
    fn new(graph: &'a G, vertices: &'a SpatialIndex, alpha: f64) -> Self {
        Self {
            graph,
            vertices,
            alpha,
            clusters: [Cluster::default(), Cluster::default()],
            owner: FxHashMap::default(),
            separation: f32::INFINITY,
        }
    }

    fn assign(&mut self, node: NodeId, side: Side) {
        self.owner.insert(node, side);
        let cluster = &mut self.clusters[side.idx()];
        cluster.size += 1;
        for link in self.graph.outgoing(node) {
            if self.vertices.contains(link.node) {
                cluster
                    .frontier
                    .push(FrontierEdge(Edge::new(node, link.node, link.weight)));
            }
        }
    }

    /// size(self) * weight / (size(self) + alpha * size(other))
    fn normalized_cost(&self, side: Side, weight: f32) -> f64 {
        let own = self.clusters[side.idx()].size as f64;
        let other = self.clusters[side.other().idx()].size as f64;
        own * f64::from(weight) / (own + self.alpha * other)
    }

    fn next_side(&self) -> Option<Side> {
        let lo = self.clusters[0].frontier.peek();
        let hi = self.clusters[1].frontier.peek();
        match (lo, hi) {
            (None, None) => None,
            (Some(_), None) => Some(Side::Lo),
            (None, Some(_)) => Some(Side::Hi),
            (Some(a), Some(b)) => {
                let ca = self.normalized_cost(Side::Lo, a.0.weight);
                let cb = self.normalized_cost(Side::Hi, b.0.weight);
                Some(if ca <= cb { Side::Lo } else { Side::Hi })
            }
        }
    }

    fn smaller_side(&self) -> Side {
        if self.clusters[1].size < self.clusters[0].size {
            Side::Hi
        } else {
            Side::Lo
        }
    }

    fn run(mut self, seeds: (NodeId, NodeId)) -> Split {
        self.assign(seeds.0, Side::Lo);
        self.assign(seeds.1, Side::Hi);

        // Vertices unreachable from either seed are reseeded into the smaller
        // cluster in index order once both frontiers run dry.
        let vertices = self.vertices;
        let mut pending = vertices.ids();
        loop {
            let Some(side) = self.next_side() else {
                match pending.find(|v| !self.owner.contains_key(v)) {
                    Some(v) => {
                        let side = self.smaller_side();
                        self.assign(v, side);
                        continue;
                    }
                    None => break,
                }
            };
            let Some(FrontierEdge(edge)) = self.clusters[side.idx()].frontier.pop() else {
                continue;
            };
            match self.owner.get(&edge.to).copied() {
                None => self.assign(edge.to, side),
                Some(owner) if owner == side => {}
                Some(_) => {
                    self.separation = self.separation.min(edge.weight);
                    self.clusters[side.idx()].crossedges.push(edge);
                }
            }
        }

        let (lo, hi): (Vec<_>, Vec<_>) = self
            .vertices
            .iter()
            .partition(|(id, _)| self.owner.get(id) == Some(&Side::Lo));
        let [lo_cluster, hi_cluster] = self.clusters;
        Split {
            lo: SpatialIndex::from_points(lo),
            hi: SpatialIndex::from_points(hi),
            lo_edges: lo_cluster.crossedges,
            hi_edges: hi_cluster.crossedges,
            separation: self.separation,
        }
    }
}

/// Arena slot used while the tree is being grown.
struct BuildSlot {
    node: PartitionNode,
    children: Option<(usize, usize)>,
}

/// Merge inherited (sorted) cross-edges with a split's own edges.
fn merge_crossedges(inherited: &[Edge], mut own: Vec<Edge>) -> Vec<Edge> {
    own.sort_by(Edge::cmp_by_weight);
    inherited
        .iter()
        .copied()
        .merge_by(own, |a, b| a.cmp_by_weight(b) != Ordering::Greater)
        .collect()
}

pub struct PartitionTreeBuilder {
    params: BuildParams,
}

impl PartitionTreeBuilder {
    pub const fn new(params: BuildParams) -> Self {
        Self { params }
    }

    pub const fn params(&self) -> &BuildParams {
        &self.params
    }

    /// Build a tree of about `leaf_count` leaves over every indexed vertex.
    ///
    /// Every graph node must have coordinates in `index`.
    pub fn build<G: ReferenceGraph>(
        &self,
        graph: Arc<G>,
        index: &SpatialIndex,
    ) -> Result<PartitionTree<G>> {
        self.params.validate()?;
        if let Some(node) = graph.nodes().find(|&n| !index.contains(n)) {
            return Err(JoinError::UnknownNode(node));
        }

        let mut arena = vec![BuildSlot {
            node: PartitionNode::leaf(index.clone()),
            children: None,
        }];
        let mut heap = BinaryHeap::new();
        heap.push(SplitCandidate {
            spread: OrderedFloat(index.spread()),
            size: index.len(),
            slot: 0,
        });

        let mut splits = 0;
        while splits + 1 < self.params.leaf_count {
            let Some(candidate) = heap.pop() else {
                break;
            };
            if candidate.size < 2 {
                continue;
            }
            let split = self.split(&*graph, &arena[candidate.slot].node)?;
            let parent = &mut arena[candidate.slot].node;
            let vertices = std::mem::take(&mut parent.vertices);

            tracing::debug!(
                "Split partition of {} vertices into {}/{} ({} + {} cross-edges, separation {})",
                vertices.len(),
                split.lo.len(),
                split.hi.len(),
                split.lo_edges.len(),
                split.hi_edges.len(),
                split.separation
            );

            let inherited = parent.crossedges.clone();
            let lo = PartitionNode {
                crossedges: merge_crossedges(&inherited, split.lo_edges),
                ..PartitionNode::leaf(split.lo)
            };
            let hi = PartitionNode {
                crossedges: merge_crossedges(&inherited, split.hi_edges),
                ..PartitionNode::leaf(split.hi)
            };
            let mut slot_ids = [0; 2];
            for (i, mut child) in [lo, hi].into_iter().enumerate() {
                child.separation_degree = split.separation;
                let slot = arena.len();
                heap.push(SplitCandidate {
                    spread: OrderedFloat(child.vertices.spread()),
                    size: child.vertices.len(),
                    slot,
                });
                arena.push(BuildSlot {
                    node: child,
                    children: None,
                });
                slot_ids[i] = slot;
            }
            arena[candidate.slot].children = Some((slot_ids[0], slot_ids[1]));
            splits += 1;
        }

        let root = assemble(&mut arena.into_iter().map(Some).collect::<Vec<_>>(), 0);
        tracing::info!(
            "Built partition tree: {} leaves, {} nodes, depth {}",
            splits + 1,
            root.hierarchy_size,
            root.depth()
        );
        Ok(PartitionTree::new(graph, root))
    }

    fn split<G: ReferenceGraph>(&self, graph: &G, leaf: &PartitionNode) -> Result<Split> {
        let vertices = &leaf.vertices;
        let axis = vertices.spread_axis();
        let (lo, hi) = vertices
            .extreme_points(axis)
            .ok_or_else(|| JoinError::invalid("cannot split an empty partition"))?;
        if lo == hi {
            return Err(JoinError::SeedCollision { vertex: lo });
        }
        Ok(Growth::new(graph, vertices, self.params.alpha).run((lo, hi)))
    }
}

fn assemble(arena: &mut [Option<BuildSlot>], slot: usize) -> PartitionNode {
    let Some(BuildSlot { mut node, children }) = arena[slot].take() else {
        unreachable!("partition slot {slot} assembled twice");
    };
    if let Some((l, r)) = children {
        let left = assemble(arena, l);
        let right = assemble(arena, r);
        node.attach(left, right);
    }
    node
}
