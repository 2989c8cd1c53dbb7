//! Leaf-confined joins.

use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use super::params::Deadline;
use super::result::{PairSink, TopK};
use super::stats::JoinStats;
use super::threshold::Cutoff;
use crate::graph::search::QueueEntry;
use crate::graph::{Edge, FxIndexMap, NodeId, ReferenceGraph};
use crate::partition::PartitionNode;

/// Candidate sets and limits shared by every leaf of one query.
#[derive(Debug, Clone, Copy)]
pub struct LeafQuery<'q> {
    pub r: &'q FxHashSet<NodeId>,
    pub s: &'q FxHashSet<NodeId>,
    pub k: usize,
    /// Strict upper bound on reported distances.
    pub limit: f32,
}

type Reached = SmallVec<[(NodeId, f32); 4]>;

/// For each border node, the sources that reached it and their leaf-local
/// distances, sorted by distance.
#[derive(Debug, Clone, Default)]
pub struct BorderDistances {
    by_node: FxIndexMap<NodeId, Reached>,
}

impl BorderDistances {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, border: NodeId, source: NodeId, dist: f32) {
        self.by_node.entry(border).or_default().push((source, dist));
    }

    /// Sources that reached `border`, closest first.
    pub fn get(&self, border: NodeId) -> Option<&[(NodeId, f32)]> {
        self.by_node.get(&border).map(SmallVec::as_slice)
    }

    /// Smallest recorded distance to `border`.
    pub fn min_at(&self, border: NodeId) -> Option<f32> {
        self.get(border).and_then(|reached| reached.first()).map(|&(_, d)| d)
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[(NodeId, f32)])> + '_ {
        self.by_node.iter().map(|(&n, reached)| (n, reached.as_slice()))
    }

    /// Absorb another leaf's border records.
    pub fn merge(&mut self, other: Self) {
        for (node, reached) in other.by_node {
            let entry = self.by_node.entry(node).or_default();
            entry.extend(reached);
            sort_reached(entry);
        }
    }

    fn finish(&mut self) {
        self.by_node.values_mut().for_each(sort_reached);
    }
}

fn sort_reached(reached: &mut Reached) {
    reached.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
}

/// Result of one leaf join besides the pairs handed to the sink.
#[derive(Debug, Default)]
pub struct LeafOutcome {
    pub border: BorderDistances,
    pub stats: JoinStats,
    pub complete: bool,
}

/// Runs Dijkstra from every source in a leaf without following any edge
/// that leaves the leaf.
pub struct LeafJoinEngine<'g, G> {
    graph: &'g G,
}

impl<'g, G: ReferenceGraph> LeafJoinEngine<'g, G> {
    pub const fn new(graph: &'g G) -> Self {
        Self { graph }
    }

    /// Join `leaf` against the query, flushing each source's local top-K
    /// into `sink`.
    pub fn join<S: PairSink>(
        &self,
        leaf: &PartitionNode,
        query: &LeafQuery<'_>,
        sink: &mut S,
        deadline: &Deadline,
    ) -> LeafOutcome {
        let mut outcome = LeafOutcome {
            complete: true,
            ..LeafOutcome::default()
        };
        if deadline.expired() {
            outcome.complete = false;
            return outcome;
        }
        outcome.stats.leaves_joined = 1;

        for source in sources(leaf, query.r) {
            if deadline.expired() {
                outcome.complete = false;
                break;
            }
            let local = self.search_from(source, leaf, query, sink, &mut outcome);
            let pairs = local.into_sorted_vec();
            outcome.stats.pairs_offered += pairs.len();
            sink.offer_batch(&pairs);
        }
        outcome.border.finish();

        tracing::debug!(
            "Leaf of {} vertices joined: {} border nodes, {} pairs offered",
            leaf.vertices().len(),
            outcome.border.len(),
            outcome.stats.pairs_offered
        );
        outcome
    }

    fn search_from<S: PairSink>(
        &self,
        source: NodeId,
        leaf: &PartitionNode,
        query: &LeafQuery<'_>,
        sink: &S,
        outcome: &mut LeafOutcome,
    ) -> TopK {
        let mut local = TopK::new(query.k);
        let mut settled: FxHashMap<NodeId, f32> = FxHashMap::default();
        let mut best: FxHashMap<NodeId, f32> = FxHashMap::default();
        let mut heap = BinaryHeap::new();
        best.insert(source, 0.0);
        heap.push(QueueEntry::new(0.0, source));
        outcome.stats.sources_expanded += 1;

        while let Some(QueueEntry { dist, node }) = heap.pop() {
            let cutoff = Cutoff::new(query.limit, sink.kth().min(local.bound()));
            if cutoff.excludes(dist) {
                break;
            }
            if settled.contains_key(&node) {
                continue;
            }
            settled.insert(node, dist);

            if node != source && query.s.contains(&node) {
                local.offer(Edge::new(source, node, dist));
            }

            let mut on_border = false;
            for link in self.graph.outgoing(node) {
                if !leaf.contains(link.node) {
                    on_border = true;
                    continue;
                }
                let next = dist + link.weight;
                if cutoff.excludes(next) || settled.contains_key(&link.node) {
                    continue;
                }
                let slot = best.entry(link.node).or_insert(f32::INFINITY);
                if next < *slot {
                    *slot = next;
                    heap.push(QueueEntry::new(next, link.node));
                }
            }
            if on_border {
                outcome.border.record(node, source, dist);
            }
            outcome.stats.observe(heap.len(), settled.len());
        }
        local
    }
}

/// Members of both the leaf and `r`, iterating whichever is smaller.
fn sources(leaf: &PartitionNode, r: &FxHashSet<NodeId>) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = if leaf.vertices().len() <= r.len() {
        leaf.vertices().ids().filter(|v| r.contains(v)).collect()
    } else {
        r.iter().copied().filter(|&v| leaf.contains(v)).collect()
    };
    out.sort_unstable();
    out
}
