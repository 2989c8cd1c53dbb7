//! Expansion across a partition boundary.
//!
//! A pair whose shortest path leaves the source's leaf can be split at the
//! first leaving edge `u -> v`: the leaf-local distance from the source to
//! `u`, the edge, and an unrestricted shortest path from `v` to the target.
//! Leaf joins supply the first part; the expander supplies the rest.

use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};

use super::params::Deadline;
use super::result::TopK;
use super::stats::JoinStats;
use super::threshold::{Cutoff, GlobalThreshold};
use crate::graph::search::QueueEntry;
use crate::graph::{Edge, NodeId, ReferenceGraph};

/// Settled nodes between deadline checks.
const DEADLINE_STRIDE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// From `v` along outgoing edges, looking for targets.
    Forward,
    /// From `u` along incoming edges, looking for sources.
    Backward,
}

/// Candidates found through one cross-edge.
#[derive(Debug, Default)]
pub struct Expansion {
    /// Ascending, at most `k` pairs.
    pub candidates: Vec<Edge>,
    pub complete: bool,
    pub stats: JoinStats,
}

pub struct CrossBoundaryExpander<'g, G> {
    graph: &'g G,
    limit: f32,
}

impl<'g, G: ReferenceGraph> CrossBoundaryExpander<'g, G> {
    /// `limit` is the caller's strict distance bound.
    pub const fn new(graph: &'g G, limit: f32) -> Self {
        Self { graph, limit }
    }

    /// Pairs `(r, s)` reaching `s` through `edge = u -> v`.
    ///
    /// `inside` holds `(r, dist(r, u))`, closest first. The search runs from
    /// `v` over the whole graph except `u`, stopping once the cheapest
    /// possible total exceeds the tighter of `threshold` and the local K-th
    /// best.
    pub fn expand(
        &self,
        edge: &Edge,
        inside: &[(NodeId, f32)],
        targets: &FxHashSet<NodeId>,
        k: usize,
        threshold: &GlobalThreshold,
        deadline: &Deadline,
    ) -> Expansion {
        self.search(Direction::Forward, edge, inside, targets, k, threshold, deadline)
    }

    /// Mirror of [`expand`](Self::expand): `inside` holds `(s, dist(v, s))`
    /// and the search walks incoming edges from `u`, skipping `v`, looking
    /// for members of `sources`.
    ///
    /// The orchestrator only expands forward from source leaves. This is for
    /// callers that hold distances on the target side of an edge instead.
    pub fn expand_backward(
        &self,
        edge: &Edge,
        inside: &[(NodeId, f32)],
        sources: &FxHashSet<NodeId>,
        k: usize,
        threshold: &GlobalThreshold,
        deadline: &Deadline,
    ) -> Expansion {
        self.search(Direction::Backward, edge, inside, sources, k, threshold, deadline)
    }

    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        direction: Direction,
        edge: &Edge,
        inside: &[(NodeId, f32)],
        wanted: &FxHashSet<NodeId>,
        k: usize,
        threshold: &GlobalThreshold,
        deadline: &Deadline,
    ) -> Expansion {
        let mut out = Expansion {
            complete: true,
            ..Expansion::default()
        };
        let Some(&(_, nearest)) = inside.first() else {
            return out;
        };
        out.stats.cross_edges_expanded = 1;

        let (start, skip) = match direction {
            Direction::Forward => (edge.to, edge.from),
            Direction::Backward => (edge.from, edge.to),
        };
        let base = nearest + edge.weight;
        let mut local = TopK::new(k);
        let mut settled: FxHashMap<NodeId, f32> = FxHashMap::default();
        let mut best: FxHashMap<NodeId, f32> = FxHashMap::default();
        let mut heap = BinaryHeap::new();
        best.insert(start, 0.0);
        heap.push(QueueEntry::new(0.0, start));

        while let Some(QueueEntry { dist, node }) = heap.pop() {
            let cutoff = Cutoff::new(self.limit, threshold.current().min(local.bound()));
            if cutoff.excludes(base + dist) {
                break;
            }
            if settled.contains_key(&node) {
                continue;
            }
            if settled.len() % DEADLINE_STRIDE == 0 && deadline.expired() {
                out.complete = false;
                break;
            }
            settled.insert(node, dist);

            if wanted.contains(&node) {
                for &(member, d) in inside {
                    let total = d + edge.weight + dist;
                    if cutoff.excludes(total) {
                        break;
                    }
                    let pair = match direction {
                        Direction::Forward => Edge::new(member, node, total),
                        Direction::Backward => Edge::new(node, member, total),
                    };
                    local.offer(pair);
                }
            }

            let links = match direction {
                Direction::Forward => self.graph.outgoing(node),
                Direction::Backward => self.graph.incoming(node),
            };
            for link in links {
                if link.node == skip || settled.contains_key(&link.node) {
                    continue;
                }
                let next = dist + link.weight;
                if cutoff.excludes(base + next) {
                    continue;
                }
                let slot = best.entry(link.node).or_insert(f32::INFINITY);
                if next < *slot {
                    *slot = next;
                    heap.push(QueueEntry::new(next, link.node));
                }
            }
            out.stats.observe(heap.len(), settled.len());
        }

        out.candidates = local.into_sorted_vec();
        out.stats.pairs_offered = out.candidates.len();
        out
    }
}
