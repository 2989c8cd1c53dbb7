//! Query driver: schedules leaf joins and cross-edge expansions.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use super::expand::CrossBoundaryExpander;
use super::leaf::{BorderDistances, LeafJoinEngine, LeafOutcome, LeafQuery};
use super::params::{CombineMode, Deadline, JoinParams};
use super::result::{PairSink, PrivateResults, SharedResults, TopK};
use super::stats::JoinStats;
use super::threshold::{Cutoff, GlobalThreshold};
use crate::error::{JoinError, Result};
use crate::graph::{Edge, NodeId, ReferenceGraph};
use crate::partition::{PartitionNode, PartitionTree};

/// Answer to one closest-pairs query.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Ascending by distance, at most K pairs.
    pub pairs: Vec<Edge>,
    /// False when the deadline expired before every leaf and cross-edge was
    /// processed. The pairs are still real distances but may miss closer
    /// pairs that were never explored.
    pub complete: bool,
    pub stats: JoinStats,
    /// Final K-th best distance (infinite if fewer than K pairs were found).
    pub threshold: f32,
}

/// Per-query state shared by every worker.
struct QueryContext<'a, G> {
    graph: &'a G,
    query: LeafQuery<'a>,
    deadline: Deadline,
    complete: AtomicBool,
}

impl<G: ReferenceGraph> QueryContext<'_, G> {
    fn mark_incomplete(&self) {
        self.complete.store(false, Ordering::Relaxed);
    }

    /// Expand the given cross-edges (ascending) from the border distances
    /// recorded on their source side.
    fn expand_edges<'e, S: PairSink>(
        &self,
        edges: impl IntoIterator<Item = &'e Edge>,
        border: &BorderDistances,
        threshold: &GlobalThreshold,
        sink: &mut S,
    ) -> JoinStats {
        let expander = CrossBoundaryExpander::new(self.graph, self.query.limit);
        let mut stats = JoinStats::default();
        for edge in edges {
            let cutoff = Cutoff::new(self.query.limit, sink.kth());
            if cutoff.excludes(edge.weight) {
                break;
            }
            let Some(inside) = border.get(edge.from) else {
                continue;
            };
            if inside.first().is_none_or(|&(_, d)| cutoff.excludes(d + edge.weight)) {
                continue;
            }
            if self.deadline.expired() {
                self.mark_incomplete();
                break;
            }
            let expansion = expander.expand(
                edge,
                inside,
                self.query.s,
                self.query.k,
                threshold,
                &self.deadline,
            );
            if !expansion.complete {
                self.mark_incomplete();
            }
            stats.merge(&expansion.stats);
            sink.offer_batch(&expansion.candidates);
        }
        stats
    }
}

/// Private result of a subtree in hierarchical mode.
struct SubtreeResult {
    top: TopK,
    border: BorderDistances,
    stats: JoinStats,
}

/// Runs closest-pairs queries over a partition tree.
pub struct ClosestPairsOrchestrator {
    params: JoinParams,
}

impl ClosestPairsOrchestrator {
    pub const fn new(params: JoinParams) -> Self {
        Self { params }
    }

    pub const fn params(&self) -> &JoinParams {
        &self.params
    }

    /// The K closest ordered pairs `(r, s)`, `r != s`, by shortest path
    /// cost from `r` to `s`.
    pub fn compute<G: ReferenceGraph>(
        &self,
        tree: &PartitionTree<G>,
        r: &[NodeId],
        s: &[NodeId],
    ) -> Result<JoinOutcome> {
        self.params.validate()?;
        let graph = tree.graph();
        let r = candidate_set(graph, r, "R")?;
        let s = candidate_set(graph, s, "S")?;

        let workers = self.params.worker_count();
        let ctx = QueryContext {
            graph,
            query: LeafQuery {
                r: &r,
                s: &s,
                k: self.params.k,
                limit: self.params.threshold,
            },
            deadline: Deadline::after(self.params.deadline),
            complete: AtomicBool::new(true),
        };

        let root = tree.root();
        let (pairs, stats, threshold) = if root.is_leaf() {
            let shared = SharedResults::new(self.params.k);
            let outcome = self.join_leaf(&ctx, root, &mut &shared);
            let threshold = shared.threshold().current();
            (shared.into_sorted_vec(), outcome.stats, threshold)
        } else {
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| JoinError::ThreadPool(e.to_string()))?;
            match self.params.mode {
                CombineMode::Flat => pool.install(|| self.run_flat(&ctx, root)),
                CombineMode::Hierarchical => pool.install(|| {
                    let global = GlobalThreshold::new();
                    let result = self.run_hierarchical(&ctx, root, &global);
                    (result.top.into_sorted_vec(), result.stats, global.current())
                }),
            }
        };

        let complete = ctx.complete.load(Ordering::Relaxed);
        if complete {
            tracing::info!(
                "Closest pairs: {} of {} found over {} leaves ({} cross-edges expanded, {} workers)",
                pairs.len(),
                self.params.k,
                stats.leaves_joined,
                stats.cross_edges_expanded,
                workers
            );
        } else {
            tracing::warn!(
                "Closest pairs incomplete: deadline expired with {} of {} pairs",
                pairs.len(),
                self.params.k
            );
        }
        Ok(JoinOutcome {
            pairs,
            complete,
            stats,
            threshold,
        })
    }

    fn join_leaf<G: ReferenceGraph, S: PairSink>(
        &self,
        ctx: &QueryContext<'_, G>,
        leaf: &PartitionNode,
        sink: &mut S,
    ) -> LeafOutcome {
        let outcome = LeafJoinEngine::new(ctx.graph).join(leaf, &ctx.query, sink, &ctx.deadline);
        if !outcome.complete {
            ctx.mark_incomplete();
        }
        outcome
    }

    /// All leaves write into one shared set; then every leaving edge of
    /// every leaf is expanded against it.
    fn run_flat<G: ReferenceGraph>(
        &self,
        ctx: &QueryContext<'_, G>,
        root: &PartitionNode,
    ) -> (Vec<Edge>, JoinStats, f32) {
        let leaves = root.leaves();
        let shared = SharedResults::new(self.params.k);

        let outcomes: Vec<LeafOutcome> = leaves
            .par_iter()
            .map(|leaf| {
                let mut sink = &shared;
                self.join_leaf(ctx, leaf, &mut sink)
            })
            .collect();

        let stats = leaves
            .par_iter()
            .zip(outcomes.par_iter())
            .map(|(leaf, outcome)| {
                let mut sink = &shared;
                let mut stats = outcome.stats;
                let cross = ctx.expand_edges(
                    leaf.leaving_edges(),
                    &outcome.border,
                    shared.threshold(),
                    &mut sink,
                );
                stats.merge(&cross);
                stats
            })
            .reduce(JoinStats::default, |mut a, b| {
                a.merge(&b);
                a
            });

        let threshold = shared.threshold().current();
        (shared.into_sorted_vec(), stats, threshold)
    }

    /// Children are joined in parallel; each internal node merges their
    /// private sets and expands the cross-edges of its own split.
    fn run_hierarchical<G: ReferenceGraph>(
        &self,
        ctx: &QueryContext<'_, G>,
        node: &PartitionNode,
        global: &GlobalThreshold,
    ) -> SubtreeResult {
        let Some((left, right)) = node.children() else {
            let mut sink = PrivateResults::new(self.params.k, global);
            let outcome = self.join_leaf(ctx, node, &mut sink);
            return SubtreeResult {
                top: sink.into_inner(),
                border: outcome.border,
                stats: outcome.stats,
            };
        };

        let (a, b) = rayon::join(
            || self.run_hierarchical(ctx, left, global),
            || self.run_hierarchical(ctx, right, global),
        );
        let mut top = a.top;
        top.merge(b.top);
        let mut border = a.border;
        border.merge(b.border);
        let mut stats = a.stats;
        stats.merge(&b.stats);

        let mut sink = PrivateResults::from_top(top, global);
        let own = node.split_edges();
        let cross = ctx.expand_edges(&own, &border, global, &mut sink);
        stats.merge(&cross);
        tracing::debug!(
            "Merged subtree of {} nodes: {} split edges, {} expanded",
            node.hierarchy_size(),
            own.len(),
            cross.cross_edges_expanded
        );

        SubtreeResult {
            top: sink.into_inner(),
            border,
            stats,
        }
    }
}

fn candidate_set<G: ReferenceGraph>(
    graph: &G,
    ids: &[NodeId],
    name: &str,
) -> Result<FxHashSet<NodeId>> {
    if ids.is_empty() {
        return Err(JoinError::invalid(format!("candidate set {name} is empty")));
    }
    if let Some(&missing) = ids.iter().find(|&&id| !graph.contains(id)) {
        return Err(JoinError::invalid(format!(
            "candidate set {name} names node {missing}, which is not in the graph"
        )));
    }
    Ok(ids.iter().copied().collect())
}
