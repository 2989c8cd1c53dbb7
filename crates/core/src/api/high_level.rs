//! The two public entry points: build a partition tree, query it.

use std::sync::Arc;

use crate::error::{JoinError, Result};
use crate::graph::{Edge, NodeId, ReferenceGraph};
use crate::join::{ClosestPairsOrchestrator, JoinOutcome, JoinParams};
use crate::partition::{BuildParams, PartitionTree, PartitionTreeBuilder};
use crate::spatial::SpatialIndex;

/// Build a partition tree of about `leaf_count` leaves.
///
/// # Arguments
/// * `graph` - Reference graph; every node must have coordinates in `index`
/// * `index` - Node coordinates used to pick split seeds
/// * `leaf_count` - Target number of leaves (at least 1)
/// * `alpha` - Size-balance smoothing in [0, 1]
///
/// # Example
/// ```ignore
/// use std::sync::Arc;
/// use kcpjoin_core::graph::io::{load_coordinates, load_edge_list};
/// use kcpjoin_core::api::build_partition_tree;
///
/// let graph = Arc::new(load_edge_list("roads.txt", false)?);
/// let coords = load_coordinates("roads.co")?;
/// let tree = build_partition_tree(graph, &coords, 64, 0.5)?;
/// ```
pub fn build_partition_tree<G: ReferenceGraph>(
    graph: Arc<G>,
    index: &SpatialIndex,
    leaf_count: usize,
    alpha: f64,
) -> Result<PartitionTree<G>> {
    PartitionTreeBuilder::new(BuildParams::new(leaf_count, alpha)).build(graph, index)
}

/// The `k` closest ordered pairs `(r, s)` with `r` in `r_set`, `s` in
/// `s_set` and `r != s`, ascending by shortest path cost.
///
/// Only pairs strictly closer than `threshold` are returned. `parallelism`
/// of 0 uses every available core.
///
/// # Example
/// ```ignore
/// let pairs = closest_pairs(&tree, &[1, 2, 3], &[40, 41], 5, f32::INFINITY, 4)?;
/// for pair in pairs {
///     println!("{} {} {}", pair.from, pair.to, pair.weight);
/// }
/// ```
pub fn closest_pairs<G: ReferenceGraph>(
    tree: &PartitionTree<G>,
    r_set: &[NodeId],
    s_set: &[NodeId],
    k: usize,
    threshold: f32,
    parallelism: usize,
) -> Result<Vec<Edge>> {
    let outcome = closest_pairs_with(tree, r_set, s_set, JoinParams::new(k, threshold, parallelism))?;
    if !outcome.complete {
        return Err(JoinError::Incomplete {
            found: outcome.pairs.len(),
            k,
        });
    }
    Ok(outcome.pairs)
}

/// Like [`closest_pairs`] with full control over the query, returning the
/// completeness flag and statistics alongside the pairs.
pub fn closest_pairs_with<G: ReferenceGraph>(
    tree: &PartitionTree<G>,
    r_set: &[NodeId],
    s_set: &[NodeId],
    params: JoinParams,
) -> Result<JoinOutcome> {
    ClosestPairsOrchestrator::new(params).compute(tree, r_set, s_set)
}
