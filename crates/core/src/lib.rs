//! kcpjoin - K closest pairs between two node sets of a weighted graph.
//!
//! A graph is split once into a binary partition tree; queries then run
//! leaf-confined searches in parallel and complete cross-partition paths
//! through the recorded cross-edges, sharing one pruning threshold.

pub mod api;
pub mod error;
pub mod graph;
pub mod join;
pub mod partition;
pub mod spatial;

pub use api::{QueryBuilder, build_partition_tree, closest_pairs, closest_pairs_with};
pub use error::{JoinError, Result};
pub use graph::{AdjacencyGraph, Edge, NodeId, ReferenceGraph};
pub use join::{CombineMode, JoinOutcome, JoinParams, JoinStats};
pub use partition::{BuildParams, PartitionNode, PartitionTree};
pub use spatial::SpatialIndex;
