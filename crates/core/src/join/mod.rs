//! Concurrent top-K closest-pairs join.
//!
//! - `LeafJoinEngine` - Dijkstra confined to one leaf, recording border distances
//! - `CrossBoundaryExpander` - completes paths through one cross-edge
//! - `ClosestPairsOrchestrator` - schedules both on a rayon pool and keeps one
//!   shared result set and pruning threshold
//!
//! Every ordered pair `(r, s)` has a shortest path that either stays inside
//! the leaf of `r` or leaves it through some first edge `u -> v`. Leaf joins
//! find the former and the distances to every `u`; expanding each leaving
//! edge from `v` over the whole graph finds the latter.

mod expand;
mod leaf;
mod orchestrator;
mod params;
mod result;
mod stats;
mod threshold;

pub use expand::{CrossBoundaryExpander, Expansion};
pub use leaf::{BorderDistances, LeafJoinEngine, LeafOutcome, LeafQuery};
pub use orchestrator::{ClosestPairsOrchestrator, JoinOutcome};
pub use params::{CombineMode, Deadline, JoinParams};
pub use result::{PairSink, PrivateResults, SharedResults, TopK};
pub use stats::JoinStats;
pub use threshold::GlobalThreshold;
