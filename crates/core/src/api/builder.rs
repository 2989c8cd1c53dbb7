//! Builder pattern for closest-pairs queries.
//!
//! Provides a fluent API for configuring and running a join.
//!
//! # Example
//! ```ignore
//! use kcpjoin_core::api::QueryBuilder;
//!
//! let outcome = QueryBuilder::new(&tree)
//!     .sources([1, 2, 3])
//!     .targets([40, 41])
//!     .k(5)
//!     .parallel(4)
//!     .hierarchical()
//!     .run()?;
//! ```

use std::time::Duration;

use crate::error::Result;
use crate::graph::{NodeId, ReferenceGraph};
use crate::join::{CombineMode, JoinOutcome, JoinParams};
use crate::partition::PartitionTree;

use super::high_level::closest_pairs_with;

/// A builder for configuring a closest-pairs query over one tree.
#[derive(Debug)]
pub struct QueryBuilder<'t, G> {
    tree: &'t PartitionTree<G>,
    r: Vec<NodeId>,
    s: Vec<NodeId>,
    params: JoinParams,
}

impl<'t, G: ReferenceGraph> QueryBuilder<'t, G> {
    pub fn new(tree: &'t PartitionTree<G>) -> Self {
        Self {
            tree,
            r: Vec::new(),
            s: Vec::new(),
            params: JoinParams::default(),
        }
    }

    /// Sets the source candidates R.
    pub fn sources(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.r = ids.into_iter().collect();
        self
    }

    /// Sets the target candidates S.
    pub fn targets(mut self, ids: impl IntoIterator<Item = NodeId>) -> Self {
        self.s = ids.into_iter().collect();
        self
    }

    /// Sets the number of pairs to return (default: 10).
    pub fn k(mut self, k: usize) -> Self {
        self.params.k = k;
        self
    }

    /// Only report pairs strictly closer than `threshold`.
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.params.threshold = threshold;
        self
    }

    /// Sets the worker thread count. 0 uses every available core.
    ///
    /// # Example
    /// ```ignore
    /// let builder = QueryBuilder::new(&tree).parallel(4);
    /// ```
    pub fn parallel(mut self, thread_count: usize) -> Self {
        self.params.parallelism = thread_count;
        self
    }

    /// Combine results bottom-up instead of through one shared set.
    pub fn hierarchical(mut self) -> Self {
        self.params.mode = CombineMode::Hierarchical;
        self
    }

    /// Stop exploring after `budget`; the outcome is then flagged incomplete.
    pub fn deadline(mut self, budget: Duration) -> Self {
        self.params.deadline = Some(budget);
        self
    }

    pub const fn params(&self) -> &JoinParams {
        &self.params
    }

    pub fn run(self) -> Result<JoinOutcome> {
        closest_pairs_with(self.tree, &self.r, &self.s, self.params)
    }
}
