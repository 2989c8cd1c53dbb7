//! Per-query counters, returned with every outcome.

/// Work done by one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    pub leaves_joined: usize,
    /// Leaf-local Dijkstra runs, one per source vertex.
    pub sources_expanded: usize,
    pub cross_edges_expanded: usize,
    /// Candidate pairs handed to a result set.
    pub pairs_offered: usize,
    /// Largest priority-queue length seen by any search.
    pub max_heap_size: usize,
    /// Largest settled set seen by any search.
    pub max_set_size: usize,
}

impl JoinStats {
    pub fn merge(&mut self, other: &Self) {
        self.leaves_joined += other.leaves_joined;
        self.sources_expanded += other.sources_expanded;
        self.cross_edges_expanded += other.cross_edges_expanded;
        self.pairs_offered += other.pairs_offered;
        self.max_heap_size = self.max_heap_size.max(other.max_heap_size);
        self.max_set_size = self.max_set_size.max(other.max_set_size);
    }

    #[inline]
    pub(crate) fn observe(&mut self, heap: usize, settled: usize) {
        self.max_heap_size = self.max_heap_size.max(heap);
        self.max_set_size = self.max_set_size.max(settled);
    }
}
