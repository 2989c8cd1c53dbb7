//! Bounded top-K result sets.

use std::collections::BTreeSet;

use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::threshold::GlobalThreshold;
use crate::graph::{Edge, NodeId};

type PairKey = (OrderedFloat<f32>, NodeId, NodeId);

#[inline]
fn key(edge: &Edge) -> PairKey {
    (OrderedFloat(edge.weight), edge.from, edge.to)
}

/// The K best distinct pairs seen so far.
///
/// Pairs are ordered by `(distance, r, s)`, so the worst accepted pair is the
/// last entry and eviction is O(log K). Each `(r, s)` is held at most once,
/// with its smallest offered distance.
#[derive(Debug, Clone)]
pub struct TopK {
    capacity: usize,
    ordered: BTreeSet<PairKey>,
    best: FxHashMap<(NodeId, NodeId), f32>,
}

impl TopK {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ordered: BTreeSet::new(),
            best: FxHashMap::default(),
        }
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ordered.len() >= self.capacity
    }

    /// Worst accepted pair.
    pub fn worst(&self) -> Option<Edge> {
        self.ordered
            .last()
            .map(|&(d, r, s)| Edge::new(r, s, d.into_inner()))
    }

    /// Distance a candidate must not exceed to be accepted; infinite until
    /// the set is full.
    pub fn bound(&self) -> f32 {
        if self.is_full() {
            self.worst().map_or(f32::INFINITY, |e| e.weight)
        } else {
            f32::INFINITY
        }
    }

    /// Offer one pair. Self-pairs and non-finite distances are ignored.
    /// Returns true when the set changed.
    pub fn offer(&mut self, pair: Edge) -> bool {
        if pair.from == pair.to || !pair.weight.is_finite() || self.capacity == 0 {
            return false;
        }
        let candidate = key(&pair);
        if let Some(&held) = self.best.get(&pair.endpoints()) {
            if held <= pair.weight {
                return false;
            }
            self.ordered.remove(&(OrderedFloat(held), pair.from, pair.to));
        } else if self.is_full() {
            match self.ordered.last() {
                Some(&worst) if candidate < worst => {
                    self.ordered.remove(&worst);
                    self.best.remove(&(worst.1, worst.2));
                }
                _ => return false,
            }
        }
        self.ordered.insert(candidate);
        self.best.insert(pair.endpoints(), pair.weight);
        true
    }

    /// Offer every pair of `other`.
    pub fn merge(&mut self, other: Self) -> usize {
        other
            .into_sorted_vec()
            .into_iter()
            .filter(|&pair| self.offer(pair))
            .count()
    }

    /// Pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Edge> + '_ {
        self.ordered
            .iter()
            .map(|&(d, r, s)| Edge::new(r, s, d.into_inner()))
    }

    pub fn into_sorted_vec(self) -> Vec<Edge> {
        self.ordered
            .into_iter()
            .map(|(d, r, s)| Edge::new(r, s, d.into_inner()))
            .collect()
    }
}

/// Destination for candidate pairs found by a leaf join or an expansion.
pub trait PairSink {
    /// Current K-th best distance known to the sink.
    fn kth(&self) -> f32;

    /// Offer a batch of candidates. Returns how many were accepted.
    fn offer_batch(&mut self, pairs: &[Edge]) -> usize;
}

/// One result set shared by all workers of a query.
///
/// The set and the threshold are updated together under a single lock, so
/// a candidate is checked and inserted against the same state. Readers of
/// the threshold alone do not take the lock.
#[derive(Debug)]
pub struct SharedResults {
    set: Mutex<TopK>,
    threshold: GlobalThreshold,
}

impl SharedResults {
    pub fn new(k: usize) -> Self {
        Self {
            set: Mutex::new(TopK::new(k)),
            threshold: GlobalThreshold::new(),
        }
    }

    pub const fn threshold(&self) -> &GlobalThreshold {
        &self.threshold
    }

    pub fn len(&self) -> usize {
        self.set.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.lock().is_empty()
    }

    pub fn into_sorted_vec(self) -> Vec<Edge> {
        self.set.into_inner().into_sorted_vec()
    }
}

impl PairSink for &SharedResults {
    fn kth(&self) -> f32 {
        self.threshold.current()
    }

    fn offer_batch(&mut self, pairs: &[Edge]) -> usize {
        if pairs.is_empty() {
            return 0;
        }
        let mut set = self.set.lock();
        let mut accepted = 0;
        for &pair in pairs {
            if pair.weight > self.threshold.current() {
                continue;
            }
            if set.offer(pair) {
                accepted += 1;
            }
        }
        if set.is_full() {
            self.threshold.tighten(set.bound());
        }
        accepted
    }
}

/// A worker-private result set that still publishes its K-th best distance
/// to the query-wide threshold.
#[derive(Debug)]
pub struct PrivateResults<'t> {
    top: TopK,
    global: &'t GlobalThreshold,
}

impl<'t> PrivateResults<'t> {
    pub fn new(k: usize, global: &'t GlobalThreshold) -> Self {
        Self::from_top(TopK::new(k), global)
    }

    pub fn from_top(top: TopK, global: &'t GlobalThreshold) -> Self {
        let results = Self { top, global };
        results.publish();
        results
    }

    fn publish(&self) {
        if self.top.is_full() {
            self.global.tighten(self.top.bound());
        }
    }

    pub fn into_inner(self) -> TopK {
        self.top
    }
}

impl PairSink for PrivateResults<'_> {
    fn kth(&self) -> f32 {
        self.global.current().min(self.top.bound())
    }

    fn offer_batch(&mut self, pairs: &[Edge]) -> usize {
        let kth = self.kth();
        let accepted = pairs
            .iter()
            .filter(|pair| pair.weight <= kth)
            .filter(|&&pair| self.top.offer(pair))
            .count();
        self.publish();
        accepted
    }
}
