//! Bounded Dijkstra primitives.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;

use super::{NodeId, ReferenceGraph};

/// Frontier entry for Dijkstra-style expansion.
///
/// BinaryHeap is max-heap, so comparison is reversed to pop the smallest
/// distance first. Ties resolve on the smaller node id.
#[derive(Clone, Copy, Debug)]
pub(crate) struct QueueEntry {
    pub dist: f32,
    pub node: NodeId,
}

impl QueueEntry {
    pub const fn new(dist: f32, node: NodeId) -> Self {
        Self { dist, node }
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        OrderedFloat(other.dist)
            .cmp(&OrderedFloat(self.dist))
            .then(other.node.cmp(&self.node))
    }
}

/// Single-source shortest distances, settled strictly below `bound`.
///
/// Pass `f32::INFINITY` for an unbounded search.
pub fn distances_from<G: ReferenceGraph + ?Sized>(
    graph: &G,
    source: NodeId,
    bound: f32,
) -> FxHashMap<NodeId, f32> {
    let mut settled = FxHashMap::default();
    let mut best: FxHashMap<NodeId, f32> = FxHashMap::default();
    let mut heap = BinaryHeap::new();

    if !graph.contains(source) || bound <= 0.0 {
        return settled;
    }
    best.insert(source, 0.0);
    heap.push(QueueEntry::new(0.0, source));

    while let Some(QueueEntry { dist, node }) = heap.pop() {
        if dist >= bound {
            break;
        }
        if settled.contains_key(&node) {
            continue;
        }
        settled.insert(node, dist);
        for link in graph.outgoing(node) {
            let next = dist + link.weight;
            if next >= bound || settled.contains_key(&link.node) {
                continue;
            }
            let slot = best.entry(link.node).or_insert(f32::INFINITY);
            if next < *slot {
                *slot = next;
                heap.push(QueueEntry::new(next, link.node));
            }
        }
    }
    settled
}

/// Point-to-point cost with early exit once `to` is settled.
pub(crate) fn path_cost<G: ReferenceGraph + ?Sized>(
    graph: &G,
    from: NodeId,
    to: NodeId,
) -> Option<f32> {
    if !graph.contains(from) || !graph.contains(to) {
        return None;
    }
    let mut best: FxHashMap<NodeId, f32> = FxHashMap::default();
    let mut heap = BinaryHeap::new();
    best.insert(from, 0.0);
    heap.push(QueueEntry::new(0.0, from));

    while let Some(QueueEntry { dist, node }) = heap.pop() {
        if node == to {
            return Some(dist);
        }
        if best.get(&node).is_some_and(|&d| dist > d) {
            continue;
        }
        for link in graph.outgoing(node) {
            let next = dist + link.weight;
            let slot = best.entry(link.node).or_insert(f32::INFINITY);
            if next < *slot {
                *slot = next;
                heap.push(QueueEntry::new(next, link.node));
            }
        }
    }
    None
}
