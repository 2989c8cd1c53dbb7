//! Synthetic graphs and a brute-force reference for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use kcpjoin_core::graph::distances_from;
use kcpjoin_core::{AdjacencyGraph, Edge, NodeId, ReferenceGraph, SpatialIndex};

#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    pub fn gen_f64(&mut self, min: f64, max: f64) -> f64 {
        let n = self.next_u64() as f64 / u64::MAX as f64;
        min + (max - min) * n
    }

    /// Uniform in `lo..hi`.
    pub fn gen_range(&mut self, lo: u64, hi: u64) -> u64 {
        lo + self.next_u64() % (hi - lo)
    }
}

/// Random geometric-ish graph: `n` nodes scattered in a 100x100 square,
/// each linked to a few random others with integer weights 1..=9.
pub fn random_graph(seed: u64, n: u64, directed: bool) -> (Arc<AdjacencyGraph>, SpatialIndex) {
    let mut rng = XorShift64::new(seed);
    let mut graph = if directed {
        AdjacencyGraph::new_directed()
    } else {
        AdjacencyGraph::new_undirected()
    };
    let mut points = Vec::with_capacity(n as usize);
    for id in 0..n {
        graph.add_node(id);
        points.push((id, (rng.gen_f64(0.0, 100.0), rng.gen_f64(0.0, 100.0))));
    }
    for from in 0..n {
        let degree = rng.gen_range(1, 4);
        for _ in 0..degree {
            let to = rng.gen_range(0, n);
            if to != from {
                let weight = rng.gen_range(1, 10) as f32;
                graph.add_edge(from, to, weight).unwrap();
            }
        }
    }
    (Arc::new(graph), SpatialIndex::from_points(points))
}

/// Undirected `w x h` grid with unit coordinates and integer weights.
pub fn grid_graph(w: u64, h: u64, seed: u64) -> (Arc<AdjacencyGraph>, SpatialIndex) {
    let mut rng = XorShift64::new(seed);
    let mut graph = AdjacencyGraph::new_undirected();
    let id = |x: u64, y: u64| y * w + x;
    for y in 0..h {
        for x in 0..w {
            if x + 1 < w {
                graph
                    .add_edge(id(x, y), id(x + 1, y), rng.gen_range(1, 6) as f32)
                    .unwrap();
            }
            if y + 1 < h {
                graph
                    .add_edge(id(x, y), id(x, y + 1), rng.gen_range(1, 6) as f32)
                    .unwrap();
            }
        }
    }
    let index = SpatialIndex::from_points(
        (0..h).flat_map(|y| (0..w).map(move |x| (id(x, y), (x as f64, y as f64)))),
    );
    (Arc::new(graph), index)
}

/// Unit-weight undirected cycle laid out on a circle.
pub fn cycle_graph(n: u64) -> (Arc<AdjacencyGraph>, SpatialIndex) {
    let mut graph = AdjacencyGraph::new_undirected();
    for i in 0..n {
        graph.add_edge(i, (i + 1) % n, 1.0).unwrap();
    }
    let index = SpatialIndex::from_points((0..n).map(|i| {
        let angle = std::f64::consts::TAU * i as f64 / n as f64;
        (i, (angle.cos(), angle.sin()))
    }));
    (Arc::new(graph), index)
}

/// Random subset of the graph's nodes, each kept with probability 1/`every`.
pub fn sample_nodes(rng: &mut XorShift64, graph: &AdjacencyGraph, every: u64) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = graph.nodes().filter(|_| rng.gen_range(0, every) == 0).collect();
    if out.is_empty() {
        out.push(graph.nodes().next().unwrap());
    }
    out
}

/// Exhaustive top-K by `(distance, r, s)`.
pub fn brute_force(
    graph: &AdjacencyGraph,
    r: &[NodeId],
    s: &[NodeId],
    k: usize,
    threshold: f32,
) -> Vec<(NodeId, NodeId, f32)> {
    let mut all = Vec::new();
    let mut sources = r.to_vec();
    sources.sort_unstable();
    sources.dedup();
    let mut targets = s.to_vec();
    targets.sort_unstable();
    targets.dedup();
    for &from in &sources {
        let dist = distances_from(graph, from, threshold);
        for &to in &targets {
            if to != from
                && let Some(&d) = dist.get(&to)
            {
                all.push((from, to, d));
            }
        }
    }
    all.sort_by(|a, b| a.2.total_cmp(&b.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));
    all.truncate(k);
    all
}

pub fn triples(pairs: &[Edge]) -> Vec<(NodeId, NodeId, f32)> {
    pairs.iter().map(|e| (e.from, e.to, e.weight)).collect()
}
