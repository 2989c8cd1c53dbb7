//! Closest-pairs queries checked against exhaustive shortest paths.

mod common;

use std::time::Duration;

use rustc_hash::FxHashSet;

use common::{XorShift64, brute_force, cycle_graph, grid_graph, random_graph, sample_nodes, triples};
use kcpjoin_core::join::{
    CrossBoundaryExpander, Deadline, GlobalThreshold, LeafJoinEngine, LeafQuery, PairSink,
    PrivateResults, SharedResults,
};
use kcpjoin_core::{
    CombineMode, Edge, JoinError, JoinParams, QueryBuilder, build_partition_tree, closest_pairs,
    closest_pairs_with,
};

#[test]
fn matches_brute_force_across_k_parallelism_and_modes() {
    for seed in [3, 17, 101] {
        for directed in [false, true] {
            let (graph, index) = random_graph(seed, 90, directed);
            let mut rng = XorShift64::new(seed * 7919);
            let r = sample_nodes(&mut rng, &graph, 4);
            let s = sample_nodes(&mut rng, &graph, 4);

            for leaves in [4, 11] {
                let tree = build_partition_tree(graph.clone(), &index, leaves, 0.5).unwrap();
                for k in [1, 5, 20] {
                    let expected = brute_force(&graph, &r, &s, k, f32::INFINITY);
                    for parallelism in [1, 2, 8] {
                        for mode in [CombineMode::Flat, CombineMode::Hierarchical] {
                            let params = JoinParams::new(k, f32::INFINITY, parallelism).with_mode(mode);
                            let outcome = closest_pairs_with(&tree, &r, &s, params).unwrap();
                            assert!(outcome.complete);
                            assert_eq!(
                                triples(&outcome.pairs),
                                expected,
                                "seed {seed} directed {directed} leaves {leaves} k {k} \
                                 parallelism {parallelism} mode {mode:?}"
                            );
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn grid_network_matches_brute_force() {
    let (graph, index) = grid_graph(12, 10, 5);
    let tree = build_partition_tree(graph.clone(), &index, 16, 0.5).unwrap();
    let r: Vec<u64> = (0..120).step_by(7).collect();
    let s: Vec<u64> = (3..120).step_by(5).collect();
    for k in [1, 5, 20] {
        let expected = brute_force(&graph, &r, &s, k, f32::INFINITY);
        let pairs = closest_pairs(&tree, &r, &s, k, f32::INFINITY, 4).unwrap();
        assert_eq!(triples(&pairs), expected, "k {k}");
    }
}

#[test]
fn threshold_limits_reported_distances() {
    let (graph, index) = grid_graph(10, 10, 9);
    let tree = build_partition_tree(graph.clone(), &index, 8, 0.5).unwrap();
    let r: Vec<u64> = (0..100).step_by(9).collect();
    let s: Vec<u64> = (4..100).step_by(6).collect();

    let expected = brute_force(&graph, &r, &s, 50, 6.0);
    let pairs = closest_pairs(&tree, &r, &s, 50, 6.0, 2).unwrap();
    assert!(pairs.iter().all(|p| p.weight < 6.0));
    assert_eq!(triples(&pairs), expected);
}

#[test]
fn six_cycle_opposite_nodes_are_three_apart() {
    let (graph, index) = cycle_graph(6);
    let tree = build_partition_tree(graph, &index, 2, 0.5).unwrap();
    assert_eq!(tree.leaf_count(), 2);
    for leaf in tree.root().leaves() {
        assert_eq!(leaf.vertices().len(), 3);
    }

    for mode in [CombineMode::Flat, CombineMode::Hierarchical] {
        let params = JoinParams::new(1, f32::INFINITY, 2).with_mode(mode);
        let outcome = closest_pairs_with(&tree, &[0], &[3], params).unwrap();
        assert_eq!(triples(&outcome.pairs), vec![(0, 3, 3.0)]);
    }
}

#[test]
fn single_leaf_tree_reduces_to_leaf_join() {
    let (graph, index) = random_graph(42, 60, true);
    let tree = build_partition_tree(graph.clone(), &index, 1, 0.5).unwrap();
    assert!(tree.root().is_leaf());
    assert_eq!(tree.partition_size(), 1);
    assert_eq!(tree.root().vertices().len(), 60);

    let mut rng = XorShift64::new(4242);
    let r = sample_nodes(&mut rng, &graph, 3);
    let s = sample_nodes(&mut rng, &graph, 3);
    let pairs = closest_pairs(&tree, &r, &s, 10, f32::INFINITY, 3).unwrap();

    let r_set: FxHashSet<_> = r.iter().copied().collect();
    let s_set: FxHashSet<_> = s.iter().copied().collect();
    let query = LeafQuery {
        r: &r_set,
        s: &s_set,
        k: 10,
        limit: f32::INFINITY,
    };
    let global = GlobalThreshold::new();
    let mut sink = PrivateResults::new(10, &global);
    LeafJoinEngine::new(&*graph).join(tree.root(), &query, &mut sink, &Deadline::after(None));

    let leaf_only = sink.into_inner().into_sorted_vec();
    assert_eq!(triples(&pairs), triples(&leaf_only));
    assert_eq!(triples(&pairs), brute_force(&graph, &r, &s, 10, f32::INFINITY));
}

#[test]
fn repeated_queries_are_identical() {
    let (graph, index) = random_graph(7, 120, false);
    let tree = build_partition_tree(graph.clone(), &index, 9, 0.3).unwrap();
    let mut rng = XorShift64::new(77);
    let r = sample_nodes(&mut rng, &graph, 3);
    let s = sample_nodes(&mut rng, &graph, 3);

    let first = closest_pairs(&tree, &r, &s, 15, f32::INFINITY, 8).unwrap();
    for _ in 0..5 {
        let again = closest_pairs(&tree, &r, &s, 15, f32::INFINITY, 8).unwrap();
        assert_eq!(triples(&again), triples(&first));
    }
}

#[test]
fn final_threshold_is_kth_distance() {
    let (graph, index) = grid_graph(8, 8, 21);
    let tree = build_partition_tree(graph, &index, 6, 0.5).unwrap();
    let r: Vec<u64> = (0..64).step_by(3).collect();
    let s: Vec<u64> = (1..64).step_by(4).collect();

    for mode in [CombineMode::Flat, CombineMode::Hierarchical] {
        let outcome = closest_pairs_with(
            &tree,
            &r,
            &s,
            JoinParams::new(5, f32::INFINITY, 4).with_mode(mode),
        )
        .unwrap();
        assert_eq!(outcome.pairs.len(), 5);
        assert_eq!(outcome.threshold, outcome.pairs[4].weight);
        assert!(outcome.pairs.windows(2).all(|w| w[0].weight <= w[1].weight));

        let sparse = closest_pairs_with(
            &tree,
            &[0],
            &[63],
            JoinParams::new(5, f32::INFINITY, 4).with_mode(mode),
        )
        .unwrap();
        assert_eq!(sparse.pairs.len(), 1);
        assert_eq!(sparse.threshold, f32::INFINITY);
    }
}

/// Forwards to a shared set and records the K-th bound around every batch.
struct WatchedSink<'a> {
    shared: &'a SharedResults,
    seen: Vec<f32>,
}

impl PairSink for WatchedSink<'_> {
    fn kth(&self) -> f32 {
        self.shared.threshold().current()
    }

    fn offer_batch(&mut self, pairs: &[Edge]) -> usize {
        self.seen.push(self.kth());
        let mut shared = self.shared;
        let accepted = shared.offer_batch(pairs);
        self.seen.push(self.kth());
        accepted
    }
}

#[test]
fn shared_threshold_never_rises_during_a_query() {
    let (graph, index) = random_graph(59, 120, true);
    let tree = build_partition_tree(graph.clone(), &index, 8, 0.5).unwrap();
    let mut rng = XorShift64::new(5959);
    let r = sample_nodes(&mut rng, &graph, 3);
    let s = sample_nodes(&mut rng, &graph, 3);
    let k = 6;

    let r_set: FxHashSet<_> = r.iter().copied().collect();
    let s_set: FxHashSet<_> = s.iter().copied().collect();
    let query = LeafQuery {
        r: &r_set,
        s: &s_set,
        k,
        limit: f32::INFINITY,
    };
    let shared = SharedResults::new(k);
    let deadline = Deadline::after(None);
    let leaves = tree.root().leaves();

    let observed: Vec<Vec<f32>> = std::thread::scope(|scope| {
        let handles: Vec<_> = leaves
            .iter()
            .map(|leaf| {
                let (graph, query, shared, deadline, s_set) =
                    (&*graph, &query, &shared, &deadline, &s_set);
                scope.spawn(move || {
                    let mut sink = WatchedSink {
                        shared,
                        seen: Vec::new(),
                    };
                    let outcome = LeafJoinEngine::new(graph).join(leaf, query, &mut sink, deadline);
                    let expander = CrossBoundaryExpander::new(graph, f32::INFINITY);
                    for edge in leaf.leaving_edges() {
                        let Some(inside) = outcome.border.get(edge.from) else {
                            continue;
                        };
                        let exp =
                            expander.expand(edge, inside, s_set, k, shared.threshold(), deadline);
                        sink.offer_batch(&exp.candidates);
                    }
                    sink.seen
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for seen in &observed {
        assert!(
            seen.windows(2).all(|w| w[1] <= w[0]),
            "threshold rose: {seen:?}"
        );
    }
    assert!(observed.iter().flatten().any(|&t| t.is_finite()));

    let expected = brute_force(&graph, &r, &s, k, f32::INFINITY);
    assert_eq!(expected.len(), k);
    assert_eq!(shared.threshold().current(), expected[k - 1].2);
    assert_eq!(triples(&shared.into_sorted_vec()), expected);
}

#[test]
fn stats_count_every_leaf() {
    let (graph, index) = grid_graph(9, 9, 2);
    let tree = build_partition_tree(graph, &index, 7, 0.5).unwrap();
    let r: Vec<u64> = (0..81).step_by(4).collect();
    let s: Vec<u64> = (2..81).step_by(5).collect();
    for hierarchical in [false, true] {
        let mut builder = QueryBuilder::new(&tree)
            .sources(r.iter().copied())
            .targets(s.iter().copied())
            .k(3)
            .parallel(2);
        if hierarchical {
            builder = builder.hierarchical();
        }
        let outcome = builder.run().unwrap();
        assert!(outcome.complete);
        assert_eq!(outcome.stats.leaves_joined, tree.leaf_count());
        assert_eq!(outcome.stats.sources_expanded, r.len());
        assert!(outcome.stats.max_set_size > 0);
        assert!(outcome.stats.pairs_offered >= outcome.pairs.len());
    }
}

#[test]
fn expired_deadline_is_flagged() {
    let (graph, index) = grid_graph(6, 6, 1);
    let tree = build_partition_tree(graph, &index, 4, 0.5).unwrap();
    for hierarchical in [false, true] {
        let mut builder = QueryBuilder::new(&tree)
            .sources([0, 1, 2])
            .targets([33, 34, 35])
            .k(2)
            .deadline(Duration::ZERO);
        if hierarchical {
            builder = builder.hierarchical();
        }
        let outcome = builder.run().unwrap();
        assert!(!outcome.complete);
        assert!(outcome.pairs.is_empty());
    }
}

#[test]
fn rejects_invalid_queries() {
    let (graph, index) = grid_graph(4, 4, 1);
    let tree = build_partition_tree(graph, &index, 2, 0.5).unwrap();

    let empty = closest_pairs(&tree, &[], &[1], 1, f32::INFINITY, 1).unwrap_err();
    assert!(matches!(empty, JoinError::InvalidArgument(_)));
    let zero_k = closest_pairs(&tree, &[0], &[1], 0, f32::INFINITY, 1).unwrap_err();
    assert!(matches!(zero_k, JoinError::InvalidArgument(_)));
    let unknown = closest_pairs(&tree, &[0], &[999], 1, f32::INFINITY, 1).unwrap_err();
    assert!(matches!(unknown, JoinError::InvalidArgument(_)));
    let nan = closest_pairs(&tree, &[0], &[1], 1, f32::NAN, 1).unwrap_err();
    assert!(matches!(nan, JoinError::InvalidArgument(_)));
}

#[test]
fn unreachable_targets_give_empty_result() {
    let (graph, index) = random_graph(11, 40, true);
    let tree = build_partition_tree(graph, &index, 4, 0.5).unwrap();
    let pairs = closest_pairs(&tree, &[5], &[5], 3, f32::INFINITY, 2).unwrap();
    assert!(pairs.is_empty());
    let pairs = closest_pairs(&tree, &[5], &[6], 3, 0.0, 2).unwrap();
    assert!(pairs.is_empty());
}
