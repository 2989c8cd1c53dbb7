//! Partition tree construction invariants.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use common::{grid_graph, random_graph};
use kcpjoin_core::{
    AdjacencyGraph, BuildParams, JoinError, NodeId, PartitionNode, ReferenceGraph, SpatialIndex,
    build_partition_tree,
};
use kcpjoin_core::partition::PartitionTreeBuilder;

fn subtree_vertices(node: &PartitionNode) -> FxHashSet<NodeId> {
    node.leaves()
        .iter()
        .flat_map(|leaf| leaf.vertices().ids())
        .collect()
}

fn internal_nodes(node: &PartitionNode) -> Vec<&PartitionNode> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if let Some((l, r)) = n.children() {
            out.push(n);
            stack.push(l);
            stack.push(r);
        }
    }
    out
}

fn assert_partition(graph: &AdjacencyGraph, root: &PartitionNode) {
    let mut seen = FxHashSet::default();
    for leaf in root.leaves() {
        assert!(!leaf.vertices().is_empty());
        for v in leaf.vertices().ids() {
            assert!(seen.insert(v), "vertex {v} in two leaves");
        }
    }
    let all: FxHashSet<_> = graph.nodes().collect();
    assert_eq!(seen, all);
}

/// Every graph edge between the two children of an internal node is one of
/// the children's cross-edges.
fn assert_cross_edge_safety(graph: &AdjacencyGraph, root: &PartitionNode) {
    for node in internal_nodes(root) {
        let (left, right) = node.children().unwrap();
        let lv = subtree_vertices(left);
        let rv = subtree_vertices(right);
        let recorded: FxHashSet<(NodeId, NodeId)> = left
            .crossedges()
            .iter()
            .chain(right.crossedges())
            .map(|e| e.endpoints())
            .collect();
        for edge in graph.edges() {
            let crossing = (lv.contains(&edge.from) && rv.contains(&edge.to))
                || (rv.contains(&edge.from) && lv.contains(&edge.to));
            if crossing {
                assert!(
                    recorded.contains(&edge.endpoints()),
                    "edge {:?} crosses a split but is not recorded",
                    edge.endpoints()
                );
            }
        }
    }
}

/// Every edge leaving a leaf is one of its cross-edges.
fn assert_leaving_edges_recorded(graph: &AdjacencyGraph, root: &PartitionNode) {
    for leaf in root.leaves() {
        let leaving: FxHashSet<_> = leaf.leaving_edges().map(|e| e.endpoints()).collect();
        for v in leaf.vertices().ids() {
            for link in graph.outgoing(v) {
                if !leaf.contains(link.node) {
                    assert!(leaving.contains(&(v, link.node)));
                }
            }
        }
    }
}

#[test]
fn leaves_partition_the_graph() {
    for seed in [1, 2, 3, 4] {
        for directed in [false, true] {
            let (graph, index) = random_graph(seed, 150, directed);
            for leaves in [1, 2, 7, 32] {
                let tree = build_partition_tree(graph.clone(), &index, leaves, 0.5).unwrap();
                assert_partition(&graph, tree.root());
                assert!(tree.leaf_count() <= leaves);
                assert_eq!(tree.partition_size(), 2 * tree.leaf_count() - 1);
            }
        }
    }
}

#[test]
fn cross_edges_separate_children() {
    for seed in [5, 6, 7] {
        for directed in [false, true] {
            let (graph, index) = random_graph(seed, 120, directed);
            let tree = build_partition_tree(graph.clone(), &index, 12, 0.7).unwrap();
            assert_cross_edge_safety(&graph, tree.root());
            assert_leaving_edges_recorded(&graph, tree.root());
        }
    }
}

#[test]
fn crossedges_are_sorted_by_weight() {
    let (graph, index) = grid_graph(15, 15, 3);
    let tree = build_partition_tree(graph, &index, 20, 0.5).unwrap();
    let mut stack = vec![tree.root()];
    while let Some(node) = stack.pop() {
        assert!(node.crossedges().windows(2).all(|w| w[0].weight <= w[1].weight));
        if let Some((l, r)) = node.children() {
            stack.push(l);
            stack.push(r);
        }
    }
}

#[test]
fn internal_nodes_hold_no_vertices() {
    let (graph, index) = grid_graph(10, 6, 8);
    let tree = build_partition_tree(graph, &index, 9, 0.5).unwrap();
    for node in internal_nodes(tree.root()) {
        assert!(node.vertices().is_empty());
        assert!(!node.is_leaf());
    }
    assert_eq!(tree.root().separation_degree(), f32::INFINITY);
}

#[test]
fn separation_degree_is_min_split_edge() {
    let (graph, index) = grid_graph(8, 8, 13);
    let tree = build_partition_tree(graph, &index, 6, 0.5).unwrap();
    for node in internal_nodes(tree.root()) {
        let own = node.split_edges();
        let (left, right) = node.children().unwrap();
        let min = own.iter().map(|e| e.weight).fold(f32::INFINITY, f32::min);
        assert_eq!(left.separation_degree(), min);
        assert_eq!(right.separation_degree(), min);
    }
}

#[test]
fn uniform_grid_splits_stay_balanced() {
    let mut graph = AdjacencyGraph::new_undirected();
    let id = |x: u64, y: u64| y * 16 + x;
    for y in 0..16 {
        for x in 0..16 {
            if x + 1 < 16 {
                graph.add_edge(id(x, y), id(x + 1, y), 1.0).unwrap();
            }
            if y + 1 < 16 {
                graph.add_edge(id(x, y), id(x, y + 1), 1.0).unwrap();
            }
        }
    }
    let index = SpatialIndex::from_points(
        (0..16).flat_map(|y| (0..16).map(move |x| (id(x, y), (x as f64, y as f64)))),
    );
    let tree = build_partition_tree(Arc::new(graph), &index, 2, 1.0).unwrap();
    let (left, right) = tree.root().children().unwrap();
    let sizes: BTreeSet<_> = [left.vertices().len(), right.vertices().len()].into();
    let (small, large) = (*sizes.first().unwrap(), *sizes.last().unwrap());
    assert_eq!(small + large, 256);
    assert!(small * 3 >= large, "unbalanced split {small}/{large}");
}

#[test]
fn leaf_of_finds_owner() {
    let (graph, index) = grid_graph(6, 6, 2);
    let tree = build_partition_tree(graph, &index, 5, 0.5).unwrap();
    for v in 0..36 {
        let leaf = tree.leaf_of(v).unwrap();
        assert!(leaf.contains(v));
    }
    assert!(tree.leaf_of(1000).is_none());
    assert!(tree.depth() >= 2);
}

#[test]
fn rejects_leaf_count_zero() {
    let (graph, index) = grid_graph(3, 3, 1);
    let err = PartitionTreeBuilder::new(BuildParams::new(0, 0.5))
        .build(graph, &index)
        .unwrap_err();
    assert!(matches!(err, JoinError::InvalidArgument(_)));
}
