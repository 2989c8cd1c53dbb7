//! Partition tree persistence.
//!
//! Each tree node is stored as two tab-separated text files next to a path
//! prefix. The root lives at `<prefix>.vert` / `<prefix>.cross`, and every
//! level appends `0` (left) or `1` (right) to the prefix:
//!
//! ```text
//! roads.vert   roads.cross     root
//! roads0.vert  roads0.cross    left child
//! roads01.vert roads01.cross   right child of the left child
//! ```
//!
//! `.vert` lines are `node<TAB>x<TAB>y`, `.cross` lines are
//! `from<TAB>to<TAB>weight`. A node whose child files are absent is a leaf.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::node::{PartitionNode, PartitionTree};
use crate::error::{JoinError, Result};
use crate::graph::io::parse_field;
use crate::graph::{Edge, NodeId, ReferenceGraph};
use crate::spatial::SpatialIndex;

const VERTEX_EXT: &str = "vert";
const CROSS_EXT: &str = "cross";

fn node_file(prefix: &Path, code: &str, ext: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(code);
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

fn node_exists(prefix: &Path, code: &str) -> bool {
    node_file(prefix, code, VERTEX_EXT).is_file() && node_file(prefix, code, CROSS_EXT).is_file()
}

/// Write `root` and all descendants under `prefix`.
pub fn save(root: &PartitionNode, prefix: impl AsRef<Path>) -> Result<()> {
    let prefix = prefix.as_ref();
    if let Some(parent) = prefix.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut files = 0usize;
    save_node(root, prefix, &mut String::new(), &mut files)?;
    tracing::info!(
        "Saved partition tree ({} nodes, {} files) to {:?}",
        root.hierarchy_size(),
        files,
        prefix
    );
    Ok(())
}

fn save_node(node: &PartitionNode, prefix: &Path, code: &mut String, files: &mut usize) -> Result<()> {
    let mut vert = BufWriter::new(File::create(node_file(prefix, code, VERTEX_EXT))?);
    for (id, (x, y)) in node.vertices.iter() {
        writeln!(vert, "{id}\t{x}\t{y}")?;
    }
    vert.flush()?;

    let mut cross = BufWriter::new(File::create(node_file(prefix, code, CROSS_EXT))?);
    for edge in &node.crossedges {
        writeln!(cross, "{}\t{}\t{}", edge.from, edge.to, edge.weight)?;
    }
    cross.flush()?;
    *files += 2;

    match node.children() {
        Some((left, right)) => {
            for (bit, child) in [('0', left), ('1', right)] {
                code.push(bit);
                save_node(child, prefix, code, files)?;
                code.pop();
            }
        }
        None => {
            // Stale children from an earlier, deeper tree would be picked up on load
            for bit in ['0', '1'] {
                code.push(bit);
                for ext in [VERTEX_EXT, CROSS_EXT] {
                    let stale = node_file(prefix, code, ext);
                    if stale.is_file() {
                        fs::remove_file(stale)?;
                    }
                }
                code.pop();
            }
        }
    }
    Ok(())
}

/// Rebuild a tree saved under `prefix` against `graph`.
///
/// Every persisted vertex must exist in the graph and every cross-edge must
/// be a graph edge with the same weight. No vertex may appear in two leaves,
/// the leaves must cover the graph, and each node's cross-edges must hold
/// every graph edge leaving its subtree and none running inside it.
pub fn load<G: ReferenceGraph>(graph: Arc<G>, prefix: impl AsRef<Path>) -> Result<PartitionTree<G>> {
    let prefix = prefix.as_ref();
    if !node_exists(prefix, "") {
        return Err(JoinError::MissingPartition(prefix.to_path_buf()));
    }
    let mut seen = FxHashSet::default();
    let (mut root, _) = load_node(&*graph, prefix, &mut String::new(), &mut seen)?;
    root.separation_degree = f32::INFINITY;
    if let Some(node) = graph.nodes().find(|n| !seen.contains(n)) {
        return Err(JoinError::malformed(
            node_file(prefix, "", VERTEX_EXT),
            0,
            format!("graph node {node} is not in any leaf"),
        ));
    }
    tracing::info!(
        "Loaded partition tree from {:?}: {} nodes, {} vertices",
        prefix,
        root.hierarchy_size(),
        seen.len()
    );
    Ok(PartitionTree::new(graph, root))
}

/// Load the node at `code` and its subtree, returning the subtree's vertices
/// along with it.
fn load_node<G: ReferenceGraph>(
    graph: &G,
    prefix: &Path,
    code: &mut String,
    seen: &mut FxHashSet<NodeId>,
) -> Result<(PartitionNode, FxHashSet<NodeId>)> {
    let vert_path = node_file(prefix, code, VERTEX_EXT);
    let cross_path = node_file(prefix, code, CROSS_EXT);
    let vertices = read_vertices(graph, &vert_path)?;
    let crossedges = read_crossedges(graph, &cross_path)?;

    code.push('0');
    let has_left = node_exists(prefix, code);
    code.pop();
    code.push('1');
    let has_right = node_exists(prefix, code);
    code.pop();

    let (children, inside) = match (has_left, has_right) {
        (false, false) => {
            let mut inside = FxHashSet::default();
            for id in vertices.ids() {
                if !seen.insert(id) {
                    return Err(JoinError::malformed(
                        vert_path,
                        0,
                        format!("vertex {id} appears in more than one leaf"),
                    ));
                }
                inside.insert(id);
            }
            (None, inside)
        }
        (true, true) => {
            code.push('0');
            let (left, left_inside) = load_node(graph, prefix, code, seen)?;
            code.pop();
            code.push('1');
            let (right, right_inside) = load_node(graph, prefix, code, seen)?;
            code.pop();

            let (mut inside, smaller) = if left_inside.len() >= right_inside.len() {
                (left_inside, right_inside)
            } else {
                (right_inside, left_inside)
            };
            inside.extend(smaller);
            (Some((left, right)), inside)
        }
        _ => {
            return Err(JoinError::malformed(
                cross_path,
                0,
                "partition node has only one child",
            ));
        }
    };

    check_boundary(graph, &cross_path, &crossedges, &inside)?;
    let edges = crossedges.into_iter().map(|(_, edge)| edge).collect();
    let mut node = PartitionNode::with_edges(vertices, edges, f32::INFINITY);
    if let Some((mut left, mut right)) = children {
        let separation = own_separation(&node.crossedges, &left.crossedges)
            .min(own_separation(&node.crossedges, &right.crossedges));
        left.separation_degree = separation;
        right.separation_degree = separation;
        node.attach(left, right);
    }
    Ok((node, inside))
}

/// A node's cross-edges must contain every graph edge leaving `inside` and
/// no edge with both endpoints in it.
fn check_boundary<G: ReferenceGraph>(
    graph: &G,
    path: &Path,
    crossedges: &[(usize, Edge)],
    inside: &FxHashSet<NodeId>,
) -> Result<()> {
    let mut stored = FxHashSet::default();
    for &(line, edge) in crossedges {
        if inside.contains(&edge.from) && inside.contains(&edge.to) {
            return Err(JoinError::malformed(
                path,
                line,
                format!("cross-edge {}->{} does not leave the node", edge.from, edge.to),
            ));
        }
        stored.insert((edge.from, edge.to, edge.weight.to_bits()));
    }
    for &from in inside {
        for link in graph.outgoing(from) {
            if !inside.contains(&link.node)
                && !stored.contains(&(from, link.node, link.weight.to_bits()))
            {
                return Err(JoinError::malformed(
                    path,
                    0,
                    format!(
                        "graph edge {from}->{} ({}) leaves the node but is not a cross-edge",
                        link.node, link.weight
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Minimum weight among the child's cross-edges that the parent lacks.
fn own_separation(parent: &[Edge], child: &[Edge]) -> f32 {
    let inherited: FxHashSet<Edge> = parent.iter().copied().collect();
    child
        .iter()
        .filter(|e| !inherited.contains(e))
        .map(|e| e.weight)
        .fold(f32::INFINITY, f32::min)
}

fn read_vertices<G: ReferenceGraph>(graph: &G, path: &Path) -> Result<SpatialIndex> {
    let reader = BufReader::new(File::open(path)?);
    let mut points = Vec::new();
    for (idx, text) in reader.lines().enumerate() {
        let text = text?;
        let line = idx + 1;
        if text.trim().is_empty() {
            continue;
        }
        let mut fields = text.split('\t');
        let id: NodeId = parse_field(fields.next(), "node id", path, line)?;
        let x: f64 = parse_field(fields.next(), "x", path, line)?;
        let y: f64 = parse_field(fields.next(), "y", path, line)?;
        if !graph.contains(id) {
            return Err(JoinError::malformed(path, line, format!("node {id} not in graph")));
        }
        points.push((id, (x, y)));
    }
    Ok(SpatialIndex::from_points(points))
}

/// Cross-edges with their line numbers. Each must be a graph edge of the
/// same weight.
fn read_crossedges<G: ReferenceGraph>(graph: &G, path: &Path) -> Result<Vec<(usize, Edge)>> {
    let reader = BufReader::new(File::open(path)?);
    let mut edges = Vec::new();
    for (idx, text) in reader.lines().enumerate() {
        let text = text?;
        let line = idx + 1;
        if text.trim().is_empty() {
            continue;
        }
        let mut fields = text.split('\t');
        let from: NodeId = parse_field(fields.next(), "source", path, line)?;
        let to: NodeId = parse_field(fields.next(), "target", path, line)?;
        let weight: f32 = parse_field(fields.next(), "weight", path, line)?;
        if !graph.contains(from) || !graph.contains(to) {
            return Err(JoinError::malformed(
                path,
                line,
                format!("cross-edge {from}->{to} not in graph"),
            ));
        }
        let is_link = graph
            .outgoing(from)
            .iter()
            .any(|link| link.node == to && link.weight.to_bits() == weight.to_bits());
        if !is_link {
            return Err(JoinError::malformed(
                path,
                line,
                format!("cross-edge {from}->{to} has no graph edge of weight {weight}"),
            ));
        }
        edges.push((line, Edge::new(from, to, weight)));
    }
    Ok(edges)
}
