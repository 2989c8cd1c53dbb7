//! Text loaders for edge lists and node coordinates.
//!
//! Both formats are line oriented and whitespace separated; blank lines and
//! lines starting with `#` are skipped.
//!
//! - edge list: `from to weight`
//! - coordinates: `id x y`

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use super::{AdjacencyGraph, NodeId, ReferenceGraph};
use crate::error::{JoinError, Result};
use crate::spatial::SpatialIndex;

fn records<R: BufRead>(reader: R) -> impl Iterator<Item = (usize, std::io::Result<String>)> {
    reader
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .filter(|(_, line)| {
            line.as_ref()
                .map_or(true, |l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        })
}

pub(crate) fn parse_field<T: FromStr>(
    field: Option<&str>,
    name: &str,
    path: &Path,
    line: usize,
) -> Result<T> {
    let raw = field.ok_or_else(|| JoinError::malformed(path, line, format!("missing {name}")))?;
    raw.parse()
        .map_err(|_| JoinError::malformed(path, line, format!("bad {name} {raw:?}")))
}

/// Read an edge list into a graph. `path` is only used in error messages.
pub fn read_edge_list<R: BufRead>(reader: R, path: &Path, directed: bool) -> Result<AdjacencyGraph> {
    let mut graph = if directed {
        AdjacencyGraph::new_directed()
    } else {
        AdjacencyGraph::new_undirected()
    };
    for (line, text) in records(reader) {
        let text = text?;
        let mut fields = text.split_whitespace();
        let from: NodeId = parse_field(fields.next(), "source", path, line)?;
        let to: NodeId = parse_field(fields.next(), "target", path, line)?;
        let weight: f32 = parse_field(fields.next(), "weight", path, line)?;
        graph
            .add_edge(from, to, weight)
            .map_err(|e| JoinError::malformed(path, line, e.to_string()))?;
    }
    Ok(graph)
}

pub fn load_edge_list(path: impl AsRef<Path>, directed: bool) -> Result<AdjacencyGraph> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let graph = read_edge_list(BufReader::new(file), path, directed)?;
    tracing::info!(
        "Loaded graph {:?}: {} nodes, {} edges",
        path,
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

/// Read node coordinates into a spatial index.
pub fn read_coordinates<R: BufRead>(reader: R, path: &Path) -> Result<SpatialIndex> {
    let mut points = Vec::new();
    for (line, text) in records(reader) {
        let text = text?;
        let mut fields = text.split_whitespace();
        let id: NodeId = parse_field(fields.next(), "node id", path, line)?;
        let x: f64 = parse_field(fields.next(), "x", path, line)?;
        let y: f64 = parse_field(fields.next(), "y", path, line)?;
        if !x.is_finite() || !y.is_finite() {
            return Err(JoinError::malformed(path, line, "non-finite coordinate"));
        }
        points.push((id, (x, y)));
    }
    Ok(SpatialIndex::from_points(points))
}

pub fn load_coordinates(path: impl AsRef<Path>) -> Result<SpatialIndex> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let index = read_coordinates(BufReader::new(file), path)?;
    tracing::info!("Loaded {} coordinates from {:?}", index.len(), path);
    Ok(index)
}
