//! Node coordinates with an R-tree for extent and nearest-node queries.
//!
//! Positions are kept in insertion order next to an rstar R-tree, so
//! iteration is deterministic and lookups by id are O(1).

use ordered_float::OrderedFloat;
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::graph::{FxIndexMap, NodeId};

/// A 2D point (x, y).
pub type Point = (f64, f64);

/// A rectangle defined by (x0, y0, x1, y1) with x0 <= x1 and y0 <= y1.
pub type Rect = (f64, f64, f64, f64);

#[derive(Clone, Copy, Debug, PartialEq)]
struct IndexedPoint {
    id: NodeId,
    pos: [f64; 2],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.pos)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.pos[0] - point[0];
        let dy = self.pos[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Coordinate axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    const fn coord(self, p: Point) -> f64 {
        match self {
            Self::X => p.0,
            Self::Y => p.1,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SpatialIndex {
    positions: FxIndexMap<NodeId, Point>,
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-load an index. Later duplicates of an id win.
    pub fn from_points(points: impl IntoIterator<Item = (NodeId, Point)>) -> Self {
        let mut positions = FxIndexMap::default();
        for (id, pos) in points {
            positions.insert(id, pos);
        }
        let tree = RTree::bulk_load(
            positions
                .iter()
                .map(|(&id, &(x, y))| IndexedPoint { id, pos: [x, y] })
                .collect(),
        );
        Self { positions, tree }
    }

    /// Insert or move a node.
    pub fn insert(&mut self, id: NodeId, pos: Point) {
        if let Some(old) = self.positions.insert(id, pos) {
            self.tree.remove(&IndexedPoint {
                id,
                pos: [old.0, old.1],
            });
        }
        self.tree.insert(IndexedPoint {
            id,
            pos: [pos.0, pos.1],
        });
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn position(&self, id: NodeId) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    /// Nodes with positions, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Point)> + '_ {
        self.positions.iter().map(|(&id, &pos)| (id, pos))
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.positions.keys().copied()
    }

    pub fn bounding_box(&self) -> Option<Rect> {
        if self.is_empty() {
            return None;
        }
        let env = self.tree.root().envelope();
        let (lo, hi) = (env.lower(), env.upper());
        Some((lo[0], lo[1], hi[0], hi[1]))
    }

    /// Larger of the x and y extents; zero when empty.
    pub fn spread(&self) -> f64 {
        self.bounding_box()
            .map_or(0.0, |(x0, y0, x1, y1)| (x1 - x0).max(y1 - y0))
    }

    /// Axis with the larger extent (X on ties).
    pub fn spread_axis(&self) -> Axis {
        match self.bounding_box() {
            Some((x0, y0, x1, y1)) if y1 - y0 > x1 - x0 => Axis::Y,
            _ => Axis::X,
        }
    }

    /// Lowest and highest node along `axis`.
    ///
    /// Ties on the coordinate resolve to the smallest id for the low end and
    /// the largest id for the high end, so two or more nodes always yield
    /// two distinct ids.
    pub fn extreme_points(&self, axis: Axis) -> Option<(NodeId, NodeId)> {
        let key = |(id, pos): &(NodeId, Point)| (OrderedFloat(axis.coord(*pos)), *id);
        let lo = self.iter().min_by_key(key)?;
        let hi = self.iter().max_by_key(key)?;
        Some((lo.0, hi.0))
    }

    /// Node closest to (x, y) by Euclidean distance.
    pub fn nearest(&self, x: f64, y: f64) -> Option<NodeId> {
        self.tree.nearest_neighbor(&[x, y]).map(|p| p.id)
    }

    /// Nodes inside `rect`, boundary included.
    pub fn within(&self, rect: Rect) -> Vec<NodeId> {
        let env = AABB::from_corners([rect.0, rect.1], [rect.2, rect.3]);
        let mut ids: Vec<_> = self
            .tree
            .locate_in_envelope(&env)
            .map(|p| p.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}
