//! R-tree over displayed people using the rstar crate.
//!
//! Points live in layout space: `x` is the horizontal position (birth year
//! or kid-grid position) and `y` the current rank.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::graph::PersonIdx;

/// A displayed person at a layout position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonPoint {
    pub idx: PersonIdx,
    pub x: f64,
    pub y: f64,
}

impl PersonPoint {
    pub fn new(idx: PersonIdx, x: f64, y: f64) -> Self {
        Self { idx, x, y }
    }
}

impl RTreeObject for PersonPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for PersonPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        (self.x - point[0]).abs() < f64::EPSILON && (self.y - point[1]).abs() < f64::EPSILON
    }
}

/// Spatial index of displayed people.
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<PersonPoint>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `points`, bulk loading the tree.
    pub fn rebuild(&mut self, points: Vec<PersonPoint>) {
        self.tree = RTree::bulk_load(points);
    }

    /// Nearest person no farther than `max_distance` from `(x, y)`.
    pub fn nearest_within(&self, x: f64, y: f64, max_distance: f64) -> Option<PersonIdx> {
        let max_distance_sq = max_distance * max_distance;
        self.tree
            .nearest_neighbor(&[x, y])
            .filter(|point| point.distance_2(&[x, y]) <= max_distance_sq)
            .map(|point| point.idx)
    }

    /// People inside a rectangle, e.g. the visible viewport.
    pub fn in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<PersonIdx> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        self.tree
            .locate_in_envelope(&envelope)
            .map(|point| point.idx)
            .collect()
    }
}
