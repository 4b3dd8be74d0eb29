//! Spatial indexing for hit testing.
//!
//! Resolves a click in layout space to the nearest displayed person.

mod rtree;

pub use rtree::{PersonPoint, SpatialIndex};
