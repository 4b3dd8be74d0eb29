//! Pedigree data structures and construction.
//!
//! People live in a dense arena addressed by [`PersonIdx`]. Parent to child
//! links are mirrored into petgraph's StableGraph for structural checks, while
//! couple and parent-child edges are kept as flat lists for export.

mod builder;
mod edge;
mod engine;
mod node;

pub use builder::{BuildReport, PedigreeBuilder};
pub use edge::{CoupleEdge, EdgeId, Lineage, ParentChildEdge};
pub use engine::PedigreeGraph;
pub use node::{NodeState, PersonId, PersonIdx, PersonNode, Sex};
