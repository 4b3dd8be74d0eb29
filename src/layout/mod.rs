//! Layout algorithms for pedigree views.
//!
//! The ranker computes a linear vertical order for every person. The collapse
//! engine then hides or aggregates branches in place, keeping the displayed
//! rows compact. [`LayoutState`] ties both to one family and exports
//! snapshots for rendering.

pub mod collapse;
pub mod linearize;
pub mod state;

pub use collapse::{Collapser, HideOutcome, row_of};
pub use linearize::{Linearizer, RankSummary};
pub use state::{CoupleView, LayoutSnapshot, LayoutState, NodeView, ParentChildView, RowSelection};
