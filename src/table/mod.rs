//! Tabular input of the layout engine.
//!
//! The data collaborator hands over the active family as an ordered sequence
//! of column vectors. This module provides that table, its loosely typed cell
//! values and the per-column statistics used by renderers.

mod frame;
mod value;

pub use frame::{ColumnStats, FamilyTable, Row};
pub use value::CellValue;
