//! Relationship edges.
//!
//! Two kinds of edges connect people:
//! - Couple edges between two parents, one per distinct (mother, father) pair
//! - Parent-child edges, one per child with resolved parents

use serde::Serialize;

use super::node::PersonIdx;

/// Identifier of a couple edge, in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub u32);

impl EdgeId {
    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Parent-parent edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoupleEdge {
    pub id: EdgeId,
    pub mother: PersonIdx,
    pub father: PersonIdx,
}

/// Parent-child edge. Its identity is the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentChildEdge {
    pub mother: PersonIdx,
    pub father: PersonIdx,
    pub child: PersonIdx,
}

/// Which parent an edge of the lineage graph comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lineage {
    Maternal,
    Paternal,
}
