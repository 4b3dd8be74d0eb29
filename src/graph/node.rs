//! Person node type and related structures.
//!
//! Each row of the family table becomes one [`PersonNode`]. Nodes live in a
//! dense arena owned by [`PedigreeGraph`](super::PedigreeGraph) and refer to
//! each other through [`PersonIdx`] handles:
//! - Raw parent ids from the table, resolved once into parent handles
//! - Spouse and child handle lists
//! - Current and original rank (vertical row) and x position
//! - Visibility flags (hidden, aggregated) plus collaborator flags

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a node in the pedigree arena.
///
/// Handles are only meaningful for the graph that issued them and are
/// invalidated by the next rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersonIdx(pub u32);

impl PersonIdx {
    /// Create a new PersonIdx from a raw u32.
    #[inline]
    pub fn new(idx: u32) -> Self {
        Self(idx)
    }

    /// Get the arena slot as a usize.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PersonIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

/// Person identifier as it appears in the family table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PersonId(pub i64);

impl PersonId {
    /// Get the raw id value.
    #[inline]
    pub fn raw(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Person({})", self.0)
    }
}

impl From<i64> for PersonId {
    #[inline]
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Recorded sex of a person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    /// Parse a sex code. `"M"` (any case) is male, everything else female.
    pub fn parse(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("m") {
            Sex::Male
        } else {
            Sex::Female
        }
    }

    /// Signed grid offset: males sit above their anchor row, females below.
    #[inline]
    pub fn offset(self, amount: f64) -> f64 {
        match self {
            Sex::Male => -amount,
            Sex::Female => amount,
        }
    }
}

/// Node state flags packed into a single byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeState {
    flags: u8,
}

impl NodeState {
    const HIDDEN: u8 = 0b0000_0001;
    const AGGREGATED: u8 = 0b0000_0010;
    const CLICKED: u8 = 0b0000_0100;

    /// Create a new default node state.
    #[inline]
    pub fn new() -> Self {
        Self { flags: 0 }
    }

    /// Check if the node is hidden.
    #[inline]
    pub fn is_hidden(self) -> bool {
        self.flags & Self::HIDDEN != 0
    }

    /// Check if the node is folded into an aggregate summary row.
    #[inline]
    pub fn is_aggregated(self) -> bool {
        self.flags & Self::AGGREGATED != 0
    }

    /// Hide the node, optionally keeping it as part of an aggregate row.
    #[inline]
    pub fn collapse(&mut self, aggregate: bool) {
        self.flags |= Self::HIDDEN;
        if aggregate {
            self.flags |= Self::AGGREGATED;
        } else {
            self.flags &= !Self::AGGREGATED;
        }
    }

    /// Make the node fully visible again.
    #[inline]
    pub fn reveal(&mut self) {
        self.flags &= !(Self::HIDDEN | Self::AGGREGATED);
    }

    /// Whether the node contributes a row to the table view.
    #[inline]
    pub fn shows_row(self) -> bool {
        self.is_aggregated() || !self.is_hidden()
    }

    /// Check if the node was clicked by the user.
    #[inline]
    pub fn is_clicked(self) -> bool {
        self.flags & Self::CLICKED != 0
    }

    /// Set the clicked flag.
    #[inline]
    pub fn set_clicked(&mut self, clicked: bool) {
        if clicked {
            self.flags |= Self::CLICKED;
        } else {
            self.flags &= !Self::CLICKED;
        }
    }
}

/// One individual of the pedigree.
#[derive(Debug, Clone)]
pub struct PersonNode {
    /// Identity from the table. Immutable after creation.
    pub id: PersonId,
    /// Source row index.
    pub row: usize,
    /// Raw mother id from the table.
    pub mother_id: Option<PersonId>,
    /// Raw father id from the table.
    pub father_id: Option<PersonId>,
    /// Resolved mother. `None` together with `father` marks a founder.
    pub mother: Option<PersonIdx>,
    /// Resolved father.
    pub father: Option<PersonIdx>,
    pub sex: Sex,
    /// Birth year; `0` when unknown.
    pub birth_year: i32,
    /// Derived from the caller's affected predicate.
    pub affected: bool,
    pub has_children: bool,
    /// Children in traversal order (re-sorted by the ranker).
    pub children: Vec<PersonIdx>,
    /// Partners this person shares at least one child with.
    pub spouses: Vec<PersonIdx>,
    /// Current vertical position.
    pub rank: f64,
    /// Rank right after the last full ranking pass.
    pub original_rank: f64,
    /// Horizontal position (birth year unless grouped under a parent).
    pub x: f64,
    /// `x` right after the last full ranking pass.
    pub original_x: f64,
    pub state: NodeState,
}

impl PersonNode {
    /// Create a node with default flags and no relationships.
    pub fn new(id: PersonId, row: usize, sex: Sex, birth_year: i32) -> Self {
        Self {
            id,
            row,
            mother_id: None,
            father_id: None,
            mother: None,
            father: None,
            sex,
            birth_year,
            affected: false,
            has_children: false,
            children: Vec::new(),
            spouses: Vec::new(),
            rank: 0.0,
            original_rank: 0.0,
            x: f64::from(birth_year),
            original_x: f64::from(birth_year),
            state: NodeState::new(),
        }
    }

    /// A founder has no resolvable parents in the current dataset.
    #[inline]
    pub fn is_founder(&self) -> bool {
        self.mother.is_none()
    }

    /// A leaf has no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        !self.has_children
    }

    /// Whether this node was born of exactly the (unordered) pair `a`, `b`.
    pub fn is_child_of_pair(&self, a: PersonIdx, b: PersonIdx) -> bool {
        match (self.mother, self.father) {
            (Some(ma), Some(pa)) => (ma == a && pa == b) || (ma == b && pa == a),
            _ => false,
        }
    }
}
