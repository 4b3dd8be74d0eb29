//! Layout configuration and the affected-state predicate.
//!
//! Both are plain serde structures so a JavaScript host can pass them as
//! objects. Every field has a default, so partial objects are accepted.

use serde::{Deserialize, Serialize};

use crate::table::CellValue;

/// Tunables of the layout engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Column holding the person id.
    pub id_column: String,
    /// Column holding the mother id.
    pub mother_column: String,
    /// Column holding the father id.
    pub father_column: String,
    /// Column holding the sex code.
    pub sex_column: String,
    /// Column holding the birth year.
    pub birth_column: String,
    /// Row offset of a collapsed child placed next to one parent or the cursor.
    pub kid_grid_offset: f64,
    /// Row offset of a collapsed child placed between two affected parents.
    pub parent_grid_offset: f64,
    /// Years subtracted from a child's birth year to estimate an unknown parent's.
    pub birth_year_gap: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            id_column: "id".to_string(),
            mother_column: "MaID".to_string(),
            father_column: "PaID".to_string(),
            sex_column: "sex".to_string(),
            birth_column: "bdate".to_string(),
            kid_grid_offset: 0.2,
            parent_grid_offset: 0.3,
            birth_year_gap: 20,
        }
    }
}

/// Decides which people count as affected.
pub trait AffectedPredicate {
    /// Column the predicate reads.
    fn attribute(&self) -> &str;

    /// Whether a cell of [`attribute`](Self::attribute) marks the person affected.
    fn is_affected(&self, value: &CellValue) -> bool;
}

/// Rule applied to the affected attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum AffectedRule {
    /// Cell equals the value (numbers compare numerically, text exactly).
    Equals(CellValue),
    /// Cell equals any of the values.
    OneOf(Vec<CellValue>),
    /// Numeric cell at or above the threshold.
    AtLeast(f64),
    /// Numeric cell at or below the threshold.
    AtMost(f64),
}

impl AffectedRule {
    fn matches(&self, value: &CellValue) -> bool {
        match self {
            AffectedRule::Equals(expected) => cells_equal(expected, value),
            AffectedRule::OneOf(expected) => expected.iter().any(|e| cells_equal(e, value)),
            AffectedRule::AtLeast(threshold) => {
                value.as_number().is_some_and(|n| n >= *threshold)
            }
            AffectedRule::AtMost(threshold) => value.as_number().is_some_and(|n| n <= *threshold),
        }
    }
}

fn cells_equal(expected: &CellValue, value: &CellValue) -> bool {
    match (expected, value) {
        (CellValue::Text(a), CellValue::Text(b)) => a == b,
        (CellValue::Missing, _) | (_, CellValue::Missing) => false,
        (CellValue::Text(_), _) | (_, CellValue::Text(_)) => false,
        _ => match (expected.as_number(), value.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Serializable affected-state definition: an attribute and a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffectedState {
    pub attribute: String,
    pub rule: AffectedRule,
}

impl AffectedState {
    /// Create a definition for `attribute`.
    pub fn new(attribute: impl Into<String>, rule: AffectedRule) -> Self {
        Self {
            attribute: attribute.into(),
            rule,
        }
    }
}

impl Default for AffectedState {
    fn default() -> Self {
        Self::new("affected", AffectedRule::Equals(CellValue::from("Y")))
    }
}

impl AffectedPredicate for AffectedState {
    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn is_affected(&self, value: &CellValue) -> bool {
        self.rule.matches(value)
    }
}

/// Closure-backed predicate.
pub struct AffectedFn<F> {
    attribute: String,
    test: F,
}

impl<F> AffectedFn<F>
where
    F: Fn(&CellValue) -> bool,
{
    /// Wrap a closure testing cells of `attribute`.
    pub fn new(attribute: impl Into<String>, test: F) -> Self {
        Self {
            attribute: attribute.into(),
            test,
        }
    }
}

impl<F> AffectedPredicate for AffectedFn<F>
where
    F: Fn(&CellValue) -> bool,
{
    fn attribute(&self) -> &str {
        &self.attribute
    }

    fn is_affected(&self, value: &CellValue) -> bool {
        (self.test)(value)
    }
}
