//! Cell values of the family table.
//!
//! Cells arrive from a loosely typed source (JavaScript objects, TSV exports),
//! so a value may be numeric, textual, boolean or missing. Numeric coercion
//! follows the source data conventions: blank text is zero, anything that does
//! not parse is treated as absent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell of the family table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    /// Boolean flag (e.g. an affected indicator exported as true/false).
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Free text or categorical code.
    Text(String),
    /// No value present.
    #[default]
    Missing,
}

impl CellValue {
    /// Interpret the cell as a number.
    ///
    /// Blank text coerces to `0`; non-numeric text, NaN and missing cells
    /// return `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Number(_) => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
                }
            }
            CellValue::Missing => None,
        }
    }

    /// Interpret the cell as an integer, truncating any fractional part.
    pub fn as_integer(&self) -> Option<i64> {
        self.as_number().map(|n| n as i64)
    }

    /// Borrow the cell as text, if it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Check if the cell is missing.
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Missing => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}
