//! Column-oriented table holding the rows of the active family.

use indexmap::IndexMap;
use serde::Serialize;

use super::value::CellValue;
use crate::error::{LayoutError, Result};
use crate::graph::PersonId;

/// A row as delivered by the data collaborator: column name to cell.
pub type Row = IndexMap<String, CellValue>;

/// Summary statistics of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnStats {
    /// Smallest numeric value.
    pub min: f64,
    /// Largest numeric value.
    pub max: f64,
    /// Arithmetic mean of the numeric values.
    pub mean: f64,
    /// Number of cells that contributed (non-numeric cells are skipped).
    pub count: usize,
}

/// The family table.
///
/// Columns are kept in insertion order and all have `nrow` cells. A column that
/// is absent for some rows (when built from row maps) is padded with
/// [`CellValue::Missing`].
#[derive(Debug, Clone, Default)]
pub struct FamilyTable {
    /// Ordered map of column name -> cells.
    columns: IndexMap<String, Vec<CellValue>>,
    /// Number of rows.
    nrow: usize,
}

impl FamilyTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from named column vectors.
    ///
    /// # Errors
    /// Returns [`LayoutError::ColumnLength`] if the columns differ in length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<CellValue>)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, cells) in columns {
            table.add_column(name, cells)?;
        }
        Ok(table)
    }

    /// Build a table from row maps, taking columns in first-seen order.
    pub fn from_rows(rows: &[Row]) -> Self {
        let mut columns: IndexMap<String, Vec<CellValue>> = IndexMap::new();
        for row in rows {
            for name in row.keys() {
                if !columns.contains_key(name) {
                    columns.insert(name.clone(), Vec::with_capacity(rows.len()));
                }
            }
        }

        for row in rows {
            for (name, cells) in columns.iter_mut() {
                cells.push(row.get(name).cloned().unwrap_or_default());
            }
        }

        Self {
            columns,
            nrow: rows.len(),
        }
    }

    /// Append a column.
    ///
    /// # Errors
    /// Returns [`LayoutError::ColumnLength`] if the table already has columns
    /// and `cells` has a different length.
    pub fn add_column(&mut self, name: impl Into<String>, cells: Vec<CellValue>) -> Result<()> {
        let name = name.into();
        if !self.columns.is_empty() && cells.len() != self.nrow {
            return Err(LayoutError::ColumnLength {
                name,
                expected: self.nrow,
                got: cells.len(),
            });
        }
        self.nrow = cells.len();
        self.columns.insert(name, cells);
        Ok(())
    }

    /// Number of rows.
    pub fn nrow(&self) -> usize {
        self.nrow
    }

    /// Number of columns.
    pub fn ncol(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.nrow == 0
    }

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Borrow a column by name.
    pub fn column(&self, name: &str) -> Option<&[CellValue]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Look up a single cell. Missing columns and out-of-range rows yield `None`.
    pub fn value(&self, name: &str, row: usize) -> Option<&CellValue> {
        self.columns.get(name).and_then(|cells| cells.get(row))
    }

    /// Person ids in row order, read from `id_column`.
    ///
    /// Cells that do not hold a number map to id `0`.
    pub fn names(&self, id_column: &str) -> Vec<PersonId> {
        (0..self.nrow)
            .map(|row| {
                let id = self
                    .value(id_column, row)
                    .and_then(CellValue::as_integer)
                    .unwrap_or(0);
                PersonId(id)
            })
            .collect()
    }

    /// Min/max/mean of a numeric column, or `None` if it has no numeric cells.
    pub fn stats(&self, name: &str) -> Option<ColumnStats> {
        let cells = self.columns.get(name)?;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for value in cells.iter().filter_map(CellValue::as_number) {
            min = min.min(value);
            max = max.max(value);
            sum += value;
            count += 1;
        }

        if count == 0 {
            return None;
        }

        Some(ColumnStats {
            min,
            max,
            mean: sum / count as f64,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, CellValue)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_from_rows_pads_missing_columns() {
        let rows = vec![
            row(&[("id", 1.0.into()), ("bdate", 1900.0.into())]),
            row(&[("id", 2.0.into()), ("sex", "F".into())]),
        ];
        let table = FamilyTable::from_rows(&rows);

        assert_eq!(table.nrow(), 2);
        assert_eq!(table.ncol(), 3);
        assert_eq!(
            table.column_names().collect::<Vec<_>>(),
            vec!["id", "bdate", "sex"]
        );
        assert_eq!(table.value("sex", 0), Some(&CellValue::Missing));
        assert_eq!(table.value("bdate", 1), Some(&CellValue::Missing));
    }

    #[test]
    fn test_from_columns_length_mismatch() {
        let result = FamilyTable::from_columns([
            ("id", vec![CellValue::from(1.0), CellValue::from(2.0)]),
            ("sex", vec![CellValue::from("M")]),
        ]);
        assert_eq!(
            result.unwrap_err(),
            LayoutError::ColumnLength {
                name: "sex".into(),
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_names_default_to_zero() {
        let table = FamilyTable::from_columns([(
            "id",
            vec![10.0.into(), "x".into(), CellValue::Missing],
        )])
        .unwrap();
        assert_eq!(table.names("id"), vec![PersonId(10), PersonId(0), PersonId(0)]);
    }

    #[test]
    fn test_stats_skips_non_numeric() {
        let table = FamilyTable::from_columns([(
            "bdate",
            vec![1900.0.into(), "n/a".into(), 1950.0.into(), CellValue::Missing],
        )])
        .unwrap();
        let stats = table.stats("bdate").unwrap();
        assert_eq!(stats.min, 1900.0);
        assert_eq!(stats.max, 1950.0);
        assert_eq!(stats.mean, 1925.0);
        assert_eq!(stats.count, 2);

        assert!(table.stats("missing").is_none());
    }
}
