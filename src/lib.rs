//! Pedigree Layout - WASM Module
//!
//! This module builds a family pedigree from tabular rows and computes a
//! compact row layout for it: one vertical rank per person, couple and
//! parent-child edges, and collapse/expand state for uninteresting branches.
//! It is compiled to WebAssembly and exposes a JavaScript-friendly API via
//! wasm-bindgen.
//!
//! # Architecture
//!
//! - `table`: Column-oriented family table and loosely typed cells
//! - `graph`: Person arena, relationship edges and pedigree construction
//! - `layout`: Linear ranker, collapse/expand/trim engine, layout state
//! - `spatial`: R-tree spatial indexing for hit testing
//! - `config`: Layout tunables and the affected-state predicate

use js_sys::Float64Array;
use wasm_bindgen::prelude::*;

pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod spatial;
pub mod table;

pub use config::{AffectedFn, AffectedPredicate, AffectedRule, AffectedState, LayoutConfig};
pub use error::{LayoutError, Result};
pub use graph::{PedigreeGraph, PersonId};
pub use layout::{HideOutcome, LayoutSnapshot, LayoutState};
pub use table::{CellValue, FamilyTable, Row};

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    // a second init from another bundle keeps the first logger
    let _ = console_log::init_with_level(log::Level::Debug);
}

impl From<LayoutError> for JsValue {
    fn from(err: LayoutError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

fn from_js<T: serde::de::DeserializeOwned>(value: JsValue, what: &str) -> Result<T> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|err| LayoutError::InvalidInput(format!("{what}: {err}")))
}

fn to_js<T: serde::Serialize>(value: &T) -> std::result::Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

/// Main entry point for the layout engine.
///
/// This struct wraps the internal LayoutState and provides the public API
/// exposed to JavaScript. Snapshots are returned as plain JS objects.
#[wasm_bindgen]
pub struct PedigreeLayoutWasm {
    state: LayoutState,
}

#[wasm_bindgen]
impl PedigreeLayoutWasm {
    /// Create an engine with the default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            state: LayoutState::new(),
        }
    }

    /// Create an engine from a (partial) `LayoutConfig` object.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config: JsValue) -> std::result::Result<PedigreeLayoutWasm, JsValue> {
        let config: LayoutConfig = from_js(config, "config")?;
        Ok(Self {
            state: LayoutState::with_config(config),
        })
    }

    // =========================================================================
    // Layout Operations
    // =========================================================================

    /// Rebuild the layout from an array of row objects.
    ///
    /// `affected` is an `AffectedState` object such as
    /// `{ attribute: "suicide", rule: { kind: "equals", value: "Y" } }`;
    /// `undefined` uses the default.
    pub fn rebuild(
        &mut self,
        rows: JsValue,
        affected: JsValue,
    ) -> std::result::Result<JsValue, JsValue> {
        let rows: Vec<Row> = from_js(rows, "rows")?;
        let affected: AffectedState = if affected.is_undefined() || affected.is_null() {
            AffectedState::default()
        } else {
            from_js(affected, "affected state")?
        };

        let table = FamilyTable::from_rows(&rows);
        let snapshot = self.state.rebuild(&table, &affected)?;
        to_js(&snapshot)
    }

    /// Collapse the branch displayed on the row of `rank`, or expand it if it
    /// is already collapsed.
    #[wasm_bindgen(js_name = hideNodes)]
    pub fn hide_nodes(
        &mut self,
        rank: f64,
        aggregate: bool,
    ) -> std::result::Result<JsValue, JsValue> {
        let (_, snapshot) = self.state.hide_nodes(rank, aggregate);
        to_js(&snapshot)
    }

    /// Expand the branch rooted at the person with `id`.
    #[wasm_bindgen(js_name = expandBranch)]
    pub fn expand_branch(&mut self, id: f64) -> std::result::Result<JsValue, JsValue> {
        let snapshot = self.state.expand_branch(PersonId(id as i64))?;
        to_js(&snapshot)
    }

    /// Aggregate every collapsible branch.
    #[wasm_bindgen(js_name = collapseAll)]
    pub fn collapse_all(&mut self) -> std::result::Result<JsValue, JsValue> {
        to_js(&self.state.collapse_all())
    }

    /// Expand every hidden branch.
    #[wasm_bindgen(js_name = uncollapseAll)]
    pub fn uncollapse_all(&mut self) -> std::result::Result<JsValue, JsValue> {
        to_js(&self.state.uncollapse_all())
    }

    /// Record the clicked flag of a person.
    #[wasm_bindgen(js_name = setClicked)]
    pub fn set_clicked(&mut self, id: f64, clicked: bool) -> std::result::Result<(), JsValue> {
        self.state.set_clicked(PersonId(id as i64), clicked)?;
        Ok(())
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Current snapshot without changing the revision.
    pub fn snapshot(&self) -> std::result::Result<JsValue, JsValue> {
        to_js(&self.state.snapshot())
    }

    /// Revision of the last published snapshot.
    pub fn revision(&self) -> f64 {
        self.state.revision() as f64
    }

    /// Source row indices of the displayed people.
    #[wasm_bindgen(js_name = visibleRows)]
    pub fn visible_rows(&self) -> Vec<u32> {
        self.state.visible_rows().iter().map(|row| row as u32).collect()
    }

    /// Current ranks in source row order.
    #[wasm_bindgen(js_name = getRanks)]
    pub fn get_ranks(&self) -> Float64Array {
        let ranks: Vec<f64> = self.state.graph().nodes().iter().map(|n| n.rank).collect();
        Float64Array::from(&ranks[..])
    }

    /// Id of the displayed person nearest to `(x, y)` within `max_distance`.
    #[wasm_bindgen(js_name = findNodeAt)]
    pub fn find_node_at(&self, x: f64, y: f64, max_distance: f64) -> Option<f64> {
        self.state
            .node_at(x, y, max_distance)
            .map(|id| id.raw() as f64)
    }

    /// Ids of the displayed people inside a layout-space rectangle.
    #[wasm_bindgen(js_name = findNodesInRect)]
    pub fn find_nodes_in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<f64> {
        self.state
            .nodes_in(min_x, min_y, max_x, max_y)
            .into_iter()
            .map(|id| id.raw() as f64)
            .collect()
    }

    /// Number of people in the active family.
    #[wasm_bindgen(js_name = personCount)]
    pub fn person_count(&self) -> u32 {
        self.state.graph().len() as u32
    }
}

impl Default for PedigreeLayoutWasm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::graph::PersonIdx;
    use crate::layout::row_of;
    use std::collections::BTreeSet;

    fn row(id: i64, ma: i64, pa: i64, sex: &str, year: i64, affected: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), CellValue::from(id));
        row.insert("MaID".into(), CellValue::from(ma));
        row.insert("PaID".into(), CellValue::from(pa));
        row.insert("sex".into(), CellValue::from(sex));
        row.insert("bdate".into(), CellValue::from(year));
        row.insert("affected".into(), CellValue::from(affected));
        row
    }

    /// Three generations with remarriage, an affected line and a second
    /// unrelated founder couple.
    fn kindred() -> FamilyTable {
        FamilyTable::from_rows(&[
            row(1, 0, 0, "M", 1880, "N"),
            row(2, 0, 0, "F", 1882, "N"),
            row(3, 2, 1, "M", 1905, "Y"),
            row(4, 0, 0, "F", 1907, "N"),
            row(5, 0, 0, "F", 1912, "N"),
            row(6, 4, 3, "F", 1930, "N"),
            row(7, 4, 3, "M", 1932, "Y"),
            row(8, 5, 3, "M", 1940, "N"),
            row(9, 2, 1, "F", 1910, "N"),
            row(10, 0, 0, "M", 1908, "N"),
            row(11, 9, 10, "M", 1935, "N"),
            row(12, 9, 10, "F", 1938, "N"),
            row(13, 0, 0, "M", 1950, "N"),
            row(14, 0, 0, "F", 1952, "N"),
            row(15, 14, 13, "F", 1975, "N"),
        ])
    }

    fn built() -> LayoutState {
        let mut state = LayoutState::new();
        state.rebuild(&kindred(), &AffectedState::default()).unwrap();
        state
    }

    fn original_ranks(state: &LayoutState) -> Vec<(f64, f64)> {
        state
            .graph()
            .nodes()
            .iter()
            .map(|n| (n.original_rank, n.original_x))
            .collect()
    }

    fn assert_contiguous(state: &LayoutState) {
        let rows: BTreeSet<i64> = state
            .graph()
            .nodes()
            .iter()
            .map(|n| row_of(n.rank))
            .collect();
        let (lo, hi) = (*rows.first().unwrap(), *rows.last().unwrap());
        assert_eq!(rows.len() as i64, hi - lo + 1, "gap in rows {rows:?}");
    }

    fn assert_rows_distinct(state: &LayoutState, context: &str) {
        let mut seen = BTreeSet::new();
        for node in state.graph().nodes().iter().filter(|n| !n.state.is_hidden()) {
            assert!(
                seen.insert(row_of(node.rank)),
                "{} shares row {} ({context})",
                node.id,
                row_of(node.rank)
            );
        }
    }

    fn rank_of(state: &LayoutState, id: i64) -> f64 {
        state.graph().person(PersonId(id)).unwrap().rank
    }

    fn assert_restored(state: &LayoutState) {
        for node in state.graph().nodes() {
            assert_eq!(node.rank, node.original_rank, "{}", node.id);
            assert_eq!(node.x, node.original_x, "{}", node.id);
            assert!(!node.state.is_hidden(), "{}", node.id);
            assert!(!node.state.is_aggregated(), "{}", node.id);
        }
    }

    #[test]
    fn test_rank_uniqueness() {
        let state = built();
        let mut ranks: Vec<i64> = state.graph().nodes().iter().map(|n| n.rank as i64).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, (1..=15i64).collect::<Vec<_>>());
        for node in state.graph().nodes() {
            assert_eq!(node.rank.fract(), 0.0);
        }
    }

    #[test]
    fn test_couple_edges_deduplicated() {
        let state = built();
        let snapshot = state.snapshot();

        // (2,1) has two children, (4,3) two, (9,10) two
        assert_eq!(snapshot.couples.len(), 5);
        assert_eq!(snapshot.parent_child.len(), 8);
        let pairs: BTreeSet<(PersonId, PersonId)> = snapshot
            .couples
            .iter()
            .map(|c| (c.mother, c.father))
            .collect();
        assert_eq!(pairs.len(), snapshot.couples.len());
    }

    #[test]
    fn test_has_children_consistency() {
        let state = built();
        let graph = state.graph();
        for idx in graph.indices() {
            let parent = graph
                .parent_child_edges()
                .iter()
                .any(|e| e.mother == idx || e.father == idx);
            assert_eq!(graph[idx].has_children, parent, "{}", graph[idx].id);
        }
    }

    #[test]
    fn test_two_spouses_flank_partner() {
        let state = built();
        let rank = |id| state.graph().person(PersonId(id)).unwrap().rank;

        // 3 has spouses 4 and 5
        let (low, high) = if rank(4) < rank(5) {
            (rank(4), rank(5))
        } else {
            (rank(5), rank(4))
        };
        assert!(low < rank(3) && rank(3) < high);
    }

    #[test]
    fn test_hide_expand_round_trip_every_root() {
        let mut state = built();
        let before = original_ranks(&state);
        let roots: Vec<PersonIdx> = state.graph().indices().collect();

        for aggregate in [true, false] {
            for &root in &roots {
                let rank = state.graph()[root].rank;
                let (outcome, _) = state.hide_nodes(rank, aggregate);
                assert_contiguous(&state);

                match outcome {
                    HideOutcome::Collapsed { start } => {
                        let id = state.graph()[start].id;
                        state.expand_branch(id).unwrap();
                    }
                    HideOutcome::Expanded { .. } | HideOutcome::Empty => {}
                }
                assert_restored(&state);
            }
        }
        assert_eq!(original_ranks(&state), before);
    }

    #[test]
    fn test_expand_inside_hidden_branch() {
        let mut state = built();

        let (inner, _) = state.hide_nodes(rank_of(&state, 11), false);
        assert!(matches!(inner, HideOutcome::Collapsed { .. }));
        let (outer, _) = state.hide_nodes(rank_of(&state, 1), false);
        assert!(matches!(outer, HideOutcome::Collapsed { .. }));

        state.expand_branch(PersonId(11)).unwrap();
        let eleven = state.graph().person(PersonId(11)).unwrap();
        assert!(!eleven.state.is_hidden());
        assert_ne!(row_of(eleven.rank), row_of(rank_of(&state, 7)));
        assert_ne!(row_of(eleven.rank), row_of(rank_of(&state, 3)));
        assert_rows_distinct(&state, "expand 11 inside 1");
        assert_contiguous(&state);

        state.uncollapse_all();
        assert_restored(&state);
    }

    #[test]
    fn test_nested_hides_and_partial_expands() {
        let ids: Vec<i64> = (1..=15).collect();

        for aggregate in [true, false] {
            for &a in &ids {
                for &b in &ids {
                    let context = format!("hide {a}, {b} aggregate {aggregate}");
                    let mut state = built();
                    let mut starts = Vec::new();

                    for id in [a, b] {
                        let (outcome, _) = state.hide_nodes(rank_of(&state, id), aggregate);
                        if let HideOutcome::Collapsed { start } = outcome {
                            starts.push(state.graph()[start].id);
                        }
                        assert_rows_distinct(&state, &context);
                        assert_contiguous(&state);
                    }

                    for &start in &starts {
                        state.expand_branch(start).unwrap();
                        assert_rows_distinct(&state, &context);
                        assert_contiguous(&state);
                    }

                    state.uncollapse_all();
                    assert_restored(&state);
                }
            }
        }
    }

    #[test]
    fn test_contiguity_after_collapse_all() {
        let mut state = built();

        let snapshot = state.collapse_all();
        assert_contiguous(&state);
        let rows: BTreeSet<i64> = snapshot.ranks.values().copied().collect();
        assert!(rows.len() < 15);
        // affected people never hide
        for id in [3, 7] {
            assert!(!state.graph().person(PersonId(id)).unwrap().state.is_hidden());
        }

        state.uncollapse_all();
        assert_restored(&state);
        assert_eq!(state.visible_rows().len(), 15);
    }

    #[test]
    fn test_leaf_hide_leaves_other_branches() {
        let mut state = built();
        let leaf = state.graph().person(PersonId(15)).unwrap().rank;

        let (outcome, snapshot) = state.hide_nodes(leaf, true);
        assert!(matches!(outcome, HideOutcome::Collapsed { .. }));

        let node = state.graph().person(PersonId(15)).unwrap();
        assert!(node.state.is_hidden());
        assert!(node.state.is_aggregated());
        for other in state.graph().nodes().iter().filter(|n| n.id != PersonId(15)) {
            assert!(!other.state.is_hidden(), "{}", other.id);
        }
        assert_eq!(snapshot.visible_rows.len(), 15);
    }

    #[test]
    fn test_custom_predicate_and_config() {
        let mut table = kindred();
        table
            .add_column(
                "born",
                (0..table.nrow())
                    .map(|row| table.value("bdate", row).cloned().unwrap_or_default())
                    .collect(),
            )
            .unwrap();

        let config = LayoutConfig {
            birth_column: "born".to_string(),
            ..LayoutConfig::default()
        };
        let mut state = LayoutState::with_config(config);
        let old = AffectedFn::new("born", |v: &CellValue| {
            v.as_number().is_some_and(|year| year < 1900.0)
        });
        let snapshot = state.rebuild(&table, &old).unwrap();

        let affected: Vec<PersonId> = snapshot
            .nodes
            .iter()
            .filter(|n| n.affected)
            .map(|n| n.id)
            .collect();
        assert_eq!(affected, vec![PersonId(1), PersonId(2)]);
        assert_eq!(table.stats("born").unwrap().min, 1880.0);
    }
}
