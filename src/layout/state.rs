//! LayoutState - the layout context owned by the caller.
//!
//! Holds the pedigree of the active family together with everything derived
//! from it. Every mutating call returns a fresh [`LayoutSnapshot`] for the
//! rendering and table collaborators.

use log::debug;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::collapse::{Collapser, HideOutcome, row_of};
use super::linearize::Linearizer;
use crate::config::{AffectedPredicate, LayoutConfig};
use crate::error::{LayoutError, Result};
use crate::graph::{BuildReport, PedigreeBuilder, PedigreeGraph, PersonId, PersonIdx};
use crate::spatial::{PersonPoint, SpatialIndex};
use crate::table::FamilyTable;

/// Sorted, deduplicated source row indices of the displayed people.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RowSelection(Vec<usize>);

impl RowSelection {
    fn from_rows(mut rows: Vec<usize>) -> Self {
        rows.sort_unstable();
        rows.dedup();
        Self(rows)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, row: usize) -> bool {
        self.0.binary_search(&row).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a RowSelection {
    type Item = usize;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, usize>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

/// Render data of one person.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: PersonId,
    pub row: usize,
    pub y: f64,
    pub x: f64,
    pub hidden: bool,
    pub aggregated: bool,
    pub affected: bool,
}

/// Couple edge by person id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CoupleView {
    /// Couple edge id, in creation order.
    pub id: u32,
    pub mother: PersonId,
    pub father: PersonId,
}

/// Parent-child edge by person id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParentChildView {
    pub mother: PersonId,
    pub father: PersonId,
    pub child: PersonId,
}

/// Exported layout after a rebuild or mutation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSnapshot {
    /// Incremented by every rebuild and every mutation.
    pub revision: u64,
    /// Rounded rank per person id.
    pub ranks: BTreeMap<PersonId, i64>,
    pub visible_rows: RowSelection,
    pub nodes: Vec<NodeView>,
    pub couples: Vec<CoupleView>,
    pub parent_child: Vec<ParentChildView>,
}

/// Layout of the active family.
#[derive(Default)]
pub struct LayoutState {
    config: LayoutConfig,
    graph: PedigreeGraph,
    /// First source row of every person id.
    row_of_id: HashMap<PersonId, usize>,
    spatial: SpatialIndex,
    report: BuildReport,
    revision: u64,
}

impl LayoutState {
    /// Create an empty state with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty state with `config`.
    pub fn with_config(config: LayoutConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn graph(&self) -> &PedigreeGraph {
        &self.graph
    }

    /// Counters of the last successful rebuild.
    pub fn report(&self) -> BuildReport {
        self.report
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Rebuild nodes, edges and ranks for a family.
    ///
    /// On error the previous layout is kept.
    ///
    /// # Errors
    /// Returns [`LayoutError::CyclicPedigree`] for a cyclic family.
    pub fn rebuild(
        &mut self,
        table: &FamilyTable,
        predicate: &dyn AffectedPredicate,
    ) -> Result<LayoutSnapshot> {
        let (mut graph, report) = PedigreeBuilder::new(&self.config).build(table, predicate)?;
        Linearizer::new(&mut graph).run(&self.config);

        let mut row_of_id = HashMap::with_capacity(graph.len());
        for node in graph.nodes() {
            row_of_id.entry(node.id).or_insert(node.row);
        }

        self.graph = graph;
        self.row_of_id = row_of_id;
        self.report = report;
        debug!(
            "rebuilt layout for {} people on attribute '{}'",
            self.graph.len(),
            predicate.attribute()
        );
        Ok(self.publish())
    }

    /// Collapse (or toggle back) the branch displayed on the row of `rank`.
    pub fn hide_nodes(&mut self, rank: f64, aggregate: bool) -> (HideOutcome, LayoutSnapshot) {
        let outcome = Collapser::new(&mut self.graph, &self.config).hide_nodes(rank, aggregate);
        let snapshot = if outcome.changed() {
            self.publish()
        } else {
            self.snapshot()
        };
        (outcome, snapshot)
    }

    /// Expand the branch rooted at `person`.
    ///
    /// # Errors
    /// Returns [`LayoutError::UnknownPerson`] if `person` is not in the family.
    pub fn expand_branch(&mut self, person: PersonId) -> Result<LayoutSnapshot> {
        let start = self.index_of(person)?;
        if Collapser::new(&mut self.graph, &self.config).expand_branch(start) {
            Ok(self.publish())
        } else {
            Ok(self.snapshot())
        }
    }

    /// Aggregate every collapsible branch.
    pub fn collapse_all(&mut self) -> LayoutSnapshot {
        if Collapser::new(&mut self.graph, &self.config).collapse_all() > 0 {
            self.publish()
        } else {
            self.snapshot()
        }
    }

    /// Expand every hidden branch.
    pub fn uncollapse_all(&mut self) -> LayoutSnapshot {
        if Collapser::new(&mut self.graph, &self.config).uncollapse_all() > 0 {
            self.publish()
        } else {
            self.snapshot()
        }
    }

    /// Record whether the user clicked `person`.
    ///
    /// # Errors
    /// Returns [`LayoutError::UnknownPerson`] if `person` is not in the family.
    pub fn set_clicked(&mut self, person: PersonId, clicked: bool) -> Result<()> {
        let idx = self.index_of(person)?;
        self.graph[idx].state.set_clicked(clicked);
        Ok(())
    }

    /// Rounded rank per person id. Duplicated ids report their first row.
    pub fn y_values(&self) -> BTreeMap<PersonId, i64> {
        let mut ranks = BTreeMap::new();
        for node in self.graph.nodes() {
            ranks.entry(node.id).or_insert_with(|| row_of(node.rank));
        }
        ranks
    }

    /// Source rows of everyone visible or shown in an aggregate row.
    pub fn visible_rows(&self) -> RowSelection {
        let rows = self
            .graph
            .nodes()
            .iter()
            .filter(|node| node.state.shows_row())
            .filter_map(|node| self.row_of_id.get(&node.id).copied())
            .collect();
        RowSelection::from_rows(rows)
    }

    /// Nearest displayed person to a point in layout space.
    pub fn node_at(&self, x: f64, y: f64, max_distance: f64) -> Option<PersonId> {
        self.spatial
            .nearest_within(x, y, max_distance)
            .and_then(|idx| self.graph.get(idx))
            .map(|node| node.id)
    }

    /// Displayed people inside a layout-space rectangle, in row order.
    pub fn nodes_in(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<PersonId> {
        let mut found = self.spatial.in_rect(min_x, min_y, max_x, max_y);
        found.sort_unstable();
        found
            .into_iter()
            .filter_map(|idx| self.graph.get(idx))
            .map(|node| node.id)
            .collect()
    }

    /// Current export without bumping the revision.
    pub fn snapshot(&self) -> LayoutSnapshot {
        let graph = &self.graph;
        let id = |idx: PersonIdx| graph[idx].id;

        LayoutSnapshot {
            revision: self.revision,
            ranks: self.y_values(),
            visible_rows: self.visible_rows(),
            nodes: graph
                .nodes()
                .iter()
                .map(|node| NodeView {
                    id: node.id,
                    row: node.row,
                    y: node.rank,
                    x: node.x,
                    hidden: node.state.is_hidden(),
                    aggregated: node.state.is_aggregated(),
                    affected: node.affected,
                })
                .collect(),
            couples: graph
                .couples()
                .iter()
                .map(|edge| CoupleView {
                    id: edge.id.raw(),
                    mother: id(edge.mother),
                    father: id(edge.father),
                })
                .collect(),
            parent_child: graph
                .parent_child_edges()
                .iter()
                .map(|edge| ParentChildView {
                    mother: id(edge.mother),
                    father: id(edge.father),
                    child: id(edge.child),
                })
                .collect(),
        }
    }

    fn index_of(&self, person: PersonId) -> Result<PersonIdx> {
        self.graph
            .index_of(person)
            .ok_or(LayoutError::UnknownPerson(person))
    }

    fn publish(&mut self) -> LayoutSnapshot {
        self.revision += 1;
        let points = self
            .graph
            .indices()
            .filter(|&idx| self.graph[idx].state.shows_row())
            .map(|idx| PersonPoint::new(idx, self.graph[idx].x, self.graph[idx].rank))
            .collect();
        self.spatial.rebuild(points);
        self.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AffectedState;
    use crate::table::{CellValue, Row};

    fn row(id: i64, ma: Option<i64>, pa: Option<i64>, sex: &str, year: i64, aff: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), CellValue::from(id));
        row.insert("MaID".into(), ma.map(CellValue::from).unwrap_or_default());
        row.insert("PaID".into(), pa.map(CellValue::from).unwrap_or_default());
        row.insert("sex".into(), CellValue::from(sex));
        row.insert("bdate".into(), CellValue::from(year));
        row.insert("affected".into(), CellValue::from(aff));
        row
    }

    fn five_person() -> FamilyTable {
        FamilyTable::from_rows(&[
            row(1, None, None, "M", 1900, "N"),
            row(2, None, None, "F", 1902, "N"),
            row(3, Some(2), Some(1), "M", 1925, "N"),
            row(4, Some(2), Some(1), "F", 1923, "N"),
            row(5, Some(4), None, "M", 1948, "N"),
        ])
    }

    fn built() -> (LayoutState, LayoutSnapshot) {
        let mut state = LayoutState::new();
        let snapshot = state
            .rebuild(&five_person(), &AffectedState::default())
            .unwrap();
        (state, snapshot)
    }

    #[test]
    fn test_rebuild_exports_ranks_and_rows() {
        let (state, snapshot) = built();

        assert_eq!(snapshot.revision, 1);
        let ranks: Vec<i64> = (1..=5).map(|id| snapshot.ranks[&PersonId(id)]).collect();
        assert_eq!(ranks, vec![5, 4, 3, 2, 1]);
        assert_eq!(snapshot.visible_rows.as_slice(), &[0, 1, 2, 3, 4]);
        assert_eq!(snapshot.couples.len(), 1);
        assert_eq!(
            snapshot.parent_child,
            vec![
                ParentChildView {
                    mother: PersonId(2),
                    father: PersonId(1),
                    child: PersonId(3),
                },
                ParentChildView {
                    mother: PersonId(2),
                    father: PersonId(1),
                    child: PersonId(4),
                },
            ]
        );
        assert_eq!(state.report().founders, 3);
        assert_eq!(state.snapshot(), snapshot);
    }

    #[test]
    fn test_hide_hidden_mode_removes_rows() {
        let (mut state, _) = built();

        let (outcome, snapshot) = state.hide_nodes(5.0, false);
        assert!(matches!(outcome, HideOutcome::Collapsed { .. }));
        assert_eq!(snapshot.revision, 2);
        assert_eq!(snapshot.visible_rows.as_slice(), &[4]);
        assert_eq!(snapshot.ranks[&PersonId(1)], 2);
        assert_eq!(snapshot.ranks[&PersonId(5)], 1);
    }

    #[test]
    fn test_empty_row_keeps_revision() {
        let (mut state, _) = built();

        let (outcome, snapshot) = state.hide_nodes(99.0, true);
        assert_eq!(outcome, HideOutcome::Empty);
        assert_eq!(snapshot.revision, 1);
    }

    #[test]
    fn test_expand_unknown_person() {
        let (mut state, _) = built();

        let err = state.expand_branch(PersonId(77)).unwrap_err();
        assert_eq!(err, LayoutError::UnknownPerson(PersonId(77)));
        assert!(state.set_clicked(PersonId(77), true).is_err());
    }

    #[test]
    fn test_expand_branch_by_id() {
        let (mut state, _) = built();

        state.hide_nodes(5.0, true);
        let snapshot = state.expand_branch(PersonId(1)).unwrap();
        assert_eq!(snapshot.revision, 3);
        assert!(snapshot.nodes.iter().all(|n| !n.hidden && !n.aggregated));
        assert_eq!(snapshot.ranks[&PersonId(3)], 3);
    }

    #[test]
    fn test_set_clicked() {
        let (mut state, _) = built();

        state.set_clicked(PersonId(3), true).unwrap();
        assert!(state.graph().person(PersonId(3)).unwrap().state.is_clicked());
        assert_eq!(state.revision(), 1);
    }

    #[test]
    fn test_node_at() {
        let (mut state, _) = built();

        assert_eq!(state.node_at(1925.0, 3.1, 1.0), Some(PersonId(3)));
        assert_eq!(state.node_at(1700.0, 3.0, 1.0), None);

        // hidden people drop out of hit testing
        state.hide_nodes(5.0, false);
        assert_eq!(state.node_at(1900.0, 2.0, 5.0), None);
        assert_eq!(state.node_at(1948.0, 1.0, 1.0), Some(PersonId(5)));
    }

    #[test]
    fn test_nodes_in_viewport() {
        let (mut state, _) = built();

        assert_eq!(
            state.nodes_in(1890.0, 3.5, 1910.0, 6.0),
            vec![PersonId(1), PersonId(2)]
        );

        state.hide_nodes(5.0, false);
        assert_eq!(
            state.nodes_in(0.0, -100.0, 3000.0, 100.0),
            vec![PersonId(5)]
        );
    }

    #[test]
    fn test_duplicate_id_uses_first_row() {
        let table = FamilyTable::from_rows(&[
            row(1, None, None, "M", 1900, "N"),
            row(2, None, None, "F", 1950, "N"),
            row(1, None, None, "M", 1960, "N"),
        ]);
        let mut state = LayoutState::new();
        let snapshot = state.rebuild(&table, &AffectedState::default()).unwrap();

        assert_eq!(snapshot.nodes.len(), 3);
        assert_eq!(snapshot.ranks.len(), 2);
        assert_eq!(snapshot.ranks[&PersonId(1)], 3);
        assert_eq!(snapshot.visible_rows.as_slice(), &[0, 1]);
    }

    #[test]
    fn test_cyclic_rebuild_keeps_previous_layout() {
        let (mut state, before) = built();
        let cyclic = FamilyTable::from_rows(&[
            row(1, Some(2), Some(3), "F", 1900, "N"),
            row(2, Some(1), Some(3), "F", 1900, "N"),
            row(3, None, None, "M", 1900, "N"),
        ]);

        let err = state
            .rebuild(&cyclic, &AffectedState::default())
            .unwrap_err();
        assert!(matches!(err, LayoutError::CyclicPedigree { .. }));
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn test_operations_before_rebuild() {
        let mut state = LayoutState::new();
        let (outcome, snapshot) = state.hide_nodes(1.0, true);

        assert_eq!(outcome, HideOutcome::Empty);
        assert!(snapshot.nodes.is_empty());
        assert_eq!(state.collapse_all().revision, 0);
        assert_eq!(state.uncollapse_all().revision, 0);
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let (_, snapshot) = built();
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["visibleRows"], serde_json::json!([0, 1, 2, 3, 4]));
        assert_eq!(json["ranks"]["1"], 5);
        assert_eq!(json["nodes"][0]["aggregated"], false);
        assert_eq!(json["parentChild"][0]["child"], 3);
        assert_eq!(json["couples"][0]["id"], 0);
        assert_eq!(json["couples"][0]["mother"], 2);
    }
}
