//! Pedigree construction from the family table.
//!
//! Construction runs in two passes:
//! 1. **Materialization:** one [`PersonNode`] per row with numeric fields
//!    coerced and all flags at their defaults.
//! 2. **Relationships:** mother/father ids are resolved by id equality. A node
//!    whose mother or father cannot be found is a founder. Otherwise it gets
//!    parent handles, a parent-child edge, and its parents get a (deduplicated)
//!    couple edge.
//!
//! The lineage is then checked for cycles, which the ranker cannot handle.

use log::{debug, warn};

use super::engine::PedigreeGraph;
use super::node::{PersonId, PersonIdx, PersonNode, Sex};
use crate::config::{AffectedPredicate, LayoutConfig};
use crate::error::Result;
use crate::table::{CellValue, FamilyTable};

/// Counters collected while building, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Cells that could not be parsed and were defaulted.
    pub data_faults: usize,
    /// Rows whose parents were named but not found in the family.
    pub unresolved_parents: usize,
    /// Nodes without resolved parents.
    pub founders: usize,
    /// Distinct couples.
    pub couples: usize,
}

/// Builds a [`PedigreeGraph`] from table rows.
pub struct PedigreeBuilder<'a> {
    config: &'a LayoutConfig,
}

impl<'a> PedigreeBuilder<'a> {
    /// Create a builder reading the columns named in `config`.
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    /// Materialize, link and validate the pedigree of `table`.
    ///
    /// # Errors
    /// Returns [`LayoutError::CyclicPedigree`](crate::LayoutError::CyclicPedigree)
    /// if some person is their own ancestor.
    pub fn build(
        &self,
        table: &FamilyTable,
        predicate: &dyn AffectedPredicate,
    ) -> Result<(PedigreeGraph, BuildReport)> {
        let mut report = BuildReport::default();
        let mut graph = self.materialize(table, predicate, &mut report);
        self.link(&mut graph, &mut report);
        graph.check_acyclic()?;

        report.couples = graph.couples().len();
        if report.data_faults > 0 {
            warn!(
                "defaulted {} malformed cells while reading {} rows",
                report.data_faults,
                table.nrow()
            );
        }
        debug!(
            "built pedigree: {} people, {} founders, {} couples, {} unresolved parent refs",
            graph.len(),
            report.founders,
            report.couples,
            report.unresolved_parents
        );

        Ok((graph, report))
    }

    fn materialize(
        &self,
        table: &FamilyTable,
        predicate: &dyn AffectedPredicate,
        report: &mut BuildReport,
    ) -> PedigreeGraph {
        let config = self.config;
        let mut graph = PedigreeGraph::with_capacity(table.nrow());

        for row in 0..table.nrow() {
            let cell = |name: &str| table.value(name, row).unwrap_or(&CellValue::Missing);

            let id = match cell(&config.id_column).as_integer() {
                Some(id) => id,
                None => {
                    report.data_faults += 1;
                    0
                }
            };

            let birth_year = match cell(&config.birth_column) {
                CellValue::Missing => 0,
                value => match value.as_integer().and_then(|year| i32::try_from(year).ok()) {
                    Some(year) => year,
                    None => {
                        report.data_faults += 1;
                        0
                    }
                },
            };

            let sex = match cell(&config.sex_column) {
                CellValue::Text(code) => Sex::parse(code),
                _ => Sex::Female,
            };

            let mut node = PersonNode::new(PersonId(id), row, sex, birth_year);
            node.mother_id = parent_id(cell(&config.mother_column), report);
            node.father_id = parent_id(cell(&config.father_column), report);
            node.affected = predicate.is_affected(cell(predicate.attribute()));

            graph.add_person(node);
        }

        graph
    }

    fn link(&self, graph: &mut PedigreeGraph, report: &mut BuildReport) {
        let slots: Vec<PersonIdx> = graph.indices().collect();

        for child in slots {
            let (mother_id, father_id) = {
                let node = &graph[child];
                (node.mother_id, node.father_id)
            };
            let mother = mother_id.and_then(|id| graph.index_of(id));
            let father = father_id.and_then(|id| graph.index_of(id));

            match (mother, father) {
                (Some(mother), Some(father)) => {
                    graph.add_couple(mother, father);
                    graph.add_child(mother, father, child);
                }
                _ => {
                    if mother_id.is_some() || father_id.is_some() {
                        report.unresolved_parents += 1;
                        debug!(
                            "{} has unresolved parents ({:?}, {:?}); treated as founder",
                            graph[child].id, mother_id, father_id
                        );
                    }
                    report.founders += 1;
                }
            }
        }
    }
}

fn parent_id(value: &CellValue, report: &mut BuildReport) -> Option<PersonId> {
    match value {
        CellValue::Missing => None,
        value => match value.as_integer() {
            Some(id) => Some(PersonId(id)),
            None => {
                report.data_faults += 1;
                None
            }
        },
    }
}
