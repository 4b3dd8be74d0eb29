//! PedigreeGraph - node arena and relationship store.
//!
//! People are stored in a dense `Vec` addressed by [`PersonIdx`]. Parent to
//! child links are mirrored into a petgraph `StableGraph` so structural checks
//! (cycle detection) can reuse petgraph's traversal algorithms, while couple
//! and parent-child edges are kept as flat lists for export.

use petgraph::algo::toposort;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Directed;
use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use super::edge::{CoupleEdge, EdgeId, Lineage, ParentChildEdge};
use super::node::{PersonId, PersonIdx, PersonNode};
use crate::error::{LayoutError, Result};

/// The pedigree of one family.
///
/// This struct manages:
/// - The person arena (one node per table row)
/// - Id lookup (first row wins for duplicated ids)
/// - Deduplicated couple edges and per-child parent edges
/// - A directed lineage graph (parent -> child) for structural checks
#[derive(Debug, Default)]
pub struct PedigreeGraph {
    /// Person arena in row order.
    nodes: Vec<PersonNode>,

    /// Map from table id to arena slot.
    id_to_index: HashMap<PersonId, PersonIdx>,

    /// Couple edges in creation order.
    couples: Vec<CoupleEdge>,

    /// Map from (mother, father) to couple edge, for deduplication.
    couple_index: HashMap<(PersonIdx, PersonIdx), EdgeId>,

    /// Parent-child edges in creation order.
    parent_child: Vec<ParentChildEdge>,

    /// Directed parent -> child graph. Node weights are arena slots, and
    /// graph node `i` is always arena slot `i`.
    lineage: StableGraph<PersonIdx, Lineage, Directed>,
}

impl PedigreeGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with pre-allocated capacity.
    pub fn with_capacity(node_capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(node_capacity),
            id_to_index: HashMap::with_capacity(node_capacity),
            couples: Vec::new(),
            couple_index: HashMap::new(),
            parent_child: Vec::with_capacity(node_capacity),
            lineage: StableGraph::with_capacity(node_capacity, node_capacity * 2),
        }
    }

    // =========================================================================
    // Node Operations
    // =========================================================================

    /// Add a person, returning its arena slot.
    pub fn add_person(&mut self, node: PersonNode) -> PersonIdx {
        let idx = PersonIdx(self.nodes.len() as u32);
        self.id_to_index.entry(node.id).or_insert(idx);
        self.lineage.add_node(idx);
        self.nodes.push(node);
        idx
    }

    /// Look up the arena slot of a table id.
    pub fn index_of(&self, id: PersonId) -> Option<PersonIdx> {
        self.id_to_index.get(&id).copied()
    }

    /// Borrow a node by slot.
    pub fn get(&self, idx: PersonIdx) -> Option<&PersonNode> {
        self.nodes.get(idx.index())
    }

    /// Borrow a node by table id.
    pub fn person(&self, id: PersonId) -> Option<&PersonNode> {
        self.index_of(id).and_then(|idx| self.get(idx))
    }

    /// All nodes in row order.
    pub fn nodes(&self) -> &[PersonNode] {
        &self.nodes
    }

    /// All nodes in row order, mutably.
    pub fn nodes_mut(&mut self) -> &mut [PersonNode] {
        &mut self.nodes
    }

    /// All arena slots in row order.
    pub fn indices(&self) -> impl Iterator<Item = PersonIdx> + use<> {
        (0..self.nodes.len() as u32).map(PersonIdx)
    }

    /// Number of people.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no people.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // =========================================================================
    // Edge Operations
    // =========================================================================

    /// Register a couple, returning its edge and whether it was newly created.
    ///
    /// A new couple also makes the two parents each other's spouses.
    pub fn add_couple(&mut self, mother: PersonIdx, father: PersonIdx) -> (EdgeId, bool) {
        if let Some(&id) = self.couple_index.get(&(mother, father)) {
            return (id, false);
        }

        let id = EdgeId(self.couples.len() as u32);
        self.couples.push(CoupleEdge { id, mother, father });
        self.couple_index.insert((mother, father), id);

        if !self[mother].spouses.contains(&father) {
            self[mother].spouses.push(father);
        }
        if !self[father].spouses.contains(&mother) {
            self[father].spouses.push(mother);
        }

        (id, true)
    }

    /// Register a child of a couple.
    ///
    /// Sets the child's parent handles, appends the child to both parents and
    /// flags both as having children.
    pub fn add_child(&mut self, mother: PersonIdx, father: PersonIdx, child: PersonIdx) {
        self.parent_child.push(ParentChildEdge {
            mother,
            father,
            child,
        });

        {
            let node = &mut self[child];
            node.mother = Some(mother);
            node.father = Some(father);
        }
        for parent in [mother, father] {
            let node = &mut self[parent];
            node.has_children = true;
            node.children.push(child);
        }

        let child_index = NodeIndex::new(child.index());
        self.lineage
            .add_edge(NodeIndex::new(mother.index()), child_index, Lineage::Maternal);
        self.lineage
            .add_edge(NodeIndex::new(father.index()), child_index, Lineage::Paternal);
    }

    /// Couple edges in creation order.
    pub fn couples(&self) -> &[CoupleEdge] {
        &self.couples
    }

    /// Parent-child edges in creation order.
    pub fn parent_child_edges(&self) -> &[ParentChildEdge] {
        &self.parent_child
    }

    /// Number of lineage (parent -> child) links, two per resolved child.
    pub fn lineage_edge_count(&self) -> usize {
        self.lineage.edge_count()
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Check that no person is their own ancestor.
    ///
    /// # Errors
    /// Returns [`LayoutError::CyclicPedigree`] naming a person on the cycle.
    pub fn check_acyclic(&self) -> Result<()> {
        match toposort(&self.lineage, None) {
            Ok(_) => Ok(()),
            Err(cycle) => {
                let slot = self
                    .lineage
                    .node_weight(cycle.node_id())
                    .copied()
                    .unwrap_or(PersonIdx(cycle.node_id().index() as u32));
                let person = self
                    .get(slot)
                    .map(|node| node.id)
                    .unwrap_or(PersonId(i64::from(slot.0)));
                Err(LayoutError::CyclicPedigree { person })
            }
        }
    }

    /// Slot of the oldest node among `candidates`.
    ///
    /// Birth-year ties go to the later candidate.
    pub fn oldest<I>(&self, candidates: I) -> Option<PersonIdx>
    where
        I: IntoIterator<Item = PersonIdx>,
    {
        candidates.into_iter().reduce(|best, candidate| {
            if self[best].birth_year < self[candidate].birth_year {
                best
            } else {
                candidate
            }
        })
    }

    /// Clear all nodes and edges.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.id_to_index.clear();
        self.couples.clear();
        self.couple_index.clear();
        self.parent_child.clear();
        self.lineage.clear();
    }
}

impl Index<PersonIdx> for PedigreeGraph {
    type Output = PersonNode;

    fn index(&self, idx: PersonIdx) -> &Self::Output {
        &self.nodes[idx.index()]
    }
}

impl IndexMut<PersonIdx> for PedigreeGraph {
    fn index_mut(&mut self, idx: PersonIdx) -> &mut Self::Output {
        &mut self.nodes[idx.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Sex;

    fn person(graph: &mut PedigreeGraph, id: i64, year: i32) -> PersonIdx {
        let row = graph.len();
        graph.add_person(PersonNode::new(PersonId(id), row, Sex::Female, year))
    }

    #[test]
    fn test_add_person() {
        let mut graph = PedigreeGraph::new();
        let a = person(&mut graph, 10, 1900);

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.index_of(PersonId(10)), Some(a));
        assert_eq!(graph[a].x, 1900.0);
    }

    #[test]
    fn test_duplicate_id_first_wins() {
        let mut graph = PedigreeGraph::new();
        let first = person(&mut graph, 7, 1900);
        let _second = person(&mut graph, 7, 1950);

        assert_eq!(graph.len(), 2);
        assert_eq!(graph.index_of(PersonId(7)), Some(first));
    }

    #[test]
    fn test_couple_dedup() {
        let mut graph = PedigreeGraph::new();
        let ma = person(&mut graph, 1, 1900);
        let pa = person(&mut graph, 2, 1900);

        let (first, created) = graph.add_couple(ma, pa);
        assert!(created);
        let (again, created) = graph.add_couple(ma, pa);
        assert!(!created);
        assert_eq!(first, again);
        assert_eq!(graph.couples().len(), 1);
        assert_eq!(graph[ma].spouses, vec![pa]);
        assert_eq!(graph[pa].spouses, vec![ma]);
    }

    #[test]
    fn test_add_child_links_both_parents() {
        let mut graph = PedigreeGraph::new();
        let ma = person(&mut graph, 1, 1900);
        let pa = person(&mut graph, 2, 1900);
        let kid = person(&mut graph, 3, 1925);

        graph.add_couple(ma, pa);
        graph.add_child(ma, pa, kid);

        assert!(graph[ma].has_children);
        assert!(graph[pa].has_children);
        assert!(!graph[kid].has_children);
        assert_eq!(graph[kid].mother, Some(ma));
        assert_eq!(graph[kid].father, Some(pa));
        assert_eq!(graph.parent_child_edges().len(), 1);
        assert_eq!(graph.lineage_edge_count(), 2);
        assert!(graph.check_acyclic().is_ok());
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = PedigreeGraph::new();
        let a = person(&mut graph, 1, 1900);
        let b = person(&mut graph, 2, 1900);
        let c = person(&mut graph, 3, 1925);

        graph.add_child(a, b, c);
        // c is recorded as a parent of a
        graph.add_child(c, b, a);

        let err = graph.check_acyclic().unwrap_err();
        assert!(matches!(err, LayoutError::CyclicPedigree { .. }));
    }

    #[test]
    fn test_oldest_prefers_later_on_tie() {
        let mut graph = PedigreeGraph::new();
        let a = person(&mut graph, 1, 1900);
        let b = person(&mut graph, 2, 1890);
        let c = person(&mut graph, 3, 1890);

        assert_eq!(graph.oldest(graph.indices()), Some(c));
        assert_eq!(graph.oldest([a, b]), Some(b));
        assert_eq!(graph.oldest(std::iter::empty()), None);
    }

    #[test]
    fn test_clear() {
        let mut graph = PedigreeGraph::new();
        let ma = person(&mut graph, 1, 1900);
        let pa = person(&mut graph, 2, 1900);
        graph.add_couple(ma, pa);

        graph.clear();
        assert!(graph.is_empty());
        assert!(graph.couples().is_empty());
        assert_eq!(graph.index_of(PersonId(1)), None);
    }
}
