//! Collapse, expand and trim.
//!
//! A *branch* is a person plus everything reachable through spouse → co-spouse
//! → child chains. By original rank it covers the closed range
//! `[find_last_leaf(start), start.original_rank]`.
//!
//! Collapsing walks the branch from the top, keeps affected people on their
//! own rows and parks unaffected ones on fractional offsets near the row of
//! the relative they belong to. Marked people are hidden, optionally as part
//! of an aggregate summary row. [`Collapser::trim`] then removes the emptied
//! rows. Expanding restores the original ranks relative to the rows below the
//! branch and makes room above it. After every change no row holds two
//! visible people.

use log::{debug, trace, warn};
use std::cmp::Reverse;
use std::collections::HashMap;

use crate::config::LayoutConfig;
use crate::graph::{PedigreeGraph, PersonIdx, Sex};

/// Row a rank is displayed on (`floor(rank + 0.5)`).
#[inline]
pub fn row_of(rank: f64) -> i64 {
    (rank + 0.5).floor() as i64
}

/// What a [`Collapser::hide_nodes`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HideOutcome {
    /// No person on the requested row.
    Empty,
    /// The branch rooted at `start` was collapsed.
    Collapsed { start: PersonIdx },
    /// The branch was already collapsed and was expanded instead.
    Expanded { start: PersonIdx },
}

impl HideOutcome {
    /// Whether the call changed any rank or flag.
    pub fn changed(self) -> bool {
        !matches!(self, HideOutcome::Empty)
    }
}

/// Mutates ranks and visibility of one pedigree.
pub struct Collapser<'a> {
    graph: &'a mut PedigreeGraph,
    config: &'a LayoutConfig,
}

impl<'a> Collapser<'a> {
    pub fn new(graph: &'a mut PedigreeGraph, config: &'a LayoutConfig) -> Self {
        Self { graph, config }
    }

    /// Original rank of the lowest leaf reachable from `idx`.
    ///
    /// A person without spouse and children is its own last leaf. Returns
    /// `None` when the chains reach no children.
    pub fn find_last_leaf(&self, idx: PersonIdx) -> Option<f64> {
        self.last_leaf(idx, &mut HashMap::new())
    }

    fn last_leaf(&self, idx: PersonIdx, seen: &mut HashMap<PersonIdx, Option<f64>>) -> Option<f64> {
        if let Some(&leaf) = seen.get(&idx) {
            return leaf;
        }

        let node = &self.graph[idx];
        if node.spouses.is_empty() && !node.has_children {
            return Some(node.original_rank);
        }

        // children of every spouse's partners, each once
        let mut children: Vec<PersonIdx> = node
            .spouses
            .iter()
            .flat_map(|&spouse| self.graph[spouse].spouses.iter())
            .flat_map(|&co_spouse| self.graph[co_spouse].children.iter().copied())
            .collect();
        children.sort_unstable();
        children.dedup();

        let leaf = children
            .into_iter()
            .filter_map(|child| self.last_leaf(child, seen))
            .reduce(f64::min);
        seen.insert(idx, leaf);
        leaf
    }

    /// Resolve the branch root displayed on `row`.
    ///
    /// Picks the largest original rank on the row, then moves to the largest
    /// original rank among that person and its spouses.
    fn resolve_start(&self, row: i64) -> Option<PersonIdx> {
        let graph = &*self.graph;
        let on_row = graph
            .indices()
            .filter(|&idx| row_of(graph[idx].rank) == row)
            .max_by(|&a, &b| graph[a].original_rank.total_cmp(&graph[b].original_rank))?;

        let spouses = &graph[on_row].spouses;
        if spouses.is_empty() {
            return Some(on_row);
        }
        std::iter::once(on_row)
            .chain(spouses.iter().copied())
            .max_by(|&a, &b| graph[a].original_rank.total_cmp(&graph[b].original_rank))
    }

    /// Original-rank bounds `(end, top)` of the branch rooted at `start`.
    /// The branch always contains `start`.
    fn branch_bounds(&self, start: PersonIdx) -> (f64, f64) {
        let top = self.graph[start].original_rank;
        let end = self.find_last_leaf(start).map_or(top, |leaf| leaf.min(top));
        (end, top)
    }

    /// Branch members ordered by descending original rank.
    fn branch(&self, end: f64, top: f64) -> Vec<PersonIdx> {
        let graph = &*self.graph;
        let mut members: Vec<PersonIdx> = graph
            .indices()
            .filter(|&idx| {
                let rank = graph[idx].original_rank;
                rank >= end && rank <= top
            })
            .collect();
        members.sort_by(|&a, &b| graph[b].original_rank.total_cmp(&graph[a].original_rank));
        members
    }

    /// Whether the branch still has a visible, unaffected member.
    fn collapsible(&self, end: f64, top: f64) -> bool {
        self.graph.nodes().iter().any(|node| {
            node.original_rank >= end
                && node.original_rank <= top
                && !node.state.is_hidden()
                && !node.affected
        })
    }

    /// Collapse the branch displayed on the row of `start_rank`.
    ///
    /// If the branch has nothing left to hide it is expanded instead, so two
    /// calls on the same row toggle.
    pub fn hide_nodes(&mut self, start_rank: f64, aggregate: bool) -> HideOutcome {
        let row = row_of(start_rank);
        let Some(start) = self.resolve_start(row) else {
            trace!("no person on row {row}");
            return HideOutcome::Empty;
        };

        let mut cursor = if self.graph[start].spouses.is_empty() {
            row as f64
        } else {
            self.graph[start].rank
        };

        let (end, top) = self.branch_bounds(start);
        if !self.collapsible(end, top) {
            trace!("branch of {} already collapsed", self.graph[start].id);
            self.expand_branch(start);
            return HideOutcome::Expanded { start };
        }

        let kid = self.config.kid_grid_offset;
        let mut previous_affected = None;

        for idx in self.branch(end, top) {
            let affected = self.graph[idx].affected;
            let sex = self.graph[idx].sex;

            if !self.graph[idx].has_children && !affected {
                self.place_leaf(idx, cursor, aggregate);
            } else {
                let first_spouse = self.graph[idx].spouses.first().copied();

                if !affected {
                    if let Some(spouse) = first_spouse {
                        let anchor = if self.graph[spouse].affected && !aggregate {
                            self.graph[spouse].rank
                        } else {
                            cursor
                        };
                        self.graph[idx].rank = anchor + sex.offset(kid);
                    }
                } else {
                    if aggregate && previous_affected == Some(false) {
                        cursor -= 1.0;
                    }
                    self.graph[idx].rank = cursor;

                    if let Some(spouse) = first_spouse {
                        if !self.graph[spouse].affected && !aggregate {
                            let x = self.graph[idx].x;
                            let partner = &mut self.graph[spouse];
                            partner.rank = cursor + partner.sex.offset(kid);
                            partner.x = x;
                        }
                    }
                }

                // stack unaffected couples at the father's x
                if let Some(spouse) = first_spouse {
                    if sex == Sex::Female && !affected && !self.graph[spouse].affected {
                        self.graph[idx].x = self.graph[spouse].x;
                    }
                }
            }

            if affected {
                cursor -= 1.0;
            } else {
                if self.starts_new_branch(idx) {
                    cursor -= 1.0;
                }
                self.graph[idx].state.collapse(aggregate);
            }
            previous_affected = Some(affected);
        }

        self.separate_rows();
        self.trim();
        debug!(
            "collapsed branch of {} (aggregate: {aggregate})",
            self.graph[start].id
        );
        HideOutcome::Collapsed { start }
    }

    /// Position an unaffected leaf next to its parents.
    fn place_leaf(&mut self, idx: PersonIdx, cursor: f64, aggregate: bool) {
        let kid = self.config.kid_grid_offset;
        let parent = self.config.parent_grid_offset;
        let sex = self.graph[idx].sex;

        let (Some(ma), Some(pa)) = (self.graph[idx].mother, self.graph[idx].father) else {
            self.graph[idx].rank = cursor;
            return;
        };
        let (ma, pa) = (&self.graph[ma], &self.graph[pa]);

        let (y, x) = match (ma.affected, pa.affected) {
            (true, true) => {
                let y = if aggregate {
                    cursor + sex.offset(kid)
                } else {
                    match sex {
                        Sex::Male => ma.rank.min(pa.rank) + parent,
                        Sex::Female => ma.rank.max(pa.rank) - parent,
                    }
                };
                (y, ma.x.max(pa.x))
            }
            (true, false) => {
                let anchor = if aggregate { cursor } else { ma.rank };
                (anchor + sex.offset(kid), pa.x)
            }
            (false, true) => {
                let anchor = if aggregate { cursor } else { pa.rank };
                (anchor + sex.offset(kid), ma.x)
            }
            (false, false) => {
                let y = match sex {
                    Sex::Male => pa.rank,
                    Sex::Female => ma.rank,
                };
                (y, pa.x)
            }
        };

        let node = &mut self.graph[idx];
        node.rank = y;
        node.x = x;
    }

    /// An unaffected parent whose family holds only unaffected leaves, with
    /// unaffected spouses ranked above it.
    fn starts_new_branch(&self, idx: PersonIdx) -> bool {
        let graph = &*self.graph;
        let node = &graph[idx];
        if !node.has_children || node.spouses.is_empty() {
            return false;
        }

        let notable_children = node.spouses.iter().any(|&spouse| {
            graph[spouse]
                .children
                .iter()
                .any(|&child| graph[child].affected || graph[child].has_children)
        });
        let spouses_unaffected = node.spouses.iter().all(|&spouse| !graph[spouse].affected);
        let highest_spouse = node
            .spouses
            .iter()
            .map(|&spouse| graph[spouse].original_rank)
            .fold(f64::NEG_INFINITY, f64::max);

        !notable_children && spouses_unaffected && node.original_rank < highest_spouse
    }

    /// Expand the branch rooted at `start`.
    ///
    /// Members get their original spacing on the rows right above everyone
    /// ranked below the branch. Everyone ranked above moves up just enough to
    /// clear the restored rows. Once nobody is hidden the original layout is
    /// back. Returns `false` for an empty branch.
    pub fn expand_branch(&mut self, start: PersonIdx) -> bool {
        let (end, top) = self.branch_bounds(start);
        let members = self.branch(end, top);
        if members.is_empty() {
            return false;
        }

        let graph = &*self.graph;
        let highest_below = graph
            .nodes()
            .iter()
            .filter(|node| node.original_rank < end)
            .map(|node| row_of(node.rank))
            .max()
            .unwrap_or(0);
        let ydiff = end - (highest_below + 1) as f64;
        let branch_top = row_of(top - ydiff);

        let shift = graph
            .nodes()
            .iter()
            .filter(|node| node.original_rank > top)
            .map(|node| row_of(node.rank))
            .min()
            .map_or(0, |lowest| (branch_top + 1 - lowest).max(0));

        for node in self.graph.nodes_mut() {
            if node.original_rank > top {
                node.rank += shift as f64;
            } else if node.original_rank >= end {
                node.rank = node.original_rank - ydiff;
                node.x = node.original_x;
                node.state.reveal();
            }
        }

        if self.graph.nodes().iter().any(|node| node.state.is_hidden()) {
            self.separate_rows();
            self.trim();
        } else {
            self.restore_original();
        }
        debug!(
            "expanded branch of {} ({} people)",
            self.graph[start].id,
            members.len()
        );
        true
    }

    /// Reveal everyone at their original rank and x.
    fn restore_original(&mut self) {
        for node in self.graph.nodes_mut() {
            node.rank = node.original_rank;
            node.x = node.original_x;
            node.state.reveal();
        }
    }

    /// Lift people until no row holds two visible people.
    ///
    /// On a shared row the visible person with the lowest original rank
    /// stays. People on that row from the next visible original rank upward
    /// move up one row together with everyone on higher rows.
    fn separate_rows(&mut self) {
        for _ in 0..self.graph.len() {
            let Some((row, pivot)) = self.first_shared_row() else {
                return;
            };
            trace!("row {row} holds more than one visible person");
            for node in self.graph.nodes_mut() {
                let own = row_of(node.rank);
                if own > row || (own == row && node.original_rank >= pivot) {
                    node.rank += 1.0;
                }
            }
        }
    }

    /// Lowest row shared by visible people, with the second lowest original
    /// rank on it.
    fn first_shared_row(&self) -> Option<(i64, f64)> {
        let mut visible: Vec<(i64, f64)> = self
            .graph
            .nodes()
            .iter()
            .filter(|node| !node.state.is_hidden())
            .map(|node| (row_of(node.rank), node.original_rank))
            .collect();
        visible.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        visible
            .windows(2)
            .find(|pair| pair[0].0 == pair[1].0)
            .map(|pair| pair[1])
    }

    /// Remove empty rows.
    ///
    /// Scans rows upward from `min(1, lowest occupied row)`; every empty row
    /// moves all higher people down by one. Hidden people occupy rows too.
    pub fn trim(&mut self) {
        let mut rows: Vec<i64> = self
            .graph
            .nodes()
            .iter()
            .map(|node| row_of(node.rank))
            .collect();
        rows.sort_unstable();
        rows.dedup();

        let Some(&lowest) = rows.first() else {
            return;
        };
        let base = lowest.min(1);

        for node in self.graph.nodes_mut() {
            let row = row_of(node.rank);
            if let Ok(slot) = rows.binary_search(&row) {
                let target = base + slot as i64;
                node.rank -= (row - target) as f64;
            }
        }
    }

    /// Collapse (aggregate) from the oldest visible unaffected person until
    /// nothing is left to collapse. Returns the number of collapsed branches.
    pub fn collapse_all(&mut self) -> usize {
        let mut passes = 0;

        for _ in 0..self.graph.len() {
            let mut candidates: Vec<PersonIdx> = self
                .graph
                .indices()
                .filter(|&idx| {
                    let node = &self.graph[idx];
                    !node.state.is_hidden() && !node.affected
                })
                .collect();
            // oldest first, later row on ties
            candidates.sort_by_key(|&idx| (self.graph[idx].birth_year, Reverse(idx)));

            let next = candidates.into_iter().find_map(|idx| {
                let rank = self.graph[idx].rank;
                let start = self.resolve_start(row_of(rank))?;
                let (end, top) = self.branch_bounds(start);
                self.collapsible(end, top).then_some(rank)
            });
            let Some(rank) = next else {
                break;
            };

            if !matches!(self.hide_nodes(rank, true), HideOutcome::Collapsed { .. }) {
                break;
            }
            passes += 1;
        }

        debug!("collapse all: {passes} branches");
        passes
    }

    /// Expand from the oldest hidden person until nobody is hidden. Returns
    /// the number of expanded branches.
    pub fn uncollapse_all(&mut self) -> usize {
        let mut passes = 0;

        for _ in 0..self.graph.len() {
            let hidden: Vec<PersonIdx> = self
                .graph
                .indices()
                .filter(|&idx| self.graph[idx].state.is_hidden())
                .collect();
            let Some(start) = self.graph.oldest(hidden) else {
                break;
            };
            if !self.expand_branch(start) || self.graph[start].state.is_hidden() {
                warn!("cannot expand hidden {}", self.graph[start].id);
                break;
            }
            passes += 1;
        }

        if self.graph.nodes().iter().any(|node| node.state.is_hidden()) {
            warn!("people still hidden after {passes} expansions, resetting layout");
            self.restore_original();
        }

        debug!("uncollapse all: {passes} branches");
        passes
    }
}
