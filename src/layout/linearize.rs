//! Linear ranker.
//!
//! Assigns every person a unique integer rank (vertical row), walking the
//! pedigree depth first from the oldest unranked person so that:
//! - spouses sit on adjacent ranks,
//! - a person with two spouses sits between them,
//! - children follow their parents, youngest first.
//!
//! # Algorithm Overview
//!
//! 1. Pick the oldest unranked person as founder and give it
//!    `rank = number of unranked people`.
//! 2. Place the founder: every newly reached person gets
//!    `lowest rank so far - 1`, so ranks descend as the walk goes deeper.
//! 3. Repeat until everyone is ranked. Each round consumes one connected
//!    component, which is how a forest of unrelated founders is handled.
//!
//! The result is exactly `1..=n` for `n` people.

use log::{debug, trace};
use std::cmp::Reverse;

use crate::config::LayoutConfig;
use crate::graph::{PedigreeGraph, PersonIdx};

/// Summary of one ranking pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RankSummary {
    /// Number of founder rounds (connected components).
    pub components: usize,
    /// People whose unknown birth year was estimated from a child.
    pub backfilled: usize,
}

/// The linear ranker.
pub struct Linearizer<'a> {
    graph: &'a mut PedigreeGraph,
    /// Scratch ranks; `None` until assigned.
    ranks: Vec<Option<i64>>,
    /// People whose placement already ran.
    placed: Vec<bool>,
    lowest: i64,
}

impl<'a> Linearizer<'a> {
    /// Create a ranker over `graph`. Existing ranks are ignored.
    pub fn new(graph: &'a mut PedigreeGraph) -> Self {
        let n = graph.len();
        Self {
            graph,
            ranks: vec![None; n],
            placed: vec![false; n],
            lowest: i64::MAX,
        }
    }

    /// Rank every person, back-fill unknown birth years and snapshot the
    /// original ranks and x positions.
    pub fn run(mut self, config: &LayoutConfig) -> RankSummary {
        let mut summary = RankSummary::default();

        loop {
            let unranked: Vec<PersonIdx> = self
                .graph
                .indices()
                .filter(|idx| self.ranks[idx.index()].is_none())
                .collect();
            let Some(founder) = self.graph.oldest(unranked.iter().copied()) else {
                break;
            };

            self.assign(founder, unranked.len() as i64);
            trace!(
                "founder {} starts at rank {}",
                self.graph[founder].id,
                unranked.len()
            );
            self.place(founder);
            summary.components += 1;
        }

        for (node, rank) in self.graph.nodes_mut().iter_mut().zip(&self.ranks) {
            node.rank = rank.unwrap_or_default() as f64;
        }

        summary.backfilled = backfill_birth_years(self.graph, config.birth_year_gap);

        for node in self.graph.nodes_mut() {
            node.original_rank = node.rank;
            node.original_x = node.x;
        }

        debug!(
            "ranked {} people in {} components ({} birth years estimated)",
            self.graph.len(),
            summary.components,
            summary.backfilled
        );
        summary
    }

    #[inline]
    fn rank_of(&self, idx: PersonIdx) -> Option<i64> {
        self.ranks[idx.index()]
    }

    fn assign(&mut self, idx: PersonIdx, rank: i64) {
        self.ranks[idx.index()] = Some(rank);
        self.lowest = self.lowest.min(rank);
    }

    /// Give `idx` the next rank below everything ranked so far.
    fn assign_next(&mut self, idx: PersonIdx) {
        if self.rank_of(idx).is_none() {
            let rank = if self.lowest == i64::MAX {
                self.graph.len() as i64
            } else {
                self.lowest - 1
            };
            self.assign(idx, rank);
        }
    }

    fn place(&mut self, idx: PersonIdx) {
        if std::mem::replace(&mut self.placed[idx.index()], true) {
            return;
        }

        self.assign_next(idx);
        sort_children(self.graph, idx);

        let spouses = self.graph[idx].spouses.clone();
        for &spouse in &spouses {
            self.assign_next(spouse);
            for co_spouse in self.graph[spouse].spouses.clone() {
                self.assign_next(co_spouse);
            }
        }

        // keep the shared partner between both spouses
        if let [first, second] = spouses[..] {
            if let (Some(own), Some(a), Some(b)) =
                (self.rank_of(idx), self.rank_of(first), self.rank_of(second))
            {
                let mut ys = [own, a, b];
                ys.sort_unstable();
                self.ranks[idx.index()] = Some(ys[1]);
                self.ranks[first.index()] = Some(ys[0]);
                self.ranks[second.index()] = Some(ys[2]);
            }
        }

        for child in self.graph[idx].children.clone() {
            self.place(child);
        }

        for &spouse in &spouses {
            for co_spouse in self.graph[spouse].spouses.clone() {
                sort_children(self.graph, spouse);
                let shared: Vec<PersonIdx> = self.graph[spouse]
                    .children
                    .iter()
                    .copied()
                    .filter(|&child| self.graph[child].is_child_of_pair(spouse, co_spouse))
                    .collect();
                for child in shared {
                    self.place(child);
                }
            }
        }
    }
}

/// Stable sort of `idx`'s children by descending birth year.
fn sort_children(graph: &mut PedigreeGraph, idx: PersonIdx) {
    let mut children = std::mem::take(&mut graph[idx].children);
    children.sort_by_key(|&child| Reverse(graph[child].birth_year));
    graph[idx].children = children;
}

/// Estimate unknown birth years of parents from their youngest child.
///
/// Runs in row order, so a parent may use an estimate made earlier in the
/// same pass. Returns the number of estimated years.
fn backfill_birth_years(graph: &mut PedigreeGraph, gap: i32) -> usize {
    let mut count = 0;
    for idx in graph.indices() {
        let node = &graph[idx];
        if node.birth_year != 0 || !node.has_children {
            continue;
        }
        let Some(&youngest) = node.children.first() else {
            continue;
        };
        let year = graph[youngest].birth_year - gap;
        let node = &mut graph[idx];
        node.birth_year = year;
        node.x = f64::from(year);
        count += 1;
    }
    count
}
