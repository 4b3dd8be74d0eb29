//! Error type shared by the table, graph and layout modules.

use thiserror::Error;

use crate::graph::PersonId;

/// Errors surfaced by the pedigree layout engine.
///
/// Malformed cells and unresolved parents are not errors: they are defaulted
/// during materialization and only reported through logging.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Pedigree contains a parent/child cycle through {person}")]
    CyclicPedigree { person: PersonId },

    #[error("Unknown person: {0}")]
    UnknownPerson(PersonId),

    #[error("Column '{name}' has {got} rows, expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
