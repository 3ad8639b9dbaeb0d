//! Error and warning types for the relation engine.

use crate::types::{EdgeKind, PersonId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using `FamilyError`.
pub type FamilyResult<T> = std::result::Result<T, FamilyError>;

/// Fatal errors of the relation engine.
#[derive(Debug, Error)]
pub enum FamilyError {
    /// Edge rejected while building a relation store.
    #[error("InvalidEdge: {up} is {kind} of {down}: {reason}")]
    InvalidEdge {
        up: PersonId,
        down: PersonId,
        kind: EdgeKind,
        reason: String,
    },

    /// Same person id supplied twice.
    #[error("DuplicatePerson: {0}")]
    DuplicatePerson(PersonId),

    /// Unknown person queried.
    #[error("NotFound: person {0}")]
    NotFound(PersonId),

    /// JSON serialization error.
    #[error("SerializationError: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Non-fatal conditions collected while building a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum LayoutWarning {
    /// Edge pointing at a person missing from the person list; the edge was skipped.
    DanglingReference {
        up: PersonId,
        down: PersonId,
        kind: EdgeKind,
        missing: PersonId,
    },
    /// `ancestor` turned up again as a child below `descendant`.
    CycleDetected {
        ancestor: PersonId,
        descendant: PersonId,
    },
    /// Population stopped after `limit` people.
    NodeLimitReached { limit: usize },
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutWarning::DanglingReference {
                up,
                down,
                kind,
                missing,
            } => write!(
                f,
                "dangling reference: {} is {} of {}, person {} is unknown",
                up, kind, down, missing
            ),
            LayoutWarning::CycleDetected {
                ancestor,
                descendant,
            } => write!(
                f,
                "cycle detected: {} is recorded as a child of its own descendant {}",
                ancestor, descendant
            ),
            LayoutWarning::NodeLimitReached { limit } => {
                write!(f, "node limit reached: tree truncated at {} people", limit)
            }
        }
    }
}
