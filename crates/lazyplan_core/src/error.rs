//! Caller-facing error taxonomy.
//!
//! # Responsibility
//! - Give every layer error one stable classification for callers.
//! - Tell callers which failures are worth retrying with fresh state.
//!
//! # Invariants
//! - Structural rejections (`NotFound`, `InvalidIndex`, `InvalidConstraint`)
//!   are never retryable.
//! - `StoreConflict` is the only retryable kind.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Stable error classification shared by solver, hierarchy and export paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Non-positive divisor or infeasible capacity.
    InvalidConstraint,
    /// Unknown plan/period/block/todo id, or entity not owned by stated parent.
    NotFound,
    /// Target index outside the valid range of the target sequence.
    InvalidIndex,
    /// Transaction could not commit in time; retry with fresh state.
    StoreConflict,
    /// Block references a todo that cannot be resolved.
    UnresolvedReference,
    /// Storage bootstrap or persisted-data fault.
    Internal,
}

impl ErrorKind {
    /// Returns whether callers may retry the same request.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::StoreConflict)
    }

    /// Stable snake_case label used in envelopes and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidConstraint => "invalid_constraint",
            Self::NotFound => "not_found",
            Self::InvalidIndex => "invalid_index",
            Self::StoreConflict => "store_conflict",
            Self::UnresolvedReference => "unresolved_reference",
            Self::Internal => "internal",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
