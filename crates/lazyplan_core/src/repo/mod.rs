//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for plans.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`*NotFound`, `*NotIn*`,
//!   `InvalidIndex`) in addition to DB transport errors.
//! - Every multi-row write happens inside one `BEGIN IMMEDIATE` transaction;
//!   a rejected precondition drops the transaction before commit.

use crate::db::DbError;
use crate::error::ErrorKind;
use crate::model::plan::{BlockId, PeriodId, PlanId};
use crate::model::todo::{TodoId, TodoValidationError};
use thiserror::Error;

pub mod hierarchy_repo;
pub mod plan_repo;
pub(crate) mod sql;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from plan persistence and hierarchy mutation.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("{0}")]
    Validation(#[from] TodoValidationError),
    #[error("plan not found: {0}")]
    PlanNotFound(PlanId),
    #[error("period not found: {0}")]
    PeriodNotFound(PeriodId),
    #[error("block not found: {0}")]
    BlockNotFound(BlockId),
    #[error("todo not found: {0}")]
    TodoNotFound(TodoId),
    #[error("period {period} does not belong to plan {plan}")]
    PeriodNotInPlan { period: PeriodId, plan: PlanId },
    #[error("block {block} does not belong to period {period}")]
    BlockNotInPeriod { block: BlockId, period: PeriodId },
    #[error("todo {todo} does not belong to plan {plan}")]
    TodoNotInPlan { todo: TodoId, plan: PlanId },
    #[error("index {index} is outside 0..={max}")]
    InvalidIndex { index: i64, max: i64 },
    #[error("plan repository requires schema version {expected_version}, got {actual_version}")]
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    #[error("plan repository requires table `{0}`")]
    MissingRequiredTable(&'static str),
    #[error("plan repository requires column `{column}` in table `{table}`")]
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    #[error("invalid persisted plan data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    /// Classifies the error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Db(err) if err.is_busy() => ErrorKind::StoreConflict,
            Self::Validation(_) => ErrorKind::InvalidConstraint,
            Self::PlanNotFound(_)
            | Self::PeriodNotFound(_)
            | Self::BlockNotFound(_)
            | Self::TodoNotFound(_)
            | Self::PeriodNotInPlan { .. }
            | Self::BlockNotInPeriod { .. }
            | Self::TodoNotInPlan { .. } => ErrorKind::NotFound,
            Self::InvalidIndex { .. } => ErrorKind::InvalidIndex,
            Self::Db(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::InvalidData(_) => ErrorKind::Internal,
        }
    }
}
