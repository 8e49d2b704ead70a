//! Ordered period/block manipulation use-cases.
//!
//! # Responsibility
//! - Stamp completion times and emit one diagnostic event per mutation.
//! - Leave ownership and index validation to the repository, which reports
//!   not-found before invalid-index.
//!
//! # Invariants
//! - A failed call leaves the hierarchy exactly as it was.
//! - `StoreConflict` failures are retryable with freshly loaded state.

use crate::error::ErrorKind;
use crate::model::plan::{Block, BlockId, Period, PeriodId, PlanId};
use crate::ordering::IndexMove;
use crate::repo::hierarchy_repo::{BlockMove, HierarchyRepository};
use crate::repo::RepoError;
use log::{info, warn};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("{0}")]
    Repo(#[from] RepoError),
}

impl HierarchyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Repo(err) => err.kind(),
        }
    }
}

pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// Facade over a [`HierarchyRepository`].
pub struct HierarchyService<R: HierarchyRepository> {
    repo: R,
}

impl<R: HierarchyRepository> HierarchyService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Places each listed period at its absolute index; unlisted periods keep
    /// their relative order.
    pub fn reorder_periods(
        &self,
        plan_id: PlanId,
        moves: &[IndexMove<PeriodId>],
    ) -> HierarchyResult<Vec<Period>> {
        let started = Instant::now();
        let result = self
            .repo
            .reorder_periods(plan_id, moves)
            .map_err(Into::into);
        log_outcome("reorder_periods", started, moves.len(), &result);
        result
    }

    /// Moves one block to `target_index` within `target_period_id`, which may
    /// be its own period.
    pub fn move_block(
        &self,
        block_id: BlockId,
        target_period_id: PeriodId,
        target_index: i64,
    ) -> HierarchyResult<BlockMove> {
        let started = Instant::now();
        let result = self
            .repo
            .move_block(block_id, target_period_id, target_index)
            .map_err(Into::into);
        log_outcome("move_block", started, 1, &result);
        result
    }

    /// Block-level analogue of [`Self::reorder_periods`].
    pub fn reorder_blocks(
        &self,
        period_id: PeriodId,
        moves: &[IndexMove<BlockId>],
    ) -> HierarchyResult<Vec<Block>> {
        let started = Instant::now();
        let result = self
            .repo
            .reorder_blocks(period_id, moves)
            .map_err(Into::into);
        log_outcome("reorder_blocks", started, moves.len(), &result);
        result
    }

    /// Marks a block done (stamped now) or not done.
    pub fn complete_block(&self, block_id: BlockId, completed: bool) -> HierarchyResult<Block> {
        self.complete_block_at(block_id, completed, chrono::Utc::now().timestamp_millis())
    }

    /// [`Self::complete_block`] with an explicit epoch-millisecond stamp.
    pub fn complete_block_at(
        &self,
        block_id: BlockId,
        completed: bool,
        now_ms: i64,
    ) -> HierarchyResult<Block> {
        let started = Instant::now();
        let result = self
            .repo
            .set_block_completion(block_id, completed.then_some(now_ms))
            .map_err(Into::into);
        log_outcome("complete_block", started, 1, &result);
        result
    }
}

fn log_outcome<T>(op: &str, started: Instant, entries: usize, result: &HierarchyResult<T>) {
    let duration_ms = started.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event=hierarchy_{op} module=service status=ok entries={entries} duration_ms={duration_ms}"
        ),
        Err(err) => warn!(
            "event=hierarchy_{op} module=service status=error entries={entries} duration_ms={duration_ms} error_code={}",
            err.kind()
        ),
    }
}
