//! Period/block ordering mutations and SQLite implementation.
//!
//! # Responsibility
//! - Apply reorder, cross-period move and completion writes atomically.
//! - Map ordering rejections to semantic repository errors.
//!
//! # Invariants
//! - Each mutation runs in one `BEGIN IMMEDIATE` transaction and either
//!   commits fully renumbered sequences or writes nothing.
//! - After commit, period indices of the plan and block indices of every
//!   touched period are dense and zero-based.
//! - Identifiers never change; only `idx` and `period_uuid` do.
//! - A request that leaves the order unchanged writes nothing and keeps the
//!   plan revision.
//! - Ownership is checked before indices: a foreign or unknown id reports
//!   not-found even when its index is also out of range.
//! - Entities of soft-deleted plans are treated as absent.

use crate::model::plan::{Block, BlockId, PeriodBlocks, Period, PeriodId, PlanId};
use crate::ordering::{apply_placements, detach, insert_at, IndexMove, OrderingError};
use crate::repo::plan_repo::{load_active_plan, load_blocks, load_periods};
use crate::repo::sql::{ensure_connection_ready, parse_block_row, parse_period_row, parse_uuid};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Both sides of a block move after commit. `source == target` for in-period moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMove {
    pub block: Block,
    pub source: PeriodBlocks,
    pub target: PeriodBlocks,
}

/// Repository interface for hierarchy mutations.
pub trait HierarchyRepository {
    /// Places periods at requested absolute positions and renumbers the plan.
    fn reorder_periods(
        &self,
        plan_id: PlanId,
        moves: &[IndexMove<PeriodId>],
    ) -> RepoResult<Vec<Period>>;
    /// Moves one block to `target_index` of `target_period_id`.
    fn move_block(
        &self,
        block_id: BlockId,
        target_period_id: PeriodId,
        target_index: i64,
    ) -> RepoResult<BlockMove>;
    /// Places blocks at requested absolute positions and renumbers the period.
    fn reorder_blocks(
        &self,
        period_id: PeriodId,
        moves: &[IndexMove<BlockId>],
    ) -> RepoResult<Vec<Block>>;
    /// Sets (`Some`) or clears (`None`) a block's completion timestamp.
    ///
    /// Setting an already-set timestamp keeps the original value.
    fn set_block_completion(
        &self,
        block_id: BlockId,
        completed_at: Option<i64>,
    ) -> RepoResult<Block>;
}

/// SQLite-backed hierarchy repository.
pub struct SqliteHierarchyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteHierarchyRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl HierarchyRepository for SqliteHierarchyRepository<'_> {
    fn reorder_periods(
        &self,
        plan_id: PlanId,
        moves: &[IndexMove<PeriodId>],
    ) -> RepoResult<Vec<Period>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        load_active_plan(&tx, plan_id)?;

        let current = load_periods(&tx, plan_id)?
            .into_iter()
            .map(|period| period.id)
            .collect::<Vec<_>>();
        let order = match apply_placements(&current, moves) {
            Ok(order) => order,
            Err(OrderingError::UnknownId(period_id)) => {
                return Err(if load_active_period(&tx, period_id)?.is_some() {
                    RepoError::PeriodNotInPlan {
                        period: period_id,
                        plan: plan_id,
                    }
                } else {
                    RepoError::PeriodNotFound(period_id)
                });
            }
            Err(OrderingError::IndexOutOfRange { index, max, .. }) => {
                return Err(RepoError::InvalidIndex { index, max });
            }
        };

        if order != current {
            renumber_periods(&tx, &order)?;
            bump_revision(&tx, plan_id)?;
        }
        let periods = load_periods(&tx, plan_id)?;
        tx.commit()?;
        Ok(periods)
    }

    fn move_block(
        &self,
        block_id: BlockId,
        target_period_id: PeriodId,
        target_index: i64,
    ) -> RepoResult<BlockMove> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (block, plan_id) =
            load_active_block(&tx, block_id)?.ok_or(RepoError::BlockNotFound(block_id))?;
        let source_period = load_active_period(&tx, block.period_id)?
            .ok_or(RepoError::BlockNotFound(block_id))?;
        let target_period = load_active_period(&tx, target_period_id)?
            .ok_or(RepoError::PeriodNotFound(target_period_id))?;
        if target_period.plan_id != plan_id {
            return Err(RepoError::PeriodNotInPlan {
                period: target_period_id,
                plan: plan_id,
            });
        }

        let mut target_ids = block_ids(&tx, target_period_id)?;
        if target_index < 0 || target_index > target_ids.len() as i64 {
            return Err(RepoError::InvalidIndex {
                index: target_index,
                max: target_ids.len() as i64,
            });
        }

        let same_period = source_period.id == target_period.id;
        if same_period && target_index == i64::from(block.index) {
            let blocks = load_blocks(&tx, source_period.id)?;
            let side = PeriodBlocks {
                period: source_period,
                blocks,
            };
            return Ok(BlockMove {
                block,
                source: side.clone(),
                target: side,
            });
        }

        if same_period {
            detach(&mut target_ids, &block_id);
            insert_at(&mut target_ids, block_id, target_index as usize);
            renumber_blocks(&tx, &target_ids)?;
        } else {
            let mut source_ids = block_ids(&tx, source_period.id)?;
            detach(&mut source_ids, &block_id);
            insert_at(&mut target_ids, block_id, target_index as usize);
            tx.execute(
                "UPDATE blocks SET period_uuid = ?2 WHERE block_uuid = ?1;",
                params![block_id.to_string(), target_period_id.to_string()],
            )?;
            renumber_blocks(&tx, &source_ids)?;
            renumber_blocks(&tx, &target_ids)?;
        }
        bump_revision(&tx, plan_id)?;

        let (moved, _) =
            load_active_block(&tx, block_id)?.ok_or(RepoError::BlockNotFound(block_id))?;
        let source = PeriodBlocks {
            blocks: load_blocks(&tx, source_period.id)?,
            period: source_period,
        };
        let target = PeriodBlocks {
            blocks: load_blocks(&tx, target_period.id)?,
            period: target_period,
        };
        tx.commit()?;

        Ok(BlockMove {
            block: moved,
            source,
            target,
        })
    }

    fn reorder_blocks(
        &self,
        period_id: PeriodId,
        moves: &[IndexMove<BlockId>],
    ) -> RepoResult<Vec<Block>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let period =
            load_active_period(&tx, period_id)?.ok_or(RepoError::PeriodNotFound(period_id))?;

        let current = block_ids(&tx, period_id)?;
        let order = match apply_placements(&current, moves) {
            Ok(order) => order,
            Err(OrderingError::UnknownId(block_id)) => {
                return Err(if load_active_block(&tx, block_id)?.is_some() {
                    RepoError::BlockNotInPeriod {
                        block: block_id,
                        period: period_id,
                    }
                } else {
                    RepoError::BlockNotFound(block_id)
                });
            }
            Err(OrderingError::IndexOutOfRange { index, max, .. }) => {
                return Err(RepoError::InvalidIndex { index, max });
            }
        };

        if order != current {
            renumber_blocks(&tx, &order)?;
            bump_revision(&tx, period.plan_id)?;
        }
        let blocks = load_blocks(&tx, period_id)?;
        tx.commit()?;
        Ok(blocks)
    }

    fn set_block_completion(
        &self,
        block_id: BlockId,
        completed_at: Option<i64>,
    ) -> RepoResult<Block> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (_, plan_id) =
            load_active_block(&tx, block_id)?.ok_or(RepoError::BlockNotFound(block_id))?;

        let changed = match completed_at {
            Some(timestamp) => tx.execute(
                "UPDATE blocks
                 SET completed_at = ?2
                 WHERE block_uuid = ?1
                   AND completed_at IS NULL;",
                params![block_id.to_string(), timestamp],
            )?,
            None => tx.execute(
                "UPDATE blocks
                 SET completed_at = NULL
                 WHERE block_uuid = ?1
                   AND completed_at IS NOT NULL;",
                [block_id.to_string()],
            )?,
        };
        if changed > 0 {
            bump_revision(&tx, plan_id)?;
        }

        let (block, _) =
            load_active_block(&tx, block_id)?.ok_or(RepoError::BlockNotFound(block_id))?;
        tx.commit()?;
        Ok(block)
    }
}

fn load_active_block(conn: &Connection, block_id: BlockId) -> RepoResult<Option<(Block, PlanId)>> {
    let mut stmt = conn.prepare(
        "SELECT
            b.block_uuid AS block_uuid,
            b.period_uuid AS period_uuid,
            b.todo_uuid AS todo_uuid,
            b.idx AS idx,
            b.completed_at AS completed_at,
            p.plan_uuid AS plan_uuid
         FROM blocks b
         INNER JOIN periods p ON p.period_uuid = b.period_uuid
         INNER JOIN plans pl ON pl.plan_uuid = p.plan_uuid
         WHERE b.block_uuid = ?1
           AND pl.is_deleted = 0;",
    )?;
    let mut rows = stmt.query([block_id.to_string()])?;
    if let Some(row) = rows.next()? {
        let block = parse_block_row(row)?;
        let plan_text: String = row.get("plan_uuid")?;
        return Ok(Some((block, parse_uuid(&plan_text, "periods.plan_uuid")?)));
    }
    Ok(None)
}

fn load_active_period(conn: &Connection, period_id: PeriodId) -> RepoResult<Option<Period>> {
    let mut stmt = conn.prepare(
        "SELECT
            p.period_uuid AS period_uuid,
            p.plan_uuid AS plan_uuid,
            p.idx AS idx
         FROM periods p
         INNER JOIN plans pl ON pl.plan_uuid = p.plan_uuid
         WHERE p.period_uuid = ?1
           AND pl.is_deleted = 0;",
    )?;
    let mut rows = stmt.query([period_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_period_row(row)?));
    }
    Ok(None)
}

fn block_ids(conn: &Connection, period_id: PeriodId) -> RepoResult<Vec<BlockId>> {
    Ok(load_blocks(conn, period_id)?
        .into_iter()
        .map(|block| block.id)
        .collect())
}

fn renumber_periods(conn: &Connection, order: &[PeriodId]) -> RepoResult<()> {
    for (index, period_id) in order.iter().enumerate() {
        conn.execute(
            "UPDATE periods SET idx = ?2 WHERE period_uuid = ?1;",
            params![period_id.to_string(), index as i64],
        )?;
    }
    Ok(())
}

fn renumber_blocks(conn: &Connection, order: &[BlockId]) -> RepoResult<()> {
    for (index, block_id) in order.iter().enumerate() {
        conn.execute(
            "UPDATE blocks SET idx = ?2 WHERE block_uuid = ?1;",
            params![block_id.to_string(), index as i64],
        )?;
    }
    Ok(())
}

fn bump_revision(conn: &Connection, plan_id: PlanId) -> RepoResult<i64> {
    let revision = conn
        .query_row(
            "UPDATE plans
             SET revision = revision + 1,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE plan_uuid = ?1
             RETURNING revision;",
            [plan_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    revision.ok_or(RepoError::PlanNotFound(plan_id))
}
