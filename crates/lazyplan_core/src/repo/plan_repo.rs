//! Plan repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist generated plans (plan, todos, periods, blocks) atomically.
//! - Provide plan listing, soft-delete and ordered hierarchy reads.
//!
//! # Invariants
//! - Only active (`is_deleted=0`) plans are returned by default.
//! - Period listing is deterministic: `idx ASC, period_uuid ASC`; blocks
//!   follow the same rule within a period.
//! - Generated blocks must reference todos of the same plan.

use crate::model::plan::{
    Block, Cadence, Period, PeriodBlocks, PeriodId, Plan, PlanHierarchy, PlanId,
};
use crate::model::todo::{Todo, TodoId};
use crate::repo::sql::{
    bool_to_int, cadence_to_db, ensure_connection_ready, parse_block_row, parse_period_row,
    parse_plan_row, parse_todo_row, todo_kind_to_db, PLAN_COLUMNS, TODO_COLUMNS,
};
use crate::repo::{RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::HashSet;
use uuid::Uuid;

/// Plan header supplied at generation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlan {
    pub title: String,
    pub description: String,
    pub cadence: Cadence,
    pub block_unit: String,
    pub period_unit: String,
}

impl NewPlan {
    /// Creates a header whose units follow the cadence.
    pub fn new(title: impl Into<String>, cadence: Cadence) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            cadence,
            block_unit: cadence.block_unit().to_string(),
            period_unit: cadence.period_unit().to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Repository interface for plan lifecycle and hierarchy reads.
pub trait PlanRepository {
    /// Persists one generated plan. `layout[p]` lists the todo of each block
    /// of period `p` in index order.
    fn create_generated_plan(
        &self,
        plan: &NewPlan,
        todos: &[Todo],
        layout: &[Vec<TodoId>],
    ) -> RepoResult<PlanHierarchy>;
    /// Loads one plan by id.
    fn get_plan(&self, plan_id: PlanId, include_deleted: bool) -> RepoResult<Option<Plan>>;
    /// Lists plans, newest first.
    fn list_plans(&self, include_deleted: bool) -> RepoResult<Vec<Plan>>;
    /// Hides a plan from active listings while retaining its data.
    fn soft_delete_plan(&self, plan_id: PlanId) -> RepoResult<()>;
    /// Loads the ordered period/block hierarchy of an active plan.
    fn load_hierarchy(&self, plan_id: PlanId) -> RepoResult<PlanHierarchy>;
    /// Lists todos owned by an active plan.
    fn list_todos(&self, plan_id: PlanId) -> RepoResult<Vec<Todo>>;
    /// Updates todo display fields only.
    fn update_todo_display(
        &self,
        todo_id: TodoId,
        title: &str,
        description: &str,
    ) -> RepoResult<()>;
}

/// SQLite-backed plan repository.
pub struct SqlitePlanRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlanRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PlanRepository for SqlitePlanRepository<'_> {
    fn create_generated_plan(
        &self,
        plan: &NewPlan,
        todos: &[Todo],
        layout: &[Vec<TodoId>],
    ) -> RepoResult<PlanHierarchy> {
        let plan_id = Uuid::new_v4();
        for todo in todos {
            todo.validate()?;
        }
        let known: HashSet<TodoId> = todos.iter().map(|todo| todo.id).collect();
        if let Some(unknown) = layout.iter().flatten().find(|id| !known.contains(id)) {
            return Err(RepoError::TodoNotInPlan {
                todo: *unknown,
                plan: plan_id,
            });
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO plans (
                plan_uuid,
                title,
                description,
                cadence,
                block_unit,
                period_unit,
                revision,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0);",
            params![
                plan_id.to_string(),
                plan.title.as_str(),
                plan.description.as_str(),
                cadence_to_db(plan.cadence),
                plan.block_unit.as_str(),
                plan.period_unit.as_str(),
            ],
        )?;

        for todo in todos {
            let (kind, priority, breakable) = todo_kind_to_db(todo.kind);
            tx.execute(
                "INSERT INTO todos (
                    todo_uuid,
                    plan_uuid,
                    title,
                    description,
                    required_time,
                    kind,
                    priority,
                    breakable
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
                params![
                    todo.id.to_string(),
                    plan_id.to_string(),
                    todo.title.as_str(),
                    todo.description.as_str(),
                    i64::from(todo.required_time),
                    kind,
                    priority,
                    breakable,
                ],
            )?;
        }

        for (period_index, blocks) in layout.iter().enumerate() {
            let period_id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO periods (period_uuid, plan_uuid, idx) VALUES (?1, ?2, ?3);",
                params![period_id.to_string(), plan_id.to_string(), period_index as i64],
            )?;
            for (block_index, todo_id) in blocks.iter().enumerate() {
                tx.execute(
                    "INSERT INTO blocks (
                        block_uuid,
                        period_uuid,
                        todo_uuid,
                        idx,
                        completed_at
                    ) VALUES (?1, ?2, ?3, ?4, NULL);",
                    params![
                        Uuid::new_v4().to_string(),
                        period_id.to_string(),
                        todo_id.to_string(),
                        block_index as i64,
                    ],
                )?;
            }
        }

        let hierarchy = load_hierarchy_in(&tx, plan_id)?;
        tx.commit()?;

        info!(
            "event=plan_create module=repo status=ok periods={} blocks={} todos={}",
            layout.len(),
            layout.iter().map(Vec::len).sum::<usize>(),
            todos.len()
        );
        Ok(hierarchy)
    }

    fn get_plan(&self, plan_id: PlanId, include_deleted: bool) -> RepoResult<Option<Plan>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PLAN_COLUMNS}
             FROM plans
             WHERE plan_uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;
        let mut rows = stmt.query(params![plan_id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_plan_row(row)?));
        }
        Ok(None)
    }

    fn list_plans(&self, include_deleted: bool) -> RepoResult<Vec<Plan>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PLAN_COLUMNS}
             FROM plans
             WHERE (?1 = 1 OR is_deleted = 0)
             ORDER BY created_at DESC, plan_uuid ASC;"
        ))?;
        let mut rows = stmt.query([bool_to_int(include_deleted)])?;
        let mut plans = Vec::new();
        while let Some(row) = rows.next()? {
            plans.push(parse_plan_row(row)?);
        }
        Ok(plans)
    }

    fn soft_delete_plan(&self, plan_id: PlanId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE plans
             SET is_deleted = 1,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE plan_uuid = ?1
               AND is_deleted = 0;",
            [plan_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::PlanNotFound(plan_id));
        }
        Ok(())
    }

    fn load_hierarchy(&self, plan_id: PlanId) -> RepoResult<PlanHierarchy> {
        load_hierarchy_in(self.conn, plan_id)
    }

    fn list_todos(&self, plan_id: PlanId) -> RepoResult<Vec<Todo>> {
        load_active_plan(self.conn, plan_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TODO_COLUMNS}
             FROM todos
             WHERE plan_uuid = ?1
             ORDER BY rowid ASC;"
        ))?;
        let mut rows = stmt.query([plan_id.to_string()])?;
        let mut todos = Vec::new();
        while let Some(row) = rows.next()? {
            todos.push(parse_todo_row(row)?);
        }
        Ok(todos)
    }

    fn update_todo_display(
        &self,
        todo_id: TodoId,
        title: &str,
        description: &str,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE todos
             SET title = ?2,
                 description = ?3
             WHERE todo_uuid = ?1
               AND plan_uuid IN (SELECT plan_uuid FROM plans WHERE is_deleted = 0);",
            params![todo_id.to_string(), title, description],
        )?;
        if changed == 0 {
            return Err(RepoError::TodoNotFound(todo_id));
        }
        Ok(())
    }
}

/// Loads an active plan or fails with `PlanNotFound`.
pub(crate) fn load_active_plan(conn: &Connection, plan_id: PlanId) -> RepoResult<Plan> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PLAN_COLUMNS}
         FROM plans
         WHERE plan_uuid = ?1
           AND is_deleted = 0;"
    ))?;
    let mut rows = stmt.query([plan_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_plan_row(row);
    }
    Err(RepoError::PlanNotFound(plan_id))
}

/// Lists periods of a plan in index order.
pub(crate) fn load_periods(conn: &Connection, plan_id: PlanId) -> RepoResult<Vec<Period>> {
    let mut stmt = conn.prepare(
        "SELECT period_uuid, plan_uuid, idx
         FROM periods
         WHERE plan_uuid = ?1
         ORDER BY idx ASC, period_uuid ASC;",
    )?;
    let mut rows = stmt.query([plan_id.to_string()])?;
    let mut periods = Vec::new();
    while let Some(row) = rows.next()? {
        periods.push(parse_period_row(row)?);
    }
    Ok(periods)
}

/// Lists blocks of a period in index order.
pub(crate) fn load_blocks(conn: &Connection, period_id: PeriodId) -> RepoResult<Vec<Block>> {
    let mut stmt = conn.prepare(
        "SELECT block_uuid, period_uuid, todo_uuid, idx, completed_at
         FROM blocks
         WHERE period_uuid = ?1
         ORDER BY idx ASC, block_uuid ASC;",
    )?;
    let mut rows = stmt.query([period_id.to_string()])?;
    let mut blocks = Vec::new();
    while let Some(row) = rows.next()? {
        blocks.push(parse_block_row(row)?);
    }
    Ok(blocks)
}

pub(crate) fn load_hierarchy_in(conn: &Connection, plan_id: PlanId) -> RepoResult<PlanHierarchy> {
    let plan = load_active_plan(conn, plan_id)?;
    let periods = load_periods(conn, plan_id)?
        .into_iter()
        .map(|period| {
            let blocks = load_blocks(conn, period.id)?;
            Ok(PeriodBlocks { period, blocks })
        })
        .collect::<RepoResult<Vec<_>>>()?;
    Ok(PlanHierarchy { plan, periods })
}
