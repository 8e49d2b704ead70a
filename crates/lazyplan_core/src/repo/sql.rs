//! Row mapping and connection checks shared by plan repositories.

use crate::db::migrations::latest_version;
use crate::model::plan::{Block, Cadence, Period, Plan};
use crate::model::todo::{Priority, Todo, TodoKind};
use crate::repo::RepoError;
use rusqlite::{Connection, Row};
use uuid::Uuid;

pub(crate) const PLAN_COLUMNS: &str = "plan_uuid,
    title,
    description,
    cadence,
    block_unit,
    period_unit,
    revision,
    is_deleted,
    created_at,
    updated_at";

pub(crate) const TODO_COLUMNS: &str = "todo_uuid,
    title,
    description,
    required_time,
    kind,
    priority,
    breakable";

const REQUIRED_TABLES: &[(&str, &[&str])] = &[
    (
        "plans",
        &[
            "plan_uuid",
            "title",
            "description",
            "cadence",
            "block_unit",
            "period_unit",
            "revision",
            "is_deleted",
        ],
    ),
    (
        "todos",
        &[
            "todo_uuid",
            "plan_uuid",
            "title",
            "required_time",
            "kind",
            "priority",
            "breakable",
        ],
    ),
    ("periods", &["period_uuid", "plan_uuid", "idx"]),
    (
        "blocks",
        &["block_uuid", "period_uuid", "todo_uuid", "idx", "completed_at"],
    ),
];

pub(crate) fn parse_plan_row(row: &Row<'_>) -> Result<Plan, RepoError> {
    let id_text: String = row.get("plan_uuid")?;
    let cadence_text: String = row.get("cadence")?;
    let cadence = cadence_from_db(&cadence_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid cadence `{cadence_text}` in plans.cadence"))
    })?;

    Ok(Plan {
        id: parse_uuid(&id_text, "plans.plan_uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        cadence,
        block_unit: row.get("block_unit")?,
        period_unit: row.get("period_unit")?,
        revision: row.get("revision")?,
        is_deleted: int_to_bool(row.get("is_deleted")?, "plans.is_deleted")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn parse_todo_row(row: &Row<'_>) -> Result<Todo, RepoError> {
    let id_text: String = row.get("todo_uuid")?;
    let required_time: i64 = row.get("required_time")?;
    let required_time = u32::try_from(required_time)
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid required_time `{required_time}` in todos.required_time"
            ))
        })?;

    let kind_text: String = row.get("kind")?;
    let kind = match kind_text.as_str() {
        "task" => {
            let priority = row
                .get::<_, Option<String>>("priority")?
                .map(|value| {
                    Priority::from_db(&value).ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "invalid priority `{value}` in todos.priority"
                        ))
                    })
                })
                .transpose()?;
            TodoKind::Task {
                priority,
                breakable: int_to_bool(row.get("breakable")?, "todos.breakable")?,
            }
        }
        "routine" => TodoKind::Routine,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid todo kind `{other}` in todos.kind"
            )));
        }
    };

    Ok(Todo {
        id: parse_uuid(&id_text, "todos.todo_uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        required_time,
        kind,
    })
}

pub(crate) fn parse_period_row(row: &Row<'_>) -> Result<Period, RepoError> {
    let id_text: String = row.get("period_uuid")?;
    let plan_text: String = row.get("plan_uuid")?;
    Ok(Period {
        id: parse_uuid(&id_text, "periods.period_uuid")?,
        plan_id: parse_uuid(&plan_text, "periods.plan_uuid")?,
        index: parse_index(row.get("idx")?, "periods.idx")?,
    })
}

pub(crate) fn parse_block_row(row: &Row<'_>) -> Result<Block, RepoError> {
    let id_text: String = row.get("block_uuid")?;
    let period_text: String = row.get("period_uuid")?;
    let todo_text: String = row.get("todo_uuid")?;
    Ok(Block {
        id: parse_uuid(&id_text, "blocks.block_uuid")?,
        period_id: parse_uuid(&period_text, "blocks.period_uuid")?,
        todo_id: parse_uuid(&todo_text, "blocks.todo_uuid")?,
        index: parse_index(row.get("idx")?, "blocks.idx")?,
        completed_at: row.get("completed_at")?,
    })
}

pub(crate) fn todo_kind_to_db(kind: TodoKind) -> (&'static str, Option<&'static str>, i64) {
    match kind {
        TodoKind::Task {
            priority,
            breakable,
        } => ("task", priority.map(Priority::as_db), bool_to_int(breakable)),
        TodoKind::Routine => ("routine", None, 0),
    }
}

pub(crate) fn cadence_to_db(cadence: Cadence) -> &'static str {
    cadence.as_str()
}

fn cadence_from_db(value: &str) -> Option<Cadence> {
    match value {
        "daily" => Some(Cadence::Daily),
        "weekly" => Some(Cadence::Weekly),
        "monthly" => Some(Cadence::Monthly),
        _ => None,
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> Result<Uuid, RepoError> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_index(value: i64, column: &'static str) -> Result<u32, RepoError> {
    u32::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid index `{value}` in {column}")))
}

fn int_to_bool(value: i64, column: &'static str) -> Result<bool, RepoError> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

/// Rejects connections that were not opened through `db::open_*`.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> Result<(), RepoError> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, RepoError> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, RepoError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
