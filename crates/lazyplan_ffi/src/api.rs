//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose plan constraint, ordering and export use-cases to Dart via FRB.
//! - Flatten core errors into `{ok, error_kind, message}` envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - `error_kind` is one of the core `ErrorKind` labels, or `None` on success.
//! - Identifiers cross the boundary as hyphenated UUID strings.

use chrono::NaiveDate;
use lazyplan_core::db::open_db_with_timeout;
use lazyplan_core::export::write_csv;
use lazyplan_core::model::todo::Priority;
use lazyplan_core::solver::time_constraints::{RoutineLoad, TaskLoad};
use lazyplan_core::{
    compute_time_constraints as compute_time_constraints_inner, core_version as core_version_inner,
    init_logging as init_logging_inner, ping as ping_inner, Block, Cadence, CalendarEventRow,
    ErrorKind, ExportService, HierarchyService, IndexMove, Period, PlanService, PlannerConfig,
    SqliteHierarchyRepository, SqlitePlanRepository, TimeConstraintSolver, Workload,
};
use log::warn;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use uuid::Uuid;

const PLAN_DB_FILE_NAME: &str = "lazyplan.sqlite3";
static PLAN_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static PLANNER_CONFIG: OnceLock<PlannerConfig> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Pins the plan database path for this process.
///
/// Returns empty string on success. Fails once a path is already in use,
/// either pinned earlier or resolved by a previous call.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    let active = PLAN_DB_PATH.get_or_init(|| requested.clone());
    if *active == requested {
        String::new()
    } else {
        format!("plan database already bound to `{}`", active.display())
    }
}

/// Task input for constraint calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    pub required_time: u32,
    /// `low|normal|high`, or `None`.
    pub priority: Option<String>,
    pub breakable: bool,
}

/// One reorder entry: entity id and desired absolute index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMoveInput {
    pub id: String,
    pub new_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintsResponse {
    pub ok: bool,
    pub error_kind: Option<String>,
    pub message: String,
    pub least_blocks: u32,
    pub max_blocks: u32,
    pub least_periods: u32,
    pub max_periods: u32,
}

/// Result of re-deriving one axis from the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisResponse {
    pub ok: bool,
    pub error_kind: Option<String>,
    pub message: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodItem {
    pub period_id: String,
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockItem {
    pub block_id: String,
    pub period_id: String,
    pub todo_id: String,
    pub index: u32,
    pub completed_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodsResponse {
    pub ok: bool,
    pub error_kind: Option<String>,
    pub message: String,
    pub periods: Vec<PeriodItem>,
}

/// Block list envelope. `source_blocks` is filled only by cross-period moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlocksResponse {
    pub ok: bool,
    pub error_kind: Option<String>,
    pub message: String,
    pub blocks: Vec<BlockItem>,
    pub source_blocks: Vec<BlockItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanItem {
    pub plan_id: String,
    pub title: String,
    pub cadence: String,
    pub revision: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlansResponse {
    pub ok: bool,
    pub error_kind: Option<String>,
    pub message: String,
    pub plans: Vec<PlanItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarRowItem {
    pub subject: String,
    /// `YYYY-MM-DD`.
    pub start_date: String,
    /// `HH:MM`, `None` for all-day rows.
    pub start_time: Option<String>,
    pub end_date: String,
    pub end_time: Option<String>,
    pub description: String,
    pub all_day: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResponse {
    pub ok: bool,
    pub error_kind: Option<String>,
    pub message: String,
    pub rows: Vec<CalendarRowItem>,
    /// Calendar-import CSV of `rows`.
    pub csv: String,
}

/// Failure carried to an envelope.
struct ApiFailure {
    kind: ErrorKind,
    message: String,
}

impl ApiFailure {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Feasible blocks-per-period and period-count band for a workload.
///
/// # FFI contract
/// - Sync call, pure computation.
/// - `cadence` is `daily|weekly|monthly`, case-insensitive.
#[flutter_rust_bridge::frb(sync)]
pub fn compute_time_constraints(
    tasks: Vec<TaskInput>,
    routines: Vec<u32>,
    cadence: String,
) -> ConstraintsResponse {
    let result = parse_cadence(&cadence).and_then(|cadence| {
        let workload = to_workload(&tasks, &routines)?;
        compute_time_constraints_inner(&workload, cadence, &planner_config().limits)
            .map_err(|err| ApiFailure::new(err.kind(), err.to_string()))
    });
    match result {
        Ok(range) => ConstraintsResponse {
            ok: true,
            error_kind: None,
            message: "ok".to_string(),
            least_blocks: range.least_blocks,
            max_blocks: range.max_blocks,
            least_periods: range.least_periods,
            max_periods: range.max_periods,
        },
        Err(failure) => ConstraintsResponse {
            ok: false,
            error_kind: Some(failure.kind.as_str().to_string()),
            message: format!("compute_time_constraints failed: {}", failure.message),
            least_blocks: 0,
            max_blocks: 0,
            least_periods: 0,
            max_periods: 0,
        },
    }
}

/// Period count implied by a pinned blocks-per-period.
#[flutter_rust_bridge::frb(sync)]
pub fn rederive_periods(
    tasks: Vec<TaskInput>,
    routines: Vec<u32>,
    blocks_per_period: u32,
) -> AxisResponse {
    axis_response(
        "rederive_periods",
        to_solver(&tasks, &routines).and_then(|solver| {
            solver
                .rederive_from_blocks(blocks_per_period)
                .map_err(|err| ApiFailure::new(err.kind(), err.to_string()))
        }),
    )
}

/// Blocks-per-period implied by a pinned period count.
#[flutter_rust_bridge::frb(sync)]
pub fn rederive_blocks(tasks: Vec<TaskInput>, routines: Vec<u32>, periods: u32) -> AxisResponse {
    axis_response(
        "rederive_blocks",
        to_solver(&tasks, &routines).and_then(|solver| {
            solver
                .rederive_from_periods(periods)
                .map_err(|err| ApiFailure::new(err.kind(), err.to_string()))
        }),
    )
}

/// Lists active plans, newest first.
#[flutter_rust_bridge::frb(sync)]
pub fn list_plans() -> PlansResponse {
    let result = with_connection(|conn| {
        let repo = SqlitePlanRepository::try_new(conn).map_err(repo_failure)?;
        PlanService::new(repo).list_plans().map_err(repo_failure)
    });
    match result {
        Ok(plans) => PlansResponse {
            ok: true,
            error_kind: None,
            message: format!("Found {} plan(s).", plans.len()),
            plans: plans
                .into_iter()
                .map(|plan| PlanItem {
                    plan_id: plan.id.to_string(),
                    title: plan.title,
                    cadence: plan.cadence.as_str().to_string(),
                    revision: plan.revision,
                })
                .collect(),
        },
        Err(failure) => PlansResponse {
            ok: false,
            error_kind: Some(failure.kind.as_str().to_string()),
            message: format!("list_plans failed: {}", failure.message),
            plans: Vec::new(),
        },
    }
}

/// Reorders periods of a plan by absolute target indices.
///
/// # FFI contract
/// - Sync call, DB-backed, one transaction.
/// - On failure nothing changes; `store_conflict` is safe to retry.
#[flutter_rust_bridge::frb(sync)]
pub fn reorder_periods(plan_id: String, moves: Vec<IndexMoveInput>) -> PeriodsResponse {
    let result = parse_id(&plan_id).and_then(|plan_id| {
        let moves = parse_moves(&moves)?;
        with_hierarchy_service(|service| service.reorder_periods(plan_id, &moves))
    });
    match result {
        Ok(periods) => PeriodsResponse {
            ok: true,
            error_kind: None,
            message: "Periods reordered.".to_string(),
            periods: periods.iter().map(to_period_item).collect(),
        },
        Err(failure) => PeriodsResponse {
            ok: false,
            error_kind: Some(failure.kind.as_str().to_string()),
            message: format!("reorder_periods failed: {}", failure.message),
            periods: Vec::new(),
        },
    }
}

/// Moves one block to `target_index` in `target_period_id`.
///
/// `blocks` holds the target period after the move; `source_blocks` holds
/// the source period when it differs from the target.
#[flutter_rust_bridge::frb(sync)]
pub fn move_block(block_id: String, target_period_id: String, target_index: i64) -> BlocksResponse {
    let result = parse_id(&block_id).and_then(|block_id| {
        let target_period_id = parse_id(&target_period_id)?;
        with_hierarchy_service(|service| {
            service.move_block(block_id, target_period_id, target_index)
        })
    });
    match result {
        Ok(moved) => {
            let source_blocks = if moved.source.period.id == moved.target.period.id {
                Vec::new()
            } else {
                moved.source.blocks.iter().map(to_block_item).collect()
            };
            blocks_success(
                "Block moved.",
                moved.target.blocks.iter().map(to_block_item).collect(),
                source_blocks,
            )
        }
        Err(failure) => blocks_failure("move_block", failure),
    }
}

/// Reorders blocks within one period by absolute target indices.
#[flutter_rust_bridge::frb(sync)]
pub fn reorder_blocks(period_id: String, moves: Vec<IndexMoveInput>) -> BlocksResponse {
    let result = parse_id(&period_id).and_then(|period_id| {
        let moves = parse_moves(&moves)?;
        with_hierarchy_service(|service| service.reorder_blocks(period_id, &moves))
    });
    match result {
        Ok(blocks) => blocks_success(
            "Blocks reordered.",
            blocks.iter().map(to_block_item).collect(),
            Vec::new(),
        ),
        Err(failure) => blocks_failure("reorder_blocks", failure),
    }
}

/// Marks a block done or not done; repeated calls are idempotent.
#[flutter_rust_bridge::frb(sync)]
pub fn complete_block(block_id: String, completed: bool) -> BlocksResponse {
    let result = parse_id(&block_id).and_then(|block_id| {
        with_hierarchy_service(|service| service.complete_block(block_id, completed))
    });
    match result {
        Ok(block) => blocks_success("Block updated.", vec![to_block_item(&block)], Vec::new()),
        Err(failure) => blocks_failure("complete_block", failure),
    }
}

/// Exports an active plan as calendar rows plus CSV text.
///
/// `start_date` is `YYYY-MM-DD`; `start_hour` defaults to the configured
/// export hour and only affects daily plans.
#[flutter_rust_bridge::frb(sync)]
pub fn export_plan(plan_id: String, start_date: String, start_hour: Option<u32>) -> ExportResponse {
    let start_hour = start_hour.unwrap_or(planner_config().export.default_start_hour);
    let result = parse_id(&plan_id).and_then(|plan_id| {
        let start_date = NaiveDate::parse_from_str(start_date.trim(), "%Y-%m-%d").map_err(|err| {
            ApiFailure::new(
                ErrorKind::InvalidConstraint,
                format!("start_date `{start_date}` is not YYYY-MM-DD: {err}"),
            )
        })?;
        let rows = with_connection(|conn| {
            let repo = SqlitePlanRepository::try_new(conn).map_err(repo_failure)?;
            ExportService::new(repo)
                .export_plan(plan_id, start_date, start_hour)
                .map_err(|err| ApiFailure::new(err.kind(), err.to_string()))
        })?;
        let mut buffer = Vec::new();
        write_csv(&rows, &mut buffer)
            .map_err(|err| ApiFailure::new(err.kind(), err.to_string()))?;
        let csv = String::from_utf8(buffer)
            .map_err(|err| ApiFailure::new(ErrorKind::Internal, err.to_string()))?;
        Ok((rows, csv))
    });
    match result {
        Ok((rows, csv)) => ExportResponse {
            ok: true,
            error_kind: None,
            message: format!("Exported {} event(s).", rows.len()),
            rows: rows.iter().map(to_calendar_row_item).collect(),
            csv,
        },
        Err(failure) => ExportResponse {
            ok: false,
            error_kind: Some(failure.kind.as_str().to_string()),
            message: format!("export_plan failed: {}", failure.message),
            rows: Vec::new(),
            csv: String::new(),
        },
    }
}

fn resolve_db_path() -> PathBuf {
    PLAN_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("LAZYPLAN_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(PLAN_DB_FILE_NAME)
        })
        .clone()
}

fn planner_config() -> &'static PlannerConfig {
    PLANNER_CONFIG.get_or_init(|| {
        let Ok(raw) = std::env::var("LAZYPLAN_CONFIG") else {
            return PlannerConfig::default();
        };
        PlannerConfig::load(Path::new(raw.trim())).unwrap_or_else(|err| {
            warn!(
                "event=config_load module=ffi status=error error_code={} fallback=defaults",
                err.kind()
            );
            PlannerConfig::default()
        })
    })
}

fn with_connection<T>(
    f: impl FnOnce(&Connection) -> Result<T, ApiFailure>,
) -> Result<T, ApiFailure> {
    let db_path = resolve_db_path();
    let conn = open_db_with_timeout(&db_path, planner_config().busy_timeout()).map_err(|err| {
        let kind = if err.is_busy() {
            ErrorKind::StoreConflict
        } else {
            ErrorKind::Internal
        };
        ApiFailure::new(kind, format!("plan DB open failed: {err}"))
    })?;
    f(&conn)
}

fn with_hierarchy_service<T>(
    f: impl FnOnce(
        &HierarchyService<SqliteHierarchyRepository<'_>>,
    ) -> Result<T, lazyplan_core::HierarchyError>,
) -> Result<T, ApiFailure> {
    with_connection(|conn| {
        let repo = SqliteHierarchyRepository::try_new(conn).map_err(repo_failure)?;
        let service = HierarchyService::new(repo);
        f(&service).map_err(|err| ApiFailure::new(err.kind(), err.to_string()))
    })
}

fn repo_failure(err: lazyplan_core::RepoError) -> ApiFailure {
    ApiFailure::new(err.kind(), err.to_string())
}

fn parse_id(raw: &str) -> Result<Uuid, ApiFailure> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiFailure::new(ErrorKind::NotFound, format!("invalid id `{raw}`")))
}

fn parse_moves(moves: &[IndexMoveInput]) -> Result<Vec<IndexMove<Uuid>>, ApiFailure> {
    moves
        .iter()
        .map(|entry| Ok(IndexMove::new(parse_id(&entry.id)?, entry.new_index)))
        .collect()
}

fn parse_cadence(raw: &str) -> Result<Cadence, ApiFailure> {
    Cadence::parse(raw).ok_or_else(|| {
        ApiFailure::new(
            ErrorKind::InvalidConstraint,
            format!("unknown cadence `{raw}`; expected daily|weekly|monthly"),
        )
    })
}

fn to_workload(tasks: &[TaskInput], routines: &[u32]) -> Result<Workload, ApiFailure> {
    let tasks = tasks
        .iter()
        .map(|task| {
            let priority = match task.priority.as_deref().map(str::trim) {
                None | Some("") => None,
                Some(raw) => Some(parse_priority(raw)?),
            };
            Ok(TaskLoad {
                required_time: task.required_time,
                priority,
                breakable: task.breakable,
            })
        })
        .collect::<Result<Vec<_>, ApiFailure>>()?;
    let routines = routines
        .iter()
        .map(|required_time| RoutineLoad {
            required_time: *required_time,
        })
        .collect();
    Ok(Workload::new(tasks, routines))
}

fn to_solver(tasks: &[TaskInput], routines: &[u32]) -> Result<TimeConstraintSolver, ApiFailure> {
    let workload = to_workload(tasks, routines)?;
    TimeConstraintSolver::new(&workload).map_err(|err| ApiFailure::new(err.kind(), err.to_string()))
}

fn parse_priority(raw: &str) -> Result<Priority, ApiFailure> {
    match raw.to_ascii_lowercase().as_str() {
        "low" => Ok(Priority::Low),
        "normal" => Ok(Priority::Normal),
        "high" => Ok(Priority::High),
        other => Err(ApiFailure::new(
            ErrorKind::InvalidConstraint,
            format!("unknown priority `{other}`; expected low|normal|high"),
        )),
    }
}

fn axis_response(op: &str, result: Result<u32, ApiFailure>) -> AxisResponse {
    match result {
        Ok(value) => AxisResponse {
            ok: true,
            error_kind: None,
            message: "ok".to_string(),
            value,
        },
        Err(failure) => AxisResponse {
            ok: false,
            error_kind: Some(failure.kind.as_str().to_string()),
            message: format!("{op} failed: {}", failure.message),
            value: 0,
        },
    }
}

fn blocks_success(
    message: &str,
    blocks: Vec<BlockItem>,
    source_blocks: Vec<BlockItem>,
) -> BlocksResponse {
    BlocksResponse {
        ok: true,
        error_kind: None,
        message: message.to_string(),
        blocks,
        source_blocks,
    }
}

fn blocks_failure(op: &str, failure: ApiFailure) -> BlocksResponse {
    BlocksResponse {
        ok: false,
        error_kind: Some(failure.kind.as_str().to_string()),
        message: format!("{op} failed: {}", failure.message),
        blocks: Vec::new(),
        source_blocks: Vec::new(),
    }
}

fn to_period_item(period: &Period) -> PeriodItem {
    PeriodItem {
        period_id: period.id.to_string(),
        index: period.index,
    }
}

fn to_block_item(block: &Block) -> BlockItem {
    BlockItem {
        block_id: block.id.to_string(),
        period_id: block.period_id.to_string(),
        todo_id: block.todo_id.to_string(),
        index: block.index,
        completed_at: block.completed_at,
    }
}

fn to_calendar_row_item(row: &CalendarEventRow) -> CalendarRowItem {
    CalendarRowItem {
        subject: row.subject.clone(),
        start_date: row.start_date.format("%Y-%m-%d").to_string(),
        start_time: row.start_time.map(|time| time.format("%H:%M").to_string()),
        end_date: row.end_date.format("%Y-%m-%d").to_string(),
        end_time: row.end_time.map(|time| time.format("%H:%M").to_string()),
        description: row.description.clone(),
        all_day: row.all_day,
    }
}
