//! Workload -> feasible (blocks-per-period, periods) band.
//!
//! # Responsibility
//! - Compute the numeric range a workload can be laid out into.
//! - Re-derive one axis when the user pins the other.
//!
//! # Invariants
//! - A period's task capacity is `blocks_per_period - routine_time` and must be
//!   at least 1; anything else is `InvalidConstraint`, never a silent clamp.
//! - `periods_needed` is non-increasing in `blocks_per_period`.
//! - Re-derivation rounds up, so a round trip never asks for more than the
//!   user pinned: `from_blocks(from_periods(p)) <= p` and
//!   `from_periods(from_blocks(b)) <= b`.
//! - Arithmetic on summed durations is checked; overflow is
//!   `InvalidConstraint`.

use crate::error::ErrorKind;
use crate::model::todo::{Priority, Todo, TodoKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Solver failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("invalid constraint: {0}")]
    InvalidConstraint(String),
}

impl SolverError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidConstraint
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConstraint(message.into())
    }
}

pub type SolverResult<T> = Result<T, SolverError>;

/// Task input to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLoad {
    pub required_time: u32,
    pub priority: Option<Priority>,
    pub breakable: bool,
}

/// Routine input; repeats once per period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineLoad {
    pub required_time: u32,
}

/// Tasks and routines sharing one block unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub tasks: Vec<TaskLoad>,
    pub routines: Vec<RoutineLoad>,
}

impl Workload {
    pub fn new(tasks: Vec<TaskLoad>, routines: Vec<RoutineLoad>) -> Self {
        Self { tasks, routines }
    }

    /// Splits todos into task and routine loads.
    pub fn from_todos<'a>(todos: impl IntoIterator<Item = &'a Todo>) -> Self {
        let mut workload = Self::default();
        for todo in todos {
            match todo.kind {
                TodoKind::Task {
                    priority,
                    breakable,
                } => workload.tasks.push(TaskLoad {
                    required_time: todo.required_time,
                    priority,
                    breakable,
                }),
                TodoKind::Routine => workload.routines.push(RoutineLoad {
                    required_time: todo.required_time,
                }),
            }
        }
        workload
    }
}

/// Feasible band reported to callers (`GetTimeConstraints` shape).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeConstraints {
    pub least_blocks: u32,
    pub max_blocks: u32,
    pub least_periods: u32,
    pub max_periods: u32,
}

/// Solver bound to one workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeConstraintSolver {
    total_task_time: u64,
    routine_time: u64,
    largest_unbreakable: u64,
}

impl TimeConstraintSolver {
    /// Builds a solver, rejecting zero-length durations.
    pub fn new(workload: &Workload) -> SolverResult<Self> {
        if workload.tasks.iter().any(|task| task.required_time == 0) {
            return Err(SolverError::invalid("task required_time must be positive"));
        }
        if workload
            .routines
            .iter()
            .any(|routine| routine.required_time == 0)
        {
            return Err(SolverError::invalid(
                "routine required_time must be positive",
            ));
        }

        Ok(Self {
            total_task_time: workload
                .tasks
                .iter()
                .map(|task| u64::from(task.required_time))
                .sum(),
            routine_time: workload
                .routines
                .iter()
                .map(|routine| u64::from(routine.required_time))
                .sum(),
            largest_unbreakable: workload
                .tasks
                .iter()
                .filter(|task| !task.breakable)
                .map(|task| u64::from(task.required_time))
                .max()
                .unwrap_or(0),
        })
    }

    pub fn total_task_time(&self) -> u64 {
        self.total_task_time
    }

    pub fn per_period_routine_time(&self) -> u64 {
        self.routine_time
    }

    /// Smallest blocks-per-period that leaves room for one task block and
    /// for the largest unbreakable task.
    pub fn least_blocks(&self) -> u64 {
        self.routine_time + self.largest_unbreakable.max(1)
    }

    /// `ceil(total_task_time / (blocks_per_period - routine_time))`, at least 1.
    pub fn periods_needed(&self, blocks_per_period: u32) -> SolverResult<u32> {
        let blocks = u64::from(blocks_per_period);
        if blocks <= self.routine_time {
            return Err(SolverError::invalid(format!(
                "blocks_per_period {blocks} leaves no task capacity after {} routine blocks",
                self.routine_time
            )));
        }
        let capacity = blocks - self.routine_time;
        fit(self.total_task_time.div_ceil(capacity).max(1), "periods")
    }

    /// Reports the feasible band under a policy ceiling for blocks-per-period.
    ///
    /// The lower bound also fits the largest unbreakable task into one period.
    pub fn compute_range(&self, max_blocks: u32) -> SolverResult<TimeConstraints> {
        let least_blocks = self.least_blocks();
        if least_blocks > u64::from(max_blocks) {
            return Err(SolverError::invalid(format!(
                "workload needs at least {least_blocks} blocks per period, ceiling is {max_blocks}"
            )));
        }
        let least_blocks = fit(least_blocks, "least_blocks")?;

        Ok(TimeConstraints {
            least_blocks,
            max_blocks,
            least_periods: self.periods_needed(max_blocks)?,
            max_periods: self.periods_needed(least_blocks)?,
        })
    }

    /// Periods implied by a pinned blocks-per-period: [`Self::periods_needed`].
    ///
    /// Only the routine load is checked here; unbreakable tasks are a
    /// concern of [`Self::compute_range`].
    pub fn rederive_from_blocks(&self, blocks_per_period: u32) -> SolverResult<u32> {
        self.periods_needed(blocks_per_period)
    }

    /// Blocks-per-period implied by a pinned period count:
    /// `ceil((total_task_time + routine_time * periods) / periods)`.
    ///
    /// With no task time the result is raised to `routine_time + 1`, the
    /// smallest value [`Self::rederive_from_blocks`] accepts.
    pub fn rederive_from_periods(&self, periods: u32) -> SolverResult<u32> {
        if periods == 0 {
            return Err(SolverError::invalid("periods must be at least 1"));
        }
        let periods = u64::from(periods);
        let total = self
            .routine_time
            .checked_mul(periods)
            .and_then(|routine_total| routine_total.checked_add(self.total_task_time))
            .ok_or_else(|| SolverError::invalid("workload total overflows"))?;
        let blocks = total.div_ceil(periods).max(self.routine_time + 1);
        fit(blocks, "blocks_per_period")
    }
}

/// Convenience wrapper: solver construction plus [`TimeConstraintSolver::compute_range`].
pub fn compute_range(workload: &Workload, max_blocks: u32) -> SolverResult<TimeConstraints> {
    TimeConstraintSolver::new(workload)?.compute_range(max_blocks)
}

fn fit(value: u64, what: &str) -> SolverResult<u32> {
    u32::try_from(value).map_err(|_| SolverError::invalid(format!("{what} {value} exceeds u32")))
}
