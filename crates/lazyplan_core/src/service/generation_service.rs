//! Plan generation through an external allocator.
//!
//! # Responsibility
//! - Check a requested layout against the solver before allocation.
//! - Hand the workload to an [`AllocationService`] and persist its answer.
//!
//! # Invariants
//! - Nothing is persisted unless the allocation response fits the request:
//!   at most `period_count` periods, at most `blocks_per_period` blocks each,
//!   and every block naming a requested todo.
//! - The core never allocates blocks itself.

use crate::config::LimitsSection;
use crate::error::ErrorKind;
use crate::model::plan::{Cadence, PlanHierarchy};
use crate::model::todo::{Todo, TodoId, TodoValidationError};
use crate::repo::plan_repo::{NewPlan, PlanRepository};
use crate::repo::RepoError;
use crate::solver::time_constraints::{
    SolverError, TimeConstraintSolver, TimeConstraints, Workload,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Workload and layout handed to the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub title: String,
    pub description: String,
    pub cadence: Cadence,
    pub block_unit: String,
    pub period_unit: String,
    pub period_count: u32,
    pub blocks_per_period: u32,
    pub tasks: Vec<Todo>,
    pub routines: Vec<Todo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedBlock {
    pub todo_id: TodoId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedPeriod {
    pub blocks: Vec<AllocatedBlock>,
}

/// Allocator answer: ordered periods of ordered blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResponse {
    pub periods: Vec<AllocatedPeriod>,
    pub total_time: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("allocation service unavailable: {0}")]
    Unavailable(String),
    #[error("allocation rejected: {0}")]
    Rejected(String),
}

/// External block allocator.
pub trait AllocationService {
    fn generate_plan(&self, request: &AllocationRequest)
        -> Result<AllocationResponse, AllocationError>;
}

/// Caller input for [`PlanGenerationService::generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratePlanRequest {
    pub title: String,
    pub description: String,
    pub cadence: Cadence,
    pub period_count: u32,
    pub blocks_per_period: u32,
    pub tasks: Vec<Todo>,
    pub routines: Vec<Todo>,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("{0}")]
    Constraint(#[from] SolverError),
    #[error("{0}")]
    Validation(#[from] TodoValidationError),
    #[error("todo `{0}` is listed with the wrong kind")]
    MisplacedTodo(TodoId),
    #[error("{0}")]
    Allocation(#[from] AllocationError),
    #[error("allocation response does not fit the request: {0}")]
    ResponseShape(String),
    #[error("allocation response references unknown todo {0}")]
    UnknownTodo(TodoId),
    #[error("{0}")]
    Repo(#[from] RepoError),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Constraint(_) | Self::Validation(_) | Self::MisplacedTodo(_) => {
                ErrorKind::InvalidConstraint
            }
            Self::UnknownTodo(_) => ErrorKind::UnresolvedReference,
            Self::Allocation(_) | Self::ResponseShape(_) => ErrorKind::Internal,
            Self::Repo(err) => err.kind(),
        }
    }
}

/// Feasible band for `todos` under the configured ceiling of `cadence`.
pub fn compute_time_constraints(
    workload: &Workload,
    cadence: Cadence,
    limits: &LimitsSection,
) -> Result<TimeConstraints, SolverError> {
    TimeConstraintSolver::new(workload)?.compute_range(limits.max_blocks(cadence))
}

pub struct PlanGenerationService<A: AllocationService, R: PlanRepository> {
    allocator: A,
    repo: R,
    limits: LimitsSection,
}

impl<A: AllocationService, R: PlanRepository> PlanGenerationService<A, R> {
    pub fn new(allocator: A, repo: R, limits: LimitsSection) -> Self {
        Self {
            allocator,
            repo,
            limits,
        }
    }

    /// Validates, allocates and persists one plan.
    pub fn generate(
        &self,
        request: GeneratePlanRequest,
    ) -> Result<PlanHierarchy, GenerationError> {
        let result = self.generate_inner(request);
        match &result {
            Ok(hierarchy) => info!(
                "event=plan_generate module=service status=ok cadence={} periods={}",
                hierarchy.plan.cadence.as_str(),
                hierarchy.periods.len()
            ),
            Err(err) => warn!(
                "event=plan_generate module=service status=error error_code={}",
                err.kind()
            ),
        }
        result
    }

    fn generate_inner(
        &self,
        request: GeneratePlanRequest,
    ) -> Result<PlanHierarchy, GenerationError> {
        for task in &request.tasks {
            task.validate()?;
            if task.kind.is_routine() {
                return Err(GenerationError::MisplacedTodo(task.id));
            }
        }
        for routine in &request.routines {
            routine.validate()?;
            if !routine.kind.is_routine() {
                return Err(GenerationError::MisplacedTodo(routine.id));
            }
        }

        let workload = Workload::from_todos(request.tasks.iter().chain(&request.routines));
        let solver = TimeConstraintSolver::new(&workload)?;
        let range = solver.compute_range(self.limits.max_blocks(request.cadence))?;
        if request.blocks_per_period < range.least_blocks
            || request.blocks_per_period > range.max_blocks
        {
            return Err(SolverError::InvalidConstraint(format!(
                "blocks_per_period {} is outside {}..={}",
                request.blocks_per_period, range.least_blocks, range.max_blocks
            ))
            .into());
        }
        let needed = solver.rederive_from_blocks(request.blocks_per_period)?;
        if request.period_count < needed {
            return Err(SolverError::InvalidConstraint(format!(
                "period_count {} is below the {needed} periods the workload needs",
                request.period_count
            ))
            .into());
        }

        let header = NewPlan::new(request.title.clone(), request.cadence)
            .with_description(request.description.clone());
        let allocation_request = AllocationRequest {
            title: request.title,
            description: request.description,
            cadence: request.cadence,
            block_unit: header.block_unit.clone(),
            period_unit: header.period_unit.clone(),
            period_count: request.period_count,
            blocks_per_period: request.blocks_per_period,
            tasks: request.tasks,
            routines: request.routines,
        };
        let response = self.allocator.generate_plan(&allocation_request)?;
        let layout = check_response(&allocation_request, &response)?;

        let todos = allocation_request
            .tasks
            .into_iter()
            .chain(allocation_request.routines)
            .collect::<Vec<_>>();
        Ok(self.repo.create_generated_plan(&header, &todos, &layout)?)
    }
}

fn check_response(
    request: &AllocationRequest,
    response: &AllocationResponse,
) -> Result<Vec<Vec<TodoId>>, GenerationError> {
    if response.periods.len() > request.period_count as usize {
        return Err(GenerationError::ResponseShape(format!(
            "{} periods returned, {} requested",
            response.periods.len(),
            request.period_count
        )));
    }
    let known: HashSet<TodoId> = request
        .tasks
        .iter()
        .chain(&request.routines)
        .map(|todo| todo.id)
        .collect();

    response
        .periods
        .iter()
        .enumerate()
        .map(|(index, period)| {
            if period.blocks.len() > request.blocks_per_period as usize {
                return Err(GenerationError::ResponseShape(format!(
                    "period {index} holds {} blocks, limit is {}",
                    period.blocks.len(),
                    request.blocks_per_period
                )));
            }
            period
                .blocks
                .iter()
                .map(|block| {
                    if known.contains(&block.todo_id) {
                        Ok(block.todo_id)
                    } else {
                        Err(GenerationError::UnknownTodo(block.todo_id))
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        check_response, compute_time_constraints, AllocatedBlock, AllocatedPeriod,
        AllocationRequest, AllocationResponse, GenerationError,
    };
    use crate::config::LimitsSection;
    use crate::error::ErrorKind;
    use crate::model::plan::Cadence;
    use crate::model::todo::Todo;
    use crate::solver::time_constraints::{RoutineLoad, TaskLoad, Workload};
    use uuid::Uuid;

    fn request(tasks: Vec<Todo>) -> AllocationRequest {
        AllocationRequest {
            title: "Sprint".to_string(),
            description: String::new(),
            cadence: Cadence::Daily,
            block_unit: "hour".to_string(),
            period_unit: "day".to_string(),
            period_count: 2,
            blocks_per_period: 2,
            tasks,
            routines: Vec::new(),
        }
    }

    fn period(todo_ids: &[Uuid]) -> AllocatedPeriod {
        AllocatedPeriod {
            blocks: todo_ids
                .iter()
                .map(|todo_id| AllocatedBlock { todo_id: *todo_id })
                .collect(),
        }
    }

    #[test]
    fn weekly_ceiling_comes_from_limits() {
        let workload = Workload::new(
            vec![TaskLoad {
                required_time: 10,
                priority: None,
                breakable: true,
            }],
            vec![RoutineLoad { required_time: 2 }],
        );
        let range =
            compute_time_constraints(&workload, Cadence::Weekly, &LimitsSection::default())
                .unwrap();
        assert_eq!(range.max_blocks, 7);
        assert_eq!(range.least_periods, 2);
        assert_eq!(range.max_periods, 10);
    }

    #[test]
    fn response_with_foreign_todo_is_unresolved() {
        let task = Todo::task("Write", 2, None, true);
        let response = AllocationResponse {
            periods: vec![period(&[task.id, Uuid::new_v4()])],
            total_time: 2,
        };
        let err = check_response(&request(vec![task]), &response).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    }

    #[test]
    fn response_exceeding_layout_is_rejected() {
        let task = Todo::task("Write", 3, None, true);
        let response = AllocationResponse {
            periods: vec![period(&[task.id, task.id, task.id])],
            total_time: 3,
        };
        let err = check_response(&request(vec![task]), &response).unwrap_err();
        assert!(matches!(err, GenerationError::ResponseShape(_)));
    }

    #[test]
    fn response_flattens_to_layout() {
        let task = Todo::task("Write", 3, None, true);
        let response = AllocationResponse {
            periods: vec![period(&[task.id, task.id]), period(&[task.id])],
            total_time: 3,
        };
        let layout = check_response(&request(vec![task.clone()]), &response).unwrap();
        assert_eq!(layout, vec![vec![task.id, task.id], vec![task.id]]);
    }
}
