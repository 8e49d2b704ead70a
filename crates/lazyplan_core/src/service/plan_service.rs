//! Plan lifecycle use-case service.
//!
//! # Responsibility
//! - Provide read, soft-delete and display-edit entry points for plans.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Display edits never touch ordering, durations or completion state.

use crate::model::plan::{Plan, PlanHierarchy, PlanId};
use crate::model::todo::{Todo, TodoId, TodoValidationError};
use crate::repo::plan_repo::PlanRepository;
use crate::repo::{RepoError, RepoResult};

/// Use-case service wrapper for plan lifecycle operations.
pub struct PlanService<R: PlanRepository> {
    repo: R,
}

impl<R: PlanRepository> PlanService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads an active plan, failing with `PlanNotFound` when absent.
    pub fn get_plan(&self, plan_id: PlanId) -> RepoResult<Plan> {
        self.repo
            .get_plan(plan_id, false)?
            .ok_or(RepoError::PlanNotFound(plan_id))
    }

    pub fn list_plans(&self) -> RepoResult<Vec<Plan>> {
        self.repo.list_plans(false)
    }

    pub fn soft_delete_plan(&self, plan_id: PlanId) -> RepoResult<()> {
        self.repo.soft_delete_plan(plan_id)
    }

    pub fn load_hierarchy(&self, plan_id: PlanId) -> RepoResult<PlanHierarchy> {
        self.repo.load_hierarchy(plan_id)
    }

    pub fn list_todos(&self, plan_id: PlanId) -> RepoResult<Vec<Todo>> {
        self.repo.list_todos(plan_id)
    }

    /// Renames a todo and replaces its description.
    ///
    /// # Contract
    /// - Title is trimmed and must not be blank.
    pub fn update_todo_display(
        &self,
        todo_id: TodoId,
        title: &str,
        description: &str,
    ) -> RepoResult<()> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TodoValidationError::BlankTitle.into());
        }
        self.repo.update_todo_display(todo_id, title, description)
    }
}
