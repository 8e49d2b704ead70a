//! Todo domain model.
//!
//! # Responsibility
//! - Define schedulable work units (tasks and routines).
//! - Validate required time before anything is persisted or solved.
//!
//! # Invariants
//! - `required_time` is strictly positive, in the plan's block unit.
//! - Priority and breakability exist only on tasks.
//! - Only `title`/`description` may change once a block references the todo.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable todo identifier.
pub type TodoId = Uuid;

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
}

impl Priority {
    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }

    pub(crate) fn from_db(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Task vs routine discriminator with kind-specific attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TodoKind {
    /// One-off work that is scheduled once in total.
    Task {
        priority: Option<Priority>,
        /// Whether the task may span multiple blocks/periods.
        breakable: bool,
    },
    /// Recurring work repeated once per period.
    Routine,
}

impl TodoKind {
    pub fn is_routine(self) -> bool {
        matches!(self, Self::Routine)
    }
}

/// Validation failures for todo input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TodoValidationError {
    #[error("todo title must not be blank")]
    BlankTitle,
    #[error("todo required_time must be positive")]
    ZeroRequiredTime,
}

/// One unit of work scheduled by a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    /// Duration in the owning plan's block unit.
    pub required_time: u32,
    #[serde(flatten)]
    pub kind: TodoKind,
}

impl Todo {
    /// Creates a task with a generated id.
    pub fn task(
        title: impl Into<String>,
        required_time: u32,
        priority: Option<Priority>,
        breakable: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            required_time,
            kind: TodoKind::Task {
                priority,
                breakable,
            },
        }
    }

    /// Creates a routine with a generated id.
    pub fn routine(title: impl Into<String>, required_time: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            required_time,
            kind: TodoKind::Routine,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validates the record before it is persisted.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.title.trim().is_empty() {
            return Err(TodoValidationError::BlankTitle);
        }
        if self.required_time == 0 {
            return Err(TodoValidationError::ZeroRequiredTime);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Priority, Todo, TodoKind, TodoValidationError};

    #[test]
    fn task_serializes_with_kind_tag() {
        let todo = Todo::task("Write report", 3, Some(Priority::High), true);
        let value = serde_json::to_value(&todo).unwrap();
        assert_eq!(value["kind"], "task");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["breakable"], true);
    }

    #[test]
    fn routine_has_no_task_fields() {
        let todo = Todo::routine("Exercise", 1);
        assert!(todo.kind.is_routine());
        let value = serde_json::to_value(&todo).unwrap();
        assert_eq!(value["kind"], "routine");
        assert!(value.get("priority").is_none());
    }

    #[test]
    fn validate_rejects_zero_time_and_blank_title() {
        assert_eq!(
            Todo::routine("Read", 0).validate(),
            Err(TodoValidationError::ZeroRequiredTime)
        );
        assert_eq!(
            Todo::task("   ", 2, None, false).validate(),
            Err(TodoValidationError::BlankTitle)
        );
        assert!(matches!(
            Todo::task("ok", 2, None, false).kind,
            TodoKind::Task { breakable: false, .. }
        ));
    }

    #[test]
    fn priority_db_labels_round_trip() {
        for priority in [Priority::Low, Priority::Normal, Priority::High] {
            assert_eq!(Priority::from_db(priority.as_db()), Some(priority));
        }
        assert_eq!(Priority::from_db("urgent"), None);
    }
}
