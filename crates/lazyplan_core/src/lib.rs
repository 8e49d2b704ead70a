//! Core domain logic for LazyPlan.
//! This crate is the single source of truth for plan ordering invariants.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod repo;
pub mod service;
pub mod solver;

pub use config::{ConfigError, PlannerConfig};
pub use error::ErrorKind;
pub use export::{AggregatedPlan, CalendarEventRow, ExportError, Segment};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::plan::{Block, BlockId, Cadence, Period, PeriodId, Plan, PlanHierarchy, PlanId};
pub use model::todo::{Priority, Todo, TodoId, TodoKind};
pub use ordering::IndexMove;
pub use repo::hierarchy_repo::{BlockMove, HierarchyRepository, SqliteHierarchyRepository};
pub use repo::plan_repo::{NewPlan, PlanRepository, SqlitePlanRepository};
pub use repo::{RepoError, RepoResult};
pub use service::export_service::ExportService;
pub use service::generation_service::{
    compute_time_constraints, AllocationError, AllocationRequest, AllocationResponse,
    AllocationService, GeneratePlanRequest, GenerationError, PlanGenerationService,
};
pub use service::hierarchy_service::{HierarchyError, HierarchyService};
pub use service::plan_service::PlanService;
pub use solver::time_constraints::{
    SolverError, TimeConstraintSolver, TimeConstraints, Workload,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
