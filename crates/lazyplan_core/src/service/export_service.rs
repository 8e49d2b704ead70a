//! Read-only export of stored plans.
//!
//! # Responsibility
//! - Load a plan's hierarchy and todos, aggregate them and lay them onto a
//!   calendar starting at a caller-chosen date.

use crate::export::{aggregate, to_calendar_events, AggregatedPlan, CalendarEventRow, ExportResult};
use crate::model::plan::PlanId;
use crate::repo::plan_repo::PlanRepository;
use chrono::NaiveDate;
use log::info;

/// Export facade over a [`PlanRepository`].
pub struct ExportService<R: PlanRepository> {
    repo: R,
}

impl<R: PlanRepository> ExportService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Segments per period for an active plan.
    pub fn aggregate_plan(&self, plan_id: PlanId) -> ExportResult<AggregatedPlan> {
        let hierarchy = self.repo.load_hierarchy(plan_id)?;
        let todos = self.repo.list_todos(plan_id)?;
        Ok(aggregate(&hierarchy, &todos))
    }

    /// Calendar rows for an active plan, in period/segment order.
    pub fn export_plan(
        &self,
        plan_id: PlanId,
        start_date: NaiveDate,
        start_hour: u32,
    ) -> ExportResult<Vec<CalendarEventRow>> {
        let aggregated = self.aggregate_plan(plan_id)?;
        let rows = to_calendar_events(&aggregated, start_date, start_hour, aggregated.cadence)?;
        info!(
            "event=plan_export module=service status=ok cadence={} periods={} rows={} unresolved={}",
            aggregated.cadence.as_str(),
            aggregated.periods.len(),
            rows.len(),
            aggregated.unresolved.len()
        );
        Ok(rows)
    }
}
