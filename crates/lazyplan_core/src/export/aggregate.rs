//! Collapse consecutive same-todo blocks into segments.
//!
//! # Invariants
//! - Segment order matches block index order; periods keep plan order.
//! - Runs never merge across a different todo (A, A, B, A -> A2, B1, A1).
//! - Blocks with unresolvable todos are skipped and reported, never fatal.

use crate::model::plan::{BlockId, Cadence, PeriodId, PlanHierarchy, PlanId};
use crate::model::todo::{Todo, TodoId};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A run of consecutive blocks scheduling the same todo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub todo_id: TodoId,
    pub title: String,
    /// Length in block units.
    pub duration: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedPeriod {
    pub period_id: PeriodId,
    pub index: u32,
    pub segments: Vec<Segment>,
}

/// Block whose todo could not be resolved during aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedReference {
    pub block_id: BlockId,
    pub todo_id: TodoId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedPlan {
    pub plan_id: PlanId,
    pub cadence: Cadence,
    pub periods: Vec<AggregatedPeriod>,
    /// Skipped blocks, kept for diagnostics only.
    pub unresolved: Vec<UnresolvedReference>,
}

/// Aggregates a hierarchy into per-period segment lists.
pub fn aggregate(hierarchy: &PlanHierarchy, todos: &[Todo]) -> AggregatedPlan {
    let by_id: HashMap<TodoId, &Todo> = todos.iter().map(|todo| (todo.id, todo)).collect();
    let mut unresolved = Vec::new();

    let periods = hierarchy
        .periods
        .iter()
        .map(|entry| {
            let mut segments: Vec<Segment> = Vec::new();
            for block in &entry.blocks {
                let Some(todo) = by_id.get(&block.todo_id) else {
                    warn!(
                        "event=aggregate_skip module=export status=error error_code=unresolved_reference plan={} block={} todo={}",
                        hierarchy.plan.id, block.id, block.todo_id
                    );
                    unresolved.push(UnresolvedReference {
                        block_id: block.id,
                        todo_id: block.todo_id,
                    });
                    continue;
                };

                match segments.last_mut() {
                    Some(current) if current.todo_id == todo.id => current.duration += 1,
                    _ => segments.push(Segment {
                        todo_id: todo.id,
                        title: todo.title.clone(),
                        duration: 1,
                        description: todo.description.clone(),
                    }),
                }
            }
            AggregatedPeriod {
                period_id: entry.period.id,
                index: entry.period.index,
                segments,
            }
        })
        .collect();

    AggregatedPlan {
        plan_id: hierarchy.plan.id,
        cadence: hierarchy.plan.cadence,
        periods,
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::aggregate;
    use crate::model::plan::{Block, Cadence, Period, PeriodBlocks, Plan, PlanHierarchy};
    use crate::model::todo::{Todo, TodoId};
    use uuid::Uuid;

    fn hierarchy(periods: Vec<Vec<TodoId>>) -> PlanHierarchy {
        let plan_id = Uuid::new_v4();
        PlanHierarchy {
            plan: Plan {
                id: plan_id,
                title: "Week".to_string(),
                description: String::new(),
                cadence: Cadence::Daily,
                block_unit: "hour".to_string(),
                period_unit: "day".to_string(),
                revision: 0,
                is_deleted: false,
                created_at: 0,
                updated_at: 0,
            },
            periods: periods
                .into_iter()
                .enumerate()
                .map(|(period_index, todo_ids)| {
                    let period_id = Uuid::new_v4();
                    PeriodBlocks {
                        period: Period {
                            id: period_id,
                            plan_id,
                            index: period_index as u32,
                        },
                        blocks: todo_ids
                            .into_iter()
                            .enumerate()
                            .map(|(block_index, todo_id)| Block {
                                id: Uuid::new_v4(),
                                period_id,
                                todo_id,
                                index: block_index as u32,
                                completed_at: None,
                            })
                            .collect(),
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn runs_do_not_merge_across_interruptions() {
        let a = Todo::task("A", 3, None, true);
        let b = Todo::task("B", 1, None, true);
        let plan = hierarchy(vec![vec![a.id, a.id, b.id, a.id]]);

        let aggregated = aggregate(&plan, &[a.clone(), b.clone()]);
        let segments = &aggregated.periods[0].segments;
        let summary = segments
            .iter()
            .map(|segment| (segment.title.as_str(), segment.duration))
            .collect::<Vec<_>>();
        assert_eq!(summary, vec![("A", 2), ("B", 1), ("A", 1)]);
        assert!(aggregated.unresolved.is_empty());
    }

    #[test]
    fn empty_period_yields_empty_segment_list() {
        let a = Todo::routine("A", 1);
        let plan = hierarchy(vec![vec![], vec![a.id]]);
        let aggregated = aggregate(&plan, &[a]);
        assert_eq!(aggregated.periods.len(), 2);
        assert!(aggregated.periods[0].segments.is_empty());
        assert_eq!(aggregated.periods[1].segments.len(), 1);
    }

    #[test]
    fn runs_reset_at_period_boundary() {
        let a = Todo::task("A", 4, None, true);
        let plan = hierarchy(vec![vec![a.id, a.id], vec![a.id, a.id]]);
        let aggregated = aggregate(&plan, &[a]);
        assert_eq!(aggregated.periods[0].segments[0].duration, 2);
        assert_eq!(aggregated.periods[1].segments[0].duration, 2);
    }

    #[test]
    fn unresolved_todo_is_skipped_and_reported() {
        let a = Todo::task("A", 2, None, true).with_description("deep work");
        let missing = Uuid::new_v4();
        let plan = hierarchy(vec![vec![a.id, missing, a.id]]);

        let aggregated = aggregate(&plan, &[a]);
        let segments = &aggregated.periods[0].segments;
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].duration, 2);
        assert_eq!(segments[0].description, "deep work");
        assert_eq!(aggregated.unresolved.len(), 1);
        assert_eq!(aggregated.unresolved[0].todo_id, missing);
    }
}
