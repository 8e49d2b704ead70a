//! Plan, period and block records.
//!
//! # Responsibility
//! - Define the two-level (period -> block) hierarchy owned by a plan.
//! - Map cadence to the semantic units of a period and a block.
//!
//! # Invariants
//! - Period `index` values of one plan form `0..N-1`.
//! - Block `index` values of one period form `0..M-1`.
//! - A block references exactly one todo of the same plan.

use crate::model::todo::TodoId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlanId = Uuid;
pub type PeriodId = Uuid;
pub type BlockId = Uuid;

/// Plan time granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    /// Period = day, block = hour.
    Daily,
    /// Period = week, block = day.
    Weekly,
    /// Period = month, block = week.
    Monthly,
}

impl Cadence {
    /// Unit name of one period.
    pub fn period_unit(self) -> &'static str {
        match self {
            Self::Daily => "day",
            Self::Weekly => "week",
            Self::Monthly => "month",
        }
    }

    /// Unit name of one block.
    pub fn block_unit(self) -> &'static str {
        match self {
            Self::Daily => "hour",
            Self::Weekly => "day",
            Self::Monthly => "week",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Parses a case-insensitive cadence label.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// Named container of periods and todos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub title: String,
    pub description: String,
    pub cadence: Cadence,
    pub block_unit: String,
    pub period_unit: String,
    /// Bumped on every committed structural mutation.
    pub revision: i64,
    pub is_deleted: bool,
    /// Epoch ms.
    pub created_at: i64,
    /// Epoch ms.
    pub updated_at: i64,
}

/// One cadence unit of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub id: PeriodId,
    pub plan_id: PlanId,
    pub index: u32,
}

/// One schedulable slot inside a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub period_id: PeriodId,
    pub todo_id: TodoId,
    pub index: u32,
    /// Epoch ms completion time; `None` while incomplete.
    pub completed_at: Option<i64>,
}

impl Block {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// A period with its blocks in index order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodBlocks {
    pub period: Period,
    pub blocks: Vec<Block>,
}

/// Full ordered hierarchy of one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanHierarchy {
    pub plan: Plan,
    pub periods: Vec<PeriodBlocks>,
}

impl PlanHierarchy {
    /// Returns whether every index sequence is dense and zero-based.
    pub fn is_dense(&self) -> bool {
        let periods_dense = self
            .periods
            .iter()
            .enumerate()
            .all(|(position, entry)| entry.period.index as usize == position);
        periods_dense
            && self.periods.iter().all(|entry| {
                entry.blocks.iter().enumerate().all(|(position, block)| {
                    block.index as usize == position && block.period_id == entry.period.id
                })
            })
    }
}
