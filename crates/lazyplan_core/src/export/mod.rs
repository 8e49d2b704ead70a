//! Schedule aggregation and calendar export.
//!
//! # Responsibility
//! - Collapse block sequences into duration-weighted segments.
//! - Lay segments onto calendar dates and serialize them as CSV.
//!
//! Export is read-only; nothing here mutates a plan.

use crate::error::ErrorKind;
use crate::repo::RepoError;
use thiserror::Error;

pub mod aggregate;
pub mod calendar;

pub use aggregate::{aggregate, AggregatedPeriod, AggregatedPlan, Segment, UnresolvedReference};
pub use calendar::{to_calendar_events, write_csv, CalendarEventRow};

pub type ExportResult<T> = Result<T, ExportError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("start hour {0} is outside 0..=23")]
    InvalidStartHour(u32),
    #[error("export date range overflows the calendar")]
    DateOutOfRange,
    #[error("failed to write calendar csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush calendar csv: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Repo(#[from] RepoError),
}

impl ExportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStartHour(_) | Self::DateOutOfRange => ErrorKind::InvalidConstraint,
            Self::Csv(_) | Self::Io(_) => ErrorKind::Internal,
            Self::Repo(err) => err.kind(),
        }
    }
}
