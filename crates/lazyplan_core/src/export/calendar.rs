//! Map aggregated segments onto calendar dates.
//!
//! # Invariants
//! - Row order equals period/segment order; rows are never sorted by date.
//! - DAILY: one calendar day per period (empty periods still consume a day),
//!   segments laid back-to-back from `start_hour`.
//! - WEEKLY/MONTHLY: one continuous run of all-day events, each advancing
//!   the running date by its duration in days (weekly) or weeks (monthly).

use crate::export::aggregate::AggregatedPlan;
use crate::export::{ExportError, ExportResult};
use crate::model::plan::Cadence;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::io::Write;

const CSV_DATE_FORMAT: &str = "%m/%d/%Y";
const CSV_TIME_FORMAT: &str = "%I:%M %p";

/// One exportable calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEventRow {
    pub subject: String,
    pub start_date: NaiveDate,
    /// `None` for all-day rows.
    pub start_time: Option<NaiveTime>,
    pub end_date: NaiveDate,
    pub end_time: Option<NaiveTime>,
    pub description: String,
    pub all_day: bool,
    pub private: bool,
}

/// Lays aggregated segments onto dates starting at `start_date`.
pub fn to_calendar_events(
    plan: &AggregatedPlan,
    start_date: NaiveDate,
    start_hour: u32,
    cadence: Cadence,
) -> ExportResult<Vec<CalendarEventRow>> {
    if start_hour > 23 {
        return Err(ExportError::InvalidStartHour(start_hour));
    }

    match cadence {
        Cadence::Daily => daily_rows(plan, start_date, start_hour),
        Cadence::Weekly => all_day_rows(plan, start_date, 1),
        Cadence::Monthly => all_day_rows(plan, start_date, 7),
    }
}

fn daily_rows(
    plan: &AggregatedPlan,
    start_date: NaiveDate,
    start_hour: u32,
) -> ExportResult<Vec<CalendarEventRow>> {
    let anchor = NaiveTime::from_hms_opt(start_hour, 0, 0)
        .ok_or(ExportError::InvalidStartHour(start_hour))?;
    let mut rows = Vec::new();

    for (offset, period) in plan.periods.iter().enumerate() {
        let day = add_days(start_date, offset as u64)?;
        let mut cursor = NaiveDateTime::new(day, anchor);
        for segment in &period.segments {
            let end = cursor
                .checked_add_signed(TimeDelta::hours(i64::from(segment.duration)))
                .ok_or(ExportError::DateOutOfRange)?;
            rows.push(CalendarEventRow {
                subject: segment.title.clone(),
                start_date: cursor.date(),
                start_time: Some(cursor.time()),
                end_date: end.date(),
                end_time: Some(end.time()),
                description: segment.description.clone(),
                all_day: false,
                private: true,
            });
            cursor = end;
        }
    }
    Ok(rows)
}

fn all_day_rows(
    plan: &AggregatedPlan,
    start_date: NaiveDate,
    days_per_unit: u64,
) -> ExportResult<Vec<CalendarEventRow>> {
    let mut rows = Vec::new();
    let mut cursor = start_date;

    for segment in plan.periods.iter().flat_map(|period| &period.segments) {
        let end = add_days(cursor, u64::from(segment.duration) * days_per_unit)?;
        rows.push(CalendarEventRow {
            subject: segment.title.clone(),
            start_date: cursor,
            start_time: None,
            end_date: end,
            end_time: None,
            description: segment.description.clone(),
            all_day: true,
            private: true,
        });
        cursor = end;
    }
    Ok(rows)
}

fn add_days(date: NaiveDate, days: u64) -> ExportResult<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or(ExportError::DateOutOfRange)
}

#[derive(Serialize)]
struct CsvRecord<'a> {
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "Start Date")]
    start_date: String,
    #[serde(rename = "Start Time")]
    start_time: String,
    #[serde(rename = "End Date")]
    end_date: String,
    #[serde(rename = "End Time")]
    end_time: String,
    #[serde(rename = "All Day Event")]
    all_day: &'static str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Private")]
    private: &'static str,
}

impl<'a> From<&'a CalendarEventRow> for CsvRecord<'a> {
    fn from(row: &'a CalendarEventRow) -> Self {
        let time = |value: Option<NaiveTime>| {
            value
                .map(|time| time.format(CSV_TIME_FORMAT).to_string())
                .unwrap_or_default()
        };
        Self {
            subject: row.subject.as_str(),
            start_date: row.start_date.format(CSV_DATE_FORMAT).to_string(),
            start_time: time(row.start_time),
            end_date: row.end_date.format(CSV_DATE_FORMAT).to_string(),
            end_time: time(row.end_time),
            all_day: csv_flag(row.all_day),
            description: row.description.as_str(),
            private: csv_flag(row.private),
        }
    }
}

fn csv_flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Writes rows as calendar-import CSV with a header line.
///
/// Writes only the header when `rows` is empty.
pub fn write_csv<W: Write>(rows: &[CalendarEventRow], writer: W) -> ExportResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        csv_writer.write_record([
            "Subject",
            "Start Date",
            "Start Time",
            "End Date",
            "End Time",
            "All Day Event",
            "Description",
            "Private",
        ])?;
    }
    for row in rows {
        csv_writer.serialize(CsvRecord::from(row))?;
    }
    csv_writer.flush()?;
    Ok(())
}
