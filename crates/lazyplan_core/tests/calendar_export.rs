use chrono::{NaiveDate, NaiveTime};
use lazyplan_core::db::open_db_in_memory;
use lazyplan_core::export::write_csv;
use lazyplan_core::{
    Cadence, ErrorKind, ExportService, NewPlan, PlanHierarchy, PlanRepository,
    SqlitePlanRepository, Todo,
};
use rusqlite::{params, Connection};
use uuid::Uuid;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn time(hour: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour, 0, 0)
}

/// Stores `[[A, A, B, A], [B]]` under `cadence`.
fn seed(conn: &Connection, cadence: Cadence) -> (PlanHierarchy, Todo, Todo) {
    let a = Todo::task("Read", 3, None, true).with_description("chapter 4");
    let b = Todo::routine("Stretch", 1);
    let repo = SqlitePlanRepository::try_new(conn).unwrap();
    let hierarchy = repo
        .create_generated_plan(
            &NewPlan::new("Study", cadence),
            &[a.clone(), b.clone()],
            &[vec![a.id, a.id, b.id, a.id], vec![b.id]],
        )
        .unwrap();
    (hierarchy, a, b)
}

#[test]
fn consecutive_blocks_collapse_into_segments() {
    let conn = open_db_in_memory().unwrap();
    let (hierarchy, a, b) = seed(&conn, Cadence::Daily);
    let service = ExportService::new(SqlitePlanRepository::try_new(&conn).unwrap());

    let aggregated = service.aggregate_plan(hierarchy.plan.id).unwrap();
    let first = &aggregated.periods[0].segments;
    assert_eq!(
        first
            .iter()
            .map(|segment| (segment.todo_id, segment.duration))
            .collect::<Vec<_>>(),
        vec![(a.id, 2), (b.id, 1), (a.id, 1)]
    );
    assert_eq!(first[0].description, "chapter 4");
    assert_eq!(aggregated.periods[1].segments.len(), 1);
    assert!(aggregated.unresolved.is_empty());
}

#[test]
fn daily_plan_exports_back_to_back_hours() {
    let conn = open_db_in_memory().unwrap();
    let (hierarchy, _, _) = seed(&conn, Cadence::Daily);
    let service = ExportService::new(SqlitePlanRepository::try_new(&conn).unwrap());

    let rows = service
        .export_plan(hierarchy.plan.id, date(2024, 3, 4), 9)
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].subject, "Read");
    assert_eq!((rows[0].start_time, rows[0].end_time), (time(9), time(11)));
    assert_eq!((rows[1].start_time, rows[1].end_time), (time(11), time(12)));
    assert_eq!((rows[2].start_time, rows[2].end_time), (time(12), time(13)));
    assert_eq!(rows[3].start_date, date(2024, 3, 5));
    assert_eq!(rows[3].start_time, time(9));
    assert!(rows.iter().all(|row| !row.all_day && row.private));
}

#[test]
fn weekly_and_monthly_plans_export_all_day_events() {
    let conn = open_db_in_memory().unwrap();
    let (weekly, _, _) = seed(&conn, Cadence::Weekly);
    let (monthly, _, _) = seed(&conn, Cadence::Monthly);
    let service = ExportService::new(SqlitePlanRepository::try_new(&conn).unwrap());

    let rows = service
        .export_plan(weekly.plan.id, date(2024, 3, 4), 9)
        .unwrap();
    assert!(rows.iter().all(|row| row.all_day && row.start_time.is_none()));
    assert_eq!(
        rows.iter()
            .map(|row| (row.start_date, row.end_date))
            .collect::<Vec<_>>(),
        vec![
            (date(2024, 3, 4), date(2024, 3, 6)),
            (date(2024, 3, 6), date(2024, 3, 7)),
            (date(2024, 3, 7), date(2024, 3, 8)),
            (date(2024, 3, 8), date(2024, 3, 9)),
        ]
    );

    let rows = service
        .export_plan(monthly.plan.id, date(2024, 3, 4), 9)
        .unwrap();
    assert_eq!(rows[0].end_date, date(2024, 3, 18));
    assert_eq!(rows[3].end_date, date(2024, 4, 8));
}

#[test]
fn export_writes_calendar_csv() {
    let conn = open_db_in_memory().unwrap();
    let (hierarchy, _, _) = seed(&conn, Cadence::Daily);
    let service = ExportService::new(SqlitePlanRepository::try_new(&conn).unwrap());
    let rows = service
        .export_plan(hierarchy.plan.id, date(2024, 3, 4), 22)
        .unwrap();

    let mut out = Vec::new();
    write_csv(&rows, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(
        lines[0],
        "Subject,Start Date,Start Time,End Date,End Time,All Day Event,Description,Private"
    );
    assert_eq!(
        lines[1],
        "Read,03/04/2024,10:00 PM,03/05/2024,12:00 AM,False,chapter 4,True"
    );
    assert_eq!(lines.len(), 5);
}

#[test]
fn foreign_block_reference_is_reported_and_skipped() {
    let conn = open_db_in_memory().unwrap();
    let (hierarchy, a, _) = seed(&conn, Cadence::Daily);
    let (other, _, other_routine) = seed(&conn, Cadence::Daily);
    let stray = hierarchy.periods[0].blocks[2].id;
    conn.execute(
        "UPDATE blocks SET todo_uuid = ?1 WHERE block_uuid = ?2;",
        params![other_routine.id.to_string(), stray.to_string()],
    )
    .unwrap();
    assert_ne!(other.plan.id, hierarchy.plan.id);

    let service = ExportService::new(SqlitePlanRepository::try_new(&conn).unwrap());
    let aggregated = service.aggregate_plan(hierarchy.plan.id).unwrap();
    assert_eq!(aggregated.unresolved.len(), 1);
    assert_eq!(aggregated.unresolved[0].block_id, stray);
    assert_eq!(
        aggregated.periods[0]
            .segments
            .iter()
            .map(|segment| (segment.todo_id, segment.duration))
            .collect::<Vec<_>>(),
        vec![(a.id, 3)]
    );
}

#[test]
fn export_rejects_bad_hour_and_unknown_plan() {
    let conn = open_db_in_memory().unwrap();
    let (hierarchy, _, _) = seed(&conn, Cadence::Daily);
    let service = ExportService::new(SqlitePlanRepository::try_new(&conn).unwrap());

    let err = service
        .export_plan(hierarchy.plan.id, date(2024, 3, 4), 24)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConstraint);

    let err = service
        .export_plan(Uuid::new_v4(), date(2024, 3, 4), 9)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
