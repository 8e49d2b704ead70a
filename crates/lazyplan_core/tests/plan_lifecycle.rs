use lazyplan_core::db::open_db_in_memory;
use lazyplan_core::{
    Cadence, ErrorKind, NewPlan, PlanRepository, PlanService, RepoError, SqlitePlanRepository,
    Todo,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn generated_plan_is_dense_and_carries_cadence_units() {
    let conn = setup();
    let repo = SqlitePlanRepository::try_new(&conn).unwrap();
    let write = Todo::task("Write", 3, None, true);
    let walk = Todo::routine("Walk", 1);

    let hierarchy = repo
        .create_generated_plan(
            &NewPlan::new("Week", Cadence::Weekly).with_description("launch"),
            &[write.clone(), walk.clone()],
            &[vec![write.id, walk.id], vec![write.id, write.id, walk.id], vec![]],
        )
        .unwrap();

    assert!(hierarchy.is_dense());
    assert_eq!(hierarchy.plan.block_unit, "day");
    assert_eq!(hierarchy.plan.period_unit, "week");
    assert_eq!(hierarchy.plan.revision, 0);
    assert_eq!(hierarchy.periods.len(), 3);
    assert_eq!(hierarchy.periods[1].blocks.len(), 3);
    assert!(hierarchy.periods[2].blocks.is_empty());

    let reloaded = repo.load_hierarchy(hierarchy.plan.id).unwrap();
    assert_eq!(reloaded, hierarchy);
}

#[test]
fn layout_with_foreign_todo_writes_nothing() {
    let conn = setup();
    let repo = SqlitePlanRepository::try_new(&conn).unwrap();
    let write = Todo::task("Write", 1, None, true);

    let err = repo
        .create_generated_plan(
            &NewPlan::new("Day", Cadence::Daily),
            &[write.clone()],
            &[vec![write.id, Uuid::new_v4()]],
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::TodoNotInPlan { .. }));
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(repo.list_plans(true).unwrap().is_empty());
}

#[test]
fn invalid_todo_is_rejected_before_persisting() {
    let conn = setup();
    let repo = SqlitePlanRepository::try_new(&conn).unwrap();
    let blank = Todo::task("   ", 2, None, true);

    let err = repo
        .create_generated_plan(&NewPlan::new("Day", Cadence::Daily), &[blank], &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConstraint);
}

#[test]
fn soft_deleted_plan_disappears_from_active_reads() {
    let conn = setup();
    let repo = SqlitePlanRepository::try_new(&conn).unwrap();
    let write = Todo::task("Write", 1, None, true);
    let hierarchy = repo
        .create_generated_plan(
            &NewPlan::new("Day", Cadence::Daily),
            &[write.clone()],
            &[vec![write.id]],
        )
        .unwrap();
    let plan_id = hierarchy.plan.id;

    let service = PlanService::new(SqlitePlanRepository::try_new(&conn).unwrap());
    service.soft_delete_plan(plan_id).unwrap();

    assert!(service.list_plans().unwrap().is_empty());
    assert_eq!(service.get_plan(plan_id).unwrap_err().kind(), ErrorKind::NotFound);
    assert!(repo.get_plan(plan_id, true).unwrap().unwrap().is_deleted);
    assert_eq!(
        service.load_hierarchy(plan_id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(matches!(
        service.soft_delete_plan(plan_id),
        Err(RepoError::PlanNotFound(_))
    ));
}

#[test]
fn display_update_changes_only_title_and_description() {
    let conn = setup();
    let repo = SqlitePlanRepository::try_new(&conn).unwrap();
    let write = Todo::task("Write", 4, None, false);
    let hierarchy = repo
        .create_generated_plan(
            &NewPlan::new("Day", Cadence::Daily),
            &[write.clone()],
            &[vec![write.id]],
        )
        .unwrap();

    let service = PlanService::new(repo);
    service
        .update_todo_display(write.id, "  Draft chapter  ", "first pass")
        .unwrap();
    let todos = service.list_todos(hierarchy.plan.id).unwrap();
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].title, "Draft chapter");
    assert_eq!(todos[0].description, "first pass");
    assert_eq!(todos[0].required_time, 4);
    assert_eq!(todos[0].kind, write.kind);

    let err = service.update_todo_display(write.id, " ", "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConstraint);
    let err = service
        .update_todo_display(Uuid::new_v4(), "Other", "")
        .unwrap_err();
    assert!(matches!(err, RepoError::TodoNotFound(_)));
}

#[test]
fn list_plans_returns_every_active_plan() {
    let conn = setup();
    let repo = SqlitePlanRepository::try_new(&conn).unwrap();
    for title in ["One", "Two"] {
        let todo = Todo::routine("Stretch", 1);
        repo.create_generated_plan(
            &NewPlan::new(title, Cadence::Monthly),
            &[todo.clone()],
            &[vec![todo.id]],
        )
        .unwrap();
    }
    let titles = repo
        .list_plans(false)
        .unwrap()
        .into_iter()
        .map(|plan| plan.title)
        .collect::<Vec<_>>();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"One".to_string()));
    assert!(titles.contains(&"Two".to_string()));
}
