use lazyplan_core::config::LimitsSection;
use lazyplan_core::db::open_db_in_memory;
use lazyplan_core::service::generation_service::{AllocatedBlock, AllocatedPeriod};
use lazyplan_core::{
    AllocationError, AllocationRequest, AllocationResponse, AllocationService, Cadence,
    ErrorKind, GeneratePlanRequest, GenerationError, PlanGenerationService, PlanRepository,
    SqlitePlanRepository, Todo,
};
use std::cell::RefCell;

/// Fills periods front to back: routines first, then remaining task time.
#[derive(Default)]
struct GreedyAllocator {
    seen: RefCell<Vec<AllocationRequest>>,
}

impl AllocationService for &GreedyAllocator {
    fn generate_plan(
        &self,
        request: &AllocationRequest,
    ) -> Result<AllocationResponse, AllocationError> {
        self.seen.borrow_mut().push(request.clone());
        let mut remaining = request
            .tasks
            .iter()
            .map(|task| (task.id, task.required_time))
            .collect::<Vec<_>>();
        let mut periods = Vec::new();
        let mut total_time = 0u64;
        for _ in 0..request.period_count {
            let mut blocks = Vec::new();
            for routine in &request.routines {
                for _ in 0..routine.required_time {
                    blocks.push(AllocatedBlock {
                        todo_id: routine.id,
                    });
                }
            }
            while blocks.len() < request.blocks_per_period as usize {
                let Some(slot) = remaining.iter_mut().find(|(_, left)| *left > 0) else {
                    break;
                };
                slot.1 -= 1;
                blocks.push(AllocatedBlock { todo_id: slot.0 });
            }
            total_time += blocks.len() as u64;
            periods.push(AllocatedPeriod { blocks });
        }
        Ok(AllocationResponse {
            periods,
            total_time,
        })
    }
}

struct FailingAllocator;

impl AllocationService for FailingAllocator {
    fn generate_plan(
        &self,
        _request: &AllocationRequest,
    ) -> Result<AllocationResponse, AllocationError> {
        Err(AllocationError::Unavailable("connection refused".to_string()))
    }
}

fn request(period_count: u32, blocks_per_period: u32) -> GeneratePlanRequest {
    GeneratePlanRequest {
        title: "Exam prep".to_string(),
        description: "three days".to_string(),
        cadence: Cadence::Daily,
        period_count,
        blocks_per_period,
        tasks: vec![
            Todo::task("Read", 6, None, true),
            Todo::task("Practice", 12, None, true),
        ],
        routines: vec![Todo::routine("Review", 2)],
    }
}

#[test]
fn generated_plan_is_persisted_in_allocator_order() {
    let conn = open_db_in_memory().unwrap();
    let allocator = GreedyAllocator::default();
    let service = PlanGenerationService::new(
        &allocator,
        SqlitePlanRepository::try_new(&conn).unwrap(),
        LimitsSection::default(),
    );

    let hierarchy = service.generate(request(3, 8)).unwrap();
    assert!(hierarchy.is_dense());
    assert_eq!(hierarchy.periods.len(), 3);
    assert!(hierarchy
        .periods
        .iter()
        .all(|entry| entry.blocks.len() == 8));
    assert_eq!(hierarchy.plan.block_unit, "hour");
    assert_eq!(hierarchy.plan.description, "three days");

    let todos = SqlitePlanRepository::try_new(&conn)
        .unwrap()
        .list_todos(hierarchy.plan.id)
        .unwrap();
    assert_eq!(todos.len(), 3);
}

#[test]
fn allocator_sees_units_and_layout() {
    let conn = open_db_in_memory().unwrap();
    let allocator = GreedyAllocator::default();
    let service = PlanGenerationService::new(
        &allocator,
        SqlitePlanRepository::try_new(&conn).unwrap(),
        LimitsSection::default(),
    );
    let mut weekly = request(5, 7);
    weekly.cadence = Cadence::Weekly;
    weekly.tasks = vec![Todo::task("Ship", 10, None, true)];
    let hierarchy = service.generate(weekly).unwrap();

    let seen = allocator.seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].block_unit, "day");
    assert_eq!(seen[0].period_unit, "week");
    assert_eq!(seen[0].period_count, 5);
    assert_eq!(seen[0].blocks_per_period, 7);
    assert_eq!(hierarchy.plan.cadence, Cadence::Weekly);
    assert_eq!(hierarchy.periods[0].blocks.len(), 7);
    assert_eq!(hierarchy.periods[4].blocks.len(), 2);
}

#[test]
fn infeasible_layouts_never_reach_the_allocator() {
    let conn = open_db_in_memory().unwrap();
    let allocator = GreedyAllocator::default();
    let service = PlanGenerationService::new(
        &allocator,
        SqlitePlanRepository::try_new(&conn).unwrap(),
        LimitsSection::default(),
    );

    // Eight blocks with two routine blocks need three periods.
    let err = service.generate(request(2, 8)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConstraint);

    // Above the daily ceiling.
    let err = service.generate(request(3, 25)).unwrap_err();
    assert!(matches!(err, GenerationError::Constraint(_)));

    // Routine leaves no task capacity.
    let err = service.generate(request(30, 2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConstraint);

    let mut misplaced = request(3, 8);
    misplaced.routines.push(Todo::task("Oops", 1, None, true));
    let err = service.generate(misplaced).unwrap_err();
    assert!(matches!(err, GenerationError::MisplacedTodo(_)));

    let mut zero = request(3, 8);
    zero.tasks.push(Todo::task("Empty", 0, None, true));
    assert_eq!(
        service.generate(zero).unwrap_err().kind(),
        ErrorKind::InvalidConstraint
    );
    assert!(allocator.seen.borrow().is_empty());
}

#[test]
fn unbreakable_task_raises_the_block_floor() {
    let conn = open_db_in_memory().unwrap();
    let allocator = GreedyAllocator::default();
    let service = PlanGenerationService::new(
        &allocator,
        SqlitePlanRepository::try_new(&conn).unwrap(),
        LimitsSection::default(),
    );
    let mut long_task = request(10, 4);
    long_task.tasks = vec![Todo::task("Workshop", 5, None, false)];
    long_task.routines = Vec::new();
    let err = service.generate(long_task).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConstraint);
}

#[test]
fn allocator_failure_persists_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = PlanGenerationService::new(
        FailingAllocator,
        SqlitePlanRepository::try_new(&conn).unwrap(),
        LimitsSection::default(),
    );
    let err = service.generate(request(3, 8)).unwrap_err();
    assert!(matches!(err, GenerationError::Allocation(_)));
    assert_eq!(err.kind(), ErrorKind::Internal);

    let plans = SqlitePlanRepository::try_new(&conn)
        .unwrap()
        .list_plans(true)
        .unwrap();
    assert!(plans.is_empty());
}
