//! Exercises the dependency-driven run loop end to end (spec.md §8
//! properties 7-8: a task runs once, only after its dependencies complete,
//! and an acyclic graph always terminates). Regression coverage for the
//! "every still-incomplete task marked dispatched after the first batch"
//! bug, which silently dropped any worker task whose dependency hadn't
//! completed yet at the first dispatch round.

use std::sync::{Arc, Mutex};

use summon_scheduler::{
    Building, OwnerBody, Scheduler, TaskBody, TaskContext, TaskOutput, TaskResult, TaskSpec,
    TaskTags, WorkerBody,
};

fn recording_worker(log: Arc<Mutex<Vec<String>>>, name: &str) -> WorkerBody {
    let name = name.to_string();
    Box::new(move |_ctx: &TaskContext| -> TaskResult {
        log.lock().expect("log mutex poisoned").push(name.clone());
        Ok(Arc::new(()) as TaskOutput)
    })
}

fn worker_task(name: &str, deps: &[&str], log: &Arc<Mutex<Vec<String>>>) -> TaskSpec {
    TaskSpec {
        name: name.to_string(),
        deps: deps.iter().map(|d| d.to_string()).collect(),
        tags: TaskTags::none(),
        weight_hint: None,
        body: TaskBody::Worker(recording_worker(log.clone(), name)),
    }
}

#[test]
fn two_level_worker_dag_runs_every_task() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::<Building>::new();
    scheduler.add_task(worker_task("a", &[], &log)).unwrap();
    scheduler.add_task(worker_task("b", &["a"], &log)).unwrap();

    let report = scheduler
        .seal()
        .unwrap()
        .run(tempfile::tempdir().unwrap().path(), &[])
        .unwrap();

    assert_eq!(report.completed_tasks, 2);
    assert_eq!(*log.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
}

/// `a` is the only task ready in the first dispatch round; `b` and `c`
/// depend on it and only become ready once it completes, after the loop
/// has already gone around once. This is exactly the shape the liveness
/// bug broke: `b`/`c` would have been marked dispatched during round 1
/// (while only `a` was actually sent to the pool) and then filtered out of
/// every later ready-set forever, hanging the run on `d`.
#[test]
fn diamond_dependency_graph_completes_every_task_exactly_once() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::<Building>::new();
    scheduler.add_task(worker_task("a", &[], &log)).unwrap();
    scheduler.add_task(worker_task("b", &["a"], &log)).unwrap();
    scheduler.add_task(worker_task("c", &["a"], &log)).unwrap();
    scheduler.add_task(worker_task("d", &["b", "c"], &log)).unwrap();

    let report = scheduler
        .seal()
        .unwrap()
        .run(tempfile::tempdir().unwrap().path(), &[])
        .unwrap();

    assert_eq!(report.completed_tasks, 4);
    let order = log.lock().unwrap().clone();
    assert_eq!(order.len(), 4, "every task must run exactly once: {order:?}");
    assert_eq!(order[0], "a");
    assert_eq!(order[3], "d");
    assert!(order.contains(&"b".to_string()));
    assert!(order.contains(&"c".to_string()));
}

/// Owner tasks run inline on the scheduling thread before any worker batch
/// is dispatched; a worker task depending on one must still see it as
/// completed and become eligible in the very next round.
#[test]
fn owner_task_hands_off_to_a_dependent_worker_task() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::<Building>::new();

    let owner_body: OwnerBody = Box::new(|_ctx, _handle| Ok(Arc::new(()) as TaskOutput));
    scheduler
        .add_task(TaskSpec {
            name: "ready".to_string(),
            deps: Vec::new(),
            tags: TaskTags::none(),
            weight_hint: None,
            body: TaskBody::Owner(owner_body),
        })
        .unwrap();
    scheduler.add_task(worker_task("save", &["ready"], &log)).unwrap();

    let report = scheduler
        .seal()
        .unwrap()
        .run(tempfile::tempdir().unwrap().path(), &[])
        .unwrap();

    assert_eq!(report.completed_tasks, 2);
    assert_eq!(*log.lock().unwrap(), vec!["save".to_string()]);
}

/// An owner task that adds a new worker task via `GraphHandle::add_task`
/// mid-run (spec.md §4.1/§9: "own tasks adding tasks at runtime") must see
/// that task through to completion too.
#[test]
fn owner_task_can_register_a_worker_task_dynamically() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut scheduler = Scheduler::<Building>::new();

    let dynamic_log = log.clone();
    let owner_body: OwnerBody = Box::new(move |_ctx, handle| {
        handle
            .add_task(worker_task("spawned", &[], &dynamic_log))
            .map_err(|e| summon_scheduler::TaskFailure(e.to_string()))?;
        Ok(Arc::new(()) as TaskOutput)
    });
    scheduler
        .add_task(TaskSpec {
            name: "spawner".to_string(),
            deps: Vec::new(),
            tags: TaskTags::none(),
            weight_hint: None,
            body: TaskBody::Owner(owner_body),
        })
        .unwrap();

    let report = scheduler
        .seal()
        .unwrap()
        .run(tempfile::tempdir().unwrap().path(), &[])
        .unwrap();

    assert_eq!(report.completed_tasks, 2);
    assert_eq!(*log.lock().unwrap(), vec!["spawned".to_string()]);
}
