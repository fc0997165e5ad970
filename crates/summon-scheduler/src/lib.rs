//! `Parallel`: the data-flow task DAG executor that drives the whole
//! pipeline (spec.md §4.1). Every other crate expresses its work as worker
//! or owner tasks and lets this scheduler decide readiness and ordering;
//! there is no ad-hoc threading anywhere else in the workspace.

mod cycle;
mod engine;
mod error;
mod graph;
mod task;
mod weights;

pub use engine::{GraphHandle, ObservedTaskKind, PrefixStats, RunReport};
pub use error::SchedulerError;
pub use graph::{Built, Building, Scheduler};
pub use task::{
    OwnerBody, TaskBody, TaskContext, TaskFailure, TaskKind, TaskOutput, TaskResult, TaskSpec,
    TaskTags, WorkerBody,
};
pub use weights::{Weight, WeightTable};

/// Lets a task-registering helper (e.g.
/// `summon_archive_index::tasks::register_hashing_tasks`) add tasks either
/// while a graph is still being built (`Scheduler<Building>`) or dynamically
/// from inside a running owner task (`GraphHandle`) — spec.md §4.4's
/// resolver fires archive-indexing tasks as a side effect of its own
/// readiness task, which only ever sees a `GraphHandle`.
pub trait TaskRegistrar {
    fn add_task(&mut self, spec: TaskSpec) -> Result<(), SchedulerError>;
}
