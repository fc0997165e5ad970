use std::{any::Any, collections::HashMap, sync::Arc};

/// Whatever a task hands to its dependants. Mirrors the spec's "shared
/// memory publication" — the value is produced once and handed out by
/// reference-counted pointer instead of being re-serialized per dependant.
pub type TaskOutput = Arc<dyn Any + Send + Sync>;

/// What a worker/owner body returns. A `TaskFailure` is the Rust analogue
/// of the captured-exception envelope a crashed worker process would have
/// sent back to main: a message, not a panic, so the scheduler can route it
/// to an orderly shutdown instead of unwinding past task boundaries.
pub type TaskResult = Result<TaskOutput, TaskFailure>;

#[derive(Debug, Clone)]
pub struct TaskFailure(pub String);

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for TaskFailure {}

/// Read-only view of a task's already-completed dependencies, handed to its
/// body at execution time.
pub struct TaskContext<'a> {
    pub(crate) outputs: &'a HashMap<String, TaskOutput>,
    pub(crate) deps: &'a [String],
}

impl<'a> TaskContext<'a> {
    pub fn dep(&self, name: &str) -> Option<&TaskOutput> {
        self.outputs.get(name)
    }

    pub fn deps(&self) -> impl Iterator<Item = (&str, &TaskOutput)> {
        self.deps
            .iter()
            .filter_map(|name| self.outputs.get(name).map(|out| (name.as_str(), out)))
    }
}

pub type WorkerBody = Box<dyn FnOnce(&TaskContext) -> TaskResult + Send>;

/// An owner task additionally receives a handle back into the graph so it
/// can enqueue follow-up tasks or resolve placeholders — the one thing a
/// worker task (running off on the rayon pool) is never allowed to do.
pub type OwnerBody = Box<dyn FnOnce(&TaskContext, &mut crate::GraphHandle) -> TaskResult>;

pub enum TaskBody {
    Worker(WorkerBody),
    Owner(OwnerBody),
    /// Reserved node with no body yet; must be replaced via
    /// `GraphHandle::replace_placeholder` before the graph can finish.
    Placeholder,
}

impl TaskBody {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskBody::Worker(_) => TaskKind::Worker,
            TaskBody::Owner(_) => TaskKind::Owner,
            TaskBody::Placeholder => TaskKind::Placeholder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Worker,
    Owner,
    Placeholder,
}

/// The three tag sets a task may declare (spec.md §4.1's data dependencies):
/// `required` must already be guaranteed by the task's ancestors,
/// `required_not` must *not* be, and `provided` becomes guaranteed for this
/// task's own descendants once it completes.
#[derive(Debug, Clone, Default)]
pub struct TaskTags {
    pub required: Vec<String>,
    pub required_not: Vec<String>,
    pub provided: Vec<String>,
}

impl TaskTags {
    pub fn none() -> Self {
        Self::default()
    }
}

pub struct TaskSpec {
    pub name: String,
    pub deps: Vec<String>,
    pub tags: TaskTags,
    pub weight_hint: Option<f64>,
    pub body: TaskBody,
}
