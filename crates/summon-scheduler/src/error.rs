use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("task '{0}' is already defined")]
    DuplicateTask(String),
    #[error("task '{task}' requires tag '{tag}' which is not guaranteed by its dependencies")]
    MissingRequiredTag { task: String, tag: String },
    #[error("task '{task}' requires the absence of tag '{tag}' which is guaranteed by its dependencies")]
    ForbiddenTagPresent { task: String, tag: String },
    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },
    #[error("dependency graph has a cycle through: {nodes:?}")]
    Cycle { nodes: Vec<String> },
    #[error("placeholder task '{0}' was never replaced")]
    UnresolvedPlaceholder(String),
    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: crate::TaskFailure,
    },
    #[error("owner task '{0}' panicked")]
    OwnerPanicked(String),
    #[error("failed to load or persist scheduler weights: {0}")]
    Weights(#[from] summon_stable_json::StableJsonError),
}
