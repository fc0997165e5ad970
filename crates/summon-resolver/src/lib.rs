//! The available-files resolver (spec.md §4.4): joins the downloads folder
//! cache, the companion-repo ("github") folder cache, and the archive index
//! to answer "what are the ways to produce this digest".
//!
//! Grounded on `original_source/summonmm/cache/available_files.py`'s
//! `AvailableFiles` class.

pub mod model;
pub mod tasks;

pub use model::{ArchiveHop, ArchiveRetrieval, FileRetriever};
pub use tasks::{register, AvailableFilesResolver, GithubFolder};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolverError {
    #[error(transparent)]
    ArchiveIndex(#[from] summon_archive_index::ArchiveIndexError),
    #[error(transparent)]
    Path(#[from] summon_paths::PathValidationError),
    #[error(transparent)]
    Scheduler(#[from] summon_scheduler::SchedulerError),
}
