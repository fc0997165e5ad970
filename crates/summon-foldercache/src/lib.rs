//! The incremental folder cache (spec.md §4.2): scans one or more
//! directory trees, hashes anything new or changed since the last run, and
//! reconciles away anything no longer present — all as scheduler tasks
//! rather than a blocking call, so a downloads folder and a companion-repo
//! checkout can be scanned in parallel with archive indexing.

pub mod model;
pub mod persist;
pub mod scan;
pub mod tasks;

pub use model::{FileOnDisk, FolderSet, FolderToCache, MTime, ScanStats};
pub use persist::PersistError;
pub use scan::ScanError;
pub use tasks::{register, FolderCache};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    FolderSet(#[from] model::FolderSetError),
}
