//! The content-addressed archive catalog spec.md §2.4 calls "root git
//! data": for every known archive, the files it contains (recursively
//! through nested archives), persisted as sorted, human-diffable JSON.

pub mod digest;
pub mod hasher;
pub mod model;
pub mod persist;
pub mod tasks;

pub use digest::{ArchiveDigest, TruncatedDigest};
pub use hasher::{hash_archive, new_scratch_token, ExtraDataFactory, PluginFailure};
pub use model::{Archive, ArchiveIndex, FileInArchive, TentativeNames};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveIndexError {
    #[error(transparent)]
    Archive(#[from] summon_archive::ArchiveError),
    #[error(transparent)]
    Path(#[from] summon_paths::PathValidationError),
    #[error("hashing failed: {0}")]
    Hash(String),
    #[error("scratch directory error: {0}")]
    Scratch(String),
    #[error(transparent)]
    StableJson(#[from] summon_stable_json::StableJsonError),
    #[error("known-archives.json has schema version {found}, expected {expected}")]
    UnsupportedSchemaVersion { found: u32, expected: u32 },
}
