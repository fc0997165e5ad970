//! The folder cache's persisted shape: spec.md §3's `FileOnDisk` /
//! `FolderToCache`, plus the per-directory scan-stats tree spec.md §4.2
//! uses to split work on the next run.
//!
//! Grounded on `original_source/summonmm/common.py`'s `FileOnDisk` /
//! `FolderToCache` / `FolderListToCache` classes and
//! `cache/folder_cache.py`'s scan-stats dictionary shape.

use std::{
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use summon_paths::{AbsoluteSystemPathBuf, AnchoredSystemPathBuf};

/// mtime expressed as integer nanoseconds since the epoch so it survives a
/// JSON round-trip exactly (spec.md §3 invariant: "digest is SHA-256 of
/// content at mtime" — the comparison must be bit-exact, not float-ish).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MTime(pub i128);

impl MTime {
    pub fn from_system_time(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Self(d.as_nanos() as i128),
            Err(e) => Self(-(e.duration().as_nanos() as i128)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOnDisk {
    /// Full absolute path — the original's `FileOnDisk.file_path`. A named
    /// cache can span several root directories, so an anchored-to-one-root
    /// path would collide across them; the absolute path is the only safe
    /// map key (spec.md §3).
    pub path: AbsoluteSystemPathBuf,
    /// Path relative to whichever root produced this entry, already
    /// lower-cased/normalized (spec.md §3: "path is canonical"). Used by
    /// consumers (the github retriever, manifest emission) that need a
    /// stable key inside one root rather than the absolute disk path.
    pub anchored: AnchoredSystemPathBuf,
    pub primary_digest: String,
    pub auxiliary_digests: Vec<(String, String)>,
    pub size: u64,
    pub mtime: MTime,
}

/// A named root directory plus the subtrees excluded from it (spec.md §3).
#[derive(Debug, Clone)]
pub struct FolderToCache {
    pub root: summon_paths::AbsoluteSystemPathBuf,
    pub excluded: Vec<summon_paths::AbsoluteSystemPathBuf>,
}

impl FolderToCache {
    pub fn new(root: summon_paths::AbsoluteSystemPathBuf) -> Self {
        Self {
            root,
            excluded: Vec::new(),
        }
    }

    pub fn excluding(mut self, dirs: Vec<summon_paths::AbsoluteSystemPathBuf>) -> Self {
        self.excluded = dirs;
        self
    }

    fn as_str_lossy(p: &summon_paths::AbsoluteSystemPathBuf) -> String {
        p.as_path().to_string_lossy().to_lowercase()
    }

    pub fn is_excluded(&self, path: &summon_paths::AbsoluteSystemPathBuf) -> bool {
        let path_str = Self::as_str_lossy(path);
        self.excluded
            .iter()
            .any(|ex| path_str.starts_with(&Self::as_str_lossy(ex)))
    }
}

/// A set of `FolderToCache` entries. spec.md §4.2 invariant: "two folder
/// sets are considered overlapping unless every containment is properly
/// excluded"; overlapping sets are rejected at construction.
pub struct FolderSet(Vec<FolderToCache>);

#[derive(Debug, thiserror::Error)]
pub enum FolderSetError {
    #[error("folder roots {0} and {1} overlap without exclusion")]
    Overlap(String, String),
}

impl FolderSet {
    pub fn new(folders: Vec<FolderToCache>) -> Result<Self, FolderSetError> {
        for i in 0..folders.len() {
            for j in (i + 1)..folders.len() {
                let a = &folders[i];
                let b = &folders[j];
                let a_str = FolderToCache::as_str_lossy(&a.root);
                let b_str = FolderToCache::as_str_lossy(&b.root);
                let a_under_b = a_str.starts_with(&b_str);
                let b_under_a = b_str.starts_with(&a_str);
                if a_under_b && !b.is_excluded(&a.root) {
                    return Err(FolderSetError::Overlap(a_str, b_str));
                }
                if b_under_a && !a.is_excluded(&b.root) {
                    return Err(FolderSetError::Overlap(a_str, b_str));
                }
            }
        }
        Ok(Self(folders))
    }

    pub fn folders(&self) -> &[FolderToCache] {
        &self.0
    }
}

/// Per-root, per-directory file counts from the previous run, used to
/// produce an approximately balanced work split on the next one (spec.md
/// §4.2: "target <= ~6k files per sub-task").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanStats(pub BTreeMap<String, BTreeMap<String, u64>>);

impl ScanStats {
    pub fn record(&mut self, root: &str, dir: &str, count: u64) {
        self.0.entry(root.to_string()).or_default().insert(dir.to_string(), count);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use summon_paths::AbsoluteSystemPathBuf;

    #[test]
    fn rejects_overlapping_roots_without_exclusion() {
        let a = FolderToCache::new(AbsoluteSystemPathBuf::new_unchecked("/mods"));
        let b = FolderToCache::new(AbsoluteSystemPathBuf::new_unchecked("/mods/sub"));
        assert!(FolderSet::new(vec![a, b]).is_err());
    }

    #[test]
    fn allows_overlap_when_properly_excluded() {
        let a = FolderToCache::new(AbsoluteSystemPathBuf::new_unchecked("/mods"))
            .excluding(vec![AbsoluteSystemPathBuf::new_unchecked("/mods/sub")]);
        let b = FolderToCache::new(AbsoluteSystemPathBuf::new_unchecked("/mods/sub"));
        assert!(FolderSet::new(vec![a, b]).is_ok());
    }
}
