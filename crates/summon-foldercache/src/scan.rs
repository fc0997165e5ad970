//! The scan algorithm: walk a [`FolderToCache`], decide which files changed
//! since the last recorded [`FileOnDisk`], and rehash only those.
//!
//! Grounded on `original_source/summonmm/cache/folder_cache.py`'s
//! `_FastSearchOverFolderListToCache` (stat-based change detection, pruning
//! excluded subtrees, per-directory file counts feeding the next run's work
//! split) and on `turborepo-cache::cache_archive`'s use of `walkdir` plus
//! `rayon` to parallelize the expensive per-file work across a tree walked
//! single-threaded.
//!
//! Files are keyed by full absolute path, not by a path anchored to a
//! single root: `original_source/summonmm/common.py::FileOnDisk.file_path`
//! is the absolute path, because one named cache (e.g. "downloads") spans
//! several independent root directories and an anchored path would collide
//! across them.

use std::{collections::BTreeMap, time::SystemTime};

use rayon::prelude::*;
use summon_paths::AbsoluteSystemPathBuf;
use walkdir::WalkDir;

use crate::model::{FileOnDisk, FolderToCache, MTime, ScanStats};

/// Above this many files in a single directory, the scan splits that
/// directory's work across the rayon pool rather than hashing serially
/// (spec.md §4.2: "target <= ~6k files per sub-task").
pub const SPLIT_THRESHOLD: usize = 6_000;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("failed walking {path}: {source}")]
    Walk {
        path: String,
        #[source]
        source: walkdir::Error,
    },
    #[error("symlink rejected: {0}")]
    Symlink(String),
    #[error(transparent)]
    Hash(#[from] summon_hash::HashError),
    #[error(transparent)]
    Path(#[from] summon_paths::PathValidationError),
}

struct Candidate {
    absolute: AbsoluteSystemPathBuf,
    size: u64,
    mtime: MTime,
}

/// Scans `folder`, comparing every regular file's (size, mtime) against
/// `previous` to decide whether it needs rehashing. Symlinks are rejected
/// outright (spec.md §3: "a cached file is a regular file; symlinks are
/// never cached" — a symlink could silently point a content hash at
/// attacker-controlled data outside the cached root).
///
/// Returns the fresh `path -> FileOnDisk` map (keyed by absolute path) plus
/// updated per-directory scan stats for the next run's work split.
pub fn scan_folder(
    folder: &FolderToCache,
    previous: &BTreeMap<AbsoluteSystemPathBuf, FileOnDisk>,
    auxiliary_algorithms: &[String],
) -> Result<(BTreeMap<AbsoluteSystemPathBuf, FileOnDisk>, ScanStats), ScanError> {
    let root_str = folder.root.as_path().to_string_lossy().to_lowercase();
    let mut by_dir: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();

    for entry in WalkDir::new(folder.root.as_path())
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.path() == folder.root.as_path() {
                return true;
            }
            let abs = AbsoluteSystemPathBuf::new_unchecked(e.path().to_path_buf());
            !folder.is_excluded(&abs)
        })
    {
        let entry = entry.map_err(|source| ScanError::Walk {
            path: folder.root.to_string(),
            source,
        })?;

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            return Err(ScanError::Symlink(entry.path().display().to_string()));
        }
        if !file_type.is_file() {
            continue;
        }

        let meta = entry.metadata().map_err(|source| ScanError::Walk {
            path: entry.path().display().to_string(),
            source,
        })?;
        let absolute = AbsoluteSystemPathBuf::new_unchecked(entry.path().to_path_buf());
        let dir_key = entry
            .path()
            .parent()
            .map(|p| p.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        by_dir.entry(dir_key).or_default().push(Candidate {
            absolute,
            size: meta.len(),
            mtime: MTime::from_system_time(meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)),
        });
    }

    let mut stats = ScanStats::default();
    for (dir, candidates) in &by_dir {
        stats.record(&root_str, dir, candidates.len() as u64);
    }

    let flattened: Vec<&Candidate> = by_dir.values().flatten().collect();

    // Splitting is a hint for how parallel work ought to be: either way
    // every candidate goes through the same unchanged-vs-rehash decision.
    let process = |c: &Candidate| -> Result<(AbsoluteSystemPathBuf, FileOnDisk), ScanError> {
        if let Some(prev) = previous.get(&c.absolute) {
            if prev.size == c.size && prev.mtime == c.mtime {
                return Ok((c.absolute.clone(), prev.clone()));
            }
        }
        let anchored = c.absolute.anchor_at(&folder.root)?;
        let (digests, size) = summon_hash::hash_file(c.absolute.as_path(), auxiliary_algorithms)?;
        Ok((
            c.absolute.clone(),
            FileOnDisk {
                path: c.absolute.clone(),
                anchored,
                primary_digest: digests.primary,
                auxiliary_digests: digests.auxiliary,
                size,
                mtime: c.mtime,
            },
        ))
    };

    let results: Result<Vec<_>, ScanError> = if flattened.len() > SPLIT_THRESHOLD {
        flattened.par_iter().map(|c| process(c)).collect()
    } else {
        flattened.iter().map(|c| process(c)).collect()
    };

    let mut fresh = BTreeMap::new();
    for (path, file) in results? {
        fresh.insert(path, file);
    }

    Ok((fresh, stats))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn hashes_new_files_and_reuses_unchanged_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        let root = AbsoluteSystemPathBuf::new(dir.path().to_path_buf()).unwrap();
        let folder = FolderToCache::new(root);

        let (first, _stats) = scan_folder(&folder, &BTreeMap::new(), &[]).unwrap();
        assert_eq!(first.len(), 1);
        let recorded = first.values().next().unwrap().clone();

        let (second, _stats) = scan_folder(&folder, &first, &[]).unwrap();
        assert_eq!(
            second.values().next().unwrap().primary_digest,
            recorded.primary_digest
        );
    }

    #[test]
    fn rejects_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("real.txt");
        fs::write(&target, b"hi").unwrap();
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(&target, dir.path().join("link.txt")).unwrap();
            let root = AbsoluteSystemPathBuf::new(dir.path().to_path_buf()).unwrap();
            let folder = FolderToCache::new(root);
            assert!(scan_folder(&folder, &BTreeMap::new(), &[]).is_err());
        }
    }

    #[test]
    fn detects_a_changed_file_by_mtime_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"hello").unwrap();
        let root = AbsoluteSystemPathBuf::new(dir.path().to_path_buf()).unwrap();
        let folder = FolderToCache::new(root);

        let (first, _) = scan_folder(&folder, &BTreeMap::new(), &[]).unwrap();
        let original_digest = first.values().next().unwrap().primary_digest.clone();

        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(&path, b"hello world, this is longer now").unwrap();
        let (second, _) = scan_folder(&folder, &first, &[]).unwrap();
        assert_ne!(
            second.values().next().unwrap().primary_digest,
            original_digest
        );
    }
}
