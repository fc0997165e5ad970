//! On-disk shape of a folder cache: the `path -> FileOnDisk` map and the
//! per-root, per-directory scan stats used to split work on the next run.
//! Both are stable JSON (spec.md §6: caches are human-diffable).
//!
//! Grounded on `original_source/summonmm/cache/folder_cache.py`'s
//! `_read_dict_of_files` / `_write_dict_of_files` and
//! `_read_all_scan_stats` / `_write_all_scan_stats`, and on
//! `summon-archive-index::persist` for the schema-version guard shape.

use std::{collections::BTreeMap, path::Path};

use serde::{Deserialize, Serialize};
use summon_paths::AbsoluteSystemPathBuf;
use thiserror::Error;

use crate::model::{FileOnDisk, ScanStats};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    StableJson(#[from] summon_stable_json::StableJsonError),
    #[error("folder cache file has schema version {found}, expected {expected}")]
    UnsupportedSchemaVersion { found: u32, expected: u32 },
}

#[derive(Debug, Serialize, Deserialize)]
struct FilesFile {
    schema_version: u32,
    files: BTreeMap<AbsoluteSystemPathBuf, FileOnDisk>,
}

pub fn load_files(
    path: &Path,
) -> Result<BTreeMap<AbsoluteSystemPathBuf, FileOnDisk>, PersistError> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let file: FilesFile = summon_stable_json::read_from_file(path)?;
    if file.schema_version != SCHEMA_VERSION {
        return Err(PersistError::UnsupportedSchemaVersion {
            found: file.schema_version,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(file.files)
}

pub fn save_files(
    path: &Path,
    files: &BTreeMap<AbsoluteSystemPathBuf, FileOnDisk>,
) -> Result<(), PersistError> {
    let doc = FilesFile {
        schema_version: SCHEMA_VERSION,
        files: files.clone(),
    };
    summon_stable_json::write_to_file(path, &doc)?;
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct ScanStatsFile {
    schema_version: u32,
    stats: ScanStats,
}

pub fn load_scan_stats(path: &Path) -> Result<ScanStats, PersistError> {
    if !path.exists() {
        return Ok(ScanStats::default());
    }
    let file: ScanStatsFile = summon_stable_json::read_from_file(path)?;
    if file.schema_version != SCHEMA_VERSION {
        return Err(PersistError::UnsupportedSchemaVersion {
            found: file.schema_version,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(file.stats)
}

pub fn save_scan_stats(path: &Path, stats: &ScanStats) -> Result<(), PersistError> {
    let doc = ScanStatsFile {
        schema_version: SCHEMA_VERSION,
        stats: stats.clone(),
    };
    summon_stable_json::write_to_file(path, &doc)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::{FileOnDisk, MTime};

    #[test]
    fn round_trips_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folder-cache-test.json");

        let mut files = BTreeMap::new();
        let absolute = AbsoluteSystemPathBuf::new_unchecked("/downloads/a.txt");
        files.insert(
            absolute.clone(),
            FileOnDisk {
                path: absolute,
                anchored: summon_paths::AnchoredSystemPathBuf::new_unchecked("a.txt".into()),
                primary_digest: "abc".to_string(),
                auxiliary_digests: vec![],
                size: 3,
                mtime: MTime(0),
            },
        );

        save_files(&path, &files).unwrap();
        let loaded = load_files(&path).unwrap();
        assert_eq!(loaded, files);
    }

    #[test]
    fn missing_file_yields_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        assert!(load_files(&path).unwrap().is_empty());
    }

    #[test]
    fn rejects_unsupported_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folder-cache-bad.json");
        std::fs::write(&path, r#"{"schema_version":99,"files":{}}"#).unwrap();
        assert!(matches!(
            load_files(&path),
            Err(PersistError::UnsupportedSchemaVersion { found: 99, expected: 1 })
        ));
    }
}
