//! Persistence for the archive index: `known-archives.json` and
//! `known-tentative-archive-names.json`, both canonical stable JSON so they
//! diff cleanly in the companion repo (spec.md §6).
//!
//! Grounded on `original_source/summonmm/gitdata/root_git_archives.py`
//! (`KnownArchives`, the sorted-dump wrapper type) and
//! `cache/root_git_data.py`'s `_read_git_archives`/`_write_git_archives`
//! pair.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    model::{Archive, ArchiveIndex, TentativeNames},
    ArchiveIndexError,
};

/// Bumped whenever the persisted shape changes incompatibly. Loading a file
/// with an unrecognized version is a configuration error, never a silent
/// partial load (SPEC_FULL.md §4.3 supplement).
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct KnownArchivesFile {
    schema_version: u32,
    archives: Vec<Archive>,
}

pub fn load_known_archives(path: &Path) -> Result<ArchiveIndex, ArchiveIndexError> {
    if !path.exists() {
        return Ok(ArchiveIndex::new());
    }
    let file: KnownArchivesFile = summon_stable_json::read_from_file(path)?;
    if file.schema_version != SCHEMA_VERSION {
        return Err(ArchiveIndexError::UnsupportedSchemaVersion {
            found: file.schema_version,
            expected: SCHEMA_VERSION,
        });
    }
    let mut index = ArchiveIndex::new();
    for archive in file.archives {
        index.insert(archive);
    }
    Ok(index)
}

pub fn save_known_archives(path: &Path, index: &ArchiveIndex) -> Result<(), ArchiveIndexError> {
    let mut archives: Vec<Archive> = index.iter().cloned().collect();
    summon_stable_json::sort_by_schema_key(&mut archives, |a| a.archive_hash);
    let file = KnownArchivesFile {
        schema_version: SCHEMA_VERSION,
        archives,
    };
    summon_stable_json::write_to_file(path, &file)?;
    Ok(())
}

pub fn load_tentative_names(path: &Path) -> Result<TentativeNames, ArchiveIndexError> {
    if !path.exists() {
        return Ok(TentativeNames::new());
    }
    Ok(summon_stable_json::read_from_file(path)?)
}

pub fn save_tentative_names(
    path: &Path,
    names: &TentativeNames,
) -> Result<(), ArchiveIndexError> {
    summon_stable_json::write_to_file(path, names)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::digest::{ArchiveDigest, TruncatedDigest};
    use crate::model::FileInArchive;
    use summon_paths::IntraArchivePath;

    #[test]
    fn known_archives_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known-archives.json");

        let mut index = ArchiveIndex::new();
        let mut archive = Archive::new(ArchiveDigest([3u8; 32]), 42, "Nexus:1234".to_string());
        archive.files.push(FileInArchive {
            intra_path: IntraArchivePath::new("data\\readme.txt").unwrap(),
            file_hash: TruncatedDigest([1u8; 9]),
            file_size: 3,
        });
        index.insert(archive);

        save_known_archives(&path, &index).unwrap();
        let loaded = load_known_archives(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get(&ArchiveDigest([3u8; 32])).unwrap().attribution,
            "Nexus:1234"
        );
    }

    #[test]
    fn rejects_unrecognized_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known-archives.json");
        std::fs::write(&path, r#"{"schema_version":999,"archives":[]}"#).unwrap();
        assert!(matches!(
            load_known_archives(&path),
            Err(ArchiveIndexError::UnsupportedSchemaVersion { .. })
        ));
    }

    #[test]
    fn missing_file_yields_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.json");
        assert!(load_known_archives(&path).unwrap().is_empty());
    }
}
