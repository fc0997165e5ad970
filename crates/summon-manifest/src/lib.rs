//! The output manifest (spec.md §6): a stable-JSON dump of the resolution
//! result, one entry per mod, naming for every file how it can be
//! reproduced.
//!
//! Grounded on `turborepo-lib/src/turbo_json`'s typed-tree-plus-custom-
//! serialization shape, persisted through `summon-stable-json` instead of
//! `turbo_json`'s own formatter.

pub mod model;

pub use model::{
    GithubFileRef, InstallerEntry, ModEntry, ModToolRecord, PatchRecord, ProjectJson,
    RemainingArchive, RemainingArchiveFile, RemainingArchiveLink,
};

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error(transparent)]
    StableJson(#[from] summon_stable_json::StableJsonError),
}

/// Writes `project.json` at `path` in canonical stable-JSON form (spec.md
/// §8 property 4: byte-identical output for identical inputs).
pub fn write(path: &Path, manifest: &ProjectJson) -> Result<(), ManifestError> {
    let mut manifest = manifest.clone();
    manifest.sort_for_persistence();
    summon_stable_json::write_to_file(path, &manifest)?;
    Ok(())
}

pub fn read(path: &Path) -> Result<ProjectJson, ManifestError> {
    Ok(summon_stable_json::read_from_file(path)?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn round_trips_an_empty_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        let manifest = ProjectJson::default();
        write(&path, &manifest).unwrap();
        let back = read(&path).unwrap();
        assert_eq!(back, manifest);
    }

    #[test]
    fn writing_is_idempotent_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        let mut manifest = ProjectJson::default();
        manifest.mods.push(ModEntry::new("ModB"));
        manifest.mods.push(ModEntry::new("ModA"));

        write(&path, &manifest).unwrap();
        let first = std::fs::read(&path).unwrap();
        write(&path, &manifest).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);

        let loaded: ProjectJson = read(&path).unwrap();
        assert_eq!(loaded.mods[0].name, "ModA");
        assert_eq!(loaded.mods[1].name, "ModB");
    }
}
