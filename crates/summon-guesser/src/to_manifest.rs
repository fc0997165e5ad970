//! Flattens [`ModsInProgress`] into the `summon-manifest` tree spec.md §6
//! describes as the output manifest. Pure data reshaping: every field here
//! already exists on `ModInProgress`, just renamed/regrouped into the
//! persisted schema's shape.

use summon_manifest::{
    InstallerEntry, ModEntry, PatchRecord, ProjectJson, RemainingArchive, RemainingArchiveFile,
    RemainingArchiveLink,
};
use summon_resolver::ArchiveRetrieval;

use crate::model::{ModInProgress, ModsInProgress};

fn chain(retrieval: &ArchiveRetrieval) -> Vec<RemainingArchiveLink> {
    retrieval
        .hops
        .iter()
        .map(|hop| RemainingArchiveLink {
            archive_digest: hop.archive_hash,
            intra_path: hop.file_in_archive.intra_path.clone(),
            file_digest: hop.file_in_archive.file_hash,
            file_size: hop.file_in_archive.file_size,
        })
        .collect()
}

fn remaining_archives(mod_in_progress: &ModInProgress) -> Vec<RemainingArchive> {
    let mut by_archive: std::collections::BTreeMap<_, Vec<RemainingArchiveFile>> =
        std::collections::BTreeMap::new();
    for (path, retrievals) in &mod_in_progress.remaining_after_install_from {
        for retrieval in retrievals {
            let root = retrieval.hops.first().map(|h| h.archive_hash).unwrap_or(retrieval.target_hash);
            by_archive.entry(root).or_default().push(RemainingArchiveFile {
                target_path: path.clone(),
                chain: chain(retrieval),
            });
        }
    }
    by_archive
        .into_iter()
        .map(|(archive_digest, files)| RemainingArchive { archive_digest, files })
        .collect()
}

fn mod_entry(mod_in_progress: &ModInProgress) -> ModEntry {
    let mut entry = ModEntry::new(mod_in_progress.name.clone());
    entry.zero_files = mod_in_progress.zero_files.iter().cloned().collect();
    entry.github_files = mod_in_progress
        .github_files
        .iter()
        .map(|(path, r#ref)| (path.clone(), r#ref.clone()))
        .collect();
    entry.installers = mod_in_progress
        .install_from
        .iter()
        .map(|install| InstallerEntry {
            archive_digest: install.archive_digest,
            installer_type: install.plugin_name.clone(),
            installer_params: install.params.clone(),
            skip: install.details.skip.iter().cloned().collect(),
        })
        .collect();
    entry.remaining_archives = remaining_archives(mod_in_progress);
    entry.unknown_files = mod_in_progress.unknown_files.iter().cloned().collect();
    entry.unknown_files_by_tools = mod_in_progress
        .unknown_files_could_be_produced_by_tools
        .iter()
        .map(|(path, (tool_name, _))| (path.clone(), tool_name.clone()))
        .collect();
    entry.mod_tool_records = mod_in_progress
        .mod_tools
        .iter()
        .map(|(tool_name, details)| summon_manifest::ModToolRecord {
            tool_name: tool_name.clone(),
            details: details.clone(),
        })
        .collect();
    entry.patch_records = mod_in_progress
        .patched
        .iter()
        .map(|(path, (plugin_name, payload))| PatchRecord {
            target_path: path.clone(),
            patch_plugin_name: plugin_name.clone(),
            payload: payload.clone(),
        })
        .collect();
    entry
}

/// Converts the guesser's working state into the tree `summon-manifest`
/// persists. Callers still need [`ProjectJson::sort_for_persistence`]
/// before writing; this only builds the unsorted tree.
pub fn to_project_json(mods: &ModsInProgress) -> ProjectJson {
    ProjectJson { mods: mods.mods.values().map(mod_entry).collect() }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn carries_zero_files_through() {
        let mut mods = ModsInProgress::new();
        let m = mods.entry("Mod");
        m.zero_files.insert(summon_paths::AnchoredSystemPathBuf::from_str("a.txt").unwrap());
        let project = to_project_json(&mods);
        assert_eq!(project.mods.len(), 1);
        assert_eq!(project.mods[0].zero_files.len(), 1);
    }

    #[test]
    fn empty_mods_in_progress_produce_empty_manifest() {
        let mods = ModsInProgress::new();
        let project = to_project_json(&mods);
        assert!(project.mods.is_empty());
    }
}
