//! `ProjectJson` (spec.md §6, "Output manifest"): list of mods, each with
//! name, zero-file list, github-file map, ordered installer list, remaining
//! archives, unknown files, tool-attributable files, mod-tool records,
//! patch records.

use serde::{Deserialize, Serialize};
use summon_archive_index::{ArchiveDigest, TruncatedDigest};
use summon_paths::{AnchoredSystemPathBuf, IntraArchivePath};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectJson {
    pub mods: Vec<ModEntry>,
}

impl ProjectJson {
    /// Orders every persisted list by its declared schema key (spec.md §6,
    /// "canonical JSON rules: ... sorted per schema"). Called once, right
    /// before writing, rather than kept as an invariant on every mutation —
    /// the guesser appends to these lists in discovery order while it runs.
    pub fn sort_for_persistence(&mut self) {
        summon_stable_json::sort_by_schema_key(&mut self.mods, |m| m.name.clone());
        for m in &mut self.mods {
            m.sort_for_persistence();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModEntry {
    pub name: String,
    pub zero_files: Vec<AnchoredSystemPathBuf>,
    pub github_files: Vec<(AnchoredSystemPathBuf, GithubFileRef)>,
    pub installers: Vec<InstallerEntry>,
    pub remaining_archives: Vec<RemainingArchive>,
    pub unknown_files: Vec<AnchoredSystemPathBuf>,
    /// `unknown_files_by_tools` (spec.md §4.5 stage 6): target path -> name
    /// of the global-tool plugin whose verdict claimed it.
    pub unknown_files_by_tools: Vec<(AnchoredSystemPathBuf, String)>,
    pub mod_tool_records: Vec<ModToolRecord>,
    pub patch_records: Vec<PatchRecord>,
}

impl ModEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            zero_files: Vec::new(),
            github_files: Vec::new(),
            installers: Vec::new(),
            remaining_archives: Vec::new(),
            unknown_files: Vec::new(),
            unknown_files_by_tools: Vec::new(),
            mod_tool_records: Vec::new(),
            patch_records: Vec::new(),
        }
    }

    pub fn sort_for_persistence(&mut self) {
        summon_stable_json::sort_by_schema_key(&mut self.zero_files, |p| p.clone());
        summon_stable_json::sort_by_schema_key(&mut self.github_files, |(p, _)| p.clone());
        summon_stable_json::sort_by_schema_key(&mut self.installers, |i| i.archive_digest);
        summon_stable_json::sort_by_schema_key(&mut self.remaining_archives, |r| r.archive_digest);
        summon_stable_json::sort_by_schema_key(&mut self.unknown_files, |p| p.clone());
        summon_stable_json::sort_by_schema_key(&mut self.unknown_files_by_tools, |(p, _)| p.clone());
        summon_stable_json::sort_by_schema_key(&mut self.mod_tool_records, |r| r.tool_name.clone());
        summon_stable_json::sort_by_schema_key(&mut self.patch_records, |r| r.target_path.clone());
        for r in &mut self.remaining_archives {
            summon_stable_json::sort_by_schema_key(&mut r.files, |f| f.target_path.clone());
        }
        for installer in &mut self.installers {
            summon_stable_json::sort_by_schema_key(&mut installer.skip, |p| p.clone());
        }
    }
}

/// `GithubRetriever` (spec.md §3), as recorded in the manifest: which
/// companion repo and which path within it reproduces this file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubFileRef {
    pub author: String,
    pub project: String,
    pub from_path: AnchoredSystemPathBuf,
}

/// One entry in a mod's ordered installer list (spec.md §6): an archive,
/// the recipe that explains it, and the files that recipe does not cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerEntry {
    pub archive_digest: ArchiveDigest,
    pub installer_type: String,
    pub installer_params: serde_json::Value,
    pub skip: Vec<AnchoredSystemPathBuf>,
}

/// One link in an outer-to-inner archive chain, as persisted in the
/// manifest (spec.md §3 `ArchiveRetriever`): `chain[i].file_digest ==
/// chain[i+1].archive_digest`, mirrored here as plain data rather than
/// depending on the resolver's own chain type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingArchiveLink {
    pub archive_digest: ArchiveDigest,
    pub intra_path: IntraArchivePath,
    pub file_digest: TruncatedDigest,
    pub file_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingArchiveFile {
    pub target_path: AnchoredSystemPathBuf,
    pub chain: Vec<RemainingArchiveLink>,
}

/// An archive the guesser could not explain with an installer recipe, but
/// which still supplies one or more of the mod's files directly (spec.md
/// §6: "extra archives + per-file intra-path chains").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingArchive {
    pub archive_digest: ArchiveDigest,
    pub files: Vec<RemainingArchiveFile>,
}

/// A transformation a mod-tool plugin applied, moving files between `skip`
/// and resolved (spec.md §4.5 stage 5).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModToolRecord {
    pub tool_name: String,
    pub details: serde_json::Value,
}

/// A patch plugin's diff of an archive's version of a file against the VFS
/// version (spec.md §4.5 stage 7, S6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRecord {
    pub target_path: AnchoredSystemPathBuf,
    pub patch_plugin_name: String,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod test {
    use super::*;

    fn digest(byte: u8) -> ArchiveDigest {
        ArchiveDigest([byte; 32])
    }

    #[test]
    fn sorts_mods_by_name() {
        let mut project = ProjectJson::default();
        project.mods.push(ModEntry::new("Zeta"));
        project.mods.push(ModEntry::new("Alpha"));
        project.sort_for_persistence();
        assert_eq!(project.mods[0].name, "Alpha");
        assert_eq!(project.mods[1].name, "Zeta");
    }

    #[test]
    fn sorts_installer_list_by_archive_digest() {
        let mut m = ModEntry::new("M");
        m.installers.push(InstallerEntry {
            archive_digest: digest(2),
            installer_type: "fomod".to_string(),
            installer_params: serde_json::Value::Null,
            skip: Vec::new(),
        });
        m.installers.push(InstallerEntry {
            archive_digest: digest(1),
            installer_type: "simpleunpack".to_string(),
            installer_params: serde_json::Value::Null,
            skip: Vec::new(),
        });
        m.sort_for_persistence();
        assert_eq!(m.installers[0].archive_digest, digest(1));
        assert_eq!(m.installers[1].archive_digest, digest(2));
    }
}
