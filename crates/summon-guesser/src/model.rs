//! Per-mod bookkeeping for the guesser pipeline (spec.md §4.5): the
//! partitioned file sets, the archives known to supply them, and the
//! recipes chosen to explain them.
//!
//! Grounded on `original_source/summonmm/commands/run_guess.py`'s
//! `_ModInProgress`/`_ModsInProgress`, reshaped from a single mutable
//! object with `assert`-enforced phase ordering into plain structs the
//! pipeline stages in `run.rs` transform one at a time.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use summon_archive_index::{ArchiveDigest, FileInArchive};
use summon_manifest::GithubFileRef;
use summon_paths::AnchoredSystemPathBuf;
use summon_resolver::ArchiveRetrieval;

use crate::globaltools::CouldBeProducedByGlobalTool;

/// Everything an installer plugin proposes doing with one archive: which
/// intra-mod paths it would produce, and the opaque parameters needed to
/// reproduce the choice later (spec.md §6, `installer_params`).
#[derive(Debug, Clone)]
pub struct InstallerRecipe {
    pub installer_type: String,
    pub installer_params: Value,
    pub desired_files: Vec<(AnchoredSystemPathBuf, FileInArchive)>,
}

/// A recipe's files, classified against the VFS (spec.md §4.5 stage 2).
#[derive(Debug, Clone, Default)]
pub struct ArInstallerDetails {
    pub ignored: BTreeSet<AnchoredSystemPathBuf>,
    pub skip: BTreeSet<AnchoredSystemPathBuf>,
    pub files: BTreeMap<AnchoredSystemPathBuf, FileInArchive>,
    pub modified_since_install: BTreeMap<AnchoredSystemPathBuf, FileInArchive>,
    /// What `skip` would have contained at each path, had the recipe
    /// installed it — the mod-tool stage needs this to recognize a file
    /// that landed somewhere else in the VFS under the same content
    /// (spec.md §4.5 stage 5, e.g. `optional\foo.esp` vs `foo.esp`).
    pub skip_desired: BTreeMap<AnchoredSystemPathBuf, FileInArchive>,
}

/// One archive a mod's installer list explains, in application order.
#[derive(Debug, Clone)]
pub struct InstallFrom {
    pub archive_digest: ArchiveDigest,
    pub plugin_name: String,
    pub params: Value,
    pub details: ArInstallerDetails,
}

#[derive(Debug, Default)]
pub struct ModInProgress {
    pub name: String,
    pub zero_files: BTreeSet<AnchoredSystemPathBuf>,
    pub github_files: BTreeMap<AnchoredSystemPathBuf, GithubFileRef>,
    /// Archive-backed files, possibly with more than one retriever (stage 4
    /// narrows multi-retriever entries down to one).
    pub archive_files: BTreeMap<AnchoredSystemPathBuf, Vec<ArchiveRetrieval>>,
    pub unknown_files: BTreeSet<AnchoredSystemPathBuf>,
    /// Every archive digest that uniquely supplies at least one file of
    /// this mod, with how many files it was the sole source for.
    pub known_archives: BTreeMap<ArchiveDigest, usize>,

    pub install_from: Vec<InstallFrom>,
    pub remaining_after_install_from: BTreeMap<AnchoredSystemPathBuf, Vec<ArchiveRetrieval>>,
    pub unknown_files_could_be_produced_by_tools:
        BTreeMap<AnchoredSystemPathBuf, (String, CouldBeProducedByGlobalTool)>,
    pub mod_tools: Vec<(String, Value)>,
    pub patched: BTreeMap<AnchoredSystemPathBuf, (String, Value)>,
}

impl ModInProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn total_files(&self) -> usize {
        self.zero_files.len()
            + self.github_files.len()
            + self.archive_files.len()
            + self.unknown_files.len()
    }

    pub fn is_fully_github(&self) -> bool {
        self.archive_files.is_empty()
    }

    pub fn num_skips(&self) -> usize {
        self.install_from.iter().map(|f| f.details.skip.len()).sum()
    }

    pub fn is_cleanly_installed(&self) -> bool {
        self.unknown_files.is_empty()
            && self.remaining_after_install_from.is_empty()
            && self.num_skips() == 0
    }

    pub fn is_healable_to_clean_install(&self) -> bool {
        if !self.remaining_after_install_from.is_empty() {
            return false;
        }
        if self.unknown_files_could_be_produced_by_tools.len() != self.num_skips() {
            return false;
        }
        self.unknown_files
            .iter()
            .all(|f| self.unknown_files_could_be_produced_by_tools.contains_key(f))
    }

    pub fn modified_since_install(&self) -> impl Iterator<Item = &AnchoredSystemPathBuf> {
        self.install_from
            .iter()
            .flat_map(|f| f.details.modified_since_install.keys())
    }
}

/// All mods being resolved in one `guess` run, keyed by mod name.
#[derive(Debug, Default)]
pub struct ModsInProgress {
    pub mods: BTreeMap<String, ModInProgress>,
}

impl ModsInProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, name: &str) -> &mut ModInProgress {
        self.mods
            .entry(name.to_string())
            .or_insert_with(|| ModInProgress::new(name))
    }
}
