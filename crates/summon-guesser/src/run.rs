//! Orchestrates the seven stages of spec.md §4.5 in order, turning the
//! resolver's per-mod `path -> [retriever]` picture into a [`ModsInProgress`]
//! ready for `summon-manifest` to flatten into a [`summon_manifest::ProjectJson`].
//!
//! Grounded on `original_source/summonmm/commands/run_guess.py`'s top-level
//! `run_guess` function, which calls the same seven steps in the same order
//! against a single mutable bookkeeping object; here each step is its own
//! module (`ambiguity`, `order`, `modtools`, `globaltools`, `patches`) and
//! this function just wires them together.

use std::collections::BTreeMap;

use regex::Regex;
use summon_archive::ArchiveRegistry;
use summon_archive_index::{ArchiveDigest, ArchiveIndex, TruncatedDigest};
use summon_manifest::GithubFileRef;
use summon_paths::{AbsoluteSystemPathBuf, AnchoredSystemPathBuf};
use summon_resolver::{ArchiveRetrieval, FileRetriever};

use crate::globaltools::GlobalToolRegistry;
use crate::model::{ArInstallerDetails, InstallFrom, ModsInProgress};
use crate::order::order_recipes;
use crate::patches::PatchPluginRegistry;
use crate::plugins::{InstallerGuessContext, InstallerPluginRegistry};
use crate::{ambiguity, modtools::ModToolRegistry};

/// Everything stage-by-stage needs: the resolver's output per mod, the
/// "what should this file actually look like" target for classification,
/// where archives and mod folders live on disk, and the plugin registries
/// each stage consults.
pub struct GuessInputs<'a> {
    /// mod name -> intra-mod path -> retrievers (spec.md §4.5's stated input).
    pub retrievers: BTreeMap<String, BTreeMap<AnchoredSystemPathBuf, Vec<FileRetriever>>>,
    /// mod name -> intra-mod path -> expected digest, i.e. what's actually
    /// sitting in the VFS right now. Derived upstream of this crate from
    /// the mod-manager-specific VFS layering spec.md §9 scopes out.
    pub target_digests: BTreeMap<String, BTreeMap<AnchoredSystemPathBuf, TruncatedDigest>>,
    /// mod name -> the on-disk root its VFS files are read from, needed
    /// only by stage 7 to read a file's current bytes for patch diffing.
    pub mod_roots: BTreeMap<String, AbsoluteSystemPathBuf>,
    pub archive_index: &'a ArchiveIndex,
    pub archive_registry: &'a ArchiveRegistry,
    /// Archives actually present on disk, keyed by digest; an archive known
    /// only through another mod's retrieval chain has no entry here.
    pub archive_paths_on_disk: BTreeMap<ArchiveDigest, AbsoluteSystemPathBuf>,
    pub scratch_root: AbsoluteSystemPathBuf,
    pub ignore_patterns: Vec<Regex>,
    pub installer_plugins: InstallerPluginRegistry,
    pub mod_tool_plugins: ModToolRegistry,
    pub global_tool_plugins: GlobalToolRegistry,
    pub patch_plugins: PatchPluginRegistry,
}

fn root_archive(retrieval: &ArchiveRetrieval) -> ArchiveDigest {
    retrieval.hops.first().map(|hop| hop.archive_hash).unwrap_or(retrieval.target_hash)
}

fn is_ignored(path: &AnchoredSystemPathBuf, ignore_patterns: &[Regex]) -> bool {
    let Ok(normalized) = path.to_unix_lower() else { return false };
    ignore_patterns.iter().any(|re| re.is_match(&normalized))
}

/// Stage 2's file classification: sorts a recipe's proposed files into
/// `files` (matches the VFS), `skip` (VFS has something else or nothing),
/// `modified_since_install` (differs; a patch candidate), and `ignored`.
fn classify_recipe(
    recipe: &crate::model::InstallerRecipe,
    target: &BTreeMap<AnchoredSystemPathBuf, TruncatedDigest>,
    ignore_patterns: &[Regex],
) -> ArInstallerDetails {
    let mut details = ArInstallerDetails::default();
    for (path, file) in &recipe.desired_files {
        if is_ignored(path, ignore_patterns) {
            details.ignored.insert(path.clone());
            continue;
        }
        match target.get(path) {
            Some(expected) if *expected == file.file_hash => {
                details.files.insert(path.clone(), file.clone());
            }
            Some(_) => {
                details.modified_since_install.insert(path.clone(), file.clone());
                details.skip.insert(path.clone());
                details.skip_desired.insert(path.clone(), file.clone());
            }
            None => {
                details.skip.insert(path.clone());
                details.skip_desired.insert(path.clone(), file.clone());
            }
        }
    }
    details
}

pub fn run_guess(inputs: GuessInputs<'_>) -> ModsInProgress {
    let mut mods = ModsInProgress::new();

    // Stage 1: collect.
    for (mod_name, files) in &inputs.retrievers {
        let m = mods.entry(mod_name);
        for (path, retrievers) in files {
            if retrievers.is_empty() {
                m.unknown_files.insert(path.clone());
                continue;
            }
            if retrievers.iter().any(FileRetriever::is_zero) {
                m.zero_files.insert(path.clone());
                continue;
            }
            if let Some(FileRetriever::Github { author, project, from_path }) =
                retrievers.iter().find(|r| matches!(r, FileRetriever::Github { .. }))
            {
                m.github_files.insert(
                    path.clone(),
                    GithubFileRef { author: author.clone(), project: project.clone(), from_path: from_path.clone() },
                );
                continue;
            }
            let archive_retrievals: Vec<ArchiveRetrieval> = retrievers
                .iter()
                .filter_map(|r| match r {
                    FileRetriever::Archive(a) => Some(a.clone()),
                    _ => None,
                })
                .collect();
            if archive_retrievals.is_empty() {
                m.unknown_files.insert(path.clone());
            } else {
                m.archive_files.insert(path.clone(), archive_retrievals);
            }
        }
    }

    // Stages 2-3: per-mod recipe selection and ordering.
    for (mod_name, m) in mods.mods.iter_mut() {
        let mut known_archives: BTreeMap<ArchiveDigest, usize> = BTreeMap::new();
        for retrievals in m.archive_files.values() {
            if let [only] = retrievals.as_slice() {
                *known_archives.entry(root_archive(only)).or_insert(0) += 1;
            }
        }
        m.known_archives = known_archives;

        let target = inputs.target_digests.get(mod_name).cloned().unwrap_or_default();
        let mut recipes = Vec::new();
        for digest in m.known_archives.keys() {
            let Some(archive) = inputs.archive_index.get(digest) else { continue };
            let archive_path = inputs.archive_paths_on_disk.get(digest);
            let ctx = InstallerGuessContext {
                archive,
                archive_path,
                registry: inputs.archive_registry,
                scratch_root: &inputs.scratch_root,
                mod_files: &target,
            };
            let Some(recipe) = inputs.installer_plugins.guess(&ctx) else { continue };
            let details = classify_recipe(&recipe, &target, &inputs.ignore_patterns);
            recipes.push(InstallFrom {
                archive_digest: *digest,
                plugin_name: recipe.installer_type,
                params: recipe.installer_params,
                details,
            });
        }

        match order_recipes(mod_name, recipes) {
            Ok(ordered) => m.install_from = ordered,
            Err(err) => {
                tracing::warn!(mod = mod_name.as_str(), error = %err, "recipe ordering cycle; mod left unresolved");
            }
        }
    }

    // Stage 4: ambiguity reduction.
    ambiguity::reduce_ambiguity(&mut mods);

    for m in mods.mods.values_mut() {
        let covered: std::collections::BTreeSet<_> = m
            .install_from
            .iter()
            .flat_map(|f| f.details.files.keys().chain(f.details.skip.keys()))
            .cloned()
            .collect();
        m.remaining_after_install_from = m
            .archive_files
            .iter()
            .filter(|(path, _)| !covered.contains(*path))
            .map(|(path, r)| (path.clone(), r.clone()))
            .collect();
    }

    // Stage 5: mod tools. A matching plugin explains entries left over in
    // `remaining_after_install_from` (spec.md §4.5: "move files between
    // skip and resolved") by recognizing them as a recipe file that
    // actually landed elsewhere in the VFS under identical content.
    for m in mods.mods.values_mut() {
        let results = inputs.mod_tool_plugins.run_all(m);
        for result in results {
            for path in &result.explained {
                m.remaining_after_install_from.remove(path);
            }
            m.mod_tools.push((result.tool_name, result.details));
        }
    }

    // Stage 6: global tools.
    for m in mods.mods.values_mut() {
        let unknown: Vec<_> = m.unknown_files.iter().cloned().collect();
        for path in unknown {
            if let Some(found) = inputs.global_tool_plugins.find_for(&path) {
                m.unknown_files.remove(&path);
                m.unknown_files_could_be_produced_by_tools.insert(path, (found.tool_name.clone(), found));
            }
        }
    }

    // Stage 7: patches.
    for (mod_name, m) in mods.mods.iter_mut() {
        let mod_root = inputs.mod_roots.get(mod_name);
        for install in m.install_from.iter_mut() {
            let Some(mod_root) = mod_root else { continue };
            let Some(archive_path) = inputs.archive_paths_on_disk.get(&install.archive_digest) else { continue };
            let targets: Vec<_> = install.details.modified_since_install.keys().cloned().collect();
            for path in targets {
                let Some(extension) = path.as_path().extension().and_then(|e| e.to_str()) else { continue };
                let extension = extension.to_lowercase();
                let Some(file) = install.details.modified_since_install.get(&path).cloned() else { continue };

                let scratch =
                    inputs.scratch_root.join(format!("patch-{}-{}", install.archive_digest.to_hex(), path));
                if inputs.archive_registry.extract(archive_path, &[file.intra_path.clone()], &scratch).is_err() {
                    continue;
                }
                let archive_file_path = scratch.join(file.intra_path.as_str().replace('\\', "/"));
                let vfs_file_path = mod_root.join(path.as_path());
                let (Ok(archive_bytes), Ok(vfs_bytes)) =
                    (std::fs::read(archive_file_path.as_path()), std::fs::read(vfs_file_path.as_path()))
                else {
                    continue;
                };

                let patched = inputs
                    .patch_plugins
                    .for_extension(&extension)
                    .find_map(|plugin| plugin.diff(&archive_bytes, &vfs_bytes).map(|payload| (plugin.name(), payload)));

                if let Some((name, payload)) = patched {
                    install.details.modified_since_install.remove(&path);
                    install.details.skip.remove(&path);
                    m.patched.insert(path, (name.to_string(), payload));
                }
            }
        }
    }

    mods
}
