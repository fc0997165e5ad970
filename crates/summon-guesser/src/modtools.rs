//! Stage 5 of the guesser pipeline (spec.md §4.5): tools scoped to a
//! single mod that explain files the installer recipes left unknown (for
//! instance a mod author shipping a FOMOD-hidden plugin in an `optional`
//! folder) by recognizing they're just a skipped recipe file that landed
//! somewhere else in the VFS under identical content.
//!
//! Grounded on `original_source/summonmm/plugins/modtool/optional.py` and
//! `script2source.py`: both walk `remaining_after_install_from` looking for
//! a path matching a fixed rename pattern, then confirm the match by
//! comparing content hashes against what a recipe skipped at the renamed
//! path.

use regex::Regex;
use serde_json::Value;
use summon_archive_index::TruncatedDigest;
use summon_paths::AnchoredSystemPathBuf;

use crate::model::ModInProgress;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModToolResult {
    pub tool_name: String,
    pub details: Value,
    /// Files this tool run explains, removed from the mod's unknown set.
    pub explained: Vec<AnchoredSystemPathBuf>,
}

pub trait ModToolPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn try_explain(&self, mod_in_progress: &ModInProgress) -> Option<ModToolResult>;
}

#[derive(Default)]
pub struct ModToolRegistry {
    plugins: Vec<Box<dyn ModToolPlugin>>,
}

impl ModToolRegistry {
    pub fn new() -> Self {
        let mut registry = Self { plugins: Vec::new() };
        registry.register(Box::new(OptionalModToolPlugin::new()));
        registry.register(Box::new(Script2SourceModToolPlugin::new()));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn ModToolPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn run_all(&self, mod_in_progress: &ModInProgress) -> Vec<ModToolResult> {
        self.plugins
            .iter()
            .filter_map(|p| p.try_explain(mod_in_progress))
            .collect()
    }
}

/// The truncated content hash a `remaining_after_install_from` entry
/// resolves to: the innermost hop of its first retriever, i.e. the file's
/// own content, independent of which archive it came from.
fn remaining_hash(mod_in_progress: &ModInProgress, path: &AnchoredSystemPathBuf) -> Option<TruncatedDigest> {
    let retrievals = mod_in_progress.remaining_after_install_from.get(path)?;
    let first = retrievals.first()?;
    Some(first.hops.last()?.file_in_archive.file_hash)
}

/// The content hash a recipe would have written at `path`, had it not been
/// skipped, across every recipe this mod resolved to.
fn skip_hash(mod_in_progress: &ModInProgress, path: &AnchoredSystemPathBuf) -> Option<TruncatedDigest> {
    mod_in_progress
        .install_from
        .iter()
        .find_map(|f| f.details.skip_desired.get(path))
        .map(|fia| fia.file_hash)
}

fn anchored(path: &str) -> Option<AnchoredSystemPathBuf> {
    AnchoredSystemPathBuf::from_str(path).ok()
}

/// Recognizes a mod shipping a Skyrim plugin inside an `optional` folder
/// (a FOMOD convention for a plugin the author expects most users to skip)
/// whose content exactly matches what a recipe skipped writing at the same
/// name one directory up, and the symmetric case: a recipe skipped writing
/// under `optional/`, but the plugin shows up unwrapped in the VFS.
pub struct OptionalModToolPlugin {
    remaining_pattern: Regex,
}

impl OptionalModToolPlugin {
    pub fn new() -> Self {
        Self {
            remaining_pattern: Regex::new(r"(?i)^(.*/)?optional/([ 0-9a-z_-]+\.es[plm])$").unwrap(),
        }
    }

    fn sibling(prefix: &str, fname: &str) -> String {
        format!("{prefix}{fname}")
    }
}

impl Default for OptionalModToolPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ModToolPlugin for OptionalModToolPlugin {
    fn name(&self) -> &'static str {
        "OPTIONAL"
    }

    fn try_explain(&self, mod_in_progress: &ModInProgress) -> Option<ModToolResult> {
        let mut explained = Vec::new();
        let mut opt = Vec::new();
        let mut unopt = Vec::new();

        for path in mod_in_progress.remaining_after_install_from.keys() {
            let Ok(lower) = path.to_unix_lower() else { continue };
            let Some(caps) = self.remaining_pattern.captures(&lower) else { continue };
            let prefix = caps.get(1).map_or("", |m| m.as_str());
            let fname = &caps[2];
            let bare = Self::sibling(prefix, fname);
            let Some(bare_path) = anchored(&bare) else { continue };

            let (Some(remaining), Some(skipped)) =
                (remaining_hash(mod_in_progress, path), skip_hash(mod_in_progress, &bare_path))
            else {
                continue;
            };
            if remaining == skipped {
                explained.push(path.clone());
                opt.push(bare);
            }
        }

        for install in &mod_in_progress.install_from {
            for path in &install.details.skip {
                let Ok(lower) = path.to_unix_lower() else { continue };
                let Some(caps) = self.remaining_pattern.captures(&lower) else { continue };
                let prefix = caps.get(1).map_or("", |m| m.as_str());
                let fname = &caps[2];
                let bare = Self::sibling(prefix, fname);
                let Some(bare_path) = anchored(&bare) else { continue };

                let (Some(skipped), Some(remaining)) =
                    (skip_hash(mod_in_progress, path), remaining_hash(mod_in_progress, &bare_path))
                else {
                    continue;
                };
                if skipped == remaining && !explained.contains(&bare_path) {
                    explained.push(bare_path);
                    unopt.push(fname.to_string());
                }
            }
        }

        if opt.is_empty() && unopt.is_empty() {
            return None;
        }

        Some(ModToolResult {
            tool_name: self.name().to_string(),
            details: serde_json::json!({ "opt": opt, "unopt": unopt }),
            explained,
        })
    }
}

/// Recognizes the Script2Source body/author convention of moving every
/// Papyrus source script from `source/scripts/` to `scripts/source/`
/// (spec.md §4.5 stage 5; "all or nothing" because the tool renames the
/// whole folder, not file by file): every `remaining_after_install_from`
/// entry under `source/scripts/` must have a matching skipped entry under
/// `scripts/source/` with identical content, and vice versa, or nothing is
/// reported.
pub struct Script2SourceModToolPlugin {
    forward_pattern: Regex,
    backward_pattern: Regex,
}

impl Script2SourceModToolPlugin {
    pub fn new() -> Self {
        Self {
            forward_pattern: Regex::new(r"(?i)^source/scripts/([ 0-9a-z_-]+\.psc)$").unwrap(),
            backward_pattern: Regex::new(r"(?i)^scripts/source/([ 0-9a-z_-]+\.psc)$").unwrap(),
        }
    }
}

impl Default for Script2SourceModToolPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl ModToolPlugin for Script2SourceModToolPlugin {
    fn name(&self) -> &'static str {
        "SCRIPT2SOURCE"
    }

    fn try_explain(&self, mod_in_progress: &ModInProgress) -> Option<ModToolResult> {
        let mut matches = Vec::new();
        for path in mod_in_progress.remaining_after_install_from.keys() {
            let Ok(lower) = path.to_unix_lower() else { continue };
            let Some(caps) = self.forward_pattern.captures(&lower) else { continue };
            let fname = caps[1].to_string();
            let backward = anchored(&format!("scripts/source/{fname}"))?;

            let remaining = remaining_hash(mod_in_progress, path)?;
            let skipped = skip_hash(mod_in_progress, &backward)?;
            if remaining != skipped {
                return None; // all or nothing
            }
            matches.push((path.clone(), backward));
        }

        if matches.is_empty() {
            return None;
        }

        // Confirm every `scripts/source/<name>.psc` skip entry was
        // accounted for above — the tool moves the whole folder, so a
        // leftover would mean this wasn't actually Script2Source.
        for install in &mod_in_progress.install_from {
            for path in &install.details.skip {
                let Ok(lower) = path.to_unix_lower() else { continue };
                if self.backward_pattern.is_match(&lower) && !matches.iter().any(|(_, b)| b == path) {
                    return None;
                }
            }
        }

        Some(ModToolResult {
            tool_name: self.name().to_string(),
            details: serde_json::json!({ "script2source": true }),
            explained: matches.into_iter().map(|(remaining, _)| remaining).collect(),
        })
    }
}

#[cfg(test)]
mod test {
    use summon_archive_index::{ArchiveDigest, FileInArchive};
    use summon_paths::IntraArchivePath;
    use summon_resolver::{ArchiveHop, ArchiveRetrieval};

    use super::*;
    use crate::model::{ArInstallerDetails, InstallFrom, ModInProgress};

    fn digest(byte: u8) -> TruncatedDigest {
        ArchiveDigest([byte; 32]).truncate()
    }

    fn remaining(path: &str, hash: TruncatedDigest) -> (AnchoredSystemPathBuf, Vec<ArchiveRetrieval>) {
        let archive_hash = ArchiveDigest([9; 32]);
        (
            anchored(path).unwrap(),
            vec![ArchiveRetrieval {
                target_hash: archive_hash,
                target_size: 1,
                hops: vec![ArchiveHop {
                    archive_hash,
                    archive_size: 100,
                    file_in_archive: FileInArchive {
                        intra_path: IntraArchivePath::new("irrelevant.bin").unwrap(),
                        file_hash: hash,
                        file_size: 1,
                    },
                }],
            }],
        )
    }

    fn skipped_recipe(path: &str, hash: TruncatedDigest) -> InstallFrom {
        let mut details = ArInstallerDetails::default();
        let anchored_path = anchored(path).unwrap();
        details.skip.insert(anchored_path.clone());
        details.skip_desired.insert(
            anchored_path,
            FileInArchive {
                intra_path: IntraArchivePath::new("irrelevant.bin").unwrap(),
                file_hash: hash,
                file_size: 1,
            },
        );
        InstallFrom {
            archive_digest: ArchiveDigest([1; 32]),
            plugin_name: "simpleunpack".to_string(),
            params: serde_json::json!({}),
            details,
        }
    }

    #[test]
    fn optional_explains_a_plugin_left_in_the_optional_folder() {
        let mut m = ModInProgress::new("Mod");
        let (path, retrievals) = remaining("optional/addon.esp", digest(5));
        m.remaining_after_install_from.insert(path.clone(), retrievals);
        m.install_from.push(skipped_recipe("addon.esp", digest(5)));

        let result = OptionalModToolPlugin::new().try_explain(&m).unwrap();
        assert_eq!(result.tool_name, "OPTIONAL");
        assert_eq!(result.explained, vec![path]);
    }

    #[test]
    fn optional_ignores_a_mismatched_content_hash() {
        let mut m = ModInProgress::new("Mod");
        let (path, retrievals) = remaining("optional/addon.esp", digest(5));
        m.remaining_after_install_from.insert(path, retrievals);
        m.install_from.push(skipped_recipe("addon.esp", digest(6)));

        assert!(OptionalModToolPlugin::new().try_explain(&m).is_none());
    }

    #[test]
    fn script2source_explains_a_matched_rename_pair() {
        let mut m = ModInProgress::new("Mod");
        let (path, retrievals) = remaining("source/scripts/addon.psc", digest(7));
        m.remaining_after_install_from.insert(path.clone(), retrievals);
        m.install_from.push(skipped_recipe("scripts/source/addon.psc", digest(7)));

        let result = Script2SourceModToolPlugin::new().try_explain(&m).unwrap();
        assert_eq!(result.tool_name, "SCRIPT2SOURCE");
        assert_eq!(result.explained, vec![path]);
    }

    #[test]
    fn script2source_refuses_a_partial_rename() {
        let mut m = ModInProgress::new("Mod");
        let (path, retrievals) = remaining("source/scripts/addon.psc", digest(7));
        m.remaining_after_install_from.insert(path, retrievals);
        // A second scripts/source file with no matching remaining entry:
        // the whole-folder rename can't be confirmed, so nothing is
        // reported.
        m.install_from.push(skipped_recipe("scripts/source/addon.psc", digest(7)));
        m.install_from.push(skipped_recipe("scripts/source/other.psc", digest(8)));

        assert!(Script2SourceModToolPlugin::new().try_explain(&m).is_none());
    }
}
