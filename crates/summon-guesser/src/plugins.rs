//! Installer recipe plugins: pluggable "how do I explain this archive's
//! files" strategies, tried specific-before-generic (spec.md §4.5, stage 2:
//! "for each archive, ask each installer plugin in registration order; the
//! first plugin that proposes a recipe wins").
//!
//! Grounded on `summon-resolver::tasks::AvailableFilesResolver::retrievers_for`'s
//! chain-of-responsibility shape (try the narrow thing before the broad
//! fallback) and on `original_source/summonmm/plugins/arinstaller/`'s FOMOD
//! plugin being tried ahead of the original's generic unpack fallback.

use std::collections::BTreeMap;

use summon_archive::ArchiveRegistry;
use summon_archive_index::{Archive, TruncatedDigest};
use summon_paths::{AbsoluteSystemPathBuf, AnchoredSystemPathBuf, IntraArchivePath};

use crate::fomod;
use crate::model::InstallerRecipe;

/// Everything an [`InstallerPlugin`] needs to propose a recipe for one
/// archive against one mod's known (destination path -> expected digest)
/// pairs.
pub struct InstallerGuessContext<'a> {
    pub archive: &'a Archive,
    /// Where the archive sits on disk, if it's actually present (a
    /// `remaining_archive` we've only ever seen in another mod's chain has
    /// no local file to extract from).
    pub archive_path: Option<&'a AbsoluteSystemPathBuf>,
    pub registry: &'a ArchiveRegistry,
    pub scratch_root: &'a AbsoluteSystemPathBuf,
    pub mod_files: &'a BTreeMap<AnchoredSystemPathBuf, TruncatedDigest>,
}

pub trait InstallerPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Proposes a recipe, or `None` if this plugin doesn't apply (e.g. the
    /// FOMOD plugin, when the archive has no `fomod\moduleconfig.xml`).
    fn guess(&self, ctx: &InstallerGuessContext) -> Option<InstallerRecipe>;
}

fn to_anchored(dst: &str) -> Option<AnchoredSystemPathBuf> {
    AnchoredSystemPathBuf::from_str(dst.replace('\\', "/")).ok()
}

fn target_map(mod_files: &BTreeMap<AnchoredSystemPathBuf, TruncatedDigest>) -> BTreeMap<String, TruncatedDigest> {
    mod_files
        .iter()
        .filter_map(|(anchored, digest)| Some((anchored.to_unix_lower().ok()?.replace('/', "\\"), *digest)))
        .collect()
}

/// Locates `fomod\moduleconfig.xml` inside an archive's flat listing and the
/// prefix it sits under (usually empty — the `fomod` folder sits at the
/// archive root alongside the content folders it describes), so the `src`/
/// `dst` paths inside the config can be resolved against the same root the
/// mod author authored them against. `IntraArchivePath` already lower-cases,
/// so this match is inherently case-insensitive.
fn find_fomod_root(archive: &Archive) -> Option<String> {
    const NEEDLE: &str = "fomod\\moduleconfig.xml";
    archive.files.iter().find_map(|f| {
        let path = f.intra_path.as_str();
        if path == NEEDLE {
            return Some(String::new());
        }
        path.strip_suffix(NEEDLE).map(|prefix| prefix.trim_end_matches('\\').to_string())
    })
}

/// Tries the FOMOD installer (spec.md §4.6): find `ModuleConfig.xml`, parse
/// it, and run the forking guesser against the mod's known files.
pub struct FomodInstallerPlugin;

impl InstallerPlugin for FomodInstallerPlugin {
    fn name(&self) -> &'static str {
        "fomod"
    }

    fn guess(&self, ctx: &InstallerGuessContext) -> Option<InstallerRecipe> {
        let root_prefix = find_fomod_root(ctx.archive)?;
        let archive_path = ctx.archive_path?;

        let config_intra_path = if root_prefix.is_empty() {
            IntraArchivePath::new("fomod\\moduleconfig.xml").ok()?
        } else {
            IntraArchivePath::new(format!("{root_prefix}\\fomod\\moduleconfig.xml")).ok()?
        };

        let scratch = ctx.scratch_root.join(format!("fomod-{}", ctx.archive.archive_hash.to_hex()));
        ctx.registry.extract(archive_path, &[config_intra_path.clone()], &scratch).ok()?;
        let xml_path = scratch.join(config_intra_path.as_str().replace('\\', "/"));
        let xml_text = std::fs::read_to_string(xml_path.as_path()).ok()?;
        let config = fomod::xml::parse(&xml_text).ok()?;

        let strip_prefix = if root_prefix.is_empty() { String::new() } else { format!("{root_prefix}\\") };
        let mut archive_paths = Vec::new();
        let mut archive_by_path = BTreeMap::new();
        for file in &ctx.archive.files {
            let path = file.intra_path.as_str();
            let rel = if strip_prefix.is_empty() {
                path.to_string()
            } else if let Some(rel) = path.strip_prefix(strip_prefix.as_str()) {
                rel.to_string()
            } else {
                continue;
            };
            let Ok(rel_path) = IntraArchivePath::new(&rel) else { continue };
            archive_paths.push(rel_path.clone());
            archive_by_path.insert(rel_path, file.clone());
        }

        let target = target_map(ctx.mod_files);
        let guessed = fomod::guess_installer(&config, &archive_paths, &archive_by_path, &target)?;
        if guessed.score == 0 {
            return None;
        }

        let mut desired_files = Vec::new();
        for (dst, file) in &guessed.files {
            let dst = if strip_prefix.is_empty() {
                dst.clone()
            } else {
                format!("{}{}", strip_prefix, dst)
            };
            let Some(anchored) = to_anchored(&dst) else { continue };
            desired_files.push((anchored, file.clone()));
        }

        let selections: Vec<_> = guessed
            .selections
            .iter()
            .map(|s| {
                serde_json::json!({
                    "step": s.step_name,
                    "group": s.group_name,
                    "plugin": s.plugin_name,
                })
            })
            .collect();

        Some(InstallerRecipe {
            installer_type: self.name().to_string(),
            installer_params: serde_json::json!({ "selections": selections }),
            desired_files,
        })
    }
}

/// Falls back to installing the archive verbatim, optionally stripping a
/// single leading path component (the common "everything lives under one
/// mod-named folder" convention). Always proposes something; it's the
/// catch-all registered after every more specific plugin.
pub struct SimpleUnpackPlugin;

impl InstallerPlugin for SimpleUnpackPlugin {
    fn name(&self) -> &'static str {
        "simpleunpack"
    }

    fn guess(&self, ctx: &InstallerGuessContext) -> Option<InstallerRecipe> {
        let target = target_map(ctx.mod_files);

        let mut best: Option<(usize, bool, Vec<_>)> = None;
        for strip in [false, true] {
            let mut desired = Vec::new();
            let mut hits = 0usize;
            for file in &ctx.archive.files {
                let path = file.intra_path.as_str();
                let rel = if strip {
                    match path.split_once('\\') {
                        Some((_, rest)) => rest.to_string(),
                        None => continue,
                    }
                } else {
                    path.to_string()
                };
                let Some(anchored) = to_anchored(&rel) else { continue };
                if target.get(&rel).is_some_and(|h| h == &file.file_hash) {
                    hits += 1;
                }
                desired.push((anchored, file.clone()));
            }
            let better = match &best {
                None => true,
                Some((best_hits, _, _)) => hits > *best_hits,
            };
            if better {
                best = Some((hits, strip, desired));
            }
        }

        let (_, strip, desired_files) = best?;
        Some(InstallerRecipe {
            installer_type: self.name().to_string(),
            installer_params: serde_json::json!({ "strip_root": strip }),
            desired_files,
        })
    }
}

/// Installer plugins in try-order. `FomodInstallerPlugin` must come before
/// `SimpleUnpackPlugin`, which always succeeds and would otherwise shadow
/// it.
pub struct InstallerPluginRegistry {
    plugins: Vec<Box<dyn InstallerPlugin>>,
}

impl InstallerPluginRegistry {
    pub fn new() -> Self {
        let mut registry = Self { plugins: Vec::new() };
        registry.register(Box::new(FomodInstallerPlugin));
        registry.register(Box::new(SimpleUnpackPlugin));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn InstallerPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn guess(&self, ctx: &InstallerGuessContext) -> Option<InstallerRecipe> {
        self.plugins.iter().find_map(|plugin| plugin.guess(ctx))
    }
}

impl Default for InstallerPluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
