//! FOMOD's data model (spec.md §4.6): the typed shape of `ModuleConfig.xml`
//! once parsed, independent of the XML syntax that produced it.
//!
//! Grounded on `original_source/summonmm/plugins/arinstaller/_fomod/fomod_common.py`,
//! carried over field-for-field since the wire format (FOMOD's XML schema)
//! is fixed by the mod authoring tools that produce it, not by this crate.

use std::collections::BTreeMap;

use summon_paths::IntraArchivePath;

/// One `<file>`/`<folder>` entry inside a FOMOD `<files>` block.
#[derive(Debug, Clone)]
pub struct FomodSrcDst {
    pub src: String,
    pub dst: String,
    pub priority: i32,
    pub always_install: bool,
    pub install_if_usable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct FomodFilesAndFolders {
    pub files: Vec<FomodSrcDst>,
    pub folders: Vec<FomodSrcDst>,
}

impl FomodFilesAndFolders {
    pub fn extend(&mut self, other: &FomodFilesAndFolders) {
        self.files.extend(other.files.iter().cloned());
        self.folders.extend(other.folders.iter().cloned());
    }

    /// Resolves every `<file>`/`<folder>` entry against the archive's flat
    /// file list, producing final `dst -> src` pairs. Folder entries expand
    /// to every archive path under `src`; conflicting destinations are
    /// settled by priority, ties broken by "last entry wins" (the order
    /// `FomodEngine` merged files in).
    pub fn resolve(&self, archive_files: &[IntraArchivePath]) -> BTreeMap<String, (String, i32)> {
        let mut out: BTreeMap<String, (String, i32)> = BTreeMap::new();

        let mut apply = |dst: String, src: String, priority: i32| {
            match out.get(&dst) {
                Some((_, existing_priority)) if *existing_priority > priority => {}
                _ => {
                    out.insert(dst, (src, priority));
                }
            }
        };

        for f in &self.files {
            apply(f.dst.clone(), f.src.clone(), f.priority);
        }
        for f in &self.folders {
            let src_prefix = f.src.to_lowercase();
            for archive_path in archive_files {
                let path_str = archive_path.as_str();
                if !path_str.starts_with(&src_prefix) {
                    continue;
                }
                let rel = &path_str[src_prefix.len()..];
                let rel = rel.trim_start_matches('\\');
                let dst = if f.dst.is_empty() {
                    rel.to_string()
                } else {
                    format!("{}\\{}", f.dst.trim_end_matches('\\'), rel)
                };
                apply(dst, path_str.to_string(), f.priority);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FomodDependencyState {
    Active,
    Inactive,
    Missing,
}

#[derive(Debug, Clone)]
pub enum FomodDependencyLeaf {
    Flag { flag: String, value: String },
    File { file: String, state: FomodDependencyState },
    /// `gameDependency`/`fommDependency` version checks; summon treats these
    /// as always-satisfied since it never runs the target game.
    Game,
}

#[derive(Debug, Clone)]
pub enum FomodDependencyNode {
    Leaf(FomodDependencyLeaf),
    Composite(FomodDependencies),
}

#[derive(Debug, Clone)]
pub struct FomodDependencies {
    /// `true` = `Or`, `false` = `And` (`operator="Or"` attribute).
    pub or_operator: bool,
    pub dependencies: Vec<FomodDependencyNode>,
}

impl FomodDependencies {
    pub fn is_satisfied(&self, flags: &BTreeMap<String, String>) -> bool {
        let mut results = self.dependencies.iter().map(|d| match d {
            FomodDependencyNode::Leaf(FomodDependencyLeaf::Flag { flag, value }) => {
                flags.get(flag).map(|v| v == value).unwrap_or(value.is_empty())
            }
            FomodDependencyNode::Leaf(FomodDependencyLeaf::File { state, .. }) => {
                matches!(state, FomodDependencyState::Active)
            }
            FomodDependencyNode::Leaf(FomodDependencyLeaf::Game) => true,
            FomodDependencyNode::Composite(nested) => nested.is_satisfied(flags),
        });
        if self.or_operator {
            results.any(|r| r)
        } else {
            results.all(|r| r)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FomodType {
    NotUsable,
    CouldBeUsable,
    Optional,
    Recommended,
    Required,
}

#[derive(Debug, Clone)]
pub struct FomodPattern {
    pub dependencies: FomodDependencies,
    pub fomod_type: FomodType,
}

#[derive(Debug, Clone)]
pub struct FomodTypeDescriptor {
    pub default_type: FomodType,
    pub patterns: Vec<FomodPattern>,
}

impl FomodTypeDescriptor {
    pub fn resolve(&self, flags: &BTreeMap<String, String>) -> FomodType {
        for pattern in &self.patterns {
            if pattern.dependencies.is_satisfied(flags) {
                return pattern.fomod_type;
            }
        }
        self.default_type
    }
}

#[derive(Debug, Clone)]
pub struct FomodPlugin {
    pub name: String,
    pub description: String,
    pub files: FomodFilesAndFolders,
    pub condition_flags: Vec<(String, String)>,
    pub type_descriptor: FomodTypeDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FomodGroupSelect {
    SelectAny,
    SelectAll,
    SelectExactlyOne,
    SelectAtMostOne,
    SelectAtLeastOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FomodOrder {
    Ascending,
    Explicit,
    Descending,
}

#[derive(Debug, Clone)]
pub struct FomodGroup {
    pub name: String,
    pub select: FomodGroupSelect,
    pub order: FomodOrder,
    pub plugins: Vec<FomodPlugin>,
}

#[derive(Debug, Clone)]
pub struct FomodInstallStep {
    pub name: String,
    pub order: FomodOrder,
    pub groups: Vec<FomodGroup>,
    pub visible: Option<FomodDependencies>,
}

#[derive(Debug, Clone)]
pub struct FomodConditionalFileInstall {
    pub dependencies: FomodDependencies,
    pub files: FomodFilesAndFolders,
}

#[derive(Debug, Clone)]
pub struct FomodModuleConfig {
    pub module_name: String,
    pub module_dependencies: Option<FomodDependencies>,
    pub required_install_files: FomodFilesAndFolders,
    pub install_steps_order: FomodOrder,
    pub install_steps: Vec<FomodInstallStep>,
    pub conditional_file_installs: Vec<FomodConditionalFileInstall>,
}

/// A hashable (step, group, plugin) triple identifying one checkbox/radio
/// decision, used both as the guesser's per-decision key and as the
/// persisted `installer_params` selection list (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FomodInstallerSelection {
    pub step_name: String,
    pub group_name: String,
    pub plugin_name: String,
}
