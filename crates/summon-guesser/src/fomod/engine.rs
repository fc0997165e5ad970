//! Replays a fixed set of FOMOD selections against a module config,
//! producing the resulting file list (spec.md §4.6's runtime semantics).
//!
//! Grounded on `original_source/summonmm/plugins/arinstaller/_fomod/fomod_engine.py`'s
//! `FomodEngine.run()`: step/group/plugin order is walked once, a step is
//! skipped when its `visible` dependency fails against the flags
//! accumulated so far, and each checked plugin merges its files and sets
//! its condition flags before the next step is evaluated. `autoplay` here
//! corresponds to the original's `FomodAutoinstallFakeUI`: membership in a
//! fixed selection set decides each plugin, no forking.

use std::collections::{BTreeMap, BTreeSet};

use super::model::{
    FomodFilesAndFolders, FomodGroup, FomodInstallStep, FomodInstallerSelection,
    FomodModuleConfig, FomodOrder, FomodPlugin,
};

fn ordered<'a, T>(order: FomodOrder, items: &'a [T], name_of: impl Fn(&T) -> &str) -> Vec<&'a T> {
    let mut out: Vec<&T> = items.iter().collect();
    match order {
        FomodOrder::Explicit => {}
        FomodOrder::Ascending => out.sort_by(|a, b| name_of(a).to_lowercase().cmp(&name_of(b).to_lowercase())),
        FomodOrder::Descending => {
            out.sort_by(|a, b| name_of(b).to_lowercase().cmp(&name_of(a).to_lowercase()))
        }
    }
    out
}

pub fn ordered_steps(config: &FomodModuleConfig) -> Vec<&FomodInstallStep> {
    ordered(config.install_steps_order, &config.install_steps, |s| s.name.as_str())
}

pub fn ordered_groups(step: &FomodInstallStep) -> Vec<&FomodGroup> {
    ordered(step.order, &step.groups, |g| g.name.as_str())
}

pub fn ordered_plugins(group: &FomodGroup) -> Vec<&FomodPlugin> {
    ordered(group.order, &group.plugins, |p| p.name.as_str())
}

/// Replays `selections` through the module config, in declared step/group/
/// plugin order, accumulating condition flags as it goes. This is the one
/// place flag-dependent visibility and conditional file installs get
/// resolved — both the guesser's forking search and its final autoplay
/// pass route through it.
pub fn run_with_selections(
    config: &FomodModuleConfig,
    selections: &BTreeSet<FomodInstallerSelection>,
) -> FomodFilesAndFolders {
    let mut flags: BTreeMap<String, String> = BTreeMap::new();
    let mut files = config.required_install_files.clone();

    for step in ordered_steps(config) {
        if let Some(dep) = &step.visible {
            if !dep.is_satisfied(&flags) {
                continue;
            }
        }
        for group in ordered_groups(step) {
            for plugin in ordered_plugins(&group) {
                let selection = FomodInstallerSelection {
                    step_name: step.name.clone(),
                    group_name: group.name.clone(),
                    plugin_name: plugin.name.clone(),
                };
                if selections.contains(&selection) {
                    files.extend(&plugin.files);
                    for (flag, value) in &plugin.condition_flags {
                        flags.insert(flag.clone(), value.clone());
                    }
                }
            }
        }
    }

    for cfi in &config.conditional_file_installs {
        if cfi.dependencies.is_satisfied(&flags) {
            files.extend(&cfi.files);
        }
    }

    files
}
