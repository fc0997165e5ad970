//! The forking FOMOD guesser (spec.md §4.6, "Guessing"): simulate legal
//! selection combinations against a module config and score each against a
//! mod's known file digests, without enumerating the full combinatorial
//! space.
//!
//! Grounded on `original_source/summonmm/plugins/arinstaller/_fomod/fomod_guess.py`'s
//! `FomodGuesser`: independent choices (a `SelectExactlyOne` group whose
//! plugins carry no condition flags) never influence step visibility, so
//! they are scored after the fact instead of forked; forking choices are
//! walked depth-first, one fork per legal selection set of each group that
//! *can* affect a later step, capped so a pathological module config can't
//! blow up the search.

use std::collections::{BTreeMap, BTreeSet};

use summon_archive_index::{FileInArchive, TruncatedDigest};
use summon_paths::IntraArchivePath;

use super::engine::{ordered_groups, ordered_plugins, ordered_steps};
use super::model::{
    FomodFilesAndFolders, FomodGroup, FomodGroupSelect, FomodInstallStep, FomodInstallerSelection,
    FomodModuleConfig, FomodPlugin,
};

/// spec.md §4.6: "Hard cap (~50 000 forks)". Once the search has spent this
/// many branch points it stops opening new ones — the forks already queued
/// still finish, but the attempt is effectively aborted for the rest of the
/// tree (documented heuristic, not an exhaustive guarantee).
const MAX_FORKS: usize = 50_000;

/// One completed depth-first replay: every forking selection made, and the
/// flag state once the last step was evaluated (used to apply conditional
/// file installs, exactly like [`super::engine::run_with_selections`]).
struct ForkOutcome {
    forking_selected: BTreeSet<FomodInstallerSelection>,
    independent: Vec<IndependentChoice>,
}

/// An undecided `SelectExactlyOne` group with no condition flags: its pick
/// cannot change any later step's visibility, so instead of forking over it
/// we defer the decision until we can score each candidate against the
/// target files (spec.md §4.6).
struct IndependentChoice {
    step_name: String,
    group_name: String,
    candidates: Vec<(String, FomodFilesAndFolders)>,
}

fn is_independent_group(group: &FomodGroup) -> bool {
    group.select == FomodGroupSelect::SelectExactlyOne
        && group.plugins.iter().all(|p| p.condition_flags.is_empty())
}

/// Every legal subset of plugin indices a group's selection rule permits
/// (spec.md §4.6: `Any, All, ExactlyOne, AtMostOne, AtLeastOne`).
fn legal_selections(group: &FomodGroup, plugins: &[&FomodPlugin]) -> Vec<Vec<usize>> {
    let n = plugins.len();
    match group.select {
        FomodGroupSelect::SelectAll => vec![(0..n).collect()],
        FomodGroupSelect::SelectExactlyOne => (0..n).map(|i| vec![i]).collect(),
        FomodGroupSelect::SelectAtMostOne => {
            let mut out = vec![Vec::new()];
            out.extend((0..n).map(|i| vec![i]));
            out
        }
        FomodGroupSelect::SelectAny => powerset(n),
        FomodGroupSelect::SelectAtLeastOne => powerset(n).into_iter().filter(|s| !s.is_empty()).collect(),
    }
}

/// Capped at 20 plugins — beyond that a `SelectAny`/`SelectAtLeastOne`
/// group's powerset alone would exceed [`MAX_FORKS`]; plugins past the cap
/// are simply never offered, on top of the fork-count abort this guards.
fn powerset(n: usize) -> Vec<Vec<usize>> {
    let capped = n.min(20);
    let mut out = Vec::with_capacity(1usize << capped);
    for mask in 0u32..(1u32 << capped) {
        let mut subset = Vec::new();
        for i in 0..capped {
            if mask & (1 << i) != 0 {
                subset.push(i);
            }
        }
        out.push(subset);
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn walk(
    steps: &[&FomodInstallStep],
    step_i: usize,
    flags: BTreeMap<String, String>,
    forking: BTreeSet<FomodInstallerSelection>,
    independent: Vec<IndependentChoice>,
    budget: &mut usize,
    out: &mut Vec<ForkOutcome>,
) {
    if out.len() >= MAX_FORKS {
        return;
    }
    let Some(step) = steps.get(step_i) else {
        out.push(ForkOutcome { forking_selected: forking, independent });
        return;
    };
    if let Some(dep) = &step.visible {
        if !dep.is_satisfied(&flags) {
            walk(steps, step_i + 1, flags, forking, independent, budget, out);
            return;
        }
    }
    walk_groups(steps, step_i, 0, flags, forking, independent, budget, out);
}

#[allow(clippy::too_many_arguments)]
fn walk_groups(
    steps: &[&FomodInstallStep],
    step_i: usize,
    group_i: usize,
    flags: BTreeMap<String, String>,
    forking: BTreeSet<FomodInstallerSelection>,
    mut independent: Vec<IndependentChoice>,
    budget: &mut usize,
    out: &mut Vec<ForkOutcome>,
) {
    let step = steps[step_i];
    let groups = ordered_groups(step);
    let Some(group) = groups.get(group_i) else {
        walk(steps, step_i + 1, flags, forking, independent, budget, out);
        return;
    };
    let plugins = ordered_plugins(group);

    if is_independent_group(group) {
        independent.push(IndependentChoice {
            step_name: step.name.clone(),
            group_name: group.name.clone(),
            candidates: plugins
                .iter()
                .map(|p| (p.name.clone(), p.files.clone()))
                .collect(),
        });
        walk_groups(steps, step_i, group_i + 1, flags, forking, independent, budget, out);
        return;
    }

    let selections = legal_selections(group, &plugins);
    if selections.len() > 1 {
        if *budget == 0 {
            return;
        }
        *budget -= 1;
    }

    for selection in selections {
        if out.len() >= MAX_FORKS {
            return;
        }
        let mut next_flags = flags.clone();
        let mut next_forking = forking.clone();
        for &idx in &selection {
            let plugin = plugins[idx];
            next_forking.insert(FomodInstallerSelection {
                step_name: step.name.clone(),
                group_name: group.name.clone(),
                plugin_name: plugin.name.clone(),
            });
            for (flag, value) in &plugin.condition_flags {
                next_flags.insert(flag.clone(), value.clone());
            }
        }
        walk_groups(
            steps,
            step_i,
            group_i + 1,
            next_flags,
            next_forking,
            independent.clone(),
            budget,
            out,
        );
    }
}

fn normalize(raw: &str) -> String {
    raw.replace('/', "\\").to_lowercase()
}

/// Resolves `files` against the archive's flat listing, keyed by normalized
/// destination path, joined with the `FileInArchive` each resolved source
/// path actually is (spec.md §4.6: "Resolve the install list to concrete
/// archive entries").
fn resolve_against_archive(
    files: &FomodFilesAndFolders,
    archive_paths: &[IntraArchivePath],
    archive_by_path: &BTreeMap<IntraArchivePath, FileInArchive>,
) -> BTreeMap<String, FileInArchive> {
    let resolved = files.resolve(archive_paths);
    let mut out = BTreeMap::new();
    for (dst, (src, _priority)) in resolved {
        let Ok(src_path) = IntraArchivePath::new(&src) else { continue };
        if let Some(file) = archive_by_path.get(&src_path) {
            out.insert(normalize(&dst), file.clone());
        }
    }
    out
}

fn score_against(
    produced: &BTreeMap<String, FileInArchive>,
    target: &BTreeMap<String, TruncatedDigest>,
) -> usize {
    produced
        .iter()
        .filter(|(dst, file)| target.get(*dst).is_some_and(|h| h == &file.file_hash))
        .count()
}

/// Result of a completed guess: the selection the engine would need to
/// autoplay to reproduce `files`, plus the score it achieved against the
/// target mod.
pub struct FomodGuess {
    pub selections: BTreeSet<FomodInstallerSelection>,
    pub files: BTreeMap<String, FileInArchive>,
    pub score: usize,
}

/// Simulates every legal selection combination (within the fork cap) and
/// returns the one that best explains `target` — the mod's `normalized dst
/// path -> expected truncated digest` map (spec.md §4.6: "Score = number of
/// VFS files correctly produced; prefer higher score, break ties by smaller
/// total produced set").
pub fn guess(
    config: &FomodModuleConfig,
    archive_paths: &[IntraArchivePath],
    archive_by_path: &BTreeMap<IntraArchivePath, FileInArchive>,
    target: &BTreeMap<String, TruncatedDigest>,
) -> Option<FomodGuess> {
    let steps = ordered_steps(config);
    let mut budget = MAX_FORKS;
    let mut outcomes = Vec::new();
    walk(&steps, 0, BTreeMap::new(), BTreeSet::new(), Vec::new(), &mut budget, &mut outcomes);

    let mut best: Option<FomodGuess> = None;
    for outcome in outcomes {
        let mut selected = super::engine::run_with_selections(config, &outcome.forking_selected);

        let mut final_selections = outcome.forking_selected.clone();
        for choice in &outcome.independent {
            let mut winner: Option<(usize, usize, &str, &FomodFilesAndFolders)> = None;
            for (name, candidate_files) in &choice.candidates {
                let produced = resolve_against_archive(candidate_files, archive_paths, archive_by_path);
                let hit = score_against(&produced, target);
                let better = match winner {
                    None => true,
                    Some((best_hit, best_len, _, _)) => {
                        hit > best_hit || (hit == best_hit && produced.len() < best_len)
                    }
                };
                if better {
                    winner = Some((hit, produced.len(), name.as_str(), candidate_files));
                }
            }
            if let Some((_, _, name, files)) = winner {
                final_selections.insert(FomodInstallerSelection {
                    step_name: choice.step_name.clone(),
                    group_name: choice.group_name.clone(),
                    plugin_name: name.to_string(),
                });
                selected.extend(files);
            }
        }

        let produced = resolve_against_archive(&selected, archive_paths, archive_by_path);
        let score = score_against(&produced, target);

        let better = match &best {
            None => true,
            Some(current) => score > current.score || (score == current.score && produced.len() < current.files.len()),
        };
        if better {
            best = Some(FomodGuess { selections: final_selections, files: produced, score });
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fomod::model::*;

    fn digest(byte: u8) -> TruncatedDigest {
        TruncatedDigest([byte; 9])
    }

    fn plugin(name: &str, src: &str, dst: &str, flags: Vec<(&str, &str)>) -> FomodPlugin {
        FomodPlugin {
            name: name.to_string(),
            description: String::new(),
            files: FomodFilesAndFolders {
                files: vec![FomodSrcDst {
                    src: src.to_string(),
                    dst: dst.to_string(),
                    priority: 0,
                    always_install: false,
                    install_if_usable: false,
                }],
                folders: Vec::new(),
            },
            condition_flags: flags.into_iter().map(|(f, v)| (f.to_string(), v.to_string())).collect(),
            type_descriptor: FomodTypeDescriptor { default_type: FomodType::Optional, patterns: Vec::new() },
        }
    }

    fn config_with_one_exactly_one_group() -> FomodModuleConfig {
        let group = FomodGroup {
            name: "Choice".to_string(),
            select: FomodGroupSelect::SelectExactlyOne,
            order: FomodOrder::Explicit,
            plugins: vec![
                plugin("A", "a.esp", "data\\a.esp", vec![]),
                plugin("B", "b.esp", "data\\a.esp", vec![]),
            ],
        };
        let step = FomodInstallStep {
            name: "Step1".to_string(),
            order: FomodOrder::Explicit,
            groups: vec![group],
            visible: None,
        };
        FomodModuleConfig {
            module_name: "Test".to_string(),
            module_dependencies: None,
            required_install_files: FomodFilesAndFolders::default(),
            install_steps_order: FomodOrder::Explicit,
            install_steps: vec![step],
            conditional_file_installs: Vec::new(),
        }
    }

    #[test]
    fn picks_the_independent_candidate_that_matches_the_target() {
        let config = config_with_one_exactly_one_group();
        let archive_paths = vec![
            IntraArchivePath::new("a.esp").unwrap(),
            IntraArchivePath::new("b.esp").unwrap(),
        ];
        let mut archive_by_path = BTreeMap::new();
        archive_by_path.insert(
            IntraArchivePath::new("a.esp").unwrap(),
            FileInArchive { intra_path: IntraArchivePath::new("a.esp").unwrap(), file_hash: digest(1), file_size: 1 },
        );
        archive_by_path.insert(
            IntraArchivePath::new("b.esp").unwrap(),
            FileInArchive { intra_path: IntraArchivePath::new("b.esp").unwrap(), file_hash: digest(2), file_size: 1 },
        );
        let mut target = BTreeMap::new();
        target.insert("data\\a.esp".to_string(), digest(2));

        let result = guess(&config, &archive_paths, &archive_by_path, &target).unwrap();
        assert_eq!(result.score, 1);
        assert!(result.selections.iter().any(|s| s.plugin_name == "B"));
    }
}
