//! Stage 3 (spec.md §4.5): when more than one recipe applies to a mod,
//! decide the order they apply in by which recipe's output actually
//! survived in the VFS, and refuse to guess when that's contradictory.
//!
//! Grounded on `summon-scheduler::cycle`'s cycle-detection shape, generalized
//! from a hand-rolled DFS over `HashMap<String, Node>` to `petgraph`'s
//! `tarjan_scc` over a small per-mod graph — petgraph is already a workspace
//! dependency for the scheduler, so reusing it here instead of hand-rolling
//! a second cycle detector is the natural fit. Matches the FOMOD-cycle Open
//! Question already settled in `DESIGN.md`: a cycle aborts the mod with a
//! diagnostic rather than picking an arbitrary order.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::DiGraph;

use crate::model::InstallFrom;
use crate::GuesserError;

/// For files both recipes would install, the one whose install actually
/// matches the VFS (is in `details.files`) is taken to "override" the
/// other for that file — it must run after, so its write is the one left
/// standing in overwrite order.
fn overrides(a: &InstallFrom, b: &InstallFrom) -> bool {
    a.details
        .files
        .keys()
        .any(|path| b.details.files.contains_key(path) || b.details.skip.contains(path))
}

/// Topologically orders `recipes` so that whichever recipe's file actually
/// survived in the VFS is applied last for every file more than one recipe
/// touches. Returns [`GuesserError::RecipeOrderingCycle`] if the "overrides"
/// relation isn't a DAG.
pub fn order_recipes(mod_name: &str, recipes: Vec<InstallFrom>) -> Result<Vec<InstallFrom>, GuesserError> {
    if recipes.len() <= 1 {
        return Ok(recipes);
    }

    let mut graph = DiGraph::<usize, ()>::new();
    let nodes: Vec<_> = (0..recipes.len()).map(|i| graph.add_node(i)).collect();

    for i in 0..recipes.len() {
        for j in 0..recipes.len() {
            if i == j {
                continue;
            }
            if overrides(&recipes[j], &recipes[i]) {
                // recipes[j] must apply after recipes[i]: edge i -> j.
                graph.add_edge(nodes[i], nodes[j], ());
            }
        }
    }

    if tarjan_scc(&graph).iter().any(|scc| scc.len() > 1) {
        return Err(GuesserError::RecipeOrderingCycle(mod_name.to_string()));
    }

    // No cycle (checked above), so `toposort` can't fail.
    let order = toposort(&graph, None).expect("cycle already ruled out");

    let mut recipes: Vec<Option<InstallFrom>> = recipes.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .map(|node| recipes[node.index()].take().expect("each index visited once"))
        .collect())
}

#[cfg(test)]
mod test {
    use serde_json::json;
    use summon_archive_index::{ArchiveDigest, FileInArchive, TruncatedDigest};
    use summon_paths::AnchoredSystemPathBuf;

    use super::*;
    use crate::model::ArInstallerDetails;

    fn recipe(digest_byte: u8, files: &[(&str, bool)]) -> InstallFrom {
        let mut details = ArInstallerDetails::default();
        for (path, matches) in files {
            let anchored = AnchoredSystemPathBuf::from_str(*path).unwrap();
            let file = FileInArchive {
                intra_path: summon_paths::IntraArchivePath::new(*path).unwrap(),
                file_hash: TruncatedDigest([digest_byte; 9]),
                file_size: 1,
            };
            if *matches {
                details.files.insert(anchored, file);
            } else {
                details.skip.insert(anchored);
            }
        }
        InstallFrom {
            archive_digest: ArchiveDigest([digest_byte; 32]),
            plugin_name: "simpleunpack".to_string(),
            params: json!({}),
            details,
        }
    }

    #[test]
    fn single_recipe_is_unchanged() {
        let recipes = vec![recipe(1, &[("a.esp", true)])];
        let ordered = order_recipes("Mod", recipes).unwrap();
        assert_eq!(ordered.len(), 1);
    }

    #[test]
    fn later_recipe_whose_file_survived_applies_last() {
        // b overwrites a's file, and b's copy is the one that matches the VFS.
        let a = recipe(1, &[("data\\a.esp", false)]);
        let b = recipe(2, &[("data\\a.esp", true)]);
        let ordered = order_recipes("Mod", vec![b.clone(), a.clone()]).unwrap();
        assert_eq!(ordered.last().unwrap().archive_digest, b.archive_digest);
    }

    #[test]
    fn mutual_override_is_a_cycle() {
        let a = recipe(1, &[("data\\a.esp", true), ("data\\b.esp", false)]);
        let b = recipe(2, &[("data\\a.esp", false), ("data\\b.esp", true)]);
        let err = order_recipes("Mod", vec![a, b]).unwrap_err();
        assert!(matches!(err, GuesserError::RecipeOrderingCycle(name) if name == "Mod"));
    }
}
