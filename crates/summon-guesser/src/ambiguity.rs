//! Stage 4 (spec.md §4.5): "For files with multiple archive retrievers,
//! first prefer an archive already required by the same mod; then an
//! archive already required by any mod." Narrows every multi-retriever
//! entry down to exactly one, so stage 2's "uniquely supplies" test sees a
//! single answer per file from here on.
//!
//! Grounded on `original_source/summonmm/commands/run_guess.py`'s ambiguity
//! pass, reshaped to walk `ModsInProgress` in place instead of mutating a
//! shared bookkeeping object method-by-method.

use std::collections::BTreeSet;

use summon_archive_index::ArchiveDigest;
use summon_resolver::ArchiveRetrieval;

use crate::model::ModsInProgress;

/// The archive that would actually need to be downloaded/present on disk to
/// realize this retrieval — the outermost hop (spec.md §4.4: "outermost to
/// innermost").
fn root_archive(retrieval: &ArchiveRetrieval) -> ArchiveDigest {
    retrieval.hops.first().map(|hop| hop.archive_hash).unwrap_or(retrieval.target_hash)
}

/// Reduces every `archive_files` entry with more than one retriever down to
/// one, in place, across every mod.
pub fn reduce_ambiguity(mods: &mut ModsInProgress) {
    let mut globally_required: BTreeSet<ArchiveDigest> = BTreeSet::new();
    for m in mods.mods.values() {
        for retrievals in m.archive_files.values() {
            if let [only] = retrievals.as_slice() {
                globally_required.insert(root_archive(only));
            }
        }
    }

    for m in mods.mods.values_mut() {
        let mut mod_required: BTreeSet<ArchiveDigest> = m
            .archive_files
            .values()
            .filter_map(|r| match r.as_slice() {
                [only] => Some(root_archive(only)),
                _ => None,
            })
            .collect();

        for retrievals in m.archive_files.values_mut() {
            if retrievals.len() <= 1 {
                continue;
            }
            let chosen_index = retrievals
                .iter()
                .position(|r| mod_required.contains(&root_archive(r)))
                .or_else(|| retrievals.iter().position(|r| globally_required.contains(&root_archive(r))))
                .unwrap_or(0);
            let chosen = retrievals[chosen_index].clone();
            let root = root_archive(&chosen);
            mod_required.insert(root);
            globally_required.insert(root);
            *retrievals = vec![chosen];
        }
    }
}

#[cfg(test)]
mod test {
    use summon_archive_index::FileInArchive;
    use summon_paths::AnchoredSystemPathBuf;
    use summon_resolver::ArchiveHop;

    use super::*;
    use crate::model::ModInProgress;

    fn retrieval(archive_byte: u8, intra: &str) -> ArchiveRetrieval {
        let archive_hash = ArchiveDigest([archive_byte; 32]);
        ArchiveRetrieval {
            target_hash: archive_hash,
            target_size: 1,
            hops: vec![ArchiveHop {
                archive_hash,
                archive_size: 100,
                file_in_archive: FileInArchive {
                    intra_path: summon_paths::IntraArchivePath::new(intra).unwrap(),
                    file_hash: archive_hash.truncate(),
                    file_size: 1,
                },
            }],
        }
    }

    #[test]
    fn prefers_an_archive_already_required_by_the_same_mod() {
        let mut mods = ModsInProgress::new();
        let m = mods.mods.entry("Mod".to_string()).or_insert_with(|| ModInProgress::new("Mod"));
        m.archive_files.insert(
            AnchoredSystemPathBuf::from_str("data\\a.esp").unwrap(),
            vec![retrieval(1, "a.esp")],
        );
        m.archive_files.insert(
            AnchoredSystemPathBuf::from_str("data\\b.esp").unwrap(),
            vec![retrieval(1, "b.esp"), retrieval(2, "b.esp")],
        );

        reduce_ambiguity(&mut mods);

        let chosen = &mods.mods["Mod"].archive_files[&AnchoredSystemPathBuf::from_str("data\\b.esp").unwrap()];
        assert_eq!(chosen.len(), 1);
        assert_eq!(root_archive(&chosen[0]), ArchiveDigest([1u8; 32]));
    }
}
