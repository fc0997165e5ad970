//! Wires the available-files resolver onto `summon-scheduler` (spec.md
//! §4.4): joins the downloads folder cache, a companion-repo ("github")
//! folder cache, and the archive index behind one readiness barrier, and
//! fires archive-indexing tasks as a side effect for every not-yet-known
//! download with an archive-like extension.
//!
//! Grounded on `original_source/summonmm/cache/available_files.py`'s
//! `AvailableFiles.start_tasks` (own-task sequence: start hashing, start
//! file-origin lookups, hash-mapping merge, final readiness placeholder)
//! and `_github_file_retrievers_by_hash` (recover the repo-relative path by
//! matching the absolute path against each known github root).

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use summon_archive::ArchiveRegistry;
use summon_archive_index::{
    tasks::{PendingArchive, ARCHIVES_READY_TASK, READY_TO_START_HASHING_TASK},
    ArchiveDigest, ArchiveIndex, ExtraDataFactory,
};
use summon_foldercache::FileOnDisk;
use summon_paths::AbsoluteSystemPathBuf;
use summon_scheduler::{Building, Scheduler, TaskBody, TaskFailure, TaskOutput, TaskSpec, TaskTags};
use tracing::warn;

use crate::{
    model::{ArchiveHop, ArchiveRetrieval, FileRetriever},
    ResolverError,
};

pub const READY_TASK: &str = "summon.available.ownready";
const START_HASHING_TASK: &str = "summon.available.ownstarthashing";

/// One companion repository checked out under the modpack's github root
/// (spec.md §6: `githubroot`), identified by `author/project` the way
/// spec.md's modpack reference strings name it.
#[derive(Debug, Clone)]
pub struct GithubFolder {
    pub author: String,
    pub project: String,
    pub root: AbsoluteSystemPathBuf,
}

impl GithubFolder {
    fn as_str_lossy(p: &AbsoluteSystemPathBuf) -> String {
        p.as_path().to_string_lossy().to_lowercase()
    }

    fn contains(&self, path: &AbsoluteSystemPathBuf) -> bool {
        Self::as_str_lossy(path).starts_with(&Self::as_str_lossy(&self.root))
    }
}

/// The ready-to-query resolver (spec.md §4.4): a digest in, the ordered list
/// of ways to produce it out. Reachable once the scheduler has run
/// [`READY_TASK`].
pub struct AvailableFilesResolver {
    github_folders: Vec<GithubFolder>,
    github_by_hash: Arc<Mutex<HashMap<String, Vec<FileOnDisk>>>>,
    archive_index: Arc<Mutex<ArchiveIndex>>,
}

impl AvailableFilesResolver {
    /// spec.md §4.4 steps 1-3: zero first, then github, then archive chains.
    /// Github and archive retrievers are mutually exclusive buckets the way
    /// the original resolves them — the first non-empty bucket wins.
    pub fn retrievers_for(&self, digest_hex: &str) -> Result<Vec<FileRetriever>, ResolverError> {
        if digest_hex.eq_ignore_ascii_case(ArchiveDigest::EMPTY_SHA256_HEX) {
            return Ok(vec![FileRetriever::Zero]);
        }

        let github = {
            let by_hash = self
                .github_by_hash
                .lock()
                .expect("github-by-hash mutex poisoned");
            self.github_retrievers_for(&by_hash, digest_hex)?
        };
        if !github.is_empty() {
            return Ok(github);
        }

        let target = match ArchiveDigest::from_hex(digest_hex) {
            Some(d) => d,
            None => return Ok(Vec::new()),
        };
        let mut index = self
            .archive_index
            .lock()
            .expect("archive index mutex poisoned");
        let retrievals = archive_retrievals(&mut index, target);
        Ok(retrievals.into_iter().map(FileRetriever::Archive).collect())
    }

    fn github_retrievers_for(
        &self,
        by_hash: &HashMap<String, Vec<FileOnDisk>>,
        digest_hex: &str,
    ) -> Result<Vec<FileRetriever>, ResolverError> {
        let Some(files) = by_hash.get(digest_hex) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(files.len());
        for file in files {
            let folder = self
                .github_folders
                .iter()
                .find(|f| f.contains(&file.path));
            let Some(folder) = folder else {
                warn!(path = %file.path, "available: github file outside every known root, skipped");
                continue;
            };
            let from_path = file.path.anchor_at(&folder.root)?;
            out.push(FileRetriever::Github {
                author: folder.author.clone(),
                project: folder.project.clone(),
                from_path,
            });
        }
        Ok(out)
    }
}

/// Enumerates every outer→inner archive chain that produces `target`
/// (spec.md §4.4 step 3), recursing into an archive that is itself nested
/// inside another. Grounded on `available_files.py`'s
/// `_archived_file_retrievers_by_hash` / `_add_nested_archives`: a direct
/// hit is always recorded as a one-hop chain, and additionally, for every
/// way to produce the *containing archive itself*, a longer chain is
/// recorded with that chain prepended.
fn archive_retrievals(index: &mut ArchiveIndex, target: ArchiveDigest) -> Vec<ArchiveRetrieval> {
    let truncated = target.truncate();
    let hits: Vec<(ArchiveDigest, u64, summon_archive_index::FileInArchive)> = index
        .find_by_file_hash(&truncated)
        .into_iter()
        .map(|(archive, file)| (archive.archive_hash, archive.archive_size, file.clone()))
        .collect();

    let mut out = Vec::new();
    for (archive_hash, archive_size, file_in_archive) in hits {
        let target_size = file_in_archive.file_size;
        let hop = ArchiveHop {
            archive_hash,
            archive_size,
            file_in_archive,
        };
        out.push(ArchiveRetrieval {
            target_hash: target,
            target_size,
            hops: vec![hop.clone()],
        });

        for nested in archive_retrievals(index, archive_hash) {
            let mut hops = nested.hops;
            hops.push(hop.clone());
            out.push(ArchiveRetrieval {
                target_hash: target,
                target_size,
                hops,
            });
        }
    }
    out
}

/// Registers the resolver's own-task sequence and returns the resolver
/// handle. `downloads_ready`/`github_ready` are the folder-cache readiness
/// barrier names (`summon_foldercache::tasks::ready_task`); `downloads` and
/// `github` are the corresponding `FolderCache` handles.
#[allow(clippy::too_many_arguments)]
pub fn register(
    scheduler: &mut Scheduler<Building>,
    downloads_ready: &str,
    downloads: &summon_foldercache::FolderCache,
    github_ready: &str,
    github: &summon_foldercache::FolderCache,
    github_folders: Vec<GithubFolder>,
    archive_registry: Arc<ArchiveRegistry>,
    scratch_root: AbsoluteSystemPathBuf,
    extra_factories: Arc<Vec<Box<dyn ExtraDataFactory>>>,
    archive_index: Arc<Mutex<ArchiveIndex>>,
) -> Result<AvailableFilesResolver, ResolverError> {
    let downloads = downloads.all_files();
    let registry = archive_registry.clone();
    let index_for_hashing = archive_index.clone();

    let start_hashing_body: summon_scheduler::OwnerBody = Box::new(move |_ctx, handle| {
        let mut pending = Vec::new();
        {
            let index_guard = index_for_hashing
                .lock()
                .expect("archive index mutex poisoned");
            for file in downloads.values() {
                if file.path.extension().map(|e| e.eq_ignore_ascii_case("meta")) == Some(true) {
                    continue;
                }
                let digest = match ArchiveDigest::from_hex(&file.primary_digest) {
                    Some(d) => d,
                    None => continue,
                };
                if index_guard.contains(&digest) {
                    continue;
                }
                if registry.is_archive(&file.path) {
                    pending.push(PendingArchive {
                        path: file.path.clone(),
                        digest,
                        size: file.size,
                        attribution: file
                            .path
                            .file_name()
                            .unwrap_or("<unknown>")
                            .to_string(),
                    });
                } else {
                    warn!(path = %file.path, "available: file with unknown extension, ignored");
                }
            }
        }

        summon_archive_index::tasks::register_hashing_tasks(
            handle,
            registry.clone(),
            scratch_root.clone(),
            pending,
            extra_factories.clone(),
            index_for_hashing.clone(),
        )
        .map_err(|e| TaskFailure(e.to_string()))?;
        Ok(Arc::new(()) as TaskOutput)
    });

    scheduler.add_task(TaskSpec {
        name: START_HASHING_TASK.to_string(),
        deps: vec![
            downloads_ready.to_string(),
            READY_TO_START_HASHING_TASK.to_string(),
        ],
        tags: TaskTags::none(),
        weight_hint: None,
        body: TaskBody::Owner(start_hashing_body),
    })?;

    let github_by_hash = Arc::new(Mutex::new(HashMap::new()));
    let github_for_ready = github.all_files();
    let github_by_hash_for_ready = github_by_hash.clone();

    let ready_body: summon_scheduler::OwnerBody = Box::new(move |_ctx, _handle| {
        let mut by_hash = github_by_hash_for_ready
            .lock()
            .expect("github-by-hash mutex poisoned");
        for file in github_for_ready.values() {
            by_hash
                .entry(file.primary_digest.clone())
                .or_default()
                .push(file.clone());
        }
        Ok(Arc::new(()) as TaskOutput)
    });

    scheduler.add_task(TaskSpec {
        name: READY_TASK.to_string(),
        deps: vec![
            ARCHIVES_READY_TASK.to_string(),
            github_ready.to_string(),
            START_HASHING_TASK.to_string(),
        ],
        tags: TaskTags::none(),
        weight_hint: None,
        body: TaskBody::Owner(ready_body),
    })?;

    Ok(AvailableFilesResolver {
        github_folders,
        github_by_hash,
        archive_index,
    })
}

/// Name of the resolver's readiness barrier, for callers in other crates
/// (the installer guesser) that need to depend on it by name.
pub fn ready_task() -> &'static str {
    READY_TASK
}

#[cfg(test)]
mod test {
    use super::*;
    use summon_archive_index::{Archive, FileInArchive};
    use summon_paths::IntraArchivePath;

    fn digest(byte: u8) -> ArchiveDigest {
        ArchiveDigest([byte; 32])
    }

    #[test]
    fn resolves_a_single_hop_chain() {
        let mut index = ArchiveIndex::new();
        let mut archive = Archive::new(digest(1), 10, "A".to_string());
        archive.files.push(FileInArchive {
            intra_path: IntraArchivePath::new("data\\readme.txt").unwrap(),
            file_hash: digest(9).truncate(),
            file_size: 3,
        });
        index.insert(archive);

        let retrievals = archive_retrievals(&mut index, digest(9));
        assert_eq!(retrievals.len(), 1);
        assert_eq!(retrievals[0].hops.len(), 1);
        assert_eq!(retrievals[0].hops[0].archive_hash, digest(1));
    }

    #[test]
    fn resolves_a_nested_two_hop_chain() {
        let mut index = ArchiveIndex::new();

        let mut outer = Archive::new(digest(1), 100, "Outer".to_string());
        outer.files.push(FileInArchive {
            intra_path: IntraArchivePath::new("inner.7z").unwrap(),
            file_hash: digest(2).truncate(),
            file_size: 50,
        });
        index.insert(outer);

        let mut inner = Archive::new(digest(2), 50, "Outer (nested)".to_string());
        inner.files.push(FileInArchive {
            intra_path: IntraArchivePath::new("data\\x.esp").unwrap(),
            file_hash: digest(3).truncate(),
            file_size: 7,
        });
        index.insert(inner);

        let retrievals = archive_retrievals(&mut index, digest(3));
        assert_eq!(retrievals.len(), 1);
        let hops = &retrievals[0].hops;
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[0].archive_hash, digest(1));
        assert_eq!(hops[1].archive_hash, digest(2));
    }
}
