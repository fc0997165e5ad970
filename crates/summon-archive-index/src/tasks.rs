//! Wires the archive indexer onto `summon-scheduler`: one worker task per
//! not-yet-known archive, fanned in by a sentinel owner task. Exposes the
//! two barrier points spec.md §4.3 names explicitly: *ready-to-start-hashing*
//! (the on-disk index has been loaded) and *archives-ready* (every hash
//! worker has completed and the in-memory index is complete).

use std::sync::{Arc, Mutex};

use summon_archive::ArchiveRegistry;
use summon_paths::AbsoluteSystemPathBuf;
use summon_scheduler::{TaskBody, TaskFailure, TaskOutput, TaskRegistrar, TaskSpec, TaskTags};

use crate::{
    digest::ArchiveDigest,
    hasher::{hash_archive, new_scratch_token, ExtraDataFactory, PluginFailure},
    model::{Archive, ArchiveIndex},
};

pub const READY_TO_START_HASHING_TASK: &str = "summon.archiveindex.readytostarthashing";
pub const ARCHIVES_READY_TASK: &str = "summon.archiveindex.archivesready";
pub const HASH_TASK_PREFIX: &str = "summon.archiveindex.hash.";

/// One archive the indexer still needs to hash.
pub struct PendingArchive {
    pub path: AbsoluteSystemPathBuf,
    pub digest: ArchiveDigest,
    pub size: u64,
    pub attribution: String,
}

type HashOutput = (Vec<Archive>, Vec<PluginFailure>);

/// Registers a worker task per pending archive plus the `archives-ready`
/// sentinel owner task that merges every result into `index`/`names`
/// (held behind a mutex since owner tasks run on the single-threaded driver
/// but the merge still needs `&mut` access shared with the caller's other
/// own tasks).
pub fn register_hashing_tasks(
    scheduler: &mut impl TaskRegistrar,
    registry: Arc<ArchiveRegistry>,
    scratch_root: AbsoluteSystemPathBuf,
    pending: Vec<PendingArchive>,
    extra_factories: Arc<Vec<Box<dyn ExtraDataFactory>>>,
    index: Arc<Mutex<ArchiveIndex>>,
) -> Result<(), summon_scheduler::SchedulerError> {
    let mut hash_task_names = Vec::with_capacity(pending.len());

    for archive in pending {
        let task_name = format!("{HASH_TASK_PREFIX}{}", archive.digest.to_hex());
        hash_task_names.push(task_name.clone());

        let registry = registry.clone();
        let scratch_root = scratch_root.clone();
        let extra_factories = extra_factories.clone();

        let body: summon_scheduler::WorkerBody = Box::new(move |_ctx| {
            let mut archives_out = Vec::new();
            let mut failures_out = Vec::new();
            hash_archive(
                &registry,
                &archive.path,
                archive.digest,
                archive.size,
                &archive.attribution,
                &scratch_root,
                &new_scratch_token(),
                &extra_factories,
                &mut archives_out,
                &mut failures_out,
            )
            .map_err(|e| TaskFailure(e.to_string()))?;
            let output: HashOutput = (archives_out, failures_out);
            Ok(Arc::new(output) as TaskOutput)
        });

        scheduler.add_task(TaskSpec {
            name: task_name,
            deps: vec![READY_TO_START_HASHING_TASK.to_string()],
            tags: TaskTags::none(),
            weight_hint: None,
            body: TaskBody::Worker(body),
        })?;
    }

    let merge_body: summon_scheduler::OwnerBody = Box::new(move |ctx, _handle| {
        let mut index_guard = index.lock().expect("archive index mutex poisoned");
        for (name, output) in ctx.deps() {
            if !name.starts_with(HASH_TASK_PREFIX) {
                continue;
            }
            let (archives, _failures) = output
                .downcast_ref::<HashOutput>()
                .expect("hash task always produces a HashOutput");
            for archive in archives {
                if !index_guard.contains(&archive.archive_hash) {
                    index_guard.insert(archive.clone());
                }
            }
        }
        Ok(Arc::new(()) as TaskOutput)
    });

    let mut deps = vec![format!("{HASH_TASK_PREFIX}*")];
    deps.extend(hash_task_names);
    scheduler.add_task(TaskSpec {
        name: ARCHIVES_READY_TASK.to_string(),
        deps,
        tags: TaskTags::none(),
        weight_hint: None,
        body: TaskBody::Owner(merge_body),
    })
}
