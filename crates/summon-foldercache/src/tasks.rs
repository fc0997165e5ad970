//! Wires a folder cache onto `summon-scheduler`: one worker task per
//! `FolderToCache`, fanned in by a named readiness barrier (spec.md §4.2:
//! "folder caches expose a single named barrier task other pipeline stages
//! depend on"), followed by a save task that persists the reconciled state.
//!
//! Grounded on `summon-archive-index::tasks` for the worker-fan-in-owner
//! shape, and on `original_source/summonmm/cache/folder_cache.py`'s
//! `FolderCache.start` (scan, reconcile against the loaded map by deleting
//! paths no longer observed, then save).

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use summon_paths::AbsoluteSystemPathBuf;
use summon_scheduler::{TaskBody, TaskFailure, TaskOutput, TaskSpec, TaskTags};

use crate::{
    model::{FileOnDisk, FolderSet},
    persist,
    scan::scan_folder,
};

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// A running folder cache: the merged, reconciled file map, reachable once
/// the scheduler has run [`FOLDER_CACHE_READY_TASK`] for this cache name.
pub struct FolderCache {
    files: Arc<Mutex<BTreeMap<AbsoluteSystemPathBuf, FileOnDisk>>>,
}

impl FolderCache {
    pub fn all_files(&self) -> BTreeMap<AbsoluteSystemPathBuf, FileOnDisk> {
        self.files.lock().expect("folder cache mutex poisoned").clone()
    }

    pub fn by_path(&self, path: &AbsoluteSystemPathBuf) -> Option<FileOnDisk> {
        self.files
            .lock()
            .expect("folder cache mutex poisoned")
            .get(path)
            .cloned()
    }

    pub fn by_digest(&self, digest: &str) -> Vec<FileOnDisk> {
        self.files
            .lock()
            .expect("folder cache mutex poisoned")
            .values()
            .filter(|f| f.primary_digest == digest)
            .cloned()
            .collect()
    }
}

/// Groups `files` by primary digest, the shape a resolver needs to answer
/// "which on-disk files have this hash" without re-scanning on every query.
pub fn index_by_digest(
    files: &BTreeMap<AbsoluteSystemPathBuf, FileOnDisk>,
) -> std::collections::HashMap<String, Vec<FileOnDisk>> {
    let mut out: std::collections::HashMap<String, Vec<FileOnDisk>> = std::collections::HashMap::new();
    for file in files.values() {
        out.entry(file.primary_digest.clone()).or_default().push(file.clone());
    }
    out
}

fn scan_task_name(name: &str, idx: usize) -> String {
    format!("summon.foldercache.{}.scan.{idx}", sanitize(name))
}

fn ready_task_name(name: &str) -> String {
    format!("summon.foldercache.{}.ready", sanitize(name))
}

fn save_task_name(name: &str) -> String {
    format!("summon.foldercache.{}.save", sanitize(name))
}

/// Registers the scan/reconcile/save pipeline for one named folder cache.
/// `cache_path` and `stats_path` are where the two persisted artifacts live;
/// `deps` lets a caller gate the scan behind e.g. a config-load task.
pub fn register(
    scheduler: &mut summon_scheduler::Scheduler<summon_scheduler::Building>,
    name: &str,
    folders: FolderSet,
    cache_path: std::path::PathBuf,
    stats_path: std::path::PathBuf,
    auxiliary_algorithms: Vec<String>,
    deps: Vec<String>,
) -> Result<FolderCache, summon_scheduler::SchedulerError> {
    let previous = Arc::new(persist::load_files(&cache_path).unwrap_or_default());
    let merged = Arc::new(Mutex::new(BTreeMap::new()));
    let stats_merged = Arc::new(Mutex::new(crate::model::ScanStats::default()));

    let mut scan_task_names = Vec::new();

    for (idx, folder) in folders.folders().iter().cloned().enumerate() {
        let task_name = scan_task_name(name, idx);
        scan_task_names.push(task_name.clone());
        let previous = previous.clone();
        let auxiliary_algorithms = auxiliary_algorithms.clone();

        let body: summon_scheduler::WorkerBody = Box::new(move |_ctx| {
            let (fresh, stats) = scan_folder(&folder, &previous, &auxiliary_algorithms)
                .map_err(|e| TaskFailure(e.to_string()))?;
            let output: (BTreeMap<AbsoluteSystemPathBuf, FileOnDisk>, crate::model::ScanStats) =
                (fresh, stats);
            Ok(Arc::new(output) as TaskOutput)
        });

        scheduler.add_task(TaskSpec {
            name: task_name,
            deps: deps.clone(),
            tags: TaskTags::none(),
            weight_hint: None,
            body: TaskBody::Worker(body),
        })?;
    }

    let ready_name = ready_task_name(name);
    let merged_for_ready = merged.clone();
    let stats_for_ready = stats_merged.clone();
    let observed_paths: Arc<Mutex<std::collections::BTreeSet<AbsoluteSystemPathBuf>>> =
        Arc::new(Mutex::new(std::collections::BTreeSet::new()));
    let observed_for_ready = observed_paths.clone();
    let scan_prefix = format!("summon.foldercache.{}.scan.", sanitize(name));

    let merge_body: summon_scheduler::OwnerBody = Box::new(move |ctx, _handle| {
        let mut merged_guard = merged_for_ready.lock().expect("folder cache mutex poisoned");
        let mut stats_guard = stats_for_ready.lock().expect("folder cache mutex poisoned");
        let mut observed_guard = observed_for_ready.lock().expect("folder cache mutex poisoned");
        for (task_name, output) in ctx.deps() {
            if !task_name.starts_with(&scan_prefix) {
                continue;
            }
            let (fresh, stats) = output
                .downcast_ref::<(BTreeMap<AbsoluteSystemPathBuf, FileOnDisk>, crate::model::ScanStats)>()
                .expect("scan task always produces (files, stats)");
            for (path, file) in fresh {
                observed_guard.insert(path.clone());
                merged_guard.insert(path.clone(), file.clone());
            }
            for (root, dirs) in &stats.0 {
                for (dir, count) in dirs {
                    stats_guard.record(root, dir, *count);
                }
            }
        }
        // Reconciliation: anything in the loaded map but no longer observed
        // on disk this run has been deleted (spec.md §4.2).
        merged_guard.retain(|path, _| observed_guard.contains(path));
        Ok(Arc::new(()) as TaskOutput)
    });

    let mut ready_deps = vec![format!("summon.foldercache.{}.scan.*", sanitize(name))];
    ready_deps.extend(scan_task_names);
    scheduler.add_task(TaskSpec {
        name: ready_name.clone(),
        deps: ready_deps,
        tags: TaskTags::none(),
        weight_hint: None,
        body: TaskBody::Owner(merge_body),
    })?;

    let save_merged = merged.clone();
    let save_stats = stats_merged.clone();
    let save_body: summon_scheduler::WorkerBody = Box::new(move |_ctx| {
        let files = save_merged.lock().expect("folder cache mutex poisoned").clone();
        let stats = save_stats.lock().expect("folder cache mutex poisoned").clone();
        persist::save_files(&cache_path, &files).map_err(|e| TaskFailure(e.to_string()))?;
        persist::save_scan_stats(&stats_path, &stats).map_err(|e| TaskFailure(e.to_string()))?;
        Ok(Arc::new(()) as TaskOutput)
    });

    scheduler.add_task(TaskSpec {
        name: save_task_name(name),
        deps: vec![ready_name],
        tags: TaskTags::none(),
        weight_hint: None,
        body: TaskBody::Worker(save_body),
    })?;

    Ok(FolderCache { files: merged })
}

/// Name of the readiness barrier task for a given cache name, for callers
/// in other crates (e.g. `summon-resolver`) that need to depend on it
/// without linking against this module's internals.
pub fn ready_task(name: &str) -> String {
    ready_task_name(name)
}
