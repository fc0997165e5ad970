//! Wires every crate in the workspace onto one scheduler run (spec.md §4.1)
//! and flattens the result into the output manifest (spec.md §6). Grounded
//! on `summon-bootstrap.py`'s "always refresh, then enter the command loop"
//! shape: every call here is one full refresh, whether it's the initial
//! bootstrap or a REPL `guess`.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use summon_archive::ArchiveRegistry;
use summon_archive_index::{
    tasks::READY_TO_START_HASHING_TASK, ArchiveDigest, ArchiveIndex, ExtraDataFactory,
};
use summon_config::{ModpackRootConfig, ProjectConfig};
use summon_foldercache::{FolderSet, FolderToCache};
use summon_guesser::{
    globaltools::GlobalToolRegistry, modtools::ModToolRegistry, patches::PatchPluginRegistry,
    plugins::InstallerPluginRegistry, run_guess, GuessInputs,
};
use summon_manifest::ProjectJson;
use summon_paths::AbsoluteSystemPathBuf;
use summon_resolver::GithubFolder;
use summon_scheduler::{
    Building, OwnerBody, Scheduler, TaskBody, TaskFailure, TaskOutput, TaskSpec, TaskTags,
};

use crate::mo2::Mo2Config;

pub struct RepoLayout {
    pub repo_root: AbsoluteSystemPathBuf,
    pub modpack_root: AbsoluteSystemPathBuf,
}

/// Resolves the `<author>/<project>[/<subpath>]` modpack reference
/// (spec.md §6) against `githubroot` into the companion repo's checkout
/// root and the (possibly nested) directory the modpack itself lives in.
pub fn layout_for(config: &ProjectConfig) -> RepoLayout {
    let repo_root = config.githubroot.join(&config.modpack.author).join(&config.modpack.project);
    let modpack_root = match &config.modpack.subpath {
        Some(sub) => repo_root.join(sub),
        None => repo_root.clone(),
    };
    RepoLayout { repo_root, modpack_root }
}

pub struct PipelineOutcome {
    pub manifest: ProjectJson,
    pub report: summon_scheduler::RunReport,
}

/// Runs one full scan -> hash -> resolve -> guess cycle and returns the
/// resulting manifest. Every folder cache, the archive index, and the
/// resolver are rebuilt from their persisted state each call rather than
/// kept alive across REPL commands — simpler than threading live handles
/// through the REPL loop, and cheap because the caches are incremental
/// (spec.md §4.2/§4.3: unchanged files are never re-hashed).
pub fn run(config: &ProjectConfig, modpack: &ModpackRootConfig, layout: &RepoLayout) -> anyhow::Result<PipelineOutcome> {
    let mut scheduler = Scheduler::<Building>::new();
    let cache_dir = config.cache.as_path();

    let archive_registry = Arc::new(ArchiveRegistry::new());
    let archive_index = Arc::new(Mutex::new(ArchiveIndex::new()));
    register_index_load(&mut scheduler, archive_index.clone(), layout.modpack_root.join("known-archives.json"))?;

    let downloads_folders = FolderSet::new(config.downloads.iter().cloned().map(FolderToCache::new).collect())?;
    let downloads = summon_foldercache::register(
        &mut scheduler,
        "downloads",
        downloads_folders,
        cache_dir.join("foldercache.downloads.json"),
        cache_dir.join("foldercache.downloads.scan-stats.json"),
        Vec::new(),
        Vec::new(),
    )?;
    let downloads_ready = summon_foldercache::tasks::ready_task("downloads");

    let github_folders_to_scan = FolderSet::new(vec![FolderToCache::new(config.githubroot.clone())])?;
    let github = summon_foldercache::register(
        &mut scheduler,
        "github",
        github_folders_to_scan,
        cache_dir.join("foldercache.github.json"),
        cache_dir.join("foldercache.github.scan-stats.json"),
        Vec::new(),
        Vec::new(),
    )?;
    let github_ready = summon_foldercache::tasks::ready_task("github");

    let mut github_folders = vec![GithubFolder {
        author: config.modpack.author.clone(),
        project: config.modpack.project.clone(),
        root: layout.repo_root.clone(),
    }];
    for dep in &modpack.dependencies {
        github_folders.push(GithubFolder {
            author: dep.author.clone(),
            project: dep.project.clone(),
            root: config.githubroot.join(&dep.author).join(&dep.project),
        });
    }

    let scratch_root = config.tmp.clone();
    let extra_factories: Arc<Vec<Box<dyn ExtraDataFactory>>> = Arc::new(Vec::new());

    let resolver = summon_resolver::register(
        &mut scheduler,
        &downloads_ready,
        &downloads,
        &github_ready,
        &github,
        github_folders,
        archive_registry.clone(),
        scratch_root.clone(),
        extra_factories,
        archive_index.clone(),
    )?;

    let mo2 = match config.modmanager.as_str() {
        "mo2" => {
            let section = config.modmanager_config.get("mo2").cloned().unwrap_or(serde_json::Value::Null);
            Some(Mo2Config::load(&section)?)
        }
        other => {
            tracing::warn!(modmanager = other, "no adapter registered for this modmanager; guessing is limited to already-resolved files");
            None
        }
    };

    let mut mod_caches = Vec::new();
    if let Some(mo2) = &mo2 {
        for mod_name in &mo2.enabled_mods {
            let root = mo2.mod_root(mod_name);
            let cache_name = format!("mod.{mod_name}");
            let cache = summon_foldercache::register(
                &mut scheduler,
                &cache_name,
                FolderSet::new(vec![FolderToCache::new(root.clone())])?,
                cache_dir.join(format!("foldercache.{cache_name}.json")),
                cache_dir.join(format!("foldercache.{cache_name}.scan-stats.json")),
                Vec::new(),
                Vec::new(),
            )?;
            mod_caches.push((mod_name.clone(), cache, root));
        }
    }

    let sealed = scheduler.seal()?;
    let report = sealed.run(cache_dir, &[])?;

    let mut retrievers = BTreeMap::new();
    let mut target_digests = BTreeMap::new();
    let mut mod_roots = BTreeMap::new();
    for (mod_name, cache, root) in &mod_caches {
        let files = cache.all_files();
        let mut per_mod_retrievers = BTreeMap::new();
        let mut per_mod_targets = BTreeMap::new();
        for (path, file) in &files {
            let anchored = path.anchor_at(root)?;
            let retrs = resolver.retrievers_for(&file.primary_digest)?;
            per_mod_retrievers.insert(anchored.clone(), retrs);
            if let Some(digest) = ArchiveDigest::from_hex(&file.primary_digest) {
                per_mod_targets.insert(anchored, digest.truncate());
            }
        }
        retrievers.insert(mod_name.clone(), per_mod_retrievers);
        target_digests.insert(mod_name.clone(), per_mod_targets);
        mod_roots.insert(mod_name.clone(), root.clone());
    }

    let mut archive_paths_on_disk = BTreeMap::new();
    {
        let index_guard = archive_index.lock().expect("archive index mutex poisoned");
        for file in downloads.all_files().values() {
            if let Some(digest) = ArchiveDigest::from_hex(&file.primary_digest) {
                if index_guard.contains(&digest) {
                    archive_paths_on_disk.insert(digest, file.path.clone());
                }
            }
        }
    }

    let ignore_patterns = modpack
        .ignorepatterns
        .iter()
        .map(|p| regex::Regex::new(p))
        .collect::<Result<Vec<_>, _>>()?;

    let index_guard = archive_index.lock().expect("archive index mutex poisoned");
    let inputs = GuessInputs {
        retrievers,
        target_digests,
        mod_roots,
        archive_index: &index_guard,
        archive_registry: archive_registry.as_ref(),
        archive_paths_on_disk,
        scratch_root,
        ignore_patterns,
        installer_plugins: InstallerPluginRegistry::new(),
        mod_tool_plugins: ModToolRegistry::new(),
        global_tool_plugins: GlobalToolRegistry::new(),
        patch_plugins: PatchPluginRegistry::new(),
    };
    let mods_in_progress = run_guess(inputs);
    drop(index_guard);

    let manifest = summon_guesser::to_project_json(&mods_in_progress);
    Ok(PipelineOutcome { manifest, report })
}

fn register_index_load(
    scheduler: &mut Scheduler<Building>,
    archive_index: Arc<Mutex<ArchiveIndex>>,
    known_archives_path: AbsoluteSystemPathBuf,
) -> anyhow::Result<()> {
    let body: OwnerBody = Box::new(move |_ctx, _handle| {
        let loaded = summon_archive_index::persist::load_known_archives(known_archives_path.as_path())
            .map_err(|e| TaskFailure(e.to_string()))?;
        *archive_index.lock().expect("archive index mutex poisoned") = loaded;
        Ok(Arc::new(()) as TaskOutput)
    });
    scheduler.add_task(TaskSpec {
        name: READY_TO_START_HASHING_TASK.to_string(),
        deps: Vec::new(),
        tags: TaskTags::none(),
        weight_hint: None,
        body: TaskBody::Owner(body),
    })?;
    Ok(())
}
