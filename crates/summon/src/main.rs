//! Entry point (spec.md §6): single-argument invocation with a project
//! config path, an initial full refresh, then the interactive command loop.
//! Grounded on `turborepo-cli/src/shim/mod.rs`'s thin-`main`-delegates-to-a-
//! `run` style: `main` only does process-level bookkeeping (log init, exit
//! code), everything else lives in `pipeline`/`repl`.

mod cli;
mod logging;
mod mo2;
mod pipeline;
mod repl;

use clap::Parser;
use summon_config::{ModpackRootConfig, ProjectConfig};

fn main() {
    let args = cli::Args::parse();

    let config = match ProjectConfig::load(&args.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load {}: {err}", args.config.display());
            std::process::exit(1);
        }
    };

    // Held for the process lifetime; dropping it stops the file-log
    // background thread from flushing.
    let _log_guard = match logging::init(config.cache.as_path(), args.verbose) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("failed to initialize logging: {err:#}");
            std::process::exit(1);
        }
    };

    std::process::exit(run(config));
}

/// Returns the process exit code (spec.md §6: "Exit code 0 on clean exit;
/// non-zero when a worker-task exception aborts the run").
fn run(config: ProjectConfig) -> i32 {
    let layout = pipeline::layout_for(&config);

    let modpack_config_path = layout.modpack_root.join("summon.json5");
    let modpack = match ModpackRootConfig::load(modpack_config_path.as_path()) {
        Ok(modpack) => modpack,
        Err(err) => {
            tracing::error!(error = %err, "failed to load modpack root config");
            return 1;
        }
    };

    tracing::info!("running initial scan/hash/resolve/guess cycle");
    let outcome = match pipeline::run(&config, &modpack, &layout) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, "initial refresh failed");
            return 1;
        }
    };

    let manifest_path = layout.modpack_root.join("project.json");
    let mut manifest = outcome.manifest;
    manifest.sort_for_persistence();
    if let Err(err) = summon_manifest::write(manifest_path.as_path(), &manifest) {
        tracing::error!(error = %err, "failed to write {manifest_path}");
        return 1;
    }
    tracing::info!(
        mods = manifest.mods.len(),
        completed_tasks = outcome.report.completed_tasks,
        "wrote {manifest_path}"
    );

    match repl::run(&config, &modpack, &layout) {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, "command loop aborted");
            1
        }
    }
}
