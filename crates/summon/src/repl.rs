//! The interactive command loop (spec.md §6: `h|help`, `x|exit`,
//! `github.install <author>/<project>[/<sub>]`, `guess`).

use std::io::Write;

use summon_config::{ModpackRootConfig, ProjectConfig};

use crate::pipeline::{self, RepoLayout};

const HELP: &str = "\
Commands:
  h, help                                show this message
  x, exit                                leave the command loop
  github.install <author>/<project>[/<sub>]   clone a companion repo under githubroot
  guess                                  rerun scan/hash/resolve/guess and write project.json
";

/// Runs the command loop to completion; returns `Ok(())` on a clean `exit`.
/// A worker-task exception during `guess` is logged and surfaced to the
/// user, but does not itself end the session — only `exit`/EOF does
/// (spec.md §6's exit-code distinction is about the whole process, not a
/// single failed command).
pub fn run(config: &ProjectConfig, modpack: &ModpackRootConfig, layout: &RepoLayout) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    loop {
        print!("summon> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF on stdin: treat as a clean exit.
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match dispatch(line, config, modpack, layout) {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => tracing::error!(command = line, error = %err, "command failed"),
        }
    }
    Ok(())
}

/// Returns `Ok(true)` when the command requests the loop to end.
fn dispatch(
    line: &str,
    config: &ProjectConfig,
    modpack: &ModpackRootConfig,
    layout: &RepoLayout,
) -> anyhow::Result<bool> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match command {
        "h" | "help" => {
            print!("{HELP}");
            Ok(false)
        }
        "x" | "exit" => Ok(true),
        "github.install" => {
            github_install(rest, config)?;
            Ok(false)
        }
        "guess" => {
            let outcome = pipeline::run(config, modpack, layout)?;
            let manifest_path = layout.modpack_root.join("project.json");
            let mut manifest = outcome.manifest;
            manifest.sort_for_persistence();
            summon_manifest::write(manifest_path.as_path(), &manifest)?;
            println!(
                "wrote {} ({} mods, {} scheduler tasks completed)",
                manifest_path,
                manifest.mods.len(),
                outcome.report.completed_tasks
            );
            Ok(false)
        }
        other => {
            println!("unknown command {other:?}; try 'help'");
            Ok(false)
        }
    }
}

/// `git clone`s a companion repository into `<githubroot>/<author>/<project>`
/// (spec.md §7: "environment error — ... git clone fails after retries" is
/// fatal only at startup; here, mid-session, a failed clone is just a
/// failed command).
fn github_install(arg: &str, config: &ProjectConfig) -> anyhow::Result<()> {
    let reference: summon_config::ModpackRef = arg.parse()?;
    let dest = config.githubroot.join(&reference.author).join(&reference.project);
    if dest.exists() {
        println!("{dest} already exists, skipping clone");
        return Ok(());
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent.as_path())?;
    }
    let url = format!("https://github.com/{}/{}.git", reference.author, reference.project);
    let status = std::process::Command::new("git").args(["clone", "--depth", "1", &url, &dest.as_path().to_string_lossy()]).status()?;
    if !status.success() {
        anyhow::bail!("git clone of {url} exited with {status}");
    }
    println!("cloned {url} into {dest}");
    Ok(())
}
