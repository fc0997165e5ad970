//! Logging setup (spec.md §5: console gets a bounded, sometimes-lossy
//! stream; the file log keeps everything). Grounded on
//! `turborepo-lib/src/tracing.rs`'s layered, non-blocking-file-appender
//! shape, simplified down to the crates this workspace actually depends on:
//! no chrome trace layer, no custom color palette, no `chrono` — just
//! `tracing-subscriber`'s `EnvFilter` plus `tracing-appender`'s rolling
//! non-blocking writer.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the global subscriber: an `EnvFilter`'d layer on stderr for
/// the console (spec.md §5's "console" stream), and an un-filtered layer
/// writing to a rolling file under `log_dir` (the "file log" that spec.md
/// §5/§7 says keeps the full traceback even when console lines are
/// dropped). Returns the guard that must be held for the life of the
/// process or the file writer's background thread stops flushing.
pub fn init(log_dir: &Path, verbosity: u8) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let console_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let console_filter = EnvFilter::try_from_env("SUMMON_LOG").unwrap_or_else(|_| EnvFilter::new(console_level));

    let file_appender = tracing_appender::rolling::daily(log_dir, "summon.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr).with_filter(console_filter);
    let file_layer = fmt::layer().with_ansi(false).with_writer(file_writer).with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry().with(console_layer).with(file_layer).init();

    Ok(guard)
}
