//! Command-line surface (spec.md §6: "Single-argument invocation with the
//! config file path"), in the teacher's clap-derive style
//! (`turborepo-lib/src/cli.rs`).

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Clone, Debug)]
#[clap(author, about = "Builds a modpack manifest from a local mod manager install", long_about = None)]
pub struct Args {
    /// Path to the project configuration file (spec.md §6, "Project
    /// configuration").
    pub config: PathBuf,

    /// Raise log verbosity; repeat for more (-v, -vv, -vvv).
    #[clap(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
