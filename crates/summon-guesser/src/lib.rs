//! The installer guesser (spec.md §4.5) and the FOMOD replay engine
//! (§4.6): turns the resolver's per-mod `path -> [retriever]` picture into
//! an ordered installer-recipe list plus residual unknown/remaining-archive
//! sets, ready for `summon-manifest` to persist.
//!
//! Grounded on `original_source/summonmm/commands/run_guess.py` (the
//! seven-stage pipeline) and `plugins/arinstaller*` (the recipe plugins),
//! reimplemented as plain data transforms over typed structs instead of
//! the original's mutable `_ModInProgress` bookkeeping object.

pub mod ambiguity;
pub mod fomod;
pub mod globaltools;
pub mod model;
pub mod modtools;
pub mod order;
pub mod patches;
pub mod plugins;
pub mod run;
pub mod to_manifest;

pub use model::{ModInProgress, ModsInProgress};
pub use run::{run_guess, GuessInputs};
pub use to_manifest::to_project_json;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuesserError {
    #[error(transparent)]
    Archive(#[from] summon_archive::ArchiveError),
    #[error(transparent)]
    Path(#[from] summon_paths::PathValidationError),
    #[error("installer recipes for mod {0:?} contain a cycle that could not be ordered")]
    RecipeOrderingCycle(String),
    #[error("fomod module config at {0} could not be parsed: {1}")]
    FomodParse(String, String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
