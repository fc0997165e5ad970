//! FOMOD: the hardest recipe (spec.md §4.6). `model` is the typed module
//! config, `xml` parses `ModuleConfig.xml` into it, `engine` replays a fixed
//! selection through the config to get a file list, and `guess` is the
//! forking search that proposes a selection explaining a mod's files.

pub mod engine;
pub mod guess;
pub mod model;
pub mod xml;

pub use guess::{guess as guess_installer, FomodGuess};
pub use model::{FomodInstallerSelection, FomodModuleConfig};
