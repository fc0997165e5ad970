//! Stage 6 of the guesser pipeline (spec.md §4.5): tools that explain an
//! unknown file by reference to *other mods' own files* rather than to an
//! archive (e.g. a merge patch built from two plugins already accounted
//! for elsewhere). The original ships `plugins/globaltool/bodyslide.py`,
//! which recognizes a `.tri`/`.nif` as BodySlide output by parsing every
//! `.osp` slider set across the whole resolved VFS up front
//! (`create_context`) and consulting that cross-mod index per file. That
//! needs a whole-VFS pass threaded through before any per-file check runs;
//! [`GlobalToolPlugin::could_produce`] only ever sees one file at a time,
//! so porting it would mean reshaping this trait around a context object no
//! other stage needs. Left as the trait plus an empty registry until a tool
//! that fits the one-file-at-a-time shape shows up — a real tool plugs in
//! here the same way `summon-archive`'s `ArchiveBackend`s plug into
//! `ArchiveRegistry`.

use serde_json::Value;
use summon_paths::AnchoredSystemPathBuf;

/// What a global tool plugin found when asked whether it could have
/// produced a given unknown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouldBeProducedByGlobalTool {
    pub tool_name: String,
    pub details: Value,
}

/// A tool that can explain unknown files using already-resolved state from
/// other mods, rather than from an archive.
pub trait GlobalToolPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `Some` with reproduction parameters if this tool could have
    /// produced `target_path`'s exact bytes.
    fn could_produce(&self, target_path: &AnchoredSystemPathBuf) -> Option<CouldBeProducedByGlobalTool>;
}

#[derive(Default)]
pub struct GlobalToolRegistry {
    plugins: Vec<Box<dyn GlobalToolPlugin>>,
}

impl GlobalToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Box<dyn GlobalToolPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn plugins(&self) -> &[Box<dyn GlobalToolPlugin>] {
        &self.plugins
    }

    pub fn find_for(
        &self,
        target_path: &AnchoredSystemPathBuf,
    ) -> Option<CouldBeProducedByGlobalTool> {
        self.plugins.iter().find_map(|p| p.could_produce(target_path))
    }
}
