//! Stage 7 (spec.md §4.5): for files classified `modified_since_install`,
//! ask every patch plugin registered for that extension to diff the
//! archive's version against the VFS's version; the first non-null patch
//! clears the file from `modified_since_install`/`skip` and records
//! `(kind, payload)`.
//!
//! Grounded on `original_source/summonmm/plugins/arinstaller/patches`'s
//! `SORTEDJSON` kind (spec.md's S6 scenario) and registered the same
//! specific-before-generic way as [`crate::plugins::InstallerPluginRegistry`].

use serde_json::Value;

pub trait PatchPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lower-case extensions (without a dot) this plugin offers to diff.
    fn extensions(&self) -> &[&str];

    /// Diffs the archive's bytes against the VFS's bytes, or `None` if this
    /// file isn't a clean instance of the plugin's format (e.g. malformed
    /// JSON) or the two are identical.
    fn diff(&self, archive_bytes: &[u8], vfs_bytes: &[u8]) -> Option<Value>;
}

/// Diffs two JSON documents at the top level: every key present in `vfs`
/// whose value differs from (or is absent from) `archive` is carried into
/// the payload verbatim (spec.md's S6: `{"a":1,"b":2}` -> `{"a":1,"b":3}`
/// produces payload `{"b":3}`). Non-object documents are compared whole.
pub struct SortedJsonPatchPlugin;

impl PatchPlugin for SortedJsonPatchPlugin {
    fn name(&self) -> &'static str {
        "SORTEDJSON"
    }

    fn extensions(&self) -> &[&str] {
        &["json"]
    }

    fn diff(&self, archive_bytes: &[u8], vfs_bytes: &[u8]) -> Option<Value> {
        let archive: Value = serde_json::from_slice(archive_bytes).ok()?;
        let vfs: Value = serde_json::from_slice(vfs_bytes).ok()?;
        if archive == vfs {
            return None;
        }
        match (&archive, &vfs) {
            (Value::Object(a), Value::Object(b)) => {
                let mut changed = serde_json::Map::new();
                for (key, value) in b {
                    if a.get(key) != Some(value) {
                        changed.insert(key.clone(), value.clone());
                    }
                }
                if changed.is_empty() {
                    None
                } else {
                    Some(Value::Object(changed))
                }
            }
            _ => Some(vfs),
        }
    }
}

/// Patch plugins in try-order, keyed by extension.
pub struct PatchPluginRegistry {
    plugins: Vec<Box<dyn PatchPlugin>>,
}

impl PatchPluginRegistry {
    pub fn new() -> Self {
        let mut registry = Self { plugins: Vec::new() };
        registry.register(Box::new(SortedJsonPatchPlugin));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn PatchPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn for_extension<'a>(&'a self, extension: &'a str) -> impl Iterator<Item = &'a dyn PatchPlugin> {
        self.plugins.iter().filter(move |p| p.extensions().contains(&extension)).map(|p| p.as_ref())
    }
}

impl Default for PatchPluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn diffs_a_single_changed_top_level_key() {
        let plugin = SortedJsonPatchPlugin;
        let archive = br#"{"a":1,"b":2}"#;
        let vfs = br#"{"a":1,"b":3}"#;
        let payload = plugin.diff(archive, vfs).unwrap();
        assert_eq!(payload, serde_json::json!({"b": 3}));
    }

    #[test]
    fn returns_none_for_identical_documents() {
        let plugin = SortedJsonPatchPlugin;
        let doc = br#"{"a":1}"#;
        assert!(plugin.diff(doc, doc).is_none());
    }

    #[test]
    fn registry_looks_up_plugins_by_extension() {
        let registry = PatchPluginRegistry::new();
        assert_eq!(registry.for_extension("json").count(), 1);
        assert_eq!(registry.for_extension("esp").count(), 0);
    }
}
