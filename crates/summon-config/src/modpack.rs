//! The modpack root config (`summon.json5` in the root companion repo,
//! spec.md §6): game universe, per-plugin origin config, ignore patterns,
//! and — for non-root modpacks — dependencies and owned mod names.

use serde::{Deserialize, Serialize};

use crate::{parse_jsonc, ConfigError, ModpackRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModpackRootConfig {
    pub is_root: bool,
    /// Upper-case identifier (spec.md §6: "`gameuniverse` (string, upper-
    /// case identifier)"); not validated against a fixed list since the
    /// set of supported games is a plugin-table concern, not this crate's.
    pub gameuniverse: String,
    /// Per-plugin config sub-trees, keyed by plugin name.
    pub origins: std::collections::BTreeMap<String, serde_json::Value>,
    pub ignorepatterns: Vec<String>,
    /// Non-root only: other modpacks this one depends on.
    pub dependencies: Vec<ModpackRef>,
    /// Non-root only: mod names this modpack itself owns (as opposed to
    /// ones pulled in transitively via `dependencies`).
    pub ownmods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawModpackRootConfig {
    #[serde(default)]
    isroot: i32,
    gameuniverse: String,
    #[serde(default)]
    origins: std::collections::BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    ignorepatterns: Option<IgnorePatternsField>,
    #[serde(default)]
    dependencies: Vec<ModpackRef>,
    #[serde(default)]
    ownmods: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IgnorePatternsField {
    One(String),
    Many(Vec<String>),
}

impl ModpackRootConfig {
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value = parse_jsonc(path, &text)?;
        let raw: RawModpackRootConfig = serde_json::from_value(value)?;

        let ignorepatterns = match raw.ignorepatterns {
            None => Vec::new(),
            Some(IgnorePatternsField::One(s)) => vec![s],
            Some(IgnorePatternsField::Many(v)) => v,
        };

        Ok(Self {
            is_root: raw.isroot != 0,
            gameuniverse: raw.gameuniverse,
            origins: raw.origins,
            ignorepatterns,
            dependencies: raw.dependencies,
            ownmods: raw.ownmods,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn loads_a_root_modpack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summon.json5");
        std::fs::write(
            &path,
            r#"{
                // root modpacks don't declare dependencies
                "isroot": 1,
                "gameuniverse": "SKYRIMSE",
                "ignorepatterns": ["\\.bak$"]
            }"#,
        )
        .unwrap();

        let config = ModpackRootConfig::load(&path).unwrap();
        assert!(config.is_root);
        assert_eq!(config.gameuniverse, "SKYRIMSE");
        assert_eq!(config.ignorepatterns, vec!["\\.bak$".to_string()]);
        assert!(config.dependencies.is_empty());
    }

    #[test]
    fn loads_a_dependent_modpack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summon.json5");
        std::fs::write(
            &path,
            r#"{
                "isroot": 0,
                "gameuniverse": "SKYRIMSE",
                "dependencies": ["someauthor/base"],
                "ownmods": ["MyAddon"]
            }"#,
        )
        .unwrap();

        let config = ModpackRootConfig::load(&path).unwrap();
        assert!(!config.is_root);
        assert_eq!(config.dependencies[0].project, "base");
        assert_eq!(config.ownmods, vec!["MyAddon".to_string()]);
    }
}
