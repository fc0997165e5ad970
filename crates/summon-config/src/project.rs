//! The project configuration document (spec.md §6, "Project configuration"):
//! a JSON-with-comments file at a user-supplied path naming the mod manager
//! adapter, the download folders, cache/tmp locations, and the modpack
//! companion repo.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use summon_paths::AbsoluteSystemPathBuf;

use crate::{interpolate::interpolate, parse_jsonc, ConfigError, ModpackRef};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub modmanager: String,
    /// The nested object the selected `modmanager` adapter parses itself
    /// (spec.md §6: "`<modmanager-name>`: nested object parsed by the
    /// selected adapter"). Kept opaque here since its shape is adapter-
    /// specific and this crate has no adapter registry of its own.
    #[serde(flatten)]
    pub modmanager_config: serde_json::Value,
    pub downloads: Vec<AbsoluteSystemPathBuf>,
    pub cache: AbsoluteSystemPathBuf,
    pub tmp: AbsoluteSystemPathBuf,
    pub githubroot: AbsoluteSystemPathBuf,
    pub modpack: ModpackRef,
    pub githubusername: Option<String>,
}

/// Raw shape as it appears on disk, before defaults and interpolation are
/// applied; `downloads` may be a single string or a list (spec.md §6).
#[derive(Debug, Deserialize)]
struct RawProjectConfig {
    modmanager: String,
    #[serde(default)]
    downloads: Option<DownloadsField>,
    cache: Option<String>,
    tmp: Option<String>,
    githubroot: String,
    modpack: ModpackRef,
    githubusername: Option<String>,
    #[serde(flatten)]
    rest: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DownloadsField {
    One(String),
    Many(Vec<String>),
}

impl ProjectConfig {
    /// Loads and fully resolves the project configuration at `path`:
    /// parses JSON-with-comments, runs `{dotted.path}`/`{CONFIG-DIR}`
    /// interpolation over every string value, then applies the documented
    /// defaults (spec.md §6: cache defaults to `<cfgdir>/summon.cache/`,
    /// tmp to `<cfgdir>/summon.tmp/`).
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config_dir = path
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut value = parse_jsonc(path, &text)?;
        let root = value.clone();
        interpolate(&mut value, &root, &config_dir)?;

        let raw: RawProjectConfig = serde_json::from_value(value)?;
        let downloads = match raw.downloads {
            None => vec![config_dir.join("downloads")],
            Some(DownloadsField::One(s)) => vec![PathBuf::from(s)],
            Some(DownloadsField::Many(v)) => v.into_iter().map(PathBuf::from).collect(),
        };

        Ok(Self {
            modmanager: raw.modmanager,
            modmanager_config: raw.rest,
            downloads: downloads
                .into_iter()
                .map(AbsoluteSystemPathBuf::new)
                .collect::<Result<_, _>>()?,
            cache: AbsoluteSystemPathBuf::new(
                raw.cache
                    .map(PathBuf::from)
                    .unwrap_or_else(|| config_dir.join("summon.cache")),
            )?,
            tmp: AbsoluteSystemPathBuf::new(
                raw.tmp
                    .map(PathBuf::from)
                    .unwrap_or_else(|| config_dir.join("summon.tmp")),
            )?,
            githubroot: AbsoluteSystemPathBuf::new(PathBuf::from(raw.githubroot))?,
            modpack: raw.modpack,
            githubusername: raw.githubusername,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_minimal_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let github = dir.path().join("github");
        std::fs::create_dir_all(&github).unwrap();
        let path = write(
            &dir,
            "summon.json",
            &format!(
                r#"{{
                    // a comment, since this is JSON-with-comments
                    "modmanager": "mo2",
                    "githubroot": {:?},
                    "modpack": "someauthor/somepack"
                }}"#,
                github.to_string_lossy()
            ),
        );

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.modmanager, "mo2");
        assert_eq!(config.modpack.author, "someauthor");
        assert_eq!(config.cache, AbsoluteSystemPathBuf::new(dir.path().join("summon.cache")).unwrap());
        assert_eq!(config.tmp, AbsoluteSystemPathBuf::new(dir.path().join("summon.tmp")).unwrap());
    }

    #[test]
    fn interpolates_config_dir_into_cache_path() {
        let dir = tempfile::tempdir().unwrap();
        let github = dir.path().join("github");
        std::fs::create_dir_all(&github).unwrap();
        let path = write(
            &dir,
            "summon.json",
            &format!(
                r#"{{
                    "modmanager": "mo2",
                    "cache": "{{CONFIG-DIR}}/my-cache",
                    "githubroot": {:?},
                    "modpack": "someauthor/somepack"
                }}"#,
                github.to_string_lossy()
            ),
        );

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.cache, AbsoluteSystemPathBuf::new(dir.path().join("my-cache")).unwrap());
    }

    #[test]
    fn accepts_a_downloads_list() {
        let dir = tempfile::tempdir().unwrap();
        let github = dir.path().join("github");
        std::fs::create_dir_all(&github).unwrap();
        let d1 = dir.path().join("d1");
        let d2 = dir.path().join("d2");
        let path = write(
            &dir,
            "summon.json",
            &format!(
                r#"{{
                    "modmanager": "mo2",
                    "downloads": [{:?}, {:?}],
                    "githubroot": {:?},
                    "modpack": "someauthor/somepack"
                }}"#,
                d1.to_string_lossy(),
                d2.to_string_lossy(),
                github.to_string_lossy()
            ),
        );

        let config = ProjectConfig::load(&path).unwrap();
        assert_eq!(config.downloads.len(), 2);
    }
}
