//! Project and modpack configuration loading (spec.md §6 "External
//! Interfaces"). Both documents are JSON-with-comments; `{dotted.path}` and
//! `{CONFIG-DIR}` interpolation is resolved before typed deserialization.
//!
//! Grounded on `turborepo-lib/src/config/{file,mod}.rs`'s layered
//! "read file, parse, deserialize into a typed options struct" shape. No
//! corpus repo reads JSON-with-comments; `jsonc-parser` was picked for that
//! format the way `summon-archive` picked `sevenz-rust` for 7z — a real
//! crate for a format nothing in the pack covers, noted as a stack
//! addition in the grounding ledger.

mod interpolate;
pub mod modpack;
pub mod project;

pub use modpack::ModpackRootConfig;
pub use project::ProjectConfig;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path} as JSON-with-comments: {message}")]
    Parse { path: std::path::PathBuf, message: String },
    #[error("config is missing required key {0}")]
    MissingKey(String),
    #[error("unknown modmanager {0}")]
    UnknownModManager(String),
    #[error("could not resolve interpolation {{{0}}}")]
    UnresolvedInterpolation(String),
    #[error("malformed modpack reference {0:?}: expected author/project[/subpath]")]
    MalformedModpackRef(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Path(#[from] summon_paths::PathValidationError),
}

/// Parses `text` as JSON-with-comments into a `serde_json::Value`, the
/// shared first step for both the project config and the modpack root
/// config (spec.md §6 names both as JSON-with-comments documents).
fn parse_jsonc(path: &std::path::Path, text: &str) -> Result<serde_json::Value, ConfigError> {
    jsonc_parser::parse_to_serde_value(text, &jsonc_parser::ParseOptions::default())
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .ok_or_else(|| ConfigError::Parse {
            path: path.to_path_buf(),
            message: "empty document".to_string(),
        })
}

/// A modpack reference string, `<author>/<project>[/<subpath>]` (spec.md
/// §6's `modpack` key and §4.5's dependency/ownmods lists).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModpackRef {
    pub author: String,
    pub project: String,
    pub subpath: Option<String>,
}

impl std::str::FromStr for ModpackRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '/');
        let author = parts.next().filter(|p| !p.is_empty());
        let project = parts.next().filter(|p| !p.is_empty());
        let subpath = parts.next().map(str::to_string);
        match (author, project) {
            (Some(author), Some(project)) => Ok(Self {
                author: author.to_string(),
                project: project.to_string(),
                subpath,
            }),
            _ => Err(ConfigError::MalformedModpackRef(s.to_string())),
        }
    }
}

impl TryFrom<String> for ModpackRef {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModpackRef> for String {
    fn from(value: ModpackRef) -> Self {
        match value.subpath {
            Some(sub) => format!("{}/{}/{sub}", value.author, value.project),
            None => format!("{}/{}", value.author, value.project),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_modpack_ref_without_subpath() {
        let r: ModpackRef = "someauthor/somepack".parse().unwrap();
        assert_eq!(r.author, "someauthor");
        assert_eq!(r.project, "somepack");
        assert_eq!(r.subpath, None);
    }

    #[test]
    fn parses_modpack_ref_with_subpath() {
        let r: ModpackRef = "someauthor/somepack/addon".parse().unwrap();
        assert_eq!(r.subpath.as_deref(), Some("addon"));
    }

    #[test]
    fn rejects_a_bare_name() {
        assert!("justonepart".parse::<ModpackRef>().is_err());
    }
}
