use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PathValidationError;

/// A path inside an archive: relative, lower-case, backslash-separated, no
/// drive letter and no leading separator (spec.md §3, `FileInArchive`).
/// Archive listings arrive with whatever separator the archive format
/// happens to use (zip entries are usually `/`, some installer-authored
/// 7z archives use `\`); normalizing to one separator makes digests and
/// resolver lookups format-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntraArchivePath(String);

impl IntraArchivePath {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PathValidationError> {
        let raw = raw.as_ref();
        let normalized = raw.replace('/', "\\").to_lowercase();
        let trimmed = normalized.trim_start_matches('\\');

        if trimmed.contains(':') {
            return Err(PathValidationError::NotRelative(trimmed.into()));
        }
        if trimmed
            .split('\\')
            .any(|segment| segment == "." || segment == "..")
        {
            return Err(PathValidationError::EscapesRoot(trimmed.into()));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join `self` onto a `root` prefix, used when a FOMOD folder rule
    /// expands into per-file destinations.
    pub fn joined(&self, rest: &str) -> Result<Self, PathValidationError> {
        if self.0.is_empty() {
            Self::new(rest)
        } else {
            Self::new(format!("{}\\{}", self.0, rest))
        }
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('\\').next().unwrap_or(&self.0)
    }

    pub fn starts_with(&self, prefix: &IntraArchivePath) -> bool {
        if prefix.0.is_empty() {
            return true;
        }
        self.0 == prefix.0 || self.0.starts_with(&format!("{}\\", prefix.0))
    }

    /// The part of `self` after `prefix`, if `self` is nested under it.
    pub fn strip_prefix(&self, prefix: &IntraArchivePath) -> Option<&str> {
        if prefix.0.is_empty() {
            return Some(&self.0);
        }
        self.0
            .strip_prefix(&prefix.0)
            .map(|rest| rest.trim_start_matches('\\'))
    }
}

impl fmt::Display for IntraArchivePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalizes_separators_and_case() {
        let p = IntraArchivePath::new("Data/Textures/Foo.DDS").unwrap();
        assert_eq!(p.as_str(), "data\\textures\\foo.dds");
    }

    #[test]
    fn rejects_drive_letters() {
        assert!(IntraArchivePath::new("C:\\data\\foo.esp").is_err());
    }

    #[test]
    fn rejects_dotdot_segments() {
        assert!(IntraArchivePath::new("data\\..\\foo.esp").is_err());
    }

    #[test]
    fn strips_leading_separator() {
        let p = IntraArchivePath::new("/data/foo.esp").unwrap();
        assert_eq!(p.as_str(), "data\\foo.esp");
    }

    #[test]
    fn joins_and_strips_prefix() {
        let root = IntraArchivePath::new("data\\textures").unwrap();
        let joined = root.joined("foo.dds").unwrap();
        assert_eq!(joined.as_str(), "data\\textures\\foo.dds");
        assert_eq!(joined.strip_prefix(&root), Some("foo.dds"));
    }
}
