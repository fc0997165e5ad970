use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{IntoUnixSlash, PathValidationError};

/// A path relative to some root the caller keeps track of separately (a mod
/// folder, a companion repo checkout, an extracted archive's scratch dir).
/// OS-native on disk, but exposes a normalized unix-slash form for anything
/// that needs a stable cross-platform key (manifest paths, digests).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchoredSystemPathBuf(PathBuf);

impl AnchoredSystemPathBuf {
    pub fn new_unchecked(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn from_str(path: impl AsRef<std::path::Path>) -> Result<Self, PathValidationError> {
        let path = path.as_ref();
        if path.is_absolute() {
            return Err(PathValidationError::NotRelative(path.to_path_buf()));
        }
        Ok(Self(path.to_path_buf()))
    }

    pub fn as_path(&self) -> &std::path::Path {
        &self.0
    }

    pub fn join(&self, segment: impl AsRef<std::path::Path>) -> Self {
        Self(self.0.join(segment))
    }

    pub fn components(&self) -> std::path::Components<'_> {
        self.0.components()
    }

    /// Normalized forward-slash, lower-cased form used as a manifest /
    /// resolver key. Mirrors spec.md's `FileOnDisk` invariant ("path is
    /// canonical").
    pub fn to_unix_lower(&self) -> Result<String, PathValidationError> {
        Ok(self.0.as_path().into_unix_slash()?.to_lowercase())
    }
}

impl fmt::Display for AnchoredSystemPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

impl AsRef<std::path::Path> for AnchoredSystemPathBuf {
    fn as_ref(&self) -> &std::path::Path {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalizes_to_lowercase_unix() {
        let p = AnchoredSystemPathBuf::new_unchecked(PathBuf::from("Data/Readme.TXT"));
        assert_eq!(p.to_unix_lower().unwrap(), "data/readme.txt");
    }
}
