use std::{fmt, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{anchored::AnchoredSystemPathBuf, IntoSystem, PathValidationError};

/// A path known to be absolute and OS-native, lower-cased on platforms
/// where paths are case-insensitive is *not* done here — canonicalization
/// of case is a folder-cache concern (spec.md's `FileOnDisk` invariant),
/// not a path-type concern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbsoluteSystemPathBuf(PathBuf);

impl AbsoluteSystemPathBuf {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, PathValidationError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(PathValidationError::NotAbsolute(path));
        }
        Ok(Self(path.into_system()?))
    }

    /// Construct without validation. Used when a path is already known to
    /// be absolute, e.g. the output of `std::env::current_dir`.
    pub fn new_unchecked(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &std::path::Path {
        &self.0
    }

    pub fn join(&self, segment: impl AsRef<std::path::Path>) -> Self {
        Self(self.0.join(segment))
    }

    pub fn parent(&self) -> Option<Self> {
        self.0.parent().map(|p| Self(p.to_path_buf()))
    }

    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|s| s.to_str())
    }

    pub fn extension(&self) -> Option<&str> {
        self.0.extension().and_then(|s| s.to_str())
    }

    pub fn to_str(&self) -> Result<&str, PathValidationError> {
        self.0
            .to_str()
            .ok_or_else(|| PathValidationError::NonUtf8(self.0.clone()))
    }

    /// Strip `root` off the front of `self`, producing a root-relative path.
    pub fn anchor_at(&self, root: &Self) -> Result<AnchoredSystemPathBuf, PathValidationError> {
        let relative = self
            .0
            .strip_prefix(&root.0)
            .map_err(|_| PathValidationError::EscapesRoot(self.0.clone()))?;
        Ok(AnchoredSystemPathBuf::new_unchecked(relative.to_path_buf()))
    }

    pub fn exists(&self) -> bool {
        self.0.exists()
    }

    pub fn is_dir(&self) -> bool {
        self.0.is_dir()
    }
}

impl fmt::Display for AbsoluteSystemPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.display().fmt(f)
    }
}

impl AsRef<std::path::Path> for AbsoluteSystemPathBuf {
    fn as_ref(&self) -> &std::path::Path {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_relative_paths() {
        assert!(AbsoluteSystemPathBuf::new("a/b").is_err());
    }

    #[test]
    fn anchors_relative_to_root() {
        let root = AbsoluteSystemPathBuf::new_unchecked("/mods/MyMod");
        let file = AbsoluteSystemPathBuf::new_unchecked("/mods/MyMod/data/readme.txt");
        let anchored = file.anchor_at(&root).unwrap();
        assert_eq!(anchored.as_path(), std::path::Path::new("data/readme.txt"));
    }
}
