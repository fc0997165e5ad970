//! Validated, newtyped paths used throughout the pipeline instead of raw
//! `PathBuf`s: a path on disk is always either absolute or anchored to a
//! known root, and a path inside an archive never carries a drive letter or
//! leading separator.

mod absolute;
mod anchored;
mod intra_archive;

pub use absolute::AbsoluteSystemPathBuf;
pub use anchored::AnchoredSystemPathBuf;
pub use intra_archive::IntraArchivePath;

use std::path::{Path, PathBuf};

use path_slash::{PathBufExt, PathExt};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathValidationError {
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8(PathBuf),
    #[error("path is not absolute: {0}")]
    NotAbsolute(PathBuf),
    #[error("path is not relative: {0}")]
    NotRelative(PathBuf),
    #[error("path escapes its root: {0}")]
    EscapesRoot(PathBuf),
}

pub(crate) trait IntoSystem {
    fn into_system(&self) -> Result<PathBuf, PathValidationError>;
}

pub(crate) trait IntoUnixSlash {
    fn into_unix_slash(&self) -> Result<String, PathValidationError>;
}

impl IntoSystem for Path {
    fn into_system(&self) -> Result<PathBuf, PathValidationError> {
        let as_str = self
            .to_str()
            .ok_or_else(|| PathValidationError::NonUtf8(self.to_path_buf()))?;
        Ok(PathBuf::from_slash(as_str))
    }
}

impl IntoUnixSlash for Path {
    fn into_unix_slash(&self) -> Result<String, PathValidationError> {
        self.to_slash()
            .map(|cow| cow.into_owned())
            .ok_or_else(|| PathValidationError::NonUtf8(self.to_path_buf()))
    }
}
