use std::{fs, io};

use summon_paths::{AbsoluteSystemPathBuf, IntraArchivePath};

use crate::{ArchiveBackend, ArchiveEntry, ArchiveError};

/// Grounded on `Gankra-uv`'s `zip` dependency (the one corpus member that
/// extracts zip archives, for wheel installation) and on
/// `turborepo-cache::cache_archive::restore`'s entry-walking shape:
/// `create_dir_all` the anchor, then materialize each entry under it.
pub struct ZipBackend;

impl ArchiveBackend for ZipBackend {
    fn extensions(&self) -> &[&str] {
        &["zip"]
    }

    fn list(&self, archive: &AbsoluteSystemPathBuf) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let file = fs::File::open(archive.as_path())?;
        let mut zip = zip::ZipArchive::new(file)?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let entry = zip.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            entries.push(ArchiveEntry {
                path: IntraArchivePath::new(entry.name())?,
                size: entry.size(),
            });
        }
        Ok(entries)
    }

    fn extract_all(
        &self,
        archive: &AbsoluteSystemPathBuf,
        out_dir: &AbsoluteSystemPathBuf,
    ) -> Result<(), ArchiveError> {
        let file = fs::File::open(archive.as_path())?;
        let mut zip = zip::ZipArchive::new(file)?;
        fs::create_dir_all(out_dir.as_path())?;
        zip.extract(out_dir.as_path())
            .map_err(ArchiveError::Zip)?;
        Ok(())
    }

    fn extract(
        &self,
        archive: &AbsoluteSystemPathBuf,
        paths: &[IntraArchivePath],
        out_dir: &AbsoluteSystemPathBuf,
    ) -> Result<(), ArchiveError> {
        let file = fs::File::open(archive.as_path())?;
        let mut zip = zip::ZipArchive::new(file)?;
        fs::create_dir_all(out_dir.as_path())?;

        for wanted in paths {
            let index = (0..zip.len()).find(|&i| {
                zip.by_index(i)
                    .ok()
                    .and_then(|entry| IntraArchivePath::new(entry.name()).ok())
                    .map(|p| &p == wanted)
                    .unwrap_or(false)
            });
            let Some(index) = index else {
                return Err(ArchiveError::EntryNotFound(wanted.as_str().to_string()));
            };
            let mut entry = zip.by_index(index)?;
            let dest = out_dir.join(wanted.as_str().replace('\\', "/"));
            if let Some(parent) = dest.as_path().parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(dest.as_path())?;
            io::copy(&mut entry, &mut out)?;
        }
        Ok(())
    }
}
