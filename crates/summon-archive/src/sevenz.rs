use std::{fs, io};

use summon_paths::{AbsoluteSystemPathBuf, IntraArchivePath};

use crate::{ArchiveBackend, ArchiveEntry, ArchiveError};

/// No corpus repo extracts 7z archives; this backend exists only because
/// spec.md requires the format. Shaped after `ZipBackend` so the registry
/// sees one consistent "open, walk entries, materialize" story regardless
/// of which crate is doing the actual decoding underneath.
pub struct SevenZBackend;

impl ArchiveBackend for SevenZBackend {
    fn extensions(&self) -> &[&str] {
        &["7z"]
    }

    fn list(&self, archive: &AbsoluteSystemPathBuf) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut reader = sevenz_rust::SevenZReader::open(
            archive.as_path(),
            sevenz_rust::Password::empty(),
        )
        .map_err(|e| ArchiveError::SevenZ(e.to_string()))?;

        let mut entries = Vec::new();
        for entry in reader.archive().files.iter() {
            if entry.is_directory() {
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
        fs::create_dir_all(out_dir.as_path())?;
        sevenz_rust::decompress_file(archive.as_path(), out_dir.as_path())
            .map_err(|e| ArchiveError::SevenZ(e.to_string()))
    }

    fn extract(
        &self,
        archive: &AbsoluteSystemPathBuf,
        paths: &[IntraArchivePath],
        out_dir: &AbsoluteSystemPathBuf,
    ) -> Result<(), ArchiveError> {
        fs::create_dir_all(out_dir.as_path())?;
        let mut reader = sevenz_rust::SevenZReader::open(
            archive.as_path(),
            sevenz_rust::Password::empty(),
        )
        .map_err(|e| ArchiveError::SevenZ(e.to_string()))?;

        let mut found = vec![false; paths.len()];
        reader
            .for_each_entries(|entry, entry_reader| {
                if entry.is_directory() {
                    return Ok(true);
                }
                let entry_path = match IntraArchivePath::new(entry.name()) {
                    Ok(p) => p,
                    Err(_) => return Ok(true),
                };
                if let Some(idx) = paths.iter().position(|p| p == &entry_path) {
                    found[idx] = true;
                    let dest = out_dir.join(entry_path.as_str().replace('\\', "/"));
                    if let Some(parent) = dest.as_path().parent() {
                        fs::create_dir_all(parent)?;
                    }
                    let mut out = fs::File::create(dest.as_path())?;
                    io::copy(entry_reader, &mut out)?;
                }
                Ok(true)
            })
            .map_err(|e| ArchiveError::SevenZ(e.to_string()))?;

        if let Some(missing) = found
            .iter()
            .position(|&was_found| !was_found)
            .map(|idx| paths[idx].as_str().to_string())
        {
            return Err(ArchiveError::EntryNotFound(missing));
        }
        Ok(())
    }
}
