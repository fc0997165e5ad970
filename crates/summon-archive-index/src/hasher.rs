//! Recursive archive hashing (spec.md §4.3): extract an archive to a
//! scratch directory, hash every regular file it contains, recurse into
//! anything that is itself an archive, then remove the scratch tree.
//!
//! Grounded on `original_source/summonmm/cache/root_git_data.py::_hash_archive`
//! for the recursion shape (extract-all, walk, recurse per nested archive
//! extension, bounded-retry cleanup) and on
//! `turborepo-cache::cache_archive::create` for the "walk a tree, build
//! records" idiom in Rust.

use std::{path::Path, thread, time::Duration};

use summon_archive::ArchiveRegistry;
use summon_paths::{AbsoluteSystemPathBuf, IntraArchivePath};
use tracing::warn;
use walkdir::WalkDir;

use crate::{
    digest::ArchiveDigest,
    model::{Archive, FileInArchive},
    ArchiveIndexError,
};

/// Per-archive extra data a plugin wants attached alongside the listing
/// (spec.md §4.3 step 4). A failing factory is captured, not propagated —
/// spec.md §7: "Plugin error ... does not fail the run."
pub trait ExtraDataFactory: Send + Sync {
    fn name(&self) -> &str;
    fn extra_data(&self, scratch_dir: &Path) -> Result<serde_json::Value, String>;
}

#[derive(Debug, Clone)]
pub struct PluginFailure {
    pub plugin: String,
    pub message: String,
}

/// Removes a scratch tree with bounded retries — spec.md §4.3 step 5 notes
/// indexing services on Windows can transiently hold file handles open.
fn remove_scratch_tree(path: &Path) -> std::io::Result<()> {
    const ATTEMPTS: u32 = 5;
    let mut last_err = None;
    for attempt in 0..ATTEMPTS {
        match std::fs::remove_dir_all(path) {
            Ok(()) => return Ok(()),
            Err(e) if attempt + 1 < ATTEMPTS => {
                last_err = Some(e);
                thread::sleep(Duration::from_millis(20 * (attempt as u64 + 1)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.expect("loop always assigns before exhausting attempts"))
}

/// Hashes one archive (and everything nested inside it) into `archives`,
/// returning the plugin extra-data results keyed by plugin name. `token` is
/// the hard-to-collide scratch-directory discriminator from spec.md's
/// "Extractor handles" design note; nested recursion extends it with a
/// numbered subdirectory rather than minting a fresh one, so a single run's
/// scratch tree stays under one easily-swept root.
pub fn hash_archive(
    registry: &ArchiveRegistry,
    archive_path: &AbsoluteSystemPathBuf,
    archive_hash: ArchiveDigest,
    archive_size: u64,
    attribution: &str,
    scratch_root: &AbsoluteSystemPathBuf,
    token: &str,
    extra_factories: &[Box<dyn ExtraDataFactory>],
    archives_out: &mut Vec<Archive>,
    plugin_failures_out: &mut Vec<PluginFailure>,
) -> Result<(), ArchiveIndexError> {
    let scratch_dir = scratch_root.join(format!("summon-scratch-{token}"));
    std::fs::create_dir_all(scratch_dir.as_path())
        .map_err(|e| ArchiveIndexError::Scratch(e.to_string()))?;

    registry.extract_all(archive_path, &scratch_dir)?;

    let mut archive = Archive::new(archive_hash, archive_size, attribution.to_string());
    let mut nested = Vec::new();

    for entry in WalkDir::new(scratch_dir.as_path())
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path
            .strip_prefix(scratch_dir.as_path())
            .expect("walkdir yields children of the root we walked");
        let intra_path = IntraArchivePath::new(relative.to_string_lossy())?;

        let (digests, size) = summon_hash::hash_file(path, &[])
            .map_err(|e| ArchiveIndexError::Hash(e.to_string()))?;
        let full = ArchiveDigest::from_hex(&digests.primary)
            .expect("summon-hash always produces a 32-byte sha256 hex digest");

        archive.files.push(FileInArchive {
            intra_path: intra_path.clone(),
            file_hash: full.truncate(),
            file_size: size,
        });

        if registry.is_archive(&AbsoluteSystemPathBuf::new_unchecked(path.to_path_buf())) {
            nested.push((
                AbsoluteSystemPathBuf::new_unchecked(path.to_path_buf()),
                full,
                size,
            ));
        }
    }

    for plugin in extra_factories {
        match plugin.extra_data(scratch_dir.as_path()) {
            Ok(_value) => {}
            Err(message) => {
                warn!(plugin = plugin.name(), %message, "archive extra-data plugin failed");
                plugin_failures_out.push(PluginFailure {
                    plugin: plugin.name().to_string(),
                    message,
                });
            }
        }
    }

    archive.sort_for_persistence();
    archives_out.push(archive);

    for (idx, (nested_path, nested_hash, nested_size)) in nested.into_iter().enumerate() {
        let nested_attribution = format!("{attribution} (nested)");
        let nested_token = format!("{token}-{idx}");
        hash_archive(
            registry,
            &nested_path,
            nested_hash,
            nested_size,
            &nested_attribution,
            scratch_root,
            &nested_token,
            extra_factories,
            archives_out,
            plugin_failures_out,
        )?;
    }

    remove_scratch_tree(scratch_dir.as_path()).map_err(|e| ArchiveIndexError::Scratch(e.to_string()))?;
    Ok(())
}

/// Generates a globally-unique scratch token, per spec.md's "Extractor
/// handles" design note: aggressive cleanup must never be able to collide
/// with an unrelated temp tree.
pub fn new_scratch_token() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 8] = rng.gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn make_zip(path: &std::path::Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            writer
                .start_file(*name, FileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn hashes_a_flat_archive() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("A.zip");
        make_zip(&archive_path, &[("data/readme.txt", b"hi\n")]);

        let registry = ArchiveRegistry::new();
        let (digests, size) = summon_hash::hash_file(&archive_path, &[]).unwrap();
        let archive_hash = ArchiveDigest::from_hex(&digests.primary).unwrap();

        let scratch_root = AbsoluteSystemPathBuf::new(dir.path().join("scratch")).unwrap();
        let token = new_scratch_token();
        let scratch_dir = scratch_root.join(format!("summon-scratch-{token}"));
        let mut archives = Vec::new();
        let mut failures = Vec::new();
        hash_archive(
            &registry,
            &AbsoluteSystemPathBuf::new(archive_path).unwrap(),
            archive_hash,
            size,
            "test",
            &scratch_root,
            &token,
            &[],
            &mut archives,
            &mut failures,
        )
        .unwrap();

        assert_eq!(archives.len(), 1);
        assert_eq!(archives[0].files.len(), 1);
        assert_eq!(archives[0].files[0].file_size, 3);
        assert!(failures.is_empty());
        assert!(!scratch_dir.as_path().exists());
    }
}
