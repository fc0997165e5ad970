//! The archive index's in-memory shape: spec.md §3's `Archive` /
//! `FileInArchive`, plus the `digest -> tentative filenames` side table
//! spec.md §2.4 calls "root git data".
//!
//! Grounded on `original_source/summonmm/plugins/archives.py` (`Archive`,
//! `FileInArchive`) and `gitdata/root_git_archives.py` (`KnownArchives`'
//! sorted-list persistence shape), reimplemented over
//! `summon-stable-json` instead of the original's hand-rolled
//! `SUMMON_JSON` descriptor list.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use summon_paths::IntraArchivePath;

use crate::digest::{ArchiveDigest, TruncatedDigest};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInArchive {
    pub intra_path: IntraArchivePath,
    pub file_hash: TruncatedDigest,
    pub file_size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archive {
    pub archive_hash: ArchiveDigest,
    pub archive_size: u64,
    /// Human-readable provenance string (e.g. a Nexus mod id), spec.md §3.
    pub attribution: String,
    pub files: Vec<FileInArchive>,
}

impl Archive {
    pub fn new(archive_hash: ArchiveDigest, archive_size: u64, attribution: String) -> Self {
        Self {
            archive_hash,
            archive_size,
            attribution,
            files: Vec::new(),
        }
    }

    /// Every file in this archive whose digest is `h`. An archive can
    /// legally contain the same content at more than one path.
    pub fn files_by_hash<'a>(
        &'a self,
        h: &'a TruncatedDigest,
    ) -> impl Iterator<Item = &'a FileInArchive> {
        self.files.iter().filter(move |f| &f.file_hash == h)
    }

    /// Sorts `files` by intra-archive path, the stable-JSON persisted order
    /// (spec.md §3: "files list is stable-ordered when persisted").
    pub fn sort_for_persistence(&mut self) {
        summon_stable_json::sort_by_schema_key(&mut self.files, |f| f.intra_path.clone());
    }
}

/// Content-addressed catalog of every known archive, keyed by archive
/// digest (spec.md §2.4, "root git data"). Owns its entries; callers get
/// shared read-only views.
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    archives: BTreeMap<ArchiveDigest, Archive>,
    /// digest -> file(s) containing it, across every known archive, indexed
    /// lazily the first time a lookup needs it.
    by_file_hash: BTreeMap<TruncatedDigest, Vec<(ArchiveDigest, usize)>>,
}

impl ArchiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.archives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    pub fn contains(&self, digest: &ArchiveDigest) -> bool {
        self.archives.contains_key(digest)
    }

    pub fn get(&self, digest: &ArchiveDigest) -> Option<&Archive> {
        self.archives.get(digest)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Archive> {
        self.archives.values()
    }

    /// Inserts a newly-hashed archive. Archive entries are append-only
    /// (spec.md §3 lifecycle: "never modifies existing entries"); merging a
    /// digest that is already known is a caller bug and panics rather than
    /// silently overwriting provenance.
    pub fn insert(&mut self, archive: Archive) {
        assert!(
            !self.archives.contains_key(&archive.archive_hash),
            "archive {} already indexed",
            archive.archive_hash
        );
        self.archives.insert(archive.archive_hash, archive);
        self.by_file_hash.clear();
    }

    pub fn merge(&mut self, other: ArchiveIndex) {
        for (digest, archive) in other.archives {
            if !self.archives.contains_key(&digest) {
                self.archives.insert(digest, archive);
            }
        }
        self.by_file_hash.clear();
    }

    fn ensure_file_index(&mut self) {
        if !self.by_file_hash.is_empty() || self.archives.is_empty() {
            return;
        }
        for (digest, archive) in &self.archives {
            for (idx, file) in archive.files.iter().enumerate() {
                self.by_file_hash
                    .entry(file.file_hash)
                    .or_default()
                    .push((*digest, idx));
            }
        }
    }

    /// Every `(archive, file)` pair anywhere in the index whose file digest
    /// is `h`. Builds the reverse index lazily on first use.
    pub fn find_by_file_hash(&mut self, h: &TruncatedDigest) -> Vec<(&Archive, &FileInArchive)> {
        self.ensure_file_index();
        self.by_file_hash
            .get(h)
            .map(|hits| {
                hits.iter()
                    .map(|(digest, idx)| {
                        let archive = &self.archives[digest];
                        (archive, &archive.files[*idx])
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `digest -> observed filenames`, monotonically grown (spec.md §3:
/// "names are only added"), lower-cased.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TentativeNames(BTreeMap<ArchiveDigest, Vec<String>>);

impl TentativeNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, digest: ArchiveDigest, name: &str) {
        let lowered = name.to_lowercase();
        let names = self.0.entry(digest).or_default();
        if !names.contains(&lowered) {
            names.push(lowered);
            names.sort();
        }
    }

    pub fn for_archive(&self, digest: &ArchiveDigest) -> &[String] {
        self.0.get(digest).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn merge(&mut self, other: TentativeNames) {
        for (digest, names) in other.0 {
            for name in names {
                self.add(digest, &name);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn digest(byte: u8) -> ArchiveDigest {
        ArchiveDigest([byte; 32])
    }

    fn truncated(byte: u8) -> TruncatedDigest {
        TruncatedDigest([byte; 9])
    }

    #[test]
    fn finds_files_by_hash_across_archives() {
        let mut index = ArchiveIndex::new();
        let mut a = Archive::new(digest(1), 10, "A".to_string());
        a.files.push(FileInArchive {
            intra_path: IntraArchivePath::new("data\\foo.dds").unwrap(),
            file_hash: truncated(9),
            file_size: 4,
        });
        index.insert(a);

        let hits = index.find_by_file_hash(&truncated(9));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.archive_hash, digest(1));
    }

    #[test]
    fn tentative_names_are_monotonic_and_deduped() {
        let mut names = TentativeNames::new();
        names.add(digest(2), "Foo.zip");
        names.add(digest(2), "foo.zip");
        names.add(digest(2), "Bar.zip");
        assert_eq!(names.for_archive(&digest(2)), &["bar.zip", "foo.zip"]);
    }

    #[test]
    #[should_panic(expected = "already indexed")]
    fn rejects_duplicate_archive_insert() {
        let mut index = ArchiveIndex::new();
        index.insert(Archive::new(digest(3), 1, "A".to_string()));
        index.insert(Archive::new(digest(3), 1, "B".to_string()));
    }
}
