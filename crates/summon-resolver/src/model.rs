//! The "how can this digest be produced" answer: spec.md §4.4's ordered
//! list of retrievers for a digest.
//!
//! Grounded on `original_source/summonmm/helpers/file_retriever.py`'s
//! `FileRetriever` hierarchy (`ZeroFileRetriever`, `GithubFileRetriever`,
//! `ArchiveFileRetriever`/`ArchiveFileRetrieverHelper`). Collapsed into one
//! Rust enum instead of a class hierarchy, since every variant here is pure
//! data — the original's `fetch`/`fetch_for_reading` methods belong to a
//! later installation stage this crate's scope (spec.md §4.4) doesn't cover.

use serde::{Deserialize, Serialize};
use summon_archive_index::{ArchiveDigest, FileInArchive};
use summon_paths::AnchoredSystemPathBuf;

/// One step of an outer→inner archive-extraction chain: "this file, at this
/// intra-archive path, lives inside this archive".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveHop {
    pub archive_hash: ArchiveDigest,
    pub archive_size: u64,
    pub file_in_archive: FileInArchive,
}

/// A fully-resolved path to some digest nested inside one or more archives,
/// outermost hop first (`original_source/file_retriever.py`'s
/// `single_archive_retrievers: outermost to innermost`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRetrieval {
    pub target_hash: ArchiveDigest,
    pub target_size: u64,
    pub hops: Vec<ArchiveHop>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileRetriever {
    /// The empty-content digest — always satisfiable without fetching
    /// anything (spec.md §4.4 step 1).
    Zero,
    /// Present verbatim in the companion repo checkout, at `from_path`
    /// relative to whichever known github root contains it.
    Github {
        author: String,
        project: String,
        from_path: AnchoredSystemPathBuf,
    },
    Archive(ArchiveRetrieval),
}

impl FileRetriever {
    pub fn is_zero(&self) -> bool {
        matches!(self, FileRetriever::Zero)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_retriever_is_recognized() {
        assert!(FileRetriever::Zero.is_zero());
    }
}
