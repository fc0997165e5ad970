//! Streaming digests. A file is read exactly once; the primary SHA-256
//! digest and any number of auxiliary digests (MD5 today, more pluggable
//! later) are produced from that single pass.
//!
//! Grounded on the multi-algorithm writer used by `pwinckles-bagr`'s
//! `bagit::bag` module (`MultiDigestWriter::new(algorithms, writer)` then
//! `.finalize_hex()`); the writer's own source wasn't in reach, so this is
//! rebuilt from its call shape using `digest::DynDigest` trait objects
//! instead of bagr's concrete enum, which is what lets a caller register an
//! open set of auxiliary algorithms instead of a fixed list.

use std::{
    fmt,
    io::{self, Read, Write},
};

use digest::DynDigest;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PRIMARY_ALGORITHM: &str = "sha256";

#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),
}

/// Hex-encoded digest, one per algorithm name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digests {
    pub primary: String,
    pub auxiliary: Vec<(String, String)>,
}

impl Digests {
    pub fn get(&self, algorithm: &str) -> Option<&str> {
        if algorithm.eq_ignore_ascii_case(PRIMARY_ALGORITHM) {
            return Some(&self.primary);
        }
        self.auxiliary
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(algorithm))
            .map(|(_, digest)| digest.as_str())
    }
}

impl fmt::Display for Digests {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", PRIMARY_ALGORITHM, self.primary)
    }
}

/// Builds a boxed [`DynDigest`] for an auxiliary algorithm name. Plugins
/// register factories here the way archive plugins register extractors in
/// `summon-archive`.
pub type DigestFactory = fn() -> Box<dyn DynDigest + Send>;

pub fn md5_factory() -> Box<dyn DynDigest + Send> {
    Box::new(md_5::Md5::default())
}

pub fn factory_for(algorithm: &str) -> Result<DigestFactory, HashError> {
    match algorithm.to_ascii_lowercase().as_str() {
        "md5" => Ok(md5_factory),
        other => Err(HashError::UnknownAlgorithm(other.to_string())),
    }
}

/// A `Write` sink that updates the primary digest plus any number of
/// auxiliary digests from every chunk it receives, and counts bytes seen.
pub struct MultiDigestWriter {
    primary: sha2::Sha256,
    auxiliary: Vec<(String, Box<dyn DynDigest + Send>)>,
    bytes_written: u64,
}

impl MultiDigestWriter {
    pub fn new(auxiliary_algorithms: &[String]) -> Result<Self, HashError> {
        use sha2::Digest;
        let auxiliary = auxiliary_algorithms
            .iter()
            .map(|name| factory_for(name).map(|factory| (name.clone(), factory())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            primary: sha2::Sha256::new(),
            auxiliary,
            bytes_written: 0,
        })
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn finalize_hex(self) -> Digests {
        use sha2::Digest;
        let primary = hex::encode(self.primary.finalize());
        let auxiliary = self
            .auxiliary
            .into_iter()
            .map(|(name, mut digest)| {
                let bytes = digest.finalize_reset();
                (name, hex::encode(bytes))
            })
            .collect();
        Digests { primary, auxiliary }
    }
}

impl Write for MultiDigestWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        use sha2::Digest;
        self.primary.update(buf);
        for (_, digest) in &mut self.auxiliary {
            digest.update(buf);
        }
        self.bytes_written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hashes one readable stream end to end, returning the digest set and the
/// total byte count. `source_label` is only used to annotate read errors.
pub fn hash_reader(
    mut reader: impl Read,
    source_label: &str,
    auxiliary_algorithms: &[String],
) -> Result<(Digests, u64), HashError> {
    let mut writer = MultiDigestWriter::new(auxiliary_algorithms)?;
    io::copy(&mut reader, &mut writer).map_err(|source| HashError::Read {
        path: source_label.to_string(),
        source,
    })?;
    let bytes = writer.bytes_written();
    Ok((writer.finalize_hex(), bytes))
}

pub fn hash_file(
    path: &std::path::Path,
    auxiliary_algorithms: &[String],
) -> Result<(Digests, u64), HashError> {
    let file = std::fs::File::open(path).map_err(|source| HashError::Read {
        path: path.display().to_string(),
        source,
    })?;
    hash_reader(
        io::BufReader::new(file),
        &path.display().to_string(),
        auxiliary_algorithms,
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hashes_known_vector() {
        let (digests, bytes) = hash_reader(b"abc".as_slice(), "test", &[]).unwrap();
        assert_eq!(bytes, 3);
        assert_eq!(
            digests.primary,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn computes_auxiliary_digest_alongside_primary() {
        let aux = vec!["md5".to_string()];
        let (digests, _) = hash_reader(b"abc".as_slice(), "test", &aux).unwrap();
        assert_eq!(digests.get("md5"), Some("900150983cd24fb0d6963f7d28e17f72"));
        assert!(digests.get("sha256").is_some());
    }

    #[test]
    fn unknown_auxiliary_algorithm_is_rejected() {
        let aux = vec!["sha3-512".to_string()];
        assert!(MultiDigestWriter::new(&aux).is_err());
    }
}
