//! Fixed-width digest newtypes. `ArchiveDigest` is the full SHA-256 of an
//! archive or downloaded file; `TruncatedDigest` is the 9-byte prefix used
//! for `FileInArchive` entries (spec.md §3: "truncated digest (9 bytes)").
//! Both round-trip through stable JSON as unpadded base64, per spec.md §6.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArchiveDigest(pub [u8; 32]);

impl ArchiveDigest {
    pub const EMPTY_SHA256_HEX: &'static str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let bytes = hex::decode(hex_str).ok()?;
        let array: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn truncate(&self) -> TruncatedDigest {
        let mut out = [0u8; 9];
        out.copy_from_slice(&self.0[..9]);
        TruncatedDigest(out)
    }

    pub fn is_empty_file(&self) -> bool {
        self.to_hex() == Self::EMPTY_SHA256_HEX
    }

    pub fn empty_file() -> Self {
        Self::from_hex(Self::EMPTY_SHA256_HEX).expect("valid static hex")
    }
}

impl fmt::Display for ArchiveDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for ArchiveDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use base64::Engine;
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD_NO_PAD.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for ArchiveDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use base64::Engine;
        let s = String::deserialize(deserializer)?;
        let bytes = base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32-byte digest"))?;
        Ok(Self(array))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TruncatedDigest(pub [u8; 9]);

impl TruncatedDigest {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TruncatedDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for TruncatedDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use base64::Engine;
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD_NO_PAD.encode(self.0))
    }
}

impl<'de> Deserialize<'de> for TruncatedDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use base64::Engine;
        let s = String::deserialize(deserializer)?;
        let bytes = base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)?;
        let array: [u8; 9] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 9-byte truncated digest"))?;
        Ok(Self(array))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truncates_to_nine_bytes() {
        let full = ArchiveDigest([7u8; 32]);
        let truncated = full.truncate();
        assert_eq!(truncated.0.len(), 9);
        assert!(truncated.0.iter().all(|&b| b == 7));
    }

    #[test]
    fn base64_round_trips_without_padding() {
        let digest = ArchiveDigest([9u8; 32]);
        let text = summon_stable_json::to_string(&digest).unwrap();
        assert!(!text.contains('='));
        let back: ArchiveDigest = summon_stable_json::from_str(&text).unwrap();
        assert_eq!(back, digest);
    }

    #[test]
    fn recognizes_the_empty_file_digest() {
        assert!(ArchiveDigest::empty_file().is_empty_file());
    }
}
