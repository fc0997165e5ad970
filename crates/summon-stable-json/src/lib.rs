//! Canonical ("stable") JSON: the persisted form spec.md requires for every
//! cache and index file so that unchanged runs produce byte-identical
//! output and diffs stay readable in version control.
//!
//! Rules (spec.md §6): UTF-8, LF newlines, one-space indent, map keys and
//! schema-declared list items sorted, byte strings as unpadded base64,
//! enums as their integer value. serde_json already sorts map keys for us
//! as long as the map type is a `BTreeMap`; list sorting is the caller's
//! responsibility (`sort_by_schema_key`) because the primary key differs
//! per schema.

mod int_enum;

pub use int_enum::IntEnum;

use std::io::Write;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StableJsonError {
    #[error("failed to serialize to stable JSON: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to parse stable JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed writing stable JSON to disk: {0}")]
    Io(#[source] std::io::Error),
}

/// Serializes `value` per the stable-JSON rules and returns the bytes ready
/// to write to disk (LF-terminated, one trailing newline, no CRLF).
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, StableJsonError> {
    let formatter = PrettyFormatter::with_indent(b" ");
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(StableJsonError::Encode)?;
    buf.push(b'\n');
    Ok(buf)
}

pub fn to_string<T: Serialize>(value: &T) -> Result<String, StableJsonError> {
    let bytes = to_vec(value)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8(bytes).expect("stable JSON output is always valid UTF-8"))
}

pub fn write_to_file<T: Serialize>(
    path: &std::path::Path,
    value: &T,
) -> Result<(), StableJsonError> {
    let bytes = to_vec(value)?;
    let mut file = std::fs::File::create(path).map_err(StableJsonError::Io)?;
    file.write_all(&bytes).map_err(StableJsonError::Io)
}

pub fn from_str<T: DeserializeOwned>(s: &str) -> Result<T, StableJsonError> {
    serde_json::from_str(s).map_err(StableJsonError::Decode)
}

pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StableJsonError> {
    serde_json::from_slice(bytes).map_err(StableJsonError::Decode)
}

pub fn read_from_file<T: DeserializeOwned>(
    path: &std::path::Path,
) -> Result<T, StableJsonError> {
    let bytes = std::fs::read(path).map_err(StableJsonError::Io)?;
    from_slice(&bytes)
}

/// Sorts `items` in place by a schema-declared primary key, the way every
/// persisted list (archive index entries, mod lists, patch records) is
/// required to be ordered before serialization.
pub fn sort_by_schema_key<T, K, F>(items: &mut [T], mut key_fn: F)
where
    K: Ord,
    F: FnMut(&T) -> K,
{
    items.sort_by(|a, b| key_fn(a).cmp(&key_fn(b)));
}

/// Unpadded base64 byte string, used for digests and other binary blobs
/// that must round-trip through stable JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Base64Bytes(pub Vec<u8>);

impl Base64Bytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Base64Bytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD_NO_PAD.encode(&self.0);
        serializer.serialize_str(&encoded)
    }
}

impl<'de> serde::Deserialize<'de> for Base64Bytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use base64::Engine;
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(s.as_bytes())
            .map(Base64Bytes)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;

    #[derive(Serialize, Deserialize)]
    struct Record {
        name: String,
        digest: Base64Bytes,
        fields: BTreeMap<String, u32>,
    }

    #[test]
    fn produces_lf_single_space_indent_and_trailing_newline() {
        let mut fields = BTreeMap::new();
        fields.insert("z".to_string(), 1);
        fields.insert("a".to_string(), 2);
        let record = Record {
            name: "mod".to_string(),
            digest: Base64Bytes::new(vec![0xde, 0xad, 0xbe, 0xef]),
            fields,
        };
        let text = to_string(&record).unwrap();
        assert!(text.ends_with('\n'));
        assert!(!text.contains("\r\n"));
        assert!(text.contains("\n \"digest\""));
        // map keys sorted: "a" appears before "z"
        assert!(text.find("\"a\"").unwrap() < text.find("\"z\"").unwrap());
    }

    #[test]
    fn base64_round_trips_without_padding() {
        let bytes = Base64Bytes::new(vec![0u8; 5]);
        let text = to_string(&bytes).unwrap();
        assert!(!text.contains('='));
        let decoded: Base64Bytes = from_str(&text).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn sort_by_schema_key_orders_by_declared_primary_key() {
        let mut items = vec![("b", 2), ("a", 1), ("c", 3)];
        sort_by_schema_key(&mut items, |(name, _)| *name);
        assert_eq!(items, vec![("a", 1), ("b", 2), ("c", 3)]);
    }
}
