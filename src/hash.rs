use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::Error;

/// SHA-256 hash used for content addressing
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 32]);

impl Hash {
    /// zero hash (useful as sentinel)
    pub const ZERO: Hash = Hash([0u8; 32]);

    /// create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// parse from hex string
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidHashHex(s.to_string()))?;
        if bytes.len() != 32 {
            return Err(Error::InvalidHashHex(s.to_string()));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// abbreviated hex form for log fields
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }

    /// split into path components for object store
    /// returns (first 2 hex chars, remaining 62 hex chars)
    pub fn to_path_components(&self) -> (String, String) {
        let hex = self.to_hex();
        (hex[..2].to_string(), hex[2..].to_string())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short())
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// domain tags keep a blob and a tree/commit with equal bytes from colliding
const BLOB_TAG: &[u8] = b"blob";
const TREE_TAG: &[u8] = b"tree";
const COMMIT_TAG: &[u8] = b"commit";

/// normalize a definition before hashing
///
/// CRLF becomes LF, trailing whitespace is stripped from every line and
/// trailing blank lines are dropped. everything else is kept verbatim.
pub fn normalize_definition(content: &str) -> String {
    let mut lines: Vec<&str> = content
        .split('\n')
        .map(|line| line.trim_end_matches('\r').trim_end())
        .collect();

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

/// compute blob hash over already-normalized content
///
/// format:
///   tag: "blob"
///   content_len: 8 bytes LE
///   content: bytes
pub fn compute_blob_hash(normalized: &str) -> Hash {
    tagged_hash(BLOB_TAG, normalized.as_bytes())
}

/// compute tree hash over its canonical (uncompressed) CBOR encoding
pub fn compute_tree_hash(canonical: &[u8]) -> Hash {
    tagged_hash(TREE_TAG, canonical)
}

/// compute commit hash over its canonical (uncompressed) CBOR encoding
pub fn compute_commit_hash(canonical: &[u8]) -> Hash {
    tagged_hash(COMMIT_TAG, canonical)
}

fn tagged_hash(tag: &[u8], payload: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    hasher.update((payload.len() as u64).to_le_bytes());
    hasher.update(payload);
    Hash(hasher.finalize().into())
}
