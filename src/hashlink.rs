//! Content hashing for stored documents
//!
//! Every record is addressed by the hashlink of its parsed content. The
//! default [`Sha256Hasher`] digests the canonical JSON form, so two documents
//! that differ only in whitespace or key order share one hashlink.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Content-derived identifier of a document
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hashlink(String);

impl Hashlink {
    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check that `content` still hashes to this hashlink
    pub fn verify<H: ContentHasher + ?Sized>(&self, hasher: &H, content: &serde_json::Value) -> bool {
        hasher.hash(content) == *self
    }
}

impl fmt::Display for Hashlink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Hashlink {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Hashlink {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Computes hashlinks from parsed content
pub trait ContentHasher: Send + Sync {
    fn hash(&self, content: &serde_json::Value) -> Hashlink;
}

/// SHA256 over canonical JSON, hex encoded
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Sha256Hasher {
    pub fn new() -> Self {
        Self
    }

    /// Compute a hashlink from raw bytes
    pub fn digest_bytes(data: &[u8]) -> Hashlink {
        let hash = Sha256::digest(data);
        Hashlink(format!("{:x}", hash))
    }
}

impl ContentHasher for Sha256Hasher {
    fn hash(&self, content: &serde_json::Value) -> Hashlink {
        let canonical = canonicalize(content).to_string();
        Self::digest_bytes(canonical.as_bytes())
    }
}

/// Rebuild `value` with every object's keys in sorted order.
///
/// Holds even when `serde_json` is built with `preserve_order`.
pub fn canonicalize(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let sorted = keys
                .into_iter()
                .map(|k| (k.clone(), canonicalize(&map[k])))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

impl<H: ContentHasher + ?Sized> ContentHasher for &H {
    fn hash(&self, content: &serde_json::Value) -> Hashlink {
        (**self).hash(content)
    }
}

impl<H: ContentHasher + ?Sized> ContentHasher for std::sync::Arc<H> {
    fn hash(&self, content: &serde_json::Value) -> Hashlink {
        (**self).hash(content)
    }
}
