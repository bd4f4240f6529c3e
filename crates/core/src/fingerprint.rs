//! Deterministic cache keys
//!
//! A [`Fingerprint`] is the SHA-256 digest of a canonical rendering of a
//! request's or record's defining fields, lowercase hex encoded. Identical
//! requests hash identically regardless of parameter insertion order, so
//! the coordinator can deduplicate in-flight downloads and the cache can
//! key entries without ever comparing full requests.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic identifier used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Digest a canonical byte rendering.
    pub fn digest(canonical: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical);
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(64);
        for byte in digest {
            use fmt::Write;
            // infallible for String
            let _ = write!(hex, "{:02x}", byte);
        }
        Fingerprint(hex)
    }

    /// The hex digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First two hex characters, used to shard the on-disk cache layout.
    pub fn shard_prefix(&self) -> &str {
        &self.0[..2]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
