//! Cache entries and usage accounting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use helio_core::{Fingerprint, InstrumentId, RecordId};

/// Where a cache entry came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryOrigin {
    /// One fetched record
    Record {
        /// Instrument the record belongs to
        instrument: InstrumentId,
        /// Backend record identifier
        record_id: RecordId,
        /// Content timestamp of the observation
        timestamp: DateTime<Utc>,
    },
    /// A request manifest: proof that a request was fully satisfied,
    /// listing the member record fingerprints
    Manifest {
        /// Instrument of the originating request
        instrument: InstrumentId,
        /// Fingerprints of the member record entries
        members: Vec<Fingerprint>,
    },
}

impl EntryOrigin {
    /// Member fingerprints when this is a manifest.
    pub fn manifest_members(&self) -> Option<&[Fingerprint]> {
        match self {
            EntryOrigin::Manifest { members, .. } => Some(members),
            EntryOrigin::Record { .. } => None,
        }
    }
}

/// One cached file plus its bookkeeping.
///
/// Invariant: the file at `relative_path` (under the cache root) exists
/// and is exactly `size` bytes long. Entries violating this are purged on
/// lookup and never served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache key
    pub fingerprint: Fingerprint,
    /// File location relative to the cache root
    pub relative_path: String,
    /// Byte size recorded at insert time
    pub size: u64,
    /// Insert instant
    pub created_at: DateTime<Utc>,
    /// Last successful lookup hit (starts equal to `created_at`)
    pub last_accessed: DateTime<Utc>,
    /// Provenance
    pub origin: EntryOrigin,
}

/// Aggregate cache usage, maintained incrementally on insert/evict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheUsage {
    /// Sum of live entries' sizes
    pub total_bytes: u64,
    /// Number of live entries
    pub entry_count: u64,
}
