//! Cache-layer errors

use thiserror::Error;

use helio_core::Fingerprint;

/// Errors surfaced by the cache store.
///
/// An insert failure always leaves the index unchanged; callers never see
/// a half-applied mutation.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Insert of a fingerprint that is already cached
    #[error("duplicate fingerprint: {0}")]
    DuplicateFingerprint(Fingerprint),

    /// Evict of a fingerprint that is not cached
    #[error("fingerprint not found: {0}")]
    NotFound(Fingerprint),

    /// Disk read/write failure
    #[error("cache I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Index (de)serialization failure
    #[error("cache index serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
