//! Archive-layer errors
//!
//! Three tiers with different handling downstream:
//! - [`ArchiveError`]: request-level resolution failures; fail the task,
//!   no per-record retry
//! - [`BackendError`]: raw backend query failures, wrapped into
//!   `ArchiveError` by the adapter
//! - [`FetchError`]: per-record transfer failures; `Transient` variants
//!   are retried with backoff, `Fatal` ones are not

use thiserror::Error;

use helio_core::ValidationError;

/// Request-level archive resolution errors.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Request parameters failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No registered backend can serve the request
    #[error("backend {backend} unavailable: {reason}")]
    BackendUnavailable {
        /// Backend that would have served the request
        backend: String,
        /// Why it cannot
        reason: String,
    },

    /// The backend understood the query and refused it
    #[error("backend {backend} rejected query: {reason}")]
    BackendRejected {
        /// Backend that rejected
        backend: String,
        /// Backend-supplied reason
        reason: String,
    },
}

/// Result alias for resolution.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Raw query failure reported by a backend implementation.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend is unreachable or returned a server-side failure
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Backend parsed the query and rejected it
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Per-record transfer failure reported by a backend implementation.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transient condition (timeout, connection reset); subject to retry
    #[error("transient transfer failure: {0}")]
    Transient(String),

    /// Permanent condition (record gone, auth failure); never retried
    #[error("fatal transfer failure: {0}")]
    Fatal(String),
}

impl FetchError {
    /// Whether the retry policy applies to this failure.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}
