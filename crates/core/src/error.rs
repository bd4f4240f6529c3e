//! Request validation errors
//!
//! Validation failures are surfaced immediately at submit time and never
//! retried. Everything network- or disk-related lives in the archive and
//! cache crates; this type only covers bad or missing request parameters.

use thiserror::Error;

/// Errors produced while validating a retrieval request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Instrument is not in the supported set
    #[error("unsupported instrument: {0}")]
    UnsupportedInstrument(String),

    /// A required instrument parameter is absent
    #[error("missing required parameter '{key}' for instrument {instrument}")]
    MissingParameter {
        /// Instrument the parameter belongs to
        instrument: String,
        /// The absent parameter key
        key: String,
    },

    /// A parameter is present but its value is not acceptable
    #[error("invalid value '{value}' for parameter '{key}': {reason}")]
    InvalidParameter {
        /// Parameter key
        key: String,
        /// Rejected value
        value: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Time range with start after end
    #[error("invalid time range: start {start} is after end {end}")]
    InvalidTimeRange {
        /// Requested start instant (RFC 3339)
        start: String,
        /// Requested end instant (RFC 3339)
        end: String,
    },
}

/// Result alias for validation.
pub type ValidationResult<T> = Result<T, ValidationError>;
