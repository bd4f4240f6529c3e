//! Retrieval requests
//!
//! A [`RetrievalRequest`] is the normalized form of "fetch this instrument's
//! data for this time range with these parameters". It is immutable once
//! built, and its [`fingerprint`](RetrievalRequest::fingerprint) is derived
//! from every field with parameters in stable key order, so two requests
//! that mean the same thing always share a cache key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ValidationError, ValidationResult};
use crate::fingerprint::Fingerprint;
use crate::types::InstrumentId;

/// Inclusive time range of requested observations.
///
/// Both instants are timezone-aware UTC. Construction enforces
/// `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start instant (inclusive)
    pub start: DateTime<Utc>,
    /// End instant (inclusive)
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult<Self> {
        if start > end {
            return Err(ValidationError::InvalidTimeRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(TimeRange { start, end })
    }

    /// Duration of the range in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    /// Whether `instant` falls inside the range.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// A normalized, immutable retrieval request.
///
/// Parameters are held as a string map whose required keys depend on the
/// instrument (`wavelength`/`cadence` for AIA, `series` for HMI, and so
/// on); the archive adapter validates and parses them into typed queries.
/// The optional account identifier is the JSOC export contact address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalRequest {
    instrument: InstrumentId,
    range: TimeRange,
    params: BTreeMap<String, String>,
    account: Option<String>,
}

impl RetrievalRequest {
    /// Create a request with no extra parameters.
    pub fn new(instrument: InstrumentId, range: TimeRange) -> Self {
        RetrievalRequest {
            instrument,
            range,
            params: BTreeMap::new(),
            account: None,
        }
    }

    /// Add an instrument parameter (builder style).
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the account/contact identifier used by account-aware backends.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    /// Instrument this request targets.
    pub fn instrument(&self) -> InstrumentId {
        self.instrument
    }

    /// Requested time range.
    pub fn range(&self) -> TimeRange {
        self.range
    }

    /// Instrument parameter by key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// All instrument parameters in key order.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Account identifier, if configured.
    pub fn account(&self) -> Option<&str> {
        self.account.as_deref()
    }

    /// Verify that every required parameter for the instrument is present.
    ///
    /// Value-level validation (wavelength tables, series names) belongs to
    /// the archive adapter; this only enforces presence.
    pub fn validate_required_params(&self) -> ValidationResult<()> {
        for key in self.instrument.required_params() {
            if !self.params.contains_key(*key) {
                return Err(ValidationError::MissingParameter {
                    instrument: self.instrument.to_string(),
                    key: (*key).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Canonical fingerprint over all fields.
    ///
    /// The rendering is `instrument|start|end|k=v|k=v|account` with
    /// parameters in key order (BTreeMap iteration), so insertion order
    /// never influences the key.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut canonical = String::new();
        canonical.push_str(&self.instrument.to_string());
        canonical.push('|');
        canonical.push_str(&self.range.start.to_rfc3339());
        canonical.push('|');
        canonical.push_str(&self.range.end.to_rfc3339());
        for (key, value) in &self.params {
            canonical.push('|');
            canonical.push_str(key);
            canonical.push('=');
            canonical.push_str(value);
        }
        if let Some(account) = &self.account {
            canonical.push('|');
            canonical.push_str("account=");
            canonical.push_str(account);
        }
        Fingerprint::digest(canonical.as_bytes())
    }
}

impl fmt::Display for RetrievalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.instrument, self.range)
    }
}
