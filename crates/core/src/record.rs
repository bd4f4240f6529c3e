//! Record descriptors
//!
//! A [`RecordDescriptor`] names one remotely fetchable file in a request's
//! result set: a JSOC export record, a VSO search result, or one Learmonth
//! SRS day file. Descriptors are produced by the archive adapter in
//! ascending content-timestamp order and consumed by the download task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::fingerprint::Fingerprint;
use crate::types::InstrumentId;

/// Backend-scoped identifier of one remote file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a backend-provided identifier.
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One addressable remote file belonging to a request's result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDescriptor {
    /// Remote identifier understood by the producing backend
    pub id: RecordId,
    /// Instrument the record belongs to
    pub instrument: InstrumentId,
    /// Content timestamp of the observation
    pub timestamp: DateTime<Utc>,
    /// Expected byte size, when the backend reports one
    pub expected_size: Option<u64>,
}

impl RecordDescriptor {
    /// Create a descriptor without a known size.
    pub fn new(
        id: impl Into<String>,
        instrument: InstrumentId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        RecordDescriptor {
            id: RecordId::new(id),
            instrument,
            timestamp,
            expected_size: None,
        }
    }

    /// Attach the expected byte size (builder style).
    pub fn with_expected_size(mut self, size: u64) -> Self {
        self.expected_size = Some(size);
        self
    }

    /// Per-record cache key: instrument plus remote identifier.
    ///
    /// Independent of the request that resolved the record, so the same
    /// exposure requested through two overlapping time ranges is cached
    /// once.
    pub fn fingerprint(&self) -> Fingerprint {
        let canonical = format!("record|{}|{}", self.instrument, self.id);
        Fingerprint::digest(canonical.as_bytes())
    }
}

impl fmt::Display for RecordDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} @ {}", self.instrument, self.id, self.timestamp.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, min, 0).unwrap()
    }

    #[test]
    fn test_record_fingerprint_independent_of_timestamp_and_size() {
        let a = RecordDescriptor::new("aia.lev1_euv_12s[0]", InstrumentId::Aia, ts(0));
        let b = RecordDescriptor::new("aia.lev1_euv_12s[0]", InstrumentId::Aia, ts(30))
            .with_expected_size(4096);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_record_fingerprint_scoped_by_instrument() {
        let a = RecordDescriptor::new("0", InstrumentId::Aia, ts(0));
        let b = RecordDescriptor::new("0", InstrumentId::Hmi, ts(0));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_record_and_request_keys_do_not_collide() {
        // The "record|" prefix keeps per-record keys out of the request
        // fingerprint space even for pathological identifiers.
        let record = RecordDescriptor::new("x", InstrumentId::Aia, ts(0));
        assert!(record.fingerprint().as_str().len() == 64);
    }
}
