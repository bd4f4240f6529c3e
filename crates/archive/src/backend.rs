//! The backend seam
//!
//! An [`ArchiveBackend`] is the external collaborator boundary: "query
//! records for a typed archive query" and "fetch one record to a local
//! path". Everything network-specific (DRMS sessions, VSO endpoints, plain
//! HTTPS file downloads) lives behind this trait; the rest of the system
//! only sees [`RecordDescriptor`]s and staged files.
//!
//! Implementations must be `Send + Sync`: one backend instance is shared
//! by every concurrently running download task. Each `fetch` attempt is
//! expected to bound its own transfer time and report an overrun as
//! [`FetchError::Transient`].
//!
//! [`RecordDescriptor`]: helio_core::RecordDescriptor

use chrono::{DateTime, Utc};
use std::fmt;
use std::path::Path;

use helio_core::RecordDescriptor;

use crate::error::{BackendError, FetchError};

/// The closed set of archive backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// JSOC/DRMS export service (SDO data, account-aware)
    Jsoc,
    /// Virtual Solar Observatory style search (no account required)
    Vso,
    /// Learmonth static file archive (daily SRS files)
    Learmonth,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Jsoc => write!(f, "jsoc"),
            BackendKind::Vso => write!(f, "vso"),
            BackendKind::Learmonth => write!(f, "learmonth"),
        }
    }
}

/// A backend-specific, fully validated query.
///
/// Produced by the adapter after parameter validation; consumed by the
/// matching [`ArchiveBackend`] implementation.
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveQuery {
    /// DRMS export: a record-set command plus the export contact address.
    JsocExport {
        /// Record-set command, e.g. `aia.lev1_euv_12s[2024.01.01_00:00:00_UTC/1h@12s][171]`
        command: String,
        /// Contact address registered with the export service
        account: String,
    },
    /// VSO-style attribute search.
    VsoSearch {
        /// Instrument name as the archive spells it (`AIA`, `HMI`, `IRIS`, `EIT`...)
        instrument: String,
        /// Search window start
        start: DateTime<Utc>,
        /// Search window end
        end: DateTime<Utc>,
        /// Wavelength in angstroms, when the instrument filters by one
        wavelength: Option<u16>,
        /// Sampling cadence in seconds
        sample_secs: Option<u64>,
        /// Physical observable (HMI searches)
        physobs: Option<String>,
        /// Detector (SOHO/LASCO searches)
        detector: Option<String>,
        /// Data level (IRIS raster searches use level 2)
        level: Option<u8>,
    },
    /// Learmonth archive: one SRS file per listed UTC day.
    SrsFiles {
        /// File names in ascending date order, e.g. `LM240101.srs`
        files: Vec<String>,
    },
}

/// External archive collaborator.
pub trait ArchiveBackend: Send + Sync {
    /// Which backend this implementation serves.
    fn kind(&self) -> BackendKind;

    /// Resolve a query into the records it matches.
    ///
    /// Ordering is not required here; the adapter sorts by content
    /// timestamp before handing records to a download task.
    fn query(&self, query: &ArchiveQuery) -> Result<Vec<RecordDescriptor>, BackendError>;

    /// Transfer one record into `dest`, returning the byte count written.
    ///
    /// `dest` is a private staging path owned by the calling task; the
    /// implementation must not write anywhere else.
    fn fetch(&self, record: &RecordDescriptor, dest: &Path) -> Result<u64, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_display() {
        assert_eq!(BackendKind::Jsoc.to_string(), "jsoc");
        assert_eq!(BackendKind::Vso.to_string(), "vso");
        assert_eq!(BackendKind::Learmonth.to_string(), "learmonth");
    }

    #[test]
    fn test_trait_is_object_safe() {
        fn _assert_object_safe(_: &dyn ArchiveBackend) {}
    }
}
