//! The archive query adapter
//!
//! [`ArchiveAdapter`] owns the registered backends and implements the
//! single `resolve` contract: validate the request's parameters against
//! the instrument tables, select a backend, build the typed query,
//! dispatch it, and return the record set sorted ascending by content
//! timestamp with duplicate identifiers dropped.
//!
//! Backend selection for SDO instruments prefers JSOC when the request
//! carries an account identifier (the export service wants a contact
//! address) and falls back to the VSO search path when it does not. IRIS
//! and SOHO are VSO-only; Learmonth has its own archive. A request whose
//! preferred backend is not registered fails with `BackendUnavailable`.
//!
//! `resolve` performs no filesystem side effects.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::debug;

use helio_core::{
    AiaCadence, HmiSeries, InstrumentId, IrisObsType, LascoDetector, RecordDescriptor,
    RetrievalRequest, SohoTelescope, ValidationError, ValidationResult,
};

use crate::backend::{ArchiveBackend, ArchiveQuery, BackendKind};
use crate::error::{ArchiveError, ArchiveResult, BackendError, FetchError};
use crate::{jsoc, learmonth, vso};

/// A validated request bound to the backend that will serve it.
#[derive(Debug)]
pub struct ResolvedRequest {
    /// Backend that produced (and will fetch) the records
    pub backend: BackendKind,
    /// Record set, ascending by content timestamp, duplicates dropped
    pub records: Vec<RecordDescriptor>,
}

/// Translates normalized retrieval requests into backend-specific queries.
pub struct ArchiveAdapter {
    backends: HashMap<BackendKind, Box<dyn ArchiveBackend>>,
}

impl ArchiveAdapter {
    /// Create an adapter with no registered backends.
    pub fn new() -> Self {
        ArchiveAdapter {
            backends: HashMap::new(),
        }
    }

    /// Register a backend implementation, replacing any previous one of
    /// the same kind.
    pub fn register(&mut self, backend: Box<dyn ArchiveBackend>) {
        self.backends.insert(backend.kind(), backend);
    }

    /// Whether a backend of this kind is registered.
    pub fn has_backend(&self, kind: BackendKind) -> bool {
        self.backends.contains_key(&kind)
    }

    /// Validate request parameters without touching the network.
    ///
    /// This is the fail-fast path the coordinator runs at submit time:
    /// required-key presence plus value-level checks (wavelength tables,
    /// series names). A request that passes here can still fail at
    /// resolution if the backend rejects it.
    pub fn validate(&self, request: &RetrievalRequest) -> ValidationResult<()> {
        request.validate_required_params()?;
        // Building the query exercises every value-level table.
        self.build_query(request, self.preferred_backend(request))?;
        Ok(())
    }

    /// Resolve a request into an ordered record set.
    pub fn resolve(&self, request: &RetrievalRequest) -> ArchiveResult<ResolvedRequest> {
        request.validate_required_params()?;

        let kind = self.preferred_backend(request);
        let backend = self.backends.get(&kind).ok_or_else(|| {
            ArchiveError::BackendUnavailable {
                backend: kind.to_string(),
                reason: "backend not registered".to_string(),
            }
        })?;

        let query = self.build_query(request, kind)?;
        debug!(instrument = %request.instrument(), backend = %kind, "resolving archive query");

        let mut records = backend.query(&query).map_err(|err| match err {
            BackendError::Unavailable(reason) => ArchiveError::BackendUnavailable {
                backend: kind.to_string(),
                reason,
            },
            BackendError::Rejected(reason) => ArchiveError::BackendRejected {
                backend: kind.to_string(),
                reason,
            },
        })?;

        // Stable ordering: ascending content timestamp, id as tie-break,
        // so progress percentages are deterministic across retries.
        records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        records.dedup_by(|a, b| a.id == b.id);

        debug!(
            backend = %kind,
            records = records.len(),
            "archive query resolved"
        );
        Ok(ResolvedRequest {
            backend: kind,
            records,
        })
    }

    /// Fetch one record through the backend that resolved it.
    pub fn fetch(
        &self,
        backend: BackendKind,
        record: &RecordDescriptor,
        dest: &std::path::Path,
    ) -> Result<u64, FetchError> {
        match self.backends.get(&backend) {
            Some(b) => b.fetch(record, dest),
            None => Err(FetchError::Fatal(format!(
                "backend {} not registered",
                backend
            ))),
        }
    }

    /// Preferred backend for a request, applying the account fallback.
    fn preferred_backend(&self, request: &RetrievalRequest) -> BackendKind {
        match request.instrument() {
            InstrumentId::Aia | InstrumentId::Hmi => {
                if request.account().is_some() && self.has_backend(BackendKind::Jsoc) {
                    BackendKind::Jsoc
                } else {
                    BackendKind::Vso
                }
            }
            InstrumentId::Iris | InstrumentId::Soho => BackendKind::Vso,
            InstrumentId::Learmonth => BackendKind::Learmonth,
        }
    }

    /// Build the typed query for a request, validating parameter values.
    fn build_query(
        &self,
        request: &RetrievalRequest,
        kind: BackendKind,
    ) -> ValidationResult<ArchiveQuery> {
        let range = request.range();
        match request.instrument() {
            InstrumentId::Aia => {
                let wavelength = parse_wavelength(request.param("wavelength"))?;
                let cadence =
                    AiaCadence::from_str(request.param("cadence").unwrap_or("12s"))?;
                match kind {
                    BackendKind::Jsoc => {
                        let command = jsoc::aia_export_command(wavelength, cadence, range)?;
                        Ok(ArchiveQuery::JsocExport {
                            command,
                            // preferred_backend only picks JSOC when an
                            // account is present
                            account: request.account().unwrap_or_default().to_string(),
                        })
                    }
                    _ => vso::aia_search(wavelength, cadence, range),
                }
            }
            InstrumentId::Hmi => {
                let raw_series = request.param("series").ok_or_else(|| {
                    ValidationError::MissingParameter {
                        instrument: request.instrument().to_string(),
                        key: "series".to_string(),
                    }
                })?;
                let series = HmiSeries::from_str(raw_series)?;
                match kind {
                    BackendKind::Jsoc => Ok(ArchiveQuery::JsocExport {
                        command: jsoc::hmi_export_command(series, range),
                        account: request.account().unwrap_or_default().to_string(),
                    }),
                    _ => Ok(vso::hmi_search(series, range)),
                }
            }
            InstrumentId::Iris => {
                let obs_type = match request.param("obs_type") {
                    Some(raw) => IrisObsType::from_str(raw)?,
                    None => IrisObsType::Sji,
                };
                let wavelength = request
                    .param("wavelength")
                    .map(|raw| parse_wavelength(Some(raw)))
                    .transpose()?;
                vso::iris_search(obs_type, wavelength, range)
            }
            InstrumentId::Soho => {
                let raw_telescope = request.param("telescope").ok_or_else(|| {
                    ValidationError::MissingParameter {
                        instrument: request.instrument().to_string(),
                        key: "telescope".to_string(),
                    }
                })?;
                let telescope = SohoTelescope::from_str(raw_telescope)?;
                let wavelength = request
                    .param("wavelength")
                    .map(|raw| parse_wavelength(Some(raw)))
                    .transpose()?;
                let detector = request
                    .param("detector")
                    .map(LascoDetector::from_str)
                    .transpose()?;
                vso::soho_search(telescope, wavelength, detector, range)
            }
            InstrumentId::Learmonth => Ok(learmonth::srs_query(range)),
        }
    }
}

impl Default for ArchiveAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_wavelength(raw: Option<&str>) -> ValidationResult<u16> {
    let raw = raw.ok_or_else(|| ValidationError::MissingParameter {
        instrument: "aia".to_string(),
        key: "wavelength".to_string(),
    })?;
    raw.parse::<u16>()
        .map_err(|_| ValidationError::InvalidParameter {
            key: "wavelength".to_string(),
            value: raw.to_string(),
            reason: "expected an integer number of angstroms".to_string(),
        })
}
