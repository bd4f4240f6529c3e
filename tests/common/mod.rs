//! Shared fixtures for the integration tests
//!
//! Provides an in-memory mock archive backend with scriptable failures
//! and per-fetch delays, plus builders for clients and requests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

use helio_archive::{ArchiveBackend, ArchiveQuery, BackendError, BackendKind, FetchError};
use helio_core::{InstrumentId, RecordDescriptor, RetrievalRequest, TimeRange};
use heliodata::{Helio, HelioBuilder};

/// How a scripted record behaves when fetched.
#[derive(Clone, Copy)]
pub enum FetchScript {
    /// Fail transiently this many times, then succeed
    Transient(u32),
    /// Always fail fatally
    Fatal,
}

/// In-memory archive backend with observable fetch counts.
pub struct MockBackend {
    kind: BackendKind,
    records: Vec<RecordDescriptor>,
    delay: Duration,
    scripts: Mutex<HashMap<String, FetchScript>>,
    remaining: Mutex<HashMap<String, u32>>,
    queries: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new(kind: BackendKind, records: Vec<RecordDescriptor>) -> Self {
        MockBackend {
            kind,
            records,
            delay: Duration::ZERO,
            scripts: Mutex::new(HashMap::new()),
            remaining: Mutex::new(HashMap::new()),
            queries: Arc::new(AtomicUsize::new(0)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Script the behavior of one record's fetches.
    pub fn with_script(self, id: &str, script: FetchScript) -> Self {
        self.scripts.lock().insert(id.to_string(), script);
        if let FetchScript::Transient(count) = script {
            self.remaining.lock().insert(id.to_string(), count);
        }
        self
    }

    /// Counter incremented once per `query` call.
    pub fn query_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.queries)
    }

    /// Counter incremented once per `fetch` call.
    pub fn fetch_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

impl ArchiveBackend for MockBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn query(&self, _query: &ArchiveQuery) -> Result<Vec<RecordDescriptor>, BackendError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }

    fn fetch(&self, record: &RecordDescriptor, dest: &Path) -> Result<u64, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match self.scripts.lock().get(record.id.as_str()) {
            Some(FetchScript::Fatal) => {
                return Err(FetchError::Fatal("record withdrawn from archive".into()))
            }
            Some(FetchScript::Transient(_)) => {
                let mut remaining = self.remaining.lock();
                let left = remaining.entry(record.id.to_string()).or_insert(0);
                if *left > 0 {
                    *left -= 1;
                    return Err(FetchError::Transient("connection reset by peer".into()));
                }
            }
            None => {}
        }
        let body = record_body(record);
        std::fs::write(dest, &body).map_err(|e| FetchError::Fatal(e.to_string()))?;
        Ok(body.len() as u64)
    }
}

/// Deterministic file body for a record, so tests can verify content.
pub fn record_body(record: &RecordDescriptor) -> Vec<u8> {
    format!("SIMPLE  = T / {}", record.id).into_bytes()
}

pub fn ts(min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, min, 0).unwrap()
}

pub fn record(id: &str, min: u32) -> RecordDescriptor {
    RecordDescriptor::new(id, InstrumentId::Aia, ts(min))
}

pub fn aia_records(count: u32) -> Vec<RecordDescriptor> {
    (0..count)
        .map(|i| record(&format!("aia.lev1_euv_12s[{}]", i), i))
        .collect()
}

pub fn hour_range() -> TimeRange {
    TimeRange::new(ts(0), Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()).unwrap()
}

pub fn aia_request(wavelength: &str) -> RetrievalRequest {
    RetrievalRequest::new(InstrumentId::Aia, hour_range())
        .with_param("wavelength", wavelength)
        .with_param("cadence", "12s")
}

/// Client over a single mock backend, caching under `dir`.
///
/// Retry backoff is shortened so scripted transient failures do not slow
/// the suite down.
pub fn client_with(dir: &tempfile::TempDir, backend: MockBackend) -> Helio {
    builder(dir).backend(Box::new(backend)).open().expect("client opens")
}

pub fn builder(dir: &tempfile::TempDir) -> HelioBuilder {
    HelioBuilder::from_config(heliodata::HelioConfig::default())
        .cache_root(dir.path())
        .retry(heliodata::prelude::RetryConfig {
            max_attempts: 3,
            backoff_ms: 1,
        })
}
