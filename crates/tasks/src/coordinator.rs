//! The task coordinator
//!
//! Single entry point for submitting retrieval work. One mutex guards the
//! active-task map, the closed flag, and the fully-cached check, so the
//! dedup guarantee holds even when two callers submit the same request at
//! the same instant: exactly one observes the miss and spawns, the other
//! joins the running task.
//!
//! Shutdown flips the closed flag (subsequent submits are rejected),
//! cancels every active task, and joins every worker thread before
//! returning; no thread outlives the coordinator.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use helio_archive::ArchiveAdapter;
use helio_cache::{CacheEntry, CacheStore, RetentionPolicy};
use helio_core::{Fingerprint, RetrievalRequest};

use crate::error::{TaskError, TaskResult};
use crate::handle::{TaskHandle, TaskShared};
use crate::task::{self, RetryPolicy, TaskContext};

/// Result of submitting a request.
pub enum Submission {
    /// Fully satisfied from cache; the member entries, in record order.
    /// No thread was spawned.
    Cached(Vec<CacheEntry>),
    /// A new task was started for this request
    Started(TaskHandle),
    /// A task for the same fingerprint was already running; this handle
    /// observes it
    Joined(TaskHandle),
}

impl fmt::Debug for Submission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Submission::Cached(entries) => {
                f.debug_struct("Cached").field("entries", &entries.len()).finish()
            }
            Submission::Started(handle) => {
                f.debug_struct("Started").field("task", &handle.id()).finish()
            }
            Submission::Joined(handle) => {
                f.debug_struct("Joined").field("task", &handle.id()).finish()
            }
        }
    }
}

struct ActiveTask {
    handle: TaskHandle,
    join: Option<thread::JoinHandle<()>>,
}

struct CoordinatorState {
    active: HashMap<Fingerprint, ActiveTask>,
    closed: bool,
}

/// Owns the worker threads serving retrieval requests.
pub struct TaskCoordinator {
    adapter: Arc<ArchiveAdapter>,
    store: Arc<CacheStore>,
    retention: Mutex<RetentionPolicy>,
    retry: RetryPolicy,
    fail_fast: bool,
    state: Mutex<CoordinatorState>,
}

impl TaskCoordinator {
    /// Create a coordinator with default retry and no retention limits.
    pub fn new(adapter: Arc<ArchiveAdapter>, store: Arc<CacheStore>) -> Self {
        TaskCoordinator {
            adapter,
            store,
            retention: Mutex::new(RetentionPolicy::default()),
            retry: RetryPolicy::default(),
            fail_fast: false,
            state: Mutex::new(CoordinatorState {
                active: HashMap::new(),
                closed: false,
            }),
        }
    }

    /// Set the retention policy (builder style).
    pub fn with_retention(self, policy: RetentionPolicy) -> Self {
        *self.retention.lock() = policy;
        self
    }

    /// Set the retry policy (builder style).
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Stop a task at its first record failure instead of continuing.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Replace the retention policy; affects subsequent eviction passes.
    pub fn set_retention(&self, policy: RetentionPolicy) {
        *self.retention.lock() = policy;
    }

    /// Current retention policy.
    pub fn retention(&self) -> RetentionPolicy {
        *self.retention.lock()
    }

    /// The cache store this coordinator fills.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Submit a retrieval request.
    ///
    /// Invalid requests are rejected here, before any thread is spawned.
    /// A fully cached request is answered inline; a request already being
    /// served joins the running task; anything else starts a new worker.
    pub fn submit(&self, request: RetrievalRequest) -> TaskResult<Submission> {
        self.adapter.validate(&request)?;
        let fingerprint = request.fingerprint();

        let mut state = self.state.lock();
        if state.closed {
            return Err(TaskError::ShutDown);
        }

        // Dedup and the cache check happen under the same lock, so two
        // racing submits of one request cannot both spawn.
        if let Some(active) = state.active.get(&fingerprint) {
            if !active.handle.state().is_finished() {
                debug!(fingerprint = %fingerprint, "joining in-flight task");
                return Ok(Submission::Joined(active.handle.clone()));
            }
        }
        if let Some(mut finished) = state.active.remove(&fingerprint) {
            reap(&mut finished);
        }

        if let Some(entries) = self.cached_result(&fingerprint) {
            debug!(fingerprint = %fingerprint, "request fully satisfied from cache");
            return Ok(Submission::Cached(entries));
        }

        let shared = TaskShared::new();
        let handle = TaskHandle::new(fingerprint.clone(), shared.clone());
        let ctx = TaskContext {
            adapter: Arc::clone(&self.adapter),
            store: Arc::clone(&self.store),
            task_id: handle.id(),
            request,
            retention: self.retention(),
            retry: self.retry,
            fail_fast: self.fail_fast,
            shared,
        };
        let join = thread::Builder::new()
            .name(format!("helio-task-{}", &fingerprint.as_str()[..8]))
            .spawn(move || task::run(ctx))?;

        info!(fingerprint = %fingerprint, task = %handle.id(), "task started");
        state.active.insert(
            fingerprint,
            ActiveTask {
                handle: handle.clone(),
                join: Some(join),
            },
        );
        Ok(Submission::Started(handle))
    }

    /// Cancel the task serving `fingerprint`, if one is running.
    ///
    /// Returns whether a running task was signalled. Cancellation is
    /// asynchronous; use the handle to wait for the terminal state.
    pub fn cancel(&self, fingerprint: &Fingerprint) -> bool {
        let state = self.state.lock();
        match state.active.get(fingerprint) {
            Some(active) if !active.handle.state().is_finished() => {
                active.handle.cancel();
                true
            }
            _ => false,
        }
    }

    /// Cancel every active task without shutting down.
    pub fn cancel_all(&self) {
        let state = self.state.lock();
        for active in state.active.values() {
            active.handle.cancel();
        }
    }

    /// Number of tasks that have not reached a terminal state.
    pub fn active_count(&self) -> usize {
        let state = self.state.lock();
        state
            .active
            .values()
            .filter(|a| !a.handle.state().is_finished())
            .count()
    }

    /// Cancel everything, join every worker, and reject further submits.
    ///
    /// Idempotent; a second call is a no-op.
    pub fn shutdown(&self) {
        let mut drained = {
            let mut state = self.state.lock();
            state.closed = true;
            state.active.drain().collect::<Vec<_>>()
        };
        for (_, active) in &drained {
            active.handle.cancel();
        }
        for (fingerprint, active) in &mut drained {
            reap(active);
            debug!(fingerprint = %fingerprint, "worker joined");
        }
        if !drained.is_empty() {
            info!(tasks = drained.len(), "coordinator shut down");
        }
    }

    /// Answer a request from the cache alone, if a manifest proves every
    /// member is still present. A manifest with a missing member is
    /// purged and the request treated as a miss.
    fn cached_result(&self, fingerprint: &Fingerprint) -> Option<Vec<CacheEntry>> {
        let manifest = self.store.lookup(fingerprint)?;
        let members = manifest.origin.manifest_members()?;

        let mut entries = Vec::with_capacity(members.len());
        for member in members {
            match self.store.lookup(member) {
                Some(entry) => entries.push(entry),
                None => {
                    warn!(
                        fingerprint = %fingerprint,
                        member = %member,
                        "manifest member evicted, purging manifest"
                    );
                    let _ = self.store.evict(fingerprint);
                    return None;
                }
            }
        }
        Some(entries)
    }
}

impl Drop for TaskCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn reap(active: &mut ActiveTask) {
    if let Some(join) = active.join.take() {
        if join.join().is_err() {
            warn!(task = %active.handle.id(), "worker thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use helio_archive::{ArchiveBackend, ArchiveQuery, BackendError, BackendKind, FetchError};
    use helio_core::{InstrumentId, RecordDescriptor, TimeRange};
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use crate::events::TaskOutcome;

    /// Backend with a per-fetch delay, for exercising concurrency.
    struct SlowBackend {
        records: Vec<RecordDescriptor>,
        delay: Duration,
        dests: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl ArchiveBackend for SlowBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Vso
        }

        fn query(&self, _query: &ArchiveQuery) -> Result<Vec<RecordDescriptor>, BackendError> {
            Ok(self.records.clone())
        }

        fn fetch(&self, record: &RecordDescriptor, dest: &Path) -> Result<u64, FetchError> {
            self.dests.lock().push(dest.to_path_buf());
            std::thread::sleep(self.delay);
            let body = format!("fits:{}", record.id);
            std::fs::write(dest, &body).map_err(|e| FetchError::Fatal(e.to_string()))?;
            Ok(body.len() as u64)
        }
    }

    fn record(id: &str, min: u32) -> RecordDescriptor {
        RecordDescriptor::new(
            id,
            InstrumentId::Aia,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, min, 0).unwrap(),
        )
    }

    fn request(wavelength: &str) -> RetrievalRequest {
        let range = TimeRange::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
        )
        .unwrap();
        RetrievalRequest::new(InstrumentId::Aia, range)
            .with_param("wavelength", wavelength)
            .with_param("cadence", "12s")
    }

    fn coordinator(
        dir: &tempfile::TempDir,
        records: Vec<RecordDescriptor>,
        delay: Duration,
    ) -> TaskCoordinator {
        let mut adapter = ArchiveAdapter::new();
        adapter.register(Box::new(SlowBackend {
            records,
            delay,
            dests: Arc::new(Mutex::new(Vec::new())),
        }));
        let store = Arc::new(CacheStore::open(dir.path()).unwrap());
        TaskCoordinator::new(Arc::new(adapter), store)
    }

    #[test]
    fn test_submit_runs_to_success() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(&dir, vec![record("a", 0)], Duration::ZERO);

        let handle = match coord.submit(request("171")).unwrap() {
            Submission::Started(handle) => handle,
            _ => panic!("expected a new task"),
        };
        assert_eq!(handle.wait(), TaskOutcome::Succeeded { records: 1 });
    }

    #[test]
    fn test_invalid_request_rejected_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(&dir, vec![], Duration::ZERO);

        // 1600 is a UV wavelength, invalid at the 12s EUV cadence.
        let err = coord.submit(request("1600")).unwrap_err();
        assert!(matches!(err, TaskError::Validation(_)));
        assert_eq!(coord.active_count(), 0);
    }

    #[test]
    fn test_duplicate_submit_joins_running_task() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(
            &dir,
            vec![record("a", 0)],
            Duration::from_millis(200),
        );

        let first = match coord.submit(request("171")).unwrap() {
            Submission::Started(handle) => handle,
            _ => panic!("expected a new task"),
        };
        let second = match coord.submit(request("171")).unwrap() {
            Submission::Joined(handle) => handle,
            _ => panic!("expected to join the in-flight task"),
        };
        assert_eq!(first.fingerprint(), second.fingerprint());
        assert_eq!(coord.active_count(), 1);
        assert!(second.wait().is_success());
    }

    #[test]
    fn test_distinct_requests_run_distinct_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(
            &dir,
            vec![record("a", 0)],
            Duration::from_millis(100),
        );

        assert!(matches!(
            coord.submit(request("171")).unwrap(),
            Submission::Started(_)
        ));
        assert!(matches!(
            coord.submit(request("193")).unwrap(),
            Submission::Started(_)
        ));
        assert_eq!(coord.active_count(), 2);
        coord.shutdown();
    }

    #[test]
    fn test_fully_cached_request_answers_inline() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(&dir, vec![record("a", 0), record("b", 12)], Duration::ZERO);

        match coord.submit(request("171")).unwrap() {
            Submission::Started(handle) => assert!(handle.wait().is_success()),
            _ => panic!("expected a new task"),
        }

        match coord.submit(request("171")).unwrap() {
            Submission::Cached(entries) => assert_eq!(entries.len(), 2),
            _ => panic!("expected a cached answer"),
        }
        assert_eq!(coord.active_count(), 0);
    }

    #[test]
    fn test_evicted_member_invalidates_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(&dir, vec![record("a", 0)], Duration::ZERO);

        match coord.submit(request("171")).unwrap() {
            Submission::Started(handle) => assert!(handle.wait().is_success()),
            _ => panic!("expected a new task"),
        }
        coord.store().evict(&record("a", 0).fingerprint()).unwrap();

        // The stale manifest must not produce a cached answer.
        match coord.submit(request("171")).unwrap() {
            Submission::Started(handle) => assert!(handle.wait().is_success()),
            _ => panic!("expected a re-fetch"),
        }
    }

    #[test]
    fn test_overlapping_tasks_stage_privately() {
        let dir = tempfile::tempdir().unwrap();
        let dests = Arc::new(Mutex::new(Vec::new()));
        let mut adapter = ArchiveAdapter::new();
        adapter.register(Box::new(SlowBackend {
            records: vec![record("a", 0)],
            delay: Duration::from_millis(200),
            dests: dests.clone(),
        }));
        let store = Arc::new(CacheStore::open(dir.path()).unwrap());
        let coord = TaskCoordinator::new(Arc::new(adapter), store);

        // Distinct requests whose record sets overlap on one fingerprint;
        // both miss the cache and fetch the record concurrently.
        let first = match coord.submit(request("171")).unwrap() {
            Submission::Started(handle) => handle,
            other => panic!("unexpected submission: {:?}", other),
        };
        let second = match coord.submit(request("193")).unwrap() {
            Submission::Started(handle) => handle,
            other => panic!("unexpected submission: {:?}", other),
        };
        assert!(first.wait().is_success());
        assert!(second.wait().is_success());

        let dests = dests.lock();
        assert_eq!(dests.len(), 2, "both tasks fetch the shared record");
        assert_ne!(dests[0], dests[1], "in-flight staging files must be disjoint");
    }

    #[test]
    fn test_submission_debug_names_variant() {
        let rendered = format!("{:?}", Submission::Cached(Vec::new()));
        assert!(rendered.contains("Cached"));
    }

    #[test]
    fn test_cancel_stops_a_running_task() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<RecordDescriptor> =
            (0..50).map(|i| record(&format!("r{:02}", i), i)).collect();
        let coord = coordinator(&dir, records, Duration::from_millis(10));

        let handle = match coord.submit(request("171")).unwrap() {
            Submission::Started(handle) => handle,
            _ => panic!("expected a new task"),
        };
        std::thread::sleep(Duration::from_millis(30));
        assert!(coord.cancel(handle.fingerprint()));
        assert_eq!(handle.wait(), TaskOutcome::Cancelled);
    }

    #[test]
    fn test_cancel_unknown_fingerprint_is_false() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(&dir, vec![], Duration::ZERO);
        assert!(!coord.cancel(&Fingerprint::digest(b"nothing")));
    }

    #[test]
    fn test_shutdown_joins_everything_and_rejects_submits() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<RecordDescriptor> =
            (0..20).map(|i| record(&format!("r{:02}", i), i)).collect();
        let coord = coordinator(&dir, records, Duration::from_millis(10));

        let handles: Vec<TaskHandle> = ["171", "193", "304"]
            .iter()
            .map(|w| match coord.submit(request(w)).unwrap() {
                Submission::Started(handle) => handle,
                _ => panic!("expected a new task"),
            })
            .collect();

        coord.shutdown();
        for handle in &handles {
            assert!(handle.state().is_finished(), "worker must be joined");
        }
        assert!(matches!(
            coord.submit(request("131")).unwrap_err(),
            TaskError::ShutDown
        ));
    }

    #[test]
    fn test_resubmit_after_completion_starts_fresh_task() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(&dir, vec![record("a", 0)], Duration::ZERO);

        let handle = match coord.submit(request("171")).unwrap() {
            Submission::Started(handle) => handle,
            _ => panic!("expected a new task"),
        };
        assert!(handle.wait().is_success());
        coord.store().clear().unwrap();

        // Cache cleared, previous task finished: a fresh task runs.
        match coord.submit(request("171")).unwrap() {
            Submission::Started(handle) => assert!(handle.wait().is_success()),
            _ => panic!("expected a new task"),
        }
    }
}
