//! The download task worker body
//!
//! [`run`] executes one retrieval request to completion on the calling
//! (worker) thread: resolve, then fetch each record into a private
//! staging file, verify it, promote it into the cache, and enforce
//! retention with the fresh entry protected. Cancellation is observed
//! before resolution, before every record, between retry attempts, and
//! inside backoff sleeps; a cancelled task removes its staging file
//! before finishing.
//!
//! Transient fetch failures are retried with doubling backoff; fatal
//! failures and exhausted retries mark the record failed and the task
//! moves on (or stops, when fail-fast is set).

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use helio_archive::{ArchiveAdapter, BackendKind, FetchError};
use helio_cache::{CacheError, CacheStore, EntryOrigin, RetentionPolicy};
use helio_core::{Fingerprint, RecordDescriptor, RetrievalRequest};

use crate::events::{RecordFailure, TaskEvent, TaskOutcome, TaskState};
use crate::handle::TaskShared;

/// Retry behavior for transient fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per record (first try included)
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per further attempt
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before attempt `next` (1-based; attempt 2 waits the
    /// initial backoff, attempt 3 twice that, and so on).
    fn backoff_before(&self, next: u32) -> Duration {
        self.initial_backoff * 2u32.saturating_pow(next.saturating_sub(2))
    }
}

/// Everything a worker thread needs to run one task.
pub(crate) struct TaskContext {
    pub adapter: Arc<ArchiveAdapter>,
    pub store: Arc<CacheStore>,
    /// Scopes staging file names; overlapping tasks fetching the same
    /// record must never share an in-flight file.
    pub task_id: Uuid,
    pub request: RetrievalRequest,
    pub retention: RetentionPolicy,
    pub retry: RetryPolicy,
    pub fail_fast: bool,
    pub shared: Arc<TaskShared>,
}

enum FetchFailure {
    Cancelled,
    Terminal(String),
}

/// Run the task to a terminal state. Never panics on archive or cache
/// errors; every failure path ends in a `Finished` state.
pub(crate) fn run(ctx: TaskContext) {
    ctx.shared.set_state(TaskState::Running);
    ctx.shared.emit(TaskEvent::Started);

    let outcome = execute(&ctx);
    info!(request = %ctx.request, outcome = ?outcome, "task finished");
    ctx.shared.emit(TaskEvent::Finished(outcome.clone()));
    ctx.shared.set_state(TaskState::Finished(outcome));
}

fn execute(ctx: &TaskContext) -> TaskOutcome {
    if ctx.shared.is_cancelled() {
        return TaskOutcome::Cancelled;
    }

    let resolved = match ctx.adapter.resolve(&ctx.request) {
        Ok(resolved) => resolved,
        Err(err) => {
            return TaskOutcome::Failed {
                reason: err.to_string(),
            }
        }
    };
    let total = resolved.records.len();
    ctx.shared.note_resolved(total);
    ctx.shared.emit(TaskEvent::Resolved { total });

    let mut completed = 0usize;
    let mut members: Vec<Fingerprint> = Vec::with_capacity(total);
    let mut failures: Vec<RecordFailure> = Vec::new();

    for record in &resolved.records {
        if ctx.shared.is_cancelled() {
            return TaskOutcome::Cancelled;
        }

        let fingerprint = record.fingerprint();
        if ctx.store.lookup(&fingerprint).is_some() {
            completed += 1;
            members.push(fingerprint);
            ctx.shared.note_record_completed();
            ctx.shared.emit(TaskEvent::RecordCompleted {
                id: record.id.clone(),
                completed,
                total,
                cache_hit: true,
            });
            continue;
        }

        match fetch_record(ctx, resolved.backend, record, &fingerprint) {
            Ok(()) => {
                completed += 1;
                members.push(fingerprint);
                ctx.shared.note_record_completed();
                ctx.shared.emit(TaskEvent::RecordCompleted {
                    id: record.id.clone(),
                    completed,
                    total,
                    cache_hit: false,
                });
            }
            Err(FetchFailure::Cancelled) => return TaskOutcome::Cancelled,
            Err(FetchFailure::Terminal(reason)) => {
                warn!(record = %record.id, reason = %reason, "record failed");
                let failure = RecordFailure {
                    id: record.id.clone(),
                    reason: reason.clone(),
                };
                ctx.shared.note_record_failed(failure.clone());
                ctx.shared.emit(TaskEvent::RecordFailed {
                    id: record.id.clone(),
                    reason,
                });
                failures.push(failure);
                if ctx.fail_fast {
                    break;
                }
            }
        }
    }

    if failures.is_empty() {
        write_manifest(ctx, members);
        TaskOutcome::Succeeded { records: completed }
    } else if completed > 0 {
        TaskOutcome::PartiallySucceeded { completed, failed: failures }
    } else {
        TaskOutcome::Failed {
            reason: format!(
                "all {} records failed; first: {}",
                failures.len(),
                failures[0].reason
            ),
        }
    }
}

/// Fetch one record into staging, verify, and promote it into the cache.
fn fetch_record(
    ctx: &TaskContext,
    backend: BackendKind,
    record: &RecordDescriptor,
    fingerprint: &Fingerprint,
) -> Result<(), FetchFailure> {
    let staged = ctx
        .store
        .staging_path_for(&ctx.task_id.simple().to_string(), fingerprint);
    let size = match fetch_with_retries(ctx, backend, record, &staged) {
        Ok(size) => size,
        Err(failure) => {
            let _ = fs::remove_file(&staged);
            return Err(failure);
        }
    };

    if let Some(expected) = record.expected_size {
        if size != expected {
            let _ = fs::remove_file(&staged);
            return Err(FetchFailure::Terminal(format!(
                "size mismatch: expected {} bytes, got {}",
                expected, size
            )));
        }
    }

    let origin = EntryOrigin::Record {
        instrument: record.instrument,
        record_id: record.id.clone(),
        timestamp: record.timestamp,
    };
    match ctx.store.insert(fingerprint, &staged, origin) {
        Ok(_) => {
            ctx.store
                .enforce_retention(&ctx.retention, Some(fingerprint));
            Ok(())
        }
        // Another task cached the same record between our lookup and
        // insert; the record is present either way.
        Err(CacheError::DuplicateFingerprint(_)) => {
            let _ = fs::remove_file(&staged);
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&staged);
            Err(FetchFailure::Terminal(format!("cache insert failed: {}", err)))
        }
    }
}

fn fetch_with_retries(
    ctx: &TaskContext,
    backend: BackendKind,
    record: &RecordDescriptor,
    staged: &std::path::Path,
) -> Result<u64, FetchFailure> {
    let mut attempt = 1u32;
    loop {
        if ctx.shared.is_cancelled() {
            return Err(FetchFailure::Cancelled);
        }
        match ctx.adapter.fetch(backend, record, staged) {
            Ok(size) => return Ok(size),
            Err(FetchError::Fatal(reason)) => return Err(FetchFailure::Terminal(reason)),
            Err(FetchError::Transient(reason)) => {
                if attempt >= ctx.retry.max_attempts {
                    return Err(FetchFailure::Terminal(format!(
                        "{} (after {} attempts)",
                        reason, attempt
                    )));
                }
                attempt += 1;
                let backoff = ctx.retry.backoff_before(attempt);
                debug!(
                    record = %record.id,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    reason = %reason,
                    "transient fetch failure, retrying"
                );
                if !ctx.shared.cancellable_sleep(backoff) {
                    return Err(FetchFailure::Cancelled);
                }
            }
        }
    }
}

/// Record the full success as a manifest entry keyed by the request
/// fingerprint. Best-effort: a manifest write failure costs a future
/// full-hit answer, never the task's success.
fn write_manifest(ctx: &TaskContext, members: Vec<Fingerprint>) {
    let fingerprint = ctx.request.fingerprint();
    match ctx
        .store
        .insert_manifest(&fingerprint, ctx.request.instrument(), members)
    {
        Ok(_) => {
            ctx.store
                .enforce_retention(&ctx.retention, Some(&fingerprint));
        }
        Err(CacheError::DuplicateFingerprint(_)) => {}
        Err(err) => warn!(error = %err, "failed to write request manifest"),
    }
}
