//! Task lifecycle states, outcomes, and progress events

use helio_core::RecordId;

/// One record the task could not fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Identifier of the failed record
    pub id: RecordId,
    /// Terminal failure reason (after retries were exhausted)
    pub reason: String,
}

/// Terminal result of a download task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Every record cached
    Succeeded {
        /// Records now present in the cache (fetched or already cached)
        records: usize,
    },
    /// Some records cached, some failed
    PartiallySucceeded {
        /// Records now present in the cache
        completed: usize,
        /// Records that failed after retries
        failed: Vec<RecordFailure>,
    },
    /// Nothing usable was produced
    Failed {
        /// Reason resolution or every fetch failed
        reason: String,
    },
    /// Cancelled before completion; staging files were removed
    Cancelled,
}

impl TaskOutcome {
    /// Whether the outcome is a full success.
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }
}

/// Observable lifecycle of a task.
///
/// Transitions are monotonic: `Queued -> Running -> Finished`. A task
/// cancelled before its thread picked it up still passes through
/// `Running` momentarily inside the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    /// Accepted, worker not yet started
    Queued,
    /// Worker is resolving or fetching
    Running,
    /// Terminal
    Finished(TaskOutcome),
}

impl TaskState {
    /// Whether the task has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskState::Finished(_))
    }
}

/// Point-in-time snapshot of a task's progress, taken through
/// [`TaskHandle::status`](crate::TaskHandle::status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatus {
    /// Lifecycle state at snapshot time
    pub state: TaskState,
    /// Records completed so far (fetched or already cached)
    pub completed: usize,
    /// Total records in the resolved set; `None` before resolution
    pub total: Option<usize>,
    /// Records that have failed terminally so far
    pub failed: Vec<RecordFailure>,
}

/// Progress events delivered to subscribers in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// Worker picked the task up
    Started,
    /// Archive resolution finished; `total` records will be processed
    Resolved {
        /// Number of records in the resolved set
        total: usize,
    },
    /// One record is now in the cache
    RecordCompleted {
        /// Record identifier
        id: RecordId,
        /// Records completed so far (monotonic)
        completed: usize,
        /// Total records in the resolved set
        total: usize,
        /// Whether the record was already cached (no fetch happened)
        cache_hit: bool,
    },
    /// One record failed terminally (retries exhausted or fatal error)
    RecordFailed {
        /// Record identifier
        id: RecordId,
        /// Failure reason
        reason: String,
    },
    /// Task reached a terminal state
    Finished(TaskOutcome),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_terminality() {
        assert!(!TaskState::Queued.is_finished());
        assert!(!TaskState::Running.is_finished());
        assert!(TaskState::Finished(TaskOutcome::Cancelled).is_finished());
    }

    #[test]
    fn test_outcome_success_predicate() {
        assert!(TaskOutcome::Succeeded { records: 3 }.is_success());
        assert!(!TaskOutcome::Cancelled.is_success());
        assert!(!TaskOutcome::PartiallySucceeded {
            completed: 1,
            failed: vec![RecordFailure {
                id: RecordId::new("r2"),
                reason: "timeout".to_string(),
            }],
        }
        .is_success());
    }
}
