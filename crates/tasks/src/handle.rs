//! Task handles and shared worker state
//!
//! [`TaskShared`] is the state cell a worker thread and any number of
//! handle holders observe concurrently: current [`TaskState`] behind a
//! mutex, a condvar for blocking waits and cancellation-aware sleeps, a
//! cancel flag, and the subscriber list for progress events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use uuid::Uuid;

use helio_core::Fingerprint;

use crate::events::{RecordFailure, TaskEvent, TaskOutcome, TaskState, TaskStatus};

#[derive(Default)]
struct Progress {
    completed: usize,
    total: Option<usize>,
    failed: Vec<RecordFailure>,
}

/// State shared between a task's worker thread and its handles.
pub struct TaskShared {
    state: Mutex<TaskState>,
    state_changed: Condvar,
    cancel: AtomicBool,
    progress: Mutex<Progress>,
    subscribers: Mutex<Vec<mpsc::Sender<TaskEvent>>>,
}

impl TaskShared {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(TaskShared {
            state: Mutex::new(TaskState::Queued),
            state_changed: Condvar::new(),
            cancel: AtomicBool::new(false),
            progress: Mutex::new(Progress::default()),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    /// Current state snapshot.
    pub fn state(&self) -> TaskState {
        self.state.lock().clone()
    }

    /// Full progress snapshot.
    pub fn status(&self) -> TaskStatus {
        let state = self.state.lock().clone();
        let progress = self.progress.lock();
        TaskStatus {
            state,
            completed: progress.completed,
            total: progress.total,
            failed: progress.failed.clone(),
        }
    }

    pub(crate) fn note_resolved(&self, total: usize) {
        self.progress.lock().total = Some(total);
    }

    pub(crate) fn note_record_completed(&self) {
        self.progress.lock().completed += 1;
    }

    pub(crate) fn note_record_failed(&self, failure: RecordFailure) {
        self.progress.lock().failed.push(failure);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Request cancellation and wake any cancellation-aware sleeper.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        self.state_changed.notify_all();
    }

    /// Transition to a new state and wake waiters.
    pub(crate) fn set_state(&self, state: TaskState) {
        *self.state.lock() = state;
        self.state_changed.notify_all();
    }

    /// Deliver an event to every live subscriber, dropping dead channels.
    pub(crate) fn emit(&self, event: TaskEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Sleep for `duration`, returning early (false) on cancellation.
    ///
    /// Used for retry backoff so a cancel never waits out a backoff
    /// window.
    pub(crate) fn cancellable_sleep(&self, duration: Duration) -> bool {
        let mut state = self.state.lock();
        let deadline = std::time::Instant::now() + duration;
        while !self.is_cancelled() {
            let now = std::time::Instant::now();
            if now >= deadline {
                return true;
            }
            self.state_changed.wait_for(&mut state, deadline - now);
        }
        false
    }

    fn subscribe(&self) -> mpsc::Receiver<TaskEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.lock().push(tx);
        rx
    }

    fn wait(&self) -> TaskOutcome {
        let mut state = self.state.lock();
        loop {
            if let TaskState::Finished(outcome) = &*state {
                return outcome.clone();
            }
            self.state_changed.wait(&mut state);
        }
    }
}

/// Caller-facing handle to a submitted task.
///
/// Handles are cheap to clone; cancelling through any clone cancels the
/// underlying task.
#[derive(Clone)]
pub struct TaskHandle {
    id: Uuid,
    fingerprint: Fingerprint,
    shared: Arc<TaskShared>,
}

impl TaskHandle {
    pub(crate) fn new(fingerprint: Fingerprint, shared: Arc<TaskShared>) -> Self {
        TaskHandle {
            id: Uuid::new_v4(),
            fingerprint,
            shared,
        }
    }

    /// Unique task identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Fingerprint of the request this task serves.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Current state snapshot.
    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// Progress snapshot: state, completed/total counts, failed records.
    pub fn status(&self) -> TaskStatus {
        self.shared.status()
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Request cancellation. Returns immediately; the worker observes the
    /// flag at its next cancellation point.
    pub fn cancel(&self) {
        self.shared.request_cancel();
    }

    /// Subscribe to progress events.
    ///
    /// Events emitted before subscription are not replayed; subscribe
    /// before the task starts (the coordinator submits handles in
    /// `Queued` state) to observe the full sequence.
    pub fn subscribe(&self) -> mpsc::Receiver<TaskEvent> {
        self.shared.subscribe()
    }

    /// Block until the task reaches a terminal state.
    pub fn wait(&self) -> TaskOutcome {
        self.shared.wait()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_observes_terminal_state() {
        let shared = TaskShared::new();
        let handle = TaskHandle::new(Fingerprint::digest(b"req"), shared.clone());

        let waiter = {
            let handle = handle.clone();
            std::thread::spawn(move || handle.wait())
        };
        shared.set_state(TaskState::Running);
        shared.set_state(TaskState::Finished(TaskOutcome::Succeeded { records: 2 }));
        assert_eq!(
            waiter.join().unwrap(),
            TaskOutcome::Succeeded { records: 2 }
        );
    }

    #[test]
    fn test_cancel_interrupts_sleep() {
        let shared = TaskShared::new();
        let sleeper = {
            let shared = shared.clone();
            std::thread::spawn(move || shared.cancellable_sleep(Duration::from_secs(30)))
        };
        std::thread::sleep(Duration::from_millis(20));
        shared.request_cancel();
        // Returns false (interrupted), and long before the 30s elapse.
        assert!(!sleeper.join().unwrap());
    }

    #[test]
    fn test_events_reach_subscriber_in_order() {
        let shared = TaskShared::new();
        let handle = TaskHandle::new(Fingerprint::digest(b"req"), shared.clone());
        let rx = handle.subscribe();

        shared.emit(TaskEvent::Started);
        shared.emit(TaskEvent::Resolved { total: 1 });
        assert_eq!(rx.recv().unwrap(), TaskEvent::Started);
        assert_eq!(rx.recv().unwrap(), TaskEvent::Resolved { total: 1 });
    }

    #[test]
    fn test_status_tracks_progress_notes() {
        let shared = TaskShared::new();
        let handle = TaskHandle::new(Fingerprint::digest(b"req"), shared.clone());

        let status = handle.status();
        assert_eq!(status.state, TaskState::Queued);
        assert_eq!(status.completed, 0);
        assert_eq!(status.total, None);

        shared.set_state(TaskState::Running);
        shared.note_resolved(3);
        shared.note_record_completed();
        shared.note_record_failed(RecordFailure {
            id: helio_core::RecordId::new("r2"),
            reason: "timeout".to_string(),
        });

        let status = handle.status();
        assert_eq!(status.state, TaskState::Running);
        assert_eq!(status.completed, 1);
        assert_eq!(status.total, Some(3));
        assert_eq!(status.failed.len(), 1);
        assert_eq!(status.failed[0].reason, "timeout");
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let shared = TaskShared::new();
        let handle = TaskHandle::new(Fingerprint::digest(b"req"), shared.clone());
        drop(handle.subscribe());
        // Emitting must not fail or leak the dead channel.
        shared.emit(TaskEvent::Started);
        shared.emit(TaskEvent::Finished(TaskOutcome::Cancelled));
    }
}
