//! Download tasks and the retrieval task coordinator
//!
//! A [`DownloadTask`](task) runs on its own worker thread: it resolves a
//! request through the archive adapter, fetches each record into a private
//! staging file, verifies it, and promotes it into the cache, enforcing
//! retention after every insert. Tasks are cancellable between records
//! and report progress through subscribable event channels.
//!
//! The [`TaskCoordinator`] is the single entry point: it validates
//! requests synchronously, answers fully-cached requests without spawning
//! a thread, runs at most one task per request fingerprint, and joins
//! every worker on shutdown so no thread outlives it.

pub mod coordinator;
pub mod error;
pub mod events;
pub mod handle;
pub mod task;

pub use coordinator::{Submission, TaskCoordinator};
pub use error::{TaskError, TaskResult};
pub use events::{RecordFailure, TaskEvent, TaskOutcome, TaskState, TaskStatus};
pub use handle::TaskHandle;
pub use task::RetryPolicy;
