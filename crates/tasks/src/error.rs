//! Task-layer errors

use thiserror::Error;

use helio_core::ValidationError;

/// Errors surfaced by the task coordinator.
///
/// Failures of a running task are not errors here; they are reported
/// through the task's outcome. This type covers only what can go wrong
/// at submit time or around coordinator lifecycle.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Request rejected before any thread was spawned
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Submit after shutdown began
    #[error("coordinator is shut down")]
    ShutDown,

    /// Worker thread could not be spawned
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result alias for coordinator operations.
pub type TaskResult<T> = Result<T, TaskError>;
