//! Error types for the batch runner
//!
//! Individual task failures are not errors; they are recorded in the
//! [`BatchReport`](crate::BatchReport). These variants cover misuse and
//! runner-internal faults only.

/// Batch runner errors
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Concurrency must be at least one
    #[error("invalid concurrency {0}: at least one worker is required")]
    InvalidConcurrency(usize),

    /// Task queue closed before all tasks were enqueued
    #[error("task queue closed unexpectedly")]
    QueueClosed,

    /// A worker task panicked or was cancelled
    #[error("worker {worker} aborted: {reason}")]
    WorkerAborted { worker: usize, reason: String },
}

/// Result type alias for runner operations
pub type RunnerResult<T> = Result<T, RunnerError>;
