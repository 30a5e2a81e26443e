//! Error taxonomy for admission, queueing, and execution.

use thiserror::Error;

use crate::util::serde::TaskId;

/// Errors surfaced on the admission path.
///
/// A store outage is deliberately distinct from a rate-limit rejection: a
/// rejected caller should retry after the window resets, while a store outage
/// is an infrastructure fault the submitter cannot fix by waiting a window.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Requested cost was zero.
    #[error("admission cost must be a positive integer")]
    InvalidCost,
    /// The rate store could not be reached or failed mid-operation.
    #[error("rate store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Errors produced by queue backends.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Queue has reached its configured depth.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// Ack/nack referenced a task that is not currently claimed.
    #[error("unknown or unclaimed task: {0}")]
    UnknownTask(TaskId),
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// A task body failed; the worker retries up to its configured attempt bound.
#[derive(Debug, Error)]
#[error("execution failed: {0}")]
pub struct ExecutionError(pub String);

/// Errors reported synchronously to a submitter by the intake surface.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// `caller_id` was missing or blank; nothing was consulted or enqueued.
    #[error("caller_id is required")]
    MissingCaller,
    /// The caller exhausted its window budget.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited {
        /// Whole seconds until the caller's window resets.
        retry_after_secs: u64,
    },
    /// The rate store was unreachable; the submission was not admitted.
    #[error("rate store unavailable: {0}")]
    StoreUnavailable(String),
    /// Admission succeeded but the task could not be enqueued.
    #[error("enqueue failed: {0}")]
    Enqueue(#[from] QueueError),
}

impl IntakeError {
    /// HTTP-equivalent status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::MissingCaller => 400,
            Self::RateLimited { .. } => 429,
            Self::StoreUnavailable(_) => 503,
            Self::Enqueue(_) => 500,
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
