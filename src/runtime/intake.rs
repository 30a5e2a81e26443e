//! Submission intake: request/response models and the accept path.
//!
//! The intake is the boundary an HTTP handler calls into. It validates the
//! caller, consults admission, and enqueues on accept. Execution-path errors
//! never surface here; a submitter who received an accept will not hear about
//! a later executor failure.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::queue::{TaskDescriptor, TaskQueue};
use crate::core::{AdmissionController, AdmissionError, AdmitDecision, IntakeError};
use crate::util::serde::{CallerId, TaskId};

/// Task submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Caller identity; required and non-empty.
    pub caller_id: String,
    /// Opaque payload handed to the executor unchanged.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Successful submission response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAccepted {
    /// Queue-assigned task identifier.
    pub task_id: TaskId,
    /// Budget units the caller has left in the current window.
    pub remaining: u32,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Accept or reject a submission.
///
/// A missing caller is reported immediately with no store or queue
/// interaction. Admission consumes the rate store atomically; on accept the
/// descriptor is enqueued and the task id returned.
///
/// # Errors
///
/// [`IntakeError`] carrying the HTTP-equivalent status: 400 missing caller,
/// 429 rate limited (with retry-after seconds), 503 store outage, 500
/// enqueue failure.
pub async fn submit<Q: TaskQueue>(
    admission: &AdmissionController,
    queue: &Arc<Mutex<Q>>,
    req: SubmitRequest,
    now_ms: u128,
) -> Result<SubmitAccepted, IntakeError> {
    let Some(caller) = CallerId::new(req.caller_id) else {
        return Err(IntakeError::MissingCaller);
    };

    let decision = admission.try_admit(&caller, 1).await.map_err(|e| match e {
        AdmissionError::InvalidCost => IntakeError::MissingCaller,
        AdmissionError::StoreUnavailable(msg) => IntakeError::StoreUnavailable(msg),
    })?;

    let remaining = match decision {
        AdmitDecision::Accepted { remaining } => remaining,
        AdmitDecision::Rejected { retry_after_secs } => {
            return Err(IntakeError::RateLimited { retry_after_secs });
        }
    };

    let descriptor = TaskDescriptor {
        caller_id: caller.clone(),
        submitted_at_ms: now_ms,
        payload: req.payload,
    };
    let task_id = {
        let mut queue = queue.lock();
        queue.enqueue(descriptor)?
    };
    tracing::info!(task_id, caller = %caller, "task queued");
    Ok(SubmitAccepted { task_id, remaining })
}

/// Return a health payload.
#[must_use]
pub const fn health() -> Health {
    Health { ok: true }
}
