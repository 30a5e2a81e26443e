//! Task descriptors, lifecycle states, and the queue backend contract.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::QueueError;
use crate::util::serde::{CallerId, TaskId};

/// Descriptor of an accepted task, immutable once enqueued.
///
/// Created by the admission path on accept; owned by the queue until claimed;
/// removed only after the executor completes (or retries are exhausted).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Caller on whose behalf the task runs.
    pub caller_id: CallerId,
    /// Submission timestamp, milliseconds since epoch.
    pub submitted_at_ms: u128,
    /// Opaque payload supplied by the submitter.
    pub payload: serde_json::Value,
}

/// Lifecycle state of a task within the queue/worker subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting in the queue, visible to the next dequeue.
    Enqueued,
    /// Claimed by a worker, invisible until ack/nack or visibility expiry.
    Claimed,
    /// The executor is running the task body.
    Executing,
    /// Terminal: executed successfully and removed.
    Completed,
    /// Returned to the queue after a failure or visibility expiry.
    ReturnedToQueue,
    /// Terminal: retries exhausted; removed with the failure recorded.
    Failed,
}

/// A task handed to a worker by `dequeue`.
#[derive(Debug, Clone)]
pub struct ClaimedTask {
    /// Queue-assigned identifier, used for ack/nack.
    pub id: TaskId,
    /// The descriptor as enqueued.
    pub descriptor: TaskDescriptor,
    /// How many times this task has been delivered, this claim included.
    /// Redeliveries after a visibility expiry count.
    pub attempt: u32,
}

/// Durable, ordered, at-least-once queue backend contract.
///
/// FIFO across all callers; per-caller submission order is preserved because
/// enqueue order is global order. Methods take `&mut self`; callers wrap the
/// backend in a mutex and keep critical sections short.
pub trait TaskQueue: Send {
    /// Append a task; returns its queue-assigned id.
    ///
    /// # Errors
    ///
    /// [`QueueError::QueueFull`] when the configured depth is reached, or
    /// [`QueueError::Backend`] on persistence failure.
    fn enqueue(&mut self, descriptor: TaskDescriptor) -> Result<TaskId, QueueError>;

    /// Claim the oldest visible task, making it invisible to other claims
    /// until acked, nacked, or `visibility` elapses from `now_ms`.
    ///
    /// Tasks whose previous claim has expired are redelivered ahead of
    /// younger pending work. Returns `Ok(None)` when nothing is visible.
    ///
    /// # Errors
    ///
    /// [`QueueError::Backend`] on persistence failure.
    fn dequeue(
        &mut self,
        now_ms: u128,
        visibility: Duration,
    ) -> Result<Option<ClaimedTask>, QueueError>;

    /// Remove a claimed task permanently (successful completion, or retry
    /// exhaustion after the failure has been recorded).
    ///
    /// # Errors
    ///
    /// [`QueueError::UnknownTask`] if the id is not currently claimed.
    fn ack(&mut self, id: TaskId) -> Result<(), QueueError>;

    /// Return a claimed task to the queue for redelivery, ahead of younger
    /// pending work so age order is preserved.
    ///
    /// # Errors
    ///
    /// [`QueueError::UnknownTask`] if the id is not currently claimed.
    fn nack(&mut self, id: TaskId) -> Result<(), QueueError>;

    /// Number of tasks currently pending or claimed.
    fn len(&self) -> usize;

    /// Whether the queue holds no tasks at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum depth allowed for this queue.
    fn max_depth(&self) -> usize;
}

/// Boxed backends are backends, so builders can pick one at runtime.
impl<T: TaskQueue + ?Sized> TaskQueue for Box<T> {
    fn enqueue(&mut self, descriptor: TaskDescriptor) -> Result<TaskId, QueueError> {
        (**self).enqueue(descriptor)
    }

    fn dequeue(
        &mut self,
        now_ms: u128,
        visibility: Duration,
    ) -> Result<Option<ClaimedTask>, QueueError> {
        (**self).dequeue(now_ms, visibility)
    }

    fn ack(&mut self, id: TaskId) -> Result<(), QueueError> {
        (**self).ack(id)
    }

    fn nack(&mut self, id: TaskId) -> Result<(), QueueError> {
        (**self).nack(id)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn max_depth(&self) -> usize {
        (**self).max_depth()
    }
}
