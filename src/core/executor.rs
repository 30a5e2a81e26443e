//! Task execution trait and the completion-recording executor.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::completion::{build_completion_event, CompletionSink};
use crate::core::ExecutionError;
use crate::util::serde::{CallerId, TaskId};

/// Abstraction for executing a task body.
///
/// The queue delivers at least once, so implementations must be
/// idempotent-safe: running twice for the same task may produce duplicate
/// side effects but must never corrupt state.
#[async_trait]
pub trait TaskExecutor: Send + Sync + Clone + 'static {
    /// Execute the task body for `caller` with the submitted payload.
    ///
    /// # Errors
    ///
    /// [`ExecutionError`] when the body fails; the worker applies bounded
    /// retry and records exhaustion.
    async fn execute(
        &self,
        task_id: TaskId,
        caller: &CallerId,
        payload: &serde_json::Value,
    ) -> Result<(), ExecutionError>;
}

/// The domain executor: records a completion event for the caller.
///
/// The sink is written only on the attempt that succeeds, so a task that
/// fails and then succeeds on retry yields exactly one `complete` record.
#[derive(Clone)]
pub struct CompletionExecutor {
    sink: Arc<Mutex<Box<dyn CompletionSink>>>,
}

impl CompletionExecutor {
    /// Create an executor emitting to the given sink.
    pub fn new(sink: Box<dyn CompletionSink>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Shared handle to the underlying sink, for the worker to record
    /// retry-exhaustion failures through the same destination.
    #[must_use]
    pub fn sink(&self) -> Arc<Mutex<Box<dyn CompletionSink>>> {
        Arc::clone(&self.sink)
    }
}

#[async_trait]
impl TaskExecutor for CompletionExecutor {
    async fn execute(
        &self,
        task_id: TaskId,
        caller: &CallerId,
        _payload: &serde_json::Value,
    ) -> Result<(), ExecutionError> {
        tracing::info!(task_id, caller = %caller, "task completed");
        let mut sink = self.sink.lock();
        sink.record(build_completion_event(task_id, caller.as_str(), "complete"));
        Ok(())
    }
}
