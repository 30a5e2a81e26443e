//! The single paced worker loop.
//!
//! One logical worker drains the queue serially. Concurrency of 1 is a
//! design invariant, not an accident: the pacing discipline is defined as a
//! global minimum interval between consecutive task *starts*, and a second
//! consumer would break that bound. Any parallel reimplementation must
//! preserve the aggregate start rate.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::completion::{build_completion_event, CompletionSink};
use crate::core::queue::{ClaimedTask, TaskQueue};
use crate::core::TaskExecutor;
use crate::util::clock::now_ms;

/// Abstraction for spawning the worker loop on a runtime.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Worker timing and retry configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Minimum interval between consecutive task starts.
    pub pacing_interval: Duration,
    /// How long a claimed task stays invisible before redelivery.
    pub visibility_timeout: Duration,
    /// Deliveries allowed per task before it is recorded as failed.
    pub max_attempts: u32,
    /// Sleep after a failed attempt before the next dequeue.
    pub retry_backoff: Duration,
    /// Sleep between polls when the queue is empty.
    pub idle_poll_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pacing_interval: Duration::from_millis(1000),
            visibility_timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(250),
            idle_poll_interval: Duration::from_millis(50),
        }
    }
}

impl WorkerConfig {
    /// Validate timing and retry values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.pacing_interval.is_zero() {
            return Err("pacing_interval must be greater than 0".into());
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".into());
        }
        if self.visibility_timeout <= self.pacing_interval {
            // The claim is held across the pacing wait; a shorter visibility
            // timeout would redeliver tasks the worker still owns.
            return Err("visibility_timeout must exceed pacing_interval".into());
        }
        if self.idle_poll_interval.is_zero() {
            return Err("idle_poll_interval must be greater than 0".into());
        }
        Ok(())
    }
}

/// Handle to signal worker shutdown from outside the loop.
#[derive(Clone)]
pub struct WorkerHandle {
    shutdown: Arc<AtomicBool>,
}

impl WorkerHandle {
    /// Request the loop to stop after the current task.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

/// Single serialized consumer that dequeues, paces, executes, and commits.
pub struct Worker<Q, E> {
    config: WorkerConfig,
    queue: Arc<Mutex<Q>>,
    executor: E,
    failure_sink: Option<Arc<Mutex<Box<dyn CompletionSink>>>>,
    shutdown: Arc<AtomicBool>,
}

impl<Q, E> Worker<Q, E>
where
    Q: TaskQueue + 'static,
    E: TaskExecutor,
{
    /// Create a worker over a shared queue with the given executor.
    ///
    /// # Errors
    ///
    /// Returns the validation message for an invalid configuration.
    pub fn new(config: WorkerConfig, queue: Arc<Mutex<Q>>, executor: E) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            config,
            queue,
            executor,
            failure_sink: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Attach a sink that receives a `failed` event when a task exhausts its
    /// attempts. Without one, exhaustion is only logged.
    #[must_use]
    pub fn with_failure_sink(mut self, sink: Arc<Mutex<Box<dyn CompletionSink>>>) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    /// Handle for requesting shutdown.
    #[must_use]
    pub fn handle(&self) -> WorkerHandle {
        WorkerHandle {
            shutdown: Arc::clone(&self.shutdown),
        }
    }

    /// Run the consumer loop until shutdown is requested.
    ///
    /// Loop shape: dequeue -> wait until `previous_start + pacing_interval`
    /// -> execute -> ack (success) or nack/record-failure (failure). The
    /// pacing clock is set when a task *starts*, so long-running bodies do
    /// not compound delay.
    pub async fn run(self) {
        tracing::info!(
            pacing_ms = self.config.pacing_interval.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "worker loop started"
        );
        // First task may start immediately.
        let mut next_start = tokio::time::Instant::now();

        while !self.shutdown.load(Ordering::Acquire) {
            let claimed = {
                let mut queue = self.queue.lock();
                queue.dequeue(now_ms(), self.config.visibility_timeout)
            };

            let task = match claimed {
                Ok(Some(task)) => task,
                Ok(None) => {
                    tokio::time::sleep(self.config.idle_poll_interval).await;
                    continue;
                }
                Err(e) => {
                    tracing::error!("failed to dequeue: {e}");
                    tokio::time::sleep(self.config.idle_poll_interval).await;
                    continue;
                }
            };

            tokio::time::sleep_until(next_start).await;
            let started = tokio::time::Instant::now();
            next_start = started + self.config.pacing_interval;

            self.process(task).await;
        }

        tracing::info!("worker loop shutting down");
    }

    /// Execute one claimed task and commit the outcome.
    async fn process(&self, task: ClaimedTask) {
        let ClaimedTask {
            id,
            descriptor,
            attempt,
        } = task;
        tracing::debug!(task_id = id, attempt, caller = %descriptor.caller_id, "executing task");

        let result = self
            .executor
            .execute(id, &descriptor.caller_id, &descriptor.payload)
            .await;

        match result {
            Ok(()) => {
                let mut queue = self.queue.lock();
                if let Err(e) = queue.ack(id) {
                    tracing::error!(task_id = id, "failed to ack completed task: {e}");
                }
            }
            Err(e) if attempt >= self.config.max_attempts => {
                tracing::warn!(
                    task_id = id,
                    attempt,
                    caller = %descriptor.caller_id,
                    "task failed, attempts exhausted: {e}"
                );
                if let Some(sink) = &self.failure_sink {
                    sink.lock().record(build_completion_event(
                        id,
                        descriptor.caller_id.as_str(),
                        "failed",
                    ));
                }
                // Remove the task; the failure has been recorded.
                let mut queue = self.queue.lock();
                if let Err(e) = queue.ack(id) {
                    tracing::error!(task_id = id, "failed to remove exhausted task: {e}");
                }
            }
            Err(e) => {
                tracing::warn!(task_id = id, attempt, "task failed, will retry: {e}");
                {
                    let mut queue = self.queue.lock();
                    if let Err(e) = queue.nack(id) {
                        tracing::error!(task_id = id, "failed to return task to queue: {e}");
                    }
                }
                tokio::time::sleep(self.config.retry_backoff).await;
            }
        }
    }
}
