//! Core admission, queueing, pacing, and execution abstractions.

pub mod admission;
pub mod completion;
pub mod error;
pub mod executor;
pub mod queue;
pub mod worker;

pub use admission::{AdmissionController, AdmissionPolicy, AdmitDecision, RateDecision, RateStore};
pub use completion::{
    build_completion_event, CompletionEvent, CompletionSink, FileCompletionSink,
    InMemoryCompletionSink,
};
pub use error::{AdmissionError, AppResult, ExecutionError, IntakeError, QueueError};
pub use executor::{CompletionExecutor, TaskExecutor};
pub use queue::{ClaimedTask, TaskDescriptor, TaskQueue, TaskState};
pub use worker::{Spawn, Worker, WorkerConfig, WorkerHandle};
