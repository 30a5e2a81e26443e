//! Tokio runtime spawner implementation.

use std::future::Future;
use std::sync::Arc;

use crate::core::queue::TaskQueue;
use crate::core::{Spawn, TaskExecutor, Worker, WorkerHandle};

/// Tokio-based spawner that executes futures on a tokio runtime.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: Arc<tokio::runtime::Handle>,
}

impl TokioSpawner {
    /// Create a new spawner from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Create a spawner bound to the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }
}

/// Launch a worker loop on the given spawner and return its shutdown handle.
pub fn spawn_worker<Q, E, S>(spawner: &S, worker: Worker<Q, E>) -> WorkerHandle
where
    Q: TaskQueue + 'static,
    E: TaskExecutor,
    S: Spawn,
{
    let handle = worker.handle();
    spawner.spawn(worker.run());
    handle
}
