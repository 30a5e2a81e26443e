//! Assembly of admission controller, queue, sink, and worker from config.

use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;

use crate::config::{QueueBackendConfig, RateStoreBackendConfig, ServiceConfig};
use crate::core::completion::{CompletionSink, FileCompletionSink, InMemoryCompletionSink};
use crate::core::queue::TaskQueue;
use crate::core::{AdmissionController, AppResult, CompletionExecutor, RateStore, Worker};
use crate::infra::queue::{FileQueue, InMemoryQueue, RedisQueue};
use crate::infra::store::{InMemoryRateStore, RedisRateStore};

/// Default bound on the in-memory completion sink.
const IN_MEMORY_SINK_CAPACITY: usize = 4096;

/// Build the rate store backend selected by the configuration.
#[must_use]
pub fn build_rate_store(cfg: &ServiceConfig) -> Arc<dyn RateStore> {
    match &cfg.store {
        RateStoreBackendConfig::InMemory => Arc::new(InMemoryRateStore::new()),
        RateStoreBackendConfig::Redis { connection } => {
            Arc::new(RedisRateStore::new(connection.clone()))
        }
    }
}

/// Build the queue backend selected by the configuration.
///
/// # Errors
///
/// Propagates backend construction failures (e.g. an unreadable stream file).
pub fn build_queue(cfg: &ServiceConfig) -> AppResult<Box<dyn TaskQueue>> {
    Ok(match &cfg.queue {
        QueueBackendConfig::InMemory => Box::new(InMemoryQueue::new(cfg.max_queue_depth)),
        QueueBackendConfig::File { dir } => Box::new(
            FileQueue::new(dir, "tasks", cfg.max_queue_depth)
                .with_context(|| format!("opening file queue in {}", dir.display()))?,
        ),
        QueueBackendConfig::Redis { connection } => {
            Box::new(RedisQueue::new(connection.clone(), cfg.max_queue_depth))
        }
    })
}

/// Build the completion sink: file-backed when a log path is configured,
/// bounded in-memory otherwise.
#[must_use]
pub fn build_completion_sink(cfg: &ServiceConfig) -> Box<dyn CompletionSink> {
    match &cfg.completion_log {
        Some(path) => Box::new(FileCompletionSink::new(path)),
        None => Box::new(InMemoryCompletionSink::new(IN_MEMORY_SINK_CAPACITY)),
    }
}

/// Build an admission controller over the given store.
#[must_use]
pub fn build_admission(cfg: &ServiceConfig, store: Arc<dyn RateStore>) -> AdmissionController {
    AdmissionController::new(store, cfg.admission_policy())
}

/// Fully assembled service components, ready to wire to an intake surface.
pub struct ServiceParts {
    /// Admission controller over the configured rate store.
    pub admission: AdmissionController,
    /// Shared queue handle used by both intake and worker.
    pub queue: Arc<Mutex<Box<dyn TaskQueue>>>,
    /// The paced worker loop; spawn `worker.run()` on a runtime.
    pub worker: Worker<Box<dyn TaskQueue>, CompletionExecutor>,
}

/// Construct all components from a validated configuration.
///
/// # Errors
///
/// Propagates configuration validation and backend construction failures.
pub fn build_service(cfg: &ServiceConfig) -> AppResult<ServiceParts> {
    cfg.validate()
        .map_err(|e| anyhow::anyhow!("config invalid: {e}"))?;

    let store = build_rate_store(cfg);
    let admission = build_admission(cfg, store);
    let queue = Arc::new(Mutex::new(build_queue(cfg)?));

    let executor = CompletionExecutor::new(build_completion_sink(cfg));
    let failure_sink = executor.sink();
    let worker = Worker::new(cfg.worker_config(), Arc::clone(&queue), executor)
        .map_err(|e| anyhow::anyhow!("worker config invalid: {e}"))?
        .with_failure_sink(failure_sink);

    Ok(ServiceParts {
        admission,
        queue,
        worker,
    })
}
