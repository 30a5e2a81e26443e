//! Configuration models for the admission gate, queue, and worker.

pub mod service;

pub use service::{QueueBackendConfig, RateStoreBackendConfig, ServiceConfig};
