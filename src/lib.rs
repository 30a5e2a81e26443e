//! # Taskgate
//!
//! A paced task gate: per-caller admission control in front of a durable
//! FIFO queue drained by a single throttled worker.
//!
//! ## Core Problem Solved
//!
//! Many distinct callers submit tasks, and no single caller may monopolize
//! throughput. Three disciplines compose to enforce that:
//!
//! - **Admission control**: each caller gets a budget per sliding window,
//!   consumed atomically against a shared rate store, so concurrent
//!   submissions can never over-admit.
//! - **Durable queueing**: accepted tasks enter an ordered, at-least-once
//!   queue and survive a worker restart; a claimed task becomes invisible
//!   until acked, nacked, or its visibility timeout elapses.
//! - **Pacing**: one serialized worker starts at most one task per pacing
//!   interval, bounding aggregate execution rate independently of how much
//!   work is pending or admitted.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use taskgate::builders::build_service;
//! use taskgate::config::ServiceConfig;
//! use taskgate::runtime::{spawn_worker, submit, SubmitRequest, TokioSpawner};
//! use taskgate::util::clock::now_ms;
//!
//! let cfg = ServiceConfig::from_env()?;
//! let parts = build_service(&cfg)?;
//! let worker_handle = spawn_worker(&TokioSpawner::current(), parts.worker);
//!
//! let accepted = submit(
//!     &parts.admission,
//!     &parts.queue,
//!     SubmitRequest { caller_id: "u1".into(), payload: serde_json::json!({}) },
//!     now_ms(),
//! )
//! .await?;
//! ```
//!
//! Admission-path errors (`IntakeError`) carry HTTP-equivalent status codes
//! for the handler layer; execution-path errors stay inside the worker.
//!
//! For complete examples, see the integration tests under `tests/`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission, queueing, pacing, and execution abstractions.
pub mod core;
/// Configuration models for the gate, queue backends, and worker timing.
pub mod config;
/// Builders to construct service components from configuration.
pub mod builders;
/// Infrastructure adapters for queue and rate-store backends.
pub mod infra;
/// Runtime adapters and the submission intake surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
