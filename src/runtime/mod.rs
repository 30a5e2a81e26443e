//! Runtime adapters and the submission intake surface.

pub mod intake;
pub mod tokio_spawner;

pub use intake::{health, submit, Health, SubmitAccepted, SubmitRequest};
pub use tokio_spawner::{spawn_worker, TokioSpawner};
