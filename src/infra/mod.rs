//! Infrastructure adapters for queue and rate-store backends.

pub mod queue;
pub mod store;

pub use queue::{FileQueue, InMemoryQueue, RedisQueue};
pub use store::{InMemoryRateStore, RedisRateStore};
