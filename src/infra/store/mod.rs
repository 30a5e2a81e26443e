//! Rate store backends.

pub mod memory;
pub mod redis;

pub use memory::InMemoryRateStore;
pub use redis::RedisRateStore;
