//! Queue backends.

pub mod file;
pub mod memory;
pub mod redis;

pub use file::FileQueue;
pub use memory::InMemoryQueue;
pub use redis::RedisQueue;
