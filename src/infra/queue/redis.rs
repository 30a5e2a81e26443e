//! Redis-backed queue adapter (interface stub).
//!
//! Placeholder for a Bull-style Redis list queue; operations fail until the
//! adapter is wired to a client.

use std::time::Duration;

use crate::core::queue::{ClaimedTask, TaskDescriptor, TaskQueue};
use crate::core::QueueError;
use crate::util::serde::TaskId;

/// Redis queue adapter placeholder.
pub struct RedisQueue {
    connection: String,
    max_depth: usize,
}

impl RedisQueue {
    /// Create a new adapter for the given connection string.
    pub fn new(connection: impl Into<String>, max_depth: usize) -> Self {
        Self {
            connection: connection.into(),
            max_depth,
        }
    }

    /// Connection string this adapter was configured with.
    #[must_use]
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Key names used for the pending list and the in-flight hash.
    #[must_use]
    pub fn keys(stream: &str) -> [String; 2] {
        [format!("tg:{stream}:pending"), format!("tg:{stream}:claimed")]
    }
}

impl TaskQueue for RedisQueue {
    fn enqueue(&mut self, _descriptor: TaskDescriptor) -> Result<TaskId, QueueError> {
        Err(QueueError::Backend(
            "redis queue not wired to a client".into(),
        ))
    }

    fn dequeue(
        &mut self,
        _now_ms: u128,
        _visibility: Duration,
    ) -> Result<Option<ClaimedTask>, QueueError> {
        Err(QueueError::Backend(
            "redis queue not wired to a client".into(),
        ))
    }

    fn ack(&mut self, _id: TaskId) -> Result<(), QueueError> {
        Err(QueueError::Backend(
            "redis queue not wired to a client".into(),
        ))
    }

    fn nack(&mut self, _id: TaskId) -> Result<(), QueueError> {
        Err(QueueError::Backend(
            "redis queue not wired to a client".into(),
        ))
    }

    fn len(&self) -> usize {
        0
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }
}
