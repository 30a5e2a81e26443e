//! Redis-backed rate store (interface stub).
//!
//! Placeholder for an external atomic increment-with-expiry store. Until it
//! is wired to a client every `consume` reports the store unreachable, which
//! exercises the outage path end to end: a store outage surfaces as
//! `StoreUnavailable`, never as a rate-limit rejection.

use std::time::Duration;

use async_trait::async_trait;

use crate::core::admission::{RateDecision, RateStore};
use crate::core::AdmissionError;
use crate::util::serde::CallerId;

/// Redis rate store adapter placeholder.
pub struct RedisRateStore {
    connection: String,
    key_prefix: String,
}

impl RedisRateStore {
    /// Create a new adapter for the given connection string.
    pub fn new(connection: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            key_prefix: "tg:rate".into(),
        }
    }

    /// Connection string this adapter was configured with.
    #[must_use]
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Key under which a caller's window counter would live.
    #[must_use]
    pub fn key_for(&self, caller: &CallerId) -> String {
        format!("{}:{}", self.key_prefix, caller.as_str())
    }
}

#[async_trait]
impl RateStore for RedisRateStore {
    async fn consume(
        &self,
        _key: &CallerId,
        _cost: u32,
        _window: Duration,
        _limit: u32,
    ) -> Result<RateDecision, AdmissionError> {
        Err(AdmissionError::StoreUnavailable(
            "redis rate store not wired to a client".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unwired_store_reports_unavailable() {
        let store = RedisRateStore::new("redis://127.0.0.1:6379");
        let caller = CallerId::new("u1").unwrap();
        let result = store
            .consume(&caller, 1, Duration::from_secs(60), 20)
            .await;
        assert!(matches!(result, Err(AdmissionError::StoreUnavailable(_))));
    }

    #[test]
    fn test_key_layout() {
        let store = RedisRateStore::new("redis://localhost");
        let caller = CallerId::new("u1").unwrap();
        assert_eq!(store.key_for(&caller), "tg:rate:u1");
    }
}
