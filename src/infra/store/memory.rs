//! In-memory rate store with atomic fixed-window consume.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::admission::{RateDecision, RateStore};
use crate::core::AdmissionError;
use crate::util::clock::now_ms;
use crate::util::serde::CallerId;

struct WindowSlot {
    count: u32,
    window_start_ms: u128,
}

/// In-process rate store for development, testing, and single-instance
/// deployments.
///
/// The whole read-reset-increment sequence for a key runs inside one mutex
/// critical section, so concurrent submissions for the same caller cannot
/// lose updates or over-admit. Multi-instance deployments need an external
/// store providing the same atomicity.
#[derive(Default)]
pub struct InMemoryRateStore {
    slots: Mutex<HashMap<String, WindowSlot>>,
}

impl InMemoryRateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateStore for InMemoryRateStore {
    async fn consume(
        &self,
        key: &CallerId,
        cost: u32,
        window: Duration,
        limit: u32,
    ) -> Result<RateDecision, AdmissionError> {
        let now = now_ms();
        let window_ms = window.as_millis();
        let mut slots = self.slots.lock();
        let slot = slots.entry(key.as_str().to_string()).or_insert(WindowSlot {
            count: 0,
            window_start_ms: now,
        });

        if now.saturating_sub(slot.window_start_ms) >= window_ms {
            slot.count = 0;
            slot.window_start_ms = now;
        }

        let window_end = slot.window_start_ms + window_ms;
        let retry_after = Duration::from_millis(
            window_end
                .saturating_sub(now)
                .try_into()
                .unwrap_or(u64::MAX),
        );

        if slot.count.saturating_add(cost) <= limit {
            // Cost is consumed only on acceptance.
            slot.count += cost;
            Ok(RateDecision {
                admitted: true,
                remaining: limit - slot.count,
                retry_after,
            })
        } else {
            Ok(RateDecision {
                admitted: false,
                remaining: limit.saturating_sub(slot.count),
                retry_after,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(raw: &str) -> CallerId {
        CallerId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn test_consume_until_limit() {
        let store = InMemoryRateStore::new();
        let window = Duration::from_secs(60);

        for expected_remaining in (0..3).rev() {
            let d = store.consume(&caller("u1"), 1, window, 3).await.unwrap();
            assert!(d.admitted);
            assert_eq!(d.remaining, expected_remaining);
        }

        let rejected = store.consume(&caller("u1"), 1, window, 3).await.unwrap();
        assert!(!rejected.admitted);
        assert!(rejected.retry_after > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_rejection_does_not_consume() {
        let store = InMemoryRateStore::new();
        let window = Duration::from_secs(60);

        store.consume(&caller("u1"), 2, window, 3).await.unwrap();
        // Cost 2 would exceed the limit of 3; the remaining unit survives.
        let rejected = store.consume(&caller("u1"), 2, window, 3).await.unwrap();
        assert!(!rejected.admitted);

        let still_one_left = store.consume(&caller("u1"), 1, window, 3).await.unwrap();
        assert!(still_one_left.admitted);
        assert_eq!(still_one_left.remaining, 0);
    }

    #[tokio::test]
    async fn test_callers_are_isolated() {
        let store = InMemoryRateStore::new();
        let window = Duration::from_secs(60);

        let d = store.consume(&caller("u1"), 1, window, 1).await.unwrap();
        assert!(d.admitted);
        let rejected = store.consume(&caller("u1"), 1, window, 1).await.unwrap();
        assert!(!rejected.admitted);

        // A different caller has its own window.
        let other = store.consume(&caller("u2"), 1, window, 1).await.unwrap();
        assert!(other.admitted);
    }

    #[tokio::test]
    async fn test_window_resets() {
        let store = InMemoryRateStore::new();
        let window = Duration::from_millis(50);

        let d = store.consume(&caller("u1"), 1, window, 1).await.unwrap();
        assert!(d.admitted);
        let rejected = store.consume(&caller("u1"), 1, window, 1).await.unwrap();
        assert!(!rejected.admitted);

        tokio::time::sleep(Duration::from_millis(80)).await;
        let after_reset = store.consume(&caller("u1"), 1, window, 1).await.unwrap();
        assert!(after_reset.admitted);
    }
}
