//! Submission intake tests: validation, rejection, store outage, and the
//! mapping of intake errors to HTTP-equivalent status codes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use taskgate::core::{
    AdmissionController, AdmissionError, AdmissionPolicy, IntakeError, RateDecision, RateStore,
    TaskQueue,
};
use taskgate::infra::queue::InMemoryQueue;
use taskgate::infra::store::{InMemoryRateStore, RedisRateStore};
use taskgate::runtime::{submit, SubmitRequest};
use taskgate::util::clock::now_ms;
use taskgate::util::serde::CallerId;

/// Store wrapper counting consume calls, to prove validation short-circuits
/// before any store interaction.
struct CountingStore {
    inner: InMemoryRateStore,
    calls: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: InMemoryRateStore::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RateStore for CountingStore {
    async fn consume(
        &self,
        key: &CallerId,
        cost: u32,
        window: Duration,
        limit: u32,
    ) -> Result<RateDecision, AdmissionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.consume(key, cost, window, limit).await
    }
}

fn policy(points: u32) -> AdmissionPolicy {
    AdmissionPolicy {
        points,
        window: Duration::from_secs(60),
    }
}

fn request(caller: &str, value: u64) -> SubmitRequest {
    SubmitRequest {
        caller_id: caller.into(),
        payload: serde_json::json!({ "value": value }),
    }
}

#[tokio::test]
async fn test_missing_caller_touches_nothing() {
    let store = Arc::new(CountingStore::new());
    let admission = AdmissionController::new(Arc::clone(&store) as Arc<dyn RateStore>, policy(20));
    let queue = Arc::new(Mutex::new(InMemoryQueue::new(100)));

    let err = submit(&admission, &queue, request("", 1), now_ms())
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::MissingCaller));
    assert_eq!(err.status_code(), 400);

    // No rate store consumption, nothing enqueued.
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    assert_eq!(queue.lock().len(), 0);

    // Whitespace-only is just as missing.
    let err = submit(&admission, &queue, request("   ", 1), now_ms())
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::MissingCaller));
    assert_eq!(store.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_store_outage_is_not_admission() {
    let admission = AdmissionController::new(
        Arc::new(RedisRateStore::new("redis://127.0.0.1:6379")),
        policy(20),
    );
    let queue = Arc::new(Mutex::new(InMemoryQueue::new(100)));

    let err = submit(&admission, &queue, request("u1", 1), now_ms())
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::StoreUnavailable(_)));
    assert_eq!(err.status_code(), 503);
    assert_eq!(queue.lock().len(), 0);
}

#[tokio::test]
async fn test_accept_enqueues_descriptor_intact() {
    let admission = AdmissionController::new(Arc::new(InMemoryRateStore::new()), policy(20));
    let queue = Arc::new(Mutex::new(InMemoryQueue::new(100)));

    let submitted_at = now_ms();
    let accepted = submit(&admission, &queue, request("u1", 42), submitted_at)
        .await
        .unwrap();
    assert_eq!(accepted.remaining, 19);

    let claimed = queue
        .lock()
        .dequeue(now_ms(), Duration::from_secs(30))
        .unwrap()
        .unwrap();
    assert_eq!(claimed.id, accepted.task_id);
    assert_eq!(claimed.descriptor.caller_id.as_str(), "u1");
    assert_eq!(claimed.descriptor.submitted_at_ms, submitted_at);
    assert_eq!(claimed.descriptor.payload, serde_json::json!({ "value": 42 }));
}

#[tokio::test]
async fn test_rate_limited_response() {
    let admission = AdmissionController::new(Arc::new(InMemoryRateStore::new()), policy(2));
    let queue = Arc::new(Mutex::new(InMemoryQueue::new(100)));

    submit(&admission, &queue, request("u1", 1), now_ms())
        .await
        .unwrap();
    submit(&admission, &queue, request("u1", 2), now_ms())
        .await
        .unwrap();

    let err = submit(&admission, &queue, request("u1", 3), now_ms())
        .await
        .unwrap_err();
    match &err {
        IntakeError::RateLimited { retry_after_secs } => assert!(*retry_after_secs > 0),
        other => panic!("expected rate limit, got {other:?}"),
    }
    assert_eq!(err.status_code(), 429);
    // The rejected submission was not enqueued.
    assert_eq!(queue.lock().len(), 2);
}

#[tokio::test]
async fn test_queue_full_surfaces_as_server_error() {
    let admission = AdmissionController::new(Arc::new(InMemoryRateStore::new()), policy(20));
    let queue = Arc::new(Mutex::new(InMemoryQueue::new(1)));

    submit(&admission, &queue, request("u1", 1), now_ms())
        .await
        .unwrap();
    let err = submit(&admission, &queue, request("u1", 2), now_ms())
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::Enqueue(_)));
    assert_eq!(err.status_code(), 500);
}

#[tokio::test]
async fn test_per_caller_order_preserved() {
    let admission = AdmissionController::new(Arc::new(InMemoryRateStore::new()), policy(20));
    let queue = Arc::new(Mutex::new(InMemoryQueue::new(100)));

    for value in 1..=3 {
        submit(&admission, &queue, request("u1", value), now_ms())
            .await
            .unwrap();
    }

    for expected in 1..=3 {
        let claimed = queue
            .lock()
            .dequeue(now_ms(), Duration::from_secs(30))
            .unwrap()
            .unwrap();
        assert_eq!(claimed.descriptor.payload["value"], expected);
        queue.lock().ack(claimed.id).unwrap();
    }
}
