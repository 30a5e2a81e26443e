//! Per-caller admission control over an atomic rate store.
//!
//! The controller decides accept/reject for each submission inside a fixed
//! window. All atomicity lives behind the [`RateStore`] contract: the store's
//! `consume` is a single read-modify-write per key, so concurrent submissions
//! for the same caller cannot over-admit regardless of how many controller
//! instances exist.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::AdmissionError;
use crate::util::serde::CallerId;

/// Outcome of an atomic `consume` against a rate store.
#[derive(Debug, Clone)]
pub struct RateDecision {
    /// Whether the cost fit within the caller's window budget.
    pub admitted: bool,
    /// Budget units left in the current window after this call.
    pub remaining: u32,
    /// Time until the caller's current window resets.
    pub retry_after: Duration,
}

/// Shared counter store keyed by caller identity.
///
/// Implementations must make `consume` atomic per key: read the window,
/// reset it if elapsed, and add `cost` only when the result stays within
/// `limit`. On rejection the cost is not consumed. Separate read+write calls
/// race under concurrent submissions from the same caller and are not an
/// acceptable implementation.
#[async_trait]
pub trait RateStore: Send + Sync {
    /// Atomically attempt to consume `cost` units from `key`'s budget for the
    /// window of `window` length with the given `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::StoreUnavailable`] when the store cannot be
    /// reached; this must never be conflated with a rejection.
    async fn consume(
        &self,
        key: &CallerId,
        cost: u32,
        window: Duration,
        limit: u32,
    ) -> Result<RateDecision, AdmissionError>;
}

/// Budget applied to every caller.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    /// Units each caller may consume per window.
    pub points: u32,
    /// Window length.
    pub window: Duration,
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self {
            points: 20,
            window: Duration::from_secs(60),
        }
    }
}

/// Result of an admission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitDecision {
    /// The submission was admitted; `remaining` units are left this window.
    Accepted {
        /// Budget units left after this admission.
        remaining: u32,
    },
    /// The submission was rejected; retry once the window resets.
    Rejected {
        /// Whole seconds until the window resets, rounded up, always >= 1.
        retry_after_secs: u64,
    },
}

/// Decides accept/reject per submission by consuming the rate store.
///
/// Cloneable and safe under arbitrary concurrent invocation; it holds no
/// mutable state of its own.
#[derive(Clone)]
pub struct AdmissionController {
    store: Arc<dyn RateStore>,
    policy: AdmissionPolicy,
}

impl AdmissionController {
    /// Create a controller over a store with the given policy.
    pub fn new(store: Arc<dyn RateStore>, policy: AdmissionPolicy) -> Self {
        Self { store, policy }
    }

    /// The policy this controller enforces.
    #[must_use]
    pub const fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// Attempt to admit `cost` units for `caller`.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::InvalidCost`] for a zero cost, and
    /// [`AdmissionError::StoreUnavailable`] when the store round-trip fails.
    /// A rejection is not an error; it is [`AdmitDecision::Rejected`].
    pub async fn try_admit(
        &self,
        caller: &CallerId,
        cost: u32,
    ) -> Result<AdmitDecision, AdmissionError> {
        if cost == 0 {
            return Err(AdmissionError::InvalidCost);
        }

        let decision = self
            .store
            .consume(caller, cost, self.policy.window, self.policy.points)
            .await?;

        if decision.admitted {
            tracing::debug!(
                caller = %caller,
                remaining = decision.remaining,
                "submission admitted"
            );
            Ok(AdmitDecision::Accepted {
                remaining: decision.remaining,
            })
        } else {
            // Round up to whole seconds; a caller told to retry after zero
            // seconds would hammer the same exhausted window.
            let retry_after_secs = decision
                .retry_after
                .as_millis()
                .div_ceil(1000)
                .max(1)
                .try_into()
                .unwrap_or(u64::MAX);
            tracing::debug!(
                caller = %caller,
                retry_after_secs,
                "submission rejected by rate limit"
            );
            Ok(AdmitDecision::Rejected { retry_after_secs })
        }
    }
}
