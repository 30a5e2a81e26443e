//! Serializable identifier types shared across the crate.

use serde::{Deserialize, Serialize};

/// Unique task identifier assigned by a queue backend at enqueue time.
///
/// Identifiers are monotonic within a queue instance, so comparing two ids
/// from the same queue reflects enqueue order.
pub type TaskId = u64;

/// Opaque caller identity used as the rate-limiting and ordering key.
///
/// The inner string is guaranteed non-empty (after trimming); construct via
/// [`CallerId::new`].
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerId(String);

impl CallerId {
    /// Validate and wrap a caller identifier.
    ///
    /// Returns `None` when the input is empty or whitespace-only; a missing
    /// caller must be reported to the submitter, never silently admitted.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
