//! Service configuration structures.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::admission::AdmissionPolicy;
use crate::core::worker::WorkerConfig;

/// Queue backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackendConfig {
    /// In-memory queue for development/testing.
    InMemory,
    /// File-backed JSONL queue.
    File {
        /// Directory holding the queue stream file.
        dir: PathBuf,
    },
    /// Redis queue (Bull-style backend).
    Redis {
        /// Connection string.
        connection: String,
    },
}

/// Rate store backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStoreBackendConfig {
    /// In-process store; single-instance deployments only.
    InMemory,
    /// External Redis store with atomic increment-with-expiry.
    Redis {
        /// Connection string.
        connection: String,
    },
}

/// Root service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Budget units each caller may consume per window.
    #[serde(default = "defaults::rate_limit_points")]
    pub rate_limit_points: u32,
    /// Rate window length in seconds.
    #[serde(default = "defaults::rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
    /// Minimum interval between consecutive task starts, milliseconds.
    #[serde(default = "defaults::pacing_interval_ms")]
    pub pacing_interval_ms: u64,
    /// Claim visibility timeout in seconds.
    #[serde(default = "defaults::visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,
    /// Deliveries allowed per task before it is recorded as failed.
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
    /// Backoff after a failed attempt, milliseconds.
    #[serde(default = "defaults::retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Maximum queued tasks before enqueue is rejected.
    #[serde(default = "defaults::max_queue_depth")]
    pub max_queue_depth: usize,
    /// Path the submission intake is mounted on.
    #[serde(default = "defaults::submission_path")]
    pub submission_path: String,
    /// Queue backend selection.
    #[serde(default = "defaults::queue_backend")]
    pub queue: QueueBackendConfig,
    /// Rate store backend selection.
    #[serde(default = "defaults::store_backend")]
    pub store: RateStoreBackendConfig,
    /// Completion log file; `None` keeps completions in memory.
    #[serde(default)]
    pub completion_log: Option<PathBuf>,
}

mod defaults {
    use super::{QueueBackendConfig, RateStoreBackendConfig};

    pub const fn rate_limit_points() -> u32 {
        20
    }
    pub const fn rate_limit_window_secs() -> u64 {
        60
    }
    pub const fn pacing_interval_ms() -> u64 {
        1000
    }
    pub const fn visibility_timeout_secs() -> u64 {
        30
    }
    pub const fn max_attempts() -> u32 {
        3
    }
    pub const fn retry_backoff_ms() -> u64 {
        250
    }
    pub const fn max_queue_depth() -> usize {
        1000
    }
    pub fn submission_path() -> String {
        "/task".into()
    }
    pub const fn queue_backend() -> QueueBackendConfig {
        QueueBackendConfig::InMemory
    }
    pub const fn store_backend() -> RateStoreBackendConfig {
        RateStoreBackendConfig::InMemory
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            rate_limit_points: defaults::rate_limit_points(),
            rate_limit_window_secs: defaults::rate_limit_window_secs(),
            pacing_interval_ms: defaults::pacing_interval_ms(),
            visibility_timeout_secs: defaults::visibility_timeout_secs(),
            max_attempts: defaults::max_attempts(),
            retry_backoff_ms: defaults::retry_backoff_ms(),
            max_queue_depth: defaults::max_queue_depth(),
            submission_path: defaults::submission_path(),
            queue: defaults::queue_backend(),
            store: defaults::store_backend(),
            completion_log: None,
        }
    }
}

impl ServiceConfig {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit_points == 0 {
            return Err("rate_limit_points must be greater than 0".into());
        }
        if self.rate_limit_window_secs == 0 {
            return Err("rate_limit_window_secs must be greater than 0".into());
        }
        if self.max_queue_depth == 0 {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.submission_path.is_empty() {
            return Err("submission_path must not be empty".into());
        }
        // Worker timing constraints live with the worker config.
        self.worker_config().validate()
    }

    /// Parse service configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation failure description.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the environment (and `.env` if present).
    ///
    /// Recognized variables, all prefixed `TASKGATE_`: `RATE_LIMIT_POINTS`,
    /// `RATE_LIMIT_WINDOW_SECS`, `PACING_INTERVAL_MS`,
    /// `VISIBILITY_TIMEOUT_SECS`, `MAX_ATTEMPTS`, `RETRY_BACKOFF_MS`,
    /// `MAX_QUEUE_DEPTH`, `SUBMISSION_PATH`, `QUEUE_DIR`,
    /// `QUEUE_CONNECTION`, `STORE_CONNECTION`, `COMPLETION_LOG`.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation failure description.
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();
        let mut cfg = Self::default();

        if let Some(v) = env_parse("TASKGATE_RATE_LIMIT_POINTS")? {
            cfg.rate_limit_points = v;
        }
        if let Some(v) = env_parse("TASKGATE_RATE_LIMIT_WINDOW_SECS")? {
            cfg.rate_limit_window_secs = v;
        }
        if let Some(v) = env_parse("TASKGATE_PACING_INTERVAL_MS")? {
            cfg.pacing_interval_ms = v;
        }
        if let Some(v) = env_parse("TASKGATE_VISIBILITY_TIMEOUT_SECS")? {
            cfg.visibility_timeout_secs = v;
        }
        if let Some(v) = env_parse("TASKGATE_MAX_ATTEMPTS")? {
            cfg.max_attempts = v;
        }
        if let Some(v) = env_parse("TASKGATE_RETRY_BACKOFF_MS")? {
            cfg.retry_backoff_ms = v;
        }
        if let Some(v) = env_parse("TASKGATE_MAX_QUEUE_DEPTH")? {
            cfg.max_queue_depth = v;
        }
        if let Ok(v) = std::env::var("TASKGATE_SUBMISSION_PATH") {
            cfg.submission_path = v;
        }
        if let Ok(v) = std::env::var("TASKGATE_QUEUE_DIR") {
            cfg.queue = QueueBackendConfig::File { dir: v.into() };
        }
        if let Ok(v) = std::env::var("TASKGATE_QUEUE_CONNECTION") {
            cfg.queue = QueueBackendConfig::Redis { connection: v };
        }
        if let Ok(v) = std::env::var("TASKGATE_STORE_CONNECTION") {
            cfg.store = RateStoreBackendConfig::Redis { connection: v };
        }
        if let Ok(v) = std::env::var("TASKGATE_COMPLETION_LOG") {
            cfg.completion_log = Some(v.into());
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Admission policy derived from this configuration.
    #[must_use]
    pub const fn admission_policy(&self) -> AdmissionPolicy {
        AdmissionPolicy {
            points: self.rate_limit_points,
            window: Duration::from_secs(self.rate_limit_window_secs),
        }
    }

    /// Worker configuration derived from this configuration.
    #[must_use]
    pub const fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            pacing_interval: Duration::from_millis(self.pacing_interval_ms),
            visibility_timeout: Duration::from_secs(self.visibility_timeout_secs),
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            idle_poll_interval: Duration::from_millis(50),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("invalid {key}: {e}")),
        Err(_) => Ok(None),
    }
}
