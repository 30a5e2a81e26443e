//! Completion sink implementations.
//!
//! The sink is the external append-only destination for completed-task
//! evidence. Write failures degrade observability, not correctness: sinks log
//! their own errors and never propagate them into the worker.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::TaskId;

/// Completion event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related task identifier.
    pub task_id: TaskId,
    /// Caller on whose behalf the task ran.
    pub caller_id: String,
    /// Action taken (complete, failed).
    pub action: String,
    /// Timestamp milliseconds.
    pub at_ms: u128,
}

/// Completion sink abstraction.
pub trait CompletionSink: Send {
    /// Record a completion event. Infallible at the call site; sinks handle
    /// their own write errors.
    fn record(&mut self, event: CompletionEvent);
}

/// In-memory completion sink for testing and dev.
pub struct InMemoryCompletionSink {
    events: VecDeque<CompletionEvent>,
    max_events: usize,
}

impl InMemoryCompletionSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<CompletionEvent> {
        self.events.iter().cloned().collect()
    }
}

impl CompletionSink for InMemoryCompletionSink {
    fn record(&mut self, event: CompletionEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// File-backed completion sink appending JSON lines.
pub struct FileCompletionSink {
    path: PathBuf,
}

impl FileCompletionSink {
    /// Create a sink appending to the given log file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CompletionSink for FileCompletionSink {
    fn record(&mut self, event: CompletionEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("failed to serialize completion event: {e}");
                return;
            }
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| writeln!(file, "{line}"));
        if let Err(e) = result {
            tracing::error!(
                path = %self.path.display(),
                "failed to write completion log: {e}"
            );
        }
    }
}

/// A shared handle is itself a sink, so one sink instance can be observed by
/// tests or shared between the executor and the worker's failure path.
impl<S: CompletionSink> CompletionSink for std::sync::Arc<parking_lot::Mutex<S>> {
    fn record(&mut self, event: CompletionEvent) {
        self.lock().record(event);
    }
}

/// Helper to build a completion event from context.
pub fn build_completion_event(
    task_id: TaskId,
    caller_id: impl Into<String>,
    action: impl Into<String>,
) -> CompletionEvent {
    CompletionEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        task_id,
        caller_id: caller_id.into(),
        action: action.into(),
        at_ms: now_ms(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_sink_bounds_buffer() {
        let mut sink = InMemoryCompletionSink::new(2);
        for i in 0..3 {
            sink.record(build_completion_event(i, "u1", "complete"));
        }
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].task_id, 1);
        assert_eq!(events[1].task_id, 2);
    }

    #[test]
    fn file_sink_swallows_write_errors() {
        // Directory path cannot be opened for append; record must not panic.
        let mut sink = FileCompletionSink::new("/");
        sink.record(build_completion_event(1, "u1", "complete"));
    }

    #[test]
    fn file_sink_appends_json_lines() {
        let dir = std::env::temp_dir().join(format!("taskgate-sink-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("completions.jsonl");

        let mut sink = FileCompletionSink::new(&path);
        sink.record(build_completion_event(7, "u1", "complete"));
        sink.record(build_completion_event(8, "u2", "failed"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: CompletionEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.task_id, 7);
        assert_eq!(first.action, "complete");
        std::fs::remove_dir_all(&dir).ok();
    }
}
