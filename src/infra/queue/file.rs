//! File-backed durable queue.
//!
//! A simplified JSONL persistence layer: every task entry (pending and
//! claimed) is written to a single stream file, so accepted tasks survive a
//! worker restart. Claimed-but-unacked entries reload as pending, which gives
//! at-least-once redelivery after a crash.

use std::collections::{HashMap, VecDeque};
use std::fs::{create_dir_all, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::queue::{ClaimedTask, TaskDescriptor, TaskQueue, TaskState};
use crate::core::QueueError;
use crate::util::serde::TaskId;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedTask {
    id: TaskId,
    descriptor: TaskDescriptor,
    attempts: u32,
    state: TaskState,
}

struct InFlightEntry {
    task: PersistedTask,
    deadline_ms: u128,
}

/// File-backed queue using JSON lines for durability.
pub struct FileQueue {
    path: PathBuf,
    stream: String,
    max_depth: usize,
    next_id: TaskId,
    pending: VecDeque<PersistedTask>,
    in_flight: HashMap<TaskId, InFlightEntry>,
}

impl FileQueue {
    /// Open (or create) a queue stream under `path`.
    ///
    /// # Errors
    ///
    /// [`QueueError::Backend`] when the directory cannot be created or an
    /// existing stream file cannot be parsed.
    pub fn new(
        path: impl AsRef<Path>,
        stream: impl Into<String>,
        max_depth: usize,
    ) -> Result<Self, QueueError> {
        let path = path.as_ref().to_path_buf();
        let stream = stream.into();
        create_dir_all(&path).map_err(|e| QueueError::Backend(e.to_string()))?;
        let mut queue = Self {
            path,
            stream,
            max_depth,
            next_id: 1,
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
        };
        queue.load_from_disk()?;
        Ok(queue)
    }

    fn file_path(&self) -> PathBuf {
        self.path.join(format!("{}.jsonl", self.stream))
    }

    fn load_from_disk(&mut self) -> Result<(), QueueError> {
        let file_path = self.file_path();
        if !file_path.exists() {
            return Ok(());
        }
        let file = OpenOptions::new()
            .read(true)
            .open(&file_path)
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line.map_err(|e| QueueError::Backend(e.to_string()))?;
            let mut task: PersistedTask =
                serde_json::from_str(&line).map_err(|e| QueueError::Backend(e.to_string()))?;
            // A claim does not survive the process; redeliver on restart.
            if task.state == TaskState::Claimed {
                task.state = TaskState::Enqueued;
            }
            self.next_id = self.next_id.max(task.id + 1);
            self.pending.push_back(task);
        }
        // Stream order is enqueue order, but make redelivery order explicit.
        self.pending
            .make_contiguous()
            .sort_unstable_by_key(|t| t.id);
        Ok(())
    }

    /// Rewrite the stream through a temp file and rename it into place, so
    /// a crash mid-rewrite leaves the previous stream intact.
    fn rewrite_disk(&self) -> Result<(), QueueError> {
        let file_path = self.file_path();
        let tmp_path = self.path.join(format!("{}.jsonl.tmp", self.stream));
        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)
                .map_err(|e| QueueError::Backend(e.to_string()))?;
            for task in &self.pending {
                let line =
                    serde_json::to_string(task).map_err(|e| QueueError::Backend(e.to_string()))?;
                writeln!(file, "{line}").map_err(|e| QueueError::Backend(e.to_string()))?;
            }
            for flight in self.in_flight.values() {
                let line = serde_json::to_string(&flight.task)
                    .map_err(|e| QueueError::Backend(e.to_string()))?;
                writeln!(file, "{line}").map_err(|e| QueueError::Backend(e.to_string()))?;
            }
        }
        std::fs::rename(&tmp_path, &file_path).map_err(|e| QueueError::Backend(e.to_string()))
    }

    fn append_to_disk(&self, task: &PersistedTask) -> Result<(), QueueError> {
        let file_path = self.file_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .map_err(|e| QueueError::Backend(e.to_string()))?;
        let line = serde_json::to_string(task).map_err(|e| QueueError::Backend(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| QueueError::Backend(e.to_string()))
    }

    /// Returns whether any expired claim was moved back to pending.
    fn reclaim_expired(&mut self, now_ms: u128) -> bool {
        let mut expired: Vec<TaskId> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.deadline_ms <= now_ms)
            .map(|(id, _)| *id)
            .collect();
        if expired.is_empty() {
            return false;
        }
        expired.sort_unstable_by(|a, b| b.cmp(a));
        for id in expired {
            if let Some(mut flight) = self.in_flight.remove(&id) {
                tracing::warn!(task_id = id, "claim expired, returning task to queue");
                flight.task.state = TaskState::Enqueued;
                self.pending.push_front(flight.task);
            }
        }
        true
    }
}

impl TaskQueue for FileQueue {
    fn enqueue(&mut self, descriptor: TaskDescriptor) -> Result<TaskId, QueueError> {
        if self.len() >= self.max_depth() {
            return Err(QueueError::QueueFull("max queue depth reached".into()));
        }
        let id = self.next_id;
        self.next_id += 1;
        let task = PersistedTask {
            id,
            descriptor,
            attempts: 0,
            state: TaskState::Enqueued,
        };
        self.append_to_disk(&task)?;
        self.pending.push_back(task);
        Ok(id)
    }

    fn dequeue(
        &mut self,
        now_ms: u128,
        visibility: Duration,
    ) -> Result<Option<ClaimedTask>, QueueError> {
        let reclaimed = self.reclaim_expired(now_ms);

        let Some(mut task) = self.pending.pop_front() else {
            // Idle polls leave the disk alone; only a reclaim changed state.
            if reclaimed {
                self.rewrite_disk()?;
            }
            return Ok(None);
        };
        task.attempts += 1;
        task.state = TaskState::Claimed;

        let claimed = ClaimedTask {
            id: task.id,
            descriptor: task.descriptor.clone(),
            attempt: task.attempts,
        };
        self.in_flight.insert(
            task.id,
            InFlightEntry {
                task,
                deadline_ms: now_ms + visibility.as_millis(),
            },
        );
        self.rewrite_disk()?;
        Ok(Some(claimed))
    }

    fn ack(&mut self, id: TaskId) -> Result<(), QueueError> {
        self.in_flight
            .remove(&id)
            .ok_or(QueueError::UnknownTask(id))?;
        self.rewrite_disk()
    }

    fn nack(&mut self, id: TaskId) -> Result<(), QueueError> {
        let mut flight = self
            .in_flight
            .remove(&id)
            .ok_or(QueueError::UnknownTask(id))?;
        flight.task.state = TaskState::Enqueued;
        self.pending.push_front(flight.task);
        self.rewrite_disk()
    }

    fn len(&self) -> usize {
        self.pending.len() + self.in_flight.len()
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::serde::CallerId;

    const VIS: Duration = Duration::from_millis(1000);

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("taskgate-queue-{}", uuid::Uuid::new_v4()))
    }

    fn make_descriptor(caller: &str, value: u64) -> TaskDescriptor {
        TaskDescriptor {
            caller_id: CallerId::new(caller).unwrap(),
            submitted_at_ms: 0,
            payload: serde_json::json!({ "value": value }),
        }
    }

    #[test]
    fn test_enqueue_survives_reopen() {
        let dir = temp_dir();
        {
            let mut q = FileQueue::new(&dir, "tasks", 100).unwrap();
            q.enqueue(make_descriptor("u1", 1)).unwrap();
            q.enqueue(make_descriptor("u2", 2)).unwrap();
        }

        let mut reopened = FileQueue::new(&dir, "tasks", 100).unwrap();
        assert_eq!(reopened.len(), 2);
        let first = reopened.dequeue(0, VIS).unwrap().unwrap();
        assert_eq!(first.descriptor.payload["value"], 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_claimed_task_redelivered_after_restart() {
        let dir = temp_dir();
        let claimed_id;
        {
            let mut q = FileQueue::new(&dir, "tasks", 100).unwrap();
            q.enqueue(make_descriptor("u1", 1)).unwrap();
            claimed_id = q.dequeue(0, VIS).unwrap().unwrap().id;
            // Simulated crash: no ack.
        }

        let mut reopened = FileQueue::new(&dir, "tasks", 100).unwrap();
        let redelivered = reopened.dequeue(0, VIS).unwrap().unwrap();
        assert_eq!(redelivered.id, claimed_id);
        // Prior delivery counts toward the attempt bound.
        assert_eq!(redelivered.attempt, 2);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_ack_removes_from_disk() {
        let dir = temp_dir();
        {
            let mut q = FileQueue::new(&dir, "tasks", 100).unwrap();
            q.enqueue(make_descriptor("u1", 1)).unwrap();
            let claimed = q.dequeue(0, VIS).unwrap().unwrap();
            q.ack(claimed.id).unwrap();
        }

        let reopened = FileQueue::new(&dir, "tasks", 100).unwrap();
        assert_eq!(reopened.len(), 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_idle_poll_leaves_disk_untouched() {
        let dir = temp_dir();
        let mut q = FileQueue::new(&dir, "tasks", 100).unwrap();
        let stream = dir.join("tasks.jsonl");

        // Nothing enqueued yet: polling must not create the stream file.
        assert!(q.dequeue(0, VIS).unwrap().is_none());
        assert!(!stream.exists());

        q.enqueue(make_descriptor("u1", 1)).unwrap();
        let claimed = q.dequeue(0, VIS).unwrap().unwrap();
        q.ack(claimed.id).unwrap();
        let after_ack = std::fs::metadata(&stream).unwrap().modified().unwrap();

        // Idle polls with no expired claims must not rewrite the stream.
        for _ in 0..5 {
            assert!(q.dequeue(500, VIS).unwrap().is_none());
        }
        let after_polls = std::fs::metadata(&stream).unwrap().modified().unwrap();
        assert_eq!(after_ack, after_polls);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_rewrite_leaves_no_temp_file() {
        let dir = temp_dir();
        let mut q = FileQueue::new(&dir, "tasks", 100).unwrap();
        q.enqueue(make_descriptor("u1", 1)).unwrap();
        let claimed = q.dequeue(0, VIS).unwrap().unwrap();
        q.nack(claimed.id).unwrap();
        q.dequeue(0, VIS).unwrap().unwrap();

        assert!(dir.join("tasks.jsonl").exists());
        assert!(!dir.join("tasks.jsonl.tmp").exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_ids_keep_growing_after_reopen() {
        let dir = temp_dir();
        let first;
        {
            let mut q = FileQueue::new(&dir, "tasks", 100).unwrap();
            first = q.enqueue(make_descriptor("u1", 1)).unwrap();
        }
        let mut reopened = FileQueue::new(&dir, "tasks", 100).unwrap();
        let second = reopened.enqueue(make_descriptor("u1", 2)).unwrap();
        assert!(second > first);
        std::fs::remove_dir_all(&dir).ok();
    }
}
