//! In-memory FIFO queue with claim visibility tracking.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::core::queue::{ClaimedTask, TaskDescriptor, TaskQueue};
use crate::core::QueueError;
use crate::util::serde::TaskId;

struct QueueEntry {
    id: TaskId,
    descriptor: TaskDescriptor,
    /// Deliveries so far; incremented each time the entry is claimed.
    attempts: u32,
}

struct InFlightEntry {
    entry: QueueEntry,
    /// Wall-clock deadline after which the claim expires and the task is
    /// eligible for redelivery.
    deadline_ms: u128,
}

/// In-memory queue for development and testing.
///
/// FIFO global order: `dequeue` returns the oldest visible task, and entries
/// whose claim has expired are redelivered ahead of younger pending work.
pub struct InMemoryQueue {
    max_depth: usize,
    next_id: TaskId,
    pending: VecDeque<QueueEntry>,
    in_flight: HashMap<TaskId, InFlightEntry>,
}

impl InMemoryQueue {
    /// Create a new in-memory queue with a maximum depth.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            next_id: 1,
            pending: VecDeque::with_capacity(max_depth.min(1024)),
            in_flight: HashMap::new(),
        }
    }

    /// Move expired claims back to the head of the pending queue, oldest
    /// first, so redelivery preserves age order.
    fn reclaim_expired(&mut self, now_ms: u128) {
        let mut expired: Vec<TaskId> = self
            .in_flight
            .iter()
            .filter(|(_, f)| f.deadline_ms <= now_ms)
            .map(|(id, _)| *id)
            .collect();
        if expired.is_empty() {
            return;
        }
        // Push newest expired first so the oldest ends up at the front.
        expired.sort_unstable_by(|a, b| b.cmp(a));
        for id in expired {
            if let Some(flight) = self.in_flight.remove(&id) {
                tracing::warn!(task_id = id, "claim expired, returning task to queue");
                self.pending.push_front(flight.entry);
            }
        }
    }
}

impl TaskQueue for InMemoryQueue {
    fn enqueue(&mut self, descriptor: TaskDescriptor) -> Result<TaskId, QueueError> {
        if self.len() >= self.max_depth() {
            return Err(QueueError::QueueFull("max queue depth reached".into()));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push_back(QueueEntry {
            id,
            descriptor,
            attempts: 0,
        });
        Ok(id)
    }

    fn dequeue(
        &mut self,
        now_ms: u128,
        visibility: Duration,
    ) -> Result<Option<ClaimedTask>, QueueError> {
        self.reclaim_expired(now_ms);

        let Some(mut entry) = self.pending.pop_front() else {
            return Ok(None);
        };
        entry.attempts += 1;

        let claimed = ClaimedTask {
            id: entry.id,
            descriptor: entry.descriptor.clone(),
            attempt: entry.attempts,
        };
        self.in_flight.insert(
            entry.id,
            InFlightEntry {
                entry,
                deadline_ms: now_ms + visibility.as_millis(),
            },
        );
        Ok(Some(claimed))
    }

    fn ack(&mut self, id: TaskId) -> Result<(), QueueError> {
        self.in_flight
            .remove(&id)
            .map(|_| ())
            .ok_or(QueueError::UnknownTask(id))
    }

    fn nack(&mut self, id: TaskId) -> Result<(), QueueError> {
        let flight = self
            .in_flight
            .remove(&id)
            .ok_or(QueueError::UnknownTask(id))?;
        self.pending.push_front(flight.entry);
        Ok(())
    }

    fn len(&self) -> usize {
        self.pending.len() + self.in_flight.len()
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }
}
