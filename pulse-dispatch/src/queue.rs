//! Bounded FIFO of records awaiting delivery.

use std::collections::VecDeque;

use pulse_core::models::EventRecord;

/// A pending record and the number of failed delivery attempts behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedRecord {
    pub record: EventRecord,
    pub attempts: u32,
}

impl QueuedRecord {
    pub fn new(record: EventRecord) -> Self {
        Self {
            record,
            attempts: 0,
        }
    }
}

/// Insertion-ordered queue with a hard bound.
///
/// When the bound is exceeded the oldest records are dropped; the caller
/// never sees an error.
#[derive(Debug)]
pub struct EventQueue {
    items: VecDeque<QueuedRecord>,
    max_size: usize,
    dropped: u64,
}

impl EventQueue {
    /// `max_size` is clamped to at least 1.
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size: max_size.max(1),
            dropped: 0,
        }
    }

    /// Append a record. Returns how many old records were dropped to make room.
    pub fn enqueue(&mut self, record: QueuedRecord) -> usize {
        self.items.push_back(record);
        self.enforce_bound()
    }

    /// Remove up to `max` records from the front, in order.
    pub fn drain(&mut self, max: usize) -> Vec<QueuedRecord> {
        let n = max.min(self.items.len());
        self.items.drain(..n).collect()
    }

    /// Put records back ahead of everything queued, keeping their relative
    /// order. Returns how many records the bound then dropped.
    pub fn requeue_front(&mut self, records: Vec<QueuedRecord>) -> usize {
        for record in records.into_iter().rev() {
            self.items.push_front(record);
        }
        self.enforce_bound()
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Records dropped by the bound over the queue's lifetime.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedRecord> {
        self.items.iter()
    }

    fn enforce_bound(&mut self) -> usize {
        let mut dropped = 0;
        while self.items.len() > self.max_size {
            if let Some(old) = self.items.pop_front() {
                tracing::warn!(
                    client_event_id = old.record.client_event_id(),
                    "queue: full, dropping oldest record"
                );
                dropped += 1;
            }
        }
        self.dropped += dropped as u64;
        dropped
    }
}
