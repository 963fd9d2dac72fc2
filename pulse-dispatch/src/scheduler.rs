//! Batch scheduler: decides when queued records become a batch, and
//! reconciles delivery outcomes back into the queue.
//!
//! The scheduler performs no I/O and reads no clock. Every operation takes
//! the current [`Instant`]; the caller owns the timer and delivers the
//! returned batches.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use pulse_core::config::PulseConfig;
use pulse_core::models::EventRecord;
use pulse_observability::{flush_span, DiagnosticKind, DiagnosticLevel, Observability};

use crate::outcome::Outcome;
use crate::queue::{EventQueue, QueuedRecord};

/// Scheduler tuning, taken from [`PulseConfig`].
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub max_queue_size: usize,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub max_retry_delay: Duration,
}

impl From<&PulseConfig> for SchedulerConfig {
    fn from(config: &PulseConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            batch_timeout: config.batch_timeout(),
            max_queue_size: config.max_queue_size,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay(),
            max_retry_delay: config.max_retry_delay(),
        }
    }
}

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Queue empty, no timer.
    Idle,
    /// Records pending; a timer flush is due at `deadline`.
    TimerArmed { deadline: Instant },
    /// A drain is in progress.
    Flushing,
}

/// What caused a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Size,
    Timer,
    Forced,
}

/// An ordered group of records handed to transport as one unit.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: u64,
    pub trigger: FlushTrigger,
    pub records: Vec<EventRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Bookkeeping result of one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub delivered: usize,
    pub requeued: usize,
    pub exhausted: usize,
    pub dropped: usize,
}

/// Delay before retry number `attempt` (1-based): `base × 2^(attempt-1)`,
/// capped at `max`.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    base.checked_mul(1u32 << exponent)
        .map_or(max, |delay| delay.min(max))
}

/// Idle / timer-armed / flushing state machine over an [`EventQueue`].
#[derive(Debug)]
pub struct BatchScheduler {
    config: SchedulerConfig,
    queue: EventQueue,
    state: SchedulerState,
    next_batch_id: u64,
    in_flight: BTreeMap<u64, Vec<QueuedRecord>>,
    /// Non-forced flushes wait until this instant after a total failure.
    not_before: Option<Instant>,
    observability: Observability,
}

impl BatchScheduler {
    pub fn new(config: SchedulerConfig, observability: Observability) -> Self {
        Self {
            queue: EventQueue::new(config.max_queue_size),
            config,
            state: SchedulerState::Idle,
            next_batch_id: 1,
            in_flight: BTreeMap::new(),
            not_before: None,
            observability,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// When the caller should next call [`poll_timer`](Self::poll_timer).
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            SchedulerState::TimerArmed { deadline } => Some(deadline),
            _ => None,
        }
    }

    /// Records waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.size()
    }

    /// Batches handed off and not yet completed.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Whether non-forced flushes are currently held back by retry backoff.
    pub fn is_backing_off(&self, now: Instant) -> bool {
        self.not_before.is_some_and(|t| now < t)
    }

    /// Queue a record. Returns a batch when the size threshold is reached.
    pub fn enqueue(&mut self, record: EventRecord, now: Instant) -> Option<Batch> {
        let dropped = self.queue.enqueue(QueuedRecord::new(record));
        self.observability.metrics.record(|m| {
            m.enqueued += 1;
            m.dropped_overflow += dropped as u64;
        });
        self.report_overflow(dropped);

        if self.state == SchedulerState::Idle {
            self.arm(now);
        }

        if self.queue.size() >= self.config.batch_size && !self.is_backing_off(now) {
            return self.flush_one(FlushTrigger::Size, now);
        }
        None
    }

    /// Fire the timer if its deadline has passed.
    pub fn poll_timer(&mut self, now: Instant) -> Option<Batch> {
        let deadline = self.deadline()?;
        if now < deadline {
            return None;
        }
        if let Some(not_before) = self.not_before.filter(|t| now < *t) {
            tracing::debug!(
                wait_ms = (not_before - now).as_millis() as u64,
                "scheduler: timer deferred by retry backoff"
            );
            self.state = SchedulerState::TimerArmed {
                deadline: not_before,
            };
            return None;
        }
        self.flush_one(FlushTrigger::Timer, now)
    }

    /// Drain the whole queue into as many batches as needed, ignoring backoff.
    pub fn force_flush(&mut self, now: Instant) -> Vec<Batch> {
        let mut batches = Vec::new();
        while !self.queue.is_empty() {
            batches.extend(self.flush_one(FlushTrigger::Forced, now));
        }
        self.settle(now);
        batches
    }

    /// Reconcile the outcome of batch `batch_id`. Completions may arrive in
    /// any order; unknown ids (already reclaimed) are ignored.
    pub fn complete(&mut self, batch_id: u64, outcome: &Outcome, now: Instant) -> Reconciliation {
        let Some(records) = self.in_flight.remove(&batch_id) else {
            tracing::debug!(batch_id, "scheduler: completion for unknown batch ignored");
            return Reconciliation::default();
        };

        let total = records.len();
        let retry = outcome.retry_indices(total);
        let dropped = outcome.dropped_indices().len();

        let mut result = Reconciliation {
            delivered: total.saturating_sub(retry.len() + dropped),
            dropped,
            ..Default::default()
        };

        match outcome {
            Outcome::Success => {
                self.not_before = None;
            }
            Outcome::Partial { failed, .. } if !failed.is_empty() => {
                let messages: Vec<String> = failed
                    .iter()
                    .map(|f| format!("#{}: {}", f.index, f.message.as_deref().unwrap_or("failed")))
                    .collect();
                self.observability.diagnostics.debug(
                    DiagnosticKind::PartialFailure,
                    format!(
                        "batch {batch_id}: {} of {total} records failed ({})",
                        failed.len(),
                        messages.join(", ")
                    ),
                );
            }
            Outcome::Failure(err) => {
                self.observability
                    .diagnostics
                    .report(DiagnosticLevel::Warn, DiagnosticKind::DeliveryFailed, err);
            }
            Outcome::Partial { .. } => {}
        }

        let mut requeue = Vec::with_capacity(retry.len());
        let mut exhausted = 0;
        let mut slots: Vec<Option<QueuedRecord>> = records.into_iter().map(Some).collect();
        for index in retry {
            let Some(mut queued) = slots.get_mut(index).and_then(Option::take) else {
                continue;
            };
            queued.attempts += 1;
            if queued.attempts > self.config.max_retries {
                exhausted += 1;
            } else {
                requeue.push(queued);
            }
        }

        if let Outcome::Failure(_) = outcome {
            if let Some(attempt) = requeue.iter().map(|q| q.attempts).max() {
                let delay = backoff_delay(
                    attempt,
                    self.config.retry_base_delay,
                    self.config.max_retry_delay,
                );
                tracing::debug!(batch_id, attempt, delay_ms = delay.as_millis() as u64, "scheduler: backing off");
                self.not_before = Some(now + delay);
            }
        }

        if exhausted > 0 {
            self.observability.diagnostics.error(
                DiagnosticKind::RetriesExhausted,
                format!(
                    "batch {batch_id}: dropped {exhausted} records after {} retries",
                    self.config.max_retries
                ),
            );
        }

        result.requeued = requeue.len();
        result.exhausted = exhausted;
        let overflow = self.queue.requeue_front(requeue);
        self.report_overflow(overflow);

        self.observability.metrics.record(|m| {
            if result.delivered > 0 {
                m.batches_delivered += 1;
            }
            m.records_delivered += result.delivered as u64;
            m.records_requeued += result.requeued as u64;
            m.retries_exhausted += exhausted as u64;
            m.dropped_overflow += overflow as u64;
        });

        self.settle(now);
        result
    }

    /// Return every in-flight batch to the front of the queue, oldest batch
    /// first, without counting an attempt. Used when deliveries are aborted.
    pub fn reclaim_in_flight(&mut self, now: Instant) -> usize {
        let records: Vec<QueuedRecord> = std::mem::take(&mut self.in_flight)
            .into_values()
            .flatten()
            .collect();
        let reclaimed = records.len();
        if reclaimed > 0 {
            tracing::debug!(reclaimed, "scheduler: reclaimed in-flight records");
            let overflow = self.queue.requeue_front(records);
            self.report_overflow(overflow);
        }
        self.settle(now);
        reclaimed
    }

    fn flush_one(&mut self, trigger: FlushTrigger, now: Instant) -> Option<Batch> {
        self.state = SchedulerState::Flushing;
        let drained = self.queue.drain(self.config.batch_size);
        if drained.is_empty() {
            self.settle(now);
            return None;
        }

        let id = self.next_batch_id;
        self.next_batch_id += 1;
        let _span = flush_span!(id, trigger, drained.len()).entered();

        let records = drained.iter().map(|q| q.record.clone()).collect();
        self.in_flight.insert(id, drained);
        self.observability.metrics.record(|m| m.flushes += 1);
        tracing::debug!(remaining = self.queue.size(), "scheduler: batch handed off");

        if trigger != FlushTrigger::Forced {
            self.settle(now);
        }
        Some(Batch {
            id,
            trigger,
            records,
        })
    }

    /// Leave `Flushing` (or re-evaluate): arm a fresh window if records
    /// remain, otherwise go idle.
    fn settle(&mut self, now: Instant) {
        if self.queue.is_empty() {
            self.state = SchedulerState::Idle;
        } else if !matches!(self.state, SchedulerState::TimerArmed { .. }) {
            self.arm(now);
        }
    }

    fn arm(&mut self, now: Instant) {
        let mut deadline = now + self.config.batch_timeout;
        if let Some(not_before) = self.not_before {
            deadline = deadline.max(not_before);
        }
        self.state = SchedulerState::TimerArmed { deadline };
    }

    fn report_overflow(&self, dropped: usize) {
        if dropped > 0 {
            self.observability.diagnostics.warn(
                DiagnosticKind::QueueOverflow,
                format!(
                    "queue bound of {} exceeded, dropped {dropped} oldest records",
                    self.queue.max_size()
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pulse_core::errors::TransportError;
    use pulse_core::models::{CustomContent, EventPayload, IdentityStamp};
    use pulse_core::wire::ItemResult;

    fn config(batch_size: usize) -> SchedulerConfig {
        SchedulerConfig {
            batch_size,
            batch_timeout: Duration::from_millis(5000),
            max_queue_size: 100,
            max_retries: 2,
            retry_base_delay: Duration::from_millis(1000),
            max_retry_delay: Duration::from_millis(3000),
        }
    }

    fn record(n: u64) -> EventRecord {
        let payload = EventPayload::Custom(CustomContent {
            name: format!("e{n}"),
            properties: Default::default(),
        });
        let identity = IdentityStamp {
            anonymous_id: "a".into(),
            session_id: "s".into(),
            user_id: None,
        };
        EventRecord::stamp(payload, identity, 1, Utc::now(), n).unwrap()
    }

    fn scheduler(batch_size: usize) -> BatchScheduler {
        BatchScheduler::new(config(batch_size), Observability::default())
    }

    fn network() -> Outcome {
        Outcome::Failure(TransportError::Network {
            reason: "offline".into(),
        })
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        let max = Duration::from_millis(1000);
        assert_eq!(backoff_delay(1, base, max), Duration::from_millis(100));
        assert_eq!(backoff_delay(3, base, max), Duration::from_millis(400));
        assert_eq!(backoff_delay(10, base, max), max);
        assert_eq!(backoff_delay(u32::MAX, base, max), max);
    }

    #[test]
    fn first_enqueue_arms_timer() {
        let mut s = scheduler(10);
        let t0 = Instant::now();
        assert_eq!(s.state(), SchedulerState::Idle);
        assert!(s.enqueue(record(0), t0).is_none());
        assert_eq!(s.deadline(), Some(t0 + Duration::from_millis(5000)));

        // A later enqueue keeps the original window.
        s.enqueue(record(1), t0 + Duration::from_millis(100));
        assert_eq!(s.deadline(), Some(t0 + Duration::from_millis(5000)));
    }

    #[test]
    fn size_threshold_flushes_exactly_once() {
        let mut s = scheduler(3);
        let t0 = Instant::now();
        assert!(s.enqueue(record(0), t0).is_none());
        assert!(s.enqueue(record(1), t0).is_none());
        let batch = s.enqueue(record(2), t0).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.trigger, FlushTrigger::Size);
        assert_eq!(s.state(), SchedulerState::Idle);
        assert!(s.poll_timer(t0 + Duration::from_secs(60)).is_none());
    }

    #[test]
    fn timer_flushes_partial_batch() {
        let mut s = scheduler(10);
        let t0 = Instant::now();
        s.enqueue(record(0), t0);
        s.enqueue(record(1), t0);
        assert!(s.poll_timer(t0 + Duration::from_millis(4999)).is_none());
        let batch = s.poll_timer(t0 + Duration::from_millis(5000)).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.trigger, FlushTrigger::Timer);
        assert_eq!(s.state(), SchedulerState::Idle);
    }

    #[test]
    fn total_failure_requeues_in_order_and_backs_off() {
        let mut s = scheduler(2);
        let t0 = Instant::now();
        s.enqueue(record(0), t0);
        let batch = s.enqueue(record(1), t0).unwrap();
        s.enqueue(record(2), t0);

        let r = s.complete(batch.id, &network(), t0);
        assert_eq!(r.requeued, 2);
        let order: Vec<_> = s.queue().iter().map(|q| q.record.client_event_id().to_string()).collect();
        assert_eq!(order[0], batch.records[0].client_event_id());
        assert_eq!(order[1], batch.records[1].client_event_id());
        assert_eq!(s.queue().iter().next().unwrap().attempts, 1);

        // Size threshold is reached but backoff holds the flush.
        assert!(s.is_backing_off(t0 + Duration::from_millis(999)));
        assert!(s.enqueue(record(3), t0 + Duration::from_millis(10)).is_none());

        // Forced flush ignores backoff.
        let forced = s.force_flush(t0 + Duration::from_millis(20));
        assert_eq!(forced.iter().map(Batch::len).sum::<usize>(), 4);
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn retries_are_bounded() {
        let mut s = scheduler(1);
        let obs = s.observability.clone();
        let mut now = Instant::now();
        let mut batch = s.enqueue(record(0), now).unwrap();
        for _ in 0..2 {
            let r = s.complete(batch.id, &network(), now);
            assert_eq!(r.requeued, 1);
            now += Duration::from_secs(10);
            batch = s.poll_timer(now).unwrap();
        }
        let r = s.complete(batch.id, &network(), now);
        assert_eq!(r.exhausted, 1);
        assert_eq!(s.pending(), 0);
        assert_eq!(obs.metrics.snapshot().retries_exhausted, 1);
        assert_eq!(obs.diagnostics.count(DiagnosticKind::RetriesExhausted), 1);
    }

    #[test]
    fn partial_failure_requeues_only_failed() {
        let mut s = scheduler(3);
        let t0 = Instant::now();
        s.enqueue(record(0), t0);
        s.enqueue(record(1), t0);
        let batch = s.enqueue(record(2), t0).unwrap();

        let outcome = Outcome::from_items(
            3,
            &[ItemResult::created(0), ItemResult::failed(1, "bad"), ItemResult::created(2)],
        );
        let r = s.complete(batch.id, &outcome, t0);
        assert_eq!(r.delivered, 2);
        assert_eq!(r.requeued, 1);
        let left = s.queue().iter().next().unwrap();
        assert_eq!(left.record.client_event_id(), batch.records[1].client_event_id());
        assert!(!s.is_backing_off(t0));
    }

    #[test]
    fn completions_reconcile_out_of_order() {
        let mut s = scheduler(1);
        let t0 = Instant::now();
        let a = s.enqueue(record(0), t0).unwrap();
        let b = s.enqueue(record(1), t0).unwrap();
        assert_eq!(s.in_flight(), 2);
        assert_eq!(s.complete(b.id, &Outcome::Success, t0).delivered, 1);
        assert_eq!(s.complete(a.id, &Outcome::Success, t0).delivered, 1);
        assert_eq!(s.complete(a.id, &Outcome::Success, t0), Reconciliation::default());
        assert_eq!(s.in_flight(), 0);
    }

    #[test]
    fn reclaim_returns_in_flight_records_first() {
        let mut s = scheduler(1);
        let t0 = Instant::now();
        let a = s.enqueue(record(0), t0).unwrap();
        let b = s.enqueue(record(1), t0).unwrap();
        assert_eq!(s.reclaim_in_flight(t0), 2);
        let order: Vec<_> = s.queue().iter().map(|q| (q.record.client_event_id().to_string(), q.attempts)).collect();
        assert_eq!(order[0], (a.records[0].client_event_id().to_string(), 0));
        assert_eq!(order[1], (b.records[0].client_event_id().to_string(), 0));
        assert!(matches!(s.state(), SchedulerState::TimerArmed { .. }));
    }
}
