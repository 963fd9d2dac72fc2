//! The synchronous core of a tracker: capture, identity, and scheduling.
//!
//! [`Engine`] never awaits. It turns occurrences into batches and reconciles
//! outcomes; the runtime decides when to call it and delivers what it returns.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use pulse_collectors::{CapturePipeline, Occurrence};
use pulse_core::config::PulseConfig;
use pulse_core::errors::CaptureError;
use pulse_core::models::{CustomContent, EventPayload, EventRecord};
use pulse_core::traits::KeyValueStorage;
use pulse_dispatch::{Batch, BatchScheduler, Outcome, Reconciliation, SchedulerConfig, SchedulerState};
use pulse_identity::IdentityStore;
use pulse_observability::{DiagnosticKind, DiagnosticLevel, Observability};

pub struct Engine {
    pipeline: CapturePipeline,
    identity: IdentityStore,
    scheduler: BatchScheduler,
    observability: Observability,
}

impl Engine {
    pub fn new(
        config: &PulseConfig,
        storage: Box<dyn KeyValueStorage>,
        observability: Observability,
    ) -> Self {
        Self {
            pipeline: CapturePipeline::new(
                config.project_id,
                config.collectors,
                observability.clone(),
            ),
            identity: IdentityStore::new(
                storage,
                config.session_timeout(),
                observability.diagnostics.clone(),
            ),
            scheduler: BatchScheduler::new(SchedulerConfig::from(config), observability.clone()),
            observability,
        }
    }

    /// Attach every enabled collector.
    pub fn start(&mut self) {
        self.pipeline.start();
    }

    /// Detach every collector listener. Queued records stay queued.
    pub fn stop(&mut self) {
        self.pipeline.stop();
    }

    pub fn is_collecting(&self) -> bool {
        self.pipeline.is_running()
    }

    pub fn listener_count(&self) -> usize {
        self.pipeline.listener_count()
    }

    /// Capture a host occurrence. Returns batches that became due.
    pub fn observe(&mut self, occurrence: &Occurrence, wall: DateTime<Utc>, now: Instant) -> Vec<Batch> {
        let records = self.pipeline.capture(occurrence, &mut self.identity, wall);
        self.enqueue_all(records, now)
    }

    /// Record a custom event. Works whether or not collectors are attached.
    pub fn track(
        &mut self,
        name: &str,
        properties: Map<String, Value>,
        wall: DateTime<Utc>,
        now: Instant,
    ) -> Vec<Batch> {
        let name = name.trim();
        if name.is_empty() {
            self.observability.metrics.record(|m| m.capture_errors += 1);
            self.observability.diagnostics.report(
                DiagnosticLevel::Warn,
                DiagnosticKind::CaptureFailed,
                &CaptureError::MissingField {
                    collector: "custom",
                    field: "name",
                },
            );
            return Vec::new();
        }

        let payload = EventPayload::Custom(CustomContent {
            name: name.to_string(),
            properties,
        });
        let record = self.pipeline.stamp(payload, &mut self.identity, wall);
        self.enqueue_all(record, now)
    }

    pub fn identity(&mut self) -> &mut IdentityStore {
        &mut self.identity
    }

    pub fn poll_timer(&mut self, now: Instant) -> Option<Batch> {
        self.scheduler.poll_timer(now)
    }

    pub fn force_flush(&mut self, now: Instant) -> Vec<Batch> {
        self.scheduler.force_flush(now)
    }

    pub fn complete(&mut self, batch_id: u64, outcome: &Outcome, now: Instant) -> Reconciliation {
        self.scheduler.complete(batch_id, outcome, now)
    }

    pub fn reclaim_in_flight(&mut self, now: Instant) -> usize {
        self.scheduler.reclaim_in_flight(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn in_flight(&self) -> usize {
        self.scheduler.in_flight()
    }

    fn enqueue_all(&mut self, records: impl IntoIterator<Item = EventRecord>, now: Instant) -> Vec<Batch> {
        records
            .into_iter()
            .filter_map(|record| self.scheduler.enqueue(record, now))
            .collect()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("pipeline", &self.pipeline)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_collectors::NavigationOccurrence;
    use pulse_core::models::NavigationKind;
    use pulse_identity::MemoryStorage;
    use std::time::Duration;

    fn engine(batch_size: usize) -> Engine {
        let mut config = PulseConfig::new("https://c.io/e", 3);
        config.batch_size = batch_size;
        Engine::new(&config, Box::new(MemoryStorage::new()), Observability::default())
    }

    fn pageview(url: &str) -> Occurrence {
        Occurrence::Navigation(NavigationOccurrence {
            kind: NavigationKind::PushState,
            url: url.into(),
            title: String::new(),
            referrer: None,
        })
    }

    #[test]
    fn observed_pageviews_fill_a_batch() {
        let mut e = engine(2);
        e.start();
        let t0 = Instant::now();
        assert!(e.observe(&pageview("https://a.io/1"), Utc::now(), t0).is_empty());
        let batches = e.observe(&pageview("https://a.io/2"), Utc::now(), t0);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(e.in_flight(), 1);
    }

    #[test]
    fn nothing_observed_while_stopped_but_track_works() {
        let mut e = engine(10);
        let t0 = Instant::now();
        assert!(e.observe(&pageview("https://a.io/1"), Utc::now(), t0).is_empty());
        assert_eq!(e.pending(), 0);

        e.track("signup", Map::new(), Utc::now(), t0);
        assert_eq!(e.pending(), 1);
        assert_eq!(e.deadline(), Some(t0 + Duration::from_millis(5000)));
    }

    #[test]
    fn blank_custom_name_is_rejected() {
        let mut e = engine(10);
        e.track("  ", Map::new(), Utc::now(), Instant::now());
        assert_eq!(e.pending(), 0);
        assert_eq!(e.observability.metrics.snapshot().capture_errors, 1);
    }
}
