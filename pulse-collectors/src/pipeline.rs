//! Capture pipeline: routes occurrences to attached collectors and stamps
//! the resulting payloads into complete records.

use chrono::{DateTime, Utc};

use pulse_core::config::CollectorToggles;
use pulse_core::models::{EventPayload, EventRecord};
use pulse_identity::IdentityStore;
use pulse_observability::{capture_span, DiagnosticKind, DiagnosticLevel, Observability};

use crate::collector::Collector;
use crate::listeners::ListenerRegistry;
use crate::occurrence::Occurrence;
use crate::{ClickCollector, ErrorCollector, PageviewCollector, PerformanceCollector};

pub struct CapturePipeline {
    collectors: Vec<Box<dyn Collector>>,
    registry: ListenerRegistry,
    project_id: u64,
    sequence: u64,
    observability: Observability,
}

impl CapturePipeline {
    /// Pipeline with the built-in collectors enabled by `toggles`.
    pub fn new(project_id: u64, toggles: CollectorToggles, observability: Observability) -> Self {
        let mut collectors: Vec<Box<dyn Collector>> = Vec::new();
        if toggles.pageview {
            collectors.push(Box::new(PageviewCollector::new()));
        }
        if toggles.click {
            collectors.push(Box::new(ClickCollector::new()));
        }
        if toggles.performance {
            collectors.push(Box::new(PerformanceCollector::new()));
        }
        if toggles.error {
            collectors.push(Box::new(ErrorCollector::new()));
        }
        Self::with_collectors(project_id, collectors, observability)
    }

    pub fn with_collectors(
        project_id: u64,
        collectors: Vec<Box<dyn Collector>>,
        observability: Observability,
    ) -> Self {
        Self {
            collectors,
            registry: ListenerRegistry::new(),
            project_id,
            sequence: 0,
            observability,
        }
    }

    /// Attach every collector's listeners.
    pub fn start(&mut self) {
        for collector in &mut self.collectors {
            collector.start(&mut self.registry);
        }
        tracing::debug!(listeners = self.registry.len(), "capture: started");
    }

    /// Detach every listener. Idempotent.
    pub fn stop(&mut self) {
        for collector in &mut self.collectors {
            collector.stop(&mut self.registry);
        }
        tracing::debug!(listeners = self.registry.len(), "capture: stopped");
    }

    pub fn is_running(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Live listeners across all collectors.
    pub fn listener_count(&self) -> usize {
        self.registry.len()
    }

    pub fn collector_names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Deliver `occurrence` to every collector listening for it and return
    /// the stamped records. Normalization failures drop the occurrence for
    /// that collector only.
    pub fn capture(
        &mut self,
        occurrence: &Occurrence,
        identity: &mut IdentityStore,
        now: DateTime<Utc>,
    ) -> Vec<EventRecord> {
        let owners = self.registry.owners_for(occurrence.listener_kind());
        if owners.is_empty() {
            return Vec::new();
        }

        let mut payloads = Vec::new();
        for collector in self
            .collectors
            .iter_mut()
            .filter(|c| owners.contains(&c.name()))
        {
            let _span = capture_span!(collector.name()).entered();
            match collector.normalize(occurrence) {
                Ok(Some(payload)) => payloads.push(payload),
                Ok(None) => {}
                Err(e) => {
                    self.observability.metrics.record(|m| m.capture_errors += 1);
                    self.observability.diagnostics.report(
                        DiagnosticLevel::Warn,
                        DiagnosticKind::CaptureFailed,
                        &e,
                    );
                }
            }
        }

        payloads
            .into_iter()
            .filter_map(|payload| self.stamp(payload, identity, now))
            .collect()
    }

    /// Stamp a payload with identity, project, and the next sequence number.
    pub fn stamp(
        &mut self,
        payload: EventPayload,
        identity: &mut IdentityStore,
        now: DateTime<Utc>,
    ) -> Option<EventRecord> {
        let stamp = identity.stamp(now);
        let sequence = self.sequence;
        self.sequence += 1;
        match EventRecord::stamp(payload, stamp, self.project_id, now, sequence) {
            Ok(record) => {
                self.observability.metrics.record(|m| m.captured += 1);
                Some(record)
            }
            Err(e) => {
                self.observability.metrics.record(|m| m.capture_errors += 1);
                self.observability.diagnostics.report(
                    DiagnosticLevel::Warn,
                    DiagnosticKind::CaptureFailed,
                    &e,
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("collectors", &self.collector_names())
            .field("listeners", &self.registry.len())
            .field("project_id", &self.project_id)
            .finish()
    }
}
