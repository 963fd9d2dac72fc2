//! [`Tracker`]: the handle host code holds.

use std::rc::Rc;

use chrono::Utc;
use serde_json::{Map, Value};

use pulse_collectors::Occurrence;
use pulse_core::config::PulseConfig;
use pulse_core::errors::{PulseErrorCode, TransportError};
use pulse_core::traits::KeyValueStorage;
use pulse_dispatch::{
    DeliveryContext, HttpTransport, SchedulerState, SelectorConfig, Transport, TransportSelector,
};
use pulse_observability::{
    init_tracing, Diagnostic, DiagnosticCallback, DiagnosticKind, DiagnosticLevel,
    DispatchMetrics, Observability,
};

use crate::engine::Engine;
use crate::runtime::{self, Shared};

/// One SDK instance.
///
/// No operation returns an error or panics on runtime failure. A tracker
/// built from an invalid configuration reports `ConfigInvalid` once and then
/// ignores every call.
///
/// Trackers are `!Send` and must be used inside a [`tokio::task::LocalSet`].
pub struct Tracker<T: Transport + 'static = HttpTransport> {
    shared: Option<Rc<Shared<T>>>,
    observability: Observability,
}

impl Tracker<HttpTransport> {
    /// Tracker delivering over HTTP.
    pub fn init(
        config: PulseConfig,
        storage: Box<dyn KeyValueStorage>,
        on_diagnostic: Option<DiagnosticCallback>,
    ) -> Self {
        Self::build(config, storage, on_diagnostic, |config| {
            HttpTransport::new(config.request_timeout())
        })
    }
}

impl<T: Transport + 'static> Tracker<T> {
    /// Tracker delivering through a caller-supplied transport.
    pub fn with_transport(
        config: PulseConfig,
        storage: Box<dyn KeyValueStorage>,
        transport: T,
        on_diagnostic: Option<DiagnosticCallback>,
    ) -> Self {
        Self::build(config, storage, on_diagnostic, |_| Ok(transport))
    }

    fn build(
        config: PulseConfig,
        storage: Box<dyn KeyValueStorage>,
        on_diagnostic: Option<DiagnosticCallback>,
        make_transport: impl FnOnce(&PulseConfig) -> Result<T, TransportError>,
    ) -> Self {
        if config.debug {
            init_tracing();
        }
        let observability = Observability::new(config.debug, on_diagnostic);

        if let Err(e) = config.validate() {
            observability
                .diagnostics
                .report(DiagnosticLevel::Error, DiagnosticKind::ConfigInvalid, &e);
            return Self::disabled(observability);
        }

        let transport = match make_transport(&config) {
            Ok(transport) => transport,
            Err(e) => {
                observability.diagnostics.error(
                    DiagnosticKind::ConfigInvalid,
                    format!("transport unavailable: {}", e.coded_message()),
                );
                return Self::disabled(observability);
            }
        };

        let engine = Engine::new(&config, storage, observability.clone());
        let selector = TransportSelector::new(
            transport,
            SelectorConfig::from(&config),
            observability.clone(),
        );
        let tracker = Self {
            shared: Some(Rc::new(Shared::new(engine, selector, observability.clone()))),
            observability,
        };

        tracing::info!(
            project_id = config.project_id,
            endpoint = %config.endpoint,
            "tracker initialized"
        );
        if config.auto_start {
            tracker.start();
        }
        tracker
    }

    fn disabled(observability: Observability) -> Self {
        Self {
            shared: None,
            observability,
        }
    }

    /// Whether the configuration was accepted.
    pub fn is_enabled(&self) -> bool {
        self.shared.is_some()
    }

    /// Attach every enabled collector.
    pub fn start(&self) {
        if let Some(shared) = &self.shared {
            shared.with_engine(Engine::start);
            self.observability
                .diagnostics
                .debug(DiagnosticKind::Lifecycle, "collectors started");
        }
    }

    /// Detach every collector. Already queued records are still delivered.
    pub fn stop(&self) {
        if let Some(shared) = &self.shared {
            shared.with_engine(Engine::stop);
            self.observability
                .diagnostics
                .debug(DiagnosticKind::Lifecycle, "collectors stopped");
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.shared
            .as_ref()
            .and_then(|s| s.read_engine(Engine::is_collecting))
            .unwrap_or(false)
    }

    /// Feed a host occurrence to the collectors.
    pub fn observe(&self, occurrence: &Occurrence) {
        let Some(shared) = &self.shared else { return };
        let batches =
            shared.with_engine(|engine| engine.observe(occurrence, Utc::now(), runtime::now()));
        runtime::dispatch_all(shared, batches, DeliveryContext::default());
    }

    /// Record a custom event.
    pub fn track(&self, name: &str, properties: Map<String, Value>) {
        let Some(shared) = &self.shared else { return };
        let batches =
            shared.with_engine(|engine| engine.track(name, properties, Utc::now(), runtime::now()));
        runtime::dispatch_all(shared, batches, DeliveryContext::default());
    }

    /// Attach a host-assigned user id to subsequent events.
    pub fn identify(&self, user_id: &str) {
        let Some(shared) = &self.shared else { return };
        let user_id = user_id.trim();
        if user_id.is_empty() {
            self.observability
                .diagnostics
                .warn(DiagnosticKind::CaptureFailed, "identify called with an empty user id");
            return;
        }
        shared.with_engine(|engine| engine.identity().set_user(user_id));
    }

    /// Stop attaching a user id.
    pub fn reset_user(&self) {
        if let Some(shared) = &self.shared {
            shared.with_engine(|engine| engine.identity().clear_user());
        }
    }

    /// Forget the persisted anonymous id and session. The next event mints
    /// fresh ones.
    pub fn forget_identity(&self) {
        if let Some(shared) = &self.shared {
            shared.with_engine(|engine| engine.identity().forget());
        }
    }

    pub fn anonymous_id(&self) -> Option<String> {
        self.shared
            .as_ref()
            .map(|s| s.with_engine(|engine| engine.identity().anonymous_id()))
    }

    /// Flush everything queued and wait for all deliveries to settle.
    pub async fn flush(&self) {
        let Some(shared) = &self.shared else { return };
        let batches = shared.with_engine(|engine| engine.force_flush(runtime::now()));
        runtime::dispatch_all(shared, batches, DeliveryContext::default());
        runtime::await_deliveries(shared).await;
    }

    /// The page became hidden: hand everything to the pixel channel now.
    pub async fn on_visibility_hidden(&self) {
        let Some(shared) = &self.shared else { return };
        self.observability
            .diagnostics
            .debug(DiagnosticKind::Lifecycle, "visibility hidden, flushing by pixel");
        runtime::flush_for_unload(shared).await;
    }

    /// The page is unloading: detach collectors and flush by pixel.
    pub async fn unload(&self) {
        let Some(shared) = &self.shared else { return };
        shared.with_engine(Engine::stop);
        self.observability
            .diagnostics
            .debug(DiagnosticKind::Lifecycle, "unloading, flushing by pixel");
        runtime::flush_for_unload(shared).await;
    }

    /// Records waiting in the queue.
    pub fn pending(&self) -> usize {
        self.shared
            .as_ref()
            .and_then(|s| s.read_engine(Engine::pending))
            .unwrap_or(0)
    }

    /// Batches handed to transport and not yet reconciled.
    pub fn in_flight(&self) -> usize {
        self.shared
            .as_ref()
            .and_then(|s| s.read_engine(Engine::in_flight))
            .unwrap_or(0)
    }

    pub fn state(&self) -> SchedulerState {
        self.shared
            .as_ref()
            .and_then(|s| s.read_engine(Engine::state))
            .unwrap_or(SchedulerState::Idle)
    }

    pub fn metrics(&self) -> DispatchMetrics {
        self.observability.metrics.snapshot()
    }

    /// Recently emitted diagnostics, oldest first.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.observability.diagnostics.recent()
    }

    pub fn transport(&self) -> Option<&T> {
        self.shared.as_ref().map(|s| s.selector.transport())
    }
}

impl<T: Transport + 'static> std::fmt::Debug for Tracker<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("enabled", &self.is_enabled())
            .field("pending", &self.pending())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
