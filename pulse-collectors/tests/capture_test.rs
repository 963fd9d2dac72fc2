//! Capture pipeline: listener lifecycle, stamping, and error isolation.

use std::time::Duration;

use chrono::Utc;
use pulse_collectors::{
    CapturePipeline, ClickOccurrence, ElementInfo, ErrorOccurrence, NavigationOccurrence,
    Occurrence,
};
use pulse_core::config::CollectorToggles;
use pulse_core::models::{EventType, NavigationKind};
use pulse_identity::IdentityStore;
use pulse_observability::{DiagnosticKind, Observability};

fn identity(observability: &Observability) -> IdentityStore {
    IdentityStore::in_memory(Duration::from_secs(1800), observability.diagnostics.clone())
}

fn navigation(url: &str) -> Occurrence {
    Occurrence::Navigation(NavigationOccurrence {
        kind: NavigationKind::Load,
        url: url.into(),
        title: "Home".into(),
        referrer: None,
    })
}

#[test]
fn stop_is_idempotent_and_leaves_no_listeners() {
    let obs = Observability::default();
    let mut pipeline = CapturePipeline::new(1, CollectorToggles::default(), obs);

    pipeline.start();
    pipeline.start();
    // pageview 1 + click 1 + performance 2 + error 3
    assert_eq!(pipeline.listener_count(), 7);

    pipeline.stop();
    assert_eq!(pipeline.listener_count(), 0);
    assert!(!pipeline.is_running());
    pipeline.stop();
    assert_eq!(pipeline.listener_count(), 0);
}

#[test]
fn nothing_is_captured_before_start_or_after_stop() {
    let obs = Observability::default();
    let mut ids = identity(&obs);
    let mut pipeline = CapturePipeline::new(1, CollectorToggles::default(), obs);

    assert!(pipeline.capture(&navigation("https://a.io/"), &mut ids, Utc::now()).is_empty());
    pipeline.start();
    assert_eq!(pipeline.capture(&navigation("https://a.io/"), &mut ids, Utc::now()).len(), 1);
    pipeline.stop();
    assert!(pipeline.capture(&navigation("https://a.io/"), &mut ids, Utc::now()).is_empty());
}

#[test]
fn records_are_fully_stamped() {
    let obs = Observability::default();
    let mut ids = identity(&obs);
    ids.set_user("user-1");
    let mut pipeline = CapturePipeline::new(77, CollectorToggles::default(), obs.clone());
    pipeline.start();

    let records = pipeline.capture(&navigation("https://a.io/"), &mut ids, Utc::now());
    let record = &records[0];
    assert_eq!(record.event_type(), EventType::Pageview);
    assert_eq!(record.project_id(), 77);
    assert_eq!(record.identity().anonymous_id, ids.anonymous_id());
    assert_eq!(record.identity().user_id.as_deref(), Some("user-1"));
    assert!(!record.identity().session_id.is_empty());
    assert_eq!(obs.metrics.snapshot().captured, 1);
}

#[test]
fn capture_errors_are_dropped_and_collection_continues() {
    let obs = Observability::default();
    let mut ids = identity(&obs);
    let mut pipeline = CapturePipeline::new(1, CollectorToggles::default(), obs.clone());
    pipeline.start();

    let broken = Occurrence::UncaughtError(ErrorOccurrence::default());
    assert!(pipeline.capture(&broken, &mut ids, Utc::now()).is_empty());

    let click = Occurrence::Click(ClickOccurrence {
        target: ElementInfo::new("button").with_id("buy"),
        client_x: 1.0,
        client_y: 2.0,
        page_x: 1.0,
        page_y: 2.0,
    });
    let records = pipeline.capture(&click, &mut ids, Utc::now());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type(), EventType::Click);

    assert_eq!(obs.metrics.snapshot().capture_errors, 1);
    assert_eq!(obs.diagnostics.count(DiagnosticKind::CaptureFailed), 1);
}

#[test]
fn disabled_collectors_attach_nothing() {
    let obs = Observability::default();
    let toggles = CollectorToggles {
        pageview: true,
        click: false,
        performance: false,
        error: false,
    };
    let mut pipeline = CapturePipeline::new(1, toggles, obs);
    pipeline.start();
    assert_eq!(pipeline.collector_names(), vec!["pageview"]);
    assert_eq!(pipeline.listener_count(), 1);
}

#[test]
fn sequence_makes_identical_events_distinct() {
    let obs = Observability::default();
    let mut ids = identity(&obs);
    let mut pipeline = CapturePipeline::new(1, CollectorToggles::default(), obs);
    pipeline.start();
    let now = Utc::now();
    let a = pipeline.capture(&navigation("https://a.io/"), &mut ids, now);
    let b = pipeline.capture(&navigation("https://a.io/"), &mut ids, now);
    assert_ne!(a[0].client_event_id(), b[0].client_event_id());
}
