//! Transport selection and outcome mapping against the scripted transport.

use std::time::Duration;

use chrono::Utc;
use pulse_core::errors::TransportError;
use pulse_core::models::{CustomContent, EventPayload, EventRecord, IdentityStamp};
use pulse_core::wire::{ApiResponse, ItemResult, WireEvent};
use pulse_dispatch::transport::pixel;
use pulse_dispatch::{
    Batch, DeliveryContext, FlushTrigger, MockTransport, Outcome, PostReply, SelectorConfig,
    TransportSelector,
};
use pulse_observability::{DiagnosticKind, Observability};

// ─── Helpers ───────────────────────────────────────────────

fn record(n: u64, pad: usize) -> EventRecord {
    let mut properties = serde_json::Map::new();
    properties.insert("pad".into(), "x".repeat(pad).into());
    let payload = EventPayload::Custom(CustomContent {
        name: format!("e{n}"),
        properties,
    });
    let identity = IdentityStamp {
        anonymous_id: "anon".into(),
        session_id: "sess".into(),
        user_id: None,
    };
    EventRecord::stamp(payload, identity, 42, Utc::now(), n).unwrap()
}

fn batch(n: u64, pad: usize) -> Batch {
    Batch {
        id: 1,
        trigger: FlushTrigger::Size,
        records: (0..n).map(|i| record(i, pad)).collect(),
    }
}

fn config() -> SelectorConfig {
    SelectorConfig {
        endpoint: "https://collect.example.com/v1/events".into(),
        project_id: 42,
        use_pixel: false,
        max_body_bytes: 64 * 1024,
        pixel_max_url_length: 2048,
        request_timeout: Duration::from_secs(10),
    }
}

fn selector(config: SelectorConfig) -> (TransportSelector<MockTransport>, MockTransport, Observability) {
    let mock = MockTransport::new();
    let obs = Observability::default();
    (
        TransportSelector::new(mock.clone(), config, obs.clone()),
        mock,
        obs,
    )
}

// ─── Primary channel ──────────────────────────────────────

#[tokio::test]
async fn primary_posts_canonical_array_with_tenant() {
    let (sel, mock, obs) = selector(config());
    let outcome = sel.deliver(&batch(3, 4), DeliveryContext::default()).await;
    assert_eq!(outcome, Outcome::Success);

    let posts = mock.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].project_id, 42);
    let elements: Vec<serde_json::Value> = serde_json::from_str(&posts[0].body).unwrap();
    assert_eq!(elements.len(), 3);
    assert!(elements[0].get("client_event_id").is_some());
    assert!(elements[0].get("clientEventId").is_none());
    assert!(elements[0].get("project_id").is_none());
    assert!(mock.pixels().is_empty());
    assert_eq!(obs.metrics.snapshot().primary_requests, 1);
}

#[tokio::test]
async fn partial_response_maps_failed_and_missing_indices() {
    let (sel, mock, _) = selector(config());
    mock.script_post(PostReply::Respond(ApiResponse {
        code: 200,
        message: "ok".into(),
        data: Some(vec![ItemResult::created(0), ItemResult::failed(1, "invalid content")]),
        timestamp: None,
    }));
    let outcome = sel.deliver(&batch(3, 4), DeliveryContext::default()).await;
    assert_eq!(outcome.retry_indices(3), vec![1, 2]);
}

#[tokio::test]
async fn success_envelope_without_items_accepts_the_batch() {
    let (sel, mock, _) = selector(config());
    mock.script_post(PostReply::Respond(ApiResponse {
        code: 200,
        message: "ok".into(),
        data: None,
        timestamp: None,
    }));
    let outcome = sel.deliver(&batch(3, 4), DeliveryContext::default()).await;
    assert!(outcome.is_success());
    assert!(outcome.retry_indices(3).is_empty());
}

#[tokio::test]
async fn empty_item_list_fails_every_record() {
    let (sel, mock, _) = selector(config());
    mock.script_post(PostReply::Respond(ApiResponse {
        code: 200,
        message: "ok".into(),
        data: Some(Vec::new()),
        timestamp: None,
    }));
    let outcome = sel.deliver(&batch(2, 4), DeliveryContext::default()).await;
    assert_eq!(outcome.retry_indices(2), vec![0, 1]);
}

#[tokio::test]
async fn error_envelope_is_total_failure() {
    let (sel, mock, _) = selector(config());
    mock.script_post(PostReply::Respond(ApiResponse {
        code: 500,
        message: "ingest unavailable".into(),
        data: None,
        timestamp: None,
    }));
    let outcome = sel.deliver(&batch(2, 4), DeliveryContext::default()).await;
    assert!(matches!(
        outcome,
        Outcome::Failure(TransportError::Rejected { status: 500, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn slow_request_times_out() {
    let mock = MockTransport::new().with_latency(Duration::from_secs(30));
    let sel = TransportSelector::new(mock, config(), Observability::default());
    let outcome = sel.deliver(&batch(1, 4), DeliveryContext::default()).await;
    assert_eq!(
        outcome,
        Outcome::Failure(TransportError::Timeout { timeout_ms: 10_000 })
    );
}

// ─── Fallback to pixel ────────────────────────────────────

#[tokio::test]
async fn blocked_primary_redelivers_by_pixel_and_stays_blocked() {
    let (sel, mock, obs) = selector(config());
    mock.script_post(PostReply::Fail(TransportError::Blocked { status: 403 }));

    let outcome = sel.deliver(&batch(2, 4), DeliveryContext::default()).await;
    assert_eq!(outcome, Outcome::Success);
    assert!(sel.is_primary_blocked());
    assert_eq!(mock.posts().len(), 1);
    assert_eq!(mock.pixels().len(), 1);
    assert_eq!(obs.diagnostics.count(DiagnosticKind::TransportFallback), 1);

    sel.deliver(&batch(1, 4), DeliveryContext::default()).await;
    assert_eq!(mock.posts().len(), 1);
    assert_eq!(mock.pixels().len(), 2);
}

#[tokio::test]
async fn unloading_uses_pixel_with_project_in_query() {
    let (sel, mock, _) = selector(config());
    let b = batch(2, 4);
    let outcome = sel.deliver(&b, DeliveryContext { unloading: true }).await;
    assert_eq!(outcome, Outcome::Success);
    assert!(mock.posts().is_empty());

    let url = &mock.pixels()[0];
    assert!(url.starts_with("https://collect.example.com/v1/events?project_id=42&data="));
    let data = pixel::decode_data(url).unwrap();
    let first = WireEvent::from_value(data[0].clone()).unwrap();
    assert_eq!(first.client_event_id, b.records[0].client_event_id());
}

#[tokio::test]
async fn oversized_body_goes_by_pixel() {
    let mut cfg = config();
    cfg.max_body_bytes = 256;
    let (sel, mock, _) = selector(cfg);
    sel.deliver(&batch(4, 40), DeliveryContext::default()).await;
    assert!(mock.posts().is_empty());
    assert!(!mock.pixels().is_empty());
}

#[tokio::test]
async fn pixel_batches_are_split_under_the_ceiling() {
    let mut cfg = config();
    cfg.use_pixel = true;
    cfg.pixel_max_url_length = 900;
    let (sel, mock, obs) = selector(cfg);

    let outcome = sel.deliver(&batch(8, 60), DeliveryContext::default()).await;
    assert_eq!(outcome, Outcome::Success);

    let urls = mock.pixels();
    assert!(urls.len() > 1);
    assert!(urls.iter().all(|u| u.len() <= 900));
    let delivered: usize = urls
        .iter()
        .map(|u| pixel::decode_data(u).unwrap().as_array().unwrap().len())
        .sum();
    assert_eq!(delivered, 8);
    assert_eq!(obs.metrics.snapshot().pixel_requests, urls.len() as u64);
}

#[tokio::test]
async fn record_too_large_for_any_pixel_is_dropped() {
    let mut cfg = config();
    cfg.use_pixel = true;
    cfg.pixel_max_url_length = 600;
    let (sel, mock, obs) = selector(cfg);

    let mut b = batch(2, 4);
    b.records.insert(1, record(99, 2000));
    let outcome = sel.deliver(&b, DeliveryContext::default()).await;

    assert_eq!(
        outcome,
        Outcome::Partial {
            failed: vec![],
            dropped: vec![1]
        }
    );
    assert_eq!(outcome.retry_indices(3), Vec::<usize>::new());
    assert_eq!(mock.pixels().len(), 2);
    assert_eq!(obs.diagnostics.count(DiagnosticKind::PayloadDropped), 1);
    assert_eq!(obs.metrics.snapshot().payloads_dropped, 1);
}

#[tokio::test]
async fn failed_pixel_request_fails_its_indices() {
    let mut cfg = config();
    cfg.use_pixel = true;
    cfg.pixel_max_url_length = 900;
    let (sel, mock, _) = selector(cfg);
    mock.script_pixel(Err(TransportError::Network {
        reason: "offline".into(),
    }));

    let outcome = sel.deliver(&batch(8, 60), DeliveryContext::default()).await;
    let retry = outcome.retry_indices(8);
    assert!(!retry.is_empty() && retry.len() < 8);
    assert_eq!(retry[0], 0);
}

#[tokio::test]
async fn all_pixel_requests_failing_is_total_failure() {
    let mut cfg = config();
    cfg.use_pixel = true;
    let (sel, mock, _) = selector(cfg);
    mock.script_pixel(Err(TransportError::Network {
        reason: "offline".into(),
    }));
    let outcome = sel.deliver(&batch(2, 4), DeliveryContext::default()).await;
    assert!(matches!(outcome, Outcome::Failure(TransportError::Network { .. })));
}
