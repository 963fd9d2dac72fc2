//! Performance collector: one event per page load from navigation and paint
//! timing. Metrics the host did not report are left out.

use pulse_core::errors::CaptureError;
use pulse_core::models::{EventPayload, NavigationKind, PerformanceContent};

use crate::collector::{Attachment, Collector};
use crate::listeners::ListenerKind;
use crate::occurrence::{NavigationTiming, Occurrence, PageLoadTiming};

pub const NAME: &str = "performance";

#[derive(Debug, Default)]
pub struct PerformanceCollector {
    attachment: Attachment,
    emitted_for_load: bool,
}

impl PerformanceCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

/// `end - start` when both are present and ordered.
fn span(start: Option<f64>, end: Option<f64>) -> Option<f64> {
    match (start, end) {
        (Some(s), Some(e)) if s.is_finite() && e.is_finite() && e >= s => Some(e - s),
        _ => None,
    }
}

/// A mark relative to navigation start; zero means "not reached yet".
fn mark(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

fn metrics(timing: &PageLoadTiming) -> PerformanceContent {
    let nav = timing.navigation.clone().unwrap_or_default();
    let NavigationTiming {
        domain_lookup_start,
        domain_lookup_end,
        connect_start,
        connect_end,
        request_start,
        response_start,
        response_end,
        dom_interactive,
        dom_content_loaded_event_end,
        load_event_end,
    } = nav;

    let paint = |name: &str| {
        timing
            .paint
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| mark(Some(p.start_time)))
    };

    PerformanceContent {
        url: timing.url.clone(),
        dns_ms: span(domain_lookup_start, domain_lookup_end),
        tcp_ms: span(connect_start, connect_end),
        ttfb_ms: span(request_start, response_start),
        response_ms: span(response_start, response_end),
        dom_interactive_ms: mark(dom_interactive),
        dom_content_loaded_ms: mark(dom_content_loaded_event_end),
        load_ms: mark(load_event_end),
        first_paint_ms: paint("first-paint"),
        first_contentful_paint_ms: paint("first-contentful-paint"),
    }
}

impl Collector for PerformanceCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn listens_to(&self) -> &'static [ListenerKind] {
        &[ListenerKind::PageLoad, ListenerKind::Navigation]
    }

    fn attachment(&mut self) -> &mut Attachment {
        &mut self.attachment
    }

    fn normalize(&mut self, occurrence: &Occurrence) -> Result<Option<EventPayload>, CaptureError> {
        match occurrence {
            // A full document load re-arms the collector.
            Occurrence::Navigation(nav) if nav.kind == NavigationKind::Load => {
                self.emitted_for_load = false;
                Ok(None)
            }
            Occurrence::PageLoad(timing) => {
                if self.emitted_for_load {
                    return Ok(None);
                }
                if timing.url.trim().is_empty() {
                    return Err(CaptureError::MissingField {
                        collector: NAME,
                        field: "url",
                    });
                }
                let content = metrics(timing);
                if !content.has_metrics() {
                    return Ok(None);
                }
                self.emitted_for_load = true;
                Ok(Some(EventPayload::Performance(content)))
            }
            _ => Ok(None),
        }
    }
}
