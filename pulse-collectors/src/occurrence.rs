//! Raw occurrences reported by the host.

use serde::{Deserialize, Serialize};

use pulse_core::models::NavigationKind;

use crate::element::ElementInfo;
use crate::listeners::ListenerKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationOccurrence {
    pub kind: NavigationKind,
    pub url: String,
    #[serde(default)]
    pub title: String,
    /// `document.referrer` for full loads; ignored for in-page navigations.
    #[serde(default)]
    pub referrer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickOccurrence {
    pub target: ElementInfo,
    pub client_x: f64,
    pub client_y: f64,
    pub page_x: f64,
    pub page_y: f64,
}

/// Navigation timing entry, milliseconds relative to navigation start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationTiming {
    pub domain_lookup_start: Option<f64>,
    pub domain_lookup_end: Option<f64>,
    pub connect_start: Option<f64>,
    pub connect_end: Option<f64>,
    pub request_start: Option<f64>,
    pub response_start: Option<f64>,
    pub response_end: Option<f64>,
    pub dom_interactive: Option<f64>,
    pub dom_content_loaded_event_end: Option<f64>,
    pub load_event_end: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaintTiming {
    /// `first-paint` or `first-contentful-paint`.
    pub name: String,
    pub start_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageLoadTiming {
    pub url: String,
    #[serde(default)]
    pub navigation: Option<NavigationTiming>,
    #[serde(default)]
    pub paint: Vec<PaintTiming>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorOccurrence {
    pub message: String,
    #[serde(default)]
    pub stack: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub column: Option<u32>,
    /// Page the error happened on.
    pub page_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionOccurrence {
    /// The rejection reason as the host saw it.
    pub reason: serde_json::Value,
    #[serde(default)]
    pub stack: Option<String>,
    pub page_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceOccurrence {
    /// Tag of the failing element, e.g. `img` or `script`.
    pub tag: String,
    pub url: String,
    pub page_url: String,
}

/// Everything the host can report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Occurrence {
    Navigation(NavigationOccurrence),
    Click(ClickOccurrence),
    PageLoad(PageLoadTiming),
    UncaughtError(ErrorOccurrence),
    UnhandledRejection(RejectionOccurrence),
    ResourceError(ResourceOccurrence),
}

impl Occurrence {
    pub fn listener_kind(&self) -> ListenerKind {
        match self {
            Self::Navigation(_) => ListenerKind::Navigation,
            Self::Click(_) => ListenerKind::Click,
            Self::PageLoad(_) => ListenerKind::PageLoad,
            Self::UncaughtError(_) => ListenerKind::UncaughtError,
            Self::UnhandledRejection(_) => ListenerKind::UnhandledRejection,
            Self::ResourceError(_) => ListenerKind::ResourceError,
        }
    }
}
