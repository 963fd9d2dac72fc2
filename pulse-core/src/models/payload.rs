//! Type-specific event content.
//!
//! The discriminant and its content travel together as [`EventPayload`], so a
//! click can never carry performance metrics. Content is validated where the
//! collector builds it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::EventType;

/// How a page view came about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationKind {
    /// Full document load.
    Load,
    PushState,
    ReplaceState,
    PopState,
    HashChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageviewContent {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub navigation: NavigationKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickContent {
    /// CSS-like selector path from the nearest stable ancestor.
    pub selector: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    pub x: f64,
    pub y: f64,
    pub page_x: f64,
    pub page_y: f64,
}

/// Load timing metrics in milliseconds. Absent metrics stay absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceContent {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttfb_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_interactive_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_content_loaded_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_paint_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_contentful_paint_ms: Option<f64>,
}

impl PerformanceContent {
    /// Whether any metric was captured at all.
    pub fn has_metrics(&self) -> bool {
        [
            self.dns_ms,
            self.tcp_ms,
            self.ttfb_ms,
            self.response_ms,
            self.dom_interactive_ms,
            self.dom_content_loaded_ms,
            self.load_ms,
            self.first_paint_ms,
            self.first_contentful_paint_ms,
        ]
        .iter()
        .any(Option::is_some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Uncaught,
    UnhandledRejection,
    Resource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub tag: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContent {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceDescriptor>,
    /// Page the error happened on.
    pub url: String,
}

/// Host-defined event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomContent {
    pub name: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Discriminant paired with its type-specific content.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Pageview(PageviewContent),
    Click(ClickContent),
    Performance(PerformanceContent),
    Error(ErrorContent),
    Custom(CustomContent),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Pageview(_) => EventType::Pageview,
            Self::Click(_) => EventType::Click,
            Self::Performance(_) => EventType::Performance,
            Self::Error(_) => EventType::Error,
            Self::Custom(_) => EventType::Custom,
        }
    }

    /// Content as a JSON object (the wire `event_content`).
    pub fn content_value(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Pageview(c) => serde_json::to_value(c),
            Self::Click(c) => serde_json::to_value(c),
            Self::Performance(c) => serde_json::to_value(c),
            Self::Error(c) => serde_json::to_value(c),
            Self::Custom(c) => serde_json::to_value(c),
        }
    }

    /// Rebuild a payload from its wire form.
    pub fn from_wire(event_type: EventType, content: Value) -> Result<Self, serde_json::Error> {
        Ok(match event_type {
            EventType::Pageview => Self::Pageview(serde_json::from_value(content)?),
            EventType::Click => Self::Click(serde_json::from_value(content)?),
            EventType::Performance => Self::Performance(serde_json::from_value(content)?),
            EventType::Error => Self::Error(serde_json::from_value(content)?),
            EventType::Custom => Self::Custom(serde_json::from_value(content)?),
        })
    }
}
