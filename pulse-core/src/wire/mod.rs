//! Wire format shared with the collection endpoint.
//!
//! Canonical field names are snake_case and are the only names this SDK
//! emits. camelCase spellings are accepted on input; when a canonical field
//! and one of its aliases are both present the canonical field wins and the
//! alias is discarded.

pub mod response;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::EventType;

pub use response::{ApiResponse, BatchResponse, ItemResult, ItemStatus};

/// Canonical name followed by the aliases it absorbs, in precedence order.
pub const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("event_type", &["eventType", "eventName"]),
    ("event_content", &["eventContent", "properties"]),
    ("anonymous_id", &["anonymousId"]),
    ("session_id", &["sessionId"]),
    ("user_id", &["userId"]),
    ("client_event_id", &["clientEventId"]),
    ("project_id", &["projectId", "tenantId"]),
];

/// One element of the batch request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEvent {
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_content: Option<Value>,
    pub anonymous_id: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub client_event_id: String,
    /// Capture time, Unix milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<u64>,
}

impl WireEvent {
    /// Parse a wire element that may use alias spellings.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::Object(mut map) => {
                canonicalize_fields(&mut map);
                serde_json::from_value(Value::Object(map))
            }
            other => serde_json::from_value(other),
        }
    }
}

/// Rewrite alias keys to their canonical names in place.
///
/// An alias is dropped when its canonical key is already present; among
/// several aliases the first listed in [`FIELD_ALIASES`] is kept.
pub fn canonicalize_fields(map: &mut Map<String, Value>) {
    for (canonical, aliases) in FIELD_ALIASES {
        let mut found = map.contains_key(*canonical);
        for alias in *aliases {
            if let Some(value) = map.remove(*alias) {
                if !found {
                    map.insert((*canonical).to_string(), value);
                    found = true;
                }
            }
        }
    }
}
