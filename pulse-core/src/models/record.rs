//! Fully stamped event records.

use chrono::{DateTime, Utc};

use super::{EventPayload, EventType, IdentityStamp};
use crate::errors::PulseResult;
use crate::wire::WireEvent;

/// One captured event, stamped with identity and an idempotency key.
///
/// Records are only built through [`EventRecord::stamp`] and are immutable
/// afterwards, so anything sitting in a queue is complete.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    client_event_id: String,
    project_id: u64,
    payload: EventPayload,
    identity: IdentityStamp,
    timestamp: DateTime<Utc>,
}

impl EventRecord {
    /// Stamp a normalized payload.
    ///
    /// `sequence` is a per-instance counter; together with identity, content
    /// and capture time it makes the idempotency key unique without depending
    /// on delivery attempts.
    pub fn stamp(
        payload: EventPayload,
        identity: IdentityStamp,
        project_id: u64,
        timestamp: DateTime<Utc>,
        sequence: u64,
    ) -> PulseResult<Self> {
        let client_event_id =
            derive_client_event_id(&payload, &identity, project_id, timestamp, sequence)?;
        Ok(Self {
            client_event_id,
            project_id,
            payload,
            identity,
            timestamp,
        })
    }

    pub fn client_event_id(&self) -> &str {
        &self.client_event_id
    }

    pub fn project_id(&self) -> u64 {
        self.project_id
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }

    pub fn identity(&self) -> &IdentityStamp {
        &self.identity
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Wire representation. The project id rides in the body only when the
    /// transport cannot carry it in a header.
    pub fn to_wire(&self, include_project: bool) -> PulseResult<WireEvent> {
        Ok(WireEvent {
            event_type: self.event_type(),
            event_content: Some(self.payload.content_value()?),
            anonymous_id: self.identity.anonymous_id.clone(),
            session_id: self.identity.session_id.clone(),
            user_id: self.identity.user_id.clone(),
            client_event_id: self.client_event_id.clone(),
            timestamp: self.timestamp.timestamp_millis(),
            project_id: include_project.then_some(self.project_id),
        })
    }
}

fn derive_client_event_id(
    payload: &EventPayload,
    identity: &IdentityStamp,
    project_id: u64,
    timestamp: DateTime<Utc>,
    sequence: u64,
) -> PulseResult<String> {
    // serde_json's default map is ordered, so the content string is canonical.
    let content = serde_json::to_string(&payload.content_value()?)?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(&project_id.to_le_bytes());
    for part in [
        identity.anonymous_id.as_str(),
        identity.session_id.as_str(),
        identity.user_id.as_deref().unwrap_or(""),
        payload.event_type().as_str(),
        content.as_str(),
    ] {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hasher.update(&timestamp.timestamp_millis().to_le_bytes());
    hasher.update(&sequence.to_le_bytes());

    let hex = hasher.finalize().to_hex();
    Ok(hex.as_str()[..32].to_string())
}
