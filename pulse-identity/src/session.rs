//! Persisted session metadata.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Session id and the time of the last captured event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub id: String,
    pub last_activity_ms: i64,
}

impl SessionState {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            last_activity_ms: now.timestamp_millis(),
        }
    }

    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.last_activity_ms).single()
    }

    /// Whether the gap since the last activity exceeds `timeout`.
    /// A clock that moved backwards keeps the session alive.
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        match self.last_activity() {
            Some(last) => now - last > timeout,
            None => true,
        }
    }

    /// Parse persisted JSON; anything unreadable counts as "no session".
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str::<Self>(raw)
            .ok()
            .filter(|s| !s.id.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_strictly_greater_than_timeout() {
        let start = Utc::now();
        let session = SessionState::start(start);
        let timeout = Duration::minutes(30);
        assert!(!session.is_expired(start + timeout, timeout));
        assert!(session.is_expired(start + timeout + Duration::milliseconds(1), timeout));
    }

    #[test]
    fn backwards_clock_keeps_session() {
        let start = Utc::now();
        let session = SessionState::start(start);
        assert!(!session.is_expired(start - Duration::hours(5), Duration::minutes(30)));
    }

    #[test]
    fn corrupt_json_is_none() {
        assert!(SessionState::parse("not json").is_none());
        assert!(SessionState::parse(r#"{"id":"","last_activity_ms":1}"#).is_none());
        assert!(SessionState::parse(r#"{"id":"abc","last_activity_ms":1}"#).is_some());
    }
}
