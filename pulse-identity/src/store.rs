//! IdentityStore: anonymous id, session id with inactivity expiry, and the
//! optional host-assigned user id.

use chrono::{DateTime, Duration, Utc};

use pulse_core::constants::{ANONYMOUS_ID_KEY, SESSION_KEY};
use pulse_core::errors::StorageError;
use pulse_core::models::IdentityStamp;
use pulse_core::traits::KeyValueStorage;
use pulse_observability::{DiagnosticKind, DiagnosticLevel, Diagnostics};

use crate::session::SessionState;

/// Longest persisted anonymous id accepted as valid.
const MAX_ID_LEN: usize = 128;

/// Identity for one SDK instance.
///
/// Once durable storage fails the store drops it and keeps identifiers in
/// memory for the rest of its lifetime.
pub struct IdentityStore {
    storage: Option<Box<dyn KeyValueStorage>>,
    anonymous_id: Option<String>,
    session: Option<SessionState>,
    user_id: Option<String>,
    session_timeout: Duration,
    diagnostics: Diagnostics,
}

impl IdentityStore {
    pub fn new(
        storage: Box<dyn KeyValueStorage>,
        session_timeout: std::time::Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            storage: Some(storage),
            anonymous_id: None,
            session: None,
            user_id: None,
            session_timeout: Duration::from_std(session_timeout)
                .unwrap_or_else(|_| Duration::minutes(30)),
            diagnostics,
        }
    }

    /// Store with no durable backing at all.
    pub fn in_memory(session_timeout: std::time::Duration, diagnostics: Diagnostics) -> Self {
        let mut store = Self::new(
            Box::new(crate::storage::MemoryStorage::new()),
            session_timeout,
            diagnostics,
        );
        store.storage = None;
        store
    }

    /// Whether identity has fallen back to memory-only.
    pub fn is_degraded(&self) -> bool {
        self.storage.is_none()
    }

    /// The anonymous id, created and persisted on first call.
    pub fn anonymous_id(&mut self) -> String {
        if let Some(id) = &self.anonymous_id {
            return id.clone();
        }

        let persisted = self
            .read(ANONYMOUS_ID_KEY)
            .map(|raw| raw.trim().to_string())
            .filter(|id| !id.is_empty() && id.len() <= MAX_ID_LEN);

        let id = match persisted {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                self.write(ANONYMOUS_ID_KEY, &id);
                tracing::debug!(anonymous_id = %id, "identity: minted anonymous id");
                id
            }
        };
        self.anonymous_id = Some(id.clone());
        id
    }

    /// Current session id, refreshed when the gap since the last captured
    /// event exceeds the session timeout. Records `now` as the last activity.
    pub fn get_or_refresh_session_id(&mut self, now: DateTime<Utc>) -> String {
        if self.session.is_none() {
            self.session = self.read(SESSION_KEY).and_then(|raw| SessionState::parse(&raw));
        }

        let session = match self.session.take() {
            Some(s) if !s.is_expired(now, self.session_timeout) => SessionState {
                id: s.id,
                last_activity_ms: now.timestamp_millis().max(s.last_activity_ms),
            },
            previous => {
                let fresh = SessionState::start(now);
                tracing::debug!(
                    session_id = %fresh.id,
                    expired = previous.is_some(),
                    "identity: started session"
                );
                fresh
            }
        };

        let id = session.id.clone();
        if let Ok(raw) = serde_json::to_string(&session) {
            self.write(SESSION_KEY, &raw);
        }
        self.session = Some(session);
        id
    }

    /// Attach an explicit identity to subsequently stamped events.
    pub fn set_user(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    pub fn clear_user(&mut self) {
        self.user_id = None;
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Identity for a record captured at `now`.
    pub fn stamp(&mut self, now: DateTime<Utc>) -> IdentityStamp {
        IdentityStamp {
            anonymous_id: self.anonymous_id(),
            session_id: self.get_or_refresh_session_id(now),
            user_id: self.user_id.clone(),
        }
    }

    /// Explicit storage clear: forget persisted and cached identity.
    pub fn forget(&mut self) {
        self.anonymous_id = None;
        self.session = None;
        self.user_id = None;
        if let Some(storage) = self.storage.as_mut() {
            let result = storage
                .remove(ANONYMOUS_ID_KEY)
                .and_then(|_| storage.remove(SESSION_KEY));
            if let Err(e) = result {
                self.degrade(e);
            }
        }
    }

    fn read(&mut self, key: &str) -> Option<String> {
        let result = self.storage.as_mut()?.get(key);
        match result {
            Ok(value) => value,
            Err(e) => {
                self.degrade(e);
                None
            }
        }
    }

    fn write(&mut self, key: &str, value: &str) {
        let Some(storage) = self.storage.as_mut() else {
            return;
        };
        if let Err(e) = storage.set(key, value) {
            self.degrade(e);
        }
    }

    fn degrade(&mut self, error: StorageError) {
        if self.storage.take().is_some() {
            self.diagnostics.report(
                DiagnosticLevel::Warn,
                DiagnosticKind::StorageDegraded,
                &error,
            );
        }
    }
}

impl std::fmt::Debug for IdentityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityStore")
            .field("anonymous_id", &self.anonymous_id)
            .field("session", &self.session)
            .field("user_id", &self.user_id)
            .field("degraded", &self.is_degraded())
            .finish()
    }
}
