//! The diagnostic channel.
//!
//! Nothing in the SDK surfaces errors to host code; instead every dropped
//! occurrence, failed delivery, and degraded subsystem is reported here. Each
//! diagnostic is also logged through `tracing` at the matching level.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use pulse_core::errors::PulseErrorCode;
use serde::{Deserialize, Serialize};

/// Number of diagnostics retained for [`Diagnostics::recent`].
const RECENT_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Configuration rejected; the instance is disabled.
    ConfigInvalid,
    /// Durable storage failed; identity is memory-only.
    StorageDegraded,
    /// A collector could not normalize an occurrence.
    CaptureFailed,
    /// Queue bound exceeded; oldest records dropped.
    QueueOverflow,
    /// A delivery attempt failed as a whole.
    DeliveryFailed,
    /// Some items of a batch were rejected.
    PartialFailure,
    /// Records dropped after the retry budget ran out.
    RetriesExhausted,
    /// A record too large for any transport was dropped.
    PayloadDropped,
    /// Primary transport unavailable, pixel used instead.
    TransportFallback,
    /// Start/stop/flush/unload notices.
    Lifecycle,
}

/// One diagnostic notice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub kind: DiagnosticKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Host callback receiving diagnostics.
pub type DiagnosticCallback = Rc<dyn Fn(&Diagnostic)>;

struct Inner {
    debug: bool,
    callback: Option<DiagnosticCallback>,
    recent: RefCell<VecDeque<Diagnostic>>,
    /// Open [`CallbackHold`]s. While non-zero, callback delivery is deferred.
    holds: Cell<usize>,
    deferred: RefCell<VecDeque<Diagnostic>>,
}

/// Shared diagnostic channel. Cloning shares the underlying channel.
#[derive(Clone)]
pub struct Diagnostics {
    inner: Rc<Inner>,
}

impl Diagnostics {
    /// `debug` gates delivery of debug-level diagnostics to the callback.
    pub fn new(debug: bool, callback: Option<DiagnosticCallback>) -> Self {
        Self {
            inner: Rc::new(Inner {
                debug,
                callback,
                recent: RefCell::new(VecDeque::with_capacity(RECENT_CAPACITY)),
                holds: Cell::new(0),
                deferred: RefCell::new(VecDeque::new()),
            }),
        }
    }

    pub fn is_debug(&self) -> bool {
        self.inner.debug
    }

    pub fn emit(&self, level: DiagnosticLevel, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        match level {
            DiagnosticLevel::Debug => tracing::debug!(?kind, "{message}"),
            DiagnosticLevel::Info => tracing::info!(?kind, "{message}"),
            DiagnosticLevel::Warn => tracing::warn!(?kind, "{message}"),
            DiagnosticLevel::Error => tracing::error!(?kind, "{message}"),
        }

        if level == DiagnosticLevel::Debug && !self.inner.debug {
            return;
        }

        let diagnostic = Diagnostic {
            level,
            kind,
            message,
            timestamp: Utc::now(),
        };
        {
            let mut recent = self.inner.recent.borrow_mut();
            if recent.len() == RECENT_CAPACITY {
                recent.pop_front();
            }
            recent.push_back(diagnostic.clone());
        }
        if self.inner.callback.is_none() {
            return;
        }
        self.inner.deferred.borrow_mut().push_back(diagnostic);
        self.release();
    }

    /// Defer callback delivery until the returned guard is dropped.
    ///
    /// Hold across any section that keeps SDK state borrowed, so a callback
    /// that calls back into the tracker never observes a live borrow.
    /// Diagnostics are still recorded in [`Diagnostics::recent`] immediately.
    pub fn hold(&self) -> CallbackHold {
        self.inner.holds.set(self.inner.holds.get() + 1);
        CallbackHold {
            diagnostics: self.clone(),
        }
    }

    /// Deliver deferred diagnostics unless a hold is open.
    fn release(&self) {
        let Some(callback) = &self.inner.callback else { return };
        while self.inner.holds.get() == 0 {
            let next = self.inner.deferred.borrow_mut().pop_front();
            match next {
                Some(diagnostic) => callback(&diagnostic),
                None => break,
            }
        }
    }

    pub fn debug(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.emit(DiagnosticLevel::Debug, kind, message);
    }

    pub fn info(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.emit(DiagnosticLevel::Info, kind, message);
    }

    pub fn warn(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.emit(DiagnosticLevel::Warn, kind, message);
    }

    pub fn error(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.emit(DiagnosticLevel::Error, kind, message);
    }

    /// Report an error using its coded message (`[CODE] message`).
    pub fn report<E>(&self, level: DiagnosticLevel, kind: DiagnosticKind, error: &E)
    where
        E: PulseErrorCode + fmt::Display,
    {
        self.emit(level, kind, error.coded_message());
    }

    /// Most recent diagnostics, oldest first.
    pub fn recent(&self) -> Vec<Diagnostic> {
        self.inner.recent.borrow().iter().cloned().collect()
    }

    /// Count of retained diagnostics of a kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.inner
            .recent
            .borrow()
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }
}

/// Guard returned by [`Diagnostics::hold`].
#[must_use = "callbacks are released when the hold is dropped"]
pub struct CallbackHold {
    diagnostics: Diagnostics,
}

impl Drop for CallbackHold {
    fn drop(&mut self) {
        let holds = &self.diagnostics.inner.holds;
        holds.set(holds.get().saturating_sub(1));
        self.diagnostics.release();
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(false, None)
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("debug", &self.inner.debug)
            .field("has_callback", &self.inner.callback.is_some())
            .field("retained", &self.inner.recent.borrow().len())
            .finish()
    }
}
