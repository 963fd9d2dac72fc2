//! Dispatch counters.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

/// Cumulative counters for one SDK instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchMetrics {
    pub captured: u64,
    pub capture_errors: u64,
    pub enqueued: u64,
    pub dropped_overflow: u64,
    pub flushes: u64,
    pub batches_delivered: u64,
    pub records_delivered: u64,
    pub records_requeued: u64,
    pub retries_exhausted: u64,
    pub payloads_dropped: u64,
    pub primary_requests: u64,
    pub pixel_requests: u64,
}

/// Shared handle to [`DispatchMetrics`]. Cloning shares the counters.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    inner: Rc<RefCell<DispatchMetrics>>,
}

impl MetricsRecorder {
    /// Apply an update to the counters.
    pub fn record(&self, update: impl FnOnce(&mut DispatchMetrics)) {
        update(&mut self.inner.borrow_mut());
    }

    pub fn snapshot(&self) -> DispatchMetrics {
        self.inner.borrow().clone()
    }

    /// Reset all counters (useful for testing or periodic rotation).
    pub fn reset(&self) {
        *self.inner.borrow_mut() = DispatchMetrics::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let a = MetricsRecorder::default();
        let b = a.clone();
        b.record(|m| m.enqueued += 3);
        a.record(|m| m.flushes += 1);
        let snap = a.snapshot();
        assert_eq!(snap.enqueued, 3);
        assert_eq!(snap.flushes, 1);
        a.reset();
        assert_eq!(b.snapshot(), DispatchMetrics::default());
    }
}
