//! Span definitions for dispatch operations.

/// Span around draining and handing off one batch.
#[macro_export]
macro_rules! flush_span {
    ($batch_id:expr, $trigger:expr, $records:expr) => {
        tracing::info_span!("pulse.flush", batch_id = $batch_id, trigger = ?$trigger, records = $records)
    };
}

/// Span around one delivery attempt.
#[macro_export]
macro_rules! delivery_span {
    ($batch_id:expr, $mode:expr) => {
        tracing::debug_span!("pulse.delivery", batch_id = $batch_id, mode = ?$mode)
    };
}

/// Span around capturing one occurrence.
#[macro_export]
macro_rules! capture_span {
    ($collector:expr) => {
        tracing::trace_span!("pulse.capture", collector = %$collector)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const FLUSH: &str = "pulse.flush";
    pub const DELIVERY: &str = "pulse.delivery";
    pub const CAPTURE: &str = "pulse.capture";
}
