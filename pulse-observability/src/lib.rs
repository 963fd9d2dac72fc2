//! # pulse-observability
//!
//! The diagnostic channel every failure path terminates in, dispatch
//! counters, and `tracing` setup.

pub mod diagnostics;
pub mod engine;
pub mod metrics;
pub mod tracing_setup;

pub use diagnostics::{
    CallbackHold, Diagnostic, DiagnosticCallback, DiagnosticKind, DiagnosticLevel, Diagnostics,
};
pub use engine::Observability;
pub use metrics::{DispatchMetrics, MetricsRecorder};
pub use tracing_setup::init_tracing;
