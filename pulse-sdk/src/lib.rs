//! # pulse-sdk
//!
//! The host-facing tracker. [`Tracker`] owns one fully isolated instance:
//! collectors, identity, the batch scheduler, and the transport selector.
//!
//! Everything runs on a single thread. Deliveries and the flush timer are
//! spawned with [`tokio::task::spawn_local`], so a tracker must be driven
//! from inside a [`tokio::task::LocalSet`].

pub mod engine;
mod runtime;
pub mod tracker;

pub use engine::Engine;
pub use tracker::Tracker;

pub use pulse_collectors::Occurrence;
pub use pulse_core::{PulseConfig, PulseError, PulseResult};
pub use pulse_dispatch::{SchedulerState, Transport};

#[cfg(feature = "test-util")]
pub use pulse_dispatch::{MockTransport, PostReply};
pub use pulse_identity::{MemoryStorage, SqliteStorage};
pub use pulse_observability::{init_tracing, Diagnostic, DiagnosticKind, DispatchMetrics};
