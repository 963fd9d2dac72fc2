//! # pulse-core
//!
//! Foundation crate for the Pulse telemetry SDK.
//! Defines the event data model, wire format, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod traits;
pub mod wire;

// Re-export the most commonly used types at the crate root.
pub use config::{CollectorToggles, PulseConfig};
pub use errors::{PulseError, PulseResult};
pub use models::{EventPayload, EventRecord, EventType, IdentityStamp};
