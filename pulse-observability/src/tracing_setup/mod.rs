//! `tracing` with `EnvFilter` and per-operation spans.

pub mod setup;
pub mod spans;

pub use setup::init_tracing;
