//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "PULSE_LOG";

/// Initialize logging for a host process.
///
/// Reads `PULSE_LOG` for per-module levels, e.g.
/// `PULSE_LOG=pulse_dispatch=debug,pulse_identity=warn`.
/// Falls back to `pulse=info` when unset or invalid.
///
/// Idempotent; a subscriber installed by the host wins.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("pulse=info"));

        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_line_number(true))
            .with(filter)
            .try_init();
    });
}
