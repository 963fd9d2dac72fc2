//! Default configuration values.

pub const DEFAULT_AUTO_START: bool = true;
pub const DEFAULT_DEBUG: bool = false;
pub const DEFAULT_USE_PIXEL: bool = false;

/// Flush threshold in records.
pub const DEFAULT_BATCH_SIZE: usize = 10;
/// Flush window in milliseconds.
pub const DEFAULT_BATCH_TIMEOUT_MS: u64 = 5_000;

/// Session inactivity window (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 30 * 60 * 1_000;

/// Upper bound on pending records before the oldest are dropped.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1_000;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 30_000;

/// Per-attempt delivery timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Pixel requests carry the batch in the URL; most proxies cut off near 2KB.
pub const DEFAULT_PIXEL_MAX_URL_LENGTH: usize = 2_048;

/// Largest body the primary channel will send (keepalive-safe).
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1_024;
