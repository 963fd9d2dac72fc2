//! Stable error codes surfaced on the diagnostic channel.

/// Every error enum maps onto a stable code string so hosts can filter
/// diagnostics without matching on message text.
pub trait PulseErrorCode {
    /// Returns the code string (e.g., "CONFIG_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns `[CODE] message`.
    fn coded_message(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const CAPTURE_ERROR: &str = "CAPTURE_ERROR";
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const TIMEOUT: &str = "TIMEOUT";
pub const REJECTED: &str = "REJECTED";
pub const BLOCKED: &str = "BLOCKED";
pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
pub const SERIALIZATION_ERROR: &str = "SERIALIZATION_ERROR";
