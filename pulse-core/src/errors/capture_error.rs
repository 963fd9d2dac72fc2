//! Collector normalization errors.

use super::error_code::{self, PulseErrorCode};

/// Raised when a collector cannot normalize a raw occurrence. The occurrence
/// is dropped; collection continues.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("{collector}: missing required field {field}")]
    MissingField {
        collector: &'static str,
        field: &'static str,
    },

    #[error("{collector}: malformed occurrence: {reason}")]
    Malformed {
        collector: &'static str,
        reason: String,
    },
}

impl PulseErrorCode for CaptureError {
    fn error_code(&self) -> &'static str {
        error_code::CAPTURE_ERROR
    }
}
