//! Delivery errors.

use super::error_code::{self, PulseErrorCode};

/// Failures of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {reason}")]
    Network { reason: String },

    #[error("delivery timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("endpoint rejected request: HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("cross-origin request blocked: HTTP {status}")]
    Blocked { status: u16 },

    #[error("payload of {size} bytes exceeds ceiling of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("invalid endpoint response: {reason}")]
    InvalidResponse { reason: String },
}

impl PulseErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Network { .. } | Self::InvalidResponse { .. } => error_code::NETWORK_ERROR,
            Self::Timeout { .. } => error_code::TIMEOUT,
            Self::Rejected { .. } => error_code::REJECTED,
            Self::Blocked { .. } => error_code::BLOCKED,
            Self::PayloadTooLarge { .. } => error_code::PAYLOAD_TOO_LARGE,
        }
    }
}
