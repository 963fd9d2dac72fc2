//! Error taxonomy for the Pulse SDK.
//!
//! Every failure path terminates in a retry, a drop, or a diagnostic. These
//! types never cross into host code as panics.

pub mod capture_error;
pub mod config_error;
pub mod error_code;
pub mod storage_error;
pub mod transport_error;

pub use capture_error::CaptureError;
pub use config_error::ConfigError;
pub use error_code::PulseErrorCode;
pub use storage_error::StorageError;
pub use transport_error::TransportError;

/// Top-level error aggregating every subsystem error.
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias used across the workspace.
pub type PulseResult<T> = Result<T, PulseError>;

impl PulseErrorCode for PulseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::Capture(e) => e.error_code(),
            Self::Transport(e) => e.error_code(),
            Self::Serialization(_) => error_code::SERIALIZATION_ERROR,
        }
    }
}
