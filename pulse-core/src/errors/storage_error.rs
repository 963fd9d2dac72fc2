//! Durable key-value storage errors.

use super::error_code::{self, PulseErrorCode};

/// Failures of the durable client-side key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("storage read failed for {key}: {reason}")]
    ReadFailed { key: String, reason: String },

    #[error("storage write failed for {key}: {reason}")]
    WriteFailed { key: String, reason: String },
}

impl PulseErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        error_code::STORAGE_ERROR
    }
}
