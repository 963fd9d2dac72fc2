//! Endpoint response envelope.

use serde::{Deserialize, Serialize};

use crate::constants::SUCCESS_CODE;

/// Envelope for every endpoint response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    pub message: String,
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE || (200..300).contains(&self.code)
    }
}

/// Per-item status in a batch response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Created,
    Failed,
}

/// Result for the request element at `index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemResult {
    pub index: usize,
    pub status: ItemStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ItemResult {
    pub fn created(index: usize) -> Self {
        Self {
            index,
            status: ItemStatus::Created,
            message: None,
        }
    }

    pub fn failed(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            status: ItemStatus::Failed,
            message: Some(message.into()),
        }
    }
}

/// Response to a batch delivery.
pub type BatchResponse = ApiResponse<Vec<ItemResult>>;
