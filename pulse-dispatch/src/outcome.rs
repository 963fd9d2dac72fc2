//! Result of delivering one batch.

use pulse_core::errors::TransportError;
use pulse_core::wire::{ItemResult, ItemStatus};

/// One record the endpoint (or a pixel request) did not accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Position in the batch.
    pub index: usize,
    pub message: Option<String>,
}

/// What happened to a batch. Indices are positions within the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Every record accepted.
    Success,
    /// Some records failed and will be retried; `dropped` records can never be
    /// delivered and are discarded.
    Partial {
        failed: Vec<ItemFailure>,
        dropped: Vec<usize>,
    },
    /// Nothing was delivered.
    Failure(TransportError),
}

impl Outcome {
    /// Build an outcome from per-item results of a batch of `len` records.
    /// Indices missing from `results` count as failed.
    pub fn from_items(len: usize, results: &[ItemResult]) -> Self {
        let mut status: Vec<Option<&ItemResult>> = vec![None; len];
        for item in results {
            if let Some(slot) = status.get_mut(item.index) {
                *slot = Some(item);
            }
        }

        let failed: Vec<ItemFailure> = status
            .iter()
            .enumerate()
            .filter_map(|(index, item)| match item {
                Some(r) if r.status == ItemStatus::Created => None,
                Some(r) => Some(ItemFailure {
                    index,
                    message: r.message.clone(),
                }),
                None => Some(ItemFailure {
                    index,
                    message: Some("missing from response".to_string()),
                }),
            })
            .collect();

        if failed.is_empty() {
            Self::Success
        } else {
            Self::Partial {
                failed,
                dropped: Vec::new(),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Batch positions to re-enqueue for a batch of `len` records.
    pub fn retry_indices(&self, len: usize) -> Vec<usize> {
        match self {
            Self::Success => Vec::new(),
            Self::Partial { failed, .. } => failed.iter().map(|f| f.index).collect(),
            Self::Failure(_) => (0..len).collect(),
        }
    }

    pub fn dropped_indices(&self) -> &[usize] {
        match self {
            Self::Partial { dropped, .. } => dropped,
            _ => &[],
        }
    }
}
