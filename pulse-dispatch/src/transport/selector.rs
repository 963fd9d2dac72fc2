//! Transport selection: primary POST when possible, pixel GET otherwise.

use std::cell::Cell;
use std::time::Duration;

use pulse_core::config::PulseConfig;
use pulse_core::errors::TransportError;
use pulse_observability::{delivery_span, DiagnosticKind, DiagnosticLevel, Observability};
use tracing::Instrument;

use super::pixel;
use super::{DeliveryContext, DeliveryMode, PrimaryRequest, Transport};
use crate::outcome::{ItemFailure, Outcome};
use crate::scheduler::Batch;

/// Selector settings, taken from [`PulseConfig`].
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub endpoint: String,
    pub project_id: u64,
    pub use_pixel: bool,
    pub max_body_bytes: usize,
    pub pixel_max_url_length: usize,
    pub request_timeout: Duration,
}

impl From<&PulseConfig> for SelectorConfig {
    fn from(config: &PulseConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            project_id: config.project_id,
            use_pixel: config.use_pixel,
            max_body_bytes: config.max_body_bytes,
            pixel_max_url_length: config.pixel_max_url_length,
            request_timeout: config.request_timeout(),
        }
    }
}

/// Chooses a channel per delivery and turns the response into an [`Outcome`].
///
/// Once the primary channel has been observed as blocked, every later
/// delivery from this instance goes by pixel.
#[derive(Debug)]
pub struct TransportSelector<T> {
    transport: T,
    config: SelectorConfig,
    primary_blocked: Cell<bool>,
    observability: Observability,
}

impl<T: Transport> TransportSelector<T> {
    pub fn new(transport: T, config: SelectorConfig, observability: Observability) -> Self {
        Self {
            transport,
            config,
            primary_blocked: Cell::new(false),
            observability,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_primary_blocked(&self) -> bool {
        self.primary_blocked.get()
    }

    /// Deliver one batch. Never fails; every failure is an [`Outcome`].
    pub async fn deliver(&self, batch: &Batch, context: DeliveryContext) -> Outcome {
        let (elements, mut dropped) = self.serialize(batch);
        if elements.is_empty() {
            return Outcome::Partial {
                failed: Vec::new(),
                dropped,
            };
        }

        let body = format!(
            "[{}]",
            elements.iter().map(|(_, e)| e.as_str()).collect::<Vec<_>>().join(",")
        );

        let reason = if self.config.use_pixel {
            Some("configured")
        } else if self.primary_blocked.get() {
            Some("primary blocked")
        } else if context.unloading {
            Some("unloading")
        } else if body.len() > self.config.max_body_bytes {
            Some("body exceeds maxBodyBytes")
        } else {
            None
        };

        let outcome = match reason {
            Some(reason) => {
                if reason != "configured" {
                    self.observability.diagnostics.debug(
                        DiagnosticKind::TransportFallback,
                        format!("batch {}: pixel delivery ({reason})", batch.id),
                    );
                }
                self.deliver_pixel(batch.id, &elements).await
            }
            None => match self.deliver_primary(batch.id, &elements, body).await {
                Err(TransportError::Blocked { status }) => {
                    self.primary_blocked.set(true);
                    self.observability.diagnostics.warn(
                        DiagnosticKind::TransportFallback,
                        format!("primary channel blocked (HTTP {status}), switching to pixel"),
                    );
                    self.deliver_pixel(batch.id, &elements).await
                }
                Err(e) => Outcome::Failure(e),
                Ok(outcome) => outcome,
            },
        };

        match outcome {
            Outcome::Partial { failed, dropped: more } => {
                dropped.extend(more);
                dropped.sort_unstable();
                if failed.is_empty() && dropped.is_empty() {
                    Outcome::Success
                } else {
                    Outcome::Partial { failed, dropped }
                }
            }
            Outcome::Success if !dropped.is_empty() => Outcome::Partial {
                failed: Vec::new(),
                dropped,
            },
            Outcome::Failure(e) if !dropped.is_empty() => Outcome::Partial {
                failed: elements
                    .iter()
                    .map(|(index, _)| ItemFailure {
                        index: *index,
                        message: Some(e.to_string()),
                    })
                    .collect(),
                dropped,
            },
            other => other,
        }
    }

    /// Serialize each record. Records that cannot be serialized are dropped.
    fn serialize(&self, batch: &Batch) -> (Vec<(usize, String)>, Vec<usize>) {
        let mut elements = Vec::with_capacity(batch.len());
        let mut dropped = Vec::new();
        for (index, record) in batch.records.iter().enumerate() {
            let encoded = record
                .to_wire(false)
                .and_then(|wire| serde_json::to_string(&wire).map_err(Into::into));
            match encoded {
                Ok(json) => elements.push((index, json)),
                Err(e) => {
                    self.drop_payload(index, &e);
                    dropped.push(index);
                }
            }
        }
        (elements, dropped)
    }

    async fn deliver_primary(
        &self,
        batch_id: u64,
        elements: &[(usize, String)],
        body: String,
    ) -> Result<Outcome, TransportError> {
        self.observability.metrics.record(|m| m.primary_requests += 1);
        let request = PrimaryRequest {
            url: self.config.endpoint.clone(),
            project_id: self.config.project_id,
            body,
        };

        let response = self
            .with_timeout(self.transport.post(request))
            .instrument(delivery_span!(batch_id, DeliveryMode::Primary))
            .await?;

        if !response.is_success() {
            return Err(TransportError::Rejected {
                status: u16::try_from(response.code).unwrap_or(0),
                message: response.message,
            });
        }

        // A success code without per-item results acknowledges the whole body.
        let Some(items) = response.data else {
            return Ok(Outcome::Success);
        };
        // Response indices refer to positions in the request body.
        Ok(match Outcome::from_items(elements.len(), &items) {
            Outcome::Partial { failed, dropped } => Outcome::Partial {
                failed: failed
                    .into_iter()
                    .map(|f| ItemFailure {
                        index: elements[f.index].0,
                        message: f.message,
                    })
                    .collect(),
                dropped,
            },
            other => other,
        })
    }

    async fn deliver_pixel(&self, batch_id: u64, elements: &[(usize, String)]) -> Outcome {
        let plan = pixel::plan(
            &self.config.endpoint,
            self.config.project_id,
            elements,
            self.config.pixel_max_url_length,
        );

        for index in &plan.oversized {
            self.drop_payload(
                *index,
                &TransportError::PayloadTooLarge {
                    size: elements
                        .iter()
                        .find(|(i, _)| i == index)
                        .map_or(0, |(_, e)| e.len()),
                    limit: self.config.pixel_max_url_length,
                },
            );
        }

        let mut failed = Vec::new();
        let mut last_error = None;
        for request in plan.requests {
            self.observability.metrics.record(|m| m.pixel_requests += 1);
            let result = self
                .with_timeout(self.transport.pixel(request.url))
                .instrument(delivery_span!(batch_id, DeliveryMode::Pixel))
                .await;
            if let Err(e) = result {
                tracing::debug!(batch_id, error = %e, "pixel request failed");
                failed.extend(request.indices.iter().map(|&index| ItemFailure {
                    index,
                    message: Some(e.to_string()),
                }));
                last_error = Some(e);
            }
        }

        match last_error {
            Some(e) if plan.oversized.is_empty() && failed.len() == elements.len() => {
                Outcome::Failure(e)
            }
            _ => Outcome::Partial {
                failed,
                dropped: plan.oversized,
            },
        }
    }

    async fn with_timeout<F, R>(&self, fut: F) -> Result<R, TransportError>
    where
        F: std::future::Future<Output = Result<R, TransportError>>,
    {
        let timeout = self.config.request_timeout;
        tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| TransportError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })?
    }

    fn drop_payload<E>(&self, index: usize, error: &E)
    where
        E: pulse_core::errors::PulseErrorCode + std::fmt::Display,
    {
        self.observability.metrics.record(|m| m.payloads_dropped += 1);
        self.observability.diagnostics.report(
            DiagnosticLevel::Warn,
            DiagnosticKind::PayloadDropped,
            error,
        );
        tracing::warn!(index, "record dropped: {error}");
    }
}
