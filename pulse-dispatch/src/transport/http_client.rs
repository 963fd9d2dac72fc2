//! reqwest-backed transport.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use pulse_core::constants::TENANT_HEADER;
use pulse_core::errors::TransportError;
use pulse_core::wire::BatchResponse;

use super::{PrimaryRequest, Transport};

/// Convert a reqwest failure into a [`TransportError`].
fn map_reqwest(e: reqwest::Error, timeout: Duration) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        TransportError::Network {
            reason: e.to_string(),
        }
    }
}

/// HTTP transport over a shared reqwest client with gzip support.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| TransportError::Network {
                reason: e.to_string(),
            })?;
        Ok(Self { client, timeout })
    }
}

impl Transport for HttpTransport {
    async fn post(&self, request: PrimaryRequest) -> Result<BatchResponse, TransportError> {
        let resp = self
            .client
            .post(&request.url)
            .header(TENANT_HEADER, request.project_id.to_string())
            .header(CONTENT_TYPE, "application/json")
            .body(request.body)
            .send()
            .await
            .map_err(|e| map_reqwest(e, self.timeout))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| map_reqwest(e, self.timeout))?;
        classify_response(status, &text)
    }

    async fn pixel(&self, url: String) -> Result<(), TransportError> {
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| map_reqwest(e, self.timeout))?;
        let status = resp.status();
        if status.is_success() || status.is_redirection() {
            Ok(())
        } else {
            Err(TransportError::Rejected {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("pixel rejected").to_string(),
            })
        }
    }
}

/// Map a primary response to an envelope or an error.
///
/// 405, and 403 without a structured envelope, mean the primary channel is
/// blocked for this origin.
pub fn classify_response(status: StatusCode, body: &str) -> Result<BatchResponse, TransportError> {
    let envelope = serde_json::from_str::<BatchResponse>(body);

    if status == StatusCode::METHOD_NOT_ALLOWED
        || (status == StatusCode::FORBIDDEN && envelope.is_err())
    {
        return Err(TransportError::Blocked {
            status: status.as_u16(),
        });
    }

    match envelope {
        Ok(envelope) => Ok(envelope),
        Err(_) if status.is_success() => Err(TransportError::InvalidResponse {
            reason: format!("unparseable body from HTTP {status}"),
        }),
        Err(_) => Err(TransportError::Rejected {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_success_is_parsed() {
        let resp = classify_response(
            StatusCode::OK,
            r#"{"code":200,"message":"ok","data":[{"index":0,"status":"created"}]}"#,
        )
        .unwrap();
        assert!(resp.is_success());
    }

    #[test]
    fn bare_forbidden_and_405_are_blocked() {
        assert_eq!(
            classify_response(StatusCode::FORBIDDEN, "").unwrap_err(),
            TransportError::Blocked { status: 403 }
        );
        assert_eq!(
            classify_response(StatusCode::METHOD_NOT_ALLOWED, "{}").unwrap_err(),
            TransportError::Blocked { status: 405 }
        );
    }

    #[test]
    fn structured_forbidden_is_an_envelope() {
        let resp =
            classify_response(StatusCode::FORBIDDEN, r#"{"code":403,"message":"bad tenant"}"#)
                .unwrap();
        assert!(!resp.is_success());
    }

    #[test]
    fn unstructured_server_error_is_rejected() {
        assert!(matches!(
            classify_response(StatusCode::BAD_GATEWAY, "upstream down"),
            Err(TransportError::Rejected { status: 502, .. })
        ));
        assert!(matches!(
            classify_response(StatusCode::OK, "<html>"),
            Err(TransportError::InvalidResponse { .. })
        ));
    }
}
