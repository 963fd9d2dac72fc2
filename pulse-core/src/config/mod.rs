//! SDK configuration: the recognized option surface, defaults, validation,
//! and JSON/TOML loading.

pub mod defaults;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Per-source enable flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorToggles {
    pub pageview: bool,
    pub click: bool,
    pub performance: bool,
    pub error: bool,
}

impl Default for CollectorToggles {
    fn default() -> Self {
        Self {
            pageview: true,
            click: true,
            performance: true,
            error: true,
        }
    }
}

/// Configuration of one SDK instance.
///
/// Field names are camelCase on the wire; snake_case spellings are accepted
/// as aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PulseConfig {
    /// Collection endpoint URL.
    pub endpoint: String,
    /// Owning project/tenant.
    #[serde(alias = "project_id", alias = "tenantId")]
    pub project_id: u64,
    /// Start collectors immediately on init.
    #[serde(alias = "auto_start")]
    pub auto_start: bool,
    /// Verbose diagnostics.
    pub debug: bool,
    /// Force pixel transport.
    #[serde(alias = "use_pixel")]
    pub use_pixel: bool,
    /// Flush threshold in records.
    #[serde(alias = "batch_size")]
    pub batch_size: usize,
    /// Flush window in milliseconds.
    #[serde(alias = "batch_timeout")]
    pub batch_timeout: u64,
    pub collectors: CollectorToggles,
    /// Session inactivity window in milliseconds.
    #[serde(alias = "session_timeout")]
    pub session_timeout: u64,
    #[serde(alias = "max_queue_size")]
    pub max_queue_size: usize,
    #[serde(alias = "max_retries")]
    pub max_retries: u32,
    /// Base of the exponential retry backoff in milliseconds.
    #[serde(alias = "retry_base_delay")]
    pub retry_base_delay: u64,
    #[serde(alias = "max_retry_delay")]
    pub max_retry_delay: u64,
    /// Per-attempt delivery timeout in milliseconds.
    #[serde(alias = "request_timeout")]
    pub request_timeout: u64,
    #[serde(alias = "pixel_max_url_length")]
    pub pixel_max_url_length: usize,
    #[serde(alias = "max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            project_id: 0,
            auto_start: defaults::DEFAULT_AUTO_START,
            debug: defaults::DEFAULT_DEBUG,
            use_pixel: defaults::DEFAULT_USE_PIXEL,
            batch_size: defaults::DEFAULT_BATCH_SIZE,
            batch_timeout: defaults::DEFAULT_BATCH_TIMEOUT_MS,
            collectors: CollectorToggles::default(),
            session_timeout: defaults::DEFAULT_SESSION_TIMEOUT_MS,
            max_queue_size: defaults::DEFAULT_MAX_QUEUE_SIZE,
            max_retries: defaults::DEFAULT_MAX_RETRIES,
            retry_base_delay: defaults::DEFAULT_RETRY_BASE_DELAY_MS,
            max_retry_delay: defaults::DEFAULT_MAX_RETRY_DELAY_MS,
            request_timeout: defaults::DEFAULT_REQUEST_TIMEOUT_MS,
            pixel_max_url_length: defaults::DEFAULT_PIXEL_MAX_URL_LENGTH,
            max_body_bytes: defaults::DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl PulseConfig {
    /// Minimal valid configuration for an endpoint and project.
    pub fn new(endpoint: impl Into<String>, project_id: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            project_id,
            ..Default::default()
        }
    }

    /// Parse a JSON configuration object.
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }

    /// Parse a TOML configuration document.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }

    /// Check every field; the first violation is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint(&self.endpoint)?;
        if self.project_id == 0 {
            return Err(invalid("projectId", "must be a positive integer"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batchSize", "must be at least 1"));
        }
        if self.batch_timeout == 0 {
            return Err(invalid("batchTimeout", "must be greater than 0ms"));
        }
        if self.session_timeout == 0 {
            return Err(invalid("sessionTimeout", "must be greater than 0ms"));
        }
        if self.max_queue_size < self.batch_size {
            return Err(invalid(
                "maxQueueSize",
                &format!("must be >= batchSize ({})", self.batch_size),
            ));
        }
        if self.request_timeout == 0 {
            return Err(invalid("requestTimeout", "must be greater than 0ms"));
        }
        if self.max_retry_delay < self.retry_base_delay {
            return Err(invalid("maxRetryDelay", "must be >= retryBaseDelay"));
        }
        if self.pixel_max_url_length <= self.endpoint.len() {
            return Err(invalid(
                "pixelMaxUrlLength",
                "must leave room for a payload after the endpoint",
            ));
        }
        Ok(())
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay)
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), ConfigError> {
    let rest = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .ok_or_else(|| invalid("endpoint", "must be an http(s) URL"))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(invalid("endpoint", "missing host"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fail_validation_without_endpoint() {
        let err = PulseConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("endpoint"));
    }

    #[test]
    fn minimal_config_is_valid() {
        PulseConfig::new("https://collect.example.com/api/track", 42)
            .validate()
            .unwrap();
    }

    #[test]
    fn rejects_zero_project() {
        let err = PulseConfig::new("https://collect.example.com", 0)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("projectId"));
    }

    #[test]
    fn rejects_non_http_endpoint() {
        for bad in ["ftp://x", "collect.example.com", "https://", "http:// /x"] {
            assert!(
                PulseConfig::new(bad, 1).validate().is_err(),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn json_accepts_camel_and_snake_case() {
        let camel = PulseConfig::from_json_str(
            r#"{"endpoint":"https://e.io/t","projectId":7,"batchSize":3,"usePixel":true,
                "collectors":{"click":false}}"#,
        )
        .unwrap();
        assert_eq!(camel.project_id, 7);
        assert_eq!(camel.batch_size, 3);
        assert!(camel.use_pixel);
        assert!(!camel.collectors.click);
        assert!(camel.collectors.pageview);

        let snake =
            PulseConfig::from_json_str(r#"{"endpoint":"https://e.io/t","project_id":7,"batch_timeout":250}"#)
                .unwrap();
        assert_eq!(snake.project_id, 7);
        assert_eq!(snake.batch_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn toml_loading() {
        let cfg = PulseConfig::from_toml_str(
            r#"
            endpoint = "https://e.io/t"
            projectId = 9
            batchSize = 20
            [collectors]
            performance = false
            "#,
        )
        .unwrap();
        assert_eq!(cfg.project_id, 9);
        assert_eq!(cfg.batch_size, 20);
        assert!(!cfg.collectors.performance);
        cfg.validate().unwrap();
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = PulseConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }
}
