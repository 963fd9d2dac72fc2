//! Error collector: uncaught exceptions, unhandled rejections, and resource
//! load failures.

use pulse_core::errors::CaptureError;
use pulse_core::models::{ErrorContent, ErrorKind, EventPayload, ResourceDescriptor};
use serde_json::Value;

use crate::collector::{Attachment, Collector};
use crate::listeners::ListenerKind;
use crate::occurrence::Occurrence;

pub const NAME: &str = "error";

/// Stack traces beyond this many characters are cut.
const MAX_STACK_CHARS: usize = 4_096;

#[derive(Debug, Default)]
pub struct ErrorCollector {
    attachment: Attachment,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

fn truncate_stack(stack: &Option<String>) -> Option<String> {
    stack
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.chars().take(MAX_STACK_CHARS).collect())
}

/// Human-readable message for a rejection reason of any shape.
fn rejection_message(reason: &Value) -> String {
    match reason {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| reason.to_string()),
        Value::Null => "unhandled rejection".to_string(),
        other => other.to_string(),
    }
}

impl Collector for ErrorCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn listens_to(&self) -> &'static [ListenerKind] {
        &[
            ListenerKind::UncaughtError,
            ListenerKind::UnhandledRejection,
            ListenerKind::ResourceError,
        ]
    }

    fn attachment(&mut self) -> &mut Attachment {
        &mut self.attachment
    }

    fn normalize(&mut self, occurrence: &Occurrence) -> Result<Option<EventPayload>, CaptureError> {
        let content = match occurrence {
            Occurrence::UncaughtError(err) => {
                if err.message.trim().is_empty() && err.stack.is_none() {
                    return Err(CaptureError::MissingField {
                        collector: NAME,
                        field: "message",
                    });
                }
                ErrorContent {
                    kind: ErrorKind::Uncaught,
                    message: err.message.clone(),
                    stack: truncate_stack(&err.stack),
                    source: err.source.clone(),
                    line: err.line,
                    column: err.column,
                    resource: None,
                    url: err.page_url.clone(),
                }
            }
            Occurrence::UnhandledRejection(rejection) => {
                let stack = rejection.stack.clone().or_else(|| {
                    rejection
                        .reason
                        .get("stack")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                });
                ErrorContent {
                    kind: ErrorKind::UnhandledRejection,
                    message: rejection_message(&rejection.reason),
                    stack: truncate_stack(&stack),
                    source: None,
                    line: None,
                    column: None,
                    resource: None,
                    url: rejection.page_url.clone(),
                }
            }
            Occurrence::ResourceError(resource) => {
                if resource.url.trim().is_empty() {
                    return Err(CaptureError::MissingField {
                        collector: NAME,
                        field: "url",
                    });
                }
                let tag = resource.tag.trim().to_ascii_lowercase();
                ErrorContent {
                    kind: ErrorKind::Resource,
                    message: format!("failed to load {tag} {}", resource.url),
                    stack: None,
                    source: None,
                    line: None,
                    column: None,
                    resource: Some(ResourceDescriptor {
                        tag,
                        url: resource.url.clone(),
                    }),
                    url: resource.page_url.clone(),
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(EventPayload::Error(content)))
    }
}
