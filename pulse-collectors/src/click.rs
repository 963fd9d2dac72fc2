//! Click collector: clicks on interactive elements.

use pulse_core::errors::CaptureError;
use pulse_core::models::{ClickContent, EventPayload};

use crate::collector::{Attachment, Collector};
use crate::listeners::ListenerKind;
use crate::occurrence::Occurrence;

pub const NAME: &str = "click";

#[derive(Debug, Default)]
pub struct ClickCollector {
    attachment: Attachment,
}

impl ClickCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for ClickCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn listens_to(&self) -> &'static [ListenerKind] {
        &[ListenerKind::Click]
    }

    fn attachment(&mut self) -> &mut Attachment {
        &mut self.attachment
    }

    fn normalize(&mut self, occurrence: &Occurrence) -> Result<Option<EventPayload>, CaptureError> {
        let Occurrence::Click(click) = occurrence else {
            return Ok(None);
        };
        if click.target.tag.trim().is_empty() {
            return Err(CaptureError::MissingField {
                collector: NAME,
                field: "target.tag",
            });
        }
        for coord in [click.client_x, click.client_y, click.page_x, click.page_y] {
            if !coord.is_finite() {
                return Err(CaptureError::Malformed {
                    collector: NAME,
                    reason: format!("non-finite coordinate {coord}"),
                });
            }
        }
        if click.target.is_opted_out() {
            return Ok(None);
        }
        let Some(target) = click.target.interactive_target() else {
            return Ok(None);
        };

        Ok(Some(EventPayload::Click(ClickContent {
            selector: target.selector_path(),
            tag: target.tag.trim().to_ascii_lowercase(),
            text: target.display_text(),
            href: target.attributes.get("href").cloned(),
            x: click.client_x,
            y: click.client_y,
            page_x: click.page_x,
            page_y: click.page_y,
        })))
    }
}
