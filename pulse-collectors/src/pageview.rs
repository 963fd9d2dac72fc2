//! Pageview collector: one event per navigation, including in-page
//! history navigations.

use pulse_core::errors::CaptureError;
use pulse_core::models::{EventPayload, NavigationKind, PageviewContent};

use crate::collector::{Attachment, Collector};
use crate::listeners::ListenerKind;
use crate::occurrence::Occurrence;

pub const NAME: &str = "pageview";

#[derive(Debug, Default)]
pub struct PageviewCollector {
    attachment: Attachment,
    last_url: Option<String>,
}

impl PageviewCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Collector for PageviewCollector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn listens_to(&self) -> &'static [ListenerKind] {
        &[ListenerKind::Navigation]
    }

    fn attachment(&mut self) -> &mut Attachment {
        &mut self.attachment
    }

    fn normalize(&mut self, occurrence: &Occurrence) -> Result<Option<EventPayload>, CaptureError> {
        let Occurrence::Navigation(nav) = occurrence else {
            return Ok(None);
        };
        let url = nav.url.trim();
        if url.is_empty() {
            return Err(CaptureError::MissingField {
                collector: NAME,
                field: "url",
            });
        }

        let referrer = match nav.kind {
            NavigationKind::Load => nav.referrer.clone().filter(|r| !r.is_empty()),
            _ => {
                if self.last_url.as_deref() == Some(url) {
                    return Ok(None);
                }
                self.last_url.clone()
            }
        };
        self.last_url = Some(url.to_string());

        Ok(Some(EventPayload::Pageview(PageviewContent {
            url: url.to_string(),
            title: nav.title.clone(),
            referrer,
            navigation: nav.kind,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occurrence::NavigationOccurrence;

    fn nav(kind: NavigationKind, url: &str) -> Occurrence {
        Occurrence::Navigation(NavigationOccurrence {
            kind,
            url: url.into(),
            title: "T".into(),
            referrer: Some("https://search.example/".into()),
        })
    }

    fn content(payload: Option<EventPayload>) -> PageviewContent {
        match payload {
            Some(EventPayload::Pageview(c)) => c,
            other => panic!("expected pageview, got {other:?}"),
        }
    }

    #[test]
    fn load_uses_document_referrer() {
        let mut c = PageviewCollector::new();
        let pv = content(c.normalize(&nav(NavigationKind::Load, "https://a.io/")).unwrap());
        assert_eq!(pv.referrer.as_deref(), Some("https://search.example/"));
        assert_eq!(pv.navigation, NavigationKind::Load);
    }

    #[test]
    fn spa_navigation_uses_previous_url_and_skips_duplicates() {
        let mut c = PageviewCollector::new();
        c.normalize(&nav(NavigationKind::Load, "https://a.io/")).unwrap();
        let pv = content(c.normalize(&nav(NavigationKind::PushState, "https://a.io/cart")).unwrap());
        assert_eq!(pv.referrer.as_deref(), Some("https://a.io/"));

        assert!(c
            .normalize(&nav(NavigationKind::ReplaceState, "https://a.io/cart"))
            .unwrap()
            .is_none());
        assert!(c
            .normalize(&nav(NavigationKind::HashChange, "https://a.io/cart#top"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn reload_of_same_url_is_a_pageview() {
        let mut c = PageviewCollector::new();
        c.normalize(&nav(NavigationKind::Load, "https://a.io/")).unwrap();
        assert!(c.normalize(&nav(NavigationKind::Load, "https://a.io/")).unwrap().is_some());
    }

    #[test]
    fn empty_url_is_capture_error() {
        let mut c = PageviewCollector::new();
        assert!(c.normalize(&nav(NavigationKind::Load, "  ")).is_err());
    }
}
