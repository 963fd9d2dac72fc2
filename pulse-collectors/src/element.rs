//! Element snapshots and selector paths for click capture.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use pulse_core::constants::{IGNORE_ATTRIBUTE, MAX_ELEMENT_TEXT_CHARS, MAX_SELECTOR_DEPTH};

const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "label", "summary", "option",
];
const INTERACTIVE_ROLES: &[&str] = &["button", "link", "menuitem", "tab", "checkbox", "switch"];

/// Snapshot of a DOM element and its ancestors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementInfo {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    /// 1-based position among siblings of the same tag; 0 when unknown.
    pub nth_of_type: usize,
    pub parent: Option<Box<ElementInfo>>,
}

impl ElementInfo {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn nth(mut self, n: usize) -> Self {
        self.nth_of_type = n;
        self
    }

    pub fn inside(mut self, parent: ElementInfo) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    fn tag_lower(&self) -> String {
        self.tag.trim().to_ascii_lowercase()
    }

    fn ancestors_and_self(&self) -> impl Iterator<Item = &ElementInfo> {
        std::iter::successors(Some(self), |e| e.parent.as_deref())
    }

    /// This element or an ancestor opted out of capture.
    pub fn is_opted_out(&self) -> bool {
        self.ancestors_and_self()
            .any(|e| e.attributes.contains_key(IGNORE_ATTRIBUTE))
    }

    pub fn is_interactive(&self) -> bool {
        let tag = self.tag_lower();
        if INTERACTIVE_TAGS.contains(&tag.as_str()) {
            return true;
        }
        if self.attributes.contains_key("onclick") {
            return true;
        }
        self.attributes
            .get("role")
            .map(|r| INTERACTIVE_ROLES.contains(&r.trim().to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// The element itself or its nearest interactive ancestor.
    pub fn interactive_target(&self) -> Option<&ElementInfo> {
        self.ancestors_and_self().find(|e| e.is_interactive())
    }

    /// Stable CSS-like path, stopping at the first ancestor with an id.
    pub fn selector_path(&self) -> String {
        let mut segments = Vec::new();
        for element in self.ancestors_and_self().take(MAX_SELECTOR_DEPTH) {
            let segment = element.selector_segment();
            let anchored = segment.contains('#');
            segments.push(segment);
            if anchored {
                break;
            }
        }
        segments.reverse();
        segments.join(" > ")
    }

    fn selector_segment(&self) -> String {
        let mut segment = self.tag_lower();
        if let Some(id) = self.id.as_deref().map(str::trim).filter(|id| is_css_ident(id)) {
            segment.push('#');
            segment.push_str(id);
            return segment;
        }
        for class in self.classes.iter().map(|c| c.trim()).filter(|c| is_css_ident(c)) {
            segment.push('.');
            segment.push_str(class);
        }
        if self.nth_of_type > 1 {
            segment.push_str(&format!(":nth-of-type({})", self.nth_of_type));
        }
        segment
    }

    /// Visible text, whitespace-collapsed and truncated. Form fields never
    /// report text.
    pub fn display_text(&self) -> Option<String> {
        if matches!(self.tag_lower().as_str(), "input" | "textarea" | "select") {
            return None;
        }
        let collapsed = self
            .text
            .as_deref()?
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if collapsed.is_empty() {
            return None;
        }
        Some(collapsed.chars().take(MAX_ELEMENT_TEXT_CHARS).collect())
    }
}

/// Identifiers that are safe to use unescaped in a selector.
fn is_css_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '-' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
