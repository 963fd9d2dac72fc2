//! # pulse-collectors
//!
//! Capture units turning host occurrences into normalized, identity-stamped
//! event records.
//!
//! ## Components
//! - **occurrence**: raw host occurrences (navigations, clicks, timings, errors)
//! - **listeners**: attach/detach bookkeeping, the `addEventListener` analogue
//! - **pageview / click / performance / error**: the four collectors
//! - **pipeline**: dispatches occurrences to attached collectors and stamps records

pub mod click;
pub mod collector;
pub mod element;
pub mod error;
pub mod listeners;
pub mod occurrence;
pub mod pageview;
pub mod performance;
pub mod pipeline;

pub use click::ClickCollector;
pub use collector::{Attachment, Collector};
pub use element::ElementInfo;
pub use error::ErrorCollector;
pub use listeners::{ListenerId, ListenerKind, ListenerRegistry};
pub use occurrence::{
    ClickOccurrence, ErrorOccurrence, NavigationOccurrence, NavigationTiming, Occurrence,
    PageLoadTiming, PaintTiming, RejectionOccurrence, ResourceOccurrence,
};
pub use pageview::PageviewCollector;
pub use performance::PerformanceCollector;
pub use pipeline::CapturePipeline;
