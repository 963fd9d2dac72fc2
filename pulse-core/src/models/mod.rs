//! Event data model.

pub mod event_type;
pub mod identity_stamp;
pub mod payload;
pub mod record;

pub use event_type::EventType;
pub use identity_stamp::IdentityStamp;
pub use payload::{
    ClickContent, CustomContent, ErrorContent, ErrorKind, EventPayload, NavigationKind,
    PageviewContent, PerformanceContent, ResourceDescriptor,
};
pub use record::EventRecord;
