//! The collector capability.

use pulse_core::errors::CaptureError;
use pulse_core::models::EventPayload;

use crate::listeners::{ListenerId, ListenerKind, ListenerRegistry};
use crate::occurrence::Occurrence;

/// Listener handles a collector currently holds.
#[derive(Debug, Default)]
pub struct Attachment {
    handles: Vec<ListenerId>,
}

impl Attachment {
    /// Attach one listener per kind. A second call while attached is a no-op.
    pub fn attach(
        &mut self,
        registry: &mut ListenerRegistry,
        owner: &'static str,
        kinds: &[ListenerKind],
    ) {
        if !self.handles.is_empty() {
            return;
        }
        self.handles = kinds.iter().map(|k| registry.attach(owner, *k)).collect();
    }

    /// Detach every held listener. Safe to call repeatedly.
    pub fn detach(&mut self, registry: &mut ListenerRegistry) {
        for id in self.handles.drain(..) {
            registry.detach(id);
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.handles.is_empty()
    }
}

/// A capture unit for one class of host occurrence.
pub trait Collector {
    /// Stable name, also the listener owner.
    fn name(&self) -> &'static str;

    /// Occurrence kinds this collector listens to.
    fn listens_to(&self) -> &'static [ListenerKind];

    fn attachment(&mut self) -> &mut Attachment;

    /// Turn a raw occurrence into a payload. `Ok(None)` means the occurrence
    /// is deliberately not captured (opt-out, duplicate, nothing measured).
    fn normalize(&mut self, occurrence: &Occurrence) -> Result<Option<EventPayload>, CaptureError>;

    fn start(&mut self, registry: &mut ListenerRegistry) {
        let (name, kinds) = (self.name(), self.listens_to());
        self.attachment().attach(registry, name, kinds);
    }

    fn stop(&mut self, registry: &mut ListenerRegistry) {
        self.attachment().detach(registry);
    }

    fn is_running(&mut self) -> bool {
        self.attachment().is_attached()
    }
}
