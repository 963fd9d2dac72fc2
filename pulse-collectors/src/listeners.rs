//! Listener registry.
//!
//! Collectors attach one listener per occurrence kind they care about; the
//! pipeline only delivers occurrences to collectors holding a live listener.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Class of host occurrence a listener subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerKind {
    Navigation,
    Click,
    PageLoad,
    UncaughtError,
    UnhandledRejection,
    ResourceError,
}

/// Handle returned by [`ListenerRegistry::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone)]
struct Listener {
    owner: &'static str,
    kind: ListenerKind,
}

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: BTreeMap<ListenerId, Listener>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, owner: &'static str, kind: ListenerKind) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.insert(id, Listener { owner, kind });
        tracing::trace!(owner, ?kind, "listeners: attached");
        id
    }

    /// Returns false when the listener was already gone.
    pub fn detach(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Owners with a live listener for `kind`, in attach order.
    pub fn owners_for(&self, kind: ListenerKind) -> Vec<&'static str> {
        let mut owners: Vec<&'static str> = Vec::new();
        for listener in self.listeners.values().filter(|l| l.kind == kind) {
            if !owners.contains(&listener.owner) {
                owners.push(listener.owner);
            }
        }
        owners
    }

    pub fn count_for_owner(&self, owner: &str) -> usize {
        self.listeners.values().filter(|l| l.owner == owner).count()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
