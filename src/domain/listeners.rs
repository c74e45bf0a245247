//! Event-listener registrations on the document and window.
//!
//! Every listener the engine attaches is recorded here with its owner so that
//! teardown can be verified: after a session is torn down, none of its
//! registrations remain.

use std::collections::BTreeMap;

use uuid::Uuid;

/// Events a listener can be registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListenerKind {
    /// Window scroll (passive)
    Scroll,
    /// Window resize (passive)
    Resize,
    /// Document click in the capture phase (overlay dismissal)
    ClickCapture,
    /// Document mouseover (marker tooltips)
    PointerOver,
    /// Document mouseout (marker tooltips)
    PointerOut,
    /// Document click in the bubble phase (causal panel)
    Click,
}

/// Who registered a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerOwner {
    /// The marking subsystem's one-time delegate
    MarkerDelegate,
    /// A connection overlay session
    Connection(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy)]
struct Registration {
    kind: ListenerKind,
    owner: ListenerOwner,
}

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    registrations: BTreeMap<ListenerId, Registration>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ListenerKind, owner: ListenerOwner) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.registrations.insert(id, Registration { kind, owner });
        id
    }

    /// Remove a registration; unknown ids are ignored
    pub fn remove(&mut self, id: ListenerId) {
        self.registrations.remove(&id);
    }

    /// Remove every registration held by `owner`
    pub fn remove_owner(&mut self, owner: ListenerOwner) {
        self.registrations.retain(|_, r| r.owner != owner);
    }

    /// Owners listening for `kind`, in registration order
    pub fn owners(&self, kind: ListenerKind) -> Vec<ListenerOwner> {
        self.registrations
            .values()
            .filter(|r| r.kind == kind)
            .map(|r| r.owner)
            .collect()
    }

    pub fn count(&self, kind: ListenerKind) -> usize {
        self.registrations.values().filter(|r| r.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_owner_only_drops_that_owner() {
        let mut reg = ListenerRegistry::new();
        let session = Uuid::new_v4();
        reg.add(ListenerKind::PointerOver, ListenerOwner::MarkerDelegate);
        reg.add(ListenerKind::Scroll, ListenerOwner::Connection(session));
        reg.add(ListenerKind::Resize, ListenerOwner::Connection(session));

        reg.remove_owner(ListenerOwner::Connection(session));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.count(ListenerKind::PointerOver), 1);
        assert_eq!(reg.count(ListenerKind::Scroll), 0);
    }
}
