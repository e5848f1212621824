//! Keyboard Events
//!
//! Keydown listeners and the event object handed to them. Listeners are
//! keyed by [`ListenerId`] rather than by target so they can always be
//! removed, even after their target node has been destroyed.

use std::fmt;
use std::rc::Rc;

use crate::{Document, NodeId};

/// Keydown listener callback
pub type KeyListener = Rc<dyn Fn(&mut Document, &mut KeyboardEvent)>;

/// Where a listener is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    /// The document itself (receives every bubbling event last)
    Document,
    /// A specific node
    Node(NodeId),
}

/// Listener handle returned on registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Keydown event
#[derive(Debug, Clone)]
pub struct KeyboardEvent {
    key: String,
    shift: bool,
    target: Option<NodeId>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl KeyboardEvent {
    /// Create a keydown for a DOM `key` value ("Tab", "Escape", ...)
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            shift: false,
            target: None,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Hold Shift
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Dispatch at an explicit target instead of the active element
    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn shift_key(&self) -> bool {
        self.shift
    }

    /// Target node, resolved at dispatch time
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub(crate) fn set_target(&mut self, target: NodeId) {
        self.target = Some(target);
    }

    /// Prevent default action
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Stop propagation
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// Listener storage in registration order
#[derive(Default)]
pub(crate) struct ListenerTable {
    next_id: u64,
    entries: Vec<(ListenerId, ListenerTarget, KeyListener)>,
}

impl ListenerTable {
    pub(crate) fn add(&mut self, target: ListenerTarget, listener: KeyListener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push((id, target, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _, _)| *entry != id);
        self.entries.len() != before
    }

    /// Snapshot of listeners for one target
    pub(crate) fn for_target(&self, target: ListenerTarget) -> Vec<(ListenerId, KeyListener)> {
        self.entries.iter()
            .filter(|(_, t, _)| *t == target)
            .map(|(id, _, listener)| (*id, Rc::clone(listener)))
            .collect()
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|(entry, _, _)| *entry == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn count_for(&self, target: ListenerTarget) -> usize {
        self.entries.iter().filter(|(_, t, _)| *t == target).count()
    }
}

impl fmt::Debug for ListenerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerTable")
            .field("listeners", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_table_remove() {
        let mut table = ListenerTable::default();
        let noop: KeyListener = Rc::new(|_: &mut Document, _: &mut KeyboardEvent| {});
        let a = table.add(ListenerTarget::Document, Rc::clone(&noop));
        let b = table.add(ListenerTarget::Document, noop);

        assert_eq!(table.len(), 2);
        assert!(table.remove(a));
        assert!(!table.remove(a));
        assert_eq!(table.count_for(ListenerTarget::Document), 1);
        assert!(table.remove(b));
    }

    #[test]
    fn test_prevent_default() {
        let mut event = KeyboardEvent::new("Tab").with_shift();
        assert!(event.shift_key());
        assert!(!event.is_default_prevented());
        event.prevent_default();
        assert!(event.is_default_prevented());
    }
}
