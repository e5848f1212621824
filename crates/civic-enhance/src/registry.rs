//! Behavior Registry
//!
//! Single source of truth for "has this node already been enhanced with
//! this behavior, and with what handle". Keys hold generational
//! [`NodeId`]s, so an entry never keeps its node alive and an entry for a
//! destroyed node can never be mistaken for one of a newer node reusing
//! the same slot. [`BehaviorRegistry::sweep`] drops such orphans.
//!
//! Callers serialize operations per node (connect/disconnect callbacks
//! never interleave), so the registry does no locking of its own.

use std::collections::HashMap;
use std::rc::Rc;

use civic_dom::{Document, DomTree, NodeId};
use serde::Serialize;

use crate::{Behavior, BehaviorHandle, BehaviorKind, EnhanceError};

#[derive(Debug)]
struct Entry {
    initialized: bool,
    handle: Option<BehaviorHandle>,
    render_count: u32,
}

/// Registry entry as exposed for inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySnapshot {
    pub node: NodeId,
    pub kind: BehaviorKind,
    pub initialized: bool,
    pub render_count: u32,
}

/// Behavior registry service
#[derive(Debug, Default)]
pub struct BehaviorRegistry {
    entries: HashMap<(NodeId, BehaviorKind), Entry>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach once per `(node, kind)`.
    ///
    /// An initialized entry short-circuits: `attach` is not called and the
    /// stored handle is returned. If `attach` fails the entry is removed
    /// and the error is returned to the caller.
    pub fn register<F>(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        kind: BehaviorKind,
        attach: F,
    ) -> Result<BehaviorHandle, EnhanceError>
    where
        F: FnOnce(&mut Document, NodeId) -> anyhow::Result<BehaviorHandle>,
    {
        if !doc.tree().is_element(node) {
            return Err(EnhanceError::StaleNode(node));
        }

        let key = (node, kind);
        let entry = self.entries.entry(key.clone()).or_insert(Entry {
            initialized: false,
            handle: None,
            render_count: 0,
        });
        entry.render_count += 1;
        if entry.initialized {
            if let Some(handle) = &entry.handle {
                tracing::trace!(%node, kind = %key.1, attempts = entry.render_count, "already enhanced");
                return Ok(handle.clone());
            }
        }

        match attach(doc, node) {
            Ok(handle) => {
                if let Some(entry) = self.entries.get_mut(&key) {
                    entry.initialized = true;
                    entry.handle = Some(handle.clone());
                }
                tracing::debug!(%node, kind = %key.1, "behavior attached");
                Ok(handle)
            }
            Err(source) => {
                self.entries.remove(&key);
                let (node, kind) = key;
                tracing::error!(%node, %kind, error = %source, "behavior failed to attach");
                Err(EnhanceError::Attach { kind, node, source })
            }
        }
    }

    /// [`register`](Self::register) with a behavior module's own on/off pair
    pub fn attach(
        &mut self,
        doc: &mut Document,
        node: NodeId,
        kind: BehaviorKind,
        behavior: &Rc<dyn Behavior>,
    ) -> Result<BehaviorHandle, EnhanceError> {
        let behavior = Rc::clone(behavior);
        self.register(doc, node, kind, move |doc, root| {
            let controller = behavior.on(doc, root)?;
            Ok(BehaviorHandle::from_behavior(behavior, root, controller))
        })
    }

    /// Tear down and forget `(node, kind)`. Safe to call repeatedly.
    ///
    /// Teardown failures are logged, never returned: this runs while the
    /// node is going away and nobody upstream can react.
    pub fn unregister(&mut self, doc: &mut Document, node: NodeId, kind: &BehaviorKind) {
        let Some(entry) = self.entries.remove(&(node, kind.clone())) else {
            return;
        };
        if let Some(handle) = entry.handle {
            guarded_teardown(doc, node, kind, &handle);
        }
    }

    /// Unregister every kind attached to `node`
    pub fn unregister_all(&mut self, doc: &mut Document, node: NodeId) {
        for kind in self.kinds_for(node) {
            self.unregister(doc, node, &kind);
        }
    }

    /// Existence check without side effects
    pub fn has(&self, node: NodeId, kind: &BehaviorKind) -> bool {
        self.entries
            .get(&(node, kind.clone()))
            .is_some_and(|entry| entry.initialized)
    }

    /// Stored handle, if initialized
    pub fn handle(&self, node: NodeId, kind: &BehaviorKind) -> Option<&BehaviorHandle> {
        self.entries.get(&(node, kind.clone())).and_then(|e| e.handle.as_ref())
    }

    /// Attachment attempts recorded for `(node, kind)`
    pub fn render_count(&self, node: NodeId, kind: &BehaviorKind) -> u32 {
        self.entries.get(&(node, kind.clone())).map_or(0, |e| e.render_count)
    }

    /// Kinds currently registered for a node
    pub fn kinds_for(&self, node: NodeId) -> Vec<BehaviorKind> {
        let mut kinds: Vec<_> = self.entries.keys()
            .filter(|(n, _)| *n == node)
            .map(|(_, kind)| kind.clone())
            .collect();
        kinds.sort();
        kinds
    }

    /// Drop entries whose node was destroyed or left the document.
    ///
    /// Backstop for hosts that lose a node without disconnecting it.
    /// Returns the number of entries removed.
    pub fn sweep(&mut self, doc: &mut Document) -> usize {
        let orphaned: Vec<(NodeId, BehaviorKind)> = self.entries.keys()
            .filter(|(node, _)| !doc.tree().is_connected(*node))
            .cloned()
            .collect();
        for (node, kind) in &orphaned {
            self.unregister(doc, *node, kind);
        }
        if !orphaned.is_empty() {
            tracing::debug!(swept = orphaned.len(), "dropped orphaned registry entries");
        }
        orphaned.len()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted view of all entries
    pub fn snapshot(&self, tree: &DomTree) -> Vec<EntrySnapshot> {
        let mut entries: Vec<EntrySnapshot> = self.entries.iter()
            .filter(|((node, _), _)| tree.is_alive(*node))
            .map(|((node, kind), entry)| EntrySnapshot {
                node: *node,
                kind: kind.clone(),
                initialized: entry.initialized,
                render_count: entry.render_count,
            })
            .collect();
        entries.sort_by(|a, b| (a.node, &a.kind).cmp(&(b.node, &b.kind)));
        entries
    }
}

fn guarded_teardown(doc: &mut Document, node: NodeId, kind: &BehaviorKind, handle: &BehaviorHandle) {
    match handle.teardown(doc) {
        Ok(()) => tracing::debug!(%node, %kind, "behavior torn down"),
        Err(err) => tracing::warn!(%node, %kind, error = %err, "behavior teardown failed"),
    }
}
