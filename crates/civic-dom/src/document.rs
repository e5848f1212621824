//! Document - High-level document API

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::events::ListenerTable;
use crate::{DomTree, KeyListener, KeyboardEvent, ListenerId, ListenerTarget, NodeId};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique document identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Allocate a fresh identity
    pub fn next() -> Self {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// HTML Document
#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    url: String,
    title: String,
    tree: DomTree,
    html_element: NodeId,
    head_element: NodeId,
    body_element: NodeId,
    active_element: Option<NodeId>,
    listeners: ListenerTable,
}

impl Document {
    /// Create a new document with `html > head + body`
    pub fn new(url: &str) -> Self {
        let mut tree = DomTree::new();
        let html = tree.create_child(tree.root(), "html");
        let head = tree.create_child(html, "head");
        let body = tree.create_child(html, "body");

        Self {
            id: DocumentId::next(),
            url: url.to_string(),
            title: String::new(),
            tree,
            html_element: html,
            head_element: head,
            body_element: body,
            active_element: None,
            listeners: ListenerTable::default(),
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Get document URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get document title
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    /// Get <html> element
    pub fn document_element(&self) -> NodeId {
        self.html_element
    }

    /// Get <head> element
    pub fn head(&self) -> NodeId {
        self.head_element
    }

    /// Get <body> element
    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Access the DOM tree
    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    /// Access the DOM tree mutably
    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Focused element, if it is still in the document
    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element.filter(|&id| self.tree.is_connected(id))
    }

    /// Move focus to a connected element
    pub fn focus(&mut self, node: NodeId) -> bool {
        if !self.tree.is_element(node) || !self.tree.is_connected(node) {
            return false;
        }
        self.active_element = Some(node);
        true
    }

    /// Drop focus
    pub fn blur(&mut self) {
        self.active_element = None;
    }

    /// Register a keydown listener
    pub fn add_keydown_listener(&mut self, target: ListenerTarget, listener: KeyListener) -> ListenerId {
        self.listeners.add(target, listener)
    }

    /// Remove a keydown listener; false if it was already gone
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Total registered keydown listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners registered on one target
    pub fn listener_count_for(&self, target: ListenerTarget) -> usize {
        self.listeners.count_for(target)
    }

    /// Dispatch a keydown through target, ancestors, then the document.
    ///
    /// The target defaults to the active element, then `<body>`. Returns
    /// `false` if a listener prevented the default action.
    pub fn dispatch_keydown(&mut self, event: &mut KeyboardEvent) -> bool {
        let target = event.target()
            .filter(|&t| self.tree.is_alive(t))
            .or_else(|| self.active_element())
            .unwrap_or(self.body_element);
        event.set_target(target);

        let mut path = Vec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            path.push(ListenerTarget::Node(node));
            current = self.tree.parent(node);
        }
        path.push(ListenerTarget::Document);

        for hop in path {
            // Snapshot so listeners may add listeners while running; one
            // removed by an earlier listener no longer fires
            for (id, listener) in self.listeners.for_target(hop) {
                if self.listeners.contains(id) {
                    listener(self, event);
                }
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        !event.is_default_prevented()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("about:blank")
    }
}
