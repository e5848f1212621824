//! Civic DOM - Light DOM tree
//!
//! Arena-backed DOM that enhanced components render into. Nodes are
//! addressed by generational [`NodeId`]s: destroying a node bumps its
//! slot generation, so every outstanding id for it goes stale instead of
//! silently pointing at whatever reuses the slot.

mod node;
mod tree;
mod document;
mod selector;
mod events;

use std::fmt;

use serde::Serialize;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use tree::{DomTree, Descendants};
pub use document::{Document, DocumentId};
pub use selector::SelectorList;
pub use events::{KeyboardEvent, KeyListener, ListenerId, ListenerTarget};

/// Node identifier (arena slot + generation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation this id was issued for
    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}v{}", self.index, self.generation)
    }
}

/// DOM errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("stale node reference {0}")]
    StaleNode(NodeId),

    #[error("{0} is not an element")]
    NotAnElement(NodeId),

    #[error("cannot insert {child} into {parent}")]
    HierarchyRequest { parent: NodeId, child: NodeId },

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
}
