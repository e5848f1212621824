//! DOM Tree (generational arena)
//!
//! Slots are recycled through a free list. Every recycle bumps the slot
//! generation, which is what lets [`NodeId`] act as a weak reference.

use crate::{DomError, ElementData, Node, NodeData, NodeId, SelectorList};

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        };
        tree.alloc(Node::new(NodeData::Document));
        tree
    }

    /// Document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::new(0, 0)
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, node: Some(node) });
            NodeId::new(index, 0)
        }
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Node::new(NodeData::Element(ElementData::new(tag))))
    }

    /// Create an element already linked as the last child of `parent`.
    /// A fresh node cannot form a cycle, so this cannot fail; a stale
    /// `parent` yields a detached element.
    pub(crate) fn create_child(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let child = self.create_element(tag);
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
            if let Some(node) = self.get_mut(child) {
                node.parent = Some(parent);
            }
        }
        child
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(Node::new(NodeData::Text(content.to_string())))
    }

    /// Get a node by ID (None when stale)
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_ref())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots.get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.node.as_mut())
    }

    fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.get(id).ok_or(DomError::StaleNode(id))
    }

    /// Whether the id still refers to the node it was issued for
    #[inline]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Whether the node is an element
    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    /// Element data
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Mutable element data
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        self.get_mut(id).and_then(Node::as_element_mut)
    }

    /// Lowercase tag name
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(ElementData::tag)
    }

    /// Attribute value
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attr(name))
    }

    /// Attribute presence
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    fn element_or_err(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        let node = self.get_mut(id).ok_or(DomError::StaleNode(id))?;
        node.as_element_mut().ok_or(DomError::NotAnElement(id))
    }

    /// Set an attribute
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_or_err(id)?.set_attr(name, value);
        Ok(())
    }

    /// Remove an attribute
    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        Ok(self.element_or_err(id)?.remove_attr(name))
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Children of a node (empty when stale)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    /// Inclusive containment check
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        if !self.is_alive(ancestor) {
            return false;
        }
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is reachable from the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_alive(id) && self.contains(self.root(), id)
    }

    /// Append a child, moving it out of any previous parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root() || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        self.detach(child)?;
        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        Ok(())
    }

    /// Unlink a node from its parent. The subtree stays alive.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent {
            if let Some(node) = self.get_mut(parent) {
                node.children.retain(|&c| c != id);
            }
        }
        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
        Ok(())
    }

    /// Detach and free a whole subtree. Ids into it become stale.
    pub fn destroy(&mut self, id: NodeId) -> Result<usize, DomError> {
        if id == self.root() {
            return Err(DomError::HierarchyRequest { parent: id, child: id });
        }
        self.detach(id)?;

        let mut doomed = vec![id];
        doomed.extend(self.descendants(id));
        for &node in &doomed {
            let slot = &mut self.slots[node.index() as usize];
            slot.node = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_list.push(node.index());
        }
        self.live -= doomed.len();
        tracing::trace!(root = %id, freed = doomed.len(), "destroyed subtree");
        Ok(doomed.len())
    }

    /// Pre-order descendants (excluding the node itself)
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|n| self.get(n).and_then(Node::as_text))
            .collect()
    }

    /// First descendant matching the selector list
    pub fn query_selector(&self, root: NodeId, selectors: &SelectorList) -> Option<NodeId> {
        self.descendants(root).find(|&n| selectors.matches(self, n))
    }

    /// All descendants matching the selector list, in DOM order
    pub fn query_selector_all(&self, root: NodeId, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendants(root).filter(|&n| selectors.matches(self, n)).collect()
    }

    /// Number of live nodes (document node included)
    pub fn len(&self) -> usize {
        self.live
    }

    /// True when only the document node is left
    pub fn is_empty(&self) -> bool {
        self.live <= 1
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Depth-first, document-order walk
pub struct Descendants<'a> {
    tree: &'a DomTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).iter().rev());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destroy_makes_ids_stale() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let span = tree.create_element("span");
        tree.append_child(tree.root(), div).unwrap();
        tree.append_child(div, span).unwrap();

        assert_eq!(tree.destroy(div).unwrap(), 2);
        assert!(!tree.is_alive(div));
        assert!(!tree.is_alive(span));

        // Slot reuse must not resurrect the old id
        let reused = tree.create_element("p");
        assert_eq!(reused.index(), span.index());
        assert_ne!(reused, span);
        assert!(!tree.is_alive(span));
    }

    #[test]
    fn test_create_child_links_both_ways() {
        let mut tree = DomTree::new();
        let div = tree.create_child(tree.root(), "div");
        let span = tree.create_child(div, "span");
        assert_eq!(tree.parent(span), Some(div));
        assert_eq!(tree.children(div), [span]);
        assert!(tree.is_connected(span));

        tree.destroy(div).unwrap();
        let orphan = tree.create_child(div, "p");
        assert_eq!(tree.parent(orphan), None);
        assert!(!tree.is_connected(orphan));
    }

    #[test]
    fn test_detach_keeps_node_alive() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.append_child(tree.root(), div).unwrap();
        assert!(tree.is_connected(div));

        tree.detach(div).unwrap();
        assert!(tree.is_alive(div));
        assert!(!tree.is_connected(div));
    }

    #[test]
    fn test_append_rejects_cycle() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("div");
        tree.append_child(outer, inner).unwrap();

        assert_eq!(
            tree.append_child(inner, outer),
            Err(DomError::HierarchyRequest { parent: inner, child: outer })
        );
    }

    #[test]
    fn test_descendants_document_order() {
        let mut tree = DomTree::new();
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");
        let d = tree.create_element("d");
        tree.append_child(tree.root(), a).unwrap();
        tree.append_child(a, b).unwrap();
        tree.append_child(b, c).unwrap();
        tree.append_child(a, d).unwrap();

        let order: Vec<_> = tree.descendants(tree.root()).collect();
        assert_eq!(order, vec![a, b, c, d]);
    }
}
