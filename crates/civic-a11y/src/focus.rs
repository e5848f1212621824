//! Focus Management
//!
//! Focusability rules and the focus trap used by dialogs and menus.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use civic_dom::{Document, DomTree, KeyboardEvent, ListenerId, ListenerTarget, NodeId};

/// Tab index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabIndex {
    NotFocusable,       // tabindex="-1" or garbage
    Sequential(i32),    // tabindex="0" or positive
}

impl TabIndex {
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<i32>() {
            Ok(n) if n < 0 => Self::NotFocusable,
            Ok(n) => Self::Sequential(n),
            Err(_) => Self::NotFocusable,
        }
    }

    pub fn is_focusable(&self) -> bool {
        matches!(self, Self::Sequential(_))
    }
}

fn natively_focusable(tree: &DomTree, node: NodeId) -> bool {
    let Some(elem) = tree.element(node) else {
        return false;
    };
    match elem.tag() {
        "a" | "area" => elem.has_attr("href"),
        "input" => !elem.get_attr("type").is_some_and(|t| t.eq_ignore_ascii_case("hidden")),
        "button" | "select" | "textarea" | "iframe" | "summary" => true,
        _ => elem.get_attr("contenteditable").is_some_and(|v| !v.eq_ignore_ascii_case("false")),
    }
}

fn hidden_or_inert(tree: &DomTree, node: NodeId) -> bool {
    let mut current = Some(node);
    while let Some(id) = current {
        if tree.has_attr(id, "hidden") || tree.has_attr(id, "inert") {
            return true;
        }
        current = tree.parent(id);
    }
    false
}

/// Whether the element takes part in sequential (Tab) navigation
pub fn is_focusable(tree: &DomTree, node: NodeId) -> bool {
    let Some(elem) = tree.element(node) else {
        return false;
    };
    let is_control = matches!(elem.tag(), "button" | "input" | "select" | "textarea");
    if is_control && elem.has_attr("disabled") {
        return false;
    }
    let by_index = match elem.get_attr("tabindex") {
        Some(value) => TabIndex::parse(value).is_focusable(),
        None => natively_focusable(tree, node),
    };
    by_index && !hidden_or_inert(tree, node)
}

/// Focusable descendants of a container in DOM order
pub fn focusable_descendants(tree: &DomTree, container: NodeId) -> Vec<NodeId> {
    tree.descendants(container)
        .filter(|&n| is_focusable(tree, n))
        .collect()
}

/// Where the trap's keydown listener lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrapScope {
    /// Listen on the document (catches keys even when focus escaped)
    #[default]
    Document,
    /// Listen on the container only
    Container,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Bounds {
    first: Option<NodeId>,
    last: Option<NodeId>,
}

/// Escape callback supplied by the trap's owner
pub type EscapeHandler = Rc<dyn Fn(&mut Document)>;

/// Focus trap
///
/// Cycles Tab/Shift+Tab between the first and last focusable descendants
/// of a container while active. The trap owns its [`ListenerId`], so
/// [`FocusTrap::off`] works even after the container left the document.
pub struct FocusTrap {
    container: NodeId,
    scope: TrapScope,
    escape: Option<EscapeHandler>,
    bounds: Rc<Cell<Bounds>>,
    listener: Option<ListenerId>,
}

impl FocusTrap {
    pub fn new(container: NodeId) -> Self {
        Self {
            container,
            scope: TrapScope::default(),
            escape: None,
            bounds: Rc::new(Cell::new(Bounds::default())),
            listener: None,
        }
    }

    pub fn with_scope(mut self, scope: TrapScope) -> Self {
        self.scope = scope;
        self
    }

    /// Invoke `handler` on Escape while active. The trap stays active;
    /// closing it is the handler's call.
    pub fn on_escape(mut self, handler: impl Fn(&mut Document) + 'static) -> Self {
        self.escape = Some(Rc::new(handler));
        self
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    pub fn first_focusable(&self) -> Option<NodeId> {
        self.bounds.get().first
    }

    pub fn last_focusable(&self) -> Option<NodeId> {
        self.bounds.get().last
    }

    fn measure(&self, tree: &DomTree) {
        let focusables = focusable_descendants(tree, self.container);
        self.bounds.set(Bounds {
            first: focusables.first().copied(),
            last: focusables.last().copied(),
        });
    }

    /// Activate. A second call behaves like `update(true)`.
    pub fn on(&mut self, doc: &mut Document) {
        if self.is_active() {
            self.refresh(doc);
            return;
        }

        self.measure(doc.tree());
        if let Some(first) = self.first_focusable() {
            doc.focus(first);
        }

        let target = match self.scope {
            TrapScope::Document => ListenerTarget::Document,
            TrapScope::Container => ListenerTarget::Node(self.container),
        };
        let bounds = Rc::clone(&self.bounds);
        let escape = self.escape.clone();
        let id = doc.add_keydown_listener(
            target,
            Rc::new(move |doc: &mut Document, event: &mut KeyboardEvent| {
                handle_key(doc, event, bounds.get(), escape.as_ref());
            }),
        );
        self.listener = Some(id);
        tracing::debug!(container = %self.container, ?target, "focus trap on");
    }

    /// Deactivate. Focus is left where it is.
    pub fn off(&mut self, doc: &mut Document) {
        if let Some(id) = self.listener.take() {
            doc.remove_listener(id);
            tracing::debug!(container = %self.container, "focus trap off");
        }
    }

    pub fn update(&mut self, doc: &mut Document, active: bool) {
        if active {
            self.on(doc);
        } else {
            self.off(doc);
        }
    }

    fn refresh(&mut self, doc: &mut Document) {
        self.measure(doc.tree());
        let drifted = doc.active_element()
            .is_none_or(|active| !doc.tree().contains(self.container, active));
        if drifted {
            if let Some(first) = self.first_focusable() {
                doc.focus(first);
            }
        }
    }
}

impl fmt::Debug for FocusTrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusTrap")
            .field("container", &self.container)
            .field("scope", &self.scope)
            .field("active", &self.is_active())
            .field("bounds", &self.bounds.get())
            .finish()
    }
}

fn handle_key(doc: &mut Document, event: &mut KeyboardEvent, bounds: Bounds, escape: Option<&EscapeHandler>) {
    match event.key() {
        "Tab" => {
            let (Some(first), Some(last)) = (bounds.first, bounds.last) else {
                return;
            };
            let active = doc.active_element();
            if event.shift_key() {
                if active == Some(first) {
                    event.prevent_default();
                    doc.focus(last);
                }
            } else if active == Some(last) {
                event.prevent_default();
                doc.focus(first);
            }
        }
        "Escape" => {
            if let Some(handler) = escape {
                handler(doc);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn dialog_with(doc: &mut Document, tags: &[&str]) -> (NodeId, Vec<NodeId>) {
        let dialog = doc.tree_mut().create_element("div");
        let body = doc.body();
        doc.tree_mut().append_child(body, dialog).unwrap();
        let children = tags.iter()
            .map(|tag| {
                let child = doc.tree_mut().create_element(tag);
                doc.tree_mut().append_child(dialog, child).unwrap();
                child
            })
            .collect();
        (dialog, children)
    }

    #[test]
    fn test_tab_index() {
        assert!(!TabIndex::parse("-1").is_focusable());
        assert!(TabIndex::parse("0").is_focusable());
        assert!(TabIndex::parse("5").is_focusable());
        assert!(!TabIndex::parse("abc").is_focusable());
    }

    #[test]
    fn test_focusability_rules() {
        let mut doc = Document::default();
        let (_, nodes) = dialog_with(&mut doc, &["a", "a", "input", "input", "div", "div", "button"]);
        let tree = doc.tree_mut();
        tree.set_attr(nodes[1], "href", "#main").unwrap();
        tree.set_attr(nodes[3], "type", "hidden").unwrap();
        tree.set_attr(nodes[5], "tabindex", "0").unwrap();
        tree.set_attr(nodes[6], "disabled", "").unwrap();

        let focusable: Vec<bool> = nodes.iter().map(|&n| is_focusable(doc.tree(), n)).collect();
        assert_eq!(focusable, vec![false, true, true, false, false, true, false]);
    }

    #[test]
    fn test_hidden_ancestor_excludes() {
        let mut doc = Document::default();
        let (dialog, nodes) = dialog_with(&mut doc, &["button"]);
        assert!(is_focusable(doc.tree(), nodes[0]));
        doc.tree_mut().set_attr(dialog, "hidden", "").unwrap();
        assert!(!is_focusable(doc.tree(), nodes[0]));
    }

    #[test]
    fn test_trap_cycles() {
        let mut doc = Document::default();
        let (dialog, nodes) = dialog_with(&mut doc, &["button", "input", "select"]);
        let (a, c) = (nodes[0], nodes[2]);

        let mut trap = FocusTrap::new(dialog);
        trap.on(&mut doc);
        assert_eq!(doc.active_element(), Some(a));

        doc.focus(c);
        let mut tab = KeyboardEvent::new("Tab");
        assert!(!doc.dispatch_keydown(&mut tab));
        assert_eq!(doc.active_element(), Some(a));

        let mut back = KeyboardEvent::new("Tab").with_shift();
        doc.dispatch_keydown(&mut back);
        assert_eq!(doc.active_element(), Some(c));
    }

    #[test]
    fn test_tab_in_middle_is_untouched() {
        let mut doc = Document::default();
        let (dialog, nodes) = dialog_with(&mut doc, &["button", "input", "select"]);
        let mut trap = FocusTrap::new(dialog);
        trap.on(&mut doc);

        doc.focus(nodes[1]);
        let mut tab = KeyboardEvent::new("Tab");
        assert!(doc.dispatch_keydown(&mut tab));
        assert_eq!(doc.active_element(), Some(nodes[1]));
    }

    #[test]
    fn test_on_twice_single_listener() {
        let mut doc = Document::default();
        let (dialog, _) = dialog_with(&mut doc, &["button"]);
        let escapes = Rc::new(RefCell::new(0));
        let count = Rc::clone(&escapes);
        let mut trap = FocusTrap::new(dialog).on_escape(move |_| *count.borrow_mut() += 1);

        trap.on(&mut doc);
        trap.on(&mut doc);
        assert_eq!(doc.listener_count(), 1);

        doc.dispatch_keydown(&mut KeyboardEvent::new("Escape"));
        assert_eq!(*escapes.borrow(), 1);
        assert!(trap.is_active(), "escape must not deactivate the trap");
    }

    #[test]
    fn test_empty_container_still_activates() {
        let mut doc = Document::default();
        let (dialog, _) = dialog_with(&mut doc, &["p"]);
        let outside = doc.tree_mut().create_element("button");
        let body = doc.body();
        doc.tree_mut().append_child(body, outside).unwrap();
        doc.focus(outside);

        let mut trap = FocusTrap::new(dialog);
        trap.on(&mut doc);
        assert!(trap.is_active());
        assert_eq!(trap.first_focusable(), None);
        assert_eq!(doc.active_element(), Some(outside));
        assert!(doc.dispatch_keydown(&mut KeyboardEvent::new("Tab")));
    }

    #[test]
    fn test_update_refocuses_only_on_drift() {
        let mut doc = Document::default();
        let (dialog, nodes) = dialog_with(&mut doc, &["button", "button"]);
        let mut trap = FocusTrap::new(dialog);
        trap.update(&mut doc, true);

        doc.focus(nodes[1]);
        trap.update(&mut doc, true);
        assert_eq!(doc.active_element(), Some(nodes[1]));

        doc.focus(doc.body());
        trap.update(&mut doc, true);
        assert_eq!(doc.active_element(), Some(nodes[0]));

        // Content changed while active
        let extra = doc.tree_mut().create_element("textarea");
        doc.tree_mut().append_child(dialog, extra).unwrap();
        trap.update(&mut doc, true);
        assert_eq!(trap.last_focusable(), Some(extra));
        assert_eq!(doc.listener_count(), 1);
    }

    #[test]
    fn test_off_after_container_destroyed() {
        let mut doc = Document::default();
        let (dialog, _) = dialog_with(&mut doc, &["button"]);
        let mut trap = FocusTrap::new(dialog).with_scope(TrapScope::Container);
        trap.on(&mut doc);
        assert_eq!(doc.listener_count_for(ListenerTarget::Node(dialog)), 1);

        doc.tree_mut().destroy(dialog).unwrap();
        trap.off(&mut doc);
        assert_eq!(doc.listener_count(), 0);
        assert!(!trap.is_active());

        // Idempotent
        trap.off(&mut doc);
    }

    #[test]
    fn test_document_listener_removed_after_container_destroyed() {
        let mut doc = Document::default();
        let (dialog, nodes) = dialog_with(&mut doc, &["button", "button"]);
        let mut trap = FocusTrap::new(dialog);
        trap.on(&mut doc);
        assert_eq!(doc.listener_count_for(ListenerTarget::Document), 1);

        doc.tree_mut().destroy(dialog).unwrap();
        assert!(!doc.tree().is_alive(nodes[0]));

        // Still wired to the document until the trap lets go
        assert!(trap.is_active());
        trap.off(&mut doc);
        assert_eq!(doc.listener_count_for(ListenerTarget::Document), 0);
        assert!(!trap.is_active());

        // Nothing left to intercept Tab
        assert!(doc.dispatch_keydown(&mut KeyboardEvent::new("Tab")));
        trap.off(&mut doc);
    }
}
