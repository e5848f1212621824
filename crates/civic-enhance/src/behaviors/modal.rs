//! Modal dialog behavior
//!
//! Shows the component root as a modal dialog and traps focus inside it.
//! Escape hides the dialog and releases the trap.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use anyhow::Context;
use civic_a11y::{AriaAttribute, FocusTrap};
use civic_dom::{Document, NodeId};

use crate::{Behavior, Controller};

/// Attributes the modal takes over while open
const MANAGED: [&str; 3] = ["role", "aria-modal", "hidden"];

/// Modal dialog behavior module
#[derive(Debug, Default, Clone, Copy)]
pub struct ModalBehavior;

impl ModalBehavior {
    pub fn shared() -> Rc<dyn Behavior> {
        Rc::new(Self)
    }
}

/// State of one open modal
#[derive(Debug)]
pub struct ModalController {
    trap: Rc<RefCell<FocusTrap>>,
    saved: Vec<(&'static str, Option<String>)>,
}

impl ModalController {
    /// Focus is currently trapped in the dialog
    pub fn is_trapping(&self) -> bool {
        self.trap.borrow().is_active()
    }

    pub fn container(&self) -> NodeId {
        self.trap.borrow().container()
    }
}

impl Behavior for ModalBehavior {
    fn on(&self, doc: &mut Document, root: NodeId) -> anyhow::Result<Controller> {
        let saved = MANAGED
            .iter()
            .map(|&name| (name, doc.tree().attr(root, name).map(str::to_string)))
            .collect();

        let tree = doc.tree_mut();
        tree.set_attr(root, "role", "dialog").context("modal root is not an element")?;
        tree.set_attr(root, AriaAttribute::Modal.name(), "true")?;
        tree.remove_attr(root, "hidden")?;

        let trap = Rc::new_cyclic(|weak: &Weak<RefCell<FocusTrap>>| {
            let weak = weak.clone();
            RefCell::new(FocusTrap::new(root).on_escape(move |doc| {
                if let Err(err) = doc.tree_mut().set_attr(root, "hidden", "") {
                    tracing::debug!(%root, error = %err, "modal closed after removal");
                }
                if let Some(trap) = weak.upgrade() {
                    trap.borrow_mut().off(doc);
                }
            }))
        });
        trap.borrow_mut().on(doc);

        Ok(Rc::new(ModalController { trap, saved }))
    }

    fn off(&self, doc: &mut Document, root: NodeId, controller: &dyn Any) -> anyhow::Result<()> {
        let controller = controller
            .downcast_ref::<ModalController>()
            .context("controller does not belong to a modal")?;
        controller.trap.borrow_mut().off(doc);

        if !doc.tree().is_alive(root) {
            return Ok(());
        }
        for (name, value) in &controller.saved {
            match value {
                Some(value) => doc.tree_mut().set_attr(root, name, value)?,
                None => {
                    doc.tree_mut().remove_attr(root, name)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use civic_dom::KeyboardEvent;

    fn modal(doc: &mut Document) -> (NodeId, NodeId, NodeId) {
        let tree = doc.tree_mut();
        let root = tree.create_element("usa-modal");
        let close = tree.create_element("button");
        let confirm = tree.create_element("button");
        tree.set_attr(root, "hidden", "").unwrap();
        tree.append_child(root, close).unwrap();
        tree.append_child(root, confirm).unwrap();
        let body = doc.body();
        doc.tree_mut().append_child(body, root).unwrap();
        (root, close, confirm)
    }

    #[test]
    fn test_open_traps_focus() {
        let mut doc = Document::default();
        let (root, close, confirm) = modal(&mut doc);
        let behavior = ModalBehavior::shared();

        let controller = behavior.on(&mut doc, root).unwrap();
        assert_eq!(doc.tree().attr(root, "role"), Some("dialog"));
        assert!(!doc.tree().has_attr(root, "hidden"));
        assert_eq!(doc.active_element(), Some(close));

        doc.focus(confirm);
        let mut tab = KeyboardEvent::new("Tab");
        assert!(!doc.dispatch_keydown(&mut tab));
        assert_eq!(doc.active_element(), Some(close));

        behavior.off(&mut doc, root, &*controller).unwrap();
        assert!(doc.tree().has_attr(root, "hidden"));
        assert!(!doc.tree().has_attr(root, "role"));
        assert_eq!(doc.listener_count(), 0);
    }

    #[test]
    fn test_escape_closes() {
        let mut doc = Document::default();
        let (root, _, _) = modal(&mut doc);
        let behavior = ModalBehavior::shared();
        let controller = behavior.on(&mut doc, root).unwrap();
        let modal = controller.downcast_ref::<ModalController>().unwrap();
        assert!(modal.is_trapping());

        doc.dispatch_keydown(&mut KeyboardEvent::new("Escape"));
        assert!(doc.tree().has_attr(root, "hidden"));
        assert!(!modal.is_trapping());
        assert_eq!(doc.listener_count(), 0);

        // Teardown after Escape is still clean
        behavior.off(&mut doc, root, &*controller).unwrap();
    }

    #[test]
    fn test_off_rejects_foreign_controller() {
        let mut doc = Document::default();
        let (root, _, _) = modal(&mut doc);
        assert!(ModalBehavior.off(&mut doc, root, &42_u32).is_err());
    }
}
