//! Iframe Delegation Guard
//!
//! Inside a frame whose document differs from the parent window's, a
//! behavior library's document-level delegation never binds and controls
//! stay inert. The guard finds targets that still look unwired and calls
//! the behavior's own `on` directly on the component root.
//!
//! Best effort only: nothing here returns an error, and in a top-level
//! document it does nothing at all.

use std::collections::HashMap;
use std::rc::Rc;

use civic_a11y::AriaAttribute;
use civic_dom::{Document, DomTree, NodeId, SelectorList};
use civic_security::FrameContext;

use crate::{Behavior, BehaviorHandle};

/// Marker attribute set on targets the guard has wired
pub const ENHANCED_MARKER: &str = "data-civic-enhanced";

/// One direct attachment and the targets it marked
#[derive(Debug)]
struct Patch {
    handle: BehaviorHandle,
    targets: Vec<NodeId>,
}

/// Re-attaches behaviors whose delegation failed in an isolated frame
#[derive(Debug)]
pub struct IframeGuard {
    frame: FrameContext,
    forced: Option<bool>,
    patched: HashMap<NodeId, Vec<Patch>>,
}

impl IframeGuard {
    pub fn new(frame: FrameContext) -> Self {
        Self {
            frame,
            forced: None,
            patched: HashMap::new(),
        }
    }

    /// Override isolation detection (`None` restores detection)
    pub fn force_isolation(&mut self, forced: Option<bool>) {
        self.forced = forced;
    }

    pub fn frame(&self) -> &FrameContext {
        &self.frame
    }

    /// Document identity differs from the parent window's
    pub fn is_isolated(&self) -> bool {
        self.forced.unwrap_or_else(|| self.frame.is_isolated())
    }

    /// Whether a target already looks wired: an inline click handler,
    /// `aria-expanded`, or the guard's own marker.
    ///
    /// `aria-expanded` can sit in markup before any behavior ran, so this
    /// reports some unwired targets as wired.
    pub fn has_handler(tree: &DomTree, node: NodeId) -> bool {
        tree.has_attr(node, "onclick")
            || tree.has_attr(node, AriaAttribute::Expanded.name())
            || tree.has_attr(node, ENHANCED_MARKER)
    }

    /// Re-attach `behavior` to `root` if any target matching `selectors`
    /// lacks a handler. Returns the number of targets patched.
    pub fn fix(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        selectors: &SelectorList,
        behavior: &Rc<dyn Behavior>,
    ) -> usize {
        if !self.is_isolated() {
            tracing::trace!(%root, "top-level document, delegation guard idle");
            return 0;
        }
        if !doc.tree().is_connected(root) {
            tracing::debug!(%root, "guard target left the document");
            return 0;
        }

        let unwired: Vec<NodeId> = doc.tree()
            .query_selector_all(root, selectors)
            .into_iter()
            .filter(|&n| !Self::has_handler(doc.tree(), n))
            .collect();
        if unwired.is_empty() {
            return 0;
        }

        let controller = match behavior.on(doc, root) {
            Ok(controller) => controller,
            Err(err) => {
                tracing::debug!(%root, error = %err, "delegation patch failed");
                return 0;
            }
        };
        for &target in &unwired {
            if let Err(err) = doc.tree_mut().set_attr(target, ENHANCED_MARKER, "") {
                tracing::debug!(%target, error = %err, "could not mark patched target");
            }
        }
        let count = unwired.len();
        self.patched.entry(root).or_default().push(Patch {
            handle: BehaviorHandle::from_behavior(Rc::clone(behavior), root, controller),
            targets: unwired,
        });

        tracing::debug!(%root, patched = count, "re-attached behavior inside isolated frame");
        count
    }

    /// Tear down every attachment made for `root`, newest first, and
    /// clear the markers they set
    pub fn release(&mut self, doc: &mut Document, root: NodeId) {
        let patches = self.patched.remove(&root).unwrap_or_default();
        for patch in patches.into_iter().rev() {
            if let Err(err) = patch.handle.teardown(doc) {
                tracing::warn!(%root, error = %err, "guard teardown failed");
            }
            for target in patch.targets {
                if let Some(elem) = doc.tree_mut().element_mut(target) {
                    elem.remove_attr(ENHANCED_MARKER);
                }
            }
        }
    }

    /// Attachments currently held for `root`
    pub fn patched(&self, root: NodeId) -> usize {
        self.patched.get(&root).map_or(0, Vec::len)
    }

    /// Release roots that are no longer connected
    pub fn sweep(&mut self, doc: &mut Document) -> usize {
        let gone: Vec<NodeId> = self.patched.keys()
            .copied()
            .filter(|&n| !doc.tree().is_connected(n))
            .collect();
        for root in &gone {
            self.release(doc, *root);
        }
        gone.len()
    }
}
