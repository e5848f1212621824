//! Behavior modules and their handles
//!
//! A behavior module is the external, DOM-scanning half of a component:
//! `on` wires listeners and attributes under a root and returns an opaque
//! controller, `off` reverses everything that controller did.

use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use civic_dom::{Document, NodeId};
use serde::Serialize;

/// Opaque state returned by a behavior's `on`
pub type Controller = Rc<dyn Any>;

/// Teardown closure stored in a handle
type Teardown = Box<dyn FnOnce(&mut Document) -> anyhow::Result<()>>;

/// Behavior module (attach/detach pair)
pub trait Behavior {
    /// Scan `root`, wire it up, and return the controller
    fn on(&self, doc: &mut Document, root: NodeId) -> anyhow::Result<Controller>;

    /// Reverse every effect of the matching `on` call
    fn off(&self, doc: &mut Document, root: NodeId, controller: &dyn Any) -> anyhow::Result<()>;
}

/// Behavior kind ("modal", "accordion", ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct BehaviorKind(Cow<'static, str>);

impl BehaviorKind {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for BehaviorKind {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for BehaviorKind {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for BehaviorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to one attached behavior instance.
///
/// Clones share the controller and the teardown; the teardown runs at
/// most once no matter how many clones ask for it.
#[derive(Clone)]
pub struct BehaviorHandle {
    controller: Controller,
    teardown: Rc<RefCell<Option<Teardown>>>,
}

impl BehaviorHandle {
    /// Wrap a controller value with no teardown
    pub fn new<C: Any>(controller: C) -> Self {
        Self::from_controller(Rc::new(controller))
    }

    pub fn from_controller(controller: Controller) -> Self {
        Self {
            controller,
            teardown: Rc::new(RefCell::new(None)),
        }
    }

    /// Handle whose teardown calls the behavior's own `off`
    pub fn from_behavior(behavior: Rc<dyn Behavior>, root: NodeId, controller: Controller) -> Self {
        let for_off = Rc::clone(&controller);
        Self::from_controller(controller)
            .on_teardown(move |doc| behavior.off(doc, root, &*for_off))
    }

    /// Set the teardown routine
    pub fn on_teardown(self, teardown: impl FnOnce(&mut Document) -> anyhow::Result<()> + 'static) -> Self {
        *self.teardown.borrow_mut() = Some(Box::new(teardown));
        self
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Typed view of the controller
    pub fn downcast<C: Any>(&self) -> Option<&C> {
        self.controller.downcast_ref::<C>()
    }

    /// Whether both handles refer to the same attachment
    pub fn ptr_eq(&self, other: &BehaviorHandle) -> bool {
        Rc::ptr_eq(&self.teardown, &other.teardown)
    }

    /// True once the teardown has run, or when none was ever set
    pub fn is_torn_down(&self) -> bool {
        self.teardown.borrow().is_none()
    }

    /// Run the teardown if it has not run yet
    pub(crate) fn teardown(&self, doc: &mut Document) -> anyhow::Result<()> {
        let teardown = self.teardown.borrow_mut().take();
        match teardown {
            Some(teardown) => teardown(doc),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for BehaviorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BehaviorHandle")
            .field("torn_down", &self.is_torn_down())
            .finish_non_exhaustive()
    }
}
