//! Civic Accessibility
//!
//! Accessibility helpers shared by behavior modules.
//!
//! Features:
//! - ARIA states and widget roles
//! - Focusability rules
//! - Focus trap for dialogs and menus

pub mod aria;
pub mod focus;

pub use aria::{AriaAttribute, AriaRole};
pub use focus::{FocusTrap, TabIndex, TrapScope, focusable_descendants, is_focusable};
