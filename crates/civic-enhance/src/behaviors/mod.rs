//! Built-in behavior modules

mod modal;

pub use modal::{ModalBehavior, ModalController};
