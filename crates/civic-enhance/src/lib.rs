//! Civic Enhance
//!
//! Lifecycle core that attaches DOM-mutating behavior modules to rendered
//! components exactly once, tears them down symmetrically, decides which
//! components need reactivity at all, and patches up delegation when the
//! page runs inside an isolated frame.
//!
//! # Example
//! ```rust,ignore
//! use civic_enhance::{Config, ComponentDefinition, Page, behaviors::ModalBehavior};
//!
//! let mut page = Page::new(Config::default(), "https://example.gov/");
//! page.define("usa-modal", ComponentDefinition::new("modal").with_behavior(ModalBehavior::shared()))?;
//! page.connect(modal)?;
//! page.run_until_idle();
//! ```

mod error;
mod config;
mod behavior;
mod registry;
mod hydration;
mod iframe;
mod scheduler;
mod components;
mod page;
mod debug;
pub mod behaviors;

pub use error::EnhanceError;
pub use config::{Config, Delays, DEBUG_QUERY_PARAM, DEBUG_STORAGE_KEY};
pub use behavior::{Behavior, BehaviorHandle, BehaviorKind, Controller};
pub use registry::{BehaviorRegistry, EntrySnapshot};
pub use hydration::{
    Classifier, ClassificationReason, HydrationMode, HydrationState, Hydrator, RenderFn,
    RenderOutcome, KNOWN_INTERACTIVE, KNOWN_STATIC,
};
pub use iframe::{IframeGuard, ENHANCED_MARKER};
pub use scheduler::{Scheduler, Task, TimerId};
pub use components::{ComponentCatalog, ComponentDefinition};
pub use page::Page;
pub use debug::{DebugSnapshot, HydrationSnapshot};

// Re-export sub-crates for behavior authors
pub use civic_dom as dom;
pub use civic_a11y as a11y;
pub use civic_security as security;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
