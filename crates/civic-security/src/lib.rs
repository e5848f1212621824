//! Civic Security
//!
//! Browsing-context facts the enhancement core needs:
//! - iframe `sandbox` flags
//! - whether the document is isolated from its parent frame

pub mod sandbox;
pub mod frame;

pub use sandbox::{SandboxFlags, SandboxFlag};
pub use frame::FrameContext;
