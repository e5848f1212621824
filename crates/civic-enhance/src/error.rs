//! Enhancement errors
//!
//! Only configuration mistakes and first-time attach failures surface
//! here. Teardown and iframe-guard failures are logged where they happen.

use civic_dom::{DomError, NodeId};

use crate::BehaviorKind;

/// Enhancement error
#[derive(Debug, thiserror::Error)]
pub enum EnhanceError {
    #[error("behavior `{kind}` failed to attach to {node}")]
    Attach {
        kind: BehaviorKind,
        node: NodeId,
        #[source]
        source: anyhow::Error,
    },

    #[error("no behavior module supplied for `{0}`")]
    MissingBehavior(BehaviorKind),

    #[error("`{0}` is not a valid custom element name")]
    InvalidName(String),

    #[error("component `{0}` is already defined")]
    AlreadyDefined(String),

    #[error("no component defined for <{0}>")]
    Undefined(String),

    #[error("{0} is not an element in this document")]
    StaleNode(NodeId),

    #[error(transparent)]
    Dom(#[from] DomError),
}
