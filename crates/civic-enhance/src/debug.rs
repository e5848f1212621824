//! Debug snapshot
//!
//! Registry and hydration state of a page, serialized for diagnostic
//! logging when `civic-debug` is on.

use civic_dom::{DocumentId, NodeId};
use serde::Serialize;

use crate::{EntrySnapshot, HydrationState};

/// Hydration state of one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HydrationSnapshot {
    pub node: NodeId,
    pub tag: Option<String>,
    #[serde(flatten)]
    pub state: HydrationState,
}

/// Inspectable page state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugSnapshot {
    pub document: DocumentId,
    pub url: String,
    pub now_ms: u64,
    pub isolated: bool,
    pub ready: bool,
    pub entries: Vec<EntrySnapshot>,
    pub hydration: Vec<HydrationSnapshot>,
    pub pending_tasks: usize,
    pub failures: usize,
}

impl DebugSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Registry entries for `node`
    pub fn entries_for(&self, node: NodeId) -> impl Iterator<Item = &EntrySnapshot> {
        self.entries.iter().filter(move |e| e.node == node)
    }
}
