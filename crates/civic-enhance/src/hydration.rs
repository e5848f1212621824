//! Hydration Classifier
//!
//! Decides per element whether it needs live reactivity (`Interactive`)
//! or can be rendered once and frozen (`Static`). Curated tag lists win
//! over content heuristics; anything undecided falls back to `Static`.
//!
//! [`Hydrator`] applies the decision: a static element's render function
//! lets exactly one call through until the element is promoted.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use civic_a11y::{AriaAttribute, AriaRole};
use civic_dom::{Document, DomTree, NodeId};
use serde::Serialize;

/// Purely presentational components
pub const KNOWN_STATIC: &[&str] = &[
    "usa-alert",
    "usa-card",
    "usa-collection",
    "usa-graphic-list",
    "usa-icon",
    "usa-icon-list",
    "usa-identifier",
    "usa-link",
    "usa-list",
    "usa-process-list",
    "usa-prose",
    "usa-site-alert",
    "usa-step-indicator",
    "usa-summary-box",
    "usa-tag",
];

/// Components owning form controls, togglable panels or other stateful UI
pub const KNOWN_INTERACTIVE: &[&str] = &[
    "usa-accordion",
    "usa-banner",
    "usa-character-count",
    "usa-checkbox",
    "usa-combo-box",
    "usa-date-picker",
    "usa-date-range-picker",
    "usa-file-input",
    "usa-footer",
    "usa-header",
    "usa-in-page-navigation",
    "usa-input-mask",
    "usa-language-selector",
    "usa-modal",
    "usa-radio",
    "usa-range-slider",
    "usa-search",
    "usa-select",
    "usa-table",
    "usa-text-input",
    "usa-textarea",
    "usa-time-picker",
    "usa-tooltip",
];

/// Hydration mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HydrationMode {
    Static,
    Interactive,
}

impl fmt::Display for HydrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Interactive => "interactive",
        })
    }
}

/// Which rule produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationReason {
    KnownStatic,
    KnownInteractive,
    FormControl,
    ClickAffordance,
    ToggleState,
    Default,
}

impl ClassificationReason {
    pub fn mode(self) -> HydrationMode {
        match self {
            Self::KnownStatic | Self::Default => HydrationMode::Static,
            _ => HydrationMode::Interactive,
        }
    }
}

/// Tag lists plus content heuristics
#[derive(Debug, Clone)]
pub struct Classifier {
    known_static: HashSet<String>,
    known_interactive: HashSet<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            known_static: KNOWN_STATIC.iter().map(|t| t.to_string()).collect(),
            known_interactive: KNOWN_INTERACTIVE.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add tags to the static list
    pub fn with_static<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.known_static.extend(tags.into_iter().map(|t| t.as_ref().to_ascii_lowercase()));
        self
    }

    /// Add tags to the interactive list
    pub fn with_interactive<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.known_interactive.extend(tags.into_iter().map(|t| t.as_ref().to_ascii_lowercase()));
        self
    }

    /// Classify without side effects
    pub fn classify(&self, tree: &DomTree, node: NodeId) -> HydrationMode {
        self.explain(tree, node).mode()
    }

    /// Classification together with the rule that decided it
    pub fn explain(&self, tree: &DomTree, node: NodeId) -> ClassificationReason {
        let Some(tag) = tree.tag_name(node) else {
            return ClassificationReason::Default;
        };
        if self.known_static.contains(tag) {
            return ClassificationReason::KnownStatic;
        }
        if self.known_interactive.contains(tag) {
            return ClassificationReason::KnownInteractive;
        }

        if tree.descendants(node).any(|n| is_form_control(tree, n)) {
            return ClassificationReason::FormControl;
        }
        let subtree = || std::iter::once(node).chain(tree.descendants(node));
        if subtree().any(|n| has_click_affordance(tree, n)) {
            return ClassificationReason::ClickAffordance;
        }
        if subtree().any(|n| AriaAttribute::has_toggle_state(tree, n)) {
            return ClassificationReason::ToggleState;
        }
        ClassificationReason::Default
    }
}

fn is_form_control(tree: &DomTree, node: NodeId) -> bool {
    let Some(elem) = tree.element(node) else {
        return false;
    };
    match elem.tag() {
        "input" | "select" | "textarea" => true,
        "button" => elem.get_attr("type").is_none_or(|t| t.eq_ignore_ascii_case("submit")),
        _ => false,
    }
}

fn has_click_affordance(tree: &DomTree, node: NodeId) -> bool {
    tree.has_attr(node, "onclick") || AriaRole::of(tree, node).is_some_and(AriaRole::is_clickable)
}

/// Element render function
pub type RenderFn = Rc<dyn Fn(&mut Document, NodeId)>;

/// Result of a render request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered,
    Suppressed,
}

/// Per-element hydration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HydrationState {
    pub mode: HydrationMode,
    /// Full reactivity granted
    pub hydrated: bool,
    pub renders: u32,
    pub suppressed: u32,
}

struct Record {
    state: HydrationState,
    render: Option<RenderFn>,
}

/// Applies classifications and gates re-renders
#[derive(Default)]
pub struct Hydrator {
    classifier: Classifier,
    records: HashMap<NodeId, Record>,
}

impl Hydrator {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            records: HashMap::new(),
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn classify(&self, tree: &DomTree, node: NodeId) -> HydrationMode {
        self.classifier.classify(tree, node)
    }

    /// Freeze after the first render. Keeps an existing record untouched.
    pub fn mark_static(&mut self, node: NodeId, render: Option<RenderFn>) -> HydrationState {
        self.mark(node, HydrationMode::Static, render)
    }

    /// Allow every render. Keeps an existing record untouched.
    pub fn mark_interactive(&mut self, node: NodeId, render: Option<RenderFn>) -> HydrationState {
        self.mark(node, HydrationMode::Interactive, render)
    }

    /// Apply `mode`, returning the state now in effect
    pub fn mark(&mut self, node: NodeId, mode: HydrationMode, render: Option<RenderFn>) -> HydrationState {
        self.records
            .entry(node)
            .or_insert_with(|| {
                tracing::debug!(%node, %mode, "hydration mode applied");
                Record {
                    state: HydrationState {
                        mode,
                        hydrated: mode == HydrationMode::Interactive,
                        renders: 0,
                        suppressed: 0,
                    },
                    render,
                }
            })
            .state
    }

    /// Run the wrapped render function if the mode allows it
    pub fn render(&mut self, doc: &mut Document, node: NodeId) -> RenderOutcome {
        let Some(record) = self.records.get_mut(&node) else {
            return RenderOutcome::Suppressed;
        };
        let state = &mut record.state;
        if state.mode == HydrationMode::Static && state.renders > 0 {
            state.suppressed += 1;
            tracing::trace!(%node, suppressed = state.suppressed, "static re-render suppressed");
            return RenderOutcome::Suppressed;
        }
        state.renders += 1;
        let render = record.render.clone();

        if let Some(render) = render {
            render(doc, node);
        }
        RenderOutcome::Rendered
    }

    /// Irreversibly switch a static element to interactive and render once
    /// to catch up. Returns false when there was nothing to promote.
    pub fn promote(&mut self, doc: &mut Document, node: NodeId) -> bool {
        match self.records.get_mut(&node) {
            Some(record) if record.state.mode == HydrationMode::Static => {
                record.state.mode = HydrationMode::Interactive;
                record.state.hydrated = true;
            }
            _ => return false,
        }
        tracing::debug!(%node, "promoted to interactive");
        self.render(doc, node);
        true
    }

    pub fn state(&self, node: NodeId) -> Option<HydrationState> {
        self.records.get(&node).map(|r| r.state)
    }

    pub fn mode(&self, node: NodeId) -> Option<HydrationMode> {
        self.state(node).map(|s| s.mode)
    }

    /// Forget an element (on disconnect)
    pub fn release(&mut self, node: NodeId) -> Option<HydrationState> {
        self.records.remove(&node).map(|r| r.state)
    }

    /// Drop records for nodes no longer connected
    pub fn sweep(&mut self, tree: &DomTree) -> usize {
        let before = self.records.len();
        self.records.retain(|node, _| tree.is_connected(*node));
        before - self.records.len()
    }

    /// All states, ordered by node
    pub fn states(&self) -> Vec<(NodeId, HydrationState)> {
        let mut states: Vec<_> = self.records.iter().map(|(n, r)| (*n, r.state)).collect();
        states.sort_by_key(|(n, _)| *n);
        states
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Debug for Hydrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hydrator")
            .field("classifier", &self.classifier)
            .field("records", &self.records.len())
            .finish()
    }
}
