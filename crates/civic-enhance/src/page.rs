//! Page - lifecycle service for one document
//!
//! Owns the document together with the registry, hydrator, iframe guard,
//! component catalog and scheduler, and drives the connect pipeline:
//!
//! 1. `connect` waits the classify delay (or the host's ready signal)
//! 2. classify, mark and render once
//! 3. on the next frame, register the behavior (interactive only)
//! 4. after the guard delay, patch delegation if the frame is isolated
//!
//! Scheduled stages re-check that their node is still connected instead
//! of being cancelled.

use std::mem;
use std::rc::Rc;
use std::time::Duration;

use civic_dom::{Document, DocumentId, NodeId, SelectorList};
use civic_security::{FrameContext, SandboxFlags};
use url::Url;

use crate::{
    Behavior, BehaviorHandle, BehaviorRegistry, Classifier, ComponentCatalog, ComponentDefinition,
    Config, DebugSnapshot, EnhanceError, HydrationMode, HydrationSnapshot, Hydrator, IframeGuard,
    RenderOutcome, Scheduler,
};

/// Upper bound on tasks run by one `run_until_idle` call
const MAX_IDLE_TASKS: usize = 10_000;

/// Enhancement lifecycle of one document
#[derive(Debug)]
pub struct Page {
    config: Config,
    document: Document,
    registry: BehaviorRegistry,
    hydrator: Hydrator,
    guard: IframeGuard,
    catalog: ComponentCatalog,
    scheduler: Scheduler<Page>,
    failures: Vec<EnhanceError>,
    ready: bool,
    /// Connected before the host signalled ready
    pending: Vec<NodeId>,
}

impl Page {
    /// Top-level page
    pub fn new(config: Config, url: &str) -> Self {
        let document = Document::new(url);
        let frame = FrameContext::top_level(document.id());
        Self::with_document(config, document, frame)
    }

    /// Page embedded in an iframe of `parent`
    pub fn nested(config: Config, url: &str, parent: DocumentId, sandbox: Option<SandboxFlags>) -> Self {
        let document = Document::new(url);
        let frame = FrameContext::nested(document.id(), parent, sandbox);
        Self::with_document(config, document, frame)
    }

    pub fn with_document(mut config: Config, document: Document, frame: FrameContext) -> Self {
        if let Ok(url) = Url::parse(document.url()) {
            config.apply_query(&url);
        }

        let classifier = Classifier::new()
            .with_static(&config.extra_static)
            .with_interactive(&config.extra_interactive);
        let mut guard = IframeGuard::new(frame);
        guard.force_isolation(config.force_isolation);

        tracing::debug!(url = document.url(), isolated = guard.is_isolated(), "page created");
        Self {
            ready: !config.defer_until_ready,
            scheduler: Scheduler::new(config.delays.frame()),
            config,
            document,
            registry: BehaviorRegistry::new(),
            hydrator: Hydrator::new(classifier),
            guard,
            catalog: ComponentCatalog::new(),
            failures: Vec::new(),
            pending: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    pub fn hydrator(&self) -> &Hydrator {
        &self.hydrator
    }

    pub fn guard(&self) -> &IframeGuard {
        &self.guard
    }

    pub fn guard_mut(&mut self) -> &mut IframeGuard {
        &mut self.guard
    }

    pub fn catalog(&self) -> &ComponentCatalog {
        &self.catalog
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn has_pending(&self) -> bool {
        self.scheduler.has_pending()
    }

    /// Define a component for a tag name
    pub fn define(&mut self, name: &str, definition: ComponentDefinition) -> Result<(), EnhanceError> {
        self.catalog.define(name, definition)
    }

    /// Connected callback. Enhancement happens later, from the scheduler.
    pub fn connect(&mut self, node: NodeId) -> Result<(), EnhanceError> {
        self.definition_for(node)?;
        if !self.document.tree().is_connected(node) {
            return Err(EnhanceError::StaleNode(node));
        }

        if !self.ready {
            if !self.pending.contains(&node) {
                self.pending.push(node);
            }
            tracing::debug!(%node, "connected before host ready, deferred");
            return Ok(());
        }

        self.scheduler.set_timeout(
            self.config.delays.classify(),
            Box::new(move |page: &mut Page| page.run_hydrate_stage(node)),
        );
        Ok(())
    }

    /// Whole connect pipeline, synchronously. Attach failures are returned.
    pub fn enhance(&mut self, node: NodeId) -> Result<Option<BehaviorHandle>, EnhanceError> {
        let definition = self.definition_for(node)?;
        if !self.document.tree().is_connected(node) {
            return Err(EnhanceError::StaleNode(node));
        }
        if self.hydrate(node, &definition) == HydrationMode::Static {
            return Ok(None);
        }

        let handle = self.attach_behavior(node, &definition)?;
        if handle.is_some() {
            self.run_guard(node, &definition);
        }
        Ok(handle)
    }

    /// Disconnected callback: symmetric teardown. Safe to repeat.
    pub fn disconnect(&mut self, node: NodeId) {
        self.pending.retain(|&n| n != node);
        // Reverse attach order: the guard's instance went on last
        self.guard.release(&mut self.document, node);
        self.registry.unregister_all(&mut self.document, node);
        if self.hydrator.release(node).is_some() {
            tracing::debug!(%node, "disconnected");
        }
    }

    /// Re-render request from a property change.
    ///
    /// Static elements stay frozen. An interactive re-render replaces the
    /// markup the behavior scanned, so the behavior is torn down and
    /// registered again.
    pub fn request_update(&mut self, node: NodeId) -> Result<RenderOutcome, EnhanceError> {
        let outcome = self.hydrator.render(&mut self.document, node);
        if outcome == RenderOutcome::Suppressed || self.registry.kinds_for(node).is_empty() {
            return Ok(outcome);
        }

        let definition = self.definition_for(node)?;
        self.guard.release(&mut self.document, node);
        self.registry.unregister_all(&mut self.document, node);
        if self.attach_behavior(node, &definition)?.is_some() {
            self.schedule_guard(node, &definition);
        }
        Ok(outcome)
    }

    /// Grant a static element full reactivity. False if it was not static.
    pub fn promote(&mut self, node: NodeId) -> Result<bool, EnhanceError> {
        if !self.hydrator.promote(&mut self.document, node) {
            return Ok(false);
        }
        let definition = self.definition_for(node)?;
        if self.attach_behavior(node, &definition)?.is_some() {
            self.schedule_guard(node, &definition);
        }
        Ok(true)
    }

    /// After `delay` (default: the configured guard delay), re-attach
    /// `behavior` to `root` if the document is isolated and a target
    /// matching `selector` looks unwired.
    ///
    /// Only an invalid selector is reported; everything after is silent.
    pub fn fix_iframe_delegation(
        &mut self,
        root: NodeId,
        selector: &str,
        delay: Option<Duration>,
        behavior: Rc<dyn Behavior>,
    ) -> Result<(), EnhanceError> {
        let selectors = SelectorList::parse(selector)?;
        let delay = delay.unwrap_or_else(|| self.config.delays.guard());
        self.scheduler.set_timeout(
            delay,
            Box::new(move |page: &mut Page| {
                page.guard.fix(&mut page.document, root, &selectors, &behavior);
            }),
        );
        Ok(())
    }

    /// Host finished its own setup: enhance everything held back so far
    pub fn signal_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        let pending = mem::take(&mut self.pending);
        tracing::debug!(deferred = pending.len(), "host ready");
        for node in pending {
            self.run_hydrate_stage(node);
        }
    }

    /// Run every task due within `delta`. Returns the number run.
    pub fn advance(&mut self, delta: Duration) -> usize {
        let until = self.scheduler.now() + delta;
        let mut ran = 0;
        while let Some(task) = self.scheduler.pop_due(until) {
            task(self);
            ran += 1;
        }
        self.scheduler.advance_to(until);
        ran
    }

    /// Run tasks until none are left
    pub fn run_until_idle(&mut self) -> usize {
        let mut ran = 0;
        while let Some(due) = self.scheduler.next_due() {
            if ran >= MAX_IDLE_TASKS {
                tracing::warn!(ran, pending = self.scheduler.pending(), "scheduler did not settle");
                break;
            }
            let Some(task) = self.scheduler.pop_due(due) else {
                break;
            };
            task(self);
            ran += 1;
        }
        self.log_state();
        ran
    }

    /// Errors raised inside scheduled stages since the last call
    pub fn take_failures(&mut self) -> Vec<EnhanceError> {
        mem::take(&mut self.failures)
    }

    /// Drop state held for nodes that left the document without a
    /// disconnect. Returns the number of registry entries dropped.
    pub fn sweep(&mut self) -> usize {
        let tree = self.document.tree();
        self.pending.retain(|&n| tree.is_connected(n));
        self.hydrator.sweep(tree);
        self.guard.sweep(&mut self.document);
        self.registry.sweep(&mut self.document)
    }

    pub fn snapshot(&self) -> DebugSnapshot {
        let tree = self.document.tree();
        DebugSnapshot {
            document: self.document.id(),
            url: self.document.url().to_string(),
            now_ms: self.scheduler.now().as_millis() as u64,
            isolated: self.guard.is_isolated(),
            ready: self.ready,
            entries: self.registry.snapshot(tree),
            hydration: self.hydrator.states()
                .into_iter()
                .map(|(node, state)| HydrationSnapshot {
                    node,
                    tag: tree.tag_name(node).map(str::to_string),
                    state,
                })
                .collect(),
            pending_tasks: self.scheduler.pending(),
            failures: self.failures.len(),
        }
    }

    /// Log the debug snapshot when debugging is on
    pub fn log_state(&self) {
        if !self.config.debug {
            return;
        }
        match self.snapshot().to_json() {
            Ok(json) => tracing::info!(target: "civic_enhance::debug", "{json}"),
            Err(err) => tracing::warn!(error = %err, "could not serialize debug snapshot"),
        }
    }

    fn definition_for(&self, node: NodeId) -> Result<ComponentDefinition, EnhanceError> {
        let tag = self.document.tree().tag_name(node).ok_or(EnhanceError::StaleNode(node))?;
        self.catalog
            .get(tag)
            .cloned()
            .ok_or_else(|| EnhanceError::Undefined(tag.to_string()))
    }

    /// Classify, mark and render once. An element already hydrated keeps
    /// its mode and is not rendered again.
    fn hydrate(&mut self, node: NodeId, definition: &ComponentDefinition) -> HydrationMode {
        if let Some(mode) = self.hydrator.mode(node) {
            return mode;
        }
        let reason = self.hydrator.classifier().explain(self.document.tree(), node);
        let mode = reason.mode();
        tracing::debug!(%node, %mode, ?reason, "classified");

        self.hydrator.mark(node, mode, definition.render().cloned());
        self.hydrator.render(&mut self.document, node);
        mode
    }

    fn attach_behavior(
        &mut self,
        node: NodeId,
        definition: &ComponentDefinition,
    ) -> Result<Option<BehaviorHandle>, EnhanceError> {
        let Some(behavior) = definition.behavior() else {
            return Ok(None);
        };
        self.registry
            .attach(&mut self.document, node, definition.kind().clone(), behavior)
            .map(Some)
    }

    fn schedule_guard(&mut self, node: NodeId, definition: &ComponentDefinition) {
        if definition.guard().is_none() || !self.guard.is_isolated() {
            return;
        }
        let delay = definition.guard_delay().unwrap_or_else(|| self.config.delays.guard());
        let definition = definition.clone();
        self.scheduler.set_timeout(
            delay,
            Box::new(move |page: &mut Page| page.run_guard(node, &definition)),
        );
    }

    fn run_guard(&mut self, node: NodeId, definition: &ComponentDefinition) {
        if let (Some(selectors), Some(behavior)) = (definition.guard(), definition.behavior()) {
            self.guard.fix(&mut self.document, node, selectors, behavior);
        }
    }

    fn run_hydrate_stage(&mut self, node: NodeId) {
        if !self.document.tree().is_connected(node) {
            tracing::debug!(%node, "left the document before classification");
            return;
        }
        let definition = match self.definition_for(node) {
            Ok(definition) => definition,
            Err(err) => return self.record_failure(err),
        };
        if self.hydrate(node, &definition) == HydrationMode::Interactive && definition.behavior().is_some() {
            self.scheduler.request_frame(Box::new(move |page: &mut Page| page.run_attach_stage(node)));
        }
    }

    fn run_attach_stage(&mut self, node: NodeId) {
        if !self.document.tree().is_connected(node) || self.hydrator.mode(node).is_none() {
            tracing::debug!(%node, "disconnected before the behavior could attach");
            return;
        }
        let definition = match self.definition_for(node) {
            Ok(definition) => definition,
            Err(err) => return self.record_failure(err),
        };
        match self.attach_behavior(node, &definition) {
            Ok(Some(_)) => self.schedule_guard(node, &definition),
            Ok(None) => {}
            Err(err) => self.record_failure(err),
        }
    }

    fn record_failure(&mut self, err: EnhanceError) {
        tracing::error!(error = %err, "scheduled enhancement failed");
        self.failures.push(err);
    }
}
