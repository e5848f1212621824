//! Component Catalog
//!
//! Tag name → how to enhance it: behavior kind, behavior module, render
//! function and optional iframe-guard target selector.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use civic_dom::SelectorList;

use crate::{Behavior, BehaviorKind, EnhanceError, RenderFn};

/// Hyphenated names HTML reserves for SVG and MathML
const RESERVED_NAMES: [&str; 8] = [
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// How one custom element is enhanced
#[derive(Clone)]
pub struct ComponentDefinition {
    kind: BehaviorKind,
    behavior: Option<Rc<dyn Behavior>>,
    render: Option<RenderFn>,
    guard: Option<SelectorList>,
    guard_delay: Option<Duration>,
}

impl ComponentDefinition {
    pub fn new(kind: impl Into<BehaviorKind>) -> Self {
        Self {
            kind: kind.into(),
            behavior: None,
            render: None,
            guard: None,
            guard_delay: None,
        }
    }

    pub fn with_behavior(mut self, behavior: Rc<dyn Behavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    pub fn with_renderer(mut self, render: RenderFn) -> Self {
        self.render = Some(render);
        self
    }

    /// Run the iframe guard over descendants matching `selector`
    pub fn with_iframe_guard(mut self, selector: &str) -> Result<Self, EnhanceError> {
        self.guard = Some(SelectorList::parse(selector)?);
        Ok(self)
    }

    /// Guard delay for this component instead of the configured default
    pub fn with_guard_delay(mut self, delay: Duration) -> Self {
        self.guard_delay = Some(delay);
        self
    }

    pub fn kind(&self) -> &BehaviorKind {
        &self.kind
    }

    pub fn behavior(&self) -> Option<&Rc<dyn Behavior>> {
        self.behavior.as_ref()
    }

    pub fn render(&self) -> Option<&RenderFn> {
        self.render.as_ref()
    }

    pub fn guard(&self) -> Option<&SelectorList> {
        self.guard.as_ref()
    }

    pub fn guard_delay(&self) -> Option<Duration> {
        self.guard_delay
    }
}

impl fmt::Debug for ComponentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDefinition")
            .field("kind", &self.kind)
            .field("behavior", &self.behavior.is_some())
            .field("render", &self.render.is_some())
            .field("guard", &self.guard)
            .field("guard_delay", &self.guard_delay)
            .finish()
    }
}

/// Defined components by tag name
#[derive(Debug, Default)]
pub struct ComponentCatalog {
    definitions: HashMap<String, ComponentDefinition>,
}

impl ComponentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a component
    pub fn define(&mut self, name: &str, definition: ComponentDefinition) -> Result<(), EnhanceError> {
        if !Self::is_valid_name(name) {
            return Err(EnhanceError::InvalidName(name.to_string()));
        }
        if self.definitions.contains_key(name) {
            return Err(EnhanceError::AlreadyDefined(name.to_string()));
        }
        // The guard re-invokes the behavior; without one there is nothing to re-invoke
        if definition.guard.is_some() && definition.behavior.is_none() {
            return Err(EnhanceError::MissingBehavior(definition.kind));
        }

        tracing::debug!(name, kind = %definition.kind, "component defined");
        self.definitions.insert(name.to_string(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ComponentDefinition> {
        self.definitions.get(name)
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Defined tag names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Custom element name rules: a hyphen, a lowercase first letter, no
    /// uppercase, not reserved
    pub fn is_valid_name(name: &str) -> bool {
        name.contains('-')
            && name.chars().next().is_some_and(|c| c.is_ascii_lowercase())
            && !name.chars().any(|c| c.is_ascii_uppercase())
            && !RESERVED_NAMES.contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(ComponentCatalog::is_valid_name("usa-accordion"));
        assert!(ComponentCatalog::is_valid_name("my-element"));
        assert!(!ComponentCatalog::is_valid_name("accordion"));
        assert!(!ComponentCatalog::is_valid_name("Usa-Accordion"));
        assert!(!ComponentCatalog::is_valid_name("usa-Accordion"));
        assert!(!ComponentCatalog::is_valid_name("-usa"));
        assert!(!ComponentCatalog::is_valid_name("font-face"));
    }

    #[test]
    fn test_define() {
        let mut catalog = ComponentCatalog::new();
        catalog.define("usa-tag", ComponentDefinition::new("tag")).unwrap();
        assert!(catalog.is_defined("usa-tag"));
        assert_eq!(catalog.get("usa-tag").map(|d| d.kind().as_str()), Some("tag"));

        let err = catalog.define("usa-tag", ComponentDefinition::new("tag")).unwrap_err();
        assert!(matches!(err, EnhanceError::AlreadyDefined(name) if name == "usa-tag"));

        let err = catalog.define("tag", ComponentDefinition::new("tag")).unwrap_err();
        assert!(matches!(err, EnhanceError::InvalidName(_)));
    }

    #[test]
    fn test_guard_needs_behavior() {
        let mut catalog = ComponentCatalog::new();
        let definition = ComponentDefinition::new("accordion")
            .with_iframe_guard(".usa-accordion__button")
            .unwrap();
        let err = catalog.define("usa-accordion", definition).unwrap_err();
        assert!(matches!(err, EnhanceError::MissingBehavior(_)));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_invalid_guard_selector() {
        let err = ComponentDefinition::new("accordion")
            .with_iframe_guard("div > button")
            .unwrap_err();
        assert!(matches!(err, EnhanceError::Dom(_)));
    }
}
