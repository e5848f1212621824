//! Selectors
//!
//! The subset behavior modules actually use: comma-separated compound
//! selectors built from a type selector, `.class`, `#id`, `[attr]` and
//! `[attr=value]`. Combinators are rejected rather than half-supported.

use std::str::FromStr;

use crate::{DomError, DomTree, ElementData, NodeId};

/// Parsed selector list (matches if any compound matches)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    value: Option<String>,
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(source: &str) -> Result<Self, DomError> {
        let compounds = source
            .split(',')
            .map(|part| {
                parse_compound(part).ok_or_else(|| DomError::InvalidSelector(source.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { compounds })
    }

    /// Check if the node is an element matching any compound
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.element(node)
            .is_some_and(|elem| self.compounds.iter().any(|c| c.matches(elem)))
    }
}

impl FromStr for SelectorList {
    type Err = DomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Compound {
    fn matches(&self, elem: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if elem.tag() != tag.as_str() {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if elem.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| elem.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (&a.value, elem.get_attr(&a.name)) {
            (None, found) => found.is_some(),
            (Some(want), Some(found)) => want == found,
            (Some(_), None) => false,
        })
    }
}

fn ident_len(s: &str) -> usize {
    s.find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(s.len())
}

fn unquote(value: &str) -> Option<&str> {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        Some(&value[1..value.len() - 1])
    } else if value.is_empty() || value.contains(['"', '\'', ' ']) {
        None
    } else {
        Some(value)
    }
}

fn parse_compound(part: &str) -> Option<Compound> {
    let mut rest = part.trim();
    if rest.is_empty() {
        return None;
    }
    let mut compound = Compound::default();

    if let Some(after) = rest.strip_prefix('*') {
        rest = after;
    } else {
        let len = ident_len(rest);
        if len > 0 {
            compound.tag = Some(rest[..len].to_ascii_lowercase());
            rest = &rest[len..];
        }
    }

    while let Some(first) = rest.chars().next() {
        match first {
            '.' | '#' => {
                let body = &rest[1..];
                let len = ident_len(body);
                if len == 0 {
                    return None;
                }
                let name = body[..len].to_string();
                if first == '.' {
                    compound.classes.push(name);
                } else if compound.id.replace(name).is_some() {
                    return None;
                }
                rest = &body[len..];
            }
            '[' => {
                let close = rest.find(']')?;
                let inner = rest[1..close].trim();
                let (name, value) = match inner.split_once('=') {
                    Some((name, value)) => (name.trim(), Some(unquote(value.trim())?)),
                    None => (inner, None),
                };
                if name.is_empty() || ident_len(name) != name.len() {
                    return None;
                }
                compound.attrs.push(AttrMatch {
                    name: name.to_ascii_lowercase(),
                    value: value.map(str::to_string),
                });
                rest = &rest[close + 1..];
            }
            _ => return None,
        }
    }

    Some(compound)
}
