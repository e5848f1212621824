//! ARIA Support
//!
//! ARIA states and the widget roles that signal interactivity.

use civic_dom::{DomTree, NodeId};

/// ARIA state/property attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AriaAttribute {
    Expanded,
    Controls,
    Pressed,
    Selected,
    Checked,
    Hidden,
    Modal,
    Disabled,
    HasPopup,
    Current,
}

impl AriaAttribute {
    /// Every known state attribute
    pub const ALL: [AriaAttribute; 10] = [
        Self::Expanded,
        Self::Controls,
        Self::Pressed,
        Self::Selected,
        Self::Checked,
        Self::Hidden,
        Self::Modal,
        Self::Disabled,
        Self::HasPopup,
        Self::Current,
    ];

    /// Parse from attribute name
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "aria-expanded" => Self::Expanded,
            "aria-controls" => Self::Controls,
            "aria-pressed" => Self::Pressed,
            "aria-selected" => Self::Selected,
            "aria-checked" => Self::Checked,
            "aria-hidden" => Self::Hidden,
            "aria-modal" => Self::Modal,
            "aria-disabled" => Self::Disabled,
            "aria-haspopup" => Self::HasPopup,
            "aria-current" => Self::Current,
            _ => return None,
        })
    }

    /// Attribute name
    pub fn name(self) -> &'static str {
        match self {
            Self::Expanded => "aria-expanded",
            Self::Controls => "aria-controls",
            Self::Pressed => "aria-pressed",
            Self::Selected => "aria-selected",
            Self::Checked => "aria-checked",
            Self::Hidden => "aria-hidden",
            Self::Modal => "aria-modal",
            Self::Disabled => "aria-disabled",
            Self::HasPopup => "aria-haspopup",
            Self::Current => "aria-current",
        }
    }

    /// States that only exist on something a script toggles open/closed
    pub fn implies_toggle(self) -> bool {
        matches!(self, Self::Expanded | Self::Controls)
    }

    /// Check the element's own attributes for a toggle-implying state
    pub fn has_toggle_state(tree: &DomTree, node: NodeId) -> bool {
        tree.element(node).is_some_and(|elem| {
            elem.attrs().iter()
                .filter_map(|a| Self::parse(&a.name))
                .any(Self::implies_toggle)
        })
    }
}

/// ARIA role (widget subset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AriaRole {
    Button,
    Checkbox,
    Combobox,
    Dialog,
    Link,
    Menu,
    MenuItem,
    Option,
    Switch,
    Tab,
    TabPanel,
}

impl AriaRole {
    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "button" => Self::Button,
            "checkbox" => Self::Checkbox,
            "combobox" => Self::Combobox,
            "dialog" | "alertdialog" => Self::Dialog,
            "link" => Self::Link,
            "menu" => Self::Menu,
            "menuitem" => Self::MenuItem,
            "option" => Self::Option,
            "switch" => Self::Switch,
            "tab" => Self::Tab,
            "tabpanel" => Self::TabPanel,
            _ => return None,
        })
    }

    /// Explicit role of an element
    pub fn of(tree: &DomTree, node: NodeId) -> Option<Self> {
        tree.attr(node, "role").and_then(Self::parse)
    }

    /// Roles that respond to activation clicks
    pub fn is_clickable(self) -> bool {
        matches!(
            self,
            Self::Button | Self::Checkbox | Self::Link | Self::MenuItem
                | Self::Option | Self::Switch | Self::Tab
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip_names() {
        for attr in AriaAttribute::ALL {
            assert_eq!(AriaAttribute::parse(attr.name()), Some(attr));
        }
        assert_eq!(AriaAttribute::parse("aria-label"), None);
    }

    #[test]
    fn test_toggle_state() {
        let mut tree = DomTree::new();
        let button = tree.create_element("button");
        assert!(!AriaAttribute::has_toggle_state(&tree, button));

        tree.set_attr(button, "aria-pressed", "false").unwrap();
        assert!(!AriaAttribute::has_toggle_state(&tree, button));

        tree.set_attr(button, "aria-expanded", "false").unwrap();
        assert!(AriaAttribute::has_toggle_state(&tree, button));
    }

    #[test]
    fn test_role_clickable() {
        assert!(AriaRole::parse("Button").unwrap().is_clickable());
        assert!(!AriaRole::parse("dialog").unwrap().is_clickable());
        assert_eq!(AriaRole::parse("banner"), None);
    }
}
