//! Sandbox
//!
//! iframe `sandbox` attribute tokens. Only the presence of the attribute
//! and `allow-same-origin` change what the enhancement core can observe.

use std::collections::BTreeSet;

/// Individual sandbox flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SandboxFlag {
    AllowDownloads,
    AllowForms,
    AllowModals,
    AllowPopups,
    AllowPopupsToEscapeSandbox,
    AllowSameOrigin,
    AllowScripts,
    AllowTopNavigation,
}

impl SandboxFlag {
    fn parse(token: &str) -> Option<Self> {
        Some(match token.to_ascii_lowercase().as_str() {
            "allow-downloads" => Self::AllowDownloads,
            "allow-forms" => Self::AllowForms,
            "allow-modals" => Self::AllowModals,
            "allow-popups" => Self::AllowPopups,
            "allow-popups-to-escape-sandbox" => Self::AllowPopupsToEscapeSandbox,
            "allow-same-origin" => Self::AllowSameOrigin,
            "allow-scripts" => Self::AllowScripts,
            "allow-top-navigation" => Self::AllowTopNavigation,
            _ => return None,
        })
    }

    fn token(self) -> &'static str {
        match self {
            Self::AllowDownloads => "allow-downloads",
            Self::AllowForms => "allow-forms",
            Self::AllowModals => "allow-modals",
            Self::AllowPopups => "allow-popups",
            Self::AllowPopupsToEscapeSandbox => "allow-popups-to-escape-sandbox",
            Self::AllowSameOrigin => "allow-same-origin",
            Self::AllowScripts => "allow-scripts",
            Self::AllowTopNavigation => "allow-top-navigation",
        }
    }
}

/// Sandbox flags (empty = fully restricted)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxFlags {
    flags: BTreeSet<SandboxFlag>,
}

impl SandboxFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a sandbox attribute; unknown tokens are ignored
    pub fn parse(attribute: &str) -> Self {
        Self {
            flags: attribute.split_whitespace().filter_map(SandboxFlag::parse).collect(),
        }
    }

    pub fn has(&self, flag: SandboxFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn allows_scripts(&self) -> bool {
        self.has(SandboxFlag::AllowScripts)
    }

    /// Without this the frame gets an opaque origin
    pub fn allows_same_origin(&self) -> bool {
        self.has(SandboxFlag::AllowSameOrigin)
    }

    /// Serialize to attribute
    pub fn serialize(&self) -> String {
        self.flags.iter().map(|f| f.token()).collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sandbox() {
        let flags = SandboxFlags::parse("allow-scripts  ALLOW-SAME-ORIGIN bogus");

        assert!(flags.allows_scripts());
        assert!(flags.allows_same_origin());
        assert!(!flags.has(SandboxFlag::AllowForms));
        assert_eq!(flags.serialize(), "allow-same-origin allow-scripts");
    }

    #[test]
    fn test_empty_sandbox() {
        let flags = SandboxFlags::parse("");
        assert!(!flags.allows_scripts());
        assert!(!flags.allows_same_origin());
        assert_eq!(flags, SandboxFlags::new());
    }
}
