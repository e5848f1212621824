//! Frame Context
//!
//! Where a document sits relative to its parent window. A top-level
//! window is its own parent, so its parent document is itself.

use civic_dom::DocumentId;

use crate::SandboxFlags;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParentFrame {
    document: DocumentId,
    sandbox: Option<SandboxFlags>,
}

/// Browsing context of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameContext {
    document: DocumentId,
    parent: Option<ParentFrame>,
}

impl FrameContext {
    /// Top-level window
    pub fn top_level(document: DocumentId) -> Self {
        Self { document, parent: None }
    }

    /// Document embedded in an iframe of `parent_document`
    pub fn nested(document: DocumentId, parent_document: DocumentId, sandbox: Option<SandboxFlags>) -> Self {
        Self {
            document,
            parent: Some(ParentFrame { document: parent_document, sandbox }),
        }
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }

    /// Parent window's document as seen from this frame.
    ///
    /// `None` when a sandbox without `allow-same-origin` gives the frame an
    /// opaque origin and the parent document cannot be read.
    pub fn parent_document(&self) -> Option<DocumentId> {
        match &self.parent {
            None => Some(self.document),
            Some(parent) => match &parent.sandbox {
                Some(flags) if !flags.allows_same_origin() => None,
                _ => Some(parent.document),
            },
        }
    }

    /// Document identity differs from the parent window's (or cannot be
    /// compared). Always false for a top-level window.
    pub fn is_isolated(&self) -> bool {
        self.parent_document() != Some(self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_not_isolated() {
        let frame = FrameContext::top_level(DocumentId::next());
        assert!(frame.is_top_level());
        assert!(!frame.is_isolated());
        assert_eq!(frame.parent_document(), Some(frame.document()));
    }

    #[test]
    fn test_nested_frame_isolated() {
        let parent = DocumentId::next();
        let frame = FrameContext::nested(DocumentId::next(), parent, None);
        assert!(frame.is_isolated());
        assert_eq!(frame.parent_document(), Some(parent));
    }

    #[test]
    fn test_opaque_origin_isolated() {
        let parent = DocumentId::next();
        let frame = FrameContext::nested(DocumentId::next(), parent, Some(SandboxFlags::parse("allow-scripts")));
        assert_eq!(frame.parent_document(), None);
        assert!(frame.is_isolated());

        let same_origin = FrameContext::nested(
            DocumentId::next(),
            parent,
            Some(SandboxFlags::parse("allow-scripts allow-same-origin")),
        );
        assert_eq!(same_origin.parent_document(), Some(parent));
    }
}
