//! Element types: ElementId, Element.

use slotmap::new_key_type;

use crate::view::ViewId;

new_key_type! {
    /// Unique identifier for an element. Copy, lightweight (u64).
    pub struct ElementId;
}

/// A rendered element: markup plus the attached-view back-pointer.
#[derive(Debug, Clone)]
pub struct Element {
    /// The rendered markup for this element.
    pub markup: String,
    /// The view currently attached to this element, if any.
    ///
    /// Used to detect and evict stale attachments: attaching a second view
    /// to the same element detaches the first.
    pub attached: Option<ViewId>,
}

impl Element {
    /// Create a detached element holding `markup`.
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
            attached: None,
        }
    }
}
