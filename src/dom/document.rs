//! The document: element storage and the attached-view identity index.

use slotmap::SlotMap;
use tracing::trace;

use super::element::{Element, ElementId};
use crate::view::ViewId;

/// Slotmap-backed element arena with attach/detach bookkeeping.
///
/// Updating an element's markup in place preserves its identity, which is
/// what lets the reconciler re-render a reused view without tearing down and
/// re-attaching its element.
#[derive(Debug, Default)]
pub struct Document {
    elements: SlotMap<ElementId, Element>,
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new, detached element holding `markup`.
    pub fn create(&mut self, markup: impl Into<String>) -> ElementId {
        self.elements.insert(Element::new(markup))
    }

    /// Replace an element's markup in place, preserving its identity.
    ///
    /// Returns `false` if the element does not exist.
    pub fn update_markup(&mut self, id: ElementId, markup: impl Into<String>) -> bool {
        match self.elements.get_mut(id) {
            Some(el) => {
                el.markup = markup.into();
                true
            }
            None => false,
        }
    }

    /// Destroy an element, returning its final state.
    pub fn destroy(&mut self, id: ElementId) -> Option<Element> {
        self.elements.remove(id)
    }

    /// Immutable access to an element.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    /// Mark `view` as the view attached to `id`.
    ///
    /// Returns the previously attached view when a *different* view was
    /// occupying the element — the caller is expected to treat that view's
    /// attachment as stale and evict it.
    pub fn attach(&mut self, id: ElementId, view: ViewId) -> Option<ViewId> {
        let el = self.elements.get_mut(id)?;
        let evicted = match el.attached {
            Some(prev) if prev != view => Some(prev),
            _ => None,
        };
        if let Some(prev) = evicted {
            trace!(?prev, ?view, "evicting stale attachment");
        }
        el.attached = Some(view);
        evicted
    }

    /// Clear the attachment back-pointer, but only if it still points at
    /// `view`. Returns whether anything was cleared.
    pub fn detach(&mut self, id: ElementId, view: ViewId) -> bool {
        match self.elements.get_mut(id) {
            Some(el) if el.attached == Some(view) => {
                el.attached = None;
                true
            }
            _ => false,
        }
    }

    /// The view currently attached to `id`, if any.
    pub fn attached_view(&self, id: ElementId) -> Option<ViewId> {
        self.elements.get(id)?.attached
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the document has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn view_ids(n: usize) -> Vec<ViewId> {
        let mut sm: SlotMap<ViewId, ()> = SlotMap::with_key();
        (0..n).map(|_| sm.insert(())).collect()
    }

    #[test]
    fn create_and_get() {
        let mut doc = Document::new();
        let id = doc.create("<p>hi</p>");
        assert_eq!(doc.get(id).unwrap().markup, "<p>hi</p>");
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn update_markup_preserves_identity() {
        let mut doc = Document::new();
        let id = doc.create("a");
        assert!(doc.update_markup(id, "b"));
        assert_eq!(doc.get(id).unwrap().markup, "b");
    }

    #[test]
    fn update_markup_missing_is_false() {
        let mut doc = Document::new();
        let id = doc.create("x");
        doc.destroy(id);
        assert!(!doc.update_markup(id, "y"));
    }

    #[test]
    fn attach_sets_back_pointer() {
        let views = view_ids(1);
        let mut doc = Document::new();
        let el = doc.create("x");
        assert_eq!(doc.attach(el, views[0]), None);
        assert_eq!(doc.attached_view(el), Some(views[0]));
    }

    #[test]
    fn attach_evicts_stale_view() {
        let views = view_ids(2);
        let mut doc = Document::new();
        let el = doc.create("x");
        doc.attach(el, views[0]);
        // Second view takes over the element; the first is reported evicted.
        assert_eq!(doc.attach(el, views[1]), Some(views[0]));
        assert_eq!(doc.attached_view(el), Some(views[1]));
    }

    #[test]
    fn reattach_same_view_is_not_eviction() {
        let views = view_ids(1);
        let mut doc = Document::new();
        let el = doc.create("x");
        doc.attach(el, views[0]);
        assert_eq!(doc.attach(el, views[0]), None);
    }

    #[test]
    fn detach_only_clears_own_pointer() {
        let views = view_ids(2);
        let mut doc = Document::new();
        let el = doc.create("x");
        doc.attach(el, views[0]);
        // A view that no longer owns the element cannot clear it.
        assert!(!doc.detach(el, views[1]));
        assert!(doc.detach(el, views[0]));
        assert_eq!(doc.attached_view(el), None);
    }

    #[test]
    fn destroy_removes_element() {
        let mut doc = Document::new();
        let id = doc.create("x");
        let el = doc.destroy(id).unwrap();
        assert_eq!(el.markup, "x");
        assert!(doc.is_empty());
        assert!(doc.get(id).is_none());
    }
}
