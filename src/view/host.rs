//! The owning view host: arena, named containers, lifecycle.
//!
//! All live views sit in a single slotmap arena. Each slot pairs the boxed
//! view with its host bookkeeping: named containers (ordered lists of child
//! views), the parent back-reference, lifecycle flags, the waiting counter,
//! tracked entity subscriptions, and container-scoped delegation bindings.
//!
//! The container mutation primitives (`insert_views`, `set_views`,
//! `remove_views`) enforce the single-parent invariant: inserting a view
//! that already lives elsewhere transfers ownership, it never duplicates.
//! Removal edits the data model only — callers pair it with
//! [`dispose_view`](ViewHost::dispose_view) when a view should also leave
//! the document and release its resources.

use std::any::{Any, TypeId};
use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;
use slotmap::SlotMap;
use tracing::{debug, trace, warn};

use super::traits::View;
use super::waiting::{ViewCtx, WaitError};
use super::ViewId;
use crate::dom::{Document, ElementId};
use crate::event::{Delegate, DelegateHandler, Entity, EntityEvent, SubscriptionId, WeakEntity};
use crate::options::ViewOptions;

// ---------------------------------------------------------------------------
// Errors and flags
// ---------------------------------------------------------------------------

/// Failures from host primitives.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ViewError {
    /// The referenced view does not exist in the arena.
    #[error("unknown view")]
    UnknownView,
    /// The referenced parent view does not exist in the arena.
    #[error("unknown parent view")]
    UnknownParent,
}

bitflags! {
    /// Lifecycle state of a view.
    ///
    /// `constructed → RENDERED → ATTACHED ⇄ detached → REMOVED`; waiting is
    /// tracked separately as a counter and only gates render/attach.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ViewFlags: u8 {
        /// Markup has been materialized into an element.
        const RENDERED = 1 << 0;
        /// The element is the canonical one in the document identity index.
        const ATTACHED = 1 << 1;
        /// Terminal: the view has been disposed and cannot be reused.
        const REMOVED = 1 << 2;
    }
}

/// Which occupants a [`ViewHost::remove_views`] call targets.
#[derive(Debug, Clone)]
pub enum RemoveTarget {
    /// Specific view instances. Views not present are silently skipped.
    Views(Vec<ViewId>),
    /// The single occupant at a positional index.
    At(usize),
    /// Every current occupant of the container.
    All,
}

// ---------------------------------------------------------------------------
// ViewSlot
// ---------------------------------------------------------------------------

struct EntitySubscription {
    entity: WeakEntity,
    id: SubscriptionId,
}

struct ViewSlot {
    view: Box<dyn View>,
    flags: ViewFlags,
    waits: u32,
    element: Option<ElementId>,
    /// Parent view and the container name this view occupies within it.
    parent: Option<(ViewId, String)>,
    /// Named containers: ordered child view lists.
    containers: IndexMap<String, Vec<ViewId>>,
    delegates: Vec<Delegate>,
    subscriptions: Vec<EntitySubscription>,
}

// ---------------------------------------------------------------------------
// ViewHost
// ---------------------------------------------------------------------------

/// The owning arena for live views and their elements.
pub struct ViewHost {
    views: SlotMap<ViewId, ViewSlot>,
    document: Document,
}

impl ViewHost {
    /// Create an empty host.
    pub fn new() -> Self {
        Self {
            views: SlotMap::with_key(),
            document: Document::new(),
        }
    }

    // -- construction -------------------------------------------------------

    /// Run a view factory and take ownership of the produced view.
    ///
    /// The factory receives a [`ViewCtx`] carrying the merged construction
    /// options; waits registered through it leave the new view in the
    /// waiting state until resolved.
    pub fn build_view<F>(&mut self, options: &ViewOptions, factory: F) -> ViewId
    where
        F: FnOnce(&mut ViewCtx) -> Box<dyn View>,
    {
        let id = self.views.insert_with_key(|id| {
            let mut ctx = ViewCtx::new(id, options);
            let view = factory(&mut ctx);
            ViewSlot {
                view,
                flags: ViewFlags::empty(),
                waits: ctx.pending(),
                element: None,
                parent: None,
                containers: IndexMap::new(),
                delegates: Vec::new(),
                subscriptions: Vec::new(),
            }
        });
        debug!(?id, waits = self.pending_waits(id), "constructed view");
        id
    }

    // -- accessors ----------------------------------------------------------

    /// Whether the arena contains `id`.
    pub fn contains(&self, id: ViewId) -> bool {
        self.views.contains_key(id)
    }

    /// Immutable access to a view.
    pub fn view(&self, id: ViewId) -> Option<&dyn View> {
        self.views.get(id).map(|slot| slot.view.as_ref())
    }

    /// Downcast access to a concrete view type.
    pub fn view_as<T: View>(&self, id: ViewId) -> Option<&T> {
        self.view(id)?.as_any().downcast_ref::<T>()
    }

    /// Mutable downcast access to a concrete view type.
    pub fn view_as_mut<T: View>(&mut self, id: ViewId) -> Option<&mut T> {
        self.views
            .get_mut(id)
            .and_then(|slot| slot.view.as_any_mut().downcast_mut::<T>())
    }

    /// The concrete `TypeId` of a live view.
    pub fn view_type_id(&self, id: ViewId) -> Option<TypeId> {
        self.views.get(id).map(|slot| slot.view.as_any().type_id())
    }

    /// Lifecycle flags for a view.
    pub fn flags(&self, id: ViewId) -> Option<ViewFlags> {
        self.views.get(id).map(|slot| slot.flags)
    }

    /// Whether the view's element is canonical in the document index.
    pub fn attached(&self, id: ViewId) -> bool {
        self.views
            .get(id)
            .is_some_and(|slot| slot.flags.contains(ViewFlags::ATTACHED))
    }

    /// Whether the view has rendered markup.
    pub fn rendered(&self, id: ViewId) -> bool {
        self.views
            .get(id)
            .is_some_and(|slot| slot.flags.contains(ViewFlags::RENDERED))
    }

    /// Whether the view has outstanding wait units.
    pub fn is_waiting(&self, id: ViewId) -> bool {
        self.pending_waits(id) > 0
    }

    /// Outstanding wait units for a view.
    pub fn pending_waits(&self, id: ViewId) -> u32 {
        self.views.get(id).map_or(0, |slot| slot.waits)
    }

    /// Whether the view's externally-visible state has diverged.
    ///
    /// Missing views report `true` (there is nothing left to reuse).
    pub fn state_changed(&self, id: ViewId) -> bool {
        self.views.get(id).map_or(true, |slot| slot.view.state_changed())
    }

    /// The parent view, if this view occupies a container.
    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.views.get(id)?.parent.as_ref().map(|(pid, _)| *pid)
    }

    /// The container name this view occupies within its parent.
    pub fn container(&self, id: ViewId) -> Option<String> {
        self.views.get(id)?.parent.as_ref().map(|(_, c)| c.clone())
    }

    /// The view's element, once rendered.
    pub fn element(&self, id: ViewId) -> Option<ElementId> {
        self.views.get(id)?.element
    }

    /// The view's current markup, once rendered.
    pub fn markup(&self, id: ViewId) -> Option<&str> {
        let el = self.views.get(id)?.element?;
        self.document.get(el).map(|e| e.markup.as_str())
    }

    /// The document identity index.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Number of live views.
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    // -- waiting ------------------------------------------------------------

    /// Mark one wait unit done. Returns whether the view just became ready.
    pub(crate) fn note_resolved(&mut self, id: ViewId) -> Result<bool, WaitError> {
        let slot = self.views.get_mut(id).ok_or(WaitError::UnknownView)?;
        if slot.waits == 0 {
            return Err(WaitError::NotWaiting);
        }
        slot.waits -= 1;
        Ok(slot.waits == 0)
    }

    // -- lifecycle ----------------------------------------------------------

    /// Render the view's markup into its element, creating the element on
    /// first render and updating it in place afterwards.
    pub fn render_view(&mut self, id: ViewId) -> Result<ElementId, ViewError> {
        let (markup, existing) = {
            let slot = self.views.get(id).ok_or(ViewError::UnknownView)?;
            (slot.view.render(), slot.element)
        };
        let el = match existing {
            Some(el) => {
                self.document.update_markup(el, markup);
                el
            }
            None => {
                let el = self.document.create(markup);
                if let Some(slot) = self.views.get_mut(id) {
                    slot.element = Some(el);
                }
                el
            }
        };
        if let Some(slot) = self.views.get_mut(id) {
            slot.flags.insert(ViewFlags::RENDERED);
        }
        Ok(el)
    }

    /// Make the view's element canonical in the document index, rendering
    /// first if needed. A different view previously attached to the same
    /// element is evicted.
    pub fn attach_view(&mut self, id: ViewId) -> Result<(), ViewError> {
        if !self.views.contains_key(id) {
            return Err(ViewError::UnknownView);
        }
        let el = match self.views.get(id).and_then(|slot| slot.element) {
            Some(el) => el,
            None => self.render_view(id)?,
        };
        if let Some(evicted) = self.document.attach(el, id) {
            warn!(?evicted, ?id, "evicted stale attachment");
            if let Some(slot) = self.views.get_mut(evicted) {
                slot.flags.remove(ViewFlags::ATTACHED);
            }
        }
        let slot = self.views.get_mut(id).expect("view checked above");
        slot.flags.insert(ViewFlags::ATTACHED);
        for delegate in &mut slot.delegates {
            delegate.active = true;
        }
        Ok(())
    }

    /// Remove the view's element from the identity index and deactivate its
    /// delegation bindings. The view stays alive and re-attachable.
    pub fn detach_view(&mut self, id: ViewId) -> Result<(), ViewError> {
        let el = self.views.get(id).ok_or(ViewError::UnknownView)?.element;
        if let Some(el) = el {
            self.document.detach(el, id);
        }
        let slot = self.views.get_mut(id).expect("view checked above");
        slot.flags.remove(ViewFlags::ATTACHED);
        for delegate in &mut slot.delegates {
            delegate.active = false;
        }
        Ok(())
    }

    /// Terminal removal: dispose container occupants recursively, leave the
    /// parent's container list, stop subscriptions, destroy the element,
    /// and free the arena slot. Returns whether the view existed.
    pub fn dispose_view(&mut self, id: ViewId) -> bool {
        let Some(slot) = self.views.get(id) else {
            return false;
        };
        let children: Vec<ViewId> = slot.containers.values().flatten().copied().collect();
        let parent = slot.parent.clone();

        for child in children {
            self.dispose_view(child);
        }
        if let Some((pid, cname)) = parent {
            if let Some(pslot) = self.views.get_mut(pid) {
                if let Some(list) = pslot.containers.get_mut(&cname) {
                    list.retain(|v| *v != id);
                }
            }
        }
        self.stop_listening(id);
        if let Some(slot) = self.views.get_mut(id) {
            slot.flags.remove(ViewFlags::ATTACHED);
            slot.flags.insert(ViewFlags::REMOVED);
            if let Some(el) = slot.element.take() {
                self.document.detach(el, id);
                self.document.destroy(el);
            }
        }
        self.views.remove(id);
        debug!(?id, "disposed view");
        true
    }

    /// Absorb pass-level options on a reused view, re-rendering its markup
    /// in place when the view reports derived-state changes.
    pub fn update_view(&mut self, id: ViewId, options: &ViewOptions) -> Result<bool, ViewError> {
        let needs_render = {
            let slot = self.views.get_mut(id).ok_or(ViewError::UnknownView)?;
            slot.view.update(options)
        };
        if needs_render && self.views.get(id).is_some_and(|slot| slot.element.is_some()) {
            self.render_view(id)?;
        }
        Ok(needs_render)
    }

    // -- container primitives -----------------------------------------------

    /// Current occupants of a container, as an owned copy (never the live
    /// list).
    pub fn get_views(&self, parent: ViewId, container: &str) -> Vec<ViewId> {
        self.views
            .get(parent)
            .and_then(|slot| slot.containers.get(container))
            .cloned()
            .unwrap_or_default()
    }

    /// The occupant at a positional index.
    pub fn get_view(&self, parent: ViewId, container: &str, at: usize) -> Option<ViewId> {
        self.views.get(parent)?.containers.get(container)?.get(at).copied()
    }

    /// Number of occupants in a container.
    pub fn get_views_count(&self, parent: ViewId, container: &str) -> usize {
        self.views
            .get(parent)
            .and_then(|slot| slot.containers.get(container))
            .map_or(0, Vec::len)
    }

    /// Splice `views` into `container` at `at` (default: append).
    ///
    /// Ownership transfers: each view is first removed from any container it
    /// currently occupies. Back-pointers are set and delegation for the
    /// container is (re-)activated.
    pub fn insert_views(
        &mut self,
        parent: ViewId,
        views: &[ViewId],
        container: &str,
        at: Option<usize>,
    ) -> Result<(), ViewError> {
        if !self.views.contains_key(parent) {
            return Err(ViewError::UnknownParent);
        }
        for &v in views {
            if !self.views.contains_key(v) {
                return Err(ViewError::UnknownView);
            }
        }
        for &v in views {
            let prior = self.views.get(v).and_then(|slot| slot.parent.clone());
            if let Some((pid, cname)) = prior {
                if let Some(pslot) = self.views.get_mut(pid) {
                    if let Some(list) = pslot.containers.get_mut(&cname) {
                        list.retain(|x| *x != v);
                    }
                }
                if let Some(slot) = self.views.get_mut(v) {
                    slot.parent = None;
                }
            }
        }
        {
            let slot = self.views.get_mut(parent).expect("parent checked above");
            let list = slot.containers.entry(container.to_owned()).or_default();
            let at = at.unwrap_or(list.len()).min(list.len());
            list.splice(at..at, views.iter().copied());
        }
        for &v in views {
            if let Some(slot) = self.views.get_mut(v) {
                slot.parent = Some((parent, container.to_owned()));
            }
        }
        self.redelegate(parent, container);
        trace!(?parent, container, count = views.len(), "inserted views");
        Ok(())
    }

    /// Replace occupants with `views`: with `at`, only the occupant at that
    /// index is old (replace-one); without, the whole list is (replace-all).
    ///
    /// A referentially identical old/new list is a no-op, preventing
    /// detach/reattach churn. Otherwise the old occupants are removed *and*
    /// disposed before the new ones are inserted.
    pub fn set_views(
        &mut self,
        parent: ViewId,
        views: &[ViewId],
        container: &str,
        at: Option<usize>,
    ) -> Result<(), ViewError> {
        if !self.views.contains_key(parent) {
            return Err(ViewError::UnknownParent);
        }
        let current = self.get_views(parent, container);
        let old: Vec<ViewId> = match at {
            Some(i) => current.get(i).copied().into_iter().collect(),
            None => current,
        };
        if old.as_slice() == views {
            return Ok(());
        }
        let removed = self.remove_views(parent, container, RemoveTarget::Views(old))?;
        for v in removed {
            self.dispose_view(v);
        }
        self.insert_views(parent, views, container, at)
    }

    /// Remove occupants from a container's list.
    ///
    /// Views not actually present are silently skipped. Matches are
    /// deduplicated and spliced out highest-index-first so positions stay
    /// valid across multiple removals. Each removed view's entity
    /// subscriptions stop and its parent back-pointer clears; the views
    /// themselves stay alive (pair with [`dispose_view`](Self::dispose_view)
    /// for full teardown). Returns the removed views in container order.
    pub fn remove_views(
        &mut self,
        parent: ViewId,
        container: &str,
        target: RemoveTarget,
    ) -> Result<Vec<ViewId>, ViewError> {
        if !self.views.contains_key(parent) {
            return Err(ViewError::UnknownParent);
        }
        let current = self.get_views(parent, container);
        let candidates: Vec<ViewId> = match target {
            RemoveTarget::All => current.clone(),
            RemoveTarget::At(i) => current.get(i).copied().into_iter().collect(),
            RemoveTarget::Views(vs) => vs,
        };
        let mut indices: Vec<usize> = Vec::new();
        for v in &candidates {
            if let Some(i) = current.iter().position(|x| x == v) {
                if !indices.contains(&i) {
                    indices.push(i);
                }
            }
        }
        indices.sort_unstable_by(|a, b| b.cmp(a));

        let mut removed = Vec::with_capacity(indices.len());
        if let Some(slot) = self.views.get_mut(parent) {
            if let Some(list) = slot.containers.get_mut(container) {
                for &i in &indices {
                    removed.push(list.remove(i));
                }
            }
        }
        removed.reverse();
        for &v in &removed {
            self.stop_listening(v);
            if let Some(slot) = self.views.get_mut(v) {
                slot.parent = None;
            }
        }
        trace!(?parent, container, count = removed.len(), "removed views");
        Ok(removed)
    }

    // -- convenience wrappers ----------------------------------------------

    /// Replace the container's occupants with a single view.
    pub fn set_view(
        &mut self,
        parent: ViewId,
        view: ViewId,
        container: &str,
        at: Option<usize>,
    ) -> Result<(), ViewError> {
        self.set_views(parent, &[view], container, at)
    }

    /// Append a view to a container.
    pub fn append_view(&mut self, parent: ViewId, view: ViewId, container: &str) -> Result<(), ViewError> {
        self.insert_views(parent, &[view], container, None)
    }

    /// Prepend a view to a container.
    pub fn prepend_view(&mut self, parent: ViewId, view: ViewId, container: &str) -> Result<(), ViewError> {
        self.insert_views(parent, &[view], container, Some(0))
    }

    /// Insert a view at a positional index.
    pub fn insert_view(
        &mut self,
        parent: ViewId,
        view: ViewId,
        container: &str,
        at: usize,
    ) -> Result<(), ViewError> {
        self.insert_views(parent, &[view], container, Some(at))
    }

    /// Alias for [`append_view`](Self::append_view).
    pub fn add_view(&mut self, parent: ViewId, view: ViewId, container: &str) -> Result<(), ViewError> {
        self.append_view(parent, view, container)
    }

    /// Remove a single view from a container. Returns whether it was
    /// present.
    pub fn remove_view(&mut self, parent: ViewId, view: ViewId, container: &str) -> Result<bool, ViewError> {
        Ok(!self
            .remove_views(parent, container, RemoveTarget::Views(vec![view]))?
            .is_empty())
    }

    // -- entity events ------------------------------------------------------

    /// Subscribe a view to an entity event; the subscription is tracked in
    /// the view's slot and released when the view is removed or disposed.
    pub fn listen_to(
        &mut self,
        view: ViewId,
        entity: &Entity,
        event: &str,
        handler: impl Fn(&Rc<dyn Any>) + 'static,
    ) -> Result<SubscriptionId, ViewError> {
        if !self.views.contains_key(view) {
            return Err(ViewError::UnknownView);
        }
        let id = entity.on(event, handler);
        let slot = self.views.get_mut(view).expect("view checked above");
        slot.subscriptions.push(EntitySubscription {
            entity: entity.downgrade(),
            id,
        });
        Ok(id)
    }

    /// Release every tracked entity subscription of a view.
    pub fn stop_listening(&mut self, view: ViewId) {
        let subs = match self.views.get_mut(view) {
            Some(slot) => std::mem::take(&mut slot.subscriptions),
            None => return,
        };
        for sub in subs {
            sub.entity.off(sub.id);
        }
    }

    /// Register a container-scoped delegation binding on a parent view:
    /// `event` emitted by whatever views currently occupy `container` will
    /// invoke `handler`.
    pub fn delegate(
        &mut self,
        parent: ViewId,
        container: &str,
        event: &str,
        handler: impl Fn(&EntityEvent) + 'static,
    ) -> Result<(), ViewError> {
        let slot = self.views.get_mut(parent).ok_or(ViewError::UnknownParent)?;
        slot.delegates.push(Delegate {
            container: container.to_owned(),
            event: event.to_owned(),
            handler: Rc::new(handler),
            active: true,
        });
        Ok(())
    }

    /// Deactivate a parent's delegation bindings for a container. Bindings
    /// are kept and re-activate on the next insert into the container.
    pub fn undelegate(&mut self, parent: ViewId, container: &str) -> Result<(), ViewError> {
        let slot = self.views.get_mut(parent).ok_or(ViewError::UnknownParent)?;
        for delegate in &mut slot.delegates {
            if delegate.container == container {
                delegate.active = false;
            }
        }
        Ok(())
    }

    fn redelegate(&mut self, parent: ViewId, container: &str) {
        if let Some(slot) = self.views.get_mut(parent) {
            for delegate in &mut slot.delegates {
                if delegate.container == container {
                    delegate.active = true;
                }
            }
        }
    }

    /// Emit an event from a child view; it routes to the active bindings of
    /// the view's current parent, scoped to the container the child
    /// occupies. Returns the number of handlers invoked.
    pub fn emit(&self, source: ViewId, event: &str, payload: Rc<dyn Any>) -> usize {
        let Some((pid, cname)) = self.views.get(source).and_then(|slot| slot.parent.clone()) else {
            return 0;
        };
        let handlers: Vec<DelegateHandler> = match self.views.get(pid) {
            Some(pslot) => pslot
                .delegates
                .iter()
                .filter(|d| d.matches(&cname, event))
                .map(|d| Rc::clone(&d.handler))
                .collect(),
            None => return 0,
        };
        let ev = EntityEvent {
            name: event.to_owned(),
            source,
            payload,
        };
        let count = handlers.len();
        for handler in handlers {
            handler(&ev);
        }
        count
    }
}

impl Default for ViewHost {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Panel {
        label: String,
    }

    impl Panel {
        fn boxed(label: &str) -> Box<dyn View> {
            Box::new(Panel {
                label: label.to_owned(),
            })
        }
    }

    impl View for Panel {
        fn type_name(&self) -> &str {
            "Panel"
        }

        fn render(&self) -> String {
            format!("<div>{}</div>", self.label)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn host_with(labels: &[&str]) -> (ViewHost, Vec<ViewId>) {
        let mut host = ViewHost::new();
        let opts = ViewOptions::new();
        let ids = labels
            .iter()
            .map(|l| host.build_view(&opts, |_| Panel::boxed(l)))
            .collect();
        (host, ids)
    }

    // -----------------------------------------------------------------------
    // Construction and lifecycle
    // -----------------------------------------------------------------------

    #[test]
    fn build_view_starts_unrendered() {
        let (host, ids) = host_with(&["a"]);
        assert!(host.contains(ids[0]));
        assert!(!host.rendered(ids[0]));
        assert!(!host.attached(ids[0]));
        assert!(!host.is_waiting(ids[0]));
    }

    #[test]
    fn render_creates_element_once() {
        let (mut host, ids) = host_with(&["a"]);
        let el1 = host.render_view(ids[0]).unwrap();
        let el2 = host.render_view(ids[0]).unwrap();
        assert_eq!(el1, el2);
        assert!(host.rendered(ids[0]));
        assert_eq!(host.markup(ids[0]), Some("<div>a</div>"));
    }

    #[test]
    fn attach_renders_if_needed() {
        let (mut host, ids) = host_with(&["a"]);
        host.attach_view(ids[0]).unwrap();
        assert!(host.rendered(ids[0]));
        assert!(host.attached(ids[0]));
        let el = host.element(ids[0]).unwrap();
        assert_eq!(host.document().attached_view(el), Some(ids[0]));
    }

    #[test]
    fn detach_is_reattachable() {
        let (mut host, ids) = host_with(&["a"]);
        host.attach_view(ids[0]).unwrap();
        host.detach_view(ids[0]).unwrap();
        assert!(!host.attached(ids[0]));
        assert!(host.rendered(ids[0]));
        host.attach_view(ids[0]).unwrap();
        assert!(host.attached(ids[0]));
    }

    #[test]
    fn attach_evicts_stale_view_on_shared_element() {
        let (mut host, ids) = host_with(&["a", "b"]);
        let el = host.render_view(ids[0]).unwrap();
        host.attach_view(ids[0]).unwrap();
        // Force the second view onto the first view's element.
        host.views.get_mut(ids[1]).unwrap().element = Some(el);
        host.attach_view(ids[1]).unwrap();
        assert!(!host.attached(ids[0]));
        assert!(host.attached(ids[1]));
    }

    #[test]
    fn dispose_removes_view_and_element() {
        let (mut host, ids) = host_with(&["a"]);
        host.attach_view(ids[0]).unwrap();
        assert!(host.dispose_view(ids[0]));
        assert!(!host.contains(ids[0]));
        assert!(host.document().is_empty());
        assert!(!host.dispose_view(ids[0]));
    }

    #[test]
    fn dispose_cascades_through_containers() {
        let (mut host, ids) = host_with(&["root", "child", "grandchild"]);
        host.append_view(ids[0], ids[1], "#main").unwrap();
        host.append_view(ids[1], ids[2], "#inner").unwrap();
        host.dispose_view(ids[0]);
        assert!(!host.contains(ids[0]));
        assert!(!host.contains(ids[1]));
        assert!(!host.contains(ids[2]));
    }

    #[test]
    fn dispose_leaves_parent_container_list() {
        let (mut host, ids) = host_with(&["root", "a", "b"]);
        host.append_view(ids[0], ids[1], "#c").unwrap();
        host.append_view(ids[0], ids[2], "#c").unwrap();
        host.dispose_view(ids[1]);
        assert_eq!(host.get_views(ids[0], "#c"), vec![ids[2]]);
    }

    // -----------------------------------------------------------------------
    // Container primitives
    // -----------------------------------------------------------------------

    #[test]
    fn get_views_returns_copy() {
        let (mut host, ids) = host_with(&["root", "a"]);
        host.append_view(ids[0], ids[1], "#c").unwrap();
        let mut copy = host.get_views(ids[0], "#c");
        copy.clear();
        assert_eq!(host.get_views_count(ids[0], "#c"), 1);
    }

    #[test]
    fn insert_appends_by_default() {
        let (mut host, ids) = host_with(&["root", "a", "b"]);
        host.append_view(ids[0], ids[1], "#c").unwrap();
        host.append_view(ids[0], ids[2], "#c").unwrap();
        assert_eq!(host.get_views(ids[0], "#c"), vec![ids[1], ids[2]]);
        assert_eq!(host.parent(ids[1]), Some(ids[0]));
        assert_eq!(host.container(ids[1]).as_deref(), Some("#c"));
    }

    #[test]
    fn insert_positional() {
        let (mut host, ids) = host_with(&["root", "a", "b", "x"]);
        host.append_view(ids[0], ids[1], "#c").unwrap();
        host.append_view(ids[0], ids[2], "#c").unwrap();
        host.insert_view(ids[0], ids[3], "#c", 1).unwrap();
        assert_eq!(host.get_views(ids[0], "#c"), vec![ids[1], ids[3], ids[2]]);
    }

    #[test]
    fn insert_clamps_out_of_range_index() {
        let (mut host, ids) = host_with(&["root", "a"]);
        host.insert_view(ids[0], ids[1], "#c", 99).unwrap();
        assert_eq!(host.get_views(ids[0], "#c"), vec![ids[1]]);
    }

    #[test]
    fn insert_unknown_parent_fails() {
        let (mut host, ids) = host_with(&["root", "gone"]);
        let dead = ids[1];
        host.dispose_view(dead);
        assert_eq!(
            host.insert_views(dead, &[ids[0]], "#c", None),
            Err(ViewError::UnknownParent)
        );
    }

    #[test]
    fn ownership_transfer_on_insert() {
        let (mut host, ids) = host_with(&["p1", "p2", "v"]);
        host.append_view(ids[0], ids[2], "#a").unwrap();
        host.append_view(ids[1], ids[2], "#b").unwrap();
        // Never in two containers at once.
        assert!(host.get_views(ids[0], "#a").is_empty());
        assert_eq!(host.get_views(ids[1], "#b"), vec![ids[2]]);
        assert_eq!(host.parent(ids[2]), Some(ids[1]));
    }

    #[test]
    fn insert_remove_round_trip() {
        let (mut host, ids) = host_with(&["root", "a", "v"]);
        host.append_view(ids[0], ids[1], "#c").unwrap();
        let before = host.get_views(ids[0], "#c");

        host.append_view(ids[0], ids[2], "#c").unwrap();
        assert!(host.remove_view(ids[0], ids[2], "#c").unwrap());

        assert_eq!(host.get_views(ids[0], "#c"), before);
        assert_eq!(host.parent(ids[2]), None);
        assert!(host.contains(ids[2])); // removal is not disposal
    }

    #[test]
    fn remove_absent_view_is_silently_skipped() {
        let (mut host, ids) = host_with(&["root", "a", "stranger"]);
        host.append_view(ids[0], ids[1], "#c").unwrap();
        let removed = host
            .remove_views(ids[0], "#c", RemoveTarget::Views(vec![ids[2]]))
            .unwrap();
        assert!(removed.is_empty());
        assert_eq!(host.get_views_count(ids[0], "#c"), 1);
    }

    #[test]
    fn remove_at_index() {
        let (mut host, ids) = host_with(&["root", "a", "b", "c"]);
        for &v in &ids[1..] {
            host.append_view(ids[0], v, "#c").unwrap();
        }
        let removed = host.remove_views(ids[0], "#c", RemoveTarget::At(1)).unwrap();
        assert_eq!(removed, vec![ids[2]]);
        assert_eq!(host.get_views(ids[0], "#c"), vec![ids[1], ids[3]]);
    }

    #[test]
    fn remove_all() {
        let (mut host, ids) = host_with(&["root", "a", "b"]);
        host.append_view(ids[0], ids[1], "#c").unwrap();
        host.append_view(ids[0], ids[2], "#c").unwrap();
        let removed = host.remove_views(ids[0], "#c", RemoveTarget::All).unwrap();
        assert_eq!(removed, vec![ids[1], ids[2]]);
        assert_eq!(host.get_views_count(ids[0], "#c"), 0);
    }

    #[test]
    fn remove_multiple_keeps_indices_valid() {
        let (mut host, ids) = host_with(&["root", "a", "b", "c", "d"]);
        for &v in &ids[1..] {
            host.append_view(ids[0], v, "#c").unwrap();
        }
        // Duplicates in the target list must not double-remove.
        let removed = host
            .remove_views(
                ids[0],
                "#c",
                RemoveTarget::Views(vec![ids[1], ids[3], ids[1]]),
            )
            .unwrap();
        assert_eq!(removed, vec![ids[1], ids[3]]);
        assert_eq!(host.get_views(ids[0], "#c"), vec![ids[2], ids[4]]);
    }

    #[test]
    fn set_views_replace_all() {
        let (mut host, ids) = host_with(&["root", "a", "b", "x"]);
        host.append_view(ids[0], ids[1], "#c").unwrap();
        host.append_view(ids[0], ids[2], "#c").unwrap();
        host.set_views(ids[0], &[ids[3]], "#c", None).unwrap();
        assert_eq!(host.get_views(ids[0], "#c"), vec![ids[3]]);
        // Old occupants were disposed, not just removed.
        assert!(!host.contains(ids[1]));
        assert!(!host.contains(ids[2]));
    }

    #[test]
    fn set_views_positional_replace() {
        let (mut host, ids) = host_with(&["root", "a", "b", "c", "x"]);
        for &v in &ids[1..4] {
            host.append_view(ids[0], v, "#c").unwrap();
        }
        host.set_view(ids[0], ids[4], "#c", Some(1)).unwrap();
        assert_eq!(host.get_views(ids[0], "#c"), vec![ids[1], ids[4], ids[3]]);
        // Only B was disposed.
        assert!(host.contains(ids[1]));
        assert!(!host.contains(ids[2]));
        assert!(host.contains(ids[3]));
    }

    #[test]
    fn set_views_identical_is_noop() {
        let (mut host, ids) = host_with(&["root", "a"]);
        host.append_view(ids[0], ids[1], "#c").unwrap();
        host.set_views(ids[0], &[ids[1]], "#c", None).unwrap();
        // The occupant survived: no dispose/reinsert churn.
        assert!(host.contains(ids[1]));
        assert_eq!(host.get_views(ids[0], "#c"), vec![ids[1]]);
    }

    // -----------------------------------------------------------------------
    // Waiting
    // -----------------------------------------------------------------------

    #[test]
    fn waits_registered_during_construction() {
        let mut host = ViewHost::new();
        let opts = ViewOptions::new();
        let mut tokens = Vec::new();
        let id = host.build_view(&opts, |ctx| {
            tokens.push(ctx.wait());
            tokens.push(ctx.wait());
            Panel::boxed("w")
        });
        assert!(host.is_waiting(id));
        assert_eq!(host.pending_waits(id), 2);

        assert_eq!(host.note_resolved(id), Ok(false));
        assert_eq!(host.note_resolved(id), Ok(true));
        assert!(!host.is_waiting(id));
        assert_eq!(host.note_resolved(id), Err(WaitError::NotWaiting));
    }

    #[test]
    fn resolve_on_disposed_view_fails() {
        let (mut host, ids) = host_with(&["a"]);
        host.dispose_view(ids[0]);
        assert_eq!(host.note_resolved(ids[0]), Err(WaitError::UnknownView));
    }

    // -----------------------------------------------------------------------
    // Entity events and delegation
    // -----------------------------------------------------------------------

    #[test]
    fn listen_to_tracks_and_stop_releases() {
        let (mut host, ids) = host_with(&["a"]);
        let entity = Entity::new();
        host.listen_to(ids[0], &entity, "change", |_| {}).unwrap();
        assert_eq!(entity.listener_count(), 1);
        host.stop_listening(ids[0]);
        assert_eq!(entity.listener_count(), 0);
    }

    #[test]
    fn remove_views_stops_subscriptions() {
        let (mut host, ids) = host_with(&["root", "child"]);
        let entity = Entity::new();
        host.append_view(ids[0], ids[1], "#c").unwrap();
        host.listen_to(ids[1], &entity, "change", |_| {}).unwrap();
        host.remove_view(ids[0], ids[1], "#c").unwrap();
        assert_eq!(entity.listener_count(), 0);
    }

    #[test]
    fn emit_routes_to_parent_container_bindings() {
        let (mut host, ids) = host_with(&["root", "child"]);
        let hits = Rc::new(Cell::new(0));
        let hits_c = Rc::clone(&hits);
        host.delegate(ids[0], "#c", "selected", move |ev| {
            assert_eq!(ev.name, "selected");
            hits_c.set(hits_c.get() + 1);
        })
        .unwrap();

        host.append_view(ids[0], ids[1], "#c").unwrap();
        assert_eq!(host.emit(ids[1], "selected", Rc::new(())), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn emit_is_scoped_to_the_current_container() {
        let (mut host, ids) = host_with(&["root", "child"]);
        host.delegate(ids[0], "#other", "selected", |_| {}).unwrap();
        host.append_view(ids[0], ids[1], "#c").unwrap();
        assert_eq!(host.emit(ids[1], "selected", Rc::new(())), 0);
    }

    #[test]
    fn undelegate_silences_until_reinsert() {
        let (mut host, ids) = host_with(&["root", "child"]);
        host.delegate(ids[0], "#c", "ping", |_| {}).unwrap();
        host.append_view(ids[0], ids[1], "#c").unwrap();
        host.undelegate(ids[0], "#c").unwrap();
        assert_eq!(host.emit(ids[1], "ping", Rc::new(())), 0);

        // Re-inserting into the container re-activates delegation.
        host.append_view(ids[0], ids[1], "#c").unwrap();
        assert_eq!(host.emit(ids[1], "ping", Rc::new(())), 1);
    }

    #[test]
    fn emit_without_parent_is_zero() {
        let (host, ids) = host_with(&["lonely"]);
        assert_eq!(host.emit(ids[0], "x", Rc::new(())), 0);
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    struct Counter {
        count: i32,
    }

    impl View for Counter {
        fn type_name(&self) -> &str {
            "Counter"
        }

        fn render(&self) -> String {
            format!("<b>{}</b>", self.count)
        }

        fn update(&mut self, options: &ViewOptions) -> bool {
            match options.get::<i32>("count") {
                Some(&count) if count != self.count => {
                    self.count = count;
                    true
                }
                _ => false,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn update_rerenders_in_place() {
        let mut host = ViewHost::new();
        let opts = ViewOptions::new();
        let id = host.build_view(&opts, |_| Box::new(Counter { count: 1 }));
        let el = host.render_view(id).unwrap();
        assert_eq!(host.markup(id), Some("<b>1</b>"));

        let changed = host.update_view(id, &ViewOptions::new().with("count", 2_i32)).unwrap();
        assert!(changed);
        assert_eq!(host.markup(id), Some("<b>2</b>"));
        // Same element: identity preserved.
        assert_eq!(host.element(id), Some(el));
    }

    #[test]
    fn update_without_change_keeps_markup() {
        let mut host = ViewHost::new();
        let opts = ViewOptions::new();
        let id = host.build_view(&opts, |_| Box::new(Counter { count: 1 }));
        host.render_view(id).unwrap();
        let changed = host.update_view(id, &ViewOptions::new()).unwrap();
        assert!(!changed);
        assert_eq!(host.markup(id), Some("<b>1</b>"));
    }
}
