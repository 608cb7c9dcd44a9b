//! Opaque data sources: event-emitting attribute bags.
//!
//! [`Entity`] stands in for the models and collections a view binds to. The
//! engine treats them as opaque: all it needs is `on`/`off`/`trigger` so that
//! view subscriptions can be tracked and released when a view is removed.
//! Handles are `Rc`-backed and cheap to clone; everything is single-threaded.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

/// Identifies one registered listener on an [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Handler invoked with the event payload.
pub type EntityHandler = Rc<dyn Fn(&Rc<dyn Any>)>;

struct Listener {
    id: SubscriptionId,
    event: String,
    handler: EntityHandler,
}

struct EntityInner {
    attributes: IndexMap<String, Rc<dyn Any>>,
    listeners: Vec<Listener>,
    next_id: u64,
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A clonable handle to an event-emitting attribute bag.
///
/// Setting an attribute triggers a `"change"` event whose payload is the
/// attribute key, so views can re-derive state from the entities they listen
/// to.
#[derive(Clone)]
pub struct Entity {
    inner: Rc<RefCell<EntityInner>>,
}

impl Entity {
    /// Create an empty entity.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(EntityInner {
                attributes: IndexMap::new(),
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Store an attribute and trigger `"change"` with the key as payload.
    pub fn set<T: 'static>(&self, key: impl Into<String>, value: T) {
        let key = key.into();
        self.inner
            .borrow_mut()
            .attributes
            .insert(key.clone(), Rc::new(value));
        self.trigger("change", Rc::new(key));
    }

    /// Read an attribute as a shared value.
    pub fn get(&self, key: &str) -> Option<Rc<dyn Any>> {
        self.inner.borrow().attributes.get(key).cloned()
    }

    /// Typed read of an attribute.
    pub fn get_as<T: 'static>(&self, key: &str) -> Option<Rc<T>> {
        self.get(key)?.downcast::<T>().ok()
    }

    /// Register a listener for `event`. Returns an id for [`off`](Self::off).
    pub fn on(&self, event: impl Into<String>, handler: impl Fn(&Rc<dyn Any>) + 'static) -> SubscriptionId {
        let mut inner = self.inner.borrow_mut();
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push(Listener {
            id,
            event: event.into(),
            handler: Rc::new(handler),
        });
        id
    }

    /// Remove a listener. Returns whether it was present.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|l| l.id != id);
        inner.listeners.len() != before
    }

    /// Fire `event`, invoking every matching listener with `payload`.
    ///
    /// Handlers run after the internal borrow is released, so a handler may
    /// freely call back into this entity.
    pub fn trigger(&self, event: &str, payload: Rc<dyn Any>) {
        let handlers: Vec<EntityHandler> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|l| l.event == event)
            .map(|l| Rc::clone(&l.handler))
            .collect();
        for handler in handlers {
            handler(&payload);
        }
    }

    /// Total number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// A weak handle for subscription bookkeeping.
    pub fn downgrade(&self) -> WeakEntity {
        WeakEntity {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Entity")
            .field("attributes", &inner.attributes.keys().collect::<Vec<_>>())
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// WeakEntity
// ---------------------------------------------------------------------------

/// Weak counterpart of [`Entity`], held by view slots so that tracked
/// subscriptions do not keep a dead entity alive.
#[derive(Clone)]
pub struct WeakEntity {
    inner: Weak<RefCell<EntityInner>>,
}

impl WeakEntity {
    /// Upgrade back to a strong handle, if the entity is still alive.
    pub fn upgrade(&self) -> Option<Entity> {
        self.inner.upgrade().map(|inner| Entity { inner })
    }

    /// Remove a listener through the weak handle. No-op on a dead entity.
    pub(crate) fn off(&self, id: SubscriptionId) {
        if let Some(entity) = self.upgrade() {
            entity.off(id);
        }
    }
}

impl std::fmt::Debug for WeakEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WeakEntity")
    }
}
