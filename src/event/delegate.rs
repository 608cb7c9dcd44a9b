//! Container-scoped event delegation between parent and child views.
//!
//! A parent view declares interest in events emitted by "whatever views are
//! currently in container X" rather than in specific child instances. The
//! [`ViewHost`](crate::view::ViewHost) routes an emitted event to the active
//! bindings of the emitting view's current parent, so bindings keep working
//! as children are swapped in and out of a container.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::view::ViewId;

/// A routed child-view event.
pub struct EntityEvent {
    /// Event name, e.g. `"selected"`.
    pub name: String,
    /// The view that emitted the event.
    pub source: ViewId,
    /// Opaque payload; downcast with [`EntityEvent::payload_as`].
    pub payload: Rc<dyn Any>,
}

impl EntityEvent {
    /// Typed read of the payload.
    pub fn payload_as<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for EntityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityEvent")
            .field("name", &self.name)
            .field("source", &self.source)
            .finish()
    }
}

/// Handler invoked when a delegated event reaches its parent.
pub type DelegateHandler = Rc<dyn Fn(&EntityEvent)>;

/// One container-scoped binding owned by a parent view.
///
/// Inactive bindings are kept so that re-inserting views into the container
/// can re-activate delegation without re-registering handlers.
#[derive(Clone)]
pub struct Delegate {
    /// Container the binding is scoped to.
    pub container: String,
    /// Event name the binding matches.
    pub event: String,
    /// The handler to invoke.
    pub handler: DelegateHandler,
    /// Whether the binding currently fires.
    pub active: bool,
}

impl Delegate {
    /// Whether this binding matches an event from a child in `container`.
    pub fn matches(&self, container: &str, event: &str) -> bool {
        self.active && self.container == container && self.event == event
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("container", &self.container)
            .field("event", &self.event)
            .field("active", &self.active)
            .finish()
    }
}
