//! Event system: opaque entities, subscriptions, container-scoped delegation.

pub mod delegate;
pub mod entity;

pub use delegate::{Delegate, DelegateHandler, EntityEvent};
pub use entity::{Entity, EntityHandler, SubscriptionId, WeakEntity};
