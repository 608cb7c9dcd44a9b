//! View option bags: named values with an explicit merge order.
//!
//! [`ViewOptions`] is the string-keyed bag handed to view factories and to
//! [`View::update`](crate::view::View::update). Values are stored as
//! `Rc<dyn Any>` and read back with a typed [`get`](ViewOptions::get), the
//! same downcast discipline the rest of the crate uses for messages and
//! views. Merging is explicit: later layers override earlier ones on key
//! collision, and [`ViewOptions::merged`] documents the precedence order in
//! one place.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

/// An ordered, string-keyed bag of opaque values.
///
/// Entries keep insertion order, which makes merged bags deterministic and
/// easy to assert against in tests.
#[derive(Clone, Default)]
pub struct ViewOptions {
    entries: IndexMap<String, Rc<dyn Any>>,
}

impl ViewOptions {
    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous entry under the same key.
    pub fn insert<T: 'static>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Rc::new(value));
    }

    /// Insert an already-shared value.
    pub fn insert_rc(&mut self, key: impl Into<String>, value: Rc<dyn Any>) {
        self.entries.insert(key.into(), value);
    }

    /// Insert a value (builder).
    pub fn with<T: 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Typed read of an entry. Returns `None` if the key is absent or the
    /// stored value has a different type.
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.entries.get(key)?.downcast_ref::<T>()
    }

    /// Raw read of an entry.
    pub fn get_raw(&self, key: &str) -> Option<&Rc<dyn Any>> {
        self.entries.get(key)
    }

    /// Whether the bag has an entry under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Overlay `other` onto `self`: entries in `other` win on collision.
    pub fn merge(&mut self, other: &ViewOptions) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), Rc::clone(value));
        }
    }

    /// Merge `layers` lowest-precedence first: a key in a later layer
    /// overrides the same key in an earlier one.
    ///
    /// The reconciler calls this with
    /// `[component data, component view options, pass options]`.
    pub fn merged(layers: &[&ViewOptions]) -> ViewOptions {
        let mut result = ViewOptions::new();
        for layer in layers {
            result.merge(layer);
        }
        result
    }
}

impl fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
