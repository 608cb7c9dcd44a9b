//! The component registry: validated name → component map.
//!
//! Append-only except explicit [`remove`](Registry::remove). Structural
//! invariants are checked at insertion time; a failed `add` leaves the
//! registry untouched. The first root registered becomes the implicit
//! default parent for later descriptors that leave their parent unset.

use indexmap::IndexMap;
use tracing::debug;

use super::descriptor::{Component, Descriptor, ParentSpec};

/// Validation and lookup failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A component with this name is already registered.
    #[error("duplicate component name: {0:?}")]
    DuplicateName(String),
    /// The descriptor declares no view factory.
    #[error("component {0:?} declares no view")]
    MissingView(String),
    /// The parent is unset and no default parent exists.
    #[error("component {0:?} has no parent and no default parent is available")]
    InvalidParent(String),
    /// A root component must not declare a container.
    #[error("root component {0:?} must not declare a container")]
    RootHasContainer(String),
    /// A non-root component must declare a container.
    #[error("component {0:?} has a parent but no container")]
    MissingContainer(String),
    /// The container name is empty.
    #[error("component {0:?} declares an empty container name")]
    InvalidContainer(String),
    /// Lookup of an unregistered name.
    #[error("unknown component: {0:?}")]
    UnknownComponent(String),
}

/// The name → component map.
#[derive(Debug, Default)]
pub struct Registry {
    components: IndexMap<String, Component>,
    default_parent: Option<String>,
    anon: u64,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a descriptor. Returns the stored component.
    ///
    /// On any validation failure the registry is left unchanged.
    pub fn add(&mut self, descriptor: Descriptor) -> Result<&Component, RegistryError> {
        let Descriptor {
            name,
            parent,
            container,
            factory,
            view_type,
            type_label,
            data,
            view_options,
        } = descriptor;

        if let Some(ref name) = name {
            if self.components.contains_key(name) {
                return Err(RegistryError::DuplicateName(name.clone()));
            }
        }
        let label = name.clone().unwrap_or_else(|| "<anonymous>".to_owned());

        let (factory, view_type, type_label) = match (factory, view_type, type_label) {
            (Some(f), Some(t), Some(l)) => (f, t, l),
            _ => return Err(RegistryError::MissingView(label)),
        };

        let parent = match parent {
            ParentSpec::Root => None,
            ParentSpec::Named(p) => Some(p),
            ParentSpec::Unset => match self.default_parent.clone() {
                Some(d) => Some(d),
                None => return Err(RegistryError::InvalidParent(label)),
            },
        };

        match (&parent, &container) {
            (None, Some(_)) => return Err(RegistryError::RootHasContainer(label)),
            (Some(_), None) => return Err(RegistryError::MissingContainer(label)),
            (Some(_), Some(c)) if c.is_empty() => {
                return Err(RegistryError::InvalidContainer(label))
            }
            _ => {}
        }

        let name = name.unwrap_or_else(|| self.synthesize_name());
        let component = Component {
            name: name.clone(),
            parent,
            container,
            factory,
            view_type,
            type_label,
            data,
            view_options,
        };
        if component.parent.is_none() && self.default_parent.is_none() {
            self.default_parent = Some(name.clone());
        }
        debug!(name = %name, parent = ?component.parent, "registered component");
        self.components.insert(name.clone(), component);
        Ok(&self.components[&name])
    }

    /// Look up a component by name.
    pub fn get(&self, name: &str) -> Result<&Component, RegistryError> {
        self.components
            .get(name)
            .ok_or_else(|| RegistryError::UnknownComponent(name.to_owned()))
    }

    /// Delete a component.
    ///
    /// Does not cascade: children declared against this name and views in
    /// the active tree keep their stale references — that cleanup is the
    /// caller's responsibility.
    pub fn remove(&mut self, name: &str) -> Option<Component> {
        let removed = self.components.shift_remove(name);
        if removed.is_some() {
            debug!(name, "removed component");
            if self.default_parent.as_deref() == Some(name) {
                self.default_parent = None;
            }
        }
        removed
    }

    /// Whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// The implicit parent applied to descriptors with an unset parent.
    pub fn default_parent(&self) -> Option<&str> {
        self.default_parent.as_deref()
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn synthesize_name(&mut self) -> String {
        loop {
            self.anon += 1;
            let candidate = format!("component-{}", self.anon);
            if !self.components.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}
