//! Component descriptors: declarative input and the validated stored form.
//!
//! A [`Descriptor`] is what callers build: name, place in the hierarchy,
//! view factory, data bindings. The registry validates it and stores a
//! [`Component`] — the same information with every structural question
//! already answered (name present, parent resolved, factory known).

use std::any::TypeId;
use std::fmt;
use std::rc::Rc;

use crate::options::ViewOptions;
use crate::view::{View, ViewCtx};

/// Factory invoked by the reconciler to construct a component's view.
pub type ViewFactory = Rc<dyn Fn(&mut ViewCtx) -> Box<dyn View>>;

/// Where a component sits in the hierarchy.
///
/// `Unset` is distinct from `Root`: an unset parent is resolved against the
/// registry's default parent (the first root registered), while `Root`
/// explicitly declares a component with no parent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParentSpec {
    /// No declaration; the registry substitutes its default parent.
    #[default]
    Unset,
    /// Explicitly a root component.
    Root,
    /// Child of the named component.
    Named(String),
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Declarative component description, built with chained setters and handed
/// to [`Registry::add`](crate::component::Registry::add).
#[derive(Clone, Default)]
pub struct Descriptor {
    pub(crate) name: Option<String>,
    pub(crate) parent: ParentSpec,
    pub(crate) container: Option<String>,
    pub(crate) factory: Option<ViewFactory>,
    pub(crate) view_type: Option<TypeId>,
    pub(crate) type_label: Option<&'static str>,
    pub(crate) data: ViewOptions,
    pub(crate) view_options: ViewOptions,
}

impl Descriptor {
    /// Start a named descriptor.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Start an unnamed descriptor; the registry synthesizes a unique name.
    pub fn unnamed() -> Self {
        Self::default()
    }

    /// Declare this component a root (builder).
    pub fn root(mut self) -> Self {
        self.parent = ParentSpec::Root;
        self
    }

    /// Declare the parent component (builder).
    pub fn parent(mut self, name: impl Into<String>) -> Self {
        self.parent = ParentSpec::Named(name.into());
        self
    }

    /// Declare the container slot within the parent's view (builder).
    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Declare the view type and its factory (builder).
    ///
    /// The concrete type is captured so the reconciler can check whether a
    /// live view still matches the declaration.
    pub fn view<V, F>(mut self, factory: F) -> Self
    where
        V: View,
        F: Fn(&mut ViewCtx) -> V + 'static,
    {
        self.view_type = Some(TypeId::of::<V>());
        self.type_label = Some(std::any::type_name::<V>());
        self.factory = Some(Rc::new(move |ctx| Box::new(factory(ctx))));
        self
    }

    /// Bind a named data source passed at view construction (builder).
    pub fn data<T: 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.data.insert(key, value);
        self
    }

    /// Set a component-level view option (builder). Overrides `data` on key
    /// collision; overridden in turn by pass-level options.
    pub fn option<T: 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.view_options.insert(key, value);
        self
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("container", &self.container)
            .field("view", &self.type_label)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A validated, stored component declaration.
///
/// Compared to [`Descriptor`], the name is always present, the parent is
/// resolved (`None` = root), and the factory and view type are guaranteed.
#[derive(Clone)]
pub struct Component {
    pub(crate) name: String,
    pub(crate) parent: Option<String>,
    pub(crate) container: Option<String>,
    pub(crate) factory: ViewFactory,
    pub(crate) view_type: TypeId,
    pub(crate) type_label: &'static str,
    pub(crate) data: ViewOptions,
    pub(crate) view_options: ViewOptions,
}

impl Component {
    /// The component's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parent component's name; `None` for a root.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// The container slot this component's view mounts into.
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// The declared concrete view type.
    pub fn view_type(&self) -> TypeId {
        self.view_type
    }

    /// Human-readable view type name for logs.
    pub fn type_label(&self) -> &'static str {
        self.type_label
    }

    /// The declared data-source bindings.
    pub fn data(&self) -> &ViewOptions {
        &self.data
    }

    /// The component-level view options.
    pub fn view_options(&self) -> &ViewOptions {
        &self.view_options
    }

    /// Merge construction options for a pass: data sources first, then
    /// component-level view options, then the caller's pass options — later
    /// layers win on key collision.
    pub fn merged_options(&self, pass: &ViewOptions) -> ViewOptions {
        ViewOptions::merged(&[&self.data, &self.view_options, pass])
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("container", &self.container)
            .field("view", &self.type_label)
            .finish()
    }
}
