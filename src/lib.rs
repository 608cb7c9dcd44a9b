//! # trellis
//!
//! A component-tree reconciliation engine for declarative view hierarchies.
//!
//! Components are registered by name with a parent, a container slot, and a
//! view factory. Loading a set of names builds a forest from the declared
//! parent links and reconciles it against the previously applied forest:
//! views whose type and state are unchanged are reused in place (preserving
//! element identity and nested event subscriptions), everything else is
//! constructed, rendered, attached — or torn down when it drops out of the
//! active set. Views may declare asynchronous dependencies at construction
//! time and are spliced in only once every dependency has resolved.
//!
//! ## Core Systems
//!
//! - **[`component`]** — Component descriptors and the validated registry
//! - **[`tree`]** — Per-pass forest construction from parent/child links
//! - **[`reconciler`]** — The diff-and-apply pass, waiting views, completion joins
//! - **[`view`]** — View trait, the owning host arena, container primitives
//! - **[`dom`]** — Element arena with the attached-view identity index
//! - **[`event`]** — Opaque entities and container-scoped event delegation
//! - **[`options`]** — Option bags with explicit merge precedence
//!
//! ## Example
//!
//! ```
//! use trellis::component::Descriptor;
//! use trellis::reconciler::Reconciler;
//! use trellis::view::View;
//! use std::any::Any;
//!
//! struct Layout;
//!
//! impl View for Layout {
//!     fn type_name(&self) -> &str { "Layout" }
//!     fn render(&self) -> String { "<main/>".into() }
//!     fn state_changed(&self) -> bool { false }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//!
//! struct Content;
//!
//! impl View for Content {
//!     fn type_name(&self) -> &str { "Content" }
//!     fn render(&self) -> String { "<article/>".into() }
//!     fn state_changed(&self) -> bool { false }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//!
//! let mut reconciler = Reconciler::new();
//! reconciler.registry_mut()
//!     .add(Descriptor::new("layout").root().view::<Layout, _>(|_| Layout))
//!     .unwrap();
//! reconciler.registry_mut()
//!     .add(Descriptor::new("content")
//!         .parent("layout")
//!         .container("#main")
//!         .view::<Content, _>(|_| Content))
//!     .unwrap();
//!
//! reconciler.load("content").unwrap();
//! let layout = reconciler.tree()[0].view().unwrap();
//! assert_eq!(reconciler.host().get_views_count(layout, "#main"), 1);
//! ```

// Foundation
pub mod options;

// Core systems
pub mod dom;
pub mod event;
pub mod view;

// Declarations and trees
pub mod component;
pub mod tree;

// The engine
pub mod reconciler;

pub use component::{Component, Descriptor, ParentSpec, Registry, RegistryError};
pub use options::ViewOptions;
pub use reconciler::{LoadError, LoadOptions, NameList, Reconciler};
pub use tree::{build_forest, Node, TreeError};
pub use view::{RemoveTarget, View, ViewCtx, ViewError, ViewHost, ViewId, WaitToken};
