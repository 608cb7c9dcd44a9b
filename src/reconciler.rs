//! Tree reconciliation: diff a requested forest against the applied one.
//!
//! One [`load`](Reconciler::load) call is one pass: build the forest for the
//! requested names, walk it in parallel with the previously applied forest,
//! and per node either reuse the live view (carrying it forward and feeding
//! it the pass options) or construct a replacement and splice it into its
//! parent's container. Pairing is positional — a new node is compared to the
//! old node at the same index of the same parent — so reordering children
//! defeats reuse by design.
//!
//! Views that register waits during construction park the rest of their
//! apply; [`resolve`](Reconciler::resolve) resumes each parked subtree
//! independently when its view's counter reaches zero. Completion is tracked
//! with decrement-to-zero joins, so a pass callback fires only after every
//! subtree — including parked ones — has finished.
//!
//! Errors abort the running call and propagate; whatever was applied before
//! the failure stays applied. There is no rollback and no cancellation of
//! parked applies.

use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::component::Registry;
use crate::options::ViewOptions;
use crate::tree::{build_forest, Node, TreeError};
use crate::view::{Completion, ViewError, ViewHost, ViewId, WaitError, WaitToken};

// ---------------------------------------------------------------------------
// Errors and inputs
// ---------------------------------------------------------------------------

/// Failures surfacing from a reconciliation pass.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LoadError {
    /// `reload` was called before any successful `load`.
    #[error("no current names to reload")]
    NoNames,
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Wait(#[from] WaitError),
}

/// Component names accepted by the `load` family; converts from a single
/// name or any common list shape.
#[derive(Debug, Clone, Default)]
pub struct NameList(pub Vec<String>);

impl From<&str> for NameList {
    fn from(name: &str) -> Self {
        Self(vec![name.to_owned()])
    }
}

impl From<String> for NameList {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for NameList {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for NameList {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for NameList {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|n| (*n).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for NameList {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|n| (*n).to_owned()).collect())
    }
}

/// Per-pass options.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Caller-supplied view options, merged over component data and
    /// component-level options on construction and handed to
    /// [`View::update`](crate::view::View::update) on reuse.
    pub view_options: ViewOptions,
}

impl LoadOptions {
    /// Create empty pass options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one pass-level view option (builder).
    pub fn option<T: 'static>(mut self, key: impl Into<String>, value: T) -> Self {
        self.view_options.insert(key, value);
        self
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

struct PendingApply {
    /// The parked subtree, with its (unapplied) children taken out of the
    /// installed tree.
    node: Node,
    /// Position within the pass's forest, for write-back on resume.
    path: Vec<usize>,
    parent_view: Option<ViewId>,
    view_options: ViewOptions,
    /// The pass that parked this node; write-back is skipped when a newer
    /// pass has replaced the forest.
    pass: u64,
    done: Completion,
}

/// The reconciliation engine: owns the registry, the view host, and the
/// currently applied forest.
pub struct Reconciler {
    registry: Registry,
    host: ViewHost,
    tree: Vec<Node>,
    current_names: Vec<String>,
    pending: HashMap<ViewId, PendingApply>,
    passes: u64,
}

impl Reconciler {
    /// Create a reconciler with an empty registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create a reconciler around an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            host: ViewHost::new(),
            tree: Vec::new(),
            current_names: Vec::new(),
            pending: HashMap::new(),
            passes: 0,
        }
    }

    // -- accessors ----------------------------------------------------------

    /// The component registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access to the component registry.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// The view host.
    pub fn host(&self) -> &ViewHost {
        &self.host
    }

    /// Mutable access to the view host.
    pub fn host_mut(&mut self) -> &mut ViewHost {
        &mut self.host
    }

    /// The currently applied forest (the most recent pass's root nodes).
    pub fn tree(&self) -> &[Node] {
        &self.tree
    }

    /// The last successfully loaded names.
    pub fn current_names(&self) -> &[String] {
        &self.current_names
    }

    /// Number of parked applies awaiting resolution.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    // -- entry points -------------------------------------------------------

    /// Load a set of component names.
    pub fn load(&mut self, names: impl Into<NameList>) -> Result<(), LoadError> {
        self.load_with(names, LoadOptions::default())
    }

    /// Load with per-pass options.
    pub fn load_with(&mut self, names: impl Into<NameList>, options: LoadOptions) -> Result<(), LoadError> {
        self.run_pass(names.into().0, options, || {})
    }

    /// Load with per-pass options and a completion callback, invoked once
    /// after every node in the pass — including parked subtrees — has been
    /// fully applied.
    pub fn load_then(
        &mut self,
        names: impl Into<NameList>,
        options: LoadOptions,
        done: impl FnOnce() + 'static,
    ) -> Result<(), LoadError> {
        self.run_pass(names.into().0, options, done)
    }

    /// Re-apply the current names: the parameterless refresh.
    pub fn reload(&mut self) -> Result<(), LoadError> {
        self.reload_with(LoadOptions::default())
    }

    /// Refresh with per-pass options.
    pub fn reload_with(&mut self, options: LoadOptions) -> Result<(), LoadError> {
        self.reload_then(options, || {})
    }

    /// Refresh with per-pass options and a completion callback.
    pub fn reload_then(
        &mut self,
        options: LoadOptions,
        done: impl FnOnce() + 'static,
    ) -> Result<(), LoadError> {
        if self.current_names.is_empty() {
            return Err(LoadError::NoNames);
        }
        let names = self.current_names.clone();
        self.run_pass(names, options, done)
    }

    /// Mark one wait unit of a waiting view done.
    ///
    /// When the view's counter reaches zero its parked apply resumes:
    /// splice, render, attach, then its children — independently of any
    /// other waiting sibling.
    pub fn resolve(&mut self, token: WaitToken) -> Result<(), LoadError> {
        let view = token.view;
        let ready = self.host.note_resolved(view)?;
        if !ready {
            return Ok(());
        }
        let Some(parked) = self.pending.remove(&view) else {
            trace!(?view, "resolved view had no parked apply");
            return Ok(());
        };
        self.resume(parked)
    }

    // -- the pass -----------------------------------------------------------

    fn run_pass(
        &mut self,
        names: Vec<String>,
        options: LoadOptions,
        done: impl FnOnce() + 'static,
    ) -> Result<(), LoadError> {
        self.passes += 1;
        debug!(pass = self.passes, ?names, "reconciliation pass");
        let mut new = build_forest(&self.registry, &names)?;
        let old = std::mem::take(&mut self.tree);
        let join = Completion::new(new.len(), done);
        let result = self.apply_children(&mut new, old, None, &options.view_options, &join, &[]);
        // Install even on failure: a pass that errors partway leaves a
        // visibly half-applied forest, it does not roll back.
        self.tree = new;
        if result.is_ok() {
            self.current_names = names;
        }
        result
    }

    fn apply_children(
        &mut self,
        new: &mut [Node],
        old: Vec<Node>,
        parent_view: Option<ViewId>,
        options: &ViewOptions,
        join: &Completion,
        base_path: &[usize],
    ) -> Result<(), LoadError> {
        let mut old: Vec<Option<Node>> = old.into_iter().map(Some).collect();
        for (index, child) in new.iter_mut().enumerate() {
            let old_node = old.get_mut(index).and_then(Option::take);
            let mut path = base_path.to_vec();
            path.push(index);
            self.apply_node(child, old_node, parent_view, options, join.clone(), path)?;
        }
        // Old occupants beyond the new list's length are torn down.
        for leftover in old.into_iter().flatten() {
            self.teardown(leftover);
        }
        Ok(())
    }

    fn apply_node(
        &mut self,
        node: &mut Node,
        old: Option<Node>,
        parent_view: Option<ViewId>,
        options: &ViewOptions,
        done: Completion,
        path: Vec<usize>,
    ) -> Result<(), LoadError> {
        if old.as_ref().is_some_and(|o| self.can_reuse(o, node)) {
            let old = old.expect("reusable node has an old side");
            let view = old.view.expect("reusable node has a view");
            trace!(name = node.name(), "unchanged; reusing view");
            node.view = Some(view);
            self.host.update_view(view, options)?;
            let join = Completion::new(node.children.len(), move || done.done());
            return self.apply_children(&mut node.children, old.children, Some(view), options, &join, &path);
        }

        debug!(name = node.name(), view = node.component.type_label(), "changed; constructing view");
        if let Some(old_node) = &old {
            if let Some(old_view) = old_node.view {
                if self.host.contains(old_view) {
                    let old_container = old_node.component.container();
                    let new_container = node.component.container();
                    if old_container.is_some() {
                        if old_container != new_container {
                            // Different slot: the old view is fully removed.
                            self.host.dispose_view(old_view);
                        }
                        // Same slot: left in place, replaced by the splice
                        // below.
                    } else {
                        // Standalone view: detached, not removed.
                        self.host.detach_view(old_view)?;
                    }
                }
            }
        }

        let merged = node.component.merged_options(options);
        let factory = Rc::clone(&node.component.factory);
        let view = self.host.build_view(&merged, |ctx| factory(ctx));
        node.view = Some(view);

        if self.host.is_waiting(view) {
            debug!(
                name = node.name(),
                waits = self.host.pending_waits(view),
                "view waiting; apply parked"
            );
            let parked = Node {
                component: node.component.clone(),
                children: std::mem::take(&mut node.children),
                view: Some(view),
            };
            self.pending.insert(
                view,
                PendingApply {
                    node: parked,
                    path,
                    parent_view,
                    view_options: options.clone(),
                    pass: self.passes,
                    done,
                },
            );
            return Ok(());
        }
        self.finish_apply(node, parent_view, options, done, &path)
    }

    /// Splice, render, attach, then apply children as all-new.
    fn finish_apply(
        &mut self,
        node: &mut Node,
        parent_view: Option<ViewId>,
        options: &ViewOptions,
        done: Completion,
        path: &[usize],
    ) -> Result<(), LoadError> {
        let view = node.view.expect("node being finished has a view");
        if let Some(container) = node.component.container().map(str::to_owned) {
            let Some(parent) = parent_view else {
                return Err(LoadError::View(ViewError::UnknownParent));
            };
            self.host.set_view(parent, view, &container, None)?;
        }
        self.host.render_view(view)?;
        self.host.attach_view(view)?;

        // A freshly constructed node treats its children as entirely new:
        // no reuse crosses a replaced boundary.
        let join = Completion::new(node.children.len(), move || done.done());
        self.apply_children(&mut node.children, Vec::new(), Some(view), options, &join, path)
    }

    fn can_reuse(&self, old: &Node, new: &Node) -> bool {
        if old.component.name() != new.component.name() {
            return false;
        }
        let Some(view) = old.view else {
            return false;
        };
        if !self.host.contains(view) {
            return false;
        }
        self.host.view_type_id(view) == Some(new.component.view_type())
            && !self.host.state_changed(view)
            && self.host.attached(view)
    }

    fn teardown(&mut self, node: Node) {
        match node.view {
            Some(view) if self.host.contains(view) => {
                debug!(name = node.name(), "tearing down view");
                // Disposal cascades through the view's containers, covering
                // the node's descendants.
                self.host.dispose_view(view);
            }
            _ => {
                for child in node.children {
                    self.teardown(child);
                }
            }
        }
    }

    // -- deferred applies ---------------------------------------------------

    fn resume(&mut self, parked: PendingApply) -> Result<(), LoadError> {
        let PendingApply {
            mut node,
            path,
            parent_view,
            view_options,
            pass,
            done,
        } = parked;
        debug!(name = node.name(), "waiting view resolved; resuming apply");

        if let Some(parent) = parent_view {
            if !self.host.contains(parent) {
                // A later pass disposed the parent before this view
                // resolved. Nothing is left to splice into.
                warn!(name = node.name(), "stale resolution: parent view is gone; dropping view");
                if let Some(view) = node.view {
                    self.host.dispose_view(view);
                }
                done.done();
                return Ok(());
            }
        }

        let result = self.finish_apply(&mut node, parent_view, &view_options, done, &path);
        if pass == self.passes {
            self.write_back(&path, node);
        } else {
            // The forest this node belonged to has been replaced. The view
            // was still spliced into its recorded parent — an inherent
            // staleness hazard of uncancellable waits — but the current
            // tree is not rewritten.
            warn!(name = node.name(), "stale resolution: forest replaced since park; skipping tree write-back");
        }
        result
    }

    fn write_back(&mut self, path: &[usize], node: Node) {
        match Self::node_at(&mut self.tree, path) {
            Some(slot) => *slot = node,
            None => warn!(name = node.name(), "parked node's path vanished; skipping tree write-back"),
        }
    }

    fn node_at<'a>(forest: &'a mut [Node], path: &[usize]) -> Option<&'a mut Node> {
        let (&first, rest) = path.split_first()?;
        let mut current = forest.get_mut(first)?;
        for &index in rest {
            current = current.children.get_mut(index)?;
        }
        Some(current)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
