//! Counter-backed completion: waiting views and subtree joins.
//!
//! Two primitives live here. [`ViewCtx`] is the construction-time context a
//! view factory receives; calling [`wait`](ViewCtx::wait) registers one
//! pending asynchronous unit and yields a [`WaitToken`] to hand to whatever
//! will later complete it via
//! [`Reconciler::resolve`](crate::reconciler::Reconciler::resolve). The view
//! resolves when every outstanding token has fired, in any order — a
//! counter join, not a one-shot.
//!
//! [`Completion`] is the same idea for the reconciler's own bookkeeping: a
//! decrement-to-zero counter with an "all done" callback, used for per-node
//! subtree joins and the per-pass completion callback.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::ViewId;
use crate::options::ViewOptions;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures while resolving a wait unit.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WaitError {
    /// The token's view no longer exists.
    #[error("cannot resolve wait: view no longer exists")]
    UnknownView,
    /// The view has no outstanding wait units.
    #[error("cannot resolve wait: view is not waiting")]
    NotWaiting,
}

// ---------------------------------------------------------------------------
// ViewCtx / WaitToken
// ---------------------------------------------------------------------------

/// Construction context passed to a view factory.
///
/// This is the only place waits can be registered: the context exists for
/// the duration of the factory call, so "wait() outside the construction
/// window" is unrepresentable.
pub struct ViewCtx<'a> {
    view: ViewId,
    options: &'a ViewOptions,
    pending: u32,
}

impl<'a> ViewCtx<'a> {
    pub(crate) fn new(view: ViewId, options: &'a ViewOptions) -> Self {
        Self {
            view,
            options,
            pending: 0,
        }
    }

    /// The id the view under construction will occupy.
    pub fn id(&self) -> ViewId {
        self.view
    }

    /// The merged construction options for this view.
    pub fn options(&self) -> &ViewOptions {
        self.options
    }

    /// Register one pending asynchronous unit.
    ///
    /// The view will not render or attach until every issued token has been
    /// resolved. Tokens are single-use by move.
    pub fn wait(&mut self) -> WaitToken {
        self.pending += 1;
        WaitToken { view: self.view }
    }

    pub(crate) fn pending(&self) -> u32 {
        self.pending
    }
}

/// One pending wait unit, consumed by
/// [`Reconciler::resolve`](crate::reconciler::Reconciler::resolve).
#[derive(Debug)]
pub struct WaitToken {
    pub(crate) view: ViewId,
}

impl WaitToken {
    /// The waiting view this token belongs to.
    pub fn view(&self) -> ViewId {
        self.view
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

struct CompletionInner {
    remaining: Cell<usize>,
    on_done: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// A decrement-to-zero join handle.
///
/// Seeded with a unit count; [`done`](Completion::done) marks one unit
/// finished, and the callback fires exactly once when the count reaches
/// zero. A count of zero fires immediately. Clones share the same counter.
#[derive(Clone)]
pub struct Completion {
    inner: Rc<CompletionInner>,
}

impl Completion {
    /// Create a join over `count` units.
    pub fn new(count: usize, on_done: impl FnOnce() + 'static) -> Self {
        if count == 0 {
            on_done();
            return Self {
                inner: Rc::new(CompletionInner {
                    remaining: Cell::new(0),
                    on_done: RefCell::new(None),
                }),
            };
        }
        Self {
            inner: Rc::new(CompletionInner {
                remaining: Cell::new(count),
                on_done: RefCell::new(Some(Box::new(on_done))),
            }),
        }
    }

    /// Mark one unit done. Past zero this is a no-op.
    pub fn done(&self) {
        let remaining = self.inner.remaining.get();
        if remaining == 0 {
            return;
        }
        self.inner.remaining.set(remaining - 1);
        if remaining == 1 {
            if let Some(callback) = self.inner.on_done.borrow_mut().take() {
                callback();
            }
        }
    }

    /// Whether every unit has completed.
    pub fn is_settled(&self) -> bool {
        self.inner.remaining.get() == 0
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("remaining", &self.inner.remaining.get())
            .finish()
    }
}
