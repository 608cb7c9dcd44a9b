//! View system: trait, owning host arena, waiting gate.

use slotmap::new_key_type;

pub mod host;
pub mod traits;
pub mod waiting;

new_key_type! {
    /// Unique identifier for a live view instance. Copy, lightweight (u64).
    pub struct ViewId;
}

pub use host::{RemoveTarget, ViewError, ViewFlags, ViewHost};
pub use traits::View;
pub use waiting::{Completion, ViewCtx, WaitError, WaitToken};
