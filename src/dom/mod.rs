//! Element arena: rendered markup plus the attached-view identity index.
//!
//! This is the crate's stand-in for the low-level DOM layer: an element is a
//! slab of rendered markup with a back-pointer to the view currently attached
//! to it. The [`Document`] is the identity index — attaching a view to an
//! element evicts whichever view was attached before, which is how stale
//! attachments are detected.

pub mod document;
pub mod element;

pub use document::Document;
pub use element::{Element, ElementId};
