//! Per-pass trees: nodes and forest construction.

pub mod builder;
pub mod node;

pub use builder::{build_forest, TreeError};
pub use node::Node;
