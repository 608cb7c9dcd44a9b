//! Component declarations: descriptors and the registry.

pub mod descriptor;
pub mod registry;

pub use descriptor::{Component, Descriptor, ParentSpec, ViewFactory};
pub use registry::{Registry, RegistryError};
