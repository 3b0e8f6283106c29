//! Shelf kernel: settings, the module contract, and the module registry.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
