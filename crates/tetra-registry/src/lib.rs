//! Catalog of builtin type tables and host modules for Tetra.

mod builtins;
mod core_module;
mod module;
mod registry;

pub use builtins::builtin_catalog;
pub use core_module::{CORE_MODULE, core_module};
pub use module::{NativeFunction, RegistryConstant, RegistryModule};
pub use registry::TypeRegistry;
