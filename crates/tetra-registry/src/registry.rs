//! TypeRegistry - the explicit catalog of builtin types and host modules.
//!
//! A registry is built once at startup, then borrowed by every compilation
//! context. It is never a process-wide singleton: two engines can run with
//! different catalogs side by side.
//!
//! ```
//! use tetra_registry::TypeRegistry;
//!
//! let registry = TypeRegistry::with_core().unwrap();
//! assert!(registry.module("core").is_some());
//! ```

use std::sync::Arc;

use rustc_hash::FxHashMap;

use tetra_core::{BuiltinCatalog, RegistrationError};

use crate::builtins::builtin_catalog;
use crate::core_module::core_module;
use crate::RegistryModule;

pub struct TypeRegistry {
    builtins: BuiltinCatalog,
    modules: FxHashMap<Arc<str>, RegistryModule>,
}

impl TypeRegistry {
    /// Builtin tables only, no host modules.
    pub fn new() -> Result<Self, RegistrationError> {
        Ok(Self {
            builtins: builtin_catalog()?,
            modules: FxHashMap::default(),
        })
    }

    /// Builtin tables plus the `core` module.
    pub fn with_core() -> Result<Self, RegistrationError> {
        let mut registry = Self::new()?;
        registry.add_module(core_module()?)?;
        Ok(registry)
    }

    pub fn builtins(&self) -> &BuiltinCatalog {
        &self.builtins
    }

    pub fn add_module(&mut self, module: RegistryModule) -> Result<(), RegistrationError> {
        if self.modules.contains_key(module.name()) {
            return Err(RegistrationError::DuplicateModule(module.name().to_string()));
        }
        log::debug!("registered host module '{}'", module.name());
        self.modules.insert(Arc::from(module.name()), module);
        Ok(())
    }

    pub fn module(&self, name: &str) -> Option<&RegistryModule> {
        self.modules.get(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &RegistryModule> {
        self.modules.values()
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.modules.keys().map(|k| &**k).collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("modules", &names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_module_rejected() {
        let mut registry = TypeRegistry::with_core().unwrap();
        assert_eq!(
            registry.add_module(RegistryModule::new("core")),
            Err(RegistrationError::DuplicateModule("core".into()))
        );
    }

    #[test]
    fn registries_are_independent() {
        let mut a = TypeRegistry::new().unwrap();
        let b = TypeRegistry::new().unwrap();
        a.add_module(RegistryModule::new("game")).unwrap();
        assert!(a.module("game").is_some());
        assert!(b.module("game").is_none());
    }
}
