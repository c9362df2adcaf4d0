//! Types projected from host-native types.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::RegistrationError;
use crate::members::TypeTables;

use super::RealizedType;

/// Declaration of a host-backed type: its identity, its generic parameters
/// and the flat tables of operators, methods and fields projected from the
/// host type. Built once at registration and immutable afterwards.
pub struct BoundType {
    module: Arc<str>,
    name: Arc<str>,
    description: Arc<str>,
    native_type: &'static str,
    generic_params: Vec<Arc<str>>,
    tables: TypeTables,
}

impl BoundType {
    /// Bind the host type `T` as `module::name`.
    ///
    /// Fails when a generic parameter name appears twice.
    pub fn for_native<T: Any>(
        module: &str,
        name: &str,
        generic_params: &[&str],
    ) -> Result<Self, RegistrationError> {
        let mut params: Vec<Arc<str>> = Vec::with_capacity(generic_params.len());
        for param in generic_params {
            if params.iter().any(|p| &**p == *param) {
                return Err(RegistrationError::DuplicateGenericParameter {
                    ty: format!("{module}::{name}"),
                    param: param.to_string(),
                });
            }
            params.push(Arc::from(*param));
        }
        Ok(Self {
            module: Arc::from(module),
            name: Arc::from(name),
            description: Arc::from(""),
            native_type: std::any::type_name::<T>(),
            generic_params: params,
            tables: TypeTables::new(&format!("{module}::{name}")),
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Arc::from(description);
        self
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Rust type name of the host type this binds.
    pub fn native_type(&self) -> &'static str {
        self.native_type
    }

    pub fn generic_params(&self) -> &[Arc<str>] {
        &self.generic_params
    }

    pub fn tables(&self) -> &TypeTables {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut TypeTables {
        &mut self.tables
    }

    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }
}

impl fmt::Debug for BoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundType")
            .field("name", &self.qualified_name())
            .field("native_type", &self.native_type)
            .field("generic_params", &self.generic_params)
            .finish_non_exhaustive()
    }
}

/// A bound type together with its current generic arguments.
#[derive(Clone)]
pub struct BoundInstance {
    def: Arc<BoundType>,
    args: Vec<RealizedType>,
}

impl BoundInstance {
    pub(crate) fn new(def: Arc<BoundType>, args: Vec<RealizedType>) -> Self {
        Self { def, args }
    }

    pub fn def(&self) -> &Arc<BoundType> {
        &self.def
    }

    pub fn args(&self) -> &[RealizedType] {
        &self.args
    }

    pub fn same_definition(&self, other: &BoundInstance) -> bool {
        Arc::ptr_eq(&self.def, &other.def)
            || (self.def.module == other.def.module && self.def.name == other.def.name)
    }

    pub(crate) fn render(&self, qualified: bool) -> String {
        let mut out = if qualified {
            self.def.qualified_name()
        } else {
            self.def.name.to_string()
        };
        if qualified && !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(ToString::to_string).collect();
            out.push('<');
            out.push_str(&args.join(", "));
            out.push('>');
        }
        out
    }
}

impl PartialEq for BoundInstance {
    fn eq(&self, other: &Self) -> bool {
        self.same_definition(other) && self.args == other.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair<A, B>(std::marker::PhantomData<(A, B)>);

    #[test]
    fn duplicate_generic_parameter_is_rejected() {
        let err = BoundType::for_native::<Pair<i64, i64>>("m", "Pair", &["T", "T"]).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateGenericParameter {
                ty: "m::Pair".to_string(),
                param: "T".to_string()
            }
        );
    }

    #[test]
    fn declared_form_renders_parameters() {
        let def = Arc::new(BoundType::for_native::<Pair<(), ()>>("m", "Pair", &["A", "B"]).unwrap());
        let ty = RealizedType::bound(def);
        assert_eq!(ty.to_string(), "m::Pair<A, B>");
        assert_eq!(ty.local_name(), "Pair");
        assert!(!ty.is_valid());
    }
}
