//! Host modules: named groups of bound types, native functions and constants.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use tetra_core::{
    BoundType, ConstantValue, FunctionType, NativeCallable, NativeFn, RealizedType,
    RegistrationError,
};

/// A host function callable from scripts as `module::name(...)`.
#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub description: Arc<str>,
    pub params: Vec<(Arc<str>, RealizedType)>,
    pub result: RealizedType,
    pub native: NativeFn,
}

impl NativeFunction {
    pub fn signature(&self) -> FunctionType {
        FunctionType::new(
            self.params.iter().map(|(_, ty)| ty.clone()).collect(),
            self.result.clone(),
        )
    }
}

/// A host constant visible to scripts.
#[derive(Debug, Clone)]
pub struct RegistryConstant {
    pub description: Arc<str>,
    pub ty: RealizedType,
    pub value: ConstantValue,
}

/// A named collection of host declarations.
#[derive(Debug)]
pub struct RegistryModule {
    name: Arc<str>,
    description: Arc<str>,
    types: FxHashMap<Arc<str>, RealizedType>,
    functions: FxHashMap<Arc<str>, NativeFunction>,
    constants: FxHashMap<Arc<str>, RegistryConstant>,
}

impl RegistryModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            description: Arc::from(""),
            types: FxHashMap::default(),
            functions: FxHashMap::default(),
            constants: FxHashMap::default(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Arc::from(description);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Register a bound type under its local name and return its declared form.
    pub fn add_bound_type(&mut self, def: BoundType) -> Result<RealizedType, RegistrationError> {
        let name = def.name().to_string();
        let ty = RealizedType::bound(Arc::new(def));
        self.add_type(&name, ty.clone())?;
        Ok(ty)
    }

    /// Register any realized type (for example a record) under `name`.
    pub fn add_type(&mut self, name: &str, ty: RealizedType) -> Result<(), RegistrationError> {
        if self.types.contains_key(name) {
            return Err(RegistrationError::DuplicateType {
                module: self.name.to_string(),
                name: name.to_string(),
            });
        }
        self.types.insert(Arc::from(name), ty);
        Ok(())
    }

    pub fn add_function<F>(
        &mut self,
        name: &str,
        description: &str,
        params: &[(&str, RealizedType)],
        result: RealizedType,
        f: F,
    ) -> Result<(), RegistrationError>
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        if self.functions.contains_key(name) {
            return Err(RegistrationError::DuplicateFunction {
                module: self.name.to_string(),
                name: name.to_string(),
            });
        }
        let function = NativeFunction {
            description: Arc::from(description),
            params: params
                .iter()
                .map(|(n, ty)| (Arc::from(*n), ty.clone()))
                .collect(),
            result,
            native: NativeFn::new(&self.name, name, f),
        };
        self.functions.insert(Arc::from(name), function);
        Ok(())
    }

    pub fn add_constant(
        &mut self,
        name: &str,
        description: &str,
        ty: RealizedType,
        value: ConstantValue,
    ) -> Result<(), RegistrationError> {
        if self.constants.contains_key(name) {
            return Err(RegistrationError::DuplicateConstant {
                module: self.name.to_string(),
                name: name.to_string(),
            });
        }
        self.constants.insert(
            Arc::from(name),
            RegistryConstant {
                description: Arc::from(description),
                ty,
                value,
            },
        );
        Ok(())
    }

    pub fn find_type(&self, name: &str) -> Option<&RealizedType> {
        self.types.get(name)
    }

    pub fn find_function(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(name)
    }

    pub fn find_constant(&self, name: &str) -> Option<&RegistryConstant> {
        self.constants.get(name)
    }

    pub fn types(&self) -> impl Iterator<Item = (&str, &RealizedType)> {
        self.types.iter().map(|(k, v)| (&**k, v))
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, &NativeFunction)> {
        self.functions.iter().map(|(k, v)| (&**k, v))
    }

    pub fn constants(&self) -> impl Iterator<Item = (&str, &RegistryConstant)> {
        self.constants.iter().map(|(k, v)| (&**k, v))
    }
}

#[cfg(test)]
mod tests {
    use tetra_core::{NativeContext, NativeError, Value};

    use super::*;

    fn noop(_: &mut NativeContext<'_>, _: &[Value]) -> Result<Value, NativeError> {
        Ok(Value::Unit)
    }

    #[test]
    fn duplicate_function_rejected() {
        let mut module = RegistryModule::new("m");
        module
            .add_function("f", "", &[], RealizedType::UNIT, noop)
            .unwrap();
        assert_eq!(
            module.add_function("f", "", &[], RealizedType::UNIT, noop),
            Err(RegistrationError::DuplicateFunction {
                module: "m".into(),
                name: "f".into()
            })
        );
    }

    #[test]
    fn function_signature_and_identity() {
        let mut module = RegistryModule::new("m");
        module
            .add_function(
                "add",
                "Add two ints",
                &[("a", RealizedType::INT), ("b", RealizedType::INT)],
                RealizedType::INT,
                noop,
            )
            .unwrap();
        let f = module.find_function("add").unwrap();
        assert_eq!(f.signature().to_string(), "fn(int, int) -> int");
        assert_eq!(f.native.name(), "m::add");
    }

    #[test]
    fn duplicate_constant_rejected() {
        let mut module = RegistryModule::new("m");
        module
            .add_constant("X", "", RealizedType::INT, ConstantValue::Int(1))
            .unwrap();
        assert!(
            module
                .add_constant("X", "", RealizedType::INT, ConstantValue::Int(2))
                .is_err()
        );
        assert_eq!(module.find_constant("X").unwrap().value, ConstantValue::Int(1));
    }
}
