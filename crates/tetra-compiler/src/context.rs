//! Compilation contexts.
//!
//! [`ModuleContext`] is the resolved environment of one module, filled by the
//! declaration passes and read-only during emission. [`BlockContext`] is the
//! per-function state threaded through expression emission.

use rustc_hash::FxHashMap;
use tetra_core::{
    BuiltinCatalog, Diagnostics, ErrorKind, Intrinsic, RealizedType, Span, StructuralError,
    TypeContext, TypeHash,
};
use tetra_registry::{NativeFunction, RegistryConstant, RegistryModule, TypeRegistry};

use crate::ast::Expr;
use crate::bytecode::{BytecodeChunk, ConstantPool};
use crate::emit::{BytecodeEmitter, EmitError};
use crate::options::CompileOptions;
use crate::scope::LocalScope;

// ============================================================================
// Module level
// ============================================================================

/// Verified signature of a script function.
#[derive(Debug, Clone)]
pub struct ScriptFunction<'a> {
    pub name: String,
    pub hash: TypeHash,
    pub params: Vec<(String, RealizedType)>,
    /// Default argument per parameter.
    pub defaults: Vec<Option<&'a Expr<'a>>>,
    /// Declared return type (the awaited type for async functions).
    pub result: RealizedType,
    pub is_async: bool,
}

impl ScriptFunction<'_> {
    /// Type produced by calling the function.
    pub fn call_result(&self) -> RealizedType {
        if self.is_async {
            RealizedType::future(self.result.clone())
        } else {
            self.result.clone()
        }
    }

    /// Type of the function used as a value.
    pub fn value_type(&self) -> RealizedType {
        RealizedType::function(
            self.params.iter().map(|(_, ty)| ty.clone()).collect(),
            self.call_result(),
        )
    }

    /// Number of leading parameters without a default.
    pub fn required_params(&self) -> usize {
        self.defaults
            .iter()
            .rposition(Option::is_none)
            .map_or(0, |last| last + 1)
    }
}

/// A module-level `const`, stored in a global slot.
#[derive(Debug, Clone)]
pub struct ModuleConstant {
    pub ty: RealizedType,
    pub slot: u32,
}

/// Resolved environment of the module being compiled.
pub struct ModuleContext<'a> {
    name: String,
    registry: &'a TypeRegistry,
    options: CompileOptions,
    types: FxHashMap<String, RealizedType>,
    module_aliases: FxHashMap<String, String>,
    functions: FxHashMap<String, ScriptFunction<'a>>,
    natives: FxHashMap<String, NativeFunction>,
    constants: FxHashMap<String, ModuleConstant>,
    imported_constants: FxHashMap<String, RegistryConstant>,
    global_count: u32,
}

impl<'a> ModuleContext<'a> {
    pub fn new(name: &str, registry: &'a TypeRegistry, options: CompileOptions) -> Self {
        Self {
            name: name.to_string(),
            registry,
            options,
            types: FxHashMap::default(),
            module_aliases: FxHashMap::default(),
            functions: FxHashMap::default(),
            natives: FxHashMap::default(),
            constants: FxHashMap::default(),
            imported_constants: FxHashMap::default(),
            global_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    // ==========================================================================
    // Types and modules
    // ==========================================================================

    /// Bind a type name; returns `false` if the name is taken.
    pub fn declare_type(&mut self, name: &str, ty: RealizedType) -> bool {
        if self.types.contains_key(name) {
            return false;
        }
        self.types.insert(name.to_string(), ty);
        true
    }

    /// Replace the binding of an already declared type name.
    pub fn define_type(&mut self, name: &str, ty: RealizedType) {
        self.types.insert(name.to_string(), ty);
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn add_module_alias(&mut self, alias: &str, module: &str) -> bool {
        if self.module_aliases.contains_key(alias) {
            return false;
        }
        self.module_aliases
            .insert(alias.to_string(), module.to_string());
        true
    }

    /// Find a registry module by alias or by its own name.
    pub fn resolve_module(&self, name: &str) -> Option<&'a RegistryModule> {
        let target = self.module_aliases.get(name).map_or(name, String::as_str);
        self.registry.module(target)
    }

    // ==========================================================================
    // Values
    // ==========================================================================

    /// Whether `name` is already bound to a function or constant.
    pub fn has_value(&self, name: &str) -> bool {
        self.functions.contains_key(name)
            || self.natives.contains_key(name)
            || self.constants.contains_key(name)
            || self.imported_constants.contains_key(name)
    }

    pub fn add_function(&mut self, function: ScriptFunction<'a>) -> bool {
        if self.has_value(&function.name) {
            return false;
        }
        self.functions.insert(function.name.clone(), function);
        true
    }

    pub fn function(&self, name: &str) -> Option<&ScriptFunction<'a>> {
        self.functions.get(name)
    }

    pub fn import_native(&mut self, name: &str, function: NativeFunction) -> bool {
        if self.has_value(name) {
            return false;
        }
        self.natives.insert(name.to_string(), function);
        true
    }

    pub fn native(&self, name: &str) -> Option<&NativeFunction> {
        self.natives.get(name)
    }

    /// Allocate a global slot for a module constant.
    pub fn declare_constant(&mut self, name: &str, ty: RealizedType) -> Option<u32> {
        if self.has_value(name) {
            return None;
        }
        let slot = self.global_count;
        self.global_count += 1;
        self.constants
            .insert(name.to_string(), ModuleConstant { ty, slot });
        Some(slot)
    }

    pub fn constant(&self, name: &str) -> Option<&ModuleConstant> {
        self.constants.get(name)
    }

    pub fn import_constant(&mut self, name: &str, constant: RegistryConstant) -> bool {
        if self.has_value(name) {
            return false;
        }
        self.imported_constants.insert(name.to_string(), constant);
        true
    }

    pub fn imported_constant(&self, name: &str) -> Option<&RegistryConstant> {
        self.imported_constants.get(name)
    }

    pub fn global_count(&self) -> u32 {
        self.global_count
    }
}

impl TypeContext for ModuleContext<'_> {
    fn builtins(&self) -> &BuiltinCatalog {
        self.registry.builtins()
    }

    fn find_type(&self, name: &str) -> Option<RealizedType> {
        match name.split_once("::") {
            Some((module, local)) => self.resolve_module(module)?.find_type(local).cloned(),
            None => self.types.get(name).cloned(),
        }
    }
}

// ============================================================================
// Function level
// ============================================================================

/// State for emitting one function body.
pub struct BlockContext<'c, 'a> {
    pub module: &'c ModuleContext<'a>,
    pub emitter: BytecodeEmitter<'c>,
    pub scope: LocalScope,
    diagnostics: Diagnostics,
    return_type: RealizedType,
    is_async: bool,
}

/// Output of a finished [`BlockContext`].
pub struct BlockOutput {
    pub chunk: Result<BytecodeChunk, EmitError>,
    pub diagnostics: Diagnostics,
    pub frame_size: u32,
}

impl<'c, 'a> BlockContext<'c, 'a> {
    pub fn new(
        module: &'c ModuleContext<'a>,
        constants: &'c mut ConstantPool,
        return_type: RealizedType,
        is_async: bool,
    ) -> Self {
        Self {
            module,
            emitter: BytecodeEmitter::new(constants),
            scope: LocalScope::new(),
            diagnostics: Diagnostics::new(),
            return_type,
            is_async,
        }
    }

    pub fn return_type(&self) -> &RealizedType {
        &self.return_type
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn types(&self) -> &'c dyn TypeContext {
        self.module
    }

    pub fn set_line(&mut self, span: Span) {
        self.emitter.set_line(span.start.line);
    }

    // ==========================================================================
    // Diagnostics
    // ==========================================================================

    pub fn report(&mut self, error: StructuralError) {
        self.diagnostics.push(error);
    }

    pub fn error(&mut self, kind: ErrorKind, message: impl Into<String>, span: Span) {
        self.report(StructuralError::new(kind, message, span));
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    /// Check that a value of type `actual` can be stored where `expected` is
    /// required, emitting the int-to-float widening when needed.
    ///
    /// The value must be on top of the stack.
    pub fn coerce(
        &mut self,
        expected: &RealizedType,
        actual: &RealizedType,
        span: Span,
        describe: impl FnOnce() -> String,
    ) -> bool {
        if !expected.is_assignable_from(actual) {
            self.error(
                ErrorKind::IncompatibleTypes,
                format!("{}: expected {expected}, found {actual}", describe()),
                span,
            );
            return false;
        }
        if expected.needs_int_to_float(actual) {
            self.emitter.emit_intrinsic(Intrinsic::IntToFloat);
        }
        true
    }

    // ==========================================================================
    // Probing
    // ==========================================================================

    /// Run `f` against scratch state: nothing it emits, declares or reports
    /// survives.
    pub fn probe<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let mark = self.scope.mark();
        let saved = self.emitter.begin_probe();
        let diagnostics = std::mem::take(&mut self.diagnostics);

        let out = f(self);

        self.diagnostics = diagnostics;
        self.emitter.end_probe(saved);
        self.scope.rewind(mark);
        out
    }

    pub fn finish(self) -> BlockOutput {
        BlockOutput {
            chunk: self.emitter.finish(),
            diagnostics: self.diagnostics,
            frame_size: self.scope.frame_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use tetra_core::{NativeContext, NativeError, Value};

    use super::*;

    fn zero(_: &mut NativeContext<'_>, _: &[Value]) -> Result<Value, NativeError> {
        Ok(Value::Float(0.0))
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::with_core().unwrap();
        let mut module = RegistryModule::new("geo");
        module.add_type("Meters", RealizedType::FLOAT).unwrap();
        module
            .add_function("zero", "", &[], RealizedType::FLOAT, zero)
            .unwrap();
        registry.add_module(module).unwrap();
        registry
    }

    #[test]
    fn qualified_types_resolve_through_aliases() {
        let registry = registry();
        let mut ctx = ModuleContext::new("main", &registry, CompileOptions::default());
        assert_eq!(ctx.find_type("geo::Meters"), Some(RealizedType::FLOAT));
        assert!(ctx.find_type("g::Meters").is_none());

        ctx.add_module_alias("g", "geo");
        assert_eq!(ctx.find_type("g::Meters"), Some(RealizedType::FLOAT));
    }

    #[test]
    fn value_names_are_shared_between_kinds() {
        let registry = registry();
        let mut ctx = ModuleContext::new("main", &registry, CompileOptions::default());
        assert_eq!(ctx.declare_constant("LIMIT", RealizedType::INT), Some(0));
        assert_eq!(ctx.declare_constant("LIMIT", RealizedType::INT), None);

        let zero = ctx
            .resolve_module("geo")
            .and_then(|m| m.find_function("zero"))
            .cloned()
            .unwrap();
        assert!(!ctx.import_native("LIMIT", zero.clone()));
        assert!(ctx.import_native("zero", zero));
        assert_eq!(ctx.declare_constant("OTHER", RealizedType::INT), Some(1));
    }

    #[test]
    fn required_params_counts_leading_non_defaults() {
        let f = ScriptFunction {
            name: "f".into(),
            hash: TypeHash::from_function("m", "f"),
            params: vec![
                ("a".into(), RealizedType::INT),
                ("b".into(), RealizedType::INT),
            ],
            defaults: vec![None, None],
            result: RealizedType::INT,
            is_async: true,
        };
        assert_eq!(f.required_params(), 2);
        assert_eq!(f.value_type().to_string(), "fn(int, int) -> Future<int>");
    }
}
