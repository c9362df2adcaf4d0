//! Tetra: a statically typed scripting language with generics and
//! cooperative async functions.
//!
//! The workspace is split by phase:
//!
//! - `tetra-core`: types, values, diagnostics
//! - `tetra-registry`: the catalog of host types, routines and constants
//! - `tetra-compiler`: syntax tree to bytecode
//! - this crate: the [`vm`], the interactive evaluator in [`repl`] and the
//!   [`Engine`] tying them together
//!
//! ```ignore
//! let engine = Engine::new()?;
//! let vm = engine.load(&module)?;
//! let answer = vm.call("main", vec![])?;
//! ```

pub mod repl;
pub mod vm;

use log::debug;

pub use repl::{Evaluated, ReplContext, ReplValue};
pub use tetra_compiler::ast;
pub use tetra_compiler::{CompilationResult, CompileOptions, CompiledModule, compile_module};
pub use tetra_core::{
    Diagnostics, ErrorKind, EvalError, FutureRef, FutureResult, RealizedType, RuntimeError,
    StructuralError, TetraError, Value,
};
pub use tetra_registry::{CORE_MODULE, RegistryModule, TypeRegistry};
pub use vm::{TestOutcome, Vm, VmOptions};

/// Registry plus the options used for every compilation and load.
pub struct Engine {
    registry: TypeRegistry,
    compile_options: CompileOptions,
    vm_options: VmOptions,
}

impl Engine {
    /// An engine with the `core` module registered.
    pub fn new() -> Result<Self, TetraError> {
        Ok(Self::with_registry(TypeRegistry::with_core()?))
    }

    pub fn with_registry(registry: TypeRegistry) -> Self {
        Self {
            registry,
            compile_options: CompileOptions::default(),
            vm_options: VmOptions::default(),
        }
    }

    pub fn with_compile_options(mut self, options: CompileOptions) -> Self {
        self.compile_options = options;
        self
    }

    pub fn with_vm_options(mut self, options: VmOptions) -> Self {
        self.vm_options = options;
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Register a host module. Modules must be added before compiling
    /// scripts that use them.
    pub fn add_module(&mut self, module: RegistryModule) -> Result<(), TetraError> {
        self.registry.add_module(module)?;
        Ok(())
    }

    /// Compile `module`, collecting every diagnostic.
    pub fn compile(&self, module: &ast::Module<'_>) -> CompilationResult {
        compile_module(&self.registry, module, self.compile_options)
    }

    /// Compile and load `module`; any diagnostic makes this fail.
    pub fn load(&self, module: &ast::Module<'_>) -> Result<Vm, TetraError> {
        let compiled = self.compile(module).into_result()?;
        debug!(
            "compiled '{}' with {} function(s)",
            compiled.name,
            compiled.functions.len()
        );
        Ok(Vm::load(compiled, self.vm_options)?)
    }

    /// A new interactive session over this engine's registry.
    pub fn repl(&self) -> ReplContext<'_> {
        ReplContext::new(&self.registry).with_options(self.vm_options)
    }
}
