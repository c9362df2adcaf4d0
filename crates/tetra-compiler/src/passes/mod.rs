//! Module compilation passes.
//!
//! Declarations are processed in six passes, each working on the
//! environment left by the previous one:
//!
//! 1. [`declarations`]: type declaration (alias names)
//! 2. [`declarations`]: type import (`use`, then alias targets)
//! 3. [`declarations`]: constant import (registry constants and module `const`s)
//! 4. [`functions`]: function signature verification
//! 5. [`functions`]: function import (script functions and registry routines)
//! 6. [`emission`]: constant initializers and function bodies
//!
//! Passes 1-5 only accumulate diagnostics. Emission drops a function that
//! fails to compile and keeps going with the next one.

mod declarations;
mod emission;
mod functions;

use log::debug;
use tetra_core::{Diagnostics, RealizedType, StructuralError};
use tetra_registry::TypeRegistry;

use crate::ast::{ConstDecl, FunctionDecl, Item, Module, TypeAliasDecl, UseDecl};
use crate::compiled::{CompilationResult, CompiledModule};
use crate::context::{ModuleContext, ScriptFunction};
use crate::options::CompileOptions;

/// Compile one module against `registry`.
pub fn compile_module<'a>(
    registry: &'a TypeRegistry,
    module: &'a Module<'a>,
    options: CompileOptions,
) -> CompilationResult {
    let mut compiler = ModuleCompiler::new(registry, module, options);
    compiler.declare_types();
    compiler.import_types();
    compiler.import_constants();
    compiler.verify_signatures();
    compiler.import_functions();
    compiler.emit()
}

/// A module `const` with its global slot.
struct PendingConstant<'a> {
    decl: &'a ConstDecl<'a>,
    slot: u32,
    ty: RealizedType,
}

/// A function whose signature has been checked.
struct PendingFunction<'a> {
    decl: &'a FunctionDecl<'a>,
    signature: ScriptFunction<'a>,
    /// `false` when the signature did not resolve; the function is visible
    /// to callers but never emitted.
    verified: bool,
}

/// State shared by the passes over one module.
pub struct ModuleCompiler<'a> {
    ast: &'a Module<'a>,
    ctx: ModuleContext<'a>,
    diagnostics: Diagnostics,
    aliases: Vec<&'a TypeAliasDecl<'a>>,
    constants: Vec<PendingConstant<'a>>,
    functions: Vec<PendingFunction<'a>>,
}

impl<'a> ModuleCompiler<'a> {
    pub fn new(registry: &'a TypeRegistry, ast: &'a Module<'a>, options: CompileOptions) -> Self {
        Self {
            ast,
            ctx: ModuleContext::new(ast.name, registry, options),
            diagnostics: Diagnostics::with_limit(options.max_diagnostics),
            aliases: Vec::new(),
            constants: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn report(&mut self, error: StructuralError) {
        self.diagnostics.push(error);
    }

    fn uses(&self) -> impl Iterator<Item = &'a UseDecl<'a>> + use<'a> {
        self.ast.items.iter().filter_map(|item| match item {
            Item::Use(decl) => Some(decl),
            _ => None,
        })
    }

    fn pass_done(&self, pass: &str) {
        debug!(
            "module '{}': {pass} done, {} diagnostic(s) so far",
            self.ast.name,
            self.diagnostics.len()
        );
    }

    fn finish(self, module: CompiledModule) -> CompilationResult {
        debug!(
            "module '{}' compiled: {} function(s), {} global(s), {} diagnostic(s)",
            module.name,
            module.functions.len(),
            module.globals.len(),
            self.diagnostics.len()
        );
        CompilationResult {
            module,
            diagnostics: self.diagnostics,
        }
    }
}
