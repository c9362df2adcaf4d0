//! Tetra compiler
//!
//! Checks a parsed module against a [`TypeRegistry`](tetra_registry::TypeRegistry)
//! and compiles it to stack bytecode.
//!
//! ## Architecture
//!
//! A module is compiled in six passes (see [`passes`]). The first five
//! resolve names and signatures and only accumulate diagnostics; the last
//! one emits code function by function, so a broken function never hides
//! the errors or the code of its siblings.
//!
//! Synchronous functions compile to plain chunks. `async` functions compile
//! to an [`AsyncProto`] that the VM instantiates as a resumable computation
//! on every call.
//!
//! ## Modules
//!
//! - [`ast`]: syntax-tree contract consumed from the parser, and a builder
//! - [`bytecode`]: opcodes, chunks and the constant pool
//! - [`context`]: module and function compilation contexts
//! - [`emit`]: bytecode emitter with jump and loop bookkeeping
//! - [`for_in`]: the iteration protocol behind `for` loops
//! - [`function_compiler`]: per-function verification and emission
//! - [`scope`]: lexical scopes and local slots
//! - [`snippet`]: single expressions for interactive evaluation

pub mod ast;
pub mod bytecode;
mod compiled;
pub mod context;
pub mod emit;
mod expr;
pub mod for_in;
pub mod function_compiler;
mod options;
pub mod passes;
pub mod scope;
pub mod snippet;

pub use ast::AstBuilder;
pub use compiled::{
    AsyncProto, CompilationResult, CompiledFunction, CompiledModule, GlobalInit,
};
pub use context::{BlockContext, ModuleContext, ScriptFunction};
pub use emit::{BreakError, BytecodeEmitter, EmitError, JumpLabel};
pub use for_in::ForInSource;
pub use function_compiler::{FunctionCompiler, FunctionOutput, FunctionState, verify_signature};
pub use options::CompileOptions;
pub use passes::{ModuleCompiler, compile_module};
pub use scope::{LocalScope, LocalVar};
pub use snippet::{CompiledSnippet, SNIPPET_ENTRY, SnippetBody, SnippetParam, compile_snippet};
