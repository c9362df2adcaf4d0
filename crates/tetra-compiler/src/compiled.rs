//! Output of module compilation.

use tetra_core::{Diagnostics, RealizedType, TypeHash};

use crate::bytecode::{BytecodeChunk, ConstantPool};

/// A script function ready to run.
///
/// For an `async` function `chunk` is the entry stub that packs the
/// arguments into a future; the body lives in the referenced [`AsyncProto`].
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub name: String,
    pub hash: TypeHash,
    pub description: Option<String>,
    pub chunk: BytecodeChunk,
    pub frame_size: u32,
    pub param_count: usize,
    pub is_async: bool,
    pub is_public: bool,
    pub is_test: bool,
}

/// The body of an `async` function, compiled as a resumable computation.
///
/// Every call of the function instantiates the prototype with its own
/// frame: the parameters occupy the first slots, the remaining locals live
/// alongside them for the whole lifetime of the computation.
#[derive(Debug, Clone)]
pub struct AsyncProto {
    pub name: String,
    pub chunk: BytecodeChunk,
    pub frame_size: u32,
    pub param_count: usize,
    /// Offsets where the computation may give control back to its driver.
    pub suspension_points: Vec<usize>,
}

/// A module-level `const` and the code computing its value.
#[derive(Debug, Clone)]
pub struct GlobalInit {
    pub name: String,
    pub ty: RealizedType,
    pub slot: u32,
    /// Leaves the value on the stack and returns it.
    pub chunk: BytecodeChunk,
    pub frame_size: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledModule {
    pub name: String,
    pub constants: ConstantPool,
    pub functions: Vec<CompiledFunction>,
    pub protos: Vec<AsyncProto>,
    /// In declaration order.
    pub globals: Vec<GlobalInit>,
    pub global_count: u32,
}

impl CompiledModule {
    pub fn function(&self, name: &str) -> Option<&CompiledFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_by_hash(&self, hash: TypeHash) -> Option<&CompiledFunction> {
        self.functions.iter().find(|f| f.hash == hash)
    }

    pub fn test_functions(&self) -> impl Iterator<Item = &CompiledFunction> {
        self.functions.iter().filter(|f| f.is_test)
    }

    pub fn public_functions(&self) -> impl Iterator<Item = &CompiledFunction> {
        self.functions.iter().filter(|f| f.is_public)
    }
}

/// A compiled module together with every diagnostic reported for it.
///
/// Functions that failed to compile are absent from the module; the rest
/// are usable even when diagnostics were reported.
#[derive(Debug)]
pub struct CompilationResult {
    pub module: CompiledModule,
    pub diagnostics: Diagnostics,
}

impl CompilationResult {
    pub fn is_success(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// The module, or the diagnostics if there were any.
    pub fn into_result(self) -> Result<CompiledModule, Diagnostics> {
        if self.diagnostics.is_empty() {
            Ok(self.module)
        } else {
            Err(self.diagnostics)
        }
    }
}
