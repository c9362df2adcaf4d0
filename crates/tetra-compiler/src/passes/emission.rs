//! Constant initializers and function bodies.

use log::warn;
use tetra_core::{ErrorKind, StructuralError};

use super::{ModuleCompiler, PendingConstant};
use crate::bytecode::{ConstantPool, OpCode};
use crate::compiled::{CompilationResult, CompiledModule, GlobalInit};
use crate::context::BlockContext;
use crate::function_compiler::FunctionCompiler;

impl<'a> ModuleCompiler<'a> {
    /// Pass 6: emit every initializer and every verified function.
    pub fn emit(mut self) -> CompilationResult {
        let mut pool = ConstantPool::new();
        let mut protos = Vec::new();

        let constants = std::mem::take(&mut self.constants);
        let mut globals = Vec::with_capacity(constants.len());
        for constant in &constants {
            if let Some(init) = self.emit_initializer(constant, &mut pool) {
                globals.push(init);
            }
        }

        let mut functions = Vec::new();
        for pending in std::mem::take(&mut self.functions) {
            if !pending.verified {
                continue;
            }
            let output = FunctionCompiler::with_signature(&self.ctx, pending.decl, pending.signature)
                .emit(&mut pool, &mut protos);
            self.diagnostics.extend(output.diagnostics);
            if let Some(function) = output.function {
                functions.push(function);
            }
        }

        let module = CompiledModule {
            name: self.ctx.name().to_string(),
            constants: pool,
            functions,
            protos,
            globals,
            global_count: self.ctx.global_count(),
        };
        self.finish(module)
    }

    fn emit_initializer(
        &mut self,
        constant: &PendingConstant<'a>,
        pool: &mut ConstantPool,
    ) -> Option<GlobalInit> {
        let decl = constant.decl;
        if constant.ty.is_undefined() && decl.ty.is_some() {
            // The annotation failed to resolve and was reported already.
            return None;
        }

        let mut ctx = BlockContext::new(&self.ctx, pool, constant.ty.clone(), false);
        ctx.set_line(decl.span);
        let actual = decl.value.emit_code(&mut ctx, false);
        ctx.coerce(&constant.ty, &actual, decl.value.span(), || {
            format!("Value of constant '{}'", decl.name)
        });
        ctx.emitter.emit(OpCode::Return);

        let output = ctx.finish();
        let failed = !output.diagnostics.is_empty();
        self.diagnostics.extend(output.diagnostics);
        if failed {
            return None;
        }
        if constant.ty.is_undefined() {
            self.report(StructuralError::new(
                ErrorKind::InvalidType,
                format!(
                    "Cannot infer type of constant '{}'; add a type annotation",
                    decl.name
                ),
                decl.span,
            ));
            return None;
        }
        match output.chunk {
            Ok(chunk) => Some(GlobalInit {
                name: decl.name.to_string(),
                ty: constant.ty.clone(),
                slot: constant.slot,
                chunk,
                frame_size: output.frame_size,
            }),
            Err(error) => {
                warn!("initializer of '{}' cannot be encoded: {error}", decl.name);
                self.report(StructuralError::new(
                    ErrorKind::InvalidOperation,
                    format!("Constant '{}' cannot be encoded: {error}", decl.name),
                    decl.span,
                ));
                None
            }
        }
    }
}
