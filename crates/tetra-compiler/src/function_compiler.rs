//! Function compiler: signature verification and body emission.
//!
//! A function moves through
//!
//! ```text
//! Declared -> SignatureVerified -> Emitting -> Emitted
//!                                           \-> EmissionFailed
//! ```
//!
//! A signature that does not resolve stops the function before emission.
//! Any diagnostic raised while emitting the body (a return type mismatch
//! included) leaves the function without code. Neither affects sibling
//! functions.
//!
//! Synchronous functions compile to a chunk that runs to completion.
//! `async` functions compile their body into an [`AsyncProto`]; the chunk
//! registered under the function's name only packs the arguments into a
//! fresh future:
//!
//! ```text
//! GetLocal 0 .. GetLocal n-1
//! NewFuture proto, n
//! Return
//! ```

use log::{trace, warn};
use rustc_hash::FxHashSet;
use tetra_core::{Diagnostics, ErrorKind, Intrinsic, RealizedType, StructuralError, TypeHash};

use crate::ast::{FnModifiers, FunctionDecl};
use crate::bytecode::{BytecodeChunk, ConstantPool, OpCode};
use crate::compiled::{AsyncProto, CompiledFunction};
use crate::context::{BlockContext, ModuleContext, ScriptFunction};
use crate::emit::{BytecodeEmitter, EmitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionState {
    Declared,
    SignatureVerified,
    Emitting,
    Emitted,
    EmissionFailed,
}

/// Result of [`FunctionCompiler::emit`].
#[derive(Debug)]
pub struct FunctionOutput {
    pub state: FunctionState,
    /// Present only when `state` is [`FunctionState::Emitted`].
    pub function: Option<CompiledFunction>,
    pub diagnostics: Diagnostics,
}

pub struct FunctionCompiler<'c, 'a> {
    module: &'c ModuleContext<'a>,
    decl: &'a FunctionDecl<'a>,
    state: FunctionState,
    signature: Option<ScriptFunction<'a>>,
    diagnostics: Diagnostics,
}

impl<'c, 'a> FunctionCompiler<'c, 'a> {
    pub fn new(module: &'c ModuleContext<'a>, decl: &'a FunctionDecl<'a>) -> Self {
        Self {
            module,
            decl,
            state: FunctionState::Declared,
            signature: None,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Resume from a signature verified by an earlier pass.
    pub fn with_signature(
        module: &'c ModuleContext<'a>,
        decl: &'a FunctionDecl<'a>,
        signature: ScriptFunction<'a>,
    ) -> Self {
        Self {
            state: FunctionState::SignatureVerified,
            signature: Some(signature),
            ..Self::new(module, decl)
        }
    }

    pub fn state(&self) -> FunctionState {
        self.state
    }

    pub fn signature(&self) -> Option<&ScriptFunction<'a>> {
        self.signature.as_ref()
    }

    /// Resolve every parameter type and the return type.
    pub fn verify_signature(&mut self) -> bool {
        if self.state != FunctionState::Declared {
            return self.signature.is_some();
        }
        match verify_signature(self.module, self.decl) {
            Ok(signature) => {
                self.signature = Some(signature);
                self.state = FunctionState::SignatureVerified;
                true
            }
            Err(diagnostics) => {
                self.diagnostics.extend(diagnostics);
                self.state = FunctionState::EmissionFailed;
                false
            }
        }
    }

    /// The verified signature, or the diagnostics explaining why it failed.
    pub fn into_signature(mut self) -> Result<ScriptFunction<'a>, Diagnostics> {
        self.verify_signature();
        self.signature.ok_or(self.diagnostics)
    }

    /// Emit the body. Async bodies are appended to `protos`.
    pub fn emit(mut self, constants: &mut ConstantPool, protos: &mut Vec<AsyncProto>) -> FunctionOutput {
        if !self.verify_signature() {
            return self.output(None);
        }
        let Some(signature) = self.signature.take() else {
            return self.output(None);
        };

        self.state = FunctionState::Emitting;
        trace!(
            "emitting {} function '{}'",
            if signature.is_async { "async" } else { "sync" },
            signature.name
        );

        let compiled = if signature.is_async {
            self.emit_async(&signature, constants, protos)
        } else {
            self.emit_body(&signature, constants)
        };

        let function = compiled.map(|(chunk, frame_size)| CompiledFunction {
            name: signature.name.clone(),
            hash: signature.hash,
            description: self.decl.description.map(str::to_string),
            chunk,
            frame_size,
            param_count: signature.params.len(),
            is_async: signature.is_async,
            is_public: self.decl.modifiers.contains(FnModifiers::PUB),
            is_test: self.decl.modifiers.contains(FnModifiers::TEST),
        });
        if function.is_none() {
            warn!(
                "emission of '{}' failed with {} diagnostic(s)",
                signature.name,
                self.diagnostics.len()
            );
        }
        self.output(function)
    }

    fn output(mut self, function: Option<CompiledFunction>) -> FunctionOutput {
        self.state = if function.is_some() {
            FunctionState::Emitted
        } else {
            FunctionState::EmissionFailed
        };
        FunctionOutput {
            state: self.state,
            function,
            diagnostics: self.diagnostics,
        }
    }

    /// Compile the body itself; `None` when it reported anything.
    fn emit_body(
        &mut self,
        signature: &ScriptFunction<'a>,
        constants: &mut ConstantPool,
    ) -> Option<(BytecodeChunk, u32)> {
        let decl = self.decl;
        let mut ctx = BlockContext::new(
            self.module,
            constants,
            signature.result.clone(),
            signature.is_async,
        );
        for (name, ty) in &signature.params {
            if let Err(error) = ctx.scope.declare_param(name, ty.clone(), decl.span) {
                ctx.report(error);
            }
        }

        if signature.result.is_unit() {
            decl.body.emit_code(&mut ctx, true);
            ctx.emitter.emit_unit();
        } else {
            let actual = decl.body.emit_code(&mut ctx, false);
            if !signature.result.is_assignable_from(&actual) {
                ctx.error(
                    ErrorKind::IncompatibleTypes,
                    format!(
                        "Function '{}' returns {actual} but is declared to return {}",
                        signature.name, signature.result
                    ),
                    decl.body.span,
                );
            } else if signature.result.needs_int_to_float(&actual) {
                ctx.emitter.emit_intrinsic(Intrinsic::IntToFloat);
            }
        }
        ctx.emitter.emit(OpCode::Return);

        let output = ctx.finish();
        let failed = !output.diagnostics.is_empty();
        self.diagnostics.extend(output.diagnostics);
        if failed {
            return None;
        }

        let chunk = match output.chunk {
            Ok(chunk) => chunk,
            Err(error) => {
                self.report(
                    ErrorKind::InvalidOperation,
                    format!("Function '{}' cannot be encoded: {error}", signature.name),
                );
                return None;
            }
        };
        let max_locals = self.module.options().max_locals;
        if output.frame_size > max_locals {
            self.report(
                ErrorKind::InvalidOperation,
                format!(
                    "Function '{}' needs {} locals, the limit is {max_locals}",
                    signature.name, output.frame_size
                ),
            );
            return None;
        }
        Some((chunk, output.frame_size))
    }

    fn emit_async(
        &mut self,
        signature: &ScriptFunction<'a>,
        constants: &mut ConstantPool,
        protos: &mut Vec<AsyncProto>,
    ) -> Option<(BytecodeChunk, u32)> {
        let (body, frame_size) = self.emit_body(signature, constants)?;
        let param_count = signature.params.len();

        let entry = match entry_stub(constants, self.decl.span.start.line, protos.len(), param_count) {
            Ok(chunk) => chunk,
            Err(error) => {
                self.report(
                    ErrorKind::InvalidOperation,
                    format!("Function '{}' cannot be encoded: {error}", signature.name),
                );
                return None;
            }
        };

        trace!(
            "'{}' suspends at {} point(s)",
            signature.name,
            body.suspension_points().len()
        );
        protos.push(AsyncProto {
            name: signature.name.clone(),
            suspension_points: body.suspension_points(),
            chunk: body,
            frame_size,
            param_count,
        });
        Some((entry, param_count as u32))
    }

    fn report(&mut self, kind: ErrorKind, message: String) {
        self.diagnostics
            .push(StructuralError::new(kind, message, self.decl.span));
    }
}

/// The chunk an async function is called through: pack the arguments into
/// a fresh future of prototype `proto` and return it.
pub(crate) fn entry_stub(
    constants: &mut ConstantPool,
    line: u32,
    proto: usize,
    param_count: usize,
) -> Result<BytecodeChunk, EmitError> {
    let mut entry = BytecodeEmitter::new(constants);
    entry.set_line(line);
    for slot in 0..param_count {
        entry.emit_get_local(slot as u32);
    }
    entry.emit_new_future(proto, param_count);
    entry.emit(OpCode::Return);
    entry.finish()
}

/// Resolve the declared signature of `decl` in `module`.
pub fn verify_signature<'a>(
    module: &ModuleContext<'a>,
    decl: &'a FunctionDecl<'a>,
) -> Result<ScriptFunction<'a>, Diagnostics> {
    let mut diagnostics = Diagnostics::new();
    let mut seen = FxHashSet::default();
    let mut params = Vec::with_capacity(decl.params.len());

    for param in decl.params {
        if !seen.insert(param.name) {
            diagnostics.push(StructuralError::new(
                ErrorKind::DuplicateVariableName,
                format!("Parameter '{}' declared twice in '{}'", param.name, decl.name),
                param.span,
            ));
        }
        match param.ty.resolve(module) {
            Ok(ty) => params.push((param.name.to_string(), ty)),
            Err(error) => diagnostics.push(error),
        }
    }

    let defaults: Vec<_> = decl.params.iter().map(|p| p.default).collect();
    if let Some(gap) = defaults
        .iter()
        .skip_while(|d| d.is_none())
        .position(Option::is_none)
    {
        let index = defaults.iter().take_while(|d| d.is_none()).count() + gap;
        diagnostics.push(StructuralError::new(
            ErrorKind::InvalidOperation,
            format!(
                "Parameter '{}' of '{}' needs a default value: it follows a parameter with one",
                decl.params[index].name, decl.name
            ),
            decl.params[index].span,
        ));
    }

    if decl.modifiers.contains(FnModifiers::TEST) && !decl.params.is_empty() {
        diagnostics.push(StructuralError::new(
            ErrorKind::InvalidOperation,
            format!("Test function '{}' must not take parameters", decl.name),
            decl.span,
        ));
    }

    let result = match &decl.return_type {
        None => RealizedType::UNIT,
        Some(ty) => match ty.resolve(module) {
            Ok(ty) => ty,
            Err(error) => {
                diagnostics.push(error);
                RealizedType::Undefined
            }
        },
    };

    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }
    Ok(ScriptFunction {
        name: decl.name.to_string(),
        hash: TypeHash::from_function(module.name(), decl.name),
        params,
        defaults,
        result,
        is_async: decl.is_async,
    })
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tetra_registry::TypeRegistry;

    use super::*;
    use crate::ast::AstBuilder;
    use crate::options::CompileOptions;

    #[test]
    fn unit_function_returns_unit() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let module = ModuleContext::new("m", &registry, CompileOptions::default());
        let decl = b.alloc(b.function("noop", vec![], None, b.block(vec![], None)));

        let mut constants = ConstantPool::new();
        let mut protos = Vec::new();
        let out = FunctionCompiler::new(&module, decl).emit(&mut constants, &mut protos);
        assert_eq!(out.state, FunctionState::Emitted);
        let compiled = out.function.unwrap();
        compiled
            .chunk
            .assert_opcodes(&[OpCode::PushUnit, OpCode::Return]);
        assert!(!compiled.is_async);
    }

    #[test]
    fn parameters_occupy_the_first_slots() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let module = ModuleContext::new("m", &registry, CompileOptions::default());
        let body = b.block(vec![], Some(b.var("b")));
        let decl = b.alloc(
            b.function(
                "second",
                vec![b.param("a", b.ty("int")), b.param("b", b.ty("int"))],
                Some(b.ty("float")),
                body,
            ),
        );

        let mut constants = ConstantPool::new();
        let out = FunctionCompiler::new(&module, decl).emit(&mut constants, &mut Vec::new());
        let compiled = out.function.unwrap();
        assert_eq!(compiled.param_count, 2);
        assert_eq!(compiled.frame_size, 2);
        compiled
            .chunk
            .assert_opcodes(&[OpCode::GetLocal, OpCode::Intrinsic, OpCode::Return]);
        assert_eq!(compiled.chunk.read_u16(1), Some(1));
    }

    #[test]
    fn return_mismatch_is_a_single_diagnostic() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let module = ModuleContext::new("m", &registry, CompileOptions::default());
        let decl = b.alloc(
            b.function("answer", vec![], Some(b.ty("int")), b.block(vec![], Some(b.string("42")))),
        );

        let out = FunctionCompiler::new(&module, decl).emit(&mut ConstantPool::new(), &mut Vec::new());
        assert_eq!(out.state, FunctionState::EmissionFailed);
        assert!(out.function.is_none());
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics.count_of(ErrorKind::IncompatibleTypes), 1);
    }

    #[test]
    fn unknown_parameter_type_stops_before_emission() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let module = ModuleContext::new("m", &registry, CompileOptions::default());
        let decl = b.alloc(
            b.function(
                "broken",
                vec![b.param("v", b.ty("Vector9"))],
                Some(b.ty_args("Future", vec![])),
                b.block(vec![], None),
            ),
        );

        let mut compiler = FunctionCompiler::new(&module, decl);
        assert_eq!(compiler.state(), FunctionState::Declared);
        assert!(!compiler.verify_signature());
        assert_eq!(compiler.state(), FunctionState::EmissionFailed);

        let out = compiler.emit(&mut ConstantPool::new(), &mut Vec::new());
        assert_eq!(out.diagnostics.count_of(ErrorKind::InvalidType), 2);
    }

    #[test]
    fn defaults_must_be_trailing() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let module = ModuleContext::new("m", &registry, CompileOptions::default());
        let decl = b.alloc(
            b.function(
                "f",
                vec![
                    b.param_default("a", b.ty("int"), b.int(1)),
                    b.param("b", b.ty("int")),
                ],
                None,
                b.block(vec![], None),
            ),
        );
        let errors = verify_signature(&module, decl).unwrap_err();
        assert_eq!(errors.count_of(ErrorKind::InvalidOperation), 1);
    }

    #[test]
    fn async_function_gets_an_entry_stub() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let module = ModuleContext::new("m", &registry, CompileOptions::default());
        let body = b.block(vec![b.yield_()], Some(b.var("n")));
        let decl = b.alloc(
            b.async_function("later", vec![b.param("n", b.ty("int"))], Some(b.ty("int")), body),
        );

        let mut protos = Vec::new();
        let out = FunctionCompiler::new(&module, decl).emit(&mut ConstantPool::new(), &mut protos);
        let compiled = out.function.unwrap();
        assert!(compiled.is_async);
        compiled
            .chunk
            .assert_opcodes(&[OpCode::GetLocal, OpCode::NewFuture, OpCode::Return]);

        assert_eq!(protos.len(), 1);
        let proto = &protos[0];
        assert_eq!(proto.param_count, 1);
        assert_eq!(proto.suspension_points.len(), 1);
        proto
            .chunk
            .assert_opcodes(&[OpCode::Yield, OpCode::GetLocal, OpCode::Return]);
    }

    #[test]
    fn locals_limit_is_enforced() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let module = ModuleContext::new("m", &registry, CompileOptions::default().with_max_locals(1));
        let body = b.block(
            vec![b.let_("x", None, b.int(1)), b.let_("y", None, b.int(2))],
            None,
        );
        let decl = b.alloc(b.function("wide", vec![], None, body));

        let out = FunctionCompiler::new(&module, decl).emit(&mut ConstantPool::new(), &mut Vec::new());
        assert_eq!(out.state, FunctionState::EmissionFailed);
        assert_eq!(out.diagnostics.count_of(ErrorKind::InvalidOperation), 1);
    }
}
