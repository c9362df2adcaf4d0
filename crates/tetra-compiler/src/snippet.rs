//! Compilation of single expressions and declarations for interactive use.
//!
//! A snippet is compiled as a one-function module. The variables of the
//! interactive session become its parameters, in order, so the snippet sees
//! them as locals `0..n`. A declaration is compiled inside a nested block,
//! which lets it shadow an existing session variable of the same name.
//!
//! A synchronous snippet returns an array `[result, v0, .., vn-1]` holding
//! the session variables as they are after evaluation; the caller writes
//! them back. A snippet containing a suspension point is compiled like an
//! `async` function and returns a future of the bare result.

use tetra_core::{Diagnostics, ErrorKind, RealizedType, Span, StructuralError, TypeHash};
use tetra_registry::TypeRegistry;

use crate::ast::{Binding, Expr, VariableDeclaration};
use crate::bytecode::{ConstantPool, OpCode};
use crate::compiled::{AsyncProto, CompiledFunction, CompiledModule};
use crate::context::{BlockContext, ModuleContext};
use crate::expr::emit_declaration;
use crate::function_compiler::entry_stub;
use crate::options::CompileOptions;

/// Name of the function a compiled snippet is called through.
pub const SNIPPET_ENTRY: &str = "<snippet>";

/// A session variable visible to the snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetParam {
    pub name: String,
    pub ty: RealizedType,
    pub is_const: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum SnippetBody<'a> {
    Expression(&'a Expr<'a>),
    Declaration(&'a VariableDeclaration<'a>),
}

impl SnippetBody<'_> {
    fn suspends(&self) -> bool {
        match self {
            SnippetBody::Expression(expr) => expr.suspends(),
            SnippetBody::Declaration(decl) => decl.value.suspends(),
        }
    }

    fn span(&self) -> Span {
        match self {
            SnippetBody::Expression(expr) => expr.span(),
            SnippetBody::Declaration(decl) => decl.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledSnippet {
    /// Holds [`SNIPPET_ENTRY`] and, for async snippets, its prototype.
    pub module: CompiledModule,
    pub result: RealizedType,
    /// The variable introduced by a declaration snippet.
    pub declared: Option<SnippetParam>,
    pub is_async: bool,
}

/// Compile `body` against the session variables `params`.
///
/// Every registry module named in `imports` is brought into scope as if by
/// `use module::*`. The `index` distinguishes the snippets of one session.
pub fn compile_snippet(
    registry: &TypeRegistry,
    imports: &[&str],
    index: u64,
    params: &[SnippetParam],
    body: SnippetBody<'_>,
) -> Result<CompiledSnippet, Diagnostics> {
    let mut module = ModuleContext::new("repl", registry, CompileOptions::default());
    for name in imports {
        let Some(imported) = registry.module(name) else {
            return Err(single(
                ErrorKind::InvalidImport,
                format!("Unknown module '{name}'"),
                body.span(),
            ));
        };
        for (name, ty) in imported.types() {
            module.declare_type(name, ty.clone());
        }
        for (name, function) in imported.functions() {
            module.import_native(name, function.clone());
        }
        for (name, constant) in imported.constants() {
            module.import_constant(name, constant.clone());
        }
    }

    let is_async = body.suspends();
    let mut pool = ConstantPool::new();
    let mut ctx = BlockContext::new(&module, &mut pool, RealizedType::Undefined, is_async);
    ctx.set_line(body.span());

    for param in params {
        if let Err(error) = ctx
            .scope
            .declare(&param.name, param.ty.clone(), param.is_const, body.span())
        {
            ctx.report(error);
        }
    }
    ctx.scope.push_scope();

    let (result, declared) = match body {
        SnippetBody::Expression(expr) => (expr.emit_code(&mut ctx, false), None),
        SnippetBody::Declaration(decl) => match emit_declaration(decl, &mut ctx) {
            Some((ty, slot)) => {
                ctx.emitter.emit_get_local(slot);
                let declared = match decl.binding {
                    Binding::Name(name) => Some(SnippetParam {
                        name: name.to_string(),
                        ty: ty.clone(),
                        is_const: decl.is_const,
                    }),
                    Binding::Placeholder => None,
                };
                (ty, declared)
            }
            None => {
                ctx.emitter.emit_unit();
                (RealizedType::UNIT, None)
            }
        },
    };

    if !is_async {
        for slot in 0..params.len() {
            ctx.emitter.emit_get_local(slot as u32);
        }
        ctx.emitter.emit_new_array(params.len() + 1);
    }
    ctx.emitter.emit(OpCode::Return);

    let output = ctx.finish();
    if !output.diagnostics.is_empty() {
        return Err(output.diagnostics);
    }
    let encoding_error = |error: &dyn std::fmt::Display| {
        single(
            ErrorKind::InvalidOperation,
            format!("Snippet cannot be encoded: {error}"),
            body.span(),
        )
    };
    let chunk = output.chunk.map_err(|e| encoding_error(&e))?;

    let mut protos = Vec::new();
    let (chunk, frame_size) = if is_async {
        let stub = entry_stub(&mut pool, body.span().start.line, 0, params.len())
            .map_err(|e| encoding_error(&e))?;
        protos.push(AsyncProto {
            name: SNIPPET_ENTRY.to_string(),
            suspension_points: chunk.suspension_points(),
            chunk,
            frame_size: output.frame_size,
            param_count: params.len(),
        });
        (stub, params.len() as u32)
    } else {
        (chunk, output.frame_size)
    };

    let function = CompiledFunction {
        name: SNIPPET_ENTRY.to_string(),
        hash: TypeHash::from_snippet(index),
        description: None,
        chunk,
        frame_size,
        param_count: params.len(),
        is_async,
        is_public: false,
        is_test: false,
    };
    Ok(CompiledSnippet {
        module: CompiledModule {
            name: module.name().to_string(),
            constants: pool,
            functions: vec![function],
            protos,
            globals: Vec::new(),
            global_count: 0,
        },
        result,
        declared,
        is_async,
    })
}

fn single(kind: ErrorKind, message: String, span: Span) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    diagnostics.push(StructuralError::new(kind, message, span));
    diagnostics
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tetra_core::BinaryOperator;

    use super::*;
    use crate::ast::AstBuilder;

    fn param(name: &str, ty: RealizedType) -> SnippetParam {
        SnippetParam {
            name: name.to_string(),
            ty,
            is_const: false,
        }
    }

    #[test]
    fn expression_packs_session_variables() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.alloc(b.binary(BinaryOperator::Add, b.var("x"), b.float(0.5)));

        let snippet = compile_snippet(
            &registry,
            &[],
            0,
            &[param("x", RealizedType::INT)],
            SnippetBody::Expression(expr),
        )
        .unwrap();
        assert_eq!(snippet.result, RealizedType::FLOAT);
        assert!(!snippet.is_async);
        let entry = snippet.module.function(SNIPPET_ENTRY).unwrap();
        assert_eq!(entry.param_count, 1);
        let ops = entry.chunk.opcodes();
        assert_eq!(&ops[ops.len() - 3..], [OpCode::GetLocal, OpCode::NewArray, OpCode::Return]);
    }

    #[test]
    fn declaration_reports_the_new_variable() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let decl = b.alloc(b.declaration(
            Binding::Name(b.str("x")),
            true,
            None,
            b.string("shadow"),
        ));

        let snippet = compile_snippet(
            &registry,
            &[],
            1,
            &[param("x", RealizedType::INT)],
            SnippetBody::Declaration(decl),
        )
        .unwrap();
        assert_eq!(
            snippet.declared,
            Some(SnippetParam {
                name: "x".to_string(),
                ty: RealizedType::STRING,
                is_const: true,
            })
        );
    }

    #[test]
    fn suspending_snippet_is_async() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.alloc(b.await_(b.call("wait_ticks", vec![b.int(1)])));

        let snippet =
            compile_snippet(&registry, &["core"], 2, &[], SnippetBody::Expression(expr)).unwrap();
        assert!(snippet.is_async);
        assert_eq!(snippet.result, RealizedType::UNIT);
        assert_eq!(snippet.module.protos.len(), 1);
        snippet
            .module
            .function(SNIPPET_ENTRY)
            .unwrap()
            .chunk
            .assert_opcodes(&[OpCode::NewFuture, OpCode::Return]);
    }

    #[test]
    fn type_errors_are_returned() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.alloc(b.call("print", vec![b.int(1)]));

        let errors =
            compile_snippet(&registry, &[], 3, &[], SnippetBody::Expression(expr)).unwrap_err();
        assert_eq!(errors.count_of(ErrorKind::NoSuchFunction), 1);

        let errors = compile_snippet(&registry, &["nowhere"], 3, &[], SnippetBody::Expression(expr))
            .unwrap_err();
        assert_eq!(errors.count_of(ErrorKind::InvalidImport), 1);
    }
}
