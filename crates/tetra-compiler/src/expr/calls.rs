//! Function and method calls.

use tetra_core::{ErrorKind, RealizedType, Span, SubstitutionMap};

use super::Emitted;
use crate::ast::{Callee, Expr};
use crate::bytecode::OpCode;
use crate::context::BlockContext;

pub(super) fn emit_call<'a>(
    callee: &Callee<'a>,
    args: &[Expr<'a>],
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    match callee {
        Callee::Named { module: None, name } => emit_named_call(name, args, span, ctx),
        Callee::Named {
            module: Some(module),
            name,
        } => emit_qualified_call(module, name, args, span, ctx),
        Callee::Expr(function) => {
            let ty = function.emit_code(ctx, false);
            emit_value_call(&ty, "function value", args, span, ctx)
        }
    }
}

fn emit_named_call<'a>(
    name: &str,
    args: &[Expr<'a>],
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    // locals holding functions shadow module functions
    if let Some(var) = ctx.scope.get(name) {
        let (slot, ty) = (var.slot, var.ty.clone());
        ctx.emitter.emit_get_local(slot);
        return emit_value_call(&ty, name, args, span, ctx);
    }

    let module = ctx.module;
    if let Some(function) = module.function(name) {
        let params: Vec<RealizedType> = function.params.iter().map(|(_, t)| t.clone()).collect();
        let arity = Arity {
            required: function.required_params(),
            total: params.len(),
        };
        if !check_arity(name, arity, args.len(), span, ctx) {
            return Emitted::failed(ctx);
        }
        emit_arguments(name, &params, args, ctx);
        for index in args.len()..params.len() {
            let Some(default) = function.defaults[index] else {
                continue;
            };
            let actual = default.emit_code(ctx, false);
            ctx.coerce(&params[index], &actual, default.span(), || {
                format!("Default value of parameter '{}'", function.params[index].0)
            });
        }
        ctx.emitter
            .emit_call(function.hash, &function.name, params.len());
        return Emitted::value(function.call_result());
    }

    if let Some(native) = module.native(name) {
        let params: Vec<RealizedType> = native.params.iter().map(|(_, t)| t.clone()).collect();
        if !check_arity(name, Arity::exact(params.len()), args.len(), span, ctx) {
            return Emitted::failed(ctx);
        }
        emit_arguments(name, &params, args, ctx);
        ctx.emitter.emit_call_native(&native.native, params.len());
        return Emitted::value(native.result.clone());
    }

    if module.has_value(name) {
        // a module constant, for example a function-typed one
        let ty = super::variables::emit_variable(None, name, span, ctx).ty;
        return emit_value_call(&ty, name, args, span, ctx);
    }

    ctx.error(
        ErrorKind::NoSuchFunction,
        format!("No function named '{name}'"),
        span,
    );
    Emitted::failed(ctx)
}

fn emit_qualified_call<'a>(
    module_name: &str,
    name: &str,
    args: &[Expr<'a>],
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let function = ctx
        .module
        .resolve_module(module_name)
        .and_then(|m| m.find_function(name));
    let Some(function) = function else {
        ctx.error(
            ErrorKind::NoSuchFunction,
            format!("No function named '{module_name}::{name}'"),
            span,
        );
        return Emitted::failed(ctx);
    };
    let params: Vec<RealizedType> = function.params.iter().map(|(_, t)| t.clone()).collect();
    let qualified = format!("{module_name}::{name}");
    if !check_arity(&qualified, Arity::exact(params.len()), args.len(), span, ctx) {
        return Emitted::failed(ctx);
    }
    emit_arguments(&qualified, &params, args, ctx);
    ctx.emitter.emit_call_native(&function.native, params.len());
    Emitted::value(function.result.clone())
}

/// Call the function value on top of the stack.
fn emit_value_call<'a>(
    ty: &RealizedType,
    name: &str,
    args: &[Expr<'a>],
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let function = match ty {
        RealizedType::Function(function) => function.clone(),
        RealizedType::Undefined => return Emitted::value(RealizedType::Undefined),
        other => {
            ctx.error(
                ErrorKind::InvalidOperation,
                format!("'{name}' of type '{other}' is not callable"),
                span,
            );
            return Emitted::value(RealizedType::Undefined);
        }
    };
    let params = function.params();
    if !check_arity(name, Arity::exact(params.len()), args.len(), span, ctx) {
        return Emitted::value(RealizedType::Undefined);
    }
    emit_arguments(name, params, args, ctx);
    ctx.emitter.emit_call_value(params.len());
    Emitted::value(function.result().clone())
}

pub(super) fn emit_method_call<'a>(
    receiver: &Expr<'a>,
    name: &str,
    args: &[Expr<'a>],
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let owner = receiver.emit_code(ctx, false);
    if owner.is_undefined() {
        return Emitted::value(RealizedType::Undefined);
    }
    let Some(method) = owner.find_method(ctx.types(), name) else {
        ctx.error(
            ErrorKind::UnresolvedMember,
            format!("Type '{owner}' has no method '{name}'"),
            span,
        );
        return Emitted::value(RealizedType::Undefined);
    };
    if !method.is_direct {
        ctx.emitter.emit(OpCode::Pop);
    }
    if !check_arity(name, Arity::exact(method.params.len()), args.len(), span, ctx) {
        return if method.is_direct {
            Emitted::value(RealizedType::Undefined)
        } else {
            Emitted::failed(ctx)
        };
    }

    let mut substitution = SubstitutionMap::default();
    let mut inferred = true;
    for (i, (param, arg)) in method.params.iter().zip(args).enumerate() {
        let expected = param.ty.fill_generics(&substitution);
        let actual = arg.emit_code(ctx, false);
        if !expected.has_generics() {
            ctx.coerce(&expected, &actual, arg.span(), || {
                format!("Argument {} ('{}') of '{name}'", i + 1, param.name)
            });
        } else if !actual.is_undefined() && !expected.unify(&actual, &mut substitution) {
            ctx.error(
                ErrorKind::GenericInferenceFailure,
                format!(
                    "Cannot infer generic arguments of '{name}' from argument {}: expected {expected}, found {actual}",
                    i + 1
                ),
                arg.span(),
            );
            inferred = false;
        }
    }

    let mut result = method.result.fill_generics(&substitution);
    if inferred && result.has_generics() {
        ctx.error(
            ErrorKind::GenericInferenceFailure,
            format!("Cannot infer the result type '{result}' of '{name}'"),
            span,
        );
        result = RealizedType::Undefined;
    } else if !inferred {
        result = RealizedType::Undefined;
    }

    let argc = args.len() + usize::from(method.is_direct);
    ctx.emitter.emit_invoke(&method.target, argc);
    Emitted::value(result)
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Arity {
    required: usize,
    total: usize,
}

impl Arity {
    fn exact(n: usize) -> Self {
        Self {
            required: n,
            total: n,
        }
    }
}

fn check_arity(
    name: &str,
    arity: Arity,
    given: usize,
    span: Span,
    ctx: &mut BlockContext<'_, '_>,
) -> bool {
    if (arity.required..=arity.total).contains(&given) {
        return true;
    }
    let expected = if arity.required == arity.total {
        arity.total.to_string()
    } else {
        format!("{} to {}", arity.required, arity.total)
    };
    ctx.error(
        ErrorKind::ArgumentMismatch,
        format!("'{name}' expects {expected} argument(s), got {given}"),
        span,
    );
    false
}

/// Emit the given arguments, converting each to its parameter type.
fn emit_arguments<'a>(
    name: &str,
    params: &[RealizedType],
    args: &[Expr<'a>],
    ctx: &mut BlockContext<'_, 'a>,
) {
    for (i, (param, arg)) in params.iter().zip(args).enumerate() {
        let actual = arg.emit_code(ctx, false);
        ctx.coerce(param, &actual, arg.span(), || {
            format!("Argument {} of '{name}'", i + 1)
        });
    }
}
