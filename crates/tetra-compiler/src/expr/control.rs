//! Blocks, branches, loops and the statements that leave them.

use tetra_core::{ErrorKind, RealizedType, Span};

use super::Emitted;
use crate::ast::{Block, Expr};
use crate::bytecode::OpCode;
use crate::context::BlockContext;
use crate::for_in::source_for;

pub(super) fn emit_block<'a>(block: &Block<'a>, ctx: &mut BlockContext<'_, 'a>) -> Emitted {
    ctx.scope.push_scope();
    let mut diverged = false;
    for statement in block.statements {
        statement.emit_code(ctx, true);
        diverged |= statement.diverges();
    }
    let emitted = match block.result {
        Some(result) => Emitted::value(result.emit_code(ctx, false)),
        None if diverged => Emitted::statement(RealizedType::Undefined),
        None => Emitted::statement(RealizedType::UNIT),
    };
    ctx.scope.pop_scope();
    emitted
}

fn emit_condition<'a>(condition: &Expr<'a>, what: &str, ctx: &mut BlockContext<'_, 'a>) {
    let ty = condition.emit_code(ctx, false);
    ctx.coerce(&RealizedType::BOOL, &ty, condition.span(), || {
        format!("Condition of '{what}'")
    });
}

pub(super) fn emit_if<'a>(
    condition: &Expr<'a>,
    then_branch: &Block<'a>,
    else_branch: Option<&Expr<'a>>,
    _span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    emit_condition(condition, "if", ctx);
    let to_else = ctx.emitter.emit_jump(OpCode::JumpIfFalse);

    let Some(else_branch) = else_branch else {
        then_branch.emit_code(ctx, true);
        ctx.emitter.patch_jump(to_else);
        return Emitted::statement(RealizedType::UNIT);
    };

    let then_ty = then_branch.emit_code(ctx, false);
    let to_end = ctx.emitter.emit_jump(OpCode::Jump);
    ctx.emitter.patch_jump(to_else);
    let else_ty = else_branch.emit_code(ctx, false);
    if !then_ty.is_undefined() {
        ctx.coerce(&then_ty, &else_ty, else_branch.span(), || {
            "Branches of 'if' disagree".to_string()
        });
    }
    ctx.emitter.patch_jump(to_end);

    if then_ty.is_undefined() {
        Emitted::value(else_ty)
    } else {
        Emitted::value(then_ty)
    }
}

pub(super) fn emit_while<'a>(
    condition: &Expr<'a>,
    body: &Block<'a>,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let start = ctx.emitter.current_offset();
    emit_condition(condition, "while", ctx);
    let exit = ctx.emitter.emit_jump(OpCode::JumpIfFalse);

    ctx.emitter.enter_loop(start);
    body.emit_code(ctx, true);
    ctx.emitter.emit_loop(start);
    ctx.emitter.patch_jump(exit);
    ctx.emitter.exit_loop();
    Emitted::statement(RealizedType::UNIT)
}

pub(super) fn emit_for_in<'a>(
    variable: &str,
    source: &Expr<'a>,
    body: &Block<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let source_ty = source.emit_code(ctx, false);
    let kind = source_ty.for_in(ctx.types());
    ctx.scope.push_scope();

    let Some(kind) = kind else {
        if !source_ty.is_undefined() {
            ctx.error(
                ErrorKind::InvalidOperation,
                format!("Type '{source_ty}' is not iterable"),
                source.span(),
            );
        }
        // still check the body
        ctx.emitter.emit(OpCode::Pop);
        declare_loop_variable(variable, RealizedType::Undefined, span, ctx);
        let start = ctx.emitter.current_offset();
        ctx.emitter.enter_loop(start);
        body.emit_code(ctx, true);
        ctx.emitter.exit_loop();
        ctx.scope.pop_scope();
        return Emitted::statement(RealizedType::UNIT);
    };

    let protocol = source_for(kind, ctx);
    protocol.initialize(ctx);
    let slot = declare_loop_variable(variable, protocol.element_type(), span, ctx);
    let to_check = ctx.emitter.emit_jump(OpCode::Jump);

    let body_start = ctx.emitter.current_offset();
    ctx.emitter.enter_loop_deferred();
    protocol.next(ctx);
    match slot {
        Some(slot) => ctx.emitter.emit_set_local(slot),
        None => ctx.emitter.emit(OpCode::Pop),
    }
    body.emit_code(ctx, true);

    ctx.emitter.set_continue_target();
    ctx.emitter.patch_jump(to_check);
    protocol.check_done(ctx, body_start);
    ctx.emitter.exit_loop();
    ctx.scope.pop_scope();
    Emitted::statement(RealizedType::UNIT)
}

fn declare_loop_variable(
    name: &str,
    ty: RealizedType,
    span: Span,
    ctx: &mut BlockContext<'_, '_>,
) -> Option<u32> {
    match ctx.scope.declare(name, ty, false, span) {
        Ok(slot) => Some(slot),
        Err(error) => {
            ctx.report(error);
            None
        }
    }
}

pub(super) fn emit_return<'a>(
    value: Option<&Expr<'a>>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let actual = match value {
        Some(value) => value.emit_code(ctx, false),
        None => {
            ctx.emitter.emit_unit();
            RealizedType::UNIT
        }
    };
    let expected = ctx.return_type().clone();
    ctx.coerce(&expected, &actual, value.map_or(span, Expr::span), || {
        "Return value".to_string()
    });
    ctx.emitter.emit(OpCode::Return);
    Emitted::statement(RealizedType::Undefined)
}

pub(super) fn emit_break(span: Span, ctx: &mut BlockContext<'_, '_>) -> Emitted {
    if ctx.emitter.emit_break().is_err() {
        ctx.error(
            ErrorKind::InvalidOperation,
            "'break' outside of a loop",
            span,
        );
    }
    Emitted::statement(RealizedType::Undefined)
}

pub(super) fn emit_continue(span: Span, ctx: &mut BlockContext<'_, '_>) -> Emitted {
    if ctx.emitter.emit_continue().is_err() {
        ctx.error(
            ErrorKind::InvalidOperation,
            "'continue' outside of a loop",
            span,
        );
    }
    Emitted::statement(RealizedType::Undefined)
}

pub(super) fn emit_await<'a>(
    future: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let ty = future.emit_code(ctx, false);
    if !ctx.is_async() {
        ctx.error(
            ErrorKind::InvalidOperation,
            "'await' is only allowed in async functions",
            span,
        );
        return Emitted::value(RealizedType::Undefined);
    }
    match ty {
        RealizedType::Future(result) => {
            ctx.emitter.emit(OpCode::Await);
            Emitted::value((*result).clone())
        }
        RealizedType::Undefined => Emitted::value(RealizedType::Undefined),
        other => {
            ctx.error(
                ErrorKind::InvalidOperation,
                format!("Cannot await a value of type '{other}'"),
                future.span(),
            );
            Emitted::value(RealizedType::Undefined)
        }
    }
}

pub(super) fn emit_yield(span: Span, ctx: &mut BlockContext<'_, '_>) -> Emitted {
    if !ctx.is_async() {
        ctx.error(
            ErrorKind::InvalidOperation,
            "'yield' is only allowed in async functions",
            span,
        );
    } else {
        ctx.emitter.emit(OpCode::Yield);
    }
    Emitted::statement(RealizedType::UNIT)
}
