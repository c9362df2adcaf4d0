//! Operator expressions, resolved through the left operand's operator table.

use tetra_core::{
    BinaryOperator, ErrorKind, Intrinsic, RealizedType, ResolvedOperator, Span, UnaryOperator,
};

use super::Emitted;
use crate::ast::{Expr, LogicalOperator};
use crate::bytecode::OpCode;
use crate::context::BlockContext;

pub(super) fn emit_unary<'a>(
    op: UnaryOperator,
    operand: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let ty = operand.emit_code(ctx, false);
    if ty.is_undefined() {
        return Emitted::value(RealizedType::Undefined);
    }
    match ty.find_unary(ctx.types(), op) {
        Some(resolved) => {
            emit_resolved(&resolved, 1, ctx);
            Emitted::value(resolved.result)
        }
        None => {
            ctx.error(
                ErrorKind::UnresolvedOperator,
                format!("Operator '{op}' is not defined for type '{ty}'"),
                span,
            );
            Emitted::value(RealizedType::Undefined)
        }
    }
}

pub(super) fn emit_binary<'a>(
    op: BinaryOperator,
    left: &Expr<'a>,
    right: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let left_ty = left.emit_code(ctx, false);
    Emitted::value(emit_operator_rhs(op, &left_ty, right, span, ctx))
}

/// With the left operand already on the stack, emit `right` and apply `op`.
///
/// Compound assignment operators fall back to their plain counterpart. An
/// `int` left operand is widened when only the `float` table accepts the
/// right operand.
pub(super) fn emit_operator_rhs<'a>(
    op: BinaryOperator,
    left_ty: &RealizedType,
    right: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> RealizedType {
    let right_ty = right.emit_code(ctx, false);
    if left_ty.is_undefined() || right_ty.is_undefined() {
        ctx.emitter.emit(OpCode::Pop);
        return RealizedType::Undefined;
    }

    let candidates = std::iter::once(op).chain(op.assign_base());
    for candidate in candidates {
        if let Some(resolved) = left_ty.find_binary(ctx.types(), candidate, &right_ty) {
            if resolved
                .other
                .as_ref()
                .is_some_and(|other| other.needs_int_to_float(&right_ty))
            {
                ctx.emitter.emit_intrinsic(Intrinsic::IntToFloat);
            }
            emit_resolved(&resolved, 2, ctx);
            return resolved.result;
        }
        if *left_ty == RealizedType::INT && right_ty == RealizedType::FLOAT {
            let widened = RealizedType::FLOAT.find_binary(ctx.types(), candidate, &right_ty);
            if let Some(resolved) = widened {
                let e = &mut ctx.emitter;
                e.emit(OpCode::Swap);
                e.emit_intrinsic(Intrinsic::IntToFloat);
                e.emit(OpCode::Swap);
                emit_resolved(&resolved, 2, ctx);
                return resolved.result;
            }
        }
    }

    ctx.error(
        ErrorKind::UnresolvedOperator,
        format!("Operator '{op}' is not defined for types '{left_ty}' and '{right_ty}'"),
        span,
    );
    ctx.emitter.emit(OpCode::Pop);
    RealizedType::Undefined
}

fn emit_resolved(resolved: &ResolvedOperator, argc: usize, ctx: &mut BlockContext<'_, '_>) {
    ctx.emitter.emit_invoke(&resolved.target, argc);
    if let Some(post) = resolved.post {
        ctx.emitter.emit_intrinsic(post);
    }
}

/// `&&` and `||` with short-circuit evaluation.
pub(super) fn emit_logical<'a>(
    op: LogicalOperator,
    left: &Expr<'a>,
    right: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let symbol = match op {
        LogicalOperator::And => "&&",
        LogicalOperator::Or => "||",
    };
    let left_ty = left.emit_code(ctx, false);
    ctx.coerce(&RealizedType::BOOL, &left_ty, left.span(), || {
        format!("Left operand of '{symbol}'")
    });

    ctx.emitter.emit(OpCode::Dup);
    let end = ctx.emitter.emit_jump(match op {
        LogicalOperator::And => OpCode::JumpIfFalse,
        LogicalOperator::Or => OpCode::JumpIfTrue,
    });
    ctx.emitter.emit(OpCode::Pop);
    let right_ty = right.emit_code(ctx, false);
    ctx.coerce(&RealizedType::BOOL, &right_ty, span, || {
        format!("Right operand of '{symbol}'")
    });
    ctx.emitter.patch_jump(end);
    Emitted::value(RealizedType::BOOL)
}
