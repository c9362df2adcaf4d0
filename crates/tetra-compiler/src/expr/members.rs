//! Field access and indexing.

use tetra_core::{ErrorKind, RealizedType, Span};

use super::{Emitted, variables};
use crate::ast::Expr;
use crate::bytecode::OpCode;
use crate::context::BlockContext;

pub(super) fn emit_field<'a>(
    receiver: &Expr<'a>,
    name: &str,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let owner = receiver.emit_code(ctx, false);
    if owner.is_undefined() {
        return Emitted::value(RealizedType::Undefined);
    }
    match owner.find_field(ctx.types(), name) {
        Some(field) => {
            variables::emit_field_read(&field, ctx);
            Emitted::value(field.ty().clone())
        }
        None => {
            ctx.error(
                ErrorKind::UnresolvedMember,
                format!("Type '{owner}' has no field '{name}'"),
                span,
            );
            Emitted::value(RealizedType::Undefined)
        }
    }
}

pub(super) fn emit_index<'a>(
    target: &Expr<'a>,
    index: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let container = target.emit_code(ctx, false);
    let index_ty = index.emit_code(ctx, false);
    ctx.coerce(&RealizedType::INT, &index_ty, index.span(), || {
        "Array index".to_string()
    });
    match &container {
        RealizedType::Array(element) => {
            ctx.emitter.emit(OpCode::GetIndex);
            Emitted::value((**element).clone())
        }
        RealizedType::Undefined => {
            ctx.emitter.emit(OpCode::Pop);
            Emitted::value(RealizedType::Undefined)
        }
        other => {
            ctx.error(
                ErrorKind::InvalidOperation,
                format!("Type '{other}' cannot be indexed"),
                span,
            );
            ctx.emitter.emit(OpCode::Pop);
            Emitted::value(RealizedType::Undefined)
        }
    }
}
