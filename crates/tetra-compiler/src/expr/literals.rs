//! Literal emission.

use tetra_core::RealizedType;

use super::Emitted;
use crate::ast::Literal;
use crate::context::BlockContext;

pub(super) fn emit_literal(literal: &Literal<'_>, ctx: &mut BlockContext<'_, '_>) -> Emitted {
    let e = &mut ctx.emitter;
    let ty = match literal {
        Literal::Unit => {
            e.emit_unit();
            RealizedType::UNIT
        }
        Literal::Bool(b) => {
            e.emit_bool(*b);
            RealizedType::BOOL
        }
        Literal::Int(i) => {
            e.emit_int(*i);
            RealizedType::INT
        }
        Literal::Float(f) => {
            e.emit_float(*f);
            RealizedType::FLOAT
        }
        Literal::String(s) => {
            e.emit_string(s);
            RealizedType::STRING
        }
    };
    Emitted::value(ty)
}
