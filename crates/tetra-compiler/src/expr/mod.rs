//! Expression checking and emission.
//!
//! Every node supports two operations against a [`BlockContext`]:
//!
//! - [`Expr::result_type`]: the type the node evaluates to. Never reports a
//!   diagnostic and leaves no code behind.
//! - [`Expr::emit_code`]: emit the node, reporting problems as diagnostics.
//!   With `drop_result` the node leaves nothing on the stack, otherwise
//!   exactly one value.
//!
//! A node that fails to check has type `Undefined`, which is assignable to
//! and from every type so one error does not cascade.

mod calls;
mod collections;
mod control;
mod literals;
mod members;
mod operators;
mod variables;

use tetra_core::RealizedType;

use crate::ast::{Block, Expr};
use crate::bytecode::OpCode;
use crate::context::BlockContext;

pub(crate) use variables::emit_declaration;

/// What a node left behind: its type and whether it pushed a value.
#[derive(Debug, Clone)]
pub(crate) struct Emitted {
    pub ty: RealizedType,
    pub pushed: bool,
}

impl Emitted {
    pub fn value(ty: RealizedType) -> Self {
        Self { ty, pushed: true }
    }

    pub fn statement(ty: RealizedType) -> Self {
        Self { ty, pushed: false }
    }

    /// A node that failed to check; it still pushes a placeholder value.
    pub fn failed(ctx: &mut BlockContext<'_, '_>) -> Self {
        ctx.emitter.emit_unit();
        Self::value(RealizedType::Undefined)
    }
}

impl<'a> Expr<'a> {
    /// Type of this expression in `ctx`, without emitting or reporting.
    pub fn result_type(&self, ctx: &mut BlockContext<'_, 'a>) -> RealizedType {
        ctx.probe(|ctx| self.emit_code(ctx, false))
    }

    /// Emit this expression and return its type.
    pub fn emit_code(&self, ctx: &mut BlockContext<'_, 'a>, drop_result: bool) -> RealizedType {
        ctx.set_line(self.span());
        let emitted = match self {
            Expr::Literal(literal, _) => literals::emit_literal(literal, ctx),
            Expr::Variable { module, name, span } => {
                variables::emit_variable(*module, name, *span, ctx)
            }
            Expr::Unary { op, operand, span } => operators::emit_unary(*op, operand, *span, ctx),
            Expr::Binary {
                op,
                left,
                right,
                span,
            } => operators::emit_binary(*op, left, right, *span, ctx),
            Expr::Logical {
                op,
                left,
                right,
                span,
            } => operators::emit_logical(*op, left, right, *span, ctx),
            Expr::Assign {
                target,
                op,
                value,
                span,
            } => variables::emit_assign(target, *op, value, *span, ctx),
            Expr::Call { callee, args, span } => calls::emit_call(callee, args, *span, ctx),
            Expr::MethodCall {
                receiver,
                method,
                args,
                span,
            } => calls::emit_method_call(receiver, method, args, *span, ctx),
            Expr::Field {
                receiver,
                name,
                span,
            } => members::emit_field(receiver, name, *span, ctx),
            Expr::Index {
                target,
                index,
                span,
            } => members::emit_index(target, index, *span, ctx),
            Expr::Array(elements, span) => collections::emit_array(elements, *span, ctx),
            Expr::Record(fields, span) => collections::emit_record(fields, *span, ctx),
            Expr::Range {
                from,
                to,
                inclusive,
                span,
            } => collections::emit_range(from, to, *inclusive, *span, ctx),
            Expr::Block(block) => control::emit_block(block, ctx),
            Expr::If {
                condition,
                then_branch,
                else_branch,
                span,
            } => control::emit_if(condition, then_branch, *else_branch, *span, ctx),
            Expr::While {
                condition, body, ..
            } => control::emit_while(condition, body, ctx),
            Expr::ForIn {
                variable,
                source,
                body,
                span,
            } => control::emit_for_in(variable, source, body, *span, ctx),
            Expr::VarDecl(decl) => {
                variables::emit_declaration(decl, ctx);
                Emitted::statement(RealizedType::UNIT)
            }
            Expr::Return(value, span) => control::emit_return(*value, *span, ctx),
            Expr::Break(span) => control::emit_break(*span, ctx),
            Expr::Continue(span) => control::emit_continue(*span, ctx),
            Expr::Await(future, span) => control::emit_await(future, *span, ctx),
            Expr::Yield(span) => control::emit_yield(*span, ctx),
        };
        match (drop_result, emitted.pushed) {
            (true, true) => ctx.emitter.emit(OpCode::Pop),
            (false, false) => ctx.emitter.emit_unit(),
            _ => {}
        }
        emitted.ty
    }
}

impl<'a> Block<'a> {
    pub fn result_type(&self, ctx: &mut BlockContext<'_, 'a>) -> RealizedType {
        ctx.probe(|ctx| self.emit_code(ctx, false))
    }

    pub fn emit_code(&self, ctx: &mut BlockContext<'_, 'a>, drop_result: bool) -> RealizedType {
        let emitted = control::emit_block(self, ctx);
        match (drop_result, emitted.pushed) {
            (true, true) => ctx.emitter.emit(OpCode::Pop),
            (false, false) => ctx.emitter.emit_unit(),
            _ => {}
        }
        emitted.ty
    }
}
