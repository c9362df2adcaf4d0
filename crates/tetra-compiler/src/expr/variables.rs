//! Variable reads, declarations and assignment.

use std::sync::Arc;

use tetra_core::{BinaryOperator, ConstantValue, ErrorKind, RealizedType, ResolvedField, Span};

use super::{Emitted, operators};
use crate::ast::{Binding, Expr, VariableDeclaration};
use crate::bytecode::OpCode;
use crate::context::BlockContext;
use crate::emit::BytecodeEmitter;

// ============================================================================
// Reads
// ============================================================================

pub(super) fn emit_variable(
    module: Option<&str>,
    name: &str,
    span: Span,
    ctx: &mut BlockContext<'_, '_>,
) -> Emitted {
    match module {
        None => emit_local_name(name, span, ctx),
        Some(module) => emit_qualified_name(module, name, span, ctx),
    }
}

fn emit_local_name(name: &str, span: Span, ctx: &mut BlockContext<'_, '_>) -> Emitted {
    if let Some(var) = ctx.scope.get(name) {
        let (slot, ty) = (var.slot, var.ty.clone());
        ctx.emitter.emit_get_local(slot);
        return Emitted::value(ty);
    }
    let module = ctx.module;
    if let Some(constant) = module.constant(name) {
        ctx.emitter.emit_get_global(constant.slot);
        return Emitted::value(constant.ty.clone());
    }
    if let Some(constant) = module.imported_constant(name) {
        emit_constant_value(&mut ctx.emitter, &constant.value);
        return Emitted::value(constant.ty.clone());
    }
    if let Some(function) = module.function(name) {
        ctx.emitter.emit_function_ref(function.hash, &function.name);
        return Emitted::value(function.value_type());
    }
    if let Some(native) = module.native(name) {
        ctx.emitter.emit_native_ref(&native.native);
        return Emitted::value(RealizedType::function(
            native.params.iter().map(|(_, ty)| ty.clone()).collect(),
            native.result.clone(),
        ));
    }

    if ctx.scope.is_inferring(name) {
        ctx.error(
            ErrorKind::InvalidType,
            format!("Cannot infer type of '{name}': its initializer refers to itself"),
            span,
        );
    } else {
        ctx.error(
            ErrorKind::NoSuchVariable,
            format!("No variable named '{name}'"),
            span,
        );
    }
    Emitted::failed(ctx)
}

fn emit_qualified_name(
    module_name: &str,
    name: &str,
    span: Span,
    ctx: &mut BlockContext<'_, '_>,
) -> Emitted {
    let Some(module) = ctx.module.resolve_module(module_name) else {
        ctx.error(
            ErrorKind::NoSuchVariable,
            format!("Unknown module '{module_name}'"),
            span,
        );
        return Emitted::failed(ctx);
    };
    if let Some(constant) = module.find_constant(name) {
        emit_constant_value(&mut ctx.emitter, &constant.value);
        return Emitted::value(constant.ty.clone());
    }
    if let Some(function) = module.find_function(name) {
        ctx.emitter.emit_native_ref(&function.native);
        return Emitted::value(RealizedType::Function(Arc::new(function.signature())));
    }
    ctx.error(
        ErrorKind::NoSuchVariable,
        format!("Module '{module_name}' has no constant or function '{name}'"),
        span,
    );
    Emitted::failed(ctx)
}

pub(crate) fn emit_constant_value(e: &mut BytecodeEmitter<'_>, value: &ConstantValue) {
    match value {
        ConstantValue::Unit => e.emit_unit(),
        ConstantValue::Bool(b) => e.emit_bool(*b),
        ConstantValue::Int(i) => e.emit_int(*i),
        ConstantValue::Float(f) => e.emit_float(*f),
        ConstantValue::String(s) => e.emit_string(s),
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Emit `let`/`const`, returning the variable's type and slot when a name
/// was bound.
pub(crate) fn emit_declaration<'a>(
    decl: &VariableDeclaration<'a>,
    ctx: &mut BlockContext<'_, 'a>,
) -> Option<(RealizedType, u32)> {
    let declared = match decl.ty {
        Some(ty_ref) => match ty_ref.resolve(ctx.types()) {
            Ok(ty) => Some(ty),
            Err(error) => {
                ctx.report(error);
                Some(RealizedType::Undefined)
            }
        },
        None => None,
    };

    let ty = match (&declared, decl.binding) {
        (Some(expected), binding) => {
            let actual = decl.value.emit_code(ctx, false);
            ctx.coerce(expected, &actual, decl.value.span(), || match binding {
                Binding::Name(name) => format!("Cannot initialize '{name}'"),
                Binding::Placeholder => "Cannot initialize '_'".to_string(),
            });
            expected.clone()
        }
        (None, Binding::Name(name)) => {
            ctx.scope.begin_inference(name);
            let actual = decl.value.emit_code(ctx, false);
            ctx.scope.end_inference();
            actual
        }
        (None, Binding::Placeholder) => decl.value.emit_code(ctx, false),
    };

    match decl.binding {
        Binding::Placeholder => {
            ctx.emitter.emit(OpCode::Pop);
            None
        }
        Binding::Name(name) => match ctx.scope.declare(name, ty.clone(), decl.is_const, decl.span) {
            Ok(slot) => {
                ctx.emitter.emit_set_local(slot);
                Some((ty, slot))
            }
            Err(error) => {
                ctx.report(error);
                ctx.emitter.emit(OpCode::Pop);
                None
            }
        },
    }
}

// ============================================================================
// Assignment
// ============================================================================

pub(super) fn emit_assign<'a>(
    target: &Expr<'a>,
    op: Option<BinaryOperator>,
    value: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    match target {
        Expr::Variable {
            module: None, name, ..
        } => assign_variable(name, op, value, span, ctx),
        Expr::Field { receiver, name, .. } => assign_field(receiver, name, op, value, span, ctx),
        Expr::Variable {
            module: Some(module),
            name,
            ..
        } => {
            ctx.error(
                ErrorKind::InvalidOperation,
                format!("Cannot assign to '{module}::{name}'"),
                span,
            );
            Emitted::statement(RealizedType::UNIT)
        }
        _ => {
            ctx.error(
                ErrorKind::InvalidOperation,
                "Invalid assignment target",
                target.span(),
            );
            Emitted::statement(RealizedType::UNIT)
        }
    }
}

/// Emit the value to store: either `value` itself, or `current op value`
/// when `current` is already on the stack.
fn emit_new_value<'a>(
    expected: &RealizedType,
    op: Option<BinaryOperator>,
    value: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
    what: &str,
) {
    let actual = match op {
        None => value.emit_code(ctx, false),
        Some(op) => operators::emit_operator_rhs(op, expected, value, span, ctx),
    };
    ctx.coerce(expected, &actual, span, || format!("Cannot assign to {what}"));
}

fn assign_variable<'a>(
    name: &str,
    op: Option<BinaryOperator>,
    value: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let Some(var) = ctx.scope.get(name).cloned() else {
        if ctx.module.has_value(name) {
            ctx.error(
                ErrorKind::InvalidOperation,
                format!("Cannot assign to module-level '{name}'"),
                span,
            );
        } else {
            ctx.error(
                ErrorKind::NoSuchVariable,
                format!("No variable named '{name}'"),
                span,
            );
        }
        return Emitted::statement(RealizedType::UNIT);
    };
    if var.is_const {
        ctx.error(
            ErrorKind::InvalidOperation,
            format!("Cannot assign to constant '{name}'"),
            span,
        );
        return Emitted::statement(RealizedType::UNIT);
    }

    if op.is_some() {
        ctx.emitter.emit_get_local(var.slot);
    }
    emit_new_value(&var.ty, op, value, span, ctx, &format!("'{name}'"));
    ctx.emitter.emit_set_local(var.slot);
    Emitted::statement(RealizedType::UNIT)
}

fn assign_field<'a>(
    receiver: &Expr<'a>,
    name: &str,
    op: Option<BinaryOperator>,
    value: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let owner = receiver.emit_code(ctx, false);
    if owner.is_undefined() {
        ctx.emitter.emit(OpCode::Pop);
        return Emitted::statement(RealizedType::UNIT);
    }
    let Some(field) = writable_field(&owner, name, span, ctx) else {
        ctx.emitter.emit(OpCode::Pop);
        return Emitted::statement(RealizedType::UNIT);
    };

    if op.is_some() {
        ctx.emitter.emit(OpCode::Dup);
        emit_field_read(&field, ctx);
    }
    emit_new_value(field.ty(), op, value, span, ctx, &format!("field '{name}'"));
    finish_field_write(&field, receiver, span, ctx);
    Emitted::statement(RealizedType::UNIT)
}

fn writable_field(
    owner: &RealizedType,
    name: &str,
    span: Span,
    ctx: &mut BlockContext<'_, '_>,
) -> Option<ResolvedField> {
    let Some(field) = owner.find_field(ctx.types(), name) else {
        ctx.error(
            ErrorKind::UnresolvedMember,
            format!("Type '{owner}' has no field '{name}'"),
            span,
        );
        return None;
    };
    if !field.is_writable() {
        ctx.error(
            ErrorKind::InvalidOperation,
            format!("Field '{name}' of type '{owner}' is read-only"),
            span,
        );
        return None;
    }
    Some(field)
}

pub(super) fn emit_field_read(field: &ResolvedField, ctx: &mut BlockContext<'_, '_>) {
    match field {
        ResolvedField::RecordSlot { index, .. } => ctx.emitter.emit_get_record_field(*index),
        ResolvedField::Accessor { getter, .. } => ctx.emitter.emit_invoke(getter, 1),
    }
}

/// Stack: owner, value.
///
/// A record slot is copied with the new value and the copy is stored back
/// into `receiver`. A host setter writes through the handle, so the owner
/// needs no store.
fn finish_field_write<'a>(
    field: &ResolvedField,
    receiver: &Expr<'a>,
    span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) {
    match field {
        ResolvedField::RecordSlot { index, .. } => {
            ctx.emitter.emit_set_record_field(*index);
            store_back(receiver, span, ctx);
        }
        ResolvedField::Accessor {
            setter: Some(setter),
            ..
        } => {
            ctx.emitter.emit_invoke(setter, 2);
            ctx.emitter.emit(OpCode::Pop);
        }
        ResolvedField::Accessor { setter: None, .. } => {
            ctx.emitter.emit(OpCode::Pop);
            ctx.emitter.emit(OpCode::Pop);
        }
    }
}

/// Write the updated value on top of the stack back into `target`.
fn store_back<'a>(target: &Expr<'a>, span: Span, ctx: &mut BlockContext<'_, 'a>) {
    match target {
        Expr::Variable {
            module: None, name, ..
        } => match ctx.scope.get(name).cloned() {
            Some(var) if !var.is_const => ctx.emitter.emit_set_local(var.slot),
            _ => {
                ctx.error(
                    ErrorKind::InvalidOperation,
                    format!("Cannot assign to constant '{name}'"),
                    span,
                );
                ctx.emitter.emit(OpCode::Pop);
            }
        },
        Expr::Field { receiver, name, .. } => {
            let owner = receiver.emit_code(ctx, false);
            ctx.emitter.emit(OpCode::Swap);
            let field = if owner.is_undefined() {
                None
            } else {
                writable_field(&owner, name, span, ctx)
            };
            match field {
                Some(field) => finish_field_write(&field, receiver, span, ctx),
                None => {
                    ctx.emitter.emit(OpCode::Pop);
                    ctx.emitter.emit(OpCode::Pop);
                }
            }
        }
        // host handles are updated in place
        _ => ctx.emitter.emit(OpCode::Pop),
    }
}
