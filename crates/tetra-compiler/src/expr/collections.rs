//! Array, record and range literals.

use tetra_core::{ErrorKind, RealizedType, RecordField, Span};

use super::Emitted;
use crate::ast::Expr;
use crate::context::BlockContext;

/// `[a, b, c]`: every element must have the type of the first one.
///
/// An empty literal has no element type to offer and checks as `Undefined`,
/// so it is accepted wherever an array is expected.
pub(super) fn emit_array<'a>(
    elements: &[Expr<'a>],
    _span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let Some((first, rest)) = elements.split_first() else {
        ctx.emitter.emit_new_array(0);
        return Emitted::value(RealizedType::Undefined);
    };

    let element = first.emit_code(ctx, false);
    for (i, item) in rest.iter().enumerate() {
        let actual = item.emit_code(ctx, false);
        ctx.coerce(&element, &actual, item.span(), || {
            format!("Array element {}", i + 2)
        });
    }
    ctx.emitter.emit_new_array(elements.len());
    if element.is_undefined() {
        Emitted::value(RealizedType::Undefined)
    } else {
        Emitted::value(RealizedType::array(element))
    }
}

/// `{ x: 1, y: 2 }`: fields keep their written order.
pub(super) fn emit_record<'a>(
    fields: &[(&'a str, Expr<'a>)],
    _span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    let mut record = Vec::with_capacity(fields.len());
    for (name, value) in fields {
        let ty = value.emit_code(ctx, false);
        if record.iter().any(|f: &RecordField| &*f.name == *name) {
            ctx.error(
                ErrorKind::DuplicateDeclaration,
                format!("Field '{name}' appears more than once in the record"),
                value.span(),
            );
        }
        record.push(RecordField::new(name, ty));
    }
    ctx.emitter.emit_new_record(fields.len());
    Emitted::value(RealizedType::record(record))
}

pub(super) fn emit_range<'a>(
    from: &Expr<'a>,
    to: &Expr<'a>,
    inclusive: bool,
    _span: Span,
    ctx: &mut BlockContext<'_, 'a>,
) -> Emitted {
    for (bound, what) in [(from, "Range start"), (to, "Range end")] {
        let ty = bound.emit_code(ctx, false);
        ctx.coerce(&RealizedType::INT, &ty, bound.span(), || what.to_string());
    }
    ctx.emitter.emit_new_range(inclusive);
    Emitted::value(RealizedType::Range)
}
