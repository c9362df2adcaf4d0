//! The iteration protocol behind `for (x in source)`.
//!
//! A [`ForInSource`] owns hidden locals and emits three fragments: state
//! setup, the advance-and-test that closes each iteration, and the fetch of
//! the current element. The loop compiler lays them out as
//!
//! ```text
//!     <source>; initialize
//!     Jump check
//! body:
//!     next; SetLocal var
//!     <body>
//! check:
//!     check_done(body)        ; LoopIfTrue body
//! ```
//!
//! so the cursor is advanced before the first element is read.

use tetra_core::{ForInKind, Intrinsic, InvokeTarget, RealizedType};

use crate::bytecode::OpCode;
use crate::context::BlockContext;
use crate::emit::BytecodeEmitter;

pub trait ForInSource {
    fn element_type(&self) -> RealizedType;

    /// Consume the source value on top of the stack and set up the cursor.
    fn initialize(&self, ctx: &mut BlockContext<'_, '_>);

    /// Advance the cursor and branch back to `loop_start` while elements remain.
    fn check_done(&self, ctx: &mut BlockContext<'_, '_>, loop_start: usize);

    /// Push the current element.
    fn next(&self, ctx: &mut BlockContext<'_, '_>);
}

/// Pick the protocol implementation for a source of kind `kind`.
pub fn source_for(kind: ForInKind, ctx: &mut BlockContext<'_, '_>) -> Box<dyn ForInSource> {
    let source = ctx.scope.declare_hidden();
    let cursor = ctx.scope.declare_hidden();
    match kind {
        ForInKind::Range => Box::new(RangeSource { source, cursor }),
        ForInKind::Array(element) => Box::new(IndexedSource {
            source,
            cursor,
            element,
            length: Intrinsic::ArrayLength.into(),
            element_at: None,
        }),
        ForInKind::Indexed {
            element,
            length,
            element_at,
        } => Box::new(IndexedSource {
            source,
            cursor,
            element,
            length,
            element_at: Some(element_at),
        }),
    }
}

/// `[from, to)` over integers; the cursor is the element.
pub struct RangeSource {
    source: u32,
    cursor: u32,
}

impl ForInSource for RangeSource {
    fn element_type(&self) -> RealizedType {
        RealizedType::INT
    }

    fn initialize(&self, ctx: &mut BlockContext<'_, '_>) {
        let e = &mut ctx.emitter;
        e.emit_set_local(self.source);
        // cursor = from - 1
        e.emit_get_local(self.source);
        e.emit_intrinsic(Intrinsic::RangeFrom);
        e.emit_int(1);
        e.emit_intrinsic(Intrinsic::SubInt);
        e.emit_set_local(self.cursor);
    }

    fn check_done(&self, ctx: &mut BlockContext<'_, '_>, loop_start: usize) {
        let e = &mut ctx.emitter;
        advance_cursor(e, self.cursor);
        e.emit_get_local(self.source);
        e.emit_intrinsic(Intrinsic::RangeTo);
        e.emit_intrinsic(Intrinsic::LtInt);
        e.emit_loop_if_true(loop_start);
    }

    fn next(&self, ctx: &mut BlockContext<'_, '_>) {
        ctx.emitter.emit_get_local(self.cursor);
    }
}

/// Index-based iteration: arrays, and bound types exposing `length` and
/// `element_at`.
pub struct IndexedSource {
    source: u32,
    cursor: u32,
    element: RealizedType,
    length: InvokeTarget,
    /// `None` indexes the source directly.
    element_at: Option<InvokeTarget>,
}

impl ForInSource for IndexedSource {
    fn element_type(&self) -> RealizedType {
        self.element.clone()
    }

    fn initialize(&self, ctx: &mut BlockContext<'_, '_>) {
        let e = &mut ctx.emitter;
        e.emit_set_local(self.source);
        e.emit_int(-1);
        e.emit_set_local(self.cursor);
    }

    fn check_done(&self, ctx: &mut BlockContext<'_, '_>, loop_start: usize) {
        let e = &mut ctx.emitter;
        advance_cursor(e, self.cursor);
        e.emit_get_local(self.source);
        e.emit_invoke(&self.length, 1);
        e.emit_intrinsic(Intrinsic::LtInt);
        e.emit_loop_if_true(loop_start);
    }

    fn next(&self, ctx: &mut BlockContext<'_, '_>) {
        let e = &mut ctx.emitter;
        e.emit_get_local(self.source);
        e.emit_get_local(self.cursor);
        match &self.element_at {
            Some(target) => e.emit_invoke(target, 2),
            None => e.emit(OpCode::GetIndex),
        }
    }
}

/// `cursor = cursor + 1`, leaving the new cursor on the stack.
fn advance_cursor(e: &mut BytecodeEmitter<'_>, cursor: u32) {
    e.emit_get_local(cursor);
    e.emit_int(1);
    e.emit_intrinsic(Intrinsic::AddInt);
    e.emit(OpCode::Dup);
    e.emit_set_local(cursor);
}

#[cfg(test)]
mod tests {
    use tetra_registry::TypeRegistry;

    use super::*;
    use crate::bytecode::ConstantPool;
    use crate::context::ModuleContext;
    use crate::options::CompileOptions;

    #[test]
    fn range_protocol_layout() {
        let registry = TypeRegistry::new().unwrap();
        let module = ModuleContext::new("m", &registry, CompileOptions::default());
        let mut pool = ConstantPool::new();
        let mut ctx = BlockContext::new(&module, &mut pool, RealizedType::UNIT, false);

        let source = source_for(ForInKind::Range, &mut ctx);
        assert_eq!(source.element_type(), RealizedType::INT);
        source.initialize(&mut ctx);
        let start = ctx.emitter.current_offset();
        source.next(&mut ctx);
        ctx.emitter.emit(OpCode::Pop);
        source.check_done(&mut ctx, start);

        let chunk = ctx.finish().chunk.unwrap();
        chunk.assert_opcodes(&[
            OpCode::SetLocal,
            OpCode::GetLocal,
            OpCode::Intrinsic,
            OpCode::PushOne,
            OpCode::Intrinsic,
            OpCode::SetLocal,
            OpCode::GetLocal,
            OpCode::Pop,
            OpCode::GetLocal,
            OpCode::PushOne,
            OpCode::Intrinsic,
            OpCode::Dup,
            OpCode::SetLocal,
            OpCode::GetLocal,
            OpCode::Intrinsic,
            OpCode::Intrinsic,
            OpCode::LoopIfTrue,
        ]);
    }

    #[test]
    fn array_elements_are_fetched_by_index() {
        let registry = TypeRegistry::new().unwrap();
        let module = ModuleContext::new("m", &registry, CompileOptions::default());
        let mut pool = ConstantPool::new();
        let mut ctx = BlockContext::new(&module, &mut pool, RealizedType::UNIT, false);

        let source = source_for(ForInKind::Array(RealizedType::STRING), &mut ctx);
        assert_eq!(source.element_type(), RealizedType::STRING);
        source.next(&mut ctx);
        ctx.finish()
            .chunk
            .unwrap()
            .assert_opcodes(&[OpCode::GetLocal, OpCode::GetLocal, OpCode::GetIndex]);
    }
}
