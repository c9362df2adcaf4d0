//! Bytecode emitter.
//!
//! [`BytecodeEmitter`] writes one function's chunk, interning constants in
//! the shared module pool and tracking loop jumps.
//!
//! ```ignore
//! let mut constants = ConstantPool::new();
//! let mut emitter = BytecodeEmitter::new(&mut constants);
//! emitter.set_line(1);
//! emitter.emit_int(42);
//! emitter.emit_int(10);
//! emitter.emit_intrinsic(Intrinsic::AddInt);
//! let chunk = emitter.finish()?;
//! ```

mod jumps;

use std::sync::Arc;

use thiserror::Error;

use tetra_core::{InvokeTarget, Intrinsic, NativeFn, TypeHash};

use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, JumpTooFar, OpCode};
pub use jumps::{ContinueJump, JumpManager};

/// Operand offset of a forward jump waiting to be patched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpLabel(pub usize);

/// `break` or `continue` outside a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BreakError {
    #[error("not inside a loop")]
    NotInLoop,
}

/// An instruction operand did not fit its encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    #[error(transparent)]
    Jump(#[from] JumpTooFar),
    #[error("{what} {value} does not fit in a {bits}-bit operand")]
    OperandOverflow {
        what: &'static str,
        value: usize,
        bits: u8,
    },
}

/// Chunk and loop state saved while emitting into a scratch chunk.
pub struct ProbeState {
    chunk: BytecodeChunk,
    jumps: JumpManager,
}

/// Emits bytecode for a single function.
pub struct BytecodeEmitter<'pool> {
    chunk: BytecodeChunk,
    constants: &'pool mut ConstantPool,
    jumps: JumpManager,
    current_line: u32,
    /// First encoding failure; reported when the chunk is finished.
    error: Option<EmitError>,
}

impl<'pool> BytecodeEmitter<'pool> {
    pub fn new(constants: &'pool mut ConstantPool) -> Self {
        Self {
            chunk: BytecodeChunk::new(),
            constants,
            jumps: JumpManager::new(),
            current_line: 1,
            error: None,
        }
    }

    /// Set the source line attached to subsequent instructions.
    pub fn set_line(&mut self, line: u32) {
        self.current_line = line;
    }

    pub fn current_offset(&self) -> usize {
        self.chunk.current_offset()
    }

    pub fn chunk(&self) -> &BytecodeChunk {
        &self.chunk
    }

    fn record(&mut self, error: EmitError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn narrow_u16(&mut self, what: &'static str, value: usize) -> u16 {
        u16::try_from(value).unwrap_or_else(|_| {
            self.record(EmitError::OperandOverflow {
                what,
                value,
                bits: 16,
            });
            u16::MAX
        })
    }

    fn narrow_u8(&mut self, what: &'static str, value: usize) -> u8 {
        u8::try_from(value).unwrap_or_else(|_| {
            self.record(EmitError::OperandOverflow {
                what,
                value,
                bits: 8,
            });
            u8::MAX
        })
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    pub fn emit(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.current_line);
    }

    pub fn emit_byte(&mut self, op: OpCode, byte: u8) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_byte(byte, self.current_line);
    }

    pub fn emit_u16(&mut self, op: OpCode, value: u16) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_u16(value, self.current_line);
    }

    fn emit_u16_u8(&mut self, op: OpCode, a: u16, b: u8) {
        self.emit_u16(op, a);
        self.chunk.write_byte(b, self.current_line);
    }

    fn constant_index(&mut self, constant: Constant) -> u16 {
        let index = self.constants.add(constant) as usize;
        self.narrow_u16("constant index", index)
    }

    /// Emit a constant load, narrow or wide depending on the index.
    pub fn emit_constant(&mut self, constant: Constant) {
        let index = self.constant_index(constant);
        match u8::try_from(index) {
            Ok(narrow) => self.emit_byte(OpCode::Constant, narrow),
            Err(_) => self.emit_u16(OpCode::ConstantWide, index),
        }
    }

    // ==========================================================================
    // Literals
    // ==========================================================================

    /// Emit an integer; 0 and 1 use dedicated opcodes.
    pub fn emit_int(&mut self, value: i64) {
        match value {
            0 => self.emit(OpCode::PushZero),
            1 => self.emit(OpCode::PushOne),
            _ => self.emit_constant(Constant::Int(value)),
        }
    }

    pub fn emit_float(&mut self, value: f64) {
        self.emit_constant(Constant::Float(value));
    }

    pub fn emit_string(&mut self, value: &str) {
        self.emit_constant(Constant::String(Arc::from(value)));
    }

    pub fn emit_bool(&mut self, value: bool) {
        self.emit(if value {
            OpCode::PushTrue
        } else {
            OpCode::PushFalse
        });
    }

    pub fn emit_unit(&mut self) {
        self.emit(OpCode::PushUnit);
    }

    /// Push a reference to a script function of this module.
    pub fn emit_function_ref(&mut self, hash: TypeHash, name: &str) {
        self.emit_constant(Constant::Function {
            hash,
            name: Arc::from(name),
        });
    }

    /// Push a host routine as a function value.
    pub fn emit_native_ref(&mut self, native: &NativeFn) {
        self.emit_constant(Constant::Native(native.clone()));
    }

    // ==========================================================================
    // Variables
    // ==========================================================================

    pub fn emit_get_local(&mut self, slot: u32) {
        let slot = self.narrow_u16("local slot", slot as usize);
        self.emit_u16(OpCode::GetLocal, slot);
    }

    pub fn emit_set_local(&mut self, slot: u32) {
        let slot = self.narrow_u16("local slot", slot as usize);
        self.emit_u16(OpCode::SetLocal, slot);
    }

    pub fn emit_get_global(&mut self, slot: u32) {
        let slot = self.narrow_u16("global slot", slot as usize);
        self.emit_u16(OpCode::GetGlobal, slot);
    }

    pub fn emit_set_global(&mut self, slot: u32) {
        let slot = self.narrow_u16("global slot", slot as usize);
        self.emit_u16(OpCode::SetGlobal, slot);
    }

    // ==========================================================================
    // Invocation
    // ==========================================================================

    pub fn emit_intrinsic(&mut self, intrinsic: Intrinsic) {
        self.emit_byte(OpCode::Intrinsic, intrinsic.into());
    }

    /// Invoke an operator or member target over `argc` stack operands.
    pub fn emit_invoke(&mut self, target: &InvokeTarget, argc: usize) {
        match target {
            InvokeTarget::Intrinsic(intrinsic) => self.emit_intrinsic(*intrinsic),
            InvokeTarget::Native(native) => self.emit_call_native(native, argc),
        }
    }

    pub fn emit_call_native(&mut self, native: &NativeFn, argc: usize) {
        let index = self.constant_index(Constant::Native(native.clone()));
        let argc = self.narrow_u8("argument count", argc);
        self.emit_u16_u8(OpCode::CallNative, index, argc);
    }

    pub fn emit_call(&mut self, hash: TypeHash, name: &str, argc: usize) {
        let index = self.constant_index(Constant::Function {
            hash,
            name: Arc::from(name),
        });
        let argc = self.narrow_u8("argument count", argc);
        self.emit_u16_u8(OpCode::Call, index, argc);
    }

    pub fn emit_call_value(&mut self, argc: usize) {
        let argc = self.narrow_u8("argument count", argc);
        self.emit_byte(OpCode::CallValue, argc);
    }

    pub fn emit_new_future(&mut self, proto: usize, argc: usize) {
        let proto = self.narrow_u16("async prototype", proto);
        let argc = self.narrow_u8("argument count", argc);
        self.emit_u16_u8(OpCode::NewFuture, proto, argc);
    }

    // ==========================================================================
    // Aggregates
    // ==========================================================================

    pub fn emit_new_array(&mut self, count: usize) {
        let count = self.narrow_u16("array length", count);
        self.emit_u16(OpCode::NewArray, count);
    }

    pub fn emit_new_record(&mut self, count: usize) {
        let count = self.narrow_u16("record field count", count);
        self.emit_u16(OpCode::NewRecord, count);
    }

    pub fn emit_get_record_field(&mut self, index: usize) {
        let index = self.narrow_u16("record field", index);
        self.emit_u16(OpCode::GetRecordField, index);
    }

    pub fn emit_set_record_field(&mut self, index: usize) {
        let index = self.narrow_u16("record field", index);
        self.emit_u16(OpCode::SetRecordField, index);
    }

    pub fn emit_new_range(&mut self, inclusive: bool) {
        self.emit_byte(OpCode::NewRange, u8::from(inclusive));
    }

    // ==========================================================================
    // Jumps
    // ==========================================================================

    pub fn emit_jump(&mut self, op: OpCode) -> JumpLabel {
        JumpLabel(self.chunk.emit_jump(op, self.current_line))
    }

    /// Point a forward jump at the current offset.
    pub fn patch_jump(&mut self, label: JumpLabel) {
        if let Err(e) = self.chunk.patch_jump(label.0) {
            self.record(e.into());
        }
    }

    pub fn emit_loop(&mut self, loop_start: usize) {
        self.emit_backward(OpCode::Loop, loop_start);
    }

    pub fn emit_loop_if_true(&mut self, loop_start: usize) {
        self.emit_backward(OpCode::LoopIfTrue, loop_start);
    }

    fn emit_backward(&mut self, op: OpCode, target: usize) {
        if let Err(e) = self.chunk.emit_loop(op, target, self.current_line) {
            self.record(e.into());
        }
    }

    // ==========================================================================
    // Loops
    // ==========================================================================

    pub fn enter_loop(&mut self, continue_target: usize) {
        self.jumps.enter_loop(continue_target);
    }

    pub fn enter_loop_deferred(&mut self) {
        self.jumps.enter_loop_deferred();
    }

    /// Fix the `continue` target of the current loop at the current offset.
    pub fn set_continue_target(&mut self) {
        let offset = self.current_offset();
        for label in self.jumps.set_continue_target(offset) {
            self.patch_jump(label);
        }
    }

    /// Leave the current loop, patching its breaks to the current offset.
    pub fn exit_loop(&mut self) {
        for label in self.jumps.exit_loop() {
            self.patch_jump(label);
        }
    }

    pub fn emit_break(&mut self) -> Result<(), BreakError> {
        if !self.jumps.in_loop() {
            return Err(BreakError::NotInLoop);
        }
        let label = self.emit_jump(OpCode::Jump);
        self.jumps.add_break(label);
        Ok(())
    }

    pub fn emit_continue(&mut self) -> Result<(), BreakError> {
        match self.jumps.continue_jump() {
            Some(ContinueJump::Backward(target)) => {
                self.emit_loop(target);
                Ok(())
            }
            Some(ContinueJump::Forward) => {
                let label = self.emit_jump(OpCode::Jump);
                self.jumps.add_continue(label);
                Ok(())
            }
            None => Err(BreakError::NotInLoop),
        }
    }

    // ==========================================================================
    // Scratch emission
    // ==========================================================================

    /// Redirect emission into a scratch chunk.
    pub fn begin_probe(&mut self) -> ProbeState {
        let jumps = self.jumps.detached();
        ProbeState {
            chunk: std::mem::take(&mut self.chunk),
            jumps: std::mem::replace(&mut self.jumps, jumps),
        }
    }

    /// Discard the scratch chunk and restore the saved state.
    pub fn end_probe(&mut self, state: ProbeState) {
        self.chunk = state.chunk;
        self.jumps = state.jumps;
    }

    /// Finish emission and return the chunk.
    pub fn finish(self) -> Result<BytecodeChunk, EmitError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.chunk),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ints_use_dedicated_opcodes() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit_int(0);
        emitter.emit_int(1);
        emitter.emit_int(7);
        let chunk = emitter.finish().unwrap();
        chunk.assert_opcodes(&[OpCode::PushZero, OpCode::PushOne, OpCode::Constant]);
        assert_eq!(pool.get(0), Some(&Constant::Int(7)));
    }

    #[test]
    fn break_outside_loop_fails() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        assert_eq!(emitter.emit_break(), Err(BreakError::NotInLoop));
        assert_eq!(emitter.emit_continue(), Err(BreakError::NotInLoop));
    }

    #[test]
    fn deferred_continue_is_patched_forward() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.enter_loop_deferred();
        emitter.emit_continue().unwrap();
        emitter.emit(OpCode::Pop);
        emitter.set_continue_target();
        emitter.exit_loop();
        let chunk = emitter.finish().unwrap();
        // Jump operand at 1 skips the single Pop
        assert_eq!(chunk.read_u16(1), Some(1));
    }

    #[test]
    fn probe_leaves_real_chunk_untouched() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit(OpCode::PushTrue);
        let state = emitter.begin_probe();
        emitter.emit(OpCode::Pop);
        emitter.emit(OpCode::Pop);
        emitter.end_probe(state);
        emitter.finish().unwrap().assert_opcodes(&[OpCode::PushTrue]);
    }

    #[test]
    fn overflowing_slot_is_reported_on_finish() {
        let mut pool = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut pool);
        emitter.emit_get_local(70_000);
        assert!(matches!(
            emitter.finish(),
            Err(EmitError::OperandOverflow { what: "local slot", .. })
        ));
    }
}
