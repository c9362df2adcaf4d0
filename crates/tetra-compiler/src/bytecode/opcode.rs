//! The VM instruction set.
//!
//! Each opcode is one byte with its operands inline (big-endian).

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Bytecode operation codes.
///
/// The VM is a stack machine: operations pop their operands and push results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from pool. Operand: u8 index.
    Constant = 0,
    /// Push constant from pool. Operand: u16 index.
    ConstantWide,
    PushUnit,
    PushTrue,
    PushFalse,
    PushZero,
    PushOne,

    // =========================================================================
    // Stack
    // =========================================================================
    Pop,
    Dup,
    Swap,

    // =========================================================================
    // Variables
    // =========================================================================
    /// Operand: u16 slot.
    GetLocal,
    /// Pops the value. Operand: u16 slot.
    SetLocal,
    /// Operand: u16 global slot.
    GetGlobal,
    /// Pops the value. Operand: u16 global slot.
    SetGlobal,

    // =========================================================================
    // Invocation
    // =========================================================================
    /// Operand: u8 intrinsic id.
    Intrinsic,
    /// Call a script function. Operands: u16 constant index, u8 argc.
    Call,
    /// Call a host routine. Operands: u16 constant index, u8 argc.
    CallNative,
    /// Call the function value below the arguments. Operand: u8 argc.
    CallValue,

    // =========================================================================
    // Aggregates
    // =========================================================================
    /// Operand: u16 element count.
    NewArray,
    /// Operand: u16 field count.
    NewRecord,
    /// Operand: u16 field index.
    GetRecordField,
    /// Stack: record, value. Pushes the updated record. Operand: u16 field index.
    SetRecordField,
    /// Stack: array, index.
    GetIndex,
    /// Stack: from, to. Operand: u8, non-zero for an inclusive range.
    NewRange,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Forward jump. Operand: u16 distance.
    Jump,
    /// Pops the condition. Operand: u16 distance.
    JumpIfFalse,
    /// Pops the condition. Operand: u16 distance.
    JumpIfTrue,
    /// Backward jump. Operand: u16 distance.
    Loop,
    /// Pops the condition, jumps backward if true. Operand: u16 distance.
    LoopIfTrue,
    Return,

    // =========================================================================
    // Suspension
    // =========================================================================
    /// Create the future of an async function. Operands: u16 prototype, u8 argc.
    NewFuture,
    /// Advance the future on top of the stack; suspend while it is pending.
    Await,
    /// Suspend once.
    Yield,
}

impl OpCode {
    /// Decode an opcode from a byte.
    pub fn from_u8(byte: u8) -> Option<Self> {
        Self::try_from(byte).ok()
    }

    /// Size of the inline operands in bytes.
    pub fn operand_size(&self) -> usize {
        match self {
            OpCode::PushUnit
            | OpCode::PushTrue
            | OpCode::PushFalse
            | OpCode::PushZero
            | OpCode::PushOne
            | OpCode::Pop
            | OpCode::Dup
            | OpCode::Swap
            | OpCode::GetIndex
            | OpCode::Return
            | OpCode::Await
            | OpCode::Yield => 0,

            OpCode::Constant | OpCode::Intrinsic | OpCode::CallValue | OpCode::NewRange => 1,

            OpCode::ConstantWide
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::NewArray
            | OpCode::NewRecord
            | OpCode::GetRecordField
            | OpCode::SetRecordField
            | OpCode::Jump
            | OpCode::JumpIfFalse
            | OpCode::JumpIfTrue
            | OpCode::Loop
            | OpCode::LoopIfTrue => 2,

            OpCode::Call | OpCode::CallNative | OpCode::NewFuture => 3,
        }
    }

    /// Whether execution may suspend at this instruction.
    pub fn is_suspension_point(&self) -> bool {
        matches!(self, OpCode::Await | OpCode::Yield)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Constant => "Constant",
            OpCode::ConstantWide => "ConstantWide",
            OpCode::PushUnit => "PushUnit",
            OpCode::PushTrue => "PushTrue",
            OpCode::PushFalse => "PushFalse",
            OpCode::PushZero => "PushZero",
            OpCode::PushOne => "PushOne",
            OpCode::Pop => "Pop",
            OpCode::Dup => "Dup",
            OpCode::Swap => "Swap",
            OpCode::GetLocal => "GetLocal",
            OpCode::SetLocal => "SetLocal",
            OpCode::GetGlobal => "GetGlobal",
            OpCode::SetGlobal => "SetGlobal",
            OpCode::Intrinsic => "Intrinsic",
            OpCode::Call => "Call",
            OpCode::CallNative => "CallNative",
            OpCode::CallValue => "CallValue",
            OpCode::NewArray => "NewArray",
            OpCode::NewRecord => "NewRecord",
            OpCode::GetRecordField => "GetRecordField",
            OpCode::SetRecordField => "SetRecordField",
            OpCode::GetIndex => "GetIndex",
            OpCode::NewRange => "NewRange",
            OpCode::Jump => "Jump",
            OpCode::JumpIfFalse => "JumpIfFalse",
            OpCode::JumpIfTrue => "JumpIfTrue",
            OpCode::Loop => "Loop",
            OpCode::LoopIfTrue => "LoopIfTrue",
            OpCode::Return => "Return",
            OpCode::NewFuture => "NewFuture",
            OpCode::Await => "Await",
            OpCode::Yield => "Yield",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trip() {
        let byte: u8 = OpCode::Yield.into();
        assert_eq!(OpCode::from_u8(byte), Some(OpCode::Yield));
        assert_eq!(OpCode::from_u8(0), Some(OpCode::Constant));
        assert_eq!(OpCode::from_u8(255), None);
    }

    #[test]
    fn operand_sizes() {
        assert_eq!(OpCode::Pop.operand_size(), 0);
        assert_eq!(OpCode::Intrinsic.operand_size(), 1);
        assert_eq!(OpCode::GetLocal.operand_size(), 2);
        assert_eq!(OpCode::LoopIfTrue.operand_size(), 2);
        assert_eq!(OpCode::CallNative.operand_size(), 3);
        assert_eq!(OpCode::NewFuture.operand_size(), 3);
    }
}
