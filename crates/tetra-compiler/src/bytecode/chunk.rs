//! Instruction stream of one function body, with a source line per byte.

use thiserror::Error;

use super::OpCode;

/// A jump or loop distance did not fit in its 16-bit operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("jump distance {0} exceeds u16::MAX")]
pub struct JumpTooFar(pub usize);

/// Compiled bytecode of one function.
///
/// Constants live at module level in a `ConstantPool`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytecodeChunk {
    code: Vec<u8>,
    /// Parallel to `code`.
    lines: Vec<u32>,
}

impl BytecodeChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.code.push(op.into());
        self.lines.push(line);
    }

    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Append a big-endian operand.
    pub fn write_u16(&mut self, value: u16, line: u32) {
        let [hi, lo] = value.to_be_bytes();
        self.write_byte(hi, line);
        self.write_byte(lo, line);
    }

    /// Current code offset (for jump patching).
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a forward jump and return the operand offset to patch later.
    ///
    /// The operand is initialized to 0xFFFF as a placeholder.
    pub fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.write_op(op, line);
        let offset = self.code.len();
        self.write_u16(0xFFFF, line);
        offset
    }

    /// Point the jump operand at `offset` to the current position.
    pub fn patch_jump(&mut self, offset: usize) -> Result<(), JumpTooFar> {
        let distance = self.code.len() - offset - 2;
        let value = u16::try_from(distance).map_err(|_| JumpTooFar(distance))?;
        let [hi, lo] = value.to_be_bytes();
        self.code[offset] = hi;
        self.code[offset + 1] = lo;
        Ok(())
    }

    /// Emit a backward jump (`Loop` or `LoopIfTrue`) to `loop_start`.
    pub fn emit_loop(&mut self, op: OpCode, loop_start: usize, line: u32) -> Result<(), JumpTooFar> {
        self.write_op(op, line);
        // +2 for the operand bytes about to be written
        let distance = self.code.len() - loop_start + 2;
        let value = u16::try_from(distance).map_err(|_| JumpTooFar(distance))?;
        self.write_u16(value, line);
        Ok(())
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Big-endian operand starting at `offset`.
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let hi = *self.code.get(offset)?;
        let lo = *self.code.get(offset + 1)?;
        Some(u16::from_be_bytes([hi, lo]))
    }

    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.code.get(offset).and_then(|&b| OpCode::from_u8(b))
    }

    /// Offsets of every instruction, skipping operands.
    pub fn instruction_offsets(&self) -> Vec<usize> {
        let mut offsets = Vec::new();
        let mut offset = 0;
        while offset < self.code.len() {
            offsets.push(offset);
            offset += 1 + self.read_op(offset).map_or(0, |op| op.operand_size());
        }
        offsets
    }

    /// All opcodes in order, without operands.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instruction_offsets()
            .into_iter()
            .filter_map(|offset| self.read_op(offset))
            .collect()
    }

    /// Offsets of the instructions where execution may suspend.
    pub fn suspension_points(&self) -> Vec<usize> {
        self.instruction_offsets()
            .into_iter()
            .filter(|&offset| self.read_op(offset).is_some_and(|op| op.is_suspension_point()))
            .collect()
    }

    /// Check that this chunk contains exactly the given opcode sequence.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Check that the given opcodes appear in order, not necessarily contiguous.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();
        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }
        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_u16_is_big_endian() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_u16(0x1234, 5);
        assert_eq!(chunk.code(), &[0x12, 0x34]);
        assert_eq!(chunk.read_u16(0), Some(0x1234));
        assert_eq!(chunk.line_at(1), Some(5));
    }

    #[test]
    fn emit_and_patch_jump() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::PushTrue, 1);
        let jump = chunk.emit_jump(OpCode::JumpIfFalse, 2);
        chunk.write_op(OpCode::PushOne, 3);
        chunk.write_op(OpCode::Pop, 3);
        chunk.patch_jump(jump).unwrap();

        assert_eq!(chunk.read_u16(jump), Some(2));
    }

    #[test]
    fn emit_loop_distance_lands_on_start() {
        let mut chunk = BytecodeChunk::new();
        let start = chunk.current_offset();
        chunk.write_op(OpCode::PushOne, 1);
        chunk.write_op(OpCode::Pop, 1);
        chunk.emit_loop(OpCode::Loop, start, 1).unwrap();

        // pc after the operand minus the distance is the loop start
        let distance = chunk.read_u16(3).unwrap() as usize;
        assert_eq!(chunk.len() - distance, start);
    }

    #[test]
    fn oversized_jump_is_an_error() {
        let mut chunk = BytecodeChunk::new();
        let jump = chunk.emit_jump(OpCode::Jump, 1);
        for _ in 0..70_000 {
            chunk.write_op(OpCode::Pop, 1);
        }
        assert!(chunk.patch_jump(jump).is_err());
    }

    #[test]
    fn opcodes_skip_operands() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::GetLocal, 1);
        chunk.write_u16(0, 1);
        chunk.write_op(OpCode::Await, 1);
        chunk.write_op(OpCode::Return, 1);

        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::Await, OpCode::Return]);
        assert_eq!(chunk.suspension_points(), vec![3]);
    }
}
