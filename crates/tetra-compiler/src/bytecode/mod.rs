//! Bytecode types.
//!
//! - [`OpCode`]: the VM instruction set
//! - [`BytecodeChunk`]: compiled code of one function
//! - [`Constant`] and [`ConstantPool`]: module-level constant storage

mod chunk;
mod constant;
mod opcode;

pub use chunk::{BytecodeChunk, JumpTooFar};
pub use constant::{Constant, ConstantPool};
pub use opcode::OpCode;
