//! The instruction loop.

use std::rc::Rc;

use log::trace;
use tetra_compiler::bytecode::OpCode;
use tetra_core::intrinsic::make_range;
use tetra_core::{
    FunctionInvoker, FunctionValue, FutureRef, FutureResult, Intrinsic, NativeContext,
    RuntimeError, Value,
};

use super::future::AsyncComputation;
use super::{Code, LoadedModule, VmOptions};

/// Activation record of one function, initializer or async body.
#[derive(Debug)]
pub(crate) struct Frame {
    code: Rc<Code>,
    pc: usize,
    locals: Vec<Value>,
    stack: Vec<Value>,
}

impl Frame {
    /// A frame with `args` in the first local slots.
    pub fn new(code: Rc<Code>, args: Vec<Value>) -> Self {
        let mut locals = args;
        locals.resize(code.frame_size.max(code.param_count), Value::Unit);
        Self {
            code,
            pc: 0,
            locals,
            stack: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.code.name
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pop `count` values, leftmost first.
    fn pop_n(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        let start = self
            .stack
            .len()
            .checked_sub(count)
            .ok_or(RuntimeError::StackUnderflow)?;
        Ok(self.stack.split_off(start))
    }

    fn peek(&self) -> Result<&Value, RuntimeError> {
        self.stack.last().ok_or(RuntimeError::StackUnderflow)
    }

    fn read_u8(&mut self) -> Result<u8, RuntimeError> {
        let byte = self
            .code
            .chunk
            .read_byte(self.pc)
            .ok_or(RuntimeError::StackUnderflow)?;
        self.pc += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, RuntimeError> {
        let value = self
            .code
            .chunk
            .read_u16(self.pc)
            .ok_or(RuntimeError::StackUnderflow)?;
        self.pc += 2;
        Ok(value)
    }

    fn jump_back(&mut self, distance: usize) -> Result<(), RuntimeError> {
        self.pc = self
            .pc
            .checked_sub(distance)
            .ok_or(RuntimeError::InvalidOpcode(OpCode::Loop.into()))?;
        Ok(())
    }

    fn local(&self, slot: u16) -> Result<&Value, RuntimeError> {
        self.locals
            .get(slot as usize)
            .ok_or(RuntimeError::InvalidLocal(slot))
    }

    fn local_mut(&mut self, slot: u16) -> Result<&mut Value, RuntimeError> {
        self.locals
            .get_mut(slot as usize)
            .ok_or(RuntimeError::InvalidLocal(slot))
    }
}

/// How a run of the instruction loop ended.
#[derive(Debug)]
pub(crate) enum Step {
    Returned(Value),
    /// Stopped at a suspension point; running the frame again resumes it.
    Suspended,
}

/// Executes frames against one loaded module.
///
/// Script calls recurse on the Rust stack. The nesting is counted on the
/// module, so futures advanced from inside a frame add to the same count,
/// bounded by [`VmOptions::max_call_depth`].
pub(crate) struct Interpreter {
    module: Rc<LoadedModule>,
    options: VmOptions,
}

impl Interpreter {
    pub fn new(module: Rc<LoadedModule>, options: VmOptions) -> Self {
        Self { module, options }
    }

    /// Run `code` to completion in a fresh frame.
    pub fn call_code(&mut self, code: &Rc<Code>, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let module = Rc::clone(&self.module);
        let _level = module.enter(self.options.max_call_depth)?;
        let mut frame = Frame::new(Rc::clone(code), args);
        match self.run(&mut frame, false)? {
            Step::Returned(value) => Ok(value),
            Step::Suspended => Err(RuntimeError::SuspendInSync),
        }
    }

    pub fn call_function(
        &mut self,
        function: &FunctionValue,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        match function {
            FunctionValue::Script { hash, name } => {
                let code = self
                    .module
                    .function(*hash)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UnknownFunction(name.to_string()))?;
                self.call_code(&code, args)
            }
            FunctionValue::Native(native) => {
                let mut ctx = NativeContext::new(self);
                Ok(native.call(&mut ctx, &args)?)
            }
        }
    }

    /// Execute `frame` until it returns or, when `can_suspend`, reaches a
    /// suspension point.
    pub fn run(&mut self, frame: &mut Frame, can_suspend: bool) -> Result<Step, RuntimeError> {
        loop {
            let start = frame.pc;
            let byte = frame.read_u8()?;
            let op = OpCode::from_u8(byte).ok_or(RuntimeError::InvalidOpcode(byte))?;

            match op {
                OpCode::Constant => {
                    let index = frame.read_u8()? as u32;
                    frame.stack.push(self.module.constant(index)?.clone());
                }
                OpCode::ConstantWide => {
                    let index = frame.read_u16()? as u32;
                    frame.stack.push(self.module.constant(index)?.clone());
                }
                OpCode::PushUnit => frame.stack.push(Value::Unit),
                OpCode::PushTrue => frame.stack.push(Value::Bool(true)),
                OpCode::PushFalse => frame.stack.push(Value::Bool(false)),
                OpCode::PushZero => frame.stack.push(Value::Int(0)),
                OpCode::PushOne => frame.stack.push(Value::Int(1)),

                OpCode::Pop => {
                    frame.pop()?;
                }
                OpCode::Dup => {
                    let top = frame.peek()?.clone();
                    frame.stack.push(top);
                }
                OpCode::Swap => {
                    let len = frame.stack.len();
                    if len < 2 {
                        return Err(RuntimeError::StackUnderflow);
                    }
                    frame.stack.swap(len - 1, len - 2);
                }

                OpCode::GetLocal => {
                    let slot = frame.read_u16()?;
                    let value = frame.local(slot)?.clone();
                    frame.stack.push(value);
                }
                OpCode::SetLocal => {
                    let slot = frame.read_u16()?;
                    let value = frame.pop()?;
                    *frame.local_mut(slot)? = value;
                }
                OpCode::GetGlobal => {
                    let slot = frame.read_u16()?;
                    let value = self
                        .module
                        .globals
                        .borrow()
                        .get(slot as usize)
                        .cloned()
                        .ok_or(RuntimeError::InvalidGlobal(slot))?;
                    frame.stack.push(value);
                }
                OpCode::SetGlobal => {
                    let slot = frame.read_u16()?;
                    let value = frame.pop()?;
                    let mut globals = self.module.globals.borrow_mut();
                    *globals
                        .get_mut(slot as usize)
                        .ok_or(RuntimeError::InvalidGlobal(slot))? = value;
                }

                OpCode::Intrinsic => {
                    let byte = frame.read_u8()?;
                    let intrinsic =
                        Intrinsic::try_from(byte).map_err(|_| RuntimeError::InvalidOpcode(byte))?;
                    let args = frame.pop_n(intrinsic.arity())?;
                    frame.stack.push(intrinsic.apply(&args)?);
                }
                OpCode::Call | OpCode::CallNative => {
                    let index = frame.read_u16()? as u32;
                    let argc = frame.read_u8()? as usize;
                    let callee = self.module.constant(index)?.as_function()?.clone();
                    let args = frame.pop_n(argc)?;
                    let result = self.call_function(&callee, args)?;
                    frame.stack.push(result);
                }
                OpCode::CallValue => {
                    let argc = frame.read_u8()? as usize;
                    let args = frame.pop_n(argc)?;
                    let callee = frame.pop()?.as_function()?.clone();
                    let result = self.call_function(&callee, args)?;
                    frame.stack.push(result);
                }

                OpCode::NewArray => {
                    let count = frame.read_u16()? as usize;
                    let elements = frame.pop_n(count)?;
                    frame.stack.push(Value::array(elements));
                }
                OpCode::NewRecord => {
                    let count = frame.read_u16()? as usize;
                    let fields = frame.pop_n(count)?;
                    frame.stack.push(Value::record(fields));
                }
                OpCode::GetRecordField => {
                    let index = frame.read_u16()? as usize;
                    let record = frame.pop()?;
                    let fields = record.as_record()?;
                    let field = fields.get(index).cloned().ok_or(RuntimeError::IndexOutOfBounds {
                        index: index as i64,
                        len: fields.len(),
                    })?;
                    frame.stack.push(field);
                }
                OpCode::SetRecordField => {
                    let index = frame.read_u16()? as usize;
                    let value = frame.pop()?;
                    let mut record = frame.pop()?;
                    record.set_record_field(index, value)?;
                    frame.stack.push(record);
                }
                OpCode::GetIndex => {
                    let index = frame.pop()?.as_int()?;
                    let array = frame.pop()?;
                    let elements = array.as_array()?;
                    let element = usize::try_from(index)
                        .ok()
                        .and_then(|i| elements.get(i))
                        .cloned()
                        .ok_or(RuntimeError::IndexOutOfBounds {
                            index,
                            len: elements.len(),
                        })?;
                    frame.stack.push(element);
                }
                OpCode::NewRange => {
                    let inclusive = frame.read_u8()? != 0;
                    let to = frame.pop()?;
                    let from = frame.pop()?;
                    frame.stack.push(make_range(&from, &to, inclusive)?);
                }

                OpCode::Jump => {
                    let distance = frame.read_u16()? as usize;
                    frame.pc += distance;
                }
                OpCode::JumpIfFalse | OpCode::JumpIfTrue => {
                    let distance = frame.read_u16()? as usize;
                    let condition = frame.pop()?.as_bool()?;
                    if condition == (op == OpCode::JumpIfTrue) {
                        frame.pc += distance;
                    }
                }
                OpCode::Loop => {
                    let distance = frame.read_u16()? as usize;
                    frame.jump_back(distance)?;
                }
                OpCode::LoopIfTrue => {
                    let distance = frame.read_u16()? as usize;
                    if frame.pop()?.as_bool()? {
                        frame.jump_back(distance)?;
                    }
                }
                OpCode::Return => {
                    let value = frame.stack.pop().unwrap_or(Value::Unit);
                    return Ok(Step::Returned(value));
                }

                OpCode::NewFuture => {
                    let proto = frame.read_u16()?;
                    let argc = frame.read_u8()? as usize;
                    let code = self
                        .module
                        .protos
                        .get(proto as usize)
                        .cloned()
                        .ok_or(RuntimeError::InvalidPrototype(proto))?;
                    let args = frame.pop_n(argc)?;
                    let computation = AsyncComputation::new(
                        Rc::clone(&self.module),
                        self.options,
                        Frame::new(code, args),
                    );
                    frame.stack.push(Value::Future(FutureRef::new(computation)));
                }
                OpCode::Await => {
                    let future = frame.peek()?.as_future()?.clone();
                    match future.advance()? {
                        FutureResult::Ready(value) => {
                            frame.pop()?;
                            frame.stack.push(value);
                        }
                        FutureResult::Pending if can_suspend => {
                            // Re-run the await on the next advance.
                            frame.pc = start;
                            trace!("'{}' suspended on await at {start}", frame.name());
                            return Ok(Step::Suspended);
                        }
                        FutureResult::Pending => return Err(RuntimeError::SuspendInSync),
                    }
                }
                OpCode::Yield => {
                    if !can_suspend {
                        return Err(RuntimeError::SuspendInSync);
                    }
                    trace!("'{}' yielded at {start}", frame.name());
                    return Ok(Step::Suspended);
                }
            }
        }
    }
}

impl FunctionInvoker for Interpreter {
    fn invoke(&mut self, function: &FunctionValue, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.call_function(function, args)
    }
}
