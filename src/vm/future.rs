//! Resumable computations compiled from `async` bodies.

use std::rc::Rc;

use log::trace;
use tetra_core::{FutureResult, Resumable, RuntimeError};

use super::exec::{Frame, Interpreter, Step};
use super::{LoadedModule, VmOptions};

/// One call of an `async` function.
///
/// The frame holds the parameters and every local of the body together
/// with the resume point, so nothing is lost between advances.
pub(crate) struct AsyncComputation {
    module: Rc<LoadedModule>,
    options: VmOptions,
    frame: Frame,
    steps: usize,
}

impl AsyncComputation {
    pub fn new(module: Rc<LoadedModule>, options: VmOptions, frame: Frame) -> Self {
        Self {
            module,
            options,
            frame,
            steps: 0,
        }
    }
}

impl Resumable for AsyncComputation {
    fn advance(&mut self) -> Result<FutureResult, RuntimeError> {
        self.steps += 1;
        let module = Rc::clone(&self.module);
        let _level = module.enter(self.options.max_call_depth)?;
        let mut interpreter = Interpreter::new(Rc::clone(&self.module), self.options);
        match interpreter.run(&mut self.frame, true)? {
            Step::Returned(value) => {
                trace!(
                    "'{}' completed after {} advance(s)",
                    self.frame.name(),
                    self.steps
                );
                Ok(FutureResult::Ready(value))
            }
            Step::Suspended => Ok(FutureResult::Pending),
        }
    }
}
