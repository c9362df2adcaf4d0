//! Suspendable computations.
//!
//! A [`FutureRef`] is the value an `async` call produces. It never runs on
//! its own: an external driver (the host's tick loop) calls
//! [`FutureRef::advance`] until it reports [`FutureResult::Ready`].
//! Cancellation is simply dropping the value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::value::Value;

/// Outcome of one advance step.
#[derive(Debug, Clone, PartialEq)]
pub enum FutureResult {
    Pending,
    Ready(Value),
}

impl FutureResult {
    pub fn is_ready(&self) -> bool {
        matches!(self, FutureResult::Ready(_))
    }
}

/// A unit of deferred work that can be stepped by a driver.
pub trait Resumable {
    /// Run until completion or the next suspension point.
    fn advance(&mut self) -> Result<FutureResult, RuntimeError>;
}

struct FutureState {
    computation: Box<dyn Resumable>,
    completed: Option<Value>,
}

/// Shared handle to a suspendable computation.
///
/// Once the computation completes its result is cached and every further
/// advance returns it again without touching the computation.
#[derive(Clone)]
pub struct FutureRef(Rc<RefCell<FutureState>>);

impl FutureRef {
    pub fn new(computation: impl Resumable + 'static) -> Self {
        FutureRef(Rc::new(RefCell::new(FutureState {
            computation: Box::new(computation),
            completed: None,
        })))
    }

    /// A future that completes on its first advance.
    pub fn ready(value: Value) -> Self {
        Self::new(ReadyFuture(Some(value)))
    }

    /// A future that stays pending for `ticks` advances, then yields `value`.
    pub fn delay(ticks: u32, value: Value) -> Self {
        Self::new(DelayFuture {
            remaining: ticks,
            value,
        })
    }

    /// Step the computation once.
    ///
    /// Fails with [`RuntimeError::ReentrantAdvance`] when called while the
    /// same computation is already being advanced further up the stack.
    pub fn advance(&self) -> Result<FutureResult, RuntimeError> {
        let mut state = self
            .0
            .try_borrow_mut()
            .map_err(|_| RuntimeError::ReentrantAdvance)?;
        if let Some(value) = &state.completed {
            return Ok(FutureResult::Ready(value.clone()));
        }
        let result = state.computation.advance()?;
        if let FutureResult::Ready(value) = &result {
            state.completed = Some(value.clone());
        }
        Ok(result)
    }

    /// Advance until ready, giving up after `max_steps` pending results.
    pub fn drive(&self, max_steps: usize) -> Result<Option<Value>, RuntimeError> {
        for _ in 0..max_steps {
            if let FutureResult::Ready(value) = self.advance()? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    pub fn is_completed(&self) -> bool {
        self.0
            .try_borrow()
            .map(|state| state.completed.is_some())
            .unwrap_or(false)
    }

    pub fn ptr_eq(&self, other: &FutureRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for FutureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureRef")
            .field("completed", &self.is_completed())
            .finish_non_exhaustive()
    }
}

/// Completes immediately.
pub struct ReadyFuture(Option<Value>);

impl Resumable for ReadyFuture {
    fn advance(&mut self) -> Result<FutureResult, RuntimeError> {
        Ok(FutureResult::Ready(self.0.take().unwrap_or(Value::Unit)))
    }
}

/// Pending for a fixed number of host ticks.
pub struct DelayFuture {
    remaining: u32,
    value: Value,
}

impl Resumable for DelayFuture {
    fn advance(&mut self) -> Result<FutureResult, RuntimeError> {
        if self.remaining == 0 {
            Ok(FutureResult::Ready(self.value.clone()))
        } else {
            self.remaining -= 1;
            Ok(FutureResult::Pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        calls: Rc<RefCell<u32>>,
    }

    impl Resumable for Counting {
        fn advance(&mut self) -> Result<FutureResult, RuntimeError> {
            *self.calls.borrow_mut() += 1;
            Ok(FutureResult::Ready(Value::Int(7)))
        }
    }

    #[test]
    fn delay_is_pending_for_ticks() {
        let future = FutureRef::delay(2, Value::Int(1));
        assert_eq!(future.advance().unwrap(), FutureResult::Pending);
        assert_eq!(future.advance().unwrap(), FutureResult::Pending);
        assert_eq!(future.advance().unwrap(), FutureResult::Ready(Value::Int(1)));
    }

    #[test]
    fn completed_result_is_cached() {
        let calls = Rc::new(RefCell::new(0));
        let future = FutureRef::new(Counting {
            calls: Rc::clone(&calls),
        });
        assert!(!future.is_completed());
        future.advance().unwrap();
        future.advance().unwrap();
        assert!(future.is_completed());
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn drive_gives_up() {
        let future = FutureRef::delay(10, Value::Unit);
        assert_eq!(future.drive(3).unwrap(), None);
        assert_eq!(future.drive(20).unwrap(), Some(Value::Unit));
    }

    struct SelfAdvancing(Rc<RefCell<Option<FutureRef>>>);

    impl Resumable for SelfAdvancing {
        fn advance(&mut self) -> Result<FutureResult, RuntimeError> {
            let me = self.0.borrow().clone();
            match me {
                Some(future) => future.advance(),
                None => Ok(FutureResult::Pending),
            }
        }
    }

    #[test]
    fn reentrant_advance_fails() {
        let slot = Rc::new(RefCell::new(None));
        let future = FutureRef::new(SelfAdvancing(Rc::clone(&slot)));
        *slot.borrow_mut() = Some(future.clone());
        assert_eq!(future.advance(), Err(RuntimeError::ReentrantAdvance));
    }
}
