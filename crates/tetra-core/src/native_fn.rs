//! Host routines callable from script code.
//!
//! A [`NativeFn`] wraps any callable implementing [`NativeCallable`] so that
//! routines of different shapes can be stored uniformly in operator tables,
//! member tables and the constant pool.

use std::fmt;
use std::sync::Arc;

use crate::error::{NativeError, RuntimeError};
use crate::value::{FunctionValue, Value};
use crate::TypeHash;

/// Type-erased host routine.
///
/// The callable is shared behind an `Arc`, so cloning is cheap and keeps the
/// same identity.
#[derive(Clone)]
pub struct NativeFn {
    /// Identity derived from the owner and routine name.
    pub id: TypeHash,
    name: Arc<str>,
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    /// Wrap a callable registered as `owner::name`.
    pub fn new<F>(owner: &str, name: &str, f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self {
            id: TypeHash::from_native(owner, name),
            name: Arc::from(format!("{owner}::{name}")),
            inner: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, NativeError> {
        self.inner.call(ctx, args)
    }
}

impl PartialEq for NativeFn {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Trait for callable host routines.
pub trait NativeCallable {
    fn call(&self, ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, NativeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut NativeContext<'_>, &[Value]) -> Result<Value, NativeError>,
{
    fn call(&self, ctx: &mut NativeContext<'_>, args: &[Value]) -> Result<Value, NativeError> {
        (self)(ctx, args)
    }
}

/// Runs script functions on behalf of host routines (`map`, `reduce`, ...).
pub trait FunctionInvoker {
    fn invoke(&mut self, function: &FunctionValue, args: Vec<Value>) -> Result<Value, RuntimeError>;
}

/// Execution context handed to every host routine.
pub struct NativeContext<'a> {
    invoker: Option<&'a mut dyn FunctionInvoker>,
}

impl<'a> NativeContext<'a> {
    pub fn new(invoker: &'a mut dyn FunctionInvoker) -> Self {
        Self {
            invoker: Some(invoker),
        }
    }

    /// A context without access to script functions.
    pub fn detached() -> Self {
        Self { invoker: None }
    }

    /// Call a function value with the given arguments.
    pub fn call(&mut self, function: &FunctionValue, args: Vec<Value>) -> Result<Value, NativeError> {
        if let FunctionValue::Native(native) = function {
            return native.call(self, &args);
        }
        match self.invoker.as_deref_mut() {
            Some(invoker) => invoker
                .invoke(function, args)
                .map_err(|e| NativeError::Invocation(e.to_string())),
            None => Err(NativeError::Invocation(format!(
                "cannot call '{}' without a running VM",
                function.name()
            ))),
        }
    }
}

/// Check the argument count of a host routine.
pub fn expect_args(args: &[Value], expected: usize) -> Result<(), NativeError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(NativeError::ArgumentCount {
            expected,
            got: args.len(),
        })
    }
}

/// Convert a value accessor failure into an argument error at `index`.
pub fn arg<T>(index: usize, result: Result<T, RuntimeError>) -> Result<T, NativeError> {
    result.map_err(|e| match e {
        RuntimeError::TypeMismatch { expected, got } => NativeError::ArgumentType {
            index,
            expected,
            got,
        },
        other => NativeError::Invocation(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double() -> NativeFn {
        NativeFn::new("test", "double", |_: &mut NativeContext<'_>, args: &[Value]| {
            expect_args(args, 1)?;
            Ok(Value::Int(arg(0, args[0].as_int())? * 2))
        })
    }

    #[test]
    fn call_closure() {
        let f = double();
        let mut ctx = NativeContext::detached();
        assert_eq!(f.call(&mut ctx, &[Value::Int(4)]).unwrap(), Value::Int(8));
        assert_eq!(f.name(), "test::double");
    }

    #[test]
    fn argument_errors() {
        let f = double();
        let mut ctx = NativeContext::detached();
        assert_eq!(
            f.call(&mut ctx, &[]),
            Err(NativeError::ArgumentCount {
                expected: 1,
                got: 0
            })
        );
        assert_eq!(
            f.call(&mut ctx, &[Value::Bool(true)]),
            Err(NativeError::ArgumentType {
                index: 0,
                expected: "int",
                got: "bool"
            })
        );
    }

    #[test]
    fn detached_context_calls_natives_only() {
        let mut ctx = NativeContext::detached();
        let native = FunctionValue::Native(double());
        assert_eq!(ctx.call(&native, vec![Value::Int(1)]).unwrap(), Value::Int(2));

        let script = FunctionValue::Script {
            hash: TypeHash::from_function("m", "f"),
            name: "f".into(),
        };
        assert!(ctx.call(&script, vec![]).is_err());
    }

    #[test]
    fn clones_share_identity() {
        let f = double();
        assert_eq!(f.clone(), f);
    }
}
