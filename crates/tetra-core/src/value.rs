//! Runtime values manipulated by the VM and host routines.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{NativeError, RuntimeError};
use crate::future::FutureRef;
use crate::native_fn::NativeFn;
use crate::TypeHash;

/// A half-open integer range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub from: i64,
    pub to: i64,
}

impl Range {
    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// Range including `to` itself.
    pub fn inclusive(from: i64, to: i64) -> Self {
        Self {
            from,
            to: to.saturating_add(1),
        }
    }

    /// Number of elements; empty when `to <= from`. Saturates at
    /// `i64::MAX` for ranges wider than that.
    pub fn len(&self) -> i64 {
        self.to.saturating_sub(self.from).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> std::ops::Range<i64> {
        self.from..self.to
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.from, self.to)
    }
}

/// An opaque host object owned by script code.
///
/// The VM never inspects the payload; bound-type routines downcast it
/// through [`NativeValue::with_ref`] and [`NativeValue::with_mut`].
#[derive(Clone)]
pub struct NativeValue {
    inner: Rc<RefCell<Box<dyn Any>>>,
    type_name: &'static str,
}

impl NativeValue {
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(value))),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Rust type name of the payload.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.borrow().is::<T>()
    }

    pub fn with_ref<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, NativeError> {
        let guard = self.borrow()?;
        let value = guard
            .downcast_ref::<T>()
            .ok_or_else(|| self.downcast_error::<T>())?;
        Ok(f(value))
    }

    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, NativeError> {
        let mut guard = self.borrow_mut()?;
        let value = guard
            .downcast_mut::<T>()
            .ok_or_else(|| self.downcast_error::<T>())?;
        Ok(f(value))
    }

    pub fn ptr_eq(&self, other: &NativeValue) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn borrow(&self) -> Result<Ref<'_, Box<dyn Any>>, NativeError> {
        self.inner
            .try_borrow()
            .map_err(|_| NativeError::custom(format!("{} is mutably borrowed", self.type_name)))
    }

    fn borrow_mut(&self) -> Result<RefMut<'_, Box<dyn Any>>, NativeError> {
        self.inner
            .try_borrow_mut()
            .map_err(|_| NativeError::custom(format!("{} is already borrowed", self.type_name)))
    }

    fn downcast_error<T: Any>(&self) -> NativeError {
        NativeError::custom(format!(
            "expected host object {}, found {}",
            std::any::type_name::<T>(),
            self.type_name
        ))
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Native({})", self.type_name)
    }
}

/// A callable value: a script function by identity, or a host routine.
#[derive(Clone)]
pub enum FunctionValue {
    Script { hash: TypeHash, name: Rc<str> },
    Native(NativeFn),
}

impl FunctionValue {
    pub fn name(&self) -> &str {
        match self {
            FunctionValue::Script { name, .. } => name,
            FunctionValue::Native(native) => native.name(),
        }
    }

    pub fn hash(&self) -> TypeHash {
        match self {
            FunctionValue::Script { hash, .. } => *hash,
            FunctionValue::Native(native) => native.id,
        }
    }
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        self.hash() == other.hash()
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::Script { name, .. } => write!(f, "Function({name})"),
            FunctionValue::Native(native) => write!(f, "NativeFunction({})", native.name()),
        }
    }
}

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Range(Range),
    /// Record fields in declaration order; copy-on-write.
    Record(Rc<Vec<Value>>),
    Native(NativeValue),
    Function(FunctionValue),
    Future(FutureRef),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(elements))
    }

    pub fn record(fields: Vec<Value>) -> Self {
        Value::Record(Rc::new(fields))
    }

    pub fn native<T: Any>(value: T) -> Self {
        Value::Native(NativeValue::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Range(_) => "range",
            Value::Record(_) => "record",
            Value::Native(_) => "native",
            Value::Function(_) => "function",
            Value::Future(_) => "future",
        }
    }

    pub fn as_bool(&self) -> Result<bool, RuntimeError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(RuntimeError::type_mismatch("bool", other.type_name())),
        }
    }

    pub fn as_int(&self) -> Result<i64, RuntimeError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(RuntimeError::type_mismatch("int", other.type_name())),
        }
    }

    pub fn as_float(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Float(f) => Ok(*f),
            other => Err(RuntimeError::type_mismatch("float", other.type_name())),
        }
    }

    pub fn as_str(&self) -> Result<&str, RuntimeError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(RuntimeError::type_mismatch("string", other.type_name())),
        }
    }

    pub fn as_array(&self) -> Result<&[Value], RuntimeError> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(RuntimeError::type_mismatch("array", other.type_name())),
        }
    }

    pub fn as_range(&self) -> Result<Range, RuntimeError> {
        match self {
            Value::Range(r) => Ok(*r),
            other => Err(RuntimeError::type_mismatch("range", other.type_name())),
        }
    }

    pub fn as_record(&self) -> Result<&[Value], RuntimeError> {
        match self {
            Value::Record(fields) => Ok(fields),
            other => Err(RuntimeError::type_mismatch("record", other.type_name())),
        }
    }

    pub fn as_native(&self) -> Result<&NativeValue, RuntimeError> {
        match self {
            Value::Native(n) => Ok(n),
            other => Err(RuntimeError::type_mismatch("native", other.type_name())),
        }
    }

    pub fn as_function(&self) -> Result<&FunctionValue, RuntimeError> {
        match self {
            Value::Function(f) => Ok(f),
            other => Err(RuntimeError::type_mismatch("function", other.type_name())),
        }
    }

    pub fn as_future(&self) -> Result<&FutureRef, RuntimeError> {
        match self {
            Value::Future(f) => Ok(f),
            other => Err(RuntimeError::type_mismatch("future", other.type_name())),
        }
    }

    /// Replace one field of a record value, cloning the field storage if shared.
    pub fn set_record_field(&mut self, index: usize, value: Value) -> Result<(), RuntimeError> {
        match self {
            Value::Record(fields) => {
                let len = fields.len();
                let slot = Rc::make_mut(fields)
                    .get_mut(index)
                    .ok_or(RuntimeError::IndexOutOfBounds {
                        index: index as i64,
                        len,
                    })?;
                *slot = value;
                Ok(())
            }
            other => Err(RuntimeError::type_mismatch("record", other.type_name())),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Native(a), Value::Native(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a == b,
            (Value::Future(a), Value::Future(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "Unit"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Array(a) => f.debug_tuple("Array").field(a).finish(),
            Value::Range(r) => write!(f, "Range({r})"),
            Value::Record(fields) => f.debug_tuple("Record").field(fields).finish(),
            Value::Native(n) => write!(f, "{n:?}"),
            Value::Function(func) => write!(f, "{func:?}"),
            Value::Future(_) => write!(f, "Future"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(elements) | Value::Record(elements) => {
                let (open, close) = if matches!(self, Value::Array(_)) {
                    ("[", "]")
                } else {
                    ("{", "}")
                };
                write!(f, "{open}")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "{close}")
            }
            Value::Range(r) => write!(f, "{r}"),
            Value::Native(n) => write!(f, "<{}>", n.type_name()),
            Value::Function(func) => write!(f, "<fn {}>", func.name()),
            Value::Future(_) => write!(f, "<future>"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

/// A thread-safe literal value, used for host-registered constants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(Arc<str>),
}

impl ConstantValue {
    pub fn to_value(&self) -> Value {
        match self {
            ConstantValue::Unit => Value::Unit,
            ConstantValue::Bool(b) => Value::Bool(*b),
            ConstantValue::Int(i) => Value::Int(*i),
            ConstantValue::Float(x) => Value::Float(*x),
            ConstantValue::String(s) => Value::String(Rc::from(&**s)),
        }
    }
}
