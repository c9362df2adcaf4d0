//! Core types shared by every Tetra crate.
//!
//! - [`types`]: the realized-type algebra and the generic engine
//! - [`members`]: operator, method and field tables attached to types
//! - [`value`], [`future`], [`native_fn`], [`intrinsic`]: runtime values and
//!   the routines that act on them
//! - [`error`]: diagnostics and per-phase error types

pub mod error;
pub mod future;
pub mod intrinsic;
pub mod members;
pub mod native_fn;
pub mod operator;
pub mod span;
pub mod type_hash;
pub mod types;
pub mod value;

pub use error::{
    Diagnostics, ErrorKind, EvalError, NativeError, RegistrationError, RuntimeError,
    StructuralError, TetraError,
};
pub use future::{FutureRef, FutureResult, Resumable};
pub use intrinsic::Intrinsic;
pub use members::{
    BoundForIn, FieldAccessFactory, ForInKind, InvokeTarget, MethodInvokeFactory,
    OperatorCollection, OperatorEmitter, ResolvedField, ResolvedMethod, ResolvedOperator,
    ResolvedParam, TypeSupplier, TypeTables,
};
pub use native_fn::{FunctionInvoker, NativeCallable, NativeContext, NativeFn};
pub use operator::{BinaryOperator, UnaryOperator};
pub use span::{Position, Span};
pub use type_hash::TypeHash;
pub use types::{
    BoundInstance, BoundType, BuiltinCatalog, BuiltinType, CatalogEntry, FunctionType,
    GenericParameter, RealizedType, RecordField, RecordType, SubstitutionMap, TypeContext,
    substitution,
};
pub use value::{ConstantValue, FunctionValue, NativeValue, Range, Value};
