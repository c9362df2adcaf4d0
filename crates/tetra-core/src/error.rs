//! Error types for every phase of Tetra processing.
//!
//! ## Error Hierarchy
//!
//! ```text
//! TetraError (top-level wrapper)
//! ├── Diagnostics       - accumulated StructuralErrors from module compilation
//! ├── RegistrationError - host catalog construction errors
//! ├── RuntimeError      - VM execution errors
//! ├── NativeError       - failures raised by host routines
//! └── EvalError         - language-level exceptions of the interactive evaluator
//! ```
//!
//! Compilation never returns early on a [`StructuralError`]: validation and
//! emission push into a [`Diagnostics`] collection and keep going, so one
//! broken function does not hide errors in its siblings.

use std::fmt;

use thiserror::Error;

use crate::Span;

// ============================================================================
// Structural Errors (diagnostics)
// ============================================================================

/// Category of a compile-time diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced type is unknown or not valid (usually an unfilled generic).
    InvalidType,
    /// An assignability check between expected and actual types failed.
    IncompatibleTypes,
    /// A name is declared twice in the same block.
    DuplicateVariableName,
    /// No method or field with the requested name.
    UnresolvedMember,
    /// No operator table entry for the operand types.
    UnresolvedOperator,
    /// Structural unification of a generic signature failed.
    GenericInferenceFailure,
    /// A variable name does not resolve in any enclosing scope.
    NoSuchVariable,
    /// A called function does not exist.
    NoSuchFunction,
    /// The construct is not allowed here (await outside async, break outside loop, ...).
    InvalidOperation,
    /// Wrong number of call arguments.
    ArgumentMismatch,
    /// A module-level name is declared twice.
    DuplicateDeclaration,
    /// A `use` declaration names a module or member that does not exist.
    InvalidImport,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidType => "invalid type",
            ErrorKind::IncompatibleTypes => "incompatible types",
            ErrorKind::DuplicateVariableName => "duplicate variable name",
            ErrorKind::UnresolvedMember => "unresolved member",
            ErrorKind::UnresolvedOperator => "unresolved operator",
            ErrorKind::GenericInferenceFailure => "generic inference failure",
            ErrorKind::NoSuchVariable => "no such variable",
            ErrorKind::NoSuchFunction => "no such function",
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::ArgumentMismatch => "argument mismatch",
            ErrorKind::DuplicateDeclaration => "duplicate declaration",
            ErrorKind::InvalidImport => "invalid import",
        };
        f.write_str(name)
    }
}

/// A single diagnostic: kind tag, message and source span.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct StructuralError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

impl StructuralError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn invalid_type(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::InvalidType, message, span)
    }

    pub fn incompatible_types(message: impl Into<String>, span: Span) -> Self {
        Self::new(ErrorKind::IncompatibleTypes, message, span)
    }
}

/// Ordered, append-only collection of diagnostics for one compilation.
///
/// An optional limit caps how many diagnostics are retained; anything past
/// the cap is counted but dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<StructuralError>,
    limit: Option<usize>,
    dropped: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection that keeps at most `limit` diagnostics.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn push(&mut self, error: StructuralError) {
        match self.limit {
            Some(limit) if self.errors.len() >= limit => self.dropped += 1,
            _ => self.errors.push(error),
        }
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.dropped += other.dropped;
        for error in other.errors {
            self.push(error);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.dropped == 0
    }

    /// Total number of diagnostics reported, including dropped ones.
    pub fn len(&self) -> usize {
        self.errors.len() + self.dropped
    }

    /// Number of diagnostics discarded because of the limit.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructuralError> {
        self.errors.iter()
    }

    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    pub fn first(&self) -> Option<&StructuralError> {
        self.errors.first()
    }

    pub fn into_vec(self) -> Vec<StructuralError> {
        self.errors
    }

    /// `Ok(())` when nothing was reported, otherwise the whole collection.
    pub fn into_result(self) -> Result<(), Diagnostics> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        if self.dropped > 0 {
            write!(f, "\n... and {} more", self.dropped)?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostics {}

impl IntoIterator for Diagnostics {
    type Item = StructuralError;
    type IntoIter = std::vec::IntoIter<StructuralError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while building the host type catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("type '{name}' is already registered in module '{module}'")]
    DuplicateType { module: String, name: String },

    #[error("function '{name}' is already registered in module '{module}'")]
    DuplicateFunction { module: String, name: String },

    #[error("constant '{name}' is already registered in module '{module}'")]
    DuplicateConstant { module: String, name: String },

    #[error("generic parameter '{param}' appears twice on '{ty}'")]
    DuplicateGenericParameter { ty: String, param: String },

    #[error("member '{member}' is already registered on '{ty}'")]
    DuplicateMember { ty: String, member: String },

    #[error("module '{0}' is already registered")]
    DuplicateModule(String),

    #[error("operator '{op}' on '{ty}' is derived from '==' and cannot be registered")]
    DerivedOperator { ty: String, op: String },
}

// ============================================================================
// Native Errors
// ============================================================================

/// Failures raised by host routines called from script code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    #[error("expected {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },

    #[error("argument {index}: expected {expected}, got {got}")]
    ArgumentType {
        index: usize,
        expected: &'static str,
        got: &'static str,
    },

    #[error("callback failed: {0}")]
    Invocation(String),

    #[error("{0}")]
    Custom(String),
}

impl NativeError {
    pub fn custom(message: impl Into<String>) -> Self {
        NativeError::Custom(message.into())
    }
}

// ============================================================================
// Runtime Errors
// ============================================================================

/// Errors raised while executing compiled bytecode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("stack underflow")]
    StackUnderflow,

    #[error("invalid opcode {0:#04x}")]
    InvalidOpcode(u8),

    #[error("invalid constant index {0}")]
    InvalidConstant(u32),

    #[error("invalid local slot {0}")]
    InvalidLocal(u16),

    #[error("invalid global slot {0}")]
    InvalidGlobal(u16),

    #[error("invalid async prototype {0}")]
    InvalidPrototype(u16),

    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("call depth exceeded {0}")]
    CallDepthExceeded(usize),

    #[error("computation is already being advanced")]
    ReentrantAdvance,

    #[error("suspension point reached in a synchronous call")]
    SuspendInSync,

    #[error(transparent)]
    Native(#[from] NativeError),
}

impl RuntimeError {
    pub fn type_mismatch(expected: &'static str, got: &'static str) -> Self {
        RuntimeError::TypeMismatch { expected, got }
    }
}

// ============================================================================
// Evaluation Errors
// ============================================================================

/// Language-level exceptions raised by interactive evaluation.
///
/// Unlike module compilation, which accumulates diagnostics, evaluation
/// fails on the first problem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("{0}")]
    Compilation(Diagnostics),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("{0} cannot be evaluated interactively")]
    NotSupported(&'static str),
}

impl EvalError {
    /// Kind of the underlying diagnostic, if this error came from type checking.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            EvalError::Structural(e) => Some(e.kind),
            EvalError::Compilation(d) => d.first().map(|e| e.kind),
            _ => None,
        }
    }
}

impl From<Diagnostics> for EvalError {
    fn from(diagnostics: Diagnostics) -> Self {
        EvalError::Compilation(diagnostics)
    }
}

// ============================================================================
// Top-level
// ============================================================================

/// Unified error wrapper for callers that do not need per-phase handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TetraError {
    #[error("compilation failed:\n{0}")]
    Compilation(#[from] Diagnostics),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_respect_limit() {
        let mut diagnostics = Diagnostics::with_limit(2);
        for i in 0..5 {
            diagnostics.push(StructuralError::invalid_type(
                format!("e{i}"),
                Span::point(1, 1),
            ));
        }
        assert_eq!(diagnostics.iter().count(), 2);
        assert_eq!(diagnostics.len(), 5);
        assert_eq!(diagnostics.dropped(), 3);
        assert!(diagnostics.to_string().ends_with("... and 3 more"));
    }

    #[test]
    fn empty_diagnostics_into_ok() {
        assert!(Diagnostics::new().into_result().is_ok());
    }

    #[test]
    fn count_of_filters_by_kind() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(StructuralError::invalid_type("a", Span::default()));
        diagnostics.push(StructuralError::incompatible_types("b", Span::default()));
        diagnostics.push(StructuralError::incompatible_types("c", Span::default()));
        assert_eq!(diagnostics.count_of(ErrorKind::IncompatibleTypes), 2);
        assert_eq!(diagnostics.count_of(ErrorKind::InvalidType), 1);
    }

    #[test]
    fn structural_error_display() {
        let error = StructuralError::new(
            ErrorKind::DuplicateVariableName,
            "Variable 'x' already declared in this scope",
            Span::on_line(2, 5, 1),
        );
        assert_eq!(
            error.to_string(),
            "duplicate variable name at 2:5: Variable 'x' already declared in this scope"
        );
    }

    #[test]
    fn native_error_converts_to_runtime() {
        let err: RuntimeError = NativeError::custom("boom").into();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn eval_error_exposes_kind() {
        let err: EvalError =
            StructuralError::incompatible_types("mismatch", Span::default()).into();
        assert_eq!(err.kind(), Some(ErrorKind::IncompatibleTypes));
        assert_eq!(EvalError::NotSupported("functions").kind(), None);
    }
}
