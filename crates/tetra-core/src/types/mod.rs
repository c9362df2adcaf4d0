//! The realized-type algebra.
//!
//! A [`RealizedType`] is a fully resolved, nameable type. Composite variants
//! share their payload behind `Arc`, so cloning a type is cheap and types can
//! be captured by the lazy suppliers of member tables.
//!
//! ## Generic engine
//!
//! - [`RealizedType::is_valid`]: no bare generic parameter is reachable.
//! - [`RealizedType::fill_generics`]: single-step substitution. A parameter
//!   mapped to another parameter is rewritten to that parameter and can be
//!   filled by a second call, so alias chains resolve transitively.
//! - [`RealizedType::infer_generic_argument`]: structural unification of a
//!   generic type against a concrete one, yielding a partial substitution on
//!   mismatch rather than an error.

mod bound;
mod builtin;
mod function;
mod generic;
mod record;

use std::fmt;
use std::sync::Arc;

pub use bound::{BoundInstance, BoundType};
pub use builtin::{BuiltinCatalog, BuiltinType, CatalogEntry};
pub use function::FunctionType;
pub use generic::{GenericParameter, SubstitutionMap, substitution};
pub use record::{RecordField, RecordType};

use crate::members::{
    ForInKind, ResolvedField, ResolvedMethod, ResolvedOperator, TypeTables,
};
use crate::operator::{BinaryOperator, UnaryOperator};

/// Environment in which types are resolved.
///
/// Implemented by the compiler's module context; the builtin catalog is an
/// explicit value owned by the registry, never process-global state.
pub trait TypeContext {
    fn builtins(&self) -> &BuiltinCatalog;

    /// Look up a declared, imported or aliased type by (possibly qualified) name.
    fn find_type(&self, name: &str) -> Option<RealizedType>;
}

/// A fully resolved type.
#[derive(Clone)]
pub enum RealizedType {
    Builtin(BuiltinType),
    Generic(GenericParameter),
    Array(Arc<RealizedType>),
    Range,
    Function(Arc<FunctionType>),
    Future(Arc<RealizedType>),
    Record(Arc<RecordType>),
    Bound(BoundInstance),
    /// Type of an expression that failed to check or never produces a value.
    /// Assignable to and from everything so one error does not cascade.
    Undefined,
}

impl RealizedType {
    pub const UNIT: RealizedType = RealizedType::Builtin(BuiltinType::Unit);
    pub const BOOL: RealizedType = RealizedType::Builtin(BuiltinType::Bool);
    pub const INT: RealizedType = RealizedType::Builtin(BuiltinType::Int);
    pub const FLOAT: RealizedType = RealizedType::Builtin(BuiltinType::Float);
    pub const STRING: RealizedType = RealizedType::Builtin(BuiltinType::String);

    pub fn generic(name: &str) -> Self {
        RealizedType::Generic(GenericParameter::new(name))
    }

    pub fn array(element: RealizedType) -> Self {
        RealizedType::Array(Arc::new(element))
    }

    pub fn future(result: RealizedType) -> Self {
        RealizedType::Future(Arc::new(result))
    }

    pub fn function(params: Vec<RealizedType>, result: RealizedType) -> Self {
        RealizedType::Function(Arc::new(FunctionType::new(params, result)))
    }

    pub fn record(fields: Vec<RecordField>) -> Self {
        RealizedType::Record(Arc::new(RecordType::new(fields)))
    }

    /// The declared form of a bound type: every generic argument is its own parameter.
    pub fn bound(def: Arc<BoundType>) -> Self {
        let args = def
            .generic_params()
            .iter()
            .map(|p| RealizedType::Generic(GenericParameter::new(p)))
            .collect();
        RealizedType::Bound(BoundInstance::new(def, args))
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, RealizedType::Builtin(BuiltinType::Unit))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, RealizedType::Undefined)
    }

    /// Module-qualified name, e.g. `core::Range` or `module::SimpleGeneric<int>`.
    pub fn qualified_name(&self) -> String {
        self.to_string()
    }

    /// Name without the module prefix.
    pub fn local_name(&self) -> String {
        match self {
            RealizedType::Range => "Range".to_string(),
            RealizedType::Bound(bound) => bound.render(false),
            other => other.to_string(),
        }
    }

    /// Names of the generic parameters this type was declared with.
    pub fn generic_parameter_names(&self) -> Vec<Arc<str>> {
        match self {
            RealizedType::Array(_) | RealizedType::Future(_) => vec![Arc::from("T")],
            RealizedType::Bound(bound) => bound.def().generic_params().to_vec(),
            _ => Vec::new(),
        }
    }

    /// Current arguments bound to [`Self::generic_parameter_names`], position for position.
    pub fn generic_arguments(&self) -> Vec<RealizedType> {
        match self {
            RealizedType::Array(element) | RealizedType::Future(element) => {
                vec![(**element).clone()]
            }
            RealizedType::Bound(bound) => bound.args().to_vec(),
            _ => Vec::new(),
        }
    }

    /// Substitution mapping this type's own parameter names to its arguments.
    ///
    /// Member suppliers of an instantiated type are filled with it.
    pub fn own_substitution(&self) -> SubstitutionMap {
        self.generic_parameter_names()
            .into_iter()
            .zip(self.generic_arguments())
            .collect()
    }

    /// Assignability without conversion, plus the implicit `int -> float` widening.
    pub fn is_assignable_from(&self, other: &RealizedType) -> bool {
        self == other
            || self.is_undefined()
            || other.is_undefined()
            || self.needs_int_to_float(other)
    }

    /// Whether assigning `other` into `self` requires an int-to-float conversion.
    pub fn needs_int_to_float(&self, other: &RealizedType) -> bool {
        matches!(
            (self, other),
            (
                RealizedType::Builtin(BuiltinType::Float),
                RealizedType::Builtin(BuiltinType::Int)
            )
        )
    }

    // ==========================================================================
    // Member tables
    // ==========================================================================

    /// Operator and member tables for this type, if it has any.
    pub fn tables<'a>(&'a self, ctx: &'a dyn TypeContext) -> Option<&'a TypeTables> {
        match self {
            RealizedType::Builtin(builtin) => Some(ctx.builtins().entry(CatalogEntry::Builtin(*builtin))),
            RealizedType::Array(_) => Some(ctx.builtins().entry(CatalogEntry::Array)),
            RealizedType::Range => Some(ctx.builtins().entry(CatalogEntry::Range)),
            RealizedType::Bound(bound) => Some(bound.def().tables()),
            _ => None,
        }
    }

    pub fn find_unary(&self, ctx: &dyn TypeContext, op: UnaryOperator) -> Option<ResolvedOperator> {
        self.tables(ctx)?.operators().find_unary(op, self)
    }

    pub fn find_binary(
        &self,
        ctx: &dyn TypeContext,
        op: BinaryOperator,
        rhs: &RealizedType,
    ) -> Option<ResolvedOperator> {
        self.tables(ctx)?.operators().find_binary(op, self, rhs)
    }

    pub fn find_method(&self, ctx: &dyn TypeContext, name: &str) -> Option<ResolvedMethod> {
        self.tables(ctx)?.find_method(name, self)
    }

    pub fn find_field(&self, ctx: &dyn TypeContext, name: &str) -> Option<ResolvedField> {
        if let RealizedType::Record(record) = self {
            return record
                .field(name)
                .map(|(index, ty)| ResolvedField::RecordSlot {
                    index,
                    ty: ty.clone(),
                });
        }
        self.tables(ctx)?.find_field(name, self)
    }

    /// Which iteration protocol drives a `for (x in source)` over this type.
    pub fn for_in(&self, ctx: &dyn TypeContext) -> Option<ForInKind> {
        match self {
            RealizedType::Range => Some(ForInKind::Range),
            RealizedType::Array(element) => Some(ForInKind::Array((**element).clone())),
            RealizedType::Bound(bound) => bound.def().tables().for_in(self),
            _ => self.tables(ctx)?.for_in(self),
        }
    }
}

impl PartialEq for RealizedType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RealizedType::Builtin(a), RealizedType::Builtin(b)) => a == b,
            (RealizedType::Generic(a), RealizedType::Generic(b)) => a == b,
            (RealizedType::Array(a), RealizedType::Array(b)) => a == b,
            (RealizedType::Range, RealizedType::Range) => true,
            (RealizedType::Function(a), RealizedType::Function(b)) => a == b,
            (RealizedType::Future(a), RealizedType::Future(b)) => a == b,
            (RealizedType::Record(a), RealizedType::Record(b)) => a == b,
            (RealizedType::Bound(a), RealizedType::Bound(b)) => a == b,
            (RealizedType::Undefined, RealizedType::Undefined) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RealizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RealizedType::Builtin(builtin) => f.write_str(builtin.name()),
            RealizedType::Generic(param) => f.write_str(param.name()),
            RealizedType::Array(element) => write!(f, "{element}[]"),
            RealizedType::Range => f.write_str("core::Range"),
            RealizedType::Function(function) => write!(f, "{function}"),
            RealizedType::Future(result) => write!(f, "Future<{result}>"),
            RealizedType::Record(record) => write!(f, "{record}"),
            RealizedType::Bound(bound) => f.write_str(&bound.render(true)),
            RealizedType::Undefined => f.write_str("<undefined>"),
        }
    }
}

impl fmt::Debug for RealizedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
