//! Operator and member tables.
//!
//! Every type with behavior carries one flat [`TypeTables`] record: operator
//! kind to [`OperatorEmitter`], method name to [`MethodInvokeFactory`], field
//! name to [`FieldAccessFactory`], plus an optional iteration hook. Types in
//! these tables are given by [`TypeSupplier`]s, resolved against the concrete
//! owner type at lookup, so one table serves every instantiation of a
//! generic type.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::RegistrationError;
use crate::intrinsic::Intrinsic;
use crate::native_fn::NativeFn;
use crate::operator::{BinaryOperator, UnaryOperator};
use crate::types::RealizedType;

// ============================================================================
// Suppliers and targets
// ============================================================================

/// Produces a member's type from the concrete owner type.
#[derive(Clone)]
pub enum TypeSupplier {
    /// A type filled with the owner's own generic arguments.
    Fixed(RealizedType),
    /// The owner type itself.
    This,
    /// Computed from the owner.
    Lazy(Arc<dyn Fn(&RealizedType) -> RealizedType + Send + Sync>),
}

impl TypeSupplier {
    pub fn lazy(f: impl Fn(&RealizedType) -> RealizedType + Send + Sync + 'static) -> Self {
        TypeSupplier::Lazy(Arc::new(f))
    }

    pub fn resolve(&self, owner: &RealizedType) -> RealizedType {
        match self {
            TypeSupplier::Fixed(ty) => ty.fill_generics(&owner.own_substitution()),
            TypeSupplier::This => owner.clone(),
            TypeSupplier::Lazy(f) => f(owner),
        }
    }
}

impl From<RealizedType> for TypeSupplier {
    fn from(ty: RealizedType) -> Self {
        TypeSupplier::Fixed(ty)
    }
}

impl fmt::Debug for TypeSupplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSupplier::Fixed(ty) => write!(f, "Fixed({ty})"),
            TypeSupplier::This => write!(f, "This"),
            TypeSupplier::Lazy(_) => write!(f, "Lazy"),
        }
    }
}

/// The routine a member or operator dispatches to.
#[derive(Debug, Clone, PartialEq)]
pub enum InvokeTarget {
    Intrinsic(Intrinsic),
    Native(NativeFn),
}

impl From<Intrinsic> for InvokeTarget {
    fn from(intrinsic: Intrinsic) -> Self {
        InvokeTarget::Intrinsic(intrinsic)
    }
}

impl From<NativeFn> for InvokeTarget {
    fn from(native: NativeFn) -> Self {
        InvokeTarget::Native(native)
    }
}

// ============================================================================
// Operators
// ============================================================================

/// One operator table entry.
///
/// The left operand is the owner type. `other` is the right operand's type
/// (absent for prefix operators) and `post` an intrinsic applied to the
/// routine's result.
#[derive(Debug, Clone)]
pub struct OperatorEmitter {
    other: Option<TypeSupplier>,
    result: TypeSupplier,
    target: InvokeTarget,
    post: Option<Intrinsic>,
}

impl OperatorEmitter {
    pub fn unary(result: impl Into<TypeSupplier>, target: impl Into<InvokeTarget>) -> Self {
        Self {
            other: None,
            result: result.into(),
            target: target.into(),
            post: None,
        }
    }

    pub fn binary(
        other: impl Into<TypeSupplier>,
        result: impl Into<TypeSupplier>,
        target: impl Into<InvokeTarget>,
    ) -> Self {
        Self {
            other: Some(other.into()),
            result: result.into(),
            target: target.into(),
            post: None,
        }
    }

    pub fn with_post(mut self, post: Intrinsic) -> Self {
        self.post = Some(post);
        self
    }

    fn resolve(&self, owner: &RealizedType) -> ResolvedOperator {
        ResolvedOperator {
            other: self.other.as_ref().map(|s| s.resolve(owner)),
            result: self.result.resolve(owner),
            target: self.target.clone(),
            post: self.post,
        }
    }
}

/// An operator entry with its types resolved against a concrete owner.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOperator {
    pub other: Option<RealizedType>,
    pub result: RealizedType,
    pub target: InvokeTarget,
    pub post: Option<Intrinsic>,
}

/// Prefix and infix operator tables of one type.
#[derive(Debug, Default)]
pub struct OperatorCollection {
    unary: FxHashMap<UnaryOperator, OperatorEmitter>,
    binary: FxHashMap<BinaryOperator, Vec<OperatorEmitter>>,
}

impl OperatorCollection {
    pub fn find_unary(&self, op: UnaryOperator, owner: &RealizedType) -> Option<ResolvedOperator> {
        self.unary.get(&op).map(|e| e.resolve(owner))
    }

    /// Find the entry for `op` whose right operand accepts `rhs`.
    ///
    /// An exact type match wins over a match through assignability.
    pub fn find_binary(
        &self,
        op: BinaryOperator,
        owner: &RealizedType,
        rhs: &RealizedType,
    ) -> Option<ResolvedOperator> {
        let candidates: Vec<ResolvedOperator> = self
            .binary
            .get(&op)?
            .iter()
            .map(|e| e.resolve(owner))
            .collect();
        let accepts = |r: &ResolvedOperator, exact: bool| {
            r.other.as_ref().is_some_and(|other| {
                if exact {
                    other == rhs
                } else {
                    other.is_assignable_from(rhs)
                }
            })
        };
        let exact = candidates.iter().position(|r| accepts(r, true));
        let index = exact.or_else(|| candidates.iter().position(|r| accepts(r, false)))?;
        candidates.into_iter().nth(index)
    }

    pub fn has_binary(&self, op: BinaryOperator) -> bool {
        self.binary.contains_key(&op)
    }
}

// ============================================================================
// Members
// ============================================================================

#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub name: Arc<str>,
    pub ty: TypeSupplier,
    pub description: Arc<str>,
}

/// Describes how to call a method.
///
/// A direct method receives the receiver as its first argument; a
/// non-direct one is an associated routine reached through an instance and
/// is called with the explicit arguments only.
#[derive(Debug, Clone)]
pub struct MethodInvokeFactory {
    description: Arc<str>,
    is_direct: bool,
    generic_params: Vec<Arc<str>>,
    params: Vec<ParamDescriptor>,
    result: TypeSupplier,
    target: InvokeTarget,
}

impl MethodInvokeFactory {
    pub fn new(
        description: &str,
        result: impl Into<TypeSupplier>,
        target: impl Into<InvokeTarget>,
    ) -> Self {
        Self {
            description: Arc::from(description),
            is_direct: true,
            generic_params: Vec::new(),
            params: Vec::new(),
            result: result.into(),
            target: target.into(),
        }
    }

    pub fn param(mut self, name: &str, ty: impl Into<TypeSupplier>, description: &str) -> Self {
        self.params.push(ParamDescriptor {
            name: Arc::from(name),
            ty: ty.into(),
            description: Arc::from(description),
        });
        self
    }

    /// Generic parameters introduced by the method itself, inferred from call arguments.
    pub fn generic(mut self, params: &[&str]) -> Self {
        self.generic_params = params.iter().map(|p| Arc::from(*p)).collect();
        self
    }

    pub fn associated(mut self) -> Self {
        self.is_direct = false;
        self
    }

    fn resolve(&self, name: &Arc<str>, owner: &RealizedType) -> ResolvedMethod {
        ResolvedMethod {
            name: Arc::clone(name),
            description: Arc::clone(&self.description),
            is_direct: self.is_direct,
            generic_params: self.generic_params.clone(),
            params: self
                .params
                .iter()
                .map(|p| ResolvedParam {
                    name: Arc::clone(&p.name),
                    ty: p.ty.resolve(owner),
                    description: Arc::clone(&p.description),
                })
                .collect(),
            result: self.result.resolve(owner),
            target: self.target.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParam {
    pub name: Arc<str>,
    pub ty: RealizedType,
    pub description: Arc<str>,
}

/// A method with its signature resolved against the concrete owner.
/// Method-level generic parameters are still open.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMethod {
    pub name: Arc<str>,
    pub description: Arc<str>,
    pub is_direct: bool,
    pub generic_params: Vec<Arc<str>>,
    pub params: Vec<ResolvedParam>,
    pub result: RealizedType,
    pub target: InvokeTarget,
}

/// Describes how to read and optionally write a field or property.
#[derive(Debug, Clone)]
pub struct FieldAccessFactory {
    description: Arc<str>,
    ty: TypeSupplier,
    getter: InvokeTarget,
    setter: Option<InvokeTarget>,
}

impl FieldAccessFactory {
    pub fn read_only(
        description: &str,
        ty: impl Into<TypeSupplier>,
        getter: impl Into<InvokeTarget>,
    ) -> Self {
        Self {
            description: Arc::from(description),
            ty: ty.into(),
            getter: getter.into(),
            setter: None,
        }
    }

    /// The setter receives `(owner, value)` and writes into the host
    /// object behind `owner`; its result is discarded.
    pub fn with_setter(mut self, setter: impl Into<InvokeTarget>) -> Self {
        self.setter = Some(setter.into());
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// A field resolved against a concrete owner.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedField {
    Accessor {
        ty: RealizedType,
        getter: InvokeTarget,
        setter: Option<InvokeTarget>,
    },
    /// A structural record field stored at `index`.
    RecordSlot { index: usize, ty: RealizedType },
}

impl ResolvedField {
    pub fn ty(&self) -> &RealizedType {
        match self {
            ResolvedField::Accessor { ty, .. } | ResolvedField::RecordSlot { ty, .. } => ty,
        }
    }

    pub fn is_writable(&self) -> bool {
        match self {
            ResolvedField::Accessor { setter, .. } => setter.is_some(),
            ResolvedField::RecordSlot { .. } => true,
        }
    }
}

// ============================================================================
// Iteration
// ============================================================================

/// Index-based iteration hook for bound types: `length(owner)` elements,
/// fetched with `element_at(owner, index)`.
#[derive(Debug, Clone)]
pub struct BoundForIn {
    pub element: TypeSupplier,
    pub length: InvokeTarget,
    pub element_at: InvokeTarget,
}

/// Which iteration protocol a source type uses.
#[derive(Debug, Clone, PartialEq)]
pub enum ForInKind {
    Range,
    Array(RealizedType),
    Indexed {
        element: RealizedType,
        length: InvokeTarget,
        element_at: InvokeTarget,
    },
}

impl ForInKind {
    pub fn element_type(&self) -> RealizedType {
        match self {
            ForInKind::Range => RealizedType::INT,
            ForInKind::Array(element) | ForInKind::Indexed { element, .. } => element.clone(),
        }
    }
}

// ============================================================================
// TypeTables
// ============================================================================

/// All behavior attached to one type.
#[derive(Debug)]
pub struct TypeTables {
    owner: Arc<str>,
    operators: OperatorCollection,
    methods: FxHashMap<Arc<str>, MethodInvokeFactory>,
    fields: FxHashMap<Arc<str>, FieldAccessFactory>,
    for_in: Option<BoundForIn>,
}

impl TypeTables {
    pub fn new(owner: &str) -> Self {
        Self {
            owner: Arc::from(owner),
            operators: OperatorCollection::default(),
            methods: FxHashMap::default(),
            fields: FxHashMap::default(),
            for_in: None,
        }
    }

    pub fn operators(&self) -> &OperatorCollection {
        &self.operators
    }

    pub fn add_unary(&mut self, op: UnaryOperator, emitter: OperatorEmitter) -> Result<(), RegistrationError> {
        if self.operators.unary.contains_key(&op) {
            return Err(self.duplicate(op.symbol()));
        }
        self.operators.unary.insert(op, emitter);
        Ok(())
    }

    /// Register an infix operator.
    ///
    /// Registering `==` also registers `!=` as the same routine followed by
    /// a boolean negation. `!=` cannot be registered on its own.
    pub fn add_binary(&mut self, op: BinaryOperator, emitter: OperatorEmitter) -> Result<(), RegistrationError> {
        match op {
            // An equality routine with its own post step cannot be negated
            // by appending another one.
            BinaryOperator::NotEq => Err(self.derived(op)),
            BinaryOperator::Eq if emitter.post.is_some() => Err(self.derived(op)),
            BinaryOperator::Eq => {
                let not_eq = emitter.clone().with_post(Intrinsic::NotBool);
                self.push_binary(BinaryOperator::Eq, emitter);
                self.push_binary(BinaryOperator::NotEq, not_eq);
                Ok(())
            }
            _ => {
                self.push_binary(op, emitter);
                Ok(())
            }
        }
    }

    fn push_binary(&mut self, op: BinaryOperator, emitter: OperatorEmitter) {
        self.operators.binary.entry(op).or_default().push(emitter);
    }

    pub fn add_method(&mut self, name: &str, factory: MethodInvokeFactory) -> Result<(), RegistrationError> {
        if self.methods.contains_key(name) {
            return Err(self.duplicate(name));
        }
        self.methods.insert(Arc::from(name), factory);
        Ok(())
    }

    pub fn add_field(&mut self, name: &str, factory: FieldAccessFactory) -> Result<(), RegistrationError> {
        if self.fields.contains_key(name) {
            return Err(self.duplicate(name));
        }
        self.fields.insert(Arc::from(name), factory);
        Ok(())
    }

    pub fn set_for_in(&mut self, for_in: BoundForIn) {
        self.for_in = Some(for_in);
    }

    pub fn find_method(&self, name: &str, owner: &RealizedType) -> Option<ResolvedMethod> {
        self.methods
            .get_key_value(name)
            .map(|(key, factory)| factory.resolve(key, owner))
    }

    pub fn find_field(&self, name: &str, owner: &RealizedType) -> Option<ResolvedField> {
        self.fields.get(name).map(|f| ResolvedField::Accessor {
            ty: f.ty.resolve(owner),
            getter: f.getter.clone(),
            setter: f.setter.clone(),
        })
    }

    pub fn for_in(&self, owner: &RealizedType) -> Option<ForInKind> {
        self.for_in.as_ref().map(|f| ForInKind::Indexed {
            element: f.element.resolve(owner),
            length: f.length.clone(),
            element_at: f.element_at.clone(),
        })
    }

    /// Names of all methods, for completion and documentation.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(|k| &**k)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| &**k)
    }

    fn derived(&self, op: BinaryOperator) -> RegistrationError {
        RegistrationError::DerivedOperator {
            ty: self.owner.to_string(),
            op: op.symbol().to_string(),
        }
    }

    fn duplicate(&self, member: &str) -> RegistrationError {
        RegistrationError::DuplicateMember {
            ty: self.owner.to_string(),
            member: member.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_tables() -> TypeTables {
        let mut tables = TypeTables::new("int");
        tables
            .add_binary(
                BinaryOperator::Add,
                OperatorEmitter::binary(RealizedType::INT, RealizedType::INT, Intrinsic::AddInt),
            )
            .unwrap();
        tables
            .add_binary(
                BinaryOperator::Eq,
                OperatorEmitter::binary(RealizedType::INT, RealizedType::BOOL, Intrinsic::EqInt),
            )
            .unwrap();
        tables
    }

    #[test]
    fn not_equal_is_derived_from_equal() {
        let tables = int_tables();
        let eq = tables
            .operators()
            .find_binary(BinaryOperator::Eq, &RealizedType::INT, &RealizedType::INT)
            .unwrap();
        let ne = tables
            .operators()
            .find_binary(BinaryOperator::NotEq, &RealizedType::INT, &RealizedType::INT)
            .unwrap();
        assert_eq!(eq.target, ne.target);
        assert_eq!(eq.post, None);
        assert_eq!(ne.post, Some(Intrinsic::NotBool));
    }

    #[test]
    fn not_equal_cannot_be_registered() {
        let mut tables = int_tables();
        let result = tables.add_binary(
            BinaryOperator::NotEq,
            OperatorEmitter::binary(RealizedType::INT, RealizedType::BOOL, Intrinsic::EqInt),
        );
        assert!(matches!(
            result,
            Err(RegistrationError::DerivedOperator { .. })
        ));
    }

    #[test]
    fn compound_assignment_is_a_separate_entry() {
        let mut tables = int_tables();
        assert!(!tables.operators().has_binary(BinaryOperator::AddAssign));
        tables
            .add_binary(
                BinaryOperator::AddAssign,
                OperatorEmitter::binary(RealizedType::INT, RealizedType::INT, Intrinsic::AddInt),
            )
            .unwrap();
        let add = tables
            .operators()
            .find_binary(BinaryOperator::Add, &RealizedType::INT, &RealizedType::INT)
            .unwrap();
        let add_assign = tables
            .operators()
            .find_binary(BinaryOperator::AddAssign, &RealizedType::INT, &RealizedType::INT)
            .unwrap();
        assert_eq!(add.target, add_assign.target);
    }

    #[test]
    fn exact_match_preferred_over_assignable() {
        let mut tables = TypeTables::new("float");
        tables
            .add_binary(
                BinaryOperator::Mul,
                OperatorEmitter::binary(RealizedType::FLOAT, RealizedType::FLOAT, Intrinsic::MulFloat),
            )
            .unwrap();
        tables
            .add_binary(
                BinaryOperator::Mul,
                OperatorEmitter::binary(RealizedType::INT, RealizedType::STRING, Intrinsic::Concat),
            )
            .unwrap();
        let by_int = tables
            .operators()
            .find_binary(BinaryOperator::Mul, &RealizedType::FLOAT, &RealizedType::INT)
            .unwrap();
        assert_eq!(by_int.result, RealizedType::STRING);
        let by_float = tables
            .operators()
            .find_binary(BinaryOperator::Mul, &RealizedType::FLOAT, &RealizedType::FLOAT)
            .unwrap();
        assert_eq!(by_float.result, RealizedType::FLOAT);
        assert!(
            tables
                .operators()
                .find_binary(BinaryOperator::Mul, &RealizedType::FLOAT, &RealizedType::BOOL)
                .is_none()
        );
    }

    #[test]
    fn suppliers_fill_owner_generics() {
        let owner = RealizedType::array(RealizedType::STRING);
        let fixed = TypeSupplier::from(RealizedType::generic("T"));
        assert_eq!(fixed.resolve(&owner), RealizedType::STRING);
        assert_eq!(TypeSupplier::This.resolve(&owner), owner);
        let lazy = TypeSupplier::lazy(|owner| RealizedType::future(owner.clone()));
        assert_eq!(lazy.resolve(&RealizedType::INT).to_string(), "Future<int>");
    }

    #[test]
    fn duplicate_method_rejected() {
        let mut tables = TypeTables::new("string");
        let factory = MethodInvokeFactory::new("", RealizedType::INT, Intrinsic::StringLength);
        tables.add_method("len", factory.clone()).unwrap();
        assert_eq!(
            tables.add_method("len", factory),
            Err(RegistrationError::DuplicateMember {
                ty: "string".into(),
                member: "len".into()
            })
        );
    }
}
