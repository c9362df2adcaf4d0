//! Generic parameters, instantiation and inference.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{BoundInstance, FunctionType, RealizedType, RecordField, RecordType};

/// Maps generic parameter names to the types that replace them.
pub type SubstitutionMap = FxHashMap<Arc<str>, RealizedType>;

/// Build a substitution from `(name, type)` pairs.
pub fn substitution<'a>(pairs: impl IntoIterator<Item = (&'a str, RealizedType)>) -> SubstitutionMap {
    pairs
        .into_iter()
        .map(|(name, ty)| (Arc::from(name), ty))
        .collect()
}

/// A named placeholder type variable. Equality is by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericParameter {
    name: Arc<str>,
}

impl GenericParameter {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl RealizedType {
    /// True iff no bare generic parameter is reachable from this type.
    pub fn is_valid(&self) -> bool {
        match self {
            RealizedType::Builtin(_) | RealizedType::Range => true,
            RealizedType::Generic(_) | RealizedType::Undefined => false,
            RealizedType::Array(inner) | RealizedType::Future(inner) => inner.is_valid(),
            RealizedType::Function(function) => {
                function.params().iter().all(RealizedType::is_valid) && function.result().is_valid()
            }
            RealizedType::Record(record) => record.fields().iter().all(|f| f.ty.is_valid()),
            RealizedType::Bound(bound) => bound.args().iter().all(RealizedType::is_valid),
        }
    }

    /// Whether any generic parameter occurs in this type.
    pub fn has_generics(&self) -> bool {
        match self {
            RealizedType::Generic(_) => true,
            RealizedType::Builtin(_) | RealizedType::Range | RealizedType::Undefined => false,
            RealizedType::Array(inner) | RealizedType::Future(inner) => inner.has_generics(),
            RealizedType::Function(function) => {
                function.params().iter().any(RealizedType::has_generics)
                    || function.result().has_generics()
            }
            RealizedType::Record(record) => record.fields().iter().any(|f| f.ty.has_generics()),
            RealizedType::Bound(bound) => bound.args().iter().any(RealizedType::has_generics),
        }
    }

    /// Replace every generic parameter named in `substitution`.
    ///
    /// One step only: `T -> U` leaves a `U` behind for a later fill, and
    /// names missing from the map are kept as they are.
    pub fn fill_generics(&self, substitution: &SubstitutionMap) -> RealizedType {
        if substitution.is_empty() || !self.has_generics() {
            return self.clone();
        }
        match self {
            RealizedType::Generic(param) => substitution
                .get(param.name())
                .cloned()
                .unwrap_or_else(|| self.clone()),
            RealizedType::Array(element) => RealizedType::array(element.fill_generics(substitution)),
            RealizedType::Future(result) => RealizedType::future(result.fill_generics(substitution)),
            RealizedType::Function(function) => RealizedType::Function(Arc::new(FunctionType::new(
                function
                    .params()
                    .iter()
                    .map(|p| p.fill_generics(substitution))
                    .collect(),
                function.result().fill_generics(substitution),
            ))),
            RealizedType::Record(record) => RealizedType::Record(Arc::new(RecordType::new(
                record
                    .fields()
                    .iter()
                    .map(|f| RecordField::new(&f.name, f.ty.fill_generics(substitution)))
                    .collect(),
            ))),
            RealizedType::Bound(bound) => RealizedType::Bound(BoundInstance::new(
                Arc::clone(bound.def()),
                bound
                    .args()
                    .iter()
                    .map(|a| a.fill_generics(substitution))
                    .collect(),
            )),
            RealizedType::Builtin(_) | RealizedType::Range | RealizedType::Undefined => self.clone(),
        }
    }

    /// Recover the substitution that turns `self` into `concrete`.
    ///
    /// Positions that do not line up are skipped, so a mismatch produces an
    /// empty or partial map rather than an error.
    pub fn infer_generic_argument(&self, concrete: &RealizedType) -> SubstitutionMap {
        let mut out = SubstitutionMap::default();
        self.unify(concrete, &mut out);
        out
    }

    /// Structurally match `self` against `concrete`, recording parameter bindings.
    ///
    /// Returns `false` when the shapes differ or a parameter would be bound
    /// to two different types; bindings found before the mismatch remain in `out`.
    pub fn unify(&self, concrete: &RealizedType, out: &mut SubstitutionMap) -> bool {
        match (self, concrete) {
            (RealizedType::Generic(param), _) => match out.get(param.name()) {
                Some(existing) => existing == concrete,
                None => {
                    out.insert(Arc::from(param.name()), concrete.clone());
                    true
                }
            },
            (RealizedType::Array(a), RealizedType::Array(b))
            | (RealizedType::Future(a), RealizedType::Future(b)) => a.unify(b, out),
            (RealizedType::Function(a), RealizedType::Function(b)) => {
                if a.params().len() != b.params().len() {
                    return false;
                }
                let params_ok = a
                    .params()
                    .iter()
                    .zip(b.params())
                    .fold(true, |ok, (p, q)| p.unify(q, out) && ok);
                a.result().unify(b.result(), out) && params_ok
            }
            (RealizedType::Record(a), RealizedType::Record(b)) => {
                if a.fields().len() != b.fields().len() {
                    return false;
                }
                a.fields().iter().zip(b.fields()).fold(true, |ok, (f, g)| {
                    f.name == g.name && f.ty.unify(&g.ty, out) && ok
                })
            }
            (RealizedType::Bound(a), RealizedType::Bound(b)) => {
                if !a.same_definition(b) || a.args().len() != b.args().len() {
                    return false;
                }
                a.args()
                    .iter()
                    .zip(b.args())
                    .fold(true, |ok, (x, y)| x.unify(y, out) && ok)
            }
            (expected, actual) => expected == actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(element: RealizedType) -> RealizedType {
        RealizedType::array(element)
    }

    #[test]
    fn non_generic_fill_is_noop() {
        let sub = substitution([("T", RealizedType::STRING)]);
        let ty = RealizedType::function(vec![RealizedType::INT], RealizedType::BOOL);
        assert_eq!(ty.fill_generics(&sub), ty);
    }

    #[test]
    fn identity_substitution_is_noop() {
        let ty = list_of(RealizedType::generic("T"));
        let sub = substitution([("T", RealizedType::generic("T"))]);
        assert_eq!(ty.fill_generics(&sub), ty);
        assert!(!ty.fill_generics(&sub).is_valid());
    }

    #[test]
    fn alias_chain_resolves_in_two_steps() {
        let ty = list_of(RealizedType::generic("T"));
        let aliased = ty.fill_generics(&substitution([("T", RealizedType::generic("U"))]));
        assert_eq!(aliased.to_string(), "U[]");
        let filled = aliased.fill_generics(&substitution([("U", RealizedType::STRING)]));
        assert_eq!(
            filled,
            ty.fill_generics(&substitution([("T", RealizedType::STRING)]))
        );
    }

    #[test]
    fn aliased_parameter_is_inferred_by_its_new_name() {
        let aliased = list_of(RealizedType::generic("T"))
            .fill_generics(&substitution([("T", RealizedType::generic("U"))]));
        let inferred = aliased.infer_generic_argument(&list_of(RealizedType::INT));
        assert_eq!(inferred, substitution([("U", RealizedType::INT)]));
        assert_eq!(inferred.get("T"), None);
    }

    #[test]
    fn fill_is_single_step() {
        let ty = RealizedType::function(
            vec![RealizedType::generic("A")],
            RealizedType::generic("B"),
        );
        let swapped = ty.fill_generics(&substitution([
            ("A", RealizedType::generic("B")),
            ("B", RealizedType::generic("A")),
        ]));
        assert_eq!(swapped.to_string(), "fn(B) -> A");
    }

    #[test]
    fn infer_recovers_function_arguments() {
        let generic = RealizedType::function(
            vec![RealizedType::generic("T")],
            RealizedType::generic("U"),
        );
        let concrete = RealizedType::function(vec![RealizedType::INT], RealizedType::STRING);
        let inferred = generic.infer_generic_argument(&concrete);
        assert_eq!(inferred.get("T"), Some(&RealizedType::INT));
        assert_eq!(inferred.get("U"), Some(&RealizedType::STRING));
    }

    #[test]
    fn conflicting_bindings_fail_unification() {
        let generic = RealizedType::function(
            vec![RealizedType::generic("T"), RealizedType::generic("T")],
            RealizedType::UNIT,
        );
        let concrete = RealizedType::function(
            vec![RealizedType::INT, RealizedType::STRING],
            RealizedType::UNIT,
        );
        let mut out = SubstitutionMap::default();
        assert!(!generic.unify(&concrete, &mut out));
        assert_eq!(out.get("T"), Some(&RealizedType::INT));
    }

    #[test]
    fn mismatched_shapes_infer_nothing() {
        let generic = list_of(RealizedType::generic("T"));
        assert!(generic.infer_generic_argument(&RealizedType::Range).is_empty());
    }

    #[test]
    fn validity_looks_through_composites() {
        let record = RealizedType::record(vec![
            RecordField::new("a", RealizedType::INT),
            RecordField::new("b", RealizedType::future(RealizedType::generic("T"))),
        ]);
        assert!(!record.is_valid());
        let filled = record.fill_generics(&substitution([("T", RealizedType::FLOAT)]));
        assert!(filled.is_valid());
    }
}
