//! Type expressions as written in source, resolved against a [`TypeContext`].

use std::fmt;

use tetra_core::{
    BuiltinType, RealizedType, RecordField, Span, StructuralError, TypeContext, substitution,
};

#[derive(Debug, Clone, Copy)]
pub enum TypeRef<'a> {
    /// `name`, `module::name` or `name<args>`.
    Named {
        module: Option<&'a str>,
        name: &'a str,
        args: &'a [TypeRef<'a>],
        span: Span,
    },
    /// `T[]`
    Array(&'a TypeRef<'a>, Span),
    /// `fn(A, B) -> R`
    Function {
        params: &'a [TypeRef<'a>],
        result: &'a TypeRef<'a>,
        span: Span,
    },
    /// `{ x: int, y: int }`
    Record(&'a [(&'a str, TypeRef<'a>)], Span),
}

impl<'a> TypeRef<'a> {
    pub fn span(&self) -> Span {
        match self {
            TypeRef::Named { span, .. }
            | TypeRef::Array(_, span)
            | TypeRef::Function { span, .. }
            | TypeRef::Record(_, span) => *span,
        }
    }

    /// Resolve to a concrete type.
    ///
    /// Fails with `InvalidType` for unknown names, wrong generic arity, or a
    /// result that still carries an unfilled generic parameter.
    pub fn resolve(&self, ctx: &dyn TypeContext) -> Result<RealizedType, StructuralError> {
        let ty = self.resolve_shape(ctx)?;
        if !ty.is_valid() {
            return Err(StructuralError::invalid_type(
                format!("Type '{ty}' has unfilled generic parameters"),
                self.span(),
            ));
        }
        Ok(ty)
    }

    fn resolve_shape(&self, ctx: &dyn TypeContext) -> Result<RealizedType, StructuralError> {
        match self {
            TypeRef::Named {
                module,
                name,
                args,
                span,
            } => {
                let base = match module {
                    Some(module) => ctx.find_type(&format!("{module}::{name}")),
                    None => builtin_named(name).or_else(|| ctx.find_type(name)),
                }
                .ok_or_else(|| {
                    StructuralError::invalid_type(format!("Invalid type name '{self}'"), *span)
                })?;
                let params = base.generic_parameter_names();
                if args.is_empty() {
                    return Ok(base);
                }
                if params.len() != args.len() {
                    return Err(StructuralError::invalid_type(
                        format!(
                            "Type '{}' expects {} generic argument(s), got {}",
                            base.local_name(),
                            params.len(),
                            args.len()
                        ),
                        *span,
                    ));
                }
                let resolved = args
                    .iter()
                    .map(|arg| arg.resolve(ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(base.fill_generics(&substitution(
                    params.iter().map(|p| &**p).zip(resolved),
                )))
            }
            TypeRef::Array(element, _) => Ok(RealizedType::array(element.resolve_shape(ctx)?)),
            TypeRef::Function { params, result, .. } => Ok(RealizedType::function(
                params
                    .iter()
                    .map(|p| p.resolve_shape(ctx))
                    .collect::<Result<_, _>>()?,
                result.resolve_shape(ctx)?,
            )),
            TypeRef::Record(fields, _) => Ok(RealizedType::record(
                fields
                    .iter()
                    .map(|(name, ty)| Ok(RecordField::new(name, ty.resolve_shape(ctx)?)))
                    .collect::<Result<_, StructuralError>>()?,
            )),
        }
    }
}

/// Names every module sees without an import.
pub(crate) fn builtin_named(name: &str) -> Option<RealizedType> {
    match name {
        "Range" => Some(RealizedType::Range),
        "Future" => Some(RealizedType::future(RealizedType::generic("T"))),
        _ => BuiltinType::from_name(name).map(RealizedType::Builtin),
    }
}

impl fmt::Display for TypeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named {
                module, name, args, ..
            } => {
                if let Some(module) = module {
                    write!(f, "{module}::")?;
                }
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeRef::Array(element, _) => write!(f, "{element}[]"),
            TypeRef::Function { params, result, .. } => {
                f.write_str("fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {result}")
            }
            TypeRef::Record(fields, _) => {
                f.write_str("{ ")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                f.write_str(" }")
            }
        }
    }
}
