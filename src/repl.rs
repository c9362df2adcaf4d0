//! Interactive evaluation of single expressions and declarations.
//!
//! Unlike module compilation, evaluation stops at the first problem and
//! reports it as an [`EvalError`]. Variables declared by earlier
//! evaluations stay visible to later ones, and assignments made by a
//! synchronous evaluation are kept.

use log::debug;
use tetra_compiler::ast::{Expr, VariableDeclaration};
use tetra_compiler::snippet::{SNIPPET_ENTRY, SnippetBody, SnippetParam, compile_snippet};
use tetra_core::{EvalError, FutureRef, RealizedType, RuntimeError, Value};
use tetra_registry::{CORE_MODULE, TypeRegistry};

use crate::vm::{Vm, VmOptions};

/// Result of one evaluation.
#[derive(Debug, Clone)]
pub enum ReplValue {
    Ready(Value),
    /// The expression suspends; the host drives the future to completion.
    Deferred(FutureRef),
}

impl ReplValue {
    pub fn ready(&self) -> Option<&Value> {
        match self {
            ReplValue::Ready(value) => Some(value),
            ReplValue::Deferred(_) => None,
        }
    }
}

impl PartialEq for ReplValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ReplValue::Ready(a), ReplValue::Ready(b)) => a == b,
            (ReplValue::Deferred(a), ReplValue::Deferred(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub value: ReplValue,
    pub ty: RealizedType,
}

#[derive(Debug, Clone)]
struct ReplVariable {
    param: SnippetParam,
    value: Value,
}

/// State of an interactive session.
pub struct ReplContext<'r> {
    registry: &'r TypeRegistry,
    imports: Vec<String>,
    variables: Vec<ReplVariable>,
    evaluations: u64,
    options: VmOptions,
}

impl<'r> ReplContext<'r> {
    /// A session with the `core` module imported.
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            imports: vec![CORE_MODULE.to_string()],
            variables: Vec::new(),
            evaluations: 0,
            options: VmOptions::default(),
        }
    }

    pub fn with_options(mut self, options: VmOptions) -> Self {
        self.options = options;
        self
    }

    /// Bring every member of registry module `name` into scope.
    pub fn import(&mut self, name: &str) -> Result<(), EvalError> {
        if self.registry.module(name).is_none() {
            return Err(EvalError::NotSupported("importing an unknown module"));
        }
        if !self.imports.iter().any(|m| m == name) {
            self.imports.push(name.to_string());
        }
        Ok(())
    }

    /// Declared or inferred type of a session variable.
    pub fn type_of(&self, name: &str) -> Option<&RealizedType> {
        self.variable(name).map(|v| &v.param.ty)
    }

    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.variable(name).map(|v| &v.value)
    }

    fn variable(&self, name: &str) -> Option<&ReplVariable> {
        self.variables.iter().find(|v| v.param.name == name)
    }

    pub fn eval(&mut self, expr: &Expr<'_>) -> Result<Evaluated, EvalError> {
        self.run(SnippetBody::Expression(expr))
    }

    /// Evaluate a declaration; the new variable replaces any earlier one
    /// with the same name.
    pub fn declare(&mut self, decl: &VariableDeclaration<'_>) -> Result<Evaluated, EvalError> {
        self.run(SnippetBody::Declaration(decl))
    }

    fn run(&mut self, body: SnippetBody<'_>) -> Result<Evaluated, EvalError> {
        let params: Vec<SnippetParam> = self.variables.iter().map(|v| v.param.clone()).collect();
        let imports: Vec<&str> = self.imports.iter().map(String::as_str).collect();
        let index = self.evaluations;
        self.evaluations += 1;

        let snippet = compile_snippet(self.registry, &imports, index, &params, body)?;
        if snippet.is_async && snippet.declared.is_some() {
            return Err(EvalError::NotSupported(
                "declaring a variable from a suspending expression",
            ));
        }
        let vm = Vm::load(snippet.module, self.options)?;
        let args = self.variables.iter().map(|v| v.value.clone()).collect();
        let returned = vm.call(SNIPPET_ENTRY, args)?;
        debug!("evaluation {index} produced {}", snippet.result);

        let value = if snippet.is_async {
            ReplValue::Deferred(returned.as_future()?.clone())
        } else {
            let packed = returned.as_array()?;
            let (result, updated) = packed.split_first().ok_or(RuntimeError::StackUnderflow)?;
            for (variable, value) in self.variables.iter_mut().zip(updated) {
                variable.value = value.clone();
            }
            ReplValue::Ready(result.clone())
        };

        if let (Some(param), ReplValue::Ready(value)) = (snippet.declared, &value) {
            self.variables.retain(|v| v.param.name != param.name);
            self.variables.push(ReplVariable {
                param,
                value: value.clone(),
            });
        }

        Ok(Evaluated {
            value,
            ty: snippet.result,
        })
    }
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use tetra_compiler::ast::{AstBuilder, Binding};
    use tetra_core::{BinaryOperator, ErrorKind};

    use super::*;

    #[test]
    fn declared_variables_are_visible_later() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut repl = ReplContext::new(&registry);

        let decl = b.declaration(Binding::Name(b.str("x")), false, None, b.int(20));
        let declared = repl.declare(&decl).unwrap();
        assert_eq!(declared.value, ReplValue::Ready(Value::Int(20)));
        assert_eq!(repl.type_of("x"), Some(&RealizedType::INT));

        let sum = b.binary(BinaryOperator::Add, b.var("x"), b.int(1));
        let evaluated = repl.eval(&sum).unwrap();
        assert_eq!(evaluated.ty, RealizedType::INT);
        assert_eq!(evaluated.value.ready(), Some(&Value::Int(21)));
    }

    #[test]
    fn assignments_are_kept() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut repl = ReplContext::new(&registry);

        let decl = b.declaration(Binding::Name(b.str("count")), false, None, b.int(1));
        repl.declare(&decl).unwrap();
        let bump = b.assign(
            b.var("count"),
            b.binary(BinaryOperator::Mul, b.var("count"), b.int(5)),
        );
        repl.eval(&bump).unwrap();
        repl.eval(&bump).unwrap();
        assert_eq!(repl.value_of("count"), Some(&Value::Int(25)));
    }

    #[test]
    fn redeclaration_replaces_the_variable() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut repl = ReplContext::new(&registry);

        repl.declare(&b.declaration(Binding::Name(b.str("x")), false, None, b.int(3)))
            .unwrap();
        repl.declare(&b.declaration(Binding::Name(b.str("x")), true, None, b.string("three")))
            .unwrap();
        assert_eq!(repl.type_of("x"), Some(&RealizedType::STRING));
        assert_eq!(repl.value_of("x"), Some(&Value::string("three")));

        let assign = b.assign(b.var("x"), b.string("four"));
        assert!(repl.eval(&assign).is_err());
    }

    #[test]
    fn suspending_expression_is_deferred() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut repl = ReplContext::new(&registry);

        let wait = b.await_(b.call("wait_ticks", vec![b.int(1)]));
        let evaluated = repl.eval(&wait).unwrap();
        let ReplValue::Deferred(future) = &evaluated.value else {
            panic!("expected a deferred value, got {:?}", evaluated.value);
        };
        assert!(!future.is_completed());
        assert_eq!(future.drive(8).unwrap(), Some(Value::Unit));

        let decl = b.declaration(Binding::Name(b.str("later")), false, None, wait);
        assert!(matches!(repl.declare(&decl), Err(EvalError::NotSupported(_))));
        assert_eq!(repl.type_of("later"), None);
    }

    #[test]
    fn compile_errors_stop_the_evaluation() {
        let registry = TypeRegistry::with_core().unwrap();
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut repl = ReplContext::new(&registry);

        let err = repl.eval(&b.var("missing")).unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NoSuchVariable));

        assert!(repl.import("nowhere").is_err());
        assert!(repl.import(CORE_MODULE).is_ok());
    }
}
