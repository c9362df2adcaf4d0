//! Arena-backed construction of syntax trees.
//!
//! Hosts without a parser (tests, benchmarks, the interactive evaluator's
//! callers) build trees through [`AstBuilder`]. Every node is allocated in
//! the given [`Bump`] and tagged with the builder's current line.

use std::cell::Cell;

use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;
use tetra_core::{BinaryOperator, Span, UnaryOperator};

use super::{
    Binding, Block, Callee, ConstDecl, Expr, FnModifiers, FunctionDecl, Item, Literal,
    LogicalOperator, Module, Parameter, TypeAliasDecl, TypeRef, UseDecl, UseKind,
    VariableDeclaration,
};

pub struct AstBuilder<'a> {
    arena: &'a Bump,
    line: Cell<u32>,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            line: Cell::new(1),
        }
    }

    /// Tag subsequently built nodes with `line`.
    pub fn at_line(&self, line: u32) -> &Self {
        self.line.set(line);
        self
    }

    pub fn span(&self) -> Span {
        Span::point(self.line.get(), 1)
    }

    pub fn alloc<T>(&self, value: T) -> &'a T {
        self.arena.alloc(value)
    }

    pub fn slice<T>(&self, items: Vec<T>) -> &'a [T] {
        self.arena.alloc_slice_fill_iter(items)
    }

    pub fn str(&self, s: &str) -> &'a str {
        self.arena.alloc_str(s)
    }

    // ==========================================================================
    // Literals and names
    // ==========================================================================

    pub fn unit(&self) -> Expr<'a> {
        Expr::Literal(Literal::Unit, self.span())
    }

    pub fn int(&self, value: i64) -> Expr<'a> {
        Expr::Literal(Literal::Int(value), self.span())
    }

    pub fn float(&self, value: f64) -> Expr<'a> {
        Expr::Literal(Literal::Float(value), self.span())
    }

    pub fn bool(&self, value: bool) -> Expr<'a> {
        Expr::Literal(Literal::Bool(value), self.span())
    }

    pub fn string(&self, value: &str) -> Expr<'a> {
        Expr::Literal(Literal::String(self.str(value)), self.span())
    }

    pub fn var(&self, name: &str) -> Expr<'a> {
        Expr::Variable {
            module: None,
            name: self.str(name),
            span: self.span(),
        }
    }

    /// `module::name`
    pub fn qualified(&self, module: &str, name: &str) -> Expr<'a> {
        Expr::Variable {
            module: Some(self.str(module)),
            name: self.str(name),
            span: self.span(),
        }
    }

    // ==========================================================================
    // Operators
    // ==========================================================================

    pub fn unary(&self, op: UnaryOperator, operand: Expr<'a>) -> Expr<'a> {
        Expr::Unary {
            op,
            operand: self.alloc(operand),
            span: self.span(),
        }
    }

    pub fn binary(&self, op: BinaryOperator, left: Expr<'a>, right: Expr<'a>) -> Expr<'a> {
        Expr::Binary {
            op,
            left: self.alloc(left),
            right: self.alloc(right),
            span: self.span(),
        }
    }

    pub fn and(&self, left: Expr<'a>, right: Expr<'a>) -> Expr<'a> {
        self.logical(LogicalOperator::And, left, right)
    }

    pub fn or(&self, left: Expr<'a>, right: Expr<'a>) -> Expr<'a> {
        self.logical(LogicalOperator::Or, left, right)
    }

    fn logical(&self, op: LogicalOperator, left: Expr<'a>, right: Expr<'a>) -> Expr<'a> {
        Expr::Logical {
            op,
            left: self.alloc(left),
            right: self.alloc(right),
            span: self.span(),
        }
    }

    pub fn assign(&self, target: Expr<'a>, value: Expr<'a>) -> Expr<'a> {
        Expr::Assign {
            target: self.alloc(target),
            op: None,
            value: self.alloc(value),
            span: self.span(),
        }
    }

    /// `target op= value`, with `op` one of the compound assignment operators.
    pub fn compound(&self, op: BinaryOperator, target: Expr<'a>, value: Expr<'a>) -> Expr<'a> {
        Expr::Assign {
            target: self.alloc(target),
            op: Some(op),
            value: self.alloc(value),
            span: self.span(),
        }
    }

    // ==========================================================================
    // Calls and members
    // ==========================================================================

    pub fn call(&self, name: &str, args: Vec<Expr<'a>>) -> Expr<'a> {
        Expr::Call {
            callee: Callee::Named {
                module: None,
                name: self.str(name),
            },
            args: self.slice(args),
            span: self.span(),
        }
    }

    /// `module::name(args)`
    pub fn call_in(&self, module: &str, name: &str, args: Vec<Expr<'a>>) -> Expr<'a> {
        Expr::Call {
            callee: Callee::Named {
                module: Some(self.str(module)),
                name: self.str(name),
            },
            args: self.slice(args),
            span: self.span(),
        }
    }

    /// Call whatever function value `callee` evaluates to.
    pub fn call_value(&self, callee: Expr<'a>, args: Vec<Expr<'a>>) -> Expr<'a> {
        Expr::Call {
            callee: Callee::Expr(self.alloc(callee)),
            args: self.slice(args),
            span: self.span(),
        }
    }

    pub fn method(&self, receiver: Expr<'a>, method: &str, args: Vec<Expr<'a>>) -> Expr<'a> {
        Expr::MethodCall {
            receiver: self.alloc(receiver),
            method: self.str(method),
            args: self.slice(args),
            span: self.span(),
        }
    }

    pub fn field(&self, receiver: Expr<'a>, name: &str) -> Expr<'a> {
        Expr::Field {
            receiver: self.alloc(receiver),
            name: self.str(name),
            span: self.span(),
        }
    }

    pub fn index(&self, target: Expr<'a>, index: Expr<'a>) -> Expr<'a> {
        Expr::Index {
            target: self.alloc(target),
            index: self.alloc(index),
            span: self.span(),
        }
    }

    // ==========================================================================
    // Aggregates
    // ==========================================================================

    pub fn array(&self, elements: Vec<Expr<'a>>) -> Expr<'a> {
        Expr::Array(self.slice(elements), self.span())
    }

    pub fn record(&self, fields: Vec<(&str, Expr<'a>)>) -> Expr<'a> {
        let fields = fields
            .into_iter()
            .map(|(name, value)| (self.str(name), value))
            .collect();
        Expr::Record(self.slice(fields), self.span())
    }

    /// `from..to`
    pub fn range(&self, from: Expr<'a>, to: Expr<'a>) -> Expr<'a> {
        self.make_range(from, to, false)
    }

    /// `from...to`
    pub fn range_inclusive(&self, from: Expr<'a>, to: Expr<'a>) -> Expr<'a> {
        self.make_range(from, to, true)
    }

    fn make_range(&self, from: Expr<'a>, to: Expr<'a>, inclusive: bool) -> Expr<'a> {
        Expr::Range {
            from: self.alloc(from),
            to: self.alloc(to),
            inclusive,
            span: self.span(),
        }
    }

    // ==========================================================================
    // Blocks and control flow
    // ==========================================================================

    pub fn block(&self, statements: Vec<Expr<'a>>, result: Option<Expr<'a>>) -> &'a Block<'a> {
        self.alloc(Block {
            statements: self.slice(statements),
            result: result.map(|r| self.alloc(r)),
            span: self.span(),
        })
    }

    pub fn block_expr(&self, statements: Vec<Expr<'a>>, result: Option<Expr<'a>>) -> Expr<'a> {
        Expr::Block(self.block(statements, result))
    }

    /// Start a block whose statements are pushed one at a time.
    pub fn block_builder(&self) -> BlockBuilder<'a> {
        BlockBuilder {
            statements: BumpVec::new_in(self.arena),
            arena: self.arena,
            span: self.span(),
        }
    }

    pub fn if_(
        &self,
        condition: Expr<'a>,
        then_branch: &'a Block<'a>,
        else_branch: Option<Expr<'a>>,
    ) -> Expr<'a> {
        Expr::If {
            condition: self.alloc(condition),
            then_branch,
            else_branch: else_branch.map(|e| self.alloc(e)),
            span: self.span(),
        }
    }

    pub fn while_(&self, condition: Expr<'a>, body: &'a Block<'a>) -> Expr<'a> {
        Expr::While {
            condition: self.alloc(condition),
            body,
            span: self.span(),
        }
    }

    pub fn for_in(&self, variable: &str, source: Expr<'a>, body: &'a Block<'a>) -> Expr<'a> {
        Expr::ForIn {
            variable: self.str(variable),
            source: self.alloc(source),
            body,
            span: self.span(),
        }
    }

    pub fn let_(&self, name: &str, ty: Option<TypeRef<'a>>, value: Expr<'a>) -> Expr<'a> {
        self.declare(Binding::Name(self.str(name)), false, ty, value)
    }

    pub fn const_(&self, name: &str, ty: Option<TypeRef<'a>>, value: Expr<'a>) -> Expr<'a> {
        self.declare(Binding::Name(self.str(name)), true, ty, value)
    }

    /// `let _ = value`
    pub fn discard(&self, value: Expr<'a>) -> Expr<'a> {
        self.declare(Binding::Placeholder, false, None, value)
    }

    fn declare(
        &self,
        binding: Binding<'a>,
        is_const: bool,
        ty: Option<TypeRef<'a>>,
        value: Expr<'a>,
    ) -> Expr<'a> {
        Expr::VarDecl(self.alloc(self.declaration(binding, is_const, ty, value)))
    }

    /// A bare declaration, as handed to the interactive evaluator.
    pub fn declaration(
        &self,
        binding: Binding<'a>,
        is_const: bool,
        ty: Option<TypeRef<'a>>,
        value: Expr<'a>,
    ) -> VariableDeclaration<'a> {
        VariableDeclaration {
            binding,
            is_const,
            ty: ty.map(|t| self.alloc(t)),
            value: self.alloc(value),
            span: self.span(),
        }
    }

    pub fn ret(&self, value: Option<Expr<'a>>) -> Expr<'a> {
        Expr::Return(value.map(|v| self.alloc(v)), self.span())
    }

    pub fn break_(&self) -> Expr<'a> {
        Expr::Break(self.span())
    }

    pub fn continue_(&self) -> Expr<'a> {
        Expr::Continue(self.span())
    }

    pub fn await_(&self, future: Expr<'a>) -> Expr<'a> {
        Expr::Await(self.alloc(future), self.span())
    }

    pub fn yield_(&self) -> Expr<'a> {
        Expr::Yield(self.span())
    }

    // ==========================================================================
    // Type references
    // ==========================================================================

    pub fn ty(&self, name: &str) -> TypeRef<'a> {
        self.ty_args(name, Vec::new())
    }

    pub fn ty_args(&self, name: &str, args: Vec<TypeRef<'a>>) -> TypeRef<'a> {
        TypeRef::Named {
            module: None,
            name: self.str(name),
            args: self.slice(args),
            span: self.span(),
        }
    }

    pub fn ty_in(&self, module: &str, name: &str, args: Vec<TypeRef<'a>>) -> TypeRef<'a> {
        TypeRef::Named {
            module: Some(self.str(module)),
            name: self.str(name),
            args: self.slice(args),
            span: self.span(),
        }
    }

    pub fn array_ty(&self, element: TypeRef<'a>) -> TypeRef<'a> {
        TypeRef::Array(self.alloc(element), self.span())
    }

    pub fn fn_ty(&self, params: Vec<TypeRef<'a>>, result: TypeRef<'a>) -> TypeRef<'a> {
        TypeRef::Function {
            params: self.slice(params),
            result: self.alloc(result),
            span: self.span(),
        }
    }

    pub fn record_ty(&self, fields: Vec<(&str, TypeRef<'a>)>) -> TypeRef<'a> {
        let fields = fields
            .into_iter()
            .map(|(name, ty)| (self.str(name), ty))
            .collect();
        TypeRef::Record(self.slice(fields), self.span())
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    pub fn param(&self, name: &str, ty: TypeRef<'a>) -> Parameter<'a> {
        Parameter {
            name: self.str(name),
            ty,
            default: None,
            span: self.span(),
        }
    }

    pub fn param_default(&self, name: &str, ty: TypeRef<'a>, default: Expr<'a>) -> Parameter<'a> {
        Parameter {
            default: Some(self.alloc(default)),
            ..self.param(name, ty)
        }
    }

    /// A private synchronous function.
    pub fn function(
        &self,
        name: &str,
        params: Vec<Parameter<'a>>,
        return_type: Option<TypeRef<'a>>,
        body: &'a Block<'a>,
    ) -> FunctionDecl<'a> {
        FunctionDecl {
            name: self.str(name),
            description: None,
            modifiers: FnModifiers::empty(),
            is_async: false,
            params: self.slice(params),
            return_type,
            body,
            span: self.span(),
        }
    }

    pub fn async_function(
        &self,
        name: &str,
        params: Vec<Parameter<'a>>,
        return_type: Option<TypeRef<'a>>,
        body: &'a Block<'a>,
    ) -> FunctionDecl<'a> {
        FunctionDecl {
            is_async: true,
            ..self.function(name, params, return_type, body)
        }
    }

    pub fn use_names(&self, module: &str, names: &[&str]) -> Item<'a> {
        let names = names.iter().map(|n| self.str(n)).collect();
        self.use_decl(module, UseKind::Names(self.slice(names)))
    }

    pub fn use_glob(&self, module: &str) -> Item<'a> {
        self.use_decl(module, UseKind::Glob)
    }

    pub fn use_alias(&self, module: &str, alias: &str) -> Item<'a> {
        self.use_decl(module, UseKind::Alias(self.str(alias)))
    }

    fn use_decl(&self, module: &str, kind: UseKind<'a>) -> Item<'a> {
        Item::Use(UseDecl {
            module: self.str(module),
            kind,
            span: self.span(),
        })
    }

    pub fn type_alias(&self, name: &str, target: TypeRef<'a>) -> Item<'a> {
        Item::TypeAlias(TypeAliasDecl {
            name: self.str(name),
            target,
            span: self.span(),
        })
    }

    pub fn const_decl(&self, name: &str, ty: Option<TypeRef<'a>>, value: Expr<'a>) -> Item<'a> {
        Item::Const(ConstDecl {
            name: self.str(name),
            ty,
            value: self.alloc(value),
            span: self.span(),
        })
    }

    pub fn module(&self, name: &str, items: Vec<Item<'a>>) -> Module<'a> {
        Module {
            name: self.str(name),
            description: None,
            items: self.slice(items),
        }
    }
}

/// Incrementally collects the statements of one block.
pub struct BlockBuilder<'a> {
    statements: BumpVec<'a, Expr<'a>>,
    arena: &'a Bump,
    span: Span,
}

impl<'a> BlockBuilder<'a> {
    pub fn push(&mut self, statement: Expr<'a>) -> &mut Self {
        self.statements.push(statement);
        self
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn finish(self, result: Option<Expr<'a>>) -> &'a Block<'a> {
        let arena = self.arena;
        arena.alloc(Block {
            statements: self.statements.into_bump_slice(),
            result: result.map(|r| -> &'a Expr<'a> { arena.alloc(r) }),
            span: self.span,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_carry_the_current_line() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let first = b.int(1);
        b.at_line(7);
        let second = b.var("x");
        assert_eq!(first.span().start.line, 1);
        assert_eq!(second.span().start.line, 7);
    }

    #[test]
    fn block_builder_collects_statements() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut block = b.block_builder();
        block.push(b.let_("x", None, b.int(1)));
        block.push(b.let_("y", None, b.int(2)));
        let block = block.finish(Some(b.var("y")));
        assert_eq!(block.statements.len(), 2);
        assert!(block.result.is_some());
    }

    #[test]
    fn suspension_is_detected_through_nesting() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let body = b.block(vec![b.yield_()], None);
        let looped = b.while_(b.bool(true), body);
        assert!(looped.suspends());
        assert!(!b.binary(BinaryOperator::Add, b.int(1), b.int(2)).suspends());
    }
}
