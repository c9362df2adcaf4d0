//! Expression and statement nodes.
//!
//! Statements are expressions whose value is discarded; a block yields its
//! optional trailing expression.

use tetra_core::{BinaryOperator, Span, UnaryOperator};

use super::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

/// What a call expression invokes.
#[derive(Debug, Clone, Copy)]
pub enum Callee<'a> {
    /// A function by name, optionally qualified with a module.
    Named {
        module: Option<&'a str>,
        name: &'a str,
    },
    /// Any expression producing a function value.
    Expr(&'a Expr<'a>),
}

/// `{ statements; result }`
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    pub statements: &'a [Expr<'a>],
    pub result: Option<&'a Expr<'a>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding<'a> {
    Name(&'a str),
    /// `_`: evaluate and discard.
    Placeholder,
}

/// `let name: ty = value` or `const name = value`.
#[derive(Debug, Clone, Copy)]
pub struct VariableDeclaration<'a> {
    pub binding: Binding<'a>,
    pub is_const: bool,
    pub ty: Option<&'a TypeRef<'a>>,
    pub value: &'a Expr<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum Expr<'a> {
    Literal(Literal<'a>, Span),
    Variable {
        module: Option<&'a str>,
        name: &'a str,
        span: Span,
    },
    Unary {
        op: UnaryOperator,
        operand: &'a Expr<'a>,
        span: Span,
    },
    Binary {
        op: BinaryOperator,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        span: Span,
    },
    Logical {
        op: LogicalOperator,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        span: Span,
    },
    /// `target = value`, or `target op= value` when `op` is a compound operator.
    Assign {
        target: &'a Expr<'a>,
        op: Option<BinaryOperator>,
        value: &'a Expr<'a>,
        span: Span,
    },
    Call {
        callee: Callee<'a>,
        args: &'a [Expr<'a>],
        span: Span,
    },
    MethodCall {
        receiver: &'a Expr<'a>,
        method: &'a str,
        args: &'a [Expr<'a>],
        span: Span,
    },
    Field {
        receiver: &'a Expr<'a>,
        name: &'a str,
        span: Span,
    },
    Index {
        target: &'a Expr<'a>,
        index: &'a Expr<'a>,
        span: Span,
    },
    Array(&'a [Expr<'a>], Span),
    Record(&'a [(&'a str, Expr<'a>)], Span),
    Range {
        from: &'a Expr<'a>,
        to: &'a Expr<'a>,
        inclusive: bool,
        span: Span,
    },
    Block(&'a Block<'a>),
    If {
        condition: &'a Expr<'a>,
        then_branch: &'a Block<'a>,
        else_branch: Option<&'a Expr<'a>>,
        span: Span,
    },
    While {
        condition: &'a Expr<'a>,
        body: &'a Block<'a>,
        span: Span,
    },
    ForIn {
        variable: &'a str,
        source: &'a Expr<'a>,
        body: &'a Block<'a>,
        span: Span,
    },
    VarDecl(&'a VariableDeclaration<'a>),
    Return(Option<&'a Expr<'a>>, Span),
    Break(Span),
    Continue(Span),
    Await(&'a Expr<'a>, Span),
    Yield(Span),
}

impl<'a> Expr<'a> {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(_, span)
            | Expr::Array(_, span)
            | Expr::Record(_, span)
            | Expr::Return(_, span)
            | Expr::Break(span)
            | Expr::Continue(span)
            | Expr::Await(_, span)
            | Expr::Yield(span)
            | Expr::Variable { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Logical { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Call { span, .. }
            | Expr::MethodCall { span, .. }
            | Expr::Field { span, .. }
            | Expr::Index { span, .. }
            | Expr::Range { span, .. }
            | Expr::If { span, .. }
            | Expr::While { span, .. }
            | Expr::ForIn { span, .. } => *span,
            Expr::Block(block) => block.span,
            Expr::VarDecl(decl) => decl.span,
        }
    }

    /// Whether control never falls through this node.
    pub fn diverges(&self) -> bool {
        matches!(self, Expr::Return(..) | Expr::Break(_) | Expr::Continue(_))
    }

    /// Whether the node contains a suspension point outside nested functions.
    pub fn suspends(&self) -> bool {
        match self {
            Expr::Await(..) | Expr::Yield(_) => true,
            Expr::Literal(..)
            | Expr::Variable { .. }
            | Expr::Break(_)
            | Expr::Continue(_) => false,
            Expr::Unary { operand, .. } => operand.suspends(),
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                left.suspends() || right.suspends()
            }
            Expr::Assign { target, value, .. } => target.suspends() || value.suspends(),
            Expr::Call { callee, args, .. } => {
                matches!(callee, Callee::Expr(e) if e.suspends())
                    || args.iter().any(Expr::suspends)
            }
            Expr::MethodCall { receiver, args, .. } => {
                receiver.suspends() || args.iter().any(Expr::suspends)
            }
            Expr::Field { receiver, .. } => receiver.suspends(),
            Expr::Index { target, index, .. } => target.suspends() || index.suspends(),
            Expr::Array(elements, _) => elements.iter().any(Expr::suspends),
            Expr::Record(fields, _) => fields.iter().any(|(_, e)| e.suspends()),
            Expr::Range { from, to, .. } => from.suspends() || to.suspends(),
            Expr::Block(block) => block.suspends(),
            Expr::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                condition.suspends()
                    || then_branch.suspends()
                    || else_branch.is_some_and(|e| e.suspends())
            }
            Expr::While {
                condition, body, ..
            } => condition.suspends() || body.suspends(),
            Expr::ForIn { source, body, .. } => source.suspends() || body.suspends(),
            Expr::VarDecl(decl) => decl.value.suspends(),
            Expr::Return(value, _) => value.is_some_and(|e| e.suspends()),
        }
    }
}

impl<'a> Block<'a> {
    pub fn suspends(&self) -> bool {
        self.statements.iter().any(Expr::suspends) || self.result.is_some_and(|e| e.suspends())
    }
}
