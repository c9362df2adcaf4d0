//! The syntax tree consumed by the compiler.
//!
//! Nodes borrow from an arena (`'a`) and are produced by an external parser
//! or by [`AstBuilder`]. The compiler relies only on each node's span and on
//! the result-type and emission operations implemented in [`crate::expr`].

mod builder;
mod decl;
mod expr;
mod type_ref;

pub use builder::{AstBuilder, BlockBuilder};
pub use decl::{
    ConstDecl, FnModifiers, FunctionDecl, Item, Module, Parameter, TypeAliasDecl, UseDecl, UseKind,
};
pub use expr::{Binding, Block, Callee, Expr, Literal, LogicalOperator, VariableDeclaration};
pub use type_ref::TypeRef;
pub(crate) use type_ref::builtin_named;
