//! Module-level declarations.

use bitflags::bitflags;
use tetra_core::Span;

use super::{Block, Expr, TypeRef};

bitflags! {
    /// Function modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FnModifiers: u8 {
        /// Visible to the host and other modules.
        const PUB = 0x01;
        /// Collected as a script test.
        const TEST = 0x02;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Parameter<'a> {
    pub name: &'a str,
    pub ty: TypeRef<'a>,
    /// Evaluated at the call site when the argument is omitted.
    pub default: Option<&'a Expr<'a>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionDecl<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub modifiers: FnModifiers,
    pub is_async: bool,
    pub params: &'a [Parameter<'a>],
    /// `None` declares a function returning no value.
    pub return_type: Option<TypeRef<'a>>,
    pub body: &'a Block<'a>,
    pub span: Span,
}

/// `type Name = target`
#[derive(Debug, Clone, Copy)]
pub struct TypeAliasDecl<'a> {
    pub name: &'a str,
    pub target: TypeRef<'a>,
    pub span: Span,
}

/// `const NAME: ty = value` at module level.
#[derive(Debug, Clone, Copy)]
pub struct ConstDecl<'a> {
    pub name: &'a str,
    pub ty: Option<TypeRef<'a>>,
    pub value: &'a Expr<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind<'a> {
    /// `use m::*`
    Glob,
    /// `use m::{a, b}`
    Names(&'a [&'a str]),
    /// `use m as alias`
    Alias(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub struct UseDecl<'a> {
    pub module: &'a str,
    pub kind: UseKind<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum Item<'a> {
    Use(UseDecl<'a>),
    TypeAlias(TypeAliasDecl<'a>),
    Const(ConstDecl<'a>),
    Function(FunctionDecl<'a>),
}

impl Item<'_> {
    pub fn span(&self) -> Span {
        match self {
            Item::Use(u) => u.span,
            Item::TypeAlias(t) => t.span,
            Item::Const(c) => c.span,
            Item::Function(f) => f.span,
        }
    }
}

/// A parsed script module.
#[derive(Debug, Clone, Copy)]
pub struct Module<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub items: &'a [Item<'a>],
}
