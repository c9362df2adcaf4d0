//! Operator kinds used as keys of per-type operator tables.
//!
//! Compound assignments (`+=`, `-=`, ...) are separate [`BinaryOperator`]
//! variants so a type can register them independently of their base
//! operator. Short-circuit `&&`/`||` never reach an operator table; the
//! compiler lowers them to jumps.

use std::fmt;

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `~x`
    BitNot,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Neg => "-",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
        }
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // === Arithmetic ===
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `**`
    Pow,

    // === Bitwise ===
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,

    // === Comparison ===
    Eq,
    /// Always derived from [`BinaryOperator::Eq`] by negating its result.
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    // === Compound assignment ===
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    PowAssign,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Pow => "**",
            BinaryOperator::BitAnd => "&",
            BinaryOperator::BitOr => "|",
            BinaryOperator::BitXor => "^",
            BinaryOperator::Shl => "<<",
            BinaryOperator::Shr => ">>",
            BinaryOperator::Eq => "==",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::AddAssign => "+=",
            BinaryOperator::SubAssign => "-=",
            BinaryOperator::MulAssign => "*=",
            BinaryOperator::DivAssign => "/=",
            BinaryOperator::ModAssign => "%=",
            BinaryOperator::PowAssign => "**=",
        }
    }

    /// Whether this is a compound assignment (`+=` and friends).
    pub fn is_assign(self) -> bool {
        self.assign_base().is_some()
    }

    /// The non-assigning operator a compound assignment falls back to.
    pub fn assign_base(self) -> Option<BinaryOperator> {
        match self {
            BinaryOperator::AddAssign => Some(BinaryOperator::Add),
            BinaryOperator::SubAssign => Some(BinaryOperator::Sub),
            BinaryOperator::MulAssign => Some(BinaryOperator::Mul),
            BinaryOperator::DivAssign => Some(BinaryOperator::Div),
            BinaryOperator::ModAssign => Some(BinaryOperator::Mod),
            BinaryOperator::PowAssign => Some(BinaryOperator::Pow),
            _ => None,
        }
    }

    /// Whether the operator yields a boolean comparison result.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Lt
                | BinaryOperator::Le
                | BinaryOperator::Gt
                | BinaryOperator::Ge
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compound_assign_has_base() {
        assert_eq!(
            BinaryOperator::AddAssign.assign_base(),
            Some(BinaryOperator::Add)
        );
        assert!(BinaryOperator::MulAssign.is_assign());
        assert!(!BinaryOperator::Mul.is_assign());
    }

    #[test]
    fn comparisons() {
        assert!(BinaryOperator::NotEq.is_comparison());
        assert!(!BinaryOperator::Pow.is_comparison());
        assert_eq!(BinaryOperator::PowAssign.to_string(), "**=");
    }
}
