use std::fmt;

use super::RealizedType;

/// Signature of a callable value.
///
/// An `async` function's value type returns `Future<T>`; there is no
/// separate async flag.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    params: Vec<RealizedType>,
    result: RealizedType,
}

impl FunctionType {
    pub fn new(params: Vec<RealizedType>, result: RealizedType) -> Self {
        Self { params, result }
    }

    pub fn params(&self) -> &[RealizedType] {
        &self.params
    }

    pub fn result(&self) -> &RealizedType {
        &self.result
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.result)
    }
}
