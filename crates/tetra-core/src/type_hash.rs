//! Deterministic hash-based identity for functions and native routines.
//!
//! [`TypeHash`] is computed from module-qualified names, so a call site can
//! reference a function before the function's code has been emitted and the
//! VM can look it up with a single map probe.
//!
//! ```
//! use tetra_core::TypeHash;
//!
//! let a = TypeHash::from_function("game", "update");
//! let b = TypeHash::from_function("game", "update");
//! assert_eq!(a, b);
//! assert_ne!(a, TypeHash::from_native("game", "update"));
//! ```

use std::fmt;

use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants.
///
/// Different entity kinds hash to different values even when they share a name.
pub mod hash_constants {
    /// Separator for path components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;
    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;
    /// Domain marker for script function hashes.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;
    /// Domain marker for native routines (host functions, bound methods and operators).
    pub const NATIVE: u64 = 0x7d3c8b4a92e15f6d;
    /// Domain marker for compiled snippet entry points.
    pub const SNIPPET: u64 = 0x3e9f5d2a8c7b1403;
}

/// A deterministic 64-bit identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash of a qualified type name such as `core::Range`.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a script function declared in `module`.
    #[inline]
    pub fn from_function(module: &str, name: &str) -> Self {
        TypeHash(Self::path(hash_constants::FUNCTION, module, name))
    }

    /// Hash of a host routine registered under `owner` (a module or a bound type).
    #[inline]
    pub fn from_native(owner: &str, name: &str) -> Self {
        TypeHash(Self::path(hash_constants::NATIVE, owner, name))
    }

    /// Hash of the `index`th interactive snippet.
    #[inline]
    pub fn from_snippet(index: u64) -> Self {
        TypeHash(hash_constants::SNIPPET.wrapping_mul(hash_constants::SEP) ^ index)
    }

    #[inline]
    fn path(domain: u64, owner: &str, name: &str) -> u64 {
        let owner_hash = xxh64(owner.as_bytes(), 0);
        let name_hash = xxh64(name.as_bytes(), 0);
        (domain ^ owner_hash)
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(name_hash)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_qualifies_function_hash() {
        assert_ne!(
            TypeHash::from_function("a", "main"),
            TypeHash::from_function("b", "main")
        );
    }

    #[test]
    fn owner_and_name_do_not_commute() {
        assert_ne!(
            TypeHash::from_native("core", "len"),
            TypeHash::from_native("len", "core")
        );
    }

    #[test]
    fn snippets_are_distinct() {
        assert_ne!(TypeHash::from_snippet(0), TypeHash::from_snippet(1));
        assert!(!TypeHash::from_snippet(0).is_empty());
    }
}
