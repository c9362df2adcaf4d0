//! Builtin primitive types and the catalog holding their member tables.

use crate::members::TypeTables;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Unit,
    Bool,
    Int,
    Float,
    String,
}

impl BuiltinType {
    pub const ALL: [BuiltinType; 5] = [
        BuiltinType::Unit,
        BuiltinType::Bool,
        BuiltinType::Int,
        BuiltinType::Float,
        BuiltinType::String,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinType::Unit => "unit",
            BuiltinType::Bool => "bool",
            BuiltinType::Int => "int",
            BuiltinType::Float => "float",
            BuiltinType::String => "string",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        BuiltinType::ALL.into_iter().find(|b| b.name() == name)
    }
}

/// Which builtin table a catalog lookup targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogEntry {
    Builtin(BuiltinType),
    /// Shared by every `T[]`; suppliers are filled with `T`.
    Array,
    Range,
}

/// Operator and member tables for the builtin types.
///
/// An explicit value: the registry constructs it at startup and every
/// compilation context borrows it.
#[derive(Debug)]
pub struct BuiltinCatalog {
    unit: TypeTables,
    bool: TypeTables,
    int: TypeTables,
    float: TypeTables,
    string: TypeTables,
    array: TypeTables,
    range: TypeTables,
}

impl BuiltinCatalog {
    /// A catalog with every table empty.
    pub fn empty() -> Self {
        Self {
            unit: TypeTables::new("unit"),
            bool: TypeTables::new("bool"),
            int: TypeTables::new("int"),
            float: TypeTables::new("float"),
            string: TypeTables::new("string"),
            array: TypeTables::new("T[]"),
            range: TypeTables::new("core::Range"),
        }
    }

    pub fn entry(&self, entry: CatalogEntry) -> &TypeTables {
        match entry {
            CatalogEntry::Builtin(BuiltinType::Unit) => &self.unit,
            CatalogEntry::Builtin(BuiltinType::Bool) => &self.bool,
            CatalogEntry::Builtin(BuiltinType::Int) => &self.int,
            CatalogEntry::Builtin(BuiltinType::Float) => &self.float,
            CatalogEntry::Builtin(BuiltinType::String) => &self.string,
            CatalogEntry::Array => &self.array,
            CatalogEntry::Range => &self.range,
        }
    }

    pub fn entry_mut(&mut self, entry: CatalogEntry) -> &mut TypeTables {
        match entry {
            CatalogEntry::Builtin(BuiltinType::Unit) => &mut self.unit,
            CatalogEntry::Builtin(BuiltinType::Bool) => &mut self.bool,
            CatalogEntry::Builtin(BuiltinType::Int) => &mut self.int,
            CatalogEntry::Builtin(BuiltinType::Float) => &mut self.float,
            CatalogEntry::Builtin(BuiltinType::String) => &mut self.string,
            CatalogEntry::Array => &mut self.array,
            CatalogEntry::Range => &mut self.range,
        }
    }
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::empty()
    }
}
