//! Literals, routines and function identities referenced by bytecode.

use std::sync::Arc;

use ordered_float::OrderedFloat;
use rustc_hash::FxHashMap;
use tetra_core::{NativeFn, TypeHash};

/// One pool entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    String(Arc<str>),
    /// A script function of the module, by hash.
    Function { hash: TypeHash, name: Arc<str> },
    /// A host routine.
    Native(NativeFn),
}

/// Hashable form of [`Constant`] used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Int(i64),
    Float(OrderedFloat<f64>),
    String(Arc<str>),
    Function(TypeHash),
    Native(TypeHash),
}

impl From<&Constant> for ConstantKey {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::Int(v) => ConstantKey::Int(*v),
            Constant::Float(v) => ConstantKey::Float(OrderedFloat(*v)),
            Constant::String(s) => ConstantKey::String(Arc::clone(s)),
            Constant::Function { hash, .. } => ConstantKey::Function(*hash),
            Constant::Native(native) => ConstantKey::Native(native.id),
        }
    }
}

/// Shared by every function of a module; equal constants get one slot.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<ConstantKey, u32>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or find an identical constant and return its index.
    pub fn add(&mut self, constant: Constant) -> u32 {
        let key = ConstantKey::from(&constant);
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.constants.len() as u32;
        self.constants.push(constant);
        self.index.insert(key, idx);
        idx
    }

    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}
