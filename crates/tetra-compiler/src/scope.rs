//! Local scope management for function compilation.
//!
//! `LocalScope` tracks the locals of one function body:
//! - declaration with stack slot allocation
//! - nested block scopes, with slots reclaimed when a block ends
//! - shadowing of outer bindings, restored on scope exit
//! - names whose type is being inferred, to catch self-referential initializers

use rustc_hash::FxHashMap;
use tetra_core::{ErrorKind, RealizedType, Span, StructuralError};

/// A local variable binding.
#[derive(Debug, Clone)]
pub struct LocalVar {
    pub name: String,
    pub ty: RealizedType,
    pub slot: u32,
    /// Scope depth where declared.
    pub depth: u32,
    pub is_const: bool,
    pub span: Span,
}

/// Snapshot taken by [`LocalScope::mark`].
#[derive(Debug, Clone)]
pub struct ScopeMark {
    variables: FxHashMap<String, LocalVar>,
    shadowed: Vec<(u32, String, LocalVar)>,
    scope_depth: u32,
    scope_starts: Vec<u32>,
    next_slot: u32,
}

#[derive(Debug, Default)]
pub struct LocalScope {
    /// Visible bindings by name.
    variables: FxHashMap<String, LocalVar>,

    /// Current scope depth (0 = function scope).
    scope_depth: u32,

    /// Bindings hidden by a shadowing declaration, with the depth at which
    /// the shadowing occurred.
    shadowed: Vec<(u32, String, LocalVar)>,

    /// `next_slot` at entry of each open block.
    scope_starts: Vec<u32>,

    next_slot: u32,

    /// Highest slot count ever live (frame size).
    max_slot: u32,

    /// Names whose initializer is being type-checked.
    inferring: Vec<String>,
}

impl LocalScope {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Scope Management
    // ==========================================================================

    pub fn push_scope(&mut self) {
        self.scope_depth += 1;
        self.scope_starts.push(self.next_slot);
    }

    /// Exit the current block, removing its variables and reclaiming their slots.
    pub fn pop_scope(&mut self) {
        if self.scope_depth == 0 {
            return;
        }
        self.variables.retain(|_, var| var.depth < self.scope_depth);

        while let Some((shadowing_depth, _, _)) = self.shadowed.last() {
            if *shadowing_depth != self.scope_depth {
                break;
            }
            if let Some((_, name, var)) = self.shadowed.pop() {
                self.variables.insert(name, var);
            }
        }

        if let Some(start) = self.scope_starts.pop() {
            self.next_slot = start;
        }
        self.scope_depth -= 1;
    }

    pub fn depth(&self) -> u32 {
        self.scope_depth
    }

    // ==========================================================================
    // Declaration
    // ==========================================================================

    /// Declare a local in the innermost block.
    ///
    /// Fails if the name is already bound in that same block; shadowing an
    /// outer binding is allowed.
    pub fn declare(
        &mut self,
        name: &str,
        ty: RealizedType,
        is_const: bool,
        span: Span,
    ) -> Result<u32, StructuralError> {
        if let Some(existing) = self.variables.get(name) {
            if existing.depth == self.scope_depth {
                return Err(Self::duplicate(name, span));
            }
            self.shadowed
                .push((self.scope_depth, name.to_string(), existing.clone()));
        }

        let slot = self.allocate_slot();
        self.variables.insert(
            name.to_string(),
            LocalVar {
                name: name.to_string(),
                ty,
                slot,
                depth: self.scope_depth,
                is_const,
                span,
            },
        );
        Ok(slot)
    }

    /// Declare a parameter at function scope.
    pub fn declare_param(
        &mut self,
        name: &str,
        ty: RealizedType,
        span: Span,
    ) -> Result<u32, StructuralError> {
        if self.variables.contains_key(name) {
            return Err(Self::duplicate(name, span));
        }
        self.declare(name, ty, false, span)
    }

    /// Allocate an unnamed slot for compiler-internal state (loop cursors).
    pub fn declare_hidden(&mut self) -> u32 {
        self.allocate_slot()
    }

    fn duplicate(name: &str, span: Span) -> StructuralError {
        StructuralError::new(
            ErrorKind::DuplicateVariableName,
            format!("Variable '{name}' already declared in this scope"),
            span,
        )
    }

    fn allocate_slot(&mut self) -> u32 {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.max_slot = self.max_slot.max(self.next_slot);
        slot
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn get(&self, name: &str) -> Option<&LocalVar> {
        self.variables.get(name)
    }

    pub fn is_declared_in_current_scope(&self, name: &str) -> bool {
        self.variables
            .get(name)
            .is_some_and(|v| v.depth == self.scope_depth)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalVar> {
        self.variables.values()
    }

    // ==========================================================================
    // Inference guard
    // ==========================================================================

    /// Mark `name` as having its initializer checked.
    pub fn begin_inference(&mut self, name: &str) {
        self.inferring.push(name.to_string());
    }

    pub fn end_inference(&mut self) {
        self.inferring.pop();
    }

    pub fn is_inferring(&self, name: &str) -> bool {
        self.inferring.iter().any(|n| n == name)
    }

    // ==========================================================================
    // Snapshots
    // ==========================================================================

    pub fn mark(&self) -> ScopeMark {
        ScopeMark {
            variables: self.variables.clone(),
            shadowed: self.shadowed.clone(),
            scope_depth: self.scope_depth,
            scope_starts: self.scope_starts.clone(),
            next_slot: self.next_slot,
        }
    }

    /// Undo every declaration made since `mark`.
    pub fn rewind(&mut self, mark: ScopeMark) {
        self.variables = mark.variables;
        self.shadowed = mark.shadowed;
        self.scope_depth = mark.scope_depth;
        self.scope_starts = mark.scope_starts;
        self.next_slot = mark.next_slot;
    }

    /// Stack frame size needed by the function.
    pub fn frame_size(&self) -> u32 {
        self.max_slot
    }
}
