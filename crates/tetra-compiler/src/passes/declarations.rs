//! Type declaration, type import and constant import.

use tetra_core::{ErrorKind, RealizedType, Span, StructuralError};

use super::{ModuleCompiler, PendingConstant};
use crate::ast::{Expr, Item, UseKind, builtin_named};
use crate::bytecode::ConstantPool;
use crate::context::BlockContext;

impl<'a> ModuleCompiler<'a> {
    /// Pass 1: collect type alias names.
    pub fn declare_types(&mut self) {
        for item in self.ast.items {
            let Item::TypeAlias(alias) = item else {
                continue;
            };
            if builtin_named(alias.name).is_some()
                || self.aliases.iter().any(|a| a.name == alias.name)
            {
                self.report(StructuralError::new(
                    ErrorKind::DuplicateDeclaration,
                    format!("Type '{}' is already declared", alias.name),
                    alias.span,
                ));
                continue;
            }
            self.aliases.push(alias);
        }
        self.pass_done("type declaration");
    }

    /// Pass 2: bring registry types into scope, then resolve aliases.
    pub fn import_types(&mut self) {
        for decl in self.uses() {
            let Some(module) = self.ctx.registry().module(decl.module) else {
                self.report(StructuralError::new(
                    ErrorKind::InvalidImport,
                    format!("Unknown module '{}'", decl.module),
                    decl.span,
                ));
                continue;
            };
            match decl.kind {
                UseKind::Alias(alias) => {
                    if !self.ctx.add_module_alias(alias, decl.module) {
                        self.report(StructuralError::new(
                            ErrorKind::DuplicateDeclaration,
                            format!("Module alias '{alias}' is already declared"),
                            decl.span,
                        ));
                    }
                }
                UseKind::Glob => {
                    for (name, ty) in module.types() {
                        self.import_type(name, ty.clone(), decl.span);
                    }
                }
                UseKind::Names(names) => {
                    for name in names {
                        if let Some(ty) = module.find_type(name) {
                            self.import_type(name, ty.clone(), decl.span);
                        } else if module.find_function(name).is_none()
                            && module.find_constant(name).is_none()
                        {
                            self.report(StructuralError::new(
                                ErrorKind::InvalidImport,
                                format!("Module '{}' has no member '{name}'", decl.module),
                                decl.span,
                            ));
                        }
                    }
                }
            }
        }
        self.resolve_aliases();
        self.pass_done("type import");
    }

    fn import_type(&mut self, name: &str, ty: RealizedType, span: Span) {
        let taken = self.aliases.iter().any(|a| a.name == name);
        if taken || !self.ctx.declare_type(name, ty) {
            self.report(StructuralError::new(
                ErrorKind::DuplicateDeclaration,
                format!("Type '{name}' is already declared"),
                span,
            ));
        }
    }

    /// Aliases may refer to each other in any order: resolve repeatedly
    /// until nothing changes. Whatever is left is unknown or cyclic.
    fn resolve_aliases(&mut self) {
        let mut pending = std::mem::take(&mut self.aliases);
        loop {
            let before = pending.len();
            pending.retain(|alias| match alias.target.resolve(&self.ctx) {
                Ok(ty) => {
                    self.ctx.define_type(alias.name, ty);
                    false
                }
                Err(_) => true,
            });
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }
        for alias in pending {
            let error = match alias.target.resolve(&self.ctx) {
                Err(error) => error,
                Ok(_) => continue,
            };
            self.report(StructuralError::new(
                ErrorKind::InvalidType,
                format!("Cannot resolve type alias '{}': {}", alias.name, error.message),
                alias.span,
            ));
        }
    }

    /// Pass 3: registry constants named by `use`, then module `const`s in
    /// declaration order.
    pub fn import_constants(&mut self) {
        for decl in self.uses() {
            let Some(module) = self.ctx.registry().module(decl.module) else {
                continue;
            };
            let names: Vec<&str> = match decl.kind {
                UseKind::Alias(_) => continue,
                UseKind::Glob => module.constants().map(|(name, _)| name).collect(),
                UseKind::Names(names) => names
                    .iter()
                    .copied()
                    .filter(|n| module.find_constant(n).is_some())
                    .collect(),
            };
            for name in names {
                let Some(constant) = module.find_constant(name) else {
                    continue;
                };
                if !self.ctx.import_constant(name, constant.clone()) {
                    self.report(StructuralError::new(
                        ErrorKind::DuplicateDeclaration,
                        format!("'{name}' is already declared"),
                        decl.span,
                    ));
                }
            }
        }

        for item in self.ast.items {
            let Item::Const(decl) = item else {
                continue;
            };
            let ty = match &decl.ty {
                Some(ty) => ty.resolve(&self.ctx).unwrap_or_else(|error| {
                    self.diagnostics.push(error);
                    RealizedType::Undefined
                }),
                None => self.infer_constant_type(decl.value),
            };
            match self.ctx.declare_constant(decl.name, ty.clone()) {
                Some(slot) => self.constants.push(PendingConstant { decl, slot, ty }),
                None => self.report(StructuralError::new(
                    ErrorKind::DuplicateDeclaration,
                    format!("'{}' is already declared", decl.name),
                    decl.span,
                )),
            }
        }
        self.pass_done("constant import");
    }

    /// Type of an initializer against the constants declared so far.
    fn infer_constant_type(&self, value: &'a Expr<'a>) -> RealizedType {
        let mut scratch = ConstantPool::new();
        let mut ctx = BlockContext::new(&self.ctx, &mut scratch, RealizedType::Undefined, false);
        value.result_type(&mut ctx)
    }
}
