//! Function signature verification and function import.

use tetra_core::{ErrorKind, RealizedType, StructuralError, TypeHash};

use super::{ModuleCompiler, PendingFunction};
use crate::ast::{FunctionDecl, Item, TypeRef, UseKind};
use crate::context::{ModuleContext, ScriptFunction};
use crate::function_compiler::verify_signature;

impl<'a> ModuleCompiler<'a> {
    /// Pass 4: resolve every function signature.
    ///
    /// A function whose signature fails keeps a best-effort signature so
    /// its callers are still checked, but it is never emitted.
    pub fn verify_signatures(&mut self) {
        for item in self.ast.items {
            let Item::Function(decl) = item else {
                continue;
            };
            let pending = match verify_signature(&self.ctx, decl) {
                Ok(signature) => PendingFunction {
                    decl,
                    signature,
                    verified: true,
                },
                Err(diagnostics) => {
                    self.diagnostics.extend(diagnostics);
                    PendingFunction {
                        decl,
                        signature: fallback_signature(&self.ctx, decl),
                        verified: false,
                    }
                }
            };
            self.functions.push(pending);
        }
        self.pass_done("signature verification");
    }

    /// Pass 5: make script functions and imported registry routines callable.
    pub fn import_functions(&mut self) {
        for pending in &mut self.functions {
            if !self.ctx.add_function(pending.signature.clone()) {
                self.diagnostics.push(StructuralError::new(
                    ErrorKind::DuplicateDeclaration,
                    format!("'{}' is already declared", pending.decl.name),
                    pending.decl.span,
                ));
                pending.verified = false;
            }
        }

        for decl in self.uses() {
            let Some(module) = self.ctx.registry().module(decl.module) else {
                continue;
            };
            let functions: Vec<_> = match decl.kind {
                UseKind::Alias(_) => continue,
                UseKind::Glob => module.functions().collect(),
                UseKind::Names(names) => names
                    .iter()
                    .filter_map(|name| module.find_function(name).map(|f| (*name, f)))
                    .collect(),
            };
            for (name, function) in functions {
                if !self.ctx.import_native(name, function.clone()) {
                    self.report(StructuralError::new(
                        ErrorKind::DuplicateDeclaration,
                        format!("'{name}' is already declared"),
                        decl.span,
                    ));
                }
            }
        }
        self.pass_done("function import");
    }
}

fn fallback_signature<'a>(ctx: &ModuleContext<'a>, decl: &'a FunctionDecl<'a>) -> ScriptFunction<'a> {
    let resolve_or_undefined = |ty: &TypeRef<'_>| ty.resolve(ctx).unwrap_or(RealizedType::Undefined);
    ScriptFunction {
        name: decl.name.to_string(),
        hash: TypeHash::from_function(ctx.name(), decl.name),
        params: decl
            .params
            .iter()
            .map(|p| (p.name.to_string(), resolve_or_undefined(&p.ty)))
            .collect(),
        defaults: decl.params.iter().map(|p| p.default).collect(),
        result: decl
            .return_type
            .as_ref()
            .map_or(RealizedType::UNIT, resolve_or_undefined),
        is_async: decl.is_async,
    }
}
