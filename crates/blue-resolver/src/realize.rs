//! Post-pass checks over the linked world: override validity,
//! class abstractness, and interface realization.

use blue_common::{DiagnosticCode, SymbolId, TypeId};
use blue_parser::ast::{Member, Modifiers, Namespace, Program, TypeDecl, TypeItem, TypeKind};

use crate::Resolver;
use crate::state::MAX_LOOKUP_WALK;
use crate::symbols::SymKind;

fn collect_decls(program: &Program) -> Vec<&TypeDecl> {
    fn from_item<'t>(item: &'t TypeItem, out: &mut Vec<&'t TypeDecl>) {
        if let TypeItem::Type(decl) = item {
            for member in &decl.members {
                if let Member::Nested(nested) = member {
                    from_item(nested, out);
                }
            }
            out.push(decl);
        }
    }
    fn from_ns<'t>(ns: &'t Namespace, out: &mut Vec<&'t TypeDecl>) {
        for nested in &ns.namespaces {
            from_ns(nested, out);
        }
        for item in &ns.types {
            from_item(item, out);
        }
    }
    let mut out = Vec::new();
    for file in &program.files {
        from_ns(file, &mut out);
    }
    out
}

impl Resolver<'_> {
    /// `override` members must match a virtual, non-final super method
    /// with the same accessibility; a class holding abstract members must
    /// itself be abstract.
    pub(crate) fn check_overrides(&mut self, program: &Program) {
        for decl in collect_decls(program) {
            let Some(ty) = decl.sym else { continue };
            if decl.kind == TypeKind::Interface {
                continue;
            }
            let mut has_abstract_member = false;
            for member in &decl.members {
                let Member::Method(method) = member else {
                    continue;
                };
                let Some(sym) = method.sym else { continue };
                if self.state.symbols.method(sym).is_abstract {
                    has_abstract_member = true;
                }
                if !method.mods.contains(Modifiers::OVERRIDE) {
                    continue;
                }
                let (name, params) = {
                    let m = self.state.symbols.method(sym);
                    (
                        self.state.symbols.get(sym).name.clone(),
                        m.params.clone(),
                    )
                };
                match self.find_super_method(ty, &name, &params) {
                    None => {
                        self.diags.error(
                            DiagnosticCode::NoMethodToOverride,
                            method.span,
                            format!("no method '{name}' in a base class to override"),
                        );
                    }
                    Some(super_sym) => {
                        let super_m = self.state.symbols.method(super_sym);
                        if super_m.mods.contains(Modifiers::SEALED) {
                            self.diags.error(
                                DiagnosticCode::CantOverrideFinal,
                                method.span,
                                format!("'{name}' is sealed and cannot be overridden"),
                            );
                        } else if !super_m.is_virtual {
                            self.diags.error(
                                DiagnosticCode::CantOverrideNonVirtual,
                                method.span,
                                format!("'{name}' is not virtual and cannot be overridden"),
                            );
                        } else if super_m.mods & Modifiers::ACCESS
                            != method.mods & Modifiers::ACCESS
                        {
                            self.diags.error(
                                DiagnosticCode::VisibilityMismatch,
                                method.span,
                                format!(
                                    "the override of '{name}' changes its accessibility"
                                ),
                            );
                        }
                    }
                }
            }
            if has_abstract_member && !decl.mods.contains(Modifiers::ABSTRACT) {
                self.diags.error(
                    DiagnosticCode::ClassMustBeAbstract,
                    decl.span,
                    format!(
                        "'{}' has abstract members and must be declared abstract",
                        decl.name
                    ),
                );
            }
        }
    }

    fn find_super_method(
        &mut self,
        ty: TypeId,
        name: &str,
        params: &[TypeId],
    ) -> Option<SymbolId> {
        self.ensure_chain(ty);
        let decorated = self.state.decorated_name(name, params);
        let mut current = self.state.symbols.ty(ty).super_ty;
        let mut steps = 0usize;
        while let Some(t) = current {
            if steps > MAX_LOOKUP_WALK {
                break;
            }
            steps += 1;
            if let Some(scope) = self.state.symbols.ty(t).member_scope {
                if let Some(sym) = self.state.scopes.get(scope, &decorated) {
                    if matches!(self.state.symbols.get(sym).kind, SymKind::Method(_)) {
                        return Some(sym);
                    }
                }
            }
            current = self.state.symbols.ty(t).super_ty;
        }
        None
    }

    /// Every method of every base interface of a concrete class
    /// must have an exactly-matching public implementation reachable via
    /// its super chain.
    pub(crate) fn check_interface_realization(&mut self, program: &Program) {
        for decl in collect_decls(program) {
            let Some(ty) = decl.sym else { continue };
            if decl.kind != TypeKind::Class || decl.mods.contains(Modifiers::ABSTRACT) {
                continue;
            }
            self.ensure_chain(ty);
            for iface in self.state.all_interfaces(ty) {
                self.ensure_members(iface);
                let Some(iface_scope) = self.state.symbols.ty(iface).member_scope else {
                    continue;
                };
                let required: Vec<SymbolId> = self
                    .state
                    .scopes
                    .entries(iface_scope)
                    .filter_map(|(_, sym)| match &self.state.symbols.get(sym).kind {
                        SymKind::MethodHeader(_) => None,
                        SymKind::Method(m) if !m.is_ctor => Some(sym),
                        _ => None,
                    })
                    .collect();
                for req in required {
                    let (name, params) = {
                        let m = self.state.symbols.method(req);
                        (self.state.symbols.get(req).name.clone(), m.params.clone())
                    };
                    match self.find_impl_method(ty, &name, &params) {
                        None => {
                            self.diags.error(
                                DiagnosticCode::MissingInterfaceMethod,
                                decl.span,
                                format!(
                                    "'{}' does not implement '{}.{}'",
                                    decl.name,
                                    self.state.full_name(iface),
                                    name
                                ),
                            );
                        }
                        Some(impl_sym) => {
                            let impl_m = self.state.symbols.method(impl_sym);
                            let is_public = impl_m.mods.contains(Modifiers::PUBLIC)
                                || impl_m.mods & Modifiers::ACCESS == Modifiers::empty()
                                    && self.state.symbols.ty(impl_m.owner).is_imported;
                            if !is_public {
                                self.diags.error(
                                    DiagnosticCode::IMethodMustBePublic,
                                    self.state.symbols.get(impl_sym).span,
                                    format!(
                                        "'{name}' implements an interface method and must be public"
                                    ),
                                );
                            }
                        }
                    }
                }
            }
        }
    }

    fn find_impl_method(
        &mut self,
        ty: TypeId,
        name: &str,
        params: &[TypeId],
    ) -> Option<SymbolId> {
        let decorated = self.state.decorated_name(name, params);
        let mut current = Some(ty);
        let mut steps = 0usize;
        while let Some(t) = current {
            if steps > MAX_LOOKUP_WALK {
                break;
            }
            steps += 1;
            if let Some(scope) = self.state.symbols.ty(t).member_scope {
                if let Some(sym) = self.state.scopes.get(scope, &decorated) {
                    if matches!(self.state.symbols.get(sym).kind, SymKind::Method(_)) {
                        return Some(sym);
                    }
                }
            }
            current = self.state.symbols.ty(t).super_ty;
        }
        None
    }
}
