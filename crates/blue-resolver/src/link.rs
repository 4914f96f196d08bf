//! Pass A.2: link the stub world.
//!
//! Resolves each section's using-clauses, each type's super type and base
//! interfaces (with cycle detection and inheritance-shape checks), and
//! populates member scopes with field/method/property/event stubs whose
//! signatures are fully resolved. After this pass every method's signature
//! is known, so bodies can reference anything in any order.

use smallvec::SmallVec;
use tracing::trace;

use blue_common::{DiagnosticCode, SourceSpan, SymbolId, TypeId};
use blue_parser::ast::{
    DelegateDecl, EnumDecl, Member, MethodDecl, Modifiers, Namespace, ParamFlow, Program,
    PropertyDecl, TypeDecl, TypeItem, TypeKind, TypeRef, TypeRefKind,
};

use crate::Resolver;
use crate::scope::{ScopeId, UsingLookup};
use crate::symbols::{
    EventSymbol, FieldSymbol, LiteralFieldSymbol, MethodSymbol, NamespaceSymbol, PropertySymbol,
    SymKind, TypeGenre,
};

impl Resolver<'_> {
    pub(crate) fn link_program(&mut self, program: &mut Program) {
        for file in &mut program.files {
            self.link_usings(file);
        }
        for file in &mut program.files {
            self.link_section(file);
        }
        self.check_cycles(program);
        for file in &mut program.files {
            self.link_members_section(file);
        }
        // Declarations are complete; member scopes are stable from here on.
        let declared: Vec<TypeId> = self
            .types_by_name
            .values()
            .copied()
            .filter(|&ty| !self.state.symbols.ty(ty).is_imported)
            .collect();
        for ty in declared {
            if let Some(scope) = self.state.symbols.ty(ty).member_scope {
                self.state.scopes.lock(scope);
            }
        }
    }

    // ---- using clauses ----

    fn link_usings(&mut self, ns: &mut Namespace) {
        let scope = self.state.sections[&ns.section];
        let mut usings = Vec::new();
        for clause in &ns.usings {
            if let Some(target) = self.resolve_namespace_path(&clause.path, scope, clause.span) {
                usings.push(target);
            }
        }
        if !usings.is_empty() {
            self.state
                .scopes
                .set_controller(scope, Box::new(UsingLookup { usings }));
        }
        for nested in &mut ns.namespaces {
            self.link_usings(nested);
        }
    }

    fn resolve_namespace_path(
        &mut self,
        path: &[String],
        scope: ScopeId,
        span: SourceSpan,
    ) -> Option<ScopeId> {
        let first = self.state.smart_lookup(scope, &path[0]).or_else(|| {
            self.diags.error(
                DiagnosticCode::UndefinedSymbol,
                span,
                format!("namespace '{}' is not defined", path[0]),
            );
            None
        })?;
        let mut current = match &self.state.symbols.get(first).kind {
            SymKind::Namespace(ns) => ns.scope,
            _ => {
                self.diags.error(
                    DiagnosticCode::BadSymbolType,
                    span,
                    format!("'{}' is not a namespace", path[0]),
                );
                return None;
            }
        };
        for part in &path[1..] {
            let Some(sym) = self.state.scopes.get(current, part) else {
                self.diags.error(
                    DiagnosticCode::SymbolNotInNamespace,
                    span,
                    format!("'{part}' does not exist in the namespace"),
                );
                return None;
            };
            match &self.state.symbols.get(sym).kind {
                SymKind::Namespace(NamespaceSymbol { scope, .. }) => current = *scope,
                _ => {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        span,
                        format!("'{part}' is not a namespace"),
                    );
                    return None;
                }
            }
        }
        Some(current)
    }

    // ---- type references ----

    /// Resolve a syntactic type reference in `scope`, annotating the node.
    /// Failures produce a diagnostic and the poison type.
    pub(crate) fn resolve_type_ref(&mut self, tref: &mut TypeRef, scope: ScopeId) -> TypeId {
        let resolved = self.resolve_type_ref_inner(tref, scope);
        tref.resolved = Some(resolved);
        resolved
    }

    fn resolve_type_ref_inner(&mut self, tref: &mut TypeRef, scope: ScopeId) -> TypeId {
        match &mut tref.kind {
            TypeRefKind::Resolved(ty) => *ty,
            TypeRefKind::Array { elem, rank } => {
                let rank = *rank;
                let elem = self.resolve_type_ref(elem, scope);
                self.state.array_of(elem, rank)
            }
            TypeRefKind::Ref(inner) => {
                let inner = self.resolve_type_ref(inner, scope);
                self.state.ref_of(inner)
            }
            TypeRefKind::Named(parts) => {
                let parts = parts.clone();
                self.resolve_named_type(&parts, scope, tref.span)
            }
        }
    }

    fn resolve_named_type(
        &mut self,
        parts: &[String],
        scope: ScopeId,
        span: SourceSpan,
    ) -> TypeId {
        let error = self.state.well_known.error;
        let Some(first) = self.state.smart_lookup(scope, &parts[0]) else {
            self.diags.error(
                DiagnosticCode::UndefinedSymbol,
                span,
                format!("type '{}' is not defined", parts[0]),
            );
            return error;
        };
        let mut sym = first;
        for (i, part) in parts.iter().enumerate().skip(1) {
            match &self.state.symbols.get(sym).kind {
                SymKind::Namespace(NamespaceSymbol { scope: ns, .. }) => {
                    let Some(next) = self.state.scopes.get(*ns, part) else {
                        self.diags.error(
                            DiagnosticCode::SymbolNotInNamespace,
                            span,
                            format!("'{part}' does not exist in the namespace"),
                        );
                        return error;
                    };
                    sym = next;
                }
                SymKind::Type(_) => {
                    let ty = TypeId(sym);
                    self.ensure_members(ty);
                    let Some(member_scope) = self.state.symbols.ty(ty).member_scope else {
                        self.diags.error(
                            DiagnosticCode::SymbolNotInType,
                            span,
                            format!("'{part}' does not exist in the type"),
                        );
                        return error;
                    };
                    let Some(next) = self.state.scopes.get(member_scope, part) else {
                        self.diags.error(
                            DiagnosticCode::SymbolNotInType,
                            span,
                            format!("'{part}' does not exist in the type"),
                        );
                        return error;
                    };
                    sym = next;
                }
                _ => {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        span,
                        format!("'{}' cannot be used as a type", parts[i - 1]),
                    );
                    return error;
                }
            }
        }
        match self.state.symbols.as_type(sym) {
            Some(ty) => ty,
            None => {
                self.diags.error(
                    DiagnosticCode::BadSymbolType,
                    span,
                    format!("'{}' is not a type", parts.last().unwrap()),
                );
                error
            }
        }
    }

    // ---- supers and interfaces ----

    fn link_section(&mut self, ns: &mut Namespace) {
        for nested in &mut ns.namespaces {
            self.link_section(nested);
        }
        let scope = self.state.sections[&ns.section];
        for item in &mut ns.types {
            self.link_type_item(item, scope);
        }
    }

    fn link_type_item(&mut self, item: &mut TypeItem, scope: ScopeId) {
        match item {
            TypeItem::Type(decl) => self.link_type(decl, scope),
            TypeItem::Enum(decl) => {
                let Some(ty) = decl.sym else { return };
                let sym = self.state.symbols.ty_mut(ty);
                sym.super_ty = Some(self.state.well_known.enum_ty);
                self.state.symbols.ty_mut(ty).is_init = true;
            }
            TypeItem::Delegate(decl) => {
                let Some(ty) = decl.sym else { return };
                self.state.symbols.ty_mut(ty).super_ty = Some(self.state.well_known.multicast);
                self.state.symbols.ty_mut(ty).is_init = true;
            }
        }
    }

    fn link_type(&mut self, decl: &mut TypeDecl, scope: ScopeId) {
        let Some(ty) = decl.sym else { return };
        let mut super_ty: Option<TypeId> = None;
        let mut interfaces = Vec::new();
        for base in &mut decl.bases {
            let resolved = self.resolve_type_ref(base, scope);
            if self.state.is_error(resolved) {
                continue;
            }
            let genre = self.state.symbols.ty(resolved).genre;
            if genre == TypeGenre::Interface {
                interfaces.push(resolved);
                continue;
            }
            match decl.kind {
                TypeKind::Class => {
                    if super_ty.is_some() {
                        self.diags.error(
                            DiagnosticCode::OnlySingleInheritance,
                            base.span,
                            "a class can have only one base class",
                        );
                    } else if genre != TypeGenre::Class {
                        self.diags.error(
                            DiagnosticCode::MustDeriveFromInterface,
                            base.span,
                            "a class can derive only from a class or interfaces",
                        );
                    } else {
                        super_ty = Some(resolved);
                    }
                }
                TypeKind::Struct | TypeKind::Interface => {
                    self.diags.error(
                        DiagnosticCode::MustDeriveFromInterface,
                        base.span,
                        "only interfaces are allowed here",
                    );
                }
            }
        }
        let sym = self.state.symbols.ty_mut(ty);
        sym.interfaces = interfaces;
        sym.super_ty = match decl.kind {
            TypeKind::Class => Some(super_ty.unwrap_or(self.state.well_known.object)),
            TypeKind::Struct => Some(self.state.well_known.value_type),
            TypeKind::Interface => None,
        };
        self.state.symbols.ty_mut(ty).is_init = true;
        trace!(name = %self.state.symbols.ty(ty).full_name, "linked");
        for member in &mut decl.members {
            if let Member::Nested(nested) = member {
                self.link_type_item(nested, scope);
            }
        }
    }

    fn check_cycles(&mut self, program: &Program) {
        fn each_type<'t>(item: &'t TypeItem, out: &mut Vec<&'t TypeDecl>) {
            if let TypeItem::Type(decl) = item {
                for member in &decl.members {
                    if let Member::Nested(nested) = member {
                        each_type(nested, out);
                    }
                }
                out.push(decl);
            }
        }
        fn each_ns<'t>(ns: &'t Namespace, out: &mut Vec<&'t TypeDecl>) {
            for nested in &ns.namespaces {
                each_ns(nested, out);
            }
            for item in &ns.types {
                each_type(item, out);
            }
        }
        let mut decls = Vec::new();
        for file in &program.files {
            each_ns(file, &mut decls);
        }
        for decl in decls {
            let Some(ty) = decl.sym else { continue };
            let mut seen = vec![ty];
            let mut current = self.state.symbols.ty(ty).super_ty;
            while let Some(t) = current {
                if seen.contains(&t) {
                    self.diags.error(
                        DiagnosticCode::CircularReference,
                        decl.span,
                        format!(
                            "'{}' is part of a circular inheritance chain",
                            self.state.symbols.ty(ty).full_name
                        ),
                    );
                    // Break the cycle so later passes terminate.
                    self.state.symbols.ty_mut(ty).super_ty =
                        Some(self.state.well_known.object);
                    break;
                }
                seen.push(t);
                current = self.state.symbols.ty(t).super_ty;
            }
        }
    }

    // ---- member stubs and signatures ----

    fn link_members_section(&mut self, ns: &mut Namespace) {
        for nested in &mut ns.namespaces {
            self.link_members_section(nested);
        }
        for item in &mut ns.types {
            self.link_members_item(item);
        }
    }

    fn link_members_item(&mut self, item: &mut TypeItem) {
        match item {
            TypeItem::Type(decl) => self.link_members(decl),
            TypeItem::Delegate(decl) => self.link_delegate_members(decl),
            TypeItem::Enum(_) => {}
        }
    }

    fn link_delegate_members(&mut self, decl: &mut DelegateDecl) {
        let Some(ty) = decl.sym else { return };
        let scope = self.state.symbols.ty(ty).member_scope.unwrap_or_else(|| {
            let scope = self.member_scope_of(ty);
            scope
        });
        // Runtime-supplied constructor: (target object, method pointer).
        let object = self.state.well_known.object;
        let intptr = self.state.well_known.intptr;
        let ctor_params: SmallVec<[TypeId; 4]> = [object, intptr].into_iter().collect();
        let ctor = self.state.symbols.alloc(
            ".ctor",
            decl.span,
            SymKind::Method(MethodSymbol {
                owner: ty,
                ret: None,
                params: ctor_params.clone(),
                flows: [ParamFlow::In, ParamFlow::In].into_iter().collect(),
                param_names: vec!["object".to_string(), "method".to_string()],
                is_ctor: true,
                is_static: false,
                is_virtual: false,
                is_override: false,
                is_abstract: false,
                is_special_name: true,
                mods: Modifiers::PUBLIC,
                runtime: None,
            }),
        );
        self.file_method(scope, ".ctor", &ctor_params, ctor);

        let member_scope = scope;
        let mut params: SmallVec<[TypeId; 4]> = SmallVec::new();
        let mut flows: SmallVec<[ParamFlow; 4]> = SmallVec::new();
        let mut names = Vec::new();
        for param in &mut decl.params {
            let mut resolved = self.resolve_type_ref(&mut param.ty, member_scope);
            if param.flow != ParamFlow::In {
                resolved = self.state.ref_of(resolved);
            }
            params.push(resolved);
            flows.push(param.flow);
            names.push(param.name.clone());
        }
        let ret = self.resolve_type_ref(&mut decl.ret, member_scope);
        let invoke = self.state.symbols.alloc(
            "Invoke",
            decl.span,
            SymKind::Method(MethodSymbol {
                owner: ty,
                ret: Some(ret),
                params: params.clone(),
                flows,
                param_names: names,
                is_ctor: false,
                is_static: false,
                is_virtual: true,
                is_override: false,
                is_abstract: false,
                is_special_name: false,
                mods: Modifiers::PUBLIC | Modifiers::VIRTUAL,
                runtime: None,
            }),
        );
        self.file_method(scope, "Invoke", &params, invoke);
        self.state.scopes.lock(scope);
    }

    fn link_members(&mut self, decl: &mut TypeDecl) {
        let Some(ty) = decl.sym else { return };
        let scope = self.state.symbols.ty(ty).member_scope.unwrap();
        let is_interface = decl.kind == TypeKind::Interface;
        let is_struct = decl.kind == TypeKind::Struct;
        let mut has_instance_ctor = false;
        for member in &mut decl.members {
            match member {
                Member::Field(field) => {
                    let field_ty = self.resolve_type_ref(&mut field.ty, scope);
                    if is_struct && field.init.is_some() {
                        self.diags.error(
                            DiagnosticCode::NoFieldInitForStructs,
                            field.span,
                            "struct fields cannot have initializers",
                        );
                        field.init = None;
                    }
                    let kind = if field.mods.contains(Modifiers::CONST) {
                        let value = field
                            .init
                            .as_ref()
                            .and_then(const_init)
                            .unwrap_or_else(|| {
                                self.diags.error(
                                    DiagnosticCode::MustBeCompileTimeConstant,
                                    field.span,
                                    "a const field requires a compile-time constant value",
                                );
                                0
                            });
                        SymKind::LiteralField(LiteralFieldSymbol {
                            owner: ty,
                            ty: field_ty,
                            value,
                            runtime: None,
                        })
                    } else {
                        SymKind::Field(FieldSymbol {
                            owner: ty,
                            ty: field_ty,
                            mods: field.mods,
                            is_static: field.mods.is_static(),
                            runtime: None,
                        })
                    };
                    let sym = self.state.symbols.alloc(field.name.clone(), field.span, kind);
                    if self
                        .state
                        .scopes
                        .insert(scope, field.name.clone(), sym)
                        .is_err()
                    {
                        self.diags.error(
                            DiagnosticCode::SymbolAlreadyDefined,
                            field.span,
                            format!("'{}' is already defined", field.name),
                        );
                        continue;
                    }
                    field.sym = Some(sym);
                }
                Member::Method(method) => {
                    if method.is_ctor && !method.mods.is_static() {
                        has_instance_ctor = true;
                    }
                    self.link_method(ty, scope, method, is_interface);
                }
                Member::Property(prop) => self.link_property(ty, scope, prop, is_interface),
                Member::Event(event) => {
                    let event_ty = self.resolve_type_ref(&mut event.ty, scope);
                    if !self.state.is_error(event_ty)
                        && self.state.symbols.ty(event_ty).genre != TypeGenre::Delegate
                    {
                        self.diags.error(
                            DiagnosticCode::BadSymbolType,
                            event.span,
                            "an event must have a delegate type",
                        );
                    }
                    let sym = self.state.symbols.alloc(
                        event.name.clone(),
                        event.span,
                        SymKind::Event(EventSymbol {
                            owner: ty,
                            ty: event_ty,
                            mods: event.mods,
                            is_static: event.mods.is_static(),
                            runtime: None,
                        }),
                    );
                    if self
                        .state
                        .scopes
                        .insert(scope, event.name.clone(), sym)
                        .is_err()
                    {
                        self.diags.error(
                            DiagnosticCode::SymbolAlreadyDefined,
                            event.span,
                            format!("'{}' is already defined", event.name),
                        );
                        continue;
                    }
                    event.sym = Some(sym);
                }
                Member::Nested(_) => {}
            }
        }
        // Every concrete class/struct gets a default constructor when none
        // was written.
        if !has_instance_ctor && !is_interface && decl.kind == TypeKind::Class {
            let ctor = self.state.symbols.alloc(
                ".ctor",
                decl.span,
                SymKind::Method(MethodSymbol {
                    owner: ty,
                    ret: None,
                    params: SmallVec::new(),
                    flows: SmallVec::new(),
                    param_names: Vec::new(),
                    is_ctor: true,
                    is_static: false,
                    is_virtual: false,
                    is_override: false,
                    is_abstract: false,
                    is_special_name: true,
                    mods: Modifiers::PUBLIC,
                    runtime: None,
                }),
            );
            self.file_method(scope, ".ctor", &[], ctor);
        }
    }

    fn link_method(
        &mut self,
        ty: TypeId,
        scope: ScopeId,
        method: &mut MethodDecl,
        is_interface: bool,
    ) {
        let mut params: SmallVec<[TypeId; 4]> = SmallVec::new();
        let mut flows: SmallVec<[ParamFlow; 4]> = SmallVec::new();
        let mut names = Vec::new();
        for param in &mut method.params {
            let mut resolved = self.resolve_type_ref(&mut param.ty, scope);
            if param.flow != ParamFlow::In {
                resolved = self.state.ref_of(resolved);
            }
            params.push(resolved);
            flows.push(param.flow);
            names.push(param.name.clone());
        }
        let is_static_ctor = method.is_ctor && method.mods.is_static();
        if is_static_ctor && !params.is_empty() {
            self.diags.error(
                DiagnosticCode::NoParamsOnStaticCtor,
                method.span,
                "a static constructor cannot have parameters",
            );
            params.clear();
            flows.clear();
            names.clear();
        }
        let ret = if method.is_ctor {
            None
        } else {
            Some(
                method
                    .ret
                    .as_mut()
                    .map(|r| self.resolve_type_ref(r, scope))
                    .unwrap_or(self.state.well_known.void),
            )
        };
        let name = if method.is_ctor {
            if is_static_ctor { ".cctor" } else { ".ctor" }
        } else {
            method.name.as_str()
        };
        let is_abstract = method.mods.contains(Modifiers::ABSTRACT) || is_interface;
        if method.body.is_none() && !is_abstract {
            self.diags.error(
                DiagnosticCode::SyntaxError,
                method.span,
                format!("method '{}' requires a body", method.name),
            );
        }
        let sym = self.state.symbols.alloc(
            name,
            method.span,
            SymKind::Method(MethodSymbol {
                owner: ty,
                ret,
                params: params.clone(),
                flows,
                param_names: names,
                is_ctor: method.is_ctor,
                is_static: method.mods.is_static(),
                is_virtual: is_interface
                    || method.mods.is_virtual_slot()
                    || method.mods.contains(Modifiers::VIRTUAL),
                is_override: method.mods.contains(Modifiers::OVERRIDE),
                is_abstract,
                is_special_name: method.is_special,
                mods: method.mods,
                runtime: None,
            }),
        );
        self.file_method(scope, name, &params, sym);
        method.sym = Some(sym);
    }

    fn link_property(
        &mut self,
        ty: TypeId,
        scope: ScopeId,
        prop: &mut PropertyDecl,
        is_interface: bool,
    ) {
        let prop_ty = self.resolve_type_ref(&mut prop.ty, scope);
        let mut index_params: SmallVec<[TypeId; 4]> = SmallVec::new();
        let mut index_names = Vec::new();
        for param in &mut prop.params {
            index_params.push(self.resolve_type_ref(&mut param.ty, scope));
            index_names.push(param.name.clone());
        }
        let is_static = prop.mods.is_static();
        let make_accessor = |resolver: &mut Self,
                             name: String,
                             ret: TypeId,
                             params: SmallVec<[TypeId; 4]>,
                             names: Vec<String>|
         -> SymbolId {
            let flows = params.iter().map(|_| ParamFlow::In).collect();
            let sym = resolver.state.symbols.alloc(
                name.clone(),
                prop.span,
                SymKind::Method(MethodSymbol {
                    owner: ty,
                    ret: Some(ret),
                    params: params.clone(),
                    flows,
                    param_names: names,
                    is_ctor: false,
                    is_static,
                    is_virtual: is_interface || prop.mods.is_virtual_slot(),
                    is_override: prop.mods.contains(Modifiers::OVERRIDE),
                    is_abstract: is_interface || prop.mods.contains(Modifiers::ABSTRACT),
                    is_special_name: true,
                    mods: prop.mods,
                    runtime: None,
                }),
            );
            resolver.file_method(scope, &name, &params, sym);
            sym
        };
        let getter = prop.getter.as_ref().map(|_| {
            make_accessor(
                self,
                format!("get_{}", prop.name),
                prop_ty,
                index_params.clone(),
                index_names.clone(),
            )
        });
        let setter = prop.setter.as_ref().map(|_| {
            let mut params = index_params.clone();
            params.push(prop_ty);
            let mut names = index_names.clone();
            names.push("value".to_string());
            make_accessor(self, format!("set_{}", prop.name), self.state.well_known.void, params, names)
        });
        let sym = self.state.symbols.alloc(
            prop.name.clone(),
            prop.span,
            SymKind::Property(PropertySymbol {
                owner: ty,
                ty: prop_ty,
                is_static,
                getter,
                setter,
            }),
        );
        if self
            .state
            .scopes
            .insert(scope, prop.name.clone(), sym)
            .is_err()
        {
            self.diags.error(
                DiagnosticCode::SymbolAlreadyDefined,
                prop.span,
                format!("'{}' is already defined", prop.name),
            );
            return;
        }
        prop.sym = Some(sym);
    }
}

/// Constant folding for `const` field initializers.
fn const_init(expr: &blue_parser::ast::Expr) -> Option<i32> {
    use blue_parser::ast::{ExprKind, UnOp};
    match &expr.kind {
        ExprKind::Int(v) => Some(*v as i32),
        ExprKind::Char(c) => Some(*c as i32),
        ExprKind::Bool(b) => Some(i32::from(*b)),
        ExprKind::Unary {
            op: UnOp::Neg,
            expr,
        } => const_init(expr).map(i32::wrapping_neg),
        _ => None,
    }
}
