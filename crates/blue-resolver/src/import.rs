//! Type import: make types from referenced assemblies available as
//! symbols.
//!
//! Stubs for every public type of every referenced assembly are created
//! eagerly; each stub's member scope is populated lazily on first use
//! (`ensure_members`) and locked afterwards. Loaders hand back only
//! public/family members, so nothing needs filtering here.

use tracing::{debug, trace};

use blue_common::{Diagnostic, DiagnosticCode, SourceSpan, TypeId};
use blue_parser::ast::{Modifiers, ParamFlow};
use blue_runtime::corelib::CORELIB_NAME;
use blue_runtime::{AssemblyRef, ImportedGenre, ImportedMember, ImportedTypeInfo};
use smallvec::SmallVec;

use crate::Resolver;
use crate::scope::{ClassLookup, InterfaceLookup, NoInherit, ScopeId};
use crate::symbols::{
    EventSymbol, FieldSymbol, LiteralFieldSymbol, MethodHeader, MethodSymbol, NamespaceSymbol,
    PropertySymbol, SymKind, TypeGenre, TypeSymbol,
};

impl Resolver<'_> {
    /// Create eager stubs for the core library plus every `/reference`.
    pub(crate) fn import_references(&mut self) {
        let mut names: Vec<String> = vec![CORELIB_NAME.to_string()];
        for r in &self.opts.references {
            if !names.iter().any(|n| n == r) {
                names.push(r.clone());
            }
        }
        for name in names {
            match self.loader.load_assembly(&name) {
                Ok(asm) => self.import_assembly(asm),
                Err(err) => self.diags.add(Diagnostic::spanless(
                    DiagnosticCode::AssemblyLoadError,
                    format!("cannot load referenced assembly '{name}': {err}"),
                )),
            }
        }
    }

    fn import_assembly(&mut self, asm: AssemblyRef) {
        let mut types = self.loader.public_types(asm);
        // Containers before their nested types ('A' sorts before 'A+B').
        types.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        debug!(count = types.len(), "import assembly");
        for info in types {
            self.import_stub(info, asm);
        }
    }

    fn import_stub(&mut self, info: ImportedTypeInfo, asm: AssemblyRef) {
        if self.types_by_name.contains_key(&info.full_name) {
            self.diags.add(Diagnostic::spanless(
                DiagnosticCode::IllegalImportAssembly,
                format!("imported type '{}' is defined twice", info.full_name),
            ));
            return;
        }
        let genre = match info.genre {
            ImportedGenre::Class => TypeGenre::Class,
            ImportedGenre::Struct => TypeGenre::Struct,
            ImportedGenre::Interface => TypeGenre::Interface,
            ImportedGenre::Enum => TypeGenre::Enum,
            ImportedGenre::Delegate => TypeGenre::Delegate,
        };
        let mut mods = Modifiers::PUBLIC;
        if info.is_abstract {
            mods |= Modifiers::ABSTRACT;
        }
        if info.is_sealed {
            mods |= Modifiers::SEALED;
        }
        let (container, short_name, ns_scope) = self.import_location(&info.full_name);
        let ty = TypeId(self.state.symbols.alloc(
            short_name.clone(),
            SourceSpan::synthetic(),
            SymKind::Type(TypeSymbol {
                genre,
                full_name: info.full_name.clone(),
                super_ty: None,
                interfaces: Vec::new(),
                containing: container,
                member_scope: None,
                mods,
                is_imported: true,
                is_init: false,
                elem: None,
                rank: 0,
                import_asm: Some(asm),
                members_resolved: false,
                runtime: None,
            }),
        ));
        trace!(name = %info.full_name, "imported stub");
        self.types_by_name.insert(info.full_name.clone(), ty);
        match container {
            Some(outer) => {
                let scope = self.member_scope_of(outer);
                let _ = self.state.scopes.insert(scope, short_name, ty.symbol());
            }
            None => {
                if let Err(_existing) =
                    self.state.scopes.insert(ns_scope, short_name.clone(), ty.symbol())
                {
                    self.diags.add(Diagnostic::spanless(
                        DiagnosticCode::SymbolAlreadyDefined,
                        format!("symbol '{short_name}' is already defined"),
                    ));
                }
            }
        }
        self.pending_imports.push((ty, info, asm));
    }

    /// Where an imported full name lands: its container type (for nested
    /// names), its short name, and the namespace scope to insert into.
    fn import_location(&mut self, full_name: &str) -> (Option<TypeId>, String, ScopeId) {
        if let Some(plus) = full_name.rfind('+') {
            let container_name = &full_name[..plus];
            let short = full_name[plus + 1..].to_string();
            let container = self.types_by_name.get(container_name).copied();
            if container.is_none() {
                self.diags.add(Diagnostic::spanless(
                    DiagnosticCode::IllegalImportAssembly,
                    format!("nested type '{full_name}' arrived before its container"),
                ));
            }
            return (container, short, self.state.global);
        }
        let (path, short) = match full_name.rfind('.') {
            Some(dot) => (&full_name[..dot], full_name[dot + 1..].to_string()),
            None => ("", full_name.to_string()),
        };
        let scope = if path.is_empty() {
            self.state.global
        } else {
            let parts: Vec<String> = path.split('.').map(str::to_string).collect();
            self.ensure_namespace(&parts)
        };
        (None, short, scope)
    }

    /// Walk (and create as needed) the namespace chain for `path`,
    /// returning the innermost canonical namespace scope.
    pub(crate) fn ensure_namespace(&mut self, path: &[String]) -> ScopeId {
        let mut scope = self.state.global;
        let mut full = String::new();
        for part in path {
            if !full.is_empty() {
                full.push('.');
            }
            full.push_str(part);
            if let Some(existing) = self.state.scopes.get(scope, part) {
                match &self.state.symbols.get(existing).kind {
                    SymKind::Namespace(ns) => {
                        scope = ns.scope;
                        continue;
                    }
                    _ => {
                        self.diags.add(Diagnostic::spanless(
                            DiagnosticCode::SymbolAlreadyDefined,
                            format!("'{full}' is already defined and is not a namespace"),
                        ));
                        return scope;
                    }
                }
            }
            let ns_scope = self
                .state
                .scopes
                .new_scope(full.clone(), Some(scope), Box::new(NoInherit));
            let sym = self.state.symbols.alloc(
                part.clone(),
                SourceSpan::synthetic(),
                SymKind::Namespace(NamespaceSymbol {
                    scope: ns_scope,
                    full_name: full.clone(),
                }),
            );
            let _ = self.state.scopes.insert(scope, part.clone(), sym);
            scope = ns_scope;
        }
        scope
    }

    /// Bind the well-known types after the core-library import. Returns
    /// false (with a diagnostic) when the core library is absent.
    pub(crate) fn bind_well_known(&mut self) -> bool {
        let mut ok = true;
        let mut find = |resolver: &mut Self, name: &str| -> TypeId {
            match resolver.types_by_name.get(name) {
                Some(&ty) => ty,
                None => {
                    ok = false;
                    resolver.state.well_known.error
                }
            }
        };
        let wk = WellKnownNames {
            object: find(self, "System.Object"),
            string: find(self, "System.String"),
            int: find(self, "System.Int32"),
            char: find(self, "System.Char"),
            bool_ty: find(self, "System.Boolean"),
            void: find(self, "System.Void"),
            value_type: find(self, "System.ValueType"),
            enum_ty: find(self, "System.Enum"),
            array: find(self, "System.Array"),
            exception: find(self, "System.Exception"),
            delegate: find(self, "System.Delegate"),
            multicast: find(self, "System.MulticastDelegate"),
            type_ty: find(self, "System.Type"),
            runtime_handle: find(self, "System.RuntimeTypeHandle"),
        };
        if !ok {
            self.diags.add(Diagnostic::spanless(
                DiagnosticCode::MissingAsmReference,
                "the core library does not provide the standard types",
            ));
            return false;
        }
        let well_known = &mut self.state.well_known;
        well_known.object = wk.object;
        well_known.string = wk.string;
        well_known.int = wk.int;
        well_known.char = wk.char;
        well_known.bool_ty = wk.bool_ty;
        well_known.void = wk.void;
        well_known.value_type = wk.value_type;
        well_known.enum_ty = wk.enum_ty;
        well_known.array = wk.array;
        well_known.exception = wk.exception;
        well_known.delegate = wk.delegate;
        well_known.multicast = wk.multicast;
        well_known.type_ty = wk.type_ty;
        well_known.runtime_handle = wk.runtime_handle;
        // IntPtr backs delegate constructors; tolerate its absence.
        self.state.well_known.intptr = self
            .types_by_name
            .get("System.IntPtr")
            .copied()
            .unwrap_or(self.state.well_known.error);
        true
    }

    /// Resolve the super/interface links of every imported stub.
    pub(crate) fn link_imports(&mut self) {
        let pending = std::mem::take(&mut self.pending_imports);
        for (ty, info, _) in &pending {
            let super_ty = info
                .super_full_name
                .as_deref()
                .and_then(|n| self.types_by_name.get(n).copied());
            let interfaces: Vec<TypeId> = info
                .interfaces
                .iter()
                .filter_map(|n| self.types_by_name.get(n.as_str()).copied())
                .collect();
            let sym = self.state.symbols.ty_mut(*ty);
            sym.super_ty = super_ty;
            sym.interfaces = interfaces;
            sym.is_init = true;
        }
        self.pending_imports = pending;
    }

    /// The primitive aliases: `int` -> System.Int32 and friends, inserted
    /// into the global scope under their alias keys.
    pub(crate) fn install_primitive_aliases(&mut self) {
        let wk = self.state.well_known;
        for (alias, ty) in [
            ("int", wk.int),
            ("char", wk.char),
            ("bool", wk.bool_ty),
            ("string", wk.string),
            ("object", wk.object),
            ("void", wk.void),
        ] {
            let _ = self.state.scopes.insert(self.state.global, alias, ty.symbol());
        }
    }

    // ---- lazy member population ----

    /// The member scope of a type, created on demand (imported stubs get
    /// theirs on first use).
    pub(crate) fn member_scope_of(&mut self, ty: TypeId) -> ScopeId {
        if let Some(scope) = self.state.symbols.ty(ty).member_scope {
            return scope;
        }
        let genre = self.state.symbols.ty(ty).genre;
        let name = self.state.symbols.ty(ty).full_name.clone();
        let controller: Box<dyn crate::scope::LookupController> = match genre {
            TypeGenre::Interface => Box::new(InterfaceLookup { ty }),
            _ => Box::new(ClassLookup { ty }),
        };
        let scope = self.state.scopes.new_scope(name, None, controller);
        self.state.symbols.ty_mut(ty).member_scope = Some(scope);
        scope
    }

    /// Populate an imported type's members on first use, then lock the
    /// scope. Declared types are populated by pass A.2 instead.
    pub(crate) fn ensure_members(&mut self, ty: TypeId) {
        let sym = self.state.symbols.ty(ty);
        if sym.members_resolved || !sym.is_imported {
            return;
        }
        let Some(asm) = sym.import_asm else { return };
        let full_name = sym.full_name.clone();
        self.state.symbols.ty_mut(ty).members_resolved = true;
        let Some(members) = self.loader.type_members(asm, &full_name) else {
            return;
        };
        trace!(name = %full_name, count = members.len(), "populate imported members");
        let scope = self.member_scope_of(ty);
        for member in &members {
            match member {
                ImportedMember::Method(m) => {
                    let params: SmallVec<[TypeId; 4]> = m
                        .params
                        .iter()
                        .map(|p| self.import_type_by_name(p))
                        .collect();
                    let flows: SmallVec<[ParamFlow; 4]> = m
                        .params
                        .iter()
                        .map(|p| {
                            if p.ends_with('&') {
                                ParamFlow::Ref
                            } else {
                                ParamFlow::In
                            }
                        })
                        .collect();
                    let ret = if m.is_ctor {
                        None
                    } else {
                        Some(match &m.ret {
                            Some(r) => self.import_type_by_name(r),
                            None => self.state.well_known.void,
                        })
                    };
                    let name = if m.is_ctor { ".ctor" } else { m.name.as_str() };
                    let method = self.state.symbols.alloc(
                        name,
                        SourceSpan::synthetic(),
                        SymKind::Method(MethodSymbol {
                            owner: ty,
                            ret,
                            params: params.clone(),
                            flows,
                            param_names: Vec::new(),
                            is_ctor: m.is_ctor,
                            is_static: m.is_static,
                            is_virtual: m.is_virtual,
                            is_override: false,
                            is_abstract: false,
                            is_special_name: m.is_special_name,
                            mods: Modifiers::PUBLIC,
                            runtime: None,
                        }),
                    );
                    self.file_method(scope, name, &params, method);
                }
                ImportedMember::Field {
                    name,
                    ty: field_ty,
                    is_static,
                    is_readonly,
                    literal,
                } => {
                    let field_ty = self.import_type_by_name(field_ty);
                    let mut mods = Modifiers::PUBLIC;
                    if *is_static {
                        mods |= Modifiers::STATIC;
                    }
                    if *is_readonly {
                        mods |= Modifiers::READONLY;
                    }
                    let kind = match literal {
                        Some(value) => SymKind::LiteralField(LiteralFieldSymbol {
                            owner: ty,
                            ty: field_ty,
                            value: *value,
                            runtime: None,
                        }),
                        None => SymKind::Field(FieldSymbol {
                            owner: ty,
                            ty: field_ty,
                            mods,
                            is_static: *is_static,
                            runtime: None,
                        }),
                    };
                    let sym = self
                        .state
                        .symbols
                        .alloc(name.clone(), SourceSpan::synthetic(), kind);
                    let _ = self.state.scopes.insert(scope, name.clone(), sym);
                }
                ImportedMember::Property {
                    name,
                    ty: prop_ty,
                    is_static,
                    has_getter,
                    has_setter,
                    index_params,
                } => {
                    let prop_ty = self.import_type_by_name(prop_ty);
                    let getter = has_getter
                        .then(|| self.accessor_in(scope, &format!("get_{name}"), index_params.len()))
                        .flatten();
                    let setter = has_setter
                        .then(|| {
                            self.accessor_in(scope, &format!("set_{name}"), index_params.len() + 1)
                        })
                        .flatten();
                    let sym = self.state.symbols.alloc(
                        name.clone(),
                        SourceSpan::synthetic(),
                        SymKind::Property(PropertySymbol {
                            owner: ty,
                            ty: prop_ty,
                            is_static: *is_static,
                            getter,
                            setter,
                        }),
                    );
                    let _ = self.state.scopes.insert(scope, name.clone(), sym);
                }
                ImportedMember::Event { name, ty: evt_ty } => {
                    let evt_ty = self.import_type_by_name(evt_ty);
                    let sym = self.state.symbols.alloc(
                        name.clone(),
                        SourceSpan::synthetic(),
                        SymKind::Event(EventSymbol {
                            owner: ty,
                            ty: evt_ty,
                            mods: Modifiers::PUBLIC,
                            is_static: false,
                            runtime: None,
                        }),
                    );
                    let _ = self.state.scopes.insert(scope, name.clone(), sym);
                }
            }
        }
        self.state.scopes.lock(scope);
    }

    /// Populate the whole inheritance chain of `ty` (supers and base
    /// interfaces) so member lookups stay pure afterwards.
    pub(crate) fn ensure_chain(&mut self, ty: TypeId) {
        let mut queue = vec![ty];
        let mut steps = 0usize;
        while let Some(t) = queue.pop() {
            if steps > crate::state::MAX_LOOKUP_WALK {
                break;
            }
            steps += 1;
            self.ensure_members(t);
            let sym = self.state.symbols.ty(t);
            if let Some(super_ty) = sym.super_ty {
                queue.push(super_ty);
            }
            queue.extend(sym.interfaces.iter().copied());
            if let Some(elem) = sym.elem {
                queue.push(elem);
            }
        }
    }

    /// File a method under its decorated key and into its name header.
    pub(crate) fn file_method(
        &mut self,
        scope: ScopeId,
        name: &str,
        params: &[TypeId],
        method: blue_common::SymbolId,
    ) {
        let decorated = self.state.decorated_name(name, params);
        let _ = self.state.scopes.insert(scope, decorated, method);
        let header_key = crate::state::ResolveState::header_key(name);
        match self.state.scopes.get(scope, &header_key) {
            Some(header_sym) => {
                if let SymKind::MethodHeader(header) =
                    &mut self.state.symbols.get_mut(header_sym).kind
                {
                    header.overloads.push(method);
                }
            }
            None => {
                let header_sym = self.state.symbols.alloc(
                    header_key.clone(),
                    SourceSpan::synthetic(),
                    SymKind::MethodHeader(MethodHeader {
                        overloads: vec![method],
                    }),
                );
                let _ = self.state.scopes.insert(scope, header_key, header_sym);
            }
        }
    }

    fn accessor_in(
        &self,
        scope: ScopeId,
        name: &str,
        param_count: usize,
    ) -> Option<blue_common::SymbolId> {
        let header_key = crate::state::ResolveState::header_key(name);
        let header_sym = self.state.scopes.get(scope, &header_key)?;
        let SymKind::MethodHeader(header) = &self.state.symbols.get(header_sym).kind else {
            return None;
        };
        header
            .overloads
            .iter()
            .copied()
            .find(|&m| self.state.symbols.method(m).params.len() == param_count)
    }

    /// Resolve a type name from imported metadata: full name with optional
    /// `[]` (array) and `&` (by-ref) suffixes.
    pub(crate) fn import_type_by_name(&mut self, name: &str) -> TypeId {
        if let Some(inner) = name.strip_suffix('&') {
            let inner = self.import_type_by_name(inner);
            return self.state.ref_of(inner);
        }
        if let Some(inner) = name.strip_suffix("[]") {
            let inner = self.import_type_by_name(inner);
            return self.state.array_of(inner, 1);
        }
        match self.types_by_name.get(name) {
            Some(&ty) => ty,
            None => {
                self.diags.add(Diagnostic::spanless(
                    DiagnosticCode::IllegalImportAssembly,
                    format!("imported metadata references unknown type '{name}'"),
                ));
                self.state.well_known.error
            }
        }
    }
}

struct WellKnownNames {
    object: TypeId,
    string: TypeId,
    int: TypeId,
    char: TypeId,
    bool_ty: TypeId,
    void: TypeId,
    value_type: TypeId,
    enum_ty: TypeId,
    array: TypeId,
    exception: TypeId,
    delegate: TypeId,
    multicast: TypeId,
    type_ty: TypeId,
    runtime_handle: TypeId,
}
