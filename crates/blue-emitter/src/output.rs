//! Output phases: assembly begin, type materialization, member
//! definition, body generation, recursive finalization, entry-point
//! selection, save.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use tracing::{debug, debug_span};

use blue_common::{
    CompileOptions, DiagnosticCode, SourceMap, SourceSpan, SymbolId, TypeId,
};
use blue_parser::ast::{
    Member, MethodDecl, Modifiers, Namespace, Program, StmtKind, TypeDecl, TypeItem, TypeKind,
};
use blue_resolver::symbols::{SymKind, TypeGenre};
use blue_runtime::{
    BackendError, CreateOutcome, FieldAttrs, MethodAttrs, MethodImplFlags, RtMethod, RtType,
    TypeAttrs,
};

use crate::context::Emitter;

/// The output file: `/out`, or the first source file's stem with the
/// target's extension.
pub fn derive_output_path(opts: &CompileOptions, sources: &SourceMap) -> PathBuf {
    if let Some(out) = &opts.out {
        return out.clone();
    }
    let first = sources
        .iter()
        .next()
        .map(|(_, f)| f.name.clone())
        .unwrap_or_else(|| "out".to_string());
    Path::new(&first).with_extension(opts.target.extension())
}

/// Field initializer captured for constructor prologues.
pub(crate) struct FieldInit<'t> {
    pub sym: SymbolId,
    pub value: &'t blue_parser::ast::Expr,
    pub is_static: bool,
}

impl Emitter<'_> {
    /// Run all emission phases. Returns the saved output path on success.
    pub fn run(&mut self, program: &Program, sources: &SourceMap) -> Option<PathBuf> {
        let span = debug_span!("emit");
        let _enter = span.enter();
        let out_path = derive_output_path(self.opts, sources);
        let assembly_name = out_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "out".to_string());
        if let Err(err) = self
            .backend
            .begin_assembly(&assembly_name, self.opts.target, self.opts.debug)
        {
            self.backend_error(SourceSpan::synthetic(), &err);
            return None;
        }
        if self.opts.debug {
            for (file, source) in sources.iter() {
                match self.backend.define_document(&source.name) {
                    Ok(doc) => {
                        self.docs.insert(file, doc);
                    }
                    Err(err) => self.backend_error(SourceSpan::synthetic(), &err),
                }
            }
        }

        let decls = collect_types(program);
        let by_name: FxHashMap<String, TypeId> = decls
            .iter()
            .filter_map(|d| d.sym())
            .map(|ty| (self.state.symbols.ty(ty).full_name.clone(), ty))
            .collect();

        // Phase: materialize a builder for every declared type, in source
        // order (containers pull their nested types in as needed).
        for decl in &decls {
            if let Some(ty) = decl.sym() {
                if let Err(err) = self.declare_type(ty) {
                    self.backend_error(decl.span(), &err);
                    return None;
                }
            }
        }
        // Phase: members.
        for decl in &decls {
            if let Some(ty) = decl.sym() {
                if let Err(err) = self.define_members(ty) {
                    self.backend_error(decl.span(), &err);
                    return None;
                }
            }
        }
        // Phase: bodies for every non-interface declared type.
        for decl in &decls {
            if let DeclRef::Type(type_decl) = decl {
                if type_decl.kind != TypeKind::Interface {
                    if let Err(err) = self.emit_type_bodies(type_decl) {
                        self.backend_error(type_decl.span, &err);
                        return None;
                    }
                }
            }
        }
        // Phase: finalize every type; nested types are demanded by short
        // name and created through the in-progress stack.
        for decl in &decls {
            if let Some(ty) = decl.sym() {
                if let Err(err) = self.finalize_type(ty, &by_name) {
                    self.backend_error(decl.span(), &err);
                    return None;
                }
            }
        }
        // Phase: entry point and save.
        if self.opts.target.is_executable() {
            let entry = self.find_entry_point(&decls)?;
            if let Err(err) = self.backend.set_entry_point(entry) {
                self.backend_error(SourceSpan::synthetic(), &err);
                return None;
            }
        }
        match self.backend.save(&out_path) {
            Ok(()) => {
                debug!(path = %out_path.display(), "saved");
                Some(out_path)
            }
            Err(BackendError::Io { path, source }) => {
                self.diags.add(blue_common::Diagnostic::spanless(
                    DiagnosticCode::IoError,
                    format!("cannot write '{}': {source}", path.display()),
                ));
                None
            }
            Err(err) => {
                self.backend_error(SourceSpan::synthetic(), &err);
                None
            }
        }
    }

    // ---- type materialization ----

    fn declare_type(&mut self, ty: TypeId) -> Result<RtType, BackendError> {
        if let Some(existing) = self.state.symbols.ty(ty).runtime {
            return Ok(existing);
        }
        let (genre, mods, containing, super_ty, interfaces, full_name) = {
            let sym = self.state.symbols.ty(ty);
            (
                sym.genre,
                sym.mods,
                sym.containing,
                sym.super_ty,
                sym.interfaces.clone(),
                sym.full_name.clone(),
            )
        };
        let mut attrs = TypeAttrs::empty();
        if mods.contains(Modifiers::PUBLIC) {
            attrs |= TypeAttrs::PUBLIC;
        }
        if mods.contains(Modifiers::ABSTRACT) {
            attrs |= TypeAttrs::ABSTRACT;
        }
        if mods.contains(Modifiers::SEALED) {
            attrs |= TypeAttrs::SEALED;
        }
        match genre {
            TypeGenre::Interface => attrs |= TypeAttrs::INTERFACE | TypeAttrs::ABSTRACT,
            TypeGenre::Struct | TypeGenre::Enum => attrs |= TypeAttrs::VALUE_TYPE | TypeAttrs::SEALED,
            TypeGenre::Delegate => attrs |= TypeAttrs::SEALED,
            _ => {}
        }
        let super_rt = match super_ty {
            Some(s) => Some(self.materialize_dependency(s)?),
            None => None,
        };
        let mut interface_rts = Vec::with_capacity(interfaces.len());
        for iface in interfaces {
            interface_rts.push(self.materialize_dependency(iface)?);
        }
        let handle = match containing {
            Some(container) => {
                let container_rt = self.declare_type(container)?;
                let short = self.state.symbols.get(ty.symbol()).name.clone();
                self.backend.define_nested_type(
                    container_rt,
                    &short,
                    attrs,
                    super_rt,
                    &interface_rts,
                )?
            }
            None => self
                .backend
                .define_type(&full_name, attrs, super_rt, &interface_rts)?,
        };
        self.state.symbols.ty_mut(ty).runtime = Some(handle);
        // The enum-builder workaround: enums are ordinary type builders
        // with a special-name `value__` instance field.
        if genre == TypeGenre::Enum {
            let int_rt = self.rt_type(self.state.well_known.int)?;
            self.backend.define_field(
                handle,
                "value__",
                int_rt,
                FieldAttrs::PUBLIC | FieldAttrs::SPECIAL_NAME,
            )?;
        }
        debug!(name = %full_name, "declared type");
        Ok(handle)
    }

    /// A super/interface dependency: declared types get their builder
    /// recursively, imported types resolve by name.
    fn materialize_dependency(&mut self, ty: TypeId) -> Result<RtType, BackendError> {
        if self.state.symbols.ty(ty).is_imported {
            self.rt_type(ty)
        } else {
            self.declare_type(ty)
        }
    }

    // ---- members ----

    fn define_members(&mut self, ty: TypeId) -> Result<(), BackendError> {
        let Some(scope) = self.state.symbols.ty(ty).member_scope else {
            return Ok(());
        };
        let owner_rt = self.rt_type(ty)?;
        let genre = self.state.symbols.ty(ty).genre;
        let entries: Vec<SymbolId> = self
            .state
            .scopes
            .entries(scope)
            .map(|(_, sym)| sym)
            .collect();
        // Methods and fields first; properties and events refer to them.
        for sym in &entries {
            match &self.state.symbols.get(*sym).kind {
                SymKind::Method(method) if method.runtime.is_none() => {
                    self.define_method_symbol(owner_rt, *sym, genre)?;
                }
                SymKind::Field(_) => self.define_field_symbol(owner_rt, *sym)?,
                SymKind::LiteralField(_) => self.define_literal_symbol(owner_rt, ty, *sym)?,
                _ => {}
            }
        }
        for sym in &entries {
            match &self.state.symbols.get(*sym).kind {
                SymKind::Property(prop) => {
                    let (prop_ty, getter, setter) = (prop.ty, prop.getter, prop.setter);
                    let name = self.state.symbols.get(*sym).name.clone();
                    let prop_rt = self.rt_type(prop_ty)?;
                    let getter_rt = match getter {
                        Some(g) => Some(self.rt_method(g)?),
                        None => None,
                    };
                    let setter_rt = match setter {
                        Some(s) => Some(self.rt_method(s)?),
                        None => None,
                    };
                    self.backend
                        .define_property(owner_rt, &name, prop_rt, getter_rt, setter_rt)?;
                }
                SymKind::Event(event) => {
                    let event_ty = event.ty;
                    let name = self.state.symbols.get(*sym).name.clone();
                    let is_static = event.is_static;
                    let event_rt = self.rt_type(event_ty)?;
                    let mut attrs = FieldAttrs::PRIVATE;
                    if is_static {
                        attrs |= FieldAttrs::STATIC;
                    }
                    let storage = self.backend.define_field(owner_rt, &name, event_rt, attrs)?;
                    self.backend.define_event(owner_rt, &name, event_rt)?;
                    if let SymKind::Event(event) = &mut self.state.symbols.get_mut(*sym).kind {
                        event.runtime = Some(storage);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn define_method_symbol(
        &mut self,
        owner_rt: RtType,
        sym: SymbolId,
        owner_genre: TypeGenre,
    ) -> Result<(), BackendError> {
        let (ret, params, flows, names, is_ctor, is_static, is_virtual, is_override, is_abstract, is_special, mods) = {
            let m = self.state.symbols.method(sym);
            (
                m.ret,
                m.params.clone(),
                m.flows.clone(),
                m.param_names.clone(),
                m.is_ctor,
                m.is_static,
                m.is_virtual,
                m.is_override,
                m.is_abstract,
                m.is_special_name,
                m.mods,
            )
        };
        let name = self.state.symbols.get(sym).name.clone();
        let mut attrs = MethodAttrs::empty();
        attrs |= access_attrs(mods);
        if is_static {
            attrs |= MethodAttrs::STATIC;
        }
        if is_virtual {
            attrs |= MethodAttrs::VIRTUAL;
            if !is_override {
                attrs |= MethodAttrs::NEW_SLOT;
            }
        }
        if is_abstract {
            attrs |= MethodAttrs::ABSTRACT;
        }
        if mods.contains(Modifiers::SEALED) {
            attrs |= MethodAttrs::FINAL;
        }
        if is_special {
            attrs |= MethodAttrs::SPECIAL_NAME;
        }
        let mut param_rts = Vec::with_capacity(params.len());
        for &p in params.iter() {
            param_rts.push(self.rt_type(p)?);
        }
        let handle = if is_ctor {
            self.backend.define_ctor(owner_rt, attrs, &param_rts)?
        } else {
            let void = self.state.well_known.void;
            let ret_rt = match ret {
                Some(r) if r != void => Some(self.rt_type(r)?),
                _ => None,
            };
            self.backend
                .define_method(owner_rt, &name, attrs, ret_rt, &param_rts)?
        };
        for (i, pname) in names.iter().enumerate() {
            let is_out = flows
                .get(i)
                .is_some_and(|f| *f == blue_parser::ast::ParamFlow::Out);
            self.backend
                .define_param(handle, (i + 1) as u16, pname, is_out)?;
        }
        // Delegate members are supplied by the runtime.
        if owner_genre == TypeGenre::Delegate {
            self.backend.set_impl_flags(handle, MethodImplFlags::RUNTIME)?;
        }
        self.state.symbols.method_mut(sym).runtime = Some(handle);
        Ok(())
    }

    fn define_field_symbol(&mut self, owner_rt: RtType, sym: SymbolId) -> Result<(), BackendError> {
        let (field_ty, mods, is_static, already) = match &self.state.symbols.get(sym).kind {
            SymKind::Field(f) => (f.ty, f.mods, f.is_static, f.runtime.is_some()),
            _ => return Ok(()),
        };
        if already {
            return Ok(());
        }
        let name = self.state.symbols.get(sym).name.clone();
        let field_rt = self.rt_type(field_ty)?;
        let mut attrs = field_access_attrs(mods);
        if is_static {
            attrs |= FieldAttrs::STATIC;
        }
        if mods.contains(Modifiers::READONLY) {
            attrs |= FieldAttrs::INIT_ONLY;
        }
        let handle = self.backend.define_field(owner_rt, &name, field_rt, attrs)?;
        if let SymKind::Field(f) = &mut self.state.symbols.get_mut(sym).kind {
            f.runtime = Some(handle);
        }
        Ok(())
    }

    fn define_literal_symbol(
        &mut self,
        owner_rt: RtType,
        owner: TypeId,
        sym: SymbolId,
    ) -> Result<(), BackendError> {
        let (field_ty, value, already) = match &self.state.symbols.get(sym).kind {
            SymKind::LiteralField(f) => (f.ty, f.value, f.runtime.is_some()),
            _ => return Ok(()),
        };
        if already {
            return Ok(());
        }
        let name = self.state.symbols.get(sym).name.clone();
        let _ = owner;
        let field_rt = self.rt_type(field_ty)?;
        let attrs = FieldAttrs::PUBLIC | FieldAttrs::STATIC | FieldAttrs::LITERAL;
        let handle = self
            .backend
            .define_literal_field(owner_rt, &name, field_rt, attrs, value)?;
        if let SymKind::LiteralField(f) = &mut self.state.symbols.get_mut(sym).kind {
            f.runtime = Some(handle);
        }
        Ok(())
    }

    // ---- bodies ----

    fn emit_type_bodies(&mut self, decl: &TypeDecl) -> Result<(), BackendError> {
        let Some(ty) = decl.sym else { return Ok(()) };
        let mut instance_inits: Vec<FieldInit<'_>> = Vec::new();
        let mut static_inits: Vec<FieldInit<'_>> = Vec::new();
        for member in &decl.members {
            if let Member::Field(field) = member {
                if let (Some(sym), Some(value)) = (field.sym, field.init.as_ref()) {
                    let is_static = field.mods.is_static();
                    if field.mods.contains(Modifiers::CONST) {
                        continue;
                    }
                    let init = FieldInit {
                        sym,
                        value,
                        is_static,
                    };
                    if is_static {
                        static_inits.push(init);
                    } else {
                        instance_inits.push(init);
                    }
                }
            }
        }
        let mut saw_instance_ctor = false;
        let mut saw_static_ctor = false;
        for member in &decl.members {
            match member {
                Member::Method(method) => {
                    if method.is_ctor {
                        if method.mods.is_static() {
                            saw_static_ctor = true;
                        } else {
                            saw_instance_ctor = true;
                        }
                    }
                    self.emit_method_decl(method, &instance_inits, &static_inits)?;
                }
                Member::Property(prop) => self.emit_accessor_bodies(prop)?,
                // Nested types appear in the flat declaration list and get
                // their own bodies pass.
                _ => {}
            }
        }
        // The implicit default constructor synthesized during linking.
        if !saw_instance_ctor && decl.kind == TypeKind::Class {
            if let Some(ctor) = self.find_bodiless_ctor(ty) {
                self.emit_default_ctor(ctor, &instance_inits)?;
            }
        }
        // Static initializers without an explicit static constructor get a
        // synthesized one.
        if !saw_static_ctor && !static_inits.is_empty() {
            self.emit_synthesized_cctor(ty, &static_inits)?;
        }
        Ok(())
    }

    fn find_bodiless_ctor(&mut self, ty: TypeId) -> Option<SymbolId> {
        let scope = self.state.symbols.ty(ty).member_scope?;
        let header_key = blue_resolver::ResolveState::header_key(".ctor");
        let header = self.state.scopes.get(scope, &header_key)?;
        match &self.state.symbols.get(header).kind {
            SymKind::MethodHeader(h) => h
                .overloads
                .iter()
                .copied()
                .find(|&m| self.state.symbols.method(m).params.is_empty()),
            _ => None,
        }
    }

    fn emit_method_decl(
        &mut self,
        decl: &MethodDecl,
        instance_inits: &[FieldInit<'_>],
        static_inits: &[FieldInit<'_>],
    ) -> Result<(), BackendError> {
        let Some(method) = decl.sym else {
            return Ok(());
        };
        let Some(body) = &decl.body else {
            return Ok(());
        };
        let inits: &[FieldInit<'_>] = if decl.is_ctor {
            if decl.mods.is_static() {
                static_inits
            } else if chains_to_this(body) {
                // `: this(...)` delegates; the target runs the inits.
                &[]
            } else {
                instance_inits
            }
        } else {
            &[]
        };
        self.emit_body(method, Some(body), inits)
    }

    fn emit_accessor_bodies(
        &mut self,
        prop: &blue_parser::ast::PropertyDecl,
    ) -> Result<(), BackendError> {
        let Some(prop_sym) = prop.sym else {
            return Ok(());
        };
        let (getter, setter) = match &self.state.symbols.get(prop_sym).kind {
            SymKind::Property(p) => (p.getter, p.setter),
            _ => return Ok(()),
        };
        if let (Some(accessor), Some(method)) = (&prop.getter, getter) {
            if let Some(body) = &accessor.body {
                self.emit_body(method, Some(body), &[])?;
            }
        }
        if let (Some(accessor), Some(method)) = (&prop.setter, setter) {
            if let Some(body) = &accessor.body {
                self.emit_body(method, Some(body), &[])?;
            }
        }
        Ok(())
    }

    fn emit_default_ctor(
        &mut self,
        ctor: SymbolId,
        inits: &[FieldInit<'_>],
    ) -> Result<(), BackendError> {
        self.emit_body(ctor, None, inits)
    }

    fn emit_synthesized_cctor(
        &mut self,
        ty: TypeId,
        inits: &[FieldInit<'_>],
    ) -> Result<(), BackendError> {
        let owner_rt = self.rt_type(ty)?;
        let handle = self.backend.define_ctor(
            owner_rt,
            MethodAttrs::PRIVATE | MethodAttrs::STATIC | MethodAttrs::SPECIAL_NAME,
            &[],
        )?;
        let sym = self.state.symbols.alloc(
            ".cctor",
            SourceSpan::synthetic(),
            SymKind::Method(blue_resolver::symbols::MethodSymbol {
                owner: ty,
                ret: None,
                params: smallvec::SmallVec::new(),
                flows: smallvec::SmallVec::new(),
                param_names: Vec::new(),
                is_ctor: true,
                is_static: true,
                is_virtual: false,
                is_override: false,
                is_abstract: false,
                is_special_name: true,
                mods: Modifiers::PRIVATE | Modifiers::STATIC,
                runtime: Some(handle),
            }),
        );
        self.emit_body(sym, None, inits)
    }

    // ---- finalization ----

    fn finalize_type(
        &mut self,
        ty: TypeId,
        by_name: &FxHashMap<String, TypeId>,
    ) -> Result<(), BackendError> {
        let full_name = self.state.symbols.ty(ty).full_name.clone();
        if self.create_stack.contains(&full_name) {
            // Already on the in-progress stack; the outer frame finishes it.
            return Ok(());
        }
        let handle = self.rt_type(ty)?;
        self.create_stack.push(full_name);
        let result = loop {
            match self.backend.create_type(handle) {
                Ok(CreateOutcome::Created) => break Ok(()),
                Ok(CreateOutcome::NeedsNested { short_name }) => {
                    // The callback hands back only the short name; compose
                    // the full name from the in-progress stack.
                    let parent = self.create_stack.last().cloned().unwrap_or_default();
                    let nested_full = format!("{parent}+{short_name}");
                    match by_name.get(&nested_full) {
                        Some(&nested) => self.finalize_type(nested, by_name)?,
                        None => {
                            break Err(BackendError::UnknownType(nested_full));
                        }
                    }
                }
                Err(err) => break Err(err),
            }
        };
        self.create_stack.pop();
        result
    }

    // ---- entry point ----

    fn find_entry_point(&mut self, decls: &[DeclRef<'_>]) -> Option<RtMethod> {
        let mut search: Vec<TypeId> = Vec::new();
        if let Some(main_class) = &self.opts.main_class {
            let found = decls.iter().filter_map(DeclRef::sym).find(|&ty| {
                let sym = self.state.symbols.ty(ty);
                sym.full_name == *main_class
                    || self.state.symbols.get(ty.symbol()).name == *main_class
            });
            match found {
                Some(ty) => search.push(ty),
                None => {
                    self.diags.add(blue_common::Diagnostic::spanless(
                        DiagnosticCode::EntryClassNotFound,
                        format!("entry class '{main_class}' was not found"),
                    ));
                    return None;
                }
            }
        } else {
            search.extend(decls.iter().filter_map(DeclRef::sym));
        }
        let mut candidates: Vec<SymbolId> = Vec::new();
        for ty in search {
            let Some(scope) = self.state.symbols.ty(ty).member_scope else {
                continue;
            };
            let header_key = blue_resolver::ResolveState::header_key("Main");
            if let Some(header) = self.state.scopes.get(scope, &header_key) {
                if let SymKind::MethodHeader(h) = &self.state.symbols.get(header).kind {
                    candidates.extend(
                        h.overloads
                            .iter()
                            .copied()
                            .filter(|&m| self.state.symbols.method(m).is_static),
                    );
                }
            }
        }
        match candidates.len() {
            0 => {
                self.diags.add(blue_common::Diagnostic::spanless(
                    DiagnosticCode::NoMain,
                    "no static 'Main' method was found",
                ));
                None
            }
            1 => match self.rt_method(candidates[0]) {
                Ok(handle) => Some(handle),
                Err(err) => {
                    self.backend_error(SourceSpan::synthetic(), &err);
                    None
                }
            },
            _ => {
                let list: Vec<String> = candidates
                    .iter()
                    .map(|&m| {
                        self.state
                            .full_name(self.state.symbols.method(m).owner)
                            .to_string()
                    })
                    .collect();
                self.diags.add(blue_common::Diagnostic::spanless(
                    DiagnosticCode::DuplicateMain,
                    format!("more than one static 'Main' method: {}", list.join(", ")),
                ));
                None
            }
        }
    }
}

fn access_attrs(mods: Modifiers) -> MethodAttrs {
    if mods.contains(Modifiers::PUBLIC) {
        MethodAttrs::PUBLIC
    } else if mods.contains(Modifiers::PROTECTED) {
        MethodAttrs::FAMILY
    } else if mods.contains(Modifiers::INTERNAL) {
        MethodAttrs::ASSEMBLY
    } else {
        MethodAttrs::PRIVATE
    }
}

fn field_access_attrs(mods: Modifiers) -> FieldAttrs {
    if mods.contains(Modifiers::PUBLIC) {
        FieldAttrs::PUBLIC
    } else if mods.contains(Modifiers::PROTECTED) {
        FieldAttrs::FAMILY
    } else if mods.contains(Modifiers::INTERNAL) {
        FieldAttrs::ASSEMBLY
    } else {
        FieldAttrs::PRIVATE
    }
}

fn chains_to_this(body: &blue_parser::ast::Block) -> bool {
    matches!(
        body.stmts.first().map(|s| &s.kind),
        Some(StmtKind::CtorChain(chain))
            if chain.kind == blue_parser::ast::CtorChainKind::This
    )
}

/// One declared type in source order.
pub(crate) enum DeclRef<'t> {
    Type(&'t TypeDecl),
    Enum(&'t blue_parser::ast::EnumDecl),
    Delegate(&'t blue_parser::ast::DelegateDecl),
}

impl DeclRef<'_> {
    pub(crate) fn sym(&self) -> Option<TypeId> {
        match self {
            DeclRef::Type(d) => d.sym,
            DeclRef::Enum(d) => d.sym,
            DeclRef::Delegate(d) => d.sym,
        }
    }

    pub(crate) fn span(&self) -> SourceSpan {
        match self {
            DeclRef::Type(d) => d.span,
            DeclRef::Enum(d) => d.span,
            DeclRef::Delegate(d) => d.span,
        }
    }
}

fn collect_types(program: &Program) -> Vec<DeclRef<'_>> {
    fn from_item<'t>(item: &'t TypeItem, out: &mut Vec<DeclRef<'t>>) {
        match item {
            TypeItem::Type(decl) => {
                out.push(DeclRef::Type(decl));
                for member in &decl.members {
                    if let Member::Nested(nested) = member {
                        from_item(nested, out);
                    }
                }
            }
            TypeItem::Enum(decl) => out.push(DeclRef::Enum(decl)),
            TypeItem::Delegate(decl) => out.push(DeclRef::Delegate(decl)),
        }
    }
    fn from_ns<'t>(ns: &'t Namespace, out: &mut Vec<DeclRef<'t>>) {
        for item in &ns.types {
            from_item(item, out);
        }
        for nested in &ns.namespaces {
            from_ns(nested, out);
        }
    }
    let mut out = Vec::new();
    for file in &program.files {
        from_ns(file, &mut out);
    }
    out
}
