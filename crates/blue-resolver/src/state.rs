//! `ResolveState` - the scope tree, symbol arena, and type identity maps
//! shared by every resolution pass and read by the emitter.

use rustc_hash::FxHashMap;

use blue_common::{SourceSpan, SymbolId, TypeId};
use blue_parser::ast::{Modifiers, SectionId};
use blue_runtime::RtMethod;

use crate::scope::{NoInherit, ScopeArena, ScopeId};
use crate::symbols::{SymKind, SymbolArena, TypeGenre, TypeSymbol};

/// Upper bound on scope/super-chain walks; a cycle that slipped past the
/// link pass must not hang the compiler.
pub const MAX_LOOKUP_WALK: usize = 10_000;

/// Ids of the types the language itself depends on, filled in after the
/// core library import. `error` is the poison type used to silence
/// cascading diagnostics.
#[derive(Clone, Copy, Debug)]
pub struct WellKnown {
    pub error: TypeId,
    pub object: TypeId,
    pub string: TypeId,
    pub int: TypeId,
    pub char: TypeId,
    pub bool_ty: TypeId,
    pub void: TypeId,
    pub value_type: TypeId,
    pub enum_ty: TypeId,
    pub array: TypeId,
    pub exception: TypeId,
    pub delegate: TypeId,
    pub multicast: TypeId,
    pub type_ty: TypeId,
    pub runtime_handle: TypeId,
    pub intptr: TypeId,
}

#[derive(Debug)]
pub struct ResolveState {
    pub symbols: SymbolArena,
    pub scopes: ScopeArena,
    /// The single root scope.
    pub global: ScopeId,
    pub well_known: WellKnown,
    /// Section scopes keyed by the AST namespace-section id.
    pub sections: FxHashMap<SectionId, ScopeId>,
    /// Canonical array types: (element, rank) -> array type.
    arrays: FxHashMap<(TypeId, u32), TypeId>,
    /// Canonical by-ref types: element -> ref type.
    refs: FxHashMap<TypeId, TypeId>,
}

impl ResolveState {
    #[must_use]
    pub fn new() -> Self {
        let mut symbols = SymbolArena::new();
        let mut scopes = ScopeArena::new();
        let global = scopes.new_scope("<global>", None, Box::new(NoInherit));
        // The poison type; reachable from no scope.
        let error = TypeId(symbols.alloc(
            "<error>",
            SourceSpan::synthetic(),
            SymKind::Type(TypeSymbol {
                genre: TypeGenre::Class,
                full_name: "<error>".to_string(),
                super_ty: None,
                interfaces: Vec::new(),
                containing: None,
                member_scope: None,
                mods: Modifiers::PUBLIC,
                is_imported: false,
                is_init: true,
                elem: None,
                rank: 0,
                import_asm: None,
                members_resolved: true,
                runtime: None,
            }),
        ));
        let well_known = WellKnown {
            error,
            object: error,
            string: error,
            int: error,
            char: error,
            bool_ty: error,
            void: error,
            value_type: error,
            enum_ty: error,
            array: error,
            exception: error,
            delegate: error,
            multicast: error,
            type_ty: error,
            runtime_handle: error,
            intptr: error,
        };
        ResolveState {
            symbols,
            scopes,
            global,
            well_known,
            sections: FxHashMap::default(),
            arrays: FxHashMap::default(),
            refs: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn is_error(&self, ty: TypeId) -> bool {
        ty == self.well_known.error
    }

    // ---- canonical constructed types ----

    /// The canonical array type over `elem`; super is System.Array.
    pub fn array_of(&mut self, elem: TypeId, rank: u32) -> TypeId {
        if let Some(&existing) = self.arrays.get(&(elem, rank)) {
            return existing;
        }
        let full_name = format!("{}[]", self.symbols.ty(elem).full_name);
        let id = TypeId(self.symbols.alloc(
            full_name.clone(),
            SourceSpan::synthetic(),
            SymKind::Type(TypeSymbol {
                genre: TypeGenre::Array,
                full_name,
                super_ty: Some(self.well_known.array),
                interfaces: Vec::new(),
                containing: None,
                member_scope: None,
                mods: Modifiers::PUBLIC,
                is_imported: false,
                is_init: true,
                elem: Some(elem),
                rank,
                import_asm: None,
                members_resolved: true,
                runtime: None,
            }),
        ));
        self.arrays.insert((elem, rank), id);
        id
    }

    /// The canonical by-ref type over `inner`. Never wraps a ref type;
    /// the inner ref is stripped first.
    pub fn ref_of(&mut self, inner: TypeId) -> TypeId {
        let inner = self.strip_ref(inner);
        if let Some(&existing) = self.refs.get(&inner) {
            return existing;
        }
        let full_name = format!("{}&", self.symbols.ty(inner).full_name);
        let id = TypeId(self.symbols.alloc(
            full_name.clone(),
            SourceSpan::synthetic(),
            SymKind::Type(TypeSymbol {
                genre: TypeGenre::Ref,
                full_name,
                super_ty: None,
                interfaces: Vec::new(),
                containing: None,
                member_scope: None,
                mods: Modifiers::PUBLIC,
                is_imported: false,
                is_init: true,
                elem: Some(inner),
                rank: 0,
                import_asm: None,
                members_resolved: true,
                runtime: None,
            }),
        ));
        self.refs.insert(inner, id);
        id
    }

    #[must_use]
    pub fn strip_ref(&self, ty: TypeId) -> TypeId {
        let sym = self.symbols.ty(ty);
        if sym.genre == TypeGenre::Ref {
            sym.elem.unwrap_or(ty)
        } else {
            ty
        }
    }

    #[must_use]
    pub fn is_value_type(&self, ty: TypeId) -> bool {
        self.symbols.ty(ty).genre.is_value_type()
    }

    #[must_use]
    pub fn full_name(&self, ty: TypeId) -> &str {
        &self.symbols.ty(ty).full_name
    }

    // ---- lookup ----

    /// Look `name` up starting at `scope`: each scope's own table first,
    /// then its inherited parents via the lookup controller, then the
    /// lexical parent.
    #[must_use]
    pub fn smart_lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        let mut steps = 0usize;
        while let Some(id) = current {
            if steps > MAX_LOOKUP_WALK {
                break;
            }
            steps += 1;
            if let Some(sym) = self.scopes.get(id, name) {
                return Some(sym);
            }
            if let Some(sym) = self.scopes.scope(id).controller.lookup_inherited(self, name) {
                return Some(sym);
            }
            current = self.scopes.scope(id).parent;
        }
        None
    }

    /// Member lookup on a type: the type's own scope, then its super
    /// chain (classes) or base-interface tree (interfaces). Pure; lazy
    /// import population must have run for the chain.
    #[must_use]
    pub fn lookup_member(&self, ty: TypeId, name: &str) -> Option<SymbolId> {
        let mut steps = 0usize;
        let mut queue: Vec<TypeId> = vec![ty];
        while let Some(t) = queue.pop() {
            if steps > MAX_LOOKUP_WALK {
                break;
            }
            steps += 1;
            let sym = self.symbols.ty(t);
            if let Some(scope) = sym.member_scope {
                if let Some(found) = self.scopes.get(scope, name) {
                    return Some(found);
                }
            }
            if let Some(super_ty) = sym.super_ty {
                queue.push(super_ty);
            }
            if sym.genre == TypeGenre::Interface {
                queue.extend(sym.interfaces.iter().copied());
            }
        }
        None
    }

    // ---- inheritance predicates ----

    /// Is `a` a (transitive, proper) subclass of `b`?
    #[must_use]
    pub fn subclass_of(&self, a: TypeId, b: TypeId) -> bool {
        let mut current = self.symbols.ty(a).super_ty;
        let mut steps = 0usize;
        while let Some(ty) = current {
            if steps > MAX_LOOKUP_WALK {
                return false;
            }
            steps += 1;
            if ty == b {
                return true;
            }
            current = self.symbols.ty(ty).super_ty;
        }
        false
    }

    /// Does `b` appear in the transitive closure of `a`'s implemented
    /// interfaces (including via super classes and base interfaces)?
    #[must_use]
    pub fn implements(&self, a: TypeId, b: TypeId) -> bool {
        let mut queue = vec![a];
        let mut steps = 0usize;
        while let Some(ty) = queue.pop() {
            if steps > MAX_LOOKUP_WALK {
                return false;
            }
            steps += 1;
            let sym = self.symbols.ty(ty);
            for &iface in &sym.interfaces {
                if iface == b {
                    return true;
                }
                queue.push(iface);
            }
            if let Some(super_ty) = sym.super_ty {
                queue.push(super_ty);
            }
        }
        false
    }

    /// Every base interface of `ty`, transitively (including through the
    /// super-class chain), deduplicated in discovery order.
    #[must_use]
    pub fn all_interfaces(&self, ty: TypeId) -> Vec<TypeId> {
        let mut out = Vec::new();
        let mut queue = vec![ty];
        let mut steps = 0usize;
        while let Some(t) = queue.pop() {
            if steps > MAX_LOOKUP_WALK {
                break;
            }
            steps += 1;
            let sym = self.symbols.ty(t);
            for &iface in &sym.interfaces {
                if !out.contains(&iface) {
                    out.push(iface);
                    queue.push(iface);
                }
            }
            if let Some(super_ty) = sym.super_ty {
                queue.push(super_ty);
            }
        }
        out
    }

    // ---- decorated names ----

    /// The exact-match key for overload resolution: `name:T1;T2;`.
    #[must_use]
    pub fn decorated_name(&self, name: &str, params: &[TypeId]) -> String {
        let mut key = String::with_capacity(name.len() + params.len() * 8 + 1);
        key.push_str(name);
        key.push(':');
        for &p in params {
            key.push_str(self.full_name(p));
            key.push(';');
        }
        key
    }

    /// Key a method header is filed under in a type scope.
    #[must_use]
    pub fn header_key(name: &str) -> String {
        format!("<header>{name}")
    }

    /// Find the method symbol of a running compilation by runtime handle;
    /// test support.
    #[must_use]
    pub fn method_by_runtime(&self, handle: RtMethod) -> Option<SymbolId> {
        (0..self.symbols.len()).find_map(|i| {
            let id = SymbolId::from_raw(i as u32);
            match &self.symbols.get(id).kind {
                SymKind::Method(m) if m.runtime == Some(handle) => Some(id),
                _ => None,
            }
        })
    }
}

impl Default for ResolveState {
    fn default() -> Self {
        Self::new()
    }
}
