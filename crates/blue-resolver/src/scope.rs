//! Scopes, shared symbol tables, and lookup controllers.
//!
//! A scope maps identifier strings to symbols and chains to a lexical
//! parent. Inherited-parent relations (super class, base interfaces,
//! using-clauses) are never stored on the scope itself; they are mediated
//! by the `LookupController` capability bound to it. Symbol tables live in
//! their own arena so two scopes can alias one table: namespace sections
//! of the same namespace share a table while carrying distinct using-
//! clause controllers, and an insertion through either view is visible
//! through both.

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use blue_common::{SymbolId, TypeId};

use crate::state::ResolveState;

/// Insertion-ordered symbol table (member order is observable in emission).
pub type SymbolTable = IndexMap<String, SymbolId, FxBuildHasher>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TableId(pub u32);

/// Capability answering "find `name` in this scope's inherited parents".
/// The lexical parent chain is the caller's business, not the controller's.
pub trait LookupController {
    fn lookup_inherited(&self, state: &ResolveState, name: &str) -> Option<SymbolId>;

    fn describe(&self) -> &'static str;
}

/// Scopes with no inherited parents (blocks, enums, plain namespaces).
pub struct NoInherit;

impl LookupController for NoInherit {
    fn lookup_inherited(&self, _state: &ResolveState, _name: &str) -> Option<SymbolId> {
        None
    }

    fn describe(&self) -> &'static str {
        "none"
    }
}

/// Class/struct member scopes: walk the super-class chain.
pub struct ClassLookup {
    pub ty: TypeId,
}

impl LookupController for ClassLookup {
    fn lookup_inherited(&self, state: &ResolveState, name: &str) -> Option<SymbolId> {
        let mut current = state.symbols.ty(self.ty).super_ty;
        let mut steps = 0usize;
        while let Some(ty) = current {
            if steps > crate::state::MAX_LOOKUP_WALK {
                break;
            }
            steps += 1;
            if let Some(scope) = state.symbols.ty(ty).member_scope {
                if let Some(sym) = state.scopes.get(scope, name) {
                    return Some(sym);
                }
            }
            current = state.symbols.ty(ty).super_ty;
        }
        None
    }

    fn describe(&self) -> &'static str {
        "class-super-chain"
    }
}

/// Interface member scopes: walk the base-interface tree.
pub struct InterfaceLookup {
    pub ty: TypeId,
}

impl LookupController for InterfaceLookup {
    fn lookup_inherited(&self, state: &ResolveState, name: &str) -> Option<SymbolId> {
        let mut queue: Vec<TypeId> = state.symbols.ty(self.ty).interfaces.clone();
        let mut seen = 0usize;
        while let Some(ty) = queue.pop() {
            if seen > crate::state::MAX_LOOKUP_WALK {
                break;
            }
            seen += 1;
            if let Some(scope) = state.symbols.ty(ty).member_scope {
                if let Some(sym) = state.scopes.get(scope, name) {
                    return Some(sym);
                }
            }
            queue.extend(state.symbols.ty(ty).interfaces.iter().copied());
        }
        None
    }

    fn describe(&self) -> &'static str {
        "interface-tree"
    }
}

/// Namespace sections: consult the scopes named by the section's
/// using-clauses, in clause order.
pub struct UsingLookup {
    pub usings: Vec<ScopeId>,
}

impl LookupController for UsingLookup {
    fn lookup_inherited(&self, state: &ResolveState, name: &str) -> Option<SymbolId> {
        for &scope in &self.usings {
            if let Some(sym) = state.scopes.get(scope, name) {
                return Some(sym);
            }
        }
        None
    }

    fn describe(&self) -> &'static str {
        "using-clauses"
    }
}

pub struct Scope {
    pub name: String,
    pub parent: Option<ScopeId>,
    pub table: TableId,
    pub locked: bool,
    pub controller: Box<dyn LookupController>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("table", &self.table)
            .field("locked", &self.locked)
            .field("controller", &self.controller.describe())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
    tables: Vec<SymbolTable>,
}

impl ScopeArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_scope(
        &mut self,
        name: impl Into<String>,
        parent: Option<ScopeId>,
        controller: Box<dyn LookupController>,
    ) -> ScopeId {
        let table = TableId(self.tables.len() as u32);
        self.tables.push(SymbolTable::default());
        self.new_shared_scope(name, parent, table, controller)
    }

    /// A scope aliasing an existing table (namespace sections).
    pub fn new_shared_scope(
        &mut self,
        name: impl Into<String>,
        parent: Option<ScopeId>,
        table: TableId,
        controller: Box<dyn LookupController>,
    ) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            name: name.into(),
            parent,
            table,
            locked: false,
            controller,
        });
        id
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn set_controller(&mut self, id: ScopeId, controller: Box<dyn LookupController>) {
        self.scopes[id.0 as usize].controller = controller;
    }

    /// Insert under `key`. Returns the already-present symbol on conflict.
    /// Locked scopes are never mutated.
    pub fn insert(&mut self, id: ScopeId, key: impl Into<String>, sym: SymbolId) -> Result<(), SymbolId> {
        let scope = &self.scopes[id.0 as usize];
        debug_assert!(!scope.locked, "insertion into a locked scope");
        if scope.locked {
            return Ok(());
        }
        let table = &mut self.tables[scope.table.0 as usize];
        let key = key.into();
        if let Some(&existing) = table.get(&key) {
            return Err(existing);
        }
        table.insert(key, sym);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: ScopeId, key: &str) -> Option<SymbolId> {
        let scope = &self.scopes[id.0 as usize];
        self.tables[scope.table.0 as usize].get(key).copied()
    }

    /// Symbols in insertion order.
    pub fn entries(&self, id: ScopeId) -> impl Iterator<Item = (&str, SymbolId)> {
        let scope = &self.scopes[id.0 as usize];
        self.tables[scope.table.0 as usize]
            .iter()
            .map(|(k, &v)| (k.as_str(), v))
    }

    pub fn lock(&mut self, id: ScopeId) {
        self.scopes[id.0 as usize].locked = true;
    }

    #[must_use]
    pub fn table_of(&self, id: ScopeId) -> TableId {
        self.scopes[id.0 as usize].table
    }
}
