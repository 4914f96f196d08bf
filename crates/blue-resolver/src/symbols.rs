//! The symbol arena.
//!
//! Every named entity the compiler knows about lives in one `SymbolArena`
//! addressed by `SymbolId`; types are additionally addressed as `TypeId`
//! (a checked wrapper over the same id space). Symbols hold a single
//! mutable runtime-handle slot each, assigned by the emitter; the resolver
//! never mutates symbol identity after its pass completes.

use smallvec::SmallVec;

use blue_common::{SourceSpan, SymbolId, TypeId};
use blue_parser::ast::{Modifiers, ParamFlow};
use blue_runtime::{AssemblyRef, RtField, RtLabel, RtMethod, RtType};

use crate::scope::ScopeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeGenre {
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
    Array,
    /// By-ref wrapper; never wraps another `Ref`.
    Ref,
}

impl TypeGenre {
    #[must_use]
    pub fn is_value_type(self) -> bool {
        matches!(self, TypeGenre::Struct | TypeGenre::Enum)
    }

    #[must_use]
    pub fn is_reference_type(self) -> bool {
        matches!(
            self,
            TypeGenre::Class | TypeGenre::Interface | TypeGenre::Delegate | TypeGenre::Array
        )
    }
}

/// A type symbol. Two-phase: pass A allocates the stub, pass A.2 links
/// super/interfaces and flips `is_init`. No operation beyond stub identity
/// may be used before `is_init`.
#[derive(Debug)]
pub struct TypeSymbol {
    pub genre: TypeGenre,
    /// Dotted full name; nested types use `+`.
    pub full_name: String,
    /// `None` for System.Object, interfaces, and unlinked stubs.
    pub super_ty: Option<TypeId>,
    pub interfaces: Vec<TypeId>,
    /// Weak backref to the containing type for nested types.
    pub containing: Option<TypeId>,
    /// Member scope; created lazily for imported types.
    pub member_scope: Option<ScopeId>,
    pub mods: Modifiers,
    pub is_imported: bool,
    pub is_init: bool,
    /// Element type for `Array` and `Ref` genres.
    pub elem: Option<TypeId>,
    /// Dimension for `Array`.
    pub rank: u32,
    /// Source assembly for imported types (lazy member population).
    pub import_asm: Option<AssemblyRef>,
    /// Lazy member population has run.
    pub members_resolved: bool,
    pub runtime: Option<RtType>,
}

#[derive(Debug)]
pub struct MethodSymbol {
    pub owner: TypeId,
    /// `None` for constructors; `Some(void)` for void methods.
    pub ret: Option<TypeId>,
    /// Parameter types; by-ref parameters appear as `Ref` types.
    pub params: SmallVec<[TypeId; 4]>,
    pub flows: SmallVec<[ParamFlow; 4]>,
    pub param_names: Vec<String>,
    pub is_ctor: bool,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_abstract: bool,
    pub is_special_name: bool,
    pub mods: Modifiers,
    pub runtime: Option<RtMethod>,
}

/// Per-(type, name) index of that name's overloads; a cheap existence
/// check before the full overload walk.
#[derive(Debug, Default)]
pub struct MethodHeader {
    pub overloads: Vec<SymbolId>,
}

#[derive(Debug)]
pub struct FieldSymbol {
    pub owner: TypeId,
    pub ty: TypeId,
    pub mods: Modifiers,
    pub is_static: bool,
    pub runtime: Option<RtField>,
}

/// Compile-time-constant field (enum members, `const` declarations).
#[derive(Debug)]
pub struct LiteralFieldSymbol {
    pub owner: TypeId,
    pub ty: TypeId,
    pub value: i32,
    pub runtime: Option<RtField>,
}

#[derive(Debug)]
pub struct PropertySymbol {
    pub owner: TypeId,
    pub ty: TypeId,
    pub is_static: bool,
    /// `get_X` / `set_X` accessor method symbols.
    pub getter: Option<SymbolId>,
    pub setter: Option<SymbolId>,
}

#[derive(Debug)]
pub struct EventSymbol {
    pub owner: TypeId,
    pub ty: TypeId,
    pub mods: Modifiers,
    pub is_static: bool,
    pub runtime: Option<RtField>,
}

#[derive(Debug)]
pub struct LocalSymbol {
    pub ty: TypeId,
    /// Slot number, assigned at emit.
    pub slot: Option<u16>,
}

#[derive(Debug)]
pub struct ParamSymbol {
    /// Declared type; by-ref parameters carry the `Ref` wrapper here.
    pub ty: TypeId,
    pub flow: ParamFlow,
    /// Zero-based index among declared parameters (`this` not counted).
    pub index: u16,
}

#[derive(Debug, Default)]
pub struct LabelSymbol {
    /// Codegen cookie, set at emit.
    pub runtime: Option<RtLabel>,
}

#[derive(Debug)]
pub struct NamespaceSymbol {
    pub scope: ScopeId,
    pub full_name: String,
}

#[derive(Debug)]
pub enum SymKind {
    Type(TypeSymbol),
    Method(MethodSymbol),
    MethodHeader(MethodHeader),
    Field(FieldSymbol),
    LiteralField(LiteralFieldSymbol),
    Property(PropertySymbol),
    Event(EventSymbol),
    Local(LocalSymbol),
    Param(ParamSymbol),
    Label(LabelSymbol),
    Namespace(NamespaceSymbol),
}

#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub span: SourceSpan,
    pub kind: SymKind,
}

#[derive(Debug, Default)]
pub struct SymbolArena {
    symbols: Vec<Symbol>,
}

impl SymbolArena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, name: impl Into<String>, span: SourceSpan, kind: SymKind) -> SymbolId {
        let id = SymbolId::from_raw(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: name.into(),
            span,
            kind,
        });
        id
    }

    #[must_use]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    #[must_use]
    pub fn ty(&self, id: TypeId) -> &TypeSymbol {
        match &self.get(id.symbol()).kind {
            SymKind::Type(t) => t,
            other => panic!("symbol is not a type: {other:?}"),
        }
    }

    pub fn ty_mut(&mut self, id: TypeId) -> &mut TypeSymbol {
        match &mut self.get_mut(id.symbol()).kind {
            SymKind::Type(t) => t,
            other => panic!("symbol is not a type: {other:?}"),
        }
    }

    #[must_use]
    pub fn method(&self, id: SymbolId) -> &MethodSymbol {
        match &self.get(id).kind {
            SymKind::Method(m) => m,
            other => panic!("symbol is not a method: {other:?}"),
        }
    }

    pub fn method_mut(&mut self, id: SymbolId) -> &mut MethodSymbol {
        match &mut self.get_mut(id).kind {
            SymKind::Method(m) => m,
            other => panic!("symbol is not a method: {other:?}"),
        }
    }

    #[must_use]
    pub fn as_type(&self, id: SymbolId) -> Option<TypeId> {
        match &self.get(id).kind {
            SymKind::Type(_) => Some(TypeId(id)),
            _ => None,
        }
    }
}
