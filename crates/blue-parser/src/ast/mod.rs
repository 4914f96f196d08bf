//! The abstract syntax tree.
//!
//! One `Program` holds the file-level namespace of every source file.
//! Declarations carry resolved-symbol slots (`sym`) the resolver fills in;
//! namespace nodes carry a `SectionId` the resolver uses to attach each
//! section's scope (sections of the same namespace share a symbol table but
//! have distinct using-clause sets).

pub mod expr;
pub mod modifiers;
pub mod stmt;
pub mod types;

pub use expr::*;
pub use modifiers::Modifiers;
pub use stmt::*;
pub use types::{TypeRef, TypeRefKind};

use blue_common::{SourceSpan, SymbolId, TypeId};

/// Identity of one namespace section (one syntactic `namespace` block, or a
/// file's top level).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SectionId(pub u32);

/// Generator for section ids, shared across all files of a compilation.
#[derive(Debug, Default)]
pub struct SectionIdGen {
    next: u32,
}

impl SectionIdGen {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> SectionId {
        let id = SectionId(self.next);
        self.next += 1;
        id
    }
}

/// A whole compilation: the combined ASTs of every source file.
#[derive(Debug, Default)]
pub struct Program {
    /// One file-level namespace section per source file.
    pub files: Vec<Namespace>,
}

#[derive(Clone, Debug)]
pub struct UsingClause {
    pub span: SourceSpan,
    pub path: Vec<String>,
}

/// A namespace section: the file level (empty `name`) or one
/// `namespace N { ... }` block.
#[derive(Debug)]
pub struct Namespace {
    pub section: SectionId,
    pub span: SourceSpan,
    /// Dotted name parts; empty for the file level.
    pub name: Vec<String>,
    pub usings: Vec<UsingClause>,
    pub namespaces: Vec<Namespace>,
    pub types: Vec<TypeItem>,
}

#[derive(Debug)]
pub enum TypeItem {
    Type(TypeDecl),
    Enum(EnumDecl),
    Delegate(DelegateDecl),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
}

#[derive(Debug)]
pub struct TypeDecl {
    pub span: SourceSpan,
    pub kind: TypeKind,
    pub mods: Modifiers,
    pub name: String,
    /// Base class and/or implemented interfaces, in source order.
    pub bases: Vec<TypeRef>,
    pub members: Vec<Member>,
    pub sym: Option<TypeId>,
}

#[derive(Debug)]
pub struct EnumDecl {
    pub span: SourceSpan,
    pub mods: Modifiers,
    pub name: String,
    pub members: Vec<EnumMember>,
    pub sym: Option<TypeId>,
}

#[derive(Debug)]
pub struct EnumMember {
    pub span: SourceSpan,
    pub name: String,
    pub value: Option<Expr>,
    pub sym: Option<SymbolId>,
}

#[derive(Debug)]
pub struct DelegateDecl {
    pub span: SourceSpan,
    pub mods: Modifiers,
    pub name: String,
    pub ret: TypeRef,
    pub params: Vec<Param>,
    pub sym: Option<TypeId>,
}

#[derive(Debug)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Property(PropertyDecl),
    Event(EventDecl),
    Nested(TypeItem),
}

#[derive(Debug)]
pub struct FieldDecl {
    pub span: SourceSpan,
    pub mods: Modifiers,
    pub ty: TypeRef,
    pub name: String,
    pub init: Option<Expr>,
    pub sym: Option<SymbolId>,
}

#[derive(Debug)]
pub struct MethodDecl {
    pub span: SourceSpan,
    pub mods: Modifiers,
    /// `None` for constructors.
    pub ret: Option<TypeRef>,
    pub name: String,
    pub params: Vec<Param>,
    /// `None` for abstract and interface methods.
    pub body: Option<Block>,
    pub is_ctor: bool,
    /// Operator overloads and property/indexer accessors.
    pub is_special: bool,
    pub sym: Option<SymbolId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamFlow {
    In,
    Out,
    Ref,
}

#[derive(Debug)]
pub struct Param {
    pub span: SourceSpan,
    pub name: String,
    pub ty: TypeRef,
    pub flow: ParamFlow,
    pub sym: Option<SymbolId>,
}

#[derive(Debug)]
pub struct AccessorDecl {
    pub span: SourceSpan,
    /// `None` in interfaces.
    pub body: Option<Block>,
}

#[derive(Debug)]
pub struct PropertyDecl {
    pub span: SourceSpan,
    pub mods: Modifiers,
    pub ty: TypeRef,
    /// `Item` for indexers.
    pub name: String,
    /// Indexer parameters; empty for plain properties.
    pub params: Vec<Param>,
    pub getter: Option<AccessorDecl>,
    pub setter: Option<AccessorDecl>,
    pub sym: Option<SymbolId>,
}

#[derive(Debug)]
pub struct EventDecl {
    pub span: SourceSpan,
    pub mods: Modifiers,
    pub ty: TypeRef,
    pub name: String,
    pub sym: Option<SymbolId>,
}

/// The special name indexers declare under.
pub const INDEXER_NAME: &str = "Item";

impl TypeItem {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            TypeItem::Type(t) => &t.name,
            TypeItem::Enum(e) => &e.name,
            TypeItem::Delegate(d) => &d.name,
        }
    }

    #[must_use]
    pub fn span(&self) -> SourceSpan {
        match self {
            TypeItem::Type(t) => t.span,
            TypeItem::Enum(e) => e.span,
            TypeItem::Delegate(d) => d.span,
        }
    }
}
