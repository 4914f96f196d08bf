//! The reflection surface the type-import stage consumes.
//!
//! A `MetadataLoader` resolves referenced assemblies and enumerates their
//! types and members. Loaders return only public and family-visible
//! members; the importer wraps them in symbols and locks the scopes.
//!
//! Type references inside member signatures are spelled as full names with
//! `[]` for arrays, `&` for by-ref, and `+` for nested types.

use crate::backend::BackendError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssemblyRef(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportedGenre {
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
}

/// Eager per-type stub information.
#[derive(Clone, Debug)]
pub struct ImportedTypeInfo {
    /// Full name; nested types use `+` (`Outer+Inner`).
    pub full_name: String,
    pub genre: ImportedGenre,
    pub super_full_name: Option<String>,
    pub interfaces: Vec<String>,
    pub is_abstract: bool,
    pub is_sealed: bool,
}

#[derive(Clone, Debug)]
pub struct ImportedMethod {
    pub name: String,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_ctor: bool,
    pub is_special_name: bool,
    /// `None` for constructors and void returns.
    pub ret: Option<String>,
    pub params: Vec<String>,
}

#[derive(Clone, Debug)]
pub enum ImportedMember {
    Method(ImportedMethod),
    Field {
        name: String,
        ty: String,
        is_static: bool,
        is_readonly: bool,
        /// Compile-time constant; `Some` for literal fields.
        literal: Option<i32>,
    },
    Property {
        name: String,
        ty: String,
        is_static: bool,
        has_getter: bool,
        has_setter: bool,
        index_params: Vec<String>,
    },
    Event {
        name: String,
        ty: String,
    },
}

pub trait MetadataLoader {
    /// Resolve an assembly reference by display name.
    fn load_assembly(&mut self, name: &str) -> Result<AssemblyRef, BackendError>;

    /// Every public/family type of the assembly, for eager stub creation.
    fn public_types(&self, asm: AssemblyRef) -> Vec<ImportedTypeInfo>;

    /// Members of one type, fetched lazily on first use.
    fn type_members(&self, asm: AssemblyRef, full_name: &str) -> Option<Vec<ImportedMember>>;
}
