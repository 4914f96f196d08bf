//! Shared symbol identifiers.
//!
//! These live in blue-common so the parser's AST can carry resolved-symbol
//! slots without depending on the resolver crate, keeping the pipeline
//! crates free of dependency cycles.

use serde::{Deserialize, Serialize};

/// Index into the resolver's symbol arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(u32);

impl SymbolId {
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        SymbolId(raw)
    }

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A `SymbolId` known to refer to a type symbol.
///
/// Array and by-ref types are interned by the resolver, so two occurrences
/// of the same type always compare equal by id. All type checks (including
/// assignability) go through `TypeId` equality.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub SymbolId);

impl TypeId {
    #[inline]
    #[must_use]
    pub const fn symbol(self) -> SymbolId {
        self.0
    }
}
