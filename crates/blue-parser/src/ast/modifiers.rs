//! Declaration modifiers as a bit-set.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u16 {
        const PUBLIC    = 1 << 0;
        const PRIVATE   = 1 << 1;
        const PROTECTED = 1 << 2;
        const INTERNAL  = 1 << 3;
        const STATIC    = 1 << 4;
        const VIRTUAL   = 1 << 5;
        const ABSTRACT  = 1 << 6;
        const OVERRIDE  = 1 << 7;
        const SEALED    = 1 << 8;
        const READONLY  = 1 << 9;
        const CONST     = 1 << 10;
        const NEW       = 1 << 11;
    }
}

impl Modifiers {
    /// The access-controlling subset.
    pub const ACCESS: Modifiers = Modifiers::PUBLIC
        .union(Modifiers::PRIVATE)
        .union(Modifiers::PROTECTED)
        .union(Modifiers::INTERNAL);

    #[must_use]
    pub fn is_public(self) -> bool {
        self.contains(Modifiers::PUBLIC)
    }

    #[must_use]
    pub fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    /// Dispatched through the v-table: `virtual`, `override`, or abstract.
    #[must_use]
    pub fn is_virtual_slot(self) -> bool {
        self.intersects(Modifiers::VIRTUAL | Modifiers::OVERRIDE | Modifiers::ABSTRACT)
    }
}
