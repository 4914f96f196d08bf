//! Source location tracking for tokens, AST nodes, and diagnostics.
//!
//! The scanner tracks line/column positions directly while lexing, so spans
//! store line/column pairs rather than byte offsets. Spans are small and
//! cheap to copy.

use serde::{Deserialize, Serialize};

use crate::source_map::FileId;

/// A position in a source file (1-indexed line and column).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pos {
    /// 1-indexed line number
    pub line: u32,
    /// 1-indexed column
    pub col: u32,
}

impl Pos {
    #[inline]
    #[must_use]
    pub const fn new(line: u32, col: u32) -> Self {
        Pos { line, col }
    }
}

/// A range of source text: file plus inclusive start and end positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    pub file: FileId,
    pub start: Pos,
    pub end: Pos,
}

impl SourceSpan {
    #[inline]
    #[must_use]
    pub const fn new(file: FileId, start: Pos, end: Pos) -> Self {
        SourceSpan { file, start, end }
    }

    /// A span for nodes synthesized during resolution; never shown to users.
    #[inline]
    #[must_use]
    pub const fn synthetic() -> Self {
        SourceSpan {
            file: FileId::SYNTHETIC,
            start: Pos::new(0, 0),
            end: Pos::new(0, 0),
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_synthetic(&self) -> bool {
        self.file.is_synthetic()
    }

    /// The smallest span covering both `self` and `other`.
    /// Both spans must come from the same file.
    #[must_use]
    pub fn to(self, other: SourceSpan) -> SourceSpan {
        if self.is_synthetic() {
            return other;
        }
        if other.is_synthetic() {
            return self;
        }
        SourceSpan {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covering_span_orders_endpoints() {
        let f = FileId::from_raw(0);
        let a = SourceSpan::new(f, Pos::new(1, 4), Pos::new(1, 9));
        let b = SourceSpan::new(f, Pos::new(3, 1), Pos::new(3, 2));
        let c = a.to(b);
        assert_eq!(c.start, Pos::new(1, 4));
        assert_eq!(c.end, Pos::new(3, 2));
        assert_eq!(b.to(a), c);
    }

    #[test]
    fn synthetic_spans_are_absorbed() {
        let f = FileId::from_raw(2);
        let real = SourceSpan::new(f, Pos::new(2, 1), Pos::new(2, 5));
        assert_eq!(SourceSpan::synthetic().to(real), real);
        assert_eq!(real.to(SourceSpan::synthetic()), real);
    }
}
