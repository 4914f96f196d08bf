//! Syntactic type references.
//!
//! A `TypeRef` is what the parser saw; the resolver fills `resolved` with
//! the canonical `TypeId`. The `Resolved` variant is a flyweight used when
//! desugaring synthesizes a reference to an already-known type symbol.

use blue_common::{SourceSpan, TypeId};

#[derive(Clone, Debug)]
pub struct TypeRef {
    pub span: SourceSpan,
    pub kind: TypeRefKind,
    pub resolved: Option<TypeId>,
}

#[derive(Clone, Debug)]
pub enum TypeRefKind {
    /// A possibly-dotted name: `Foo`, `System.Console`. Primitive keywords
    /// (`int`, `string`, ...) arrive here already spelled as their alias.
    Named(Vec<String>),
    /// `T[]`, `T[,]`, ... with the element type and rank.
    Array { elem: Box<TypeRef>, rank: u32 },
    /// By-ref parameter type; never wraps another `Ref`.
    Ref(Box<TypeRef>),
    /// Flyweight over an existing type symbol (synthesized nodes only).
    Resolved(TypeId),
}

impl TypeRef {
    #[must_use]
    pub fn named(span: SourceSpan, parts: Vec<String>) -> Self {
        TypeRef {
            span,
            kind: TypeRefKind::Named(parts),
            resolved: None,
        }
    }

    #[must_use]
    pub fn simple(span: SourceSpan, name: &str) -> Self {
        TypeRef::named(span, vec![name.to_string()])
    }

    #[must_use]
    pub fn array(span: SourceSpan, elem: TypeRef, rank: u32) -> Self {
        TypeRef {
            span,
            kind: TypeRefKind::Array {
                elem: Box::new(elem),
                rank,
            },
            resolved: None,
        }
    }

    #[must_use]
    pub fn of(ty: TypeId) -> Self {
        TypeRef {
            span: SourceSpan::synthetic(),
            kind: TypeRefKind::Resolved(ty),
            resolved: Some(ty),
        }
    }

    /// The resolved type, if resolution has run and succeeded.
    #[must_use]
    pub fn ty(&self) -> Option<TypeId> {
        match self.kind {
            TypeRefKind::Resolved(ty) => Some(ty),
            _ => self.resolved,
        }
    }
}
