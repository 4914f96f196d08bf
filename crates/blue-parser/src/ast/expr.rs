//! Expression nodes.
//!
//! Every expression carries its source span, a `ty` slot the resolver fills
//! (non-null for every resolved expression except the `null` literal), and
//! kind-specific resolved-symbol slots.

use blue_common::{SourceSpan, SymbolId, TypeId};

use crate::ast::types::TypeRef;

#[derive(Clone, Debug)]
pub struct Expr {
    pub span: SourceSpan,
    /// Resolved type. `None` before resolution and for the `null` literal.
    pub ty: Option<TypeId>,
    pub kind: ExprKind,
}

impl Expr {
    #[must_use]
    pub fn new(span: SourceSpan, kind: ExprKind) -> Self {
        Expr {
            span,
            ty: None,
            kind,
        }
    }

    #[must_use]
    pub fn typed(span: SourceSpan, ty: TypeId, kind: ExprKind) -> Self {
        Expr {
            span,
            ty: Some(ty),
            kind,
        }
    }
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Int(i64),
    Char(char),
    Bool(bool),
    Str(String),
    Null,

    This,
    /// `base`; legal only as the receiver of a call or member access.
    Base,

    /// Bare identifier; the resolver rewrites it into a binding.
    Name(NameExpr),
    /// `target.name`
    Member(MemberExpr),
    Call(CallExpr),
    /// Reference to a method group bound for delegate construction;
    /// created by the resolver, never by the parser.
    MethodPtr(MethodPtrExpr),
    New(NewExpr),
    NewArray(NewArrayExpr),
    Index(IndexExpr),
    Cast(CastExpr),
    Is { expr: Box<Expr>, ty: TypeRef },
    As { expr: Box<Expr>, ty: TypeRef },
    TypeOf { ty: TypeRef },
    Cond {
        cond: Box<Expr>,
        then_e: Box<Expr>,
        else_e: Box<Expr>,
    },
    Binary(BinaryExpr),
    Unary { op: UnOp, expr: Box<Expr> },
    /// `ref x` / `out x` argument wrapper at a call site.
    Arg { flow: ArgFlow, expr: Box<Expr> },

    // Statement-expressions: usable as a statement or (assignment only)
    // as an expression.
    Assign(AssignExpr),
    IncDec(IncDecExpr),
}

/// What a name or member access resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    Local(SymbolId),
    Param(SymbolId),
    /// Field access; `implicit_this` distinguishes `x` from `obj.x`.
    Field(SymbolId),
    Property(SymbolId),
    Event(SymbolId),
    LiteralField(SymbolId),
    Type(TypeId),
    Namespace(SymbolId),
}

#[derive(Clone, Debug)]
pub struct NameExpr {
    pub name: String,
    pub binding: Option<Binding>,
}

#[derive(Clone, Debug)]
pub struct MemberExpr {
    pub target: Box<Expr>,
    pub name: String,
    pub binding: Option<Binding>,
}

#[derive(Clone, Debug)]
pub struct CallExpr {
    /// A `Name`, `Member`, or `Base` expression naming the method group.
    pub target: Box<Expr>,
    pub args: Vec<Expr>,
    /// Chosen overload.
    pub method: Option<SymbolId>,
    /// False for `base.X(...)` and non-virtual targets.
    pub polymorphic: bool,
}

#[derive(Clone, Debug)]
pub struct MethodPtrExpr {
    /// Receiver, when the bound method is an instance method.
    pub target: Option<Box<Expr>>,
    pub method: SymbolId,
}

#[derive(Clone, Debug)]
pub struct NewExpr {
    pub ty: TypeRef,
    pub args: Vec<Expr>,
    /// Chosen constructor; `None` also for value types built by `initobj`.
    pub ctor: Option<SymbolId>,
}

#[derive(Clone, Debug)]
pub struct NewArrayExpr {
    pub elem: TypeRef,
    pub rank: u32,
    /// Explicit bound, e.g. `new int[3]`.
    pub len: Option<Box<Expr>>,
    /// Initializer list, e.g. `new int[] { 1, 2, 3 }`.
    pub init: Option<Vec<Expr>>,
}

#[derive(Clone, Debug)]
pub struct IndexExpr {
    pub target: Box<Expr>,
    pub indices: Vec<Expr>,
    /// True when the target is an array; element access, no indexer call.
    pub is_array: bool,
    /// Resolved `get_Item`-side indexer for reads.
    pub getter: Option<SymbolId>,
    /// Resolved `set_Item`-side indexer for writes.
    pub setter: Option<SymbolId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CastKind {
    /// Same type, or implicit reference upcast; no code.
    Identity,
    /// Reference downcast; `castclass`.
    Down,
    /// Value type to reference type.
    Box,
    /// Reference type to value type.
    Unbox,
    /// `char` <-> `int`.
    Numeric,
}

#[derive(Clone, Debug)]
pub struct CastExpr {
    pub ty: TypeRef,
    pub expr: Box<Expr>,
    pub kind: Option<CastKind>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    /// Short-circuit `&&`.
    AndAnd,
    /// Short-circuit `||`.
    OrOr,
}

impl BinOp {
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge
        )
    }

    /// Operator-overload method name, for the overloadable subset.
    #[must_use]
    pub fn special_name(self) -> Option<&'static str> {
        Some(match self {
            BinOp::Add => "op_Addition",
            BinOp::Sub => "op_Subtraction",
            BinOp::Mul => "op_Multiply",
            BinOp::Div => "op_Division",
            BinOp::Rem => "op_Modulus",
            BinOp::BitAnd => "op_BitwiseAnd",
            BinOp::BitOr => "op_BitwiseOr",
            BinOp::BitXor => "op_ExclusiveOr",
            BinOp::Eq => "op_Equality",
            BinOp::Ne => "op_Inequality",
            BinOp::Lt => "op_LessThan",
            BinOp::Gt => "op_GreaterThan",
            BinOp::Le => "op_LessThanOrEqual",
            BinOp::Ge => "op_GreaterThanOrEqual",
            BinOp::Shl | BinOp::Shr | BinOp::AndAnd | BinOp::OrOr => return None,
        })
    }
}

#[derive(Clone, Debug)]
pub struct BinaryExpr {
    pub op: BinOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    /// Filled when the operands selected a user operator overload.
    pub operator_method: Option<SymbolId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    /// `!`
    Not,
    /// unary `-`
    Neg,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgFlow {
    In,
    Out,
    Ref,
}

#[derive(Clone, Debug)]
pub struct AssignExpr {
    pub lhs: Box<Expr>,
    /// `Some` for compound assignment (`+=`, `<<=`, ...).
    pub op: Option<BinOp>,
    pub rhs: Box<Expr>,
    /// Operator overload backing a compound assignment, when one applies
    /// (string `+=` lowers through `String.Concat`).
    pub operator_method: Option<SymbolId>,
}

#[derive(Clone, Debug)]
pub struct IncDecExpr {
    pub target: Box<Expr>,
    pub inc: bool,
    pub pre: bool,
}
