//! Statement nodes.
//!
//! `foreach` and `switch` carry a `lowered` slot: during resolution they are
//! rewritten to simpler statements (built from their own sub-trees), and
//! emission delegates to the substitute.

use blue_common::{SourceSpan, SymbolId};

use crate::ast::expr::Expr;
use crate::ast::types::TypeRef;

#[derive(Clone, Debug)]
pub struct Stmt {
    pub span: SourceSpan,
    pub kind: StmtKind,
}

impl Stmt {
    #[must_use]
    pub fn new(span: SourceSpan, kind: StmtKind) -> Self {
        Stmt { span, kind }
    }

    #[must_use]
    pub fn empty() -> Self {
        Stmt {
            span: SourceSpan::synthetic(),
            kind: StmtKind::Empty,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Block {
    pub span: SourceSpan,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug)]
pub enum StmtKind {
    Block(Block),
    LocalDecl(LocalDecl),
    If {
        cond: Expr,
        then_s: Box<Stmt>,
        else_s: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    Do {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Vec<Stmt>,
        cond: Option<Expr>,
        step: Vec<Expr>,
        body: Box<Stmt>,
    },
    Foreach(ForeachStmt),
    Switch(SwitchStmt),
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    /// `throw;` rethrows inside a catch handler.
    Throw(Option<Expr>),
    Return(Option<Expr>),
    Break,
    Continue,
    Goto {
        label: String,
        sym: Option<SymbolId>,
    },
    Label {
        name: String,
        stmt: Box<Stmt>,
        sym: Option<SymbolId>,
    },
    Empty,
    Expr(Expr),
    /// `: base(...)` / `: this(...)` before a constructor body.
    CtorChain(CtorChain),
}

#[derive(Clone, Debug)]
pub struct LocalDecl {
    pub ty: TypeRef,
    pub vars: Vec<LocalVar>,
}

#[derive(Clone, Debug)]
pub struct LocalVar {
    pub span: SourceSpan,
    pub name: String,
    pub init: Option<Expr>,
    pub sym: Option<SymbolId>,
}

#[derive(Clone, Debug)]
pub struct ForeachStmt {
    pub var_ty: TypeRef,
    pub var_name: String,
    pub var_span: SourceSpan,
    pub collection: Expr,
    pub body: Box<Stmt>,
    /// Resolved substitute; owns the original sub-trees after rewriting.
    pub lowered: Option<Box<Stmt>>,
}

#[derive(Clone, Debug)]
pub struct SwitchStmt {
    pub scrutinee: Expr,
    pub sections: Vec<SwitchSection>,
    /// Resolved substitute (`do { ... } while (false)` form).
    pub lowered: Option<Box<Stmt>>,
}

#[derive(Clone, Debug)]
pub struct SwitchSection {
    pub span: SourceSpan,
    pub labels: Vec<SwitchLabel>,
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug)]
pub enum SwitchLabel {
    Case(Expr),
    Default(SourceSpan),
}

#[derive(Clone, Debug)]
pub struct CatchClause {
    pub span: SourceSpan,
    /// `None` for the catch-all `catch { }` form.
    pub ty: Option<TypeRef>,
    /// Binding for the caught exception, when named.
    pub name: Option<String>,
    pub sym: Option<SymbolId>,
    pub body: Block,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CtorChainKind {
    Base,
    This,
}

#[derive(Clone, Debug)]
pub struct CtorChain {
    pub kind: CtorChainKind,
    pub args: Vec<Expr>,
    /// Resolved call to the chained constructor.
    pub call: Option<Expr>,
}
