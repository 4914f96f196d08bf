//! Rewrites of high-level constructs into simpler resolved forms.
//!
//! The rewriter installs a resolved substitute onto the original node
//! (which then owns the moved sub-trees); emission delegates through it.
//! Substitutes are built from fresh unresolved nodes plus the already-
//! resolved originals, then run through ordinary resolution, so every
//! type check on the lowered form happens exactly once.

use blue_common::{DiagnosticCode, SourceSpan};
use blue_parser::ast::{
    AssignExpr, BinOp, BinaryExpr, Binding, Block, CallExpr, Expr, ExprKind, IncDecExpr,
    IndexExpr, LocalDecl, LocalVar, MemberExpr, NameExpr, Stmt, StmtKind, SwitchLabel, TypeRef,
};

use crate::Resolver;
use crate::bodies::BodyCtx;
use crate::symbols::TypeGenre;

const INDEX_VAR: &str = "$index";
const ENUMERATOR_VAR: &str = "$enum";
const SCRUTINEE_VAR: &str = "$switch";

fn name(span: SourceSpan, text: &str) -> Expr {
    Expr::new(
        span,
        ExprKind::Name(NameExpr {
            name: text.to_string(),
            binding: None,
        }),
    )
}

fn local_decl(span: SourceSpan, ty: TypeRef, var: &str, init: Option<Expr>) -> Stmt {
    Stmt::new(
        span,
        StmtKind::LocalDecl(LocalDecl {
            ty,
            vars: vec![LocalVar {
                span,
                name: var.to_string(),
                init,
                sym: None,
            }],
        }),
    )
}

fn assign(span: SourceSpan, lhs: Expr, rhs: Expr) -> Stmt {
    Stmt::new(
        span,
        StmtKind::Expr(Expr::new(
            span,
            ExprKind::Assign(AssignExpr {
                lhs: Box::new(lhs),
                op: None,
                rhs: Box::new(rhs),
                operator_method: None,
            }),
        )),
    )
}

fn binary(span: SourceSpan, op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(
        span,
        ExprKind::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            operator_method: None,
        }),
    )
}

fn member(span: SourceSpan, target: Expr, field: &str) -> Expr {
    Expr::new(
        span,
        ExprKind::Member(MemberExpr {
            target: Box::new(target),
            name: field.to_string(),
            binding: None,
        }),
    )
}

fn call(span: SourceSpan, target: Expr) -> Expr {
    Expr::new(
        span,
        ExprKind::Call(CallExpr {
            target: Box::new(target),
            args: Vec::new(),
            method: None,
            polymorphic: true,
        }),
    )
}

impl Resolver<'_> {
    /// foreach over an array becomes an index loop; anything else goes
    /// through `GetEnumerator`/`MoveNext`/`Current`.
    pub(crate) fn desugar_foreach(&mut self, stmt: &mut Stmt, ctx: &mut BodyCtx) {
        let span = stmt.span;
        let StmtKind::Foreach(foreach) = &mut stmt.kind else {
            return;
        };
        let coll_ty = self.resolve_expr(&mut foreach.collection, ctx);
        let var_ty_id = self.resolve_type_ref(&mut foreach.var_ty, ctx.scope);
        let Some(coll_ty) = coll_ty else {
            self.diags.error(
                DiagnosticCode::TypeMismatch,
                foreach.collection.span,
                "cannot iterate over 'null'",
            );
            return;
        };
        if self.state.is_error(coll_ty) || self.state.is_error(var_ty_id) {
            return;
        }
        let var_span = foreach.var_span;
        let var_name = foreach.var_name.clone();
        let collection = std::mem::replace(&mut foreach.collection, Expr::new(span, ExprKind::Null));
        let body = std::mem::replace(&mut foreach.body, Box::new(Stmt::empty()));
        let var_ty = TypeRef::of(var_ty_id);

        let mut lowered = if self.state.symbols.ty(coll_ty).genre == TypeGenre::Array {
            // { int i; T x; for (i = 0; i < C.Length; i++) { x = C[i]; S } }
            let int_ty = TypeRef::of(self.state.well_known.int);
            let element_get = Expr::new(
                span,
                ExprKind::Index(IndexExpr {
                    target: Box::new(collection.clone()),
                    indices: vec![name(span, INDEX_VAR)],
                    is_array: false,
                    getter: None,
                    setter: None,
                }),
            );
            let for_body = Stmt::new(
                span,
                StmtKind::Block(Block {
                    span,
                    stmts: vec![assign(var_span, name(var_span, &var_name), element_get), *body],
                }),
            );
            let for_stmt = Stmt::new(
                span,
                StmtKind::For {
                    init: vec![assign(
                        span,
                        name(span, INDEX_VAR),
                        Expr::new(span, ExprKind::Int(0)),
                    )],
                    cond: Some(binary(
                        span,
                        BinOp::Lt,
                        name(span, INDEX_VAR),
                        member(span, collection, "Length"),
                    )),
                    step: vec![Expr::new(
                        span,
                        ExprKind::IncDec(IncDecExpr {
                            target: Box::new(name(span, INDEX_VAR)),
                            inc: true,
                            pre: false,
                        }),
                    )],
                    body: Box::new(for_body),
                },
            );
            Stmt::new(
                span,
                StmtKind::Block(Block {
                    span,
                    stmts: vec![
                        local_decl(span, int_ty, INDEX_VAR, None),
                        local_decl(var_span, var_ty, &var_name, None),
                        for_stmt,
                    ],
                }),
            )
        } else {
            // { E e = C.GetEnumerator(); while (e.MoveNext())
            //   { T x = (T)e.Current; S } }
            self.ensure_chain(coll_ty);
            let enumerator_ty = {
                let header = crate::state::ResolveState::header_key("GetEnumerator");
                let found = self
                    .state
                    .lookup_member(coll_ty, &header)
                    .and_then(|h| match &self.state.symbols.get(h).kind {
                        crate::symbols::SymKind::MethodHeader(header) => {
                            header.overloads.first().copied()
                        }
                        _ => None,
                    });
                match found {
                    Some(m) => self.state.symbols.method(m).ret,
                    None => {
                        self.diags.error(
                            DiagnosticCode::MethodNotDefined,
                            span,
                            format!(
                                "'{}' has no GetEnumerator method to iterate with",
                                self.state.full_name(coll_ty)
                            ),
                        );
                        return;
                    }
                }
            };
            let Some(enumerator_ty) = enumerator_ty else {
                return;
            };
            let get_enumerator = call(span, member(span, collection, "GetEnumerator"));
            let current = Expr::new(
                var_span,
                ExprKind::Cast(blue_parser::ast::CastExpr {
                    ty: TypeRef::of(var_ty_id),
                    expr: Box::new(member(var_span, name(span, ENUMERATOR_VAR), "Current")),
                    kind: None,
                }),
            );
            let while_body = Stmt::new(
                span,
                StmtKind::Block(Block {
                    span,
                    stmts: vec![
                        local_decl(var_span, var_ty, &var_name, Some(current)),
                        *body,
                    ],
                }),
            );
            let while_stmt = Stmt::new(
                span,
                StmtKind::While {
                    cond: call(span, member(span, name(span, ENUMERATOR_VAR), "MoveNext")),
                    body: Box::new(while_body),
                },
            );
            Stmt::new(
                span,
                StmtKind::Block(Block {
                    span,
                    stmts: vec![
                        local_decl(
                            span,
                            TypeRef::of(enumerator_ty),
                            ENUMERATOR_VAR,
                            Some(get_enumerator),
                        ),
                        while_stmt,
                    ],
                }),
            )
        };
        self.resolve_stmt(&mut lowered, ctx);
        let StmtKind::Foreach(foreach) = &mut stmt.kind else {
            return;
        };
        foreach.lowered = Some(Box::new(lowered));
    }

    /// switch becomes `do { T t = e; if (t==l1 || ...) {S} ... S_default }
    /// while (false)`, so `break` naturally exits. The default section's
    /// statements run unconditionally last.
    pub(crate) fn desugar_switch(&mut self, stmt: &mut Stmt, ctx: &mut BodyCtx) {
        let span = stmt.span;
        let StmtKind::Switch(switch) = &mut stmt.kind else {
            return;
        };
        let scrut_ty = self.resolve_expr(&mut switch.scrutinee, ctx);
        let Some(scrut_ty) = scrut_ty else {
            self.diags.error(
                DiagnosticCode::TypeMismatch,
                switch.scrutinee.span,
                "cannot switch on 'null'",
            );
            return;
        };
        if self.state.is_error(scrut_ty) {
            return;
        }
        // Case labels must be compile-time constants; resolve and check
        // before the rewrite so each label is validated exactly once.
        for section in &mut switch.sections {
            for label in &mut section.labels {
                if let SwitchLabel::Case(value) = label {
                    self.resolve_expr(value, ctx);
                    if !is_const_expr(value) {
                        self.diags.error(
                            DiagnosticCode::MustBeCompileTimeConstant,
                            value.span,
                            "a case label must be a compile-time constant",
                        );
                    }
                }
            }
        }
        let scrutinee = std::mem::replace(&mut switch.scrutinee, Expr::new(span, ExprKind::Null));
        let sections = std::mem::take(&mut switch.sections);

        let mut stmts = vec![local_decl(
            span,
            TypeRef::of(scrut_ty),
            SCRUTINEE_VAR,
            Some(scrutinee),
        )];
        let mut default_stmts: Option<Vec<Stmt>> = None;
        for section in sections {
            let mut cond: Option<Expr> = None;
            let mut is_default = false;
            for label in section.labels {
                match label {
                    SwitchLabel::Case(value) => {
                        let test = binary(
                            value.span,
                            BinOp::Eq,
                            name(span, SCRUTINEE_VAR),
                            value,
                        );
                        cond = Some(match cond {
                            Some(previous) => {
                                binary(span, BinOp::OrOr, previous, test)
                            }
                            None => test,
                        });
                    }
                    SwitchLabel::Default(_) => is_default = true,
                }
            }
            let body = Block {
                span: section.span,
                stmts: section.stmts,
            };
            match (cond, is_default) {
                (Some(cond), grouped_default) => {
                    if grouped_default {
                        // `default:` grouped with case labels: the body
                        // also runs as the unconditional tail.
                        default_stmts = Some(body.stmts.clone());
                    }
                    stmts.push(Stmt::new(
                        section.span,
                        StmtKind::If {
                            cond,
                            then_s: Box::new(Stmt::new(section.span, StmtKind::Block(body))),
                            else_s: None,
                        },
                    ));
                }
                (None, true) => default_stmts = Some(body.stmts),
                (None, false) => {}
            }
        }
        if let Some(defaults) = default_stmts {
            stmts.extend(defaults);
        }
        let mut lowered = Stmt::new(
            span,
            StmtKind::Do {
                body: Box::new(Stmt::new(span, StmtKind::Block(Block { span, stmts }))),
                cond: Expr::new(span, ExprKind::Bool(false)),
            },
        );
        self.resolve_stmt(&mut lowered, ctx);
        let StmtKind::Switch(switch) = &mut stmt.kind else {
            return;
        };
        switch.lowered = Some(Box::new(lowered));
    }
}

/// A resolved expression that is a compile-time constant: a literal,
/// possibly negated, or a literal-field reference (enum members, consts).
fn is_const_expr(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Int(_) | ExprKind::Char(_) | ExprKind::Bool(_) | ExprKind::Str(_) => true,
        ExprKind::Unary {
            op: blue_parser::ast::UnOp::Neg,
            expr,
        } => is_const_expr(expr),
        ExprKind::Name(n) => matches!(n.binding, Some(Binding::LiteralField(_))),
        ExprKind::Member(m) => matches!(m.binding, Some(Binding::LiteralField(_))),
        _ => false,
    }
}
