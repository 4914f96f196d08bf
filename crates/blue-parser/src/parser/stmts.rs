//! Statement productions.

use blue_scanner::{Kw, TokenKind};

use crate::ast::{
    Block, CatchClause, Expr, ExprKind, ForeachStmt, LocalDecl, LocalVar, Stmt, StmtKind,
    SwitchLabel, SwitchSection, SwitchStmt, TypeRef,
};

use super::Parser;

impl Parser {
    pub(super) fn parse_block(&mut self) -> Option<Block> {
        let start = self.peek_span();
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.at(&TokenKind::RBrace) && !self.at_terminal() {
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => self.resync(),
            }
        }
        let end = self.peek_span();
        self.expect(&TokenKind::RBrace, "'}'");
        Some(Block {
            span: start.to(end),
            stmts,
        })
    }

    pub(super) fn parse_statement(&mut self) -> Option<Stmt> {
        let start = self.peek_span();
        match self.peek_kind() {
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                Some(Stmt::new(block.span, StmtKind::Block(block)))
            }
            TokenKind::Semi => {
                self.next();
                Some(Stmt::new(start, StmtKind::Empty))
            }
            TokenKind::Kw(Kw::If) => self.parse_if(start),
            TokenKind::Kw(Kw::While) => self.parse_while(start),
            TokenKind::Kw(Kw::Do) => self.parse_do(start),
            TokenKind::Kw(Kw::For) => self.parse_for(start),
            TokenKind::Kw(Kw::Foreach) => self.parse_foreach(start),
            TokenKind::Kw(Kw::Switch) => self.parse_switch(start),
            TokenKind::Kw(Kw::Try) => self.parse_try(start),
            TokenKind::Kw(Kw::Throw) => {
                self.next();
                let value = if self.at(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(&TokenKind::Semi, "';' after throw");
                Some(Stmt::new(start, StmtKind::Throw(value)))
            }
            TokenKind::Kw(Kw::Return) => {
                self.next();
                let value = if self.at(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(&TokenKind::Semi, "';' after return");
                Some(Stmt::new(start, StmtKind::Return(value)))
            }
            TokenKind::Kw(Kw::Break) => {
                self.next();
                self.expect(&TokenKind::Semi, "';' after break");
                Some(Stmt::new(start, StmtKind::Break))
            }
            TokenKind::Kw(Kw::Continue) => {
                self.next();
                self.expect(&TokenKind::Semi, "';' after continue");
                Some(Stmt::new(start, StmtKind::Continue))
            }
            TokenKind::Kw(Kw::Goto) => {
                self.next();
                let (label, _) = self.expect_ident("a label name")?;
                self.expect(&TokenKind::Semi, "';' after goto");
                Some(Stmt::new(start, StmtKind::Goto { label, sym: None }))
            }
            TokenKind::Kw(kw @ (Kw::Lock | Kw::Using | Kw::Checked | Kw::Unchecked)) => {
                self.not_yet_implemented(start, &format!("the '{}' statement", kw.text()));
                self.resync();
                None
            }
            TokenKind::Kw(Kw::Int | Kw::Char | Kw::Bool | Kw::String | Kw::Object) => {
                let ty = self.parse_type()?;
                self.parse_local_decl(ty, start)
            }
            _ => self.parse_simple_statement(start),
        }
    }

    fn parse_if(&mut self, start: blue_common::SourceSpan) -> Option<Stmt> {
        self.next();
        self.expect(&TokenKind::LParen, "'(' after 'if'")?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')' after condition")?;
        let then_s = Box::new(self.parse_statement()?);
        let else_s = if self.eat_kw(Kw::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Some(Stmt::new(
            start,
            StmtKind::If {
                cond,
                then_s,
                else_s,
            },
        ))
    }

    fn parse_while(&mut self, start: blue_common::SourceSpan) -> Option<Stmt> {
        self.next();
        self.expect(&TokenKind::LParen, "'(' after 'while'")?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')' after condition")?;
        let body = Box::new(self.parse_statement()?);
        Some(Stmt::new(start, StmtKind::While { cond, body }))
    }

    fn parse_do(&mut self, start: blue_common::SourceSpan) -> Option<Stmt> {
        self.next();
        let body = Box::new(self.parse_statement()?);
        if !self.eat_kw(Kw::While) {
            let span = self.peek_span();
            self.error(span, "expected 'while' after do body");
            return None;
        }
        self.expect(&TokenKind::LParen, "'(' after 'while'")?;
        let cond = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')' after condition")?;
        self.expect(&TokenKind::Semi, "';' after do statement");
        Some(Stmt::new(start, StmtKind::Do { body, cond }))
    }

    fn parse_for(&mut self, start: blue_common::SourceSpan) -> Option<Stmt> {
        self.next();
        self.expect(&TokenKind::LParen, "'(' after 'for'")?;
        let mut init = Vec::new();
        if !self.at(&TokenKind::Semi) {
            let init_start = self.peek_span();
            if matches!(
                self.peek_kind(),
                TokenKind::Kw(Kw::Int | Kw::Char | Kw::Bool | Kw::String | Kw::Object)
            ) {
                let ty = self.parse_type()?;
                init.push(self.parse_local_decl_no_semi(ty, init_start)?);
            } else {
                // Expression list, or a declaration with a named type; the
                // same expression-first trick statement parsing uses.
                match self.parse_expr_or_decl_head(init_start)? {
                    ExprOrDecl::Decl(stmt) => init.push(stmt),
                    ExprOrDecl::Expr(e) => {
                        init.push(Stmt::new(e.span, StmtKind::Expr(e)));
                        while self.eat(&TokenKind::Comma) {
                            let e = self.parse_expr()?;
                            init.push(Stmt::new(e.span, StmtKind::Expr(e)));
                        }
                    }
                }
            }
        }
        self.expect(&TokenKind::Semi, "';' after for initializer")?;
        let cond = if self.at(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::Semi, "';' after for condition")?;
        let mut step = Vec::new();
        if !self.at(&TokenKind::RParen) {
            loop {
                step.push(self.parse_expr()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' after for header")?;
        let body = Box::new(self.parse_statement()?);
        Some(Stmt::new(
            start,
            StmtKind::For {
                init,
                cond,
                step,
                body,
            },
        ))
    }

    fn parse_foreach(&mut self, start: blue_common::SourceSpan) -> Option<Stmt> {
        self.next();
        self.expect(&TokenKind::LParen, "'(' after 'foreach'")?;
        let var_ty = self.parse_type()?;
        let (var_name, var_span) = self.expect_ident("the iteration variable")?;
        if !self.eat_kw(Kw::In) {
            let span = self.peek_span();
            self.error(span, "expected 'in'");
            return None;
        }
        let collection = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')' after foreach header")?;
        let body = Box::new(self.parse_statement()?);
        Some(Stmt::new(
            start,
            StmtKind::Foreach(ForeachStmt {
                var_ty,
                var_name,
                var_span,
                collection,
                body,
                lowered: None,
            }),
        ))
    }

    fn parse_switch(&mut self, start: blue_common::SourceSpan) -> Option<Stmt> {
        self.next();
        self.expect(&TokenKind::LParen, "'(' after 'switch'")?;
        let scrutinee = self.parse_expr()?;
        self.expect(&TokenKind::RParen, "')' after switch value")?;
        self.expect(&TokenKind::LBrace, "'{' opening switch body")?;
        let mut sections: Vec<SwitchSection> = Vec::new();
        while !self.at(&TokenKind::RBrace) && !self.at_terminal() {
            let sec_start = self.peek_span();
            let mut labels = Vec::new();
            loop {
                if self.eat_kw(Kw::Case) {
                    let value = self.parse_expr()?;
                    self.expect(&TokenKind::Colon, "':' after case label")?;
                    labels.push(SwitchLabel::Case(value));
                } else if self.at_kw(Kw::Default) {
                    let span = self.peek_span();
                    self.next();
                    self.expect(&TokenKind::Colon, "':' after default label")?;
                    labels.push(SwitchLabel::Default(span));
                } else {
                    break;
                }
            }
            if labels.is_empty() {
                let span = self.peek_span();
                self.error(span, "expected 'case' or 'default'");
                self.resync();
                continue;
            }
            let mut stmts = Vec::new();
            while !self.at(&TokenKind::RBrace)
                && !self.at_kw(Kw::Case)
                && !self.at_kw(Kw::Default)
                && !self.at_terminal()
            {
                match self.parse_statement() {
                    Some(stmt) => stmts.push(stmt),
                    None => self.resync(),
                }
            }
            sections.push(SwitchSection {
                span: sec_start,
                labels,
                stmts,
            });
        }
        self.expect(&TokenKind::RBrace, "'}' closing switch body");
        Some(Stmt::new(
            start,
            StmtKind::Switch(SwitchStmt {
                scrutinee,
                sections,
                lowered: None,
            }),
        ))
    }

    fn parse_try(&mut self, start: blue_common::SourceSpan) -> Option<Stmt> {
        self.next();
        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.at_kw(Kw::Catch) {
            let catch_start = self.peek_span();
            self.next();
            let mut ty = None;
            let mut name = None;
            if self.eat(&TokenKind::LParen) {
                ty = Some(self.parse_type()?);
                if let TokenKind::Ident(_) = self.peek_kind() {
                    name = Some(self.expect_ident("the exception variable")?.0);
                }
                self.expect(&TokenKind::RParen, "')' after catch declaration")?;
            }
            let catch_body = self.parse_block()?;
            catches.push(CatchClause {
                span: catch_start,
                ty,
                name,
                sym: None,
                body: catch_body,
            });
        }
        let finally = if self.eat_kw(Kw::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catches.is_empty() && finally.is_none() {
            self.error(start, "try requires at least one catch or a finally");
        }
        Some(Stmt::new(
            start,
            StmtKind::Try {
                body,
                catches,
                finally,
            },
        ))
    }

    // ---- declarations vs. expressions ----

    fn parse_local_decl(&mut self, ty: TypeRef, start: blue_common::SourceSpan) -> Option<Stmt> {
        let stmt = self.parse_local_decl_no_semi(ty, start)?;
        self.expect(&TokenKind::Semi, "';' after declaration");
        Some(stmt)
    }

    fn parse_local_decl_no_semi(
        &mut self,
        ty: TypeRef,
        start: blue_common::SourceSpan,
    ) -> Option<Stmt> {
        let mut vars = Vec::new();
        loop {
            let (name, span) = self.expect_ident("a variable name")?;
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            vars.push(LocalVar {
                span,
                name,
                init,
                sym: None,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(Stmt::new(
            start.to(self.peek_span()),
            StmtKind::LocalDecl(LocalDecl { ty, vars }),
        ))
    }

    /// Statements that begin with an identifier: a label, a declaration
    /// whose type is a (possibly dotted, possibly array) name, or an
    /// expression statement. Parsed expression-first, single lookahead.
    fn parse_simple_statement(&mut self, start: blue_common::SourceSpan) -> Option<Stmt> {
        match self.parse_expr_or_decl_head(start)? {
            ExprOrDecl::Decl(stmt) => {
                self.expect(&TokenKind::Semi, "';' after declaration");
                Some(stmt)
            }
            ExprOrDecl::Expr(expr) => {
                if self.at(&TokenKind::Colon) {
                    if let ExprKind::Name(name) = &expr.kind {
                        let label = name.name.clone();
                        self.next();
                        let inner = Box::new(self.parse_statement()?);
                        return Some(Stmt::new(
                            start,
                            StmtKind::Label {
                                name: label,
                                stmt: inner,
                                sym: None,
                            },
                        ));
                    }
                }
                self.expect(&TokenKind::Semi, "';' after expression statement");
                Some(Stmt::new(expr.span, StmtKind::Expr(expr)))
            }
        }
    }

    fn parse_expr_or_decl_head(&mut self, start: blue_common::SourceSpan) -> Option<ExprOrDecl> {
        let expr = self.parse_expr()?;
        match self.peek_kind() {
            TokenKind::Ident(_) if expr_is_type_shape(&expr) => {
                let ty = expr_to_type_ref(&expr);
                Some(ExprOrDecl::Decl(self.parse_local_decl_no_semi(ty, start)?))
            }
            TokenKind::ArrayRank(_) if expr_is_type_shape(&expr) => {
                let base = expr_to_type_ref(&expr);
                let ty = self.parse_rank_suffix(base);
                Some(ExprOrDecl::Decl(self.parse_local_decl_no_semi(ty, start)?))
            }
            _ => Some(ExprOrDecl::Expr(expr)),
        }
    }
}

enum ExprOrDecl {
    Expr(Expr),
    Decl(Stmt),
}

/// Is this expression just a dotted chain of plain names (so it can be
/// reinterpreted as a type reference)?
pub(super) fn expr_is_type_shape(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Name(_) => true,
        ExprKind::Member(m) => expr_is_type_shape(&m.target),
        _ => false,
    }
}

pub(super) fn expr_to_type_ref(expr: &Expr) -> TypeRef {
    fn collect(expr: &Expr, parts: &mut Vec<String>) {
        match &expr.kind {
            ExprKind::Name(n) => parts.push(n.name.clone()),
            ExprKind::Member(m) => {
                collect(&m.target, parts);
                parts.push(m.name.clone());
            }
            _ => {}
        }
    }
    let mut parts = Vec::new();
    collect(expr, &mut parts);
    TypeRef::named(expr.span, parts)
}
