//! Declaration productions: types, members, parameters.

use blue_scanner::{Kw, TokenKind};

use blue_common::SourceSpan;

use crate::ast::{
    AccessorDecl, BinOp, CtorChain, CtorChainKind, DelegateDecl, EnumDecl, EnumMember, EventDecl,
    FieldDecl, INDEXER_NAME, Member, MethodDecl, Modifiers, Param, ParamFlow, PropertyDecl, Stmt,
    StmtKind, TypeDecl, TypeItem, TypeKind, TypeRef,
};

use super::Parser;

impl Parser {
    pub(super) fn parse_type_item(&mut self) -> Option<TypeItem> {
        let start = self.peek_span();
        let mods = self.parse_modifiers();
        match self.peek_kind() {
            TokenKind::Kw(Kw::Class) => self.parse_type_decl(TypeKind::Class, mods, start),
            TokenKind::Kw(Kw::Struct) => self.parse_type_decl(TypeKind::Struct, mods, start),
            TokenKind::Kw(Kw::Interface) => self.parse_type_decl(TypeKind::Interface, mods, start),
            TokenKind::Kw(Kw::Enum) => self.parse_enum(mods, start),
            TokenKind::Kw(Kw::Delegate) => self.parse_delegate(mods, start),
            _ => {
                let span = self.peek_span();
                self.error(span, "expected a type declaration");
                self.next();
                self.resync();
                None
            }
        }
    }

    fn parse_type_decl(
        &mut self,
        kind: TypeKind,
        mods: Modifiers,
        start: SourceSpan,
    ) -> Option<TypeItem> {
        self.next(); // class / struct / interface
        let (name, _) = self.expect_ident("a type name")?;
        let mut bases = Vec::new();
        if self.eat(&TokenKind::Colon) {
            loop {
                if let Some(base) = self.parse_type() {
                    bases.push(base);
                } else {
                    self.resync();
                    break;
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::LBrace, "'{' opening the type body")?;
        let mut members = Vec::new();
        while !self.at(&TokenKind::RBrace) && !self.at_terminal() {
            self.parse_member(&name, &mut members);
        }
        let end = self.peek_span();
        self.expect(&TokenKind::RBrace, "'}' closing the type body");
        Some(TypeItem::Type(TypeDecl {
            span: start.to(end),
            kind,
            mods,
            name,
            bases,
            members,
            sym: None,
        }))
    }

    fn parse_enum(&mut self, mods: Modifiers, start: SourceSpan) -> Option<TypeItem> {
        self.next(); // enum
        let (name, _) = self.expect_ident("an enum name")?;
        self.expect(&TokenKind::LBrace, "'{' opening the enum body")?;
        let mut members = Vec::new();
        while !self.at(&TokenKind::RBrace) && !self.at_terminal() {
            let Some((member_name, span)) = self.expect_ident("an enum member name") else {
                self.resync();
                break;
            };
            let value = if self.eat(&TokenKind::Assign) {
                self.parse_expr()
            } else {
                None
            };
            members.push(EnumMember {
                span,
                name: member_name,
                value,
                sym: None,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.peek_span();
        self.expect(&TokenKind::RBrace, "'}' closing the enum body");
        Some(TypeItem::Enum(EnumDecl {
            span: start.to(end),
            mods,
            name,
            members,
            sym: None,
        }))
    }

    fn parse_delegate(&mut self, mods: Modifiers, start: SourceSpan) -> Option<TypeItem> {
        self.next(); // delegate
        let ret = self.parse_type()?;
        let (name, _) = self.expect_ident("a delegate name")?;
        let params = self.parse_params(&TokenKind::LParen, &TokenKind::RParen)?;
        let end = self.peek_span();
        self.expect(&TokenKind::Semi, "';' after delegate declaration");
        Some(TypeItem::Delegate(DelegateDecl {
            span: start.to(end),
            mods,
            name,
            ret,
            params,
            sym: None,
        }))
    }

    // ---- members ----

    fn parse_member(&mut self, type_name: &str, members: &mut Vec<Member>) {
        let start = self.peek_span();
        let mods = self.parse_modifiers();
        match self.peek_kind() {
            TokenKind::Kw(Kw::Class | Kw::Struct | Kw::Interface | Kw::Enum | Kw::Delegate) => {
                // Re-dispatch through the type-item path; modifiers were
                // already consumed, so stitch them back on.
                let item = match self.peek_kind() {
                    TokenKind::Kw(Kw::Class) => self.parse_type_decl(TypeKind::Class, mods, start),
                    TokenKind::Kw(Kw::Struct) => {
                        self.parse_type_decl(TypeKind::Struct, mods, start)
                    }
                    TokenKind::Kw(Kw::Interface) => {
                        self.parse_type_decl(TypeKind::Interface, mods, start)
                    }
                    TokenKind::Kw(Kw::Enum) => self.parse_enum(mods, start),
                    _ => self.parse_delegate(mods, start),
                };
                if let Some(item) = item {
                    members.push(Member::Nested(item));
                }
            }
            TokenKind::Kw(Kw::Event) => {
                self.next();
                let Some(ty) = self.parse_type() else {
                    self.resync();
                    return;
                };
                let Some((name, _)) = self.expect_ident("an event name") else {
                    self.resync();
                    return;
                };
                let end = self.peek_span();
                self.expect(&TokenKind::Semi, "';' after event declaration");
                members.push(Member::Event(EventDecl {
                    span: start.to(end),
                    mods,
                    ty,
                    name,
                    sym: None,
                }));
            }
            TokenKind::Ident(name) if name == type_name => {
                // Could be a constructor or a member whose type is the
                // enclosing type. One consumed token decides.
                let name_tok = self.next();
                if self.at(&TokenKind::LParen) {
                    self.parse_ctor(type_name, mods, start, members);
                } else {
                    let mut parts = vec![name];
                    while self.eat(&TokenKind::Dot) {
                        match self.expect_ident("an identifier after '.'") {
                            Some((p, _)) => parts.push(p),
                            None => {
                                self.resync();
                                return;
                            }
                        }
                    }
                    let base = TypeRef::named(name_tok.span, parts);
                    let ty = self.parse_rank_suffix(base);
                    self.parse_member_with_type(ty, mods, start, members);
                }
            }
            _ => {
                let Some(ty) = self.parse_type() else {
                    self.resync();
                    return;
                };
                self.parse_member_with_type(ty, mods, start, members);
            }
        }
    }

    fn parse_member_with_type(
        &mut self,
        ty: TypeRef,
        mods: Modifiers,
        start: SourceSpan,
        members: &mut Vec<Member>,
    ) {
        match self.peek_kind() {
            TokenKind::Kw(Kw::Operator) => self.parse_operator(ty, mods, start, members),
            TokenKind::Kw(Kw::This) => self.parse_indexer(ty, mods, start, members),
            TokenKind::Ident(_) => {
                let (name, _) = self.expect_ident("a member name").unwrap();
                match self.peek_kind() {
                    TokenKind::LParen => self.parse_method(ty, name, mods, start, members),
                    TokenKind::LBrace => self.parse_property(ty, name, Vec::new(), mods, start, members),
                    _ => self.parse_fields(ty, name, mods, start, members),
                }
            }
            _ => {
                let span = self.peek_span();
                self.error(span, "expected a member name");
                self.resync();
            }
        }
    }

    fn parse_ctor(
        &mut self,
        type_name: &str,
        mods: Modifiers,
        start: SourceSpan,
        members: &mut Vec<Member>,
    ) {
        let Some(params) = self.parse_params(&TokenKind::LParen, &TokenKind::RParen) else {
            self.resync();
            return;
        };
        let mut chain = None;
        if self.eat(&TokenKind::Colon) {
            let chain_span = self.peek_span();
            let kind = if self.eat_kw(Kw::Base) {
                Some(CtorChainKind::Base)
            } else if self.eat_kw(Kw::This) {
                Some(CtorChainKind::This)
            } else {
                self.error(chain_span, "expected 'base' or 'this' in constructor chain");
                None
            };
            if let Some(kind) = kind {
                if let Some(args) = self.parse_call_args() {
                    chain = Some(Stmt::new(
                        chain_span.to(self.peek_span()),
                        StmtKind::CtorChain(CtorChain {
                            kind,
                            args,
                            call: None,
                        }),
                    ));
                }
            }
        }
        let Some(mut body) = self.parse_block() else {
            self.resync();
            return;
        };
        if let Some(chain) = chain {
            body.stmts.insert(0, chain);
        }
        members.push(Member::Method(MethodDecl {
            span: start.to(body.span),
            mods,
            ret: None,
            name: type_name.to_string(),
            params,
            body: Some(body),
            is_ctor: true,
            is_special: false,
            sym: None,
        }));
    }

    fn parse_method(
        &mut self,
        ret: TypeRef,
        name: String,
        mods: Modifiers,
        start: SourceSpan,
        members: &mut Vec<Member>,
    ) {
        let Some(params) = self.parse_params(&TokenKind::LParen, &TokenKind::RParen) else {
            self.resync();
            return;
        };
        let (body, end) = if self.at(&TokenKind::Semi) {
            let end = self.peek_span();
            self.next();
            (None, end)
        } else {
            match self.parse_block() {
                Some(b) => {
                    let end = b.span;
                    (Some(b), end)
                }
                None => {
                    self.resync();
                    return;
                }
            }
        };
        members.push(Member::Method(MethodDecl {
            span: start.to(end),
            mods,
            ret: Some(ret),
            name,
            params,
            body,
            is_ctor: false,
            is_special: false,
            sym: None,
        }));
    }

    fn parse_operator(
        &mut self,
        ret: TypeRef,
        mods: Modifiers,
        start: SourceSpan,
        members: &mut Vec<Member>,
    ) {
        self.next(); // operator
        let op_tok = self.next();
        let op = match op_tok.kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Rem),
            TokenKind::Amp => Some(BinOp::BitAnd),
            TokenKind::Pipe => Some(BinOp::BitOr),
            TokenKind::Caret => Some(BinOp::BitXor),
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::NotEq => Some(BinOp::Ne),
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::LtEq => Some(BinOp::Le),
            TokenKind::GtEq => Some(BinOp::Ge),
            _ => None,
        };
        let Some(name) = op.and_then(BinOp::special_name) else {
            self.not_yet_implemented(op_tok.span, "overloading this operator");
            self.resync();
            return;
        };
        let Some(params) = self.parse_params(&TokenKind::LParen, &TokenKind::RParen) else {
            self.resync();
            return;
        };
        let Some(body) = self.parse_block() else {
            self.resync();
            return;
        };
        members.push(Member::Method(MethodDecl {
            span: start.to(body.span),
            mods,
            ret: Some(ret),
            name: name.to_string(),
            params,
            body: Some(body),
            is_ctor: false,
            is_special: true,
            sym: None,
        }));
    }

    fn parse_indexer(
        &mut self,
        ty: TypeRef,
        mods: Modifiers,
        start: SourceSpan,
        members: &mut Vec<Member>,
    ) {
        self.next(); // this
        let Some(params) = self.parse_params(&TokenKind::LBracket, &TokenKind::RBracket) else {
            self.resync();
            return;
        };
        self.parse_property(ty, INDEXER_NAME.to_string(), params, mods, start, members);
    }

    fn parse_property(
        &mut self,
        ty: TypeRef,
        name: String,
        params: Vec<Param>,
        mods: Modifiers,
        start: SourceSpan,
        members: &mut Vec<Member>,
    ) {
        if self.expect(&TokenKind::LBrace, "'{' opening accessors").is_none() {
            self.resync();
            return;
        }
        let mut getter = None;
        let mut setter = None;
        while !self.at(&TokenKind::RBrace) && !self.at_terminal() {
            let acc_span = self.peek_span();
            let Some((which, _)) = self.expect_ident("'get' or 'set'") else {
                self.resync();
                break;
            };
            let body = if self.eat(&TokenKind::Semi) {
                None
            } else {
                match self.parse_block() {
                    Some(b) => Some(b),
                    None => {
                        self.resync();
                        continue;
                    }
                }
            };
            let accessor = AccessorDecl {
                span: acc_span,
                body,
            };
            match which.as_str() {
                "get" => getter = Some(accessor),
                "set" => setter = Some(accessor),
                _ => self.error(acc_span, "expected 'get' or 'set'"),
            }
        }
        let end = self.peek_span();
        self.expect(&TokenKind::RBrace, "'}' closing accessors");
        members.push(Member::Property(PropertyDecl {
            span: start.to(end),
            mods,
            ty,
            name,
            params,
            getter,
            setter,
            sym: None,
        }));
    }

    fn parse_fields(
        &mut self,
        ty: TypeRef,
        first_name: String,
        mods: Modifiers,
        start: SourceSpan,
        members: &mut Vec<Member>,
    ) {
        let mut name = first_name;
        loop {
            let init = if self.eat(&TokenKind::Assign) {
                self.parse_expr()
            } else {
                None
            };
            members.push(Member::Field(FieldDecl {
                span: start.to(self.peek_span()),
                mods,
                ty: ty.clone(),
                name,
                init,
                sym: None,
            }));
            if self.eat(&TokenKind::Comma) {
                match self.expect_ident("a field name") {
                    Some((n, _)) => name = n,
                    None => {
                        self.resync();
                        return;
                    }
                }
            } else {
                break;
            }
        }
        self.expect(&TokenKind::Semi, "';' after field declaration");
    }

    // ---- parameters ----

    pub(super) fn parse_params(
        &mut self,
        open: &TokenKind,
        close: &TokenKind,
    ) -> Option<Vec<Param>> {
        self.expect(open, "parameter list")?;
        let mut params = Vec::new();
        if !self.at(close) {
            loop {
                let start = self.peek_span();
                let flow = if self.eat_kw(Kw::Ref) {
                    ParamFlow::Ref
                } else if self.eat_kw(Kw::Out) {
                    ParamFlow::Out
                } else {
                    ParamFlow::In
                };
                let ty = self.parse_type()?;
                let (name, _) = self.expect_ident("a parameter name")?;
                params.push(Param {
                    span: start.to(self.peek_span()),
                    name,
                    ty,
                    flow,
                    sym: None,
                });
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(close, "end of parameter list")?;
        Some(params)
    }
}
