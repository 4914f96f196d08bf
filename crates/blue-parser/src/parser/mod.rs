//! Hand-written recursive-descent parser.
//!
//! Single-token lookahead via `peek`; one function per grammar production.
//! On a syntax error the parser reports a diagnostic and resyncs to the
//! next statement/member boundary; the file is then marked failed and the
//! driver keeps it away from later stages.

mod decls;
mod exprs;
mod stmts;

use tracing::debug;

use blue_common::{Diagnostic, DiagnosticCode, FileId, SourceSpan};
use blue_scanner::{Kw, Scanner, Token, TokenKind};

use crate::ast::{Modifiers, Namespace, SectionIdGen, TypeRef, UsingClause};

pub struct ParseResult {
    /// The file-level namespace section.
    pub file: Namespace,
    pub diags: Vec<Diagnostic>,
    /// True when any lex or parse error occurred; the file must not be
    /// submitted to resolution.
    pub failed: bool,
}

pub struct Parser {
    scanner: Scanner,
    diags: Vec<Diagnostic>,
    failed: bool,
}

impl Parser {
    /// Parse one source file into its file-level namespace section.
    pub fn parse_file(
        file: FileId,
        text: &str,
        defines: &[String],
        sections: &mut SectionIdGen,
    ) -> ParseResult {
        debug!(file = file.index(), "parse file");
        let mut parser = Parser {
            scanner: Scanner::new(file, text, defines),
            diags: Vec::new(),
            failed: false,
        };
        let start = parser.peek_span();
        let mut ns = Namespace {
            section: sections.next(),
            span: start,
            name: Vec::new(),
            usings: Vec::new(),
            namespaces: Vec::new(),
            types: Vec::new(),
        };
        parser.parse_namespace_items(&mut ns, sections, true);
        ns.span = start.to(parser.peek_span());
        let mut diags = parser.scanner.take_diagnostics();
        let failed = parser.failed || parser.scanner.had_error();
        diags.append(&mut parser.diags);
        ParseResult {
            file: ns,
            diags,
            failed,
        }
    }

    // ---- token plumbing ----

    fn peek(&mut self) -> &Token {
        self.scanner.peek()
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.scanner.peek().kind.clone()
    }

    fn peek_span(&mut self) -> SourceSpan {
        self.scanner.peek().span
    }

    fn next(&mut self) -> Token {
        self.scanner.next()
    }

    fn at(&mut self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    fn at_kw(&mut self, kw: Kw) -> bool {
        matches!(self.peek().kind, TokenKind::Kw(k) if k == kw)
    }

    fn at_terminal(&mut self) -> bool {
        self.peek().kind.is_terminal()
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: Kw) -> bool {
        if self.at_kw(kw) {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Option<Token> {
        if self.at(kind) {
            Some(self.next())
        } else {
            let span = self.peek_span();
            self.error(span, format!("expected {what}"));
            None
        }
    }

    fn expect_ident(&mut self, what: &str) -> Option<(String, SourceSpan)> {
        if let TokenKind::Ident(_) = self.peek().kind {
            let tok = self.next();
            let TokenKind::Ident(name) = tok.kind else {
                unreachable!()
            };
            Some((name, tok.span))
        } else {
            let span = self.peek_span();
            self.error(span, format!("expected {what}"));
            None
        }
    }

    // ---- diagnostics and recovery ----

    fn error(&mut self, span: SourceSpan, msg: impl Into<String>) {
        self.diags
            .push(Diagnostic::new(DiagnosticCode::SyntaxError, span, msg));
        self.failed = true;
    }

    fn not_yet_implemented(&mut self, span: SourceSpan, what: &str) {
        self.diags.push(Diagnostic::new(
            DiagnosticCode::NotYetImplemented,
            span,
            format!("{what} is not supported"),
        ));
        self.failed = true;
    }

    /// Skip to the next statement/member boundary: past a `;` or a
    /// brace-balanced `{...}` chunk, or up to an enclosing `}` (left for
    /// the caller's loop to act on). Always makes progress unless already
    /// at `}` or a terminal token.
    fn resync(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.peek().kind {
                TokenKind::Semi if depth == 0 => {
                    self.next();
                    return;
                }
                TokenKind::LBrace => {
                    depth += 1;
                    self.next();
                }
                TokenKind::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.next();
                    if depth == 0 {
                        return;
                    }
                }
                TokenKind::Eof | TokenKind::Error => return,
                _ => {
                    self.next();
                }
            }
        }
    }

    // ---- namespace level ----

    fn parse_namespace_items(
        &mut self,
        ns: &mut Namespace,
        sections: &mut SectionIdGen,
        top_level: bool,
    ) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof | TokenKind::Error => return,
                TokenKind::RBrace if !top_level => return,
                TokenKind::RBrace => {
                    let span = self.peek_span();
                    self.error(span, "unexpected '}'");
                    self.next();
                }
                TokenKind::Kw(Kw::Using) => {
                    if let Some(clause) = self.parse_using_clause() {
                        ns.usings.push(clause);
                    }
                }
                TokenKind::Kw(Kw::Namespace) => {
                    if let Some(nested) = self.parse_namespace(sections) {
                        ns.namespaces.push(nested);
                    }
                }
                _ => {
                    if let Some(item) = self.parse_type_item() {
                        ns.types.push(item);
                    } else if self.at_terminal() {
                        return;
                    }
                }
            }
        }
    }

    fn parse_using_clause(&mut self) -> Option<UsingClause> {
        let start = self.peek_span();
        self.next(); // using
        let path = self.parse_dotted_name()?;
        let end = self.peek_span();
        self.expect(&TokenKind::Semi, "';' after using clause")?;
        Some(UsingClause {
            span: start.to(end),
            path,
        })
    }

    fn parse_namespace(&mut self, sections: &mut SectionIdGen) -> Option<Namespace> {
        let start = self.peek_span();
        self.next(); // namespace
        let name = self.parse_dotted_name()?;
        self.expect(&TokenKind::LBrace, "'{' after namespace name")?;
        let mut ns = Namespace {
            section: sections.next(),
            span: start,
            name,
            usings: Vec::new(),
            namespaces: Vec::new(),
            types: Vec::new(),
        };
        self.parse_namespace_items(&mut ns, sections, false);
        let end = self.peek_span();
        self.expect(&TokenKind::RBrace, "'}' closing namespace");
        ns.span = start.to(end);
        Some(ns)
    }

    fn parse_dotted_name(&mut self) -> Option<Vec<String>> {
        let mut parts = vec![self.expect_ident("an identifier")?.0];
        while self.eat(&TokenKind::Dot) {
            parts.push(self.expect_ident("an identifier after '.'")?.0);
        }
        Some(parts)
    }

    // ---- modifiers ----

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut mods = Modifiers::empty();
        loop {
            let flag = match self.peek_kind() {
                TokenKind::Kw(Kw::Public) => Modifiers::PUBLIC,
                TokenKind::Kw(Kw::Private) => Modifiers::PRIVATE,
                TokenKind::Kw(Kw::Protected) => Modifiers::PROTECTED,
                TokenKind::Kw(Kw::Internal) => Modifiers::INTERNAL,
                TokenKind::Kw(Kw::Static) => Modifiers::STATIC,
                TokenKind::Kw(Kw::Virtual) => Modifiers::VIRTUAL,
                TokenKind::Kw(Kw::Abstract) => Modifiers::ABSTRACT,
                TokenKind::Kw(Kw::Override) => Modifiers::OVERRIDE,
                TokenKind::Kw(Kw::Sealed) => Modifiers::SEALED,
                TokenKind::Kw(Kw::Readonly) => Modifiers::READONLY,
                TokenKind::Kw(Kw::Const) => Modifiers::CONST,
                TokenKind::Kw(Kw::New) => {
                    // `new` is a modifier only when another declaration
                    // keyword can follow; at statement level it is the
                    // operator. Member parsing only calls this where a
                    // declaration must follow.
                    Modifiers::NEW
                }
                _ => return mods,
            };
            let tok = self.next();
            if mods.contains(flag) {
                self.diags.push(Diagnostic::new(
                    DiagnosticCode::DuplicateModifier,
                    tok.span,
                    "duplicate modifier",
                ));
                self.failed = true;
            }
            mods |= flag;
        }
    }

    // ---- types ----

    /// True when the next token can begin a type reference.
    fn at_type_start(&mut self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Ident(_)
                | TokenKind::Kw(
                    Kw::Int | Kw::Char | Kw::Bool | Kw::String | Kw::Object | Kw::Void
                )
        )
    }

    /// Parse a type reference: predefined keyword or dotted name, plus any
    /// rank specifiers.
    fn parse_type(&mut self) -> Option<TypeRef> {
        let base = self.parse_type_base()?;
        Some(self.parse_rank_suffix(base))
    }

    fn parse_type_base(&mut self) -> Option<TypeRef> {
        let span = self.peek_span();
        match self.peek_kind() {
            TokenKind::Kw(kw @ (Kw::Int | Kw::Char | Kw::Bool | Kw::String | Kw::Object | Kw::Void)) => {
                self.next();
                Some(TypeRef::simple(span, kw.text()))
            }
            TokenKind::Ident(_) => {
                let parts = self.parse_dotted_name()?;
                Some(TypeRef::named(span.to(self.peek_span()), parts))
            }
            _ => {
                self.error(span, "expected a type");
                None
            }
        }
    }

    /// Wrap `base` in array types for each trailing rank specifier.
    fn parse_rank_suffix(&mut self, base: TypeRef) -> TypeRef {
        let mut ty = base;
        while let TokenKind::ArrayRank(rank) = self.peek().kind {
            let tok = self.next();
            if rank > 1 {
                self.not_yet_implemented(tok.span, "a multi-dimensional array type");
            }
            let span = ty.span.to(tok.span);
            ty = TypeRef::array(span, ty, rank);
        }
        ty
    }
}
