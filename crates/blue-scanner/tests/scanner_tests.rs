//! Scanner integration tests: drive the scanner token by token the way
//! the parser does, including the peek/next contract.

use blue_common::{DiagnosticCode, FileId};
use blue_scanner::{Kw, Scanner, Token, TokenKind};

fn scanner(text: &str) -> Scanner {
    Scanner::new(FileId::from_raw(0), text, &[])
}

fn all_tokens(text: &str) -> Vec<Token> {
    let mut s = scanner(text);
    let mut tokens = Vec::new();
    loop {
        let tok = s.next();
        let done = tok.kind.is_terminal();
        tokens.push(tok);
        if done {
            break;
        }
    }
    tokens
}

#[test]
fn peek_does_not_consume() {
    let mut s = scanner("class C");
    assert!(s.peek().is_kw(Kw::Class));
    assert!(s.peek().is_kw(Kw::Class));
    assert!(s.next().is_kw(Kw::Class));
    assert!(matches!(s.peek().kind, TokenKind::Ident(ref n) if n == "C"));
}

#[test]
fn eof_is_sticky() {
    let mut s = scanner("x");
    s.next();
    assert_eq!(s.next().kind, TokenKind::Eof);
    assert_eq!(s.next().kind, TokenKind::Eof);
}

#[test]
fn operators_take_the_longest_match() {
    let kinds: Vec<TokenKind> = all_tokens("<< <<= < <= = == ! != >> >>= > >= && & || |")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Shl,
            TokenKind::ShlAssign,
            TokenKind::Lt,
            TokenKind::LtEq,
            TokenKind::Assign,
            TokenKind::EqEq,
            TokenKind::Bang,
            TokenKind::NotEq,
            TokenKind::Shr,
            TokenKind::ShrAssign,
            TokenKind::Gt,
            TokenKind::GtEq,
            TokenKind::AmpAmp,
            TokenKind::Amp,
            TokenKind::PipePipe,
            TokenKind::Pipe,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn comments_are_skipped_and_block_comments_do_not_nest() {
    let kinds: Vec<TokenKind> = all_tokens("a // line\n b /* block\n more */ c")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(kinds.len(), 4);

    let mut s = scanner("/* outer /* inner */ trailing");
    // The first `*/` closes the comment; `trailing` is a real token.
    assert!(matches!(s.next().kind, TokenKind::Ident(ref n) if n == "trailing"));
}

#[test]
fn unterminated_comment_reports_and_latches() {
    let mut s = scanner("/* never closed");
    assert_eq!(s.next().kind, TokenKind::Error);
    let diags = s.take_diagnostics();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, DiagnosticCode::UnterminatedComment);
}

#[test]
fn define_and_undef_drive_branches() {
    let text = "#define FEATURE\n#if FEATURE\n1\n#endif\n#undef FEATURE\n#if FEATURE\n2\n#endif\n3";
    let kinds: Vec<TokenKind> = all_tokens(text).into_iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![TokenKind::Int(1), TokenKind::Int(3), TokenKind::Eof]
    );
}

#[test]
fn regions_nest_and_unmatched_endregion_fails() {
    let kinds: Vec<TokenKind> = all_tokens("#region outer\n#region inner\n1\n#endregion\n#endregion\n2")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![TokenKind::Int(1), TokenKind::Int(2), TokenKind::Eof]
    );

    let mut s = scanner("#endregion\n");
    assert_eq!(s.next().kind, TokenKind::Error);
    assert_eq!(
        s.take_diagnostics()[0].code,
        DiagnosticCode::UnmatchedEndRegion
    );
}

#[test]
fn command_line_defines_seed_the_table() {
    let mut s = Scanner::new(
        FileId::from_raw(0),
        "#if EXTRA\n42\n#endif\n",
        &["EXTRA".to_string()],
    );
    assert_eq!(s.next().kind, TokenKind::Int(42));
}

#[test]
fn spans_carry_line_and_column() {
    let mut s = scanner("a\n  bb");
    let a = s.next();
    assert_eq!((a.span.start.line, a.span.start.col), (1, 1));
    let bb = s.next();
    assert_eq!((bb.span.start.line, bb.span.start.col), (2, 3));
    assert_eq!(bb.span.end.col, 5);
}

#[test]
fn keywords_and_identifiers_split_correctly() {
    let kinds: Vec<TokenKind> = all_tokens("class classy if iffy")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenKind::Kw(Kw::Class),
            TokenKind::Ident("classy".to_string()),
            TokenKind::Kw(Kw::If),
            TokenKind::Ident("iffy".to_string()),
            TokenKind::Eof,
        ]
    );
}
