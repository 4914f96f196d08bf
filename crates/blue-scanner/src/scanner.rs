//! The scanner: byte stream to token stream.
//!
//! `next`/`peek` always succeed. End of input is a terminal `Eof` token; a
//! lexical error reports one diagnostic and latches the scanner into error
//! mode, after which every token is the terminal `Error` token.
//!
//! Preprocessor directives are folded in here: they are recognized only as
//! the first non-whitespace token on a line, and control which tokens the
//! parser ever sees. Skipping an inactive branch uses a dedicated dead-text
//! scan that recognizes nested `#if`/`#endif` without tokenizing, since
//! dead text need not be valid syntax.

use rustc_hash::FxHashSet;
use tracing::trace;

use blue_common::{Diagnostic, DiagnosticCode, FileId, Pos, SourceSpan};

use crate::token::{Token, TokenKind, keyword};

/// Always-defined preprocessor symbol.
pub const PREDEFINED_SYMBOL: &str = "__BLUE__";

struct IfFrame {
    /// A branch of this `#if`/`#elif`/`#else` chain has been taken.
    taken: bool,
    /// `#else` has been seen; another `#elif`/`#else` is an error.
    in_else: bool,
}

/// Outcome of a dead-branch scan.
enum DeadScan {
    /// A later branch of the current chain became active; resume scanning.
    Activated,
    /// The matching `#endif` was consumed; the chain is done.
    Ended,
    /// A lex error latched while skipping.
    Failed,
}

pub struct Scanner {
    src: Vec<char>,
    idx: usize,
    file: FileId,
    line: u32,
    col: u32,
    /// Only whitespace seen since the last newline.
    at_line_start: bool,
    latched: bool,
    peeked: Option<Token>,
    defines: FxHashSet<String>,
    if_stack: Vec<IfFrame>,
    region_depth: u32,
    diags: Vec<Diagnostic>,
}

impl Scanner {
    #[must_use]
    pub fn new(file: FileId, text: &str, defines: &[String]) -> Self {
        let mut set: FxHashSet<String> = defines.iter().cloned().collect();
        set.insert(PREDEFINED_SYMBOL.to_string());
        Scanner {
            src: text.chars().collect(),
            idx: 0,
            file,
            line: 1,
            col: 1,
            at_line_start: true,
            latched: false,
            peeked: None,
            defines: set,
            if_stack: Vec::new(),
            region_depth: 0,
            diags: Vec::new(),
        }
    }

    /// Diagnostics reported so far; drained by the caller.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diags)
    }

    #[must_use]
    pub fn had_error(&self) -> bool {
        self.latched
    }

    pub fn next(&mut self) -> Token {
        if let Some(tok) = self.peeked.take() {
            return tok;
        }
        let tok = self.scan_token();
        trace!(?tok.kind, line = tok.span.start.line, "token");
        tok
    }

    pub fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            let tok = self.scan_token();
            self.peeked = Some(tok);
        }
        self.peeked.as_ref().unwrap()
    }

    // ---- character primitives ----

    fn cur(&self) -> Option<char> {
        self.src.get(self.idx).copied()
    }

    fn lookahead(&self, n: usize) -> Option<char> {
        self.src.get(self.idx + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.cur()?;
        self.idx += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
            self.at_line_start = true;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn pos(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    fn span_from(&self, start: Pos) -> SourceSpan {
        SourceSpan::new(self.file, start, self.pos())
    }

    fn here(&self) -> SourceSpan {
        SourceSpan::new(self.file, self.pos(), self.pos())
    }

    fn fail(&mut self, code: DiagnosticCode, span: SourceSpan, msg: impl Into<String>) -> Token {
        if !self.latched {
            self.diags.push(Diagnostic::new(code, span, msg));
            self.latched = true;
        }
        Token::new(TokenKind::Error, span)
    }

    // ---- main scan loop ----

    fn scan_token(&mut self) -> Token {
        if self.latched {
            return Token::new(TokenKind::Error, self.here());
        }
        loop {
            match self.cur() {
                None => {
                    if !self.if_stack.is_empty() {
                        let span = self.here();
                        return self.fail(
                            DiagnosticCode::MissingEndif,
                            span,
                            "end of file reached with an open #if",
                        );
                    }
                    return Token::new(TokenKind::Eof, self.here());
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    if !self.at_line_start {
                        let span = self.here();
                        return self.fail(
                            DiagnosticCode::PreprocMustStartLine,
                            span,
                            "a preprocessor directive must be the first token on a line",
                        );
                    }
                    if let Err(tok) = self.directive() {
                        return tok;
                    }
                }
                Some('/') if self.lookahead(1) == Some('/') => {
                    self.skip_to_eol();
                }
                Some('/') if self.lookahead(1) == Some('*') => {
                    if let Err(tok) = self.skip_block_comment() {
                        return tok;
                    }
                }
                Some(_) => break,
            }
        }
        self.at_line_start = false;
        self.scan_concrete()
    }

    fn scan_concrete(&mut self) -> Token {
        let start = self.pos();
        let c = self.bump().unwrap();
        match c {
            'a'..='z' | 'A'..='Z' | '_' => self.scan_word(start, c),
            '0'..='9' => self.scan_number(start, c),
            '\'' => self.scan_char(start),
            '"' => self.scan_string(start),
            '(' => self.tok(start, TokenKind::LParen),
            ')' => self.tok(start, TokenKind::RParen),
            '{' => self.tok(start, TokenKind::LBrace),
            '}' => self.tok(start, TokenKind::RBrace),
            '[' => self.scan_bracket(start),
            ']' => self.tok(start, TokenKind::RBracket),
            ';' => self.tok(start, TokenKind::Semi),
            ',' => self.tok(start, TokenKind::Comma),
            '.' => self.tok(start, TokenKind::Dot),
            ':' => self.tok(start, TokenKind::Colon),
            '?' => self.tok(start, TokenKind::Question),
            '+' => match self.cur() {
                Some('+') => self.bump_tok(start, TokenKind::PlusPlus),
                Some('=') => self.bump_tok(start, TokenKind::PlusAssign),
                _ => self.tok(start, TokenKind::Plus),
            },
            '-' => match self.cur() {
                Some('-') => self.bump_tok(start, TokenKind::MinusMinus),
                Some('=') => self.bump_tok(start, TokenKind::MinusAssign),
                _ => self.tok(start, TokenKind::Minus),
            },
            '*' => match self.cur() {
                Some('=') => self.bump_tok(start, TokenKind::StarAssign),
                _ => self.tok(start, TokenKind::Star),
            },
            '/' => match self.cur() {
                Some('=') => self.bump_tok(start, TokenKind::SlashAssign),
                _ => self.tok(start, TokenKind::Slash),
            },
            '%' => match self.cur() {
                Some('=') => self.bump_tok(start, TokenKind::PercentAssign),
                _ => self.tok(start, TokenKind::Percent),
            },
            '&' => match self.cur() {
                Some('&') => self.bump_tok(start, TokenKind::AmpAmp),
                Some('=') => self.bump_tok(start, TokenKind::AmpAssign),
                _ => self.tok(start, TokenKind::Amp),
            },
            '|' => match self.cur() {
                Some('|') => self.bump_tok(start, TokenKind::PipePipe),
                Some('=') => self.bump_tok(start, TokenKind::PipeAssign),
                _ => self.tok(start, TokenKind::Pipe),
            },
            '^' => match self.cur() {
                Some('=') => self.bump_tok(start, TokenKind::CaretAssign),
                _ => self.tok(start, TokenKind::Caret),
            },
            '!' => match self.cur() {
                Some('=') => self.bump_tok(start, TokenKind::NotEq),
                _ => self.tok(start, TokenKind::Bang),
            },
            '=' => match self.cur() {
                Some('=') => self.bump_tok(start, TokenKind::EqEq),
                _ => self.tok(start, TokenKind::Assign),
            },
            '<' => match self.cur() {
                Some('=') => self.bump_tok(start, TokenKind::LtEq),
                Some('<') => {
                    self.bump();
                    match self.cur() {
                        Some('=') => self.bump_tok(start, TokenKind::ShlAssign),
                        _ => self.tok(start, TokenKind::Shl),
                    }
                }
                _ => self.tok(start, TokenKind::Lt),
            },
            '>' => match self.cur() {
                Some('=') => self.bump_tok(start, TokenKind::GtEq),
                Some('>') => {
                    self.bump();
                    match self.cur() {
                        Some('=') => self.bump_tok(start, TokenKind::ShrAssign),
                        _ => self.tok(start, TokenKind::Shr),
                    }
                }
                _ => self.tok(start, TokenKind::Gt),
            },
            other => {
                let span = self.span_from(start);
                self.fail(
                    DiagnosticCode::SyntaxError,
                    span,
                    format!("unexpected character '{other}'"),
                )
            }
        }
    }

    fn tok(&self, start: Pos, kind: TokenKind) -> Token {
        Token::new(kind, self.span_from(start))
    }

    fn bump_tok(&mut self, start: Pos, kind: TokenKind) -> Token {
        self.bump();
        self.tok(start, kind)
    }

    // ---- words and numbers ----

    fn scan_word(&mut self, start: Pos, first: char) -> Token {
        let mut text = String::new();
        text.push(first);
        while let Some(c) = self.cur() {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.bump();
            } else {
                break;
            }
        }
        let kind = match text.as_str() {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => match keyword(&text) {
                Some(kw) => TokenKind::Kw(kw),
                None => TokenKind::Ident(text),
            },
        };
        self.tok(start, kind)
    }

    fn scan_number(&mut self, start: Pos, first: char) -> Token {
        if first == '0' && matches!(self.cur(), Some('x' | 'X')) {
            self.bump();
            let mut value: u64 = 0;
            let mut digits = 0usize;
            while let Some(c) = self.cur() {
                if let Some(d) = c.to_digit(16) {
                    value = value.wrapping_mul(16).wrapping_add(u64::from(d));
                    digits += 1;
                    self.bump();
                } else {
                    break;
                }
            }
            if digits == 0 {
                let span = self.span_from(start);
                return self.fail(
                    DiagnosticCode::SyntaxError,
                    span,
                    "hexadecimal literal requires at least one digit",
                );
            }
            return self.tok(start, TokenKind::Int(value as i64));
        }
        let mut value: u64 = u64::from(first.to_digit(10).unwrap());
        while let Some(c) = self.cur() {
            if let Some(d) = c.to_digit(10) {
                value = value.saturating_mul(10).saturating_add(u64::from(d));
                self.bump();
            } else {
                break;
            }
        }
        if self.cur() == Some('.') && self.lookahead(1).is_some_and(|c| c.is_ascii_digit()) {
            let span = self.span_from(start);
            return self.fail(
                DiagnosticCode::SyntaxError,
                span,
                "floating-point literals are not supported",
            );
        }
        self.tok(start, TokenKind::Int(value as i64))
    }

    // ---- character and string literals ----

    fn scan_escape(&mut self, start: Pos) -> Result<char, Token> {
        match self.bump() {
            Some('\'') => Ok('\''),
            Some('"') => Ok('"'),
            Some('\\') => Ok('\\'),
            Some('0') => Ok('\0'),
            Some('a') => Ok('\x07'),
            Some('b') => Ok('\x08'),
            Some('f') => Ok('\x0C'),
            Some('n') => Ok('\n'),
            Some('r') => Ok('\r'),
            Some('t') => Ok('\t'),
            Some('v') => Ok('\x0B'),
            Some(other) => {
                let span = self.span_from(start);
                Err(self.fail(
                    DiagnosticCode::UnrecognizedEscape,
                    span,
                    format!("unrecognized escape sequence '\\{other}'"),
                ))
            }
            None => {
                let span = self.span_from(start);
                Err(self.fail(
                    DiagnosticCode::UnexpectedEof,
                    span,
                    "end of file in escape sequence",
                ))
            }
        }
    }

    fn scan_char(&mut self, start: Pos) -> Token {
        let value = match self.bump() {
            None => {
                let span = self.span_from(start);
                return self.fail(
                    DiagnosticCode::UnexpectedEof,
                    span,
                    "end of file in character constant",
                );
            }
            Some('\n') | Some('\'') => {
                let span = self.span_from(start);
                return self.fail(
                    DiagnosticCode::UnterminatedChar,
                    span,
                    "character constant is unterminated",
                );
            }
            Some('\\') => match self.scan_escape(start) {
                Ok(c) => c,
                Err(tok) => return tok,
            },
            Some(c) => c,
        };
        if self.cur() != Some('\'') {
            let span = self.span_from(start);
            return self.fail(
                DiagnosticCode::UnterminatedChar,
                span,
                "character constant is unterminated",
            );
        }
        self.bump();
        self.tok(start, TokenKind::Char(value))
    }

    fn scan_string(&mut self, start: Pos) -> Token {
        let mut text = String::new();
        loop {
            match self.bump() {
                None => {
                    let span = self.span_from(start);
                    return self.fail(
                        DiagnosticCode::UnexpectedEof,
                        span,
                        "end of file in string literal",
                    );
                }
                Some('\n') => {
                    let span = self.span_from(start);
                    return self.fail(
                        DiagnosticCode::NewlineInString,
                        span,
                        "newline in string literal",
                    );
                }
                Some('"') => break,
                Some('\\') => match self.scan_escape(start) {
                    Ok(c) => text.push(c),
                    Err(tok) => return tok,
                },
                Some(c) => text.push(c),
            }
        }
        self.tok(start, TokenKind::Str(text))
    }

    // ---- brackets and array ranks ----

    /// `[` was consumed. If what follows is only commas then `]`, this is a
    /// rank specifier token `[,,...]` whose payload is the rank.
    fn scan_bracket(&mut self, start: Pos) -> Token {
        let mut j = self.idx;
        let mut commas = 0u32;
        loop {
            match self.src.get(j) {
                Some(c) if c.is_whitespace() => j += 1,
                Some(',') => {
                    commas += 1;
                    j += 1;
                }
                Some(']') => {
                    while self.idx <= j {
                        self.bump();
                    }
                    return self.tok(start, TokenKind::ArrayRank(commas + 1));
                }
                _ => return self.tok(start, TokenKind::LBracket),
            }
        }
    }

    // ---- comments ----

    fn skip_to_eol(&mut self) {
        while let Some(c) = self.cur() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), Token> {
        let start = self.pos();
        self.bump(); // '/'
        self.bump(); // '*'
        loop {
            match self.bump() {
                None => {
                    let span = self.span_from(start);
                    return Err(self.fail(
                        DiagnosticCode::UnterminatedComment,
                        span,
                        "comment is unterminated",
                    ));
                }
                Some('*') if self.cur() == Some('/') => {
                    self.bump();
                    self.at_line_start = false;
                    return Ok(());
                }
                Some(_) => {}
            }
        }
    }

    // ---- preprocessor ----

    fn directive(&mut self) -> Result<(), Token> {
        let start = self.pos();
        self.bump(); // '#'
        self.skip_line_ws();
        let word = self.read_directive_word();
        match word.as_str() {
            "define" => {
                self.skip_line_ws();
                let sym = self.read_symbol_name();
                self.defines.insert(sym);
                self.skip_to_eol();
                Ok(())
            }
            "undef" => {
                self.skip_line_ws();
                let sym = self.read_symbol_name();
                self.defines.remove(&sym);
                self.skip_to_eol();
                Ok(())
            }
            "region" => {
                self.region_depth += 1;
                self.skip_to_eol();
                Ok(())
            }
            "endregion" => {
                if self.region_depth == 0 {
                    let span = self.span_from(start);
                    return Err(self.fail(
                        DiagnosticCode::UnmatchedEndRegion,
                        span,
                        "#endregion without a matching #region",
                    ));
                }
                self.region_depth -= 1;
                self.skip_to_eol();
                Ok(())
            }
            "if" => {
                let cond = self.eval_condition(start)?;
                self.skip_to_eol();
                self.if_stack.push(IfFrame {
                    taken: cond,
                    in_else: false,
                });
                if cond {
                    Ok(())
                } else {
                    self.skip_dead_branch(start, true)
                }
            }
            "elif" | "else" => {
                // We only scan live text, so the current chain's live branch
                // just ended; everything to the matching #endif is dead.
                let Some(frame) = self.if_stack.last_mut() else {
                    let span = self.span_from(start);
                    return Err(self.fail(
                        DiagnosticCode::InvalidPreprocDirective,
                        span,
                        format!("#{word} without a matching #if"),
                    ));
                };
                if frame.in_else {
                    let span = self.span_from(start);
                    return Err(self.fail(
                        DiagnosticCode::InvalidPreprocDirective,
                        span,
                        format!("#{word} after #else"),
                    ));
                }
                frame.taken = true;
                self.skip_to_eol();
                self.skip_dead_branch(start, false)
            }
            "endif" => {
                if self.if_stack.pop().is_none() {
                    let span = self.span_from(start);
                    return Err(self.fail(
                        DiagnosticCode::InvalidPreprocDirective,
                        span,
                        "#endif without a matching #if",
                    ));
                }
                self.skip_to_eol();
                Ok(())
            }
            other => {
                let span = self.span_from(start);
                Err(self.fail(
                    DiagnosticCode::InvalidPreprocDirective,
                    span,
                    format!("'#{other}' is not a valid preprocessor directive"),
                ))
            }
        }
    }

    fn skip_line_ws(&mut self) {
        while let Some(c) = self.cur() {
            if c == ' ' || c == '\t' || c == '\r' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn read_directive_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.cur() {
            if c.is_ascii_lowercase() {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        word
    }

    fn read_symbol_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.cur() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    /// The expression after `#if`/`#elif` is a single symbol name or the
    /// literals `true`/`false`; anything more is out of scope.
    fn eval_condition(&mut self, dir_start: Pos) -> Result<bool, Token> {
        self.skip_line_ws();
        let name = self.read_symbol_name();
        if name.is_empty() {
            let span = self.span_from(dir_start);
            return Err(self.fail(
                DiagnosticCode::InvalidPreprocDirective,
                span,
                "expected a symbol name after the directive",
            ));
        }
        Ok(match name.as_str() {
            "true" => true,
            "false" => false,
            sym => self.defines.contains(sym),
        })
    }

    /// Skip dead text until a branch of the innermost chain activates or
    /// its `#endif` is consumed. When `take_branches` is false, `#elif` and
    /// `#else` at depth zero are dead too (the live branch already ran).
    fn skip_dead_branch(&mut self, dir_start: Pos, take_branches: bool) -> Result<(), Token> {
        match self.scan_dead(dir_start, take_branches) {
            DeadScan::Activated | DeadScan::Ended => Ok(()),
            DeadScan::Failed => Err(Token::new(TokenKind::Error, self.here())),
        }
    }

    fn scan_dead(&mut self, dir_start: Pos, take_branches: bool) -> DeadScan {
        let mut depth = 0u32;
        loop {
            self.skip_to_eol();
            if self.cur().is_none() {
                let span = self.span_from(dir_start);
                self.fail(
                    DiagnosticCode::MissingEndif,
                    span,
                    "end of file reached with an open #if",
                );
                return DeadScan::Failed;
            }
            self.bump(); // newline
            self.skip_line_ws();
            if self.cur() != Some('#') {
                continue;
            }
            self.bump();
            self.skip_line_ws();
            let word = self.read_directive_word();
            match word.as_str() {
                "if" => depth += 1,
                "endif" if depth > 0 => depth -= 1,
                "endif" => {
                    self.if_stack.pop();
                    self.skip_to_eol();
                    return DeadScan::Ended;
                }
                "elif" if depth == 0 && take_branches => {
                    let start = self.pos();
                    let cond = match self.eval_condition(start) {
                        Ok(c) => c,
                        Err(_) => return DeadScan::Failed,
                    };
                    let frame = self.if_stack.last_mut().unwrap();
                    if !frame.taken && cond {
                        frame.taken = true;
                        self.skip_to_eol();
                        return DeadScan::Activated;
                    }
                }
                "else" if depth == 0 && take_branches => {
                    let frame = self.if_stack.last_mut().unwrap();
                    frame.in_else = true;
                    if !frame.taken {
                        frame.taken = true;
                        self.skip_to_eol();
                        return DeadScan::Activated;
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blue_common::SourceMap;

    fn scan_kinds(text: &str) -> Vec<TokenKind> {
        let mut sources = SourceMap::new();
        let file = sources.add_file("test.bs", text);
        let mut scanner = Scanner::new(file, text, &[]);
        let mut kinds = Vec::new();
        loop {
            let tok = scanner.next();
            let terminal = tok.kind.is_terminal();
            kinds.push(tok.kind);
            if terminal {
                break;
            }
        }
        kinds
    }

    #[test]
    fn rank_specifiers_fold_into_one_token() {
        let kinds = scan_kinds("int[] a; int[,,] b; a[0]");
        assert!(kinds.contains(&TokenKind::ArrayRank(1)));
        assert!(kinds.contains(&TokenKind::ArrayRank(3)));
        assert!(kinds.contains(&TokenKind::LBracket));
    }

    #[test]
    fn predefined_symbol_is_live() {
        let kinds = scan_kinds("#if __BLUE__\nclass\n#endif\n");
        assert_eq!(kinds, vec![TokenKind::Kw(crate::Kw::Class), TokenKind::Eof]);
    }

    #[test]
    fn dead_branch_may_contain_garbage() {
        let kinds = scan_kinds("#if NOPE\n$$$ not even tokens ###\n#else\n42\n#endif\n");
        assert_eq!(kinds, vec![TokenKind::Int(42), TokenKind::Eof]);
    }

    #[test]
    fn nested_dead_ifs_are_skipped_whole() {
        let text = "#if NOPE\n#if ALSO_NOPE\nx\n#endif\ny\n#endif\ndone";
        let kinds = scan_kinds(text);
        assert_eq!(
            kinds,
            vec![TokenKind::Ident("done".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn elif_chains_take_first_true_branch() {
        let text = "#define B\n#if A\n1\n#elif B\n2\n#elif C\n3\n#else\n4\n#endif\n";
        assert_eq!(scan_kinds(text), vec![TokenKind::Int(2), TokenKind::Eof]);
    }

    #[test]
    fn live_branch_skips_the_rest_of_the_chain() {
        let text = "#if true\n1\n#elif true\n2\n#else\n3\n#endif\nend";
        assert_eq!(
            scan_kinds(text),
            vec![
                TokenKind::Int(1),
                TokenKind::Ident("end".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn missing_endif_is_reported() {
        let mut sources = SourceMap::new();
        let file = sources.add_file("t.bs", "#if X\n1\n");
        let mut scanner = Scanner::new(file, "#if X\n1\n", &[]);
        let tok = scanner.next();
        assert_eq!(tok.kind, TokenKind::Error);
        let diags = scanner.take_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::MissingEndif);
    }

    #[test]
    fn directive_must_start_its_line() {
        let mut scanner = Scanner::new(FileId::from_raw(0), "int x; #define Y\n", &[]);
        let mut last = scanner.next();
        while !last.kind.is_terminal() {
            last = scanner.next();
        }
        assert_eq!(last.kind, TokenKind::Error);
        assert_eq!(
            scanner.take_diagnostics()[0].code,
            DiagnosticCode::PreprocMustStartLine
        );
    }

    #[test]
    fn error_mode_latches() {
        let mut scanner = Scanner::new(FileId::from_raw(0), "\"unterminated\nint", &[]);
        assert_eq!(scanner.next().kind, TokenKind::Error);
        assert_eq!(scanner.next().kind, TokenKind::Error);
        assert_eq!(scanner.take_diagnostics().len(), 1);
    }

    #[test]
    fn escapes_cover_the_standard_set() {
        let kinds = scan_kinds(r#"'\n' '\t' '\\' '\0' "a\"b""#);
        assert_eq!(
            kinds,
            vec![
                TokenKind::Char('\n'),
                TokenKind::Char('\t'),
                TokenKind::Char('\\'),
                TokenKind::Char('\0'),
                TokenKind::Str("a\"b".to_string()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn hex_literals_cover_the_unsigned_range() {
        let kinds = scan_kinds("0xFF 0x0 0xFFFFFFFF");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Int(0xFF),
                TokenKind::Int(0),
                TokenKind::Int(0xFFFF_FFFF),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn token_spans_are_monotone() {
        let text = "class C { int x; }";
        let mut scanner = Scanner::new(FileId::from_raw(0), text, &[]);
        let mut prev_end = Pos::new(1, 1);
        loop {
            let tok = scanner.next();
            if tok.kind.is_terminal() {
                break;
            }
            assert!(tok.span.start <= tok.span.end);
            assert!(prev_end <= tok.span.start);
            prev_end = tok.span.end;
        }
    }
}
