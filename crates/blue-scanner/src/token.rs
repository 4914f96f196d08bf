//! The token model.
//!
//! A token is a tagged variant carrying its kind-specific payload plus the
//! source range it was scanned from. Tokens are produced by the scanner and
//! consumed exactly once by the parser.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use blue_common::SourceSpan;

/// Reserved words of the language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kw {
    Abstract,
    As,
    Base,
    Bool,
    Break,
    Case,
    Catch,
    Char,
    Checked,
    Class,
    Const,
    Continue,
    Default,
    Delegate,
    Do,
    Else,
    Enum,
    Event,
    Finally,
    For,
    Foreach,
    Goto,
    If,
    In,
    Int,
    Interface,
    Internal,
    Is,
    Lock,
    Namespace,
    New,
    Null,
    Object,
    Operator,
    Out,
    Override,
    Private,
    Protected,
    Public,
    Readonly,
    Ref,
    Return,
    Sealed,
    Static,
    String,
    Struct,
    Switch,
    This,
    Throw,
    Try,
    Typeof,
    Unchecked,
    Using,
    Virtual,
    Void,
    While,
}

impl Kw {
    #[must_use]
    pub const fn text(self) -> &'static str {
        use Kw::*;
        match self {
            Abstract => "abstract",
            As => "as",
            Base => "base",
            Bool => "bool",
            Break => "break",
            Case => "case",
            Catch => "catch",
            Char => "char",
            Checked => "checked",
            Class => "class",
            Const => "const",
            Continue => "continue",
            Default => "default",
            Delegate => "delegate",
            Do => "do",
            Else => "else",
            Enum => "enum",
            Event => "event",
            Finally => "finally",
            For => "for",
            Foreach => "foreach",
            Goto => "goto",
            If => "if",
            In => "in",
            Int => "int",
            Interface => "interface",
            Internal => "internal",
            Is => "is",
            Lock => "lock",
            Namespace => "namespace",
            New => "new",
            Null => "null",
            Object => "object",
            Operator => "operator",
            Out => "out",
            Override => "override",
            Private => "private",
            Protected => "protected",
            Public => "public",
            Readonly => "readonly",
            Ref => "ref",
            Return => "return",
            Sealed => "sealed",
            Static => "static",
            String => "string",
            Struct => "struct",
            Switch => "switch",
            This => "this",
            Throw => "throw",
            Try => "try",
            Typeof => "typeof",
            Unchecked => "unchecked",
            Using => "using",
            Virtual => "virtual",
            Void => "void",
            While => "while",
        }
    }
}

static KEYWORDS: Lazy<FxHashMap<&'static str, Kw>> = Lazy::new(|| {
    use Kw::*;
    [
        Abstract, As, Base, Bool, Break, Case, Catch, Char, Checked, Class, Const, Continue,
        Default, Delegate, Do, Else, Enum, Event, Finally, For, Foreach, Goto, If, In, Int,
        Interface, Internal, Is, Lock, Namespace, New, Null, Object, Operator, Out, Override,
        Private, Protected, Public, Readonly, Ref, Return, Sealed, Static, String, Struct, Switch,
        This, Throw, Try, Typeof, Unchecked, Using, Virtual, Void, While,
    ]
    .into_iter()
    .map(|kw| (kw.text(), kw))
    .collect()
});

/// Look up a reserved word. `true` and `false` are not here; they scan as
/// `TokenKind::Bool` literals.
#[must_use]
pub fn keyword(text: &str) -> Option<Kw> {
    KEYWORDS.get(text).copied()
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Char(char),
    Str(String),
    Bool(bool),
    Kw(Kw),

    /// `[]`, `[,]`, `[,,]`, ... — payload is the rank (commas + 1).
    ArrayRank(u32),

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semi,
    Comma,
    Dot,
    Colon,
    Question,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Bang,
    AmpAmp,
    PipePipe,

    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,

    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Shl,
    Shr,

    PlusPlus,
    MinusMinus,

    /// Terminal token at end of input. `next` keeps returning it.
    Eof,
    /// Terminal token after a lex error; the scanner latches into error
    /// mode and keeps returning it.
    Error,
}

impl TokenKind {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenKind::Eof | TokenKind::Error)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, span: SourceSpan) -> Self {
        Token { kind, span }
    }

    #[must_use]
    pub fn is(&self, kind: &TokenKind) -> bool {
        self.kind == *kind
    }

    #[must_use]
    pub fn is_kw(&self, kw: Kw) -> bool {
        matches!(self.kind, TokenKind::Kw(k) if k == kw)
    }
}
