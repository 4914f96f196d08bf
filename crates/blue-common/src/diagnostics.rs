//! Diagnostics for every compilation stage.
//!
//! Diagnostics are plain values pushed into a single `DiagnosticBag`. No
//! stage aborts on the first error; each local operation returns a sentinel
//! and continues, and the driver gates later stages on `has_errors`.

use crate::source_map::SourceMap;
use crate::span::SourceSpan;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Lex,
    Parse,
    Resolve,
    Emit,
    Driver,
}

/// The closed set of diagnostic kinds. Tests rely on this enum being
/// exhaustive; new kinds are an interface change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // Lexer
    UnterminatedComment,
    NewlineInString,
    UnterminatedChar,
    UnrecognizedEscape,
    UnexpectedEof,
    PreprocMustStartLine,
    InvalidPreprocDirective,
    UnmatchedEndRegion,
    MissingEndif,

    // Parser
    SyntaxError,
    DuplicateModifier,
    NotYetImplemented,

    // Resolver
    UndefinedSymbol,
    SymbolAlreadyDefined,
    TypeMismatch,
    IllegalImportAssembly,
    MissingAsmReference,
    ShadowCatchHandlers,
    LabelAlreadyDefined,
    BadSymbolType,
    MustBeInsideLoop,
    OnlySingleInheritance,
    NoReturnTypeExpected,
    AmbiguousMethod,
    MethodNotDefined,
    NoAcceptableOverload,
    CircularReference,
    NoParamsOnStaticCtor,
    NotValidLhs,
    NoFieldInitForStructs,
    NoAcceptableOperator,
    AsOpOnlyOnRefTypes,
    BadTypeIfExp,
    MissingInterfaceMethod,
    IMethodMustBePublic,
    SymbolNotInNamespace,
    SymbolNotInType,
    ClassMustBeAbstract,
    NoMethodToOverride,
    CantOverrideFinal,
    CantOverrideNonVirtual,
    VisibilityMismatch,
    MustDeriveFromInterface,
    NoEventOnRhs,
    MustBeCompileTimeConstant,
    NewArrayBoundsMismatch,
    NoAcceptableIndexer,
    BaseAccessCantBeStatic,

    // Emitter
    DuplicateMain,
    NoMain,
    IoError,
    EntryClassNotFound,

    // Driver
    UnknownOption,
    MissingSourceFiles,
    AssemblyLoadError,
    InternalError,
}

impl DiagnosticCode {
    #[must_use]
    pub const fn category(self) -> DiagnosticCategory {
        use DiagnosticCode::*;
        match self {
            UnterminatedComment | NewlineInString | UnterminatedChar | UnrecognizedEscape
            | UnexpectedEof | PreprocMustStartLine | InvalidPreprocDirective
            | UnmatchedEndRegion | MissingEndif => DiagnosticCategory::Lex,
            SyntaxError | DuplicateModifier | NotYetImplemented => DiagnosticCategory::Parse,
            DuplicateMain | NoMain | IoError | EntryClassNotFound => DiagnosticCategory::Emit,
            UnknownOption | MissingSourceFiles | AssemblyLoadError | InternalError => {
                DiagnosticCategory::Driver
            }
            _ => DiagnosticCategory::Resolve,
        }
    }

    /// Stable numeric code, rendered as `BCxxxx`.
    #[must_use]
    pub const fn number(self) -> u16 {
        use DiagnosticCode::*;
        match self {
            UnterminatedComment => 1001,
            NewlineInString => 1002,
            UnterminatedChar => 1003,
            UnrecognizedEscape => 1004,
            UnexpectedEof => 1005,
            PreprocMustStartLine => 1006,
            InvalidPreprocDirective => 1007,
            UnmatchedEndRegion => 1008,
            MissingEndif => 1009,

            SyntaxError => 2001,
            DuplicateModifier => 2002,
            NotYetImplemented => 2003,

            UndefinedSymbol => 3001,
            SymbolAlreadyDefined => 3002,
            TypeMismatch => 3003,
            IllegalImportAssembly => 3004,
            MissingAsmReference => 3005,
            ShadowCatchHandlers => 3006,
            LabelAlreadyDefined => 3007,
            BadSymbolType => 3008,
            MustBeInsideLoop => 3009,
            OnlySingleInheritance => 3010,
            NoReturnTypeExpected => 3011,
            AmbiguousMethod => 3012,
            MethodNotDefined => 3013,
            NoAcceptableOverload => 3014,
            CircularReference => 3015,
            NoParamsOnStaticCtor => 3016,
            NotValidLhs => 3017,
            NoFieldInitForStructs => 3018,
            NoAcceptableOperator => 3019,
            AsOpOnlyOnRefTypes => 3020,
            BadTypeIfExp => 3021,
            MissingInterfaceMethod => 3022,
            IMethodMustBePublic => 3023,
            SymbolNotInNamespace => 3024,
            SymbolNotInType => 3025,
            ClassMustBeAbstract => 3026,
            NoMethodToOverride => 3027,
            CantOverrideFinal => 3028,
            CantOverrideNonVirtual => 3029,
            VisibilityMismatch => 3030,
            MustDeriveFromInterface => 3031,
            NoEventOnRhs => 3032,
            MustBeCompileTimeConstant => 3033,
            NewArrayBoundsMismatch => 3034,
            NoAcceptableIndexer => 3035,
            BaseAccessCantBeStatic => 3036,

            DuplicateMain => 4001,
            NoMain => 4002,
            IoError => 4003,
            EntryClassNotFound => 4004,

            UnknownOption => 9001,
            MissingSourceFiles => 9002,
            AssemblyLoadError => 9003,
            InternalError => 9999,
        }
    }
}

/// A single reported problem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub span: Option<SourceSpan>,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(code: DiagnosticCode, span: SourceSpan, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            span: Some(span),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn spanless(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            code,
            span: None,
            message: message.into(),
        }
    }

    /// Render as `file(line,col): error BCxxxx: message`.
    #[must_use]
    pub fn render(&self, sources: &SourceMap) -> String {
        match self.span {
            Some(span) if !span.is_synthetic() => format!(
                "{}({},{}): error BC{:04}: {}",
                sources.name(span.file),
                span.start.line,
                span.start.col,
                self.code.number(),
                self.message
            ),
            _ => format!("error BC{:04}: {}", self.code.number(), self.message),
        }
    }
}

/// The single sink all stages report into.
#[derive(Debug, Default)]
pub struct DiagnosticBag {
    diags: Vec<Diagnostic>,
}

impl DiagnosticBag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diag: Diagnostic) {
        self.diags.push(diag);
    }

    pub fn error(&mut self, code: DiagnosticCode, span: SourceSpan, message: impl Into<String>) {
        self.add(Diagnostic::new(code, span, message));
    }

    pub fn extend(&mut self, diags: impl IntoIterator<Item = Diagnostic>) {
        self.diags.extend(diags);
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.diags.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diags.iter()
    }

    /// Count of diagnostics with the given code.
    #[must_use]
    pub fn count_of(&self, code: DiagnosticCode) -> usize {
        self.diags.iter().filter(|d| d.code == code).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SourceMap;
    use crate::span::Pos;

    #[test]
    fn categories_partition_the_code_set() {
        assert_eq!(
            DiagnosticCode::MissingEndif.category(),
            DiagnosticCategory::Lex
        );
        assert_eq!(
            DiagnosticCode::SyntaxError.category(),
            DiagnosticCategory::Parse
        );
        assert_eq!(
            DiagnosticCode::AmbiguousMethod.category(),
            DiagnosticCategory::Resolve
        );
        assert_eq!(DiagnosticCode::NoMain.category(), DiagnosticCategory::Emit);
        assert_eq!(
            DiagnosticCode::InternalError.category(),
            DiagnosticCategory::Driver
        );
    }

    #[test]
    fn render_includes_file_and_position() {
        let mut sources = SourceMap::new();
        let file = sources.add_file("a.bs", "class C {}");
        let d = Diagnostic::new(
            DiagnosticCode::UndefinedSymbol,
            crate::SourceSpan::new(file, Pos::new(3, 7), Pos::new(3, 9)),
            "symbol 'x' is not defined",
        );
        assert_eq!(
            d.render(&sources),
            "a.bs(3,7): error BC3001: symbol 'x' is not defined"
        );
    }
}
