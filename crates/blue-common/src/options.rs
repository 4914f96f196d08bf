//! Compile options.
//!
//! This struct lives in blue-common so every stage can consult it without
//! depending on the CLI crate. The CLI fills it from slash options and
//! response files.

use std::path::PathBuf;

/// What kind of module to produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TargetKind {
    /// Console executable (`.exe`), the default.
    #[default]
    Console,
    /// Windowed executable (`.exe`).
    Windows,
    /// Library (`.dll`), no entry point.
    Library,
}

impl TargetKind {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            TargetKind::Console | TargetKind::Windows => "exe",
            TargetKind::Library => "dll",
        }
    }

    #[must_use]
    pub const fn is_executable(self) -> bool {
        !matches!(self, TargetKind::Library)
    }
}

/// Debug halt points (`/_Q:` option): stop the pipeline after a stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaltStage {
    Lexer,
    Parser,
    Resolve,
}

/// Options controlling one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub target: TargetKind,
    /// Emit debug info: sequence points and local-variable names.
    pub debug: bool,
    /// Class to search for the entry point (`/main:CLASS`).
    pub main_class: Option<String>,
    /// Output file (`/out:FILE`); otherwise derived from the first source.
    pub out: Option<PathBuf>,
    /// Referenced assemblies (`/reference:NAME`).
    pub references: Vec<String>,
    /// Preprocessor symbols (`/define:SYM`).
    pub defines: Vec<String>,
    /// Dump AST and symbol tables as XML (`/xml`).
    pub xml_dump: bool,
    /// Debug halt point (`/_Q:`).
    pub halt: Option<HaltStage>,
}
