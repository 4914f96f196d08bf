//! Common types and utilities for the Blue compiler.
//!
//! This crate provides foundational types used across all blue crates:
//! - Source spans (`Pos`, `SourceSpan`) and the file registry (`SourceMap`)
//! - Shared symbol identifiers (`SymbolId`, `TypeId`)
//! - Diagnostics (`Diagnostic`, `DiagnosticCode`, `DiagnosticBag`)
//! - Compile options (`CompileOptions`)

pub mod diagnostics;
pub mod ids;
pub mod options;
pub mod source_map;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticCategory, DiagnosticCode};
pub use ids::{SymbolId, TypeId};
pub use options::{CompileOptions, HaltStage, TargetKind};
pub use source_map::{FileId, SourceFile, SourceMap};
pub use span::{Pos, SourceSpan};
