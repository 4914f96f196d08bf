//! AST types and the recursive-descent parser for the Blue compiler.
//!
//! This crate provides:
//! - `ast` - the untyped syntax tree, with slots the resolver fills in
//! - `Parser` - a hand-written recursive-descent parser with single-token
//!   lookahead; one function per grammar production

pub mod ast;
pub mod parser;

pub use parser::{ParseResult, Parser};
