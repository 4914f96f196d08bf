//! Command-line driver for the Blue compiler.
//!
//! This crate provides:
//! - `args` - slash-option and `@response`-file parsing
//! - `driver` - the staged compilation pipeline with exit-code mapping
//! - `dump` - the `/xml` AST/symbol dump
//! - `trace` - tracing-subscriber setup for the binary

pub mod args;
pub mod driver;
pub mod dump;
pub mod trace;
