//! Scanner and preprocessor for the Blue compiler.
//!
//! This crate provides:
//! - `Token` / `TokenKind` - the token model consumed once by the parser
//! - `Scanner` - byte stream to token stream, with `#`-directives handled
//!   inline so the parser never sees preprocessor text

pub mod scanner;
pub mod token;

pub use scanner::Scanner;
pub use token::{Kw, Token, TokenKind};
