//! Bytecode emitter for the Blue compiler.
//!
//! Drives the `RuntimeBackend` capability: declares the assembly, module,
//! types, and members, then walks the resolved AST to generate bytecode
//! per method, finalizes every type (recursively, with the short-name
//! nested-type negotiation), selects the entry point, and saves.

mod context;
mod expr;
mod output;
mod stmt;

pub use context::Emitter;
pub use output::derive_output_path;
