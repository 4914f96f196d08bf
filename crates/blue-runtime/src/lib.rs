//! Runtime backend capability surface for the Blue compiler.
//!
//! The emitter never talks to a concrete runtime directly; it drives the
//! `RuntimeBackend` trait (assembly/type/member builders plus an IL sink),
//! and the import stage reads referenced assemblies through the
//! `MetadataLoader` trait. This crate also provides:
//! - `Il` - the opcode set the emitter uses
//! - `RecordingBackend` - an in-memory backend for tests and as the
//!   default sink when no native backend is linked
//! - `CoreLib` - built-in metadata for the minimal standard-library
//!   surface the language depends on

pub mod backend;
pub mod corelib;
pub mod il;
pub mod metadata;
pub mod recording;

pub use backend::{
    BackendError, CreateOutcome, FieldAttrs, MethodAttrs, MethodImplFlags, RtDoc, RtField,
    RtLabel, RtMethod, RtType, RuntimeBackend, TypeAttrs,
};
pub use corelib::CoreLib;
pub use il::Il;
pub use metadata::{
    AssemblyRef, ImportedGenre, ImportedMember, ImportedMethod, ImportedTypeInfo, MetadataLoader,
};
pub use recording::{BodyEvent, RecordingBackend};
