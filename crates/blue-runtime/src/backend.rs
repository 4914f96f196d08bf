//! The `RuntimeBackend` trait: everything the emitter needs from the host
//! runtime's dynamic type-and-method builder surface.
//!
//! Two documented backend quirks are part of this contract, as explicit
//! policy rather than implicit behavior:
//! - `create_type` may report that a nested type must be created first,
//!   identified by its SHORT name only; the caller composes the full name
//!   from its own in-progress stack and retries (`CreateOutcome`).
//! - Enum builders are not used at all; enums are declared as ordinary
//!   type builders carrying a special-name `value__` integer field.

use std::path::{Path, PathBuf};

use bitflags::bitflags;
use thiserror::Error;

use blue_common::{Pos, TargetKind};

use crate::il::Il;

/// Opaque handle to a runtime type: a builder, an imported type, or a
/// constructed array/by-ref type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RtType(pub u32);

/// Opaque handle to a method or constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RtMethod(pub u32);

/// Opaque handle to a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RtField(pub u32);

/// Label inside the method body currently being generated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RtLabel(pub u32);

/// Debug symbol document for one source file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RtDoc(pub u32);

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct TypeAttrs: u16 {
        const PUBLIC       = 1 << 0;
        const ABSTRACT     = 1 << 1;
        const SEALED       = 1 << 2;
        const INTERFACE    = 1 << 3;
        /// Derives from System.ValueType (or is the enum workaround shape).
        const VALUE_TYPE   = 1 << 4;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct FieldAttrs: u16 {
        const PUBLIC       = 1 << 0;
        const PRIVATE      = 1 << 1;
        const FAMILY       = 1 << 2;
        const ASSEMBLY     = 1 << 3;
        const STATIC       = 1 << 4;
        const INIT_ONLY    = 1 << 5;
        const LITERAL      = 1 << 6;
        const SPECIAL_NAME = 1 << 7;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MethodAttrs: u16 {
        const PUBLIC       = 1 << 0;
        const PRIVATE      = 1 << 1;
        const FAMILY       = 1 << 2;
        const ASSEMBLY     = 1 << 3;
        const STATIC       = 1 << 4;
        const VIRTUAL      = 1 << 5;
        const ABSTRACT     = 1 << 6;
        const FINAL        = 1 << 7;
        const NEW_SLOT     = 1 << 8;
        const SPECIAL_NAME = 1 << 9;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MethodImplFlags: u8 {
        /// Body supplied by the runtime (delegate members).
        const RUNTIME = 1 << 0;
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("type '{0}' is not known to the runtime")]
    UnknownType(String),
    #[error("member '{member}' not found on '{ty}'")]
    UnknownMember { ty: String, member: String },
    #[error("type '{0}' is already created")]
    AlreadyCreated(String),
    #[error("no method body is being generated")]
    NoBody,
    #[error("assembly '{0}' could not be loaded")]
    AssemblyLoad(String),
    #[error("failed to write '{path}'")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid backend operation: {0}")]
    Invalid(String),
}

/// Outcome of a `create_type` request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The type is finalized (or already was; the second request is a
    /// no-op).
    Created,
    /// A nested type must be created first. Only the short name is
    /// supplied; the caller composes the full name and retries after
    /// creating it.
    NeedsNested { short_name: String },
}

pub trait RuntimeBackend {
    // ---- module level ----

    fn begin_assembly(
        &mut self,
        name: &str,
        kind: TargetKind,
        debug: bool,
    ) -> Result<(), BackendError>;

    /// Register a source file for debug info; required before emitting
    /// sequence points against it.
    fn define_document(&mut self, file_name: &str) -> Result<RtDoc, BackendError>;

    // ---- type handles ----

    /// Resolve a runtime type by its full name. Nested names use `+`
    /// separators (`Outer+Inner`).
    fn get_type(&mut self, full_name: &str) -> Result<RtType, BackendError>;

    fn array_of(&mut self, elem: RtType) -> RtType;

    fn byref_of(&mut self, elem: RtType) -> RtType;

    // ---- member handles on existing (imported) types ----

    fn find_method(
        &mut self,
        ty: RtType,
        name: &str,
        params: &[RtType],
    ) -> Result<RtMethod, BackendError>;

    fn find_ctor(&mut self, ty: RtType, params: &[RtType]) -> Result<RtMethod, BackendError>;

    fn find_field(&mut self, ty: RtType, name: &str) -> Result<RtField, BackendError>;

    // ---- builders ----

    fn define_type(
        &mut self,
        full_name: &str,
        attrs: TypeAttrs,
        super_ty: Option<RtType>,
        interfaces: &[RtType],
    ) -> Result<RtType, BackendError>;

    fn define_nested_type(
        &mut self,
        container: RtType,
        name: &str,
        attrs: TypeAttrs,
        super_ty: Option<RtType>,
        interfaces: &[RtType],
    ) -> Result<RtType, BackendError>;

    fn define_field(
        &mut self,
        ty: RtType,
        name: &str,
        field_ty: RtType,
        attrs: FieldAttrs,
    ) -> Result<RtField, BackendError>;

    /// Compile-time-constant field (enum members, `const` fields).
    fn define_literal_field(
        &mut self,
        ty: RtType,
        name: &str,
        field_ty: RtType,
        attrs: FieldAttrs,
        value: i32,
    ) -> Result<RtField, BackendError>;

    fn define_method(
        &mut self,
        ty: RtType,
        name: &str,
        attrs: MethodAttrs,
        ret: Option<RtType>,
        params: &[RtType],
    ) -> Result<RtMethod, BackendError>;

    fn define_ctor(
        &mut self,
        ty: RtType,
        attrs: MethodAttrs,
        params: &[RtType],
    ) -> Result<RtMethod, BackendError>;

    fn set_impl_flags(
        &mut self,
        method: RtMethod,
        flags: MethodImplFlags,
    ) -> Result<(), BackendError>;

    /// Declare parameter `index` (1-based; 0 is the return slot) with its
    /// name and out-flow flag.
    fn define_param(
        &mut self,
        method: RtMethod,
        index: u16,
        name: &str,
        is_out: bool,
    ) -> Result<(), BackendError>;

    fn define_property(
        &mut self,
        ty: RtType,
        name: &str,
        prop_ty: RtType,
        getter: Option<RtMethod>,
        setter: Option<RtMethod>,
    ) -> Result<(), BackendError>;

    fn define_event(
        &mut self,
        ty: RtType,
        name: &str,
        event_ty: RtType,
    ) -> Result<(), BackendError>;

    // ---- method bodies ----

    fn begin_body(&mut self, method: RtMethod) -> Result<(), BackendError>;

    /// Returns the local's slot number.
    fn declare_local(&mut self, ty: RtType, name: Option<&str>) -> Result<u16, BackendError>;

    fn define_label(&mut self) -> RtLabel;

    fn mark_label(&mut self, label: RtLabel) -> Result<(), BackendError>;

    fn emit(&mut self, il: Il);

    fn begin_try(&mut self) -> Result<(), BackendError>;

    /// `None` starts a catch-all handler.
    fn begin_catch(&mut self, exception: Option<RtType>) -> Result<(), BackendError>;

    fn begin_finally(&mut self) -> Result<(), BackendError>;

    fn end_try(&mut self) -> Result<(), BackendError>;

    fn sequence_point(&mut self, doc: RtDoc, start: Pos, end: Pos);

    fn end_body(&mut self) -> Result<(), BackendError>;

    // ---- finalization ----

    fn create_type(&mut self, ty: RtType) -> Result<CreateOutcome, BackendError>;

    fn set_entry_point(&mut self, method: RtMethod) -> Result<(), BackendError>;

    fn save(&mut self, path: &Path) -> Result<(), BackendError>;
}
