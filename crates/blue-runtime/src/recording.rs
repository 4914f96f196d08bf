//! An in-memory `RuntimeBackend` that records everything the emitter does.
//!
//! Used by emitter and driver tests (assertions run against the recorded
//! structure and instruction streams) and as the default sink when no
//! native backend is linked. Models the two contractual backend quirks:
//! `create_type` demands not-yet-created nested types by SHORT name, and
//! enums arrive as plain type builders (there is no enum-builder entry
//! point at all).

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use blue_common::{Pos, TargetKind};

use crate::backend::{
    BackendError, CreateOutcome, FieldAttrs, MethodAttrs, MethodImplFlags, RtDoc, RtField,
    RtLabel, RtMethod, RtType, RuntimeBackend, TypeAttrs,
};
use crate::il::Il;

#[derive(Clone, Debug, PartialEq)]
pub enum BodyEvent {
    Il(Il),
    Label(RtLabel),
    BeginTry,
    BeginCatch(Option<RtType>),
    BeginFinally,
    EndTry,
    SeqPoint { doc: RtDoc, start: Pos, end: Pos },
}

#[derive(Debug, Default)]
pub struct RecordedBody {
    pub events: Vec<BodyEvent>,
    pub locals: Vec<(RtType, Option<String>)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TypeShape {
    Declared,
    Imported,
    Array(RtType),
    ByRef(RtType),
}

#[derive(Debug)]
pub struct RecordedType {
    pub full_name: String,
    shape: TypeShape,
    pub attrs: TypeAttrs,
    pub super_ty: Option<RtType>,
    pub interfaces: Vec<RtType>,
    pub container: Option<RtType>,
    pub nested: Vec<RtType>,
    pub created: bool,
    /// Total `create_type` requests, including idempotent re-requests.
    pub create_calls: u32,
}

#[derive(Debug)]
pub struct RecordedField {
    pub ty: RtType,
    pub name: String,
    pub field_ty: RtType,
    pub attrs: FieldAttrs,
    pub literal: Option<i32>,
}

#[derive(Debug)]
pub struct RecordedMethod {
    pub ty: RtType,
    pub name: String,
    pub attrs: MethodAttrs,
    pub ret: Option<RtType>,
    pub params: Vec<RtType>,
    pub is_ctor: bool,
    pub impl_flags: MethodImplFlags,
    /// (index, name, is_out) per `define_param` call.
    pub param_names: Vec<(u16, String, bool)>,
    pub body: Option<RecordedBody>,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    assembly: Option<(String, TargetKind, bool)>,
    docs: Vec<String>,
    types: Vec<RecordedType>,
    by_name: FxHashMap<String, RtType>,
    fields: Vec<RecordedField>,
    methods: Vec<RecordedMethod>,
    properties: Vec<(RtType, String, RtType, Option<RtMethod>, Option<RtMethod>)>,
    events: Vec<(RtType, String, RtType)>,
    current: Option<RtMethod>,
    next_label: u32,
    entry_point: Option<RtMethod>,
    saved_to: Option<PathBuf>,
}

impl RecordingBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, full_name: String, shape: TypeShape, attrs: TypeAttrs) -> RtType {
        if let Some(&existing) = self.by_name.get(&full_name) {
            return existing;
        }
        let id = RtType(self.types.len() as u32);
        self.by_name.insert(full_name.clone(), id);
        self.types.push(RecordedType {
            full_name,
            shape,
            attrs,
            super_ty: None,
            interfaces: Vec::new(),
            container: None,
            nested: Vec::new(),
            created: false,
            create_calls: 0,
        });
        id
    }

    fn ty(&self, ty: RtType) -> &RecordedType {
        &self.types[ty.0 as usize]
    }

    fn ty_mut(&mut self, ty: RtType) -> &mut RecordedType {
        &mut self.types[ty.0 as usize]
    }

    fn check_open(&self, ty: RtType) -> Result<(), BackendError> {
        let rec = self.ty(ty);
        if rec.created {
            return Err(BackendError::AlreadyCreated(rec.full_name.clone()));
        }
        Ok(())
    }

    fn body_mut(&mut self) -> Result<&mut RecordedBody, BackendError> {
        let current = self.current.ok_or(BackendError::NoBody)?;
        self.methods[current.0 as usize]
            .body
            .as_mut()
            .ok_or(BackendError::NoBody)
    }

    // ---- inspection helpers for tests and dumps ----

    #[must_use]
    pub fn type_named(&self, full_name: &str) -> Option<RtType> {
        self.by_name.get(full_name).copied()
    }

    #[must_use]
    pub fn type_info(&self, ty: RtType) -> &RecordedType {
        self.ty(ty)
    }

    #[must_use]
    pub fn type_name(&self, ty: RtType) -> &str {
        &self.ty(ty).full_name
    }

    #[must_use]
    pub fn method_named(&self, name: &str) -> Option<RtMethod> {
        self.methods
            .iter()
            .position(|m| m.name == name)
            .map(|i| RtMethod(i as u32))
    }

    /// Method by declaring type and name.
    #[must_use]
    pub fn method_of(&self, type_name: &str, name: &str) -> Option<RtMethod> {
        let ty = self.type_named(type_name)?;
        self.methods
            .iter()
            .position(|m| m.ty == ty && m.name == name)
            .map(|i| RtMethod(i as u32))
    }

    /// Instructions of a method addressed by declaring type and name.
    #[must_use]
    pub fn il_of_method(&self, type_name: &str, name: &str) -> Vec<&Il> {
        let method = self.method_of(type_name, name).expect("method not recorded");
        self.method_info(method)
            .body
            .as_ref()
            .map(|b| {
                b.events
                    .iter()
                    .filter_map(|e| match e {
                        BodyEvent::Il(il) => Some(il),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn method_info(&self, method: RtMethod) -> &RecordedMethod {
        &self.methods[method.0 as usize]
    }

    /// The recorded body events of the first method with this name.
    #[must_use]
    pub fn events_of(&self, name: &str) -> &[BodyEvent] {
        let method = self.method_named(name).expect("method not recorded");
        self.method_info(method)
            .body
            .as_ref()
            .map(|b| b.events.as_slice())
            .unwrap_or(&[])
    }

    /// Just the instructions (labels and regions stripped).
    #[must_use]
    pub fn il_of(&self, name: &str) -> Vec<&Il> {
        self.events_of(name)
            .iter()
            .filter_map(|e| match e {
                BodyEvent::Il(il) => Some(il),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn entry_point(&self) -> Option<RtMethod> {
        self.entry_point
    }

    #[must_use]
    pub fn saved_to(&self) -> Option<&Path> {
        self.saved_to.as_deref()
    }

    #[must_use]
    pub fn documents(&self) -> &[String] {
        &self.docs
    }

    pub fn declared_types(&self) -> impl Iterator<Item = &RecordedType> {
        self.types
            .iter()
            .filter(|t| t.shape == TypeShape::Declared)
    }
}

impl RuntimeBackend for RecordingBackend {
    fn begin_assembly(
        &mut self,
        name: &str,
        kind: TargetKind,
        debug: bool,
    ) -> Result<(), BackendError> {
        if self.assembly.is_some() {
            return Err(BackendError::Invalid("assembly already begun".to_string()));
        }
        self.assembly = Some((name.to_string(), kind, debug));
        Ok(())
    }

    fn define_document(&mut self, file_name: &str) -> Result<RtDoc, BackendError> {
        let id = RtDoc(self.docs.len() as u32);
        self.docs.push(file_name.to_string());
        Ok(id)
    }

    fn get_type(&mut self, full_name: &str) -> Result<RtType, BackendError> {
        if let Some(&existing) = self.by_name.get(full_name) {
            return Ok(existing);
        }
        // The runtime can resolve any loadable type; record it as imported.
        Ok(self.register(full_name.to_string(), TypeShape::Imported, TypeAttrs::empty()))
    }

    fn array_of(&mut self, elem: RtType) -> RtType {
        let name = format!("{}[]", self.ty(elem).full_name);
        self.register(name, TypeShape::Array(elem), TypeAttrs::empty())
    }

    fn byref_of(&mut self, elem: RtType) -> RtType {
        let name = format!("{}&", self.ty(elem).full_name);
        self.register(name, TypeShape::ByRef(elem), TypeAttrs::empty())
    }

    fn find_method(
        &mut self,
        ty: RtType,
        name: &str,
        params: &[RtType],
    ) -> Result<RtMethod, BackendError> {
        if let Some(i) = self
            .methods
            .iter()
            .position(|m| m.ty == ty && m.name == name && m.params == params)
        {
            return Ok(RtMethod(i as u32));
        }
        if self.ty(ty).shape == TypeShape::Declared {
            return Err(BackendError::UnknownMember {
                ty: self.ty(ty).full_name.clone(),
                member: name.to_string(),
            });
        }
        // Member of an imported type: mint a handle for it.
        let id = RtMethod(self.methods.len() as u32);
        self.methods.push(RecordedMethod {
            ty,
            name: name.to_string(),
            attrs: MethodAttrs::empty(),
            ret: None,
            params: params.to_vec(),
            is_ctor: name == ".ctor",
            impl_flags: MethodImplFlags::empty(),
            param_names: Vec::new(),
            body: None,
        });
        Ok(id)
    }

    fn find_ctor(&mut self, ty: RtType, params: &[RtType]) -> Result<RtMethod, BackendError> {
        self.find_method(ty, ".ctor", params)
    }

    fn find_field(&mut self, ty: RtType, name: &str) -> Result<RtField, BackendError> {
        if let Some(i) = self
            .fields
            .iter()
            .position(|f| f.ty == ty && f.name == name)
        {
            return Ok(RtField(i as u32));
        }
        if self.ty(ty).shape == TypeShape::Declared {
            return Err(BackendError::UnknownMember {
                ty: self.ty(ty).full_name.clone(),
                member: name.to_string(),
            });
        }
        let id = RtField(self.fields.len() as u32);
        self.fields.push(RecordedField {
            ty,
            name: name.to_string(),
            field_ty: ty,
            attrs: FieldAttrs::empty(),
            literal: None,
        });
        Ok(id)
    }

    fn define_type(
        &mut self,
        full_name: &str,
        attrs: TypeAttrs,
        super_ty: Option<RtType>,
        interfaces: &[RtType],
    ) -> Result<RtType, BackendError> {
        if self.by_name.contains_key(full_name) {
            return Err(BackendError::Invalid(format!(
                "type '{full_name}' defined twice"
            )));
        }
        let id = self.register(full_name.to_string(), TypeShape::Declared, attrs);
        let rec = self.ty_mut(id);
        rec.super_ty = super_ty;
        rec.interfaces = interfaces.to_vec();
        Ok(id)
    }

    fn define_nested_type(
        &mut self,
        container: RtType,
        name: &str,
        attrs: TypeAttrs,
        super_ty: Option<RtType>,
        interfaces: &[RtType],
    ) -> Result<RtType, BackendError> {
        let full_name = format!("{}+{}", self.ty(container).full_name, name);
        let id = self.define_type(&full_name, attrs, super_ty, interfaces)?;
        self.ty_mut(id).container = Some(container);
        self.ty_mut(container).nested.push(id);
        Ok(id)
    }

    fn define_field(
        &mut self,
        ty: RtType,
        name: &str,
        field_ty: RtType,
        attrs: FieldAttrs,
    ) -> Result<RtField, BackendError> {
        self.check_open(ty)?;
        let id = RtField(self.fields.len() as u32);
        self.fields.push(RecordedField {
            ty,
            name: name.to_string(),
            field_ty,
            attrs,
            literal: None,
        });
        Ok(id)
    }

    fn define_literal_field(
        &mut self,
        ty: RtType,
        name: &str,
        field_ty: RtType,
        attrs: FieldAttrs,
        value: i32,
    ) -> Result<RtField, BackendError> {
        let id = self.define_field(ty, name, field_ty, attrs)?;
        self.fields[id.0 as usize].literal = Some(value);
        Ok(id)
    }

    fn define_method(
        &mut self,
        ty: RtType,
        name: &str,
        attrs: MethodAttrs,
        ret: Option<RtType>,
        params: &[RtType],
    ) -> Result<RtMethod, BackendError> {
        self.check_open(ty)?;
        let id = RtMethod(self.methods.len() as u32);
        self.methods.push(RecordedMethod {
            ty,
            name: name.to_string(),
            attrs,
            ret,
            params: params.to_vec(),
            is_ctor: false,
            impl_flags: MethodImplFlags::empty(),
            param_names: Vec::new(),
            body: None,
        });
        Ok(id)
    }

    fn define_ctor(
        &mut self,
        ty: RtType,
        attrs: MethodAttrs,
        params: &[RtType],
    ) -> Result<RtMethod, BackendError> {
        let name = if attrs.contains(MethodAttrs::STATIC) {
            ".cctor"
        } else {
            ".ctor"
        };
        let id = self.define_method(ty, name, attrs | MethodAttrs::SPECIAL_NAME, None, params)?;
        self.methods[id.0 as usize].is_ctor = true;
        Ok(id)
    }

    fn set_impl_flags(
        &mut self,
        method: RtMethod,
        flags: MethodImplFlags,
    ) -> Result<(), BackendError> {
        self.methods[method.0 as usize].impl_flags = flags;
        Ok(())
    }

    fn define_param(
        &mut self,
        method: RtMethod,
        index: u16,
        name: &str,
        is_out: bool,
    ) -> Result<(), BackendError> {
        self.methods[method.0 as usize]
            .param_names
            .push((index, name.to_string(), is_out));
        Ok(())
    }

    fn define_property(
        &mut self,
        ty: RtType,
        name: &str,
        prop_ty: RtType,
        getter: Option<RtMethod>,
        setter: Option<RtMethod>,
    ) -> Result<(), BackendError> {
        self.check_open(ty)?;
        self.properties
            .push((ty, name.to_string(), prop_ty, getter, setter));
        Ok(())
    }

    fn define_event(
        &mut self,
        ty: RtType,
        name: &str,
        event_ty: RtType,
    ) -> Result<(), BackendError> {
        self.check_open(ty)?;
        self.events.push((ty, name.to_string(), event_ty));
        Ok(())
    }

    fn begin_body(&mut self, method: RtMethod) -> Result<(), BackendError> {
        if self.current.is_some() {
            return Err(BackendError::Invalid(
                "a method body is already being generated".to_string(),
            ));
        }
        self.methods[method.0 as usize].body = Some(RecordedBody::default());
        self.current = Some(method);
        Ok(())
    }

    fn declare_local(&mut self, ty: RtType, name: Option<&str>) -> Result<u16, BackendError> {
        let body = self.body_mut()?;
        let slot = body.locals.len() as u16;
        body.locals.push((ty, name.map(str::to_string)));
        Ok(slot)
    }

    fn define_label(&mut self) -> RtLabel {
        let label = RtLabel(self.next_label);
        self.next_label += 1;
        label
    }

    fn mark_label(&mut self, label: RtLabel) -> Result<(), BackendError> {
        self.body_mut()?.events.push(BodyEvent::Label(label));
        Ok(())
    }

    fn emit(&mut self, il: Il) {
        if let Ok(body) = self.body_mut() {
            body.events.push(BodyEvent::Il(il));
        }
    }

    fn begin_try(&mut self) -> Result<(), BackendError> {
        self.body_mut()?.events.push(BodyEvent::BeginTry);
        Ok(())
    }

    fn begin_catch(&mut self, exception: Option<RtType>) -> Result<(), BackendError> {
        self.body_mut()?.events.push(BodyEvent::BeginCatch(exception));
        Ok(())
    }

    fn begin_finally(&mut self) -> Result<(), BackendError> {
        self.body_mut()?.events.push(BodyEvent::BeginFinally);
        Ok(())
    }

    fn end_try(&mut self) -> Result<(), BackendError> {
        self.body_mut()?.events.push(BodyEvent::EndTry);
        Ok(())
    }

    fn sequence_point(&mut self, doc: RtDoc, start: Pos, end: Pos) {
        if let Ok(body) = self.body_mut() {
            body.events.push(BodyEvent::SeqPoint { doc, start, end });
        }
    }

    fn end_body(&mut self) -> Result<(), BackendError> {
        if self.current.take().is_none() {
            return Err(BackendError::NoBody);
        }
        Ok(())
    }

    fn create_type(&mut self, ty: RtType) -> Result<CreateOutcome, BackendError> {
        if self.ty(ty).shape != TypeShape::Declared {
            return Err(BackendError::Invalid(format!(
                "'{}' is not a type builder",
                self.ty(ty).full_name
            )));
        }
        self.ty_mut(ty).create_calls += 1;
        if self.ty(ty).created {
            return Ok(CreateOutcome::Created);
        }
        // Nested types must be finalized before their container; demand
        // them by short name, the way the real resolve callback does.
        let pending = self
            .ty(ty)
            .nested
            .iter()
            .copied()
            .find(|&n| !self.ty(n).created);
        if let Some(nested) = pending {
            let full = &self.ty(nested).full_name;
            let short = full.rsplit('+').next().unwrap_or(full).to_string();
            return Ok(CreateOutcome::NeedsNested { short_name: short });
        }
        self.ty_mut(ty).created = true;
        Ok(CreateOutcome::Created)
    }

    fn set_entry_point(&mut self, method: RtMethod) -> Result<(), BackendError> {
        self.entry_point = Some(method);
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<(), BackendError> {
        if self.assembly.is_none() {
            return Err(BackendError::Invalid("no assembly begun".to_string()));
        }
        if let Some(open) = self
            .types
            .iter()
            .find(|t| t.shape == TypeShape::Declared && !t.created)
        {
            return Err(BackendError::Invalid(format!(
                "type '{}' was never created",
                open.full_name
            )));
        }
        let mut summary = String::new();
        let (name, kind, debug) = self.assembly.as_ref().unwrap();
        summary.push_str(&format!("assembly {name} ({kind:?}, debug={debug})\n"));
        for ty in self.declared_types() {
            summary.push_str(&format!("type {}\n", ty.full_name));
        }
        for m in &self.methods {
            if m.body.is_some() {
                summary.push_str(&format!(
                    "method {}::{} ({} instructions)\n",
                    self.ty(m.ty).full_name,
                    m.name,
                    m.body.as_ref().map(|b| b.events.len()).unwrap_or(0)
                ));
            }
        }
        std::fs::write(path, summary).map_err(|source| BackendError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.saved_to = Some(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_type_is_idempotent() {
        let mut backend = RecordingBackend::new();
        let object = backend.get_type("System.Object").unwrap();
        let ty = backend
            .define_type("A", TypeAttrs::PUBLIC, Some(object), &[])
            .unwrap();
        assert_eq!(backend.create_type(ty).unwrap(), CreateOutcome::Created);
        assert_eq!(backend.create_type(ty).unwrap(), CreateOutcome::Created);
        assert_eq!(backend.type_info(ty).create_calls, 2);
        assert!(backend.type_info(ty).created);
    }

    #[test]
    fn nested_types_are_demanded_by_short_name() {
        let mut backend = RecordingBackend::new();
        let object = backend.get_type("System.Object").unwrap();
        let outer = backend
            .define_type("A", TypeAttrs::PUBLIC, Some(object), &[])
            .unwrap();
        let inner = backend
            .define_nested_type(outer, "B", TypeAttrs::PUBLIC, Some(object), &[])
            .unwrap();
        assert_eq!(
            backend.create_type(outer).unwrap(),
            CreateOutcome::NeedsNested {
                short_name: "B".to_string()
            }
        );
        assert_eq!(backend.create_type(inner).unwrap(), CreateOutcome::Created);
        assert_eq!(backend.create_type(outer).unwrap(), CreateOutcome::Created);
    }

    #[test]
    fn members_cannot_be_added_after_create() {
        let mut backend = RecordingBackend::new();
        let object = backend.get_type("System.Object").unwrap();
        let int32 = backend.get_type("System.Int32").unwrap();
        let ty = backend
            .define_type("A", TypeAttrs::PUBLIC, Some(object), &[])
            .unwrap();
        backend.create_type(ty).unwrap();
        assert!(matches!(
            backend.define_field(ty, "x", int32, FieldAttrs::PUBLIC),
            Err(BackendError::AlreadyCreated(_))
        ));
    }

    #[test]
    fn constructed_types_are_interned() {
        let mut backend = RecordingBackend::new();
        let int32 = backend.get_type("System.Int32").unwrap();
        let a1 = backend.array_of(int32);
        let a2 = backend.array_of(int32);
        assert_eq!(a1, a2);
        let r1 = backend.byref_of(int32);
        let r2 = backend.byref_of(int32);
        assert_eq!(r1, r2);
        assert_ne!(a1, r1);
    }

    #[test]
    fn save_requires_all_types_created() {
        let mut backend = RecordingBackend::new();
        backend
            .begin_assembly("t", TargetKind::Console, false)
            .unwrap();
        let object = backend.get_type("System.Object").unwrap();
        backend
            .define_type("A", TypeAttrs::PUBLIC, Some(object), &[])
            .unwrap();
        let dir = std::env::temp_dir().join("blue-runtime-save-test.out");
        assert!(matches!(
            backend.save(&dir),
            Err(BackendError::Invalid(_))
        ));
    }
}
