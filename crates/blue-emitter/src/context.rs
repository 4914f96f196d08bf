//! The emit context: the backend handle, per-compile state (documents,
//! the create-type stack), and the single "current method being emitted"
//! resource, swapped atomically on entry and exit per method.

use rustc_hash::FxHashMap;

use blue_common::{CompileOptions, DiagnosticBag, FileId, SourceSpan, SymbolId, TypeId};
use blue_parser::ast::ParamFlow;
use blue_resolver::ResolveState;
use blue_resolver::symbols::{SymKind, TypeGenre};
use blue_runtime::{BackendError, RtDoc, RtLabel, RtMethod, RtType, RuntimeBackend};

/// State of the one method whose body is being generated.
pub(crate) struct MethodState {
    pub method: SymbolId,
    pub owner: TypeId,
    pub is_static: bool,
    /// Shared method-exit label; every return path branches here.
    pub exit_label: RtLabel,
    /// Slot holding the pending return value for non-void methods.
    pub ret_local: Option<u16>,
    /// Depth of enclosing protected regions; decides branch vs. leave.
    pub try_depth: u32,
    /// Loop label stack: (break target, continue target).
    pub loops: Vec<(RtLabel, RtLabel)>,
}

pub struct Emitter<'a> {
    pub(crate) state: &'a mut ResolveState,
    pub(crate) backend: &'a mut dyn RuntimeBackend,
    pub(crate) diags: &'a mut DiagnosticBag,
    pub(crate) opts: &'a CompileOptions,
    pub(crate) docs: FxHashMap<FileId, RtDoc>,
    /// Full names of types currently being finalized; composes full
    /// nested names for the backend's short-name resolve callback.
    pub(crate) create_stack: Vec<String>,
    pub(crate) method: Option<MethodState>,
}

impl<'a> Emitter<'a> {
    pub fn new(
        state: &'a mut ResolveState,
        backend: &'a mut dyn RuntimeBackend,
        opts: &'a CompileOptions,
        diags: &'a mut DiagnosticBag,
    ) -> Self {
        Emitter {
            state,
            backend,
            diags,
            opts,
            docs: FxHashMap::default(),
            create_stack: Vec::new(),
            method: None,
        }
    }

    pub(crate) fn cur(&mut self) -> &mut MethodState {
        self.method.as_mut().expect("no method being emitted")
    }

    /// Map a resolved type to its runtime handle, constructing array and
    /// by-ref handles and resolving imported names on demand.
    pub(crate) fn rt_type(&mut self, ty: TypeId) -> Result<RtType, BackendError> {
        if let Some(handle) = self.state.symbols.ty(ty).runtime {
            return Ok(handle);
        }
        let handle = match self.state.symbols.ty(ty).genre {
            TypeGenre::Array => {
                let elem = self.state.symbols.ty(ty).elem.expect("array without element");
                let elem = self.rt_type(elem)?;
                self.backend.array_of(elem)
            }
            TypeGenre::Ref => {
                let elem = self.state.symbols.ty(ty).elem.expect("ref without element");
                let elem = self.rt_type(elem)?;
                self.backend.byref_of(elem)
            }
            _ => {
                let full_name = self.state.symbols.ty(ty).full_name.clone();
                self.backend.get_type(&full_name)?
            }
        };
        self.state.symbols.ty_mut(ty).runtime = Some(handle);
        Ok(handle)
    }

    /// The runtime handle of a method symbol; imported methods resolve
    /// through the backend's reflection surface on first use.
    pub(crate) fn rt_method(&mut self, method: SymbolId) -> Result<RtMethod, BackendError> {
        if let Some(handle) = self.state.symbols.method(method).runtime {
            return Ok(handle);
        }
        let (owner, params, is_ctor) = {
            let m = self.state.symbols.method(method);
            (m.owner, m.params.clone(), m.is_ctor)
        };
        let name = self.state.symbols.get(method).name.clone();
        let owner_rt = self.rt_type(owner)?;
        let mut param_rts = Vec::with_capacity(params.len());
        for &p in &params {
            param_rts.push(self.rt_type(p)?);
        }
        let handle = if is_ctor {
            self.backend.find_ctor(owner_rt, &param_rts)?
        } else {
            self.backend.find_method(owner_rt, &name, &param_rts)?
        };
        self.state.symbols.method_mut(method).runtime = Some(handle);
        Ok(handle)
    }

    pub(crate) fn backend_error(&mut self, span: SourceSpan, err: &BackendError) {
        self.diags.error(
            blue_common::DiagnosticCode::InternalError,
            span,
            format!("runtime backend failure: {err}"),
        );
    }

    /// The codegen label for a user label symbol, created on first use.
    pub(crate) fn label_of(&mut self, sym: SymbolId) -> RtLabel {
        if let SymKind::Label(label) = &self.state.symbols.get(sym).kind {
            if let Some(existing) = label.runtime {
                return existing;
            }
        }
        let fresh = self.backend.define_label();
        if let SymKind::Label(label) = &mut self.state.symbols.get_mut(sym).kind {
            label.runtime = Some(fresh);
        }
        fresh
    }

    /// Fresh unnamed scratch local in the current body. Always a new
    /// slot: several scratch values of one type can be live at once.
    pub(crate) fn scratch_local(&mut self, ty: TypeId) -> Result<u16, BackendError> {
        let rt = self.rt_type(ty)?;
        self.backend.declare_local(rt, None)
    }

    /// Argument slot of a parameter, accounting for `this`.
    pub(crate) fn arg_slot(&mut self, param: SymbolId) -> u16 {
        let index = match &self.state.symbols.get(param).kind {
            SymKind::Param(p) => p.index,
            other => panic!("not a parameter: {other:?}"),
        };
        if self.cur().is_static {
            index
        } else {
            index + 1
        }
    }

    pub(crate) fn param_flow(&self, param: SymbolId) -> (TypeId, ParamFlow) {
        match &self.state.symbols.get(param).kind {
            SymKind::Param(p) => (p.ty, p.flow),
            other => panic!("not a parameter: {other:?}"),
        }
    }
}
