//! Statement emission: label-based templates, the shared method-exit
//! path, and exception-region layout.

use blue_common::{SourceSpan, SymbolId, TypeId};
use blue_parser::ast::{Block, CtorChain, Stmt, StmtKind};
use blue_resolver::symbols::{SymKind, TypeGenre};
use blue_runtime::{BackendError, Il};

use crate::context::{Emitter, MethodState};
use crate::output::FieldInit;

impl Emitter<'_> {
    /// Generate one method body: field-initializer prologue, statements,
    /// then the shared exit label and return. `body` is `None` for
    /// synthesized constructors.
    pub(crate) fn emit_body(
        &mut self,
        method: SymbolId,
        body: Option<&Block>,
        inits: &[FieldInit<'_>],
    ) -> Result<(), BackendError> {
        let handle = self.rt_method(method)?;
        let (owner, is_static, ret, is_ctor) = {
            let m = self.state.symbols.method(method);
            (m.owner, m.is_static, m.ret, m.is_ctor)
        };
        self.backend.begin_body(handle)?;
        let exit_label = self.backend.define_label();
        self.method = Some(MethodState {
            method,
            owner,
            is_static,
            exit_label,
            ret_local: None,
            try_depth: 0,
            loops: Vec::new(),
        });
        let void = self.state.well_known.void;
        if let Some(ret_ty) = ret {
            if ret_ty != void {
                let rt = self.rt_type(ret_ty)?;
                let slot = self.backend.declare_local(rt, None)?;
                self.cur().ret_local = Some(slot);
            }
        }

        for init in inits {
            self.emit_field_init(init)?;
        }
        if body.is_none() && is_ctor && !is_static {
            // Synthesized default constructor: chain to the super's
            // parameterless constructor.
            if let Some(super_ty) = self.state.symbols.ty(owner).super_ty {
                let super_rt = self.rt_type(super_ty)?;
                let super_ctor = self.backend.find_ctor(super_rt, &[])?;
                self.backend.emit(Il::LdargN(0));
                self.backend.emit(Il::Call(super_ctor));
            }
        }
        if let Some(block) = body {
            for stmt in &block.stmts {
                self.emit_stmt(stmt)?;
            }
        }
        self.backend.mark_label(exit_label)?;
        if let Some(slot) = self.cur().ret_local {
            self.load_local(slot);
        }
        self.backend.emit(Il::Ret);
        self.backend.end_body()?;
        self.method = None;
        Ok(())
    }

    fn emit_field_init(&mut self, init: &FieldInit<'_>) -> Result<(), BackendError> {
        let (field_ty, handle) = match &self.state.symbols.get(init.sym).kind {
            SymKind::Field(f) => (f.ty, f.runtime),
            _ => return Ok(()),
        };
        let Some(handle) = handle else { return Ok(()) };
        if init.is_static {
            self.emit_value(init.value)?;
            self.convert_to(init.value, field_ty)?;
            self.backend.emit(Il::Stsfld(handle));
        } else {
            self.backend.emit(Il::LdargN(0));
            self.emit_value(init.value)?;
            self.convert_to(init.value, field_ty)?;
            self.backend.emit(Il::Stfld(handle));
        }
        Ok(())
    }

    pub(crate) fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), BackendError> {
        self.sequence_point(stmt.span);
        match &stmt.kind {
            StmtKind::Block(block) => {
                for s in &block.stmts {
                    self.emit_stmt(s)?;
                }
                Ok(())
            }
            StmtKind::LocalDecl(decl) => {
                for var in &decl.vars {
                    let Some(sym) = var.sym else { continue };
                    let ty = match &self.state.symbols.get(sym).kind {
                        SymKind::Local(l) => l.ty,
                        _ => continue,
                    };
                    let slot = self.ensure_local_slot(sym, ty, &var.name)?;
                    if let Some(init) = &var.init {
                        self.emit_value(init)?;
                        self.convert_to(init, ty)?;
                        self.store_local(slot);
                    }
                }
                Ok(())
            }
            StmtKind::If {
                cond,
                then_s,
                else_s,
            } => {
                let else_label = self.backend.define_label();
                self.emit_value(cond)?;
                self.backend.emit(Il::Brfalse(else_label));
                self.emit_stmt(then_s)?;
                match else_s {
                    Some(else_s) => {
                        let end_label = self.backend.define_label();
                        self.backend.emit(Il::Br(end_label));
                        self.backend.mark_label(else_label)?;
                        self.emit_stmt(else_s)?;
                        self.backend.mark_label(end_label)?;
                    }
                    None => self.backend.mark_label(else_label)?,
                }
                Ok(())
            }
            StmtKind::While { cond, body } => {
                let start = self.backend.define_label();
                let end = self.backend.define_label();
                self.backend.mark_label(start)?;
                self.emit_value(cond)?;
                self.backend.emit(Il::Brfalse(end));
                self.cur().loops.push((end, start));
                self.emit_stmt(body)?;
                self.cur().loops.pop();
                self.backend.emit(Il::Br(start));
                self.backend.mark_label(end)?;
                Ok(())
            }
            StmtKind::Do { body, cond } => {
                let top = self.backend.define_label();
                let check = self.backend.define_label();
                let end = self.backend.define_label();
                self.backend.mark_label(top)?;
                self.cur().loops.push((end, check));
                self.emit_stmt(body)?;
                self.cur().loops.pop();
                self.backend.mark_label(check)?;
                self.emit_value(cond)?;
                self.backend.emit(Il::Brtrue(top));
                self.backend.mark_label(end)?;
                Ok(())
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                for s in init {
                    self.emit_stmt(s)?;
                }
                let check = self.backend.define_label();
                let continue_label = self.backend.define_label();
                let end = self.backend.define_label();
                self.backend.mark_label(check)?;
                if let Some(cond) = cond {
                    self.emit_value(cond)?;
                    self.backend.emit(Il::Brfalse(end));
                }
                self.cur().loops.push((end, continue_label));
                self.emit_stmt(body)?;
                self.cur().loops.pop();
                self.backend.mark_label(continue_label)?;
                for e in step {
                    self.emit_stmt_expr(e)?;
                }
                self.backend.emit(Il::Br(check));
                self.backend.mark_label(end)?;
                Ok(())
            }
            StmtKind::Foreach(foreach) => match &foreach.lowered {
                Some(lowered) => self.emit_stmt(lowered),
                None => Ok(()),
            },
            StmtKind::Switch(switch) => match &switch.lowered {
                Some(lowered) => self.emit_stmt(lowered),
                None => Ok(()),
            },
            StmtKind::Try {
                body,
                catches,
                finally,
            } => self.emit_try(body, catches, finally.as_ref()),
            StmtKind::Throw(value) => match value {
                Some(expr) => {
                    self.emit_value(expr)?;
                    self.backend.emit(Il::Throw);
                    Ok(())
                }
                None => {
                    self.backend.emit(Il::Rethrow);
                    Ok(())
                }
            },
            StmtKind::Return(value) => {
                if let Some(expr) = value {
                    let method = self.cur().method;
                    let ret_ty = self
                        .state
                        .symbols
                        .method(method)
                        .ret
                        .unwrap_or(self.state.well_known.void);
                    self.emit_value(expr)?;
                    self.convert_to(expr, ret_ty)?;
                    if let Some(slot) = self.cur().ret_local {
                        self.store_local(slot);
                    }
                }
                let exit = self.cur().exit_label;
                if self.cur().try_depth > 0 {
                    self.backend.emit(Il::Leave(exit));
                } else {
                    self.backend.emit(Il::Br(exit));
                }
                Ok(())
            }
            StmtKind::Break => {
                if let Some(&(break_label, _)) = self.cur().loops.last() {
                    self.backend.emit(Il::Br(break_label));
                }
                Ok(())
            }
            StmtKind::Continue => {
                if let Some(&(_, continue_label)) = self.cur().loops.last() {
                    self.backend.emit(Il::Br(continue_label));
                }
                Ok(())
            }
            StmtKind::Goto { sym, .. } => {
                if let Some(sym) = sym {
                    let label = self.label_of(*sym);
                    self.backend.emit(Il::Br(label));
                }
                Ok(())
            }
            StmtKind::Label { stmt, sym, .. } => {
                if let Some(sym) = sym {
                    let label = self.label_of(*sym);
                    self.backend.mark_label(label)?;
                }
                self.emit_stmt(stmt)
            }
            StmtKind::Empty => Ok(()),
            StmtKind::Expr(expr) => self.emit_stmt_expr(expr),
            StmtKind::CtorChain(chain) => self.emit_ctor_chain(chain),
        }
    }

    fn emit_ctor_chain(&mut self, chain: &CtorChain) -> Result<(), BackendError> {
        let Some(call) = &chain.call else {
            return Ok(());
        };
        // The chained constructor call runs before the body; receiver is
        // always `this`, dispatch is never virtual.
        self.emit_stmt_expr(call)
    }

    fn emit_try(
        &mut self,
        body: &Block,
        catches: &[blue_parser::ast::CatchClause],
        finally: Option<&Block>,
    ) -> Result<(), BackendError> {
        let has_catch = !catches.is_empty();
        let has_finally = finally.is_some();
        self.cur().try_depth += 1;
        if has_catch && has_finally {
            // try/finally wrapping try/catch.
            self.backend.begin_try()?;
        }
        self.backend.begin_try()?;
        for s in &body.stmts {
            self.emit_stmt(s)?;
        }
        for catch in catches {
            let exception_rt = match &catch.ty {
                Some(tref) => {
                    let ty = tref.ty().unwrap_or(self.state.well_known.exception);
                    Some(self.rt_type(ty)?)
                }
                None => None,
            };
            self.backend.begin_catch(exception_rt)?;
            // The exception value is on the stack: bind it or drop it.
            match catch.sym {
                Some(sym) => {
                    let ty = match &self.state.symbols.get(sym).kind {
                        SymKind::Local(l) => l.ty,
                        _ => self.state.well_known.exception,
                    };
                    let name = self.state.symbols.get(sym).name.clone();
                    let slot = self.ensure_local_slot(sym, ty, &name)?;
                    self.store_local(slot);
                }
                None => self.backend.emit(Il::Pop),
            }
            for s in &catch.body.stmts {
                self.emit_stmt(s)?;
            }
        }
        if has_catch {
            self.backend.end_try()?;
        }
        if let Some(finally_block) = finally {
            self.backend.begin_finally()?;
            for s in &finally_block.stmts {
                self.emit_stmt(s)?;
            }
            self.backend.end_try()?;
        }
        self.cur().try_depth -= 1;
        Ok(())
    }

    // ---- shared helpers ----

    pub(crate) fn ensure_local_slot(
        &mut self,
        sym: SymbolId,
        ty: TypeId,
        name: &str,
    ) -> Result<u16, BackendError> {
        if let SymKind::Local(local) = &self.state.symbols.get(sym).kind {
            if let Some(slot) = local.slot {
                return Ok(slot);
            }
        }
        let rt = self.rt_type(ty)?;
        let debug_name = if self.opts.debug { Some(name) } else { None };
        let slot = self.backend.declare_local(rt, debug_name)?;
        if let SymKind::Local(local) = &mut self.state.symbols.get_mut(sym).kind {
            local.slot = Some(slot);
        }
        Ok(slot)
    }

    fn sequence_point(&mut self, span: SourceSpan) {
        if !self.opts.debug || span.is_synthetic() {
            return;
        }
        if let Some(&doc) = self.docs.get(&span.file) {
            self.backend.sequence_point(doc, span.start, span.end);
        }
    }

    // Shortest-form encoders.

    pub(crate) fn load_int(&mut self, value: i32) {
        if (-1..=8).contains(&value) {
            self.backend.emit(Il::LdcI4Small(value as i8));
        } else if (-128..=127).contains(&value) {
            self.backend.emit(Il::LdcI4S(value as i8));
        } else {
            self.backend.emit(Il::LdcI4(value));
        }
    }

    pub(crate) fn load_local(&mut self, slot: u16) {
        if slot < 4 {
            self.backend.emit(Il::LdlocN(slot as u8));
        } else {
            self.backend.emit(Il::Ldloc(slot));
        }
    }

    pub(crate) fn store_local(&mut self, slot: u16) {
        if slot < 4 {
            self.backend.emit(Il::StlocN(slot as u8));
        } else {
            self.backend.emit(Il::Stloc(slot));
        }
    }

    pub(crate) fn load_arg(&mut self, slot: u16) {
        if slot < 4 {
            self.backend.emit(Il::LdargN(slot as u8));
        } else {
            self.backend.emit(Il::Ldarg(slot));
        }
    }

    /// How elements of this type move through arrays and indirections.
    pub(crate) fn elem_kind(&self, ty: TypeId) -> ElemKind {
        let wk = self.state.well_known;
        if ty == wk.bool_ty {
            return ElemKind::I1;
        }
        if ty == wk.char {
            return ElemKind::U2;
        }
        let sym = self.state.symbols.ty(ty);
        if ty == wk.int || sym.genre == TypeGenre::Enum {
            return ElemKind::I4;
        }
        if sym.genre.is_value_type() {
            return ElemKind::Struct;
        }
        ElemKind::Ref
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ElemKind {
    I1,
    U2,
    I4,
    Ref,
    /// Value-type structs: address plus `ldobj`/`stobj`.
    Struct,
}
