//! Expression emission.
//!
//! Each expression has three emission modes: as a right-hand value
//! (leaves the value on the stack), as a left-hand target (split into a
//! pre phase that sets up the target and a post phase that stores), and
//! as an address. Value types load addresses for member access; reference
//! types load the value; a ref-typed location is already an address and
//! is dereferenced with its type-specific load.

use blue_common::{SymbolId, TypeId};
use blue_parser::ast::{
    AssignExpr, BinOp, Binding, CallExpr, CastKind, Expr, ExprKind, IncDecExpr, UnOp,
};
use blue_resolver::symbols::{SymKind, TypeGenre};
use blue_runtime::{BackendError, Il, RtField};

use crate::context::Emitter;
use crate::stmt::ElemKind;

/// A classified assignment target, carrying what its pre-phase pushed.
enum StoreTarget {
    Local(u16),
    Param(u16),
    /// By-ref parameter: the address is on the stack after pre.
    RefParam(TypeId),
    StaticField(RtField),
    /// Receiver is on the stack after pre.
    InstanceField(RtField),
    /// Array and index are on the stack after pre.
    ArrayElem(TypeId),
    None,
}

impl Emitter<'_> {
    // ---- statement-expressions ----

    pub(crate) fn emit_stmt_expr(&mut self, expr: &Expr) -> Result<(), BackendError> {
        match &expr.kind {
            ExprKind::Assign(assign) => self.emit_assign(assign, false),
            ExprKind::IncDec(inc_dec) => self.emit_incdec(inc_dec),
            ExprKind::Call(_) => {
                self.emit_value(expr)?;
                let void = self.state.well_known.void;
                if !matches!(expr.ty, Some(t) if t == void) && expr.ty.is_some() {
                    self.backend.emit(Il::Pop);
                }
                Ok(())
            }
            ExprKind::New(_) | ExprKind::NewArray(_) => {
                self.emit_value(expr)?;
                self.backend.emit(Il::Pop);
                Ok(())
            }
            _ => self.emit_value(expr).map(|_| ()),
        }
    }

    // ---- right-hand values ----

    pub(crate) fn emit_value(&mut self, expr: &Expr) -> Result<(), BackendError> {
        match &expr.kind {
            ExprKind::Int(v) => {
                self.load_int(*v as i32);
                Ok(())
            }
            ExprKind::Char(c) => {
                self.load_int(*c as i32);
                Ok(())
            }
            ExprKind::Bool(b) => {
                self.load_int(i32::from(*b));
                Ok(())
            }
            ExprKind::Str(s) => {
                self.backend.emit(Il::Ldstr(s.clone()));
                Ok(())
            }
            ExprKind::Null => {
                self.backend.emit(Il::Ldnull);
                Ok(())
            }
            ExprKind::This => {
                self.backend.emit(Il::LdargN(0));
                let owner = self.cur().owner;
                if self.state.is_value_type(owner) {
                    let rt = self.rt_type(owner)?;
                    self.backend.emit(Il::Ldobj(rt));
                }
                Ok(())
            }
            ExprKind::Base => Ok(()),
            ExprKind::Name(name) => self.emit_binding_value(name.binding, None),
            ExprKind::Member(member) => {
                self.emit_binding_value(member.binding, Some(&member.target))
            }
            ExprKind::Call(call) => self.emit_call(call),
            ExprKind::MethodPtr(ptr) => {
                match &ptr.target {
                    Some(receiver) => self.emit_value(receiver)?,
                    None => self.backend.emit(Il::Ldnull),
                }
                let handle = self.rt_method(ptr.method)?;
                self.backend.emit(Il::Ldftn(handle));
                Ok(())
            }
            ExprKind::New(new_expr) => {
                let ty = new_expr.ty.ty().unwrap_or(self.state.well_known.error);
                self.emit_new_value(new_expr, ty)
            }
            ExprKind::NewArray(new_array) => self.emit_new_array(new_array),
            ExprKind::Index(_) => self.emit_index_read(expr),
            ExprKind::Cast(cast) => {
                self.emit_value(&cast.expr)?;
                match cast.kind.unwrap_or(CastKind::Identity) {
                    CastKind::Identity | CastKind::Numeric => Ok(()),
                    CastKind::Box => {
                        let from = cast.expr.ty.unwrap_or(self.state.well_known.error);
                        let rt = self.rt_type(from)?;
                        self.backend.emit(Il::Box(rt));
                        Ok(())
                    }
                    CastKind::Unbox => {
                        let to = cast.ty.ty().unwrap_or(self.state.well_known.error);
                        let rt = self.rt_type(to)?;
                        self.backend.emit(Il::Unbox(rt));
                        self.backend.emit(Il::Ldobj(rt));
                        Ok(())
                    }
                    CastKind::Down => {
                        let to = cast.ty.ty().unwrap_or(self.state.well_known.error);
                        let rt = self.rt_type(to)?;
                        self.backend.emit(Il::Castclass(rt));
                        Ok(())
                    }
                }
            }
            ExprKind::Is { expr: inner, ty } => {
                self.emit_value(inner)?;
                if let Some(from) = inner.ty {
                    if self.state.is_value_type(from) {
                        let rt = self.rt_type(from)?;
                        self.backend.emit(Il::Box(rt));
                    }
                }
                let target = ty.ty().unwrap_or(self.state.well_known.error);
                let rt = self.rt_type(target)?;
                self.backend.emit(Il::Isinst(rt));
                self.backend.emit(Il::Ldnull);
                self.backend.emit(Il::Ceq);
                self.load_int(0);
                self.backend.emit(Il::Ceq);
                Ok(())
            }
            ExprKind::As { expr: inner, ty } => {
                self.emit_value(inner)?;
                let target = ty.ty().unwrap_or(self.state.well_known.error);
                let rt = self.rt_type(target)?;
                self.backend.emit(Il::Isinst(rt));
                Ok(())
            }
            ExprKind::TypeOf { ty } => {
                let target = ty.ty().unwrap_or(self.state.well_known.error);
                let rt = self.rt_type(target)?;
                self.backend.emit(Il::Ldtoken(rt));
                let type_rt = self.rt_type(self.state.well_known.type_ty)?;
                let handle_rt = self.rt_type(self.state.well_known.runtime_handle)?;
                let from_handle =
                    self.backend
                        .find_method(type_rt, "GetTypeFromHandle", &[handle_rt])?;
                self.backend.emit(Il::Call(from_handle));
                Ok(())
            }
            ExprKind::Cond {
                cond,
                then_e,
                else_e,
            } => {
                let else_label = self.backend.define_label();
                let end_label = self.backend.define_label();
                self.emit_value(cond)?;
                self.backend.emit(Il::Brfalse(else_label));
                self.emit_value(then_e)?;
                if let Some(result) = expr.ty {
                    self.convert_to(then_e, result)?;
                }
                self.backend.emit(Il::Br(end_label));
                self.backend.mark_label(else_label)?;
                self.emit_value(else_e)?;
                if let Some(result) = expr.ty {
                    self.convert_to(else_e, result)?;
                }
                self.backend.mark_label(end_label)?;
                Ok(())
            }
            ExprKind::Binary(binary) => self.emit_binary(binary),
            ExprKind::Unary { op, expr: inner } => {
                self.emit_value(inner)?;
                match op {
                    UnOp::Not => {
                        self.load_int(0);
                        self.backend.emit(Il::Ceq);
                    }
                    UnOp::Neg => self.backend.emit(Il::Neg),
                }
                Ok(())
            }
            ExprKind::Arg { expr: inner, .. } => self.emit_addr(inner),
            ExprKind::Assign(assign) => self.emit_assign(assign, true),
            ExprKind::IncDec(inc_dec) => self.emit_incdec(inc_dec),
        }
    }

    /// Load the value of a resolved name/member binding. `receiver` is
    /// the member-access target, absent for simple names (implicit this).
    fn emit_binding_value(
        &mut self,
        binding: Option<Binding>,
        receiver: Option<&Expr>,
    ) -> Result<(), BackendError> {
        match binding {
            Some(Binding::Local(sym)) => {
                let slot = self.local_slot(sym);
                self.load_local(slot);
                Ok(())
            }
            Some(Binding::Param(sym)) => {
                let slot = self.arg_slot(sym);
                let (ty, _) = self.param_flow(sym);
                self.load_arg(slot);
                if self.state.symbols.ty(ty).genre == TypeGenre::Ref {
                    let inner = self.state.strip_ref(ty);
                    self.emit_load_indirect(inner)?;
                }
                Ok(())
            }
            Some(Binding::Field(sym)) => {
                let (is_static, handle) = match &self.state.symbols.get(sym).kind {
                    SymKind::Field(f) => (f.is_static, f.runtime),
                    _ => return Ok(()),
                };
                let handle = match handle {
                    Some(h) => h,
                    None => self.imported_field(sym)?,
                };
                if is_static {
                    self.backend.emit(Il::Ldsfld(handle));
                } else {
                    self.emit_receiver_for_field(receiver)?;
                    self.backend.emit(Il::Ldfld(handle));
                }
                Ok(())
            }
            Some(Binding::LiteralField(sym)) => {
                let value = match &self.state.symbols.get(sym).kind {
                    SymKind::LiteralField(f) => f.value,
                    _ => 0,
                };
                self.load_int(value);
                Ok(())
            }
            Some(Binding::Property(sym)) => {
                let (getter, is_static) = match &self.state.symbols.get(sym).kind {
                    SymKind::Property(p) => (p.getter, p.is_static),
                    _ => return Ok(()),
                };
                let Some(getter) = getter else { return Ok(()) };
                // Array .Length reads lower to ldlen.
                if self.is_array_length(sym, receiver) {
                    if let Some(receiver) = receiver {
                        self.emit_value(receiver)?;
                    }
                    self.backend.emit(Il::Ldlen);
                    return Ok(());
                }
                if !is_static {
                    match receiver {
                        Some(receiver) => self.emit_method_receiver(receiver, getter)?,
                        None => self.backend.emit(Il::LdargN(0)),
                    }
                }
                self.emit_dispatch(getter, receiver)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn is_array_length(&self, prop: SymbolId, receiver: Option<&Expr>) -> bool {
        let owner = match &self.state.symbols.get(prop).kind {
            SymKind::Property(p) => p.owner,
            _ => return false,
        };
        owner == self.state.well_known.array
            && self.state.symbols.get(prop).name == "Length"
            && matches!(
                receiver.and_then(|r| r.ty),
                Some(t) if self.state.symbols.ty(t).genre == TypeGenre::Array
            )
    }

    fn emit_receiver_for_field(&mut self, receiver: Option<&Expr>) -> Result<(), BackendError> {
        match receiver {
            None => {
                self.backend.emit(Il::LdargN(0));
                Ok(())
            }
            Some(receiver) => {
                let recv_ty = receiver.ty;
                if matches!(recv_ty, Some(t) if self.state.is_value_type(t)) {
                    self.emit_addr(receiver)
                } else {
                    self.emit_value(receiver)
                }
            }
        }
    }

    // ---- calls ----

    fn emit_call(&mut self, call: &CallExpr) -> Result<(), BackendError> {
        let Some(method) = call.method else {
            return Ok(());
        };
        let (is_static, params) = {
            let m = self.state.symbols.method(method);
            (m.is_static, m.params.clone())
        };
        // Array .Length through the method spelling as well.
        if self.is_array_length_method(method, call) {
            if let ExprKind::Member(member) = &call.target.kind {
                self.emit_value(&member.target)?;
            }
            self.backend.emit(Il::Ldlen);
            return Ok(());
        }
        let mut receiver_is_base = false;
        if !is_static {
            match &call.target.kind {
                ExprKind::Member(member) => {
                    if matches!(member.target.kind, ExprKind::Base) {
                        self.backend.emit(Il::LdargN(0));
                        receiver_is_base = true;
                    } else if member.binding.is_some() {
                        // Delegate-typed member invocation: load the member.
                        self.emit_binding_value(member.binding, Some(&member.target))?;
                    } else {
                        self.emit_method_receiver(&member.target, method)?;
                    }
                }
                ExprKind::Name(name) if name.binding.is_some() => {
                    // Delegate-typed local/field invocation.
                    self.emit_binding_value(name.binding, None)?;
                }
                ExprKind::Name(_) | ExprKind::This | ExprKind::Base => {
                    self.backend.emit(Il::LdargN(0));
                    receiver_is_base = matches!(call.target.kind, ExprKind::Base);
                }
                _ => {
                    // Calling the value of an arbitrary expression
                    // (delegate chains).
                    self.emit_value(&call.target)?;
                }
            }
        }
        for (i, arg) in call.args.iter().enumerate() {
            self.emit_value(arg)?;
            if !matches!(arg.kind, ExprKind::Arg { .. }) {
                if let Some(&param_ty) = params.get(i) {
                    self.convert_to(arg, param_ty)?;
                }
            }
        }
        let handle = self.rt_method(method)?;
        let is_virtual = self.state.symbols.method(method).is_virtual;
        if !is_static && is_virtual && call.polymorphic && !receiver_is_base {
            self.backend.emit(Il::Callvirt(handle));
        } else {
            self.backend.emit(Il::Call(handle));
        }
        Ok(())
    }

    fn is_array_length_method(&self, method: SymbolId, call: &CallExpr) -> bool {
        let m = self.state.symbols.method(method);
        m.owner == self.state.well_known.array
            && self.state.symbols.get(method).name == "get_Length"
            && matches!(&call.target.kind, ExprKind::Member(member)
                if matches!(member.target.ty, Some(t)
                    if self.state.symbols.ty(t).genre == TypeGenre::Array))
    }

    /// Receiver for an instance method call: value types pass their
    /// address (boxing when the method lives on a reference type).
    fn emit_method_receiver(
        &mut self,
        receiver: &Expr,
        method: SymbolId,
    ) -> Result<(), BackendError> {
        let recv_ty = receiver.ty;
        if let Some(t) = recv_ty {
            if self.state.is_value_type(t) {
                let owner = self.state.symbols.method(method).owner;
                if self.state.is_value_type(owner) {
                    return self.emit_addr(receiver);
                }
                // An inherited reference-type method on a value: box.
                self.emit_value(receiver)?;
                let rt = self.rt_type(t)?;
                self.backend.emit(Il::Box(rt));
                return Ok(());
            }
        }
        self.emit_value(receiver)
    }

    fn emit_dispatch(
        &mut self,
        method: SymbolId,
        receiver: Option<&Expr>,
    ) -> Result<(), BackendError> {
        let handle = self.rt_method(method)?;
        let m = self.state.symbols.method(method);
        let receiver_is_value = matches!(
            receiver.and_then(|r| r.ty),
            Some(t) if self.state.is_value_type(t)
        );
        if m.is_virtual && !m.is_static && !receiver_is_value {
            self.backend.emit(Il::Callvirt(handle));
        } else {
            self.backend.emit(Il::Call(handle));
        }
        Ok(())
    }

    // ---- object and array creation ----

    fn emit_new_value(
        &mut self,
        new_expr: &blue_parser::ast::NewExpr,
        ty: TypeId,
    ) -> Result<(), BackendError> {
        if self.state.is_error(ty) {
            self.backend.emit(Il::Ldnull);
            return Ok(());
        }
        let genre = self.state.symbols.ty(ty).genre;
        if genre.is_value_type() {
            // Build into a temporary and load it back out.
            let slot = self.scratch_local(ty)?;
            self.emit_new_in_place_slot(new_expr, ty, slot)?;
            self.load_local(slot);
            return Ok(());
        }
        for (i, arg) in new_expr.args.iter().enumerate() {
            self.emit_value(arg)?;
            if let Some(ctor) = new_expr.ctor {
                let params = self.state.symbols.method(ctor).params.clone();
                if !matches!(arg.kind, ExprKind::Arg { .. }) {
                    if let Some(&param_ty) = params.get(i) {
                        self.convert_to(arg, param_ty)?;
                    }
                }
            }
        }
        if let Some(ctor) = new_expr.ctor {
            let handle = self.rt_method(ctor)?;
            self.backend.emit(Il::Newobj(handle));
        }
        Ok(())
    }

    /// In-place value-type construction into the local `slot`.
    fn emit_new_in_place_slot(
        &mut self,
        new_expr: &blue_parser::ast::NewExpr,
        ty: TypeId,
        slot: u16,
    ) -> Result<(), BackendError> {
        self.backend.emit(Il::Ldloca(slot));
        self.emit_new_on_address(new_expr, ty)
    }

    /// The destination address is on the stack; default-construct or call
    /// the constructor on it.
    fn emit_new_on_address(
        &mut self,
        new_expr: &blue_parser::ast::NewExpr,
        ty: TypeId,
    ) -> Result<(), BackendError> {
        match new_expr.ctor {
            None => {
                let rt = self.rt_type(ty)?;
                self.backend.emit(Il::Initobj(rt));
                Ok(())
            }
            Some(ctor) => {
                let params = self.state.symbols.method(ctor).params.clone();
                for (i, arg) in new_expr.args.iter().enumerate() {
                    self.emit_value(arg)?;
                    if !matches!(arg.kind, ExprKind::Arg { .. }) {
                        if let Some(&param_ty) = params.get(i) {
                            self.convert_to(arg, param_ty)?;
                        }
                    }
                }
                let handle = self.rt_method(ctor)?;
                self.backend.emit(Il::Call(handle));
                Ok(())
            }
        }
    }

    fn emit_new_array(
        &mut self,
        new_array: &blue_parser::ast::NewArrayExpr,
    ) -> Result<(), BackendError> {
        let elem = new_array.elem.ty().unwrap_or(self.state.well_known.error);
        let elem_rt = self.rt_type(elem)?;
        match (&new_array.len, &new_array.init) {
            (Some(len), _) => self.emit_value(len)?,
            (None, Some(init)) => self.load_int(init.len() as i32),
            (None, None) => self.load_int(0),
        }
        self.backend.emit(Il::Newarr(elem_rt));
        if let Some(init) = &new_array.init {
            let kind = self.elem_kind(elem);
            for (i, item) in init.iter().enumerate() {
                self.backend.emit(Il::Dup);
                self.load_int(i as i32);
                match kind {
                    ElemKind::Struct => {
                        self.backend.emit(Il::Ldelema(elem_rt));
                        self.emit_value(item)?;
                        self.backend.emit(Il::Stobj(elem_rt));
                    }
                    _ => {
                        self.emit_value(item)?;
                        self.convert_to(item, elem)?;
                        self.emit_store_element(kind);
                    }
                }
            }
        }
        Ok(())
    }

    // ---- element and indirect access ----

    fn emit_store_element(&mut self, kind: ElemKind) {
        self.backend.emit(match kind {
            ElemKind::I1 => Il::StelemI1,
            ElemKind::U2 => Il::StelemI2,
            ElemKind::I4 => Il::StelemI4,
            ElemKind::Ref | ElemKind::Struct => Il::StelemRef,
        });
    }

    fn emit_load_element(&mut self, kind: ElemKind, elem: TypeId) -> Result<(), BackendError> {
        match kind {
            ElemKind::I1 => self.backend.emit(Il::LdelemI1),
            ElemKind::U2 => self.backend.emit(Il::LdelemU2),
            ElemKind::I4 => self.backend.emit(Il::LdelemI4),
            ElemKind::Ref => self.backend.emit(Il::LdelemRef),
            ElemKind::Struct => {
                let rt = self.rt_type(elem)?;
                self.backend.emit(Il::Ldelema(rt));
                self.backend.emit(Il::Ldobj(rt));
            }
        }
        Ok(())
    }

    fn emit_load_indirect(&mut self, ty: TypeId) -> Result<(), BackendError> {
        match self.elem_kind(ty) {
            ElemKind::I1 => self.backend.emit(Il::LdindI1),
            ElemKind::U2 => self.backend.emit(Il::LdindU2),
            ElemKind::I4 => self.backend.emit(Il::LdindI4),
            ElemKind::Ref => self.backend.emit(Il::LdindRef),
            ElemKind::Struct => {
                let rt = self.rt_type(ty)?;
                self.backend.emit(Il::Ldobj(rt));
            }
        }
        Ok(())
    }

    fn emit_store_indirect(&mut self, ty: TypeId) -> Result<(), BackendError> {
        match self.elem_kind(ty) {
            ElemKind::I1 => self.backend.emit(Il::StindI1),
            ElemKind::U2 => self.backend.emit(Il::StindI2),
            ElemKind::I4 => self.backend.emit(Il::StindI4),
            ElemKind::Ref => self.backend.emit(Il::StindRef),
            ElemKind::Struct => {
                let rt = self.rt_type(ty)?;
                self.backend.emit(Il::Stobj(rt));
            }
        }
        Ok(())
    }

    fn emit_index_read(&mut self, expr: &Expr) -> Result<(), BackendError> {
        let ExprKind::Index(index) = &expr.kind else {
            unreachable!()
        };
        if index.is_array {
            let elem = expr.ty.unwrap_or(self.state.well_known.error);
            self.emit_value(&index.target)?;
            for i in &index.indices {
                self.emit_value(i)?;
            }
            let kind = self.elem_kind(elem);
            return self.emit_load_element(kind, elem);
        }
        let Some(getter) = index.getter else {
            return Ok(());
        };
        self.emit_method_receiver(&index.target, getter)?;
        let params = self.state.symbols.method(getter).params.clone();
        for (i, idx) in index.indices.iter().enumerate() {
            self.emit_value(idx)?;
            if let Some(&param_ty) = params.get(i) {
                self.convert_to(idx, param_ty)?;
            }
        }
        self.emit_dispatch(getter, Some(&index.target))
    }

    // ---- binary operators ----

    fn emit_binary(&mut self, binary: &blue_parser::ast::BinaryExpr) -> Result<(), BackendError> {
        if let Some(method) = binary.operator_method {
            let params = self.state.symbols.method(method).params.clone();
            self.emit_value(&binary.lhs)?;
            if let Some(&p) = params.first() {
                self.convert_to(&binary.lhs, p)?;
            }
            self.emit_value(&binary.rhs)?;
            if let Some(&p) = params.get(1) {
                self.convert_to(&binary.rhs, p)?;
            }
            let handle = self.rt_method(method)?;
            self.backend.emit(Il::Call(handle));
            return Ok(());
        }
        match binary.op {
            BinOp::AndAnd => {
                // dup/branch/pop leaves the result without re-evaluating.
                let end = self.backend.define_label();
                self.emit_value(&binary.lhs)?;
                self.backend.emit(Il::Dup);
                self.backend.emit(Il::Brfalse(end));
                self.backend.emit(Il::Pop);
                self.emit_value(&binary.rhs)?;
                self.backend.mark_label(end)?;
                Ok(())
            }
            BinOp::OrOr => {
                let end = self.backend.define_label();
                self.emit_value(&binary.lhs)?;
                self.backend.emit(Il::Dup);
                self.backend.emit(Il::Brtrue(end));
                self.backend.emit(Il::Pop);
                self.emit_value(&binary.rhs)?;
                self.backend.mark_label(end)?;
                Ok(())
            }
            op => {
                self.emit_value(&binary.lhs)?;
                self.emit_value(&binary.rhs)?;
                let bool_xor = op == BinOp::BitXor
                    && binary.lhs.ty == Some(self.state.well_known.bool_ty);
                match op {
                    BinOp::Add => self.backend.emit(Il::Add),
                    BinOp::Sub => self.backend.emit(Il::Sub),
                    BinOp::Mul => self.backend.emit(Il::Mul),
                    BinOp::Div => self.backend.emit(Il::Div),
                    BinOp::Rem => self.backend.emit(Il::Rem),
                    BinOp::BitAnd => self.backend.emit(Il::And),
                    BinOp::BitOr => self.backend.emit(Il::Or),
                    BinOp::BitXor if bool_xor => {
                        // bool ^ bool is inequality: ceq then negate.
                        self.backend.emit(Il::Ceq);
                        self.load_int(0);
                        self.backend.emit(Il::Ceq);
                    }
                    BinOp::BitXor => self.backend.emit(Il::Xor),
                    BinOp::Shl => self.backend.emit(Il::Shl),
                    BinOp::Shr => self.backend.emit(Il::Shr),
                    BinOp::Eq => self.backend.emit(Il::Ceq),
                    BinOp::Ne => {
                        self.backend.emit(Il::Ceq);
                        self.load_int(0);
                        self.backend.emit(Il::Ceq);
                    }
                    BinOp::Lt => self.backend.emit(Il::Clt),
                    BinOp::Gt => self.backend.emit(Il::Cgt),
                    BinOp::Le => {
                        // a <= b emitted as !(a > b).
                        self.backend.emit(Il::Cgt);
                        self.load_int(0);
                        self.backend.emit(Il::Ceq);
                    }
                    BinOp::Ge => {
                        self.backend.emit(Il::Clt);
                        self.load_int(0);
                        self.backend.emit(Il::Ceq);
                    }
                    BinOp::AndAnd | BinOp::OrOr => unreachable!(),
                }
                Ok(())
            }
        }
    }

    // ---- addresses ----

    pub(crate) fn emit_addr(&mut self, expr: &Expr) -> Result<(), BackendError> {
        match &expr.kind {
            ExprKind::This => {
                self.backend.emit(Il::LdargN(0));
                Ok(())
            }
            ExprKind::Name(name) => match name.binding {
                Some(Binding::Local(sym)) => {
                    let slot = self.local_slot(sym);
                    self.backend.emit(Il::Ldloca(slot));
                    Ok(())
                }
                Some(Binding::Param(sym)) => {
                    let slot = self.arg_slot(sym);
                    let (ty, _) = self.param_flow(sym);
                    if self.state.symbols.ty(ty).genre == TypeGenre::Ref {
                        // Already an address.
                        self.load_arg(slot);
                    } else {
                        self.backend.emit(Il::Ldarga(slot));
                    }
                    Ok(())
                }
                Some(Binding::Field(sym)) => self.emit_field_addr(sym, None),
                _ => self.emit_value_to_scratch_addr(expr),
            },
            ExprKind::Member(member) => match member.binding {
                Some(Binding::Field(sym)) => self.emit_field_addr(sym, Some(&member.target)),
                _ => self.emit_value_to_scratch_addr(expr),
            },
            ExprKind::Index(index) if index.is_array => {
                let elem = expr.ty.unwrap_or(self.state.well_known.error);
                self.emit_value(&index.target)?;
                for i in &index.indices {
                    self.emit_value(i)?;
                }
                let rt = self.rt_type(elem)?;
                self.backend.emit(Il::Ldelema(rt));
                Ok(())
            }
            _ => self.emit_value_to_scratch_addr(expr),
        }
    }

    fn emit_field_addr(
        &mut self,
        sym: SymbolId,
        receiver: Option<&Expr>,
    ) -> Result<(), BackendError> {
        let (is_static, handle) = match &self.state.symbols.get(sym).kind {
            SymKind::Field(f) => (f.is_static, f.runtime),
            _ => return Ok(()),
        };
        let handle = match handle {
            Some(h) => h,
            None => self.imported_field(sym)?,
        };
        if is_static {
            self.backend.emit(Il::Ldsflda(handle));
        } else {
            self.emit_receiver_for_field(receiver)?;
            self.backend.emit(Il::Ldflda(handle));
        }
        Ok(())
    }

    /// Value with no home (an rvalue struct): park it in a scratch local
    /// and hand out that address.
    fn emit_value_to_scratch_addr(&mut self, expr: &Expr) -> Result<(), BackendError> {
        let ty = expr.ty.unwrap_or(self.state.well_known.error);
        self.emit_value(expr)?;
        let slot = self.scratch_local(ty)?;
        self.store_local(slot);
        self.backend.emit(Il::Ldloca(slot));
        Ok(())
    }

    // ---- assignment ----

    fn emit_assign(&mut self, assign: &AssignExpr, want_value: bool) -> Result<(), BackendError> {
        // Event accumulation is call-shaped; handle it first.
        if let Some(event_sym) = event_binding(&assign.lhs) {
            return self.emit_event_assign(assign, event_sym);
        }
        let lhs_ty = assign.lhs.ty.unwrap_or(self.state.well_known.error);
        // Direct in-place construction: `x = new S(...)` on a value type
        // writes through the address of x instead of copying.
        if assign.op.is_none() && !want_value {
            if let ExprKind::New(new_expr) = &assign.rhs.kind {
                if self.state.is_value_type(lhs_ty) && addressable(&assign.lhs) {
                    self.emit_addr(&assign.lhs)?;
                    return self.emit_new_on_address(new_expr, lhs_ty);
                }
            }
        }
        // Properties and indexers store through their set accessor.
        if let Some(setter) = self.setter_of(&assign.lhs) {
            return self.emit_setter_assign(assign, setter, want_value);
        }
        let target = self.classify_target(&assign.lhs)?;
        self.emit_target_pre(&target, &assign.lhs, assign.op.is_some())?;
        match assign.op {
            None => {
                self.emit_value(&assign.rhs)?;
                self.convert_to(&assign.rhs, lhs_ty)?;
            }
            Some(op) => {
                // The current value is on the stack after the pre-phase
                // duplication; combine it with the rhs.
                self.emit_compound_value(assign, op, lhs_ty)?;
            }
        }
        let value_tmp = if want_value {
            let slot = self.scratch_local(lhs_ty)?;
            self.backend.emit(Il::Dup);
            self.store_local(slot);
            Some(slot)
        } else {
            None
        };
        self.emit_target_store(&target)?;
        if let Some(slot) = value_tmp {
            self.load_local(slot);
        }
        Ok(())
    }

    fn emit_compound_value(
        &mut self,
        assign: &AssignExpr,
        op: BinOp,
        lhs_ty: TypeId,
    ) -> Result<(), BackendError> {
        // Stack on entry: ... current-value
        if let Some(method) = assign.operator_method {
            self.emit_value(&assign.rhs)?;
            let params = self.state.symbols.method(method).params.clone();
            if let Some(&p) = params.get(1) {
                self.convert_to(&assign.rhs, p)?;
            }
            let handle = self.rt_method(method)?;
            self.backend.emit(Il::Call(handle));
            return Ok(());
        }
        self.emit_value(&assign.rhs)?;
        let bool_ty = self.state.well_known.bool_ty;
        match op {
            BinOp::Add => self.backend.emit(Il::Add),
            BinOp::Sub => self.backend.emit(Il::Sub),
            BinOp::Mul => self.backend.emit(Il::Mul),
            BinOp::Div => self.backend.emit(Il::Div),
            BinOp::Rem => self.backend.emit(Il::Rem),
            BinOp::BitAnd => self.backend.emit(Il::And),
            BinOp::BitOr => self.backend.emit(Il::Or),
            BinOp::BitXor if lhs_ty == bool_ty => {
                self.backend.emit(Il::Ceq);
                self.load_int(0);
                self.backend.emit(Il::Ceq);
            }
            BinOp::BitXor => self.backend.emit(Il::Xor),
            BinOp::Shl => self.backend.emit(Il::Shl),
            BinOp::Shr => self.backend.emit(Il::Shr),
            _ => {}
        }
        Ok(())
    }

    /// Pre-phase: push whatever the store needs below the value, and for
    /// compound assignment leave the current value on top.
    fn emit_target_pre(
        &mut self,
        target: &StoreTarget,
        lhs: &Expr,
        compound: bool,
    ) -> Result<(), BackendError> {
        match target {
            StoreTarget::Local(slot) => {
                if compound {
                    self.load_local(*slot);
                }
            }
            StoreTarget::Param(slot) => {
                if compound {
                    self.load_arg(*slot);
                }
            }
            StoreTarget::RefParam(inner) => {
                let slot = param_slot_of(self, lhs);
                self.load_arg(slot);
                if compound {
                    self.backend.emit(Il::Dup);
                    self.emit_load_indirect(*inner)?;
                }
            }
            StoreTarget::StaticField(handle) => {
                if compound {
                    self.backend.emit(Il::Ldsfld(*handle));
                }
            }
            StoreTarget::InstanceField(handle) => {
                let receiver = match &lhs.kind {
                    ExprKind::Member(m) => Some(&*m.target),
                    _ => None,
                };
                self.emit_receiver_for_field(receiver)?;
                if compound {
                    self.backend.emit(Il::Dup);
                    self.backend.emit(Il::Ldfld(*handle));
                }
            }
            StoreTarget::ArrayElem(elem) => {
                let ExprKind::Index(index) = &lhs.kind else {
                    return Ok(());
                };
                if compound {
                    // Park array and index in temps so the pair can be
                    // pushed twice.
                    let arr_ty = index.target.ty.unwrap_or(self.state.well_known.error);
                    let arr_tmp = self.scratch_local(arr_ty)?;
                    let idx_tmp = self.scratch_local(self.state.well_known.int)?;
                    self.emit_value(&index.target)?;
                    self.store_local(arr_tmp);
                    self.emit_value(&index.indices[0])?;
                    self.store_local(idx_tmp);
                    self.load_local(arr_tmp);
                    self.load_local(idx_tmp);
                    self.load_local(arr_tmp);
                    self.load_local(idx_tmp);
                    let kind = self.elem_kind(*elem);
                    self.emit_load_element(kind, *elem)?;
                } else {
                    self.emit_value(&index.target)?;
                    for i in &index.indices {
                        self.emit_value(i)?;
                    }
                    if self.elem_kind(*elem) == ElemKind::Struct {
                        let rt = self.rt_type(*elem)?;
                        self.backend.emit(Il::Ldelema(rt));
                    }
                }
            }
            StoreTarget::None => {}
        }
        Ok(())
    }

    fn emit_target_store(&mut self, target: &StoreTarget) -> Result<(), BackendError> {
        match target {
            StoreTarget::Local(slot) => {
                self.store_local(*slot);
                Ok(())
            }
            StoreTarget::Param(slot) => {
                self.backend.emit(Il::Starg(*slot));
                Ok(())
            }
            StoreTarget::RefParam(inner) => self.emit_store_indirect(*inner),
            StoreTarget::StaticField(handle) => {
                self.backend.emit(Il::Stsfld(*handle));
                Ok(())
            }
            StoreTarget::InstanceField(handle) => {
                self.backend.emit(Il::Stfld(*handle));
                Ok(())
            }
            StoreTarget::ArrayElem(elem) => {
                let kind = self.elem_kind(*elem);
                if kind == ElemKind::Struct {
                    let rt = self.rt_type(*elem)?;
                    self.backend.emit(Il::Stobj(rt));
                } else {
                    self.emit_store_element(kind);
                }
                Ok(())
            }
            StoreTarget::None => Ok(()),
        }
    }

    fn classify_target(&mut self, lhs: &Expr) -> Result<StoreTarget, BackendError> {
        match &lhs.kind {
            ExprKind::Name(name) => match name.binding {
                Some(Binding::Local(sym)) => Ok(StoreTarget::Local(self.local_slot(sym))),
                Some(Binding::Param(sym)) => {
                    let (ty, _) = self.param_flow(sym);
                    if self.state.symbols.ty(ty).genre == TypeGenre::Ref {
                        Ok(StoreTarget::RefParam(self.state.strip_ref(ty)))
                    } else {
                        Ok(StoreTarget::Param(self.arg_slot(sym)))
                    }
                }
                Some(Binding::Field(sym)) => self.field_target(sym),
                _ => Ok(StoreTarget::None),
            },
            ExprKind::Member(member) => match member.binding {
                Some(Binding::Field(sym)) => self.field_target(sym),
                _ => Ok(StoreTarget::None),
            },
            ExprKind::Index(index) if index.is_array => {
                let elem = lhs.ty.unwrap_or(self.state.well_known.error);
                Ok(StoreTarget::ArrayElem(elem))
            }
            _ => Ok(StoreTarget::None),
        }
    }

    fn field_target(&mut self, sym: SymbolId) -> Result<StoreTarget, BackendError> {
        let (is_static, handle) = match &self.state.symbols.get(sym).kind {
            SymKind::Field(f) => (f.is_static, f.runtime),
            _ => return Ok(StoreTarget::None),
        };
        let handle = match handle {
            Some(h) => h,
            None => self.imported_field(sym)?,
        };
        Ok(if is_static {
            StoreTarget::StaticField(handle)
        } else {
            StoreTarget::InstanceField(handle)
        })
    }

    fn setter_of(&self, lhs: &Expr) -> Option<SymbolId> {
        match &lhs.kind {
            ExprKind::Name(n) => match n.binding {
                Some(Binding::Property(sym)) => match &self.state.symbols.get(sym).kind {
                    SymKind::Property(p) => p.setter,
                    _ => None,
                },
                _ => None,
            },
            ExprKind::Member(m) => match m.binding {
                Some(Binding::Property(sym)) => match &self.state.symbols.get(sym).kind {
                    SymKind::Property(p) => p.setter,
                    _ => None,
                },
                _ => None,
            },
            ExprKind::Index(index) if !index.is_array => index.setter,
            _ => None,
        }
    }

    fn emit_setter_assign(
        &mut self,
        assign: &AssignExpr,
        setter: SymbolId,
        want_value: bool,
    ) -> Result<(), BackendError> {
        let lhs_ty = assign.lhs.ty.unwrap_or(self.state.well_known.error);
        let is_static = self.state.symbols.method(setter).is_static;
        let (receiver, getter, indices): (Option<&Expr>, Option<SymbolId>, &[Expr]) =
            match &assign.lhs.kind {
                ExprKind::Name(n) => {
                    let getter = property_getter(self, n.binding);
                    (None, getter, &[])
                }
                ExprKind::Member(m) => {
                    let getter = property_getter(self, m.binding);
                    (Some(&m.target), getter, &[])
                }
                ExprKind::Index(index) => {
                    (Some(&index.target), index.getter, index.indices.as_slice())
                }
                _ => (None, None, &[]),
            };
        match assign.op {
            None => {
                if !is_static {
                    match receiver {
                        Some(receiver) => self.emit_method_receiver(receiver, setter)?,
                        None => self.backend.emit(Il::LdargN(0)),
                    }
                }
                for idx in indices {
                    self.emit_value(idx)?;
                }
                self.emit_value(&assign.rhs)?;
                self.convert_to(&assign.rhs, lhs_ty)?;
            }
            Some(op) => {
                // Read through the getter, combine, store through the
                // setter. Receiver and indices are parked in temps so both
                // accessor frames see them exactly once.
                let recv_tmp = match (is_static, receiver) {
                    (false, Some(receiver)) => {
                        let recv_ty = receiver.ty.unwrap_or(self.state.well_known.error);
                        self.emit_value(receiver)?;
                        let slot = self.scratch_local(recv_ty)?;
                        self.store_local(slot);
                        Some(slot)
                    }
                    (false, None) => None,
                    (true, _) => None,
                };
                let mut idx_tmps = Vec::with_capacity(indices.len());
                for idx in indices {
                    let idx_ty = idx.ty.unwrap_or(self.state.well_known.int);
                    self.emit_value(idx)?;
                    let slot = self.scratch_local(idx_ty)?;
                    self.store_local(slot);
                    idx_tmps.push(slot);
                }
                let push_frame = |emitter: &mut Self| {
                    if !is_static {
                        match recv_tmp {
                            Some(slot) => emitter.load_local(slot),
                            None => emitter.backend.emit(Il::LdargN(0)),
                        }
                    }
                    for &slot in &idx_tmps {
                        emitter.load_local(slot);
                    }
                };
                push_frame(self);
                if let Some(getter) = getter {
                    push_frame(self);
                    let handle = self.rt_method(getter)?;
                    self.backend.emit(Il::Call(handle));
                }
                self.emit_compound_value(assign, op, lhs_ty)?;
            }
        }
        let value_tmp = if want_value {
            let slot = self.scratch_local(lhs_ty)?;
            self.backend.emit(Il::Dup);
            self.store_local(slot);
            Some(slot)
        } else {
            None
        };
        let handle = self.rt_method(setter)?;
        self.backend.emit(Il::Call(handle));
        if let Some(slot) = value_tmp {
            self.load_local(slot);
        }
        Ok(())
    }

    fn emit_event_assign(
        &mut self,
        assign: &AssignExpr,
        event_sym: SymbolId,
    ) -> Result<(), BackendError> {
        let (event_ty, is_static, storage) = match &self.state.symbols.get(event_sym).kind {
            SymKind::Event(e) => (e.ty, e.is_static, e.runtime),
            _ => return Ok(()),
        };
        let Some(storage) = storage else { return Ok(()) };
        let combine_name = if assign.op == Some(BinOp::Sub) {
            "Remove"
        } else {
            "Combine"
        };
        let delegate_rt = self.rt_type(self.state.well_known.delegate)?;
        let combine =
            self.backend
                .find_method(delegate_rt, combine_name, &[delegate_rt, delegate_rt])?;
        let receiver = match &assign.lhs.kind {
            ExprKind::Member(m) => Some(&*m.target),
            _ => None,
        };
        if is_static {
            self.backend.emit(Il::Ldsfld(storage));
            self.emit_value(&assign.rhs)?;
            self.backend.emit(Il::Call(combine));
            let event_rt = self.rt_type(event_ty)?;
            self.backend.emit(Il::Castclass(event_rt));
            self.backend.emit(Il::Stsfld(storage));
        } else {
            self.emit_receiver_for_field(receiver)?;
            self.backend.emit(Il::Dup);
            self.backend.emit(Il::Ldfld(storage));
            self.emit_value(&assign.rhs)?;
            self.backend.emit(Il::Call(combine));
            let event_rt = self.rt_type(event_ty)?;
            self.backend.emit(Il::Castclass(event_rt));
            self.backend.emit(Il::Stfld(storage));
        }
        Ok(())
    }

    fn emit_incdec(&mut self, inc_dec: &IncDecExpr) -> Result<(), BackendError> {
        let synthetic = AssignExpr {
            lhs: inc_dec.target.clone(),
            op: Some(if inc_dec.inc { BinOp::Add } else { BinOp::Sub }),
            rhs: Box::new(Expr::typed(
                inc_dec.target.span,
                self.state.well_known.int,
                ExprKind::Int(1),
            )),
            operator_method: None,
        };
        self.emit_assign(&synthetic, false)
    }

    // ---- conversions ----

    /// Box when a value-type producer meets a reference-type consumer.
    pub(crate) fn convert_to(&mut self, expr: &Expr, to: TypeId) -> Result<(), BackendError> {
        let Some(from) = expr.ty else {
            return Ok(());
        };
        if self.state.is_error(from) || self.state.is_error(to) || from == to {
            return Ok(());
        }
        let to = self.state.strip_ref(to);
        if self.state.is_value_type(from) && !self.state.is_value_type(to) {
            let rt = self.rt_type(from)?;
            self.backend.emit(Il::Box(rt));
        }
        Ok(())
    }

    // ---- small lookups ----

    pub(crate) fn local_slot(&mut self, sym: SymbolId) -> u16 {
        match &self.state.symbols.get(sym).kind {
            SymKind::Local(l) => l.slot.unwrap_or(0),
            _ => 0,
        }
    }

    /// Field of an imported type, resolved through the backend on first
    /// use.
    fn imported_field(&mut self, sym: SymbolId) -> Result<RtField, BackendError> {
        let owner = match &self.state.symbols.get(sym).kind {
            SymKind::Field(f) => f.owner,
            _ => return Err(BackendError::Invalid("not a field".to_string())),
        };
        let name = self.state.symbols.get(sym).name.clone();
        let owner_rt = self.rt_type(owner)?;
        let handle = self.backend.find_field(owner_rt, &name)?;
        if let SymKind::Field(f) = &mut self.state.symbols.get_mut(sym).kind {
            f.runtime = Some(handle);
        }
        Ok(handle)
    }
}

fn event_binding(lhs: &Expr) -> Option<SymbolId> {
    match &lhs.kind {
        ExprKind::Name(n) => match n.binding {
            Some(Binding::Event(sym)) => Some(sym),
            _ => None,
        },
        ExprKind::Member(m) => match m.binding {
            Some(Binding::Event(sym)) => Some(sym),
            _ => None,
        },
        _ => None,
    }
}

fn addressable(expr: &Expr) -> bool {
    matches!(
        &expr.kind,
        ExprKind::Name(blue_parser::ast::NameExpr {
            binding: Some(Binding::Local(_) | Binding::Param(_) | Binding::Field(_)),
            ..
        })
    ) || matches!(
        &expr.kind,
        ExprKind::Member(blue_parser::ast::MemberExpr {
            binding: Some(Binding::Field(_)),
            ..
        })
    )
}

fn property_getter(emitter: &Emitter<'_>, binding: Option<Binding>) -> Option<SymbolId> {
    match binding {
        Some(Binding::Property(sym)) => match &emitter.state.symbols.get(sym).kind {
            SymKind::Property(p) => p.getter,
            _ => None,
        },
        _ => None,
    }
}

fn param_slot_of(emitter: &mut Emitter<'_>, lhs: &Expr) -> u16 {
    match &lhs.kind {
        ExprKind::Name(n) => match n.binding {
            Some(Binding::Param(sym)) => emitter.arg_slot(sym),
            _ => 0,
        },
        _ => 0,
    }
}
