//! Pass B: expression resolution.
//!
//! Every resolved expression gets a non-null type (the `null` literal
//! excepted); identifiers and member accesses are rewritten into bindings;
//! calls pick their overload; casts are classified for emission. Errors
//! poison the expression with the error type so diagnostics do not
//! cascade.

use blue_common::{DiagnosticCode, SourceSpan, SymbolId, TypeId};
use blue_parser::ast::{
    ArgFlow, AssignExpr, BinOp, Binding, CallExpr, CastExpr, CastKind, Expr, ExprKind, IndexExpr,
    MemberExpr, MethodPtrExpr, NewArrayExpr, NewExpr, UnOp,
};

use crate::Resolver;
use crate::bodies::BodyCtx;
use crate::overload::MethodLookup;
use crate::symbols::{SymKind, TypeGenre};

/// What the receiver position of a member access resolved to.
enum Qual {
    Value(Option<TypeId>),
    Type(TypeId),
    Namespace(SymbolId),
    BaseRef(TypeId),
}

impl Resolver<'_> {
    /// Resolve an expression and annotate it. Returns the type, `None`
    /// for the null literal. Hard errors poison with the error type.
    pub(crate) fn resolve_expr(&mut self, expr: &mut Expr, ctx: &mut BodyCtx) -> Option<TypeId> {
        if expr.ty.is_some() {
            // Synthesized nodes arrive pre-typed; resolution is a no-op.
            return expr.ty;
        }
        let stmt_pos = std::mem::replace(&mut ctx.stmt_expr, false);
        let span = expr.span;
        let error = self.state.well_known.error;
        let ty: Option<TypeId> = match &mut expr.kind {
            ExprKind::Int(v) => {
                // Hex literals may occupy the full unsigned range and are
                // reinterpreted; anything wider cannot be represented.
                if *v > i64::from(u32::MAX) {
                    self.diags.error(
                        DiagnosticCode::TypeMismatch,
                        span,
                        "integer literal does not fit in 32 bits",
                    );
                }
                Some(self.state.well_known.int)
            }
            ExprKind::Char(_) => Some(self.state.well_known.char),
            ExprKind::Bool(_) => Some(self.state.well_known.bool_ty),
            ExprKind::Str(_) => Some(self.state.well_known.string),
            ExprKind::Null => return None,
            ExprKind::This => {
                if ctx.is_static {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        span,
                        "'this' cannot be used in a static context",
                    );
                    Some(error)
                } else {
                    Some(ctx.owner)
                }
            }
            ExprKind::Base => {
                self.diags.error(
                    DiagnosticCode::SyntaxError,
                    span,
                    "'base' must be followed by a member access",
                );
                Some(error)
            }
            ExprKind::Name(_) | ExprKind::Member(_) => {
                let ty = match self.resolve_target(expr, ctx) {
                    Qual::Value(ty) => ty,
                    Qual::Type(_) | Qual::Namespace(_) => {
                        self.diags.error(
                            DiagnosticCode::BadSymbolType,
                            span,
                            "a type or namespace cannot be used as a value",
                        );
                        Some(error)
                    }
                    Qual::BaseRef(_) => Some(error),
                };
                expr.ty = ty;
                return ty;
            }
            ExprKind::Call(_) => {
                let ty = self.resolve_call(expr, ctx);
                expr.ty = ty;
                return ty;
            }
            ExprKind::MethodPtr(_) => expr.ty,
            ExprKind::New(_) => {
                let ty = self.resolve_new(expr, ctx);
                expr.ty = ty;
                return ty;
            }
            ExprKind::NewArray(new_array) => Some(self.resolve_new_array(new_array, span, ctx)),
            ExprKind::Index(_) => {
                let ty = self.resolve_index(expr, ctx, false);
                expr.ty = ty;
                return ty;
            }
            ExprKind::Cast(cast) => Some(self.resolve_cast(cast, span, ctx)),
            ExprKind::Is { expr: inner, ty } => {
                self.resolve_expr(inner, ctx);
                self.resolve_type_ref(ty, ctx.scope);
                Some(self.state.well_known.bool_ty)
            }
            ExprKind::As { expr: inner, ty } => {
                self.resolve_expr(inner, ctx);
                let target = self.resolve_type_ref(ty, ctx.scope);
                if !self.state.is_error(target) && self.state.is_value_type(target) {
                    self.diags.error(
                        DiagnosticCode::AsOpOnlyOnRefTypes,
                        span,
                        "'as' can only convert to reference types",
                    );
                    Some(error)
                } else {
                    Some(target)
                }
            }
            ExprKind::TypeOf { ty } => {
                self.resolve_type_ref(ty, ctx.scope);
                Some(self.state.well_known.type_ty)
            }
            ExprKind::Cond {
                cond,
                then_e,
                else_e,
            } => {
                let cond_ty = self.resolve_expr(cond, ctx);
                let bool_ty = self.state.well_known.bool_ty;
                if !matches!(cond_ty, Some(t) if t == bool_ty || self.state.is_error(t)) {
                    self.diags.error(
                        DiagnosticCode::TypeMismatch,
                        cond.span,
                        "the condition must have type bool",
                    );
                }
                let t = self.resolve_expr(then_e, ctx);
                let e = self.resolve_expr(else_e, ctx);
                match (t, e) {
                    (Some(a), Some(b)) if a == b => Some(a),
                    (Some(a), Some(b)) if self.state.assignable(b, a) => Some(a),
                    (Some(a), Some(b)) if self.state.assignable(a, b) => Some(b),
                    (None, Some(b)) if !self.state.is_value_type(b) => Some(b),
                    (Some(a), None) if !self.state.is_value_type(a) => Some(a),
                    _ => {
                        self.diags.error(
                            DiagnosticCode::BadTypeIfExp,
                            span,
                            "the branches of '?:' have incompatible types",
                        );
                        Some(error)
                    }
                }
            }
            ExprKind::Binary(binary) => {
                let l = self.resolve_expr(&mut binary.lhs, ctx);
                let r = self.resolve_expr(&mut binary.rhs, ctx);
                let op = binary.op;
                let mut method = None;
                let ty = self.binary_type(op, l, r, span, &mut method);
                binary.operator_method = method;
                Some(ty)
            }
            ExprKind::Unary { op, expr: inner } => {
                let inner_ty = self.resolve_expr(inner, ctx);
                match op {
                    UnOp::Not => {
                        let bool_ty = self.state.well_known.bool_ty;
                        if !matches!(inner_ty, Some(t) if t == bool_ty || self.state.is_error(t)) {
                            self.diags.error(
                                DiagnosticCode::TypeMismatch,
                                span,
                                "'!' requires a bool operand",
                            );
                        }
                        Some(bool_ty)
                    }
                    UnOp::Neg => {
                        if !self.is_int_ish(inner_ty) {
                            self.diags.error(
                                DiagnosticCode::TypeMismatch,
                                span,
                                "unary '-' requires an integer operand",
                            );
                        }
                        Some(self.state.well_known.int)
                    }
                }
            }
            ExprKind::Arg { expr: inner, .. } => {
                // Wrappers are resolved by call handling; reaching one
                // elsewhere is a parse-shape problem.
                self.resolve_expr(inner, ctx);
                self.diags.error(
                    DiagnosticCode::SyntaxError,
                    span,
                    "'ref'/'out' is only valid on call arguments",
                );
                Some(error)
            }
            ExprKind::Assign(_) => {
                let ty = self.resolve_assign(expr, ctx);
                expr.ty = ty;
                return ty;
            }
            ExprKind::IncDec(inc_dec) => {
                if !stmt_pos {
                    self.diags.error(
                        DiagnosticCode::NotYetImplemented,
                        span,
                        "'++'/'--' can only be used as a statement",
                    );
                }
                let target_ty = self.resolve_lvalue(&mut inc_dec.target, ctx);
                if !self.is_int_ish(target_ty) {
                    self.diags.error(
                        DiagnosticCode::TypeMismatch,
                        span,
                        "'++'/'--' requires an integer variable",
                    );
                }
                Some(self.state.well_known.int)
            }
        };
        expr.ty = ty;
        ty
    }

    fn is_int_ish(&self, ty: Option<TypeId>) -> bool {
        matches!(ty, Some(t) if t == self.state.well_known.int
            || t == self.state.well_known.char
            || self.state.is_error(t))
    }

    // ---- names and member access ----

    fn resolve_target(&mut self, expr: &mut Expr, ctx: &mut BodyCtx) -> Qual {
        let span = expr.span;
        let error = self.state.well_known.error;
        match &mut expr.kind {
            ExprKind::Name(name_expr) => {
                let Some(sym) = self.state.smart_lookup(ctx.scope, &name_expr.name) else {
                    self.diags.error(
                        DiagnosticCode::UndefinedSymbol,
                        span,
                        format!("symbol '{}' is not defined", name_expr.name),
                    );
                    expr.ty = Some(error);
                    return Qual::Value(Some(error));
                };
                match &self.state.symbols.get(sym).kind {
                    SymKind::Namespace(_) => {
                        name_expr.binding = Some(Binding::Namespace(sym));
                        Qual::Namespace(sym)
                    }
                    SymKind::Type(_) => {
                        name_expr.binding = Some(Binding::Type(TypeId(sym)));
                        Qual::Type(TypeId(sym))
                    }
                    SymKind::Local(local) => {
                        name_expr.binding = Some(Binding::Local(sym));
                        let ty = local.ty;
                        expr.ty = Some(ty);
                        Qual::Value(Some(ty))
                    }
                    SymKind::Param(param) => {
                        name_expr.binding = Some(Binding::Param(sym));
                        let ty = self.state.strip_ref(param.ty);
                        expr.ty = Some(ty);
                        Qual::Value(Some(ty))
                    }
                    SymKind::Field(field) => {
                        if !field.is_static && ctx.is_static {
                            self.diags.error(
                                DiagnosticCode::BadSymbolType,
                                span,
                                format!(
                                    "instance field '{}' cannot be used in a static context",
                                    name_expr.name
                                ),
                            );
                        }
                        name_expr.binding = Some(Binding::Field(sym));
                        let ty = field.ty;
                        expr.ty = Some(ty);
                        Qual::Value(Some(ty))
                    }
                    SymKind::LiteralField(field) => {
                        name_expr.binding = Some(Binding::LiteralField(sym));
                        let ty = field.ty;
                        expr.ty = Some(ty);
                        Qual::Value(Some(ty))
                    }
                    SymKind::Property(prop) => {
                        if !prop.is_static && ctx.is_static {
                            self.diags.error(
                                DiagnosticCode::BadSymbolType,
                                span,
                                format!(
                                    "instance property '{}' cannot be used in a static context",
                                    name_expr.name
                                ),
                            );
                        }
                        name_expr.binding = Some(Binding::Property(sym));
                        let ty = prop.ty;
                        expr.ty = Some(ty);
                        Qual::Value(Some(ty))
                    }
                    SymKind::Event(_) => {
                        self.diags.error(
                            DiagnosticCode::NoEventOnRhs,
                            span,
                            format!("event '{}' can only be assigned to", name_expr.name),
                        );
                        expr.ty = Some(error);
                        Qual::Value(Some(error))
                    }
                    SymKind::MethodHeader(_) | SymKind::Method(_) => {
                        self.diags.error(
                            DiagnosticCode::BadSymbolType,
                            span,
                            format!("method '{}' cannot be used as a value", name_expr.name),
                        );
                        expr.ty = Some(error);
                        Qual::Value(Some(error))
                    }
                    SymKind::Label(_) => {
                        self.diags.error(
                            DiagnosticCode::BadSymbolType,
                            span,
                            format!("label '{}' cannot be used as a value", name_expr.name),
                        );
                        expr.ty = Some(error);
                        Qual::Value(Some(error))
                    }
                }
            }
            ExprKind::Base => {
                if ctx.is_static {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        span,
                        "'base' cannot be used in a static context",
                    );
                    return Qual::Value(Some(error));
                }
                match self.state.symbols.ty(ctx.owner).super_ty {
                    Some(super_ty) => {
                        expr.ty = Some(super_ty);
                        Qual::BaseRef(super_ty)
                    }
                    None => Qual::Value(Some(error)),
                }
            }
            ExprKind::Member(_) => {
                let ExprKind::Member(member) = &mut expr.kind else {
                    unreachable!()
                };
                let qual = self.resolve_target(&mut member.target, ctx);
                let name = member.name.clone();
                match qual {
                    Qual::Namespace(ns_sym) => {
                        let ns_scope = match &self.state.symbols.get(ns_sym).kind {
                            SymKind::Namespace(ns) => ns.scope,
                            _ => unreachable!(),
                        };
                        let Some(sym) = self.state.scopes.get(ns_scope, &name) else {
                            self.diags.error(
                                DiagnosticCode::SymbolNotInNamespace,
                                span,
                                format!("'{name}' does not exist in the namespace"),
                            );
                            expr.ty = Some(error);
                            return Qual::Value(Some(error));
                        };
                        match &self.state.symbols.get(sym).kind {
                            SymKind::Namespace(_) => {
                                member.binding = Some(Binding::Namespace(sym));
                                Qual::Namespace(sym)
                            }
                            SymKind::Type(_) => {
                                member.binding = Some(Binding::Type(TypeId(sym)));
                                Qual::Type(TypeId(sym))
                            }
                            _ => {
                                self.diags.error(
                                    DiagnosticCode::BadSymbolType,
                                    span,
                                    format!("'{name}' is not a type or namespace"),
                                );
                                expr.ty = Some(error);
                                Qual::Value(Some(error))
                            }
                        }
                    }
                    Qual::Type(ty) => {
                        self.ensure_chain(ty);
                        let ty_result = self.static_member(expr, ty, &name, span);
                        ty_result
                    }
                    Qual::Value(Some(target_ty)) => {
                        self.ensure_chain(target_ty);
                        let member_ty =
                            self.instance_member(expr, target_ty, &name, span, false);
                        Qual::Value(member_ty)
                    }
                    Qual::Value(None) => {
                        self.diags.error(
                            DiagnosticCode::TypeMismatch,
                            span,
                            "'null' has no members",
                        );
                        expr.ty = Some(error);
                        Qual::Value(Some(error))
                    }
                    Qual::BaseRef(super_ty) => {
                        self.ensure_chain(super_ty);
                        let member_ty = self.instance_member(expr, super_ty, &name, span, false);
                        Qual::Value(member_ty)
                    }
                }
            }
            _ => {
                let ty = self.resolve_expr(expr, ctx);
                Qual::Value(ty)
            }
        }
    }

    /// `Type.name` in a value position.
    fn static_member(&mut self, expr: &mut Expr, ty: TypeId, name: &str, span: SourceSpan) -> Qual {
        let error = self.state.well_known.error;
        let Some(sym) = self.state.lookup_member(ty, name) else {
            self.diags.error(
                DiagnosticCode::SymbolNotInType,
                span,
                format!("'{name}' does not exist in '{}'", self.state.full_name(ty)),
            );
            expr.ty = Some(error);
            return Qual::Value(Some(error));
        };
        let ExprKind::Member(member) = &mut expr.kind else {
            unreachable!()
        };
        match &self.state.symbols.get(sym).kind {
            SymKind::Type(_) => {
                member.binding = Some(Binding::Type(TypeId(sym)));
                Qual::Type(TypeId(sym))
            }
            SymKind::Field(field) => {
                if !field.is_static {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        span,
                        format!("'{name}' is an instance field"),
                    );
                }
                member.binding = Some(Binding::Field(sym));
                expr.ty = Some(field.ty);
                Qual::Value(Some(field.ty))
            }
            SymKind::LiteralField(field) => {
                member.binding = Some(Binding::LiteralField(sym));
                expr.ty = Some(field.ty);
                Qual::Value(Some(field.ty))
            }
            SymKind::Property(prop) => {
                if !prop.is_static {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        span,
                        format!("'{name}' is an instance property"),
                    );
                }
                member.binding = Some(Binding::Property(sym));
                expr.ty = Some(prop.ty);
                Qual::Value(Some(prop.ty))
            }
            SymKind::Event(_) => {
                self.diags.error(
                    DiagnosticCode::NoEventOnRhs,
                    span,
                    format!("event '{name}' can only be assigned to"),
                );
                expr.ty = Some(error);
                Qual::Value(Some(error))
            }
            _ => {
                self.diags.error(
                    DiagnosticCode::BadSymbolType,
                    span,
                    format!("'{name}' cannot be used as a value"),
                );
                expr.ty = Some(error);
                Qual::Value(Some(error))
            }
        }
    }

    /// `value.name` reads; `allow_event` tolerates events for assignment
    /// left-hand sides.
    fn instance_member(
        &mut self,
        expr: &mut Expr,
        target_ty: TypeId,
        name: &str,
        span: SourceSpan,
        allow_event: bool,
    ) -> Option<TypeId> {
        let error = self.state.well_known.error;
        let Some(sym) = self.state.lookup_member(target_ty, name) else {
            self.diags.error(
                DiagnosticCode::SymbolNotInType,
                span,
                format!(
                    "'{name}' does not exist in '{}'",
                    self.state.full_name(target_ty)
                ),
            );
            expr.ty = Some(error);
            return Some(error);
        };
        let ExprKind::Member(member) = &mut expr.kind else {
            unreachable!()
        };
        let ty = match &self.state.symbols.get(sym).kind {
            SymKind::Field(field) => {
                if field.is_static {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        span,
                        format!("static field '{name}' cannot be accessed through an instance"),
                    );
                }
                member.binding = Some(Binding::Field(sym));
                field.ty
            }
            SymKind::LiteralField(field) => {
                member.binding = Some(Binding::LiteralField(sym));
                field.ty
            }
            SymKind::Property(prop) => {
                member.binding = Some(Binding::Property(sym));
                prop.ty
            }
            SymKind::Event(event) if allow_event => {
                member.binding = Some(Binding::Event(sym));
                event.ty
            }
            SymKind::Event(_) => {
                self.diags.error(
                    DiagnosticCode::NoEventOnRhs,
                    span,
                    format!("event '{name}' can only be assigned to"),
                );
                error
            }
            _ => {
                self.diags.error(
                    DiagnosticCode::BadSymbolType,
                    span,
                    format!("'{name}' cannot be used as a value"),
                );
                error
            }
        };
        expr.ty = Some(ty);
        Some(ty)
    }

    // ---- calls ----

    fn resolve_call(&mut self, expr: &mut Expr, ctx: &mut BodyCtx) -> Option<TypeId> {
        let span = expr.span;
        let error = self.state.well_known.error;
        let ExprKind::Call(call) = &mut expr.kind else {
            unreachable!()
        };
        let mut arg_tys: Vec<Option<TypeId>> = Vec::with_capacity(call.args.len());
        for arg in &mut call.args {
            arg_tys.push(self.resolve_arg(arg, ctx));
        }

        // Take the target apart without cloning the argument list.
        enum Callee {
            Implicit(String),
            OnTarget(String),
            Invalid,
        }
        let callee = match &call.target.kind {
            ExprKind::Name(n) => Callee::Implicit(n.name.clone()),
            ExprKind::Member(m) => Callee::OnTarget(m.name.clone()),
            _ => Callee::Invalid,
        };
        match callee {
            Callee::Implicit(name) => {
                // A simple name: locals/parameters/fields of delegate type
                // take precedence over the method group.
                if let Some(sym) = self.state.smart_lookup(ctx.scope, &name) {
                    let delegate_ty = match &self.state.symbols.get(sym).kind {
                        SymKind::Local(l) => Some(l.ty),
                        SymKind::Param(p) => Some(self.state.strip_ref(p.ty)),
                        SymKind::Field(f) => Some(f.ty),
                        SymKind::Property(p) => Some(p.ty),
                        _ => None,
                    };
                    if let Some(d_ty) = delegate_ty {
                        if !self.state.is_error(d_ty)
                            && self.state.symbols.ty(d_ty).genre == TypeGenre::Delegate
                        {
                            self.resolve_expr(&mut call.target, ctx);
                            return self.finish_delegate_call(call, d_ty, &arg_tys, span);
                        }
                    }
                }
                let owner = ctx.owner;
                match self.lookup_method_on(owner, &name, &arg_tys) {
                    MethodLookup::Found(method) => {
                        let m = self.state.symbols.method(method);
                        let (is_static, is_virtual, ret) = (m.is_static, m.is_virtual, m.ret);
                        if !is_static && ctx.is_static {
                            self.diags.error(
                                DiagnosticCode::BadSymbolType,
                                span,
                                format!("instance method '{name}' cannot be called from a static context"),
                            );
                        }
                        call.method = Some(method);
                        call.polymorphic = is_virtual;
                        self.check_ref_args(call, method);
                        ret
                    }
                    lookup => {
                        self.report_method_lookup(&lookup, owner, &name, span);
                        Some(error)
                    }
                }
            }
            Callee::OnTarget(name) => {
                let ExprKind::Member(member) = &mut call.target.kind else {
                    unreachable!()
                };
                let qual = self.resolve_target(&mut member.target, ctx);
                match qual {
                    Qual::Namespace(_) => {
                        self.diags.error(
                            DiagnosticCode::BadSymbolType,
                            span,
                            "a namespace cannot be called",
                        );
                        Some(error)
                    }
                    Qual::Type(ty) => {
                        match self.lookup_method_on(ty, &name, &arg_tys) {
                            MethodLookup::Found(method) => {
                                let m = self.state.symbols.method(method);
                                let (is_static, is_virtual, ret) =
                                    (m.is_static, m.is_virtual, m.ret);
                                if !is_static {
                                    self.diags.error(
                                        DiagnosticCode::BadSymbolType,
                                        span,
                                        format!("'{name}' is an instance method"),
                                    );
                                }
                                call.method = Some(method);
                                call.polymorphic = is_virtual && !is_static;
                                self.check_ref_args(call, method);
                                ret
                            }
                            lookup => {
                                // A static delegate-typed member invoked?
                                if let Some(d_ty) = self.delegate_member_type(ty, &name) {
                                    let _ = self.instance_member_static_read(call, d_ty);
                                    return self.finish_delegate_call(call, d_ty, &arg_tys, span);
                                }
                                self.report_method_lookup(&lookup, ty, &name, span);
                                Some(error)
                            }
                        }
                    }
                    Qual::Value(Some(target_ty)) if self.state.is_error(target_ty) => {
                        // The receiver already failed; stay quiet.
                        Some(error)
                    }
                    Qual::Value(Some(target_ty)) => {
                        self.ensure_chain(target_ty);
                        match self.lookup_method_on(target_ty, &name, &arg_tys) {
                            MethodLookup::Found(method) => {
                                let m = self.state.symbols.method(method);
                                let (is_static, is_virtual, ret) =
                                    (m.is_static, m.is_virtual, m.ret);
                                if is_static {
                                    self.diags.error(
                                        DiagnosticCode::BadSymbolType,
                                        span,
                                        format!("static method '{name}' cannot be called through an instance"),
                                    );
                                }
                                call.method = Some(method);
                                call.polymorphic = is_virtual;
                                self.check_ref_args(call, method);
                                ret
                            }
                            lookup => {
                                if let Some(d_ty) = self.delegate_member_type(target_ty, &name) {
                                    let _ = self.instance_member(
                                        &mut call.target,
                                        target_ty,
                                        &name,
                                        span,
                                        false,
                                    );
                                    return self.finish_delegate_call(call, d_ty, &arg_tys, span);
                                }
                                self.report_method_lookup(&lookup, target_ty, &name, span);
                                Some(error)
                            }
                        }
                    }
                    Qual::Value(None) => {
                        self.diags.error(
                            DiagnosticCode::TypeMismatch,
                            span,
                            "'null' has no members",
                        );
                        Some(error)
                    }
                    Qual::BaseRef(super_ty) => {
                        self.ensure_chain(super_ty);
                        match self.lookup_method_on(super_ty, &name, &arg_tys) {
                            MethodLookup::Found(method) => {
                                let m = self.state.symbols.method(method);
                                if m.is_static {
                                    self.diags.error(
                                        DiagnosticCode::BaseAccessCantBeStatic,
                                        span,
                                        "'base' access cannot name a static member",
                                    );
                                }
                                let ret = m.ret;
                                call.method = Some(method);
                                // Base calls never dispatch virtually.
                                call.polymorphic = false;
                                self.check_ref_args(call, method);
                                ret
                            }
                            lookup => {
                                self.report_method_lookup(&lookup, super_ty, &name, span);
                                Some(error)
                            }
                        }
                    }
                }
            }
            Callee::Invalid => {
                // `base(...)` outside a constructor chain, or calling an
                // arbitrary expression: only delegate values are callable.
                if matches!(call.target.kind, ExprKind::Base) {
                    self.diags.error(
                        DiagnosticCode::SyntaxError,
                        span,
                        "'base(...)' is only valid as a constructor initializer",
                    );
                    return Some(error);
                }
                let target_ty = self.resolve_expr(&mut call.target, ctx);
                match target_ty {
                    Some(t)
                        if !self.state.is_error(t)
                            && self.state.symbols.ty(t).genre == TypeGenre::Delegate =>
                    {
                        self.finish_delegate_call(call, t, &arg_tys, span)
                    }
                    _ => {
                        self.diags.error(
                            DiagnosticCode::BadSymbolType,
                            span,
                            "this expression cannot be called",
                        );
                        Some(error)
                    }
                }
            }
        }
    }

    fn instance_member_static_read(&mut self, call: &mut CallExpr, d_ty: TypeId) -> Option<TypeId> {
        // Annotate the member target with the delegate type so emission
        // loads the field/property before Invoke.
        if let ExprKind::Member(member) = &mut call.target.kind {
            if member.binding.is_none() {
                if let Some(sym) = self.state.lookup_member(d_ty, &member.name) {
                    member.binding = Some(match &self.state.symbols.get(sym).kind {
                        SymKind::Property(_) => Binding::Property(sym),
                        _ => Binding::Field(sym),
                    });
                }
            }
        }
        call.target.ty = Some(d_ty);
        Some(d_ty)
    }

    fn delegate_member_type(&mut self, owner: TypeId, name: &str) -> Option<TypeId> {
        let sym = self.state.lookup_member(owner, name)?;
        let ty = match &self.state.symbols.get(sym).kind {
            SymKind::Field(f) => f.ty,
            SymKind::Property(p) => p.ty,
            _ => return None,
        };
        (!self.state.is_error(ty) && self.state.symbols.ty(ty).genre == TypeGenre::Delegate)
            .then_some(ty)
    }

    fn finish_delegate_call(
        &mut self,
        call: &mut CallExpr,
        d_ty: TypeId,
        arg_tys: &[Option<TypeId>],
        span: SourceSpan,
    ) -> Option<TypeId> {
        match self.lookup_method_on(d_ty, "Invoke", arg_tys) {
            MethodLookup::Found(invoke) => {
                let ret = self.state.symbols.method(invoke).ret;
                call.method = Some(invoke);
                call.polymorphic = true;
                ret
            }
            lookup => {
                self.report_method_lookup(&lookup, d_ty, "Invoke", span);
                Some(self.state.well_known.error)
            }
        }
    }

    fn resolve_arg(&mut self, arg: &mut Expr, ctx: &mut BodyCtx) -> Option<TypeId> {
        if let ExprKind::Arg { flow, expr: inner } = &mut arg.kind {
            let flow = *flow;
            let inner_ty = self.resolve_expr(inner, ctx);
            if !is_location(inner) {
                self.diags.error(
                    DiagnosticCode::NotValidLhs,
                    inner.span,
                    "a 'ref'/'out' argument must be a variable or field",
                );
            }
            let _ = flow;
            let wrapped = inner_ty.map(|t| self.state.ref_of(t));
            arg.ty = wrapped;
            wrapped
        } else {
            self.resolve_expr(arg, ctx)
        }
    }

    /// Flow-compatibility of ref/out wrappers against the chosen method.
    fn check_ref_args(&mut self, call: &mut CallExpr, method: SymbolId) {
        let flows = self.state.symbols.method(method).flows.clone();
        for (i, arg) in call.args.iter().enumerate() {
            let arg_is_ref = matches!(arg.kind, ExprKind::Arg { .. });
            let param_is_ref = flows
                .get(i)
                .is_some_and(|f| *f != blue_parser::ast::ParamFlow::In);
            if arg_is_ref != param_is_ref && i < flows.len() {
                self.diags.error(
                    DiagnosticCode::TypeMismatch,
                    arg.span,
                    if param_is_ref {
                        "this argument must be passed with 'ref' or 'out'"
                    } else {
                        "this argument cannot be passed by reference"
                    },
                );
            }
        }
    }

    // ---- object and array creation ----

    fn resolve_new(&mut self, expr: &mut Expr, ctx: &mut BodyCtx) -> Option<TypeId> {
        let span = expr.span;
        let error = self.state.well_known.error;
        let ExprKind::New(new_expr) = &mut expr.kind else {
            unreachable!()
        };
        let ty = self.resolve_type_ref(&mut new_expr.ty, ctx.scope);
        if self.state.is_error(ty) {
            return Some(error);
        }
        let genre = self.state.symbols.ty(ty).genre;
        match genre {
            TypeGenre::Interface => {
                self.diags.error(
                    DiagnosticCode::BadSymbolType,
                    span,
                    "an interface cannot be instantiated",
                );
                return Some(error);
            }
            TypeGenre::Delegate => return self.resolve_new_delegate(expr, ty, ctx),
            _ => {}
        }
        if self.state.symbols.ty(ty).mods.contains(blue_parser::ast::Modifiers::ABSTRACT) {
            self.diags.error(
                DiagnosticCode::BadSymbolType,
                span,
                "an abstract class cannot be instantiated",
            );
            return Some(error);
        }
        let ExprKind::New(new_expr) = &mut expr.kind else {
            unreachable!()
        };
        let mut arg_tys = Vec::with_capacity(new_expr.args.len());
        for arg in &mut new_expr.args {
            arg_tys.push(self.resolve_arg(arg, ctx));
        }
        if genre.is_value_type() && new_expr.args.is_empty() {
            // Default value-type construction: no constructor call at all.
            new_expr.ctor = None;
            return Some(ty);
        }
        self.ensure_members(ty);
        match self.lookup_ctor_on(ty, &arg_tys) {
            MethodLookup::Found(ctor) => {
                new_expr.ctor = Some(ctor);
                Some(ty)
            }
            lookup => {
                self.report_method_lookup(&lookup, ty, ".ctor", span);
                Some(error)
            }
        }
    }

    /// `new D(obj.Method)`: bind the method group against the delegate's
    /// Invoke signature and rewrite the argument into a method pointer.
    fn resolve_new_delegate(
        &mut self,
        expr: &mut Expr,
        d_ty: TypeId,
        ctx: &mut BodyCtx,
    ) -> Option<TypeId> {
        let span = expr.span;
        let error = self.state.well_known.error;
        self.ensure_members(d_ty);
        let invoke_params: Vec<Option<TypeId>> = {
            let scope = self.state.symbols.ty(d_ty).member_scope;
            let invoke = scope
                .and_then(|s| {
                    self.state
                        .scopes
                        .get(s, &crate::state::ResolveState::header_key("Invoke"))
                })
                .and_then(|h| match &self.state.symbols.get(h).kind {
                    SymKind::MethodHeader(header) => header.overloads.first().copied(),
                    _ => None,
                });
            match invoke {
                Some(m) => self
                    .state
                    .symbols
                    .method(m)
                    .params
                    .iter()
                    .map(|&p| Some(p))
                    .collect(),
                None => {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        span,
                        "this delegate type has no Invoke method",
                    );
                    return Some(error);
                }
            }
        };
        let ExprKind::New(new_expr) = &mut expr.kind else {
            unreachable!()
        };
        if new_expr.args.len() != 1 {
            self.diags.error(
                DiagnosticCode::NoAcceptableOverload,
                span,
                "a delegate is created from exactly one method reference",
            );
            return Some(error);
        }
        let mut group = new_expr.args.pop().unwrap();
        let (target_ty, receiver, name) = match &mut group.kind {
            ExprKind::Name(n) => (ctx.owner, None, n.name.clone()),
            ExprKind::Member(m) => {
                let qual = self.resolve_target(&mut m.target, ctx);
                match qual {
                    Qual::Type(ty) => (ty, None, m.name.clone()),
                    Qual::Value(Some(ty)) => {
                        let receiver = std::mem::replace(
                            &mut *m.target,
                            Expr::new(span, ExprKind::Null),
                        );
                        (ty, Some(Box::new(receiver)), m.name.clone())
                    }
                    _ => {
                        self.diags.error(
                            DiagnosticCode::BadSymbolType,
                            span,
                            "expected a method reference",
                        );
                        return Some(error);
                    }
                }
            }
            _ => {
                self.diags.error(
                    DiagnosticCode::BadSymbolType,
                    span,
                    "expected a method reference",
                );
                return Some(error);
            }
        };
        match self.lookup_method_on(target_ty, &name, &invoke_params) {
            MethodLookup::Found(method) => {
                let m = self.state.symbols.method(method);
                let is_static = m.is_static;
                if !is_static && receiver.is_none() && ctx.is_static {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        span,
                        "an instance method reference requires a receiver",
                    );
                }
                let receiver = if is_static {
                    None
                } else {
                    receiver.or_else(|| Some(Box::new(Expr::typed(span, ctx.owner, ExprKind::This))))
                };
                let ptr = Expr::typed(
                    group.span,
                    d_ty,
                    ExprKind::MethodPtr(MethodPtrExpr {
                        target: receiver,
                        method,
                    }),
                );
                let ExprKind::New(new_expr) = &mut expr.kind else {
                    unreachable!()
                };
                new_expr.args.push(ptr);
                new_expr.ctor = {
                    let scope = self.state.symbols.ty(d_ty).member_scope;
                    scope
                        .and_then(|s| {
                            self.state
                                .scopes
                                .get(s, &crate::state::ResolveState::header_key(".ctor"))
                        })
                        .and_then(|h| match &self.state.symbols.get(h).kind {
                            SymKind::MethodHeader(header) => header.overloads.first().copied(),
                            _ => None,
                        })
                };
                Some(d_ty)
            }
            lookup => {
                self.report_method_lookup(&lookup, target_ty, &name, span);
                Some(error)
            }
        }
    }

    fn resolve_new_array(
        &mut self,
        new_array: &mut NewArrayExpr,
        span: SourceSpan,
        ctx: &mut BodyCtx,
    ) -> TypeId {
        let elem = self.resolve_type_ref(&mut new_array.elem, ctx.scope);
        let int = self.state.well_known.int;
        if let Some(len) = &mut new_array.len {
            let len_ty = self.resolve_expr(len, ctx);
            if !self.is_int_ish(len_ty) {
                self.diags.error(
                    DiagnosticCode::TypeMismatch,
                    len.span,
                    "an array bound must be an integer",
                );
            }
        }
        if let Some(init) = &mut new_array.init {
            for item in init.iter_mut() {
                let item_ty = self.resolve_expr(item, ctx);
                if !self.state.assignable_opt(item_ty, elem) {
                    self.type_mismatch(item.span, item_ty, elem);
                }
            }
            if let Some(len) = &new_array.len {
                if let ExprKind::Int(bound) = len.kind {
                    if bound != init.len() as i64 {
                        self.diags.error(
                            DiagnosticCode::NewArrayBoundsMismatch,
                            span,
                            format!(
                                "the array bound says {bound} elements but the initializer has {}",
                                init.len()
                            ),
                        );
                    }
                }
            }
        }
        let _ = int;
        self.state.array_of(elem, new_array.rank.max(1))
    }

    // ---- indexing ----

    /// Resolve an index expression; `for_write` additionally resolves the
    /// set-side indexer.
    fn resolve_index(
        &mut self,
        expr: &mut Expr,
        ctx: &mut BodyCtx,
        for_write: bool,
    ) -> Option<TypeId> {
        let span = expr.span;
        let error = self.state.well_known.error;
        let ExprKind::Index(index) = &mut expr.kind else {
            unreachable!()
        };
        let target_ty = self.resolve_expr(&mut index.target, ctx);
        let mut index_tys = Vec::with_capacity(index.indices.len());
        for i in &mut index.indices {
            index_tys.push(self.resolve_expr(i, ctx));
        }
        let Some(target_ty) = target_ty else {
            self.diags.error(DiagnosticCode::TypeMismatch, span, "'null' cannot be indexed");
            return Some(error);
        };
        if self.state.is_error(target_ty) {
            return Some(error);
        }
        let target_sym = self.state.symbols.ty(target_ty);
        if target_sym.genre == TypeGenre::Array {
            let elem = target_sym.elem.unwrap_or(error);
            let ExprKind::Index(index) = &mut expr.kind else {
                unreachable!()
            };
            index.is_array = true;
            for (i, ty) in index_tys.iter().enumerate() {
                if !self.is_int_ish(*ty) {
                    let span = index.indices[i].span;
                    self.diags.error(
                        DiagnosticCode::TypeMismatch,
                        span,
                        "an array index must be an integer",
                    );
                }
            }
            return Some(elem);
        }
        // Indexer: special-name accessor methods looked up by signature.
        let getter_name = self.indexer_accessor_name(target_ty, false);
        let getter = match self.lookup_method_on(target_ty, &getter_name, &index_tys) {
            MethodLookup::Found(m) => Some(m),
            _ => None,
        };
        let elem_ty = getter.and_then(|g| self.state.symbols.method(g).ret);
        let setter = if for_write {
            let setter_name = self.indexer_accessor_name(target_ty, true);
            let mut set_args = index_tys.clone();
            set_args.push(elem_ty.or(Some(error)));
            match self.lookup_method_on(target_ty, &setter_name, &set_args) {
                MethodLookup::Found(m) => Some(m),
                _ => None,
            }
        } else {
            None
        };
        if getter.is_none() && (!for_write || setter.is_none()) {
            self.diags.error(
                DiagnosticCode::NoAcceptableIndexer,
                span,
                format!(
                    "'{}' has no indexer accepting these arguments",
                    self.state.full_name(target_ty)
                ),
            );
            return Some(error);
        }
        let ExprKind::Index(index) = &mut expr.kind else {
            unreachable!()
        };
        index.getter = getter;
        index.setter = setter;
        Some(elem_ty.unwrap_or(error))
    }

    // ---- casts ----

    fn resolve_cast(&mut self, cast: &mut CastExpr, span: SourceSpan, ctx: &mut BodyCtx) -> TypeId {
        let to = self.resolve_type_ref(&mut cast.ty, ctx.scope);
        let from = self.resolve_expr(&mut cast.expr, ctx);
        if self.state.is_error(to) {
            return to;
        }
        let wk = self.state.well_known;
        let kind = match from {
            None => {
                if self.state.is_value_type(to) {
                    self.diags.error(
                        DiagnosticCode::TypeMismatch,
                        span,
                        "'null' cannot be cast to a value type",
                    );
                }
                CastKind::Identity
            }
            Some(from) if self.state.is_error(from) => CastKind::Identity,
            Some(from) if from == to => CastKind::Identity,
            Some(from)
                if (from == wk.char && to == wk.int) || (from == wk.int && to == wk.char) =>
            {
                CastKind::Numeric
            }
            Some(from)
                if self.state.symbols.ty(from).genre == TypeGenre::Enum && to == wk.int =>
            {
                CastKind::Numeric
            }
            Some(from)
                if from == wk.int && self.state.symbols.ty(to).genre == TypeGenre::Enum =>
            {
                CastKind::Numeric
            }
            Some(from) if self.state.assignable(from, to) => {
                if self.state.is_value_type(from) && !self.state.is_value_type(to) {
                    CastKind::Box
                } else {
                    CastKind::Identity
                }
            }
            Some(from) if self.state.assignable(to, from) => {
                if self.state.is_value_type(to) && !self.state.is_value_type(from) {
                    CastKind::Unbox
                } else {
                    CastKind::Down
                }
            }
            Some(from) => {
                self.type_mismatch(span, Some(from), to);
                CastKind::Identity
            }
        };
        cast.kind = Some(kind);
        to
    }

    // ---- binary operators ----

    pub(crate) fn binary_type(
        &mut self,
        op: BinOp,
        l: Option<TypeId>,
        r: Option<TypeId>,
        span: SourceSpan,
        operator_method: &mut Option<SymbolId>,
    ) -> TypeId {
        let wk = self.state.well_known;
        if matches!(l, Some(t) if self.state.is_error(t))
            || matches!(r, Some(t) if self.state.is_error(t))
        {
            return wk.error;
        }
        let both_int = self.is_int_ish(l) && l.is_some() && self.is_int_ish(r) && r.is_some();
        let both_bool = l == Some(wk.bool_ty) && r == Some(wk.bool_ty);
        match op {
            BinOp::AndAnd | BinOp::OrOr => {
                if !both_bool {
                    self.diags.error(
                        DiagnosticCode::NoAcceptableOperator,
                        span,
                        "'&&'/'||' require bool operands",
                    );
                    return wk.error;
                }
                wk.bool_ty
            }
            BinOp::Shl | BinOp::Shr => {
                if !both_int {
                    self.diags.error(
                        DiagnosticCode::NoAcceptableOperator,
                        span,
                        "shifts require integer operands",
                    );
                    return wk.error;
                }
                wk.int
            }
            BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::Rem
            | BinOp::BitAnd
            | BinOp::BitOr
            | BinOp::BitXor => {
                if both_int {
                    return wk.int;
                }
                if both_bool && matches!(op, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor) {
                    return wk.bool_ty;
                }
                if op == BinOp::Add && (l == Some(wk.string) || r == Some(wk.string)) {
                    // String concatenation lowers to String.Concat.
                    let both_strings = l == Some(wk.string) && r == Some(wk.string);
                    let concat_args = if both_strings {
                        [Some(wk.string), Some(wk.string)]
                    } else {
                        [Some(wk.object), Some(wk.object)]
                    };
                    if let MethodLookup::Found(concat) =
                        self.lookup_method_on(wk.string, "Concat", &concat_args)
                    {
                        *operator_method = Some(concat);
                        return wk.string;
                    }
                }
                self.binary_overload(op, l, r, span, operator_method)
            }
            BinOp::Eq | BinOp::Ne => {
                if both_int || both_bool {
                    return wk.bool_ty;
                }
                if let (Some(lt), Some(rt)) = (l, r) {
                    if lt == rt && self.state.symbols.ty(lt).genre == TypeGenre::Enum {
                        return wk.bool_ty;
                    }
                    if let Some(found) = self.equality_overload(op, lt, rt, span) {
                        *operator_method = Some(found);
                        return wk.bool_ty;
                    }
                    let both_refs = !self.state.is_value_type(lt) && !self.state.is_value_type(rt);
                    if both_refs
                        && (self.state.assignable(lt, rt) || self.state.assignable(rt, lt))
                    {
                        return wk.bool_ty;
                    }
                } else {
                    // Comparison against the null literal.
                    let other = l.or(r);
                    match other {
                        Some(t) if self.state.is_value_type(t) => {
                            self.diags.error(
                                DiagnosticCode::NoAcceptableOperator,
                                span,
                                "a value type cannot be compared to null",
                            );
                            return wk.error;
                        }
                        _ => return wk.bool_ty,
                    }
                }
                self.diags.error(
                    DiagnosticCode::NoAcceptableOperator,
                    span,
                    "these operands cannot be compared",
                );
                wk.error
            }
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                if both_int {
                    return wk.bool_ty;
                }
                if let (Some(lt), Some(rt)) = (l, r) {
                    if lt == rt && self.state.symbols.ty(lt).genre == TypeGenre::Enum {
                        return wk.bool_ty;
                    }
                }
                let result = self.binary_overload(op, l, r, span, operator_method);
                if self.state.is_error(result) {
                    result
                } else {
                    wk.bool_ty
                }
            }
        }
    }

    fn equality_overload(
        &mut self,
        op: BinOp,
        lhs: TypeId,
        rhs: TypeId,
        span: SourceSpan,
    ) -> Option<SymbolId> {
        let name = op.special_name()?;
        self.lookup_operator(name, lhs, rhs, span)
    }

    fn binary_overload(
        &mut self,
        op: BinOp,
        l: Option<TypeId>,
        r: Option<TypeId>,
        span: SourceSpan,
        operator_method: &mut Option<SymbolId>,
    ) -> TypeId {
        let wk = self.state.well_known;
        if let (Some(lt), Some(rt), Some(name)) = (l, r, op.special_name()) {
            if let Some(found) = self.lookup_operator(name, lt, rt, span) {
                *operator_method = Some(found);
                return self.state.symbols.method(found).ret.unwrap_or(wk.error);
            }
        }
        self.diags.error(
            DiagnosticCode::NoAcceptableOperator,
            span,
            "no operator accepts these operands",
        );
        wk.error
    }

    // ---- assignment ----

    fn resolve_assign(&mut self, expr: &mut Expr, ctx: &mut BodyCtx) -> Option<TypeId> {
        let span = expr.span;
        let error = self.state.well_known.error;
        let ExprKind::Assign(assign) = &mut expr.kind else {
            unreachable!()
        };
        let op = assign.op;
        let rhs_ty = self.resolve_expr(&mut assign.rhs, ctx);
        let ExprKind::Assign(AssignExpr { lhs, .. }) = &mut expr.kind else {
            unreachable!()
        };
        let lhs_ty = self.resolve_lvalue(lhs, ctx);

        // Events only admit `+=` / `-=`; everything else is rejected.
        let lhs_is_event = lvalue_is_event(lhs);
        if lhs_is_event {
            if !matches!(op, Some(BinOp::Add) | Some(BinOp::Sub)) {
                self.diags.error(
                    DiagnosticCode::NotValidLhs,
                    span,
                    "an event only supports '+=' and '-='",
                );
                return Some(error);
            }
            if let Some(lhs_ty) = lhs_ty {
                if !self.state.assignable_opt(rhs_ty, lhs_ty) {
                    self.type_mismatch(span, rhs_ty, lhs_ty);
                }
            }
            return lhs_ty;
        }
        let Some(lhs_ty) = lhs_ty else {
            return Some(error);
        };
        match op {
            Some(op) => {
                let mut method = None;
                let result = self.binary_type(op, Some(lhs_ty), rhs_ty, span, &mut method);
                let ExprKind::Assign(assign) = &mut expr.kind else {
                    unreachable!()
                };
                assign.op = Some(op);
                assign.operator_method = method;
                if !self.state.is_error(result) && !self.state.assignable(result, lhs_ty) {
                    self.type_mismatch(span, Some(result), lhs_ty);
                }
            }
            None => {
                if !self.state.assignable_opt(rhs_ty, lhs_ty) {
                    self.type_mismatch(span, rhs_ty, lhs_ty);
                }
            }
        }
        Some(lhs_ty)
    }

    /// Resolve an assignment target. Tolerates events, resolves the
    /// set-side of properties and indexers, and rejects non-locations.
    pub(crate) fn resolve_lvalue(&mut self, expr: &mut Expr, ctx: &mut BodyCtx) -> Option<TypeId> {
        let span = expr.span;
        let error = self.state.well_known.error;
        match &mut expr.kind {
            ExprKind::Name(_) => {
                let ty = match self.resolve_target_lvalue_name(expr, ctx) {
                    Some(ty) => ty,
                    None => return Some(error),
                };
                Some(ty)
            }
            ExprKind::Member(_) => {
                let ExprKind::Member(member) = &mut expr.kind else {
                    unreachable!()
                };
                let qual = self.resolve_target(&mut member.target, ctx);
                let name = member.name.clone();
                match qual {
                    Qual::Value(Some(target_ty)) => {
                        self.ensure_chain(target_ty);
                        self.instance_member(expr, target_ty, &name, span, true)
                    }
                    Qual::BaseRef(super_ty) => {
                        self.ensure_chain(super_ty);
                        self.instance_member(expr, super_ty, &name, span, true)
                    }
                    Qual::Type(ty) => match self.static_member(expr, ty, &name, span) {
                        Qual::Value(v) => {
                            self.require_storable(expr);
                            v
                        }
                        _ => {
                            self.diags.error(
                                DiagnosticCode::NotValidLhs,
                                span,
                                "this is not an assignable location",
                            );
                            Some(error)
                        }
                    },
                    _ => {
                        self.diags.error(
                            DiagnosticCode::NotValidLhs,
                            span,
                            "this is not an assignable location",
                        );
                        Some(error)
                    }
                }
            }
            ExprKind::Index(_) => self.resolve_index(expr, ctx, true),
            _ => {
                self.resolve_expr(expr, ctx);
                self.diags.error(
                    DiagnosticCode::NotValidLhs,
                    span,
                    "this is not an assignable location",
                );
                Some(error)
            }
        }
    }

    fn resolve_target_lvalue_name(
        &mut self,
        expr: &mut Expr,
        ctx: &mut BodyCtx,
    ) -> Option<TypeId> {
        let span = expr.span;
        let ExprKind::Name(name_expr) = &mut expr.kind else {
            unreachable!()
        };
        let name = name_expr.name.clone();
        let Some(sym) = self.state.smart_lookup(ctx.scope, &name) else {
            self.diags.error(
                DiagnosticCode::UndefinedSymbol,
                span,
                format!("symbol '{name}' is not defined"),
            );
            return None;
        };
        let ty = match &self.state.symbols.get(sym).kind {
            SymKind::Local(l) => {
                name_expr.binding = Some(Binding::Local(sym));
                l.ty
            }
            SymKind::Param(p) => {
                name_expr.binding = Some(Binding::Param(sym));
                self.state.strip_ref(p.ty)
            }
            SymKind::Field(f) => {
                if !f.is_static && ctx.is_static {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        span,
                        format!("instance field '{name}' cannot be used in a static context"),
                    );
                }
                name_expr.binding = Some(Binding::Field(sym));
                f.ty
            }
            SymKind::Property(p) => {
                if p.setter.is_none() {
                    self.diags.error(
                        DiagnosticCode::NotValidLhs,
                        span,
                        format!("property '{name}' has no setter"),
                    );
                }
                name_expr.binding = Some(Binding::Property(sym));
                p.ty
            }
            SymKind::Event(e) => {
                name_expr.binding = Some(Binding::Event(sym));
                e.ty
            }
            _ => {
                self.diags.error(
                    DiagnosticCode::NotValidLhs,
                    span,
                    format!("'{name}' is not an assignable location"),
                );
                return None;
            }
        };
        expr.ty = Some(ty);
        Some(ty)
    }

    fn require_storable(&mut self, expr: &Expr) {
        let binding = match &expr.kind {
            ExprKind::Name(n) => n.binding,
            ExprKind::Member(m) => m.binding,
            _ => None,
        };
        if let Some(Binding::LiteralField(_)) = binding {
            self.diags.error(
                DiagnosticCode::NotValidLhs,
                expr.span,
                "a constant cannot be assigned to",
            );
        }
    }
}

/// Is this resolved expression a storable location usable for ref/out?
fn is_location(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Name(n) => matches!(
            n.binding,
            Some(Binding::Local(_) | Binding::Param(_) | Binding::Field(_))
        ),
        ExprKind::Member(m) => matches!(m.binding, Some(Binding::Field(_))),
        ExprKind::Index(_) => true,
        _ => false,
    }
}

fn lvalue_is_event(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Name(n) => matches!(n.binding, Some(Binding::Event(_))),
        ExprKind::Member(m) => matches!(m.binding, Some(Binding::Event(_))),
        _ => false,
    }
}
