//! Pass B: resolve every method body.
//!
//! Creates block-scoped child scopes for locals, types every statement and
//! expression, rewrites the high-level constructs, and backpatches
//! forward-referencing gotos in a second sub-pass over the typed body.

use rustc_hash::FxHashMap;
use tracing::trace;

use blue_common::{DiagnosticCode, SymbolId, TypeId};
use blue_parser::ast::{
    Block, CtorChainKind, Expr, ExprKind, Member, MethodDecl, Namespace, Program, PropertyDecl,
    Stmt, StmtKind, TypeDecl, TypeItem,
};

use crate::Resolver;
use crate::overload::MethodLookup;
use crate::scope::{NoInherit, ScopeId};
use crate::symbols::{LocalSymbol, ParamSymbol, SymKind};

/// Shared context for one body being resolved.
pub(crate) struct BodyCtx {
    pub owner: TypeId,
    /// `None` while resolving field initializers.
    pub method: Option<SymbolId>,
    pub is_static: bool,
    /// `None` for constructors; `Some(void)` for void methods.
    pub ret: Option<TypeId>,
    pub scope: ScopeId,
    pub loop_depth: u32,
    pub catch_depth: u32,
    pub labels: FxHashMap<String, SymbolId>,
    /// Statement-expression position flag for `++`/`--`.
    pub stmt_expr: bool,
}

impl Resolver<'_> {
    pub(crate) fn resolve_bodies(&mut self, program: &mut Program) {
        for file in &mut program.files {
            self.bodies_section(file);
        }
    }

    fn bodies_section(&mut self, ns: &mut Namespace) {
        for nested in &mut ns.namespaces {
            self.bodies_section(nested);
        }
        for item in &mut ns.types {
            if let TypeItem::Type(decl) = item {
                self.bodies_type(decl);
            }
        }
    }

    fn bodies_type(&mut self, decl: &mut TypeDecl) {
        let Some(ty) = decl.sym else { return };
        self.ensure_chain(ty);
        trace!(name = %self.state.symbols.ty(ty).full_name, "resolve bodies");
        let member_scope = self.state.symbols.ty(ty).member_scope.unwrap();
        for member in &mut decl.members {
            match member {
                Member::Field(field) => {
                    let Some(_) = field.sym else { continue };
                    if let Some(init) = &mut field.init {
                        let mut ctx = BodyCtx {
                            owner: ty,
                            method: None,
                            is_static: true,
                            ret: None,
                            scope: member_scope,
                            loop_depth: 0,
                            catch_depth: 0,
                            labels: FxHashMap::default(),
                            stmt_expr: false,
                        };
                        let init_ty = self.resolve_expr(init, &mut ctx);
                        let field_ty = field.ty.ty().unwrap_or(self.state.well_known.error);
                        if !self.state.assignable_opt(init_ty, field_ty) {
                            self.type_mismatch(init.span, init_ty, field_ty);
                        }
                    }
                }
                Member::Method(method) => self.resolve_method_body(ty, method),
                Member::Property(prop) => self.resolve_accessor_bodies(ty, prop),
                Member::Event(_) => {}
                Member::Nested(TypeItem::Type(nested)) => self.bodies_type(nested),
                Member::Nested(_) => {}
            }
        }
    }

    fn resolve_method_body(&mut self, owner: TypeId, decl: &mut MethodDecl) {
        let Some(method) = decl.sym else { return };
        let Some(body) = &mut decl.body else { return };
        let member_scope = self.state.symbols.ty(owner).member_scope.unwrap();
        let method_scope = self.param_scope(member_scope, method);
        let (is_static, ret, is_ctor) = {
            let m = self.state.symbols.method(method);
            (m.is_static, m.ret, m.is_ctor)
        };
        // Every instance constructor that does not start with an explicit
        // chain gets `base()` injected.
        if is_ctor && !is_static && !matches!(body.stmts.first().map(|s| &s.kind), Some(StmtKind::CtorChain(_)))
        {
            body.stmts.insert(
                0,
                Stmt::new(
                    decl.span,
                    StmtKind::CtorChain(blue_parser::ast::CtorChain {
                        kind: CtorChainKind::Base,
                        args: Vec::new(),
                        call: None,
                    }),
                ),
            );
        }
        let mut ctx = BodyCtx {
            owner,
            method: Some(method),
            is_static,
            ret,
            scope: method_scope,
            loop_depth: 0,
            catch_depth: 0,
            labels: FxHashMap::default(),
            stmt_expr: false,
        };
        self.resolve_block(body, &mut ctx);
        self.bind_gotos_block(body, &ctx.labels);
    }

    fn resolve_accessor_bodies(&mut self, owner: TypeId, prop: &mut PropertyDecl) {
        let Some(prop_sym) = prop.sym else { return };
        let (getter, setter) = match &self.state.symbols.get(prop_sym).kind {
            SymKind::Property(p) => (p.getter, p.setter),
            _ => return,
        };
        let member_scope = self.state.symbols.ty(owner).member_scope.unwrap();
        if let (Some(accessor), Some(method)) = (&mut prop.getter, getter) {
            if let Some(body) = &mut accessor.body {
                let scope = self.param_scope(member_scope, method);
                let (is_static, ret) = {
                    let m = self.state.symbols.method(method);
                    (m.is_static, m.ret)
                };
                let mut ctx = BodyCtx {
                    owner,
                    method: Some(method),
                    is_static,
                    ret,
                    scope,
                    loop_depth: 0,
                    catch_depth: 0,
                    labels: FxHashMap::default(),
                    stmt_expr: false,
                };
                self.resolve_block(body, &mut ctx);
                self.bind_gotos_block(body, &ctx.labels);
            }
        }
        if let (Some(accessor), Some(method)) = (&mut prop.setter, setter) {
            if let Some(body) = &mut accessor.body {
                let scope = self.param_scope(member_scope, method);
                let (is_static, ret) = {
                    let m = self.state.symbols.method(method);
                    (m.is_static, m.ret)
                };
                let mut ctx = BodyCtx {
                    owner,
                    method: Some(method),
                    is_static,
                    ret,
                    scope,
                    loop_depth: 0,
                    catch_depth: 0,
                    labels: FxHashMap::default(),
                    stmt_expr: false,
                };
                self.resolve_block(body, &mut ctx);
                self.bind_gotos_block(body, &ctx.labels);
            }
        }
    }

    /// Method-level scope holding the parameter symbols.
    fn param_scope(&mut self, member_scope: ScopeId, method: SymbolId) -> ScopeId {
        let scope = self
            .state
            .scopes
            .new_scope("<params>", Some(member_scope), Box::new(NoInherit));
        let (params, flows, names, span) = {
            let m = self.state.symbols.method(method);
            (
                m.params.clone(),
                m.flows.clone(),
                m.param_names.clone(),
                self.state.symbols.get(method).span,
            )
        };
        for (i, name) in names.iter().enumerate() {
            let sym = self.state.symbols.alloc(
                name.clone(),
                span,
                SymKind::Param(ParamSymbol {
                    ty: params[i],
                    flow: flows[i],
                    index: i as u16,
                }),
            );
            if self.state.scopes.insert(scope, name.clone(), sym).is_err() {
                self.diags.error(
                    DiagnosticCode::SymbolAlreadyDefined,
                    span,
                    format!("parameter '{name}' is already defined"),
                );
            }
        }
        scope
    }

    // ---- statements ----

    pub(crate) fn resolve_block(&mut self, block: &mut Block, ctx: &mut BodyCtx) {
        let parent = ctx.scope;
        ctx.scope = self
            .state
            .scopes
            .new_scope("<block>", Some(parent), Box::new(NoInherit));
        for stmt in &mut block.stmts {
            self.resolve_stmt(stmt, ctx);
        }
        ctx.scope = parent;
    }

    pub(crate) fn resolve_stmt(&mut self, stmt: &mut Stmt, ctx: &mut BodyCtx) {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::Block(block) => self.resolve_block(block, ctx),
            StmtKind::LocalDecl(decl) => {
                let ty = self.resolve_type_ref(&mut decl.ty, ctx.scope);
                if ty == self.state.well_known.void {
                    self.diags.error(
                        DiagnosticCode::BadSymbolType,
                        decl.ty.span,
                        "a variable cannot have type void",
                    );
                }
                for var in &mut decl.vars {
                    let sym = self.state.symbols.alloc(
                        var.name.clone(),
                        var.span,
                        SymKind::Local(LocalSymbol { ty, slot: None }),
                    );
                    if self
                        .state
                        .scopes
                        .insert(ctx.scope, var.name.clone(), sym)
                        .is_err()
                    {
                        self.diags.error(
                            DiagnosticCode::SymbolAlreadyDefined,
                            var.span,
                            format!("'{}' is already defined in this scope", var.name),
                        );
                        continue;
                    }
                    var.sym = Some(sym);
                    if let Some(init) = &mut var.init {
                        let init_ty = self.resolve_expr(init, ctx);
                        if !self.state.assignable_opt(init_ty, ty) {
                            self.type_mismatch(init.span, init_ty, ty);
                        }
                    }
                }
            }
            StmtKind::If {
                cond,
                then_s,
                else_s,
            } => {
                self.require_bool(cond, ctx);
                self.resolve_stmt(then_s, ctx);
                if let Some(else_s) = else_s {
                    self.resolve_stmt(else_s, ctx);
                }
            }
            StmtKind::While { cond, body } => {
                self.require_bool(cond, ctx);
                ctx.loop_depth += 1;
                self.resolve_stmt(body, ctx);
                ctx.loop_depth -= 1;
            }
            StmtKind::Do { body, cond } => {
                ctx.loop_depth += 1;
                self.resolve_stmt(body, ctx);
                ctx.loop_depth -= 1;
                self.require_bool(cond, ctx);
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                let parent = ctx.scope;
                ctx.scope =
                    self.state
                        .scopes
                        .new_scope("<for>", Some(parent), Box::new(NoInherit));
                for s in init {
                    self.resolve_stmt(s, ctx);
                }
                if let Some(cond) = cond {
                    self.require_bool(cond, ctx);
                }
                for e in step.iter_mut() {
                    self.resolve_stmt_expr(e, ctx);
                }
                ctx.loop_depth += 1;
                self.resolve_stmt(body, ctx);
                ctx.loop_depth -= 1;
                ctx.scope = parent;
            }
            StmtKind::Foreach(_) => self.desugar_foreach(stmt, ctx),
            StmtKind::Switch(_) => self.desugar_switch(stmt, ctx),
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                self.resolve_block(body, ctx);
                let exception = self.state.well_known.exception;
                let mut seen: Vec<TypeId> = Vec::new();
                for catch in catches.iter_mut() {
                    let catch_ty = match &mut catch.ty {
                        Some(tref) => {
                            let ty = self.resolve_type_ref(tref, ctx.scope);
                            if !self.state.is_error(ty) && !self.state.assignable(ty, exception) {
                                self.diags.error(
                                    DiagnosticCode::TypeMismatch,
                                    tref.span,
                                    "a catch type must derive from System.Exception",
                                );
                            }
                            ty
                        }
                        None => exception,
                    };
                    for &earlier in &seen {
                        if self.state.assignable(catch_ty, earlier) {
                            self.diags.error(
                                DiagnosticCode::ShadowCatchHandlers,
                                catch.span,
                                "this catch handler is shadowed by an earlier one",
                            );
                            break;
                        }
                    }
                    seen.push(catch_ty);
                    let parent = ctx.scope;
                    ctx.scope =
                        self.state
                            .scopes
                            .new_scope("<catch>", Some(parent), Box::new(NoInherit));
                    if let Some(name) = &catch.name {
                        let sym = self.state.symbols.alloc(
                            name.clone(),
                            catch.span,
                            SymKind::Local(LocalSymbol {
                                ty: catch_ty,
                                slot: None,
                            }),
                        );
                        let _ = self.state.scopes.insert(ctx.scope, name.clone(), sym);
                        catch.sym = Some(sym);
                    }
                    ctx.catch_depth += 1;
                    for s in &mut catch.body.stmts {
                        self.resolve_stmt(s, ctx);
                    }
                    ctx.catch_depth -= 1;
                    ctx.scope = parent;
                }
                if let Some(finally) = finally {
                    self.resolve_block(finally, ctx);
                }
            }
            StmtKind::Throw(value) => match value {
                Some(expr) => {
                    let ty = self.resolve_expr(expr, ctx);
                    let exception = self.state.well_known.exception;
                    let ok = match ty {
                        Some(t) => {
                            self.state.assignable(t, exception) || t == exception
                        }
                        None => false,
                    };
                    if !ok {
                        self.diags.error(
                            DiagnosticCode::TypeMismatch,
                            expr.span,
                            "a thrown value must derive from System.Exception",
                        );
                    }
                }
                None => {
                    if ctx.catch_depth == 0 {
                        self.diags.error(
                            DiagnosticCode::SyntaxError,
                            span,
                            "a bare 'throw' is only valid inside a catch handler",
                        );
                    }
                }
            },
            StmtKind::Return(value) => {
                let void = self.state.well_known.void;
                match (&mut *value, ctx.ret) {
                    (Some(expr), Some(ret)) if ret != void => {
                        let ty = self.resolve_expr(expr, ctx);
                        if !self.state.assignable_opt(ty, ret) {
                            self.type_mismatch(expr.span, ty, ret);
                        }
                    }
                    (Some(expr), _) => {
                        self.resolve_expr(expr, ctx);
                        self.diags.error(
                            DiagnosticCode::NoReturnTypeExpected,
                            span,
                            "this method cannot return a value",
                        );
                    }
                    (None, Some(ret)) if ret != void => {
                        self.diags.error(
                            DiagnosticCode::TypeMismatch,
                            span,
                            "a return value is required",
                        );
                    }
                    (None, _) => {}
                }
            }
            StmtKind::Break | StmtKind::Continue => {
                if ctx.loop_depth == 0 {
                    self.diags.error(
                        DiagnosticCode::MustBeInsideLoop,
                        span,
                        "break/continue is only valid inside a loop",
                    );
                }
            }
            StmtKind::Goto { label, sym } => {
                // Backward gotos bind here; forward ones in the backpatch
                // sub-pass once every label is known.
                *sym = ctx.labels.get(label.as_str()).copied();
            }
            StmtKind::Label { name, stmt, sym } => {
                if ctx.labels.contains_key(name.as_str()) {
                    self.diags.error(
                        DiagnosticCode::LabelAlreadyDefined,
                        span,
                        format!("label '{name}' is already defined"),
                    );
                } else {
                    let label_sym = self.state.symbols.alloc(
                        name.clone(),
                        span,
                        SymKind::Label(crate::symbols::LabelSymbol::default()),
                    );
                    ctx.labels.insert(name.clone(), label_sym);
                    *sym = Some(label_sym);
                }
                self.resolve_stmt(stmt, ctx);
            }
            StmtKind::Empty => {}
            StmtKind::Expr(expr) => self.resolve_stmt_expr(expr, ctx),
            StmtKind::CtorChain(chain) => {
                let is_ctor = ctx
                    .method
                    .map(|m| self.state.symbols.method(m).is_ctor)
                    .unwrap_or(false);
                if !is_ctor {
                    self.diags.error(
                        DiagnosticCode::SyntaxError,
                        span,
                        "a constructor chain is only valid in a constructor",
                    );
                    return;
                }
                let target_ty = match chain.kind {
                    CtorChainKind::This => Some(ctx.owner),
                    CtorChainKind::Base => self.state.symbols.ty(ctx.owner).super_ty,
                };
                let Some(target_ty) = target_ty else { return };
                let mut arg_tys = Vec::new();
                for arg in &mut chain.args {
                    arg_tys.push(self.resolve_expr(arg, ctx));
                }
                match self.lookup_ctor_on(target_ty, &arg_tys) {
                    MethodLookup::Found(ctor) => {
                        let args = std::mem::take(&mut chain.args);
                        let receiver = match chain.kind {
                            CtorChainKind::This => ExprKind::This,
                            CtorChainKind::Base => ExprKind::Base,
                        };
                        let mut call = Expr::typed(
                            span,
                            self.state.well_known.void,
                            ExprKind::Call(blue_parser::ast::CallExpr {
                                target: Box::new(Expr::typed(span, target_ty, receiver)),
                                args,
                                method: Some(ctor),
                                polymorphic: false,
                            }),
                        );
                        call.span = span;
                        chain.call = Some(call);
                    }
                    lookup => self.report_method_lookup(&lookup, target_ty, ".ctor", span),
                }
            }
        }
    }

    /// Expressions in statement position: assignment, increment/decrement,
    /// calls, and object creation.
    pub(crate) fn resolve_stmt_expr(&mut self, expr: &mut Expr, ctx: &mut BodyCtx) {
        if !matches!(
            expr.kind,
            ExprKind::Assign(_) | ExprKind::IncDec(_) | ExprKind::Call(_) | ExprKind::New(_)
        ) {
            self.diags.error(
                DiagnosticCode::SyntaxError,
                expr.span,
                "only assignment, call, increment, decrement, and new expressions can be used as a statement",
            );
            return;
        }
        let was = ctx.stmt_expr;
        ctx.stmt_expr = true;
        self.resolve_expr(expr, ctx);
        ctx.stmt_expr = was;
    }

    fn require_bool(&mut self, cond: &mut Expr, ctx: &mut BodyCtx) {
        let ty = self.resolve_expr(cond, ctx);
        let bool_ty = self.state.well_known.bool_ty;
        if !matches!(ty, Some(t) if t == bool_ty || self.state.is_error(t)) {
            self.diags.error(
                DiagnosticCode::TypeMismatch,
                cond.span,
                "the condition must have type bool",
            );
        }
    }

    pub(crate) fn type_mismatch(
        &mut self,
        span: blue_common::SourceSpan,
        from: Option<TypeId>,
        to: TypeId,
    ) {
        let from_name = match from {
            Some(t) => self.state.full_name(t).to_string(),
            None => "null".to_string(),
        };
        let to_name = self.state.full_name(to).to_string();
        self.diags.error(
            DiagnosticCode::TypeMismatch,
            span,
            format!("cannot convert '{from_name}' to '{to_name}'"),
        );
    }

    // ---- goto backpatch ----

    fn bind_gotos_block(&mut self, block: &mut Block, labels: &FxHashMap<String, SymbolId>) {
        for stmt in &mut block.stmts {
            self.bind_gotos_stmt(stmt, labels);
        }
    }

    fn bind_gotos_stmt(&mut self, stmt: &mut Stmt, labels: &FxHashMap<String, SymbolId>) {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::Goto { label, sym } => {
                if sym.is_none() {
                    match labels.get(label.as_str()) {
                        Some(&target) => *sym = Some(target),
                        None => self.diags.error(
                            DiagnosticCode::UndefinedSymbol,
                            span,
                            format!("label '{label}' is not defined"),
                        ),
                    }
                }
            }
            StmtKind::Block(block) => self.bind_gotos_block(block, labels),
            StmtKind::If {
                then_s, else_s, ..
            } => {
                self.bind_gotos_stmt(then_s, labels);
                if let Some(else_s) = else_s {
                    self.bind_gotos_stmt(else_s, labels);
                }
            }
            StmtKind::While { body, .. } | StmtKind::Do { body, .. } => {
                self.bind_gotos_stmt(body, labels);
            }
            StmtKind::For { init, body, .. } => {
                for s in init {
                    self.bind_gotos_stmt(s, labels);
                }
                self.bind_gotos_stmt(body, labels);
            }
            StmtKind::Foreach(foreach) => {
                if let Some(lowered) = &mut foreach.lowered {
                    self.bind_gotos_stmt(lowered, labels);
                }
            }
            StmtKind::Switch(switch) => {
                if let Some(lowered) = &mut switch.lowered {
                    self.bind_gotos_stmt(lowered, labels);
                }
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => {
                self.bind_gotos_block(body, labels);
                for catch in catches {
                    self.bind_gotos_block(&mut catch.body, labels);
                }
                if let Some(finally) = finally {
                    self.bind_gotos_block(finally, labels);
                }
            }
            StmtKind::Label { stmt, .. } => self.bind_gotos_stmt(stmt, labels),
            _ => {}
        }
    }
}
