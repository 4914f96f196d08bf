//! Pass A: stub every declared type.
//!
//! Creates a `TypeSymbol` stub (name, modifiers, containing link, empty
//! member scope with a bound lookup controller) for each declaration and
//! inserts it into the enclosing scope. Enums additionally get their
//! literal fields right away. Namespace sections get view scopes that
//! alias the canonical namespace tables, so sections of one namespace in
//! different files share symbols while keeping their own using-clauses.

use tracing::trace;

use blue_common::{Diagnostic, DiagnosticCode, TypeId};
use blue_parser::ast::{
    EnumDecl, Expr, ExprKind, Member, Modifiers, Namespace, Program, TypeDecl, TypeItem, TypeKind,
    UnOp,
};

use crate::Resolver;
use crate::scope::{ClassLookup, InterfaceLookup, LookupController, ScopeId, UsingLookup};
use crate::symbols::{LiteralFieldSymbol, SymKind, TypeGenre, TypeSymbol};

impl Resolver<'_> {
    pub(crate) fn declare_program(&mut self, program: &mut Program) {
        for file in &mut program.files {
            let global_table = self.state.scopes.table_of(self.state.global);
            let section_scope = self.state.scopes.new_shared_scope(
                "<file>",
                None,
                global_table,
                Box::new(UsingLookup { usings: Vec::new() }),
            );
            self.state.sections.insert(file.section, section_scope);
            self.declare_section(file, section_scope, &[]);
        }
    }

    fn declare_section(&mut self, ns: &mut Namespace, scope: ScopeId, path: &[String]) {
        for nested in &mut ns.namespaces {
            let mut full_path = path.to_vec();
            let mut parent_view = scope;
            for part in &nested.name {
                full_path.push(part.clone());
                let canonical = self.ensure_namespace(&full_path);
                let table = self.state.scopes.table_of(canonical);
                parent_view = self.state.scopes.new_shared_scope(
                    full_path.join("."),
                    Some(parent_view),
                    table,
                    Box::new(UsingLookup { usings: Vec::new() }),
                );
            }
            self.state.sections.insert(nested.section, parent_view);
            self.declare_section(nested, parent_view, &full_path);
        }
        for item in &mut ns.types {
            self.declare_type_item(item, scope, path, None);
        }
    }

    fn declare_type_item(
        &mut self,
        item: &mut TypeItem,
        scope: ScopeId,
        path: &[String],
        containing: Option<TypeId>,
    ) {
        match item {
            TypeItem::Type(decl) => self.declare_type(decl, scope, path, containing),
            TypeItem::Enum(decl) => self.declare_enum(decl, scope, path, containing),
            TypeItem::Delegate(decl) => {
                let ty = self.declare_stub(
                    &decl.name,
                    decl.span,
                    TypeGenre::Delegate,
                    decl.mods | Modifiers::SEALED,
                    scope,
                    path,
                    containing,
                );
                decl.sym = ty;
            }
        }
    }

    fn declare_type(
        &mut self,
        decl: &mut TypeDecl,
        scope: ScopeId,
        path: &[String],
        containing: Option<TypeId>,
    ) {
        let genre = match decl.kind {
            TypeKind::Class => TypeGenre::Class,
            TypeKind::Struct => TypeGenre::Struct,
            TypeKind::Interface => TypeGenre::Interface,
        };
        let Some(ty) = self.declare_stub(
            &decl.name,
            decl.span,
            genre,
            decl.mods,
            scope,
            path,
            containing,
        ) else {
            return;
        };
        decl.sym = Some(ty);
        let member_scope = self.state.symbols.ty(ty).member_scope.unwrap();
        for member in &mut decl.members {
            if let Member::Nested(nested) = member {
                self.declare_type_item(nested, member_scope, path, Some(ty));
            }
        }
    }

    fn declare_enum(
        &mut self,
        decl: &mut EnumDecl,
        scope: ScopeId,
        path: &[String],
        containing: Option<TypeId>,
    ) {
        let Some(ty) = self.declare_stub(
            &decl.name,
            decl.span,
            TypeGenre::Enum,
            decl.mods,
            scope,
            path,
            containing,
        ) else {
            return;
        };
        decl.sym = Some(ty);
        // Enum literal fields exist as soon as the stub does.
        let member_scope = self.state.symbols.ty(ty).member_scope.unwrap();
        let mut next = 0i32;
        for member in &mut decl.members {
            let value = match &member.value {
                Some(expr) => match const_int(expr) {
                    Some(v) => v,
                    None => {
                        self.diags.error(
                            DiagnosticCode::MustBeCompileTimeConstant,
                            expr.span,
                            "enum member value must be a compile-time constant",
                        );
                        next
                    }
                },
                None => next,
            };
            next = value.wrapping_add(1);
            let sym = self.state.symbols.alloc(
                member.name.clone(),
                member.span,
                SymKind::LiteralField(LiteralFieldSymbol {
                    owner: ty,
                    ty,
                    value,
                    runtime: None,
                }),
            );
            if self
                .state
                .scopes
                .insert(member_scope, member.name.clone(), sym)
                .is_err()
            {
                self.diags.error(
                    DiagnosticCode::SymbolAlreadyDefined,
                    member.span,
                    format!("enum member '{}' is already defined", member.name),
                );
            }
            member.sym = Some(sym);
        }
    }

    /// Allocate a stub, its member scope, and its scope-tree insertion.
    fn declare_stub(
        &mut self,
        name: &str,
        span: blue_common::SourceSpan,
        genre: TypeGenre,
        mods: Modifiers,
        scope: ScopeId,
        path: &[String],
        containing: Option<TypeId>,
    ) -> Option<TypeId> {
        let full_name = match containing {
            Some(outer) => format!("{}+{}", self.state.symbols.ty(outer).full_name, name),
            None if path.is_empty() => name.to_string(),
            None => format!("{}.{}", path.join("."), name),
        };
        let ty = TypeId(self.state.symbols.alloc(
            name,
            span,
            SymKind::Type(TypeSymbol {
                genre,
                full_name: full_name.clone(),
                super_ty: None,
                interfaces: Vec::new(),
                containing,
                member_scope: None,
                mods,
                is_imported: false,
                is_init: false,
                elem: None,
                rank: 0,
                import_asm: None,
                members_resolved: true,
                runtime: None,
            }),
        ));
        let controller: Box<dyn LookupController> = match genre {
            TypeGenre::Interface => Box::new(InterfaceLookup { ty }),
            _ => Box::new(ClassLookup { ty }),
        };
        let member_scope = self
            .state
            .scopes
            .new_scope(full_name.clone(), Some(scope), controller);
        self.state.symbols.ty_mut(ty).member_scope = Some(member_scope);
        if self.state.scopes.insert(scope, name, ty.symbol()).is_err() {
            self.diags.add(Diagnostic::new(
                DiagnosticCode::SymbolAlreadyDefined,
                span,
                format!("type '{name}' is already defined"),
            ));
            return None;
        }
        trace!(name = %full_name, ?genre, "declared stub");
        self.types_by_name.insert(full_name, ty);
        Some(ty)
    }
}

/// Syntactic constant folding for enum member values: integer and
/// character literals, optionally negated.
fn const_int(expr: &Expr) -> Option<i32> {
    match &expr.kind {
        ExprKind::Int(v) => Some(*v as i32),
        ExprKind::Char(c) => Some(*c as i32),
        ExprKind::Unary {
            op: UnOp::Neg,
            expr,
        } => const_int(expr).map(i32::wrapping_neg),
        _ => None,
    }
}
