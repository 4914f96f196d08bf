//! Overload resolution.
//!
//! The decorated name `name:T1;T2;` is the exact-match key; the per-name
//! method header is the cheap existence check that lets the full overload
//! walk be skipped. The search walks the super-class chain (classes and
//! structs) or the base-interface tree (interfaces), one scope at a time;
//! the first scope producing matches wins, and ambiguity inside one scope
//! is an error.

use blue_common::{DiagnosticCode, SourceSpan, SymbolId, TypeId};

use crate::Resolver;
use crate::state::MAX_LOOKUP_WALK;
use crate::symbols::{SymKind, TypeGenre};

/// Call-site argument types; `None` is the null literal.
pub(crate) type ArgTypes = [Option<TypeId>];

pub(crate) enum MethodLookup {
    Found(SymbolId),
    /// No method of this name exists anywhere in the chain.
    NotDefined,
    /// The name exists but no overload accepts these arguments.
    NoAcceptable,
    /// More than one equally good candidate.
    Ambiguous(Vec<SymbolId>),
}

impl Resolver<'_> {
    /// Overload resolution on `ty` for `name` with `args`.
    pub(crate) fn lookup_method_on(
        &mut self,
        ty: TypeId,
        name: &str,
        args: &ArgTypes,
    ) -> MethodLookup {
        self.ensure_chain(ty);
        let exact_key = args
            .iter()
            .copied()
            .collect::<Option<Vec<TypeId>>>()
            .map(|tys| self.state.decorated_name(name, &tys));
        let header_key = crate::state::ResolveState::header_key(name);
        let mut any_header = false;

        let mut chain: Vec<TypeId> = Vec::new();
        let mut steps = 0usize;
        if self.state.symbols.ty(ty).genre == TypeGenre::Interface {
            // Self, then the base-interface tree in declaration order.
            let mut queue = vec![ty];
            while let Some(t) = queue.pop() {
                if steps > MAX_LOOKUP_WALK {
                    break;
                }
                steps += 1;
                if !chain.contains(&t) {
                    chain.push(t);
                    queue.extend(self.state.symbols.ty(t).interfaces.iter().rev().copied());
                }
            }
            // Interface members also include System.Object's.
            chain.push(self.state.well_known.object);
        } else {
            let mut current = Some(self.state.strip_ref(ty));
            while let Some(t) = current {
                if steps > MAX_LOOKUP_WALK {
                    break;
                }
                steps += 1;
                chain.push(t);
                current = self.state.symbols.ty(t).super_ty;
            }
        }

        for t in chain {
            let Some(scope) = self.state.symbols.ty(t).member_scope else {
                continue;
            };
            if let Some(key) = &exact_key {
                if let Some(sym) = self.state.scopes.get(scope, key) {
                    if matches!(self.state.symbols.get(sym).kind, SymKind::Method(_)) {
                        return MethodLookup::Found(sym);
                    }
                }
            }
            let Some(header_sym) = self.state.scopes.get(scope, &header_key) else {
                continue;
            };
            let SymKind::MethodHeader(header) = &self.state.symbols.get(header_sym).kind else {
                continue;
            };
            any_header = true;
            let overloads = header.overloads.clone();
            let mut plain: Vec<SymbolId> = Vec::new();
            let mut variadic: Vec<SymbolId> = Vec::new();
            for m in overloads {
                if self.matches_plain(m, args) {
                    plain.push(m);
                } else if self.matches_variadic(m, args) {
                    variadic.push(m);
                }
            }
            // Non-variadic matches are preferred over params-style ones.
            let matches = if plain.is_empty() { variadic } else { plain };
            match matches.len() {
                0 => {}
                1 => return MethodLookup::Found(matches[0]),
                _ => return MethodLookup::Ambiguous(matches),
            }
        }
        if any_header {
            MethodLookup::NoAcceptable
        } else {
            MethodLookup::NotDefined
        }
    }

    fn matches_plain(&self, method: SymbolId, args: &ArgTypes) -> bool {
        let m = self.state.symbols.method(method);
        m.params.len() == args.len()
            && args
                .iter()
                .zip(m.params.iter())
                .all(|(&arg, &param)| self.state.assignable_opt(arg, param))
    }

    /// A trailing `T[]` parameter accepts zero or more extra arguments
    /// each assignable to `T`.
    fn matches_variadic(&self, method: SymbolId, args: &ArgTypes) -> bool {
        let m = self.state.symbols.method(method);
        let Some(&last) = m.params.last() else {
            return false;
        };
        let last_sym = self.state.symbols.ty(last);
        if last_sym.genre != TypeGenre::Array {
            return false;
        }
        let elem = last_sym.elem.unwrap_or(last);
        let fixed = m.params.len() - 1;
        if args.len() < fixed {
            return false;
        }
        args[..fixed]
            .iter()
            .zip(m.params[..fixed].iter())
            .all(|(&arg, &param)| self.state.assignable_opt(arg, param))
            && args[fixed..]
                .iter()
                .all(|&arg| self.state.assignable_opt(arg, elem))
    }

    /// Constructor lookup: constructors are never inherited, so only the
    /// type's own scope is searched.
    pub(crate) fn lookup_ctor_on(&mut self, ty: TypeId, args: &ArgTypes) -> MethodLookup {
        self.ensure_members(ty);
        let Some(scope) = self.state.symbols.ty(ty).member_scope else {
            return MethodLookup::NotDefined;
        };
        let header_key = crate::state::ResolveState::header_key(".ctor");
        let Some(header_sym) = self.state.scopes.get(scope, &header_key) else {
            return MethodLookup::NotDefined;
        };
        let SymKind::MethodHeader(header) = &self.state.symbols.get(header_sym).kind else {
            return MethodLookup::NotDefined;
        };
        let overloads = header.overloads.clone();
        let mut matches: Vec<SymbolId> = Vec::new();
        for m in overloads {
            if self.matches_plain(m, args) {
                matches.push(m);
            }
        }
        match matches.len() {
            0 => MethodLookup::NoAcceptable,
            1 => MethodLookup::Found(matches[0]),
            _ => MethodLookup::Ambiguous(matches),
        }
    }

    /// Report a failed lookup: no such name anywhere, no acceptable
    /// overload, or an ambiguity naming every candidate.
    pub(crate) fn report_method_lookup(
        &mut self,
        lookup: &MethodLookup,
        ty: TypeId,
        name: &str,
        span: SourceSpan,
    ) {
        match lookup {
            MethodLookup::Found(_) => {}
            MethodLookup::NotDefined => {
                let owner = self.state.full_name(ty).to_string();
                self.diags.error(
                    DiagnosticCode::MethodNotDefined,
                    span,
                    format!("'{owner}' has no method named '{name}'"),
                );
            }
            MethodLookup::NoAcceptable => {
                let owner = self.state.full_name(ty).to_string();
                self.diags.error(
                    DiagnosticCode::NoAcceptableOverload,
                    span,
                    format!("no overload of '{owner}.{name}' accepts these arguments"),
                );
            }
            MethodLookup::Ambiguous(candidates) => {
                let mut list = String::new();
                for &c in candidates {
                    if !list.is_empty() {
                        list.push_str(", ");
                    }
                    list.push_str(&self.describe_method(c));
                }
                self.diags.error(
                    DiagnosticCode::AmbiguousMethod,
                    span,
                    format!("the call to '{name}' is ambiguous between: {list}"),
                );
            }
        }
    }

    pub(crate) fn describe_method(&self, method: SymbolId) -> String {
        let m = self.state.symbols.method(method);
        let name = &self.state.symbols.get(method).name;
        let params: Vec<&str> = m.params.iter().map(|&p| self.state.full_name(p)).collect();
        format!(
            "{}.{}({})",
            self.state.full_name(m.owner),
            name,
            params.join(", ")
        )
    }

    /// Indexers are special-name `get_Item`/`set_Item` methods,
    /// looked up by side and parameter signature only. Strings index
    /// through `get_Chars`.
    pub(crate) fn indexer_accessor_name(&self, ty: TypeId, set: bool) -> String {
        if ty == self.state.well_known.string && !set {
            "get_Chars".to_string()
        } else if set {
            "set_Item".to_string()
        } else {
            "get_Item".to_string()
        }
    }

    /// Binary operator overload search over both operand types' chains.
    pub(crate) fn lookup_operator(
        &mut self,
        name: &str,
        lhs: TypeId,
        rhs: TypeId,
        span: SourceSpan,
    ) -> Option<SymbolId> {
        let args = [Some(lhs), Some(rhs)];
        for ty in [lhs, rhs] {
            match self.lookup_method_on(ty, name, &args) {
                MethodLookup::Found(sym) => return Some(sym),
                MethodLookup::Ambiguous(candidates) => {
                    self.report_method_lookup(
                        &MethodLookup::Ambiguous(candidates),
                        ty,
                        name,
                        span,
                    );
                    return None;
                }
                _ => {}
            }
        }
        None
    }
}
