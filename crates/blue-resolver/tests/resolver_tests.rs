//! Resolver integration tests: source text through parse + resolve,
//! assertions on diagnostics and on the resolved world.

use blue_common::{CompileOptions, DiagnosticBag, DiagnosticCode, FileId};
use blue_parser::Parser;
use blue_parser::ast::{Program, SectionIdGen};
use blue_resolver::{ResolveState, Resolver};
use blue_runtime::CoreLib;

fn resolve_files(texts: &[&str]) -> (ResolveState, DiagnosticBag) {
    let mut sections = SectionIdGen::new();
    let mut program = Program::default();
    for (i, text) in texts.iter().enumerate() {
        let result = Parser::parse_file(FileId::from_raw(i as u32), text, &[], &mut sections);
        assert!(
            !result.failed,
            "parse failed: {:?}",
            result.diags.iter().map(|d| &d.message).collect::<Vec<_>>()
        );
        program.files.push(result.file);
    }
    let options = CompileOptions::default();
    let mut corelib = CoreLib::new();
    let mut diags = DiagnosticBag::new();
    let state = Resolver::run(&mut program, &options, &mut corelib, &mut diags);
    (state, diags)
}

fn resolve_one(text: &str) -> (ResolveState, DiagnosticBag) {
    resolve_files(&[text])
}

fn assert_clean(diags: &DiagnosticBag) {
    assert!(
        !diags.has_errors(),
        "unexpected diagnostics: {:?}",
        diags.iter().map(|d| (d.code, &d.message)).collect::<Vec<_>>()
    );
}

fn assert_single(diags: &DiagnosticBag, code: DiagnosticCode) {
    assert_eq!(
        diags.count_of(code),
        1,
        "expected exactly one {code:?}, got: {:?}",
        diags.iter().map(|d| (d.code, &d.message)).collect::<Vec<_>>()
    );
}

// ---- basics ----

#[test]
fn hello_world_resolves() {
    let (_, diags) = resolve_one(
        r#"class P { static void Main() { System.Console.WriteLine("hi"); } }"#,
    );
    assert_clean(&diags);
}

#[test]
fn undefined_symbol() {
    let (_, diags) = resolve_one("class C { void M() { x = 1; } }");
    assert_single(&diags, DiagnosticCode::UndefinedSymbol);
}

#[test]
fn duplicate_type_is_reported() {
    let (_, diags) = resolve_one("class C {} class C {}");
    assert_single(&diags, DiagnosticCode::SymbolAlreadyDefined);
}

#[test]
fn primitive_aliases_reach_system_types() {
    let (state, diags) = resolve_one(
        "class C { int M(string s) { return s.Length; } }",
    );
    assert_clean(&diags);
    let int_sym = state.smart_lookup(state.global, "int").expect("int alias");
    assert_eq!(
        state.symbols.get(int_sym).name,
        "Int32",
        "the alias key differs from the symbol's declared name"
    );
}

// ---- inheritance shape ----

#[test]
fn only_single_inheritance() {
    let (_, diags) = resolve_one("class A {} class B {} class C : A, B {}");
    assert_single(&diags, DiagnosticCode::OnlySingleInheritance);
}

#[test]
fn structs_derive_only_from_interfaces() {
    let (_, diags) = resolve_one("class A {} struct S : A {}");
    assert_single(&diags, DiagnosticCode::MustDeriveFromInterface);
}

#[test]
fn circular_super_chain() {
    let (_, diags) = resolve_one("class A : B {} class B : A {}");
    assert!(diags.count_of(DiagnosticCode::CircularReference) >= 1);
}

#[test]
fn inherited_members_are_visible() {
    let (_, diags) = resolve_one(
        "class A { public int x; }
         class B : A { int M() { return x; } }",
    );
    assert_clean(&diags);
}

// ---- scope sharing across namespace sections ----

#[test]
fn sections_of_one_namespace_share_symbols() {
    let (_, diags) = resolve_one(
        "namespace N { class A {} }
         namespace N { class B : A {} }",
    );
    assert_clean(&diags);
}

#[test]
fn scope_sharing_is_aliased_across_files() {
    // An insertion through one file's section is visible through the
    // other file's section, in both directions.
    let (_, diags) = resolve_files(&[
        "namespace N { class A : IdentityOfB {} class IdentityOfA {} }",
        "namespace N { class IdentityOfB {} class B : IdentityOfA {} }",
    ]);
    assert_clean(&diags);
}

#[test]
fn using_clauses_are_per_section() {
    let (_, diags) = resolve_files(&[
        "using System; class C { void M() { Console.WriteLine(1); } }",
        // No using here: the unqualified name must not resolve.
        "class D { void M() { Console.WriteLine(1); } }",
    ]);
    assert_single(&diags, DiagnosticCode::UndefinedSymbol);
}

// ---- assignability laws ----

#[test]
fn assignability_laws() {
    let (state, diags) = resolve_one(
        "class A {} class B : A {} class C : B {} interface I {} class D : I {}",
    );
    assert_clean(&diags);
    let find = |name: &str| {
        let sym = state.smart_lookup(state.global, name).expect(name);
        state.symbols.as_type(sym).expect("a type")
    };
    let (a, b, c, i, d) = (find("A"), find("B"), find("C"), find("I"), find("D"));
    let object = state.well_known.object;
    let int = state.well_known.int;

    // Reflexive.
    for ty in [a, b, c, i, d, object, int] {
        assert!(state.assignable(ty, ty));
    }
    // Transitive through subclass-of.
    assert!(state.assignable(c, b));
    assert!(state.assignable(b, a));
    assert!(state.assignable(c, a));
    assert!(!state.assignable(a, c));
    // Interfaces through the closure.
    assert!(state.assignable(d, i));
    // Everything converts to Object.
    for ty in [a, c, i, d, int] {
        assert!(state.assignable(ty, object));
    }
    // null converts to reference and interface types, not value types.
    assert!(state.assignable_opt(None, a));
    assert!(state.assignable_opt(None, i));
    assert!(!state.assignable_opt(None, int));
    // char -> int, not back.
    assert!(state.assignable(state.well_known.char, int));
    assert!(!state.assignable(int, state.well_known.char));
}

#[test]
fn array_assignability_is_monotone() {
    let (mut state, diags) = resolve_one("class A {} class B : A {}");
    assert_clean(&diags);
    let find = |state: &ResolveState, name: &str| {
        let sym = state.smart_lookup(state.global, name).expect(name);
        state.symbols.as_type(sym).expect("a type")
    };
    let a = find(&state, "A");
    let b = find(&state, "B");
    assert!(state.assignable(b, a));
    let a_arr = state.array_of(a, 1);
    let b_arr = state.array_of(b, 1);
    assert!(state.assignable(b_arr, a_arr));
    assert!(!state.assignable(a_arr, b_arr));
    // Arrays convert to System.Array and to Object.
    assert!(state.assignable(a_arr, state.well_known.array));
    assert!(state.assignable(a_arr, state.well_known.object));
    // Canonical identity: the same array type is the same TypeId.
    assert_eq!(a_arr, state.array_of(a, 1));
}

// ---- overload resolution ----

#[test]
fn ambiguous_overload_names_both_candidates() {
    let (_, diags) = resolve_one(
        "class C {
            void f(int a, object b) { }
            void f(object a, int b) { }
            void M() { f(1, 1); }
        }",
    );
    assert_single(&diags, DiagnosticCode::AmbiguousMethod);
    let message = &diags
        .iter()
        .find(|d| d.code == DiagnosticCode::AmbiguousMethod)
        .unwrap()
        .message;
    assert!(message.contains("System.Int32, System.Object"));
    assert!(message.contains("System.Object, System.Int32"));
}

#[test]
fn ambiguity_is_symmetric() {
    // Swapping the two equally good candidates still yields ambiguous.
    let (_, diags) = resolve_one(
        "class C {
            void f(object a, int b) { }
            void f(int a, object b) { }
            void M() { f(1, 1); }
        }",
    );
    assert_single(&diags, DiagnosticCode::AmbiguousMethod);
}

#[test]
fn exact_match_beats_conversions() {
    let (_, diags) = resolve_one(
        "class C {
            void f(int a) { }
            void f(object a) { }
            void M() { f(1); }
        }",
    );
    assert_clean(&diags);
}

#[test]
fn method_not_defined_vs_no_acceptable_overload() {
    let (_, diags) = resolve_one("class C { void M() { Missing(); } }");
    assert_single(&diags, DiagnosticCode::MethodNotDefined);
    let (_, diags) = resolve_one(
        "class C { void f(string s) { } void M() { f(1); } }",
    );
    assert_single(&diags, DiagnosticCode::NoAcceptableOverload);
}

#[test]
fn params_array_matches_trailing_arguments() {
    // Passing the array directly and params-style both work; an exact
    // array argument is the preferred non-variadic match.
    let (_, diags) = resolve_one(
        "class C {
            void f(string tag, int[] rest) { }
            void M() { f(\"t\", new int[] { 1, 2 }); f(\"t\", 1, 2); f(\"t\"); }
        }",
    );
    assert_clean(&diags);
}

#[test]
fn decorated_names_are_stable() {
    let (state, diags) = resolve_one("class C { void M(int a, string b) { } }");
    assert_clean(&diags);
    let int = state.well_known.int;
    let string = state.well_known.string;
    let key = state.decorated_name("M", &[int, string]);
    assert_eq!(key, "M:System.Int32;System.String;");
    assert_eq!(key, state.decorated_name("M", &[int, string]));
}

// ---- interface realization ----

#[test]
fn missing_interface_method() {
    let (_, diags) = resolve_one(
        "interface I { void Foo(); }
         class C : I { }",
    );
    assert_single(&diags, DiagnosticCode::MissingInterfaceMethod);
}

#[test]
fn interface_method_must_be_public() {
    let (_, diags) = resolve_one(
        "interface I { void Foo(); }
         class C : I { void Foo() { } }",
    );
    assert_single(&diags, DiagnosticCode::IMethodMustBePublic);
}

#[test]
fn realized_interface_is_clean() {
    let (_, diags) = resolve_one(
        "interface I { void Foo(); }
         class C : I { public void Foo() { } }",
    );
    assert_clean(&diags);
}

#[test]
fn abstract_members_demand_an_abstract_class() {
    let (_, diags) = resolve_one("class C { abstract void M(); }");
    assert_single(&diags, DiagnosticCode::ClassMustBeAbstract);
}

// ---- override checks ----

#[test]
fn override_needs_a_virtual_base_method() {
    let (_, diags) = resolve_one(
        "class A { public void M() { } }
         class B : A { public override void M() { } }",
    );
    assert_single(&diags, DiagnosticCode::CantOverrideNonVirtual);

    let (_, diags) = resolve_one(
        "class A { }
         class B : A { public override void M() { } }",
    );
    assert_single(&diags, DiagnosticCode::NoMethodToOverride);

    let (_, diags) = resolve_one(
        "class A { public virtual void M() { } }
         class B : A { private override void M() { } }",
    );
    assert_single(&diags, DiagnosticCode::VisibilityMismatch);

    let (_, diags) = resolve_one(
        "class A { public virtual void M() { } }
         class B : A { public override void M() { } }",
    );
    assert_clean(&diags);
}

// ---- statements ----

#[test]
fn break_outside_loop() {
    let (_, diags) = resolve_one("class C { void M() { break; } }");
    assert_single(&diags, DiagnosticCode::MustBeInsideLoop);
}

#[test]
fn labels_and_gotos_bind_forward_and_back() {
    let (_, diags) = resolve_one(
        "class C { void M() { goto later; later: M(); goto later; } }",
    );
    assert_clean(&diags);
    let (_, diags) = resolve_one("class C { void M() { goto nowhere; } }");
    assert_single(&diags, DiagnosticCode::UndefinedSymbol);
    let (_, diags) = resolve_one("class C { void M() { l: M(); l: M(); } }");
    assert_single(&diags, DiagnosticCode::LabelAlreadyDefined);
}

#[test]
fn shadowed_catch_handlers() {
    let (_, diags) = resolve_one(
        "class C { void M() {
            try { } catch (System.Exception e) { } catch (System.Exception f) { }
        } }",
    );
    assert_single(&diags, DiagnosticCode::ShadowCatchHandlers);
}

#[test]
fn catch_type_must_be_an_exception() {
    let (_, diags) = resolve_one(
        "class C { void M() { try { } catch (string s) { } } }",
    );
    assert_single(&diags, DiagnosticCode::TypeMismatch);
}

#[test]
fn switch_case_labels_must_be_constant() {
    let (_, diags) = resolve_one(
        "class C { void M(int x, int y) { switch (x) { case 0: break; default: break; } } }",
    );
    assert_clean(&diags);
    let (_, diags) = resolve_one(
        "class C { void M(int x, int y) { switch (x) { case y: break; } } }",
    );
    assert_single(&diags, DiagnosticCode::MustBeCompileTimeConstant);
}

#[test]
fn foreach_needs_an_array_or_enumerator() {
    let (_, diags) = resolve_one(
        "class C { int M(int[] a) { int s = 0; foreach (int x in a) { s += x; } return s; } }",
    );
    assert_clean(&diags);
    let (_, diags) = resolve_one(
        "class D {} class C { void M(D d) { foreach (int x in d) { } } }",
    );
    assert_single(&diags, DiagnosticCode::MethodNotDefined);
}

#[test]
fn foreach_installs_a_lowered_substitute() {
    let mut sections = SectionIdGen::new();
    let text =
        "class C { int M(int[] a) { int s = 0; foreach (int x in a) { s += x; } return s; } }";
    let result = Parser::parse_file(FileId::from_raw(0), text, &[], &mut sections);
    assert!(!result.failed);
    let mut program = Program {
        files: vec![result.file],
    };
    let options = CompileOptions::default();
    let mut corelib = CoreLib::new();
    let mut diags = DiagnosticBag::new();
    let _ = Resolver::run(&mut program, &options, &mut corelib, &mut diags);
    assert!(!diags.has_errors());
    use blue_parser::ast::{Member, StmtKind, TypeItem};
    let TypeItem::Type(decl) = &program.files[0].types[0] else {
        panic!()
    };
    let Member::Method(method) = decl
        .members
        .iter()
        .find(|m| matches!(m, Member::Method(m) if m.name == "M"))
        .unwrap()
    else {
        panic!()
    };
    let body = method.body.as_ref().unwrap();
    let StmtKind::Foreach(foreach) = &body.stmts[1].kind else {
        panic!("expected the foreach statement")
    };
    assert!(foreach.lowered.is_some(), "no resolved substitute installed");
}

// ---- expressions ----

#[test]
fn as_operator_requires_reference_types() {
    let (_, diags) = resolve_one("class C { void M(object o) { object x = o as int; } }");
    assert_single(&diags, DiagnosticCode::AsOpOnlyOnRefTypes);
}

#[test]
fn conditional_branches_must_agree() {
    let (_, diags) = resolve_one(
        "class C { void M(bool b) { int x = b ? 1 : 2; } }",
    );
    assert_clean(&diags);
    let (_, diags) = resolve_one(
        "class C { void M(bool b) { object x = b ? 1 : \"two\"; } }",
    );
    assert_single(&diags, DiagnosticCode::BadTypeIfExp);
}

#[test]
fn events_cannot_be_read() {
    let (_, diags) = resolve_one(
        "delegate void Handler();
         class C {
            public event Handler Changed;
            void M() { Handler h = Changed; }
         }",
    );
    assert_single(&diags, DiagnosticCode::NoEventOnRhs);
}

#[test]
fn constants_are_not_assignable() {
    let (_, diags) = resolve_one(
        "class C { const int K = 3; void M() { K = 4; } }",
    );
    assert_single(&diags, DiagnosticCode::NotValidLhs);
}

#[test]
fn base_calls_cannot_name_statics() {
    let (_, diags) = resolve_one(
        "class A { public static void S() { } }
         class B : A { void M() { base.S(); } }",
    );
    assert_single(&diags, DiagnosticCode::BaseAccessCantBeStatic);
}

#[test]
fn static_ctor_takes_no_params() {
    let (_, diags) = resolve_one("class C { static C(int x) { } }");
    assert_single(&diags, DiagnosticCode::NoParamsOnStaticCtor);
}

#[test]
fn struct_fields_cannot_have_initializers() {
    let (_, diags) = resolve_one("struct S { int x = 1; }");
    assert_single(&diags, DiagnosticCode::NoFieldInitForStructs);
}

#[test]
fn new_array_bounds_must_match_the_initializer() {
    let (_, diags) = resolve_one(
        "class C { void M() { int[] a = new int[2] { 1, 2, 3 }; } }",
    );
    assert_single(&diags, DiagnosticCode::NewArrayBoundsMismatch);
}

#[test]
fn enums_declare_their_literals_eagerly() {
    let (state, diags) = resolve_one(
        "enum Color { Red, Green = 5, Blue }
         class C { int M() { return (int)Color.Blue; } }",
    );
    assert_clean(&diags);
    let sym = state.smart_lookup(state.global, "Color").expect("Color");
    let ty = state.symbols.as_type(sym).unwrap();
    let scope = state.symbols.ty(ty).member_scope.unwrap();
    let blue = state.scopes.get(scope, "Blue").expect("Blue");
    match &state.symbols.get(blue).kind {
        blue_resolver::symbols::SymKind::LiteralField(f) => assert_eq!(f.value, 6),
        other => panic!("expected a literal field, got {other:?}"),
    }
}

#[test]
fn nested_types_resolve_through_their_container() {
    let (_, diags) = resolve_one(
        "class A { public class B { } }
         class C { void M() { A.B b = new A.B(); } }",
    );
    assert_clean(&diags);
}

#[test]
fn delegates_accept_method_groups() {
    let (_, diags) = resolve_one(
        "delegate int Op(int x);
         class C {
            int Twice(int x) { return x + x; }
            int M() { Op op = new Op(Twice); return op(4); }
         }",
    );
    assert_clean(&diags);
}

#[test]
fn locked_scopes_stay_stable() {
    let (state, diags) = resolve_one("class C { void M(string s) { int n = s.Length; } }");
    assert_clean(&diags);
    // The imported System.String scope was populated lazily and locked.
    let string = state.well_known.string;
    let scope = state.symbols.ty(string).member_scope.expect("populated");
    assert!(state.scopes.scope(scope).locked);
}
