//! Emitter integration tests: full pipeline against the recording
//! backend, assertions on recorded structure and instruction streams.

use blue_common::{CompileOptions, DiagnosticBag, FileId, SourceMap};
use blue_emitter::Emitter;
use blue_parser::Parser;
use blue_parser::ast::{Program, SectionIdGen};
use blue_resolver::Resolver;
use blue_runtime::{BodyEvent, CoreLib, Il, RecordingBackend};

fn emit_with(text: &str, tweak: impl FnOnce(&mut CompileOptions)) -> (RecordingBackend, DiagnosticBag) {
    let mut sources = SourceMap::new();
    let file: FileId = sources.add_file("main.bs", text);
    let mut sections = SectionIdGen::new();
    let result = Parser::parse_file(file, text, &[], &mut sections);
    assert!(
        !result.failed,
        "parse failed: {:?}",
        result.diags.iter().map(|d| &d.message).collect::<Vec<_>>()
    );
    let mut program = Program {
        files: vec![result.file],
    };
    let dir = tempfile::tempdir().expect("tempdir");
    let mut options = CompileOptions {
        out: Some(dir.path().join("main.exe")),
        ..CompileOptions::default()
    };
    tweak(&mut options);
    let mut corelib = CoreLib::new();
    let mut diags = DiagnosticBag::new();
    let mut state = Resolver::run(&mut program, &options, &mut corelib, &mut diags);
    assert!(
        !diags.has_errors(),
        "resolve failed: {:?}",
        diags.iter().map(|d| (d.code, &d.message)).collect::<Vec<_>>()
    );
    let mut backend = RecordingBackend::new();
    {
        let mut emitter = Emitter::new(&mut state, &mut backend, &options, &mut diags);
        let output = emitter.run(&program, &sources);
        assert!(
            output.is_some(),
            "emit failed: {:?}",
            diags.iter().map(|d| (d.code, &d.message)).collect::<Vec<_>>()
        );
    }
    (backend, diags)
}

fn emit(text: &str) -> RecordingBackend {
    let (backend, diags) = emit_with(text, |_| {});
    assert!(!diags.has_errors());
    backend
}

// ---- end-to-end scenarios ----

#[test]
fn hello_world_sets_an_entry_point() {
    let backend = emit(
        r#"class P { static void Main() { System.Console.WriteLine("hi"); } }"#,
    );
    let entry = backend.entry_point().expect("entry point");
    assert_eq!(backend.method_info(entry).name, "Main");
    let il = backend.il_of("Main");
    assert!(il.iter().any(|i| matches!(i, Il::Ldstr(s) if s.as_str() == "hi")));
    assert!(il.iter().any(|i| matches!(i, Il::Call(_))));
    assert!(matches!(il.last(), Some(Il::Ret)));
    assert!(backend.saved_to().is_some());
}

#[test]
fn foreach_over_array_lowers_to_an_index_loop() {
    let backend = emit(
        "class C {
            static int Main() {
                int s = 0;
                foreach (int x in new int[] { 1, 2, 3 }) { s += x; }
                return s;
            }
        }",
    );
    let il = backend.il_of("Main");
    // The rewrite runs i from 0 while i < a.Length, indexing each element.
    assert!(il.iter().any(|i| matches!(i, Il::Ldlen)));
    assert!(il.iter().any(|i| matches!(i, Il::Clt)));
    assert!(il.iter().any(|i| matches!(i, Il::LdelemI4)));
    assert!(il.iter().any(|i| matches!(i, Il::Newarr(_))));
    // The initializer stores each element through dup + index.
    assert!(il.iter().filter(|i| matches!(i, Il::StelemI4)).count() >= 3);
}

#[test]
fn try_finally_return_routes_through_leave() {
    let backend = emit(
        "class C {
            static int Main() { return 0; }
            int f() { try { return 1; } finally { System.Console.WriteLine(1); } }
        }",
    );
    let events = backend.events_of("f");
    assert!(events.iter().any(|e| matches!(e, BodyEvent::BeginTry)));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, BodyEvent::BeginFinally))
            .count(),
        1
    );
    assert!(events.iter().any(|e| matches!(e, BodyEvent::EndTry)));
    // The return inside the protected region leaves; it does not branch.
    assert!(
        events
            .iter()
            .any(|e| matches!(e, BodyEvent::Il(Il::Leave(_))))
    );
    // The shared exit loads the pending value and returns once.
    assert!(matches!(
        backend.il_of("f").last(),
        Some(Il::Ret)
    ));
}

#[test]
fn recursive_nested_types_are_created_exactly_once() {
    let backend = emit(
        "class A {
            B b;
            public class B { A a; }
            static void Main() { }
        }",
    );
    let a = backend.type_named("A").expect("A");
    let b = backend.type_named("A+B").expect("A+B");
    assert!(backend.type_info(a).created);
    assert!(backend.type_info(b).created);
    // Creating A demanded B by short name first; the retry finished A.
    assert!(backend.type_info(a).create_calls >= 2);
}

#[test]
fn catch_and_finally_nest_as_two_regions() {
    let backend = emit(
        "class C {
            static void Main() {
                try { } catch (System.Exception e) { } finally { }
            }
        }",
    );
    let events = backend.events_of("Main");
    let begins = events
        .iter()
        .filter(|e| matches!(e, BodyEvent::BeginTry))
        .count();
    assert_eq!(begins, 2, "try/finally wraps try/catch");
    assert!(
        events
            .iter()
            .any(|e| matches!(e, BodyEvent::BeginCatch(Some(_))))
    );
}

// ---- instruction selection ----

#[test]
fn integer_loads_use_the_shortest_form() {
    let backend = emit(
        "class C { static void Main() { int a = 5; int b = 100; int c = 1000; a = b + c; } }",
    );
    let il = backend.il_of("Main");
    assert!(il.iter().any(|i| matches!(i, Il::LdcI4Small(5))));
    assert!(il.iter().any(|i| matches!(i, Il::LdcI4S(100))));
    assert!(il.iter().any(|i| matches!(i, Il::LdcI4(1000))));
}

#[test]
fn low_slots_use_specialized_loads() {
    let backend = emit(
        "class C { static int Main() { int a = 1; int b = 2; return a + b; } }",
    );
    let il = backend.il_of("Main");
    // Slot 0 is the return-value local, so a and b land in 1 and 2.
    assert!(il.iter().any(|i| matches!(i, Il::StlocN(1))));
    assert!(il.iter().any(|i| matches!(i, Il::LdlocN(2))));
}

#[test]
fn comparisons_lower_to_negated_forms() {
    let backend = emit(
        "class C { static void Main() {
            int a = 1; int b = 2;
            bool le = a <= b; bool ge = a >= b; bool ne = a != b;
        } }",
    );
    let il = backend.il_of("Main");
    let mut negated = 0;
    for w in il.windows(3) {
        if matches!(
            (w[0], w[1], w[2]),
            (Il::Cgt, Il::LdcI4Small(0), Il::Ceq)
                | (Il::Clt, Il::LdcI4Small(0), Il::Ceq)
                | (Il::Ceq, Il::LdcI4Small(0), Il::Ceq)
        ) {
            negated += 1;
        }
    }
    assert_eq!(negated, 3, "<=, >= and != each negate a base comparison");
}

#[test]
fn short_circuit_uses_dup_branch_pop() {
    let backend = emit(
        "class C { static void Main() {
            bool a = true; bool b = false;
            bool c = a && b; bool d = a || b;
        } }",
    );
    let il = backend.il_of("Main");
    let dups = il.iter().filter(|i| matches!(i, Il::Dup)).count();
    let pops = il.iter().filter(|i| matches!(i, Il::Pop)).count();
    assert!(dups >= 2 && pops >= 2);
    assert!(il.iter().any(|i| matches!(i, Il::Brfalse(_))));
    assert!(il.iter().any(|i| matches!(i, Il::Brtrue(_))));
}

#[test]
fn value_type_new_constructs_in_place() {
    let backend = emit(
        "struct S { }
         class C { static void Main() { S s; s = new S(); } }",
    );
    let il = backend.il_of("Main");
    let pos_addr = il.iter().position(|i| matches!(i, Il::Ldloca(_)));
    let pos_init = il.iter().position(|i| matches!(i, Il::Initobj(_)));
    assert!(pos_addr.is_some() && pos_init.is_some());
    assert!(pos_addr < pos_init, "initobj runs on the target's address");
}

#[test]
fn boxing_happens_at_reference_seams() {
    let backend = emit(
        "class C { static void Main() { object o = 1; System.Console.WriteLine(o); } }",
    );
    let il = backend.il_of("Main");
    assert!(il.iter().any(|i| matches!(i, Il::Box(_))));
}

#[test]
fn typeof_loads_a_token() {
    let backend = emit(
        "class C { static void Main() { System.Type t = typeof(System.String); } }",
    );
    let il = backend.il_of("Main");
    let pos_token = il.iter().position(|i| matches!(i, Il::Ldtoken(_)));
    let pos_call = il.iter().position(|i| matches!(i, Il::Call(_)));
    assert!(pos_token.is_some());
    assert!(pos_token < pos_call, "GetTypeFromHandle follows the token");
}

#[test]
fn enums_materialize_with_the_value_field() {
    let backend = emit(
        "enum Color { Red, Green, Blue }
         class C { static void Main() { int x = (int)Color.Green; } }",
    );
    let color = backend.type_named("Color").expect("Color enum");
    assert!(backend.type_info(color).created);
    // The workaround field plus a literal per member.
    let il = backend.il_of("Main");
    assert!(il.iter().any(|i| matches!(i, Il::LdcI4Small(1))), "literal inlined");
}

#[test]
fn switch_lowers_to_compare_chains() {
    let backend = emit(
        "class C { static int Main(string[] args) {
            int x = args.Length;
            switch (x) {
                case 0: return 10;
                case 1: case 2: return 20;
                default: return 30;
            }
        } }",
    );
    let il = backend.il_of("Main");
    let compares = il.iter().filter(|i| matches!(i, Il::Ceq)).count();
    assert!(compares >= 3, "one equality test per case label");
}

#[test]
fn instance_calls_dispatch_virtually_and_base_calls_do_not() {
    let backend = emit(
        "class A { public virtual void M() { } }
         class B : A {
            public override void M() { base.M(); }
            static void Main() { B b = new B(); b.M(); }
         }",
    );
    let main_il = backend.il_of_method("B", "Main");
    assert!(main_il.iter().any(|i| matches!(i, Il::Callvirt(_))));
    let m_il = backend.il_of_method("B", "M");
    assert!(
        m_il.iter().any(|i| matches!(i, Il::Call(_)))
            && !m_il.iter().any(|i| matches!(i, Il::Callvirt(_))),
        "base.M() never dispatches virtually"
    );
}

#[test]
fn ref_parameters_load_and_store_indirectly() {
    let backend = emit(
        "class C {
            static void Bump(ref int x) { x = x + 1; }
            static void Main() { int n = 0; Bump(ref n); }
         }",
    );
    let bump = backend.il_of("Bump");
    assert!(bump.iter().any(|i| matches!(i, Il::LdindI4)));
    assert!(bump.iter().any(|i| matches!(i, Il::StindI4)));
    let main_il = backend.il_of("Main");
    assert!(main_il.iter().any(|i| matches!(i, Il::Ldloca(_))));
}

#[test]
fn debug_builds_record_sequence_points_and_local_names() {
    let (backend, diags) = emit_with(
        "class C { static void Main() { int counter = 0; counter = counter + 1; } }",
        |options| options.debug = true,
    );
    assert!(!diags.has_errors());
    assert_eq!(backend.documents().len(), 1);
    let events = backend.events_of("Main");
    assert!(
        events
            .iter()
            .any(|e| matches!(e, BodyEvent::SeqPoint { .. }))
    );
    let main = backend.method_named("Main").unwrap();
    let locals = &backend.method_info(main).body.as_ref().unwrap().locals;
    assert!(
        locals
            .iter()
            .any(|(_, name)| name.as_deref() == Some("counter"))
    );
}

#[test]
fn main_selection_honors_the_main_option() {
    let (backend, diags) = emit_with(
        "class A { static void Main() { } }
         class B { static void Main() { } }",
        |options| options.main_class = Some("B".to_string()),
    );
    assert!(!diags.has_errors());
    let entry = backend.entry_point().expect("entry");
    let owner = backend.method_info(entry).ty;
    assert_eq!(backend.type_name(owner), "B");
}

#[test]
fn library_targets_skip_the_entry_point() {
    let (backend, diags) = emit_with("class A { public void M() { } }", |options| {
        options.target = blue_common::TargetKind::Library;
        options.out = options.out.as_ref().map(|p| p.with_extension("dll"));
    });
    assert!(!diags.has_errors());
    assert!(backend.entry_point().is_none());
}
