//! Driver tests: staged gating, exit codes, and file-level behavior.

use blue_cli::driver::{self, exit_codes};
use blue_common::{CompileOptions, DiagnosticCategory, DiagnosticCode};
use blue_runtime::RecordingBackend;

fn write_source(dir: &tempfile::TempDir, name: &str, text: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, text).expect("write source");
    path.display().to_string()
}

#[test]
fn hello_world_exits_zero_and_saves() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        &dir,
        "hello.bs",
        r#"class P { static void Main() { System.Console.WriteLine("hi"); } }"#,
    );
    let out = dir.path().join("hello.exe");
    let code = driver::run(&[source, format!("/out:{}", out.display())]);
    assert_eq!(code, exit_codes::SUCCESS);
    assert!(out.exists(), "the output file was saved");
}

#[test]
fn output_name_derives_from_the_first_source() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = RecordingBackend::new();
    let options = CompileOptions::default();
    let result = driver::compile(
        &options,
        &[(
            dir.path().join("app.bs").display().to_string(),
            "class P { static void Main() { } }".to_string(),
        )],
        &mut backend,
    );
    let output = result.output.expect("saved");
    assert_eq!(output.extension().and_then(|e| e.to_str()), Some("exe"));
    assert_eq!(output.file_stem().and_then(|s| s.to_str()), Some("app"));
}

#[test]
fn unknown_options_exit_one() {
    let code = driver::run(&["/definitely-not-an-option".to_string()]);
    assert_eq!(code, exit_codes::USAGE);
}

#[test]
fn missing_sources_exit_one() {
    let code = driver::run(&["/debug".to_string()]);
    assert_eq!(code, exit_codes::USAGE);
}

#[test]
fn unreadable_source_exits_one() {
    let code = driver::run(&["no-such-file.bs".to_string()]);
    assert_eq!(code, exit_codes::USAGE);
}

#[test]
fn parse_errors_gate_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let mut backend = RecordingBackend::new();
    let mut options = CompileOptions::default();
    options.out = Some(dir.path().join("a.exe"));
    let result = driver::compile(
        &options,
        &[(
            "bad.bs".to_string(),
            "class C { void M() { int = ; } }".to_string(),
        )],
        &mut backend,
    );
    assert!(result.diagnostics.has_errors());
    assert!(result.output.is_none());
    // Everything reported comes from the parser; nothing ran after it.
    assert!(
        result
            .diagnostics
            .iter()
            .all(|d| d.code.category() == DiagnosticCategory::Parse
                || d.code.category() == DiagnosticCategory::Lex)
    );
}

#[test]
fn resolve_errors_gate_emission_and_exit_two() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(&dir, "bad.bs", "class C { void M() { missing = 1; } }");
    let code = driver::run(&[source]);
    assert_eq!(code, exit_codes::RESOLVE);
}

#[test]
fn missing_reference_exits_nineteen() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(&dir, "a.bs", "class C { static void Main() { } }");
    let code = driver::run(&[source, "/r:NoSuchAssembly".to_string()]);
    assert_eq!(code, exit_codes::ASSEMBLY_LOAD);
}

#[test]
fn duplicate_main_is_reported() {
    let mut backend = RecordingBackend::new();
    let options = CompileOptions {
        out: Some(std::env::temp_dir().join("dup-main-test.exe")),
        ..CompileOptions::default()
    };
    let result = driver::compile(
        &options,
        &[(
            "a.bs".to_string(),
            "class A { static void Main() { } } class B { static void Main() { } }".to_string(),
        )],
        &mut backend,
    );
    assert_eq!(result.diagnostics.count_of(DiagnosticCode::DuplicateMain), 1);
    assert!(result.output.is_none());
}

#[test]
fn no_main_is_reported_for_executables() {
    let mut backend = RecordingBackend::new();
    let options = CompileOptions::default();
    let result = driver::compile(
        &options,
        &[("a.bs".to_string(), "class A { }".to_string())],
        &mut backend,
    );
    assert_eq!(result.diagnostics.count_of(DiagnosticCode::NoMain), 1);
}

#[test]
fn entry_class_must_exist() {
    let mut backend = RecordingBackend::new();
    let options = CompileOptions {
        main_class: Some("Nope".to_string()),
        ..CompileOptions::default()
    };
    let result = driver::compile(
        &options,
        &[(
            "a.bs".to_string(),
            "class A { static void Main() { } }".to_string(),
        )],
        &mut backend,
    );
    assert_eq!(
        result.diagnostics.count_of(DiagnosticCode::EntryClassNotFound),
        1
    );
}

#[test]
fn xml_dump_is_written_next_to_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        &dir,
        "app.bs",
        "class P { int x; static void Main() { } }",
    );
    let out = dir.path().join("app.exe");
    let code = driver::run(&[
        source,
        format!("/out:{}", out.display()),
        "/xml".to_string(),
    ]);
    assert_eq!(code, exit_codes::SUCCESS);
    let dump = out.with_extension("xml");
    assert!(dump.exists());
    let text = std::fs::read_to_string(dump).unwrap();
    assert!(text.contains("\"P\""));
}

#[test]
fn defines_reach_the_preprocessor() {
    let mut backend = RecordingBackend::new();
    let options = CompileOptions {
        defines: vec!["EXTRA".to_string()],
        out: Some(std::env::temp_dir().join("defines-test.exe")),
        ..CompileOptions::default()
    };
    let result = driver::compile(
        &options,
        &[(
            "a.bs".to_string(),
            "#if EXTRA\nclass P { static void Main() { } }\n#endif\n".to_string(),
        )],
        &mut backend,
    );
    assert!(
        !result.diagnostics.has_errors(),
        "diags: {:?}",
        result
            .diagnostics
            .iter()
            .map(|d| (d.code, &d.message))
            .collect::<Vec<_>>()
    );
    assert!(result.output.is_some());
}

#[test]
fn halt_after_resolve_skips_emission() {
    let mut backend = RecordingBackend::new();
    let options = CompileOptions {
        halt: Some(blue_common::HaltStage::Resolve),
        ..CompileOptions::default()
    };
    let result = driver::compile(
        &options,
        &[(
            "a.bs".to_string(),
            "class P { static void Main() { } }".to_string(),
        )],
        &mut backend,
    );
    assert!(!result.diagnostics.has_errors());
    assert!(result.output.is_none());
}

#[test]
fn lex_error_taxonomy_reaches_the_driver() {
    let mut backend = RecordingBackend::new();
    let options = CompileOptions::default();
    let result = driver::compile(
        &options,
        &[("a.bs".to_string(), "#endregion\n".to_string())],
        &mut backend,
    );
    assert_eq!(
        result
            .diagnostics
            .count_of(DiagnosticCode::UnmatchedEndRegion),
        1
    );
}
