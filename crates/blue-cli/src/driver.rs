//! The staged compilation pipeline.
//!
//! Stages are gated: lex/parse errors disable resolution, resolution
//! errors disable emission, emission errors disable the save. Every
//! diagnostic lands in one bag and is printed at the end. A panic
//! anywhere inside the pipeline is caught at this scope and reported as
//! an internal compiler error.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;

use colored::Colorize;
use tracing::debug;

use blue_common::{
    CompileOptions, Diagnostic, DiagnosticBag, DiagnosticCode, HaltStage, SourceMap,
};
use blue_emitter::Emitter;
use blue_parser::Parser;
use blue_parser::ast::{Program, SectionIdGen};
use blue_resolver::Resolver;
use blue_runtime::{CoreLib, RecordingBackend, RuntimeBackend};
use blue_scanner::Scanner;

/// Exit codes, part of the external contract.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// Usage or input errors: bad options, missing sources.
    pub const USAGE: i32 = 1;
    /// Compilation errors.
    pub const RESOLVE: i32 = 2;
    /// Unhandled error at driver scope.
    pub const INTERNAL: i32 = 8;
    /// A referenced assembly could not be loaded.
    pub const ASSEMBLY_LOAD: i32 = 19;
}

pub struct CompilationResult {
    pub diagnostics: DiagnosticBag,
    pub sources: SourceMap,
    /// The saved output file, when every stage succeeded.
    pub output: Option<PathBuf>,
}

/// Entry point for the binary: argv (without the program name) to exit
/// code.
pub fn run(args: &[String]) -> i32 {
    match catch_unwind(AssertUnwindSafe(|| run_inner(args))) {
        Ok(code) => code,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            eprintln!(
                "{} BC{:04}: internal compiler error: {message}",
                "error".red().bold(),
                DiagnosticCode::InternalError.number(),
            );
            exit_codes::INTERNAL
        }
    }
}

fn run_inner(args: &[String]) -> i32 {
    let parsed = match crate::args::parse_args(args) {
        Ok(parsed) => parsed,
        Err(errors) => {
            for diag in &errors.diags {
                eprintln!(
                    "{} BC{:04}: {}",
                    "error".red().bold(),
                    diag.code.number(),
                    diag.message
                );
            }
            return exit_codes::USAGE;
        }
    };
    let (options, source_paths) = match parsed {
        crate::args::ParsedArgs::Help(_topic) => {
            print!("{}", crate::args::HELP_TEXT);
            return exit_codes::SUCCESS;
        }
        crate::args::ParsedArgs::Run { options, sources } => (options, sources),
    };
    let mut named_sources = Vec::with_capacity(source_paths.len());
    for path in &source_paths {
        match std::fs::read_to_string(path) {
            Ok(text) => named_sources.push((path.display().to_string(), text)),
            Err(err) => {
                eprintln!(
                    "{} cannot read source file '{}': {err}",
                    "error:".red().bold(),
                    path.display()
                );
                return exit_codes::USAGE;
            }
        }
    }
    let mut backend = RecordingBackend::new();
    let result = compile(&options, &named_sources, &mut backend);
    print_diagnostics(&result);
    exit_code_for(&result)
}

/// The whole pipeline over in-memory sources; the backend is injected so
/// tests (and future native backends) choose where bytes go.
pub fn compile(
    options: &CompileOptions,
    named_sources: &[(String, String)],
    backend: &mut dyn RuntimeBackend,
) -> CompilationResult {
    let mut sources = SourceMap::new();
    let mut diagnostics = DiagnosticBag::new();
    let mut program = Program::default();
    let mut sections = SectionIdGen::new();
    let mut parse_failed = false;

    for (name, text) in named_sources {
        let file = sources.add_file(name.clone(), text.clone());
        if options.halt == Some(HaltStage::Lexer) {
            // Debug halt: run the scanner alone and keep its diagnostics.
            let mut scanner = Scanner::new(file, text, &options.defines);
            while !scanner.next().kind.is_terminal() {}
            diagnostics.extend(scanner.take_diagnostics());
            continue;
        }
        let result = Parser::parse_file(file, text, &options.defines, &mut sections);
        diagnostics.extend(result.diags);
        if result.failed {
            // The file is not submitted to later stages.
            parse_failed = true;
        } else {
            program.files.push(result.file);
        }
    }
    if matches!(options.halt, Some(HaltStage::Lexer | HaltStage::Parser)) {
        return CompilationResult {
            diagnostics,
            sources,
            output: None,
        };
    }
    if parse_failed || diagnostics.has_errors() {
        return CompilationResult {
            diagnostics,
            sources,
            output: None,
        };
    }

    let mut corelib = CoreLib::new();
    let state = Resolver::run(&mut program, options, &mut corelib, &mut diagnostics);
    debug!(symbols = state.symbols.len(), "resolution finished");
    if options.xml_dump {
        let dump_path = blue_emitter::derive_output_path(options, &sources).with_extension("xml");
        if let Err(err) = crate::dump::write_dump(&dump_path, &program, &sources) {
            diagnostics.add(Diagnostic::spanless(
                DiagnosticCode::IoError,
                format!("cannot write '{}': {err}", dump_path.display()),
            ));
        }
    }
    if options.halt == Some(HaltStage::Resolve) || diagnostics.has_errors() {
        return CompilationResult {
            diagnostics,
            sources,
            output: None,
        };
    }

    let mut state = state;
    let mut emitter = Emitter::new(&mut state, backend, options, &mut diagnostics);
    let output = emitter.run(&program, &sources);
    CompilationResult {
        diagnostics,
        sources,
        output,
    }
}

fn print_diagnostics(result: &CompilationResult) {
    for diag in result.diagnostics.iter() {
        let rendered = diag.render(&result.sources);
        match rendered.split_once("error") {
            Some((prefix, rest)) => {
                eprintln!("{prefix}{}{rest}", "error".red().bold());
            }
            None => eprintln!("{rendered}"),
        }
    }
}

fn exit_code_for(result: &CompilationResult) -> i32 {
    if result
        .diagnostics
        .iter()
        .any(|d| d.code == DiagnosticCode::AssemblyLoadError)
    {
        return exit_codes::ASSEMBLY_LOAD;
    }
    if result.diagnostics.has_errors() {
        return exit_codes::RESOLVE;
    }
    exit_codes::SUCCESS
}

