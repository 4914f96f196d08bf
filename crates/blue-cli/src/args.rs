//! Command-line surface.
//!
//! An argument is one of:
//! - `@file` - a response file: whitespace-separated tokens, lines whose
//!   first character is `#` are comments
//! - `/name` or `/name:value` - an option
//! - anything else - a source file name
//!
//! Unknown options are reported and fatal overall, but processing
//! continues so every problem is listed in one run.

use std::path::PathBuf;

use blue_common::{CompileOptions, Diagnostic, DiagnosticCode, HaltStage, TargetKind};

#[derive(Debug)]
pub enum ParsedArgs {
    /// `/help[:TOPIC]` was given; print help and exit successfully.
    Help(Option<String>),
    Run {
        options: CompileOptions,
        sources: Vec<PathBuf>,
    },
}

#[derive(Debug, Default)]
pub struct ArgErrors {
    pub diags: Vec<Diagnostic>,
}

impl ArgErrors {
    fn push(&mut self, code: DiagnosticCode, message: impl Into<String>) {
        self.diags.push(Diagnostic::spanless(code, message));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }
}

pub fn parse_args(args: &[String]) -> Result<ParsedArgs, ArgErrors> {
    let mut errors = ArgErrors::default();
    let mut options = CompileOptions::default();
    let mut sources = Vec::new();
    let mut help: Option<Option<String>> = None;
    let mut expanded = Vec::new();
    for arg in args {
        expand_arg(arg, &mut expanded, &mut errors, 0);
    }
    for token in &expanded {
        match token.strip_prefix('/') {
            // A leading slash is an option unless the name part has more
            // slashes in it, which makes it an absolute path.
            Some(rest) if !option_name_of(rest).contains('/') => {
                parse_option(rest, &mut options, &mut help, &mut errors);
            }
            _ => sources.push(PathBuf::from(token)),
        }
    }
    if let Some(topic) = help {
        return Ok(ParsedArgs::Help(topic));
    }
    if sources.is_empty() {
        errors.push(DiagnosticCode::MissingSourceFiles, "no source files given");
    }
    if errors.is_empty() {
        Ok(ParsedArgs::Run { options, sources })
    } else {
        Err(errors)
    }
}

fn expand_arg(arg: &str, out: &mut Vec<String>, errors: &mut ArgErrors, depth: usize) {
    if depth > 8 {
        errors.push(DiagnosticCode::UnknownOption, "response files nest too deeply");
        return;
    }
    if let Some(path) = arg.strip_prefix('@') {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                for line in text.lines() {
                    if line.trim_start().starts_with('#') {
                        continue;
                    }
                    for token in line.split_whitespace() {
                        expand_arg(token, out, errors, depth + 1);
                    }
                }
            }
            Err(err) => errors.push(
                DiagnosticCode::IoError,
                format!("cannot read response file '{path}': {err}"),
            ),
        }
    } else {
        out.push(arg.to_string());
    }
}

fn option_name_of(option: &str) -> &str {
    option.split_once(':').map(|(name, _)| name).unwrap_or(option)
}

fn parse_option(
    option: &str,
    options: &mut CompileOptions,
    help: &mut Option<Option<String>>,
    errors: &mut ArgErrors,
) {
    let (name, value) = match option.split_once(':') {
        Some((name, value)) => (name, Some(value)),
        None => (option, None),
    };
    match name {
        "target" => match value {
            Some("console") => options.target = TargetKind::Console,
            Some("windows") => options.target = TargetKind::Windows,
            Some("library") => options.target = TargetKind::Library,
            _ => errors.push(DiagnosticCode::UnknownOption, "/target must be console, windows, or library"),
        },
        "debug" => options.debug = true,
        "main" => match value {
            Some(class) if !class.is_empty() => options.main_class = Some(class.to_string()),
            _ => errors.push(DiagnosticCode::UnknownOption, "/main requires a class name"),
        },
        "out" => match value {
            Some(path) if !path.is_empty() => options.out = Some(PathBuf::from(path)),
            _ => errors.push(DiagnosticCode::UnknownOption, "/out requires a file name"),
        },
        "reference" | "r" => match value {
            Some(name) if !name.is_empty() => options.references.push(name.to_string()),
            _ => errors.push(DiagnosticCode::UnknownOption, "/reference requires an assembly name"),
        },
        "define" | "d" => match value {
            Some(sym) if !sym.is_empty() => options.defines.push(sym.to_string()),
            _ => errors.push(DiagnosticCode::UnknownOption, "/define requires a symbol name"),
        },
        "xml" => options.xml_dump = true,
        "_Q" => match value {
            Some("Lexer") => options.halt = Some(HaltStage::Lexer),
            Some("Parser") => options.halt = Some(HaltStage::Parser),
            Some("Resolve") => options.halt = Some(HaltStage::Resolve),
            _ => errors.push(DiagnosticCode::UnknownOption, "/_Q must be Lexer, Parser, or Resolve"),
        },
        "help" => *help = Some(value.map(str::to_string)),
        other => errors.push(
            DiagnosticCode::UnknownOption,
            format!("unknown option '/{other}'"),
        ),
    }
}

pub const HELP_TEXT: &str = "\
usage: bluec [options] file.bs ...

  @file               read whitespace-separated arguments from a
                      response file ('#' lines are comments)
  /target:KIND        console (default), windows, or library
  /debug              emit debug info (sequence points, local names)
  /main:CLASS         class containing the entry point
  /out:FILE           output file name
  /reference:NAME     reference an assembly (alias /r, may repeat)
  /define:SYM         define a preprocessor symbol (alias /d, may repeat)
  /xml                dump the AST and symbol tables as XML
  /help[:TOPIC]       this text
";

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn options_and_sources_split() {
        let parsed = parse_args(&strings(&[
            "/target:library",
            "/debug",
            "/d:EXTRA",
            "/r:mscorlib",
            "a.bs",
            "b.bs",
        ]))
        .expect("parse");
        let ParsedArgs::Run { options, sources } = parsed else {
            panic!("expected run");
        };
        assert_eq!(options.target, TargetKind::Library);
        assert!(options.debug);
        assert_eq!(options.defines, vec!["EXTRA"]);
        assert_eq!(options.references, vec!["mscorlib"]);
        assert_eq!(sources.len(), 2);
    }

    #[test]
    fn unknown_option_is_fatal_but_all_are_reported() {
        let err = parse_args(&strings(&["/bogus", "/alsobogus", "a.bs"])).unwrap_err();
        assert_eq!(err.diags.len(), 2);
        assert!(
            err.diags
                .iter()
                .all(|d| d.code == blue_common::DiagnosticCode::UnknownOption)
        );
    }

    #[test]
    fn missing_sources_is_an_error() {
        let err = parse_args(&strings(&["/debug"])).unwrap_err();
        assert!(
            err.diags
                .iter()
                .any(|d| d.code == blue_common::DiagnosticCode::MissingSourceFiles)
        );
    }

    #[test]
    fn help_wins_even_without_sources() {
        let parsed = parse_args(&strings(&["/help"])).expect("parse");
        assert!(matches!(parsed, ParsedArgs::Help(None)));
        let parsed = parse_args(&strings(&["/help:targets"])).expect("parse");
        assert!(matches!(parsed, ParsedArgs::Help(Some(t)) if t == "targets"));
    }

    #[test]
    fn absolute_paths_are_not_options() {
        let parsed =
            parse_args(&strings(&["/home/dev/app.bs", "/out:/tmp/app.exe"])).expect("parse");
        let ParsedArgs::Run { options, sources } = parsed else {
            panic!("expected run");
        };
        assert_eq!(sources.len(), 1);
        assert_eq!(
            options.out.as_deref(),
            Some(std::path::Path::new("/tmp/app.exe"))
        );
    }

    #[test]
    fn response_files_expand() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rsp = dir.path().join("build.rsp");
        std::fs::write(&rsp, "# a comment line\n/debug a.bs\n  b.bs\n").expect("write");
        let parsed =
            parse_args(&[format!("@{}", rsp.display())]).expect("parse");
        let ParsedArgs::Run { options, sources } = parsed else {
            panic!("expected run");
        };
        assert!(options.debug);
        assert_eq!(sources.len(), 2);
    }
}
