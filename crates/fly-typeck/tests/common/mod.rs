//! Shared test harness: parse, lower, and analyze one source string.

use fly_common::class_env::EmptyClassEnvironment;
use fly_common::diagnostics::{Diagnostic, DiagnosticReporter, Severity};
use fly_typeck::{Analysis, TypeResolver};

pub fn check_source(src: &str) -> (Vec<Diagnostic>, Analysis) {
    let parse = fly_parser::parse(src);
    assert!(
        !parse.has_errors(),
        "test source failed to parse: {:?}",
        parse.errors
    );
    let lowered = fly_parser::ast::lower::lower(&parse, "test.fly", src);
    assert!(
        lowered.errors.is_empty(),
        "test source failed to lower: {:?}",
        lowered.errors
    );

    let env = EmptyClassEnvironment;
    let mut resolver = TypeResolver::new(&env, lowered.unit.module_path.segments.clone());
    fly_typeck::register_imports(&lowered.unit, &mut resolver);

    let mut reporter = DiagnosticReporter::new();
    let analysis = fly_typeck::analyze(&lowered.unit, &mut resolver, &mut reporter);
    (reporter.take(), analysis)
}

pub fn errors(diags: &[Diagnostic]) -> Vec<&Diagnostic> {
    diags
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .collect()
}

pub fn warnings(diags: &[Diagnostic]) -> Vec<&Diagnostic> {
    diags
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .collect()
}

#[allow(dead_code)]
pub fn assert_clean(diags: &[Diagnostic]) {
    assert!(
        diags.is_empty(),
        "expected no diagnostics, got: {}",
        diags
            .iter()
            .map(|d| d.format_plain())
            .collect::<Vec<_>>()
            .join("\n")
    );
}

#[allow(dead_code)]
pub fn assert_no_errors(diags: &[Diagnostic]) {
    let errs = errors(diags);
    assert!(
        errs.is_empty(),
        "expected no errors, got: {}",
        errs.iter()
            .map(|d| d.format_plain())
            .collect::<Vec<_>>()
            .join("\n")
    );
}

#[allow(dead_code)]
pub fn assert_single_error(diags: &[Diagnostic], code: &str) {
    let errs = errors(diags);
    assert_eq!(
        errs.len(),
        1,
        "expected exactly one error, got: {}",
        errs.iter()
            .map(|d| d.format_plain())
            .collect::<Vec<_>>()
            .join("\n")
    );
    assert_eq!(errs[0].code, code, "unexpected code: {}", errs[0].format_plain());
}

#[allow(dead_code)]
pub fn assert_has_error(diags: &[Diagnostic], code: &str) {
    assert!(
        errors(diags).iter().any(|d| d.code == code),
        "expected an error with code {code}, got: {}",
        diags
            .iter()
            .map(|d| d.format_plain())
            .collect::<Vec<_>>()
            .join("\n")
    );
}
