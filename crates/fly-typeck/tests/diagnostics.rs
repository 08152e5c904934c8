//! Integration tests for diagnostic behavior: stable codes, hints,
//! accumulation without short-circuiting, and entry-point validation.

mod common;
use common::*;

#[test]
fn undefined_symbol_is_name001() {
    let (diags, _) = check_source("module demo\nfn f() -> Int { missing + 1 }");
    assert_has_error(&diags, "NAME001");
}

#[test]
fn unknown_type_is_name002_with_hint() {
    let (diags, _) = check_source("module demo\nfn f(m: HashMap<String, Int>) -> Void { }");
    let errs = errors(&diags);
    let err = errs.iter().find(|d| d.code == "NAME002").expect("NAME002");
    assert_eq!(
        err.hint.as_deref(),
        Some("add `use fly::collections::HashMap`"),
        "missing-import hint should suggest the use line"
    );
}

#[test]
fn multiple_errors_accumulate_in_one_pass() {
    let (diags, _) = check_source(
        "module demo\n\
         fn f() -> Int { missing1 }\n\
         fn g() -> Int { missing2 }\n\
         fn h() -> Int { \"not an int\" }",
    );
    let errs = errors(&diags);
    assert!(
        errs.len() >= 3,
        "expected at least three accumulated errors, got {}",
        errs.len()
    );
}

#[test]
fn valid_entry_point_is_recorded() {
    let (diags, analysis) = check_source(
        "module demo\n\
         class Main { pub fn fly(args: [String]) -> Void { println(\"hello\") } }",
    );
    assert_clean(&diags);
    assert_eq!(analysis.entry_class.as_deref(), Some("Main"));
}

#[test]
fn wrong_entry_signature_is_e0002() {
    let (diags, _) = check_source(
        "module demo\n\
         class Main { pub fn fly(count: Int) -> Void { } }",
    );
    assert_single_error(&diags, "E0002");
}

#[test]
fn non_numeric_operand_is_type003() {
    let (diags, _) = check_source("module demo\nfn f(b: Bool) -> Bool { b * b }");
    assert_single_error(&diags, "TYPE003");
}

#[test]
fn break_outside_loop_is_reported() {
    let (diags, _) = check_source("module demo\nfn f() -> Void { break; }");
    assert_single_error(&diags, "TYPE015");
}

#[test]
fn arity_mismatch_is_type002() {
    let (diags, _) = check_source(
        "module demo\n\
         fn add(a: Int, b: Int) -> Int { a + b }\n\
         fn f() -> Int { add(1) }",
    );
    assert_single_error(&diags, "TYPE002");
}

#[test]
fn requires_clause_must_be_bool() {
    let (diags, _) = check_source(
        "module demo\n\
         fn withdraw(amount: Int) -> Void requires (amount) { }",
    );
    assert_has_error(&diags, "TYPE001");
}

#[test]
fn effects_are_metadata_not_errors() {
    let (diags, _) = check_source(
        "module demo\n\
         fn transfer(amount: Int) -> Void with Audit, Tx requires (amount > 0) { }",
    );
    assert_clean(&diags);
}

#[test]
fn spans_point_into_the_source() {
    let (diags, _) = check_source("module demo\nfn f() -> Int { missing }");
    let errs = errors(&diags);
    let span = errs[0].span.as_ref().expect("diagnostic has a span");
    assert_eq!(span.file, "test.fly");
    assert_eq!(span.start_line, 2);
}
