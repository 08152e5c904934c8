//! Integration tests for the trait system: trait/protocol declarations,
//! impl conformance, bound checking, and trait method dispatch.

mod common;
use common::*;

// ── Conformance ────────────────────────────────────────────────────────

#[test]
fn complete_impl_checks_clean() {
    let (diags, _) = check_source(
        "module demo\n\
         trait Printable { fn print() -> String; fn debug() -> String; }\n\
         impl Printable for Int {\n\
             fn print() -> String { \"n\" }\n\
             fn debug() -> String { \"i\" }\n\
         }",
    );
    assert_no_errors(&diags);
}

#[test]
fn missing_method_is_exactly_one_trait005_naming_it() {
    let (diags, _) = check_source(
        "module demo\n\
         trait Printable { fn print() -> String; fn debug() -> String; }\n\
         impl Printable for Int {\n\
             fn print() -> String { \"n\" }\n\
         }",
    );
    assert_single_error(&diags, "TRAIT005");
    assert!(
        errors(&diags)[0].message.contains("debug"),
        "TRAIT005 should name the missing method: {}",
        errors(&diags)[0].message
    );
}

#[test]
fn extra_method_is_trait006() {
    let (diags, _) = check_source(
        "module demo\n\
         trait Printable { fn print() -> String; }\n\
         impl Printable for Int {\n\
             fn print() -> String { \"n\" }\n\
             fn shout() -> String { \"N\" }\n\
         }",
    );
    assert_single_error(&diags, "TRAIT006");
}

#[test]
fn impl_of_undefined_trait_is_trait002() {
    let (diags, _) = check_source(
        "module demo\n\
         impl Printable for Int { fn print() -> String { \"n\" } }",
    );
    assert_has_error(&diags, "TRAIT002");
}

#[test]
fn impl_of_non_trait_is_trait002() {
    let (diags, _) = check_source(
        "module demo\n\
         struct Point { x: Int, }\n\
         impl Point for Int { }",
    );
    assert_has_error(&diags, "TRAIT002");
}

#[test]
fn signature_mismatch_is_trait004() {
    let (diags, _) = check_source(
        "module demo\n\
         trait Printable { fn print() -> String; }\n\
         impl Printable for Int { fn print() -> Int { 1 } }",
    );
    assert_has_error(&diags, "TRAIT004");
}

#[test]
fn protocol_behaves_like_trait() {
    let (diags, _) = check_source(
        "module demo\n\
         protocol Closeable { fn close() -> Void; }\n\
         impl Closeable for Int { }",
    );
    assert_single_error(&diags, "TRAIT005");
}

#[test]
fn default_bodies_need_no_impl_method() {
    let (diags, _) = check_source(
        "module demo\n\
         trait Greet {\n\
             fn name() -> String;\n\
             fn greet() -> String { \"hello\" }\n\
         }\n\
         impl Greet for Int { fn name() -> String { \"int\" } }",
    );
    assert_no_errors(&diags);
}

// ── Bounds ─────────────────────────────────────────────────────────────

#[test]
fn satisfied_bound_checks_clean() {
    let (diags, _) = check_source(
        "module demo\n\
         trait Printable { fn print() -> String; }\n\
         impl Printable for Int { fn print() -> String { \"n\" } }\n\
         fn show<T: Printable>(x: T) -> String { x.print() }\n\
         fn run() -> String { show(3) }",
    );
    assert_no_errors(&diags);
}

#[test]
fn unsatisfied_bound_is_bounds001() {
    let (diags, _) = check_source(
        "module demo\n\
         trait Printable { fn print() -> String; }\n\
         impl Printable for Int { fn print() -> String { \"n\" } }\n\
         fn show<T: Printable>(x: T) -> String { x.print() }\n\
         fn run() -> String { show(\"hello\") }",
    );
    assert_has_error(&diags, "BOUNDS001");
}

#[test]
fn unknown_bound_is_bounds002() {
    let (diags, _) = check_source(
        "module demo\n\
         fn show<T: Nonexistent>(x: T) -> Void { }\n\
         fn run() -> Void { show(3) }",
    );
    assert_has_error(&diags, "BOUNDS002");
}

#[test]
fn trait_method_dispatch_through_impl() {
    let (diags, _) = check_source(
        "module demo\n\
         trait Doubler { fn double() -> Int; }\n\
         impl Doubler for Int { fn double() -> Int { self * 2 } }\n\
         fn run(n: Int) -> Int { n.double() }",
    );
    assert_no_errors(&diags);
}

// ── Generic inference ──────────────────────────────────────────────────

#[test]
fn generic_call_infers_from_arguments() {
    let (diags, _) = check_source(
        "module demo\n\
         fn identity<T>(x: T) -> T { x }\n\
         fn run() -> Int { identity(41) }",
    );
    assert_no_errors(&diags);
}

#[test]
fn incomplete_inference_names_free_parameters() {
    let (diags, _) = check_source(
        "module demo\n\
         fn empty<T>() -> [T] { [] }\n\
         fn run() -> Void { let xs = empty(); }",
    );
    assert_has_error(&diags, "TYPE007");
    let err = errors(&diags)
        .into_iter()
        .find(|d| d.code == "TYPE007")
        .unwrap();
    assert!(err.message.contains("`T`"), "should name T: {}", err.message);
}

#[test]
fn generic_arity_mismatch_is_gen001() {
    let (diags, _) = check_source(
        "module demo\n\
         data Box<T> { Full(value: T), Empty }\n\
         fn f(b: Box<Int, String>) -> Void { }",
    );
    assert_has_error(&diags, "GEN001");
}
