//! Integration tests for async-context validation and the concurrency
//! combinators.

mod common;
use common::*;

#[test]
fn await_inside_async_is_clean() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn g() -> Int { 1 }\n\
         async fn f() -> Int { g().await }",
    );
    assert_clean(&diags);
}

#[test]
fn await_outside_async_is_exactly_tc002() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn g() -> Int { 1 }\n\
         fn f() -> Int { g().await }",
    );
    assert_single_error(&diags, "TC002");
}

#[test]
fn calling_async_without_await_yields_future() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn g() -> Int { 1 }\n\
         fn f() -> Int { g() }",
    );
    // The future is not an Int.
    assert_has_error(&diags, "TYPE001");
}

#[test]
fn await_on_non_future_is_tc004() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn f() -> Int { 1.await }",
    );
    assert_single_error(&diags, "TC004");
}

#[test]
fn concurrent_outside_async_is_tc003() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn g() -> Int { 1 }\n\
         fn f() -> Void { concurrent { let a = g().await } }",
    );
    // TC003 for the block; the inner await is inside the same non-async
    // frame, so TC002 fires as well.
    assert_has_error(&diags, "TC003");
}

#[test]
fn duplicate_concurrent_binding_is_exactly_one_error() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn g() -> Int { 1 }\n\
         async fn h() -> Int { 2 }\n\
         async fn f() -> Void {\n\
             concurrent { let x = g().await, let x = h().await }\n\
         }",
    );
    assert_single_error(&diags, "DUP004");
}

#[test]
fn concurrent_bindings_are_visible_after_the_block() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn g() -> Int { 1 }\n\
         async fn h() -> Int { 2 }\n\
         async fn f() -> Int {\n\
             concurrent { let a = g().await, let b = h().await }\n\
             a + b\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn race_outside_async_is_tc005() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn g() -> Int { 1 }\n\
         fn f() -> Void { race { g(); g() }; }",
    );
    assert_has_error(&diags, "TC005");
}

#[test]
fn race_completes_with_the_common_value_type() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn fast() -> Int { 1 }\n\
         async fn slow() -> Int { 2 }\n\
         async fn f() -> Int { race { fast(); slow() } }",
    );
    assert_clean(&diags);
}

#[test]
fn timeout_outside_async_is_tc006() {
    let (diags, _) = check_source(
        "module demo\n\
         fn f() -> Int { timeout(100) { 1 } }",
    );
    assert_has_error(&diags, "TC006");
}

#[test]
fn non_numeric_timeout_duration_is_tc007() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn f() -> Int { timeout(\"soon\") { 1 } }",
    );
    assert_single_error(&diags, "TC007");
}

#[test]
fn lambdas_inherit_enclosing_asyncness() {
    let (diags, _) = check_source(
        "module demo\n\
         async fn g() -> Int { 1 }\n\
         async fn f() -> Int {\n\
             let get = || g().await;\n\
             get()\n\
         }",
    );
    assert_clean(&diags);
}
