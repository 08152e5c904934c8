//! Integration tests for option discipline: `?.`, `??`, `?:`, `!!`, `?`.

mod common;
use common::*;

#[test]
fn safe_access_with_coalesce_infers_string() {
    let (diags, analysis) = check_source(
        "module demo\n\
         struct User { name: String, }\n\
         fn display(user: User?) -> String {\n\
             let name = user?.name ?? \"Unknown\";\n\
             name\n\
         }",
    );
    assert_clean(&diags);
    // The coalesce produced a plain String somewhere in the side table.
    assert!(
        analysis
            .types
            .values()
            .any(|t| t == &fly_typeck::ty::Ty::Str),
        "expected a String-typed expression in the analysis"
    );
}

#[test]
fn safe_access_on_non_optional_is_a_warning() {
    let (diags, _) = check_source(
        "module demo\n\
         struct User { name: String, }\n\
         fn f(user: User) -> String? { user?.name }",
    );
    assert_no_errors(&diags);
    assert!(warnings(&diags).iter().any(|d| d.code == "OPT001"));
}

#[test]
fn force_unwrap_on_non_optional_is_an_error() {
    let (diags, _) = check_source("module demo\nfn f(n: Int) -> Int { n!! }");
    assert_single_error(&diags, "OPT003");
}

#[test]
fn force_unwrap_on_optional_is_fine() {
    let (diags, _) = check_source("module demo\nfn f(n: Int?) -> Int { n!! }");
    assert_clean(&diags);
}

#[test]
fn unwrap_requires_optional_operand() {
    let (diags, _) = check_source("module demo\nfn f(n: Int) -> Int? { n? }");
    assert_single_error(&diags, "OPT002");
}

#[test]
fn unwrap_requires_optional_return() {
    let (diags, _) = check_source(
        "module demo\n\
         struct User { name: String, }\n\
         fn f(u: User?) -> String {\n\
             let user = u?;\n\
             user.name\n\
         }",
    );
    assert_single_error(&diags, "OPT006");
}

#[test]
fn unwrap_propagates_cleanly_in_optional_function() {
    let (diags, _) = check_source(
        "module demo\n\
         struct User { name: String, }\n\
         fn f(u: User?) -> String? {\n\
             let user = u?;\n\
             user.name\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn coalesce_branch_mismatch_is_opt004() {
    let (diags, _) = check_source(
        "module demo\n\
         fn f(n: Int?) -> Int { n ?? \"zero\" }",
    );
    assert_single_error(&diags, "OPT004");
}

#[test]
fn elvis_is_checked_like_coalesce() {
    let (diags, _) = check_source(
        "module demo\n\
         fn f(n: Int?) -> Int { n ?: 0 }",
    );
    assert_clean(&diags);

    let (diags, _) = check_source(
        "module demo\n\
         fn f(n: Int?) -> Int { n ?: \"zero\" }",
    );
    assert_single_error(&diags, "OPT004");
}

#[test]
fn none_literal_adopts_the_expected_optional() {
    let (diags, _) = check_source(
        "module demo\n\
         fn f() -> Int? { none }\n\
         fn g(flag: Bool) -> String? {\n\
             if flag { \"yes\" } else { none }\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn map_index_yields_optional() {
    let (diags, _) = check_source(
        "module demo\n\
         fn f(scores: [String: Int]) -> Int {\n\
             scores[\"alice\"] ?? 0\n\
         }",
    );
    assert_clean(&diags);
}
