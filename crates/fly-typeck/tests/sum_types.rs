//! Integration tests for sum types: variant constructors, pattern matching,
//! exhaustiveness, and reachability.

mod common;
use common::*;

#[test]
fn exhaustive_enum_match_is_clean() {
    let (diags, _) = check_source(
        "module demo\n\
         data Color { Red, Green, Blue }\n\
         fn value(c: Color) -> Int {\n\
             match c { Red => 1, Green => 2, Blue => 3 }\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn removing_a_variant_warns_non_exhaustive() {
    let (diags, _) = check_source(
        "module demo\n\
         data Color { Red, Green, Blue }\n\
         fn value(c: Color) -> Int {\n\
             match c { Red => 1, Green => 2, _ => 0 }\n\
         }",
    );
    assert_clean(&diags);

    let (diags, _) = check_source(
        "module demo\n\
         data Color { Red, Green, Blue }\n\
         fn value(c: Color) -> Int {\n\
             match c { Red => 1, Green => 2 }\n\
         }",
    );
    assert_no_errors(&diags);
    let warns = warnings(&diags);
    assert_eq!(warns.len(), 1, "expected one warning: {diags:?}");
    assert_eq!(warns[0].code, "PAT001");
    assert!(warns[0].message.contains("Blue"));
}

#[test]
fn variant_payloads_bind_in_arms() {
    let (diags, _) = check_source(
        "module demo\n\
         data Shape { Circle(radius: Float), Rect(w: Float, h: Float) }\n\
         fn area(s: Shape) -> Float {\n\
             match s {\n\
                 Circle(r) => 3.14159 * r * r,\n\
                 Rect(w, h) => w * h,\n\
             }\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn variant_constructor_checks_field_types() {
    let (diags, _) = check_source(
        "module demo\n\
         data Shape { Circle(radius: Float) }\n\
         fn make() -> Shape { Circle(\"big\") }",
    );
    assert_has_error(&diags, "TYPE001");
}

#[test]
fn variant_constructor_checks_arity() {
    let (diags, _) = check_source(
        "module demo\n\
         data Shape { Rect(w: Float, h: Float) }\n\
         fn make() -> Shape { Rect(1.0) }",
    );
    assert_has_error(&diags, "TYPE002");
}

#[test]
fn wrong_owner_pattern_is_pat004() {
    let (diags, _) = check_source(
        "module demo\n\
         data Color { Red, Green }\n\
         data Fruit { Apple, Pear }\n\
         fn f(c: Color) -> Int {\n\
             match c { Apple => 1, _ => 0 }\n\
         }",
    );
    assert_has_error(&diags, "PAT004");
}

#[test]
fn guarded_arm_does_not_count_toward_exhaustiveness() {
    let (diags, _) = check_source(
        "module demo\n\
         data Color { Red, Green }\n\
         fn f(c: Color, n: Int) -> Int {\n\
             match c { Red => 1, Green when n > 0 => 2 }\n\
         }",
    );
    assert_no_errors(&diags);
    let warns = warnings(&diags);
    assert_eq!(warns.len(), 1);
    assert_eq!(warns[0].code, "PAT001");
}

#[test]
fn arm_after_wildcard_is_unreachable() {
    let (diags, _) = check_source(
        "module demo\n\
         data Color { Red, Green }\n\
         fn f(c: Color) -> Int {\n\
             match c { _ => 0, Red => 1 }\n\
         }",
    );
    assert_no_errors(&diags);
    assert!(warnings(&diags).iter().any(|d| d.code == "PAT003"));
}

#[test]
fn or_patterns_cover_their_variants() {
    let (diags, _) = check_source(
        "module demo\n\
         data Color { Red, Green, Blue }\n\
         fn f(c: Color) -> Int {\n\
             match c { Red | Green => 1, Blue => 2 }\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn match_on_int_needs_wildcard() {
    let (diags, _) = check_source(
        "module demo\n\
         fn f(n: Int) -> Int {\n\
             match n { 0 => 1, 1 => 2 }\n\
         }",
    );
    assert_no_errors(&diags);
    assert!(warnings(&diags).iter().any(|d| d.code == "PAT002"));
}

#[test]
fn generic_data_infers_arguments() {
    let (diags, _) = check_source(
        "module demo\n\
         data Box<T> { Full(value: T), Empty }\n\
         fn wrap(n: Int) -> Box<Int> { Full(n) }\n\
         fn read(b: Box<Int>) -> Int {\n\
             match b { Full(v) => v, Empty => 0 }\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn fieldless_variant_used_as_value() {
    let (diags, _) = check_source(
        "module demo\n\
         data Color { Red, Green, Blue }\n\
         fn favorite() -> Color { Color::Red }\n\
         fn second() -> Color { Green }",
    );
    assert_clean(&diags);
}
