//! Integration tests for structs, sparks, classes, and field access.

mod common;
use common::*;

#[test]
fn struct_literal_and_field_access() {
    let (diags, _) = check_source(
        "module demo\n\
         struct Point { x: Int, y: Int, }\n\
         fn run() -> Int {\n\
             let p = Point { x: 1, y: 2 };\n\
             p.x + p.y\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn missing_struct_field_is_type008() {
    let (diags, _) = check_source(
        "module demo\n\
         struct Point { x: Int, y: Int, }\n\
         fn run() -> Point { Point { x: 1 } }",
    );
    assert_single_error(&diags, "TYPE008");
    assert!(errors(&diags)[0].message.contains('y'));
}

#[test]
fn unknown_struct_field_is_type009() {
    let (diags, _) = check_source(
        "module demo\n\
         struct Point { x: Int, y: Int, }\n\
         fn run() -> Point { Point { x: 1, y: 2, z: 3 } }",
    );
    assert_single_error(&diags, "TYPE009");
}

#[test]
fn struct_methods_see_fields_through_self() {
    let (diags, _) = check_source(
        "module demo\n\
         struct Point {\n\
             x: Int, y: Int,\n\
             fn sum() -> Int { self.x + self.y }\n\
             fn scaled(k: Int) -> Int { x * k }\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn spark_hooks_and_computed_check() {
    let (diags, _) = check_source(
        "module demo\n\
         spark User {\n\
             name: String,\n\
             age: Int,\n\
             validate { }\n\
             computed label: String { name }\n\
             fn greet() -> String { \"hi \" + self.name }\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn computed_body_must_match_declared_type() {
    let (diags, _) = check_source(
        "module demo\n\
         spark User {\n\
             name: String,\n\
             computed label: String { 42 }\n\
         }",
    );
    assert_has_error(&diags, "TYPE001");
}

#[test]
fn class_fields_methods_and_new() {
    let (diags, _) = check_source(
        "module demo\n\
         class Counter {\n\
             let mut count: Int = 0;\n\
             pub fn value() -> Int { self.count }\n\
         }\n\
         fn run() -> Int {\n\
             let c = new Counter(0);\n\
             c.value()\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn new_with_wrong_arity_is_type002() {
    let (diags, _) = check_source(
        "module demo\n\
         class Counter { let count: Int = 0; }\n\
         fn run() -> Counter { new Counter(1, 2) }",
    );
    assert_single_error(&diags, "TYPE002");
}

#[test]
fn duplicate_field_is_dup003() {
    let (diags, _) = check_source(
        "module demo\n\
         struct Point { x: Int, x: Int, }",
    );
    assert_single_error(&diags, "DUP003");
}

#[test]
fn duplicate_parameter_is_dup005() {
    let (diags, _) = check_source("module demo\nfn f(a: Int, a: Int) -> Int { a }");
    assert_single_error(&diags, "DUP005");
}

#[test]
fn duplicate_top_level_declaration_is_dup001() {
    let (diags, _) = check_source(
        "module demo\n\
         struct Point { x: Int, }\n\
         struct Point { y: Int, }",
    );
    assert_single_error(&diags, "DUP001");
}

#[test]
fn immutable_assignment_is_type010() {
    let (diags, _) = check_source(
        "module demo\n\
         fn run() -> Int { let x = 1; x = 2; x }",
    );
    assert_single_error(&diags, "TYPE010");
}

#[test]
fn shadowing_without_mut_is_dup006() {
    let (diags, _) = check_source(
        "module demo\n\
         fn run() -> Int {\n\
             let x = 1;\n\
             if true { let x = 2; x } else { 0 }\n\
         }",
    );
    assert_single_error(&diags, "DUP006");
}

#[test]
fn mut_shadowing_in_nested_scope_is_allowed() {
    let (diags, _) = check_source(
        "module demo\n\
         fn run() -> Int {\n\
             let x = 1;\n\
             if true { let mut x = 2; x } else { 0 }\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn extension_methods_dispatch() {
    let (diags, _) = check_source(
        "module demo\n\
         extend String { fn shout() -> String { self + \"!\" } }\n\
         fn run(s: String) -> String { s.shout() }",
    );
    assert_clean(&diags);
}

#[test]
fn exception_declarations_and_throw() {
    let (diags, _) = check_source(
        "module demo\n\
         exception NotFound(key: String);\n\
         fn find(id: Int) -> String {\n\
             if id == 0 { throw new NotFound(\"zero\") } else { \"ok\" }\n\
         }",
    );
    assert_clean(&diags);
}

#[test]
fn throw_non_exception_is_exc001() {
    let (diags, _) = check_source("module demo\nfn f() -> Void { throw 42; }");
    assert_single_error(&diags, "EXC001");
}
