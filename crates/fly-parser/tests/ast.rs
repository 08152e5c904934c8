//! Integration tests for CST → AST lowering: module headers, declarations,
//! desugaring, interpolation, and span bookkeeping.

use fly_parser::ast::lower::{lower, LowerResult};
use fly_parser::ast::{
    ExprKind, Literal, PatternKind, Stmt, TopDecl, TypeKind, UseKind,
};

fn lower_source(src: &str) -> LowerResult {
    let parse = fly_parser::parse(src);
    lower(&parse, "test.fly", src)
}

// ── Module & uses ──────────────────────────────────────────────────────

#[test]
fn module_path_is_lowered() {
    let result = lower_source("module demo::app\nfn f() -> Int { 1 }");
    assert!(result.errors.is_empty());
    assert_eq!(result.unit.module_path.segments, vec!["demo", "app"]);
}

#[test]
fn missing_module_is_the_builders_hard_error() {
    let result = lower_source("fn f() -> Int { 1 }");
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("missing module declaration"));
    // The declarations still lowered so later phases can run.
    assert_eq!(result.unit.decls.len(), 1);
}

#[test]
fn use_forms_lower_to_their_kinds() {
    let result = lower_source(
        "module demo\n\
         use fly::collections::HashMap;\n\
         use fly::collections::HashMap as Dict;\n\
         use fly::io::{Reader, Writer};\n\
         use fly::prelude::*;\n\
         fn f() -> Int { 1 }",
    );
    assert!(result.errors.is_empty());
    let uses = &result.unit.uses;
    assert_eq!(uses.len(), 4);
    assert_eq!(
        uses[0].kind,
        UseKind::Single {
            item: "HashMap".into(),
            alias: None
        }
    );
    assert_eq!(
        uses[1].kind,
        UseKind::Single {
            item: "HashMap".into(),
            alias: Some("Dict".into())
        }
    );
    assert_eq!(
        uses[2].kind,
        UseKind::List(vec!["Reader".into(), "Writer".into()])
    );
    assert_eq!(uses[3].kind, UseKind::Wildcard);
    assert_eq!(uses[3].module_path.segments, vec!["fly", "prelude"]);
}

// ── Declarations ───────────────────────────────────────────────────────

#[test]
fn class_with_field_method_and_nested_enum() {
    let result = lower_source(
        "module demo\n\
         class Server : Base, Runnable {\n\
             let mut port: Int = 8080;\n\
             pub fn start() -> Void { }\n\
             enum State { Idle, Busy }\n\
         }",
    );
    assert!(result.errors.is_empty());
    let TopDecl::Class(class) = &result.unit.decls[0] else {
        panic!("expected class");
    };
    assert_eq!(class.name, "Server");
    assert_eq!(class.supers.len(), 2);
    assert_eq!(class.fields.len(), 1);
    assert!(class.fields[0].mutable);
    assert_eq!(class.methods.len(), 1);
    assert!(class.methods[0].header.visibility.is_public());
    assert_eq!(class.nested.len(), 1);
}

#[test]
fn data_variants_carry_fields() {
    let result = lower_source(
        "module demo\ndata Shape { Circle(radius: Float), Rect(w: Float, h: Float), Point }",
    );
    assert!(result.errors.is_empty());
    let TopDecl::Data(data) = &result.unit.decls[0] else {
        panic!("expected data decl");
    };
    assert_eq!(data.variants.len(), 3);
    assert_eq!(data.variants[0].name, "Circle");
    assert_eq!(data.variants[0].fields.len(), 1);
    assert_eq!(data.variants[1].fields.len(), 2);
    assert!(data.variants[2].fields.is_empty());
}

#[test]
fn spark_members_lower() {
    let result = lower_source(
        "module demo\n\
         spark User {\n\
             name: String,\n\
             age: Int,\n\
             validate { }\n\
             before update { }\n\
             after update { }\n\
             computed label: String { name }\n\
             fn greet() -> String { \"hi\" }\n\
         }",
    );
    assert!(result.errors.is_empty());
    let TopDecl::Spark(spark) = &result.unit.decls[0] else {
        panic!("expected spark");
    };
    assert_eq!(spark.fields.len(), 2);
    assert!(spark.validate.is_some());
    assert!(spark.before_update.is_some());
    assert!(spark.after_update.is_some());
    assert_eq!(spark.computed.len(), 1);
    assert_eq!(spark.computed[0].name, "label");
    assert_eq!(spark.methods.len(), 1);
}

#[test]
fn fn_effects_and_requires_are_metadata() {
    let result = lower_source(
        "module demo\nfn transfer(amount: Int) -> Void with Audit, Tx requires (amount > 0) { }",
    );
    assert!(result.errors.is_empty());
    let TopDecl::Function(f) = &result.unit.decls[0] else {
        panic!("expected fn");
    };
    assert_eq!(f.effects, vec!["Audit", "Tx"]);
    assert!(f.requires.is_some());
}

#[test]
fn exception_with_fields_and_super() {
    let result =
        lower_source("module demo\nexception NotFound(key: String) : AppError;");
    assert!(result.errors.is_empty());
    let TopDecl::Exception(e) = &result.unit.decls[0] else {
        panic!("expected exception");
    };
    assert_eq!(e.name, "NotFound");
    assert_eq!(e.fields.len(), 1);
    assert!(e.super_ty.is_some());
}

// ── Types ──────────────────────────────────────────────────────────────

#[test]
fn primitive_and_compound_types() {
    let result = lower_source(
        "module demo\nfn f(a: Int, b: [String], c: [String: Int], d: Float?, e: (Int) -> Bool) -> Void { }",
    );
    assert!(result.errors.is_empty());
    let TopDecl::Function(f) = &result.unit.decls[0] else {
        panic!("expected fn");
    };
    let tys: Vec<_> = f.params.iter().map(|p| p.ty.as_ref().unwrap()).collect();
    assert!(matches!(tys[0].kind, TypeKind::Primitive(_)));
    assert!(matches!(tys[1].kind, TypeKind::Array(_)));
    assert!(matches!(tys[2].kind, TypeKind::Map { .. }));
    assert!(matches!(tys[3].kind, TypeKind::Optional(_)));
    assert!(matches!(tys[4].kind, TypeKind::Function { .. }));
}

#[test]
fn nested_generics_close_cleanly() {
    let result =
        lower_source("module demo\nfn f(m: Map<String, Array<Int>>) -> Void { }");
    assert!(result.errors.is_empty());
    let TopDecl::Function(f) = &result.unit.decls[0] else {
        panic!("expected fn");
    };
    let TypeKind::Named { path, args } = &f.params[0].ty.as_ref().unwrap().kind else {
        panic!("expected named type");
    };
    assert_eq!(path.dotted_colons(), "Map");
    assert_eq!(args.len(), 2);
}

// ── Desugaring ─────────────────────────────────────────────────────────

#[test]
fn if_let_desugars_to_match() {
    let result = lower_source(
        "module demo\nfn f(x: Int?) -> Int { if let v = x { v } else { 0 } }",
    );
    assert!(result.errors.is_empty());
    let TopDecl::Function(f) = &result.unit.decls[0] else {
        panic!("expected fn");
    };
    let body = f.body.as_ref().unwrap();
    let tail = body.tail.as_ref().expect("if-let should be the tail");
    let ExprKind::Match { arms, .. } = &tail.kind else {
        panic!("if-let should lower to match, got {:?}", tail.kind);
    };
    assert_eq!(arms.len(), 2);
    assert!(matches!(arms[1].pattern.kind, PatternKind::Wildcard));
}

#[test]
fn while_let_desugars_to_loop_match() {
    let result = lower_source(
        "module demo\nfn f(q: Queue) -> Void { while let item = q.poll() { consume(item); } }",
    );
    assert!(result.errors.is_empty());
    let TopDecl::Function(f) = &result.unit.decls[0] else {
        panic!("expected fn");
    };
    let body = f.body.as_ref().unwrap();
    let e = body.tail.as_ref().expect("while-let is the block's last expr");
    let ExprKind::While { cond, body: loop_body } = &e.kind else {
        panic!("expected while, got {:?}", e.kind);
    };
    assert!(matches!(
        cond.kind,
        ExprKind::Literal(Literal::Bool(true))
    ));
    let Some(Stmt::Expr(inner)) = loop_body.stmts.first() else {
        panic!("expected match inside loop");
    };
    let ExprKind::Match { arms, .. } = &inner.kind else {
        panic!("expected match, got {:?}", inner.kind);
    };
    assert!(matches!(arms[1].body.kind, ExprKind::Break));
}

#[test]
fn assignment_and_compound_assignment() {
    let result =
        lower_source("module demo\nfn f() -> Void { let mut x = 1; x = 2; x += 3; }");
    assert!(result.errors.is_empty());
    let TopDecl::Function(f) = &result.unit.decls[0] else {
        panic!("expected fn");
    };
    let body = f.body.as_ref().unwrap();
    assert!(matches!(
        body.stmts[1],
        Stmt::Expr(ref e) if matches!(e.kind, ExprKind::Assignment { .. })
    ));
    assert!(matches!(
        body.stmts[2],
        Stmt::Expr(ref e) if matches!(e.kind, ExprKind::CompoundAssignment { .. })
    ));
}

#[test]
fn interpolated_string_splits_text_and_holes() {
    let result =
        lower_source("module demo\nfn f(a: Int, b: Int) -> String { f\"sum is {a + b}!\" }");
    assert!(result.errors.is_empty());
    let TopDecl::Function(f) = &result.unit.decls[0] else {
        panic!("expected fn");
    };
    let tail = f.body.as_ref().unwrap().tail.as_ref().unwrap();
    let ExprKind::Interpolated(parts) = &tail.kind else {
        panic!("expected interpolated string, got {:?}", tail.kind);
    };
    assert_eq!(parts.len(), 3, "text, hole, text");
}

#[test]
fn method_static_and_safe_calls() {
    let result = lower_source(
        "module demo\nfn f(u: User?) -> Void { u?.ping(); u!!.pong(); Math::abs(1); g(); }",
    );
    assert!(result.errors.is_empty());
    let TopDecl::Function(f) = &result.unit.decls[0] else {
        panic!("expected fn");
    };
    let body = f.body.as_ref().unwrap();
    let kinds: Vec<_> = body
        .stmts
        .iter()
        .map(|s| match s {
            Stmt::Expr(e) => &e.kind,
            _ => panic!("expected expr stmts"),
        })
        .collect();
    assert!(matches!(
        kinds[0],
        ExprKind::MethodCall { safe: true, .. }
    ));
    assert!(matches!(kinds[1], ExprKind::MethodCall { safe: false, .. }));
    assert!(matches!(kinds[2], ExprKind::StaticCall { .. }));
    assert!(matches!(kinds[3], ExprKind::Call { .. }));
}

// ── Spans ──────────────────────────────────────────────────────────────

#[test]
fn decl_spans_nest_within_the_unit_span() {
    let src = "module demo\n\nclass A {\n    fn m() -> Int { 1 + 2 }\n}\n";
    let result = lower_source(src);
    assert!(result.errors.is_empty());
    let unit_span = &result.unit.span;
    let TopDecl::Class(class) = &result.unit.decls[0] else {
        panic!("expected class");
    };
    assert!(unit_span.contains(&class.span), "class span inside unit");
    assert!(
        class.span.contains(&class.methods[0].span),
        "method span inside class"
    );
    let m = &class.methods[0];
    assert!(
        m.span.contains(&m.body.as_ref().unwrap().span),
        "body span inside method"
    );
}

#[test]
fn duplicate_concurrent_binding_parses_into_two_bindings() {
    // The duplicate is a semantic error, not a parse error.
    let result = lower_source(
        "module demo\nasync fn f() -> Void { concurrent { let x = g().await, let x = h().await } }",
    );
    assert!(result.errors.is_empty());
    let TopDecl::Function(f) = &result.unit.decls[0] else {
        panic!("expected fn");
    };
    let tail = f.body.as_ref().unwrap().tail.as_ref().unwrap();
    let ExprKind::Concurrent { bindings } = &tail.kind else {
        panic!("expected concurrent, got {:?}", tail.kind);
    };
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].name, "x");
    assert_eq!(bindings[1].name, "x");
}
