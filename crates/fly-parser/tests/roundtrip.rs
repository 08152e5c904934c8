//! Round-trip property: parse → print → parse yields a structurally equal
//! AST. Structural equality is checked by printing both ASTs — the printer
//! is a pure function of structure, so equal output means equal trees
//! (modulo spans and node ids).

use fly_parser::ast::lower::lower;
use fly_parser::ast::print::print;

fn roundtrip(src: &str) {
    let parse1 = fly_parser::parse(src);
    assert!(!parse1.has_errors(), "first parse failed: {:?}", parse1.errors);
    let lowered1 = lower(&parse1, "rt.fly", src);
    assert!(lowered1.errors.is_empty(), "first lower failed: {:?}", lowered1.errors);

    let printed1 = print(&lowered1.unit);
    let parse2 = fly_parser::parse(&printed1);
    assert!(
        !parse2.has_errors(),
        "printed source failed to re-parse: {:?}\n---\n{printed1}",
        parse2.errors
    );
    let lowered2 = lower(&parse2, "rt.fly", &printed1);
    assert!(lowered2.errors.is_empty());

    let printed2 = print(&lowered2.unit);
    assert_eq!(printed1, printed2, "round-trip changed structure");
}

#[test]
fn roundtrip_hello() {
    roundtrip(
        "module demo\nclass Main { pub fn fly(args: [String]) -> Void { println(\"hello\") } }",
    );
}

#[test]
fn roundtrip_expressions() {
    roundtrip(
        "module demo\n\
         fn f(a: Int, b: Int) -> Int {\n\
             let x = a * b + 2 ** 3;\n\
             let y = (a ?? 0) ?: b;\n\
             let r = 1..10;\n\
             let t = (a, b, \"s\");\n\
             let arr = [1, 2, 3];\n\
             let map = [\"one\": 1, \"two\": 2];\n\
             x\n\
         }",
    );
}

#[test]
fn roundtrip_control_flow() {
    roundtrip(
        "module demo\n\
         fn classify(n: Int) -> String {\n\
             if n < 0 { \"neg\" } else if n == 0 { \"zero\" } else { \"pos\" }\n\
         }\n\
         fn sum(xs: [Int]) -> Int {\n\
             let mut total = 0;\n\
             for x in xs { total += x; }\n\
             while total > 100 { total -= 10; }\n\
             total\n\
         }",
    );
}

#[test]
fn roundtrip_match_and_patterns() {
    roundtrip(
        "module demo\n\
         data Color { Red, Green, Blue }\n\
         fn name(c: Color) -> String {\n\
             match c {\n\
                 Red => \"red\",\n\
                 Green => \"green\",\n\
                 Blue => \"blue\",\n\
             }\n\
         }\n\
         fn describe(n: Int) -> String {\n\
             match n {\n\
                 0 => \"zero\",\n\
                 1 | 2 => \"small\",\n\
                 3..=9 => \"mid\",\n\
                 v when (v < 100) => \"big\",\n\
                 _ => \"huge\",\n\
             }\n\
         }",
    );
}

#[test]
fn roundtrip_declarations() {
    roundtrip(
        "module demo::types\n\
         use fly::collections::HashMap as Dict;\n\
         enum Direction { North, South, East, West }\n\
         struct Point { x: Int, y: Int, }\n\
         spark User {\n\
             name: String,\n\
             validate { }\n\
             computed label: String { name }\n\
         }\n\
         trait Printable { fn print() -> String; fn debug() -> String; }\n\
         impl Printable for Int { fn print() -> String { \"n\" } fn debug() -> String { \"i\" } }\n\
         exception NotFound(key: String) : AppError;\n\
         type Meters = Float;",
    );
}

#[test]
fn roundtrip_async_constructs() {
    roundtrip(
        "module demo\n\
         async fn fetch(url: String) -> String { url }\n\
         async fn gather() -> Int {\n\
             let page = fetch(\"a\").await;\n\
             concurrent { let a = fetch(\"x\").await, let b = fetch(\"y\").await }\n\
             let winner = race { fetch(\"1\"); fetch(\"2\") };\n\
             timeout(500) { fetch(\"slow\").await; }\n\
             page.length()\n\
         }",
    );
}

#[test]
fn roundtrip_options_and_exceptions() {
    roundtrip(
        "module demo\n\
         fn handle(u: User?) -> String {\n\
             let name = u?.name ?? \"Unknown\";\n\
             try {\n\
                 risky();\n\
             } catch (e: NotFound) {\n\
                 log(e);\n\
             } finally {\n\
                 cleanup();\n\
             }\n\
             name\n\
         }",
    );
}

#[test]
fn roundtrip_lambdas_and_interpolation() {
    roundtrip(
        "module demo\n\
         fn f(xs: [Int]) -> [Int] {\n\
             let doubled = xs.map(|x| x * 2);\n\
             let labeled = xs.map(|x: Int| -> String f\"value {x}\");\n\
             doubled\n\
         }",
    );
}
