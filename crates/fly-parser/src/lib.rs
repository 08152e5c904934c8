//! Parser and AST for the Flylang compiler.
//!
//! Two layers:
//!
//! 1. A lossless-enough CST built on rowan by an event-driven, resilient
//!    parser ([`parse`]). Parse errors never abort; the tree always exists.
//! 2. The owned, immutable AST ([`ast`]) produced by
//!    [`ast::lower::lower`], with desugaring, `NodeId` assignment, and
//!    resolved source spans. A canonical pretty-printer lives in
//!    [`ast::print`].

pub mod ast;
pub mod cst;
pub mod error;
mod parser;
pub mod syntax_kind;

pub use error::ParseError;
pub use parser::{parse, parse_expr_fragment, Parse};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax_kind::SyntaxKind;

    #[test]
    fn parses_hello_to_source_file() {
        let parse = parse(
            "module demo\nclass Main { pub fn fly(args: [String]) -> Void { println(\"hello\") } }",
        );
        assert!(!parse.has_errors(), "errors: {:?}", parse.errors);
        let root = parse.syntax();
        assert_eq!(root.kind(), SyntaxKind::SOURCE_FILE);
        assert!(root
            .children()
            .any(|n| n.kind() == SyntaxKind::MODULE_HEADER));
        assert!(root.children().any(|n| n.kind() == SyntaxKind::CLASS_DECL));
    }

    #[test]
    fn cst_text_ranges_match_source() {
        let src = "module demo\nfn f() -> Int {\n    1 + 2\n}\n";
        let parse = parse(src);
        assert!(!parse.has_errors());
        let root = parse.syntax();
        // The root covers the entire file, byte for byte.
        assert_eq!(root.text().to_string(), src);
    }

    #[test]
    fn missing_delimiter_recovers() {
        let parse = parse("module demo\nfn f() -> Int { 1 + \nfn g() -> Int { 2 }");
        assert!(parse.has_errors());
        // The second function still made it into the tree.
        let root = parse.syntax();
        let fns: Vec<_> = root
            .descendants()
            .filter(|n| n.kind() == SyntaxKind::FN_DECL)
            .collect();
        assert!(fns.len() >= 2, "expected both functions parsed, got {}", fns.len());
    }

    #[test]
    fn keyword_allowed_in_use_path() {
        // `match` is reserved, but host packages may use it as a segment.
        let parse = parse("module demo\nuse host::match::Thing;\nfn f() -> Int { 1 }");
        assert!(!parse.has_errors(), "errors: {:?}", parse.errors);
    }
}
