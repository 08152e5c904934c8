//! Declaration parsers for Flylang.
//!
//! Parses the module header, use declarations, and every top-level or nested
//! declaration form: classes, interfaces, enums, data (sum) types, structs,
//! sparks, traits/protocols, impls, type aliases, extends, contexts,
//! supervisors, flows, macros, exceptions, functions, and fields.

use fly_common::span::Span;

use crate::syntax_kind::SyntaxKind;

use super::expressions::{block, expr};
use super::types::parse_type;
use super::Parser;

// ── Source file ──────────────────────────────────────────────────────

/// Parse a whole compilation unit: `module a::b::c`, uses, declarations.
pub(crate) fn source_file(p: &mut Parser) {
    let m = p.open();

    while p.at(SyntaxKind::DOC_COMMENT) {
        p.advance();
    }

    if p.at(SyntaxKind::MODULE_KW) {
        module_header(p);
    } else {
        // The AST builder turns the missing header into its hard error; the
        // parser just notes it and keeps going so later phases have a tree.
        p.error("expected `module` declaration at start of file");
    }

    while p.at(SyntaxKind::USE_KW) {
        use_decl(p);
    }

    while !p.at_eof() {
        if p.current().starts_decl() {
            decl(p, false);
        } else {
            p.advance_with_error("expected declaration");
        }
    }

    p.close(m, SyntaxKind::SOURCE_FILE);
}

fn module_header(p: &mut Parser) {
    let m = p.open();
    p.advance(); // module
    path(p, true);
    p.eat(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::MODULE_HEADER);
}

/// Parse a dotted path: `a::b::c`. With `allow_keywords`, reserved words are
/// accepted as segments so host-VM packages remain addressable.
pub(crate) fn path(p: &mut Parser, allow_keywords: bool) {
    let m = p.open();
    path_segment(p, allow_keywords);
    while p.at(SyntaxKind::COLON_COLON) && segment_follows(p, allow_keywords) {
        p.advance(); // ::
        path_segment(p, allow_keywords);
    }
    p.close(m, SyntaxKind::PATH);
}

fn segment_follows(p: &Parser, allow_keywords: bool) -> bool {
    let kind = p.nth(1);
    kind == SyntaxKind::IDENT
        || kind == SyntaxKind::TYPE_IDENT
        || (allow_keywords && kind.is_token() && kind < SyntaxKind::L_PAREN)
}

fn path_segment(p: &mut Parser, allow_keywords: bool) {
    let kind = p.current();
    let ok = kind == SyntaxKind::IDENT
        || kind == SyntaxKind::TYPE_IDENT
        || (allow_keywords && kind.is_token() && kind < SyntaxKind::L_PAREN);
    if ok {
        p.advance();
    } else {
        p.error("expected path segment");
    }
}

// ── Use declarations ─────────────────────────────────────────────────

/// `use a::b::Item;` | `use a::b::Item as Alias;` | `use a::b::{X, Y};` |
/// `use a::b::*;`
fn use_decl(p: &mut Parser) {
    let m = p.open();
    p.advance(); // use

    let pm = p.open();
    path_segment(p, true);
    loop {
        if !p.at(SyntaxKind::COLON_COLON) {
            break;
        }
        match p.nth(1) {
            SyntaxKind::L_BRACE => {
                p.close(pm, SyntaxKind::PATH);
                p.advance(); // ::
                use_item_list(p);
                finish_use(p, m);
                return;
            }
            SyntaxKind::STAR => {
                p.close(pm, SyntaxKind::PATH);
                p.advance(); // ::
                let sm = p.open();
                p.advance(); // *
                p.close(sm, SyntaxKind::USE_STAR);
                finish_use(p, m);
                return;
            }
            _ => {
                p.advance(); // ::
                path_segment(p, true);
            }
        }
    }
    p.close(pm, SyntaxKind::PATH);

    if p.at(SyntaxKind::AS_KW) {
        let am = p.open();
        p.advance(); // as
        if p.at(SyntaxKind::IDENT) || p.at(SyntaxKind::TYPE_IDENT) {
            p.advance();
        } else {
            p.error("expected alias name after `as`");
        }
        p.close(am, SyntaxKind::USE_ALIAS);
    }
    finish_use(p, m);
}

fn finish_use(p: &mut Parser, m: super::MarkOpened) {
    p.expect(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::USE_DECL);
}

fn use_item_list(p: &mut Parser) {
    let m = p.open();
    p.advance(); // {
    loop {
        if p.at(SyntaxKind::R_BRACE) || p.at_eof() {
            break;
        }
        let im = p.open();
        if p.at(SyntaxKind::IDENT) || p.at(SyntaxKind::TYPE_IDENT) {
            p.advance();
        } else {
            p.error("expected import item name");
            p.close(im, SyntaxKind::USE_ITEM);
            break;
        }
        p.close(im, SyntaxKind::USE_ITEM);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    p.expect(SyntaxKind::R_BRACE);
    p.close(m, SyntaxKind::USE_ITEM_LIST);
}

// ── Declaration dispatch ─────────────────────────────────────────────

/// Parse one declaration. `in_type_body` permits `let` field declarations.
pub(crate) fn decl(p: &mut Parser, in_type_body: bool) {
    let m = p.open();

    while p.at(SyntaxKind::DOC_COMMENT) {
        p.advance();
    }
    while p.at(SyntaxKind::AT) {
        annotation(p);
    }
    if p.at(SyntaxKind::PUB_KW) {
        let vm = p.open();
        p.advance();
        p.close(vm, SyntaxKind::VISIBILITY);
    }
    p.eat(SyntaxKind::STATIC_KW);
    p.eat(SyntaxKind::ASYNC_KW);

    match p.current() {
        SyntaxKind::FN_KW => fn_decl(p, m),
        SyntaxKind::CLASS_KW => class_like(p, m, SyntaxKind::CLASS_DECL),
        SyntaxKind::INTERFACE_KW => interface_decl(p, m),
        SyntaxKind::ENUM_KW => enum_decl(p, m),
        SyntaxKind::DATA_KW => data_decl(p, m),
        SyntaxKind::STRUCT_KW => struct_decl(p, m),
        SyntaxKind::SPARK_KW => spark_decl(p, m),
        SyntaxKind::TRAIT_KW => trait_like(p, m, SyntaxKind::TRAIT_DECL),
        SyntaxKind::PROTOCOL_KW => trait_like(p, m, SyntaxKind::PROTOCOL_DECL),
        SyntaxKind::IMPL_KW => impl_decl(p, m),
        SyntaxKind::TYPE_KW => type_alias_decl(p, m),
        SyntaxKind::EXTEND_KW => extend_decl(p, m),
        SyntaxKind::CONTEXT_KW => class_like(p, m, SyntaxKind::CONTEXT_DECL),
        SyntaxKind::SUPERVISOR_KW => class_like(p, m, SyntaxKind::SUPERVISOR_DECL),
        SyntaxKind::FLOW_KW => class_like(p, m, SyntaxKind::FLOW_DECL),
        SyntaxKind::MACRO_KW => macro_decl(p, m),
        SyntaxKind::EXCEPTION_KW => exception_decl(p, m),
        SyntaxKind::LET_KW if in_type_body => field_decl(p, m),
        _ => {
            p.error("expected declaration");
            p.close(m, SyntaxKind::ERROR_NODE);
        }
    }
}

fn annotation(p: &mut Parser) {
    let m = p.open();
    p.advance(); // @
    path(p, true);
    if p.at(SyntaxKind::L_PAREN) {
        arg_parens(p);
    }
    p.close(m, SyntaxKind::ANNOTATION);
}

fn arg_parens(p: &mut Parser) {
    let m = p.open();
    p.advance(); // (
    while !p.at(SyntaxKind::R_PAREN) && !p.at_eof() {
        expr(p);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    p.expect(SyntaxKind::R_PAREN);
    p.close(m, SyntaxKind::ARG_LIST);
}

fn name(p: &mut Parser, what: &str) {
    if p.at(SyntaxKind::IDENT) || p.at(SyntaxKind::TYPE_IDENT) {
        let m = p.open();
        p.advance();
        p.close(m, SyntaxKind::NAME);
    } else {
        p.error(format!("expected {what} name"));
    }
}

// ── Generic parameters ───────────────────────────────────────────────

/// `<T, U: Bound + Bound2>`
pub(crate) fn type_param_list(p: &mut Parser) {
    let m = p.open();
    p.advance(); // <
    loop {
        if p.at(SyntaxKind::GT) || p.at_eof() {
            break;
        }
        let tm = p.open();
        if p.at(SyntaxKind::TYPE_IDENT) {
            p.advance();
        } else {
            p.error("expected type parameter name");
            p.close(tm, SyntaxKind::TYPE_PARAM);
            break;
        }
        if p.eat(SyntaxKind::COLON) {
            parse_type(p);
            while p.eat(SyntaxKind::PLUS) {
                parse_type(p);
            }
        }
        p.close(tm, SyntaxKind::TYPE_PARAM);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    p.expect(SyntaxKind::GT);
    p.close(m, SyntaxKind::TYPE_PARAM_LIST);
}

// ── Functions ────────────────────────────────────────────────────────

/// `fn name<T>(params) -> Ret with Eff requires e { body }` — or a bodyless
/// signature ending in `;` inside interfaces, traits, and protocols.
fn fn_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // fn

    name(p, "function");

    if p.at(SyntaxKind::LT) {
        type_param_list(p);
    }

    if p.at(SyntaxKind::L_PAREN) {
        param_list(p);
    } else {
        p.error("expected parameter list");
    }

    if p.at(SyntaxKind::ARROW) {
        let rm = p.open();
        p.advance(); // ->
        parse_type(p);
        p.close(rm, SyntaxKind::RETURN_TYPE);
    }

    if p.at(SyntaxKind::WITH_KW) {
        let em = p.open();
        p.advance(); // with
        loop {
            if p.at(SyntaxKind::TYPE_IDENT) || p.at(SyntaxKind::IDENT) {
                p.advance();
            } else {
                p.error("expected effect name");
                break;
            }
            if !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        p.close(em, SyntaxKind::EFFECT_CLAUSE);
    }

    if p.at(SyntaxKind::REQUIRES_KW) {
        let rm = p.open();
        p.advance(); // requires
        expr(p);
        p.close(rm, SyntaxKind::REQUIRES_CLAUSE);
    }

    if p.at(SyntaxKind::L_BRACE) {
        block(p);
    } else {
        p.expect(SyntaxKind::SEMICOLON);
    }

    p.close(m, SyntaxKind::FN_DECL);
}

/// `(a: Int, b: [String])`
pub(crate) fn param_list(p: &mut Parser) {
    let m = p.open();
    p.advance(); // (
    loop {
        if p.at(SyntaxKind::R_PAREN) || p.at_eof() {
            break;
        }
        let pm = p.open();
        if p.at(SyntaxKind::IDENT) {
            p.advance();
        } else {
            p.error("expected parameter name");
            p.close(pm, SyntaxKind::PARAM);
            break;
        }
        if p.eat(SyntaxKind::COLON) {
            parse_type(p);
        }
        p.close(pm, SyntaxKind::PARAM);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    p.expect(SyntaxKind::R_PAREN);
    p.close(m, SyntaxKind::PARAM_LIST);
}

// ── Classes & class-shaped declarations ──────────────────────────────

/// Shared parser for `class`, `context`, `supervisor`, and `flow`: a name,
/// optional generics, optional super list, and a member body.
fn class_like(p: &mut Parser, m: super::MarkOpened, kind: SyntaxKind) {
    p.advance(); // keyword
    name(p, "type");
    if p.at(SyntaxKind::LT) {
        type_param_list(p);
    }
    if p.at(SyntaxKind::COLON) {
        super_list(p);
    }
    type_body(p);
    p.close(m, kind);
}

fn super_list(p: &mut Parser) {
    let m = p.open();
    p.advance(); // :
    parse_type(p);
    while p.eat(SyntaxKind::COMMA) {
        parse_type(p);
    }
    p.close(m, SyntaxKind::SUPER_LIST);
}

/// `{ fields, methods, nested declarations }`
fn type_body(p: &mut Parser) {
    let open_span = p.current_span();
    if !p.eat(SyntaxKind::L_BRACE) {
        p.error("expected `{`");
        return;
    }
    members_until_rbrace(p, open_span);
}

fn members_until_rbrace(p: &mut Parser, open_span: Span) {
    loop {
        if p.at(SyntaxKind::R_BRACE) {
            p.advance();
            return;
        }
        if p.at_eof() {
            p.error_with_related(
                "expected `}` to close body",
                open_span,
                "body started here",
            );
            return;
        }
        if p.current().starts_decl() || p.at(SyntaxKind::LET_KW) {
            decl(p, true);
        } else {
            p.advance_with_error("expected member declaration");
        }
    }
}

/// `let [mut] name: Type [= expr];`
fn field_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // let
    p.eat(SyntaxKind::MUT_KW);
    name(p, "field");
    if p.eat(SyntaxKind::COLON) {
        parse_type(p);
    } else {
        p.error("expected `:` and field type");
    }
    if p.eat(SyntaxKind::EQ) {
        expr(p);
    }
    p.expect(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::FIELD_DECL);
}

// ── Interfaces ───────────────────────────────────────────────────────

fn interface_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // interface
    name(p, "interface");
    if p.at(SyntaxKind::LT) {
        type_param_list(p);
    }
    if p.at(SyntaxKind::COLON) {
        super_list(p);
    }
    type_body(p);
    p.close(m, SyntaxKind::INTERFACE_DECL);
}

// ── Enums & data types ───────────────────────────────────────────────

/// `enum Direction { North, South }`
fn enum_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // enum
    name(p, "enum");
    let open_span = p.current_span();
    p.expect(SyntaxKind::L_BRACE);
    loop {
        if p.at(SyntaxKind::R_BRACE) || p.at_eof() {
            break;
        }
        let vm = p.open();
        if p.at(SyntaxKind::TYPE_IDENT) {
            p.advance();
        } else {
            p.error("expected enum variant name");
            p.close(vm, SyntaxKind::ENUM_VARIANT);
            break;
        }
        p.close(vm, SyntaxKind::ENUM_VARIANT);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    if !p.eat(SyntaxKind::R_BRACE) {
        p.error_with_related("expected `}` to close enum", open_span, "enum body started here");
    }
    p.close(m, SyntaxKind::ENUM_DECL);
}

/// `data Shape { Circle(radius: Float), Rect(w: Float, h: Float) }`
fn data_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // data
    name(p, "data type");
    if p.at(SyntaxKind::LT) {
        type_param_list(p);
    }
    let open_span = p.current_span();
    p.expect(SyntaxKind::L_BRACE);
    loop {
        if p.at(SyntaxKind::R_BRACE) || p.at_eof() {
            break;
        }
        data_variant(p);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    if !p.eat(SyntaxKind::R_BRACE) {
        p.error_with_related("expected `}` to close data type", open_span, "body started here");
    }
    p.close(m, SyntaxKind::DATA_DECL);
}

fn data_variant(p: &mut Parser) {
    let m = p.open();
    if p.at(SyntaxKind::TYPE_IDENT) {
        let nm = p.open();
        p.advance();
        p.close(nm, SyntaxKind::NAME);
    } else {
        p.error("expected variant name");
        p.close(m, SyntaxKind::DATA_VARIANT);
        return;
    }
    if p.at(SyntaxKind::L_PAREN) {
        record_field_list(p, SyntaxKind::L_PAREN, SyntaxKind::R_PAREN);
    }
    p.close(m, SyntaxKind::DATA_VARIANT);
}

/// `(name: Type, name: Type)` or the brace-delimited equivalent.
fn record_field_list(p: &mut Parser, open: SyntaxKind, close: SyntaxKind) {
    let m = p.open();
    p.expect(open);
    loop {
        if p.at(close) || p.at_eof() {
            break;
        }
        let fm = p.open();
        if p.at(SyntaxKind::IDENT) {
            p.advance();
        } else {
            p.error("expected field name");
            p.close(fm, SyntaxKind::RECORD_FIELD);
            break;
        }
        p.expect(SyntaxKind::COLON);
        parse_type(p);
        p.close(fm, SyntaxKind::RECORD_FIELD);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    p.expect(close);
    p.close(m, SyntaxKind::RECORD_FIELD_LIST);
}

// ── Structs & sparks ─────────────────────────────────────────────────

/// `struct Point { x: Int, y: Int  fn dist() -> Float { … } }`
fn struct_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // struct
    name(p, "struct");
    if p.at(SyntaxKind::LT) {
        type_param_list(p);
    }
    let open_span = p.current_span();
    p.expect(SyntaxKind::L_BRACE);
    record_members(p, open_span, false);
    p.close(m, SyntaxKind::STRUCT_DECL);
}

/// `spark User { name: String  validate { … } before update { … }
/// after update { … } computed label: String { … } fn greet() { … } }`
fn spark_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // spark
    name(p, "spark");
    if p.at(SyntaxKind::LT) {
        type_param_list(p);
    }
    let open_span = p.current_span();
    p.expect(SyntaxKind::L_BRACE);
    record_members(p, open_span, true);
    p.close(m, SyntaxKind::SPARK_DECL);
}

/// Body shared by structs and sparks: bare `name: Type` fields mixed with
/// method declarations, plus the spark-only hook members.
fn record_members(p: &mut Parser, open_span: Span, spark: bool) {
    loop {
        match p.current() {
            SyntaxKind::R_BRACE => {
                p.advance();
                return;
            }
            SyntaxKind::EOF => {
                p.error_with_related("expected `}` to close body", open_span, "body started here");
                return;
            }
            SyntaxKind::IDENT if p.nth(1) == SyntaxKind::COLON => {
                let fm = p.open();
                p.advance(); // name
                p.advance(); // :
                parse_type(p);
                p.eat(SyntaxKind::COMMA);
                p.close(fm, SyntaxKind::RECORD_FIELD);
            }
            SyntaxKind::VALIDATE_KW if spark => {
                let vm = p.open();
                p.advance();
                block(p);
                p.close(vm, SyntaxKind::VALIDATE_BLOCK);
            }
            SyntaxKind::BEFORE_KW if spark => {
                let bm = p.open();
                p.advance();
                p.expect(SyntaxKind::UPDATE_KW);
                block(p);
                p.close(bm, SyntaxKind::BEFORE_UPDATE_BLOCK);
            }
            SyntaxKind::AFTER_KW if spark => {
                let am = p.open();
                p.advance();
                p.expect(SyntaxKind::UPDATE_KW);
                block(p);
                p.close(am, SyntaxKind::AFTER_UPDATE_BLOCK);
            }
            SyntaxKind::COMPUTED_KW if spark => {
                let cm = p.open();
                p.advance();
                name(p, "computed property");
                p.expect(SyntaxKind::COLON);
                parse_type(p);
                block(p);
                p.close(cm, SyntaxKind::COMPUTED_PROP);
            }
            k if k.starts_decl() => decl(p, true),
            _ => p.advance_with_error("expected field or member declaration"),
        }
    }
}

// ── Traits, protocols, impls ─────────────────────────────────────────

fn trait_like(p: &mut Parser, m: super::MarkOpened, kind: SyntaxKind) {
    p.advance(); // trait | protocol
    name(p, "trait");
    if p.at(SyntaxKind::LT) {
        type_param_list(p);
    }
    if p.at(SyntaxKind::COLON) {
        super_list(p);
    }
    type_body(p);
    p.close(m, kind);
}

/// `impl Trait for Type { … }` or inherent `impl Type { … }`.
fn impl_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // impl
    parse_type(p);
    if p.eat(SyntaxKind::FOR_KW) {
        parse_type(p);
    }
    type_body(p);
    p.close(m, SyntaxKind::IMPL_DECL);
}

// ── Type aliases, extends, macros, exceptions ────────────────────────

/// `type Meters = Float;`
fn type_alias_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // type
    name(p, "type alias");
    if p.at(SyntaxKind::LT) {
        type_param_list(p);
    }
    p.expect(SyntaxKind::EQ);
    parse_type(p);
    p.expect(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::TYPE_ALIAS_DECL);
}

/// `extend String { fn shout() -> String { … } }`
fn extend_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // extend
    parse_type(p);
    type_body(p);
    p.close(m, SyntaxKind::EXTEND_DECL);
}

/// `macro log(level, message) { … raw tokens … }` — the body is kept as raw
/// tokens; expansion is not the core's concern.
fn macro_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // macro
    name(p, "macro");
    if p.at(SyntaxKind::L_PAREN) {
        let pm = p.open();
        p.advance(); // (
        while !p.at(SyntaxKind::R_PAREN) && !p.at_eof() {
            if p.at(SyntaxKind::IDENT) {
                let im = p.open();
                p.advance();
                p.close(im, SyntaxKind::PARAM);
            } else {
                p.error("expected macro parameter name");
                break;
            }
            if !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        p.expect(SyntaxKind::R_PAREN);
        p.close(pm, SyntaxKind::PARAM_LIST);
    }
    let bm = p.open();
    let open_span = p.current_span();
    if p.eat(SyntaxKind::L_BRACE) {
        let mut depth = 1u32;
        while depth > 0 {
            match p.current() {
                SyntaxKind::L_BRACE => depth += 1,
                SyntaxKind::R_BRACE => depth -= 1,
                SyntaxKind::EOF => {
                    p.error_with_related(
                        "expected `}` to close macro body",
                        open_span,
                        "macro body started here",
                    );
                    break;
                }
                _ => {}
            }
            if !p.at_eof() {
                p.advance();
            }
        }
    } else {
        p.error("expected `{` to open macro body");
    }
    p.close(bm, SyntaxKind::MACRO_BODY);
    p.close(m, SyntaxKind::MACRO_DECL);
}

/// `exception NotFound(message: String) : AppError;`
fn exception_decl(p: &mut Parser, m: super::MarkOpened) {
    p.advance(); // exception
    name(p, "exception");
    if p.at(SyntaxKind::L_PAREN) {
        record_field_list(p, SyntaxKind::L_PAREN, SyntaxKind::R_PAREN);
    }
    if p.at(SyntaxKind::COLON) {
        super_list(p);
    }
    p.expect(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::EXCEPTION_DECL);
}
