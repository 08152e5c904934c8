//! Type expression parsers for Flylang.
//!
//! Grammar, loosest to tightest: union (`A | B`), intersection (`A & B`),
//! optional suffix (`T?`), then primary types: named types with generic
//! arguments, `[T]` arrays, `[K: V]` maps, `&T`/`&mut T` references,
//! `(A, B) -> C` function types, and `(A, B)` tuples.

use crate::syntax_kind::SyntaxKind;

use super::{MarkClosed, Parser};

/// Parse a type expression.
pub(crate) fn parse_type(p: &mut Parser) {
    union_type(p);
}

fn union_type(p: &mut Parser) {
    let first = intersection_type(p);
    if p.at(SyntaxKind::PIPE) {
        let Some(first) = first else { return };
        let m = p.open_before(first);
        while p.eat(SyntaxKind::PIPE) {
            if intersection_type(p).is_none() {
                break;
            }
        }
        p.close(m, SyntaxKind::UNION_TYPE);
    }
}

fn intersection_type(p: &mut Parser) -> Option<MarkClosed> {
    let first = optional_type(p);
    if p.at(SyntaxKind::AMP) {
        let first = first?;
        let m = p.open_before(first);
        while p.eat(SyntaxKind::AMP) {
            if optional_type(p).is_none() {
                break;
            }
        }
        return Some(p.close(m, SyntaxKind::INTERSECTION_TYPE));
    }
    first
}

/// A primary type with any number of `?` suffixes.
fn optional_type(p: &mut Parser) -> Option<MarkClosed> {
    let mut ty = primary_type(p)?;
    while p.at(SyntaxKind::QUESTION) {
        let m = p.open_before(ty);
        p.advance(); // ?
        ty = p.close(m, SyntaxKind::OPTIONAL_TYPE);
    }
    Some(ty)
}

fn primary_type(p: &mut Parser) -> Option<MarkClosed> {
    use SyntaxKind::*;
    let closed = match p.current() {
        TYPE_IDENT | IDENT => named_type(p),
        L_BRACKET => {
            // `[T]` array or `[K: V]` map.
            let m = p.open();
            p.advance(); // [
            parse_type(p);
            if p.eat(COLON) {
                parse_type(p);
                p.expect(R_BRACKET);
                p.close(m, MAP_TYPE)
            } else {
                p.expect(R_BRACKET);
                p.close(m, ARRAY_TYPE)
            }
        }
        AMP => {
            let m = p.open();
            p.advance(); // &
            p.eat(MUT_KW);
            primary_type(p);
            p.close(m, REF_TYPE)
        }
        L_PAREN => paren_type(p),
        _ => {
            p.error("expected type");
            return None;
        }
    };
    Some(closed)
}

/// `a::b::Name<Args>` — a dotted path with optional generic arguments.
fn named_type(p: &mut Parser) -> MarkClosed {
    use SyntaxKind::*;
    let m = p.open();

    let pm = p.open();
    p.advance(); // first segment
    while p.at(COLON_COLON) && matches!(p.nth(1), IDENT | TYPE_IDENT) {
        p.advance(); // ::
        p.advance(); // segment
    }
    p.close(pm, PATH);

    if p.at(LT) {
        generic_arg_list(p);
    }
    p.close(m, NAMED_TYPE)
}

fn generic_arg_list(p: &mut Parser) {
    let m = p.open();
    p.advance(); // <
    loop {
        if p.at(SyntaxKind::GT) || p.at_eof() {
            break;
        }
        parse_type(p);
        if p.has_error() {
            break;
        }
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    p.expect(SyntaxKind::GT);
    p.close(m, SyntaxKind::GENERIC_ARG_LIST);
}

/// `(A, B) -> C` function type, `(A, B)` tuple type, `(A)` grouping, or
/// `() -> T` for a nullary function.
fn paren_type(p: &mut Parser) -> MarkClosed {
    use SyntaxKind::*;
    let m = p.open();

    let pm = p.open();
    p.advance(); // (
    while !p.at(R_PAREN) && !p.at_eof() {
        parse_type(p);
        if p.has_error() {
            break;
        }
        if !p.eat(COMMA) {
            break;
        }
    }
    p.expect(R_PAREN);
    p.close(pm, FN_TYPE_PARAMS);

    if p.at(ARROW) {
        p.advance(); // ->
        parse_type(p);
        return p.close(m, FN_TYPE);
    }
    p.close(m, TUPLE_TYPE)
}
