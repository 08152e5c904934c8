//! Pattern parsers for Flylang.
//!
//! Patterns appear in `let` bindings, `match` arms, `if let`/`while let`
//! conditions, `for` bindings, and `catch` clauses. Or-patterns (`a | b`)
//! bind loosest; everything else is a primary pattern.

use crate::syntax_kind::SyntaxKind;

use super::types::parse_type;
use super::{MarkClosed, Parser};

/// Parse a pattern, including `|` alternatives.
pub(crate) fn parse_pattern(p: &mut Parser) {
    let first = primary_pattern(p);
    if p.at(SyntaxKind::PIPE) {
        let Some(first) = first else { return };
        let m = p.open_before(first);
        while p.eat(SyntaxKind::PIPE) {
            primary_pattern(p);
            if p.has_error() {
                break;
            }
        }
        p.close(m, SyntaxKind::OR_PAT);
    }
}

fn primary_pattern(p: &mut Parser) -> Option<MarkClosed> {
    use SyntaxKind::*;
    let closed = match p.current() {
        UNDERSCORE => {
            let m = p.open();
            p.advance();
            p.close(m, WILDCARD_PAT)
        }
        INT_LIT | FLOAT_LIT | STRING_LIT | CHAR_LIT | TRUE_KW | FALSE_KW | NONE_KW | MINUS => {
            literal_or_range_pattern(p)
        }
        MUT_KW => {
            let m = p.open();
            p.advance(); // mut
            if !p.eat(IDENT) {
                p.error("expected binding name after `mut`");
            }
            if p.eat(COLON) {
                parse_type(p);
            }
            p.close(m, BINDING_PAT)
        }
        IDENT => {
            let m = p.open();
            p.advance();
            if p.eat(COLON) {
                parse_type(p);
            }
            p.close(m, BINDING_PAT)
        }
        TYPE_IDENT => constructor_pattern(p),
        L_PAREN => {
            let m = p.open();
            p.advance(); // (
            while !p.at(R_PAREN) && !p.at_eof() {
                parse_pattern(p);
                if !p.eat(COMMA) {
                    break;
                }
            }
            p.expect(R_PAREN);
            p.close(m, TUPLE_PAT)
        }
        L_BRACKET => array_pattern(p),
        _ => {
            p.error("expected pattern");
            return None;
        }
    };
    Some(closed)
}

/// A literal, possibly extended into a range pattern: `1..10`, `'a'..='z'`.
fn literal_or_range_pattern(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    literal_token(p);
    if p.at(SyntaxKind::DOT_DOT) || p.at(SyntaxKind::DOT_DOT_EQ) {
        p.advance(); // .. | ..=
        literal_token(p);
        return p.close(m, SyntaxKind::RANGE_PAT);
    }
    p.close(m, SyntaxKind::LITERAL_PAT)
}

fn literal_token(p: &mut Parser) {
    use SyntaxKind::*;
    // A leading minus negates a numeric literal.
    if p.at(MINUS) {
        p.advance();
    }
    if p.at_any(&[INT_LIT, FLOAT_LIT, STRING_LIT, CHAR_LIT, TRUE_KW, FALSE_KW, NONE_KW]) {
        p.advance();
    } else {
        p.error("expected literal");
    }
}

/// `Color::Red`, `Circle(r)`, `Point { x, y: py, .. }`
fn constructor_pattern(p: &mut Parser) -> MarkClosed {
    use SyntaxKind::*;
    let m = p.open();

    let pm = p.open();
    p.advance(); // first segment
    while p.at(COLON_COLON) && matches!(p.nth(1), IDENT | TYPE_IDENT) {
        p.advance(); // ::
        p.advance(); // segment
    }
    p.close(pm, PATH);

    match p.current() {
        L_PAREN => {
            p.advance(); // (
            while !p.at(R_PAREN) && !p.at_eof() {
                parse_pattern(p);
                if !p.eat(COMMA) {
                    break;
                }
            }
            p.expect(R_PAREN);
            p.close(m, TUPLE_STRUCT_PAT)
        }
        L_BRACE => {
            p.advance(); // {
            while !p.at(R_BRACE) && !p.at_eof() {
                if p.at(DOT_DOT) {
                    let rm = p.open();
                    p.advance();
                    p.close(rm, REST_PAT);
                    break;
                }
                let fm = p.open();
                if !p.eat(IDENT) {
                    p.error("expected field name in struct pattern");
                    p.close(fm, STRUCT_PAT_FIELD);
                    break;
                }
                if p.eat(COLON) {
                    parse_pattern(p);
                }
                p.close(fm, STRUCT_PAT_FIELD);
                if !p.eat(COMMA) {
                    break;
                }
            }
            p.expect(R_BRACE);
            p.close(m, STRUCT_PAT)
        }
        // Bare constructor: a unit variant like `Red`.
        _ => p.close(m, TUPLE_STRUCT_PAT),
    }
}

/// `[first, second, ..rest]` — the rest marker may bind a name.
fn array_pattern(p: &mut Parser) -> MarkClosed {
    use SyntaxKind::*;
    let m = p.open();
    p.advance(); // [
    while !p.at(R_BRACKET) && !p.at_eof() {
        if p.at(DOT_DOT) {
            let rm = p.open();
            p.advance(); // ..
            p.eat(IDENT);
            p.close(rm, REST_PAT);
        } else {
            parse_pattern(p);
        }
        if !p.eat(COMMA) {
            break;
        }
    }
    p.expect(R_BRACKET);
    p.close(m, ARRAY_PAT)
}
