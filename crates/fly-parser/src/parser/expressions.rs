//! Pratt expression parser for Flylang.
//!
//! Implements operator precedence parsing using binding power tables, from
//! assignment at the bottom through logical, coalescing, comparison,
//! bitwise, shift, range, arithmetic, and power operators, up to the postfix
//! tier (call/index/field/safe-field/await/unwrap/force-unwrap) and primary
//! expressions. Also parses blocks and statements.
//!
//! Struct literals (`Point { x: 1 }`) are only recognized after a
//! type-identifier path, and are suppressed inside `if`/`while`/`for`/
//! `match` headers where a `{` always opens the body block.

use crate::syntax_kind::SyntaxKind;

use super::patterns::parse_pattern;
use super::types::parse_type;
use super::{MarkClosed, Parser};

// ── Binding power tables ───────────────────────────────────────────────

/// Returns (left_bp, right_bp) for infix operators.
///
/// Left < right means left-associative (the usual case); left > right means
/// right-associative (assignment and power).
fn infix_binding_power(op: SyntaxKind) -> Option<(u8, u8)> {
    use SyntaxKind::*;
    match op {
        // Assignment & compound assignment: right-associative, lowest.
        EQ | PLUS_EQ | MINUS_EQ | STAR_EQ | SLASH_EQ | PERCENT_EQ => Some((2, 1)),

        // Logical OR / AND.
        PIPE_PIPE => Some((5, 6)),
        AMP_AMP => Some((7, 8)),

        // Coalesce `??` and elvis `?:`.
        QUESTION_QUESTION | QUESTION_COLON => Some((9, 10)),

        // Comparison.
        EQ_EQ | NOT_EQ | LT | GT | LT_EQ | GT_EQ => Some((11, 12)),

        // Bitwise OR / XOR / AND.
        PIPE => Some((13, 14)),
        CARET => Some((15, 16)),
        AMP => Some((17, 18)),

        // Range.
        DOT_DOT | DOT_DOT_EQ => Some((21, 22)),

        // Additive.
        PLUS | MINUS => Some((23, 24)),

        // Multiplicative.
        STAR | SLASH | PERCENT => Some((25, 26)),

        // Power: right-associative.
        STAR_STAR => Some((30, 29)),

        _ => None,
    }
}

/// Shift operators are parsed from two adjacent angle tokens; this is their
/// slot between bitwise-and and range.
const SHIFT_BP: (u8, u8) = (19, 20);

fn prefix_binding_power(op: SyntaxKind) -> Option<((), u8)> {
    match op {
        SyntaxKind::MINUS | SyntaxKind::BANG => Some(((), 27)),
        _ => None,
    }
}

/// `as` / `is` bind tighter than unary, looser than postfix.
const CAST_BP: u8 = 31;

/// Postfix operations (call, index, field access, `.await`, `?`, `!!`).
const POSTFIX_BP: u8 = 33;

// ── Entry points ───────────────────────────────────────────────────────

/// Parse an expression at the lowest binding power.
pub(crate) fn expr(p: &mut Parser) {
    expr_bp(p, 0, true);
}

/// Parse an expression where a bare `{` must not start a struct literal
/// (`if`/`while`/`for` headers and `match` scrutinees).
pub(crate) fn expr_no_struct(p: &mut Parser) {
    expr_bp(p, 0, false);
}

struct Lhs {
    mark: MarkClosed,
    /// True when the expression is a path ending in a type identifier, i.e.
    /// a legal struct-literal head.
    type_path: bool,
}

fn expr_bp(p: &mut Parser, min_bp: u8, allow_struct: bool) -> Option<MarkClosed> {
    let mut lhs = lhs(p, allow_struct)?;

    loop {
        if p.has_error() {
            break;
        }

        let current = p.current();

        // ── Postfix: struct literal ──
        if current == SyntaxKind::L_BRACE
            && allow_struct
            && lhs.type_path
            && POSTFIX_BP >= min_bp
        {
            let m = p.open_before(lhs.mark);
            struct_literal_body(p);
            lhs = Lhs {
                mark: p.close(m, SyntaxKind::STRUCT_LITERAL),
                type_path: false,
            };
            continue;
        }

        // ── Postfix: call ──
        if current == SyntaxKind::L_PAREN && POSTFIX_BP >= min_bp {
            let m = p.open_before(lhs.mark);
            arg_list(p);
            lhs = Lhs {
                mark: p.close(m, SyntaxKind::CALL_EXPR),
                type_path: false,
            };
            continue;
        }

        // ── Postfix: index ──
        if current == SyntaxKind::L_BRACKET && POSTFIX_BP >= min_bp {
            let m = p.open_before(lhs.mark);
            p.advance(); // [
            expr_bp(p, 0, true);
            p.expect(SyntaxKind::R_BRACKET);
            lhs = Lhs {
                mark: p.close(m, SyntaxKind::INDEX_EXPR),
                type_path: false,
            };
            continue;
        }

        // ── Postfix: field access / `.await` ──
        if current == SyntaxKind::DOT && POSTFIX_BP >= min_bp {
            let m = p.open_before(lhs.mark);
            p.advance(); // .
            if p.at(SyntaxKind::AWAIT_KW) {
                p.advance();
                lhs = Lhs {
                    mark: p.close(m, SyntaxKind::AWAIT_EXPR),
                    type_path: false,
                };
            } else {
                if !p.eat(SyntaxKind::IDENT) && !p.eat(SyntaxKind::TYPE_IDENT) {
                    p.error("expected field or method name after `.`");
                }
                lhs = Lhs {
                    mark: p.close(m, SyntaxKind::FIELD_ACCESS),
                    type_path: false,
                };
            }
            continue;
        }

        // ── Postfix: safe access `?.` ──
        if current == SyntaxKind::QUESTION_DOT && POSTFIX_BP >= min_bp {
            let m = p.open_before(lhs.mark);
            p.advance(); // ?.
            if !p.eat(SyntaxKind::IDENT) {
                p.error("expected field or method name after `?.`");
            }
            lhs = Lhs {
                mark: p.close(m, SyntaxKind::SAFE_ACCESS),
                type_path: false,
            };
            continue;
        }

        // ── Postfix: unwrap `?` and force-unwrap `!!` ──
        if current == SyntaxKind::QUESTION && POSTFIX_BP >= min_bp {
            let m = p.open_before(lhs.mark);
            p.advance();
            lhs = Lhs {
                mark: p.close(m, SyntaxKind::UNWRAP_EXPR),
                type_path: false,
            };
            continue;
        }
        if current == SyntaxKind::BANG_BANG && POSTFIX_BP >= min_bp {
            let m = p.open_before(lhs.mark);
            p.advance();
            lhs = Lhs {
                mark: p.close(m, SyntaxKind::FORCE_UNWRAP_EXPR),
                type_path: false,
            };
            continue;
        }

        // ── Cast / type check ──
        if (current == SyntaxKind::AS_KW || current == SyntaxKind::IS_KW) && CAST_BP >= min_bp {
            let kind = if current == SyntaxKind::AS_KW {
                SyntaxKind::CAST_EXPR
            } else {
                SyntaxKind::TYPE_CHECK_EXPR
            };
            let m = p.open_before(lhs.mark);
            p.advance(); // as | is
            parse_type(p);
            lhs = Lhs {
                mark: p.close(m, kind),
                type_path: false,
            };
            continue;
        }

        // ── Shift: two adjacent angle tokens ──
        if (p.at_adjacent(SyntaxKind::LT, SyntaxKind::LT)
            || p.at_adjacent(SyntaxKind::GT, SyntaxKind::GT))
            && SHIFT_BP.0 >= min_bp
        {
            let m = p.open_before(lhs.mark);
            p.advance(); // first angle
            p.advance(); // second angle
            expr_bp(p, SHIFT_BP.1, allow_struct);
            lhs = Lhs {
                mark: p.close(m, SyntaxKind::BINARY_EXPR),
                type_path: false,
            };
            continue;
        }

        // ── Infix operators ──
        if let Some((l_bp, r_bp)) = infix_binding_power(current) {
            if l_bp < min_bp {
                break;
            }

            let m = p.open_before(lhs.mark);
            p.advance(); // operator
            expr_bp(p, r_bp, allow_struct);

            let kind = match current {
                SyntaxKind::DOT_DOT | SyntaxKind::DOT_DOT_EQ => SyntaxKind::RANGE_EXPR,
                _ => SyntaxKind::BINARY_EXPR,
            };
            lhs = Lhs {
                mark: p.close(m, kind),
                type_path: false,
            };
            continue;
        }

        break;
    }

    Some(lhs.mark)
}

// ── LHS: prefix and primary expressions ────────────────────────────────

fn lhs(p: &mut Parser, allow_struct: bool) -> Option<Lhs> {
    use SyntaxKind::*;

    if let Some(((), r_bp)) = prefix_binding_power(p.current()) {
        let m = p.open();
        p.advance(); // operator
        expr_bp(p, r_bp, allow_struct);
        return Some(Lhs {
            mark: p.close(m, UNARY_EXPR),
            type_path: false,
        });
    }

    let mark = match p.current() {
        INT_LIT | FLOAT_LIT | STRING_LIT | CHAR_LIT | TRUE_KW | FALSE_KW | NONE_KW => {
            let m = p.open();
            p.advance();
            p.close(m, LITERAL)
        }
        INTERP_STRING_LIT => {
            let m = p.open();
            p.advance();
            p.close(m, INTERP_STRING_EXPR)
        }
        SELF_KW => {
            let m = p.open();
            p.advance();
            p.close(m, SELF_EXPR)
        }
        IDENT | TYPE_IDENT => {
            let m = p.open();
            let mut last = p.current();
            p.advance();
            while p.at(COLON_COLON)
                && matches!(p.nth(1), IDENT | TYPE_IDENT)
            {
                p.advance(); // ::
                last = p.current();
                p.advance();
            }
            let mark = p.close(m, PATH_EXPR);
            return Some(Lhs {
                mark,
                type_path: last == TYPE_IDENT,
            });
        }
        L_PAREN => paren_or_tuple(p),
        L_BRACKET => array_or_map_literal(p),
        L_BRACE => block(p),
        IF_KW => if_expr(p),
        MATCH_KW => match_expr(p),
        WHILE_KW => while_expr(p),
        FOR_KW => for_expr(p),
        TRY_KW => try_expr(p),
        THROW_KW => {
            let m = p.open();
            p.advance();
            expr_bp(p, 0, allow_struct);
            p.close(m, THROW_EXPR)
        }
        RETURN_KW => {
            let m = p.open();
            p.advance();
            if !p.at_any(&[SEMICOLON, R_BRACE, R_PAREN, R_BRACKET, COMMA, EOF]) {
                expr_bp(p, 0, allow_struct);
            }
            p.close(m, RETURN_EXPR)
        }
        BREAK_KW => {
            let m = p.open();
            p.advance();
            p.close(m, BREAK_EXPR)
        }
        CONTINUE_KW => {
            let m = p.open();
            p.advance();
            p.close(m, CONTINUE_EXPR)
        }
        CONCURRENT_KW => concurrent_expr(p),
        RACE_KW => race_expr(p),
        TIMEOUT_KW => timeout_expr(p),
        WITH_KW => with_expr(p),
        NEW_KW => {
            let m = p.open();
            p.advance(); // new
            parse_type(p);
            if p.at(L_PAREN) {
                arg_list(p);
            } else {
                p.error("expected `(` after `new` type");
            }
            p.close(m, NEW_EXPR)
        }
        PIPE | PIPE_PIPE => lambda_expr(p),
        _ => {
            p.error("expected expression");
            return None;
        }
    };

    Some(Lhs {
        mark,
        type_path: false,
    })
}

// ── Grouping, collections ──────────────────────────────────────────────

/// `(a)`, `()`, `(a, b)`
fn paren_or_tuple(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // (
    if p.eat(SyntaxKind::R_PAREN) {
        return p.close(m, SyntaxKind::TUPLE_EXPR);
    }
    expr_bp(p, 0, true);
    let mut tuple = false;
    while p.eat(SyntaxKind::COMMA) {
        tuple = true;
        if p.at(SyntaxKind::R_PAREN) {
            break;
        }
        expr_bp(p, 0, true);
    }
    p.expect(SyntaxKind::R_PAREN);
    p.close(
        m,
        if tuple {
            SyntaxKind::TUPLE_EXPR
        } else {
            SyntaxKind::PAREN_EXPR
        },
    )
}

/// `[1, 2, 3]`, `[]`, `["k": v]`, `[:]`
fn array_or_map_literal(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // [

    // Empty map `[:]`.
    if p.at(SyntaxKind::COLON) && p.nth(1) == SyntaxKind::R_BRACKET {
        p.advance(); // :
        p.advance(); // ]
        return p.close(m, SyntaxKind::MAP_LITERAL);
    }
    // Empty array `[]`.
    if p.eat(SyntaxKind::R_BRACKET) {
        return p.close(m, SyntaxKind::ARRAY_LITERAL);
    }

    let first = p.open();
    expr_bp(p, 0, true);

    if p.at(SyntaxKind::COLON) {
        // Map literal: re-tag the first expression as a map entry.
        p.advance(); // :
        expr_bp(p, 0, true);
        p.close(first, SyntaxKind::MAP_ENTRY);
        while p.eat(SyntaxKind::COMMA) {
            if p.at(SyntaxKind::R_BRACKET) {
                break;
            }
            let em = p.open();
            expr_bp(p, 0, true);
            p.expect(SyntaxKind::COLON);
            expr_bp(p, 0, true);
            p.close(em, SyntaxKind::MAP_ENTRY);
        }
        p.expect(SyntaxKind::R_BRACKET);
        return p.close(m, SyntaxKind::MAP_LITERAL);
    }

    // Array literal; the speculative first mark closes as a plain wrapper.
    p.close(first, SyntaxKind::PAREN_EXPR);
    while p.eat(SyntaxKind::COMMA) {
        if p.at(SyntaxKind::R_BRACKET) {
            break;
        }
        expr_bp(p, 0, true);
    }
    p.expect(SyntaxKind::R_BRACKET);
    p.close(m, SyntaxKind::ARRAY_LITERAL)
}

/// `Point { x: 1, y: 2 }` body — the head path is already parsed.
fn struct_literal_body(p: &mut Parser) {
    p.advance(); // {
    while !p.at(SyntaxKind::R_BRACE) && !p.at_eof() {
        let fm = p.open();
        if p.at(SyntaxKind::IDENT) {
            p.advance();
        } else {
            p.error("expected field name");
            p.close(fm, SyntaxKind::STRUCT_LIT_FIELD);
            break;
        }
        p.expect(SyntaxKind::COLON);
        expr_bp(p, 0, true);
        p.close(fm, SyntaxKind::STRUCT_LIT_FIELD);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    p.expect(SyntaxKind::R_BRACE);
}

fn arg_list(p: &mut Parser) {
    let m = p.open();
    p.advance(); // (
    while !p.at(SyntaxKind::R_PAREN) && !p.at_eof() {
        expr_bp(p, 0, true);
        if !p.eat(SyntaxKind::COMMA) {
            break;
        }
    }
    p.expect(SyntaxKind::R_PAREN);
    p.close(m, SyntaxKind::ARG_LIST);
}

// ── Blocks & statements ────────────────────────────────────────────────

/// Kinds that may stand as a statement without a trailing `;`.
fn is_block_like(kind: SyntaxKind) -> bool {
    use SyntaxKind::*;
    matches!(
        kind,
        BLOCK | IF_EXPR | MATCH_EXPR | WHILE_EXPR | FOR_EXPR | TRY_EXPR | CONCURRENT_EXPR
            | RACE_EXPR | TIMEOUT_EXPR | WITH_EXPR
    )
}

/// Parse `{ stmt* tail-expr? }` into a BLOCK node.
pub(crate) fn block(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    let open_span = p.current_span();
    if !p.eat(SyntaxKind::L_BRACE) {
        p.error("expected `{`");
        return p.close(m, SyntaxKind::BLOCK);
    }

    loop {
        match p.current() {
            SyntaxKind::R_BRACE => {
                p.advance();
                break;
            }
            SyntaxKind::EOF => {
                p.error_with_related(
                    "expected `}` to close block",
                    open_span,
                    "block started here",
                );
                break;
            }
            SyntaxKind::DOC_COMMENT | SyntaxKind::SEMICOLON => {
                p.advance();
            }
            SyntaxKind::LET_KW => let_stmt(p),
            // A declaration keyword inside a block means the closing `}` went
            // missing; hand control back to the declaration level.
            k if matches!(
                k,
                SyntaxKind::FN_KW
                    | SyntaxKind::PUB_KW
                    | SyntaxKind::CLASS_KW
                    | SyntaxKind::INTERFACE_KW
                    | SyntaxKind::ENUM_KW
                    | SyntaxKind::DATA_KW
                    | SyntaxKind::STRUCT_KW
                    | SyntaxKind::SPARK_KW
                    | SyntaxKind::TRAIT_KW
                    | SyntaxKind::IMPL_KW
                    | SyntaxKind::EXCEPTION_KW
            ) =>
            {
                p.error_with_related(
                    "expected `}` to close block",
                    open_span,
                    "block started here",
                );
                break;
            }
            _ => {
                let before = p.current_span();
                let closed = expr_bp(p, 0, true);
                match closed {
                    Some(mark) => {
                        if p.at(SyntaxKind::SEMICOLON) {
                            let sm = p.open_before(mark);
                            p.advance(); // ;
                            p.close(sm, SyntaxKind::EXPR_STMT);
                        }
                        // Otherwise: either the block's tail expression, or a
                        // block-like statement that needs no semicolon. The
                        // AST builder sorts tail from statement by position.
                    }
                    None => {
                        // `lhs` failed; guarantee progress.
                        if p.current_span() == before {
                            p.advance_with_error("expected statement");
                        }
                    }
                }
            }
        }
    }

    p.close(m, SyntaxKind::BLOCK)
}

/// `let [mut] pattern [: Type] [= expr];`
fn let_stmt(p: &mut Parser) {
    let m = p.open();
    p.advance(); // let
    p.eat(SyntaxKind::MUT_KW);
    parse_pattern(p);
    if p.eat(SyntaxKind::COLON) {
        parse_type(p);
    }
    if p.eat(SyntaxKind::EQ) {
        expr(p);
    }
    p.expect(SyntaxKind::SEMICOLON);
    p.close(m, SyntaxKind::LET_STMT);
}

// ── Control flow ───────────────────────────────────────────────────────

/// `if cond { } else if { } else { }` with optional `if let pat = expr`.
fn if_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // if
    condition(p);
    block(p);
    if p.eat(SyntaxKind::ELSE_KW) {
        if p.at(SyntaxKind::IF_KW) {
            if_expr(p);
        } else {
            block(p);
        }
    }
    p.close(m, SyntaxKind::IF_EXPR)
}

fn condition(p: &mut Parser) {
    if p.at(SyntaxKind::LET_KW) {
        let m = p.open();
        p.advance(); // let
        parse_pattern(p);
        p.expect(SyntaxKind::EQ);
        expr_no_struct(p);
        p.close(m, SyntaxKind::LET_CONDITION);
    } else {
        expr_no_struct(p);
    }
}

fn while_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // while
    condition(p);
    block(p);
    p.close(m, SyntaxKind::WHILE_EXPR)
}

fn for_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // for
    parse_pattern(p);
    p.expect(SyntaxKind::IN_KW);
    expr_no_struct(p);
    block(p);
    p.close(m, SyntaxKind::FOR_EXPR)
}

/// `match scrutinee { pat [when guard] => expr, … }`
fn match_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // match
    expr_no_struct(p);

    let lm = p.open();
    let open_span = p.current_span();
    p.expect(SyntaxKind::L_BRACE);
    loop {
        if p.at(SyntaxKind::R_BRACE) {
            p.advance();
            break;
        }
        if p.at_eof() {
            p.error_with_related(
                "expected `}` to close match",
                open_span,
                "match body started here",
            );
            break;
        }
        match_arm(p);
        if p.has_error() {
            break;
        }
        p.eat(SyntaxKind::COMMA);
    }
    p.close(lm, SyntaxKind::MATCH_ARM_LIST);

    p.close(m, SyntaxKind::MATCH_EXPR)
}

fn match_arm(p: &mut Parser) {
    let m = p.open();
    parse_pattern(p);
    if p.at(SyntaxKind::WHEN_KW) {
        let gm = p.open();
        p.advance(); // when
        expr(p);
        p.close(gm, SyntaxKind::GUARD_CLAUSE);
    }
    p.expect(SyntaxKind::FAT_ARROW);
    expr(p);
    p.close(m, SyntaxKind::MATCH_ARM);
}

/// `try { } catch (pat) { } … finally { }`
fn try_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // try
    block(p);
    while p.at(SyntaxKind::CATCH_KW) {
        let cm = p.open();
        p.advance(); // catch
        p.expect(SyntaxKind::L_PAREN);
        parse_pattern(p);
        p.expect(SyntaxKind::R_PAREN);
        block(p);
        p.close(cm, SyntaxKind::CATCH_CLAUSE);
    }
    if p.at(SyntaxKind::FINALLY_KW) {
        let fm = p.open();
        p.advance(); // finally
        block(p);
        p.close(fm, SyntaxKind::FINALLY_CLAUSE);
    }
    p.close(m, SyntaxKind::TRY_EXPR)
}

// ── Concurrency constructs ─────────────────────────────────────────────

/// `concurrent { let a = f().await, let b = g().await }`
fn concurrent_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // concurrent
    let open_span = p.current_span();
    p.expect(SyntaxKind::L_BRACE);
    loop {
        if p.at(SyntaxKind::R_BRACE) {
            p.advance();
            break;
        }
        if p.at_eof() {
            p.error_with_related(
                "expected `}` to close concurrent block",
                open_span,
                "concurrent block started here",
            );
            break;
        }
        let bm = p.open();
        if p.eat(SyntaxKind::LET_KW) {
            if p.at(SyntaxKind::IDENT) {
                let nm = p.open();
                p.advance();
                p.close(nm, SyntaxKind::NAME);
            } else {
                p.error("expected binding name");
            }
            p.expect(SyntaxKind::EQ);
            expr(p);
        } else {
            p.error("expected `let` binding in concurrent block");
        }
        p.close(bm, SyntaxKind::CONCURRENT_BINDING);
        if p.has_error() {
            break;
        }
        if !p.eat(SyntaxKind::COMMA) {
            p.expect(SyntaxKind::R_BRACE);
            break;
        }
    }
    p.close(m, SyntaxKind::CONCURRENT_EXPR)
}

/// `race { e1; e2; e3 }`
fn race_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // race
    let open_span = p.current_span();
    p.expect(SyntaxKind::L_BRACE);
    loop {
        if p.at(SyntaxKind::R_BRACE) {
            p.advance();
            break;
        }
        if p.at_eof() {
            p.error_with_related(
                "expected `}` to close race block",
                open_span,
                "race block started here",
            );
            break;
        }
        expr(p);
        if p.has_error() {
            break;
        }
        p.eat(SyntaxKind::SEMICOLON);
    }
    p.close(m, SyntaxKind::RACE_EXPR)
}

/// `timeout(duration) { body }`
fn timeout_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // timeout
    p.expect(SyntaxKind::L_PAREN);
    expr(p);
    p.expect(SyntaxKind::R_PAREN);
    block(p);
    p.close(m, SyntaxKind::TIMEOUT_EXPR)
}

/// `with (a, b) { body }`
fn with_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();
    p.advance(); // with
    if p.at(SyntaxKind::L_PAREN) {
        arg_list(p);
    }
    block(p);
    p.close(m, SyntaxKind::WITH_EXPR)
}

// ── Lambdas ────────────────────────────────────────────────────────────

/// `|x, y| expr`, `|x: Int| -> Int { … }`, `|| expr`
fn lambda_expr(p: &mut Parser) -> MarkClosed {
    let m = p.open();

    let pm = p.open();
    if p.at(SyntaxKind::PIPE_PIPE) {
        p.advance(); // `||` — empty parameter list
    } else {
        p.advance(); // |
        while !p.at(SyntaxKind::PIPE) && !p.at_eof() {
            let prm = p.open();
            if p.at(SyntaxKind::IDENT) {
                p.advance();
            } else {
                p.error("expected lambda parameter name");
                p.close(prm, SyntaxKind::PARAM);
                break;
            }
            if p.eat(SyntaxKind::COLON) {
                parse_type(p);
            }
            p.close(prm, SyntaxKind::PARAM);
            if !p.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        p.expect(SyntaxKind::PIPE);
    }
    p.close(pm, SyntaxKind::LAMBDA_PARAM_LIST);

    if p.at(SyntaxKind::ARROW) {
        let rm = p.open();
        p.advance(); // ->
        parse_type(p);
        p.close(rm, SyntaxKind::RETURN_TYPE);
    }

    expr_bp(p, 0, true);
    p.close(m, SyntaxKind::LAMBDA_EXPR)
}
