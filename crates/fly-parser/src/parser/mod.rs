//! The event-driven parser core.
//!
//! Grammar functions drive a token cursor and record a flat list of events
//! (`Open`, `Close`, `Advance`); the events are then replayed into a rowan
//! green tree. `open_before` lets postfix/infix parsers wrap an
//! already-closed left-hand side, which is what makes Pratt parsing mesh
//! with the event model.
//!
//! Errors never abort the parse: the parser records a [`ParseError`],
//! optionally wraps the offending token in an `ERROR_NODE`, and continues at
//! the next plausible boundary (declaration keywords, `;`, `}`).

use fly_common::span::Span;
use fly_common::token::{Token, TokenKind};
use rowan::GreenNodeBuilder;

use crate::cst::SyntaxNode;
use crate::error::ParseError;
use crate::syntax_kind::SyntaxKind;

pub(crate) mod expressions;
pub(crate) mod items;
pub(crate) mod patterns;
pub(crate) mod types;

/// Result of parsing one source file: the green tree plus accumulated errors.
#[derive(Debug, Clone)]
pub struct Parse {
    green: rowan::GreenNode,
    pub errors: Vec<ParseError>,
}

impl Parse {
    /// The root syntax node (always a `SOURCE_FILE`).
    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse source text into a CST. Lexical errors are not part of the returned
/// [`Parse`]; callers lex separately when they need them (the driver does).
pub fn parse(src: &str) -> Parse {
    let lexed = fly_lexer::lex(src);
    let mut parser = Parser::new(&lexed.tokens);
    items::source_file(&mut parser);
    let (events, errors) = (parser.events, parser.errors);
    let green = build_tree(src, &lexed.tokens, events);
    Parse { green, errors }
}

/// Parse a standalone expression fragment (used for interpolation holes).
/// The root node is still a `SOURCE_FILE`, holding the single expression.
pub fn parse_expr_fragment(src: &str) -> Parse {
    let lexed = fly_lexer::lex(src);
    let mut parser = Parser::new(&lexed.tokens);
    let m = parser.open();
    expressions::expr(&mut parser);
    while !parser.at_eof() {
        parser.advance_with_error("unexpected token after expression");
    }
    parser.close(m, SyntaxKind::SOURCE_FILE);
    let (events, errors) = (parser.events, parser.errors);
    let green = build_tree(src, &lexed.tokens, events);
    Parse { green, errors }
}

#[derive(Debug)]
enum Event {
    Open { kind: SyntaxKind },
    Close,
    Advance,
}

/// An opened-but-not-yet-closed node mark.
pub(crate) struct MarkOpened {
    index: usize,
}

/// A closed node mark; can be wrapped later via [`Parser::open_before`].
#[derive(Clone, Copy)]
pub(crate) struct MarkClosed {
    index: usize,
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    events: Vec<Event>,
    errors: Vec<ParseError>,
    /// Set when an error is recorded, cleared on the next successful advance.
    /// Grammar loops use it to bail instead of spinning on a stuck token.
    poisoned: bool,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            events: Vec::new(),
            errors: Vec::new(),
            poisoned: false,
        }
    }

    // ── Marks ────────────────────────────────────────────────────────

    pub(crate) fn open(&mut self) -> MarkOpened {
        let mark = MarkOpened {
            index: self.events.len(),
        };
        self.events.push(Event::Open {
            kind: SyntaxKind::TOMBSTONE,
        });
        mark
    }

    pub(crate) fn close(&mut self, m: MarkOpened, kind: SyntaxKind) -> MarkClosed {
        self.events[m.index] = Event::Open { kind };
        self.events.push(Event::Close);
        MarkClosed { index: m.index }
    }

    /// Open a node that will wrap an already-closed sibling; the workhorse of
    /// postfix and infix parsing.
    pub(crate) fn open_before(&mut self, m: MarkClosed) -> MarkOpened {
        let mark = MarkOpened { index: m.index };
        self.events.insert(
            m.index,
            Event::Open {
                kind: SyntaxKind::TOMBSTONE,
            },
        );
        mark
    }

    // ── Cursor ───────────────────────────────────────────────────────

    pub(crate) fn advance(&mut self) {
        if self.pos < self.tokens.len().saturating_sub(1) {
            self.events.push(Event::Advance);
            self.pos += 1;
            self.poisoned = false;
        }
    }

    fn nth_token(&self, n: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    /// Kind of the token `n` ahead of the cursor (0 = current).
    pub(crate) fn nth(&self, n: usize) -> SyntaxKind {
        SyntaxKind::from_token(self.nth_token(n).kind)
    }

    pub(crate) fn current(&self) -> SyntaxKind {
        self.nth(0)
    }

    pub(crate) fn current_span(&self) -> Span {
        self.nth_token(0).span
    }

    pub(crate) fn current_text(&self) -> &str {
        &self.nth_token(0).lexeme
    }

    pub(crate) fn at(&self, kind: SyntaxKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        kinds.contains(&self.current())
    }

    /// True when the current and next tokens are the given kinds with no gap
    /// between them. Used to parse `<<`/`>>` from single angle tokens.
    pub(crate) fn at_adjacent(&self, first: SyntaxKind, second: SyntaxKind) -> bool {
        self.nth(0) == first
            && self.nth(1) == second
            && self.nth_token(0).span.end == self.nth_token(1).span.start
    }

    pub(crate) fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: SyntaxKind) {
        if !self.eat(kind) {
            self.error(format!(
                "expected {}, found {}",
                describe(kind),
                describe(self.current())
            ));
        }
    }

    // ── Errors ───────────────────────────────────────────────────────

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.errors
            .push(ParseError::new(message, self.current_span()));
        self.poisoned = true;
    }

    pub(crate) fn error_with_related(
        &mut self,
        message: impl Into<String>,
        related_span: Span,
        related_message: impl Into<String>,
    ) {
        self.errors.push(ParseError::with_related(
            message,
            self.current_span(),
            related_message,
            related_span,
        ));
        self.poisoned = true;
    }

    /// Record an error, consume the offending token inside an `ERROR_NODE`,
    /// and keep going. Guarantees progress.
    pub(crate) fn advance_with_error(&mut self, message: impl Into<String>) {
        self.error(message);
        if !self.at(SyntaxKind::EOF) {
            let m = self.open();
            self.advance();
            self.close(m, SyntaxKind::ERROR_NODE);
        }
    }

    pub(crate) fn has_error(&self) -> bool {
        self.poisoned
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.at(SyntaxKind::EOF)
    }
}

fn describe(kind: SyntaxKind) -> String {
    format!("{kind:?}")
        .trim_end_matches("_KW")
        .to_lowercase()
        .replace('_', " ")
}

/// Replay parser events into a green tree, re-inserting the whitespace and
/// comment gaps between tokens so node ranges match source byte offsets.
fn build_tree(src: &str, tokens: &[Token], events: Vec<Event>) -> rowan::GreenNode {
    let mut builder = GreenNodeBuilder::new();
    let mut pos = 0usize;
    let mut offset = 0usize;

    let flush_trivia =
        |builder: &mut GreenNodeBuilder<'_>, offset: &mut usize, upto: usize, src: &str| {
            if upto > *offset {
                builder.token(SyntaxKind::WHITESPACE.into(), &src[*offset..upto]);
                *offset = upto;
            }
        };

    let total = events.len();
    for (i, event) in events.into_iter().enumerate() {
        match event {
            Event::Open { kind } => {
                // Attach pending trivia to the enclosing node so children
                // start exactly at their first token.
                if kind != SyntaxKind::SOURCE_FILE {
                    let next_start = tokens
                        .get(pos)
                        .map(|t| t.span.start as usize)
                        .unwrap_or(src.len());
                    flush_trivia(&mut builder, &mut offset, next_start, src);
                }
                builder.start_node(kind.into());
            }
            Event::Close => {
                if i + 1 == total {
                    // Trailing trivia belongs to the root.
                    flush_trivia(&mut builder, &mut offset, src.len(), src);
                }
                builder.finish_node();
            }
            Event::Advance => {
                let tok = &tokens[pos];
                flush_trivia(&mut builder, &mut offset, tok.span.start as usize, src);
                builder.token(SyntaxKind::from_token(tok.kind).into(), &tok.lexeme);
                offset = tok.span.end as usize;
                pos += 1;
            }
        }
    }
    builder.finish()
}
