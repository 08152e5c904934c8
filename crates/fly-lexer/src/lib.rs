//! Tokenizer for Flylang.
//!
//! Turns UTF-8 source text into an ordered token stream terminated by EOF.
//! Whitespace and plain comments are discarded; doc comments (`///` and
//! `/** … */`) survive as tokens so the parser can attach them to the next
//! declaration. Interpolated strings (`f"a {x} b"`) are lexed as a single
//! token; the AST builder later splits literal segments from expression
//! holes.
//!
//! Lexical errors never abort the scan: each error is recorded with its
//! span, an `Error` token keeps the stream aligned, and lexing resumes at
//! the next plausible token boundary.

use fly_common::error::{LexError, LexErrorKind};
use fly_common::span::Span;
use fly_common::token::{Token, TokenKind};

/// The result of lexing one source file.
#[derive(Debug, Clone)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

/// Tokenize `src`. The returned stream always ends with an `Eof` token.
pub fn lex(src: &str) -> Lexed {
    let mut lexer = Lexer::new(src);
    lexer.run();
    Lexed {
        tokens: lexer.tokens,
        errors: lexer.errors,
    }
}

struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(usize, char)>,
    /// Index into `chars`.
    pos: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    // ── Cursor primitives ────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    /// Byte offset of the current cursor position.
    fn offset(&self) -> u32 {
        match self.chars.get(self.pos) {
            Some(&(i, _)) => i as u32,
            None => self.src.len() as u32,
        }
    }

    fn slice(&self, span: Span) -> &'a str {
        &self.src[span.start as usize..span.end as usize]
    }

    fn push(&mut self, kind: TokenKind, span: Span) {
        let lexeme = self.slice(span).to_string();
        self.tokens.push(Token::new(kind, lexeme, span));
    }

    fn error(&mut self, kind: LexErrorKind, span: Span) {
        self.errors.push(LexError::new(kind, span));
    }

    // ── Main loop ────────────────────────────────────────────────────

    fn run(&mut self) {
        while let Some(c) = self.peek() {
            let start = self.offset();
            match c {
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' => self.slash(start),
                '"' => self.string(start, false),
                '\'' => self.char_literal(start),
                'f' if self.peek_at(1) == Some('"') => {
                    self.bump(); // f
                    self.string(start, true);
                }
                c if c.is_alphabetic() || c == '_' => self.ident(start),
                c if c.is_ascii_digit() => self.number(start),
                _ => self.operator(start),
            }
        }
        let end = self.src.len() as u32;
        self.tokens
            .push(Token::new(TokenKind::Eof, "", Span::new(end, end)));
    }

    // ── Comments ─────────────────────────────────────────────────────

    fn slash(&mut self, start: u32) {
        match (self.peek_at(1), self.peek_at(2)) {
            (Some('/'), Some('/')) => {
                // `///` doc comment, runs to end of line.
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
                self.push(TokenKind::DocComment, Span::new(start, self.offset()));
            }
            (Some('/'), _) => {
                // Plain line comment.
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            }
            (Some('*'), second) => {
                let is_doc = second == Some('*') && self.peek_at(3) != Some('/');
                self.bump(); // /
                self.bump(); // *
                let mut closed = false;
                while let Some(c) = self.bump() {
                    if c == '*' && self.peek() == Some('/') {
                        self.bump();
                        closed = true;
                        break;
                    }
                }
                let span = Span::new(start, self.offset());
                if !closed {
                    self.error(LexErrorKind::UnterminatedBlockComment, span);
                } else if is_doc {
                    self.push(TokenKind::DocComment, span);
                }
            }
            _ => self.operator(start),
        }
    }

    // ── Identifiers & keywords ───────────────────────────────────────

    fn ident(&mut self, start: u32) {
        let first = self.bump().unwrap_or('_');
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let span = Span::new(start, self.offset());
        let text = self.slice(span);
        let kind = if text == "_" {
            TokenKind::Underscore
        } else if let Some(kw) = TokenKind::keyword(text) {
            kw
        } else if first.is_uppercase() {
            TokenKind::TypeIdent
        } else {
            TokenKind::Ident
        };
        self.push(kind, span);
    }

    // ── Numbers ──────────────────────────────────────────────────────

    fn number(&mut self, start: u32) {
        if self.peek() == Some('0') {
            match self.peek_at(1) {
                Some('x') | Some('X') => return self.radix_literal(start, 16),
                Some('b') | Some('B') => return self.radix_literal(start, 2),
                Some('o') | Some('O') => return self.radix_literal(start, 8),
                _ => {}
            }
        }

        self.eat_digits();
        let mut is_float = false;

        // A dot only continues the number when followed by a digit, so that
        // range expressions (`1..5`) and method calls (`1.abs()`) still lex.
        if self.peek() == Some('.')
            && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false)
        {
            is_float = true;
            self.bump(); // .
            self.eat_digits();
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let exp_probe = match self.peek_at(1) {
                Some('+') | Some('-') => self.peek_at(2),
                other => other,
            };
            if exp_probe.map(|c| c.is_ascii_digit()).unwrap_or(false) {
                is_float = true;
                self.bump(); // e
                if matches!(self.peek(), Some('+') | Some('-')) {
                    self.bump();
                }
                self.eat_digits();
            }
        }

        let span = Span::new(start, self.offset());
        let kind = if is_float {
            TokenKind::FloatLit
        } else {
            TokenKind::IntLit
        };
        self.push(kind, span);
    }

    fn radix_literal(&mut self, start: u32, radix: u32) {
        self.bump(); // 0
        self.bump(); // x | b | o
        let mut has_digit = false;
        while let Some(c) = self.peek() {
            if c == '_' {
                self.bump();
            } else if c.is_digit(radix) {
                has_digit = true;
                self.bump();
            } else if c.is_alphanumeric() {
                // Digit out of range for the radix, e.g. `0b102`.
                self.bump();
                let span = Span::new(start, self.offset_after_alnum());
                let text = self.slice(span).to_string();
                self.error(LexErrorKind::InvalidNumberLiteral(text), span);
                self.push(TokenKind::Error, span);
                return;
            } else {
                break;
            }
        }
        let span = Span::new(start, self.offset());
        if !has_digit {
            let text = self.slice(span).to_string();
            self.error(LexErrorKind::InvalidNumberLiteral(text), span);
            self.push(TokenKind::Error, span);
        } else {
            self.push(TokenKind::IntLit, span);
        }
    }

    /// Consume any remaining alphanumeric tail and return the end offset;
    /// used to swallow the whole malformed literal in one error.
    fn offset_after_alnum(&mut self) -> u32 {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        self.offset()
    }

    fn eat_digits(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
    }

    // ── Strings & chars ──────────────────────────────────────────────

    fn string(&mut self, start: u32, interpolated: bool) {
        self.bump(); // opening quote
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => {
                    let span = Span::new(start, self.offset());
                    let kind = if interpolated && depth > 0 {
                        LexErrorKind::UnterminatedInterpolation
                    } else {
                        LexErrorKind::UnterminatedString
                    };
                    self.error(kind, span);
                    self.push(TokenKind::Error, span);
                    return;
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') | Some('t') | Some('r') | Some('0') | Some('\\')
                        | Some('"') | Some('\'') | Some('{') | Some('}') | Some('u') => {}
                        Some(other) => {
                            let end = self.offset();
                            self.error(
                                LexErrorKind::InvalidEscapeSequence(other),
                                Span::new(end.saturating_sub(2), end),
                            );
                        }
                        None => {}
                    }
                }
                Some('{') if interpolated => {
                    depth += 1;
                    self.bump();
                }
                Some('}') if interpolated && depth > 0 => {
                    depth -= 1;
                    self.bump();
                }
                Some('"') if depth == 0 => {
                    self.bump();
                    let span = Span::new(start, self.offset());
                    let kind = if interpolated {
                        TokenKind::InterpStringLit
                    } else {
                        TokenKind::StringLit
                    };
                    self.push(kind, span);
                    return;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn char_literal(&mut self, start: u32) {
        self.bump(); // opening quote
        match self.peek() {
            Some('\\') => {
                self.bump();
                self.bump();
                // \u{...} form
                if self.peek() == Some('{') {
                    while let Some(c) = self.bump() {
                        if c == '}' {
                            break;
                        }
                    }
                }
            }
            Some('\'') | None => {
                let span = Span::new(start, self.offset());
                self.error(LexErrorKind::MalformedCharLiteral, span);
                self.push(TokenKind::Error, span);
                if self.peek() == Some('\'') {
                    self.bump();
                }
                return;
            }
            Some(_) => {
                self.bump();
            }
        }
        if self.peek() == Some('\'') {
            self.bump();
            self.push(TokenKind::CharLit, Span::new(start, self.offset()));
        } else {
            let span = Span::new(start, self.offset());
            self.error(LexErrorKind::MalformedCharLiteral, span);
            self.push(TokenKind::Error, span);
        }
    }

    // ── Operators & punctuation ──────────────────────────────────────

    fn operator(&mut self, start: u32) {
        use TokenKind::*;
        let c = self.bump().expect("operator called at end of input");
        let kind = match c {
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            ',' => Comma,
            ';' => Semicolon,
            '@' => At,
            '^' => Caret,
            ':' => {
                if self.peek() == Some(':') {
                    self.bump();
                    ColonColon
                } else {
                    Colon
                }
            }
            '.' => {
                if self.peek() == Some('.') {
                    self.bump();
                    if self.peek() == Some('=') {
                        self.bump();
                        DotDotEq
                    } else {
                        DotDot
                    }
                } else {
                    Dot
                }
            }
            '=' => match self.peek() {
                Some('=') => {
                    self.bump();
                    EqEq
                }
                Some('>') => {
                    self.bump();
                    FatArrow
                }
                _ => Eq,
            },
            '!' => match self.peek() {
                Some('=') => {
                    self.bump();
                    NotEq
                }
                Some('!') => {
                    self.bump();
                    BangBang
                }
                _ => Bang,
            },
            '?' => match self.peek() {
                Some('.') => {
                    self.bump();
                    QuestionDot
                }
                Some('?') => {
                    self.bump();
                    QuestionQuestion
                }
                Some(':') => {
                    self.bump();
                    QuestionColon
                }
                _ => Question,
            },
            '<' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Le
                } else {
                    Lt
                }
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                    Ge
                } else {
                    Gt
                }
            }
            '+' => {
                if self.peek() == Some('=') {
                    self.bump();
                    PlusEq
                } else {
                    Plus
                }
            }
            '-' => match self.peek() {
                Some('=') => {
                    self.bump();
                    MinusEq
                }
                Some('>') => {
                    self.bump();
                    Arrow
                }
                _ => Minus,
            },
            '*' => match self.peek() {
                Some('*') => {
                    self.bump();
                    StarStar
                }
                Some('=') => {
                    self.bump();
                    StarEq
                }
                _ => Star,
            },
            '/' => {
                if self.peek() == Some('=') {
                    self.bump();
                    SlashEq
                } else {
                    Slash
                }
            }
            '%' => {
                if self.peek() == Some('=') {
                    self.bump();
                    PercentEq
                } else {
                    Percent
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.bump();
                    AmpAmp
                } else {
                    Amp
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.bump();
                    PipePipe
                } else {
                    Pipe
                }
            }
            other => {
                let span = Span::new(start, self.offset());
                self.error(LexErrorKind::UnexpectedCharacter(other), span);
                self.push(TokenKind::Error, span);
                return;
            }
        };
        self.push(kind, Span::new(start, self.offset()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_module_header() {
        use TokenKind::*;
        assert_eq!(
            kinds("module demo::app"),
            vec![ModuleKw, Ident, ColonColon, Ident, Eof]
        );
    }

    #[test]
    fn distinguishes_ident_classes() {
        use TokenKind::*;
        assert_eq!(kinds("foo Foo _bar _"), vec![Ident, TypeIdent, Ident, Underscore, Eof]);
    }

    #[test]
    fn lexes_numeric_bases() {
        use TokenKind::*;
        assert_eq!(
            kinds("42 0xFF 0b1010 0o77 1_000_000"),
            vec![IntLit, IntLit, IntLit, IntLit, IntLit, Eof]
        );
    }

    #[test]
    fn float_requires_digit_after_dot() {
        use TokenKind::*;
        assert_eq!(kinds("3.25"), vec![FloatLit, Eof]);
        assert_eq!(kinds("1e10"), vec![FloatLit, Eof]);
        assert_eq!(kinds("2.5e-3"), vec![FloatLit, Eof]);
        // `1..5` is a range, not a malformed float.
        assert_eq!(kinds("1..5"), vec![IntLit, DotDot, IntLit, Eof]);
        // `1.abs` is a method call on an int literal.
        assert_eq!(kinds("1.abs"), vec![IntLit, Dot, Ident, Eof]);
    }

    #[test]
    fn invalid_radix_literal_recovers() {
        let lexed = lex("let x = 0b; let y = 2");
        assert_eq!(lexed.errors.len(), 1);
        assert!(matches!(
            lexed.errors[0].kind,
            LexErrorKind::InvalidNumberLiteral(_)
        ));
        // Lexing continued past the error.
        assert!(lexed.tokens.iter().any(|t| t.lexeme == "y"));
    }

    #[test]
    fn lexes_strings_and_escapes() {
        use TokenKind::*;
        assert_eq!(kinds(r#""hello\n""#), vec![StringLit, Eof]);
        let lexed = lex(r#""bad \q escape""#);
        assert_eq!(lexed.errors.len(), 1);
        assert!(matches!(
            lexed.errors[0].kind,
            LexErrorKind::InvalidEscapeSequence('q')
        ));
        // Still produced the token.
        assert_eq!(lexed.tokens[0].kind, StringLit);
    }

    #[test]
    fn unterminated_string_reported() {
        let lexed = lex("\"oops");
        assert_eq!(lexed.errors.len(), 1);
        assert!(matches!(lexed.errors[0].kind, LexErrorKind::UnterminatedString));
    }

    #[test]
    fn interpolated_string_is_one_token() {
        use TokenKind::*;
        assert_eq!(
            kinds(r#"f"sum is {a + b}!""#),
            vec![InterpStringLit, Eof]
        );
        // Nested braces inside a hole stay within the token.
        assert_eq!(
            kinds(r#"f"v: {match x { _ => 1 }}""#),
            vec![InterpStringLit, Eof]
        );
    }

    #[test]
    fn doc_comments_survive_plain_comments_do_not() {
        use TokenKind::*;
        let src = "/// docs\n// plain\n/* block */\n/** block docs */ fn";
        assert_eq!(kinds(src), vec![DocComment, DocComment, FnKw, Eof]);
    }

    #[test]
    fn unterminated_block_comment() {
        let lexed = lex("/* never closed");
        assert_eq!(lexed.errors.len(), 1);
        assert!(matches!(
            lexed.errors[0].kind,
            LexErrorKind::UnterminatedBlockComment
        ));
    }

    #[test]
    fn option_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("a?.b ?? c ?: d!! e?"),
            vec![
                Ident, QuestionDot, Ident, QuestionQuestion, Ident, QuestionColon, Ident,
                BangBang, Ident, Question, Eof
            ]
        );
    }

    #[test]
    fn angle_brackets_stay_single() {
        use TokenKind::*;
        // `>>` lexes as two `>` so nested generics close cleanly.
        assert_eq!(
            kinds("Map<String, Array<Int>>"),
            vec![TypeIdent, Lt, TypeIdent, Comma, TypeIdent, Lt, TypeIdent, Gt, Gt, Eof]
        );
    }

    #[test]
    fn char_literals() {
        use TokenKind::*;
        assert_eq!(kinds(r"'a' '\n' '\u{1F600}'"), vec![CharLit, CharLit, CharLit, Eof]);
        let lexed = lex("''");
        assert!(matches!(
            lexed.errors[0].kind,
            LexErrorKind::MalformedCharLiteral
        ));
    }

    #[test]
    fn unexpected_character_recovers() {
        let lexed = lex("let x = #5");
        assert_eq!(lexed.errors.len(), 1);
        assert!(matches!(
            lexed.errors[0].kind,
            LexErrorKind::UnexpectedCharacter('#')
        ));
        assert!(lexed.tokens.iter().any(|t| t.kind == TokenKind::IntLit));
    }

    #[test]
    fn spans_cover_lexemes() {
        let lexed = lex("let answer = 42");
        for t in &lexed.tokens {
            if t.kind != TokenKind::Eof {
                assert_eq!(
                    &"let answer = 42"[t.span.start as usize..t.span.end as usize],
                    t.lexeme
                );
            }
        }
    }
}
