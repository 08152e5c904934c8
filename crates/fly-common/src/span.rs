//! Source location types.
//!
//! The lexer, parser, and CST work in byte offsets (`Span`); the AST and
//! diagnostics carry the resolved file/line/column form (`SourceSpan`).
//! `LineIndex` converts between the two.

use std::fmt;

use serde::Serialize;

/// A half-open byte range `[start, end)` into a single source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// A resolved source location: file plus 1-based line/column endpoints.
///
/// Every AST node owns one. Locations that cannot be attributed to source
/// text use the [`SourceSpan::unknown`] sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceSpan {
    pub file: String,
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl SourceSpan {
    pub fn new(
        file: impl Into<String>,
        start_line: u32,
        start_col: u32,
        end_line: u32,
        end_col: u32,
    ) -> Self {
        Self {
            file: file.into(),
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// The canonical sentinel for locations with no source attribution.
    pub fn unknown() -> Self {
        Self {
            file: "<unknown>".to_string(),
            start_line: 0,
            start_col: 0,
            end_line: 0,
            end_col: 0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.start_line == 0
    }

    /// Whether `inner` lies entirely within `self`. Both must come from the
    /// same file; unknown spans contain nothing and are contained nowhere.
    pub fn contains(&self, inner: &SourceSpan) -> bool {
        if self.is_unknown() || inner.is_unknown() || self.file != inner.file {
            return false;
        }
        let starts_before = (self.start_line, self.start_col) <= (inner.start_line, inner.start_col);
        let ends_after = (self.end_line, self.end_col) >= (inner.end_line, inner.end_col);
        starts_before && ends_after
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.start_line, self.start_col)
    }
}

/// Precomputed table of line-start offsets for a source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    /// 1-based (line, column) of a byte offset.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let col = offset - self.line_starts[line];
        (line as u32 + 1, col + 1)
    }

    /// Resolve a byte `Span` into a `SourceSpan` within `file`.
    pub fn source_span(&self, file: &str, span: Span) -> SourceSpan {
        let (start_line, start_col) = self.line_col(span.start);
        let (end_line, end_col) = self.line_col(span.end);
        SourceSpan::new(file, start_line, start_col, end_line, end_col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_join() {
        let a = Span::new(4, 10);
        let b = Span::new(8, 20);
        assert_eq!(a.to(b), Span::new(4, 20));
    }

    #[test]
    fn line_index_resolves_lines_and_columns() {
        let idx = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(1), (1, 2));
        assert_eq!(idx.line_col(3), (2, 1));
        assert_eq!(idx.line_col(6), (3, 1));
        assert_eq!(idx.line_col(7), (4, 1));
    }

    #[test]
    fn source_span_containment() {
        let outer = SourceSpan::new("a.fly", 1, 1, 5, 10);
        let inner = SourceSpan::new("a.fly", 2, 3, 4, 1);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(!outer.contains(&SourceSpan::unknown()));
    }
}
