//! The cross-cutting diagnostic sink.
//!
//! Every compilation phase reports structured messages here. A diagnostic
//! carries a stable code, a severity, the phase that produced it, and an
//! optional resolved source span plus hint. The reporter formats one line
//! per diagnostic as `file:line:col: level[code]: message`, with the hint
//! on a second indented line.

use std::fmt;

use serde::Serialize;

use crate::span::{SourceSpan, Span};

/// Diagnostic severity. Errors fail the compilation; warnings and infos do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// The compilation phase a diagnostic originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Lexer,
    Parser,
    AstBuilder,
    Resolver,
    Semantic,
    Codegen,
    Driver,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Lexer => write!(f, "lexer"),
            Phase::Parser => write!(f, "parser"),
            Phase::AstBuilder => write!(f, "ast"),
            Phase::Resolver => write!(f, "resolver"),
            Phase::Semantic => write!(f, "semantic"),
            Phase::Codegen => write!(f, "codegen"),
            Phase::Driver => write!(f, "driver"),
        }
    }
}

/// A single structured diagnostic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Stable code, e.g. `TC002` or `TRAIT005`.
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub phase: Phase,
    /// Resolved location, if the diagnostic is attributable to source text.
    pub span: Option<SourceSpan>,
    /// Raw byte range within the source file, kept for rich renderers.
    pub range: Option<Span>,
    /// Optional suggestion shown on a second indented line.
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
        phase: Phase,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            phase,
            span: None,
            range: None,
            hint: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>, phase: Phase) -> Self {
        Self::new(Severity::Error, code, message, phase)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>, phase: Phase) -> Self {
        Self::new(Severity::Warning, code, message, phase)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>, phase: Phase) -> Self {
        Self::new(Severity::Info, code, message, phase)
    }

    pub fn with_span(mut self, span: SourceSpan) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_range(mut self, range: Span) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// One-line plain rendering: `file:line:col: level[code]: message`.
    pub fn format_plain(&self) -> String {
        let mut out = String::new();
        if let Some(span) = &self.span {
            out.push_str(&format!(
                "{}:{}:{}: ",
                span.file, span.start_line, span.start_col
            ));
        }
        out.push_str(&format!(
            "{}[{}]: {}",
            self.severity, self.code, self.message
        ));
        if let Some(hint) = &self.hint {
            out.push_str(&format!("\n    hint: {hint}"));
        }
        out
    }

    /// Like [`Diagnostic::format_plain`] with the level colored for terminals.
    pub fn format_ansi(&self) -> String {
        let color = match self.severity {
            Severity::Error => "\x1b[31m",
            Severity::Warning => "\x1b[33m",
            Severity::Info => "\x1b[36m",
        };
        let mut out = String::new();
        if let Some(span) = &self.span {
            out.push_str(&format!(
                "{}:{}:{}: ",
                span.file, span.start_line, span.start_col
            ));
        }
        out.push_str(&format!(
            "{color}{}[{}]\x1b[0m: {}",
            self.severity, self.code, self.message
        ));
        if let Some(hint) = &self.hint {
            out.push_str(&format!("\n    \x1b[2mhint: {hint}\x1b[0m"));
        }
        out
    }
}

/// Collects diagnostics across all phases. Passed by reference to each phase.
#[derive(Debug, Default)]
pub struct DiagnosticReporter {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.by_severity(Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.by_severity(Severity::Warning).count()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Render every diagnostic, one entry per line, plain text.
    pub fn format_plain(&self) -> String {
        self.diagnostics
            .iter()
            .map(Diagnostic::format_plain)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render every diagnostic with ANSI colors.
    pub fn format_ansi(&self) -> String {
        self.diagnostics
            .iter()
            .map(Diagnostic::format_ansi)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceSpan;

    #[test]
    fn plain_format_matches_contract() {
        let d = Diagnostic::error("TC002", "await outside async function", Phase::Semantic)
            .with_span(SourceSpan::new("main.fly", 3, 14, 3, 19));
        assert_eq!(
            d.format_plain(),
            "main.fly:3:14: error[TC002]: await outside async function"
        );
    }

    #[test]
    fn hint_renders_indented() {
        let d = Diagnostic::error("NAME002", "unknown type `HashMap`", Phase::Resolver)
            .with_span(SourceSpan::new("main.fly", 1, 1, 1, 8))
            .with_hint("add `use fly::collections::HashMap`");
        let text = d.format_plain();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "main.fly:1:1: error[NAME002]: unknown type `HashMap`"
        );
        assert_eq!(
            lines.next().unwrap(),
            "    hint: add `use fly::collections::HashMap`"
        );
    }

    #[test]
    fn reporter_counts_and_filters() {
        let mut reporter = DiagnosticReporter::new();
        reporter.report(Diagnostic::error("E0001", "missing module", Phase::AstBuilder));
        reporter.report(Diagnostic::warning("PAT001", "non-exhaustive", Phase::Semantic));
        assert!(reporter.has_errors());
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.warning_count(), 1);
        assert_eq!(reporter.by_severity(Severity::Warning).count(), 1);
    }
}
