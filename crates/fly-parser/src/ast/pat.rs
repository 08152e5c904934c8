//! AST patterns.

use fly_common::span::SourceSpan;
use serde::Serialize;

use super::expr::{Expr, Literal};
use super::types::TypeExpr;
use super::{DottedPath, NodeId};

#[derive(Debug, Clone, Serialize)]
pub struct Pattern {
    pub id: NodeId,
    pub span: SourceSpan,
    pub kind: PatternKind,
}

#[derive(Debug, Clone, Serialize)]
pub enum PatternKind {
    Literal(Literal),
    /// A binding, possibly typed and possibly mutable: `x`, `mut x`,
    /// `e: NotFound`.
    Binding {
        name: String,
        mutable: bool,
        ty: Option<TypeExpr>,
    },
    /// `Point { x, y: py, .. }`
    Struct {
        path: DottedPath,
        fields: Vec<(String, Option<Pattern>)>,
        rest: bool,
    },
    /// `Circle(r)` — also covers bare unit constructors like `Red`.
    TupleStruct {
        path: DottedPath,
        elems: Vec<Pattern>,
    },
    Tuple(Vec<Pattern>),
    /// `[a, b, ..rest]`
    Array {
        prefix: Vec<Pattern>,
        rest: Option<Option<String>>,
        suffix: Vec<Pattern>,
    },
    Range {
        lo: Literal,
        hi: Literal,
        inclusive: bool,
    },
    Wildcard,
    Or(Vec<Pattern>),
    /// `pat when cond` — a guarded pattern never subsumes later arms.
    Guard {
        inner: Box<Pattern>,
        cond: Box<Expr>,
    },
    /// Placeholder produced after a parse error.
    Error,
}

impl Pattern {
    /// Whether this pattern matches anything (a wildcard or irrefutable
    /// binding), ignoring guards.
    pub fn is_catch_all(&self) -> bool {
        match &self.kind {
            PatternKind::Wildcard => true,
            PatternKind::Binding { ty, .. } => ty.is_none(),
            PatternKind::Or(alts) => alts.iter().any(Pattern::is_catch_all),
            _ => false,
        }
    }

    /// Names bound by this pattern, in source order.
    pub fn bound_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match &self.kind {
            PatternKind::Binding { name, .. } => out.push(name),
            PatternKind::Struct { fields, .. } => {
                for (name, pat) in fields {
                    match pat {
                        Some(p) => p.collect_names(out),
                        Option::None => out.push(name),
                    }
                }
            }
            PatternKind::TupleStruct { elems, .. } => {
                for p in elems {
                    p.collect_names(out);
                }
            }
            PatternKind::Tuple(elems) => {
                for p in elems {
                    p.collect_names(out);
                }
            }
            PatternKind::Array { prefix, rest, suffix } => {
                for p in prefix {
                    p.collect_names(out);
                }
                if let Some(Some(name)) = rest {
                    out.push(name);
                }
                for p in suffix {
                    p.collect_names(out);
                }
            }
            PatternKind::Or(alts) => {
                if let Some(first) = alts.first() {
                    first.collect_names(out);
                }
            }
            PatternKind::Guard { inner, .. } => inner.collect_names(out),
            _ => {}
        }
    }
}
