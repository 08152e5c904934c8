//! The typed, owned AST.
//!
//! Built once from the CST by [`lower`](crate::ast::lower) and never mutated
//! afterwards; all later phases attach facts in side tables keyed by
//! [`NodeId`]. Every node carries a resolved [`SourceSpan`].

use std::fmt;

use fly_common::span::SourceSpan;
use serde::Serialize;

pub mod decl;
pub mod expr;
pub mod lower;
pub mod pat;
pub mod print;
pub mod types;

pub use decl::*;
pub use expr::*;
pub use pat::*;
pub use types::*;

/// Stable, dense identity of an AST node; the key of every side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A `::`-separated path, e.g. a module path or a qualified type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DottedPath {
    pub segments: Vec<String>,
    pub span: SourceSpan,
}

impl DottedPath {
    pub fn new(segments: Vec<String>, span: SourceSpan) -> Self {
        Self { segments, span }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// `a::b::c`
    pub fn dotted_colons(&self) -> String {
        self.segments.join("::")
    }

    /// `a.b.c` — host-VM dotted form.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// `a/b/c` — VM internal (package) form.
    pub fn internal(&self) -> String {
        self.segments.join("/")
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

impl fmt::Display for DottedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dotted_colons())
    }
}

/// Item visibility. The default everywhere is private.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Visibility {
    #[default]
    Private,
    Public,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }
}

/// `@Name(args)` attached to a declaration.
#[derive(Debug, Clone, Serialize)]
pub struct Annotation {
    pub id: NodeId,
    pub span: SourceSpan,
    pub name: DottedPath,
    pub args: Vec<Expr>,
}

/// A declared generic parameter with its bounds: `T: Printable + Ord`.
#[derive(Debug, Clone, Serialize)]
pub struct TypeParam {
    pub id: NodeId,
    pub span: SourceSpan,
    pub name: String,
    pub bounds: Vec<TypeExpr>,
}

/// A use declaration: single item (optionally aliased), item list, or
/// wildcard.
#[derive(Debug, Clone, Serialize)]
pub struct UseDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub module_path: DottedPath,
    pub kind: UseKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UseKind {
    Single { item: String, alias: Option<String> },
    List(Vec<String>),
    Wildcard,
}

/// The root of one source file's AST. The module declaration is mandatory;
/// a missing one is the AST builder's hard error, and `module_path` is then
/// empty.
#[derive(Debug, Clone, Serialize)]
pub struct CompilationUnit {
    pub id: NodeId,
    pub span: SourceSpan,
    pub module_path: DottedPath,
    pub uses: Vec<UseDecl>,
    pub decls: Vec<TopDecl>,
}

impl CompilationUnit {
    /// Iterate all function declarations at the top level.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.decls.iter().filter_map(|d| match d {
            TopDecl::Function(f) => Some(f),
            _ => None,
        })
    }
}
