//! AST type expressions.

use fly_common::span::SourceSpan;
use serde::Serialize;

use super::{DottedPath, NodeId};

/// A type as written in source.
#[derive(Debug, Clone, Serialize)]
pub struct TypeExpr {
    pub id: NodeId,
    pub span: SourceSpan,
    pub kind: TypeKind,
}

/// The builtin primitive names. `Float` is 64-bit by language definition;
/// `Void` and `Unit` are aliases of each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrimKind {
    Int,
    Long,
    Float,
    Double,
    Bool,
    Char,
    Byte,
    Short,
    Str,
    Void,
    Unit,
}

impl PrimKind {
    pub fn from_name(name: &str) -> Option<PrimKind> {
        Some(match name {
            "Int" => PrimKind::Int,
            "Long" => PrimKind::Long,
            "Float" => PrimKind::Float,
            "Double" => PrimKind::Double,
            "Bool" => PrimKind::Bool,
            "Char" => PrimKind::Char,
            "Byte" => PrimKind::Byte,
            "Short" => PrimKind::Short,
            "String" => PrimKind::Str,
            "Void" => PrimKind::Void,
            "Unit" => PrimKind::Unit,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimKind::Int => "Int",
            PrimKind::Long => "Long",
            PrimKind::Float => "Float",
            PrimKind::Double => "Double",
            PrimKind::Bool => "Bool",
            PrimKind::Char => "Char",
            PrimKind::Byte => "Byte",
            PrimKind::Short => "Short",
            PrimKind::Str => "String",
            PrimKind::Void => "Void",
            PrimKind::Unit => "Unit",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum TypeKind {
    Primitive(PrimKind),
    /// A (possibly qualified) named type with generic arguments.
    Named {
        path: DottedPath,
        args: Vec<TypeExpr>,
    },
    /// `T?`
    Optional(Box<TypeExpr>),
    /// `[T]`
    Array(Box<TypeExpr>),
    /// `[K: V]`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// `&T` / `&mut T`
    Reference {
        inner: Box<TypeExpr>,
        mutable: bool,
    },
    /// `(A, B) -> C`
    Function {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
    /// `(A, B)`
    Tuple(Vec<TypeExpr>),
    /// `A | B`
    Union(Box<TypeExpr>, Box<TypeExpr>),
    /// `A & B`
    Intersection(Box<TypeExpr>, Box<TypeExpr>),
    /// Placeholder produced after a parse error.
    Error,
}

impl TypeExpr {
    /// The simple name of a named type, if this is one.
    pub fn simple_name(&self) -> Option<&str> {
        match &self.kind {
            TypeKind::Named { path, .. } => path.last(),
            TypeKind::Primitive(p) => Some(p.name()),
            _ => None,
        }
    }
}
