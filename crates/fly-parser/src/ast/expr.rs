//! AST expressions and statements.

use fly_common::span::SourceSpan;
use serde::Serialize;

use super::pat::Pattern;
use super::types::TypeExpr;
use super::{DottedPath, NodeId};

#[derive(Debug, Clone, Serialize)]
pub struct Expr {
    pub id: NodeId,
    pub span: SourceSpan,
    pub kind: ExprKind,
}

/// Binary operators after desugaring; comparison and logic included.
/// Assignment and coalescing are separate expression kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem
                | BinaryOp::Pow
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
    Char(char),
    Bool(bool),
    /// The empty option, `none`.
    None,
}

/// One piece of an interpolated string.
#[derive(Debug, Clone, Serialize)]
pub enum InterpPart {
    Text(String),
    Hole(Box<Expr>),
}

#[derive(Debug, Clone, Serialize)]
pub enum ExprKind {
    Literal(Literal),
    /// An interpolated string, alternating text and expression holes.
    Interpolated(Vec<InterpPart>),
    /// A single lowercase identifier.
    Identifier(String),
    /// `self`
    SelfRef,
    /// A qualified or type-level path: `Color::Red`, `a::b::C`.
    Path(DottedPath),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    MethodCall {
        recv: Box<Expr>,
        name: String,
        args: Vec<Expr>,
        /// True for `recv?.name(args)`.
        safe: bool,
    },
    StaticCall {
        type_path: DottedPath,
        name: String,
        args: Vec<Expr>,
    },
    FieldAccess {
        recv: Box<Expr>,
        name: String,
    },
    /// `recv?.name`
    SafeAccess {
        recv: Box<Expr>,
        name: String,
    },
    Index {
        recv: Box<Expr>,
        index: Box<Expr>,
    },
    Block(Block),
    If {
        cond: Box<Expr>,
        then_branch: Block,
        else_branch: Option<Box<Expr>>,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    For {
        binding: Pattern,
        iterable: Box<Expr>,
        body: Block,
    },
    While {
        cond: Box<Expr>,
        body: Block,
    },
    Lambda {
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        body: Box<Expr>,
    },
    Return(Option<Box<Expr>>),
    Break,
    Continue,
    Await(Box<Expr>),
    Throw(Box<Expr>),
    Try {
        body: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
    },
    Concurrent {
        bindings: Vec<ConcurrentBinding>,
    },
    Race {
        clauses: Vec<Expr>,
    },
    Timeout {
        duration: Box<Expr>,
        body: Block,
    },
    With {
        args: Vec<Expr>,
        body: Block,
    },
    New {
        ty: TypeExpr,
        args: Vec<Expr>,
    },
    StructLit {
        path: DottedPath,
        fields: Vec<(String, Expr)>,
    },
    ArrayLit(Vec<Expr>),
    MapLit(Vec<(Expr, Expr)>),
    TupleLit(Vec<Expr>),
    Cast {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
    TypeCheck {
        expr: Box<Expr>,
        ty: TypeExpr,
    },
    /// `lhs ?? rhs`
    Coalesce {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `lhs ?: rhs` — analyzed and emitted exactly like `??`.
    Elvis {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Range {
        lo: Box<Expr>,
        hi: Box<Expr>,
        inclusive: bool,
    },
    /// `e!!`
    ForceUnwrap(Box<Expr>),
    /// `e?`
    Unwrap(Box<Expr>),
    Assignment {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    CompoundAssignment {
        op: BinaryOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// Placeholder produced after a parse error.
    Error,
}

/// `{ stmt* tail? }` — the trailing expression (no semicolon) is the value.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub id: NodeId,
    pub span: SourceSpan,
    pub stmts: Vec<Stmt>,
    pub tail: Option<Box<Expr>>,
}

#[derive(Debug, Clone, Serialize)]
pub enum Stmt {
    Let(LetStmt),
    Expr(Expr),
}

#[derive(Debug, Clone, Serialize)]
pub struct LetStmt {
    pub id: NodeId,
    pub span: SourceSpan,
    pub mutable: bool,
    pub pattern: Pattern,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchArm {
    pub id: NodeId,
    pub span: SourceSpan,
    pub pattern: Pattern,
    pub body: Expr,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatchClause {
    pub id: NodeId,
    pub span: SourceSpan,
    pub pattern: Pattern,
    pub body: Block,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConcurrentBinding {
    pub id: NodeId,
    pub span: SourceSpan,
    pub name: String,
    pub init: Expr,
}

/// A function or lambda parameter.
#[derive(Debug, Clone, Serialize)]
pub struct Param {
    pub id: NodeId,
    pub span: SourceSpan,
    pub name: String,
    pub ty: Option<TypeExpr>,
}
