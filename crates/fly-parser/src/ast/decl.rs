//! AST declarations.

use fly_common::span::SourceSpan;
use serde::Serialize;

use super::expr::{Block, Expr, Param};
use super::types::TypeExpr;
use super::{Annotation, DottedPath, NodeId, TypeParam, Visibility};

/// Any top-level (or class-nested) declaration.
#[derive(Debug, Clone, Serialize)]
pub enum TopDecl {
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Enum(EnumDecl),
    Data(DataDecl),
    Struct(StructDecl),
    Spark(SparkDecl),
    Trait(TraitDecl),
    Impl(ImplDecl),
    TypeAlias(TypeAliasDecl),
    Protocol(TraitDecl),
    Extend(ExtendDecl),
    Context(ClassDecl),
    Supervisor(ClassDecl),
    Flow(ClassDecl),
    Macro(MacroDecl),
    Exception(ExceptionDecl),
    Function(FunctionDecl),
}

impl TopDecl {
    pub fn name(&self) -> Option<&str> {
        match self {
            TopDecl::Class(d) | TopDecl::Context(d) | TopDecl::Supervisor(d)
            | TopDecl::Flow(d) => Some(&d.name),
            TopDecl::Interface(d) => Some(&d.name),
            TopDecl::Enum(d) => Some(&d.name),
            TopDecl::Data(d) => Some(&d.name),
            TopDecl::Struct(d) => Some(&d.name),
            TopDecl::Spark(d) => Some(&d.name),
            TopDecl::Trait(d) | TopDecl::Protocol(d) => Some(&d.name),
            TopDecl::Impl(_) => None,
            TopDecl::TypeAlias(d) => Some(&d.name),
            TopDecl::Extend(_) => None,
            TopDecl::Macro(d) => Some(&d.name),
            TopDecl::Exception(d) => Some(&d.name),
            TopDecl::Function(d) => Some(&d.name),
        }
    }

    pub fn span(&self) -> &SourceSpan {
        match self {
            TopDecl::Class(d) | TopDecl::Context(d) | TopDecl::Supervisor(d)
            | TopDecl::Flow(d) => &d.span,
            TopDecl::Interface(d) => &d.span,
            TopDecl::Enum(d) => &d.span,
            TopDecl::Data(d) => &d.span,
            TopDecl::Struct(d) => &d.span,
            TopDecl::Spark(d) => &d.span,
            TopDecl::Trait(d) | TopDecl::Protocol(d) => &d.span,
            TopDecl::Impl(d) => &d.span,
            TopDecl::TypeAlias(d) => &d.span,
            TopDecl::Extend(d) => &d.span,
            TopDecl::Macro(d) => &d.span,
            TopDecl::Exception(d) => &d.span,
            TopDecl::Function(d) => &d.span,
        }
    }
}

/// Shared declaration header: doc comment, annotations, visibility.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeclHeader {
    pub doc: Option<String>,
    pub annotations: Vec<Annotation>,
    pub visibility: Visibility,
}

/// A class, or one of the class-shaped constructs (`context`, `supervisor`,
/// `flow`) whose runtime semantics live outside the core.
#[derive(Debug, Clone, Serialize)]
pub struct ClassDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    /// Superclass and interfaces as written; resolution decides which is
    /// which.
    pub supers: Vec<TypeExpr>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunctionDecl>,
    pub nested: Vec<TopDecl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub supers: Vec<TypeExpr>,
    pub methods: Vec<FunctionDecl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub name: String,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumVariant {
    pub id: NodeId,
    pub span: SourceSpan,
    pub name: String,
}

/// A sum type: one named variant per alternative, each with optional fields.
#[derive(Debug, Clone, Serialize)]
pub struct DataDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub variants: Vec<DataVariant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataVariant {
    pub id: NodeId,
    pub span: SourceSpan,
    pub name: String,
    pub fields: Vec<FieldDef>,
}

/// A `name: Type` field in a struct, spark, data variant, or exception.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDef {
    pub id: NodeId,
    pub span: SourceSpan,
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<FunctionDecl>,
}

/// An immutable record with validation, update hooks, and computed
/// properties.
#[derive(Debug, Clone, Serialize)]
pub struct SparkDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<FieldDef>,
    pub validate: Option<Block>,
    pub before_update: Option<Block>,
    pub after_update: Option<Block>,
    pub computed: Vec<ComputedProp>,
    pub methods: Vec<FunctionDecl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComputedProp {
    pub id: NodeId,
    pub span: SourceSpan,
    pub name: String,
    pub ty: TypeExpr,
    pub body: Block,
}

/// A trait or protocol: required method signatures, possibly with default
/// bodies.
#[derive(Debug, Clone, Serialize)]
pub struct TraitDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub supers: Vec<TypeExpr>,
    pub methods: Vec<FunctionDecl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImplDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    /// `Some` for `impl Trait for Type`, `None` for inherent impls.
    pub trait_ref: Option<TypeExpr>,
    pub self_ty: TypeExpr,
    pub methods: Vec<FunctionDecl>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeAliasDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub aliased: TypeExpr,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtendDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub target: TypeExpr,
    pub methods: Vec<FunctionDecl>,
}

/// A grammar-level macro declaration; the body is preserved verbatim and
/// never expanded by the core.
#[derive(Debug, Clone, Serialize)]
pub struct MacroDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub name: String,
    pub params: Vec<String>,
    pub body_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExceptionDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub name: String,
    pub fields: Vec<FieldDef>,
    /// Declared superclass; the root exception type when absent.
    pub super_ty: Option<TypeExpr>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub is_static: bool,
    pub is_async: bool,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    /// Effect names from the `with Eff1, Eff2` clause.
    pub effects: Vec<String>,
    /// The `requires expr` clause, carried as metadata.
    pub requires: Option<Expr>,
    /// `None` for abstract signatures (interfaces, traits without defaults).
    pub body: Option<Block>,
}

/// A `let`-declared class field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldDecl {
    pub id: NodeId,
    pub span: SourceSpan,
    pub header: DeclHeader,
    pub mutable: bool,
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
}
