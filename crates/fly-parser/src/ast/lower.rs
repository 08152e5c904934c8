//! CST → AST lowering.
//!
//! Walks the rowan tree and produces the owned AST, assigning `NodeId`s and
//! resolving byte ranges to `SourceSpan`s. Desugars on the way:
//!
//! - `if let p = e { a } else { b }` → `match e { p => a, _ => b }`
//! - `while let p = e { b }` → `while true { match e { p => b, _ => break } }`
//! - operator tokens → [`BinaryOp`]/[`UnaryOp`]; `=` and compound operators
//!   become assignment nodes; adjacent angle tokens become shifts
//! - interpolated string tokens split into text and expression holes
//!
//! The builder's only hard error is a missing module declaration; everything
//! else the grammar allowed lowers to a node (possibly an `Error` node when
//! the parser already reported the problem).

use fly_common::span::{LineIndex, SourceSpan, Span};

use crate::cst::{SyntaxNode, SyntaxToken};
use crate::parser::Parse;
use crate::syntax_kind::SyntaxKind;

use super::*;

/// An AST-builder error (structural impossibility the grammar allowed).
#[derive(Debug, Clone, PartialEq)]
pub struct AstError {
    pub message: String,
    pub span: SourceSpan,
}

/// The outcome of lowering one file.
#[derive(Debug)]
pub struct LowerResult {
    pub unit: CompilationUnit,
    pub errors: Vec<AstError>,
}

/// Lower a parse tree into the owned AST for `file`.
pub fn lower(parse: &Parse, file: &str, src: &str) -> LowerResult {
    let mut ctx = Ctx {
        file: file.to_string(),
        index: LineIndex::new(src),
        next: 0,
        errors: Vec::new(),
        span_override: None,
    };
    let unit = ctx.unit(&parse.syntax());
    LowerResult {
        unit,
        errors: ctx.errors,
    }
}

struct Ctx {
    file: String,
    index: LineIndex,
    next: u32,
    errors: Vec<AstError>,
    /// When lowering a fragment (interpolation hole), every node takes this
    /// span instead of one computed from the fragment's private offsets.
    span_override: Option<SourceSpan>,
}

impl Ctx {
    fn id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    fn span(&self, node: &SyntaxNode) -> SourceSpan {
        if let Some(s) = &self.span_override {
            return s.clone();
        }
        let range = node.text_range();
        let span = Span::new(range.start().into(), range.end().into());
        self.index.source_span(&self.file, span)
    }

    fn tok_span(&self, tok: &SyntaxToken) -> SourceSpan {
        if let Some(s) = &self.span_override {
            return s.clone();
        }
        let range = tok.text_range();
        let span = Span::new(range.start().into(), range.end().into());
        self.index.source_span(&self.file, span)
    }

    fn error(&mut self, message: impl Into<String>, span: SourceSpan) {
        self.errors.push(AstError {
            message: message.into(),
            span,
        });
    }

    // ── Compilation unit ─────────────────────────────────────────────

    fn unit(&mut self, root: &SyntaxNode) -> CompilationUnit {
        let id = self.id();
        let span = self.span(root);

        let module_path = match root
            .children()
            .find(|n| n.kind() == SyntaxKind::MODULE_HEADER)
        {
            Some(header) => match header.children().find(|n| n.kind() == SyntaxKind::PATH) {
                Some(path) => self.path(&path),
                None => {
                    self.error("module declaration has no path", self.span(&header));
                    DottedPath::new(Vec::new(), self.span(&header))
                }
            },
            None => {
                self.error("missing module declaration", span.clone());
                DottedPath::new(Vec::new(), SourceSpan::unknown())
            }
        };

        let uses = root
            .children()
            .filter(|n| n.kind() == SyntaxKind::USE_DECL)
            .map(|n| self.use_decl(&n))
            .collect();

        let decls = root
            .children()
            .filter_map(|n| self.decl(&n))
            .collect();

        CompilationUnit {
            id,
            span,
            module_path,
            uses,
            decls,
        }
    }

    fn path(&mut self, node: &SyntaxNode) -> DottedPath {
        let span = self.span(node);
        let segments = node
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| {
                !matches!(
                    t.kind(),
                    SyntaxKind::COLON_COLON | SyntaxKind::WHITESPACE | SyntaxKind::DOC_COMMENT
                )
            })
            .map(|t| t.text().to_string())
            .collect();
        DottedPath::new(segments, span)
    }

    fn use_decl(&mut self, node: &SyntaxNode) -> UseDecl {
        let id = self.id();
        let span = self.span(node);
        let mut module_path = node
            .children()
            .find(|n| n.kind() == SyntaxKind::PATH)
            .map(|p| self.path(&p))
            .unwrap_or_else(|| DottedPath::new(Vec::new(), span.clone()));

        let kind = if node.children().any(|n| n.kind() == SyntaxKind::USE_STAR) {
            UseKind::Wildcard
        } else if let Some(list) = node
            .children()
            .find(|n| n.kind() == SyntaxKind::USE_ITEM_LIST)
        {
            let items = list
                .children()
                .filter(|n| n.kind() == SyntaxKind::USE_ITEM)
                .filter_map(|n| first_token_text(&n))
                .collect();
            UseKind::List(items)
        } else {
            // The final path segment is the imported item.
            let item = module_path.segments.pop().unwrap_or_default();
            let alias = node
                .children()
                .find(|n| n.kind() == SyntaxKind::USE_ALIAS)
                .and_then(|n| {
                    n.children_with_tokens()
                        .filter_map(|e| e.into_token())
                        .find(|t| {
                            matches!(t.kind(), SyntaxKind::IDENT | SyntaxKind::TYPE_IDENT)
                        })
                        .map(|t| t.text().to_string())
                });
            UseKind::Single { item, alias }
        };

        UseDecl {
            id,
            span,
            module_path,
            kind,
        }
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn decl(&mut self, node: &SyntaxNode) -> Option<TopDecl> {
        use SyntaxKind::*;
        Some(match node.kind() {
            CLASS_DECL => TopDecl::Class(self.class_like(node)),
            CONTEXT_DECL => TopDecl::Context(self.class_like(node)),
            SUPERVISOR_DECL => TopDecl::Supervisor(self.class_like(node)),
            FLOW_DECL => TopDecl::Flow(self.class_like(node)),
            INTERFACE_DECL => TopDecl::Interface(self.interface(node)),
            ENUM_DECL => TopDecl::Enum(self.enum_decl(node)),
            DATA_DECL => TopDecl::Data(self.data_decl(node)),
            STRUCT_DECL => TopDecl::Struct(self.struct_decl(node)),
            SPARK_DECL => TopDecl::Spark(self.spark_decl(node)),
            TRAIT_DECL => TopDecl::Trait(self.trait_decl(node)),
            PROTOCOL_DECL => TopDecl::Protocol(self.trait_decl(node)),
            IMPL_DECL => TopDecl::Impl(self.impl_decl(node)),
            TYPE_ALIAS_DECL => TopDecl::TypeAlias(self.type_alias(node)),
            EXTEND_DECL => TopDecl::Extend(self.extend_decl(node)),
            MACRO_DECL => TopDecl::Macro(self.macro_decl(node)),
            EXCEPTION_DECL => TopDecl::Exception(self.exception_decl(node)),
            FN_DECL => TopDecl::Function(self.function(node)),
            _ => return None,
        })
    }

    fn header(&mut self, node: &SyntaxNode) -> DeclHeader {
        let doc_lines: Vec<String> = node
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == SyntaxKind::DOC_COMMENT)
            .map(|t| strip_doc(t.text()))
            .collect();
        let doc = if doc_lines.is_empty() {
            None
        } else {
            Some(doc_lines.join("\n"))
        };

        let annotations = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::ANNOTATION)
            .map(|n| {
                let id = self.id();
                let span = self.span(&n);
                let name = n
                    .children()
                    .find(|c| c.kind() == SyntaxKind::PATH)
                    .map(|p| self.path(&p))
                    .unwrap_or_else(|| DottedPath::new(Vec::new(), span.clone()));
                let args = n
                    .children()
                    .find(|c| c.kind() == SyntaxKind::ARG_LIST)
                    .map(|a| self.exprs_in(&a))
                    .unwrap_or_default();
                Annotation {
                    id,
                    span,
                    name,
                    args,
                }
            })
            .collect();

        let visibility = if node
            .children()
            .any(|n| n.kind() == SyntaxKind::VISIBILITY)
        {
            Visibility::Public
        } else {
            Visibility::Private
        };

        DeclHeader {
            doc,
            annotations,
            visibility,
        }
    }

    fn name_of(&mut self, node: &SyntaxNode) -> String {
        node.children()
            .find(|n| n.kind() == SyntaxKind::NAME)
            .and_then(|n| first_token_text(&n))
            .unwrap_or_default()
    }

    fn type_params(&mut self, node: &SyntaxNode) -> Vec<TypeParam> {
        let Some(list) = node
            .children()
            .find(|n| n.kind() == SyntaxKind::TYPE_PARAM_LIST)
        else {
            return Vec::new();
        };
        list.children()
            .filter(|n| n.kind() == SyntaxKind::TYPE_PARAM)
            .map(|n| {
                let id = self.id();
                let span = self.span(&n);
                let name = n
                    .children_with_tokens()
                    .filter_map(|e| e.into_token())
                    .find(|t| t.kind() == SyntaxKind::TYPE_IDENT)
                    .map(|t| t.text().to_string())
                    .unwrap_or_default();
                let bounds = n
                    .children()
                    .filter(|c| is_type_kind(c.kind()))
                    .map(|c| self.ty(&c))
                    .collect();
                TypeParam {
                    id,
                    span,
                    name,
                    bounds,
                }
            })
            .collect()
    }

    fn supers(&mut self, node: &SyntaxNode) -> Vec<TypeExpr> {
        node.children()
            .find(|n| n.kind() == SyntaxKind::SUPER_LIST)
            .map(|list| {
                list.children()
                    .filter(|c| is_type_kind(c.kind()))
                    .map(|c| self.ty(&c))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn class_like(&mut self, node: &SyntaxNode) -> ClassDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let name = self.name_of(node);
        let type_params = self.type_params(node);
        let supers = self.supers(node);

        let mut fields = Vec::new();
        let mut methods = Vec::new();
        let mut nested = Vec::new();
        for child in node.children() {
            match child.kind() {
                SyntaxKind::FIELD_DECL => fields.push(self.field_decl(&child)),
                SyntaxKind::FN_DECL => methods.push(self.function(&child)),
                k if is_decl_kind(k) => {
                    if let Some(d) = self.decl(&child) {
                        nested.push(d);
                    }
                }
                _ => {}
            }
        }

        ClassDecl {
            id,
            span,
            header,
            name,
            type_params,
            supers,
            fields,
            methods,
            nested,
        }
    }

    fn interface(&mut self, node: &SyntaxNode) -> InterfaceDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let name = self.name_of(node);
        let type_params = self.type_params(node);
        let supers = self.supers(node);
        let methods = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::FN_DECL)
            .map(|n| self.function(&n))
            .collect();
        InterfaceDecl {
            id,
            span,
            header,
            name,
            type_params,
            supers,
            methods,
        }
    }

    fn enum_decl(&mut self, node: &SyntaxNode) -> EnumDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let name = self.name_of(node);
        let variants = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::ENUM_VARIANT)
            .map(|n| EnumVariant {
                id: self.id(),
                span: self.span(&n),
                name: first_token_text(&n).unwrap_or_default(),
            })
            .collect();
        EnumDecl {
            id,
            span,
            header,
            name,
            variants,
        }
    }

    fn data_decl(&mut self, node: &SyntaxNode) -> DataDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let name = self.name_of(node);
        let type_params = self.type_params(node);
        let variants = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::DATA_VARIANT)
            .map(|n| {
                let vid = self.id();
                let vspan = self.span(&n);
                let vname = self.name_of(&n);
                let fields = self.record_fields(&n);
                DataVariant {
                    id: vid,
                    span: vspan,
                    name: vname,
                    fields,
                }
            })
            .collect();
        DataDecl {
            id,
            span,
            header,
            name,
            type_params,
            variants,
        }
    }

    /// Fields from a RECORD_FIELD_LIST child, or RECORD_FIELDs directly under
    /// `node` (struct and spark bodies).
    fn record_fields(&mut self, node: &SyntaxNode) -> Vec<FieldDef> {
        let holder = node
            .children()
            .find(|n| n.kind() == SyntaxKind::RECORD_FIELD_LIST)
            .unwrap_or_else(|| node.clone());
        holder
            .children()
            .filter(|n| n.kind() == SyntaxKind::RECORD_FIELD)
            .map(|n| {
                let id = self.id();
                let span = self.span(&n);
                let name = n
                    .children_with_tokens()
                    .filter_map(|e| e.into_token())
                    .find(|t| t.kind() == SyntaxKind::IDENT)
                    .map(|t| t.text().to_string())
                    .unwrap_or_default();
                let ty = self.first_type(&n);
                FieldDef { id, span, name, ty }
            })
            .collect()
    }

    fn struct_decl(&mut self, node: &SyntaxNode) -> StructDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let name = self.name_of(node);
        let type_params = self.type_params(node);
        let fields = self.record_fields(node);
        let methods = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::FN_DECL)
            .map(|n| self.function(&n))
            .collect();
        StructDecl {
            id,
            span,
            header,
            name,
            type_params,
            fields,
            methods,
        }
    }

    fn spark_decl(&mut self, node: &SyntaxNode) -> SparkDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let name = self.name_of(node);
        let type_params = self.type_params(node);
        let fields = self.record_fields(node);

        let block_of = |this: &mut Self, kind: SyntaxKind| {
            node.children()
                .find(|n| n.kind() == kind)
                .and_then(|n| n.children().find(|c| c.kind() == SyntaxKind::BLOCK))
                .map(|b| this.block(&b))
        };
        let validate = block_of(self, SyntaxKind::VALIDATE_BLOCK);
        let before_update = block_of(self, SyntaxKind::BEFORE_UPDATE_BLOCK);
        let after_update = block_of(self, SyntaxKind::AFTER_UPDATE_BLOCK);

        let computed = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::COMPUTED_PROP)
            .map(|n| {
                let cid = self.id();
                let cspan = self.span(&n);
                let cname = self.name_of(&n);
                let ty = self.first_type(&n);
                let body = n
                    .children()
                    .find(|c| c.kind() == SyntaxKind::BLOCK)
                    .map(|b| self.block(&b))
                    .unwrap_or_else(|| self.empty_block(&cspan));
                ComputedProp {
                    id: cid,
                    span: cspan,
                    name: cname,
                    ty,
                    body,
                }
            })
            .collect();

        let methods = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::FN_DECL)
            .map(|n| self.function(&n))
            .collect();

        SparkDecl {
            id,
            span,
            header,
            name,
            type_params,
            fields,
            validate,
            before_update,
            after_update,
            computed,
            methods,
        }
    }

    fn trait_decl(&mut self, node: &SyntaxNode) -> TraitDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let name = self.name_of(node);
        let type_params = self.type_params(node);
        let supers = self.supers(node);
        let methods = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::FN_DECL)
            .map(|n| self.function(&n))
            .collect();
        TraitDecl {
            id,
            span,
            header,
            name,
            type_params,
            supers,
            methods,
        }
    }

    fn impl_decl(&mut self, node: &SyntaxNode) -> ImplDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let types: Vec<SyntaxNode> = node
            .children()
            .filter(|n| is_type_kind(n.kind()))
            .collect();
        let has_for = node
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .any(|t| t.kind() == SyntaxKind::FOR_KW);

        let (trait_ref, self_ty) = if has_for && types.len() >= 2 {
            (Some(self.ty(&types[0])), self.ty(&types[1]))
        } else if let Some(first) = types.first() {
            (None, self.ty(first))
        } else {
            (None, self.error_type(&span))
        };

        let methods = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::FN_DECL)
            .map(|n| self.function(&n))
            .collect();

        ImplDecl {
            id,
            span,
            header,
            trait_ref,
            self_ty,
            methods,
        }
    }

    fn type_alias(&mut self, node: &SyntaxNode) -> TypeAliasDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let name = self.name_of(node);
        let type_params = self.type_params(node);
        let aliased = self.first_type(node);
        TypeAliasDecl {
            id,
            span,
            header,
            name,
            type_params,
            aliased,
        }
    }

    fn extend_decl(&mut self, node: &SyntaxNode) -> ExtendDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let target = self.first_type(node);
        let methods = node
            .children()
            .filter(|n| n.kind() == SyntaxKind::FN_DECL)
            .map(|n| self.function(&n))
            .collect();
        ExtendDecl {
            id,
            span,
            header,
            target,
            methods,
        }
    }

    fn macro_decl(&mut self, node: &SyntaxNode) -> MacroDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let name = self.name_of(node);
        let params = node
            .children()
            .find(|n| n.kind() == SyntaxKind::PARAM_LIST)
            .map(|list| {
                list.children()
                    .filter(|n| n.kind() == SyntaxKind::PARAM)
                    .filter_map(|n| first_token_text(&n))
                    .collect()
            })
            .unwrap_or_default();
        let body_text = node
            .children()
            .find(|n| n.kind() == SyntaxKind::MACRO_BODY)
            .map(|n| n.text().to_string())
            .unwrap_or_default();
        MacroDecl {
            id,
            span,
            header,
            name,
            params,
            body_text,
        }
    }

    fn exception_decl(&mut self, node: &SyntaxNode) -> ExceptionDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let name = self.name_of(node);
        let fields = if node
            .children()
            .any(|n| n.kind() == SyntaxKind::RECORD_FIELD_LIST)
        {
            self.record_fields(node)
        } else {
            Vec::new()
        };
        let super_ty = node
            .children()
            .find(|n| n.kind() == SyntaxKind::SUPER_LIST)
            .and_then(|list| list.children().find(|c| is_type_kind(c.kind())))
            .map(|t| self.ty(&t));
        ExceptionDecl {
            id,
            span,
            header,
            name,
            fields,
            super_ty,
        }
    }

    fn function(&mut self, node: &SyntaxNode) -> FunctionDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let is_static = has_token(node, SyntaxKind::STATIC_KW);
        let is_async = has_token(node, SyntaxKind::ASYNC_KW);
        let name = self.name_of(node);
        let type_params = self.type_params(node);

        let params = node
            .children()
            .find(|n| n.kind() == SyntaxKind::PARAM_LIST)
            .map(|list| self.params(&list))
            .unwrap_or_default();

        let return_type = node
            .children()
            .find(|n| n.kind() == SyntaxKind::RETURN_TYPE)
            .and_then(|n| n.children().find(|c| is_type_kind(c.kind())))
            .map(|t| self.ty(&t));

        let effects = node
            .children()
            .find(|n| n.kind() == SyntaxKind::EFFECT_CLAUSE)
            .map(|n| {
                n.children_with_tokens()
                    .filter_map(|e| e.into_token())
                    .filter(|t| {
                        matches!(t.kind(), SyntaxKind::IDENT | SyntaxKind::TYPE_IDENT)
                    })
                    .map(|t| t.text().to_string())
                    .collect()
            })
            .unwrap_or_default();

        let requires = node
            .children()
            .find(|n| n.kind() == SyntaxKind::REQUIRES_CLAUSE)
            .and_then(|n| n.children().find(|c| is_expr_kind(c.kind())))
            .map(|e| self.expr(&e));

        let body = node
            .children()
            .find(|n| n.kind() == SyntaxKind::BLOCK)
            .map(|b| self.block(&b));

        FunctionDecl {
            id,
            span,
            header,
            is_static,
            is_async,
            name,
            type_params,
            params,
            return_type,
            effects,
            requires,
            body,
        }
    }

    fn params(&mut self, list: &SyntaxNode) -> Vec<Param> {
        list.children()
            .filter(|n| n.kind() == SyntaxKind::PARAM)
            .map(|n| {
                let id = self.id();
                let span = self.span(&n);
                let name = first_token_text(&n).unwrap_or_default();
                let ty = n
                    .children()
                    .find(|c| is_type_kind(c.kind()))
                    .map(|t| self.ty(&t));
                Param { id, span, name, ty }
            })
            .collect()
    }

    fn field_decl(&mut self, node: &SyntaxNode) -> FieldDecl {
        let id = self.id();
        let span = self.span(node);
        let header = self.header(node);
        let mutable = has_token(node, SyntaxKind::MUT_KW);
        let name = self.name_of(node);
        let ty = node
            .children()
            .find(|c| is_type_kind(c.kind()))
            .map(|t| self.ty(&t));
        let init = node
            .children()
            .find(|c| is_expr_kind(c.kind()))
            .map(|e| self.expr(&e));
        FieldDecl {
            id,
            span,
            header,
            mutable,
            name,
            ty,
            init,
        }
    }

    // ── Types ────────────────────────────────────────────────────────

    fn first_type(&mut self, node: &SyntaxNode) -> TypeExpr {
        match node.children().find(|c| is_type_kind(c.kind())) {
            Some(t) => self.ty(&t),
            None => {
                let span = self.span(node);
                self.error_type(&span)
            }
        }
    }

    fn error_type(&mut self, span: &SourceSpan) -> TypeExpr {
        TypeExpr {
            id: self.id(),
            span: span.clone(),
            kind: TypeKind::Error,
        }
    }

    fn ty(&mut self, node: &SyntaxNode) -> TypeExpr {
        use SyntaxKind::*;
        let id = self.id();
        let span = self.span(node);
        let kind = match node.kind() {
            NAMED_TYPE => {
                let path = node
                    .children()
                    .find(|n| n.kind() == PATH)
                    .map(|p| self.path(&p))
                    .unwrap_or_else(|| DottedPath::new(Vec::new(), span.clone()));
                let args: Vec<TypeExpr> = node
                    .children()
                    .find(|n| n.kind() == GENERIC_ARG_LIST)
                    .map(|list| {
                        list.children()
                            .filter(|c| is_type_kind(c.kind()))
                            .map(|c| self.ty(&c))
                            .collect()
                    })
                    .unwrap_or_default();
                if args.is_empty() && path.segments.len() == 1 {
                    match PrimKind::from_name(&path.segments[0]) {
                        Some(p) => TypeKind::Primitive(p),
                        None => TypeKind::Named { path, args },
                    }
                } else {
                    TypeKind::Named { path, args }
                }
            }
            OPTIONAL_TYPE => TypeKind::Optional(Box::new(self.first_type(node))),
            ARRAY_TYPE => TypeKind::Array(Box::new(self.first_type(node))),
            MAP_TYPE => {
                let types: Vec<SyntaxNode> = node
                    .children()
                    .filter(|c| is_type_kind(c.kind()))
                    .collect();
                let key = types
                    .first()
                    .map(|t| self.ty(t))
                    .unwrap_or_else(|| self.error_type(&span));
                let value = types
                    .get(1)
                    .map(|t| self.ty(t))
                    .unwrap_or_else(|| self.error_type(&span));
                TypeKind::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
            REF_TYPE => TypeKind::Reference {
                mutable: has_token(node, MUT_KW),
                inner: Box::new(self.first_type(node)),
            },
            FN_TYPE => {
                let params = node
                    .children()
                    .find(|n| n.kind() == FN_TYPE_PARAMS)
                    .map(|list| {
                        list.children()
                            .filter(|c| is_type_kind(c.kind()))
                            .map(|c| self.ty(&c))
                            .collect()
                    })
                    .unwrap_or_default();
                let ret = node
                    .children()
                    .filter(|c| is_type_kind(c.kind()))
                    .last()
                    .map(|c| self.ty(&c))
                    .unwrap_or_else(|| self.error_type(&span));
                TypeKind::Function {
                    params,
                    ret: Box::new(ret),
                }
            }
            TUPLE_TYPE => {
                let mut elems: Vec<TypeExpr> = node
                    .children()
                    .find(|n| n.kind() == FN_TYPE_PARAMS)
                    .map(|list| {
                        list.children()
                            .filter(|c| is_type_kind(c.kind()))
                            .map(|c| self.ty(&c))
                            .collect()
                    })
                    .unwrap_or_default();
                if elems.len() == 1 {
                    // `(T)` is grouping, not a one-tuple.
                    return elems.remove(0);
                }
                TypeKind::Tuple(elems)
            }
            UNION_TYPE => {
                return self.fold_type_op(node, span, true);
            }
            INTERSECTION_TYPE => {
                return self.fold_type_op(node, span, false);
            }
            _ => TypeKind::Error,
        };
        TypeExpr { id, span, kind }
    }

    /// Left-fold `A | B | C` (or `&`) into nested binary type nodes.
    fn fold_type_op(&mut self, node: &SyntaxNode, span: SourceSpan, union: bool) -> TypeExpr {
        let parts: Vec<TypeExpr> = node
            .children()
            .filter(|c| is_type_kind(c.kind()))
            .map(|c| self.ty(&c))
            .collect();
        let mut iter = parts.into_iter();
        let Some(mut acc) = iter.next() else {
            return self.error_type(&span);
        };
        for next in iter {
            let id = self.id();
            let kind = if union {
                TypeKind::Union(Box::new(acc), Box::new(next))
            } else {
                TypeKind::Intersection(Box::new(acc), Box::new(next))
            };
            acc = TypeExpr {
                id,
                span: span.clone(),
                kind,
            };
        }
        acc
    }

    // ── Blocks & statements ──────────────────────────────────────────

    fn empty_block(&mut self, span: &SourceSpan) -> Block {
        Block {
            id: self.id(),
            span: span.clone(),
            stmts: Vec::new(),
            tail: None,
        }
    }

    fn block(&mut self, node: &SyntaxNode) -> Block {
        let id = self.id();
        let span = self.span(node);

        let children: Vec<SyntaxNode> = node
            .children()
            .filter(|n| {
                n.kind() == SyntaxKind::LET_STMT
                    || n.kind() == SyntaxKind::EXPR_STMT
                    || is_expr_kind(n.kind())
            })
            .collect();

        let mut stmts = Vec::new();
        let mut tail = None;
        let last_index = children.len().saturating_sub(1);
        for (i, child) in children.iter().enumerate() {
            match child.kind() {
                SyntaxKind::LET_STMT => stmts.push(Stmt::Let(self.let_stmt(child))),
                SyntaxKind::EXPR_STMT => {
                    if let Some(inner) = child.children().find(|n| is_expr_kind(n.kind())) {
                        stmts.push(Stmt::Expr(self.expr(&inner)));
                    }
                }
                _ => {
                    let e = self.expr(child);
                    if i == last_index {
                        tail = Some(Box::new(e));
                    } else {
                        stmts.push(Stmt::Expr(e));
                    }
                }
            }
        }

        Block {
            id,
            span,
            stmts,
            tail,
        }
    }

    fn let_stmt(&mut self, node: &SyntaxNode) -> LetStmt {
        let id = self.id();
        let span = self.span(node);
        let mutable = has_token(node, SyntaxKind::MUT_KW);
        let pattern = node
            .children()
            .find(|n| is_pattern_kind(n.kind()))
            .map(|p| self.pattern(&p))
            .unwrap_or_else(|| Pattern {
                id: self.id(),
                span: span.clone(),
                kind: PatternKind::Error,
            });
        let ty = node
            .children()
            .find(|n| is_type_kind(n.kind()))
            .map(|t| self.ty(&t));
        let init = node
            .children()
            .find(|n| is_expr_kind(n.kind()))
            .map(|e| self.expr(&e));
        LetStmt {
            id,
            span,
            mutable,
            pattern,
            ty,
            init,
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn exprs_in(&mut self, node: &SyntaxNode) -> Vec<Expr> {
        node.children()
            .filter(|n| is_expr_kind(n.kind()))
            .map(|n| self.expr(&n))
            .collect()
    }

    fn first_expr(&mut self, node: &SyntaxNode) -> Expr {
        match node.children().find(|n| is_expr_kind(n.kind())) {
            Some(e) => self.expr(&e),
            None => {
                let span = self.span(node);
                self.error_expr(&span)
            }
        }
    }

    fn error_expr(&mut self, span: &SourceSpan) -> Expr {
        Expr {
            id: self.id(),
            span: span.clone(),
            kind: ExprKind::Error,
        }
    }

    fn expr(&mut self, node: &SyntaxNode) -> Expr {
        use SyntaxKind::*;
        let id = self.id();
        let span = self.span(node);
        let kind = match node.kind() {
            LITERAL => self.literal_expr(node, &span),
            INTERP_STRING_EXPR => self.interpolated(node),
            SELF_EXPR => ExprKind::SelfRef,
            PATH_EXPR => self.path_expr(node),
            PAREN_EXPR => return self.first_expr(node),
            TUPLE_EXPR => ExprKind::TupleLit(self.exprs_in(node)),
            ARRAY_LITERAL => ExprKind::ArrayLit(self.exprs_in(node)),
            MAP_LITERAL => {
                let entries = node
                    .children()
                    .filter(|n| n.kind() == MAP_ENTRY)
                    .map(|entry| {
                        let exprs = self.exprs_in(&entry);
                        let mut iter = exprs.into_iter();
                        let k = iter
                            .next()
                            .unwrap_or_else(|| self.error_expr(&span));
                        let v = iter
                            .next()
                            .unwrap_or_else(|| self.error_expr(&span));
                        (k, v)
                    })
                    .collect();
                ExprKind::MapLit(entries)
            }
            STRUCT_LITERAL => {
                let path = node
                    .children()
                    .find(|n| n.kind() == PATH_EXPR)
                    .map(|p| self.path_of_path_expr(&p))
                    .unwrap_or_else(|| DottedPath::new(Vec::new(), span.clone()));
                let fields = node
                    .children()
                    .filter(|n| n.kind() == STRUCT_LIT_FIELD)
                    .map(|f| {
                        let name = first_token_text(&f).unwrap_or_default();
                        let value = self.first_expr(&f);
                        (name, value)
                    })
                    .collect();
                ExprKind::StructLit { path, fields }
            }
            BINARY_EXPR => return self.binary(node, id, span),
            RANGE_EXPR => {
                let (lhs, rhs) = self.two_exprs(node, &span);
                let inclusive = has_token(node, DOT_DOT_EQ);
                ExprKind::Range {
                    lo: Box::new(lhs),
                    hi: Box::new(rhs),
                    inclusive,
                }
            }
            UNARY_EXPR => {
                let op = if has_token(node, BANG) {
                    UnaryOp::Not
                } else {
                    UnaryOp::Neg
                };
                ExprKind::Unary {
                    op,
                    operand: Box::new(self.first_expr(node)),
                }
            }
            CALL_EXPR => return self.call(node, id, span),
            FIELD_ACCESS => ExprKind::FieldAccess {
                recv: Box::new(self.first_expr(node)),
                name: member_name(node),
            },
            SAFE_ACCESS => ExprKind::SafeAccess {
                recv: Box::new(self.first_expr(node)),
                name: member_name(node),
            },
            INDEX_EXPR => {
                let (recv, index) = self.two_exprs(node, &span);
                ExprKind::Index {
                    recv: Box::new(recv),
                    index: Box::new(index),
                }
            }
            AWAIT_EXPR => ExprKind::Await(Box::new(self.first_expr(node))),
            UNWRAP_EXPR => ExprKind::Unwrap(Box::new(self.first_expr(node))),
            FORCE_UNWRAP_EXPR => ExprKind::ForceUnwrap(Box::new(self.first_expr(node))),
            CAST_EXPR => ExprKind::Cast {
                expr: Box::new(self.first_expr(node)),
                ty: self.first_type(node),
            },
            TYPE_CHECK_EXPR => ExprKind::TypeCheck {
                expr: Box::new(self.first_expr(node)),
                ty: self.first_type(node),
            },
            BLOCK => ExprKind::Block(self.block(node)),
            IF_EXPR => return self.if_expr(node, id, span),
            WHILE_EXPR => return self.while_expr(node, id, span),
            FOR_EXPR => {
                let binding = node
                    .children()
                    .find(|n| is_pattern_kind(n.kind()))
                    .map(|p| self.pattern(&p))
                    .unwrap_or_else(|| Pattern {
                        id: self.id(),
                        span: span.clone(),
                        kind: PatternKind::Error,
                    });
                let iterable = self.first_expr(node);
                let body = node
                    .children()
                    .find(|n| n.kind() == BLOCK)
                    .map(|b| self.block(&b))
                    .unwrap_or_else(|| self.empty_block(&span));
                ExprKind::For {
                    binding,
                    iterable: Box::new(iterable),
                    body,
                }
            }
            MATCH_EXPR => {
                let scrutinee = self.first_expr(node);
                let arms = node
                    .children()
                    .find(|n| n.kind() == MATCH_ARM_LIST)
                    .map(|list| {
                        list.children()
                            .filter(|n| n.kind() == MATCH_ARM)
                            .map(|a| self.match_arm(&a))
                            .collect()
                    })
                    .unwrap_or_default();
                ExprKind::Match {
                    scrutinee: Box::new(scrutinee),
                    arms,
                }
            }
            LAMBDA_EXPR => {
                let params = node
                    .children()
                    .find(|n| n.kind() == LAMBDA_PARAM_LIST)
                    .map(|list| self.params(&list))
                    .unwrap_or_default();
                let return_type = node
                    .children()
                    .find(|n| n.kind() == RETURN_TYPE)
                    .and_then(|n| n.children().find(|c| is_type_kind(c.kind())))
                    .map(|t| self.ty(&t));
                let body = self.first_expr(node);
                ExprKind::Lambda {
                    params,
                    return_type,
                    body: Box::new(body),
                }
            }
            RETURN_EXPR => {
                let value = node
                    .children()
                    .find(|n| is_expr_kind(n.kind()))
                    .map(|e| Box::new(self.expr(&e)));
                ExprKind::Return(value)
            }
            BREAK_EXPR => ExprKind::Break,
            CONTINUE_EXPR => ExprKind::Continue,
            THROW_EXPR => ExprKind::Throw(Box::new(self.first_expr(node))),
            TRY_EXPR => {
                let body = node
                    .children()
                    .find(|n| n.kind() == BLOCK)
                    .map(|b| self.block(&b))
                    .unwrap_or_else(|| self.empty_block(&span));
                let catches = node
                    .children()
                    .filter(|n| n.kind() == CATCH_CLAUSE)
                    .map(|c| {
                        let cid = self.id();
                        let cspan = self.span(&c);
                        let pattern = c
                            .children()
                            .find(|n| is_pattern_kind(n.kind()))
                            .map(|p| self.pattern(&p))
                            .unwrap_or_else(|| Pattern {
                                id: self.id(),
                                span: cspan.clone(),
                                kind: PatternKind::Error,
                            });
                        let body = c
                            .children()
                            .find(|n| n.kind() == BLOCK)
                            .map(|b| self.block(&b))
                            .unwrap_or_else(|| self.empty_block(&cspan));
                        CatchClause {
                            id: cid,
                            span: cspan,
                            pattern,
                            body,
                        }
                    })
                    .collect();
                let finally = node
                    .children()
                    .find(|n| n.kind() == FINALLY_CLAUSE)
                    .and_then(|f| f.children().find(|n| n.kind() == BLOCK))
                    .map(|b| self.block(&b));
                ExprKind::Try {
                    body,
                    catches,
                    finally,
                }
            }
            CONCURRENT_EXPR => {
                let bindings = node
                    .children()
                    .filter(|n| n.kind() == CONCURRENT_BINDING)
                    .map(|b| {
                        let bid = self.id();
                        let bspan = self.span(&b);
                        let name = b
                            .children()
                            .find(|n| n.kind() == NAME)
                            .and_then(|n| first_token_text(&n))
                            .unwrap_or_default();
                        let init = self.first_expr(&b);
                        ConcurrentBinding {
                            id: bid,
                            span: bspan,
                            name,
                            init,
                        }
                    })
                    .collect();
                ExprKind::Concurrent { bindings }
            }
            RACE_EXPR => ExprKind::Race {
                clauses: self.exprs_in(node),
            },
            TIMEOUT_EXPR => {
                let duration = self.first_expr(node);
                let body = node
                    .children()
                    .find(|n| n.kind() == BLOCK)
                    .map(|b| self.block(&b))
                    .unwrap_or_else(|| self.empty_block(&span));
                ExprKind::Timeout {
                    duration: Box::new(duration),
                    body,
                }
            }
            WITH_EXPR => {
                let args = node
                    .children()
                    .find(|n| n.kind() == ARG_LIST)
                    .map(|a| self.exprs_in(&a))
                    .unwrap_or_default();
                let body = node
                    .children()
                    .find(|n| n.kind() == BLOCK)
                    .map(|b| self.block(&b))
                    .unwrap_or_else(|| self.empty_block(&span));
                ExprKind::With { args, body }
            }
            NEW_EXPR => {
                let ty = self.first_type(node);
                let args = node
                    .children()
                    .find(|n| n.kind() == ARG_LIST)
                    .map(|a| self.exprs_in(&a))
                    .unwrap_or_default();
                ExprKind::New { ty, args }
            }
            _ => ExprKind::Error,
        };
        Expr { id, span, kind }
    }

    fn literal_expr(&mut self, node: &SyntaxNode, span: &SourceSpan) -> ExprKind {
        use SyntaxKind::*;
        let Some(tok) = node
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| t.kind() != WHITESPACE)
        else {
            return ExprKind::Error;
        };
        let lit = match tok.kind() {
            INT_LIT => match parse_int(tok.text()) {
                Some(v) => Literal::Int(v),
                None => {
                    self.error(
                        format!("integer literal `{}` out of range", tok.text()),
                        span.clone(),
                    );
                    Literal::Int(0)
                }
            },
            FLOAT_LIT => Literal::Float(parse_float(tok.text())),
            STRING_LIT => Literal::Str(unescape(strip_quotes(tok.text()))),
            CHAR_LIT => Literal::Char(parse_char(tok.text())),
            TRUE_KW => Literal::Bool(true),
            FALSE_KW => Literal::Bool(false),
            NONE_KW => Literal::None,
            _ => return ExprKind::Error,
        };
        ExprKind::Literal(lit)
    }

    /// Split an `f"a {x} b"` token into text segments and expression holes;
    /// holes are re-parsed as expression fragments.
    fn interpolated(&mut self, node: &SyntaxNode) -> ExprKind {
        let span = self.span(node);
        let Some(tok) = node
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| t.kind() == SyntaxKind::INTERP_STRING_LIT)
        else {
            return ExprKind::Error;
        };
        let text = tok.text();
        // Strip `f"` prefix and `"` suffix.
        let inner = text
            .strip_prefix("f\"")
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or("");

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = inner.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(next) = chars.next() {
                        literal.push_str(&unescape_one(next));
                    }
                }
                '{' => {
                    if !literal.is_empty() {
                        parts.push(InterpPart::Text(std::mem::take(&mut literal)));
                    }
                    let mut depth = 1usize;
                    let mut hole = String::new();
                    for hc in chars.by_ref() {
                        match hc {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    break;
                                }
                            }
                            _ => {}
                        }
                        hole.push(hc);
                    }
                    let expr = self.fragment_expr(&hole, &span);
                    parts.push(InterpPart::Hole(Box::new(expr)));
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(InterpPart::Text(literal));
        }
        ExprKind::Interpolated(parts)
    }

    /// Parse and lower an expression fragment; all nodes take `span`.
    fn fragment_expr(&mut self, text: &str, span: &SourceSpan) -> Expr {
        let parse = crate::parser::parse_expr_fragment(text);
        let root = parse.syntax();
        let expr_node = root.children().find(|n| is_expr_kind(n.kind()));
        let saved = self.span_override.replace(span.clone());
        let result = match expr_node {
            Some(n) => self.expr(&n),
            None => {
                self.error("empty interpolation hole", span.clone());
                self.error_expr(span)
            }
        };
        self.span_override = saved;
        result
    }

    fn path_expr(&mut self, node: &SyntaxNode) -> ExprKind {
        let path = self.path_of_path_expr(node);
        if path.segments.len() == 1 {
            let seg = &path.segments[0];
            if seg.chars().next().map(char::is_lowercase).unwrap_or(false) {
                return ExprKind::Identifier(seg.clone());
            }
        }
        ExprKind::Path(path)
    }

    fn path_of_path_expr(&mut self, node: &SyntaxNode) -> DottedPath {
        let span = self.span(node);
        let segments = node
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| matches!(t.kind(), SyntaxKind::IDENT | SyntaxKind::TYPE_IDENT))
            .map(|t| t.text().to_string())
            .collect();
        DottedPath::new(segments, span)
    }

    fn two_exprs(&mut self, node: &SyntaxNode, span: &SourceSpan) -> (Expr, Expr) {
        let mut iter = node.children().filter(|n| is_expr_kind(n.kind()));
        let first = match iter.next() {
            Some(n) => self.expr(&n),
            None => self.error_expr(span),
        };
        let second = match iter.next() {
            Some(n) => self.expr(&n),
            None => self.error_expr(span),
        };
        (first, second)
    }

    fn binary(&mut self, node: &SyntaxNode, id: NodeId, span: SourceSpan) -> Expr {
        use SyntaxKind::*;
        let ops: Vec<SyntaxKind> = node
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .map(|t| t.kind())
            .filter(|k| {
                !matches!(k, WHITESPACE | DOC_COMMENT)
            })
            .collect();
        let (lhs, rhs) = self.two_exprs(node, &span);
        let lhs = Box::new(lhs);
        let rhs = Box::new(rhs);

        // Adjacent angle tokens are a shift.
        let op_token = if ops.len() >= 2 && ops[0] == LT && ops[1] == LT {
            Some((BinaryOp::Shl, false))
        } else if ops.len() >= 2 && ops[0] == GT && ops[1] == GT {
            Some((BinaryOp::Shr, false))
        } else {
            ops.first().map(|k| match k {
                PLUS => (BinaryOp::Add, false),
                MINUS => (BinaryOp::Sub, false),
                STAR => (BinaryOp::Mul, false),
                SLASH => (BinaryOp::Div, false),
                PERCENT => (BinaryOp::Rem, false),
                STAR_STAR => (BinaryOp::Pow, false),
                EQ_EQ => (BinaryOp::Eq, false),
                NOT_EQ => (BinaryOp::Ne, false),
                LT => (BinaryOp::Lt, false),
                LT_EQ => (BinaryOp::Le, false),
                GT => (BinaryOp::Gt, false),
                GT_EQ => (BinaryOp::Ge, false),
                AMP_AMP => (BinaryOp::And, false),
                PIPE_PIPE => (BinaryOp::Or, false),
                AMP => (BinaryOp::BitAnd, false),
                PIPE => (BinaryOp::BitOr, false),
                CARET => (BinaryOp::BitXor, false),
                PLUS_EQ => (BinaryOp::Add, true),
                MINUS_EQ => (BinaryOp::Sub, true),
                STAR_EQ => (BinaryOp::Mul, true),
                SLASH_EQ => (BinaryOp::Div, true),
                PERCENT_EQ => (BinaryOp::Rem, true),
                _ => (BinaryOp::Add, false),
            })
        };

        let kind = if ops.contains(&EQ) {
            ExprKind::Assignment {
                target: lhs,
                value: rhs,
            }
        } else if ops.contains(&QUESTION_QUESTION) {
            ExprKind::Coalesce { lhs, rhs }
        } else if ops.contains(&QUESTION_COLON) {
            ExprKind::Elvis { lhs, rhs }
        } else {
            match op_token {
                Some((op, true)) => ExprKind::CompoundAssignment {
                    op,
                    target: lhs,
                    value: rhs,
                },
                Some((op, false)) => ExprKind::Binary { op, lhs, rhs },
                None => ExprKind::Error,
            }
        };
        Expr { id, span, kind }
    }

    fn call(&mut self, node: &SyntaxNode, id: NodeId, span: SourceSpan) -> Expr {
        use SyntaxKind::*;
        let args = node
            .children()
            .find(|n| n.kind() == ARG_LIST)
            .map(|a| self.exprs_in(&a))
            .unwrap_or_default();
        let callee_node = node.children().find(|n| is_expr_kind(n.kind()));

        let kind = match callee_node {
            Some(callee) => match callee.kind() {
                FIELD_ACCESS => {
                    let recv = self.first_expr(&callee);
                    ExprKind::MethodCall {
                        recv: Box::new(recv),
                        name: member_name(&callee),
                        args,
                        safe: false,
                    }
                }
                SAFE_ACCESS => {
                    let recv = self.first_expr(&callee);
                    ExprKind::MethodCall {
                        recv: Box::new(recv),
                        name: member_name(&callee),
                        args,
                        safe: true,
                    }
                }
                PATH_EXPR => {
                    let path = self.path_of_path_expr(&callee);
                    let last_lower = path
                        .last()
                        .and_then(|s| s.chars().next())
                        .map(char::is_lowercase)
                        .unwrap_or(false);
                    if path.segments.len() >= 2 && last_lower {
                        // `Math::abs(x)` — a static call on a type.
                        let mut type_path = path.clone();
                        let name = type_path.segments.pop().unwrap_or_default();
                        ExprKind::StaticCall {
                            type_path,
                            name,
                            args,
                        }
                    } else {
                        let callee = self.expr(&callee);
                        ExprKind::Call {
                            callee: Box::new(callee),
                            args,
                        }
                    }
                }
                _ => {
                    let callee = self.expr(&callee);
                    ExprKind::Call {
                        callee: Box::new(callee),
                        args,
                    }
                }
            },
            None => ExprKind::Error,
        };
        Expr { id, span, kind }
    }

    /// `if` with a plain condition stays `If`; `if let` desugars to `match`.
    fn if_expr(&mut self, node: &SyntaxNode, id: NodeId, span: SourceSpan) -> Expr {
        use SyntaxKind::*;
        let blocks: Vec<SyntaxNode> = node.children().filter(|n| n.kind() == BLOCK).collect();
        let else_if = node.children().find(|n| n.kind() == IF_EXPR);

        let then_node = blocks.first();
        let then_branch = then_node
            .map(|b| self.block(b))
            .unwrap_or_else(|| self.empty_block(&span));

        let else_branch: Option<Box<Expr>> = if let Some(elif) = else_if {
            Some(Box::new(self.expr(&elif)))
        } else {
            blocks.get(1).map(|b| {
                let block = self.block(b);
                Box::new(Expr {
                    id: self.id(),
                    span: block.span.clone(),
                    kind: ExprKind::Block(block),
                })
            })
        };

        if let Some(cond) = node.children().find(|n| n.kind() == LET_CONDITION) {
            // `if let p = e { a } else { b }`  →  `match e { p => a, _ => b }`
            let pattern = cond
                .children()
                .find(|n| is_pattern_kind(n.kind()))
                .map(|p| self.pattern(&p))
                .unwrap_or_else(|| Pattern {
                    id: self.id(),
                    span: span.clone(),
                    kind: PatternKind::Error,
                });
            let scrutinee = self.first_expr(&cond);

            let then_arm = MatchArm {
                id: self.id(),
                span: then_branch.span.clone(),
                pattern,
                body: Expr {
                    id: self.id(),
                    span: then_branch.span.clone(),
                    kind: ExprKind::Block(then_branch),
                },
            };
            let else_body = match else_branch {
                Some(e) => *e,
                None => {
                    let b = self.empty_block(&span);
                    Expr {
                        id: self.id(),
                        span: span.clone(),
                        kind: ExprKind::Block(b),
                    }
                }
            };
            let wild_arm = MatchArm {
                id: self.id(),
                span: else_body.span.clone(),
                pattern: Pattern {
                    id: self.id(),
                    span: else_body.span.clone(),
                    kind: PatternKind::Wildcard,
                },
                body: else_body,
            };
            return Expr {
                id,
                span,
                kind: ExprKind::Match {
                    scrutinee: Box::new(scrutinee),
                    arms: vec![then_arm, wild_arm],
                },
            };
        }

        let cond = self.first_expr(node);
        Expr {
            id,
            span,
            kind: ExprKind::If {
                cond: Box::new(cond),
                then_branch,
                else_branch,
            },
        }
    }

    /// `while let p = e { b }` → `while true { match e { p => b, _ => break } }`
    fn while_expr(&mut self, node: &SyntaxNode, id: NodeId, span: SourceSpan) -> Expr {
        use SyntaxKind::*;
        let body = node
            .children()
            .find(|n| n.kind() == BLOCK)
            .map(|b| self.block(&b))
            .unwrap_or_else(|| self.empty_block(&span));

        if let Some(cond) = node.children().find(|n| n.kind() == LET_CONDITION) {
            let pattern = cond
                .children()
                .find(|n| is_pattern_kind(n.kind()))
                .map(|p| self.pattern(&p))
                .unwrap_or_else(|| Pattern {
                    id: self.id(),
                    span: span.clone(),
                    kind: PatternKind::Error,
                });
            let scrutinee = self.first_expr(&cond);

            let body_arm = MatchArm {
                id: self.id(),
                span: body.span.clone(),
                pattern,
                body: Expr {
                    id: self.id(),
                    span: body.span.clone(),
                    kind: ExprKind::Block(body),
                },
            };
            let break_arm = MatchArm {
                id: self.id(),
                span: span.clone(),
                pattern: Pattern {
                    id: self.id(),
                    span: span.clone(),
                    kind: PatternKind::Wildcard,
                },
                body: Expr {
                    id: self.id(),
                    span: span.clone(),
                    kind: ExprKind::Break,
                },
            };
            let match_expr = Expr {
                id: self.id(),
                span: span.clone(),
                kind: ExprKind::Match {
                    scrutinee: Box::new(scrutinee),
                    arms: vec![body_arm, break_arm],
                },
            };
            let loop_body = Block {
                id: self.id(),
                span: span.clone(),
                stmts: vec![Stmt::Expr(match_expr)],
                tail: None,
            };
            let true_cond = Expr {
                id: self.id(),
                span: span.clone(),
                kind: ExprKind::Literal(Literal::Bool(true)),
            };
            return Expr {
                id,
                span,
                kind: ExprKind::While {
                    cond: Box::new(true_cond),
                    body: loop_body,
                },
            };
        }

        let cond = self.first_expr(node);
        Expr {
            id,
            span,
            kind: ExprKind::While {
                cond: Box::new(cond),
                body,
            },
        }
    }

    fn match_arm(&mut self, node: &SyntaxNode) -> MatchArm {
        let id = self.id();
        let span = self.span(node);
        let mut pattern = node
            .children()
            .find(|n| is_pattern_kind(n.kind()))
            .map(|p| self.pattern(&p))
            .unwrap_or_else(|| Pattern {
                id: self.id(),
                span: span.clone(),
                kind: PatternKind::Error,
            });

        // A `when` guard wraps the pattern.
        if let Some(guard) = node
            .children()
            .find(|n| n.kind() == SyntaxKind::GUARD_CLAUSE)
        {
            let cond = self.first_expr(&guard);
            let gspan = self.span(&guard);
            pattern = Pattern {
                id: self.id(),
                span: gspan,
                kind: PatternKind::Guard {
                    inner: Box::new(pattern),
                    cond: Box::new(cond),
                },
            };
        }

        // The body is the last expression child (the guard holds its own).
        let body = node
            .children()
            .filter(|n| is_expr_kind(n.kind()))
            .last()
            .map(|e| self.expr(&e))
            .unwrap_or_else(|| self.error_expr(&span));

        MatchArm {
            id,
            span,
            pattern,
            body,
        }
    }

    // ── Patterns ─────────────────────────────────────────────────────

    fn pattern(&mut self, node: &SyntaxNode) -> Pattern {
        use SyntaxKind::*;
        let id = self.id();
        let span = self.span(node);
        let kind = match node.kind() {
            WILDCARD_PAT => PatternKind::Wildcard,
            LITERAL_PAT => PatternKind::Literal(self.pattern_literal(node)),
            RANGE_PAT => {
                let lits = self.pattern_literals(node);
                let inclusive = has_token(node, DOT_DOT_EQ);
                let mut iter = lits.into_iter();
                PatternKind::Range {
                    lo: iter.next().unwrap_or(Literal::Int(0)),
                    hi: iter.next().unwrap_or(Literal::Int(0)),
                    inclusive,
                }
            }
            BINDING_PAT => {
                let name = node
                    .children_with_tokens()
                    .filter_map(|e| e.into_token())
                    .find(|t| t.kind() == IDENT)
                    .map(|t| t.text().to_string())
                    .unwrap_or_default();
                let mutable = has_token(node, MUT_KW);
                let ty = node
                    .children()
                    .find(|n| is_type_kind(n.kind()))
                    .map(|t| self.ty(&t));
                PatternKind::Binding { name, mutable, ty }
            }
            TUPLE_STRUCT_PAT => {
                let path = node
                    .children()
                    .find(|n| n.kind() == PATH)
                    .map(|p| self.path(&p))
                    .unwrap_or_else(|| DottedPath::new(Vec::new(), span.clone()));
                let elems = node
                    .children()
                    .filter(|n| is_pattern_kind(n.kind()))
                    .map(|p| self.pattern(&p))
                    .collect();
                PatternKind::TupleStruct { path, elems }
            }
            STRUCT_PAT => {
                let path = node
                    .children()
                    .find(|n| n.kind() == PATH)
                    .map(|p| self.path(&p))
                    .unwrap_or_else(|| DottedPath::new(Vec::new(), span.clone()));
                let fields = node
                    .children()
                    .filter(|n| n.kind() == STRUCT_PAT_FIELD)
                    .map(|f| {
                        let name = first_token_text(&f).unwrap_or_default();
                        let sub = f
                            .children()
                            .find(|n| is_pattern_kind(n.kind()))
                            .map(|p| self.pattern(&p));
                        (name, sub)
                    })
                    .collect();
                let rest = node.children().any(|n| n.kind() == REST_PAT);
                PatternKind::Struct { path, fields, rest }
            }
            TUPLE_PAT => PatternKind::Tuple(
                node.children()
                    .filter(|n| is_pattern_kind(n.kind()))
                    .map(|p| self.pattern(&p))
                    .collect(),
            ),
            ARRAY_PAT => {
                let mut prefix = Vec::new();
                let mut suffix = Vec::new();
                let mut rest: Option<Option<String>> = None;
                for child in node.children() {
                    if child.kind() == REST_PAT {
                        let name = child
                            .children_with_tokens()
                            .filter_map(|e| e.into_token())
                            .find(|t| t.kind() == IDENT)
                            .map(|t| t.text().to_string());
                        rest = Some(name);
                    } else if is_pattern_kind(child.kind()) {
                        let p = self.pattern(&child);
                        if rest.is_none() {
                            prefix.push(p);
                        } else {
                            suffix.push(p);
                        }
                    }
                }
                PatternKind::Array {
                    prefix,
                    rest,
                    suffix,
                }
            }
            OR_PAT => PatternKind::Or(
                node.children()
                    .filter(|n| is_pattern_kind(n.kind()))
                    .map(|p| self.pattern(&p))
                    .collect(),
            ),
            _ => PatternKind::Error,
        };
        Pattern { id, span, kind }
    }

    fn pattern_literal(&mut self, node: &SyntaxNode) -> Literal {
        self.pattern_literals(node)
            .into_iter()
            .next()
            .unwrap_or(Literal::Int(0))
    }

    /// Literal tokens within a literal/range pattern, applying a leading `-`.
    fn pattern_literals(&mut self, node: &SyntaxNode) -> Vec<Literal> {
        use SyntaxKind::*;
        let mut out = Vec::new();
        let mut negate = false;
        for tok in node
            .children_with_tokens()
            .filter_map(|e| e.into_token())
        {
            match tok.kind() {
                MINUS => negate = true,
                INT_LIT => {
                    let v = parse_int(tok.text()).unwrap_or(0);
                    out.push(Literal::Int(if negate { -v } else { v }));
                    negate = false;
                }
                FLOAT_LIT => {
                    let v = parse_float(tok.text());
                    out.push(Literal::Float(if negate { -v } else { v }));
                    negate = false;
                }
                STRING_LIT => out.push(Literal::Str(unescape(strip_quotes(tok.text())))),
                CHAR_LIT => out.push(Literal::Char(parse_char(tok.text()))),
                TRUE_KW => out.push(Literal::Bool(true)),
                FALSE_KW => out.push(Literal::Bool(false)),
                NONE_KW => out.push(Literal::None),
                _ => {}
            }
        }
        out
    }
}

// ── Kind classification ──────────────────────────────────────────────

pub(crate) fn is_expr_kind(kind: SyntaxKind) -> bool {
    use SyntaxKind::*;
    matches!(
        kind,
        LITERAL | INTERP_STRING_EXPR | PATH_EXPR | SELF_EXPR | PAREN_EXPR | TUPLE_EXPR
            | ARRAY_LITERAL | MAP_LITERAL | STRUCT_LITERAL | BINARY_EXPR | RANGE_EXPR
            | UNARY_EXPR | CALL_EXPR | FIELD_ACCESS | SAFE_ACCESS | INDEX_EXPR | AWAIT_EXPR
            | UNWRAP_EXPR | FORCE_UNWRAP_EXPR | CAST_EXPR | TYPE_CHECK_EXPR | BLOCK | IF_EXPR
            | WHILE_EXPR | FOR_EXPR | MATCH_EXPR | LAMBDA_EXPR | RETURN_EXPR | BREAK_EXPR
            | CONTINUE_EXPR | THROW_EXPR | TRY_EXPR | CONCURRENT_EXPR | RACE_EXPR
            | TIMEOUT_EXPR | WITH_EXPR | NEW_EXPR | ERROR_NODE
    )
}

pub(crate) fn is_pattern_kind(kind: SyntaxKind) -> bool {
    use SyntaxKind::*;
    matches!(
        kind,
        LITERAL_PAT | BINDING_PAT | STRUCT_PAT | TUPLE_STRUCT_PAT | TUPLE_PAT | ARRAY_PAT
            | RANGE_PAT | WILDCARD_PAT | OR_PAT | GUARD_PAT
    )
}

pub(crate) fn is_type_kind(kind: SyntaxKind) -> bool {
    use SyntaxKind::*;
    matches!(
        kind,
        PRIMITIVE_TYPE | NAMED_TYPE | OPTIONAL_TYPE | ARRAY_TYPE | MAP_TYPE | REF_TYPE
            | FN_TYPE | TUPLE_TYPE | UNION_TYPE | INTERSECTION_TYPE
    )
}

pub(crate) fn is_decl_kind(kind: SyntaxKind) -> bool {
    use SyntaxKind::*;
    matches!(
        kind,
        CLASS_DECL | INTERFACE_DECL | ENUM_DECL | DATA_DECL | STRUCT_DECL | SPARK_DECL
            | TRAIT_DECL | PROTOCOL_DECL | IMPL_DECL | TYPE_ALIAS_DECL | EXTEND_DECL
            | CONTEXT_DECL | SUPERVISOR_DECL | FLOW_DECL | MACRO_DECL | EXCEPTION_DECL
            | FN_DECL
    )
}

// ── Token helpers ────────────────────────────────────────────────────

fn has_token(node: &SyntaxNode, kind: SyntaxKind) -> bool {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .any(|t| t.kind() == kind)
}

fn first_token_text(node: &SyntaxNode) -> Option<String> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| {
            matches!(
                t.kind(),
                SyntaxKind::IDENT | SyntaxKind::TYPE_IDENT
            )
        })
        .map(|t| t.text().to_string())
}

/// The member name of a field/safe access: the ident after the dot.
fn member_name(node: &SyntaxNode) -> String {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| matches!(t.kind(), SyntaxKind::IDENT | SyntaxKind::TYPE_IDENT))
        .last()
        .map(|t| t.text().to_string())
        .unwrap_or_default()
}

fn strip_doc(text: &str) -> String {
    if let Some(rest) = text.strip_prefix("///") {
        return rest.trim_start().to_string();
    }
    let trimmed = text
        .trim_start_matches("/**")
        .trim_end_matches("*/")
        .trim();
    trimmed
        .lines()
        .map(|l| l.trim().trim_start_matches('*').trim_start())
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

fn unescape_one(c: char) -> String {
    match c {
        'n' => "\n".to_string(),
        't' => "\t".to_string(),
        'r' => "\r".to_string(),
        '0' => "\0".to_string(),
        other => other.to_string(),
    }
}

/// Process backslash escapes, including `\u{…}`.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('u') => {
                // \u{XXXX}
                let mut hex = String::new();
                for h in chars.by_ref() {
                    if h == '{' {
                        continue;
                    }
                    if h == '}' {
                        break;
                    }
                    hex.push(h);
                }
                if let Ok(code) = u32::from_str_radix(&hex, 16) {
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                    }
                }
            }
            Some(other) => out.push_str(&unescape_one(other)),
            None => {}
        }
    }
    out
}

fn parse_int(text: &str) -> Option<i64> {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    if let Some(hex) = clean.strip_prefix("0x").or_else(|| clean.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = clean.strip_prefix("0b").or_else(|| clean.strip_prefix("0B")) {
        return i64::from_str_radix(bin, 2).ok();
    }
    if let Some(oct) = clean.strip_prefix("0o").or_else(|| clean.strip_prefix("0O")) {
        return i64::from_str_radix(oct, 8).ok();
    }
    clean.parse().ok()
}

fn parse_float(text: &str) -> f64 {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    clean.parse().unwrap_or(0.0)
}

fn parse_char(text: &str) -> char {
    let inner = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(text);
    unescape(inner).chars().next().unwrap_or('\0')
}
