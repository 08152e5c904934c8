//! Declaration collection: sub-checks 1 and 2.
//!
//! Walks the unit's declarations, enters every name into the registry,
//! detects duplicate declarations/fields/parameters, and lowers all
//! signature types to `Ty`. Body checking happens later in `check`.

use fly_common::diagnostics::{Diagnostic, DiagnosticReporter, Phase};
use fly_common::span::SourceSpan;
use fly_parser::ast::{
    ClassDecl, CompilationUnit, DataDecl, EnumDecl, ExceptionDecl, ExtendDecl, FieldDef,
    FunctionDecl, ImplDecl, InterfaceDecl, Param, PrimKind, SparkDecl, StructDecl, TopDecl,
    TraitDecl, TypeAliasDecl, TypeExpr, TypeKind, TypeParam,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::resolver::{ResolveError, TypeResolver};
use crate::ty::{PrimTy, Ty};
use crate::{FieldSig, FnSig, ImplSig, Registry, TypeDef, TypeDefKind, TypeParamSig, VariantSig};

/// Locally declared type names with their generic arity, available to type
/// lowering before the full registry exists.
#[derive(Debug, Default)]
pub(crate) struct LocalTypes {
    pub arity: FxHashMap<String, usize>,
}

impl LocalTypes {
    pub fn contains(&self, name: &str) -> bool {
        self.arity.contains_key(name)
    }
}

fn error(reporter: &mut DiagnosticReporter, code: &str, message: String, span: &SourceSpan) {
    reporter.report(Diagnostic::error(code, message, Phase::Semantic).with_span(span.clone()));
}

/// Lower a source type expression to a semantic `Ty`.
pub(crate) fn lower_type(
    te: &TypeExpr,
    params: &[String],
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
) -> Ty {
    match &te.kind {
        TypeKind::Primitive(p) => match p {
            PrimKind::Int => Ty::Prim(PrimTy::Int),
            PrimKind::Long => Ty::Prim(PrimTy::Long),
            PrimKind::Float => Ty::Prim(PrimTy::Float),
            PrimKind::Double => Ty::Prim(PrimTy::Double),
            PrimKind::Bool => Ty::Prim(PrimTy::Bool),
            PrimKind::Char => Ty::Prim(PrimTy::Char),
            PrimKind::Byte => Ty::Prim(PrimTy::Byte),
            PrimKind::Short => Ty::Prim(PrimTy::Short),
            PrimKind::Str => Ty::Str,
            PrimKind::Void | PrimKind::Unit => Ty::Prim(PrimTy::Unit),
        },
        TypeKind::Named { path, args } => {
            let lowered_args: Vec<Ty> = args
                .iter()
                .map(|a| lower_type(a, params, locals, resolver, reporter))
                .collect();

            if path.segments.len() == 1 {
                let name = &path.segments[0];
                if params.contains(name) {
                    if !lowered_args.is_empty() {
                        error(
                            reporter,
                            "GEN001",
                            format!("type parameter `{name}` takes no type arguments"),
                            &te.span,
                        );
                    }
                    return Ty::Param(name.clone());
                }
                if let Some(&arity) = locals.arity.get(name.as_str()) {
                    if arity != lowered_args.len() {
                        error(
                            reporter,
                            "GEN001",
                            format!(
                                "`{name}` expects {arity} type argument(s), found {}",
                                lowered_args.len()
                            ),
                            &te.span,
                        );
                    }
                    return Ty::Named {
                        name: name.clone(),
                        args: lowered_args,
                    };
                }
                return match resolver.resolve(name) {
                    Ok(resolved) => Ty::Named {
                        name: resolved.dotted,
                        args: lowered_args,
                    },
                    Err(ResolveError::NotFound { name, hint }) => {
                        let mut d = Diagnostic::error(
                            "NAME002",
                            format!("unknown type `{name}`"),
                            Phase::Resolver,
                        )
                        .with_span(te.span.clone());
                        if let Some(h) = hint {
                            d = d.with_hint(h);
                        }
                        reporter.report(d);
                        Ty::Error
                    }
                    Err(ResolveError::Ambiguous { name, candidates }) => {
                        error(
                            reporter,
                            "NAME003",
                            format!(
                                "`{name}` is ambiguous; provided by {}",
                                candidates.join(", ")
                            ),
                            &te.span,
                        );
                        Ty::Error
                    }
                };
            }

            // Multi-segment paths address other modules or host packages.
            Ty::Named {
                name: path.dotted(),
                args: lowered_args,
            }
        }
        TypeKind::Optional(inner) => {
            Ty::optional(lower_type(inner, params, locals, resolver, reporter))
        }
        TypeKind::Array(elem) => Ty::Array(Box::new(lower_type(
            elem, params, locals, resolver, reporter,
        ))),
        TypeKind::Map { key, value } => Ty::Map(
            Box::new(lower_type(key, params, locals, resolver, reporter)),
            Box::new(lower_type(value, params, locals, resolver, reporter)),
        ),
        // References are a surface form; the managed target has only
        // reference semantics, so `&T` checks as `T`.
        TypeKind::Reference { inner, .. } => lower_type(inner, params, locals, resolver, reporter),
        TypeKind::Function { params: ps, ret } => Ty::Fun(
            ps.iter()
                .map(|p| lower_type(p, params, locals, resolver, reporter))
                .collect(),
            Box::new(lower_type(ret, params, locals, resolver, reporter)),
        ),
        TypeKind::Tuple(elems) => Ty::Tuple(
            elems
                .iter()
                .map(|e| lower_type(e, params, locals, resolver, reporter))
                .collect(),
        ),
        TypeKind::Union(a, b) => Ty::Union(
            Box::new(lower_type(a, params, locals, resolver, reporter)),
            Box::new(lower_type(b, params, locals, resolver, reporter)),
        ),
        TypeKind::Intersection(a, b) => Ty::Intersection(
            Box::new(lower_type(a, params, locals, resolver, reporter)),
            Box::new(lower_type(b, params, locals, resolver, reporter)),
        ),
        TypeKind::Error => Ty::Error,
    }
}

/// Collect declarations into a [`Registry`] (sub-checks 1–2).
pub(crate) fn collect(
    unit: &CompilationUnit,
    resolver: &mut TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
) -> Registry {
    let mut registry = Registry {
        module_path: unit.module_path.segments.clone(),
        ..Registry::default()
    };
    let mut locals = LocalTypes::default();

    // Pass 1: enter every declared name so signatures can reference each
    // other regardless of order.
    let mut seen: FxHashMap<String, SourceSpan> = FxHashMap::default();
    let mut seen_fns: FxHashMap<(String, usize), SourceSpan> = FxHashMap::default();
    for decl in &unit.decls {
        register_names(decl, resolver, &mut locals, &mut seen, &mut seen_fns, reporter);
    }

    // Pass 2: lower signatures.
    for decl in &unit.decls {
        lower_decl(decl, None, &locals, resolver, reporter, &mut registry);
    }

    registry
}

fn register_names(
    decl: &TopDecl,
    resolver: &mut TypeResolver<'_>,
    locals: &mut LocalTypes,
    seen: &mut FxHashMap<String, SourceSpan>,
    seen_fns: &mut FxHashMap<(String, usize), SourceSpan>,
    reporter: &mut DiagnosticReporter,
) {
    let (name, arity, span): (&str, usize, &SourceSpan) = match decl {
        TopDecl::Class(c) | TopDecl::Context(c) | TopDecl::Supervisor(c) | TopDecl::Flow(c) => {
            for nested in &c.nested {
                if let Some(inner) = nested.name() {
                    resolver.register_nested(&c.name, inner);
                }
            }
            (&c.name, c.type_params.len(), &c.span)
        }
        TopDecl::Interface(i) => (&i.name, i.type_params.len(), &i.span),
        TopDecl::Enum(e) => (&e.name, 0, &e.span),
        TopDecl::Data(d) => (&d.name, d.type_params.len(), &d.span),
        TopDecl::Struct(s) => (&s.name, s.type_params.len(), &s.span),
        TopDecl::Spark(s) => (&s.name, s.type_params.len(), &s.span),
        TopDecl::Trait(t) | TopDecl::Protocol(t) => (&t.name, t.type_params.len(), &t.span),
        TopDecl::TypeAlias(t) => (&t.name, t.type_params.len(), &t.span),
        TopDecl::Exception(e) => (&e.name, 0, &e.span),
        TopDecl::Function(f) => {
            let key = (f.name.clone(), f.params.len());
            if let Some(prev) = seen_fns.get(&key) {
                error(
                    reporter,
                    "DUP001",
                    format!(
                        "duplicate declaration of function `{}` with {} parameter(s); previously declared at {}",
                        f.name,
                        f.params.len(),
                        prev
                    ),
                    &f.span,
                );
            } else {
                seen_fns.insert(key, f.span.clone());
            }
            return;
        }
        TopDecl::Impl(_) | TopDecl::Extend(_) | TopDecl::Macro(_) => return,
    };

    if let Some(prev) = seen.get(name) {
        error(
            reporter,
            "DUP001",
            format!("duplicate declaration of `{name}`; previously declared at {prev}"),
            span,
        );
        return;
    }
    seen.insert(name.to_string(), span.clone());
    resolver.register_local(name);
    locals.arity.insert(name.to_string(), arity);

    // Data/enum variants resolve as bare constructors.
    match decl {
        TopDecl::Data(d) => {
            for v in &d.variants {
                resolver.register_nested(&d.name, &v.name);
            }
        }
        TopDecl::Enum(e) => {
            for v in &e.variants {
                resolver.register_nested(&e.name, &v.name);
            }
        }
        _ => {}
    }
}

fn type_param_sigs(params: &[TypeParam]) -> (Vec<TypeParamSig>, Vec<String>) {
    let sigs: Vec<TypeParamSig> = params
        .iter()
        .map(|tp| TypeParamSig {
            name: tp.name.clone(),
            bounds: tp
                .bounds
                .iter()
                .filter_map(|b| b.simple_name().map(str::to_string))
                .collect(),
        })
        .collect();
    let names = sigs.iter().map(|s| s.name.clone()).collect();
    (sigs, names)
}

fn check_duplicate_fields(fields: &[FieldDef], owner: &str, reporter: &mut DiagnosticReporter) {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for f in fields {
        if !seen.insert(&f.name) {
            error(
                reporter,
                "DUP003",
                format!("duplicate field `{}` in `{owner}`", f.name),
                &f.span,
            );
        }
    }
}

fn check_duplicate_params(params: &[Param], fn_name: &str, reporter: &mut DiagnosticReporter) {
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    for p in params {
        if !seen.insert(&p.name) {
            error(
                reporter,
                "DUP005",
                format!("duplicate parameter `{}` in `{fn_name}`", p.name),
                &p.span,
            );
        }
    }
}

pub(crate) fn lower_fn_sig(
    f: &FunctionDecl,
    outer_params: &[String],
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
) -> FnSig {
    check_duplicate_params(&f.params, &f.name, reporter);

    let (own_sigs, own_names) = type_param_sigs(&f.type_params);
    let mut scope: Vec<String> = outer_params.to_vec();
    scope.extend(own_names);

    let mut params = Vec::new();
    let mut param_names = Vec::new();
    for p in &f.params {
        param_names.push(p.name.clone());
        match &p.ty {
            Some(t) => params.push(lower_type(t, &scope, locals, resolver, reporter)),
            None => {
                error(
                    reporter,
                    "TYPE013",
                    format!("parameter `{}` needs a type annotation", p.name),
                    &p.span,
                );
                params.push(Ty::Error);
            }
        }
    }

    let ret = f
        .return_type
        .as_ref()
        .map(|t| lower_type(t, &scope, locals, resolver, reporter))
        .unwrap_or_else(Ty::unit);

    FnSig {
        name: f.name.clone(),
        type_params: own_sigs,
        param_names,
        params,
        ret,
        is_async: f.is_async,
        is_static: f.is_static,
        is_public: f.header.visibility.is_public(),
        has_body: f.body.is_some(),
        span: f.span.clone(),
    }
}

fn field_sigs(
    fields: &[FieldDef],
    params: &[String],
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
) -> Vec<FieldSig> {
    fields
        .iter()
        .map(|f| FieldSig {
            name: f.name.clone(),
            ty: lower_type(&f.ty, params, locals, resolver, reporter),
        })
        .collect()
}

fn method_sigs(
    methods: &[FunctionDecl],
    params: &[String],
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
) -> Vec<FnSig> {
    let mut seen: FxHashMap<(String, usize), SourceSpan> = FxHashMap::default();
    let mut out = Vec::new();
    for m in methods {
        let key = (m.name.clone(), m.params.len());
        if let Some(prev) = seen.get(&key) {
            error(
                reporter,
                "DUP001",
                format!(
                    "duplicate declaration of method `{}`; previously declared at {prev}",
                    m.name
                ),
                &m.span,
            );
        } else {
            seen.insert(key, m.span.clone());
        }
        out.push(lower_fn_sig(m, params, locals, resolver, reporter));
    }
    out
}

fn lower_decl(
    decl: &TopDecl,
    outer: Option<&str>,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    match decl {
        TopDecl::Class(c) => {
            lower_class(c, TypeDefKind::Class, outer, locals, resolver, reporter, registry)
        }
        TopDecl::Context(c) => {
            lower_class(c, TypeDefKind::Context, outer, locals, resolver, reporter, registry)
        }
        TopDecl::Supervisor(c) => lower_class(
            c,
            TypeDefKind::Supervisor,
            outer,
            locals,
            resolver,
            reporter,
            registry,
        ),
        TopDecl::Flow(c) => {
            lower_class(c, TypeDefKind::Flow, outer, locals, resolver, reporter, registry)
        }
        TopDecl::Interface(i) => lower_interface(i, locals, resolver, reporter, registry),
        TopDecl::Enum(e) => lower_enum(e, registry),
        TopDecl::Data(d) => lower_data(d, locals, resolver, reporter, registry),
        TopDecl::Struct(s) => lower_struct(s, locals, resolver, reporter, registry),
        TopDecl::Spark(s) => lower_spark(s, locals, resolver, reporter, registry),
        TopDecl::Trait(t) => {
            lower_trait(t, TypeDefKind::Trait, locals, resolver, reporter, registry)
        }
        TopDecl::Protocol(t) => {
            lower_trait(t, TypeDefKind::Protocol, locals, resolver, reporter, registry)
        }
        TopDecl::Impl(i) => lower_impl(i, locals, resolver, reporter, registry),
        TopDecl::TypeAlias(t) => lower_alias(t, locals, resolver, reporter, registry),
        TopDecl::Extend(e) => lower_extend(e, locals, resolver, reporter, registry),
        TopDecl::Exception(e) => lower_exception(e, locals, resolver, reporter, registry),
        TopDecl::Function(f) => {
            let sig = lower_fn_sig(f, &[], locals, resolver, reporter);
            registry.functions.insert(f.name.clone(), sig);
        }
        TopDecl::Macro(_) => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn lower_class(
    c: &ClassDecl,
    kind: TypeDefKind,
    _outer: Option<&str>,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    let (sigs, param_names) = type_param_sigs(&c.type_params);
    let supers = c
        .supers
        .iter()
        .map(|s| lower_type(s, &param_names, locals, resolver, reporter))
        .collect();

    let mut seen_fields: FxHashSet<&str> = FxHashSet::default();
    let mut fields = Vec::new();
    for f in &c.fields {
        if !seen_fields.insert(&f.name) {
            error(
                reporter,
                "DUP003",
                format!("duplicate field `{}` in `{}`", f.name, c.name),
                &f.span,
            );
        }
        let ty = match &f.ty {
            Some(t) => lower_type(t, &param_names, locals, resolver, reporter),
            None => Ty::Error,
        };
        fields.push(FieldSig {
            name: f.name.clone(),
            ty,
        });
    }

    let methods = method_sigs(&c.methods, &param_names, locals, resolver, reporter);

    registry.types.insert(
        c.name.clone(),
        TypeDef {
            name: c.name.clone(),
            kind,
            type_params: sigs,
            supers,
            fields,
            computed: Vec::new(),
            methods,
            variants: Vec::new(),
            span: c.span.clone(),
        },
    );

    // Nested declarations are registered under `Outer::Inner` internally but
    // checked like top-level declarations.
    for nested in &c.nested {
        lower_decl(nested, Some(&c.name), locals, resolver, reporter, registry);
    }
}

fn lower_interface(
    i: &InterfaceDecl,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    let (sigs, param_names) = type_param_sigs(&i.type_params);
    let supers = i
        .supers
        .iter()
        .map(|s| lower_type(s, &param_names, locals, resolver, reporter))
        .collect();
    let methods = method_sigs(&i.methods, &param_names, locals, resolver, reporter);
    registry.types.insert(
        i.name.clone(),
        TypeDef {
            name: i.name.clone(),
            kind: TypeDefKind::Interface,
            type_params: sigs,
            supers,
            fields: Vec::new(),
            computed: Vec::new(),
            methods,
            variants: Vec::new(),
            span: i.span.clone(),
        },
    );
}

fn lower_enum(e: &EnumDecl, registry: &mut Registry) {
    let variants = e
        .variants
        .iter()
        .map(|v| VariantSig {
            name: v.name.clone(),
            fields: Vec::new(),
        })
        .collect();
    for v in &e.variants {
        registry
            .variant_owner
            .insert(v.name.clone(), e.name.clone());
    }
    registry.types.insert(
        e.name.clone(),
        TypeDef {
            name: e.name.clone(),
            kind: TypeDefKind::Enum,
            type_params: Vec::new(),
            supers: Vec::new(),
            fields: Vec::new(),
            computed: Vec::new(),
            methods: Vec::new(),
            variants,
            span: e.span.clone(),
        },
    );
}

fn lower_data(
    d: &DataDecl,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    let (sigs, param_names) = type_param_sigs(&d.type_params);
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut variants = Vec::new();
    for v in &d.variants {
        if !seen.insert(&v.name) {
            error(
                reporter,
                "DUP001",
                format!("duplicate variant `{}` in `{}`", v.name, d.name),
                &v.span,
            );
        }
        check_duplicate_fields(&v.fields, &v.name, reporter);
        variants.push(VariantSig {
            name: v.name.clone(),
            fields: field_sigs(&v.fields, &param_names, locals, resolver, reporter),
        });
        registry
            .variant_owner
            .insert(v.name.clone(), d.name.clone());
    }
    registry.types.insert(
        d.name.clone(),
        TypeDef {
            name: d.name.clone(),
            kind: TypeDefKind::Data,
            type_params: sigs,
            supers: Vec::new(),
            fields: Vec::new(),
            computed: Vec::new(),
            methods: Vec::new(),
            variants,
            span: d.span.clone(),
        },
    );
}

fn lower_struct(
    s: &StructDecl,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    let (sigs, param_names) = type_param_sigs(&s.type_params);
    check_duplicate_fields(&s.fields, &s.name, reporter);
    let fields = field_sigs(&s.fields, &param_names, locals, resolver, reporter);
    let methods = method_sigs(&s.methods, &param_names, locals, resolver, reporter);
    registry.types.insert(
        s.name.clone(),
        TypeDef {
            name: s.name.clone(),
            kind: TypeDefKind::Struct,
            type_params: sigs,
            supers: Vec::new(),
            fields,
            computed: Vec::new(),
            methods,
            variants: Vec::new(),
            span: s.span.clone(),
        },
    );
}

fn lower_spark(
    s: &SparkDecl,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    let (sigs, param_names) = type_param_sigs(&s.type_params);
    check_duplicate_fields(&s.fields, &s.name, reporter);
    let fields = field_sigs(&s.fields, &param_names, locals, resolver, reporter);
    let computed = s
        .computed
        .iter()
        .map(|c| FieldSig {
            name: c.name.clone(),
            ty: lower_type(&c.ty, &param_names, locals, resolver, reporter),
        })
        .collect();
    let methods = method_sigs(&s.methods, &param_names, locals, resolver, reporter);
    registry.types.insert(
        s.name.clone(),
        TypeDef {
            name: s.name.clone(),
            kind: TypeDefKind::Spark,
            type_params: sigs,
            supers: Vec::new(),
            fields,
            computed,
            methods,
            variants: Vec::new(),
            span: s.span.clone(),
        },
    );
}

fn lower_trait(
    t: &TraitDecl,
    kind: TypeDefKind,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    let (sigs, param_names) = type_param_sigs(&t.type_params);
    let supers = t
        .supers
        .iter()
        .map(|s| lower_type(s, &param_names, locals, resolver, reporter))
        .collect();
    let methods = method_sigs(&t.methods, &param_names, locals, resolver, reporter);
    registry.types.insert(
        t.name.clone(),
        TypeDef {
            name: t.name.clone(),
            kind,
            type_params: sigs,
            supers,
            fields: Vec::new(),
            computed: Vec::new(),
            methods,
            variants: Vec::new(),
            span: t.span.clone(),
        },
    );
}

fn lower_impl(
    i: &ImplDecl,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    let trait_name = i
        .trait_ref
        .as_ref()
        .and_then(|t| t.simple_name().map(str::to_string));
    let self_ty = lower_type(&i.self_ty, &[], locals, resolver, reporter);
    let methods = method_sigs(&i.methods, &[], locals, resolver, reporter);
    registry.impls.push(ImplSig {
        trait_name,
        self_ty,
        methods,
        span: i.span.clone(),
    });
}

fn lower_alias(
    t: &TypeAliasDecl,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    let (_, param_names) = type_param_sigs(&t.type_params);
    let target = lower_type(&t.aliased, &param_names, locals, resolver, reporter);
    registry.aliases.insert(t.name.clone(), target);
}

fn lower_extend(
    e: &ExtendDecl,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    let target = lower_type(&e.target, &[], locals, resolver, reporter);
    let methods = method_sigs(&e.methods, &[], locals, resolver, reporter);
    registry.extends.push((target, methods));
}

fn lower_exception(
    e: &ExceptionDecl,
    locals: &LocalTypes,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
    registry: &mut Registry,
) {
    check_duplicate_fields(&e.fields, &e.name, reporter);
    let fields = field_sigs(&e.fields, &[], locals, resolver, reporter);
    let supers = e
        .super_ty
        .as_ref()
        .map(|s| vec![lower_type(s, &[], locals, resolver, reporter)])
        .unwrap_or_default();
    registry.types.insert(
        e.name.clone(),
        TypeDef {
            name: e.name.clone(),
            kind: TypeDefKind::Exception,
            type_params: Vec::new(),
            supers,
            fields,
            computed: Vec::new(),
            methods: Vec::new(),
            variants: Vec::new(),
            span: e.span.clone(),
        },
    );
}
