//! Body checking: sub-checks 3 and 6–10.
//!
//! A bidirectional pass: expected types flow down (literal defaulting,
//! lambda parameters, empty collections), synthesized types flow up.
//! Numeric operators promote to the wider operand; generic calls infer
//! their arguments by unification and report the remaining free parameters
//! when inference is incomplete. The pass also validates async contexts
//! (`await`/`concurrent`/`race`/`timeout` only inside async frames),
//! exception declarations at `throw`/`catch`, option discipline for
//! `?.`/`?`/`!!`/`??`, and match exhaustiveness.
//!
//! Errors produce `Ty::Error`, which unifies with anything: one mistake is
//! reported once, not echoed up the tree.

use fly_common::diagnostics::{Diagnostic, DiagnosticReporter, Phase};
use fly_common::span::SourceSpan;
use fly_parser::ast::{
    Block, CatchClause, ClassDecl, CompilationUnit, Expr, ExprKind, FunctionDecl, Literal,
    MatchArm, Pattern, PatternKind, Stmt, TopDecl, BinaryOp, UnaryOp,
};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::builtins::{self, ty_from_descriptor};
use crate::collect::{lower_type, LocalTypes};
use crate::exhaust;
use crate::resolver::TypeResolver;
use crate::symtab::{DefineOutcome, Symbol, SymbolKind, SymbolTable};
use crate::traits;
use crate::ty::{PrimTy, Ty};
use crate::unify::{InferCtx, UnifyError};
use crate::{FnSig, Registry, TypeDefKind, NodeIdMap};

pub(crate) fn check_bodies(
    unit: &CompilationUnit,
    registry: &Registry,
    resolver: &TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
) -> (NodeIdMap<Ty>, Option<String>) {
    let mut locals = LocalTypes::default();
    for (name, def) in &registry.types {
        locals.arity.insert(name.clone(), def.type_params.len());
    }
    for name in registry.aliases.keys() {
        locals.arity.entry(name.clone()).or_insert(0);
    }

    let mut checker = Checker {
        registry,
        resolver,
        reporter,
        locals,
        types: FxHashMap::default(),
        symbols: SymbolTable::new(),
        infer: InferCtx::new(),
        async_stack: Vec::new(),
        return_stack: Vec::new(),
        self_stack: Vec::new(),
        param_bounds: Vec::new(),
        loop_depth: 0,
        entry_class: None,
    };

    checker.unit(unit);

    // Substitute every remaining inference variable before publishing.
    let resolved: FxHashMap<_, _> = checker
        .types
        .iter()
        .map(|(id, ty)| (*id, checker.infer.resolve(ty)))
        .collect();
    let entry = checker.entry_class.clone();
    (resolved, entry)
}

struct Checker<'a, 'env> {
    registry: &'a Registry,
    resolver: &'a TypeResolver<'env>,
    reporter: &'a mut DiagnosticReporter,
    locals: LocalTypes,
    types: NodeIdMap<Ty>,
    symbols: SymbolTable,
    infer: InferCtx,
    /// Async-ness per enclosing function frame; lambdas push a copy of the
    /// enclosing frame's flag.
    async_stack: Vec<bool>,
    /// Declared result type per enclosing function frame.
    return_stack: Vec<Ty>,
    /// `self` type per enclosing function frame.
    self_stack: Vec<Option<Ty>>,
    /// In-scope generic parameters with their bound names, per frame.
    param_bounds: Vec<Vec<(String, Vec<String>)>>,
    loop_depth: usize,
    entry_class: Option<String>,
}

impl<'a, 'env> Checker<'a, 'env> {
    // ── Diagnostics ──────────────────────────────────────────────────

    fn error(&mut self, code: &str, message: String, span: &SourceSpan) {
        self.reporter
            .report(Diagnostic::error(code, message, Phase::Semantic).with_span(span.clone()));
    }

    fn warning(&mut self, code: &str, message: String, span: &SourceSpan) {
        self.reporter
            .report(Diagnostic::warning(code, message, Phase::Semantic).with_span(span.clone()));
    }

    fn mismatch(&mut self, expected: &Ty, found: &Ty, span: &SourceSpan) {
        let e = self.infer.resolve(expected);
        let f = self.infer.resolve(found);
        self.error(
            "TYPE001",
            format!("type mismatch: expected `{e}`, found `{f}`"),
            span,
        );
    }

    /// Unify, reporting a mismatch once.
    fn expect_ty(&mut self, expected: &Ty, found: &Ty, span: &SourceSpan) {
        match self.infer.unify(expected, found) {
            Ok(()) => {}
            Err(UnifyError::Mismatch { .. }) => self.mismatch(expected, found, span),
            Err(UnifyError::Occurs { var, ty }) => {
                let ty = self.infer.resolve(&ty);
                self.error(
                    "TYPE001",
                    format!("infinite type: `{var}` occurs in `{ty}`"),
                    span,
                );
            }
        }
    }

    fn in_scope_params(&self) -> Vec<String> {
        self.param_bounds
            .iter()
            .flatten()
            .map(|(n, _)| n.clone())
            .collect()
    }

    fn lower(&mut self, te: &fly_parser::ast::TypeExpr) -> Ty {
        let params = self.in_scope_params();
        lower_type(te, &params, &self.locals, self.resolver, self.reporter)
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn unit(&mut self, unit: &CompilationUnit) {
        for decl in &unit.decls {
            self.decl(decl, None);
        }
    }

    fn decl(&mut self, decl: &TopDecl, enclosing: Option<&Ty>) {
        match decl {
            TopDecl::Function(f) => self.function(f, enclosing.cloned()),
            TopDecl::Class(c) | TopDecl::Context(c) | TopDecl::Supervisor(c)
            | TopDecl::Flow(c) => self.class(c),
            TopDecl::Struct(s) => {
                let self_ty = Ty::named(&s.name);
                for m in &s.methods {
                    self.function(m, Some(self_ty.clone()));
                }
            }
            TopDecl::Spark(s) => self.spark(s),
            TopDecl::Trait(t) | TopDecl::Protocol(t) => {
                // Default method bodies check against an opaque Self.
                let self_ty = Ty::Param("Self".to_string());
                for m in &t.methods {
                    if m.body.is_some() {
                        self.function(m, Some(self_ty.clone()));
                    }
                }
            }
            TopDecl::Impl(i) => {
                let self_ty = {
                    let params = self.in_scope_params();
                    lower_type(&i.self_ty, &params, &self.locals, self.resolver, self.reporter)
                };
                for m in &i.methods {
                    self.function(m, Some(self_ty.clone()));
                }
            }
            TopDecl::Extend(e) => {
                let target = {
                    let params = self.in_scope_params();
                    lower_type(&e.target, &params, &self.locals, self.resolver, self.reporter)
                };
                for m in &e.methods {
                    self.function(m, Some(target.clone()));
                }
            }
            TopDecl::Interface(_)
            | TopDecl::Enum(_)
            | TopDecl::Data(_)
            | TopDecl::TypeAlias(_)
            | TopDecl::Macro(_)
            | TopDecl::Exception(_) => {}
        }
    }

    fn class(&mut self, c: &ClassDecl) {
        let self_ty = Ty::named(&c.name);

        // Field initializers check against the declared field type.
        for field in &c.fields {
            if let (Some(te), Some(init)) = (&field.ty, &field.init) {
                let declared = self.lower(te);
                let found = self.expr(init, Some(&declared));
                self.expect_ty(&declared, &found, &init.span);
            } else if let Some(init) = &field.init {
                self.expr(init, None);
            }
        }

        for m in &c.methods {
            if m.name == "fly" {
                self.check_entry_signature(m, &c.name);
            }
            self.function(m, Some(self_ty.clone()));
        }
        for nested in &c.nested {
            self.decl(nested, Some(&self_ty));
        }
    }

    fn spark(&mut self, s: &fly_parser::ast::SparkDecl) {
        let self_ty = Ty::named(&s.name);
        let def = self.registry.types.get(&s.name).cloned();

        let mut check_hook = |this: &mut Self, block: &Option<Block>| {
            let Some(b) = block else { return };
            this.push_frame(false, Ty::unit(), Some(self_ty.clone()), Vec::new());
            this.symbols.push_scope();
            if let Some(def) = &def {
                for f in &def.fields {
                    this.symbols.define_unchecked(Symbol {
                        name: f.name.clone(),
                        kind: SymbolKind::Field,
                        ty: f.ty.clone(),
                        span: s.span.clone(),
                        mutable: false,
                        slot: None,
                    });
                }
            }
            this.block(b, None);
            this.symbols.pop_scope();
            this.pop_frame();
        };

        check_hook(self, &s.validate);
        check_hook(self, &s.before_update);
        check_hook(self, &s.after_update);

        for c in &s.computed {
            let declared = self.lower(&c.ty);
            self.push_frame(false, declared.clone(), Some(self_ty.clone()), Vec::new());
            self.symbols.push_scope();
            if let Some(def) = self.registry.types.get(&s.name).cloned() {
                for f in &def.fields {
                    self.symbols.define_unchecked(Symbol {
                        name: f.name.clone(),
                        kind: SymbolKind::Field,
                        ty: f.ty.clone(),
                        span: c.span.clone(),
                        mutable: false,
                        slot: None,
                    });
                }
            }
            let found = self.block(&c.body, Some(&declared));
            self.expect_ty(&declared, &found, &c.span);
            self.symbols.pop_scope();
            self.pop_frame();
        }

        for m in &s.methods {
            self.function(m, Some(self_ty.clone()));
        }
    }

    fn check_entry_signature(&mut self, f: &FunctionDecl, class: &str) {
        let ok = f.params.len() == 1
            && f.params[0]
                .ty
                .as_ref()
                .map(|t| {
                    let lowered = {
                        let params = self.in_scope_params();
                        lower_type(t, &params, &self.locals, self.resolver, self.reporter)
                    };
                    lowered == Ty::Array(Box::new(Ty::Str))
                })
                .unwrap_or(false);
        if ok {
            if self.entry_class.is_none() {
                self.entry_class = Some(class.to_string());
            }
        } else {
            self.error(
                "E0002",
                "entry point `fly` must have signature `(args: [String]) -> Void`".to_string(),
                &f.span,
            );
        }
    }

    fn push_frame(
        &mut self,
        is_async: bool,
        ret: Ty,
        self_ty: Option<Ty>,
        bounds: Vec<(String, Vec<String>)>,
    ) {
        self.async_stack.push(is_async);
        self.return_stack.push(ret);
        self.self_stack.push(self_ty);
        self.param_bounds.push(bounds);
    }

    fn pop_frame(&mut self) {
        self.async_stack.pop();
        self.return_stack.pop();
        self.self_stack.pop();
        self.param_bounds.pop();
    }

    fn is_async_context(&self) -> bool {
        self.async_stack.last().copied().unwrap_or(false)
    }

    fn function(&mut self, f: &FunctionDecl, self_ty: Option<Ty>) {
        let Some(body) = &f.body else {
            return;
        };

        let bounds: Vec<(String, Vec<String>)> = f
            .type_params
            .iter()
            .map(|tp| {
                (
                    tp.name.clone(),
                    tp.bounds
                        .iter()
                        .filter_map(|b| b.simple_name().map(str::to_string))
                        .collect(),
                )
            })
            .collect();

        self.push_frame(f.is_async, Ty::unit(), self_ty.clone(), bounds);
        // The declared return type may mention the fn's own type params.
        let ret = f
            .return_type
            .as_ref()
            .map(|t| self.lower(t))
            .unwrap_or_else(Ty::unit);
        *self.return_stack.last_mut().expect("frame pushed") = ret.clone();

        self.symbols.push_scope();
        for p in &f.params {
            let ty = p.ty.as_ref().map(|t| self.lower(t)).unwrap_or(Ty::Error);
            self.symbols.define_unchecked(Symbol {
                name: p.name.clone(),
                kind: SymbolKind::Param,
                ty,
                span: p.span.clone(),
                mutable: false,
                slot: None,
            });
        }

        // The `requires` clause is metadata, but it must type-check as Bool.
        if let Some(req) = &f.requires {
            let found = self.expr(req, Some(&Ty::bool()));
            self.expect_ty(&Ty::bool(), &found, &req.span);
        }

        let body_ty = self.block(body, Some(&ret));
        if ret != Ty::unit() {
            self.expect_ty(&ret, &body_ty, &body.span);
        }

        self.symbols.pop_scope();
        self.pop_frame();
    }

    // ── Blocks & statements ──────────────────────────────────────────

    fn block(&mut self, b: &Block, expected: Option<&Ty>) -> Ty {
        self.symbols.push_scope();
        for stmt in &b.stmts {
            match stmt {
                Stmt::Let(l) => self.let_stmt(l),
                Stmt::Expr(e) => {
                    self.expr(e, None);
                }
            }
        }
        let result = match &b.tail {
            Some(tail) => self.expr(tail, expected),
            None => Ty::unit(),
        };
        self.symbols.pop_scope();
        self.types.insert(b.id, result.clone());
        result
    }

    fn let_stmt(&mut self, l: &fly_parser::ast::LetStmt) {
        let annotated = l.ty.as_ref().map(|t| self.lower(t));
        if let Some(t) = &annotated {
            traits::check_named_bounds(self.registry, t, &l.span, self.reporter);
        }

        let init_ty = match (&l.init, &annotated) {
            (Some(init), Some(t)) => {
                let found = self.expr(init, Some(t));
                self.expect_ty(t, &found, &init.span);
                t.clone()
            }
            (Some(init), None) => self.expr(init, None),
            (None, Some(t)) => t.clone(),
            (None, None) => {
                self.error(
                    "TYPE013",
                    "a `let` without an initializer needs a type annotation".to_string(),
                    &l.span,
                );
                Ty::Error
            }
        };

        self.bind_pattern(&l.pattern, &init_ty, l.mutable);
    }

    // ── Patterns ─────────────────────────────────────────────────────

    /// Check a pattern against the scrutinee type and bind its names in the
    /// current scope.
    fn bind_pattern(&mut self, p: &Pattern, scrutinee: &Ty, force_mutable: bool) {
        let scrutinee = self.registry.expand_alias(&self.infer.resolve(scrutinee));
        match &p.kind {
            PatternKind::Wildcard | PatternKind::Error => {}
            PatternKind::Binding { name, mutable, ty } => {
                let bound_ty = match ty {
                    Some(te) => {
                        let declared = self.lower(te);
                        // A typed binding narrows; compatibility is loose
                        // (downcasts are legal in catch and match).
                        if !matches!(scrutinee, Ty::Error)
                            && !self.pattern_compatible(&declared, &scrutinee)
                        {
                            self.error(
                                "PAT004",
                                format!(
                                    "pattern type `{declared}` is incompatible with `{scrutinee}`"
                                ),
                                &p.span,
                            );
                        }
                        declared
                    }
                    None => scrutinee.clone(),
                };
                let outcome = self.symbols.define(Symbol {
                    name: name.clone(),
                    kind: SymbolKind::LocalVar,
                    ty: bound_ty,
                    span: p.span.clone(),
                    mutable: *mutable || force_mutable,
                    slot: None,
                });
                match outcome {
                    DefineOutcome::Ok => {}
                    DefineOutcome::DuplicateInScope { previous } => self.error(
                        "DUP002",
                        format!("`{name}` is already bound in this scope (at {previous})"),
                        &p.span,
                    ),
                    DefineOutcome::IllegalShadow { previous } => self.error(
                        "DUP006",
                        format!(
                            "shadowing `{name}` (bound at {previous}) requires `let mut`"
                        ),
                        &p.span,
                    ),
                }
            }
            PatternKind::Literal(lit) => {
                let lit_ty = self.literal_ty(lit, Some(&scrutinee));
                if !self.pattern_compatible(&lit_ty, &scrutinee) {
                    self.error(
                        "PAT004",
                        format!("pattern type `{lit_ty}` is incompatible with `{scrutinee}`"),
                        &p.span,
                    );
                }
            }
            PatternKind::Range { lo, hi, .. } => {
                let lo_ty = self.literal_ty(lo, Some(&scrutinee));
                let hi_ty = self.literal_ty(hi, Some(&scrutinee));
                if !self.pattern_compatible(&lo_ty, &scrutinee)
                    || !self.pattern_compatible(&hi_ty, &scrutinee)
                {
                    self.error(
                        "PAT004",
                        format!("range pattern is incompatible with `{scrutinee}`"),
                        &p.span,
                    );
                }
            }
            PatternKind::TupleStruct { path, elems } => {
                self.variant_pattern(p, path, Some(elems), None, &scrutinee, force_mutable);
            }
            PatternKind::Struct { path, fields, .. } => {
                self.variant_pattern(p, path, None, Some(fields), &scrutinee, force_mutable);
            }
            PatternKind::Tuple(elems) => match &scrutinee {
                Ty::Tuple(tys) if tys.len() == elems.len() => {
                    for (sub, ty) in elems.iter().zip(tys.iter()) {
                        self.bind_pattern(sub, ty, force_mutable);
                    }
                }
                Ty::Error => {
                    for sub in elems {
                        self.bind_pattern(sub, &Ty::Error, force_mutable);
                    }
                }
                other => {
                    self.error(
                        "PAT004",
                        format!("tuple pattern is incompatible with `{other}`"),
                        &p.span,
                    );
                }
            },
            PatternKind::Array {
                prefix,
                rest,
                suffix,
            } => {
                let elem = match &scrutinee {
                    Ty::Array(e) => (**e).clone(),
                    Ty::Error => Ty::Error,
                    other => {
                        self.error(
                            "PAT004",
                            format!("array pattern is incompatible with `{other}`"),
                            &p.span,
                        );
                        Ty::Error
                    }
                };
                for sub in prefix.iter().chain(suffix.iter()) {
                    self.bind_pattern(sub, &elem, force_mutable);
                }
                if let Some(Some(name)) = rest {
                    self.symbols.define_unchecked(Symbol {
                        name: name.clone(),
                        kind: SymbolKind::LocalVar,
                        ty: Ty::Array(Box::new(elem)),
                        span: p.span.clone(),
                        mutable: force_mutable,
                        slot: None,
                    });
                }
            }
            PatternKind::Or(alts) => {
                let mut first_names: Option<Vec<String>> = None;
                for (i, alt) in alts.iter().enumerate() {
                    if i == 0 {
                        self.bind_pattern(alt, &scrutinee, force_mutable);
                        let mut names: Vec<String> =
                            alt.bound_names().iter().map(|s| s.to_string()).collect();
                        names.sort();
                        first_names = Some(names);
                    } else {
                        // Later alternatives must bind the same names; their
                        // bindings reuse the first alternative's slots.
                        self.check_pattern_only(alt, &scrutinee);
                        let mut names: Vec<String> =
                            alt.bound_names().iter().map(|s| s.to_string()).collect();
                        names.sort();
                        if first_names.as_ref() != Some(&names) {
                            self.error(
                                "PAT005",
                                "or-pattern alternatives bind different names".to_string(),
                                &alt.span,
                            );
                        }
                    }
                }
            }
            PatternKind::Guard { inner, cond } => {
                self.bind_pattern(inner, &scrutinee, force_mutable);
                let found = self.expr(cond, Some(&Ty::bool()));
                self.expect_ty(&Ty::bool(), &found, &cond.span);
            }
        }
    }

    /// Pattern-check without binding (later or-alternatives).
    fn check_pattern_only(&mut self, p: &Pattern, scrutinee: &Ty) {
        self.symbols.push_scope();
        self.bind_pattern(p, scrutinee, false);
        self.symbols.pop_scope();
    }

    fn variant_pattern(
        &mut self,
        p: &Pattern,
        path: &fly_parser::ast::DottedPath,
        elems: Option<&[Pattern]>,
        fields: Option<&[(String, Option<Pattern>)]>,
        scrutinee: &Ty,
        force_mutable: bool,
    ) {
        let Some(last) = path.last() else {
            return;
        };

        // Struct patterns may name the struct itself rather than a variant.
        if let Some(def) = self.registry.types.get(last) {
            if matches!(def.kind, TypeDefKind::Struct | TypeDefKind::Spark) {
                if !matches!(scrutinee, Ty::Named { name, .. } if name == last)
                    && !scrutinee.is_error()
                {
                    self.error(
                        "PAT004",
                        format!("pattern `{last}` is incompatible with `{scrutinee}`"),
                        &p.span,
                    );
                }
                let def = def.clone();
                if let Some(fields) = fields {
                    for (fname, sub) in fields {
                        let fty = def
                            .field(fname)
                            .map(|f| f.ty.clone())
                            .unwrap_or_else(|| {
                                self.error(
                                    "TYPE005",
                                    format!("`{last}` has no field `{fname}`"),
                                    &p.span,
                                );
                                Ty::Error
                            });
                        match sub {
                            Some(sub) => self.bind_pattern(sub, &fty, force_mutable),
                            None => {
                                self.symbols.define_unchecked(Symbol {
                                    name: fname.clone(),
                                    kind: SymbolKind::LocalVar,
                                    ty: fty,
                                    span: p.span.clone(),
                                    mutable: force_mutable,
                                    slot: None,
                                });
                            }
                        }
                    }
                }
                return;
            }
        }

        let Some(owner) = self.registry.variant_owner.get(last).cloned() else {
            // A typed downcast pattern: `NotFound` in a catch clause, or an
            // unknown constructor.
            if self.registry.types.contains_key(last)
                || self.resolver.resolve(last).is_ok()
            {
                return;
            }
            self.error(
                "NAME001",
                format!("unknown pattern constructor `{last}`"),
                &p.span,
            );
            return;
        };

        if let Ty::Named { name, args } = scrutinee {
            if name != &owner && !scrutinee.is_error() {
                self.error(
                    "PAT004",
                    format!("variant `{last}` belongs to `{owner}`, not `{name}`"),
                    &p.span,
                );
                return;
            }
            let def = self.registry.types.get(&owner).cloned();
            let Some(def) = def else { return };
            let Some(variant) = def.variant(last).cloned() else {
                return;
            };
            let mut subst = FxHashMap::default();
            for (tp, arg) in def.type_params.iter().zip(args.iter()) {
                subst.insert(tp.name.clone(), arg.clone());
            }
            if let Some(elems) = elems {
                if !elems.is_empty() && elems.len() != variant.fields.len() {
                    self.error(
                        "TYPE002",
                        format!(
                            "variant `{last}` has {} field(s), pattern has {}",
                            variant.fields.len(),
                            elems.len()
                        ),
                        &p.span,
                    );
                }
                for (sub, field) in elems.iter().zip(variant.fields.iter()) {
                    let fty = field.ty.subst(&subst);
                    self.bind_pattern(sub, &fty, force_mutable);
                }
            }
            if let Some(fields) = fields {
                for (fname, sub) in fields {
                    let fty = variant
                        .fields
                        .iter()
                        .find(|f| &f.name == fname)
                        .map(|f| f.ty.subst(&subst))
                        .unwrap_or(Ty::Error);
                    match sub {
                        Some(sub) => self.bind_pattern(sub, &fty, force_mutable),
                        None => {
                            self.symbols.define_unchecked(Symbol {
                                name: fname.clone(),
                                kind: SymbolKind::LocalVar,
                                ty: fty,
                                span: p.span.clone(),
                                mutable: force_mutable,
                                slot: None,
                            });
                        }
                    }
                }
            }
        } else if !scrutinee.is_error() {
            self.error(
                "PAT004",
                format!("variant pattern `{last}` is incompatible with `{scrutinee}`"),
                &p.span,
            );
        }
    }

    fn pattern_compatible(&mut self, pattern_ty: &Ty, scrutinee: &Ty) -> bool {
        if pattern_ty.is_error() || scrutinee.is_error() {
            return true;
        }
        // Optionals match against their inner type (`none` aside).
        let scrutinee = scrutinee.unwrap_optional();
        if self.infer.can_unify(&scrutinee, pattern_ty) {
            return true;
        }
        // Exception downcasts: any exception type may appear in a catch.
        if let (Ty::Named { name: a, .. }, Ty::Named { name: b, .. }) = (pattern_ty, &scrutinee) {
            return self.registry.is_exception_type(a) && self.registry.is_exception_type(b);
        }
        matches!(
            (pattern_ty, &scrutinee),
            (Ty::Prim(a), Ty::Prim(b)) if a == b
        )
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn literal_ty(&mut self, lit: &Literal, expected: Option<&Ty>) -> Ty {
        match lit {
            Literal::Int(_) => {
                if let Some(Ty::Prim(p)) = expected {
                    if p.is_numeric() {
                        return Ty::Prim(*p);
                    }
                }
                Ty::int()
            }
            Literal::Float(_) => {
                if let Some(Ty::Prim(PrimTy::Double)) = expected {
                    return Ty::Prim(PrimTy::Double);
                }
                Ty::float()
            }
            Literal::Str(_) => Ty::Str,
            Literal::Char(_) => Ty::Prim(PrimTy::Char),
            Literal::Bool(_) => Ty::bool(),
            Literal::None => match expected {
                Some(Ty::Optional(inner)) => Ty::optional((**inner).clone()),
                _ => Ty::optional(self.infer.fresh()),
            },
        }
    }

    fn expr(&mut self, e: &Expr, expected: Option<&Ty>) -> Ty {
        let ty = self.expr_inner(e, expected);
        self.types.insert(e.id, ty.clone());
        ty
    }

    fn expr_inner(&mut self, e: &Expr, expected: Option<&Ty>) -> Ty {
        match &e.kind {
            ExprKind::Literal(lit) => self.literal_ty(lit, expected),
            ExprKind::Interpolated(parts) => {
                for part in parts {
                    if let fly_parser::ast::InterpPart::Hole(h) = part {
                        self.expr(h, None);
                    }
                }
                Ty::Str
            }
            ExprKind::Identifier(name) => self.identifier(name, &e.span),
            ExprKind::SelfRef => match self.self_stack.last().cloned().flatten() {
                Some(ty) => ty,
                None => {
                    self.error(
                        "NAME004",
                        "`self` used outside a method".to_string(),
                        &e.span,
                    );
                    Ty::Error
                }
            },
            ExprKind::Path(path) => self.path_value(path, &e.span),
            ExprKind::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs, &e.span),
            ExprKind::Unary { op, operand } => {
                let ty = self.expr(operand, expected);
                match op {
                    UnaryOp::Neg => {
                        if ty.is_numeric() || ty.is_error() {
                            ty
                        } else {
                            self.error(
                                "TYPE003",
                                format!("cannot negate `{ty}`"),
                                &e.span,
                            );
                            Ty::Error
                        }
                    }
                    UnaryOp::Not => {
                        self.expect_ty(&Ty::bool(), &ty, &operand.span);
                        Ty::bool()
                    }
                }
            }
            ExprKind::Call { callee, args } => self.call(callee, args, &e.span),
            ExprKind::MethodCall {
                recv,
                name,
                args,
                safe,
            } => self.method_call(recv, name, args, *safe, &e.span),
            ExprKind::StaticCall {
                type_path,
                name,
                args,
            } => self.static_call(type_path, name, args, &e.span),
            ExprKind::FieldAccess { recv, name } => {
                let recv_ty = self.expr(recv, None);
                self.field_ty(&recv_ty, name, &e.span)
            }
            ExprKind::SafeAccess { recv, name } => {
                let recv_ty = self.expr(recv, None);
                let recv_ty = self.infer.resolve(&recv_ty);
                if !recv_ty.is_optional() && !recv_ty.is_error() {
                    self.warning(
                        "OPT001",
                        format!("`?.` on non-optional `{recv_ty}`"),
                        &e.span,
                    );
                }
                let inner = recv_ty.unwrap_optional();
                let field = self.field_ty(&inner, name, &e.span);
                Ty::optional(field)
            }
            ExprKind::Index { recv, index } => {
                let recv_ty = self.expr(recv, None);
                let recv_ty = self.registry.expand_alias(&self.infer.resolve(&recv_ty));
                match recv_ty {
                    Ty::Array(elem) => {
                        let idx = self.expr(index, Some(&Ty::int()));
                        self.expect_ty(&Ty::int(), &idx, &index.span);
                        *elem
                    }
                    Ty::Map(key, value) => {
                        let idx = self.expr(index, Some(&key));
                        self.expect_ty(&key, &idx, &index.span);
                        Ty::optional(*value)
                    }
                    Ty::Str => {
                        let idx = self.expr(index, Some(&Ty::int()));
                        self.expect_ty(&Ty::int(), &idx, &index.span);
                        Ty::Prim(PrimTy::Char)
                    }
                    Ty::Error => Ty::Error,
                    other => {
                        self.expr(index, None);
                        self.error(
                            "TYPE014",
                            format!("`{other}` cannot be indexed"),
                            &e.span,
                        );
                        Ty::Error
                    }
                }
            }
            ExprKind::Block(b) => self.block(b, expected),
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_ty = self.expr(cond, Some(&Ty::bool()));
                self.expect_ty(&Ty::bool(), &cond_ty, &cond.span);
                let then_ty = self.block(then_branch, expected);
                match else_branch {
                    Some(els) => {
                        let else_ty = self.expr(els, expected);
                        // Branch types must agree only when a value is
                        // demanded from the `if`.
                        if let Some(exp) = expected {
                            self.expect_ty(exp, &then_ty, &then_branch.span);
                            self.expect_ty(exp, &else_ty, &els.span);
                            exp.clone()
                        } else if self.infer.can_unify(&then_ty, &else_ty) {
                            let _ = self.infer.unify(&then_ty, &else_ty);
                            then_ty
                        } else {
                            Ty::unit()
                        }
                    }
                    None => Ty::unit(),
                }
            }
            ExprKind::Match { scrutinee, arms } => self.match_expr(scrutinee, arms, expected, &e.span),
            ExprKind::For {
                binding,
                iterable,
                body,
            } => {
                let iter_ty = self.expr(iterable, None);
                let iter_ty = self.registry.expand_alias(&self.infer.resolve(&iter_ty));
                let elem = match &iter_ty {
                    Ty::Array(elem) => (**elem).clone(),
                    Ty::Map(k, v) => Ty::Tuple(vec![(**k).clone(), (**v).clone()]),
                    Ty::Str => Ty::Prim(PrimTy::Char),
                    Ty::Named { name, .. } if name == "fly.runtime.Range" => Ty::int(),
                    Ty::Error => Ty::Error,
                    other => {
                        self.error(
                            "TYPE014",
                            format!("`{other}` is not iterable"),
                            &iterable.span,
                        );
                        Ty::Error
                    }
                };
                self.symbols.push_scope();
                self.bind_pattern(binding, &elem, false);
                self.loop_depth += 1;
                self.block(body, None);
                self.loop_depth -= 1;
                self.symbols.pop_scope();
                Ty::unit()
            }
            ExprKind::While { cond, body } => {
                let cond_ty = self.expr(cond, Some(&Ty::bool()));
                self.expect_ty(&Ty::bool(), &cond_ty, &cond.span);
                self.loop_depth += 1;
                self.block(body, None);
                self.loop_depth -= 1;
                Ty::unit()
            }
            ExprKind::Lambda {
                params,
                return_type,
                body,
            } => self.lambda(params, return_type.as_ref(), body, expected),
            ExprKind::Return(value) => {
                let declared = self
                    .return_stack
                    .last()
                    .cloned()
                    .unwrap_or_else(Ty::unit);
                match value {
                    Some(v) => {
                        let found = self.expr(v, Some(&declared));
                        self.expect_ty(&declared, &found, &v.span);
                    }
                    None => {
                        if declared != Ty::unit() && !declared.is_error() {
                            self.error(
                                "TYPE001",
                                format!("bare `return` in a function returning `{declared}`"),
                                &e.span,
                            );
                        }
                    }
                }
                Ty::Never
            }
            ExprKind::Break | ExprKind::Continue => {
                if self.loop_depth == 0 {
                    let what = if matches!(e.kind, ExprKind::Break) {
                        "break"
                    } else {
                        "continue"
                    };
                    self.error(
                        "TYPE015",
                        format!("`{what}` outside of a loop"),
                        &e.span,
                    );
                }
                Ty::Never
            }
            ExprKind::Await(inner) => {
                if !self.is_async_context() {
                    self.error(
                        "TC002",
                        "`await` is only allowed inside an async function".to_string(),
                        &e.span,
                    );
                }
                let inner_ty = self.expr(inner, None);
                let inner_ty = self.infer.resolve(&inner_ty);
                match inner_ty.future_inner() {
                    Some(t) => t,
                    None if inner_ty.is_error() => Ty::Error,
                    None => {
                        self.error(
                            "TC004",
                            format!("`await` requires a Future, found `{inner_ty}`"),
                            &inner.span,
                        );
                        Ty::Error
                    }
                }
            }
            ExprKind::Throw(inner) => {
                let thrown = self.expr(inner, None);
                let thrown = self.infer.resolve(&thrown);
                match &thrown {
                    Ty::Named { name, .. } if self.registry.is_exception_type(name) => {}
                    Ty::Error => {}
                    other => {
                        self.error(
                            "EXC001",
                            format!("`throw` requires an exception type, found `{other}`"),
                            &inner.span,
                        );
                    }
                }
                Ty::Never
            }
            ExprKind::Try {
                body,
                catches,
                finally,
            } => {
                let body_ty = self.block(body, expected);
                for c in catches {
                    self.catch_clause(c, expected);
                }
                if let Some(f) = finally {
                    self.block(f, None);
                }
                body_ty
            }
            ExprKind::Concurrent { bindings } => {
                if !self.is_async_context() {
                    self.error(
                        "TC003",
                        "`concurrent` is only allowed inside an async function".to_string(),
                        &e.span,
                    );
                }
                let mut seen: FxHashSet<&str> = FxHashSet::default();
                for b in bindings {
                    if !seen.insert(&b.name) {
                        self.error(
                            "DUP004",
                            format!("duplicate binding `{}` in `concurrent`", b.name),
                            &b.span,
                        );
                    }
                    let init_ty = self.expr(&b.init, None);
                    self.symbols.define_unchecked(Symbol {
                        name: b.name.clone(),
                        kind: SymbolKind::LocalVar,
                        ty: init_ty,
                        span: b.span.clone(),
                        mutable: false,
                        slot: None,
                    });
                }
                Ty::unit()
            }
            ExprKind::Race { clauses } => {
                if !self.is_async_context() {
                    self.error(
                        "TC005",
                        "`race` is only allowed inside an async function".to_string(),
                        &e.span,
                    );
                }
                let mut result = Ty::Error;
                for (i, clause) in clauses.iter().enumerate() {
                    let ty = self.expr(clause, None);
                    if i == 0 {
                        result = ty;
                    } else if self.infer.can_unify(&result, &ty) {
                        let _ = self.infer.unify(&result, &ty);
                    } else {
                        self.mismatch(&result, &ty, &clause.span);
                    }
                }
                // A clause producing a future races its completion value.
                let resolved = self.infer.resolve(&result);
                resolved.future_inner().unwrap_or(resolved)
            }
            ExprKind::Timeout { duration, body } => {
                if !self.is_async_context() {
                    self.error(
                        "TC006",
                        "`timeout` is only allowed inside an async function".to_string(),
                        &e.span,
                    );
                }
                let dur_ty = self.expr(duration, Some(&Ty::int()));
                let dur_ty = self.infer.resolve(&dur_ty);
                if !dur_ty.is_numeric() && !dur_ty.is_error() {
                    self.error(
                        "TC007",
                        format!("timeout duration must be numeric, found `{dur_ty}`"),
                        &duration.span,
                    );
                }
                self.block(body, expected)
            }
            ExprKind::With { args, body } => {
                for a in args {
                    self.expr(a, None);
                }
                self.block(body, expected)
            }
            ExprKind::New { ty, args } => self.new_expr(ty, args, &e.span),
            ExprKind::StructLit { path, fields } => self.struct_lit(path, fields, &e.span),
            ExprKind::ArrayLit(elems) => {
                let elem_expected = match expected.map(|t| self.registry.expand_alias(t)) {
                    Some(Ty::Array(inner)) => Some(*inner),
                    _ => None,
                };
                let mut elem_ty = elem_expected.unwrap_or_else(|| self.infer.fresh());
                for el in elems {
                    let ty = self.expr(el, Some(&elem_ty));
                    self.expect_ty(&elem_ty, &ty, &el.span);
                    elem_ty = self.infer.resolve(&elem_ty);
                }
                Ty::Array(Box::new(self.infer.resolve(&elem_ty)))
            }
            ExprKind::MapLit(entries) => {
                let (mut kty, mut vty) = match expected.map(|t| self.registry.expand_alias(t)) {
                    Some(Ty::Map(k, v)) => (*k, *v),
                    _ => (self.infer.fresh(), self.infer.fresh()),
                };
                for (k, v) in entries {
                    let found_k = self.expr(k, Some(&kty));
                    self.expect_ty(&kty, &found_k, &k.span);
                    let found_v = self.expr(v, Some(&vty));
                    self.expect_ty(&vty, &found_v, &v.span);
                    kty = self.infer.resolve(&kty);
                    vty = self.infer.resolve(&vty);
                }
                Ty::Map(
                    Box::new(self.infer.resolve(&kty)),
                    Box::new(self.infer.resolve(&vty)),
                )
            }
            ExprKind::TupleLit(elems) => {
                if elems.is_empty() {
                    return Ty::unit();
                }
                Ty::Tuple(elems.iter().map(|el| self.expr(el, None)).collect())
            }
            ExprKind::Cast { expr, ty } => {
                let source = self.expr(expr, None);
                let target = self.lower(ty);
                let source = self.infer.resolve(&source);
                let ok = source.is_error()
                    || target.is_error()
                    || (source.is_numeric() && target.is_numeric())
                    || matches!(source, Ty::Prim(PrimTy::Char)) && target.is_numeric()
                    || source.is_numeric() && matches!(target, Ty::Prim(PrimTy::Char))
                    || !matches!(source, Ty::Prim(_)) && !matches!(target, Ty::Prim(_));
                if !ok {
                    self.error(
                        "TYPE001",
                        format!("cannot cast `{source}` to `{target}`"),
                        &e.span,
                    );
                }
                target
            }
            ExprKind::TypeCheck { expr, ty } => {
                self.expr(expr, None);
                let _ = self.lower(ty);
                Ty::bool()
            }
            ExprKind::Coalesce { lhs, rhs } | ExprKind::Elvis { lhs, rhs } => {
                let lhs_ty = self.expr(lhs, None);
                let lhs_ty = self.infer.resolve(&lhs_ty);
                if !lhs_ty.is_optional() && !lhs_ty.is_error() {
                    self.warning(
                        "OPT001",
                        format!("left operand of `??` has non-optional type `{lhs_ty}`"),
                        &lhs.span,
                    );
                }
                let inner = lhs_ty.unwrap_optional();
                let rhs_ty = self.expr(rhs, Some(&inner));
                let rhs_ty = self.infer.resolve(&rhs_ty);
                // The result is the common supertype of the two branches.
                if self.infer.can_unify(&inner, &rhs_ty) {
                    let _ = self.infer.unify(&inner, &rhs_ty);
                    self.infer.resolve(&inner)
                } else if let Some(p) = promote(&inner, &rhs_ty) {
                    p
                } else if rhs_ty == Ty::Never {
                    inner
                } else {
                    self.error(
                        "OPT004",
                        format!("`??` branches disagree: `{inner}` vs `{rhs_ty}`"),
                        &e.span,
                    );
                    Ty::Error
                }
            }
            ExprKind::Range { lo, hi, .. } => {
                let lo_ty = self.expr(lo, Some(&Ty::int()));
                self.expect_ty(&Ty::int(), &lo_ty, &lo.span);
                let hi_ty = self.expr(hi, Some(&Ty::int()));
                self.expect_ty(&Ty::int(), &hi_ty, &hi.span);
                Ty::named("fly.runtime.Range")
            }
            ExprKind::ForceUnwrap(inner) => {
                let ty = self.expr(inner, None);
                let ty = self.infer.resolve(&ty);
                if !ty.is_optional() && !ty.is_error() {
                    self.error(
                        "OPT003",
                        format!("`!!` on non-optional `{ty}`"),
                        &e.span,
                    );
                }
                ty.unwrap_optional()
            }
            ExprKind::Unwrap(inner) => {
                let ty = self.expr(inner, None);
                let ty = self.infer.resolve(&ty);
                if !ty.is_optional() && !ty.is_error() {
                    self.error(
                        "OPT002",
                        format!("`?` on non-optional `{ty}`"),
                        &e.span,
                    );
                }
                let declared = self.return_stack.last().cloned().unwrap_or_else(Ty::unit);
                if !declared.is_optional() && !declared.is_error() {
                    self.error(
                        "OPT006",
                        format!(
                            "`?` requires the enclosing function to return an optional, \
                             found `{declared}`"
                        ),
                        &e.span,
                    );
                }
                ty.unwrap_optional()
            }
            ExprKind::Assignment { target, value } => {
                let target_ty = self.assignment_target(target);
                let found = self.expr(value, Some(&target_ty));
                self.expect_ty(&target_ty, &found, &value.span);
                Ty::unit()
            }
            ExprKind::CompoundAssignment { op, target, value } => {
                let target_ty = self.assignment_target(target);
                let found = self.expr(value, Some(&target_ty));
                let resolved = self.infer.resolve(&target_ty);
                let is_concat = *op == BinaryOp::Add && resolved == Ty::Str;
                if !is_concat && !resolved.is_numeric() && !resolved.is_error() {
                    self.error(
                        "TYPE003",
                        format!("`{}= ` requires a numeric target, found `{resolved}`", op.symbol()),
                        &e.span,
                    );
                } else if !is_concat {
                    self.expect_ty(&target_ty, &found, &value.span);
                }
                Ty::unit()
            }
            ExprKind::Error => Ty::Error,
        }
    }

    fn catch_clause(&mut self, c: &CatchClause, expected: Option<&Ty>) {
        self.symbols.push_scope();
        // The catch pattern binds the caught value, scoped to this block.
        let caught = Ty::named("RuntimeException");
        match &c.pattern.kind {
            PatternKind::Binding { ty: Some(te), .. } => {
                let declared = {
                    let params = self.in_scope_params();
                    lower_type(te, &params, &self.locals, self.resolver, self.reporter)
                };
                if let Ty::Named { name, .. } = &declared {
                    if !self.registry.is_exception_type(name) && !declared.is_error() {
                        self.error(
                            "EXC002",
                            format!("catch type `{name}` is not an exception"),
                            &c.pattern.span,
                        );
                    }
                }
                self.bind_pattern(&c.pattern, &declared, false);
            }
            _ => {
                self.bind_pattern(&c.pattern, &caught, false);
            }
        }
        self.block(&c.body, expected);
        self.symbols.pop_scope();
    }

    fn match_expr(
        &mut self,
        scrutinee: &Expr,
        arms: &[MatchArm],
        expected: Option<&Ty>,
        span: &SourceSpan,
    ) -> Ty {
        let scrutinee_ty = self.expr(scrutinee, None);
        let scrutinee_ty = self.registry.expand_alias(&self.infer.resolve(&scrutinee_ty));

        let mut result: Option<Ty> = expected.cloned();
        let mut agree = true;
        for arm in arms {
            self.symbols.push_scope();
            self.bind_pattern(&arm.pattern, &scrutinee_ty, false);
            let body_ty = self.expr(&arm.body, expected);
            self.symbols.pop_scope();

            match &result {
                Some(r) => {
                    if expected.is_some() {
                        self.expect_ty(r, &body_ty, &arm.body.span);
                    } else if self.infer.can_unify(r, &body_ty) {
                        let _ = self.infer.unify(r, &body_ty);
                    } else if body_ty != Ty::Never {
                        agree = false;
                    }
                }
                None => result = Some(body_ty),
            }
        }

        exhaust::check_match(&scrutinee_ty, arms, self.registry, span, self.reporter);

        match result {
            Some(r) if agree => self.infer.resolve(&r),
            _ => Ty::unit(),
        }
    }

    fn identifier(&mut self, name: &str, span: &SourceSpan) -> Ty {
        if let Some(sym) = self.symbols.lookup(name) {
            return sym.ty.clone();
        }
        if let Some(sig) = self.registry.functions.get(name) {
            return sig.fn_ty();
        }
        // Fields of the enclosing type are visible in methods.
        if let Some(Some(self_ty)) = self.self_stack.last() {
            let self_ty = self_ty.clone();
            if let Ty::Named { name: tyname, .. } = &self_ty {
                if let Some(def) = self.registry.types.get(tyname) {
                    if let Some(f) = def.field(name) {
                        return f.ty.clone();
                    }
                    if let Some(c) = def.computed.iter().find(|c| c.name == name) {
                        return c.ty.clone();
                    }
                }
            }
        }
        self.error("NAME001", format!("undefined symbol `{name}`"), span);
        Ty::Error
    }

    fn path_value(&mut self, path: &fly_parser::ast::DottedPath, span: &SourceSpan) -> Ty {
        let Some(last) = path.last() else {
            return Ty::Error;
        };
        // A fieldless variant used as a value: `Red` or `Color::Red`.
        if let Some(owner) = self.registry.variant_owner.get(last).cloned() {
            if path.segments.len() >= 2 {
                let qualifier = &path.segments[path.segments.len() - 2];
                if qualifier != &owner {
                    self.error(
                        "NAME001",
                        format!("variant `{last}` belongs to `{owner}`, not `{qualifier}`"),
                        span,
                    );
                    return Ty::Error;
                }
            }
            let def = self.registry.types.get(&owner);
            if let Some(def) = def {
                if let Some(variant) = def.variant(last) {
                    if !variant.fields.is_empty() {
                        let n = variant.fields.len();
                        self.error(
                            "TYPE002",
                            format!("variant `{last}` requires {n} field(s)"),
                            span,
                        );
                    }
                }
                // Generic data constants instantiate fresh arguments.
                let args = def
                    .type_params
                    .iter()
                    .map(|_| self.infer.fresh())
                    .collect();
                return Ty::Named { name: owner, args };
            }
            return Ty::named(owner);
        }
        if self.registry.types.contains_key(last) || self.resolver.resolve(last).is_ok() {
            // A bare type reference; usable as a receiver for statics.
            return Ty::named(last);
        }
        self.error("NAME001", format!("undefined symbol `{last}`"), span);
        Ty::Error
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, span: &SourceSpan) -> Ty {
        let lt = self.expr(lhs, None);
        let rt = self.expr(rhs, None);
        let lt = self.infer.resolve(&lt);
        let rt = self.infer.resolve(&rt);

        if lt.is_error() || rt.is_error() {
            return if op.is_comparison() { Ty::bool() } else { Ty::Error };
        }

        if op.is_logical() {
            self.expect_ty(&Ty::bool(), &lt, &lhs.span);
            self.expect_ty(&Ty::bool(), &rt, &rhs.span);
            return Ty::bool();
        }

        if op.is_comparison() {
            let comparable = self.infer.can_unify(&lt, &rt)
                || promote(&lt, &rt).is_some();
            if !comparable {
                self.mismatch(&lt, &rt, span);
            } else {
                let _ = self.infer.unify(&lt, &rt);
            }
            return Ty::bool();
        }

        if matches!(op, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor) {
            for (ty, e) in [(&lt, lhs), (&rt, rhs)] {
                if !matches!(ty, Ty::Prim(p) if p.is_integral()) {
                    self.error(
                        "TYPE003",
                        format!("bitwise operator requires an integral type, found `{ty}`"),
                        &e.span,
                    );
                }
            }
            return promote(&lt, &rt).unwrap_or(Ty::int());
        }

        // Arithmetic. String `+` concatenates.
        if op == BinaryOp::Add && (lt == Ty::Str || rt == Ty::Str) {
            return Ty::Str;
        }
        if op == BinaryOp::Pow {
            for (ty, e) in [(&lt, lhs), (&rt, rhs)] {
                if !ty.is_numeric() {
                    self.error(
                        "TYPE003",
                        format!("`**` requires numeric operands, found `{ty}`"),
                        &e.span,
                    );
                }
            }
            // Exponentiation is carried out in double precision.
            return Ty::float();
        }
        match promote(&lt, &rt) {
            Some(t) => t,
            None => {
                self.error(
                    "TYPE003",
                    format!(
                        "operator `{}` requires numeric operands, found `{lt}` and `{rt}`",
                        op.symbol()
                    ),
                    span,
                );
                Ty::Error
            }
        }
    }

    fn assignment_target(&mut self, target: &Expr) -> Ty {
        match &target.kind {
            ExprKind::Identifier(name) => {
                let Some(sym) = self.symbols.lookup(name) else {
                    // Possibly a field of self.
                    return self.identifier(name, &target.span);
                };
                let (ty, mutable) = (sym.ty.clone(), sym.mutable);
                self.types.insert(target.id, ty.clone());
                if !mutable {
                    self.error(
                        "TYPE010",
                        format!("cannot assign to immutable binding `{name}`"),
                        &target.span,
                    );
                }
                ty
            }
            ExprKind::FieldAccess { .. } | ExprKind::Index { .. } => self.expr(target, None),
            _ => {
                self.error(
                    "TYPE011",
                    "invalid assignment target".to_string(),
                    &target.span,
                );
                Ty::Error
            }
        }
    }

    fn lambda(
        &mut self,
        params: &[fly_parser::ast::Param],
        return_type: Option<&fly_parser::ast::TypeExpr>,
        body: &Expr,
        expected: Option<&Ty>,
    ) -> Ty {
        let expected_fun = match expected.map(|t| self.registry.expand_alias(t)) {
            Some(Ty::Fun(ps, ret)) if ps.len() == params.len() => Some((ps, *ret)),
            _ => None,
        };

        let mut param_tys = Vec::new();
        for (i, p) in params.iter().enumerate() {
            let ty = match (&p.ty, &expected_fun) {
                (Some(te), _) => self.lower(te),
                (None, Some((ps, _))) => ps[i].clone(),
                (None, None) => self.infer.fresh(),
            };
            param_tys.push(ty);
        }

        let declared_ret = return_type.map(|t| self.lower(t));
        let ret = declared_ret
            .clone()
            .or_else(|| expected_fun.as_ref().map(|(_, r)| r.clone()))
            .unwrap_or_else(|| self.infer.fresh());

        // Lambdas inherit the enclosing frame's async-ness and self.
        let inherited_async = self.is_async_context();
        let inherited_self = self.self_stack.last().cloned().flatten();
        self.push_frame(inherited_async, ret.clone(), inherited_self, Vec::new());
        self.symbols.push_scope();
        for (p, ty) in params.iter().zip(param_tys.iter()) {
            self.symbols.define_unchecked(Symbol {
                name: p.name.clone(),
                kind: SymbolKind::Param,
                ty: ty.clone(),
                span: p.span.clone(),
                mutable: false,
                slot: None,
            });
        }
        let body_ty = self.expr(body, Some(&ret));
        self.expect_ty(&ret, &body_ty, &body.span);
        self.symbols.pop_scope();
        self.pop_frame();

        let param_tys = param_tys.iter().map(|t| self.infer.resolve(t)).collect();
        Ty::Fun(param_tys, Box::new(self.infer.resolve(&ret)))
    }

    /// Instantiate a signature's type parameters with fresh variables and
    /// check a call against it. Reports incomplete inference (`TYPE007`) and
    /// bound violations.
    fn check_call_against(
        &mut self,
        sig: &FnSig,
        args: &[Expr],
        span: &SourceSpan,
        extra_subst: FxHashMap<String, Ty>,
    ) -> Ty {
        if args.len() != sig.params.len() {
            self.error(
                "TYPE002",
                format!(
                    "`{}` expects {} argument(s), found {}",
                    sig.name,
                    sig.params.len(),
                    args.len()
                ),
                span,
            );
            for a in args {
                self.expr(a, None);
            }
            return Ty::Error;
        }

        let mut subst = extra_subst;
        let mut own_vars: Vec<(String, Ty)> = Vec::new();
        for tp in &sig.type_params {
            let fresh = self.infer.fresh();
            subst.insert(tp.name.clone(), fresh.clone());
            own_vars.push((tp.name.clone(), fresh));
        }

        for (param, arg) in sig.params.iter().zip(args.iter()) {
            let expected = param.subst(&subst);
            let found = self.expr(arg, Some(&expected));
            self.expect_ty(&expected, &found, &arg.span);
        }

        // Inference must be complete once all arguments are seen.
        let mut unresolved = Vec::new();
        for (name, var) in &own_vars {
            let resolved = self.infer.resolve(var);
            if matches!(resolved, Ty::Var(_)) {
                unresolved.push(name.clone());
            }
        }
        if !unresolved.is_empty() {
            self.error(
                "TYPE007",
                format!(
                    "cannot infer type parameter(s) {} of `{}`",
                    unresolved
                        .iter()
                        .map(|n| format!("`{n}`"))
                        .collect::<Vec<_>>()
                        .join(", "),
                    sig.name
                ),
                span,
            );
        }

        // Bound checking on the resolved arguments.
        for (tp, (_, var)) in sig.type_params.iter().zip(own_vars.iter()) {
            let resolved = self.infer.resolve(var);
            if !matches!(resolved, Ty::Var(_)) {
                traits::check_bounds_for(self.registry, &resolved, &tp.bounds, span, self.reporter);
            }
        }

        let result = if sig.is_async {
            Ty::future(sig.ret.subst(&subst))
        } else {
            sig.ret.subst(&subst)
        };
        self.infer.resolve(&result)
    }

    fn call(&mut self, callee: &Expr, args: &[Expr], span: &SourceSpan) -> Ty {
        match &callee.kind {
            ExprKind::Identifier(name) => {
                // Local bindings of function type shadow top-level functions.
                if let Some(sym) = self.symbols.lookup(name) {
                    let ty = sym.ty.clone();
                    self.types.insert(callee.id, ty.clone());
                    return self.call_fun_value(&ty, args, span);
                }
                if let Some(sig) = self.registry.functions.get(name).cloned() {
                    self.types.insert(callee.id, sig.fn_ty());
                    return self.check_call_against(&sig, args, span, FxHashMap::default());
                }
                if let Some(b) = builtins::global_function(name, &mut self.infer) {
                    for (param, arg) in b.params.iter().zip(args.iter()) {
                        let found = self.expr(arg, Some(param));
                        self.expect_ty(param, &found, &arg.span);
                    }
                    if args.len() != b.params.len() {
                        self.error(
                            "TYPE002",
                            format!(
                                "`{name}` expects {} argument(s), found {}",
                                b.params.len(),
                                args.len()
                            ),
                            span,
                        );
                    }
                    return b.ret;
                }
                self.error("NAME001", format!("undefined function `{name}`"), span);
                for a in args {
                    self.expr(a, None);
                }
                Ty::Error
            }
            ExprKind::Path(path) => {
                let last = path.last().unwrap_or_default().to_string();
                if let Some(owner) = self.registry.variant_owner.get(&last).cloned() {
                    return self.variant_ctor(&owner, &last, args, span);
                }
                self.error(
                    "TYPE004",
                    format!("`{last}` is not callable; classes are constructed with `new`"),
                    span,
                );
                for a in args {
                    self.expr(a, None);
                }
                Ty::Error
            }
            _ => {
                let callee_ty = self.expr(callee, None);
                self.call_fun_value(&callee_ty, args, span)
            }
        }
    }

    fn call_fun_value(&mut self, callee_ty: &Ty, args: &[Expr], span: &SourceSpan) -> Ty {
        let callee_ty = self.infer.resolve(callee_ty);
        match callee_ty {
            Ty::Fun(params, ret) => {
                if params.len() != args.len() {
                    self.error(
                        "TYPE002",
                        format!(
                            "function expects {} argument(s), found {}",
                            params.len(),
                            args.len()
                        ),
                        span,
                    );
                }
                for (param, arg) in params.iter().zip(args.iter()) {
                    let found = self.expr(arg, Some(param));
                    self.expect_ty(param, &found, &arg.span);
                }
                *ret
            }
            Ty::Error => {
                for a in args {
                    self.expr(a, None);
                }
                Ty::Error
            }
            other => {
                self.error("TYPE004", format!("`{other}` is not a function"), span);
                for a in args {
                    self.expr(a, None);
                }
                Ty::Error
            }
        }
    }

    fn variant_ctor(&mut self, owner: &str, variant: &str, args: &[Expr], span: &SourceSpan) -> Ty {
        let Some(def) = self.registry.types.get(owner).cloned() else {
            return Ty::Error;
        };
        let Some(v) = def.variant(variant).cloned() else {
            return Ty::Error;
        };

        let mut subst = FxHashMap::default();
        let mut arg_vars = Vec::new();
        for tp in &def.type_params {
            let fresh = self.infer.fresh();
            subst.insert(tp.name.clone(), fresh.clone());
            arg_vars.push(fresh);
        }

        if args.len() != v.fields.len() {
            self.error(
                "TYPE002",
                format!(
                    "variant `{variant}` has {} field(s), found {} argument(s)",
                    v.fields.len(),
                    args.len()
                ),
                span,
            );
        }
        for (field, arg) in v.fields.iter().zip(args.iter()) {
            let expected = field.ty.subst(&subst);
            let found = self.expr(arg, Some(&expected));
            self.expect_ty(&expected, &found, &arg.span);
        }

        let args = arg_vars.iter().map(|v| self.infer.resolve(v)).collect();
        Ty::Named {
            name: owner.to_string(),
            args,
        }
    }

    fn static_call(
        &mut self,
        type_path: &fly_parser::ast::DottedPath,
        name: &str,
        args: &[Expr],
        span: &SourceSpan,
    ) -> Ty {
        let Some(type_name) = type_path.last() else {
            return Ty::Error;
        };

        // Local static methods.
        if let Some(def) = self.registry.types.get(type_name).cloned() {
            if let Some(m) = def.methods.iter().find(|m| m.name == name && m.is_static) {
                let m = m.clone();
                return self.check_call_against(&m, args, span, FxHashMap::default());
            }
            if def.method(name).is_some() {
                self.error(
                    "TYPE006",
                    format!("method `{name}` on `{type_name}` is not static"),
                    span,
                );
                for a in args {
                    self.expr(a, None);
                }
                return Ty::Error;
            }
        }

        // Host class statics resolve through the environment.
        if let Ok(resolved) = self.resolver.resolve(type_name) {
            if let Some(info) = self.resolver.environment().lookup(&resolved.dotted) {
                let candidates: Vec<_> = info
                    .methods_named(name)
                    .filter(|m| m.is_static && m.param_descriptors.len() == args.len())
                    .cloned()
                    .collect();
                if let Some(m) = candidates.first() {
                    for (desc, arg) in m.param_descriptors.iter().zip(args.iter()) {
                        let expected = ty_from_descriptor(desc);
                        let found = self.expr(arg, Some(&expected));
                        self.expect_ty(&expected, &found, &arg.span);
                    }
                    return ty_from_descriptor(&m.return_descriptor);
                }
            }
        }

        self.error(
            "TYPE006",
            format!("no static method `{name}` on `{type_name}`"),
            span,
        );
        for a in args {
            self.expr(a, None);
        }
        Ty::Error
    }

    fn method_call(
        &mut self,
        recv: &Expr,
        name: &str,
        args: &[Expr],
        safe: bool,
        span: &SourceSpan,
    ) -> Ty {
        let recv_ty = self.expr(recv, None);
        let recv_ty = self.registry.expand_alias(&self.infer.resolve(&recv_ty));

        let inner = if safe {
            if !recv_ty.is_optional() && !recv_ty.is_error() {
                self.warning(
                    "OPT001",
                    format!("`?.` on non-optional `{recv_ty}`"),
                    span,
                );
            }
            recv_ty.unwrap_optional()
        } else {
            recv_ty
        };

        let result = self.method_result(&inner, name, args, span);
        if safe {
            Ty::optional(result)
        } else {
            result
        }
    }

    fn method_result(&mut self, recv: &Ty, name: &str, args: &[Expr], span: &SourceSpan) -> Ty {
        if recv.is_error() {
            for a in args {
                self.expr(a, None);
            }
            return Ty::Error;
        }

        // 1. Builtin surface of String/arrays/maps.
        if let Some(b) = builtins::method(recv, name, &mut self.infer) {
            if args.len() != b.params.len() {
                self.error(
                    "TYPE002",
                    format!(
                        "`{name}` expects {} argument(s), found {}",
                        b.params.len(),
                        args.len()
                    ),
                    span,
                );
            }
            for (param, arg) in b.params.iter().zip(args.iter()) {
                let found = self.expr(arg, Some(param));
                self.expect_ty(param, &found, &arg.span);
            }
            return self.infer.resolve(&b.ret);
        }

        // 2. Declared methods (walking local superclasses), with the
        //    receiver's generic arguments substituted.
        if let Ty::Named { name: tyname, args: ty_args } = recv {
            let mut current = tyname.clone();
            for _ in 0..16 {
                let Some(def) = self.registry.types.get(&current).cloned() else {
                    break;
                };
                if let Some(m) = def.method(name) {
                    let m = m.clone();
                    let mut subst = FxHashMap::default();
                    for (tp, arg) in def.type_params.iter().zip(ty_args.iter()) {
                        subst.insert(tp.name.clone(), arg.clone());
                    }
                    return self.check_call_against(&m, args, span, subst);
                }
                if let Some(c) = def.computed.iter().find(|c| c.name == name) {
                    if args.is_empty() {
                        return c.ty.clone();
                    }
                }
                match def.supers.first() {
                    Some(Ty::Named { name, .. }) => current = name.clone(),
                    _ => break,
                }
            }
        }

        // 3. Inherent impls, extensions, then trait impls.
        if let Some(m) = self.registry.inherent_method(recv, name).cloned() {
            return self.check_call_against(&m, args, span, FxHashMap::default());
        }
        if let Some((_, m)) = self.registry.trait_method(recv, name) {
            let m = m.clone();
            return self.check_call_against(&m, args, span, FxHashMap::default());
        }

        // 4. A generic parameter exposes the methods of its bounds.
        if let Ty::Param(pname) = recv {
            let bounds: Vec<String> = self
                .param_bounds
                .iter()
                .flatten()
                .filter(|(n, _)| n == pname)
                .flat_map(|(_, bs)| bs.iter().cloned())
                .collect();
            for bound in bounds {
                if let Some(def) = self.registry.types.get(&bound) {
                    if let Some(m) = def.method(name) {
                        let m = m.clone();
                        return self.check_call_against(&m, args, span, FxHashMap::default());
                    }
                }
            }
        }

        // 5. Host-VM classes answer through the environment.
        if let Ty::Named { name: tyname, .. } = recv {
            if let Ok(resolved) = self.resolver.resolve(tyname) {
                if let Some(info) = self.resolver.environment().lookup(&resolved.dotted) {
                    let m = info
                        .methods_named(name)
                        .find(|m| !m.is_static && m.param_descriptors.len() == args.len())
                        .cloned();
                    if let Some(m) = m {
                        for (desc, arg) in m.param_descriptors.iter().zip(args.iter()) {
                            let expected = ty_from_descriptor(desc);
                            let found = self.expr(arg, Some(&expected));
                            self.expect_ty(&expected, &found, &arg.span);
                        }
                        return ty_from_descriptor(&m.return_descriptor);
                    }
                }
            }
        }

        self.error(
            "TYPE006",
            format!("no method `{name}` on `{recv}`"),
            span,
        );
        for a in args {
            self.expr(a, None);
        }
        Ty::Error
    }

    fn field_ty(&mut self, recv: &Ty, name: &str, span: &SourceSpan) -> Ty {
        let recv = self.registry.expand_alias(&self.infer.resolve(recv));
        if recv.is_error() {
            return Ty::Error;
        }

        // Arrays expose `length` as a field.
        if let Ty::Array(_) = recv {
            if name == "length" {
                return Ty::int();
            }
        }

        if let Ty::Named { name: tyname, args } = &recv {
            let mut current = tyname.clone();
            for _ in 0..16 {
                let Some(def) = self.registry.types.get(&current) else {
                    break;
                };
                let mut subst = FxHashMap::default();
                for (tp, arg) in def.type_params.iter().zip(args.iter()) {
                    subst.insert(tp.name.clone(), arg.clone());
                }
                if let Some(f) = def.field(name) {
                    return f.ty.subst(&subst);
                }
                if let Some(c) = def.computed.iter().find(|c| c.name == name) {
                    return c.ty.subst(&subst);
                }
                match def.supers.first() {
                    Some(Ty::Named { name, .. }) => current = name.clone(),
                    _ => break,
                }
            }

            // Host class fields.
            if let Ok(resolved) = self.resolver.resolve(tyname) {
                if let Some(info) = self.resolver.environment().lookup(&resolved.dotted) {
                    if let Some(f) = info.field(name) {
                        return ty_from_descriptor(&f.descriptor);
                    }
                }
            }
        }

        self.error("TYPE005", format!("`{recv}` has no field `{name}`"), span);
        Ty::Error
    }

    fn new_expr(
        &mut self,
        te: &fly_parser::ast::TypeExpr,
        args: &[Expr],
        span: &SourceSpan,
    ) -> Ty {
        let ty = self.lower(te);
        traits::check_named_bounds(self.registry, &ty, span, self.reporter);

        if let Ty::Named { name, args: ty_args } = &ty {
            if let Some(def) = self.registry.types.get(name).cloned() {
                match def.kind {
                    TypeDefKind::Class
                    | TypeDefKind::Exception
                    | TypeDefKind::Context
                    | TypeDefKind::Supervisor
                    | TypeDefKind::Flow
                    | TypeDefKind::Struct
                    | TypeDefKind::Spark => {
                        // The generated constructor takes every declared
                        // field in order.
                        let mut subst = FxHashMap::default();
                        for (tp, arg) in def.type_params.iter().zip(ty_args.iter()) {
                            subst.insert(tp.name.clone(), arg.clone());
                        }
                        if args.len() != def.fields.len() {
                            self.error(
                                "TYPE002",
                                format!(
                                    "`new {name}` expects {} argument(s), found {}",
                                    def.fields.len(),
                                    args.len()
                                ),
                                span,
                            );
                        }
                        for (field, arg) in def.fields.iter().zip(args.iter()) {
                            let expected = field.ty.subst(&subst);
                            let found = self.expr(arg, Some(&expected));
                            self.expect_ty(&expected, &found, &arg.span);
                        }
                    }
                    other => {
                        self.error(
                            "TYPE004",
                            format!("cannot `new` a {}", other.describe()),
                            span,
                        );
                        for a in args {
                            self.expr(a, None);
                        }
                    }
                }
                return ty.clone();
            }

            // Host classes: match a constructor by arity if visible.
            if let Ok(resolved) = self.resolver.resolve(name) {
                if let Some(info) = self.resolver.environment().lookup(&resolved.dotted) {
                    let ctor = info
                        .methods_named("<init>")
                        .find(|m| m.param_descriptors.len() == args.len())
                        .cloned();
                    if let Some(c) = ctor {
                        for (desc, arg) in c.param_descriptors.iter().zip(args.iter()) {
                            let expected = ty_from_descriptor(desc);
                            let found = self.expr(arg, Some(&expected));
                            self.expect_ty(&expected, &found, &arg.span);
                        }
                        return ty.clone();
                    }
                }
                for a in args {
                    self.expr(a, None);
                }
                return ty.clone();
            }
        }

        for a in args {
            self.expr(a, None);
        }
        ty
    }

    fn struct_lit(
        &mut self,
        path: &fly_parser::ast::DottedPath,
        fields: &[(String, Expr)],
        span: &SourceSpan,
    ) -> Ty {
        let Some(name) = path.last() else {
            return Ty::Error;
        };

        let Some(def) = self.registry.types.get(name).cloned() else {
            self.error(
                "NAME002",
                format!("unknown struct `{name}`"),
                span,
            );
            for (_, value) in fields {
                self.expr(value, None);
            }
            return Ty::Error;
        };

        if !matches!(def.kind, TypeDefKind::Struct | TypeDefKind::Spark) {
            self.error(
                "TYPE004",
                format!("`{name}` is a {}, not a struct", def.kind.describe()),
                span,
            );
        }

        let mut subst = FxHashMap::default();
        let mut arg_vars = Vec::new();
        for tp in &def.type_params {
            let fresh = self.infer.fresh();
            subst.insert(tp.name.clone(), fresh.clone());
            arg_vars.push(fresh);
        }

        let mut remaining: FxHashSet<&str> =
            def.fields.iter().map(|f| f.name.as_str()).collect();
        for (fname, value) in fields {
            match def.fields.iter().find(|f| &f.name == fname) {
                Some(f) => {
                    remaining.remove(fname.as_str());
                    let expected = f.ty.subst(&subst);
                    let found = self.expr(value, Some(&expected));
                    self.expect_ty(&expected, &found, &value.span);
                }
                None => {
                    self.error(
                        "TYPE009",
                        format!("`{name}` has no field `{fname}`"),
                        &value.span,
                    );
                    self.expr(value, None);
                }
            }
        }
        if !remaining.is_empty() {
            let mut missing: Vec<&str> = remaining.into_iter().collect();
            missing.sort_unstable();
            self.error(
                "TYPE008",
                format!("missing field(s) {} in `{name}`", missing.join(", ")),
                span,
            );
        }

        let args = arg_vars.iter().map(|v| self.infer.resolve(v)).collect();
        Ty::Named {
            name: name.to_string(),
            args,
        }
    }
}

/// Numeric promotion: the wider of two numeric operand types; mixing with a
/// floating type yields the floating type.
fn promote(a: &Ty, b: &Ty) -> Option<Ty> {
    let (Ty::Prim(pa), Ty::Prim(pb)) = (a, b) else {
        return None;
    };
    if !pa.is_numeric() || !pb.is_numeric() {
        return None;
    }
    fn rank(p: PrimTy) -> u8 {
        match p {
            PrimTy::Byte => 0,
            PrimTy::Short => 1,
            PrimTy::Int => 2,
            PrimTy::Long => 3,
            PrimTy::Float | PrimTy::Double => 4,
            _ => 5,
        }
    }
    let winner = if rank(*pa) >= rank(*pb) { *pa } else { *pb };
    Some(Ty::Prim(winner))
}
