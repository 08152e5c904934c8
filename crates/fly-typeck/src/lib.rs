//! Semantic analysis for the Flylang compiler.
//!
//! Entry point is [`analyze`]: given the AST, a [`TypeResolver`] primed
//! with the unit's imports, and the shared diagnostic reporter, it runs the
//! sub-checks in order — symbol-table build with duplicate detection,
//! syntactic well-formedness, bidirectional type checking with local
//! inference, generic/trait-bound checking, trait conformance, pattern
//! exhaustiveness and reachability, async-context validation, exception
//! validity, option discipline, and effect/`requires` capture — without
//! short-circuiting, so one pass surfaces as many diagnostics as possible.
//!
//! Diagnostic codes are stable strings: `E####` for structural errors,
//! `NAME###` resolution, `TYPE###` typing, `GEN###`/`BOUNDS###` generics,
//! `TRAIT###` conformance, `PAT###` patterns, `TC###` async contexts,
//! `EXC###` exceptions, `DUP###` duplicates, `OPT###` option discipline.
//!
//! The AST is never mutated: results live in side tables keyed by
//! [`NodeId`].

use fly_common::diagnostics::DiagnosticReporter;
use fly_parser::ast::{CompilationUnit, NodeId};
use fly_common::span::SourceSpan;
use rustc_hash::FxHashMap;

pub mod builtins;
mod check;
mod collect;
mod exhaust;
pub mod resolver;
pub mod symtab;
pub mod traits;
pub mod ty;
pub mod unify;

pub use resolver::{ResolveError, ResolvedType, TypeResolver};
use ty::Ty;

/// Side-table keyed by AST node identity.
pub type NodeIdMap<T> = FxHashMap<NodeId, T>;

/// A declared generic parameter and the names of its bounds.
#[derive(Debug, Clone)]
pub struct TypeParamSig {
    pub name: String,
    pub bounds: Vec<String>,
}

/// A resolved function or method signature.
#[derive(Debug, Clone)]
pub struct FnSig {
    pub name: String,
    pub type_params: Vec<TypeParamSig>,
    pub param_names: Vec<String>,
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub is_async: bool,
    pub is_static: bool,
    pub is_public: bool,
    pub has_body: bool,
    pub span: SourceSpan,
}

impl FnSig {
    /// The type of a reference to this function.
    pub fn fn_ty(&self) -> Ty {
        Ty::Fun(self.params.clone(), Box::new(self.declared_result()))
    }

    /// What a call to this function yields: async functions yield futures.
    pub fn call_result(&self) -> Ty {
        if self.is_async {
            Ty::future(self.ret.clone())
        } else {
            self.ret.clone()
        }
    }

    fn declared_result(&self) -> Ty {
        self.call_result()
    }
}

#[derive(Debug, Clone)]
pub struct FieldSig {
    pub name: String,
    pub ty: Ty,
}

#[derive(Debug, Clone)]
pub struct VariantSig {
    pub name: String,
    pub fields: Vec<FieldSig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeDefKind {
    Class,
    Interface,
    Struct,
    Spark,
    Data,
    Enum,
    Exception,
    Trait,
    Protocol,
    Context,
    Supervisor,
    Flow,
}

impl TypeDefKind {
    pub fn describe(self) -> &'static str {
        match self {
            TypeDefKind::Class => "class",
            TypeDefKind::Interface => "interface",
            TypeDefKind::Struct => "struct",
            TypeDefKind::Spark => "spark",
            TypeDefKind::Data => "data type",
            TypeDefKind::Enum => "enum",
            TypeDefKind::Exception => "exception",
            TypeDefKind::Trait => "trait",
            TypeDefKind::Protocol => "protocol",
            TypeDefKind::Context => "context",
            TypeDefKind::Supervisor => "supervisor",
            TypeDefKind::Flow => "flow",
        }
    }

    pub fn is_trait_like(self) -> bool {
        matches!(self, TypeDefKind::Trait | TypeDefKind::Protocol)
    }
}

/// One declared type, with resolved member signatures.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub kind: TypeDefKind,
    pub type_params: Vec<TypeParamSig>,
    pub supers: Vec<Ty>,
    pub fields: Vec<FieldSig>,
    /// Spark computed properties (zero-arg, typed).
    pub computed: Vec<FieldSig>,
    pub methods: Vec<FnSig>,
    /// Data/enum variants.
    pub variants: Vec<VariantSig>,
    pub span: SourceSpan,
}

impl TypeDef {
    pub fn field(&self, name: &str) -> Option<&FieldSig> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&FnSig> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn variant(&self, name: &str) -> Option<&VariantSig> {
        self.variants.iter().find(|v| v.name == name)
    }
}

/// An `impl` block's resolved surface.
#[derive(Debug, Clone)]
pub struct ImplSig {
    pub trait_name: Option<String>,
    pub self_ty: Ty,
    pub methods: Vec<FnSig>,
    pub span: SourceSpan,
}

/// Everything collected from declarations, consulted during body checking
/// and by the code generator.
#[derive(Debug, Default)]
pub struct Registry {
    pub module_path: Vec<String>,
    pub types: FxHashMap<String, TypeDef>,
    pub impls: Vec<ImplSig>,
    pub functions: FxHashMap<String, FnSig>,
    pub aliases: FxHashMap<String, Ty>,
    /// Variant name → owning data/enum name.
    pub variant_owner: FxHashMap<String, String>,
    /// Extension methods: (target type, methods).
    pub extends: Vec<(Ty, Vec<FnSig>)>,
}

impl Registry {
    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    /// Expand type aliases, with a small fuel bound against cycles.
    pub fn expand_alias(&self, ty: &Ty) -> Ty {
        let mut current = ty.clone();
        for _ in 0..16 {
            match &current {
                Ty::Named { name, args } if args.is_empty() => {
                    match self.aliases.get(name) {
                        Some(target) => current = target.clone(),
                        None => break,
                    }
                }
                _ => break,
            }
        }
        current
    }

    /// Whether `name` names a declared exception, or transitively extends
    /// one (or the root exception type).
    pub fn is_exception_type(&self, name: &str) -> bool {
        if matches!(name, "Exception" | "RuntimeException" | "Throwable")
            || name.ends_with(".Exception")
            || name.ends_with(".RuntimeException")
        {
            return true;
        }
        let mut current = name.to_string();
        for _ in 0..32 {
            let Some(def) = self.types.get(&current) else {
                return false;
            };
            if def.kind == TypeDefKind::Exception {
                return true;
            }
            match def.supers.first() {
                Some(Ty::Named { name, .. }) => current = name.clone(),
                _ => return false,
            }
        }
        false
    }

    /// Find a visible `impl Trait for ty`.
    pub fn impl_for(&self, trait_name: &str, ty: &Ty) -> Option<&ImplSig> {
        self.impls.iter().find(|i| {
            i.trait_name.as_deref() == Some(trait_name) && types_match_for_impl(&i.self_ty, ty)
        })
    }

    /// Methods from inherent impls and extensions on `ty`.
    pub fn inherent_method(&self, ty: &Ty, method: &str) -> Option<&FnSig> {
        for i in &self.impls {
            if i.trait_name.is_none() && types_match_for_impl(&i.self_ty, ty) {
                if let Some(m) = i.methods.iter().find(|m| m.name == method) {
                    return Some(m);
                }
            }
        }
        for (target, methods) in &self.extends {
            if types_match_for_impl(target, ty) {
                if let Some(m) = methods.iter().find(|m| m.name == method) {
                    return Some(m);
                }
            }
        }
        None
    }

    /// Method provided by any trait impl for `ty`.
    pub fn trait_method(&self, ty: &Ty, method: &str) -> Option<(&ImplSig, &FnSig)> {
        for i in &self.impls {
            if i.trait_name.is_some() && types_match_for_impl(&i.self_ty, ty) {
                if let Some(m) = i.methods.iter().find(|m| m.name == method) {
                    return Some((i, m));
                }
            }
        }
        None
    }
}

/// Impl-target matching ignores generic arguments (erasure).
fn types_match_for_impl(target: &Ty, ty: &Ty) -> bool {
    match (target, ty) {
        (Ty::Named { name: a, .. }, Ty::Named { name: b, .. }) => a == b,
        (a, b) => a == b,
    }
}

/// The analysis result: diagnostics land in the reporter; facts land here.
#[derive(Debug)]
pub struct Analysis {
    /// Inferred type of every checked expression.
    pub types: NodeIdMap<Ty>,
    pub registry: Registry,
    /// The class declaring a valid `fly` entry point, if any.
    pub entry_class: Option<String>,
}

/// Run all semantic sub-checks over one compilation unit.
pub fn analyze(
    unit: &CompilationUnit,
    resolver: &mut TypeResolver<'_>,
    reporter: &mut DiagnosticReporter,
) -> Analysis {
    let registry = collect::collect(unit, resolver, reporter);
    traits::check_conformance(&registry, reporter);
    let (types, entry_class) = check::check_bodies(unit, &registry, resolver, reporter);
    Analysis {
        types,
        registry,
        entry_class,
    }
}

/// Prime a resolver from the unit's use declarations (driver helper).
pub fn register_imports(unit: &CompilationUnit, resolver: &mut TypeResolver<'_>) {
    for u in &unit.uses {
        match &u.kind {
            fly_parser::ast::UseKind::Single { item, alias } => {
                resolver.register_import(&u.module_path.segments, item, alias.as_deref());
            }
            fly_parser::ast::UseKind::List(items) => {
                for item in items {
                    resolver.register_import(&u.module_path.segments, item, None);
                }
            }
            fly_parser::ast::UseKind::Wildcard => {
                resolver.register_wildcard(&u.module_path.segments);
            }
        }
    }
}
