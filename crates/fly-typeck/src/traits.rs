//! Trait conformance and bound checking: sub-checks 4 and 5.
//!
//! For every `impl Trait for Type`: the trait must be a declared
//! trait/protocol (`TRAIT002`), every required method must be present with
//! a matching signature (`TRAIT005`, `TRAIT004`), and no method may appear
//! that the trait does not declare (`TRAIT006`). Bound satisfaction
//! (`BOUNDS001`/`BOUNDS002`) is consulted by the checker at every generic
//! instantiation.

use fly_common::diagnostics::{Diagnostic, DiagnosticReporter, Phase};
use fly_common::span::SourceSpan;

use crate::ty::{PrimTy, Ty};
use crate::{FnSig, Registry, TypeDefKind};

fn error(reporter: &mut DiagnosticReporter, code: &str, message: String, span: &SourceSpan) {
    reporter.report(Diagnostic::error(code, message, Phase::Semantic).with_span(span.clone()));
}

/// Check every trait impl in the registry against its trait definition.
pub fn check_conformance(registry: &Registry, reporter: &mut DiagnosticReporter) {
    for imp in &registry.impls {
        let Some(trait_name) = &imp.trait_name else {
            continue;
        };

        let Some(trait_def) = registry.types.get(trait_name) else {
            error(
                reporter,
                "TRAIT002",
                format!("`{trait_name}` is not a declared trait or protocol"),
                &imp.span,
            );
            continue;
        };
        if !trait_def.kind.is_trait_like() {
            error(
                reporter,
                "TRAIT002",
                format!(
                    "`{trait_name}` is a {}, not a trait or protocol",
                    trait_def.kind.describe()
                ),
                &imp.span,
            );
            continue;
        }

        // Missing required methods (those without default bodies).
        for required in &trait_def.methods {
            let found = imp.methods.iter().find(|m| m.name == required.name);
            match found {
                None if !required.has_body => {
                    error(
                        reporter,
                        "TRAIT005",
                        format!(
                            "impl of `{trait_name}` for `{}` is missing method `{}`",
                            imp.self_ty, required.name
                        ),
                        &imp.span,
                    );
                }
                Some(provided) => {
                    if !signatures_match(required, provided) {
                        error(
                            reporter,
                            "TRAIT004",
                            format!(
                                "method `{}` in impl of `{trait_name}` for `{}` has a \
                                 signature incompatible with the trait",
                                provided.name, imp.self_ty
                            ),
                            &provided.span,
                        );
                    }
                }
                None => {}
            }
        }

        // Extra methods not declared by the trait.
        for provided in &imp.methods {
            if !trait_def.methods.iter().any(|m| m.name == provided.name) {
                error(
                    reporter,
                    "TRAIT006",
                    format!(
                        "method `{}` is not declared by trait `{trait_name}`",
                        provided.name
                    ),
                    &provided.span,
                );
            }
        }
    }
}

/// Signature compatibility modulo variance: parameter counts equal,
/// parameter and return types equal where neither side is a type parameter
/// or an already-reported error.
fn signatures_match(required: &FnSig, provided: &FnSig) -> bool {
    if required.params.len() != provided.params.len() {
        return false;
    }
    for (r, p) in required.params.iter().zip(provided.params.iter()) {
        if !types_compatible(r, p) {
            return false;
        }
    }
    types_compatible(&required.ret, &provided.ret)
}

fn types_compatible(a: &Ty, b: &Ty) -> bool {
    match (a, b) {
        (Ty::Error, _) | (_, Ty::Error) => true,
        (Ty::Param(_), _) | (_, Ty::Param(_)) => true,
        _ => a == b,
    }
}

/// Whether `ty` satisfies the bound `bound_name`: either it *is* that
/// trait/protocol, or a visible `impl bound for ty` exists.
/// `Ok(false)` means unsatisfied; `Err(())` means the bound name itself is
/// unknown (`BOUNDS002` at the caller).
pub fn bound_satisfied(registry: &Registry, ty: &Ty, bound_name: &str) -> Result<bool, ()> {
    let Some(bound_def) = registry.types.get(bound_name) else {
        return Err(());
    };
    if !bound_def.kind.is_trait_like() {
        return Err(());
    }

    if let Ty::Named { name, .. } = ty {
        if name == bound_name {
            return Ok(true);
        }
        // A type whose declaration lists the trait among its supers.
        if let Some(def) = registry.types.get(name) {
            if def
                .supers
                .iter()
                .any(|s| matches!(s, Ty::Named { name, .. } if name == bound_name))
            {
                return Ok(true);
            }
        }
    }

    Ok(registry.impl_for(bound_name, ty).is_some())
}

/// Report `BOUNDS001`/`BOUNDS002` for one resolved type argument.
pub fn check_bounds_for(
    registry: &Registry,
    arg: &Ty,
    bounds: &[String],
    span: &SourceSpan,
    reporter: &mut DiagnosticReporter,
) {
    if arg.is_error() {
        return;
    }
    for bound in bounds {
        match bound_satisfied(registry, arg, bound) {
            Err(()) => error(
                reporter,
                "BOUNDS002",
                format!("unknown trait bound `{bound}`"),
                span,
            ),
            Ok(false) => error(
                reporter,
                "BOUNDS001",
                format!("type `{arg}` does not satisfy bound `{bound}`"),
                span,
            ),
            Ok(true) => {}
        }
    }
}

/// Walk a type; for every named instantiation of a locally declared generic
/// type, verify its arguments satisfy the declared bounds.
pub fn check_named_bounds(
    registry: &Registry,
    ty: &Ty,
    span: &SourceSpan,
    reporter: &mut DiagnosticReporter,
) {
    match ty {
        Ty::Named { name, args } => {
            if let Some(def) = registry.types.get(name) {
                for (param, arg) in def.type_params.iter().zip(args.iter()) {
                    check_bounds_for(registry, arg, &param.bounds, span, reporter);
                }
            }
            for a in args {
                check_named_bounds(registry, a, span, reporter);
            }
        }
        Ty::Optional(t) | Ty::Array(t) => check_named_bounds(registry, t, span, reporter),
        Ty::Map(k, v) => {
            check_named_bounds(registry, k, span, reporter);
            check_named_bounds(registry, v, span, reporter);
        }
        Ty::Fun(params, ret) => {
            for p in params {
                check_named_bounds(registry, p, span, reporter);
            }
            check_named_bounds(registry, ret, span, reporter);
        }
        Ty::Tuple(elems) => {
            for e in elems {
                check_named_bounds(registry, e, span, reporter);
            }
        }
        _ => {}
    }
}

/// Built-in knowledge: numeric primitives satisfy nothing implicitly, but a
/// handful of operator-like traits could treat them as satisfied if a
/// program declares them. This helper recognizes the primitive names so
/// impls like `impl Printable for Int` can be targeted.
pub fn prim_ty_by_name(name: &str) -> Option<Ty> {
    Some(match name {
        "Int" => Ty::Prim(PrimTy::Int),
        "Long" => Ty::Prim(PrimTy::Long),
        "Float" => Ty::Prim(PrimTy::Float),
        "Double" => Ty::Prim(PrimTy::Double),
        "Bool" => Ty::Prim(PrimTy::Bool),
        "Char" => Ty::Prim(PrimTy::Char),
        "Byte" => Ty::Prim(PrimTy::Byte),
        "Short" => Ty::Prim(PrimTy::Short),
        "String" => Ty::Str,
        _ => return None,
    })
}
