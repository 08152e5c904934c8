//! Pattern exhaustiveness and reachability: sub-check 6 (best-effort).
//!
//! Sum types (data/enum) get per-variant coverage: every variant must be
//! matched unless a wildcard or irrefutable binding arm appears; a missing
//! set yields the `PAT001` warning naming the gaps. Primitives and open
//! class hierarchies cannot be enumerated, so they require a catch-all arm
//! (`PAT002` warning). Arms subsumed by earlier ones warn `PAT003`.
//! Guarded arms never count toward coverage and never subsume.

use fly_common::diagnostics::{Diagnostic, DiagnosticReporter, Phase};
use fly_common::span::SourceSpan;
use fly_parser::ast::{Literal, MatchArm, Pattern, PatternKind};
use rustc_hash::FxHashSet;

use crate::ty::Ty;
use crate::{Registry, TypeDefKind};

fn warn(reporter: &mut DiagnosticReporter, code: &str, message: String, span: &SourceSpan) {
    reporter.report(Diagnostic::warning(code, message, Phase::Semantic).with_span(span.clone()));
}

/// The unguarded pattern beneath any guard wrapper; `None` if guarded.
fn unguarded(pattern: &Pattern) -> Option<&Pattern> {
    match &pattern.kind {
        PatternKind::Guard { .. } => None,
        _ => Some(pattern),
    }
}

/// Variant names covered by one (unguarded) pattern.
fn covered_variants<'p>(pattern: &'p Pattern, out: &mut FxHashSet<&'p str>) {
    match &pattern.kind {
        PatternKind::TupleStruct { path, .. } | PatternKind::Struct { path, .. } => {
            if let Some(last) = path.last() {
                out.insert(last);
            }
        }
        PatternKind::Or(alts) => {
            for alt in alts {
                covered_variants(alt, out);
            }
        }
        _ => {}
    }
}

fn is_catch_all(pattern: &Pattern) -> bool {
    match &pattern.kind {
        PatternKind::Wildcard => true,
        PatternKind::Binding { ty, .. } => ty.is_none(),
        PatternKind::Or(alts) => alts.iter().any(is_catch_all),
        _ => false,
    }
}

/// Check one `match` for exhaustiveness and reachability.
pub(crate) fn check_match(
    scrutinee: &Ty,
    arms: &[MatchArm],
    registry: &Registry,
    match_span: &SourceSpan,
    reporter: &mut DiagnosticReporter,
) {
    check_exhaustiveness(scrutinee, arms, registry, match_span, reporter);
    check_reachability(arms, reporter);
}

fn check_exhaustiveness(
    scrutinee: &Ty,
    arms: &[MatchArm],
    registry: &Registry,
    match_span: &SourceSpan,
    reporter: &mut DiagnosticReporter,
) {
    if scrutinee.is_error() {
        return;
    }

    let has_catch_all = arms
        .iter()
        .filter_map(|a| unguarded(&a.pattern))
        .any(is_catch_all);
    if has_catch_all {
        return;
    }

    // Sum types: per-variant coverage.
    if let Ty::Named { name, .. } = scrutinee {
        if let Some(def) = registry.types.get(name) {
            if matches!(def.kind, TypeDefKind::Data | TypeDefKind::Enum) {
                let mut covered: FxHashSet<&str> = FxHashSet::default();
                for arm in arms {
                    if let Some(p) = unguarded(&arm.pattern) {
                        covered_variants(p, &mut covered);
                    }
                }
                let missing: Vec<&str> = def
                    .variants
                    .iter()
                    .map(|v| v.name.as_str())
                    .filter(|v| !covered.contains(v))
                    .collect();
                if !missing.is_empty() {
                    warn(
                        reporter,
                        "PAT001",
                        format!(
                            "non-exhaustive match on `{name}`: missing {}",
                            missing.join(", ")
                        ),
                        match_span,
                    );
                }
                return;
            }
        }
        // Open class hierarchy: cannot be enumerated.
        warn(
            reporter,
            "PAT002",
            format!("match on open type `{name}` needs a wildcard arm"),
            match_span,
        );
        return;
    }

    // Booleans enumerate to two literals.
    if *scrutinee == Ty::bool() {
        let mut saw_true = false;
        let mut saw_false = false;
        for arm in arms {
            if let Some(p) = unguarded(&arm.pattern) {
                collect_bool(p, &mut saw_true, &mut saw_false);
            }
        }
        if !(saw_true && saw_false) {
            warn(
                reporter,
                "PAT001",
                "non-exhaustive match on `Bool`".to_string(),
                match_span,
            );
        }
        return;
    }

    // Other primitives and open types require a catch-all.
    warn(
        reporter,
        "PAT002",
        format!("match on `{scrutinee}` needs a wildcard arm"),
        match_span,
    );
}

fn collect_bool(pattern: &Pattern, saw_true: &mut bool, saw_false: &mut bool) {
    match &pattern.kind {
        PatternKind::Literal(Literal::Bool(true)) => *saw_true = true,
        PatternKind::Literal(Literal::Bool(false)) => *saw_false = true,
        PatternKind::Or(alts) => {
            for a in alts {
                collect_bool(a, saw_true, saw_false);
            }
        }
        _ => {}
    }
}

fn check_reachability(arms: &[MatchArm], reporter: &mut DiagnosticReporter) {
    let mut catch_all_seen = false;
    let mut literal_seen: FxHashSet<String> = FxHashSet::default();
    let mut variants_seen: FxHashSet<String> = FxHashSet::default();

    for arm in arms {
        let Some(pattern) = unguarded(&arm.pattern) else {
            // Guarded arms are never unreachable by this analysis and never
            // subsume later arms.
            continue;
        };

        if catch_all_seen {
            warn(
                reporter,
                "PAT003",
                "unreachable match arm: a previous arm matches anything".to_string(),
                &arm.span,
            );
            continue;
        }

        match &pattern.kind {
            PatternKind::Literal(lit) => {
                let key = format!("{lit:?}");
                if !literal_seen.insert(key) {
                    warn(
                        reporter,
                        "PAT003",
                        "unreachable match arm: duplicate literal pattern".to_string(),
                        &arm.span,
                    );
                }
            }
            // A bare variant (no payload subpatterns, or all-catch-all
            // subpatterns) subsumes later repetitions of the same variant.
            PatternKind::TupleStruct { path, elems } => {
                if elems.iter().all(is_catch_all) || elems.is_empty() {
                    if let Some(last) = path.last() {
                        if !variants_seen.insert(last.to_string()) {
                            warn(
                                reporter,
                                "PAT003",
                                format!("unreachable match arm: `{last}` already matched"),
                                &arm.span,
                            );
                        }
                    }
                }
            }
            _ => {}
        }

        if is_catch_all(pattern) {
            catch_all_seen = true;
        }
    }
}
