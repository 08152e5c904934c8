//! Unification for local inference.
//!
//! A thin layer over `ena`'s union-find table. Structural unification is
//! done here (recursing into constructors); the table only tracks variable
//! bindings. Numeric widening is NOT unification — the checker applies
//! promotion rules before asking for equality.

use ena::unify::InPlaceUnificationTable;

use crate::ty::{Ty, TyVar};

/// Why two types failed to unify.
#[derive(Debug, Clone, PartialEq)]
pub enum UnifyError {
    Mismatch { expected: Ty, found: Ty },
    /// A variable occurs in the type it would be bound to.
    Occurs { var: TyVar, ty: Ty },
}

/// The inference context for one function body / one generic call site.
#[derive(Default)]
pub struct InferCtx {
    table: InPlaceUnificationTable<TyVar>,
}

impl InferCtx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> Ty {
        Ty::Var(self.table.new_key(None))
    }

    pub fn fresh_var(&mut self) -> TyVar {
        self.table.new_key(None)
    }

    /// Resolve a type shallowly: follow a variable to its binding, once.
    fn probe(&mut self, ty: &Ty) -> Ty {
        match ty {
            Ty::Var(v) => match self.table.probe_value(*v) {
                Some(bound) => self.probe(&bound),
                None => Ty::Var(self.table.find(*v)),
            },
            other => other.clone(),
        }
    }

    /// Fully substitute all bound variables in `ty`.
    pub fn resolve(&mut self, ty: &Ty) -> Ty {
        let shallow = self.probe(ty);
        match shallow {
            Ty::Named { name, args } => Ty::Named {
                name,
                args: args.iter().map(|a| self.resolve(a)).collect(),
            },
            Ty::Optional(inner) => Ty::optional(self.resolve(&inner)),
            Ty::Array(elem) => Ty::Array(Box::new(self.resolve(&elem))),
            Ty::Map(k, v) => Ty::Map(Box::new(self.resolve(&k)), Box::new(self.resolve(&v))),
            Ty::Fun(params, ret) => Ty::Fun(
                params.iter().map(|p| self.resolve(p)).collect(),
                Box::new(self.resolve(&ret)),
            ),
            Ty::Tuple(elems) => {
                Ty::Tuple(elems.iter().map(|e| self.resolve(e)).collect())
            }
            Ty::Union(a, b) => Ty::Union(
                Box::new(self.resolve(&a)),
                Box::new(self.resolve(&b)),
            ),
            Ty::Intersection(a, b) => Ty::Intersection(
                Box::new(self.resolve(&a)),
                Box::new(self.resolve(&b)),
            ),
            other => other,
        }
    }

    fn occurs(&mut self, var: TyVar, ty: &Ty) -> bool {
        let mut vars = Vec::new();
        self.resolve(ty).free_vars(&mut vars);
        vars.contains(&var)
    }

    /// Unify two types; errors report `expected`/`found` in that order.
    pub fn unify(&mut self, expected: &Ty, found: &Ty) -> Result<(), UnifyError> {
        let e = self.probe(expected);
        let f = self.probe(found);
        match (&e, &f) {
            // Errors absorb everything; Never coerces to anything.
            (Ty::Error, _) | (_, Ty::Error) => Ok(()),
            (Ty::Never, _) | (_, Ty::Never) => Ok(()),

            (Ty::Var(a), Ty::Var(b)) => {
                self.table
                    .unify_var_var(*a, *b)
                    .map_err(|_| UnifyError::Mismatch {
                        expected: e.clone(),
                        found: f.clone(),
                    })
            }
            (Ty::Var(v), other) | (other, Ty::Var(v)) => {
                if self.occurs(*v, other) {
                    return Err(UnifyError::Occurs {
                        var: *v,
                        ty: other.clone(),
                    });
                }
                self.table
                    .unify_var_value(*v, Some(other.clone()))
                    .map_err(|_| UnifyError::Mismatch {
                        expected: e.clone(),
                        found: f.clone(),
                    })
            }

            (Ty::Prim(a), Ty::Prim(b)) if a == b => Ok(()),
            // Float and Double share one representation.
            (Ty::Prim(a), Ty::Prim(b)) if a.is_floating() && b.is_floating() => Ok(()),
            (Ty::Str, Ty::Str) => Ok(()),
            (Ty::Param(a), Ty::Param(b)) if a == b => Ok(()),

            (
                Ty::Named { name: n1, args: a1 },
                Ty::Named { name: n2, args: a2 },
            ) if n1 == n2 && a1.len() == a2.len() => {
                for (x, y) in a1.iter().zip(a2.iter()) {
                    self.unify(x, y)?;
                }
                Ok(())
            }

            (Ty::Optional(a), Ty::Optional(b)) => self.unify(a, b),
            // A plain value coerces into an optional slot.
            (Ty::Optional(a), other) => self.unify(a, other),

            (Ty::Array(a), Ty::Array(b)) => self.unify(a, b),
            (Ty::Map(k1, v1), Ty::Map(k2, v2)) => {
                self.unify(k1, k2)?;
                self.unify(v1, v2)
            }
            (Ty::Fun(p1, r1), Ty::Fun(p2, r2)) if p1.len() == p2.len() => {
                for (x, y) in p1.iter().zip(p2.iter()) {
                    self.unify(x, y)?;
                }
                self.unify(r1, r2)
            }
            (Ty::Tuple(e1), Ty::Tuple(e2)) if e1.len() == e2.len() => {
                for (x, y) in e1.iter().zip(e2.iter()) {
                    self.unify(x, y)?;
                }
                Ok(())
            }

            _ => Err(UnifyError::Mismatch {
                expected: e,
                found: f,
            }),
        }
    }

    /// Unify without reporting; used for speculative checks.
    pub fn can_unify(&mut self, a: &Ty, b: &Ty) -> bool {
        let snapshot = self.table.snapshot();
        let ok = self.unify(a, b).is_ok();
        self.table.rollback_to(snapshot);
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::PrimTy;

    #[test]
    fn unifies_identical_prims() {
        let mut cx = InferCtx::new();
        assert!(cx.unify(&Ty::int(), &Ty::int()).is_ok());
        assert!(cx.unify(&Ty::int(), &Ty::bool()).is_err());
    }

    #[test]
    fn float_double_alias() {
        let mut cx = InferCtx::new();
        assert!(cx
            .unify(&Ty::Prim(PrimTy::Float), &Ty::Prim(PrimTy::Double))
            .is_ok());
    }

    #[test]
    fn var_binding_resolves() {
        let mut cx = InferCtx::new();
        let v = cx.fresh();
        cx.unify(&v, &Ty::Str).unwrap();
        assert_eq!(cx.resolve(&v), Ty::Str);
    }

    #[test]
    fn generic_args_unify_through_names() {
        let mut cx = InferCtx::new();
        let v = cx.fresh();
        let expected = Ty::Named {
            name: "Box".into(),
            args: vec![v.clone()],
        };
        let found = Ty::Named {
            name: "Box".into(),
            args: vec![Ty::int()],
        };
        cx.unify(&expected, &found).unwrap();
        assert_eq!(cx.resolve(&v), Ty::int());
    }

    #[test]
    fn occurs_check_rejects_infinite_types() {
        let mut cx = InferCtx::new();
        let v = cx.fresh();
        let arr = Ty::Array(Box::new(v.clone()));
        assert!(matches!(
            cx.unify(&v, &arr),
            Err(UnifyError::Occurs { .. })
        ));
    }

    #[test]
    fn value_coerces_into_optional() {
        let mut cx = InferCtx::new();
        assert!(cx.unify(&Ty::optional(Ty::Str), &Ty::Str).is_ok());
        assert!(cx.unify(&Ty::Str, &Ty::optional(Ty::Str)).is_err());
    }
}
