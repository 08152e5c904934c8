//! The semantic type representation.
//!
//! Distinct from the AST's `TypeExpr`: every `Ty` is the *meaning* of a type
//! after name resolution. Inference variables (`Ty::Var`) exist only during
//! a single checking pass and are fully substituted before results are
//! stored in the analysis side tables.

use std::fmt;

use ena::unify::{EqUnifyValue, UnifyKey};

/// Primitive value types. `Float` is 64-bit by language definition (it maps
/// to the VM's double-precision descriptor); `Double` is kept as a distinct
/// surface name with the identical representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimTy {
    Int,
    Long,
    Float,
    Double,
    Bool,
    Char,
    Byte,
    Short,
    Unit,
}

impl PrimTy {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimTy::Int | PrimTy::Long | PrimTy::Float | PrimTy::Double | PrimTy::Byte
                | PrimTy::Short
        )
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimTy::Int | PrimTy::Long | PrimTy::Byte | PrimTy::Short
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimTy::Float | PrimTy::Double)
    }

    /// True for values occupying two VM local slots.
    pub fn is_wide(self) -> bool {
        matches!(self, PrimTy::Long | PrimTy::Float | PrimTy::Double)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimTy::Int => "Int",
            PrimTy::Long => "Long",
            PrimTy::Float => "Float",
            PrimTy::Double => "Double",
            PrimTy::Bool => "Bool",
            PrimTy::Char => "Char",
            PrimTy::Byte => "Byte",
            PrimTy::Short => "Short",
            PrimTy::Unit => "Unit",
        }
    }
}

/// An inference variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyVar(pub u32);

impl UnifyKey for TyVar {
    type Value = Option<Ty>;

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        TyVar(u)
    }

    fn tag() -> &'static str {
        "TyVar"
    }
}

impl fmt::Display for TyVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Prim(PrimTy),
    /// The builtin string type (a reference type with primitive-like
    /// surface syntax).
    Str,
    /// A named nominal type — a local declaration (simple name) or a host
    /// class (dotted name) — with any generic arguments.
    Named { name: String, args: Vec<Ty> },
    Optional(Box<Ty>),
    Array(Box<Ty>),
    Map(Box<Ty>, Box<Ty>),
    Fun(Vec<Ty>, Box<Ty>),
    Tuple(Vec<Ty>),
    Union(Box<Ty>, Box<Ty>),
    Intersection(Box<Ty>, Box<Ty>),
    /// An in-scope generic type parameter.
    Param(String),
    /// An inference variable (transient).
    Var(TyVar),
    /// The type of `return`/`throw`/`break`; unifies with anything.
    Never,
    /// Produced after an error was already reported; silences cascades.
    Error,
}

impl EqUnifyValue for Ty {}

impl Ty {
    pub fn unit() -> Ty {
        Ty::Prim(PrimTy::Unit)
    }

    pub fn int() -> Ty {
        Ty::Prim(PrimTy::Int)
    }

    pub fn bool() -> Ty {
        Ty::Prim(PrimTy::Bool)
    }

    pub fn float() -> Ty {
        Ty::Prim(PrimTy::Float)
    }

    /// The runtime future type carrying `inner`.
    pub fn future(inner: Ty) -> Ty {
        Ty::Named {
            name: "fly.runtime.Future".to_string(),
            args: vec![inner],
        }
    }

    pub fn named(name: impl Into<String>) -> Ty {
        Ty::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn optional(inner: Ty) -> Ty {
        match inner {
            // `T??` collapses to `T?`.
            Ty::Optional(_) => inner,
            other => Ty::Optional(Box::new(other)),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Ty::Error)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Prim(p) if p.is_numeric())
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Ty::Optional(_))
    }

    pub fn unwrap_optional(&self) -> Ty {
        match self {
            Ty::Optional(inner) => (**inner).clone(),
            other => other.clone(),
        }
    }

    /// The `T` in `Future<T>`, if this is the runtime future type.
    pub fn future_inner(&self) -> Option<Ty> {
        match self {
            Ty::Named { name, args } if name == "fly.runtime.Future" => {
                Some(args.first().cloned().unwrap_or(Ty::unit()))
            }
            _ => None,
        }
    }

    /// Free inference variables, in first-occurrence order.
    pub fn free_vars(&self, out: &mut Vec<TyVar>) {
        match self {
            Ty::Var(v) => {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
            Ty::Named { args, .. } => {
                for a in args {
                    a.free_vars(out);
                }
            }
            Ty::Optional(t) | Ty::Array(t) => t.free_vars(out),
            Ty::Map(k, v) => {
                k.free_vars(out);
                v.free_vars(out);
            }
            Ty::Fun(params, ret) => {
                for p in params {
                    p.free_vars(out);
                }
                ret.free_vars(out);
            }
            Ty::Tuple(elems) => {
                for e in elems {
                    e.free_vars(out);
                }
            }
            Ty::Union(a, b) | Ty::Intersection(a, b) => {
                a.free_vars(out);
                b.free_vars(out);
            }
            _ => {}
        }
    }

    /// Substitute named type parameters.
    pub fn subst(&self, map: &rustc_hash::FxHashMap<String, Ty>) -> Ty {
        match self {
            Ty::Param(name) => map.get(name).cloned().unwrap_or_else(|| self.clone()),
            Ty::Named { name, args } => Ty::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.subst(map)).collect(),
            },
            Ty::Optional(t) => Ty::optional(t.subst(map)),
            Ty::Array(t) => Ty::Array(Box::new(t.subst(map))),
            Ty::Map(k, v) => Ty::Map(Box::new(k.subst(map)), Box::new(v.subst(map))),
            Ty::Fun(params, ret) => Ty::Fun(
                params.iter().map(|p| p.subst(map)).collect(),
                Box::new(ret.subst(map)),
            ),
            Ty::Tuple(elems) => Ty::Tuple(elems.iter().map(|e| e.subst(map)).collect()),
            Ty::Union(a, b) => Ty::Union(Box::new(a.subst(map)), Box::new(b.subst(map))),
            Ty::Intersection(a, b) => {
                Ty::Intersection(Box::new(a.subst(map)), Box::new(b.subst(map)))
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Prim(p) => write!(f, "{}", p.name()),
            Ty::Str => write!(f, "String"),
            Ty::Named { name, args } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Ty::Optional(inner) => write!(f, "{inner}?"),
            Ty::Array(elem) => write!(f, "[{elem}]"),
            Ty::Map(k, v) => write!(f, "[{k}: {v}]"),
            Ty::Fun(params, ret) => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Ty::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            Ty::Union(a, b) => write!(f, "{a} | {b}"),
            Ty::Intersection(a, b) => write!(f, "{a} & {b}"),
            Ty::Param(name) => write!(f, "{name}"),
            Ty::Var(v) => write!(f, "{v}"),
            Ty::Never => write!(f, "Never"),
            Ty::Error => write!(f, "<error>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_forms() {
        assert_eq!(Ty::int().to_string(), "Int");
        assert_eq!(Ty::optional(Ty::Str).to_string(), "String?");
        assert_eq!(
            Ty::Map(Box::new(Ty::Str), Box::new(Ty::int())).to_string(),
            "[String: Int]"
        );
        assert_eq!(
            Ty::Fun(vec![Ty::int()], Box::new(Ty::bool())).to_string(),
            "(Int) -> Bool"
        );
    }

    #[test]
    fn optional_collapses() {
        let t = Ty::optional(Ty::optional(Ty::int()));
        assert_eq!(t, Ty::optional(Ty::int()));
    }

    #[test]
    fn float_is_wide() {
        assert!(PrimTy::Float.is_wide());
        assert!(PrimTy::Long.is_wide());
        assert!(!PrimTy::Int.is_wide());
    }

    #[test]
    fn subst_replaces_params() {
        let mut map = rustc_hash::FxHashMap::default();
        map.insert("T".to_string(), Ty::Str);
        let t = Ty::Array(Box::new(Ty::Param("T".into())));
        assert_eq!(t.subst(&map), Ty::Array(Box::new(Ty::Str)));
    }
}
