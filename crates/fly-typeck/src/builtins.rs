//! Builtin member signatures and descriptor parsing.
//!
//! The surface types `String`, `[T]`, and `[K: V]` carry a small method
//! surface provided by the runtime; the checker consults this module before
//! registries and the host environment. Host-class members arrive as VM
//! descriptors and are parsed back into `Ty` here.

use crate::ty::{PrimTy, Ty};
use crate::unify::InferCtx;

/// A builtin method: parameter types and result.
#[derive(Debug, Clone)]
pub struct BuiltinMethod {
    pub params: Vec<Ty>,
    pub ret: Ty,
}

fn m(params: Vec<Ty>, ret: Ty) -> Option<BuiltinMethod> {
    Some(BuiltinMethod { params, ret })
}

/// Look up a builtin method on `recv`. Fresh inference variables are drawn
/// from `infer` where a signature is generic in its result.
pub fn method(recv: &Ty, name: &str, infer: &mut InferCtx) -> Option<BuiltinMethod> {
    match recv {
        Ty::Str => string_method(name),
        Ty::Array(elem) => array_method(elem, name, infer),
        Ty::Map(k, v) => map_method(k, v, name),
        Ty::Named { name: tyname, args } if tyname == "fly.runtime.Range" => {
            let _ = args;
            range_method(name)
        }
        // `toString` exists on every reference and boxed value.
        _ if name == "toString" => m(vec![], Ty::Str),
        _ => None,
    }
}

fn string_method(name: &str) -> Option<BuiltinMethod> {
    match name {
        "length" => m(vec![], Ty::int()),
        "isEmpty" => m(vec![], Ty::bool()),
        "charAt" => m(vec![Ty::int()], Ty::Prim(PrimTy::Char)),
        "substring" => m(vec![Ty::int(), Ty::int()], Ty::Str),
        "contains" => m(vec![Ty::Str], Ty::bool()),
        "startsWith" => m(vec![Ty::Str], Ty::bool()),
        "endsWith" => m(vec![Ty::Str], Ty::bool()),
        "indexOf" => m(vec![Ty::Str], Ty::int()),
        "toUpperCase" => m(vec![], Ty::Str),
        "toLowerCase" => m(vec![], Ty::Str),
        "trim" => m(vec![], Ty::Str),
        "replace" => m(vec![Ty::Str, Ty::Str], Ty::Str),
        "split" => m(vec![Ty::Str], Ty::Array(Box::new(Ty::Str))),
        "toString" => m(vec![], Ty::Str),
        _ => None,
    }
}

fn array_method(elem: &Ty, name: &str, infer: &mut InferCtx) -> Option<BuiltinMethod> {
    let e = elem.clone();
    match name {
        "size" | "length" => m(vec![], Ty::int()),
        "isEmpty" => m(vec![], Ty::bool()),
        "get" => m(vec![Ty::int()], e),
        "contains" => m(vec![e], Ty::bool()),
        "indexOf" => m(vec![e], Ty::int()),
        "first" | "last" => m(vec![], Ty::optional(e)),
        "map" => {
            let out = infer.fresh();
            m(
                vec![Ty::Fun(vec![e], Box::new(out.clone()))],
                Ty::Array(Box::new(out)),
            )
        }
        "filter" => m(
            vec![Ty::Fun(vec![e.clone()], Box::new(Ty::bool()))],
            Ty::Array(Box::new(e)),
        ),
        "forEach" => m(
            vec![Ty::Fun(vec![e], Box::new(Ty::unit()))],
            Ty::unit(),
        ),
        "join" => m(vec![Ty::Str], Ty::Str),
        "toString" => m(vec![], Ty::Str),
        _ => None,
    }
}

fn map_method(k: &Ty, v: &Ty, name: &str) -> Option<BuiltinMethod> {
    match name {
        "size" => m(vec![], Ty::int()),
        "isEmpty" => m(vec![], Ty::bool()),
        "containsKey" => m(vec![k.clone()], Ty::bool()),
        "get" => m(vec![k.clone()], Ty::optional(v.clone())),
        "put" => m(vec![k.clone(), v.clone()], Ty::unit()),
        "remove" => m(vec![k.clone()], Ty::optional(v.clone())),
        "keys" => m(vec![], Ty::Array(Box::new(k.clone()))),
        "values" => m(vec![], Ty::Array(Box::new(v.clone()))),
        "toString" => m(vec![], Ty::Str),
        _ => None,
    }
}

fn range_method(name: &str) -> Option<BuiltinMethod> {
    match name {
        "contains" => m(vec![Ty::int()], Ty::bool()),
        "toString" => m(vec![], Ty::Str),
        _ => None,
    }
}

/// Builtin free functions. `println`/`print` accept a single value of any
/// type; `panic` never returns.
pub fn global_function(name: &str, infer: &mut InferCtx) -> Option<BuiltinMethod> {
    match name {
        "println" | "print" => {
            let any = infer.fresh();
            m(vec![any], Ty::unit())
        }
        "panic" => m(vec![Ty::Str], Ty::Never),
        "sleep" => m(vec![Ty::Prim(PrimTy::Long)], Ty::unit()),
        _ => None,
    }
}

/// Parse a VM descriptor back into a semantic type.
///
/// `Float` and `Double` share descriptor `D`; parsing yields `Double` (they
/// unify).
pub fn ty_from_descriptor(desc: &str) -> Ty {
    let mut chars = desc.chars();
    parse_desc(&mut chars).unwrap_or(Ty::Error)
}

fn parse_desc(chars: &mut std::str::Chars<'_>) -> Option<Ty> {
    Some(match chars.next()? {
        'I' => Ty::Prim(PrimTy::Int),
        'J' => Ty::Prim(PrimTy::Long),
        'F' => Ty::Prim(PrimTy::Float),
        'D' => Ty::Prim(PrimTy::Double),
        'Z' => Ty::Prim(PrimTy::Bool),
        'C' => Ty::Prim(PrimTy::Char),
        'B' => Ty::Prim(PrimTy::Byte),
        'S' => Ty::Prim(PrimTy::Short),
        'V' => Ty::Prim(PrimTy::Unit),
        '[' => Ty::Array(Box::new(parse_desc(chars)?)),
        'L' => {
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == ';' {
                    break;
                }
                name.push(c);
            }
            if name == "java/lang/String" {
                Ty::Str
            } else {
                Ty::Named {
                    name: name.replace(['/', '$'], "."),
                    args: Vec::new(),
                }
            }
        }
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_members() {
        let mut cx = InferCtx::new();
        let len = method(&Ty::Str, "length", &mut cx).unwrap();
        assert_eq!(len.ret, Ty::int());
        let split = method(&Ty::Str, "split", &mut cx).unwrap();
        assert_eq!(split.ret, Ty::Array(Box::new(Ty::Str)));
        assert!(method(&Ty::Str, "quack", &mut cx).is_none());
    }

    #[test]
    fn array_map_introduces_fresh_result() {
        let mut cx = InferCtx::new();
        let arr = Ty::Array(Box::new(Ty::int()));
        let map = method(&arr, "map", &mut cx).unwrap();
        let Ty::Fun(params, _) = &map.params[0] else {
            panic!("map takes a function");
        };
        assert_eq!(params[0], Ty::int());
    }

    #[test]
    fn descriptor_round_trip() {
        assert_eq!(ty_from_descriptor("I"), Ty::int());
        assert_eq!(ty_from_descriptor("D"), Ty::Prim(PrimTy::Double));
        assert_eq!(ty_from_descriptor("Ljava/lang/String;"), Ty::Str);
        assert_eq!(
            ty_from_descriptor("[I"),
            Ty::Array(Box::new(Ty::int()))
        );
        assert_eq!(
            ty_from_descriptor("Lfly/runtime/Future;"),
            Ty::named("fly.runtime.Future")
        );
    }
}
