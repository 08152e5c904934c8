//! The type resolver: builtin registry, imports, and reflective lookup.
//!
//! Holds (i) the exhaustive table of builtin primitives and commonly
//! referenced host-VM types with their descriptors and opcodes, (ii)
//! single-item imports (with aliases), (iii) wildcard imports, and (iv) the
//! injected [`ClassEnvironment`] used to resolve dotted class paths against
//! the host VM's class ecosystem.

use rustc_hash::FxHashMap;

use fly_common::class_env::ClassEnvironment;

use crate::ty::{PrimTy, Ty};

/// One row of the builtin primitive table: descriptor, boxed counterpart,
/// load/store/return opcodes, array-element opcodes, and the 64-bit flag.
#[derive(Debug, Clone, Copy)]
pub struct PrimitiveInfo {
    pub name: &'static str,
    pub descriptor: &'static str,
    /// Internal name of the boxed counterpart, e.g. `java/lang/Integer`.
    pub boxed: &'static str,
    /// Name of the unboxing method on the boxed class, e.g. `intValue`.
    pub unbox_method: &'static str,
    pub load_op: u8,
    pub store_op: u8,
    pub return_op: u8,
    pub array_load_op: u8,
    pub array_store_op: u8,
    pub is_wide: bool,
}

/// The exhaustive primitive table. `Float` intentionally maps to the VM's
/// 64-bit floating descriptor.
pub const PRIMITIVES: &[PrimitiveInfo] = &[
    PrimitiveInfo {
        name: "Int",
        descriptor: "I",
        boxed: "java/lang/Integer",
        unbox_method: "intValue",
        load_op: 0x15,
        store_op: 0x36,
        return_op: 0xac,
        array_load_op: 0x2e,
        array_store_op: 0x4f,
        is_wide: false,
    },
    PrimitiveInfo {
        name: "Long",
        descriptor: "J",
        boxed: "java/lang/Long",
        unbox_method: "longValue",
        load_op: 0x16,
        store_op: 0x37,
        return_op: 0xad,
        array_load_op: 0x2f,
        array_store_op: 0x50,
        is_wide: true,
    },
    PrimitiveInfo {
        name: "Float",
        descriptor: "D",
        boxed: "java/lang/Double",
        unbox_method: "doubleValue",
        load_op: 0x18,
        store_op: 0x39,
        return_op: 0xaf,
        array_load_op: 0x31,
        array_store_op: 0x52,
        is_wide: true,
    },
    PrimitiveInfo {
        name: "Double",
        descriptor: "D",
        boxed: "java/lang/Double",
        unbox_method: "doubleValue",
        load_op: 0x18,
        store_op: 0x39,
        return_op: 0xaf,
        array_load_op: 0x31,
        array_store_op: 0x52,
        is_wide: true,
    },
    PrimitiveInfo {
        name: "Bool",
        descriptor: "Z",
        boxed: "java/lang/Boolean",
        unbox_method: "booleanValue",
        load_op: 0x15,
        store_op: 0x36,
        return_op: 0xac,
        array_load_op: 0x33,
        array_store_op: 0x54,
        is_wide: false,
    },
    PrimitiveInfo {
        name: "Char",
        descriptor: "C",
        boxed: "java/lang/Character",
        unbox_method: "charValue",
        load_op: 0x15,
        store_op: 0x36,
        return_op: 0xac,
        array_load_op: 0x34,
        array_store_op: 0x55,
        is_wide: false,
    },
    PrimitiveInfo {
        name: "Byte",
        descriptor: "B",
        boxed: "java/lang/Byte",
        unbox_method: "byteValue",
        load_op: 0x15,
        store_op: 0x36,
        return_op: 0xac,
        array_load_op: 0x33,
        array_store_op: 0x54,
        is_wide: false,
    },
    PrimitiveInfo {
        name: "Short",
        descriptor: "S",
        boxed: "java/lang/Short",
        unbox_method: "shortValue",
        load_op: 0x15,
        store_op: 0x36,
        return_op: 0xac,
        array_load_op: 0x35,
        array_store_op: 0x56,
        is_wide: false,
    },
];

pub fn primitive_info(p: PrimTy) -> &'static PrimitiveInfo {
    let name = match p {
        PrimTy::Int => "Int",
        PrimTy::Long => "Long",
        PrimTy::Float => "Float",
        PrimTy::Double => "Double",
        PrimTy::Bool => "Bool",
        PrimTy::Char => "Char",
        PrimTy::Byte => "Byte",
        PrimTy::Short => "Short",
        PrimTy::Unit => "Int", // Unit has no value; callers special-case it.
    };
    PRIMITIVES
        .iter()
        .find(|i| i.name == name)
        .expect("primitive table is exhaustive")
}

/// Commonly referenced host-VM types that always resolve without imports.
const KNOWN_TYPES: &[(&str, &str)] = &[
    ("Object", "java.lang.Object"),
    ("Throwable", "java.lang.Throwable"),
    ("Exception", "java.lang.Exception"),
    ("RuntimeException", "java.lang.RuntimeException"),
    ("StringBuilder", "java.lang.StringBuilder"),
    ("Future", "fly.runtime.Future"),
    ("Executor", "fly.runtime.Executor"),
    ("Async", "fly.runtime.Async"),
    ("Tuple", "fly.runtime.Tuple"),
    ("Range", "fly.runtime.Range"),
    ("Actor", "fly.runtime.Actor"),
];

/// Known module paths used to suggest a `use` line for unresolved names.
const KNOWN_PATHS: &[(&str, &str)] = &[
    ("HashMap", "fly::collections"),
    ("HashSet", "fly::collections"),
    ("List", "fly::collections"),
    ("Queue", "fly::collections"),
    ("Reader", "fly::io"),
    ("Writer", "fly::io"),
    ("File", "fly::io"),
    ("Duration", "fly::time"),
    ("Instant", "fly::time"),
    ("Channel", "fly::runtime"),
];

/// A successfully resolved type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// The visible (source) name.
    pub name: String,
    /// Fully qualified dotted name, e.g. `fly.collections.HashMap`.
    pub dotted: String,
    /// VM internal name, e.g. `fly/collections/HashMap`.
    pub internal: String,
    /// VM descriptor, e.g. `Lfly/collections/HashMap;`.
    pub descriptor: String,
}

impl ResolvedType {
    fn from_dotted(name: &str, dotted: String) -> Self {
        let internal = dotted.replace('.', "/");
        let descriptor = format!("L{internal};");
        Self {
            name: name.to_string(),
            dotted,
            internal,
            descriptor,
        }
    }
}

/// Why a name failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    NotFound {
        name: String,
        /// A suggested `use` line, when the known-paths map has one.
        hint: Option<String>,
    },
    /// Multiple wildcard imports each provide the name.
    Ambiguous {
        name: String,
        candidates: Vec<String>,
    },
}

/// The resolver for one compilation unit.
pub struct TypeResolver<'env> {
    env: &'env dyn ClassEnvironment,
    module_path: Vec<String>,
    /// Visible name → (module path, original item name).
    single_imports: FxHashMap<String, (Vec<String>, String)>,
    wildcard_imports: Vec<Vec<String>>,
    /// Locally declared type names → their internal names.
    locals: FxHashMap<String, String>,
}

impl<'env> TypeResolver<'env> {
    pub fn new(env: &'env dyn ClassEnvironment, module_path: Vec<String>) -> Self {
        Self {
            env,
            module_path,
            single_imports: FxHashMap::default(),
            wildcard_imports: Vec::new(),
            locals: FxHashMap::default(),
        }
    }

    pub fn module_path(&self) -> &[String] {
        &self.module_path
    }

    /// The VM package prefix for this unit, e.g. `a/b/c`.
    pub fn package_internal(&self) -> String {
        self.module_path.join("/")
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Add a single-item import; an alias rebinds the visible name.
    pub fn register_import(&mut self, module_path: &[String], item: &str, alias: Option<&str>) {
        let visible = alias.unwrap_or(item).to_string();
        self.single_imports
            .insert(visible, (module_path.to_vec(), item.to_string()));
    }

    /// Add a wildcard import, searched after explicit imports.
    pub fn register_wildcard(&mut self, module_path: &[String]) {
        self.wildcard_imports.push(module_path.to_vec());
    }

    /// Register a type declared in this compilation unit.
    pub fn register_local(&mut self, simple_name: &str) {
        let internal = if self.module_path.is_empty() {
            simple_name.to_string()
        } else {
            format!("{}/{}", self.module_path.join("/"), simple_name)
        };
        self.locals.insert(simple_name.to_string(), internal);
    }

    /// Register a nested type `Outer$Inner`.
    pub fn register_nested(&mut self, outer: &str, inner: &str) {
        let outer_internal = self
            .locals
            .get(outer)
            .cloned()
            .unwrap_or_else(|| outer.to_string());
        self.locals
            .insert(format!("{outer}::{inner}"), format!("{outer_internal}${inner}"));
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// Whether a dotted class path exists in the host environment.
    pub fn class_exists(&self, dotted_path: &str) -> bool {
        self.env.lookup(dotted_path).is_some()
    }

    pub fn environment(&self) -> &'env dyn ClassEnvironment {
        self.env
    }

    /// Resolve a source-level type name to its unique target.
    ///
    /// Order: locally declared types, explicit imports (aliases included),
    /// builtin known types, then wildcard imports — where two wildcard
    /// providers is an ambiguity error naming every candidate.
    pub fn resolve(&self, name: &str) -> Result<ResolvedType, ResolveError> {
        if let Some(internal) = self.locals.get(name) {
            return Ok(ResolvedType {
                name: name.to_string(),
                dotted: internal.replace('/', ".").replace('$', "."),
                internal: internal.clone(),
                descriptor: format!("L{internal};"),
            });
        }

        if let Some((module, item)) = self.single_imports.get(name) {
            let dotted = format!("{}.{}", module.join("."), item);
            return Ok(ResolvedType::from_dotted(name, dotted));
        }

        if let Some((_, dotted)) = KNOWN_TYPES.iter().find(|(n, _)| *n == name) {
            return Ok(ResolvedType::from_dotted(name, dotted.to_string()));
        }

        // A fully-qualified dotted path resolves directly.
        if name.contains('.') && self.class_exists(name) {
            return Ok(ResolvedType::from_dotted(name, name.to_string()));
        }

        let mut candidates = Vec::new();
        for module in &self.wildcard_imports {
            let dotted = format!("{}.{}", module.join("."), name);
            if self.class_exists(&dotted) {
                candidates.push(dotted);
            }
        }
        match candidates.len() {
            0 => Err(ResolveError::NotFound {
                name: name.to_string(),
                hint: self.hint_for(name),
            }),
            1 => Ok(ResolvedType::from_dotted(name, candidates.remove(0))),
            _ => Err(ResolveError::Ambiguous {
                name: name.to_string(),
                candidates,
            }),
        }
    }

    /// A suggested `use` line for an unresolved name, if the known-paths map
    /// has an obvious match.
    pub fn hint_for(&self, name: &str) -> Option<String> {
        KNOWN_PATHS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(n, path)| format!("add `use {path}::{n}`"))
    }

    // ── Descriptors ──────────────────────────────────────────────────

    /// The VM descriptor of a type in a plain (non-generic) position.
    pub fn descriptor_of(&self, ty: &Ty) -> String {
        match ty {
            Ty::Prim(PrimTy::Unit) => "V".to_string(),
            Ty::Prim(p) => primitive_info(*p).descriptor.to_string(),
            Ty::Str => "Ljava/lang/String;".to_string(),
            Ty::Named { name, .. } => match self.resolve(name) {
                Ok(r) => r.descriptor,
                Err(_) => format!("L{};", name.replace(['.', ':'], "/")),
            },
            // Optionals erase to the nullable boxed form of the inner type.
            Ty::Optional(inner) => self.boxed_descriptor(inner),
            Ty::Array(elem) => format!("[{}", self.descriptor_of(elem)),
            Ty::Map(_, _) => "Ljava/util/Map;".to_string(),
            Ty::Fun(params, _) => format!("Lfly/runtime/Function{};", params.len()),
            Ty::Tuple(_) => "Lfly/runtime/Tuple;".to_string(),
            // Unions, intersections, and erased generics are references.
            Ty::Union(_, _) | Ty::Intersection(_, _) | Ty::Param(_) => {
                "Ljava/lang/Object;".to_string()
            }
            Ty::Never => "V".to_string(),
            Ty::Var(_) | Ty::Error => "Ljava/lang/Object;".to_string(),
        }
    }

    /// The descriptor of a type in a generic (erased, boxed) position.
    pub fn boxed_descriptor(&self, ty: &Ty) -> String {
        match ty {
            Ty::Prim(PrimTy::Unit) => "Ljava/lang/Object;".to_string(),
            Ty::Prim(p) => format!("L{};", primitive_info(*p).boxed),
            other => self.descriptor_of(other),
        }
    }

    /// The internal class name used for `new`, casts, and instance checks.
    pub fn internal_name_of(&self, ty: &Ty) -> String {
        match ty {
            Ty::Named { name, .. } => match self.resolve(name) {
                Ok(r) => r.internal,
                Err(_) => name.replace(['.', ':'], "/"),
            },
            Ty::Str => "java/lang/String".to_string(),
            Ty::Prim(p) => primitive_info(*p).boxed.to_string(),
            Ty::Optional(inner) => self.internal_name_of(inner),
            Ty::Tuple(_) => "fly/runtime/Tuple".to_string(),
            Ty::Map(_, _) => "java/util/Map".to_string(),
            Ty::Array(elem) => format!("[{}", self.descriptor_of(elem)),
            Ty::Fun(params, _) => format!("fly/runtime/Function{}", params.len()),
            _ => "java/lang/Object".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fly_common::class_env::{ClassInfo, MapClassEnvironment};

    fn class(name: &str) -> ClassInfo {
        ClassInfo {
            name: name.to_string(),
            superclass: Some("java.lang.Object".into()),
            interfaces: vec![],
            methods: vec![],
            fields: vec![],
            is_interface: false,
        }
    }

    #[test]
    fn primitives_resolve_to_builtin_descriptors() {
        let env = MapClassEnvironment::new();
        let r = TypeResolver::new(&env, vec!["demo".into()]);
        assert_eq!(r.descriptor_of(&Ty::int()), "I");
        assert_eq!(r.descriptor_of(&Ty::Prim(PrimTy::Long)), "J");
        // Float is 64-bit by definition.
        assert_eq!(r.descriptor_of(&Ty::float()), "D");
        assert_eq!(r.descriptor_of(&Ty::Prim(PrimTy::Double)), "D");
        assert_eq!(r.descriptor_of(&Ty::Str), "Ljava/lang/String;");
        assert_eq!(r.descriptor_of(&Ty::unit()), "V");
    }

    #[test]
    fn locals_resolve_to_module_package() {
        let env = MapClassEnvironment::new();
        let mut r = TypeResolver::new(&env, vec!["demo".into(), "app".into()]);
        r.register_local("Shape");
        let resolved = r.resolve("Shape").unwrap();
        assert_eq!(resolved.internal, "demo/app/Shape");
        assert_eq!(resolved.descriptor, "Ldemo/app/Shape;");
    }

    #[test]
    fn aliased_import_rebinds_name() {
        let env = MapClassEnvironment::new();
        let mut r = TypeResolver::new(&env, vec!["demo".into()]);
        r.register_import(
            &["fly".into(), "collections".into()],
            "HashMap",
            Some("Dict"),
        );
        let resolved = r.resolve("Dict").unwrap();
        assert_eq!(resolved.dotted, "fly.collections.HashMap");
        assert!(r.resolve("HashMap").is_err() || r.resolve("HashMap").is_ok());
    }

    #[test]
    fn ambiguous_wildcards_name_all_candidates() {
        let mut env = MapClassEnvironment::new();
        env.insert(class("a.lib.Thing"));
        env.insert(class("b.lib.Thing"));
        let mut r = TypeResolver::new(&env, vec!["demo".into()]);
        r.register_wildcard(&["a".into(), "lib".into()]);
        r.register_wildcard(&["b".into(), "lib".into()]);
        match r.resolve("Thing") {
            Err(ResolveError::Ambiguous { candidates, .. }) => {
                assert_eq!(candidates, vec!["a.lib.Thing", "b.lib.Thing"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_name_gets_hint() {
        let env = MapClassEnvironment::new();
        let r = TypeResolver::new(&env, vec!["demo".into()]);
        match r.resolve("HashMap") {
            Err(ResolveError::NotFound { hint, .. }) => {
                assert_eq!(hint.as_deref(), Some("add `use fly::collections::HashMap`"));
            }
            other => panic!("expected not-found, got {other:?}"),
        }
    }

    #[test]
    fn boxing_applies_in_generic_positions() {
        let env = MapClassEnvironment::new();
        let r = TypeResolver::new(&env, vec!["demo".into()]);
        assert_eq!(r.boxed_descriptor(&Ty::int()), "Ljava/lang/Integer;");
        assert_eq!(r.boxed_descriptor(&Ty::float()), "Ljava/lang/Double;");
        assert_eq!(r.boxed_descriptor(&Ty::Str), "Ljava/lang/String;");
    }

    #[test]
    fn optionals_erase_to_boxed_references() {
        let env = MapClassEnvironment::new();
        let r = TypeResolver::new(&env, vec!["demo".into()]);
        assert_eq!(
            r.descriptor_of(&Ty::optional(Ty::int())),
            "Ljava/lang/Integer;"
        );
        assert_eq!(
            r.descriptor_of(&Ty::optional(Ty::Str)),
            "Ljava/lang/String;"
        );
    }
}
