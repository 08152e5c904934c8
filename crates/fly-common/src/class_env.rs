//! The class-resolution capability injected into the compiler core.
//!
//! The type resolver and code generator never embed knowledge of a specific
//! class ecosystem; callers provide a [`ClassEnvironment`] that can answer
//! "what members does this class declare?" for dotted class paths.

use rustc_hash::FxHashMap;

/// A method declared by a host-VM class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: String,
    /// VM descriptors of the parameters, in order.
    pub param_descriptors: Vec<String>,
    pub return_descriptor: String,
    pub is_static: bool,
}

impl MethodInfo {
    /// The combined VM method descriptor, e.g. `(ILjava/lang/String;)V`.
    pub fn descriptor(&self) -> String {
        let mut d = String::from("(");
        for p in &self.param_descriptors {
            d.push_str(p);
        }
        d.push(')');
        d.push_str(&self.return_descriptor);
        d
    }
}

/// A field declared by a host-VM class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub descriptor: String,
    pub is_static: bool,
}

/// Everything the compiler needs to know about a host-VM class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    /// Dotted class name, e.g. `fly.runtime.Future`.
    pub name: String,
    /// Dotted superclass name; `None` only for the root object type.
    pub superclass: Option<String>,
    /// Dotted names of implemented interfaces.
    pub interfaces: Vec<String>,
    pub methods: Vec<MethodInfo>,
    pub fields: Vec<FieldInfo>,
    pub is_interface: bool,
}

impl ClassInfo {
    /// All declared methods with the given name.
    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodInfo> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The single-operation capability backing reflective class lookup.
pub trait ClassEnvironment {
    /// Resolve a dotted class path (`a.b.C`) against the host VM's class
    /// ecosystem. Returns `None` when no such class exists.
    fn lookup(&self, dotted_path: &str) -> Option<ClassInfo>;
}

/// An in-memory environment backed by a map; used by tests and by drivers
/// that preload a fixed class set.
#[derive(Debug, Default)]
pub struct MapClassEnvironment {
    classes: FxHashMap<String, ClassInfo>,
}

impl MapClassEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassEnvironment for MapClassEnvironment {
    fn lookup(&self, dotted_path: &str) -> Option<ClassInfo> {
        self.classes.get(dotted_path).cloned()
    }
}

/// The empty environment: every lookup misses.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyClassEnvironment;

impl ClassEnvironment for EmptyClassEnvironment {
    fn lookup(&self, _dotted_path: &str) -> Option<ClassInfo> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_descriptor_concatenation() {
        let m = MethodInfo {
            name: "put".into(),
            param_descriptors: vec!["I".into(), "Ljava/lang/String;".into()],
            return_descriptor: "V".into(),
            is_static: false,
        };
        assert_eq!(m.descriptor(), "(ILjava/lang/String;)V");
    }

    #[test]
    fn map_environment_lookup() {
        let mut env = MapClassEnvironment::new();
        env.insert(ClassInfo {
            name: "fly.runtime.Future".into(),
            superclass: Some("java.lang.Object".into()),
            interfaces: vec![],
            methods: vec![],
            fields: vec![],
            is_interface: false,
        });
        assert!(env.lookup("fly.runtime.Future").is_some());
        assert!(env.lookup("fly.runtime.Missing").is_none());
    }
}
