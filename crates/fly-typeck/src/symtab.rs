//! The lexical symbol table.
//!
//! A stack of scopes pushed on function/method/block/lambda entry and
//! popped on exit. Lookup walks outward. Redefinition within one scope is
//! rejected; shadowing an outer binding is only permitted for `let mut`
//! bindings — the caller turns violations into diagnostics.

use fly_common::span::SourceSpan;
use rustc_hash::FxHashMap;

use crate::ty::Ty;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Method,
    LocalVar,
    Param,
    Field,
    Type,
    Module,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Ty,
    pub span: SourceSpan,
    pub mutable: bool,
    /// Local slot assigned at codegen; `None` until then.
    pub slot: Option<u16>,
}

/// Outcome of a definition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefineOutcome {
    Ok,
    /// Same name already bound in the current scope.
    DuplicateInScope { previous: SourceSpan },
    /// Shadowed an outer binding without being a `let mut`.
    IllegalShadow { previous: SourceSpan },
}

#[derive(Debug, Default)]
struct Scope {
    symbols: FxHashMap<String, Symbol>,
}

/// The scope stack for one checking pass.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "popped the root scope");
        self.scopes.pop();
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Define a symbol in the innermost scope, applying the shadowing rule.
    pub fn define(&mut self, symbol: Symbol) -> DefineOutcome {
        let current = self.scopes.last_mut().expect("at least the root scope");
        if let Some(prev) = current.symbols.get(&symbol.name) {
            return DefineOutcome::DuplicateInScope {
                previous: prev.span.clone(),
            };
        }

        let shadowed = self.scopes[..self.scopes.len() - 1]
            .iter()
            .rev()
            .find_map(|s| s.symbols.get(&symbol.name))
            .filter(|prev| {
                matches!(prev.kind, SymbolKind::LocalVar | SymbolKind::Param)
            })
            .map(|prev| prev.span.clone());

        let outcome = match shadowed {
            Some(previous) if !symbol.mutable => DefineOutcome::IllegalShadow { previous },
            _ => DefineOutcome::Ok,
        };

        self.scopes
            .last_mut()
            .expect("at least the root scope")
            .symbols
            .insert(symbol.name.clone(), symbol);
        outcome
    }

    /// Define without shadow checking (parameters, synthetic bindings).
    pub fn define_unchecked(&mut self, symbol: Symbol) {
        self.scopes
            .last_mut()
            .expect("at least the root scope")
            .symbols
            .insert(symbol.name.clone(), symbol);
    }

    /// Lexical lookup, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.symbols.get(name))
    }

    pub fn lookup_in_current(&self, name: &str) -> Option<&Symbol> {
        self.scopes.last().and_then(|s| s.symbols.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str, mutable: bool) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::LocalVar,
            ty: Ty::int(),
            span: SourceSpan::unknown(),
            mutable,
            slot: None,
        }
    }

    #[test]
    fn lexical_lookup_walks_outward() {
        let mut t = SymbolTable::new();
        t.define(sym("x", false));
        t.push_scope();
        assert!(t.lookup("x").is_some());
        t.pop_scope();
    }

    #[test]
    fn duplicate_in_same_scope_rejected() {
        let mut t = SymbolTable::new();
        assert_eq!(t.define(sym("x", false)), DefineOutcome::Ok);
        assert!(matches!(
            t.define(sym("x", true)),
            DefineOutcome::DuplicateInScope { .. }
        ));
    }

    #[test]
    fn shadowing_requires_mut() {
        let mut t = SymbolTable::new();
        t.define(sym("x", false));
        t.push_scope();
        assert!(matches!(
            t.define(sym("x", false)),
            DefineOutcome::IllegalShadow { .. }
        ));
        t.pop_scope();

        t.push_scope();
        assert_eq!(t.define(sym("x", true)), DefineOutcome::Ok);
        t.pop_scope();
    }
}
