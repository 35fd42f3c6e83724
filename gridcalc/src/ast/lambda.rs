//! Lambda parameter scopes
//!
//! Each LAMBDA invocation binds its parameter names in a scope chained to
//! the scope of any enclosing lambda. A binding is either a computed operand
//! or a forward to another parameter, so lookups may have to follow a chain.
//! The chase is bounded by a visited set and a maximum depth.

use gridcalc_core::{FormulaError, Operand};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
pub enum Binding {
    Resolved(Operand),
    /// Forward to parameter `name` as seen from `scope`
    Parameter { name: String, scope: LambdaScope },
}

#[derive(Default)]
struct ScopeInner {
    bindings: RwLock<HashMap<String, Binding>>,
    parent: Option<LambdaScope>,
}

/// Shared handle to one lambda's bindings
#[derive(Clone, Default)]
pub struct LambdaScope {
    inner: Arc<ScopeInner>,
}

/// Parameter names are case-insensitive.
fn key(name: &str) -> String {
    name.to_uppercase()
}

impl LambdaScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope nested inside `self`; unbound names fall through to `self`.
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(ScopeInner { bindings: RwLock::default(), parent: Some(self.clone()) }),
        }
    }

    pub fn parent(&self) -> Option<&LambdaScope> {
        self.inner.parent.as_ref()
    }

    pub fn bind(&self, name: &str, binding: Binding) {
        match self.inner.bindings.write() {
            Ok(mut bindings) => {
                bindings.insert(key(name), binding);
            }
            Err(_) => tracing::warn!(name, "lambda scope lock poisoned; binding dropped"),
        }
    }

    /// Drop every binding made by a previous invocation
    pub fn clear(&self) {
        if let Ok(mut bindings) = self.inner.bindings.write() {
            bindings.clear();
        }
    }

    /// Binding for `name` in this scope or the nearest enclosing one
    pub fn get(&self, name: &str) -> Option<Binding> {
        let key = key(name);
        let mut scope = Some(self);
        while let Some(current) = scope {
            let found = current
                .inner
                .bindings
                .read()
                .ok()
                .and_then(|bindings| bindings.get(&key).cloned());
            if found.is_some() {
                return found;
            }
            scope = current.parent();
        }
        None
    }

    /// Follow parameter forwards until a computed operand is found.
    ///
    /// Missing bindings, cycles, and chains longer than `max_depth` all
    /// resolve to `#SPILL!`.
    pub fn resolve(&self, name: &str, max_depth: usize) -> Result<Operand, FormulaError> {
        let mut visited: HashSet<(usize, String)> = HashSet::new();
        let mut scope = self.clone();
        let mut name = key(name);

        for _ in 0..=max_depth {
            if !visited.insert((scope.id(), name.clone())) {
                tracing::debug!(parameter = %name, "cyclic lambda parameter binding");
                return Err(FormulaError::spill().with_message(format!("Cyclic binding for {}", name)));
            }
            match scope.get(&name) {
                Some(Binding::Resolved(operand)) => return Ok(operand),
                Some(Binding::Parameter { name: next, scope: next_scope }) => {
                    name = key(&next);
                    scope = next_scope;
                }
                None => {
                    tracing::debug!(parameter = %name, "unbound lambda parameter");
                    return Err(FormulaError::spill().with_message(format!("Unbound parameter {}", name)));
                }
            }
        }

        tracing::debug!(parameter = %name, max_depth, "lambda parameter chain too deep");
        Err(FormulaError::spill().with_message(format!("Parameter chain deeper than {}", max_depth)))
    }

    pub fn ptr_eq(&self, other: &LambdaScope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

impl fmt::Debug for LambdaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .inner
            .bindings
            .read()
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("LambdaScope")
            .field("bindings", &names)
            .field("nested", &self.inner.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::{ErrorType, Value};

    fn resolved(n: i64) -> Binding {
        Binding::Resolved(Operand::from(Value::number(n)))
    }

    #[test]
    fn test_direct_binding() {
        let scope = LambdaScope::new();
        scope.bind("x", resolved(1));
        assert_eq!(scope.resolve("X", 64), Ok(Operand::from(Value::number(1))));
    }

    #[test]
    fn test_chain_follows_captured_scope() {
        let outer = LambdaScope::new();
        outer.bind("a", resolved(7));
        let inner = outer.child();
        inner.bind("b", Binding::Parameter { name: "a".into(), scope: outer.clone() });
        assert_eq!(inner.resolve("b", 64), Ok(Operand::from(Value::number(7))));
    }

    #[test]
    fn test_child_falls_through_to_parent() {
        let outer = LambdaScope::new();
        outer.bind("a", resolved(3));
        let inner = outer.child();
        assert!(inner.get("a").is_some());
        assert!(inner.parent().is_some_and(|p| p.ptr_eq(&outer)));
    }

    #[test]
    fn test_chain_without_terminal_is_spill() {
        let outer = LambdaScope::new();
        let inner = outer.child();
        inner.bind("b", Binding::Parameter { name: "a".into(), scope: outer.clone() });
        let err = inner.resolve("b", 64).unwrap_err();
        assert_eq!(err.kind, ErrorType::Spill);
    }

    #[test]
    fn test_cycle_terminates_with_spill() {
        let scope = LambdaScope::new();
        scope.bind("x", Binding::Parameter { name: "y".into(), scope: scope.clone() });
        scope.bind("y", Binding::Parameter { name: "x".into(), scope: scope.clone() });
        let err = scope.resolve("x", 1_000).unwrap_err();
        assert_eq!(err.kind, ErrorType::Spill);
    }

    #[test]
    fn test_depth_bound() {
        let scopes: Vec<LambdaScope> = (0..10).map(|_| LambdaScope::new()).collect();
        for i in 0..9 {
            scopes[i].bind("p", Binding::Parameter { name: "p".into(), scope: scopes[i + 1].clone() });
        }
        scopes[9].bind("p", resolved(1));
        assert!(scopes[0].resolve("p", 64).is_ok());
        assert_eq!(scopes[0].resolve("p", 3).unwrap_err().kind, ErrorType::Spill);
    }

    #[test]
    fn test_clear() {
        let scope = LambdaScope::new();
        scope.bind("x", resolved(1));
        scope.clear();
        assert!(scope.get("x").is_none());
    }
}
