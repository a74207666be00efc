//! Named scope registry.
//!
//! Maps user-chosen names to view-models so property paths can address
//! shared scopes independent of DOM nesting. One registry per engine
//! instance; nothing here is process-global.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::chars;
use crate::error::BindingError;
use crate::vm::Vm;

pub struct ScopeRegistry {
    scopes: RefCell<HashMap<String, Vm>>,
}

impl ScopeRegistry {
    pub fn new() -> Self {
        ScopeRegistry {
            scopes: RefCell::new(HashMap::new()),
        }
    }

    /// Register `vm` under `name`. Re-registering a name replaces the
    /// previous entry.
    pub fn register(&self, name: &str, vm: &Vm) -> Result<(), BindingError> {
        if !is_valid_scope_name(name) {
            return Err(BindingError::InvalidScopeName(name.to_string()));
        }
        self.scopes
            .borrow_mut()
            .insert(name.to_string(), vm.clone());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Vm> {
        self.scopes.borrow().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scopes.borrow().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.scopes.borrow().keys().cloned().collect()
    }
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        ScopeRegistry::new()
    }
}

fn is_valid_scope_name(name: &str) -> bool {
    let mut chars_iter = name.chars();
    match chars_iter.next() {
        Some(first) if chars::is_identifier_start(first) => {}
        _ => return false,
    }
    // `this` and `super` are path keywords and cannot name scopes.
    name != "this" && name != "super" && chars_iter.all(chars::is_identifier_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_names() {
        let registry = ScopeRegistry::new();
        let vm = Vm::new();
        assert!(registry.register("", &vm).is_err());
        assert!(registry.register("1abc", &vm).is_err());
        assert!(registry.register("a.b", &vm).is_err());
        assert!(registry.register("this", &vm).is_err());
        assert!(registry.register("super", &vm).is_err());
    }

    #[test]
    fn registers_and_resolves() {
        let registry = ScopeRegistry::new();
        let vm = Vm::new();
        registry.register("appScope", &vm).unwrap();
        assert!(registry.contains("appScope"));
        assert!(registry.get("appScope").unwrap().ptr_eq(&vm));
    }
}
