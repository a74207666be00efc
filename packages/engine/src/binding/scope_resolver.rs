//! Scope-chain resolution of property paths.
//!
//! Walks a dot-separated path against the current view-model, the named
//! scope registry and the parent scope (`super`). Every descent through a
//! member records an `(object, property)` pair into the dependency tree, so
//! the engine can re-resolve the binding when an intermediate value is
//! replaced. A missing final property is retryable (`Ok(None)`); a missing
//! intermediate segment name is a configuration error.

use smallvec::SmallVec;

use super::scope_registry::ScopeRegistry;
use crate::error::BindingError;
use crate::expression_parser::PropertyPath;
use crate::vm::{Value, Vm};

/// `(object, property)` pairs traversed while resolving a path.
pub type DependencyTree = SmallVec<[(Vm, String); 4]>;

#[derive(Debug, Clone)]
pub struct ResolvedPath {
    /// The object the final property lives on.
    pub scope: Vm,
    /// The final property name, or `"this"` for the scope itself.
    pub property_name: String,
    /// Whether the path entered through a named scope.
    pub is_absolute: bool,
    pub dependencies: DependencyTree,
}

impl ResolvedPath {
    /// Whether the resolution is independent of per-instance state: no
    /// dependency pairs and either relative to `vm` itself or absolute.
    pub fn is_cacheable_for(&self, vm: &Vm) -> bool {
        self.dependencies.is_empty() && (self.is_absolute || self.scope.ptr_eq(vm))
    }
}

pub fn resolve_path(
    registry: &ScopeRegistry,
    scope: &Vm,
    parent: Option<&Vm>,
    path: &PropertyPath,
) -> Result<Option<ResolvedPath>, BindingError> {
    let mut current = scope.clone();
    let mut parent = parent.cloned();
    let mut is_absolute = false;
    let mut dependencies = DependencyTree::new();

    let (last, intermediate) = path
        .segments
        .split_last()
        .expect("the expression parser never produces an empty path");

    for (position, segment) in intermediate.iter().enumerate() {
        if let Some(named) = registry.get(segment) {
            current = named;
            parent = None;
            is_absolute = true;
            continue;
        }
        if segment == "super" {
            match parent.take() {
                Some(outer) => {
                    current = outer;
                    continue;
                }
                None => {
                    return Err(BindingError::UnresolvableScope {
                        path: path.to_string(),
                        segment: segment.clone(),
                    })
                }
            }
        }
        if !current.has(segment) {
            // The segment name itself is wrong; no later change fixes it.
            // A leading segment was most likely meant as a scope name.
            if position == 0 {
                return Err(BindingError::UndefinedScope(segment.clone()));
            }
            return Err(BindingError::UnresolvableScope {
                path: path.to_string(),
                segment: segment.clone(),
            });
        }
        dependencies.push((current.clone(), segment.clone()));
        match current.get(segment) {
            Some(Value::Object(vm)) => current = vm,
            // The member exists but holds no object yet; retry when it does.
            _ => return Ok(None),
        }
    }

    if last == "this" {
        return Ok(Some(ResolvedPath {
            scope: current,
            property_name: "this".to_string(),
            is_absolute,
            dependencies,
        }));
    }

    // A bare `super` path binds the parent scope itself.
    if last == "super" && intermediate.is_empty() {
        let Some(outer) = parent else {
            return Err(BindingError::UnresolvableScope {
                path: path.to_string(),
                segment: last.clone(),
            });
        };
        return Ok(Some(ResolvedPath {
            scope: outer,
            property_name: "this".to_string(),
            is_absolute,
            dependencies,
        }));
    }

    if !current.has(last) {
        // Retryable: a future write to an intermediate observable may
        // create the property.
        return Ok(None);
    }

    Ok(Some(ResolvedPath {
        scope: current,
        property_name: last.clone(),
        is_absolute,
        dependencies,
    }))
}
