//! Tests for scope-chain resolution: named scopes, `super`, dependency
//! recording and the retryable/fatal split.

#[cfg(test)]
mod tests {
    use imagine_engine::binding::{resolve_path, ScopeRegistry};
    use imagine_engine::expression_parser::PropertyPath;
    use imagine_engine::{BindingError, Value, Vm};

    fn path(text: &str) -> PropertyPath {
        PropertyPath::new(text.split('.').map(|s| s.to_string()).collect())
    }

    fn registry() -> ScopeRegistry {
        ScopeRegistry::new()
    }

    #[test]
    fn resolves_direct_property() {
        let vm = Vm::new();
        vm.define_observable("title", Value::str("hi"));

        let resolved = resolve_path(&registry(), &vm, None, &path("title"))
            .unwrap()
            .unwrap();
        assert!(resolved.scope.ptr_eq(&vm));
        assert_eq!(resolved.property_name, "title");
        assert!(!resolved.is_absolute);
        assert!(resolved.dependencies.is_empty());
        assert!(resolved.is_cacheable_for(&vm));
    }

    #[test]
    fn nested_path_records_dependencies() {
        let vm = Vm::new();
        let user = Vm::new();
        user.define_observable("name", Value::str("Ada"));
        vm.define_observable("user", Value::Object(user.clone()));

        let resolved = resolve_path(&registry(), &vm, None, &path("user.name"))
            .unwrap()
            .unwrap();
        assert!(resolved.scope.ptr_eq(&user));
        assert_eq!(resolved.property_name, "name");
        assert_eq!(resolved.dependencies.len(), 1);
        assert!(resolved.dependencies[0].0.ptr_eq(&vm));
        assert_eq!(resolved.dependencies[0].1, "user");
        // A dependency tree disqualifies the binding from the cache.
        assert!(!resolved.is_cacheable_for(&vm));
    }

    #[test]
    fn missing_final_property_is_retryable() {
        let vm = Vm::new();
        assert!(resolve_path(&registry(), &vm, None, &path("later"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn unset_intermediate_is_retryable() {
        let vm = Vm::new();
        vm.define_observable("user", Value::Null);
        assert!(resolve_path(&registry(), &vm, None, &path("user.name"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn unknown_leading_segment_reads_as_undefined_scope() {
        let vm = Vm::new();
        let error = resolve_path(&registry(), &vm, None, &path("nosuch.name")).unwrap_err();
        assert!(matches!(error, BindingError::UndefinedScope(name) if name == "nosuch"));
    }

    #[test]
    fn missing_deeper_segment_is_fatal() {
        let vm = Vm::new();
        let user = Vm::new();
        vm.define_observable("user", Value::Object(user));

        let error = resolve_path(&registry(), &vm, None, &path("user.nosuch.name")).unwrap_err();
        assert!(matches!(
            error,
            BindingError::UnresolvableScope { segment, .. } if segment == "nosuch"
        ));
    }

    #[test]
    fn super_switches_to_parent_without_dependency() {
        let vm = Vm::new();
        let outer = Vm::new();
        outer.define_observable("title", Value::str("outer"));

        let resolved = resolve_path(&registry(), &vm, Some(&outer), &path("super.title"))
            .unwrap()
            .unwrap();
        assert!(resolved.scope.ptr_eq(&outer));
        assert!(resolved.dependencies.is_empty());
        // Relative to the parent, not the element's own scope.
        assert!(!resolved.is_cacheable_for(&vm));
    }

    #[test]
    fn bare_super_binds_the_parent_itself() {
        let vm = Vm::new();
        let outer = Vm::new();
        let resolved = resolve_path(&registry(), &vm, Some(&outer), &path("super"))
            .unwrap()
            .unwrap();
        assert!(resolved.scope.ptr_eq(&outer));
        assert_eq!(resolved.property_name, "this");
    }

    #[test]
    fn super_without_parent_is_fatal() {
        let vm = Vm::new();
        assert!(resolve_path(&registry(), &vm, None, &path("super.title")).is_err());
    }

    #[test]
    fn named_scope_is_absolute_and_cacheable() {
        let registry = registry();
        let shared = Vm::new();
        shared.define_observable("title", Value::str("app"));
        registry.register("app", &shared).unwrap();

        let elsewhere = Vm::new();
        let resolved = resolve_path(&registry, &elsewhere, None, &path("app.title"))
            .unwrap()
            .unwrap();
        assert!(resolved.scope.ptr_eq(&shared));
        assert!(resolved.is_absolute);
        assert!(resolved.dependencies.is_empty());
        // Absolute paths stay cacheable even off the item scope.
        assert!(resolved.is_cacheable_for(&elsewhere));
    }

    #[test]
    fn this_resolves_to_the_scope_itself() {
        let vm = Vm::new();
        let resolved = resolve_path(&registry(), &vm, None, &path("this"))
            .unwrap()
            .unwrap();
        assert!(resolved.scope.ptr_eq(&vm));
        assert_eq!(resolved.property_name, "this");
    }
}
