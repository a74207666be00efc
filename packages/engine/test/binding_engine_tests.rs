//! End-to-end binding tests: walk, init/update phases, two-way flow,
//! dependency-tree retry, transforms, interpolation and diagnostics.

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use imagine_engine::dom::{outer_html, parse_markup, NodeExt, NodeRef};
    use imagine_engine::{BindingError, Imagine, Transform, Value, Vm};

    fn bind_markup(imagine: &Imagine, vm: &Vm, markup: &str) -> NodeRef {
        let root = parse_markup(markup).unwrap();
        imagine.bind(vm, &root).unwrap();
        root
    }

    #[test]
    fn binds_text_and_tracks_changes() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let title = vm.define_observable("title", Value::str("first"));

        let root = bind_markup(&imagine, &vm, r#"<h1 @text="title"></h1>"#);
        let h1 = root.first_child().unwrap();
        assert_eq!(h1.text_content(), "first");

        title.set(Value::str("second"));
        assert_eq!(h1.text_content(), "second");
    }

    #[test]
    fn engine_attributes_are_removed_after_binding() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_observable("title", Value::str("x"));

        let root = bind_markup(
            &imagine,
            &vm,
            r#"<h1 class="big" @text="title" _title="title"></h1>"#,
        );
        let h1 = root.first_child().unwrap();
        assert!(!h1.has_attribute("@text"));
        assert!(!h1.has_attribute("_title"));
        // Foreign attributes stay.
        assert_eq!(h1.get_attribute("class").unwrap(), "big");
    }

    #[test]
    fn initial_render_is_idempotent() {
        let vm = Vm::new();
        vm.define_observable("title", Value::str("hi"));
        vm.define_array(
            "items",
            vec![Value::Object({
                let item = Vm::new();
                item.define_observable("name", Value::str("a"));
                item
            })],
        );
        let markup =
            r#"<div><h1 @text="title"></h1><ul @foreach="items"><li data-text="name"></li></ul></div>"#;

        let imagine = Imagine::new();
        let root = bind_markup(&imagine, &vm, markup);
        let once = outer_html(&root.first_child().unwrap());

        // A second pass over the already-bound tree changes nothing.
        imagine.bind(&vm, &root).unwrap();
        assert_eq!(outer_html(&root.first_child().unwrap()), once);

        // A fresh identical tree renders identically.
        let imagine2 = Imagine::new();
        let root2 = bind_markup(&imagine2, &vm, markup);
        assert_eq!(outer_html(&root2.first_child().unwrap()), once);
    }

    #[test]
    fn two_way_value_binding_round_trips_without_loops() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let name = vm.define_observable("name", Value::str("start"));

        let changes = Rc::new(Cell::new(0));
        let counter = changes.clone();
        name.subscribe(move |_| counter.set(counter.get() + 1)).forget();

        let root = bind_markup(&imagine, &vm, r#"<input @value="name">"#);
        let input = root.first_child().unwrap();
        assert_eq!(input.get_property("value").unwrap(), Value::str("start"));

        // view-model -> DOM
        name.set(Value::str("x"));
        assert_eq!(input.get_property("value").unwrap(), Value::str("x"));
        assert_eq!(changes.get(), 1);

        // DOM -> view-model
        input.set_property("value", Value::str("y"));
        input.dispatch_event("input", Value::Null);
        assert_eq!(name.get(), Value::str("y"));
        assert_eq!(changes.get(), 2);
    }

    #[test]
    fn two_way_host_property_binding_round_trips() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let age = vm.define_observable("age", Value::Number(30.0));

        let root = bind_markup(&imagine, &vm, r#"<age-badge :age="age"></age-badge>"#);
        let badge = root.first_child().unwrap();
        assert_eq!(badge.get_property("age").unwrap(), Value::Number(30.0));

        age.set(Value::Number(31.0));
        assert_eq!(badge.get_property("age").unwrap(), Value::Number(31.0));

        badge.set_property("age", Value::Number(32.0));
        assert_eq!(age.get(), Value::Number(32.0));
        assert_eq!(badge.get_property("age").unwrap(), Value::Number(32.0));
    }

    #[test]
    fn dependency_tree_retries_when_intermediate_appears() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let user = vm.define_observable("user", Value::Null);

        let root = parse_markup(r#"<div @text="user.name"></div>"#).unwrap();
        // No crash at bind time; the binding waits for `user`.
        imagine.bind(&vm, &root).unwrap();
        let div = root.first_child().unwrap();
        assert_eq!(div.text_content(), "");

        let ada = Vm::new();
        ada.define_observable("name", Value::str("Ada"));
        user.set(Value::Object(ada));
        assert_eq!(div.text_content(), "Ada");
    }

    #[test]
    fn retry_survives_replacing_the_intermediate_again() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let user = vm.define_observable("user", Value::Null);
        let root = bind_markup(&imagine, &vm, r#"<div @text="user.name"></div>"#);
        let div = root.first_child().unwrap();

        let first = Vm::new();
        first.define_observable("name", Value::str("one"));
        user.set(Value::Object(first));
        assert_eq!(div.text_content(), "one");

        // Swapping the whole intermediate re-resolves the binding.
        let second = Vm::new();
        second.define_observable("name", Value::str("two"));
        user.set(Value::Object(second));
        assert_eq!(div.text_content(), "two");
    }

    #[test]
    fn pending_child_controller_restores_children_on_rebind() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let user = vm.define_observable("user", Value::Null);

        let root = parse_markup(
            r#"<section @if="user.active"><p data-text="user.name"></p></section>"#,
        )
        .unwrap();
        imagine.bind(&vm, &root).unwrap();
        let section = root.first_child().unwrap();
        // Unresolvable bindings do not render their content.
        assert_eq!(section.child_count(), 0);

        let profile = Vm::new();
        profile.define_observable("active", Value::Bool(true));
        profile.define_observable("name", Value::str("Ada"));
        user.set(Value::Object(profile));
        assert_eq!(section.text_content(), "Ada");
    }

    #[test]
    fn dual_child_controllers_are_fatal() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_observable("flag", Value::Bool(true));
        vm.define_array("items", Vec::new());

        let root = parse_markup(r#"<div @if="flag" @foreach="items"></div>"#).unwrap();
        let error = imagine.bind(&vm, &root).unwrap_err();
        assert!(matches!(
            error,
            BindingError::MultipleChildControllers { .. }
        ));
    }

    #[test]
    fn unknown_named_handler_is_fatal() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let root = parse_markup(r#"<div @bogus="x"></div>"#).unwrap();
        let error = imagine.bind(&vm, &root).unwrap_err();
        assert!(matches!(error, BindingError::UnknownHandler(name) if name == "bogus"));
    }

    #[test]
    fn missing_intermediate_scope_is_fatal() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let root = parse_markup(r#"<div @text="nosuch.name"></div>"#).unwrap();
        assert!(matches!(
            imagine.bind(&vm, &root),
            Err(BindingError::UndefinedScope(name)) if name == "nosuch"
        ));
    }

    #[test]
    fn array_into_scalar_binding_is_fatal() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_array("items", Vec::new());
        let root = parse_markup(r#"<div @text="items"></div>"#).unwrap();
        assert!(matches!(
            imagine.bind(&vm, &root),
            Err(BindingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn scalar_into_foreach_binding_is_fatal() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_observable("items", Value::str("not an array"));
        let root = parse_markup(r#"<ul @foreach="items"><li></li></ul>"#).unwrap();
        assert!(matches!(
            imagine.bind(&vm, &root),
            Err(BindingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn unrecognized_attributes_are_ignored() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let root = bind_markup(
            &imagine,
            &vm,
            r#"<div class="a" data-id="7" aria-label="x"></div>"#,
        );
        let div = root.first_child().unwrap();
        assert_eq!(div.get_attribute("data-id").unwrap(), "7");
        assert_eq!(div.get_attribute("aria-label").unwrap(), "x");
    }

    #[test]
    fn inline_interpolation_rewrites_text() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let name = vm.define_observable("name", Value::str("Ada"));

        let root = bind_markup(&imagine, &vm, "<div>Hello ${name}, bye!</div>");
        let div = root.first_child().unwrap();
        assert_eq!(
            outer_html(&div),
            "<div>Hello <span>Ada</span>, bye!</div>"
        );

        name.set(Value::str("Grace"));
        assert_eq!(div.text_content(), "Hello Grace, bye!");
    }

    #[test]
    fn named_scope_resolves_across_components() {
        let imagine = Imagine::new();
        let shared = Vm::new();
        shared.define_observable("status", Value::str("ready"));
        imagine.register_scope("app", &shared).unwrap();

        let vm = Vm::new();
        let root = bind_markup(&imagine, &vm, r#"<div @text="app.status"></div>"#);
        assert_eq!(root.first_child().unwrap().text_content(), "ready");
    }

    #[test]
    fn scope_handler_names_the_current_scope() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_observable("flag", Value::str("on"));

        let root = bind_markup(
            &imagine,
            &vm,
            r#"<div @scope="shared"></div><span data-text="shared.flag"></span>"#,
        );
        let span = root.children().into_iter().nth(1).unwrap();
        assert_eq!(span.text_content(), "on");
    }

    #[test]
    fn ternary_derives_strings() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let active = vm.define_observable("active", Value::Bool(false));

        let root = bind_markup(&imagine, &vm, r#"<p @text="active ? 'on' : 'off'"></p>"#);
        let p = root.first_child().unwrap();
        assert_eq!(p.text_content(), "off");

        active.set(Value::Bool(true));
        assert_eq!(p.text_content(), "on");
    }

    #[test]
    fn comparison_derives_booleans() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let state = vm.define_observable("state", Value::str("busy"));

        let root = bind_markup(&imagine, &vm, r#"<div @visible="state == 'done'"></div>"#);
        let div = root.first_child().unwrap();
        assert_eq!(div.display().as_deref(), Some("none"));

        state.set(Value::str("done"));
        assert_eq!(div.display(), None);
    }

    #[test]
    fn negation_and_visibility() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let busy = vm.define_observable("busy", Value::Bool(false));

        let root = bind_markup(&imagine, &vm, r#"<div @visible="!busy"></div>"#);
        let div = root.first_child().unwrap();
        assert_eq!(div.display(), None);

        busy.set(Value::Bool(true));
        assert_eq!(div.display().as_deref(), Some("none"));
    }

    #[test]
    fn concatenation_tracks_every_path() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let first = vm.define_observable("first", Value::str("Ada"));
        vm.define_observable("last", Value::str("Lovelace"));

        let root = bind_markup(&imagine, &vm, r#"<p @text="first + ' ' + last"></p>"#);
        let p = root.first_child().unwrap();
        assert_eq!(p.text_content(), "Ada Lovelace");

        first.set(Value::str("Grace"));
        assert_eq!(p.text_content(), "Grace Lovelace");
    }

    #[test]
    fn control_transform_registers_a_named_transform() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let name = vm.define_observable("name", Value::str("ada"));
        vm.define_transform(
            "shout",
            Transform::new(|value| Value::Str(value.to_display_string().to_uppercase())),
        );

        let root = bind_markup(
            &imagine,
            &vm,
            r#"<control-transform target="shout" transform="upper"></control-transform><p @text="upper(name)"></p>"#,
        );
        // The directive element is consumed.
        assert_eq!(root.child_count(), 1);
        let p = root.first_child().unwrap();
        assert_eq!(p.text_content(), "ADA");

        name.set(Value::str("grace"));
        assert_eq!(p.text_content(), "GRACE");
    }

    #[test]
    fn missing_transform_degrades_to_pass_through() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_observable("name", Value::str("ada"));

        let root = bind_markup(&imagine, &vm, r#"<p @text="nosuchtransform(name)"></p>"#);
        assert_eq!(root.first_child().unwrap().text_content(), "ada");
    }

    #[test]
    fn describe_bindings_reports_live_contexts() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_observable("title", Value::str("hi"));

        let root = bind_markup(&imagine, &vm, r#"<h1 @text="title" _lang="title"></h1>"#);
        let h1 = root.first_child().unwrap();
        let snapshot = imagine.describe_bindings(&h1);

        let bindings = snapshot["bindings"].as_array().unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0]["handler"], "text");
        assert_eq!(bindings[0]["currentValue"], "hi");
        assert_eq!(bindings[1]["handler"], "__attribute");
        assert_eq!(bindings[1]["parameter"], "lang");
        assert_eq!(bindings[1]["attribute"]["key"], "_lang");
    }
}
