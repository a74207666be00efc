//! Per-handler behavior: visibility, conditionals, sub-contexts, markup
//! injection, components, events, host properties and transforms.

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use imagine_engine::dom::{parse_markup, NodeExt, NodeRef};
    use imagine_engine::{Action, Imagine, Transform, Value, Vm};

    fn bind_markup(imagine: &Imagine, vm: &Vm, markup: &str) -> NodeRef {
        let root = parse_markup(markup).unwrap();
        imagine.bind(vm, &root).unwrap();
        root
    }

    #[test]
    fn visible_restores_the_initial_display() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let shown = vm.define_observable("shown", Value::Bool(true));

        let root = parse_markup(r#"<div @visible="shown"></div>"#).unwrap();
        let div = root.first_child().unwrap();
        div.set_display(Some("flex".to_string()));
        imagine.bind(&vm, &root).unwrap();
        assert_eq!(div.display().as_deref(), Some("flex"));

        shown.set(Value::Bool(false));
        assert_eq!(div.display().as_deref(), Some("none"));

        shown.set(Value::Bool(true));
        assert_eq!(div.display().as_deref(), Some("flex"));
    }

    #[test]
    fn if_renders_and_clears_children() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let show = vm.define_observable("show", Value::Bool(true));
        vm.define_observable("title", Value::str("hi"));

        let root = bind_markup(
            &imagine,
            &vm,
            r#"<div @if="show"><span data-text="title"></span></div>"#,
        );
        let div = root.first_child().unwrap();
        assert_eq!(div.text_content(), "hi");

        show.set(Value::Bool(false));
        assert_eq!(div.child_count(), 0);

        // The template survives teardown; truthy re-renders it.
        show.set(Value::Bool(true));
        assert_eq!(div.text_content(), "hi");
    }

    #[test]
    fn context_binds_children_to_the_object_with_super_access() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_observable("title", Value::str("outer"));
        let person = Vm::new();
        person.define_observable("name", Value::str("Ada"));
        let slot = vm.define_observable("person", Value::Object(person));

        let root = bind_markup(
            &imagine,
            &vm,
            r#"<div @context="person"><b data-text="name"></b><i data-text="super.title"></i></div>"#,
        );
        let div = root.first_child().unwrap();
        assert_eq!(div.text_content(), "Adaouter");

        // Swapping the object re-renders the sub-context.
        let other = Vm::new();
        other.define_observable("name", Value::str("Grace"));
        slot.set(Value::Object(other));
        assert_eq!(div.text_content(), "Graceouter");
    }

    #[test]
    fn html_injects_and_binds_markup() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_observable("title", Value::str("live"));
        let snippet = vm.define_observable(
            "snippet",
            Value::str(r#"<b data-text="title"></b>"#),
        );

        let root = bind_markup(&imagine, &vm, r#"<div @html="snippet"></div>"#);
        let div = root.first_child().unwrap();
        assert_eq!(div.first_child().unwrap().tag_name(), "b");
        assert_eq!(div.text_content(), "live");

        snippet.set(Value::str("<p>static</p>"));
        assert_eq!(div.first_child().unwrap().tag_name(), "p");
        assert_eq!(div.text_content(), "static");
    }

    #[test]
    fn content_renders_an_objects_template() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let widget = Vm::new();
        widget.define_plain(
            "contentTemplate",
            Value::str(r#"<span data-text="label"></span>"#),
        );
        widget.define_observable("label", Value::str("widget"));
        let slot = vm.define_observable("view", Value::Object(widget));

        let root = bind_markup(&imagine, &vm, r#"<div @content="view"></div>"#);
        let div = root.first_child().unwrap();
        assert_eq!(div.text_content(), "widget");

        // Anything without a template empties the element.
        slot.set(Value::Null);
        assert_eq!(div.child_count(), 0);
    }

    #[test]
    fn component_requires_a_custom_element() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let view = vm.define_observable("view", Value::str("<user-card></user-card>"));

        let root = bind_markup(&imagine, &vm, r#"<div @component="view"></div>"#);
        let div = root.first_child().unwrap();
        assert_eq!(div.first_child().unwrap().tag_name(), "user-card");

        // Plain markup is rejected, the host stays empty.
        view.set(Value::str("<div></div>"));
        assert_eq!(div.child_count(), 0);
    }

    #[test]
    fn event_binding_invokes_the_action_with_the_originating_vm() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let clicks = Rc::new(Cell::new(0));
        let from_right_vm = Rc::new(Cell::new(false));

        let counter = clicks.clone();
        let witness = from_right_vm.clone();
        let expected = vm.clone();
        vm.define_action("save", move |origin, _event| {
            counter.set(counter.get() + 1);
            witness.set(origin.ptr_eq(&expected));
        });

        let root = bind_markup(&imagine, &vm, r#"<button #click="save">Go</button>"#);
        let button = root.first_child().unwrap();
        button.dispatch_event("click", Value::Null);
        button.dispatch_event("click", Value::Null);

        assert_eq!(clicks.get(), 2);
        assert!(from_right_vm.get());
    }

    #[test]
    fn non_callable_event_values_are_skipped() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_observable("save", Value::str("not callable"));

        let root = bind_markup(&imagine, &vm, r#"<button #click="save"></button>"#);
        // Dispatching must be a silent no-op.
        root.first_child().unwrap().dispatch_event("click", Value::Null);
    }

    #[test]
    fn attribute_binding_removes_on_null() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let tip = vm.define_observable("tip", Value::str("hello"));

        let root = bind_markup(&imagine, &vm, r#"<div _title="tip"></div>"#);
        let div = root.first_child().unwrap();
        assert_eq!(div.get_attribute("title").unwrap(), "hello");

        tip.set(Value::Null);
        assert!(!div.has_attribute("title"));
    }

    #[test]
    fn property_binding_hands_off_element_callables() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_observable("submitOutlet", Value::Null);

        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let root = parse_markup(r#"<fancy-form :submit="submitOutlet"></fancy-form>"#).unwrap();
        let form = root.first_child().unwrap();
        form.declare_property(
            "submit",
            Value::Action(Action::new(move |_, _| counter.set(counter.get() + 1))),
        );

        imagine.bind(&vm, &root).unwrap();

        // The element's callable is now reachable from the view-model.
        let outlet = vm.get("submitOutlet").unwrap();
        let action = outlet.as_action().expect("outlet holds the element action");
        action.invoke(&vm, &imagine_engine::dom::Event {
            name: "submit".to_string(),
            target: form.clone(),
            data: Value::Null,
        });
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn property_binding_hands_off_vm_callables() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        vm.define_plain(
            "onPick",
            Value::Action(Action::new(|_, _| {})),
        );

        let root = bind_markup(&imagine, &vm, r#"<fancy-list :picker="onPick"></fancy-list>"#);
        let list = root.first_child().unwrap();
        assert!(list
            .get_property("picker")
            .unwrap()
            .as_action()
            .is_some());
    }

    #[test]
    fn property_binding_uses_the_declared_change_event() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let done = vm.define_observable("done", Value::Bool(true));

        let root = parse_markup(r#"<toggle-box :checked="done"></toggle-box>"#).unwrap();
        let toggle = root.first_child().unwrap();
        toggle.declare_property_with_event("checked", Value::Bool(false), "change");

        imagine.bind(&vm, &root).unwrap();
        assert_eq!(toggle.get_property("checked").unwrap(), Value::Bool(true));

        // A declared change event carries edits back; a bare property
        // write alone does not.
        toggle.set_property("checked", Value::Bool(false));
        assert_eq!(done.get(), Value::Bool(true));
        toggle.dispatch_event("change", Value::Null);
        assert_eq!(done.get(), Value::Bool(false));
    }

    #[test]
    fn two_way_transform_maps_both_directions() {
        let imagine = Imagine::new();
        imagine.register_transform(
            "excited",
            Transform::two_way(
                |value| Value::Str(format!("{}!", value.to_display_string())),
                |value| Value::Str(value.to_display_string().trim_end_matches('!').to_string()),
            ),
        );
        let vm = Vm::new();
        let tag = vm.define_observable("tag", Value::str("ada"));

        let root = bind_markup(&imagine, &vm, r#"<input @value="excited(tag)">"#);
        let input = root.first_child().unwrap();
        assert_eq!(input.get_property("value").unwrap(), Value::str("ada!"));

        input.set_property("value", Value::str("grace!"));
        input.dispatch_event("input", Value::Null);
        assert_eq!(tag.get(), Value::str("grace"));
        assert_eq!(input.get_property("value").unwrap(), Value::str("grace!"));
    }

    #[test]
    fn data_prefix_aliases_named_handlers() {
        let imagine = Imagine::new();
        let vm = Vm::new();
        let show = vm.define_observable("show", Value::Bool(false));
        vm.define_observable("title", Value::str("hi"));

        let root = bind_markup(
            &imagine,
            &vm,
            r#"<div data-if="show"><span data-text="title"></span></div>"#,
        );
        let div = root.first_child().unwrap();
        assert_eq!(div.child_count(), 0);

        show.set(Value::Bool(true));
        assert_eq!(div.text_content(), "hi");
    }
}
