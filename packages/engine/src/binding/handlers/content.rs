//! Child-controlling handlers: conditional, sub-context, raw markup,
//! content injection and component injection.
//!
//! Each takes ownership of the element's descendants; the orchestrator
//! never walks into content these handlers produce.

use std::rc::Rc;

use super::{clear_children, create_template, BindingHandler, Change, HandlerTraits, WriteBack};
use crate::binding::context::BindingContext;
use crate::binding::engine::BindingEngine;
use crate::dom::{parse_markup, NodeExt, NodeRef};
use crate::error::BindingError;
use crate::vm::{Value, Vm};

/// `@if`: children render while the value is truthy, against the
/// view-model the element was walked with.
pub struct IfHandler;

impl BindingHandler for IfHandler {
    fn traits(&self) -> HandlerTraits {
        HandlerTraits::CONTROLS_CHILDREN
    }

    fn init(
        &self,
        _engine: &Rc<BindingEngine>,
        element: &NodeRef,
        _value: Value,
        context: &Rc<BindingContext>,
        _write_back: WriteBack,
    ) -> Result<(), BindingError> {
        *context.template.borrow_mut() = create_template(element);
        Ok(())
    }

    fn update(
        &self,
        engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        _change: Option<&Change>,
    ) -> Result<(), BindingError> {
        clear_children(engine, element);
        if value.truthy() {
            render_template(
                engine,
                element,
                context,
                &context.original_vm,
                context.parent_vm.as_ref(),
            )?;
        }
        Ok(())
    }
}

/// `@context`: children render against the bound object; the surrounding
/// view-model stays reachable as `super`.
pub struct ContextHandler;

impl BindingHandler for ContextHandler {
    fn traits(&self) -> HandlerTraits {
        HandlerTraits::CONTROLS_CHILDREN
    }

    fn init(
        &self,
        _engine: &Rc<BindingEngine>,
        element: &NodeRef,
        _value: Value,
        context: &Rc<BindingContext>,
        _write_back: WriteBack,
    ) -> Result<(), BindingError> {
        *context.template.borrow_mut() = create_template(element);
        Ok(())
    }

    fn update(
        &self,
        engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        _change: Option<&Change>,
    ) -> Result<(), BindingError> {
        clear_children(engine, element);
        if let Value::Object(inner) = value {
            render_template(engine, element, context, &inner, Some(&context.original_vm))?;
        }
        Ok(())
    }
}

/// `@html`: the string value is parsed as markup and injected; binding of
/// the injected children is deferred so external element setup completes
/// first.
pub struct HtmlHandler;

impl BindingHandler for HtmlHandler {
    fn traits(&self) -> HandlerTraits {
        HandlerTraits::CONTROLS_CHILDREN | HandlerTraits::DEFERRED_ATTACH
    }

    fn update(
        &self,
        engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        _change: Option<&Change>,
    ) -> Result<(), BindingError> {
        clear_children(engine, element);
        let Some(markup) = value.as_str() else {
            return Ok(());
        };
        inject_markup(engine, element, markup, &context.original_vm, context.parent_vm.as_ref())
    }
}

/// `@content`: expects an object whose `contentTemplate` property holds
/// markup; injects it and binds against that object.
pub struct ContentHandler;

impl BindingHandler for ContentHandler {
    fn traits(&self) -> HandlerTraits {
        HandlerTraits::CONTROLS_CHILDREN
    }

    fn update(
        &self,
        engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        _change: Option<&Change>,
    ) -> Result<(), BindingError> {
        clear_children(engine, element);
        let Some(vm) = value.as_object() else {
            return Ok(());
        };
        let Some(Value::Str(markup)) = vm.get("contentTemplate") else {
            return Ok(());
        };
        let fragment = parse_markup(&markup).map_err(BindingError::from)?;
        let children = fragment.take_children();
        for child in &children {
            element.append_child(child);
        }
        for child in &children {
            crate::imagine::bind_subtree(engine, vm, Some(&context.original_vm), child)?;
        }
        Ok(())
    }
}

/// `@component`: injects markup that must render to a custom element;
/// binding is deferred past the attach point so host-property bindings see
/// an upgraded element.
pub struct ComponentHandler;

impl BindingHandler for ComponentHandler {
    fn traits(&self) -> HandlerTraits {
        HandlerTraits::CONTROLS_CHILDREN | HandlerTraits::DEFERRED_ATTACH
    }

    fn update(
        &self,
        engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        _change: Option<&Change>,
    ) -> Result<(), BindingError> {
        clear_children(engine, element);
        let (markup, vm) = match &value {
            Value::Str(markup) => (markup.clone(), context.original_vm.clone()),
            Value::Object(inner) => match inner.get("contentTemplate") {
                Some(Value::Str(markup)) => (markup, inner.clone()),
                _ => return Ok(()),
            },
            _ => return Ok(()),
        };
        let fragment = parse_markup(&markup).map_err(BindingError::from)?;
        let root_is_component = fragment
            .children()
            .iter()
            .any(|child| child.is_custom_element());
        if !root_is_component {
            log::warn!(
                "component binding on <{}> did not produce a custom element",
                element.tag_name()
            );
            return Ok(());
        }
        for child in &fragment.take_children() {
            element.append_child(child);
        }
        defer_bind(engine, element.children(), vm, context.parent_vm.clone());
        Ok(())
    }
}

fn render_template(
    engine: &Rc<BindingEngine>,
    element: &NodeRef,
    context: &BindingContext,
    vm: &Vm,
    parent: Option<&Vm>,
) -> Result<(), BindingError> {
    let template = context.template.borrow().clone();
    for node in &template {
        let clone = node.deep_clone();
        crate::imagine::bind_subtree(engine, vm, parent, &clone)?;
        element.append_child(&clone);
    }
    Ok(())
}

fn inject_markup(
    engine: &Rc<BindingEngine>,
    element: &NodeRef,
    markup: &str,
    vm: &Vm,
    parent: Option<&Vm>,
) -> Result<(), BindingError> {
    let fragment = parse_markup(markup).map_err(BindingError::from)?;
    let children = fragment.take_children();
    for child in &children {
        element.append_child(child);
    }
    defer_bind(engine, children, vm.clone(), parent.cloned());
    Ok(())
}

fn defer_bind(engine: &Rc<BindingEngine>, nodes: Vec<NodeRef>, vm: Vm, parent: Option<Vm>) {
    let weak = Rc::downgrade(engine);
    engine.tasks().defer(move || {
        let Some(engine) = weak.upgrade() else { return };
        for node in &nodes {
            if let Err(error) =
                crate::imagine::bind_subtree(&engine, &vm, parent.as_ref(), node)
            {
                log::error!("deferred binding of injected content failed: {error}");
            }
        }
    });
}
