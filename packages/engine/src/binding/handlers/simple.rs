//! Leaf handlers: text, form value, visibility, DOM attribute, event
//! listener and scope naming.

use std::rc::Rc;

use super::{BindingHandler, Change, HandlerTraits, WriteBack};
use crate::binding::context::{BindingContext, HandlerState};
use crate::binding::engine::BindingEngine;
use crate::dom::{NodeExt, NodeRef};
use crate::error::BindingError;
use crate::vm::Value;

pub struct TextHandler;

impl BindingHandler for TextHandler {
    fn update(
        &self,
        _engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        _context: &Rc<BindingContext>,
        _change: Option<&Change>,
    ) -> Result<(), BindingError> {
        element.set_text_content(&value.to_display_string());
        Ok(())
    }
}

/// Two-way form value: `input` events flow back into the view-model, value
/// changes flow into the element's `value` host property.
pub struct ValueHandler;

impl BindingHandler for ValueHandler {
    fn traits(&self) -> HandlerTraits {
        HandlerTraits::TWO_WAY
    }

    fn init(
        &self,
        engine: &Rc<BindingEngine>,
        element: &NodeRef,
        _value: Value,
        _context: &Rc<BindingContext>,
        write_back: WriteBack,
    ) -> Result<(), BindingError> {
        let engine = Rc::downgrade(engine);
        element.add_event_listener("input", move |event| {
            let value = event
                .target
                .get_property("value")
                .unwrap_or(Value::Null);
            write_back(value);
            if let Some(engine) = engine.upgrade() {
                engine.tasks().flush();
            }
        });
        Ok(())
    }

    fn update(
        &self,
        _engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        _context: &Rc<BindingContext>,
        _change: Option<&Change>,
    ) -> Result<(), BindingError> {
        element.set_property("value", value);
        Ok(())
    }
}

/// Toggles the element's display slot, restoring the display it had before
/// the binding first touched it.
pub struct VisibleHandler;

impl BindingHandler for VisibleHandler {
    fn init(
        &self,
        _engine: &Rc<BindingEngine>,
        element: &NodeRef,
        _value: Value,
        context: &Rc<BindingContext>,
        _write_back: WriteBack,
    ) -> Result<(), BindingError> {
        *context.state.borrow_mut() = HandlerState::InitialDisplay(element.display());
        Ok(())
    }

    fn update(
        &self,
        _engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        _change: Option<&Change>,
    ) -> Result<(), BindingError> {
        if value.truthy() {
            let initial = match &*context.state.borrow() {
                HandlerState::InitialDisplay(display) => display.clone(),
                _ => None,
            };
            element.set_display(initial);
        } else {
            element.set_display(Some("none".to_string()));
        }
        Ok(())
    }
}

/// One-way DOM attribute write; a null value removes the attribute.
pub struct AttributeHandler;

impl BindingHandler for AttributeHandler {
    fn update(
        &self,
        _engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        _change: Option<&Change>,
    ) -> Result<(), BindingError> {
        let Some(name) = context.parameter.borrow().clone() else {
            return Ok(());
        };
        if value.is_null() {
            element.remove_attribute(&name);
        } else {
            element.set_attribute(&name, &value.to_display_string());
        }
        Ok(())
    }
}

/// Attaches a listener for the parameter event name, invoking the bound
/// action with the view-model the binding originated in.
pub struct EventHandler;

impl BindingHandler for EventHandler {
    fn init(
        &self,
        engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        _write_back: WriteBack,
    ) -> Result<(), BindingError> {
        let Some(event_name) = context.parameter.borrow().clone() else {
            return Ok(());
        };
        let Some(action) = value.as_action().cloned() else {
            log::debug!(
                "'{}' on <{}> is not callable; event binding skipped",
                context.attr_value,
                element.tag_name()
            );
            return Ok(());
        };
        let vm = context.original_vm.clone();
        let engine = Rc::downgrade(engine);
        element.add_event_listener(&event_name, move |event| {
            action.invoke(&vm, event);
            if let Some(engine) = engine.upgrade() {
                engine.tasks().flush();
            }
        });
        Ok(())
    }
}

/// Registers the current view-model in the scope registry under the bound
/// name, making paths through that name absolute.
pub struct ScopeHandler;

impl BindingHandler for ScopeHandler {
    fn init(
        &self,
        engine: &Rc<BindingEngine>,
        _element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        _write_back: WriteBack,
    ) -> Result<(), BindingError> {
        let name = match value.as_str() {
            Some(name) => name.to_string(),
            None => value.to_display_string(),
        };
        engine.scopes().register(&name, &context.vm)
    }
}
