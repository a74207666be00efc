//! Two-way host-property binding (`:name` attributes).
//!
//! Attachment is routed through the task queue so an external custom
//! element finishes its own setup before the binding reads its schema.
//! The element's declared property schema is the capability query: a
//! declared slot is watched through its declared change event when it has
//! one, otherwise through the slot box itself; an undeclared name gets an
//! engine-owned slot. Callable values on either side degrade to a one-way
//! handoff.

use std::rc::Rc;

use super::{BindingHandler, Change, HandlerTraits, WriteBack};
use crate::binding::context::BindingContext;
use crate::binding::engine::BindingEngine;
use crate::binding::guard::Direction;
use crate::dom::NodeRef;
use crate::error::BindingError;
use crate::vm::Value;

pub struct PropertyHandler;

impl BindingHandler for PropertyHandler {
    fn traits(&self) -> HandlerTraits {
        HandlerTraits::TWO_WAY | HandlerTraits::DEFERRED_ATTACH
    }

    fn init(
        &self,
        engine: &Rc<BindingEngine>,
        element: &NodeRef,
        _value: Value,
        context: &Rc<BindingContext>,
        write_back: WriteBack,
    ) -> Result<(), BindingError> {
        let weak = Rc::downgrade(engine);
        let element = Rc::clone(element);
        let context = Rc::clone(context);
        engine.tasks().defer(move || {
            let Some(engine) = weak.upgrade() else { return };
            attach(&engine, &element, &context, write_back);
        });
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
        if context.parameter.borrow().is_none() {
            return Ok(());
        }
        // Applied after the current reaction settles; the write holds its
        // own outbound token since the caller's is gone by then.
        let element = Rc::clone(element);
        let context = Rc::clone(context);
        engine.tasks().defer(move || {
            let Some(name) = context.parameter.borrow().clone() else {
                return;
            };
            let Some(_token) = context.guard.enter(Direction::Outbound) else {
                return;
            };
            element.set_property(&name, value);
        });
        Ok(())
    }
}

fn attach(
    engine: &Rc<BindingEngine>,
    element: &NodeRef,
    context: &Rc<BindingContext>,
    write_back: WriteBack,
) {
    let Some(name) = context.parameter.borrow().clone() else {
        return;
    };

    if let Some(slot) = element.declared_property(&name) {
        if let Value::Action(_) = slot.value.get() {
            // The element exposes a callable; hand it to the view-model
            // and stop updating this parameter.
            write_back(slot.value.get());
            *context.parameter.borrow_mut() = None;
            return;
        }
    }
    if let Value::Action(_) = context.current_value() {
        // The view-model passes a callable to the element; one-way handoff.
        element.set_property(&name, context.current_value());
        *context.parameter.borrow_mut() = None;
        return;
    }

    let slot = element.ensure_property(&name, Value::Null);
    match slot.notify_event.clone() {
        Some(event) => {
            // The element announces its own edits through a DOM event.
            let property_name = name.clone();
            let weak = Rc::downgrade(engine);
            element.add_event_listener(&event, move |event| {
                if let Some(value) = event.target.get_property(&property_name) {
                    write_back(value);
                }
                if let Some(engine) = weak.upgrade() {
                    engine.tasks().flush();
                }
            });
        }
        None => {
            let weak = Rc::downgrade(engine);
            slot.value
                .subscribe(move |change| {
                    write_back(change.new_value.clone());
                    if let Some(engine) = weak.upgrade() {
                        engine.tasks().flush();
                    }
                })
                .forget();
        }
    }
}
