//! Binding handlers: one strategy per binding kind.
//!
//! A handler implements the init/update contract against an element. `init`
//! runs exactly once per (element, binding-identity); `update` runs once
//! immediately after init and again per observed change. Handlers that
//! manage their own descendants declare `CONTROLS_CHILDREN`, which stops
//! the orchestrator from walking into the subtree they produce.

use std::rc::Rc;

use bitflags::bitflags;
use imagine_observable::ArrayChange;

use super::context::BindingContext;
use super::engine::BindingEngine;
use crate::dom::{normalize_template, NodeRef};
use crate::error::BindingError;
use crate::vm::Value;

mod content;
mod foreach;
mod property;
mod simple;

pub use content::{ComponentHandler, ContentHandler, ContextHandler, HtmlHandler, IfHandler};
pub use foreach::ForEachHandler;
pub use property::PropertyHandler;
pub use simple::{
    AttributeHandler, EventHandler, ScopeHandler, TextHandler, ValueHandler, VisibleHandler,
};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HandlerTraits: u8 {
        /// The handler renders the element's descendants itself.
        const CONTROLS_CHILDREN = 1 << 0;
        /// The handler writes DOM-originated values back into the view-model.
        const TWO_WAY = 1 << 1;
        /// Attachment is routed through the task queue so external element
        /// setup can complete first.
        const DEFERRED_ATTACH = 1 << 2;
    }
}

/// What changed, as seen by `update`. `None` is the initial paint.
#[derive(Debug, Clone)]
pub enum Change {
    /// The bound property was replaced at the top level.
    Value,
    Splice {
        index: usize,
        added: Vec<Value>,
        removed: Vec<Value>,
    },
    ItemSet {
        index: usize,
        new_value: Value,
    },
    Replace,
}

impl Change {
    pub fn from_array(change: &ArrayChange<Value>) -> Change {
        match change {
            ArrayChange::Splice {
                index,
                added,
                removed,
            } => Change::Splice {
                index: *index,
                added: added.clone(),
                removed: removed.clone(),
            },
            ArrayChange::Set {
                index, new_value, ..
            } => Change::ItemSet {
                index: *index,
                new_value: new_value.clone(),
            },
            ArrayChange::Replace { .. } => Change::Replace,
        }
    }
}

/// Routes a DOM-originated value back into the view-model, under the
/// inbound circular-update guard.
pub type WriteBack = Rc<dyn Fn(Value)>;

pub trait BindingHandler {
    fn traits(&self) -> HandlerTraits {
        HandlerTraits::empty()
    }

    fn init(
        &self,
        _engine: &Rc<BindingEngine>,
        _element: &NodeRef,
        _value: Value,
        _context: &Rc<BindingContext>,
        _write_back: WriteBack,
    ) -> Result<(), BindingError> {
        Ok(())
    }

    fn update(
        &self,
        _engine: &Rc<BindingEngine>,
        _element: &NodeRef,
        _value: Value,
        _context: &Rc<BindingContext>,
        _change: Option<&Change>,
    ) -> Result<(), BindingError> {
        Ok(())
    }
}

pub fn default_handlers() -> Vec<(&'static str, Rc<dyn BindingHandler>)> {
    fn entry(
        name: &'static str,
        handler: Rc<dyn BindingHandler>,
    ) -> (&'static str, Rc<dyn BindingHandler>) {
        (name, handler)
    }
    vec![
        entry("text", Rc::new(TextHandler)),
        entry("value", Rc::new(ValueHandler)),
        entry("visible", Rc::new(VisibleHandler)),
        entry("if", Rc::new(IfHandler)),
        entry("foreach", Rc::new(ForEachHandler)),
        entry("context", Rc::new(ContextHandler)),
        entry("html", Rc::new(HtmlHandler)),
        entry("content", Rc::new(ContentHandler)),
        entry("component", Rc::new(ComponentHandler)),
        entry("scope", Rc::new(ScopeHandler)),
        entry(super::parser::ATTRIBUTE_HANDLER, Rc::new(AttributeHandler)),
        entry(super::parser::PROPERTY_HANDLER, Rc::new(PropertyHandler)),
        entry(super::parser::EVENT_HANDLER, Rc::new(EventHandler)),
    ]
}

/// Capture an element's children as this binding's template.
///
/// Top-level text nodes are dropped (templates are element-only), interior
/// whitespace is normalized and inline interpolations are rewritten once,
/// so every later clone starts from the same shape.
pub fn create_template(element: &NodeRef) -> Vec<NodeRef> {
    let mut template = Vec::new();
    for child in element.take_children() {
        if child.is_element() {
            normalize_template(&child);
            crate::imagine::rewrite_interpolations(&child);
            template.push(child);
        }
    }
    template
}

/// Remove an element's children and evict their binding contexts.
pub fn clear_children(engine: &BindingEngine, element: &NodeRef) {
    for child in element.take_children() {
        engine.evict_subtree(&child);
    }
}
