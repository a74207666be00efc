//! Persistent per-(element, binding-identity) state.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use imagine_observable::Subscription;

use super::guard::UpdateGuard;
use super::parser::{BindingProperties, BindingValue};
use super::template_cache::TemplateCache;
use crate::dom::NodeRef;
use crate::vm::Vm;

/// Handler-local state stored in the context.
pub enum HandlerState {
    None,
    /// foreach: per-index list of the top-level nodes rendered for the
    /// item at that index.
    ItemBlocks(Vec<Vec<NodeRef>>),
    /// visible: the element's display value before the binding touched it.
    InitialDisplay(Option<String>),
}

/// Binding context: everything a binding needs across its lifetime.
///
/// Created once per (element, binding-identity) on first parse; discarded
/// and rebuilt wholesale when a dependency-tree invalidation forces a
/// rebind. Entries live in the engine's weakly keyed registry and die with
/// their element.
pub struct BindingContext {
    /// Handler name; with the parameter it forms the binding identity.
    pub handler: String,
    pub parameter: RefCell<Option<String>>,
    /// Scope object the binding reads and writes.
    pub vm: Vm,
    /// View-model of the surrounding walk; child-controlling handlers bind
    /// their generated content against this.
    pub original_vm: Vm,
    pub parent_vm: Option<Vm>,
    pub property_name: String,
    /// Raw attribute, kept for re-parsing on scope invalidation.
    pub attr_key: String,
    pub attr_value: String,
    pub guard: UpdateGuard,
    pub controls_children: Cell<bool>,
    /// Detached child nodes, for handlers that manage their own children.
    pub template: RefCell<Vec<NodeRef>>,
    pub state: RefCell<HandlerState>,
    /// Shadow template and pre-resolved descriptors for the list fast
    /// path.
    pub cache: RefCell<Option<TemplateCache>>,
    pub binding_value: RefCell<Option<BindingValue>>,
    /// Live subscriptions owned by this binding; dropped with the context.
    pub subscriptions: RefCell<Vec<Subscription>>,
    pub array_subscription: RefCell<Option<Subscription>>,
}

impl BindingContext {
    pub fn from_properties(properties: &BindingProperties) -> Rc<Self> {
        Rc::new(BindingContext {
            handler: properties.handler.clone(),
            parameter: RefCell::new(properties.parameter.clone()),
            vm: properties.scope.clone(),
            original_vm: properties.vm.clone(),
            parent_vm: properties.parent_vm.clone(),
            property_name: properties.property_name.clone(),
            attr_key: properties.attr_key.clone(),
            attr_value: properties.attr_value.clone(),
            guard: UpdateGuard::new(),
            controls_children: Cell::new(false),
            template: RefCell::new(Vec::new()),
            state: RefCell::new(HandlerState::None),
            cache: RefCell::new(None),
            binding_value: RefCell::new(Some(properties.value.clone())),
            subscriptions: RefCell::new(Vec::new()),
            array_subscription: RefCell::new(None),
        })
    }

    /// A plain marker context, used for fragment template roots.
    pub fn marker(handler: &str, vm: &Vm) -> Rc<Self> {
        Rc::new(BindingContext {
            handler: handler.to_string(),
            parameter: RefCell::new(None),
            vm: vm.clone(),
            original_vm: vm.clone(),
            parent_vm: None,
            property_name: String::new(),
            attr_key: String::new(),
            attr_value: String::new(),
            guard: UpdateGuard::new(),
            controls_children: Cell::new(false),
            template: RefCell::new(Vec::new()),
            state: RefCell::new(HandlerState::None),
            cache: RefCell::new(None),
            binding_value: RefCell::new(None),
            subscriptions: RefCell::new(Vec::new()),
            array_subscription: RefCell::new(None),
        })
    }

    /// Binding identity: handler name plus optional parameter.
    pub fn identity_of(handler: &str, parameter: Option<&str>) -> String {
        match parameter {
            Some(parameter) => format!("{handler}:{parameter}"),
            None => handler.to_string(),
        }
    }

    pub fn identity(&self) -> String {
        Self::identity_of(&self.handler, self.parameter.borrow().as_deref())
    }

    pub fn current_value(&self) -> crate::vm::Value {
        self.binding_value
            .borrow()
            .as_ref()
            .map(|value| value.current())
            .unwrap_or(crate::vm::Value::Null)
    }
}
