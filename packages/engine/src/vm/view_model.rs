//! View-model objects: insertion-ordered bags of reactive properties.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use imagine_observable::{Computed, Observable, ObservableArray};
use indexmap::IndexMap;

use super::value::{Action, Transform, Value};
use crate::dom::Event;

/// One property of a view-model.
#[derive(Clone)]
pub enum Property {
    /// Reactive box; bindings subscribe to it.
    Observable(Observable<Value>),
    /// Derived value, optionally writable back through its sources.
    Computed(Computed<Value>),
    /// Non-reactive value; bindings read it once.
    Plain(Value),
}

impl Property {
    /// The current value, read through the reactive wrapper.
    pub fn get(&self) -> Value {
        match self {
            Property::Observable(observable) => observable.get(),
            Property::Computed(computed) => computed.get(),
            Property::Plain(value) => value.clone(),
        }
    }

    pub fn is_observable(&self) -> bool {
        !matches!(self, Property::Plain(_))
    }
}

struct VmInner {
    properties: RefCell<IndexMap<String, Property>>,
}

/// Shared handle to a view-model object.
#[derive(Clone)]
pub struct Vm {
    inner: Rc<VmInner>,
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            inner: Rc::new(VmInner {
                properties: RefCell::new(IndexMap::new()),
            }),
        }
    }

    pub fn ptr_eq(&self, other: &Vm) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn define(&self, name: &str, property: Property) {
        self.inner
            .properties
            .borrow_mut()
            .insert(name.to_string(), property);
    }

    /// Define a reactive property and return its box.
    pub fn define_observable(&self, name: &str, initial: Value) -> Observable<Value> {
        let observable = Observable::new(initial);
        self.define(name, Property::Observable(observable.clone()));
        observable
    }

    /// Define a reactive property holding an observable array.
    pub fn define_array(&self, name: &str, items: Vec<Value>) -> ObservableArray<Value> {
        let array = ObservableArray::new(items);
        self.define_observable(name, Value::Array(array.clone()));
        array
    }

    pub fn define_computed(&self, name: &str, computed: Computed<Value>) {
        self.define(name, Property::Computed(computed));
    }

    pub fn define_plain(&self, name: &str, value: Value) {
        self.define(name, Property::Plain(value));
    }

    pub fn define_action(&self, name: &str, callback: impl Fn(&Vm, &Event) + 'static) {
        self.define_plain(name, Value::Action(Action::new(callback)));
    }

    pub fn define_transform(&self, name: &str, transform: Transform) {
        self.define_plain(name, Value::Transform(transform));
    }

    pub fn has(&self, name: &str) -> bool {
        self.inner.properties.borrow().contains_key(name)
    }

    pub fn property(&self, name: &str) -> Option<Property> {
        self.inner.properties.borrow().get(name).cloned()
    }

    /// Read a property value through its reactive wrapper.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.property(name).map(|property| property.get())
    }

    /// Write a property value through its reactive wrapper. Returns false
    /// when the property does not exist or is a read-only computed.
    pub fn set(&self, name: &str, value: Value) -> bool {
        let Some(property) = self.property(name) else {
            return false;
        };
        match property {
            Property::Observable(observable) => {
                observable.set(value);
                true
            }
            Property::Computed(computed) => computed.set(value),
            Property::Plain(_) => {
                self.define(name, Property::Plain(value));
                true
            }
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.properties.borrow().keys().cloned().collect()
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

impl PartialEq for Vm {
    fn eq(&self, other: &Vm) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Vm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vm{:?}", self.keys())
    }
}
