//! Dynamic runtime values flowing between view-models and the DOM.

use std::fmt;
use std::rc::Rc;

use imagine_observable::ObservableArray;

use super::view_model::Vm;
use crate::dom::Event;

/// A view-model property value.
///
/// `Object` and `Array` are shared handles; equality on them is identity,
/// the way the change-suppression of the reactive substrate expects.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Object(Vm),
    Array(ObservableArray<Value>),
    Action(Action),
    Transform(Transform),
}

impl Value {
    pub fn str(value: impl Into<String>) -> Value {
        Value::Str(value.into())
    }

    pub fn number(value: f64) -> Value {
        Value::Number(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Object(_) | Value::Array(_) | Value::Action(_) | Value::Transform(_) => true,
        }
    }

    pub fn as_object(&self) -> Option<&Vm> {
        match self {
            Value::Object(vm) => Some(vm),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ObservableArray<Value>> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&Action> {
        match self {
            Value::Action(action) => Some(action),
            _ => None,
        }
    }

    pub fn as_transform(&self) -> Option<&Transform> {
        match self {
            Value::Transform(transform) => Some(transform),
            _ => None,
        }
    }

    /// Rendering of the value as DOM text.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Value::Str(s) => s.clone(),
            Value::Object(_) => "[object]".to_string(),
            Value::Array(_) => "[array]".to_string(),
            Value::Action(_) => "[action]".to_string(),
            Value::Transform(_) => "[transform]".to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Action(a), Value::Action(b)) => Rc::ptr_eq(&a.callback, &b.callback),
            (Value::Transform(a), Value::Transform(b)) => Rc::ptr_eq(&a.read, &b.read),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(vm) => write!(f, "Object({vm:?})"),
            Value::Array(array) => write!(f, "Array(len={})", array.len()),
            Value::Action(_) => write!(f, "Action"),
            Value::Transform(_) => write!(f, "Transform"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Value {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::Str(value)
    }
}

impl From<Vm> for Value {
    fn from(value: Vm) -> Value {
        Value::Object(value)
    }
}

/// A callback invokable from event bindings, called with the view-model the
/// binding originated in and the DOM event.
#[derive(Clone)]
pub struct Action {
    callback: Rc<dyn Fn(&Vm, &Event)>,
}

impl Action {
    pub fn new(callback: impl Fn(&Vm, &Event) + 'static) -> Self {
        Action {
            callback: Rc::new(callback),
        }
    }

    pub fn invoke(&self, vm: &Vm, event: &Event) {
        (self.callback)(vm, event);
    }
}

/// A unary value transform, optionally invertible for two-way bindings.
#[derive(Clone)]
pub struct Transform {
    read: Rc<dyn Fn(&Value) -> Value>,
    write: Option<Rc<dyn Fn(&Value) -> Value>>,
}

impl Transform {
    pub fn new(read: impl Fn(&Value) -> Value + 'static) -> Self {
        Transform {
            read: Rc::new(read),
            write: None,
        }
    }

    pub fn two_way(
        read: impl Fn(&Value) -> Value + 'static,
        write: impl Fn(&Value) -> Value + 'static,
    ) -> Self {
        Transform {
            read: Rc::new(read),
            write: Some(Rc::new(write)),
        }
    }

    pub fn read(&self, value: &Value) -> Value {
        (self.read)(value)
    }

    pub fn write(&self, value: &Value) -> Option<Value> {
        self.write.as_ref().map(|write| write(value))
    }

    pub fn is_two_way(&self) -> bool {
        self.write.is_some()
    }
}
