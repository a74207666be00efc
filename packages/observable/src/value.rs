//! Boxed observable values.

use std::rc::Rc;

use crate::subscriber::{SubscriberList, Subscription};
use std::cell::RefCell;

/// Change notification delivered to [`Observable`] subscribers.
#[derive(Debug, Clone)]
pub struct ValueChange<T> {
    pub new_value: T,
    pub old_value: T,
}

struct ObservableInner<T> {
    value: RefCell<T>,
    subscribers: SubscriberList<ValueChange<T>>,
}

/// A boxed mutable value with synchronous change subscription.
///
/// Cloning the handle shares the underlying box. Writing a value that
/// compares equal to the current one does not notify subscribers.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Observable {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Observable {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                subscribers: SubscriberList::new(),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Replace the value. Subscribers run before `set` returns; an
    /// equal-value write is dropped without notification.
    pub fn set(&self, value: T) {
        let old_value = {
            let mut slot = self.inner.value.borrow_mut();
            if *slot == value {
                return;
            }
            std::mem::replace(&mut *slot, value.clone())
        };

        self.inner.subscribers.notify(&ValueChange {
            new_value: value,
            old_value,
        });
    }

    pub fn subscribe(&self, callback: impl Fn(&ValueChange<T>) + 'static) -> Subscription {
        self.inner.subscribers.add(callback)
    }

    /// Subscribe a listener that detaches itself after the first change.
    pub fn subscribe_once(&self, callback: impl Fn(&ValueChange<T>) + 'static) -> Subscription {
        self.inner.subscribers.add_once(callback)
    }

    /// Whether two handles share the same underlying box.
    pub fn ptr_eq(&self, other: &Observable<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
