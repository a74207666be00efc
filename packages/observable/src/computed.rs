//! Derived values recomputed from tracked sources.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::array::{ArrayChange, ObservableArray};
use crate::subscriber::{SubscriberList, Subscription};
use crate::value::{Observable, ValueChange};

struct ComputedInner<T> {
    read: Box<dyn Fn() -> T>,
    write: RefCell<Option<Box<dyn Fn(&T)>>>,
    cached: RefCell<T>,
    subscribers: SubscriberList<ValueChange<T>>,
    // Held so dropping the computed detaches it from its sources.
    sources: RefCell<Vec<Subscription>>,
}

/// A value derived from other observables.
///
/// The read function is evaluated once at construction and again whenever a
/// tracked source changes; subscribers are notified when the recomputed
/// value differs from the cached one. An optional write function makes the
/// computed two-way: writes are routed through it into the sources, and the
/// resulting source notifications refresh the cache.
pub struct Computed<T: 'static> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Computed {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    pub fn new(read: impl Fn() -> T + 'static) -> Self {
        let cached = read();
        Computed {
            inner: Rc::new(ComputedInner {
                read: Box::new(read),
                write: RefCell::new(None),
                cached: RefCell::new(cached),
                subscribers: SubscriberList::new(),
                sources: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Attach a write function, making the computed two-way.
    pub fn with_write(self, write: impl Fn(&T) + 'static) -> Self {
        *self.inner.write.borrow_mut() = Some(Box::new(write));
        self
    }

    /// Recompute whenever `source` changes.
    pub fn track<S: Clone + PartialEq + 'static>(&self, source: &Observable<S>) {
        let weak = Rc::downgrade(&self.inner);
        let sub = source.subscribe(move |_: &ValueChange<S>| Self::refresh_weak(&weak));
        self.inner.sources.borrow_mut().push(sub);
    }

    /// Recompute whenever another computed changes.
    pub fn track_computed<S: Clone + PartialEq + 'static>(&self, source: &Computed<S>) {
        let weak = Rc::downgrade(&self.inner);
        let sub = source.subscribe(move |_: &ValueChange<S>| Self::refresh_weak(&weak));
        self.inner.sources.borrow_mut().push(sub);
    }

    /// Recompute whenever `source` changes at any granularity.
    pub fn track_array<S: Clone + 'static>(&self, source: &ObservableArray<S>) {
        let weak = Rc::downgrade(&self.inner);
        let sub = source.subscribe(move |_: &ArrayChange<S>| Self::refresh_weak(&weak));
        self.inner.sources.borrow_mut().push(sub);
    }

    fn refresh_weak(weak: &Weak<ComputedInner<T>>) {
        if let Some(inner) = weak.upgrade() {
            Self::refresh(&inner);
        }
    }

    fn refresh(inner: &Rc<ComputedInner<T>>) {
        let new_value = (inner.read)();
        let old_value = {
            let mut cached = inner.cached.borrow_mut();
            if *cached == new_value {
                return;
            }
            std::mem::replace(&mut *cached, new_value.clone())
        };

        inner.subscribers.notify(&ValueChange {
            new_value,
            old_value,
        });
    }

    pub fn get(&self) -> T {
        self.inner.cached.borrow().clone()
    }

    pub fn is_writable(&self) -> bool {
        self.inner.write.borrow().is_some()
    }

    /// Route a value through the write function into the sources.
    /// Returns false when the computed has no write side.
    pub fn set(&self, value: T) -> bool {
        let write = self.inner.write.borrow();
        match write.as_ref() {
            Some(write) => {
                write(&value);
                true
            }
            None => false,
        }
    }

    pub fn subscribe(&self, callback: impl Fn(&ValueChange<T>) + 'static) -> Subscription {
        self.inner.subscribers.add(callback)
    }

    pub fn subscribe_once(&self, callback: impl Fn(&ValueChange<T>) + 'static) -> Subscription {
        self.inner.subscribers.add_once(callback)
    }

    pub fn ptr_eq(&self, other: &Computed<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn recomputes_on_tracked_change() {
        let source = Observable::new(2);
        let doubled = {
            let source = source.clone();
            Computed::new(move || source.get() * 2)
        };
        doubled.track(&source);

        assert_eq!(doubled.get(), 4);
        source.set(5);
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn notifies_only_when_derived_value_changes() {
        let source = Observable::new(1);
        let sign = {
            let source = source.clone();
            Computed::new(move || source.get() > 0)
        };
        sign.track(&source);

        let hits = Rc::new(RefCell::new(0));
        let h = hits.clone();
        sign.subscribe(move |_| *h.borrow_mut() += 1).forget();

        source.set(7); // still positive, derived value unchanged
        assert_eq!(*hits.borrow(), 0);

        source.set(-1);
        assert_eq!(*hits.borrow(), 1);
        assert!(!sign.get());
    }

    #[test]
    fn write_routes_through_sources() {
        let source = Observable::new(10);
        let as_string = {
            let source = source.clone();
            Computed::new(move || source.get().to_string())
        };
        as_string.track(&source);
        let as_string = {
            let source = source.clone();
            as_string.with_write(move |text: &String| {
                if let Ok(parsed) = text.parse() {
                    source.set(parsed);
                }
            })
        };

        assert!(as_string.is_writable());
        assert!(as_string.set("42".to_string()));
        assert_eq!(source.get(), 42);
        assert_eq!(as_string.get(), "42");
    }

    #[test]
    fn tracks_array_sources() {
        let items = ObservableArray::new(vec![1, 2]);
        let total = {
            let items = items.clone();
            Computed::new(move || items.snapshot().iter().sum::<i32>())
        };
        total.track_array(&items);

        assert_eq!(total.get(), 3);
        items.push(4);
        assert_eq!(total.get(), 7);
    }
}
