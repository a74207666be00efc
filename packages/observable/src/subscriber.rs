//! Subscriber bookkeeping shared by all observable kinds.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

struct Entry<A> {
    id: u64,
    callback: Rc<dyn Fn(&A)>,
    once: bool,
}

/// An id-addressed list of change listeners.
///
/// Notification iterates over a snapshot, so listeners may subscribe or
/// unsubscribe (including themselves) while a notification is in flight.
pub struct SubscriberList<A> {
    entries: Rc<RefCell<Vec<Entry<A>>>>,
    next_id: Cell<u64>,
}

impl<A: 'static> SubscriberList<A> {
    pub fn new() -> Self {
        SubscriberList {
            entries: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    pub fn add(&self, callback: impl Fn(&A) + 'static) -> Subscription {
        self.add_entry(callback, false)
    }

    /// Add a listener that detaches itself after its first invocation.
    pub fn add_once(&self, callback: impl Fn(&A) + 'static) -> Subscription {
        self.add_entry(callback, true)
    }

    fn add_entry(&self, callback: impl Fn(&A) + 'static, once: bool) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.entries.borrow_mut().push(Entry {
            id,
            callback: Rc::new(callback),
            once,
        });

        let weak: Weak<RefCell<Vec<Entry<A>>>> = Rc::downgrade(&self.entries);
        Subscription::new(move || {
            if let Some(entries) = weak.upgrade() {
                entries.borrow_mut().retain(|entry| entry.id != id);
            }
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn notify(&self, change: &A) {
        let snapshot: Vec<Rc<dyn Fn(&A)>> = {
            let mut entries = self.entries.borrow_mut();
            let snapshot = entries.iter().map(|e| Rc::clone(&e.callback)).collect();
            entries.retain(|e| !e.once);
            snapshot
        };

        for callback in snapshot {
            callback(change);
        }
    }
}

impl<A: 'static> Default for SubscriberList<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to an attached listener. Dropping the handle detaches it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Subscription {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Detach the listener now.
    pub fn dispose(self) {
        drop(self);
    }

    /// Leave the listener attached for the lifetime of the observed value.
    pub fn forget(mut self) {
        self.cancel = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
