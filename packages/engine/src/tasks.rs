//! Deferred-attach task queue.
//!
//! The two-phase initialization contract: bindings are discovered and
//! declared synchronously, attachment steps that must wait for the rest of
//! the current pass (host-property wiring, injected-markup binding,
//! selection hookup) are queued here and drained at an explicit
//! synchronization point — the end of a bind pass, or a caller-invoked
//! flush.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

type Task = Box<dyn FnOnce()>;

pub struct TaskQueue {
    queue: RefCell<VecDeque<Task>>,
    flushing: Cell<bool>,
}

impl TaskQueue {
    pub fn new() -> Self {
        TaskQueue {
            queue: RefCell::new(VecDeque::new()),
            flushing: Cell::new(false),
        }
    }

    pub fn defer(&self, task: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(task));
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Run queued tasks until the queue is empty, including tasks queued
    /// while draining. Re-entrant flushes fold into the outer one.
    pub fn flush(&self) {
        if self.flushing.get() {
            return;
        }
        self.flushing.set(true);
        loop {
            let task = self.queue.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        self.flushing.set(false);
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        TaskQueue::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn drains_in_order_including_requeues() {
        let queue = Rc::new(TaskQueue::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let l1 = log.clone();
        let l2 = log.clone();
        let q2 = queue.clone();
        queue.defer(move || l1.borrow_mut().push(1));
        queue.defer(move || {
            l2.borrow_mut().push(2);
            let l3 = l2.clone();
            q2.defer(move || l3.borrow_mut().push(3));
        });

        queue.flush();
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert!(queue.is_empty());
    }
}
