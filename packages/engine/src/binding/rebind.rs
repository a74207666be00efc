//! Dependency-tree retry / rebind records.
//!
//! When resolving a multi-segment path walks through intermediate members,
//! the traversed `(object, property)` pairs form the binding's dependency
//! tree. A [`PendingRebind`] keeps everything needed to start over from the
//! raw attribute: the element, the attribute strings, the view-models, any
//! children that were provisionally removed while the binding could not
//! render, and the one-shot subscriptions waiting on the tree. The first
//! pair that changes disposes all listeners of the attempt and re-parses
//! the binding wholesale; there is no partial patching.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use imagine_observable::Subscription;

use crate::dom::NodeRef;
use crate::vm::Vm;

pub struct PendingRebind {
    pub element: NodeRef,
    pub attr_key: String,
    pub attr_value: String,
    pub vm: Vm,
    pub parent_vm: Option<Vm>,
    /// Children detached while the binding could not render; restored
    /// before the retry re-parses.
    pub removed_children: RefCell<Vec<NodeRef>>,
    subscriptions: RefCell<Vec<Subscription>>,
    fired: Cell<bool>,
}

impl PendingRebind {
    pub fn new(
        element: &NodeRef,
        attr_key: &str,
        attr_value: &str,
        vm: &Vm,
        parent_vm: Option<&Vm>,
        removed_children: Vec<NodeRef>,
    ) -> Self {
        PendingRebind {
            element: Rc::clone(element),
            attr_key: attr_key.to_string(),
            attr_value: attr_value.to_string(),
            vm: vm.clone(),
            parent_vm: parent_vm.cloned(),
            removed_children: RefCell::new(removed_children),
            subscriptions: RefCell::new(Vec::new()),
            fired: Cell::new(false),
        }
    }

    pub fn add_subscription(&self, subscription: Subscription) {
        self.subscriptions.borrow_mut().push(subscription);
    }

    /// Claim the single permitted firing. Returns false when another
    /// listener of the same attempt got here first.
    pub fn claim(&self) -> bool {
        !self.fired.replace(true)
    }

    /// Dispose every listener still waiting on the dependency tree.
    pub fn cancel_listeners(&self) {
        self.subscriptions.borrow_mut().clear();
    }

    /// Put the provisionally removed children back on the element.
    pub fn restore_children(&self) -> Vec<NodeRef> {
        let removed: Vec<NodeRef> = self.removed_children.borrow_mut().drain(..).collect();
        for child in &removed {
            crate::dom::NodeExt::append_child(&self.element, child);
        }
        removed
    }
}
