//! Element-keyed binding context registry.
//!
//! The single piece of shared mutable state in the engine. Keys are weak
//! node references hashed by node address, so a context dies with its
//! element; entries for subtrees the engine itself removes are evicted
//! explicitly, and dead weak keys are swept opportunistically.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::context::BindingContext;
use crate::dom::{Node, NodeRef};

struct ElementContexts {
    element: Weak<Node>,
    bindings: IndexMap<String, Rc<BindingContext>>,
}

pub struct ContextRegistry {
    entries: RefCell<HashMap<usize, ElementContexts>>,
}

fn key_of(element: &NodeRef) -> usize {
    Rc::as_ptr(element) as usize
}

impl ContextRegistry {
    pub fn new() -> Self {
        ContextRegistry {
            entries: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, element: &NodeRef, identity: &str) -> Option<Rc<BindingContext>> {
        let entries = self.entries.borrow();
        let entry = entries.get(&key_of(element))?;
        if !entry_matches(entry, element) {
            return None;
        }
        entry.bindings.get(identity).cloned()
    }

    pub fn insert(&self, element: &NodeRef, identity: &str, context: Rc<BindingContext>) {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.entry(key_of(element)).or_insert_with(|| ElementContexts {
            element: Rc::downgrade(element),
            bindings: IndexMap::new(),
        });
        if !entry_matches(entry, element) {
            // The address was reused by a new node; the stale entry goes.
            *entry = ElementContexts {
                element: Rc::downgrade(element),
                bindings: IndexMap::new(),
            };
        }
        entry.bindings.insert(identity.to_string(), context);
    }

    pub fn remove_binding(&self, element: &NodeRef, identity: &str) -> Option<Rc<BindingContext>> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries.get_mut(&key_of(element))?;
        if !entry_matches(entry, element) {
            return None;
        }
        entry.bindings.shift_remove(identity)
    }

    /// All live bindings of an element, in creation order.
    pub fn contexts_of(&self, element: &NodeRef) -> Vec<(String, Rc<BindingContext>)> {
        let entries = self.entries.borrow();
        match entries.get(&key_of(element)) {
            Some(entry) if entry_matches(entry, element) => entry
                .bindings
                .iter()
                .map(|(identity, context)| (identity.clone(), Rc::clone(context)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Identity of the binding already controlling this element's children.
    pub fn child_controller_of(&self, element: &NodeRef) -> Option<String> {
        self.contexts_of(element)
            .into_iter()
            .find(|(_, context)| context.controls_children.get())
            .map(|(identity, _)| identity)
    }

    /// Remove the entries for an element and its whole subtree, dropping
    /// their live subscriptions.
    pub fn evict(&self, element: &NodeRef) {
        self.evict_one(element);
        for descendant in crate::dom::NodeExt::descendants(element) {
            self.evict_one(&descendant);
        }
        self.sweep();
    }

    fn evict_one(&self, element: &NodeRef) {
        let matches = {
            let entries = self.entries.borrow();
            entries
                .get(&key_of(element))
                .map(|entry| entry_matches(entry, element))
                .unwrap_or(false)
        };
        if !matches {
            return;
        }
        let removed = self.entries.borrow_mut().remove(&key_of(element));
        if let Some(entry) = removed {
            for context in entry.bindings.values() {
                context.subscriptions.borrow_mut().clear();
                context.array_subscription.borrow_mut().take();
            }
        }
    }

    /// Drop entries whose element is gone.
    pub fn sweep(&self) {
        self.entries
            .borrow_mut()
            .retain(|_, entry| entry.element.upgrade().is_some());
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        ContextRegistry::new()
    }
}

fn entry_matches(entry: &ElementContexts, element: &NodeRef) -> bool {
    entry
        .element
        .upgrade()
        .map(|live| Rc::ptr_eq(&live, element))
        .unwrap_or(false)
}
