//! Mutable DOM tree.
//!
//! Nodes are reference-counted handles; parents hold strong references to
//! children, children hold weak references to parents. Elements additionally
//! carry dynamic host-property slots (observable boxes, declared via the
//! capability schema or created by the engine) and target-dispatched event
//! listeners.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use imagine_observable::Observable;
use indexmap::IndexMap;

use super::tags::is_custom_element_name;
use crate::vm::Value;

pub type NodeRef = Rc<Node>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Fragment,
}

/// An event delivered to listeners on its target node.
#[derive(Clone)]
pub struct Event {
    pub name: String,
    pub target: NodeRef,
    pub data: Value,
}

/// A dynamic host-property slot on an element.
///
/// `declared` slots come from the element's capability schema;
/// undeclared slots are created on demand by the binding engine.
#[derive(Clone)]
pub struct HostProperty {
    pub value: Observable<Value>,
    pub declared: bool,
    /// DOM event the element fires when the property changes on its own.
    pub notify_event: Option<String>,
}

struct ListenerEntry {
    id: u64,
    event: String,
    callback: Rc<dyn Fn(&Event)>,
}

pub struct Node {
    kind: NodeKind,
    tag: String,
    text: RefCell<String>,
    attributes: RefCell<IndexMap<String, String>>,
    children: RefCell<Vec<NodeRef>>,
    parent: RefCell<Weak<Node>>,
    properties: RefCell<IndexMap<String, HostProperty>>,
    listeners: RefCell<Vec<ListenerEntry>>,
    next_listener_id: Cell<u64>,
    display: RefCell<Option<String>>,
    template_id: Cell<Option<u32>>,
}

impl Node {
    fn new(kind: NodeKind, tag: String, text: String) -> NodeRef {
        Rc::new(Node {
            kind,
            tag,
            text: RefCell::new(text),
            attributes: RefCell::new(IndexMap::new()),
            children: RefCell::new(Vec::new()),
            parent: RefCell::new(Weak::new()),
            properties: RefCell::new(IndexMap::new()),
            listeners: RefCell::new(Vec::new()),
            next_listener_id: Cell::new(0),
            display: RefCell::new(None),
            template_id: Cell::new(None),
        })
    }

    pub fn element(tag: &str) -> NodeRef {
        Node::new(NodeKind::Element, tag.to_string(), String::new())
    }

    pub fn text(content: &str) -> NodeRef {
        Node::new(NodeKind::Text, String::new(), content.to_string())
    }

    pub fn comment(content: &str) -> NodeRef {
        Node::new(NodeKind::Comment, String::new(), content.to_string())
    }

    pub fn fragment() -> NodeRef {
        Node::new(NodeKind::Fragment, String::new(), String::new())
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    pub fn is_fragment(&self) -> bool {
        self.kind == NodeKind::Fragment
    }

    pub fn tag_name(&self) -> &str {
        &self.tag
    }

    pub fn is_custom_element(&self) -> bool {
        self.is_element() && is_custom_element_name(&self.tag)
    }

    /// Raw text of a text or comment node.
    pub fn node_text(&self) -> String {
        self.text.borrow().clone()
    }

    pub fn set_node_text(&self, content: &str) {
        *self.text.borrow_mut() = content.to_string();
    }

    // ---- attributes ----------------------------------------------------

    pub fn set_attribute(&self, name: &str, value: &str) {
        self.attributes
            .borrow_mut()
            .insert(name.to_string(), value.to_string());
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.attributes.borrow().get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.borrow().contains_key(name)
    }

    pub fn remove_attribute(&self, name: &str) {
        self.attributes.borrow_mut().shift_remove(name);
    }

    /// Attributes in declaration order.
    pub fn attributes_snapshot(&self) -> Vec<(String, String)> {
        self.attributes
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    // ---- tree ----------------------------------------------------------

    pub fn children(&self) -> Vec<NodeRef> {
        self.children.borrow().clone()
    }

    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    pub fn first_child(&self) -> Option<NodeRef> {
        self.children.borrow().first().cloned()
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.borrow().upgrade()
    }

    /// Detach all children and return them.
    pub fn take_children(&self) -> Vec<NodeRef> {
        let children = std::mem::take(&mut *self.children.borrow_mut());
        for child in &children {
            *child.parent.borrow_mut() = Weak::new();
        }
        children
    }

    pub fn clear_children(&self) {
        self.take_children();
    }

    pub fn remove_child(&self, child: &NodeRef) -> bool {
        let mut children = self.children.borrow_mut();
        if let Some(index) = children.iter().position(|c| Rc::ptr_eq(c, child)) {
            children.remove(index);
            *child.parent.borrow_mut() = Weak::new();
            true
        } else {
            false
        }
    }

    /// Remove this node from its parent, if attached.
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            let mut children = parent.children.borrow_mut();
            if let Some(index) = children
                .iter()
                .position(|c| std::ptr::eq(Rc::as_ptr(c), self))
            {
                children.remove(index);
            }
            *self.parent.borrow_mut() = Weak::new();
        }
    }

    /// Replace this node in its parent with `replacements`.
    pub fn replace_with(&self, replacements: Vec<NodeRef>) {
        let Some(parent) = self.parent() else { return };
        let index = {
            let children = parent.children.borrow();
            children
                .iter()
                .position(|c| std::ptr::eq(Rc::as_ptr(c), self))
        };
        let Some(index) = index else { return };

        {
            let mut children = parent.children.borrow_mut();
            children.remove(index);
            for (offset, node) in replacements.iter().enumerate() {
                node.detach_for_insert();
                children.insert(index + offset, Rc::clone(node));
            }
        }
        *self.parent.borrow_mut() = Weak::new();
        for node in &replacements {
            *node.parent.borrow_mut() = Rc::downgrade(&parent);
        }
    }

    fn detach_for_insert(&self) {
        self.detach();
    }

    // ---- display / template id ----------------------------------------

    pub fn display(&self) -> Option<String> {
        self.display.borrow().clone()
    }

    pub fn set_display(&self, value: Option<String>) {
        *self.display.borrow_mut() = value;
    }

    pub fn template_id(&self) -> Option<u32> {
        self.template_id.get()
    }

    pub fn set_template_id(&self, id: u32) {
        self.template_id.set(Some(id));
    }

    // ---- host properties ----------------------------------------------

    /// Declare a live host property (capability schema).
    pub fn declare_property(&self, name: &str, initial: Value) -> HostProperty {
        self.insert_property(name, initial, true, None)
    }

    /// Declare a live host property that announces its own changes through
    /// a DOM event of the given name.
    pub fn declare_property_with_event(
        &self,
        name: &str,
        initial: Value,
        event: &str,
    ) -> HostProperty {
        self.insert_property(name, initial, true, Some(event.to_string()))
    }

    fn insert_property(
        &self,
        name: &str,
        initial: Value,
        declared: bool,
        notify_event: Option<String>,
    ) -> HostProperty {
        let slot = HostProperty {
            value: Observable::new(initial),
            declared,
            notify_event,
        };
        self.properties
            .borrow_mut()
            .insert(name.to_string(), slot.clone());
        slot
    }

    /// The declared slot for `name`, if the element's schema declares one.
    pub fn declared_property(&self, name: &str) -> Option<HostProperty> {
        self.properties
            .borrow()
            .get(name)
            .filter(|slot| slot.declared)
            .cloned()
    }

    pub fn property_slot(&self, name: &str) -> Option<HostProperty> {
        self.properties.borrow().get(name).cloned()
    }

    /// The slot for `name`, creating an undeclared engine-owned slot when
    /// the schema does not provide one.
    pub fn ensure_property(&self, name: &str, initial: Value) -> HostProperty {
        if let Some(slot) = self.property_slot(name) {
            return slot;
        }
        self.insert_property(name, initial, false, None)
    }

    pub fn set_property(&self, name: &str, value: Value) {
        self.ensure_property(name, Value::Null).value.set(value);
    }

    pub fn get_property(&self, name: &str) -> Option<Value> {
        self.property_slot(name).map(|slot| slot.value.get())
    }

    // ---- events --------------------------------------------------------

    pub fn add_event_listener(&self, event: &str, callback: impl Fn(&Event) + 'static) -> u64 {
        let id = self.next_listener_id.get();
        self.next_listener_id.set(id + 1);
        self.listeners.borrow_mut().push(ListenerEntry {
            id,
            event: event.to_string(),
            callback: Rc::new(callback),
        });
        id
    }

    pub fn remove_event_listener(&self, id: u64) {
        self.listeners.borrow_mut().retain(|entry| entry.id != id);
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            NodeKind::Element => write!(f, "<{}>", self.tag),
            NodeKind::Text => write!(f, "#text({:?})", self.text.borrow()),
            NodeKind::Comment => write!(f, "#comment"),
            NodeKind::Fragment => write!(f, "#fragment"),
        }
    }
}

/// Tree operations that need the reference-counted handle itself.
pub trait NodeExt {
    fn append_child(&self, child: &NodeRef);
    fn insert_child_at(&self, index: usize, child: &NodeRef);
    fn insert_before(&self, child: &NodeRef, reference: &NodeRef);
    fn deep_clone(&self) -> NodeRef;
    fn find_by_template_id(&self, id: u32) -> Option<NodeRef>;
    fn dispatch_event(&self, name: &str, data: Value);
    fn text_content(&self) -> String;
    fn set_text_content(&self, content: &str);
    fn descendants(&self) -> Vec<NodeRef>;
}

impl NodeExt for NodeRef {
    fn append_child(&self, child: &NodeRef) {
        child.detach();
        self.children.borrow_mut().push(Rc::clone(child));
        *child.parent.borrow_mut() = Rc::downgrade(self);
    }

    fn insert_child_at(&self, index: usize, child: &NodeRef) {
        child.detach();
        let mut children = self.children.borrow_mut();
        let index = index.min(children.len());
        children.insert(index, Rc::clone(child));
        drop(children);
        *child.parent.borrow_mut() = Rc::downgrade(self);
    }

    fn insert_before(&self, child: &NodeRef, reference: &NodeRef) {
        let index = {
            let children = self.children.borrow();
            children.iter().position(|c| Rc::ptr_eq(c, reference))
        };
        match index {
            Some(index) => self.insert_child_at(index, child),
            None => self.append_child(child),
        }
    }

    /// Structural clone: kind, tag, text, attributes, display, template id
    /// and children. Declared host-property slots are re-created as fresh
    /// boxes seeded with the current value, the way an upgraded custom
    /// element re-exposes its schema; engine-owned slots and listeners are
    /// not cloned.
    fn deep_clone(&self) -> NodeRef {
        let clone = Node::new(self.kind, self.tag.clone(), self.text.borrow().clone());
        *clone.attributes.borrow_mut() = self.attributes.borrow().clone();
        *clone.display.borrow_mut() = self.display.borrow().clone();
        clone.template_id.set(self.template_id.get());
        for (name, slot) in self.properties.borrow().iter() {
            if slot.declared {
                clone.properties.borrow_mut().insert(
                    name.clone(),
                    HostProperty {
                        value: Observable::new(slot.value.get()),
                        declared: true,
                        notify_event: slot.notify_event.clone(),
                    },
                );
            }
        }
        for child in self.children.borrow().iter() {
            clone.append_child(&child.deep_clone());
        }
        clone
    }

    fn find_by_template_id(&self, id: u32) -> Option<NodeRef> {
        if self.template_id.get() == Some(id) {
            return Some(Rc::clone(self));
        }
        for child in self.children.borrow().iter() {
            if let Some(found) = child.find_by_template_id(id) {
                return Some(found);
            }
        }
        None
    }

    fn dispatch_event(&self, name: &str, data: Value) {
        let event = Event {
            name: name.to_string(),
            target: Rc::clone(self),
            data,
        };
        let callbacks: Vec<Rc<dyn Fn(&Event)>> = self
            .listeners
            .borrow()
            .iter()
            .filter(|entry| entry.event == name)
            .map(|entry| Rc::clone(&entry.callback))
            .collect();
        for callback in callbacks {
            callback(&event);
        }
    }

    fn text_content(&self) -> String {
        match self.kind {
            NodeKind::Text => self.text.borrow().clone(),
            NodeKind::Comment => String::new(),
            _ => {
                let mut out = String::new();
                for child in self.children.borrow().iter() {
                    out.push_str(&child.text_content());
                }
                out
            }
        }
    }

    fn set_text_content(&self, content: &str) {
        if self.kind == NodeKind::Text {
            self.set_node_text(content);
            return;
        }
        self.clear_children();
        if !content.is_empty() {
            self.append_child(&Node::text(content));
        }
    }

    fn descendants(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        for child in self.children.borrow().iter() {
            out.push(Rc::clone(child));
            out.extend(child.descendants());
        }
        out
    }
}

/// Drop whitespace-only text nodes and merge adjacent text nodes, the way
/// templates are cleaned before being captured.
pub fn normalize_template(node: &NodeRef) {
    let children = node.children();
    let mut merged: Vec<NodeRef> = Vec::with_capacity(children.len());
    for child in children {
        if child.is_text() {
            let content = child.node_text();
            if content.trim().is_empty() {
                child.detach();
                continue;
            }
            if let Some(last) = merged.last() {
                if last.is_text() {
                    last.set_node_text(&format!("{}{}", last.node_text(), content));
                    child.detach();
                    continue;
                }
            }
        }
        merged.push(child);
    }
    for child in &merged {
        if child.is_element() {
            normalize_template(child);
        }
    }
}
