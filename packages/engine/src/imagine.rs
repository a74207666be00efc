//! Root orchestrator.
//!
//! Walks a DOM subtree, discovers binding attributes and inline
//! interpolations, and delegates parsing, initialization and updates to
//! the binding engine. Within one element every binding is initialized
//! before any is updated, engine attributes are removed once bound, and
//! the walk never descends into content a child-controlling handler owns.

use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::binding::engine::BindingEngine;
use crate::binding::parser::ParsedBinding;
use crate::binding::rebind::PendingRebind;
use crate::binding::scope_resolver::resolve_path;
use crate::dom::{Node, NodeRef};
use crate::error::BindingError;
use crate::expression_parser::{self, BindingExpression};
use crate::vm::{Transform, Value, Vm};

/// Directive element registering a named transform.
const CONTROL_TRANSFORM_TAG: &str = "control-transform";

static INTERPOLATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^{}]+)\}").expect("interpolation pattern is valid"));

/// Engine configuration. Defaults keep every documented behavior on.
#[derive(Debug, Clone)]
pub struct ImagineOptions {
    /// Use the shadow-template fast path for list rendering.
    pub template_cache: bool,
    /// Raise type mismatches (array into a scalar binding and the reverse)
    /// as fatal errors instead of warnings.
    pub strict_typing: bool,
}

impl ImagineOptions {
    pub fn new() -> Self {
        ImagineOptions {
            template_cache: true,
            strict_typing: true,
        }
    }

    pub fn template_cache(mut self, enabled: bool) -> Self {
        self.template_cache = enabled;
        self
    }

    pub fn strict_typing(mut self, enabled: bool) -> Self {
        self.strict_typing = enabled;
        self
    }
}

impl Default for ImagineOptions {
    fn default() -> Self {
        ImagineOptions::new()
    }
}

/// The public entry point: owns one binding engine instance with its scope
/// registry, transform registry and task queue.
pub struct Imagine {
    engine: Rc<BindingEngine>,
}

impl Imagine {
    pub fn new() -> Self {
        Imagine::with_options(ImagineOptions::new())
    }

    pub fn with_options(options: ImagineOptions) -> Self {
        Imagine {
            engine: BindingEngine::new(options),
        }
    }

    pub fn engine(&self) -> &Rc<BindingEngine> {
        &self.engine
    }

    /// Register a view-model under a name usable in property paths
    /// independent of DOM nesting.
    pub fn register_scope(&self, name: &str, vm: &Vm) -> Result<(), BindingError> {
        self.engine.scopes().register(name, vm)
    }

    /// Register a named transform for `name(path)` expressions.
    pub fn register_transform(&self, name: &str, transform: Transform) {
        self.engine.register_transform(name, transform);
    }

    /// Walk and bind a subtree against `vm`, then drain the deferred-attach
    /// queue.
    pub fn bind(&self, vm: &Vm, root: &NodeRef) -> Result<(), BindingError> {
        bind_subtree(&self.engine, vm, None, root)?;
        self.engine.tasks().flush();
        Ok(())
    }

    /// JSON snapshot of an element's live bindings.
    pub fn describe_bindings(&self, element: &NodeRef) -> serde_json::Value {
        crate::diagnostics::describe_bindings(&self.engine, element)
    }
}

impl Default for Imagine {
    fn default() -> Self {
        Imagine::new()
    }
}

/// Walk a (possibly detached) subtree. Fragment roots register their
/// top-level children under a `template` marker context first, so later
/// teardown can find them in the registry.
pub(crate) fn bind_subtree(
    engine: &Rc<BindingEngine>,
    vm: &Vm,
    parent: Option<&Vm>,
    root: &NodeRef,
) -> Result<(), BindingError> {
    if root.is_fragment() {
        for child in root.children() {
            engine.contexts.insert(
                &child,
                "template",
                crate::binding::context::BindingContext::marker("template", vm),
            );
        }
    }
    recursive_bind(engine, vm, parent, root)
}

pub(crate) fn recursive_bind(
    engine: &Rc<BindingEngine>,
    vm: &Vm,
    parent: Option<&Vm>,
    node: &NodeRef,
) -> Result<(), BindingError> {
    if node.is_element() && node.tag_name() == CONTROL_TRANSFORM_TAG {
        register_control_transform(engine, vm, parent, node);
        node.detach();
        return Ok(());
    }

    if node.is_text() {
        return bind_inline_text(engine, vm, parent, node);
    }

    // Preserve the child list before binding: children the handlers add
    // are theirs, children the handlers remove are gone.
    let snapshot = node.children();

    let owns_children = if node.is_element() {
        bind_attributes(engine, vm, parent, node)?
    } else {
        false
    };
    if owns_children {
        return Ok(());
    }

    for child in snapshot {
        let attached = child
            .parent()
            .map(|current| Rc::ptr_eq(&current, node))
            .unwrap_or(false);
        if attached {
            recursive_bind(engine, vm, parent, &child)?;
        }
    }
    Ok(())
}

/// Bind an element's attribute set: every binding is initialized
/// left-to-right, then every binding is updated left-to-right, and engine
/// attributes are removed once updated. Returns whether a child-controlling
/// handler took ownership of the element's content.
pub(crate) fn bind_attributes(
    engine: &Rc<BindingEngine>,
    vm: &Vm,
    parent: Option<&Vm>,
    node: &NodeRef,
) -> Result<bool, BindingError> {
    let attributes = node.attributes_snapshot();
    let mut ready = Vec::new();
    let mut owns_children = false;

    for (key, value) in &attributes {
        match engine.parse_binding(key, value, node, vm, parent)? {
            ParsedBinding::NotApplicable => {}
            ParsedBinding::Pending { dependencies } => {
                engine.record_exempt(node, key);
                // Unbound content must not render; the children come back
                // when the dependency tree wakes the binding up.
                let removed = node.take_children();
                engine.install_retry(
                    PendingRebind::new(node, key, value, vm, parent, removed),
                    &dependencies,
                );
                node.remove_attribute(key);
            }
            ParsedBinding::Ready {
                properties,
                dependencies,
            } => {
                engine.bind_init_phase(&properties)?;
                engine.record_ready(node, &properties);
                ready.push((properties, dependencies));
            }
        }
    }

    for (properties, dependencies) in ready {
        engine.bind_update_phase(&properties)?;
        node.remove_attribute(&properties.attr_key);
        if engine.handler_controls_children(&properties.handler) {
            owns_children = true;
        }
        if !dependencies.is_empty() {
            // Replacing an intermediate observable re-resolves the binding.
            engine.install_retry(
                PendingRebind::new(
                    node,
                    &properties.attr_key,
                    &properties.attr_value,
                    vm,
                    parent,
                    Vec::new(),
                ),
                &dependencies,
            );
        }
    }

    Ok(owns_children)
}

/// Rewrite a text node containing `${expression}` interpolations into the
/// equivalent sequence of text nodes and `data-text`-bound spans, and bind
/// the spans in place.
fn bind_inline_text(
    engine: &Rc<BindingEngine>,
    vm: &Vm,
    parent: Option<&Vm>,
    node: &NodeRef,
) -> Result<(), BindingError> {
    let Some(parts) = interpolation_parts(&node.node_text()) else {
        return Ok(());
    };
    node.replace_with(parts.clone());
    for part in &parts {
        if part.is_element() {
            bind_attributes(engine, vm, parent, part)?;
        }
    }
    Ok(())
}

/// Split interpolated text into literal text nodes and bound spans.
/// `None` when the text holds no interpolation.
pub(crate) fn interpolation_parts(text: &str) -> Option<Vec<NodeRef>> {
    if !INTERPOLATION.is_match(text) {
        return None;
    }
    let mut parts = Vec::new();
    let mut consumed = 0;
    for captures in INTERPOLATION.captures_iter(text) {
        let whole = captures.get(0).expect("capture 0 always present");
        if whole.start() > consumed {
            parts.push(Node::text(&text[consumed..whole.start()]));
        }
        let span = Node::element("span");
        let expression = captures.get(1).expect("one capture group").as_str().trim();
        span.set_attribute("data-text", expression);
        parts.push(span);
        consumed = whole.end();
    }
    if consumed < text.len() {
        parts.push(Node::text(&text[consumed..]));
    }
    Some(parts)
}

/// Rewrite every interpolated text node under `node`, without binding.
/// Templates are rewritten once at capture so cached clones and full walks
/// start from the same shape.
pub(crate) fn rewrite_interpolations(node: &NodeRef) {
    for child in node.children() {
        if child.is_text() {
            if let Some(parts) = interpolation_parts(&child.node_text()) {
                child.replace_with(parts);
            }
        } else {
            rewrite_interpolations(&child);
        }
    }
}

/// `<control-transform target="path" transform="name">`: resolve `target`
/// to a transform value and register it under `name`. Lookup failures
/// degrade to a warning; the directive never takes rendering down.
fn register_control_transform(
    engine: &Rc<BindingEngine>,
    vm: &Vm,
    parent: Option<&Vm>,
    node: &NodeRef,
) {
    let Some(name) = node.get_attribute("transform") else {
        log::warn!("<control-transform> without a transform name; ignored");
        return;
    };
    let Some(target) = node.get_attribute("target") else {
        log::warn!("<control-transform transform=\"{name}\"> without a target; ignored");
        return;
    };
    let path = match expression_parser::parse(&target) {
        Ok(BindingExpression::Path(path)) => path,
        _ => {
            log::warn!("transform target '{target}' is not a property path; ignored");
            return;
        }
    };
    let resolved = match resolve_path(engine.scopes(), vm, parent, &path) {
        Ok(Some(resolved)) => resolved,
        _ => {
            log::warn!("transform target '{target}' cannot be resolved; ignored");
            return;
        }
    };
    match resolved.scope.get(&resolved.property_name) {
        Some(Value::Transform(transform)) => engine.register_transform(&name, transform),
        _ => log::warn!("transform target '{target}' does not hold a transform; ignored"),
    }
}
