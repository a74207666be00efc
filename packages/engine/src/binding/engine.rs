//! The binding engine.
//!
//! Owns the handler registry, the element-keyed context registry, the
//! named-scope and transform registries and the task queue. The engine
//! parses attributes into binding descriptors, runs the init and update
//! phases against handlers, subscribes updates to the reactive substrate
//! and drives the dependency-tree rebind protocol.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use imagine_observable::{ArrayChange, ValueChange};
use indexmap::IndexMap;

use super::context::BindingContext;
use super::guard::Direction;
use super::handlers::{default_handlers, BindingHandler, Change, HandlerTraits};
use super::parser::{
    classify_attribute_key, compile_expression, BindingProperties, BindingValue, CompileInput,
    CompiledValue, ParsedBinding,
};
use super::rebind::PendingRebind;
use super::registry::ContextRegistry;
use super::scope_registry::ScopeRegistry;
use super::scope_resolver::DependencyTree;
use super::template_cache::{CacheRecorder, CachedBinding, TemplateCache};
use crate::dom::NodeRef;
use crate::error::BindingError;
use crate::expression_parser::{self, BindingExpression};
use crate::imagine::ImagineOptions;
use crate::tasks::TaskQueue;
use crate::vm::{Property, Transform, Value, Vm};

pub struct BindingEngine {
    handlers: IndexMap<String, Rc<dyn BindingHandler>>,
    pub(crate) contexts: ContextRegistry,
    scopes: ScopeRegistry,
    transforms: RefCell<HashMap<String, Transform>>,
    tasks: Rc<TaskQueue>,
    options: ImagineOptions,
    next_template_id: Cell<u32>,
    recorders: RefCell<Vec<CacheRecorder>>,
}

impl BindingEngine {
    pub fn new(options: ImagineOptions) -> Rc<Self> {
        let mut handlers: IndexMap<String, Rc<dyn BindingHandler>> = IndexMap::new();
        for (name, handler) in default_handlers() {
            handlers.insert(name.to_string(), handler);
        }
        Rc::new(BindingEngine {
            handlers,
            contexts: ContextRegistry::new(),
            scopes: ScopeRegistry::new(),
            transforms: RefCell::new(HashMap::new()),
            tasks: Rc::new(TaskQueue::new()),
            options,
            next_template_id: Cell::new(1),
            recorders: RefCell::new(Vec::new()),
        })
    }

    pub fn scopes(&self) -> &ScopeRegistry {
        &self.scopes
    }

    pub fn options(&self) -> &ImagineOptions {
        &self.options
    }

    pub fn tasks(&self) -> &Rc<TaskQueue> {
        &self.tasks
    }

    pub fn handler(&self, name: &str) -> Option<Rc<dyn BindingHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Named handlers addressable through `@name` / `data-name`. Internal
    /// handlers are reached through their own sigils only.
    pub fn is_known_handler(&self, name: &str) -> bool {
        !name.starts_with("__") && self.handlers.contains_key(name)
    }

    pub fn handler_controls_children(&self, name: &str) -> bool {
        self.handler(name)
            .map(|handler| handler.traits().contains(HandlerTraits::CONTROLS_CHILDREN))
            .unwrap_or(false)
    }

    pub(crate) fn attr_controls_children(&self, key: &str) -> bool {
        match classify_attribute_key(key, |name| self.is_known_handler(name)) {
            Ok(Some(attr)) => self.handler_controls_children(&attr.handler),
            _ => false,
        }
    }

    pub fn register_transform(&self, name: &str, transform: Transform) {
        self.transforms
            .borrow_mut()
            .insert(name.to_string(), transform);
    }

    pub fn transform(&self, name: &str) -> Option<Transform> {
        self.transforms.borrow().get(name).cloned()
    }

    pub fn evict_subtree(&self, node: &NodeRef) {
        self.contexts.evict(node);
    }

    // ---- parsing -------------------------------------------------------

    /// Classify an attribute and compile its value against the scope chain.
    pub fn parse_binding(
        &self,
        key: &str,
        value: &str,
        element: &NodeRef,
        vm: &Vm,
        parent: Option<&Vm>,
    ) -> Result<ParsedBinding, BindingError> {
        let Some(attr) = classify_attribute_key(key, |name| self.is_known_handler(name))? else {
            return Ok(ParsedBinding::NotApplicable);
        };

        // The scope handler's value is the chosen name, not a path.
        if attr.handler == "scope" {
            let name = value.trim().to_string();
            let properties = BindingProperties {
                handler: attr.handler,
                parameter: None,
                property_name: name.clone(),
                expression: BindingExpression::StringLiteral(name.clone()),
                attr_key: key.to_string(),
                attr_value: value.to_string(),
                vm: vm.clone(),
                parent_vm: parent.cloned(),
                scope: vm.clone(),
                value: BindingValue::Plain(Value::Str(name)),
                element: Rc::clone(element),
                is_cacheable: true,
            };
            return Ok(ParsedBinding::Ready {
                properties: Box::new(properties),
                dependencies: DependencyTree::new(),
            });
        }

        let expression = match expression_parser::parse(value) {
            Ok(expression) => expression,
            Err(error) => {
                log::warn!("cannot bind '{key}': {error}");
                return Ok(ParsedBinding::Pending {
                    dependencies: DependencyTree::new(),
                });
            }
        };

        let lookup = |name: &str| self.transform(name);
        let input = CompileInput {
            registry: &self.scopes,
            transform_lookup: &lookup,
            vm,
            parent,
        };
        match compile_expression(&input, &expression)? {
            CompiledValue::Pending(dependencies) => Ok(ParsedBinding::Pending { dependencies }),
            CompiledValue::Ready {
                value: binding_value,
                scope,
                property_name,
                is_cacheable,
                dependencies,
            } => Ok(ParsedBinding::Ready {
                properties: Box::new(BindingProperties {
                    handler: attr.handler,
                    parameter: attr.parameter,
                    property_name,
                    expression,
                    attr_key: key.to_string(),
                    attr_value: value.to_string(),
                    vm: vm.clone(),
                    parent_vm: parent.cloned(),
                    scope,
                    value: binding_value,
                    element: Rc::clone(element),
                    is_cacheable,
                }),
                dependencies,
            }),
        }
    }

    // ---- init phase ----------------------------------------------------

    /// Create-or-get the binding context and run `init` exactly once per
    /// binding identity.
    pub fn bind_init_phase(
        self: &Rc<Self>,
        properties: &BindingProperties,
    ) -> Result<Rc<BindingContext>, BindingError> {
        let handler = self
            .handler(&properties.handler)
            .ok_or_else(|| BindingError::UnknownHandler(properties.handler.clone()))?;
        let identity =
            BindingContext::identity_of(&properties.handler, properties.parameter.as_deref());

        if let Some(existing) = self.contexts.get(&properties.element, &identity) {
            return Ok(existing);
        }

        let controls = handler.traits().contains(HandlerTraits::CONTROLS_CHILDREN);
        if controls && self.contexts.child_controller_of(&properties.element).is_some() {
            return Err(BindingError::MultipleChildControllers {
                tag: properties.element.tag_name().to_string(),
                attribute: properties.attr_key.clone(),
            });
        }

        let context = BindingContext::from_properties(properties);
        context.controls_children.set(controls);
        self.contexts
            .insert(&properties.element, &identity, Rc::clone(&context));

        let write_back: Rc<dyn Fn(Value)> = {
            let context = Rc::clone(&context);
            let scope = properties.scope.clone();
            let property_name = properties.property_name.clone();
            let binding_value = properties.value.clone();
            Rc::new(move |value: Value| {
                if property_name == "this" {
                    return;
                }
                let Some(_token) = context.guard.enter(Direction::Inbound) else {
                    return;
                };
                binding_value.write(&scope, &property_name, value);
            })
        };

        handler.init(
            self,
            &properties.element,
            properties.value.current(),
            &context,
            write_back,
        )?;
        Ok(context)
    }

    // ---- update phase --------------------------------------------------

    /// Subscribe `update` to the binding value, then invoke it once to
    /// paint the initial state.
    pub fn bind_update_phase(
        self: &Rc<Self>,
        properties: &BindingProperties,
    ) -> Result<(), BindingError> {
        let handler = self
            .handler(&properties.handler)
            .ok_or_else(|| BindingError::UnknownHandler(properties.handler.clone()))?;
        let identity =
            BindingContext::identity_of(&properties.handler, properties.parameter.as_deref());
        let Some(context) = self.contexts.get(&properties.element, &identity) else {
            return Ok(());
        };

        let current = properties.value.current();
        self.check_value_kind(properties, &current)?;

        // At most one live subscription set per binding.
        context.subscriptions.borrow_mut().clear();
        context.array_subscription.borrow_mut().take();

        match &properties.value {
            BindingValue::Observable(observable) => {
                let subscription = {
                    let weak = Rc::downgrade(self);
                    let handler = Rc::clone(&handler);
                    let element = Rc::clone(&properties.element);
                    let context = Rc::clone(&context);
                    observable.subscribe(move |change: &ValueChange<Value>| {
                        let Some(engine) = weak.upgrade() else { return };
                        engine.observe_array(&handler, &element, &context, &change.new_value);
                        engine.dispatch_update(
                            &handler,
                            &element,
                            change.new_value.clone(),
                            &context,
                            Some(&Change::Value),
                        );
                        engine.tasks.flush();
                    })
                };
                context.subscriptions.borrow_mut().push(subscription);
                self.observe_array(&handler, &properties.element, &context, &current);
            }
            BindingValue::Computed(computed) => {
                let subscription = {
                    let weak = Rc::downgrade(self);
                    let handler = Rc::clone(&handler);
                    let element = Rc::clone(&properties.element);
                    let context = Rc::clone(&context);
                    computed.subscribe(move |change: &ValueChange<Value>| {
                        let Some(engine) = weak.upgrade() else { return };
                        engine.observe_array(&handler, &element, &context, &change.new_value);
                        engine.dispatch_update(
                            &handler,
                            &element,
                            change.new_value.clone(),
                            &context,
                            Some(&Change::Value),
                        );
                        engine.tasks.flush();
                    })
                };
                context.subscriptions.borrow_mut().push(subscription);
                self.observe_array(&handler, &properties.element, &context, &current);
            }
            BindingValue::Plain(_) | BindingValue::Scope(_) => {}
        }

        self.run_update(&handler, &properties.element, current, &context, None)
    }

    /// Track splice-, item- and replacement-level changes of the bound
    /// array. Re-attached whenever the binding value starts holding a
    /// different array.
    fn observe_array(
        self: &Rc<Self>,
        handler: &Rc<dyn BindingHandler>,
        element: &NodeRef,
        context: &Rc<BindingContext>,
        value: &Value,
    ) {
        match value {
            Value::Array(array) => {
                let weak = Rc::downgrade(self);
                let handler = Rc::clone(handler);
                let element = Rc::clone(element);
                let context_for_closure = Rc::clone(context);
                let observed = array.clone();
                let subscription = array.subscribe(move |change: &ArrayChange<Value>| {
                    let Some(engine) = weak.upgrade() else { return };
                    let change = Change::from_array(change);
                    engine.dispatch_update(
                        &handler,
                        &element,
                        Value::Array(observed.clone()),
                        &context_for_closure,
                        Some(&change),
                    );
                    engine.tasks.flush();
                });
                *context.array_subscription.borrow_mut() = Some(subscription);
            }
            _ => {
                context.array_subscription.borrow_mut().take();
            }
        }
    }

    /// `run_update` for subscription callbacks, where nothing can
    /// propagate.
    fn dispatch_update(
        self: &Rc<Self>,
        handler: &Rc<dyn BindingHandler>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        change: Option<&Change>,
    ) {
        if let Err(error) = self.run_update(handler, element, value, context, change) {
            log::error!("update of '{}' failed: {error}", context.identity());
        }
    }

    /// Invoke `update` under the outbound guard; a no-op while an inbound
    /// write-back for the same binding is in flight.
    pub(crate) fn run_update(
        self: &Rc<Self>,
        handler: &Rc<dyn BindingHandler>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        change: Option<&Change>,
    ) -> Result<(), BindingError> {
        let Some(_token) = context.guard.enter(Direction::Outbound) else {
            return Ok(());
        };
        handler.update(self, element, value, context, change)
    }

    fn check_value_kind(
        &self,
        properties: &BindingProperties,
        value: &Value,
    ) -> Result<(), BindingError> {
        let is_array = matches!(value, Value::Array(_));
        let reason = match properties.handler.as_str() {
            "foreach" if !is_array => Some("expects an observable array"),
            "text" | "value" | "html" | "__attribute" if is_array => {
                Some("cannot bind an observable array")
            }
            _ => None,
        };
        let Some(reason) = reason else {
            return Ok(());
        };
        if self.options.strict_typing {
            return Err(BindingError::TypeMismatch {
                handler: properties.handler.clone(),
                property: properties.property_name.clone(),
                reason: reason.to_string(),
            });
        }
        log::warn!(
            "'{}' binding on '{}' {reason}; binding anyway",
            properties.handler,
            properties.property_name
        );
        Ok(())
    }

    // ---- dependency-tree retry -----------------------------------------

    /// Subscribe one-shot invalidation listeners on every pair of the
    /// dependency tree. The first change cancels the whole attempt and
    /// re-binds from the stored attribute strings.
    pub(crate) fn install_retry(
        self: &Rc<Self>,
        pending: PendingRebind,
        dependencies: &DependencyTree,
    ) {
        if dependencies.is_empty() {
            // Nothing can ever wake this binding up again.
            pending.restore_children();
            return;
        }
        let pending = Rc::new(pending);
        for (vm, property_name) in dependencies.iter() {
            let Some(property) = vm.property(property_name) else {
                continue;
            };
            let weak = Rc::downgrade(self);
            let record = Rc::clone(&pending);
            let subscription = match property {
                Property::Observable(observable) => {
                    Some(observable.subscribe_once(move |_: &ValueChange<Value>| {
                        if let Some(engine) = weak.upgrade() {
                            engine.execute_rebind(&record);
                        }
                    }))
                }
                Property::Computed(computed) => {
                    Some(computed.subscribe_once(move |_: &ValueChange<Value>| {
                        if let Some(engine) = weak.upgrade() {
                            engine.execute_rebind(&record);
                        }
                    }))
                }
                Property::Plain(_) => None,
            };
            if let Some(subscription) = subscription {
                pending.add_subscription(subscription);
            }
        }
    }

    /// Full teardown-and-rebuild of one binding from its raw attribute.
    pub(crate) fn execute_rebind(self: &Rc<Self>, pending: &Rc<PendingRebind>) {
        if !pending.claim() {
            return;
        }
        pending.cancel_listeners();
        let restored = pending.restore_children();

        // The old context for this identity is discarded, not patched.
        if let Ok(Some(attr)) =
            classify_attribute_key(&pending.attr_key, |name| self.is_known_handler(name))
        {
            let identity = BindingContext::identity_of(&attr.handler, attr.parameter.as_deref());
            if let Some(old) = self.contexts.get(&pending.element, &identity) {
                old.subscriptions.borrow_mut().clear();
                old.array_subscription.borrow_mut().take();
            }
            self.contexts.remove_binding(&pending.element, &identity);
        }

        if let Err(error) = self.rebind_from_attribute(pending, restored) {
            log::error!("rebind of '{}' failed: {error}", pending.attr_key);
        }
        self.tasks.flush();
    }

    fn rebind_from_attribute(
        self: &Rc<Self>,
        pending: &Rc<PendingRebind>,
        restored: Vec<NodeRef>,
    ) -> Result<(), BindingError> {
        let parsed = self.parse_binding(
            &pending.attr_key,
            &pending.attr_value,
            &pending.element,
            &pending.vm,
            pending.parent_vm.as_ref(),
        )?;
        match parsed {
            ParsedBinding::NotApplicable => Ok(()),
            ParsedBinding::Pending { dependencies } => {
                let removed = pending.element.take_children();
                self.install_retry(
                    PendingRebind::new(
                        &pending.element,
                        &pending.attr_key,
                        &pending.attr_value,
                        &pending.vm,
                        pending.parent_vm.as_ref(),
                        removed,
                    ),
                    &dependencies,
                );
                Ok(())
            }
            ParsedBinding::Ready {
                properties,
                dependencies,
            } => {
                self.bind_init_phase(&properties)?;
                self.bind_update_phase(&properties)?;
                if !dependencies.is_empty() {
                    self.install_retry(
                        PendingRebind::new(
                            &pending.element,
                            &pending.attr_key,
                            &pending.attr_value,
                            &pending.vm,
                            pending.parent_vm.as_ref(),
                            Vec::new(),
                        ),
                        &dependencies,
                    );
                }
                // Restored children the new binding did not take over
                // resume the standard walk.
                if !self.handler_controls_children(&properties.handler) {
                    for child in restored {
                        let attached = child
                            .parent()
                            .map(|parent| Rc::ptr_eq(&parent, &pending.element))
                            .unwrap_or(false);
                        if attached {
                            crate::imagine::recursive_bind(
                                self,
                                &pending.vm,
                                pending.parent_vm.as_ref(),
                                &child,
                            )?;
                        }
                    }
                }
                Ok(())
            }
        }
    }

    // ---- template cache ------------------------------------------------

    pub(crate) fn assign_template_ids(&self, node: &NodeRef) {
        if node.is_element() && node.template_id().is_none() {
            let id = self.next_template_id.get();
            self.next_template_id.set(id + 1);
            node.set_template_id(id);
        }
        for child in node.children() {
            self.assign_template_ids(&child);
        }
    }

    pub(crate) fn begin_recording(&self) {
        self.recorders.borrow_mut().push(CacheRecorder::default());
    }

    pub(crate) fn end_recording(&self) -> TemplateCache {
        self.recorders
            .borrow_mut()
            .pop()
            .unwrap_or_default()
            .into_cache()
    }

    /// Report a resolved binding to the active recorder, if any.
    pub(crate) fn record_ready(&self, element: &NodeRef, properties: &BindingProperties) {
        let mut recorders = self.recorders.borrow_mut();
        let Some(recorder) = recorders.last_mut() else {
            return;
        };
        let Some(id) = element.template_id() else {
            return;
        };
        if properties.is_cacheable {
            recorder
                .bindings
                .push(CachedBinding::from_properties(id, properties));
        } else {
            log::warn!(
                "binding '{}' on <{}> is not cacheable; the element falls back to full re-binding per item",
                properties.attr_key,
                element.tag_name()
            );
            recorder.exempt.push(id);
        }
    }

    /// Report an unresolvable binding to the active recorder, if any.
    pub(crate) fn record_exempt(&self, element: &NodeRef, attr_key: &str) {
        let mut recorders = self.recorders.borrow_mut();
        let Some(recorder) = recorders.last_mut() else {
            return;
        };
        let Some(id) = element.template_id() else {
            return;
        };
        log::warn!(
            "binding '{attr_key}' on <{}> is not cacheable; the element falls back to full re-binding per item",
            element.tag_name()
        );
        recorder.exempt.push(id);
    }
}
