//! Shadow-template fast path for repeated rendering.
//!
//! The first item rendered by a list binding is walked in full while a
//! recorder collects, per synthetic element id, the descriptors of every
//! cacheable binding it meets. Later items clone the annotated template and
//! re-hydrate only the recorded descriptors with the item substituted as
//! scope, skipping attribute classification, expression parsing and
//! scope-chain walking. Elements that carried a non-cacheable binding are
//! recorded as exempt and fall back to full re-binding per item.

use std::rc::Rc;

use crate::binding::context::BindingContext;
use crate::binding::engine::BindingEngine;
use crate::binding::parser::{
    compile_expression, BindingProperties, BindingValue, CompileInput, CompiledValue,
};
use crate::dom::{NodeExt, NodeRef};
use crate::error::BindingError;
use crate::expression_parser::BindingExpression;
use crate::vm::{Property, Vm};

/// One pre-resolved binding of the shadow template.
#[derive(Clone)]
pub struct CachedBinding {
    pub template_id: u32,
    pub handler: String,
    pub parameter: Option<String>,
    pub attr_key: String,
    pub attr_value: String,
    pub expression: BindingExpression,
}

impl CachedBinding {
    pub fn from_properties(template_id: u32, properties: &BindingProperties) -> Self {
        CachedBinding {
            template_id,
            handler: properties.handler.clone(),
            parameter: properties.parameter.clone(),
            attr_key: properties.attr_key.clone(),
            attr_value: properties.attr_value.clone(),
            expression: properties.expression.clone(),
        }
    }

    /// Rebuild a descriptor against a new item view-model.
    ///
    /// Single-segment item paths bypass resolution entirely; absolute and
    /// derived expressions recompile, which is still free of dependency
    /// trees because only cacheable bindings were recorded. `Ok(None)`
    /// means the item lacks the property; the caller re-binds in full.
    pub fn hydrate(
        &self,
        engine: &Rc<BindingEngine>,
        item_vm: &Vm,
        parent: Option<&Vm>,
        element: &NodeRef,
    ) -> Result<Option<BindingProperties>, BindingError> {
        if let BindingExpression::Path(path) = &self.expression {
            if path.segments.len() == 1 {
                let name = &path.segments[0];
                if name == "this" {
                    return Ok(Some(self.properties(
                        element,
                        item_vm,
                        parent,
                        item_vm.clone(),
                        "this".to_string(),
                        BindingValue::Scope(item_vm.clone()),
                    )));
                }
                if !engine.scopes().contains(name) {
                    let Some(property) = item_vm.property(name) else {
                        return Ok(None);
                    };
                    let value = match property {
                        Property::Observable(observable) => BindingValue::Observable(observable),
                        Property::Computed(computed) => BindingValue::Computed(computed),
                        Property::Plain(value) => BindingValue::Plain(value),
                    };
                    return Ok(Some(self.properties(
                        element,
                        item_vm,
                        parent,
                        item_vm.clone(),
                        name.clone(),
                        value,
                    )));
                }
            }
        }

        let lookup = |name: &str| engine.transform(name);
        let input = CompileInput {
            registry: engine.scopes(),
            transform_lookup: &lookup,
            vm: item_vm,
            parent,
        };
        match compile_expression(&input, &self.expression)? {
            CompiledValue::Pending(_) => Ok(None),
            CompiledValue::Ready {
                value,
                scope,
                property_name,
                ..
            } => Ok(Some(self.properties(
                element,
                item_vm,
                parent,
                scope,
                property_name,
                value,
            ))),
        }
    }

    fn properties(
        &self,
        element: &NodeRef,
        item_vm: &Vm,
        parent: Option<&Vm>,
        scope: Vm,
        property_name: String,
        value: BindingValue,
    ) -> BindingProperties {
        BindingProperties {
            handler: self.handler.clone(),
            parameter: self.parameter.clone(),
            property_name,
            expression: self.expression.clone(),
            attr_key: self.attr_key.clone(),
            attr_value: self.attr_value.clone(),
            vm: item_vm.clone(),
            parent_vm: parent.cloned(),
            scope,
            value,
            element: Rc::clone(element),
            is_cacheable: true,
        }
    }
}

/// Recorder active during a first item render.
#[derive(Default)]
pub struct CacheRecorder {
    pub bindings: Vec<CachedBinding>,
    pub exempt: Vec<u32>,
}

impl CacheRecorder {
    pub fn into_cache(mut self) -> TemplateCache {
        // A recorded binding on an exempt element would double-bind; the
        // full re-bind of that element covers it.
        self.bindings
            .retain(|binding| !self.exempt.contains(&binding.template_id));
        TemplateCache {
            bindings: self.bindings,
            exempt: self.exempt,
        }
    }
}

/// Pre-resolved descriptors of a list template, keyed by synthetic ids.
pub struct TemplateCache {
    pub bindings: Vec<CachedBinding>,
    pub exempt: Vec<u32>,
}

/// Render one item through the cache: clone the annotated template and
/// re-hydrate only the recorded bindings.
pub fn hydrate_item(
    engine: &Rc<BindingEngine>,
    cache: &TemplateCache,
    template: &[NodeRef],
    item_vm: &Vm,
    context: &BindingContext,
) -> Result<Vec<NodeRef>, BindingError> {
    let clones: Vec<NodeRef> = template.iter().map(|node| node.deep_clone()).collect();
    let parent = Some(&context.original_vm);
    let find = |id: u32| {
        clones
            .iter()
            .find_map(|node| node.find_by_template_id(id))
    };

    let mut ready: Vec<BindingProperties> = Vec::new();
    let mut fallback: Vec<NodeRef> = Vec::new();

    for cached in &cache.bindings {
        // Ids under a child-controlling binding are recorded but their
        // elements live in that binding's captured template, not here.
        let Some(element) = find(cached.template_id) else {
            continue;
        };
        match cached.hydrate(engine, item_vm, parent, &element)? {
            Some(properties) => {
                engine.bind_init_phase(&properties)?;
                ready.push(properties);
            }
            None => {
                log::debug!(
                    "cached binding '{}' has no source on this item; re-binding in full",
                    cached.attr_key
                );
                fallback.push(element);
            }
        }
    }

    for properties in &ready {
        engine.bind_update_phase(properties)?;
        properties.element.remove_attribute(&properties.attr_key);
    }

    for element in fallback {
        crate::imagine::bind_attributes(engine, item_vm, parent, &element)?;
    }
    for id in &cache.exempt {
        if let Some(element) = find(*id) {
            crate::imagine::bind_attributes(engine, item_vm, parent, &element)?;
        }
    }

    Ok(clones)
}
