//! List iteration.
//!
//! Renders one block of template clones per array item and keeps an
//! index-to-block ledger in the binding context, so splice changes remove
//! exactly the DOM that belongs to the removed items. Item renders go
//! through the shadow-template cache when the engine has it enabled.

use std::rc::Rc;

use imagine_observable::ObservableArray;

use super::{clear_children, create_template, BindingHandler, Change, HandlerTraits, WriteBack};
use crate::binding::context::{BindingContext, HandlerState};
use crate::binding::engine::BindingEngine;
use crate::binding::guard::{Direction, UpdateGuard};
use crate::binding::template_cache;
use crate::dom::{NodeExt, NodeRef};
use crate::error::BindingError;
use crate::vm::{Value, Vm};

pub struct ForEachHandler;

impl BindingHandler for ForEachHandler {
    fn traits(&self) -> HandlerTraits {
        HandlerTraits::CONTROLS_CHILDREN
    }

    fn init(
        &self,
        _engine: &Rc<BindingEngine>,
        element: &NodeRef,
        _value: Value,
        context: &Rc<BindingContext>,
        _write_back: WriteBack,
    ) -> Result<(), BindingError> {
        *context.state.borrow_mut() = HandlerState::ItemBlocks(Vec::new());
        *context.template.borrow_mut() = create_template(element);
        Ok(())
    }

    fn update(
        &self,
        engine: &Rc<BindingEngine>,
        element: &NodeRef,
        value: Value,
        context: &Rc<BindingContext>,
        change: Option<&Change>,
    ) -> Result<(), BindingError> {
        if context.template.borrow().is_empty() {
            return Ok(());
        }
        let Some(array) = value.as_array() else {
            return Ok(());
        };

        match change {
            Some(Change::Splice {
                index,
                added,
                removed,
            }) => {
                remove_blocks(engine, context, *index, removed.len());
                for (offset, item) in added.iter().enumerate() {
                    let position = index + offset;
                    let position = (position < block_count(context)).then_some(position);
                    add_item(engine, element, context, item, position)?;
                }
            }
            Some(Change::ItemSet { index, new_value }) => {
                remove_blocks(engine, context, *index, 1);
                let position = (*index < block_count(context)).then_some(*index);
                add_item(engine, element, context, new_value, position)?;
            }
            // Initial paint, whole-array replacement, or the bound
            // property now holds a different array.
            Some(Change::Replace) | Some(Change::Value) | None => {
                clear_children(engine, element);
                *context.state.borrow_mut() = HandlerState::ItemBlocks(Vec::new());
                for item in array.snapshot() {
                    add_item(engine, element, context, &item, None)?;
                }
            }
        }
        Ok(())
    }
}

fn block_count(context: &BindingContext) -> usize {
    match &*context.state.borrow() {
        HandlerState::ItemBlocks(blocks) => blocks.len(),
        _ => 0,
    }
}

fn remove_blocks(engine: &Rc<BindingEngine>, context: &BindingContext, index: usize, count: usize) {
    let removed: Vec<Vec<NodeRef>> = {
        let mut state = context.state.borrow_mut();
        let HandlerState::ItemBlocks(blocks) = &mut *state else {
            return;
        };
        let index = index.min(blocks.len());
        let end = (index + count).min(blocks.len());
        blocks.drain(index..end).collect()
    };
    for block in removed {
        for node in block {
            node.detach();
            engine.evict_subtree(&node);
        }
    }
}

fn add_item(
    engine: &Rc<BindingEngine>,
    element: &NodeRef,
    context: &Rc<BindingContext>,
    item: &Value,
    position: Option<usize>,
) -> Result<(), BindingError> {
    let item_vm = match item {
        Value::Object(vm) => vm.clone(),
        other => {
            log::debug!("foreach item is not an object ({other:?}); binding an empty scope");
            Vm::new()
        }
    };

    let nodes = render_item(engine, context, &item_vm)?;

    {
        let mut state = context.state.borrow_mut();
        let HandlerState::ItemBlocks(blocks) = &mut *state else {
            return Ok(());
        };
        match position {
            Some(position) => {
                let dom_index: usize = blocks[..position].iter().map(|block| block.len()).sum();
                for (offset, node) in nodes.iter().enumerate() {
                    element.insert_child_at(dom_index + offset, node);
                }
                blocks.insert(position, nodes.clone());
            }
            None => {
                for node in &nodes {
                    element.append_child(node);
                }
                blocks.push(nodes.clone());
            }
        }
    }

    if element.declared_property("selecteditem").is_some()
        || element.declared_property("selecteditems").is_some()
    {
        schedule_selection_hookup(engine, element, item, &nodes);
    }
    Ok(())
}

/// Render one block for `item_vm`: full walk on the first item (recording
/// the shadow template), cached re-hydration afterwards.
fn render_item(
    engine: &Rc<BindingEngine>,
    context: &Rc<BindingContext>,
    item_vm: &Vm,
) -> Result<Vec<NodeRef>, BindingError> {
    let template = context.template.borrow().clone();
    let parent = Some(&context.original_vm);

    if !engine.options().template_cache {
        let nodes: Vec<NodeRef> = template.iter().map(|node| node.deep_clone()).collect();
        for node in &nodes {
            crate::imagine::bind_subtree(engine, item_vm, parent, node)?;
        }
        return Ok(nodes);
    }

    {
        let cache_slot = context.cache.borrow();
        if let Some(cache) = cache_slot.as_ref() {
            return template_cache::hydrate_item(engine, cache, &template, item_vm, context);
        }
    }

    for node in &template {
        engine.assign_template_ids(node);
    }
    let nodes: Vec<NodeRef> = template.iter().map(|node| node.deep_clone()).collect();
    engine.begin_recording();
    let mut outcome = Ok(());
    for node in &nodes {
        outcome = crate::imagine::bind_subtree(engine, item_vm, parent, node);
        if outcome.is_err() {
            break;
        }
    }
    let cache = engine.end_recording();
    outcome?;
    *context.cache.borrow_mut() = Some(cache);
    Ok(nodes)
}

fn schedule_selection_hookup(
    engine: &Rc<BindingEngine>,
    host: &NodeRef,
    item: &Value,
    nodes: &[NodeRef],
) {
    let weak = Rc::downgrade(engine);
    let host = Rc::clone(host);
    let item = item.clone();
    let nodes: Vec<NodeRef> = nodes.to_vec();
    engine.tasks().defer(move || {
        if weak.upgrade().is_some() {
            hook_up_selection(&host, &item, &nodes);
        }
    });
}

/// Wire a rendered item to its host's selection properties: toggling the
/// item's `selected`/`checked` property writes the item into the host's
/// `selecteditem`/`selecteditems`, and host-side selection writes toggle
/// the item element, with ping-pong broken by a shared guard.
fn hook_up_selection(host: &NodeRef, item: &Value, nodes: &[NodeRef]) {
    let single = host.declared_property("selecteditem");
    let multi = host.declared_property("selecteditems");
    if single.is_none() && multi.is_none() {
        return;
    }

    let mut target: Option<(NodeRef, &'static str)> = None;
    'search: for node in nodes {
        let mut candidates = vec![Rc::clone(node)];
        candidates.extend(node.descendants());
        for candidate in candidates {
            for name in ["selected", "checked"] {
                if candidate.declared_property(name).is_some() {
                    target = Some((candidate, name));
                    break 'search;
                }
            }
        }
    }
    let Some((item_element, flag_name)) = target else {
        return;
    };
    let Some(flag_slot) = item_element.property_slot(flag_name) else {
        return;
    };

    let selection_array = multi.as_ref().map(|slot| match slot.value.get() {
        Value::Array(array) => array,
        _ => {
            let array: ObservableArray<Value> = ObservableArray::new(Vec::new());
            slot.value.set(Value::Array(array.clone()));
            array
        }
    });

    let guard = UpdateGuard::new();

    // item element -> host selection
    {
        let guard = guard.clone();
        let host = Rc::clone(host);
        let item = item.clone();
        let single_declared = single.is_some();
        let selection_array = selection_array.clone();
        flag_slot
            .value
            .subscribe(move |change| {
                let Some(_token) = guard.enter(Direction::Inbound) else {
                    return;
                };
                if change.new_value.truthy() {
                    if single_declared {
                        host.set_property("selecteditem", item.clone());
                    }
                    if let Some(array) = &selection_array {
                        if array.position(|existing| existing == &item).is_none() {
                            array.push(item.clone());
                        }
                    }
                } else if let Some(array) = &selection_array {
                    if let Some(position) = array.position(|existing| existing == &item) {
                        array.remove(position);
                    }
                }
            })
            .forget();
    }

    // host selection -> item element
    if let Some(slot) = &single {
        if slot.value.get() == *item {
            item_element.set_property(flag_name, Value::Bool(true));
        }
        let guard = guard.clone();
        let item = item.clone();
        let target = Rc::clone(&item_element);
        slot.value
            .subscribe(move |change| {
                let Some(_token) = guard.enter(Direction::Outbound) else {
                    return;
                };
                target.set_property(flag_name, Value::Bool(change.new_value == item));
            })
            .forget();
    }
    if let Some(array) = &selection_array {
        if array.position(|existing| existing == item).is_some() {
            item_element.set_property(flag_name, Value::Bool(true));
        }
        let guard = guard.clone();
        let item = item.clone();
        let target = Rc::clone(&item_element);
        let observed = array.clone();
        array
            .subscribe(move |_| {
                let Some(_token) = guard.enter(Direction::Outbound) else {
                    return;
                };
                let selected = observed.position(|existing| existing == &item).is_some();
                target.set_property(flag_name, Value::Bool(selected));
            })
            .forget();
    }
}
