//! JSON snapshots of live bindings, for external inspection tooling.

use serde_json::{json, Value as Json};

use crate::binding::engine::BindingEngine;
use crate::dom::NodeRef;
use crate::expression_parser;

/// Describe every live binding of an element. The expression is re-parsed
/// from the stored raw attribute so the serialized AST matches what the
/// engine bound.
pub fn describe_bindings(engine: &BindingEngine, element: &NodeRef) -> Json {
    let bindings: Vec<Json> = engine
        .contexts
        .contexts_of(element)
        .into_iter()
        .map(|(identity, context)| {
            let expression = expression_parser::parse(&context.attr_value)
                .ok()
                .and_then(|expression| serde_json::to_value(&expression).ok())
                .unwrap_or(Json::Null);
            json!({
                "binding": identity,
                "handler": context.handler,
                "parameter": context.parameter.borrow().clone(),
                "property": context.property_name,
                "attribute": {
                    "key": context.attr_key,
                    "value": context.attr_value,
                },
                "expression": expression,
                "controlsChildren": context.controls_children.get(),
                "currentValue": context.current_value().to_display_string(),
            })
        })
        .collect();

    json!({
        "tag": element.tag_name(),
        "bindings": bindings,
    })
}
