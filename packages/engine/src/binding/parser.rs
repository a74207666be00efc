//! Attribute-key classification and expression compilation.
//!
//! The attribute-key grammar selects the handler: `@name` is a named
//! handler, `:name` a two-way DOM property, `_name` a one-way DOM
//! attribute, `#name` an event listener, `data-name` an alias for a named
//! handler. The attribute value is parsed with the expression grammar and
//! compiled into a binding value — a live handle into the view-model, or a
//! computed derivation wired to the handles it reads.

use imagine_observable::{Computed, Observable};

use super::scope_registry::ScopeRegistry;
use super::scope_resolver::{resolve_path, DependencyTree, ResolvedPath};
use crate::dom::NodeRef;
use crate::error::BindingError;
use crate::expression_parser::{
    BindingExpression, ComparisonOp, ConcatSegment, Literal, PropertyPath,
};
use crate::vm::{Property, Transform, Value, Vm};

pub const HANDLER_SIGIL: char = '@';
pub const PROPERTY_SIGIL: char = ':';
pub const ATTRIBUTE_SIGIL: char = '_';
pub const EVENT_SIGIL: char = '#';
pub const DATA_ALIAS_PREFIX: &str = "data-";

pub const ATTRIBUTE_HANDLER: &str = "__attribute";
pub const PROPERTY_HANDLER: &str = "__property";
pub const EVENT_HANDLER: &str = "__event";

/// Handler selection derived from an attribute key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeKey {
    pub handler: String,
    pub parameter: Option<String>,
}

/// Classify an attribute key.
///
/// `Ok(None)` means the attribute is not engine syntax at all. An `@`
/// sigil with an unregistered handler name is a configuration error; an
/// unregistered `data-` name is ignorable, since `data-*` is shared
/// namespace.
pub fn classify_attribute_key(
    key: &str,
    is_known_handler: impl Fn(&str) -> bool,
) -> Result<Option<AttributeKey>, BindingError> {
    if let Some(name) = key.strip_prefix(HANDLER_SIGIL) {
        if !is_known_handler(name) {
            return Err(BindingError::UnknownHandler(name.to_string()));
        }
        return Ok(Some(AttributeKey {
            handler: name.to_string(),
            parameter: None,
        }));
    }
    if let Some(name) = key.strip_prefix(PROPERTY_SIGIL) {
        return Ok(Some(AttributeKey {
            handler: PROPERTY_HANDLER.to_string(),
            parameter: Some(name.to_string()),
        }));
    }
    if let Some(name) = key.strip_prefix(ATTRIBUTE_SIGIL) {
        return Ok(Some(AttributeKey {
            handler: ATTRIBUTE_HANDLER.to_string(),
            parameter: Some(name.to_string()),
        }));
    }
    if let Some(name) = key.strip_prefix(EVENT_SIGIL) {
        return Ok(Some(AttributeKey {
            handler: EVENT_HANDLER.to_string(),
            parameter: Some(name.to_string()),
        }));
    }
    if let Some(name) = key.strip_prefix(DATA_ALIAS_PREFIX) {
        if is_known_handler(name) {
            return Ok(Some(AttributeKey {
                handler: name.to_string(),
                parameter: None,
            }));
        }
    }
    Ok(None)
}

/// The live value a binding reads from and writes to.
#[derive(Clone)]
pub enum BindingValue {
    Observable(Observable<Value>),
    Computed(Computed<Value>),
    Plain(Value),
    /// The resolved scope object itself (`this` paths).
    Scope(Vm),
}

impl BindingValue {
    pub fn current(&self) -> Value {
        match self {
            BindingValue::Observable(observable) => observable.get(),
            BindingValue::Computed(computed) => computed.get(),
            BindingValue::Plain(value) => value.clone(),
            BindingValue::Scope(vm) => Value::Object(vm.clone()),
        }
    }

    /// Route a DOM-originated value back into the view-model.
    pub fn write(&self, scope: &Vm, property_name: &str, value: Value) -> bool {
        match self {
            BindingValue::Observable(observable) => {
                observable.set(value);
                true
            }
            BindingValue::Computed(computed) => computed.set(value),
            BindingValue::Plain(_) => scope.set(property_name, value),
            BindingValue::Scope(_) => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            BindingValue::Observable(_) => "observable",
            BindingValue::Computed(_) => "computed",
            BindingValue::Plain(_) => "plain",
            BindingValue::Scope(_) => "scope",
        }
    }
}

/// A fully resolved binding descriptor.
#[derive(Clone)]
pub struct BindingProperties {
    pub handler: String,
    pub parameter: Option<String>,
    /// Final resolved property name, for diagnostics and write-back.
    pub property_name: String,
    pub expression: BindingExpression,
    pub attr_key: String,
    pub attr_value: String,
    /// View-model of the surrounding walk.
    pub vm: Vm,
    pub parent_vm: Option<Vm>,
    /// Object the binding's property resolves on.
    pub scope: Vm,
    pub value: BindingValue,
    pub element: NodeRef,
    pub is_cacheable: bool,
}

/// Three-way parse outcome.
pub enum ParsedBinding {
    /// The attribute is not engine syntax; ignore it.
    NotApplicable,
    /// Engine syntax, but currently unresolvable. The dependency tree
    /// lists the `(object, property)` pairs whose change should trigger a
    /// re-parse. An empty tree means nothing can ever retry it.
    Pending { dependencies: DependencyTree },
    Ready {
        properties: Box<BindingProperties>,
        dependencies: DependencyTree,
    },
}

/// Everything expression compilation resolves against.
pub struct CompileInput<'a> {
    pub registry: &'a ScopeRegistry,
    pub transform_lookup: &'a dyn Fn(&str) -> Option<Transform>,
    pub vm: &'a Vm,
    pub parent: Option<&'a Vm>,
}

pub enum CompiledValue {
    Pending(DependencyTree),
    Ready {
        value: BindingValue,
        scope: Vm,
        property_name: String,
        is_cacheable: bool,
        dependencies: DependencyTree,
    },
}

/// One resolved operand of a derived expression.
#[derive(Clone)]
enum ValueSource {
    Observable(Observable<Value>),
    Computed(Computed<Value>),
    Plain(Value),
    Scope(Vm),
}

impl ValueSource {
    fn current(&self) -> Value {
        match self {
            ValueSource::Observable(observable) => observable.get(),
            ValueSource::Computed(computed) => computed.get(),
            ValueSource::Plain(value) => value.clone(),
            ValueSource::Scope(vm) => Value::Object(vm.clone()),
        }
    }

    fn set(&self, value: Value) -> bool {
        match self {
            ValueSource::Observable(observable) => {
                observable.set(value);
                true
            }
            ValueSource::Computed(computed) => computed.set(value),
            _ => false,
        }
    }

    fn track_into(&self, computed: &Computed<Value>) {
        match self {
            ValueSource::Observable(observable) => computed.track(observable),
            ValueSource::Computed(source) => computed.track_computed(source),
            _ => {}
        }
    }

    fn into_binding_value(self) -> BindingValue {
        match self {
            ValueSource::Observable(observable) => BindingValue::Observable(observable),
            ValueSource::Computed(computed) => BindingValue::Computed(computed),
            ValueSource::Plain(value) => BindingValue::Plain(value),
            ValueSource::Scope(vm) => BindingValue::Scope(vm),
        }
    }
}

fn source_from(resolved: &ResolvedPath) -> ValueSource {
    if resolved.property_name == "this" {
        return ValueSource::Scope(resolved.scope.clone());
    }
    match resolved.scope.property(&resolved.property_name) {
        Some(Property::Observable(observable)) => ValueSource::Observable(observable),
        Some(Property::Computed(computed)) => ValueSource::Computed(computed),
        Some(Property::Plain(value)) => ValueSource::Plain(value),
        // The resolver guaranteed existence; a concurrent removal reads
        // as null.
        None => ValueSource::Plain(Value::Null),
    }
}

enum SourceResolution {
    Pending(DependencyTree),
    Ready {
        source: ValueSource,
        resolved: ResolvedPath,
    },
}

fn resolve_source(
    input: &CompileInput,
    path: &PropertyPath,
) -> Result<SourceResolution, BindingError> {
    match resolve_path(input.registry, input.vm, input.parent, path)? {
        None => {
            // Re-run resolution solely for its dependency pairs: they are
            // what a retry listens on.
            let mut dependencies = DependencyTree::new();
            collect_dependencies(input, path, &mut dependencies);
            Ok(SourceResolution::Pending(dependencies))
        }
        Some(resolved) => Ok(SourceResolution::Ready {
            source: source_from(&resolved),
            resolved,
        }),
    }
}

/// Walk as far as the path resolves and record every traversed pair.
fn collect_dependencies(input: &CompileInput, path: &PropertyPath, out: &mut DependencyTree) {
    let mut current = input.vm.clone();
    let mut parent = input.parent.cloned();
    for segment in &path.segments {
        if let Some(named) = input.registry.get(segment) {
            current = named;
            parent = None;
            continue;
        }
        if segment == "super" {
            match parent.take() {
                Some(outer) => current = outer,
                None => return,
            }
            continue;
        }
        if !current.has(segment) {
            return;
        }
        out.push((current.clone(), segment.clone()));
        match current.get(segment) {
            Some(Value::Object(vm)) => current = vm,
            _ => return,
        }
    }
}

pub fn compile_expression(
    input: &CompileInput,
    expression: &BindingExpression,
) -> Result<CompiledValue, BindingError> {
    match expression {
        BindingExpression::Path(path) => match resolve_source(input, path)? {
            SourceResolution::Pending(dependencies) => Ok(CompiledValue::Pending(dependencies)),
            SourceResolution::Ready { source, resolved } => Ok(CompiledValue::Ready {
                value: source.into_binding_value(),
                is_cacheable: resolved.is_cacheable_for(input.vm),
                property_name: resolved.property_name.clone(),
                scope: resolved.scope,
                dependencies: resolved.dependencies,
            }),
        },

        BindingExpression::StringLiteral(text) => Ok(CompiledValue::Ready {
            value: BindingValue::Plain(Value::Str(text.clone())),
            scope: input.vm.clone(),
            property_name: format!("'{text}'"),
            is_cacheable: true,
            dependencies: DependencyTree::new(),
        }),

        BindingExpression::Ternary {
            condition,
            when_true,
            when_false,
        } => {
            derive_unary(input, condition, {
                let when_true = when_true.clone();
                let when_false = when_false.clone();
                move |value| {
                    if value.truthy() {
                        Value::Str(when_true.clone())
                    } else {
                        Value::Str(when_false.clone())
                    }
                }
            })
        }

        BindingExpression::Comparison {
            left,
            operator,
            right,
        } => {
            let operator = *operator;
            let right = right.clone();
            derive_unary(input, left, move |value| {
                let equal = literal_matches(&value, &right);
                Value::Bool(match operator {
                    ComparisonOp::Equals => equal,
                    ComparisonOp::NotEquals => !equal,
                })
            })
        }

        BindingExpression::Negation(path) => {
            derive_unary(input, path, |value| Value::Bool(!value.truthy()))
        }

        BindingExpression::TransformCall {
            transform,
            argument,
        } => compile_transform_call(input, transform, argument),

        BindingExpression::Concat(segments) => compile_concat(input, segments),
    }
}

/// Compile a derived value reading a single path through `map`.
fn derive_unary(
    input: &CompileInput,
    path: &PropertyPath,
    map: impl Fn(Value) -> Value + 'static,
) -> Result<CompiledValue, BindingError> {
    match resolve_source(input, path)? {
        SourceResolution::Pending(dependencies) => Ok(CompiledValue::Pending(dependencies)),
        SourceResolution::Ready { source, resolved } => {
            let reader = source.clone();
            let computed = Computed::new(move || map(reader.current()));
            source.track_into(&computed);
            Ok(CompiledValue::Ready {
                value: BindingValue::Computed(computed),
                is_cacheable: resolved.is_cacheable_for(input.vm),
                property_name: resolved.property_name.clone(),
                scope: resolved.scope,
                dependencies: resolved.dependencies,
            })
        }
    }
}

fn literal_matches(value: &Value, literal: &Literal) -> bool {
    match (value, literal) {
        (Value::Str(a), Literal::Str(b)) => a == b,
        (Value::Number(a), Literal::Number(b)) => a == b,
        _ => false,
    }
}

fn compile_transform_call(
    input: &CompileInput,
    transform_path: &PropertyPath,
    argument: &PropertyPath,
) -> Result<CompiledValue, BindingError> {
    let (source, resolved) = match resolve_source(input, argument)? {
        SourceResolution::Pending(dependencies) => {
            return Ok(CompiledValue::Pending(dependencies))
        }
        SourceResolution::Ready { source, resolved } => (source, resolved),
    };

    let transform = lookup_transform(input, transform_path);
    let Some((transform, transform_cacheable)) = transform else {
        // Degrade to pass-through so a missing optional transform does not
        // take rendering down with it.
        log::warn!(
            "transform '{transform_path}' not found; '{argument}' binds without it"
        );
        return Ok(CompiledValue::Ready {
            value: source.into_binding_value(),
            is_cacheable: resolved.is_cacheable_for(input.vm),
            property_name: resolved.property_name.clone(),
            scope: resolved.scope,
            dependencies: resolved.dependencies,
        });
    };

    let reader = source.clone();
    let read_transform = transform.clone();
    let computed = Computed::new(move || read_transform.read(&reader.current()));
    source.track_into(&computed);

    let computed = if transform.is_two_way() {
        let writer = source.clone();
        let write_transform = transform.clone();
        computed.with_write(move |value: &Value| {
            if let Some(mapped) = write_transform.write(value) {
                writer.set(mapped);
            }
        })
    } else {
        computed
    };

    Ok(CompiledValue::Ready {
        value: BindingValue::Computed(computed),
        is_cacheable: resolved.is_cacheable_for(input.vm) && transform_cacheable,
        property_name: resolved.property_name.clone(),
        scope: resolved.scope,
        dependencies: resolved.dependencies,
    })
}

/// Resolve a transform by name: the control-transform registry first, then
/// as a primitive path in the scope chain. Any failure is `None`; the
/// caller degrades to pass-through.
fn lookup_transform(
    input: &CompileInput,
    transform_path: &PropertyPath,
) -> Option<(Transform, bool)> {
    if transform_path.segments.len() == 1 {
        if let Some(transform) = (input.transform_lookup)(&transform_path.segments[0]) {
            return Some((transform, true));
        }
    }
    let resolved = match resolve_path(input.registry, input.vm, input.parent, transform_path) {
        Ok(Some(resolved)) => resolved,
        _ => return None,
    };
    match resolved.scope.get(&resolved.property_name) {
        Some(Value::Transform(transform)) => {
            let cacheable = resolved.is_cacheable_for(input.vm);
            Some((transform, cacheable))
        }
        _ => None,
    }
}

#[derive(Clone)]
enum ConcatSource {
    Literal(String),
    Path(ValueSource),
}

fn compile_concat(
    input: &CompileInput,
    segments: &[ConcatSegment],
) -> Result<CompiledValue, BindingError> {
    let mut sources = Vec::with_capacity(segments.len());
    let mut dependencies = DependencyTree::new();
    let mut is_cacheable = true;
    let mut first_path: Option<ResolvedPath> = None;
    let mut pending = false;

    for segment in segments {
        match segment {
            ConcatSegment::Literal(text) => sources.push(ConcatSource::Literal(text.clone())),
            ConcatSegment::Path(path) => match resolve_source(input, path)? {
                SourceResolution::Pending(deps) => {
                    dependencies.extend(deps);
                    pending = true;
                }
                SourceResolution::Ready { source, resolved } => {
                    dependencies.extend(resolved.dependencies.iter().cloned());
                    is_cacheable &= resolved.is_cacheable_for(input.vm);
                    if first_path.is_none() {
                        first_path = Some(resolved);
                    }
                    sources.push(ConcatSource::Path(source));
                }
            },
        }
    }

    if pending {
        return Ok(CompiledValue::Pending(dependencies));
    }

    let readers: Vec<ConcatSource> = sources.clone();
    let computed = Computed::new(move || {
        let mut out = String::new();
        for source in &readers {
            match source {
                ConcatSource::Literal(text) => out.push_str(text),
                ConcatSource::Path(source) => {
                    out.push_str(&source.current().to_display_string())
                }
            }
        }
        Value::Str(out)
    });
    for source in &sources {
        if let ConcatSource::Path(source) = source {
            source.track_into(&computed);
        }
    }

    let (scope, property_name) = match &first_path {
        Some(resolved) => (resolved.scope.clone(), resolved.property_name.clone()),
        None => (input.vm.clone(), String::new()),
    };

    Ok(CompiledValue::Ready {
        value: BindingValue::Computed(computed),
        scope,
        property_name,
        is_cacheable,
        dependencies,
    })
}
