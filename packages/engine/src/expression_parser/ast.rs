//! Binding expression AST.

use std::fmt;

use serde::Serialize;

/// A dot-separated property path. `this` and leading `super` segments are
/// kept verbatim; the scope resolver interprets them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyPath {
    pub segments: Vec<String>,
}

impl PropertyPath {
    pub fn new(segments: Vec<String>) -> Self {
        PropertyPath { segments }
    }

    pub fn single(segment: &str) -> Self {
        PropertyPath {
            segments: vec![segment.to_string()],
        }
    }

    pub fn is_this(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == "this"
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonOp {
    Equals,
    NotEquals,
}

/// Literal operand of an equality comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Literal {
    Str(String),
    Number(f64),
}

/// One `+`-separated piece of a concatenation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum ConcatSegment {
    Literal(String),
    Path(PropertyPath),
}

/// A parsed binding expression, one variant per supported pattern.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum BindingExpression {
    Path(PropertyPath),
    StringLiteral(String),
    Ternary {
        condition: PropertyPath,
        when_true: String,
        when_false: String,
    },
    Comparison {
        left: PropertyPath,
        operator: ComparisonOp,
        right: Literal,
    },
    TransformCall {
        transform: PropertyPath,
        argument: PropertyPath,
    },
    Negation(PropertyPath),
    Concat(Vec<ConcatSegment>),
}

impl BindingExpression {
    /// The data paths the expression reads. The transform name path is not
    /// included; it resolves through the transform registry.
    pub fn data_paths(&self) -> Vec<&PropertyPath> {
        match self {
            BindingExpression::Path(path) => vec![path],
            BindingExpression::StringLiteral(_) => Vec::new(),
            BindingExpression::Ternary { condition, .. } => vec![condition],
            BindingExpression::Comparison { left, .. } => vec![left],
            BindingExpression::TransformCall { argument, .. } => vec![argument],
            BindingExpression::Negation(path) => vec![path],
            BindingExpression::Concat(segments) => segments
                .iter()
                .filter_map(|segment| match segment {
                    ConcatSegment::Path(path) => Some(path),
                    ConcatSegment::Literal(_) => None,
                })
                .collect(),
        }
    }
}
