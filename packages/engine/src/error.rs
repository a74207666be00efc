//! Engine error taxonomy.
//!
//! Fatal configuration errors surface as [`BindingError`] values out of the
//! binding call. Retryable resolution failures never reach this type; they
//! are absorbed by the dependency-tree rebind protocol.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BindingError {
    /// A `@name` / `data-name` attribute referenced a handler that is not
    /// registered.
    #[error("unknown binding handler '{0}'")]
    UnknownHandler(String),

    /// A property path referenced a named scope that was never registered.
    #[error("undefined scope '{0}'")]
    UndefinedScope(String),

    /// A path segment does not exist on the scope it is resolved against.
    /// The segment name itself is wrong, so no retry can help.
    #[error("cannot resolve '{segment}' while binding '{path}'")]
    UnresolvableScope { path: String, segment: String },

    /// An invalid scope name was passed to the scope registry.
    #[error("invalid scope name '{0}'")]
    InvalidScopeName(String),

    /// Two handlers that both control the element's children were declared
    /// on the same element.
    #[error("element <{tag}> already has a binding controlling its children; '{attribute}' cannot be added")]
    MultipleChildControllers { tag: String, attribute: String },

    /// An array value reached a non-array binding, or the other way round.
    #[error("'{handler}' binding on '{property}' {reason}")]
    TypeMismatch {
        handler: String,
        property: String,
        reason: String,
    },

    #[error(transparent)]
    Markup(#[from] MarkupError),
}

/// Structural markup error raised by the DOM parser.
#[derive(Debug, Error)]
#[error("markup error at offset {offset}: {message}")]
pub struct MarkupError {
    pub offset: usize,
    pub message: String,
}

impl MarkupError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        MarkupError {
            offset,
            message: message.into(),
        }
    }
}
