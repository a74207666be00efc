//! Imagine: a declarative data-binding engine over a lightweight DOM.
//!
//! Markup carries sigil-prefixed binding attributes (`@text`, `:value`,
//! `_title`, `#click`, `data-*` aliases) and `${...}` inline
//! interpolations; the engine parses them into live bindings against plain
//! observable view-models, resolves scope chains (named scopes, `super`,
//! nested paths with dependency-tracked re-resolution) and keeps DOM and
//! view-model synchronized in both directions. List rendering goes through
//! a shadow-template cache that skips re-parsing for repeated structures.
//!
//! The reactive substrate is the separate `imagine-observable` crate,
//! re-exported here as [`observable`].

pub mod binding;
pub mod chars;
pub mod diagnostics;
pub mod dom;
pub mod error;
pub mod expression_parser;
pub mod imagine;
pub mod tasks;
pub mod vm;

pub use binding::{BindingEngine, ScopeRegistry};
pub use error::{BindingError, MarkupError};
pub use imagine::{Imagine, ImagineOptions};
pub use vm::{Action, Property, Transform, Value, Vm};

pub use imagine_observable as observable;
