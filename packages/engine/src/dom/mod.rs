//! Lightweight DOM: mutable node tree, markup parser and serializer.

pub mod lexer;
pub mod node;
pub mod parser;
pub mod serializer;
pub mod tags;

pub use node::{normalize_template, Event, HostProperty, Node, NodeExt, NodeKind, NodeRef};
pub use parser::parse_markup;
pub use serializer::{inner_html, outer_html};
