//! Markup parser: token stream to node tree.
//!
//! Lenient about tag matching the way browsers are: unmatched end tags are
//! dropped, elements left open at end of input are closed implicitly. Only
//! structurally broken syntax (unterminated tags, comments, attribute
//! values) is an error.

use super::lexer::{Lexer, Token};
use super::node::{Node, NodeExt, NodeRef};
use super::tags::is_void_element;
use crate::error::MarkupError;

/// Parse markup into a fragment node holding the top-level nodes.
pub fn parse_markup(input: &str) -> Result<NodeRef, MarkupError> {
    let tokens = Lexer::new(input).tokenize()?;
    let root = Node::fragment();
    let mut stack: Vec<NodeRef> = vec![root.clone()];

    for token in tokens {
        match token {
            Token::Text(content) => {
                if !content.is_empty() {
                    current(&stack).append_child(&Node::text(&content));
                }
            }
            Token::Comment(content) => {
                current(&stack).append_child(&Node::comment(&content));
            }
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                let element = Node::element(&name);
                for (attr_name, attr_value) in attributes {
                    element.set_attribute(&attr_name, &attr_value);
                }
                current(&stack).append_child(&element);
                if !self_closing && !is_void_element(&name) {
                    stack.push(element);
                }
            }
            Token::EndTag { name } => {
                if let Some(depth) = stack
                    .iter()
                    .rposition(|open| open.is_element() && open.tag_name() == name)
                {
                    // Implicitly closes anything opened in between.
                    stack.truncate(depth);
                }
            }
        }
    }

    Ok(root)
}

fn current(stack: &[NodeRef]) -> NodeRef {
    stack.last().expect("parser stack never empties").clone()
}
