//! Node tree to markup.
//!
//! Host-property slots, listeners and synthetic template ids are invisible
//! to serialization, so cached-template output can be compared byte for
//! byte with full-parse output.

use super::node::{NodeKind, NodeRef};
use super::tags::is_void_element;

/// Serialize a node including its own tag.
pub fn outer_html(node: &NodeRef) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

/// Serialize only the node's children.
pub fn inner_html(node: &NodeRef) -> String {
    let mut out = String::new();
    for child in node.children() {
        write_node(&child, &mut out);
    }
    out
}

fn write_node(node: &NodeRef, out: &mut String) {
    match node.kind() {
        NodeKind::Text => out.push_str(&escape_text(&node.node_text())),
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(&node.node_text());
            out.push_str("-->");
        }
        NodeKind::Fragment => {
            for child in node.children() {
                write_node(&child, out);
            }
        }
        NodeKind::Element => {
            let tag = node.tag_name().to_string();
            out.push('<');
            out.push_str(&tag);
            for (name, value) in node.attributes_snapshot() {
                out.push(' ');
                out.push_str(&name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(&value));
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(&tag) && node.child_count() == 0 {
                return;
            }
            for child in node.children() {
                write_node(&child, out);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
