//! Tag tables for the markup parser and serializer.

/// Elements that never have children and take no end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

/// Whether a tag name denotes a custom element (contains a dash).
pub fn is_custom_element_name(tag: &str) -> bool {
    tag.contains('-')
}
