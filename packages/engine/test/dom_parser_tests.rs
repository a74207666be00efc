//! Tests for the markup parser, serializer and template normalization.

#[cfg(test)]
mod tests {
    use imagine_engine::dom::{
        inner_html, normalize_template, outer_html, parse_markup, NodeExt, NodeKind,
    };

    #[test]
    fn parses_elements_and_text() {
        let root = parse_markup("<div>hello</div>").unwrap();
        assert_eq!(root.kind(), NodeKind::Fragment);
        let div = root.first_child().unwrap();
        assert_eq!(div.tag_name(), "div");
        assert_eq!(div.text_content(), "hello");
    }

    #[test]
    fn parses_attributes_in_declaration_order() {
        let root = parse_markup(r#"<input type="text" :value="name" disabled>"#).unwrap();
        let input = root.first_child().unwrap();
        let attributes = input.attributes_snapshot();
        assert_eq!(
            attributes,
            vec![
                ("type".to_string(), "text".to_string()),
                (":value".to_string(), "name".to_string()),
                ("disabled".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn parses_single_quoted_and_unquoted_values() {
        let root = parse_markup("<div class='a b' id=main></div>").unwrap();
        let div = root.first_child().unwrap();
        assert_eq!(div.get_attribute("class").unwrap(), "a b");
        assert_eq!(div.get_attribute("id").unwrap(), "main");
    }

    #[test]
    fn void_elements_take_no_children() {
        let root = parse_markup("<div><br><span>x</span></div>").unwrap();
        let div = root.first_child().unwrap();
        let children = div.children();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].tag_name(), "br");
        assert_eq!(children[1].tag_name(), "span");
    }

    #[test]
    fn self_closing_custom_elements() {
        let root = parse_markup("<my-widget/><p>after</p>").unwrap();
        let children = root.children();
        assert_eq!(children.len(), 2);
        assert!(children[0].is_custom_element());
        assert_eq!(children[0].child_count(), 0);
    }

    #[test]
    fn parses_comments() {
        let root = parse_markup("<div><!-- note --></div>").unwrap();
        let div = root.first_child().unwrap();
        assert_eq!(div.first_child().unwrap().kind(), NodeKind::Comment);
    }

    #[test]
    fn decodes_entities_in_text_and_attributes() {
        let root = parse_markup(r#"<div title="a &amp; b">1 &lt; 2</div>"#).unwrap();
        let div = root.first_child().unwrap();
        assert_eq!(div.get_attribute("title").unwrap(), "a & b");
        assert_eq!(div.text_content(), "1 < 2");
    }

    #[test]
    fn unmatched_end_tags_are_dropped() {
        let root = parse_markup("<div>text</span></div>").unwrap();
        assert_eq!(outer_html(&root.first_child().unwrap()), "<div>text</div>");
    }

    #[test]
    fn end_tag_folds_up_open_elements() {
        let root = parse_markup("<div><span>a</div><p>b</p>").unwrap();
        let children = root.children();
        assert_eq!(children.len(), 2);
        assert_eq!(outer_html(&children[0]), "<div><span>a</span></div>");
        assert_eq!(outer_html(&children[1]), "<p>b</p>");
    }

    #[test]
    fn structural_errors_are_reported() {
        assert!(parse_markup("<div").is_err());
        assert!(parse_markup("<!-- never closed").is_err());
        assert!(parse_markup(r#"<div class="open>"#).is_err());
    }

    #[test]
    fn serializer_round_trips() {
        let markup = r#"<div class="card"><span>hi</span><br></div>"#;
        let root = parse_markup(markup).unwrap();
        assert_eq!(inner_html(&root), markup);
    }

    #[test]
    fn serializer_escapes_text_and_attributes() {
        let root = parse_markup("<div></div>").unwrap();
        let div = root.first_child().unwrap();
        div.set_attribute("title", "a \"b\" & c");
        div.set_text_content("1 < 2 & 3");
        assert_eq!(
            outer_html(&div),
            r#"<div title="a &quot;b&quot; &amp; c">1 &lt; 2 &amp; 3</div>"#
        );
    }

    #[test]
    fn normalize_drops_whitespace_and_merges_text() {
        let root = parse_markup("<div>\n  <span>a</span>\n  </div>").unwrap();
        let div = root.first_child().unwrap();
        normalize_template(&div);
        let children = div.children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].tag_name(), "span");
    }

    #[test]
    fn deep_clone_copies_structure_not_listeners() {
        let root = parse_markup(r#"<div id="x"><span>hi</span></div>"#).unwrap();
        let div = root.first_child().unwrap();
        div.add_event_listener("click", |_| {});
        let clone = div.deep_clone();
        assert_eq!(outer_html(&clone), outer_html(&div));
        assert!(clone.parent().is_none());
    }

    #[test]
    fn deep_clone_reseeds_declared_properties() {
        use imagine_engine::Value;

        let root = parse_markup("<my-check></my-check>").unwrap();
        let element = root.first_child().unwrap();
        element.declare_property_with_event("checked", Value::Bool(false), "change");

        let clone = element.deep_clone();
        let slot = clone.declared_property("checked").unwrap();
        assert_eq!(slot.notify_event.as_deref(), Some("change"));

        // The clone's box is its own.
        clone.set_property("checked", Value::Bool(true));
        assert_eq!(element.get_property("checked").unwrap(), Value::Bool(false));
    }
}
