//! Tests for the binding expression value grammar.

#[cfg(test)]
mod tests {
    use imagine_engine::expression_parser::{
        parse, BindingExpression, ComparisonOp, ConcatSegment, Literal, PropertyPath,
    };

    fn path(segments: &[&str]) -> PropertyPath {
        PropertyPath::new(segments.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn parses_single_segment_path() {
        assert_eq!(
            parse("title").unwrap(),
            BindingExpression::Path(path(&["title"]))
        );
    }

    #[test]
    fn parses_dotted_path() {
        assert_eq!(
            parse("user.address.city").unwrap(),
            BindingExpression::Path(path(&["user", "address", "city"]))
        );
    }

    #[test]
    fn parses_this_and_super_paths() {
        assert_eq!(parse("this").unwrap(), BindingExpression::Path(path(&["this"])));
        assert_eq!(
            parse("super.title").unwrap(),
            BindingExpression::Path(path(&["super", "title"]))
        );
    }

    #[test]
    fn parses_string_literal() {
        assert_eq!(
            parse("'hello world'").unwrap(),
            BindingExpression::StringLiteral("hello world".to_string())
        );
        assert_eq!(
            parse("\"double\"").unwrap(),
            BindingExpression::StringLiteral("double".to_string())
        );
    }

    #[test]
    fn parses_ternary() {
        assert_eq!(
            parse("user.active ? 'on' : 'off'").unwrap(),
            BindingExpression::Ternary {
                condition: path(&["user", "active"]),
                when_true: "on".to_string(),
                when_false: "off".to_string(),
            }
        );
    }

    #[test]
    fn parses_equality_with_string_literal() {
        assert_eq!(
            parse("state == 'done'").unwrap(),
            BindingExpression::Comparison {
                left: path(&["state"]),
                operator: ComparisonOp::Equals,
                right: Literal::Str("done".to_string()),
            }
        );
    }

    #[test]
    fn parses_inequality_with_number_literal() {
        assert_eq!(
            parse("count != 0").unwrap(),
            BindingExpression::Comparison {
                left: path(&["count"]),
                operator: ComparisonOp::NotEquals,
                right: Literal::Number(0.0),
            }
        );
    }

    #[test]
    fn parses_transform_call() {
        assert_eq!(
            parse("upper(user.name)").unwrap(),
            BindingExpression::TransformCall {
                transform: path(&["upper"]),
                argument: path(&["user", "name"]),
            }
        );
    }

    #[test]
    fn parses_negation() {
        assert_eq!(
            parse("!visible").unwrap(),
            BindingExpression::Negation(path(&["visible"]))
        );
    }

    #[test]
    fn parses_concatenation() {
        assert_eq!(
            parse("first + ' ' + last").unwrap(),
            BindingExpression::Concat(vec![
                ConcatSegment::Path(path(&["first"])),
                ConcatSegment::Literal(" ".to_string()),
                ConcatSegment::Path(path(&["last"])),
            ])
        );
    }

    #[test]
    fn ternary_wins_over_concat() {
        // Priority order is fixed; a ternary never parses as anything else.
        assert!(matches!(
            parse("flag ? 'a' : 'b'").unwrap(),
            BindingExpression::Ternary { .. }
        ));
    }

    #[test]
    fn rejects_unsupported_patterns() {
        assert!(parse("a ++ b").is_err());
        assert!(parse("call(a, b)").is_err());
        assert!(parse("items[0]").is_err());
        assert!(parse("a.b.").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(parse("'oops").is_err());
    }

    #[test]
    fn whitespace_is_insignificant() {
        assert_eq!(
            parse("  state  ==  'done'  ").unwrap(),
            parse("state=='done'").unwrap()
        );
    }

    #[test]
    fn data_paths_lists_read_paths() {
        let expression = parse("first + ' ' + last").unwrap();
        let paths: Vec<String> = expression
            .data_paths()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(paths, vec!["first", "last"]);

        // The transform name resolves through the registry, not the data
        // scope.
        let expression = parse("upper(name)").unwrap();
        let paths: Vec<String> = expression
            .data_paths()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(paths, vec!["name"]);
    }
}
