//! Binding expression parser.
//!
//! The value grammar is a fixed set of patterns tried in priority order:
//! primitive path or string literal, ternary, equality comparison,
//! transform application, negation, concatenation. Anything else is an
//! unsupported pattern — the engine treats that as unresolvable, not as a
//! foreign attribute.

use super::ast::{BindingExpression, ComparisonOp, ConcatSegment, Literal, PropertyPath};
use super::lexer::{tokenize, ExpressionError, Token};

pub fn parse(input: &str) -> Result<BindingExpression, ExpressionError> {
    let tokens = tokenize(input)?;

    if let Some(expression) = try_primitive(&tokens) {
        return Ok(expression);
    }
    if let Some(expression) = try_ternary(&tokens) {
        return Ok(expression);
    }
    if let Some(expression) = try_comparison(&tokens) {
        return Ok(expression);
    }
    if let Some(expression) = try_transform(&tokens) {
        return Ok(expression);
    }
    if let Some(expression) = try_negation(&tokens) {
        return Ok(expression);
    }
    if let Some(expression) = try_concat(&tokens) {
        return Ok(expression);
    }

    Err(ExpressionError::UnsupportedPattern(input.trim().to_string()))
}

/// `ident(.ident)*` covering the whole slice.
fn path_from(tokens: &[Token]) -> Option<PropertyPath> {
    if tokens.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    let mut expect_identifier = true;
    for token in tokens {
        if expect_identifier {
            if !token.is_identifier() {
                return None;
            }
            segments.push(token.text.clone());
        } else if !token.is_operator(".") {
            return None;
        }
        expect_identifier = !expect_identifier;
    }
    // The slice must end on an identifier, not a trailing dot.
    if expect_identifier {
        return None;
    }
    Some(PropertyPath::new(segments))
}

fn try_primitive(tokens: &[Token]) -> Option<BindingExpression> {
    if tokens.len() == 1 && tokens[0].is_string() {
        return Some(BindingExpression::StringLiteral(tokens[0].text.clone()));
    }
    path_from(tokens).map(BindingExpression::Path)
}

/// `path ? 'a' : 'b'`
fn try_ternary(tokens: &[Token]) -> Option<BindingExpression> {
    let question = tokens.iter().position(|t| t.is_operator("?"))?;
    let condition = path_from(&tokens[..question])?;
    let rest = &tokens[question + 1..];
    if rest.len() != 3 || !rest[0].is_string() || !rest[1].is_operator(":") || !rest[2].is_string()
    {
        return None;
    }
    Some(BindingExpression::Ternary {
        condition,
        when_true: rest[0].text.clone(),
        when_false: rest[2].text.clone(),
    })
}

/// `path == 'str'`, `path != 42`
fn try_comparison(tokens: &[Token]) -> Option<BindingExpression> {
    let op_index = tokens
        .iter()
        .position(|t| t.is_operator("==") || t.is_operator("!="))?;
    let left = path_from(&tokens[..op_index])?;
    let operator = if tokens[op_index].is_operator("==") {
        ComparisonOp::Equals
    } else {
        ComparisonOp::NotEquals
    };
    let rest = &tokens[op_index + 1..];
    if rest.len() != 1 {
        return None;
    }
    let right = if rest[0].is_string() {
        Literal::Str(rest[0].text.clone())
    } else if rest[0].is_number() {
        Literal::Number(rest[0].num_value)
    } else {
        return None;
    };
    Some(BindingExpression::Comparison {
        left,
        operator,
        right,
    })
}

/// `transformName(path)`
fn try_transform(tokens: &[Token]) -> Option<BindingExpression> {
    let open = tokens.iter().position(|t| t.is_operator("("))?;
    let transform = path_from(&tokens[..open])?;
    let close = tokens.len().checked_sub(1)?;
    if close <= open || !tokens[close].is_operator(")") {
        return None;
    }
    let argument = path_from(&tokens[open + 1..close])?;
    Some(BindingExpression::TransformCall {
        transform,
        argument,
    })
}

/// `!path`
fn try_negation(tokens: &[Token]) -> Option<BindingExpression> {
    let first = tokens.first()?;
    if !first.is_operator("!") {
        return None;
    }
    path_from(&tokens[1..]).map(BindingExpression::Negation)
}

/// `a + 'literal' + b + ...`
fn try_concat(tokens: &[Token]) -> Option<BindingExpression> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut plus_count = 0;

    for index in 0..=tokens.len() {
        let at_plus = index < tokens.len() && tokens[index].is_operator("+");
        if !at_plus && index < tokens.len() {
            continue;
        }
        let part = &tokens[start..index];
        if part.len() == 1 && part[0].is_string() {
            segments.push(ConcatSegment::Literal(part[0].text.clone()));
        } else if let Some(path) = path_from(part) {
            segments.push(ConcatSegment::Path(path));
        } else {
            return None;
        }
        if at_plus {
            plus_count += 1;
            start = index + 1;
        }
    }

    if plus_count == 0 {
        return None;
    }
    Some(BindingExpression::Concat(segments))
}
