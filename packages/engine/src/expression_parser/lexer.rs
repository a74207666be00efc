//! Binding expression tokenizer.

use serde::Serialize;
use thiserror::Error;

use crate::chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Identifier,
    String,
    Number,
    Operator,
}

#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub index: usize,
    pub kind: TokenKind,
    pub text: String,
    pub num_value: f64,
}

impl Token {
    fn new(index: usize, kind: TokenKind, text: String) -> Self {
        Token {
            index,
            kind,
            text,
            num_value: 0.0,
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_string(&self) -> bool {
        self.kind == TokenKind::String
    }

    pub fn is_number(&self) -> bool {
        self.kind == TokenKind::Number
    }

    pub fn is_operator(&self, operator: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == operator
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("unexpected character '{0}' at {1}")]
    UnexpectedCharacter(char, usize),
    #[error("unterminated string literal at {0}")]
    UnterminatedString(usize),
    #[error("'{0}' does not match any supported binding pattern")]
    UnsupportedPattern(String),
}

pub fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];

        if chars::is_whitespace(ch) {
            index += 1;
            continue;
        }

        if chars::is_identifier_start(ch) {
            let start = index;
            while index < chars.len() && chars::is_identifier_part(chars[index]) {
                index += 1;
            }
            let text: String = chars[start..index].iter().collect();
            tokens.push(Token::new(start, TokenKind::Identifier, text));
            continue;
        }

        if chars::is_digit(ch) {
            let start = index;
            while index < chars.len()
                && (chars::is_digit(chars[index]) || chars[index] == chars::PERIOD)
            {
                index += 1;
            }
            let text: String = chars[start..index].iter().collect();
            let num_value = text.parse().unwrap_or(0.0);
            let mut token = Token::new(start, TokenKind::Number, text);
            token.num_value = num_value;
            tokens.push(token);
            continue;
        }

        if ch == chars::SQ || ch == chars::DQ {
            let quote = ch;
            let start = index;
            index += 1;
            let mut text = String::new();
            loop {
                if index >= chars.len() {
                    return Err(ExpressionError::UnterminatedString(start));
                }
                if chars[index] == quote {
                    index += 1;
                    break;
                }
                text.push(chars[index]);
                index += 1;
            }
            tokens.push(Token::new(start, TokenKind::String, text));
            continue;
        }

        // Two-character operators first.
        if (ch == chars::EQ || ch == chars::BANG)
            && chars.get(index + 1) == Some(&chars::EQ)
        {
            let text: String = chars[index..index + 2].iter().collect();
            tokens.push(Token::new(index, TokenKind::Operator, text));
            index += 2;
            continue;
        }

        match ch {
            chars::PERIOD | chars::QUESTION | chars::COLON | chars::BANG | chars::PLUS
            | chars::LPAREN | chars::RPAREN => {
                tokens.push(Token::new(index, TokenKind::Operator, ch.to_string()));
                index += 1;
            }
            _ => return Err(ExpressionError::UnexpectedCharacter(ch, index)),
        }
    }

    Ok(tokens)
}
