//! Markup tokenizer.
//!
//! Scans a markup string into a flat token stream: start tags with their
//! attribute lists, end tags, text runs and comments. Entity references are
//! decoded in text and attribute values.

use crate::chars;
use crate::error::MarkupError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text(String),
    Comment(String),
}

pub struct Lexer {
    input: Vec<char>,
    index: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            index: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, MarkupError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek() {
            if ch == chars::LT {
                if self.looking_at("<!--") {
                    tokens.push(self.scan_comment()?);
                } else if self.peek_at(1) == Some(chars::SLASH) {
                    tokens.push(self.scan_end_tag()?);
                } else if self
                    .peek_at(1)
                    .map(chars::is_identifier_start)
                    .unwrap_or(false)
                {
                    tokens.push(self.scan_start_tag()?);
                } else {
                    // A lone '<' that does not open a tag is text.
                    tokens.push(self.scan_text());
                }
            } else {
                tokens.push(self.scan_text());
            }
        }

        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.index + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.index += 1;
        }
        ch
    }

    fn looking_at(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(offset, expected)| self.peek_at(offset) == Some(expected))
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map(chars::is_whitespace).unwrap_or(false) {
            self.index += 1;
        }
    }

    fn scan_text(&mut self) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.peek() {
            if ch == chars::LT
                && (self.looking_at("<!--")
                    || self.peek_at(1) == Some(chars::SLASH)
                    || self
                        .peek_at(1)
                        .map(chars::is_identifier_start)
                        .unwrap_or(false))
            {
                break;
            }
            text.push(ch);
            self.index += 1;
        }
        Token::Text(decode_entities(&text))
    }

    fn scan_comment(&mut self) -> Result<Token, MarkupError> {
        let start = self.index;
        self.index += 4; // consume "<!--"
        let mut content = String::new();
        loop {
            if self.peek().is_none() {
                return Err(MarkupError::new(start, "unterminated comment"));
            }
            if self.looking_at("-->") {
                self.index += 3;
                return Ok(Token::Comment(content));
            }
            content.push(self.advance().unwrap());
        }
    }

    fn scan_tag_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if chars::is_identifier_part(ch) || ch == chars::MINUS || ch == chars::COLON {
                name.push(ch);
                self.index += 1;
            } else {
                break;
            }
        }
        name
    }

    fn scan_end_tag(&mut self) -> Result<Token, MarkupError> {
        let start = self.index;
        self.index += 2; // consume "</"
        let name = self.scan_tag_name();
        self.skip_whitespace();
        match self.advance() {
            Some(ch) if ch == chars::GT => Ok(Token::EndTag {
                name: name.to_ascii_lowercase(),
            }),
            _ => Err(MarkupError::new(start, format!("malformed end tag '{name}'"))),
        }
    }

    fn scan_start_tag(&mut self) -> Result<Token, MarkupError> {
        let start = self.index;
        self.index += 1; // consume '<'
        let name = self.scan_tag_name();
        let mut attributes = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(MarkupError::new(start, format!("unterminated tag '{name}'"))),
                Some(ch) if ch == chars::GT => {
                    self.index += 1;
                    return Ok(Token::StartTag {
                        name: name.to_ascii_lowercase(),
                        attributes,
                        self_closing: false,
                    });
                }
                Some(ch) if ch == chars::SLASH => {
                    self.index += 1;
                    self.skip_whitespace();
                    match self.advance() {
                        Some(ch) if ch == chars::GT => {
                            return Ok(Token::StartTag {
                                name: name.to_ascii_lowercase(),
                                attributes,
                                self_closing: true,
                            })
                        }
                        _ => {
                            return Err(MarkupError::new(
                                start,
                                format!("malformed self-closing tag '{name}'"),
                            ))
                        }
                    }
                }
                Some(_) => attributes.push(self.scan_attribute(start)?),
            }
        }
    }

    fn scan_attribute(&mut self, tag_start: usize) -> Result<(String, String), MarkupError> {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if chars::is_whitespace(ch) || ch == chars::EQ || ch == chars::GT || ch == chars::SLASH
            {
                break;
            }
            name.push(ch);
            self.index += 1;
        }
        if name.is_empty() {
            return Err(MarkupError::new(tag_start, "malformed attribute"));
        }

        self.skip_whitespace();
        if self.peek() != Some(chars::EQ) {
            // Bare attribute.
            return Ok((name, String::new()));
        }
        self.index += 1; // consume '='
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote) if quote == chars::DQ || quote == chars::SQ => {
                self.index += 1;
                let mut value = String::new();
                loop {
                    match self.advance() {
                        None => {
                            return Err(MarkupError::new(
                                tag_start,
                                format!("unterminated attribute value for '{name}'"),
                            ))
                        }
                        Some(ch) if ch == quote => break,
                        Some(ch) => value.push(ch),
                    }
                }
                value
            }
            _ => {
                let mut value = String::new();
                while let Some(ch) = self.peek() {
                    if chars::is_whitespace(ch) || ch == chars::GT {
                        break;
                    }
                    value.push(ch);
                    self.index += 1;
                }
                value
            }
        };

        Ok((name, decode_entities(&value)))
    }
}

/// Decode the named entities the serializer emits, plus numeric references.
pub fn decode_entities(input: &str) -> String {
    if !input.contains(chars::AMPERSAND) {
        return input.to_string();
    }

    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut index = 0;

    while index < chars.len() {
        if chars[index] != chars::AMPERSAND {
            out.push(chars[index]);
            index += 1;
            continue;
        }
        let Some(end) = chars[index..]
            .iter()
            .take(10)
            .position(|&c| c == chars::SEMICOLON)
        else {
            out.push(chars[index]);
            index += 1;
            continue;
        };
        let entity: String = chars[index + 1..index + end].iter().collect();
        let decoded = match entity.as_str() {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{00A0}'),
            _ => entity
                .strip_prefix('#')
                .and_then(|digits| digits.parse::<u32>().ok())
                .and_then(char::from_u32),
        };
        match decoded {
            Some(ch) => {
                out.push(ch);
                index += end + 1;
            }
            None => {
                out.push(chars[index]);
                index += 1;
            }
        }
    }

    out
}
