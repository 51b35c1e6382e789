// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tokenizer for expression text
//!
//! Converts raw text into a flat sequence of [`Token`]s with byte offsets.
//! Whitespace and `/* ... */` comments are discarded. The tokenizer has no
//! semantic knowledge; deciding what an identifier means is the parser's job.

use super::span::Span;
use crate::core::error::NO_INSERTS;
use crate::core::{MessageKind, ParseError};
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use unicode_xid::UnicodeXID;

/// Token kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    /// Decimal integer literal (e.g., 42)
    LiteralInt,
    /// Decimal long literal (e.g., 42L)
    LiteralLong,
    /// Hex integer literal (e.g., 0x1F)
    LiteralHexInt,
    /// Hex long literal (e.g., 0x1FL)
    LiteralHexLong,
    /// String literal, payload already unescaped
    LiteralString,
    /// Double literal (e.g., 3.14, 1e5, 2d)
    LiteralReal,
    /// Float literal (e.g., 3.14f)
    LiteralRealFloat,

    /// Identifier (e.g., name, $value, _x)
    Identifier,

    // Structural punctuation
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LSquare,
    /// `]`
    RSquare,
    /// `{`
    LCurly,
    /// `}`
    RCurly,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `.`
    Dot,
    /// `#`
    Hash,
    /// `?`
    QMark,
    /// `@`
    BeanRef,
    /// `&`
    FactoryBeanRef,

    // Operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/` or `div`
    Div,
    /// `%` or `mod`
    Mod,
    /// `^`
    Power,
    /// `!` or `not`
    Not,
    /// `=`
    Assign,
    /// `==` or `eq`
    Eq,
    /// `!=` or `ne`
    Ne,
    /// `<` or `lt`
    Lt,
    /// `<=` or `le`
    Le,
    /// `>` or `gt`
    Gt,
    /// `>=` or `ge`
    Ge,
    /// `++`
    Inc,
    /// `--`
    Dec,
    /// `&&` or `and`
    And,
    /// `||` or `or`
    Or,
    /// `instanceof`
    InstanceOf,
    /// `matches`
    Matches,
    /// `between`
    Between,
    /// `?:`
    Elvis,
    /// `?.`
    SafeNavi,
    /// `?[`
    Select,
    /// `^[`
    SelectFirst,
    /// `$[`
    SelectLast,
    /// `![`
    Project,
}

impl TokenKind {
    /// Canonical spelling of the token kind, used in messages
    pub fn text(&self) -> &'static str {
        match self {
            Self::LiteralInt | Self::LiteralLong => "integer literal",
            Self::LiteralHexInt | Self::LiteralHexLong => "hex literal",
            Self::LiteralString => "string literal",
            Self::LiteralReal | Self::LiteralRealFloat => "real literal",
            Self::Identifier => "identifier",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LSquare => "[",
            Self::RSquare => "]",
            Self::LCurly => "{",
            Self::RCurly => "}",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Dot => ".",
            Self::Hash => "#",
            Self::QMark => "?",
            Self::BeanRef => "@",
            Self::FactoryBeanRef => "&",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Power => "^",
            Self::Not => "!",
            Self::Assign => "=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Inc => "++",
            Self::Dec => "--",
            Self::And => "and",
            Self::Or => "or",
            Self::InstanceOf => "instanceof",
            Self::Matches => "matches",
            Self::Between => "between",
            Self::Elvis => "?:",
            Self::SafeNavi => "?.",
            Self::Select => "?[",
            Self::SelectFirst => "^[",
            Self::SelectLast => "$[",
            Self::Project => "![",
        }
    }

    /// True for numeric literal kinds
    pub fn is_numeric_literal(&self) -> bool {
        matches!(
            self,
            Self::LiteralInt
                | Self::LiteralLong
                | Self::LiteralHexInt
                | Self::LiteralHexLong
                | Self::LiteralReal
                | Self::LiteralRealFloat
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Textual operator aliases, matched case-insensitively
static KEYWORDS: Lazy<FxHashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    map.insert("and", TokenKind::And);
    map.insert("or", TokenKind::Or);
    map.insert("not", TokenKind::Not);
    map.insert("div", TokenKind::Div);
    map.insert("mod", TokenKind::Mod);
    map.insert("eq", TokenKind::Eq);
    map.insert("ne", TokenKind::Ne);
    map.insert("lt", TokenKind::Lt);
    map.insert("le", TokenKind::Le);
    map.insert("gt", TokenKind::Gt);
    map.insert("ge", TokenKind::Ge);
    map.insert("instanceof", TokenKind::InstanceOf);
    map.insert("matches", TokenKind::Matches);
    map.insert("between", TokenKind::Between);
    map
});

/// A token with its payload and source span
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind
    pub kind: TokenKind,
    /// Identifier text, keyword spelling or literal payload
    pub data: Option<Arc<str>>,
    /// Location in the input
    pub span: Span,
}

impl Token {
    fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            data: None,
            span: Span::new(start, end),
        }
    }

    fn with_data(kind: TokenKind, data: &str, start: usize, end: usize) -> Self {
        Self {
            kind,
            data: Some(Arc::from(data)),
            span: Span::new(start, end),
        }
    }

    /// Payload text, or the canonical spelling for punctuation
    pub fn text(&self) -> &str {
        self.data.as_deref().unwrap_or(self.kind.text())
    }

    /// True for an identifier token
    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    /// True for an identifier or a keyword spelled like one
    pub fn looks_like_identifier(&self) -> bool {
        match self.kind {
            TokenKind::Identifier => true,
            _ => self
                .data
                .as_deref()
                .is_some_and(|text| KEYWORDS.contains_key(text.to_ascii_lowercase().as_str())),
        }
    }

    /// Check for an identifier with the given case-insensitive text
    pub fn is_identifier_named(&self, name: &str) -> bool {
        self.kind == TokenKind::Identifier
            && self
                .data
                .as_deref()
                .is_some_and(|text| text.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(data) => write!(f, "[{}:{}]({}..{})", self.kind.text(), data, self.span.start, self.span.end),
            None => write!(f, "[{}]({}..{})", self.kind.text(), self.span.start, self.span.end),
        }
    }
}

/// Converts expression text into tokens
pub struct Tokenizer<'input> {
    input: &'input str,
    chars: Vec<(usize, char)>,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'input> Tokenizer<'input> {
    /// Create a tokenizer over `input`
    pub fn new(input: &'input str) -> Self {
        Self {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    /// Tokenize the whole input
    pub fn tokenize_all(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(ch) = self.peek_char(0) {
            match ch {
                ' ' | '\t' | '\r' | '\n' => self.pos += 1,
                '+' => self.one_or_two('+', TokenKind::Plus, TokenKind::Inc),
                '-' => self.one_or_two('-', TokenKind::Minus, TokenKind::Dec),
                '*' => self.single(TokenKind::Star),
                '%' => self.single(TokenKind::Mod),
                ':' => self.single(TokenKind::Colon),
                '.' => self.single(TokenKind::Dot),
                ',' => self.single(TokenKind::Comma),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LSquare),
                ']' => self.single(TokenKind::RSquare),
                '{' => self.single(TokenKind::LCurly),
                '}' => self.single(TokenKind::RCurly),
                '#' => self.single(TokenKind::Hash),
                '@' => self.single(TokenKind::BeanRef),
                '^' => self.one_or_two('[', TokenKind::Power, TokenKind::SelectFirst),
                '=' => self.one_or_two('=', TokenKind::Assign, TokenKind::Eq),
                '<' => self.one_or_two('=', TokenKind::Lt, TokenKind::Le),
                '>' => self.one_or_two('=', TokenKind::Gt, TokenKind::Ge),
                '&' => self.one_or_two('&', TokenKind::FactoryBeanRef, TokenKind::And),
                '!' => match self.peek_char(1) {
                    Some('=') => self.double(TokenKind::Ne),
                    Some('[') => self.double(TokenKind::Project),
                    _ => self.single(TokenKind::Not),
                },
                '?' => match self.peek_char(1) {
                    Some('[') => self.double(TokenKind::Select),
                    Some(':') => self.double(TokenKind::Elvis),
                    Some('.') => self.double(TokenKind::SafeNavi),
                    _ => self.single(TokenKind::QMark),
                },
                '|' => {
                    if self.peek_char(1) == Some('|') {
                        self.double(TokenKind::Or);
                    } else {
                        return Err(ParseError::new(
                            MessageKind::MissingCharacter,
                            self.offset(self.pos + 1),
                            ["|"],
                        ));
                    }
                }
                '/' => {
                    if self.peek_char(1) == Some('*') {
                        self.skip_comment()?;
                    } else {
                        self.single(TokenKind::Div);
                    }
                }
                '$' if self.peek_char(1) == Some('[') => self.double(TokenKind::SelectLast),
                '\'' | '"' => self.lex_string(ch)?,
                '0'..='9' => self.lex_number()?,
                c if is_identifier_start(c) => self.lex_identifier(),
                other => {
                    return Err(ParseError::new(
                        MessageKind::UnsupportedCharacter,
                        self.offset(self.pos),
                        [other.to_string(), format!("{}", u32::from(other))],
                    ));
                }
            }
        }
        log::trace!("tokenized {} tokens from {:?}", self.tokens.len(), self.input);
        Ok(self.tokens)
    }

    fn peek_char(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).map(|(_, c)| *c)
    }

    /// Byte offset of the char at index `pos`, or the input length past the end
    fn offset(&self, pos: usize) -> usize {
        self.chars
            .get(pos)
            .map_or(self.input.len(), |(offset, _)| *offset)
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.offset(self.pos);
        self.pos += 1;
        self.tokens.push(Token::new(kind, start, self.offset(self.pos)));
    }

    fn double(&mut self, kind: TokenKind) {
        let start = self.offset(self.pos);
        self.pos += 2;
        self.tokens.push(Token::new(kind, start, self.offset(self.pos)));
    }

    fn one_or_two(&mut self, second: char, one: TokenKind, two: TokenKind) {
        if self.peek_char(1) == Some(second) {
            self.double(two);
        } else {
            self.single(one);
        }
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let start = self.offset(self.pos);
        self.pos += 2;
        while let Some(ch) = self.peek_char(0) {
            if ch == '*' && self.peek_char(1) == Some('/') {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(ParseError::new(
            MessageKind::NonTerminatingComment,
            start,
            NO_INSERTS,
        ))
    }

    fn lex_string(&mut self, quote: char) -> Result<(), ParseError> {
        let start = self.offset(self.pos);
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.peek_char(0) {
                Some(ch) if ch == quote => {
                    // A doubled quote is an escaped quote
                    if self.peek_char(1) == Some(quote) {
                        text.push(quote);
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        break;
                    }
                }
                Some(ch) => {
                    text.push(ch);
                    self.pos += 1;
                }
                None => {
                    let kind = if quote == '\'' {
                        MessageKind::NonTerminatingQuotedString
                    } else {
                        MessageKind::NonTerminatingDoubleQuotedString
                    };
                    return Err(ParseError::new(kind, start, NO_INSERTS));
                }
            }
        }
        let end = self.offset(self.pos);
        self.tokens
            .push(Token::with_data(TokenKind::LiteralString, &text, start, end));
        Ok(())
    }

    fn lex_identifier(&mut self) {
        let start_pos = self.pos;
        while let Some(ch) = self.peek_char(0) {
            if self.pos > start_pos && !is_identifier_part(ch) {
                break;
            }
            self.pos += 1;
        }
        let start = self.offset(start_pos);
        let end = self.offset(self.pos);
        let text = &self.input[start..end];
        let kind = KEYWORDS
            .get(text.to_ascii_lowercase().as_str())
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.tokens.push(Token::with_data(kind, text, start, end));
    }

    fn take_digits(&mut self, hex: bool) -> usize {
        let from = self.pos;
        while let Some(ch) = self.peek_char(0) {
            let accept = if hex { ch.is_ascii_hexdigit() } else { ch.is_ascii_digit() };
            if !accept {
                break;
            }
            self.pos += 1;
        }
        self.pos - from
    }

    fn lex_number(&mut self) -> Result<(), ParseError> {
        let start_pos = self.pos;
        let start = self.offset(start_pos);

        if self.peek_char(0) == Some('0') && matches!(self.peek_char(1), Some('x' | 'X')) {
            self.pos += 2;
            let digits_from = self.offset(self.pos);
            if self.take_digits(true) == 0 {
                let text = &self.input[start..self.offset(self.pos)];
                return Err(ParseError::new(MessageKind::InvalidHexLiteral, start, [text]));
            }
            let digits_to = self.offset(self.pos);
            let digits = &self.input[digits_from..digits_to];
            if matches!(self.peek_char(0), Some('L' | 'l')) {
                self.pos += 1;
                let end = self.offset(self.pos);
                self.tokens
                    .push(Token::with_data(TokenKind::LiteralHexLong, digits, start, end));
            } else {
                self.tokens
                    .push(Token::with_data(TokenKind::LiteralHexInt, digits, start, digits_to));
            }
            return Ok(());
        }

        self.take_digits(false);
        let mut is_real = false;

        // A dot only continues the number when a digit follows it
        if self.peek_char(0) == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            is_real = true;
            self.pos += 1;
            self.take_digits(false);
        }

        if matches!(self.peek_char(0), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_char(1), Some('+' | '-')));
            if self.peek_char(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                is_real = true;
                self.pos += 1 + sign;
                self.take_digits(false);
            }
        }

        let body_end = self.offset(self.pos);
        let body = &self.input[start..body_end];

        match self.peek_char(0) {
            Some('L' | 'l') => {
                if is_real {
                    return Err(ParseError::new(
                        MessageKind::RealCannotBeLong,
                        start,
                        NO_INSERTS,
                    ));
                }
                self.pos += 1;
                let end = self.offset(self.pos);
                self.tokens
                    .push(Token::with_data(TokenKind::LiteralLong, body, start, end));
            }
            Some('f' | 'F') => {
                self.pos += 1;
                let end = self.offset(self.pos);
                self.tokens
                    .push(Token::with_data(TokenKind::LiteralRealFloat, body, start, end));
            }
            Some('d' | 'D') => {
                self.pos += 1;
                let end = self.offset(self.pos);
                self.tokens
                    .push(Token::with_data(TokenKind::LiteralReal, body, start, end));
            }
            _ => {
                let kind = if is_real { TokenKind::LiteralReal } else { TokenKind::LiteralInt };
                self.tokens.push(Token::with_data(kind, body, start, body_end));
            }
        }

        debug_assert!(self.pos > start_pos);
        Ok(())
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch == '$' || ch.is_xid_start()
}

fn is_identifier_part(ch: char) -> bool {
    ch == '$' || ch.is_xid_continue()
}

/// Tokenize `input` in one call
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    Tokenizer::new(input).tokenize_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_numeric_literals() {
        let tokens = tokenize("42 10L 0x1F 0x1FL 3.14 1e3 2.5f 7d").unwrap();
        let pairs: Vec<(TokenKind, &str)> = tokens.iter().map(|t| (t.kind, t.text())).collect();
        assert_eq!(
            pairs,
            vec![
                (TokenKind::LiteralInt, "42"),
                (TokenKind::LiteralLong, "10"),
                (TokenKind::LiteralHexInt, "1F"),
                (TokenKind::LiteralHexLong, "1F"),
                (TokenKind::LiteralReal, "3.14"),
                (TokenKind::LiteralReal, "1e3"),
                (TokenKind::LiteralRealFloat, "2.5"),
                (TokenKind::LiteralReal, "7"),
            ]
        );
    }

    #[test]
    fn test_dot_after_integer_is_navigation() {
        assert_eq!(
            kinds("1.toString()"),
            vec![
                TokenKind::LiteralInt,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_operators_and_keywords() {
        assert_eq!(
            kinds("a ?. b ?: c ?[ ^[ $[ ![ ++ -- || && AND Or instanceof"),
            vec![
                TokenKind::Identifier,
                TokenKind::SafeNavi,
                TokenKind::Identifier,
                TokenKind::Elvis,
                TokenKind::Identifier,
                TokenKind::Select,
                TokenKind::SelectFirst,
                TokenKind::SelectLast,
                TokenKind::Project,
                TokenKind::Inc,
                TokenKind::Dec,
                TokenKind::Or,
                TokenKind::And,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::InstanceOf,
            ]
        );
    }

    #[test]
    fn test_string_escapes_and_offsets() {
        let tokens = tokenize("  'it''s' \"say \"\"hi\"\"\"").unwrap();
        assert_eq!(tokens[0].text(), "it's");
        assert_eq!(tokens[0].span, Span::new(2, 9));
        assert_eq!(tokens[1].text(), "say \"hi\"");
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("1 /* note */ + 2"),
            vec![TokenKind::LiteralInt, TokenKind::Plus, TokenKind::LiteralInt]
        );
    }

    #[test]
    fn test_errors_carry_offsets() {
        let err = tokenize("'abc").unwrap_err();
        assert_eq!(err.kind(), MessageKind::NonTerminatingQuotedString);
        assert_eq!(err.position(), Some(0));

        let err = tokenize("a ~ b").unwrap_err();
        assert_eq!(err.kind(), MessageKind::UnsupportedCharacter);
        assert_eq!(err.position(), Some(2));

        let err = tokenize("1.5L").unwrap_err();
        assert_eq!(err.kind(), MessageKind::RealCannotBeLong);

        let err = tokenize("a | b").unwrap_err();
        assert_eq!(err.kind(), MessageKind::MissingCharacter);
    }

    #[test]
    fn test_identifiers_with_sigils() {
        let tokens = tokenize("$value _x naïve").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text()).collect();
        assert_eq!(texts, vec!["$value", "_x", "naïve"]);
    }
}
