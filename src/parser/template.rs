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

//! Template pre-pass: splits literal text from `#{...}` embedded expressions

use super::span::Spanned;
use crate::core::error::NO_INSERTS;
use crate::core::{MessageKind, ParseError};
use serde::{Deserialize, Serialize};

/// Delimiters marking embedded expressions inside template text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContext {
    prefix: String,
    suffix: String,
}

impl Default for TemplateContext {
    fn default() -> Self {
        Self {
            prefix: "#{".to_string(),
            suffix: "}".to_string(),
        }
    }
}

impl TemplateContext {
    /// Custom delimiters, e.g. `${` and `}`
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Opening delimiter
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Closing delimiter
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

/// One piece of a split template
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TemplatePart {
    /// Literal text copied verbatim
    Literal(String),
    /// Trimmed expression text, spanned at its offset in the template
    Expression(Spanned<String>),
}

/// Split `text` into literal and expression parts
pub(crate) fn split_template(
    text: &str,
    context: &TemplateContext,
) -> Result<Vec<TemplatePart>, ParseError> {
    let prefix = context.prefix();
    let suffix = context.suffix();
    let mut parts = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let Some(found) = text[start..].find(prefix) else {
            parts.push(TemplatePart::Literal(text[start..].to_string()));
            break;
        };
        let prefix_index = start + found;
        if prefix_index > start {
            parts.push(TemplatePart::Literal(text[start..prefix_index].to_string()));
        }
        let after_prefix = prefix_index + prefix.len();
        let Some(suffix_index) = skip_to_end_suffix(text, suffix, after_prefix)? else {
            return Err(ParseError::new(
                MessageKind::TemplateMissingSuffix,
                prefix_index,
                [
                    suffix.to_string(),
                    prefix_index.to_string(),
                    text[prefix_index..].to_string(),
                ],
            ));
        };
        let raw = &text[after_prefix..suffix_index];
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ParseError::new(
                MessageKind::TemplateEmptyExpression,
                prefix_index,
                [format!("{prefix}{suffix}"), prefix_index.to_string()],
            ));
        }
        let expr_start = after_prefix + (raw.len() - raw.trim_start().len());
        parts.push(TemplatePart::Expression(Spanned::new(
            trimmed.to_string(),
            expr_start,
            expr_start + trimmed.len(),
        )));
        start = suffix_index + suffix.len();
    }
    Ok(parts)
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Find the suffix closing the expression starting at `from`, skipping
/// bracketed regions and string literals
fn skip_to_end_suffix(text: &str, suffix: &str, from: usize) -> Result<Option<usize>, ParseError> {
    if !text[from..].contains(suffix) {
        return Ok(None);
    }
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut chars = text[from..].char_indices().map(|(i, c)| (i + from, c));
    while let Some((pos, ch)) = chars.next() {
        if stack.is_empty() && text[pos..].starts_with(suffix) {
            return Ok(Some(pos));
        }
        match ch {
            '{' | '[' | '(' => stack.push((ch, pos)),
            '}' | ']' | ')' => match stack.pop() {
                Some((open, _)) if closing_for(open) == ch => {}
                Some((open, _)) => {
                    return Err(ParseError::new(
                        MessageKind::TemplateUnbalancedBracket,
                        pos,
                        [ch.to_string(), pos.to_string(), closing_for(open).to_string()],
                    ));
                }
                None => {
                    let expected = match ch {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    return Err(ParseError::new(
                        MessageKind::TemplateUnbalancedBracket,
                        pos,
                        [ch.to_string(), pos.to_string(), expected.to_string()],
                    ));
                }
            },
            '\'' | '"' => {
                // Jump past the closing quote
                let closed = chars.by_ref().any(|(_, c)| c == ch);
                if !closed {
                    let kind = if ch == '\'' {
                        MessageKind::NonTerminatingQuotedString
                    } else {
                        MessageKind::NonTerminatingDoubleQuotedString
                    };
                    return Err(ParseError::new(kind, pos, NO_INSERTS));
                }
            }
            _ => {}
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expr(text: &str, start: usize) -> TemplatePart {
        TemplatePart::Expression(Spanned::new(text.to_string(), start, start + text.len()))
    }

    #[test]
    fn test_literal_only() {
        let parts = split_template("hello world", &TemplateContext::default()).unwrap();
        assert_eq!(parts, vec![TemplatePart::Literal("hello world".into())]);
        assert!(split_template("", &TemplateContext::default()).unwrap().is_empty());
    }

    #[test]
    fn test_mixed_parts() {
        let parts = split_template("Hi #{ name }!", &TemplateContext::default()).unwrap();
        assert_eq!(
            parts,
            vec![
                TemplatePart::Literal("Hi ".into()),
                expr("name", 6),
                TemplatePart::Literal("!".into()),
            ]
        );
    }

    #[test]
    fn test_nested_brackets_and_strings() {
        let parts = split_template("#{ {1,2}[0] + '}' }", &TemplateContext::default()).unwrap();
        assert_eq!(parts, vec![expr("{1,2}[0] + '}'", 3)]);
    }

    #[test]
    fn test_custom_delimiters() {
        let ctx = TemplateContext::new("${", "}");
        let parts = split_template("${a}${b}", &ctx).unwrap();
        assert_eq!(parts, vec![expr("a", 2), expr("b", 6)]);
    }

    #[test]
    fn test_errors() {
        let ctx = TemplateContext::default();
        assert_eq!(
            split_template("x #{a", &ctx).unwrap_err().kind(),
            MessageKind::TemplateMissingSuffix
        );
        assert_eq!(
            split_template("#{ }", &ctx).unwrap_err().kind(),
            MessageKind::TemplateEmptyExpression
        );
        assert_eq!(
            split_template("#{(a]}", &ctx).unwrap_err().kind(),
            MessageKind::TemplateUnbalancedBracket
        );
        assert_eq!(
            split_template("#{'abc}", &ctx).unwrap_err().kind(),
            MessageKind::NonTerminatingQuotedString
        );
    }
}
