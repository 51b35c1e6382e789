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

//! Expression parser
//!
//! [`ExpressionParser`] is the entry point: it applies the configured
//! length limit, runs the template pre-pass when a [`TemplateContext`] is
//! given, and hands each embedded expression to the recursive-descent
//! parser.

pub(crate) mod parser;
pub mod span;
pub(crate) mod template;
pub mod tokenizer;

pub use span::{Span, Spanned};
pub use template::TemplateContext;
pub use tokenizer::{Token, TokenKind, Tokenizer, tokenize};

use crate::ast::Node;
use crate::core::{MessageKind, ParseError};
use crate::evaluator::{
    CompositeExpression, Expression, LiteralExpression, ParserConfig, StandardExpression,
};
use parser::InternalParser;
use std::sync::Arc;
use template::{TemplatePart, split_template};

/// Parse expression text into an AST without building an [`Expression`]
pub fn parse_ast(text: &str) -> Result<Node, ParseError> {
    InternalParser::parse(text).map_err(|e| e.with_expression(text))
}

/// Parses expression and template text into evaluable [`Expression`]s
#[derive(Debug, Clone, Default)]
pub struct ExpressionParser {
    config: Arc<ParserConfig>,
}

impl ExpressionParser {
    /// Parser with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser whose expressions share `config`
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a plain expression
    pub fn parse_expression(&self, text: &str) -> Result<Expression, ParseError> {
        self.standard(text).map(Expression::Standard)
    }

    /// Parse `text` as a template with expressions delimited by `context`
    pub fn parse_template(&self, text: &str, context: &TemplateContext) -> Result<Expression, ParseError> {
        log::debug!("parsing template '{text}'");
        let parts = split_template(text, context).map_err(|e| e.with_expression(text))?;
        match parts.as_slice() {
            [] => return Ok(Expression::Literal(LiteralExpression::new(""))),
            [TemplatePart::Literal(literal)] => {
                return Ok(Expression::Literal(LiteralExpression::new(literal.as_str())));
            }
            [TemplatePart::Expression(embedded)] => {
                return self.embedded(text, embedded).map(Expression::Standard);
            }
            _ => {}
        }
        let mut expressions = Vec::with_capacity(parts.len());
        for part in &parts {
            expressions.push(match part {
                TemplatePart::Literal(literal) => {
                    Expression::Literal(LiteralExpression::new(literal.as_str()))
                }
                TemplatePart::Expression(embedded) => {
                    Expression::Standard(self.embedded(text, embedded)?)
                }
            });
        }
        Ok(Expression::Composite(CompositeExpression::new(text, expressions)))
    }

    fn embedded(&self, template: &str, embedded: &Spanned<String>) -> Result<StandardExpression, ParseError> {
        self.standard(&embedded.value)
            .map_err(|e| e.shifted(embedded.start()).with_expression(template))
    }

    fn standard(&self, text: &str) -> Result<StandardExpression, ParseError> {
        let limit = self.config.maximum_expression_length;
        if text.len() > limit {
            return Err(ParseError::without_position(
                MessageKind::MaxExpressionLengthExceeded,
                [limit],
            )
            .with_expression(text));
        }
        log::debug!("parsing expression '{text}'");
        let ast = parse_ast(text)?;
        Ok(StandardExpression::new(text, ast, self.config.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_limit() {
        let parser = ExpressionParser::with_config(ParserConfig::new().with_maximum_expression_length(5));
        let err = parser.parse_expression("1 + 2 + 3").unwrap_err();
        assert_eq!(err.kind(), MessageKind::MaxExpressionLengthExceeded);
        assert_eq!(err.inserts(), &["5".to_string()]);
        assert!(parser.parse_expression("1 + 2").is_ok());
    }

    #[test]
    fn test_template_shapes() {
        let parser = ExpressionParser::new();
        let ctx = TemplateContext::default();
        assert!(matches!(parser.parse_template("plain", &ctx).unwrap(), Expression::Literal(_)));
        assert!(matches!(parser.parse_template("#{1 + 2}", &ctx).unwrap(), Expression::Standard(_)));
        assert!(matches!(parser.parse_template("#{ 1 }", &ctx).unwrap(), Expression::Standard(_)));
        assert!(matches!(parser.parse_template("x #{1}", &ctx).unwrap(), Expression::Composite(_)));
    }

    #[test]
    fn test_embedded_error_positions_are_template_relative() {
        let parser = ExpressionParser::new();
        let err = parser
            .parse_template("abc #{1 +}", &TemplateContext::default())
            .unwrap_err();
        assert_eq!(err.expression(), Some("abc #{1 +}"));
        assert!(err.position().is_some_and(|p| p >= 6));
    }
}
