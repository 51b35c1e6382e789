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

//! Recursive-descent parser.
//!
//! Each grammar level is one method returning `Ok(None)` when no expression
//! starts at the current token. Precedence, lowest first:
//!
//! ```text
//! expression  := logicalOr (ASSIGN logicalOr | ELVIS expression | '?' expression ':' expression)?
//! logicalOr   := logicalAnd (('or'|'||') logicalAnd)*
//! logicalAnd  := relational (('and'|'&&') relational)*
//! relational  := sum (relOp sum)?
//! sum         := product (('+'|'-'|'++') product)*
//! product     := powerIncDec (('*'|'/'|'%') powerIncDec)*
//! powerIncDec := unary ('^' unary)? ('++'|'--')?
//! unary       := ('!'|'+'|'-'|'++'|'--') unary | primary
//! primary     := startNode (node)*
//! ```

use super::span::Span;
use super::tokenizer::{Token, TokenKind, tokenize};
use crate::ast::{
    BinaryOperator, IncDecOperator, LiteralValue, Node, NodeKind, SelectionVariant, UnaryOperator,
};
use crate::core::error::NO_INSERTS;
use crate::core::{MessageKind, ParseError};
use std::sync::Arc;

type ParseResult<T> = Result<T, ParseError>;

/// Single-use parser over one expression's tokens
pub(crate) struct InternalParser<'a> {
    expression: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> InternalParser<'a> {
    /// Parse `expression` into an AST root
    pub(crate) fn parse(expression: &'a str) -> ParseResult<Node> {
        let tokens = tokenize(expression)?;
        let mut parser = InternalParser {
            expression,
            tokens,
            pos: 0,
        };
        let ast = parser.eat_expression()?;
        if let Some(extra) = parser.peek() {
            return Err(ParseError::new(
                MessageKind::MoreInput,
                extra.span.start,
                [extra.text().to_string()],
            ));
        }
        // nothing but whitespace or comments
        ast.ok_or_else(|| ParseError::new(MessageKind::Ood, 0, NO_INSERTS))
    }

    // === Token cursor ===

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn peek_kind(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn peek_any(&self, kinds: &[TokenKind]) -> bool {
        self.peek().is_some_and(|t| kinds.contains(&t.kind))
    }

    fn peek_identifier_named(&self, name: &str) -> bool {
        self.peek().is_some_and(|t| t.is_identifier_named(name))
    }

    fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token if it has `kind`
    fn consume_if(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek_kind(kind) {
            self.next_token()
        } else {
            None
        }
    }

    fn eat_token(&mut self, expected: TokenKind) -> ParseResult<Token> {
        match self.next_token() {
            None => Err(ParseError::new(
                MessageKind::Ood,
                self.expression.len(),
                NO_INSERTS,
            )),
            Some(t) if t.kind == expected => Ok(t),
            Some(t) => Err(ParseError::new(
                MessageKind::NotExpectedToken,
                t.span.start,
                [expected.text(), t.text()],
            )),
        }
    }

    /// Offset just past the last consumed token, or the next token's start
    fn here(&self) -> usize {
        self.peek()
            .map_or(self.expression.len(), |t| t.span.start)
    }

    fn missing_expression(&self) -> ParseError {
        match self.peek() {
            Some(t) => ParseError::new(
                MessageKind::NotExpectedToken,
                t.span.start,
                ["expression", t.text()],
            ),
            None => ParseError::new(MessageKind::Ood, self.expression.len(), NO_INSERTS),
        }
    }

    fn check_left(&self, operator: &Token, operand: Option<Node>) -> ParseResult<Node> {
        operand.ok_or_else(|| {
            ParseError::new(
                MessageKind::LeftOperandProblem,
                operator.span.start,
                NO_INSERTS,
            )
        })
    }

    fn check_right(&self, operand: Option<Node>) -> ParseResult<Node> {
        operand.ok_or_else(|| {
            ParseError::new(MessageKind::RightOperandProblem, self.here(), NO_INSERTS)
        })
    }

    // === Expression levels ===

    pub(crate) fn eat_expression(&mut self) -> ParseResult<Option<Node>> {
        let expr = self.eat_logical_or_expression()?;
        let Some(t) = self.peek().cloned() else {
            return Ok(expr);
        };
        // A missing left operand reads as null, e.g. `?: 'x'`
        let null_left = |t: &Token| {
            Node::new(
                NodeKind::Literal(LiteralValue::Null),
                Span::new(t.span.start, t.span.start),
            )
        };
        match t.kind {
            TokenKind::Assign => {
                let target = expr.unwrap_or_else(|| null_left(&t));
                self.next_token();
                let value = self.eat_logical_or_expression()?;
                let value = self.check_right(value)?;
                let span = target.span.to(value.span);
                Ok(Some(Node::new(
                    NodeKind::Assign {
                        target: Box::new(target),
                        value: Box::new(value),
                    },
                    span,
                )))
            }
            TokenKind::Elvis => {
                let value = expr.unwrap_or_else(|| null_left(&t));
                self.next_token();
                let fallback = match self.eat_expression()? {
                    Some(node) => node,
                    None => Node::new(
                        NodeKind::Literal(LiteralValue::Null),
                        Span::new(t.span.end, t.span.end),
                    ),
                };
                let span = value.span.to(fallback.span).to(t.span);
                Ok(Some(Node::new(
                    NodeKind::Elvis {
                        value: Box::new(value),
                        fallback: Box::new(fallback),
                    },
                    span,
                )))
            }
            TokenKind::QMark => {
                let condition = expr.unwrap_or_else(|| null_left(&t));
                self.next_token();
                let if_true = self.eat_expression()?;
                let if_true = self.check_right(if_true)?;
                self.eat_token(TokenKind::Colon)?;
                let if_false = self.eat_expression()?;
                let if_false = self.check_right(if_false)?;
                let span = condition.span.to(if_false.span);
                Ok(Some(Node::new(
                    NodeKind::Ternary {
                        condition: Box::new(condition),
                        if_true: Box::new(if_true),
                        if_false: Box::new(if_false),
                    },
                    span,
                )))
            }
            _ => Ok(expr),
        }
    }

    fn binary(op: BinaryOperator, left: Node, right: Node) -> Node {
        let span = left.span.to(right.span);
        Node::new(
            NodeKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    fn eat_logical_or_expression(&mut self) -> ParseResult<Option<Node>> {
        let mut expr = self.eat_logical_and_expression()?;
        while let Some(t) = self.consume_if(TokenKind::Or) {
            let left = self.check_left(&t, expr)?;
            let right = self.eat_logical_and_expression()?;
            let right = self.check_right(right)?;
            expr = Some(Self::binary(BinaryOperator::Or, left, right));
        }
        Ok(expr)
    }

    fn eat_logical_and_expression(&mut self) -> ParseResult<Option<Node>> {
        let mut expr = self.eat_relational_expression()?;
        while let Some(t) = self.consume_if(TokenKind::And) {
            let left = self.check_left(&t, expr)?;
            let right = self.eat_relational_expression()?;
            let right = self.check_right(right)?;
            expr = Some(Self::binary(BinaryOperator::And, left, right));
        }
        Ok(expr)
    }

    fn eat_relational_expression(&mut self) -> ParseResult<Option<Node>> {
        let expr = self.eat_sum_expression()?;
        let op = match self.peek().map(|t| t.kind) {
            Some(TokenKind::Eq) => BinaryOperator::Equal,
            Some(TokenKind::Ne) => BinaryOperator::NotEqual,
            Some(TokenKind::Lt) => BinaryOperator::LessThan,
            Some(TokenKind::Le) => BinaryOperator::LessThanOrEqual,
            Some(TokenKind::Gt) => BinaryOperator::GreaterThan,
            Some(TokenKind::Ge) => BinaryOperator::GreaterThanOrEqual,
            Some(TokenKind::InstanceOf) => BinaryOperator::InstanceOf,
            Some(TokenKind::Matches) => BinaryOperator::Matches,
            Some(TokenKind::Between) => BinaryOperator::Between,
            _ => return Ok(expr),
        };
        let Some(t) = self.next_token() else {
            return Ok(expr);
        };
        let left = self.check_left(&t, expr)?;
        let right = self.eat_sum_expression()?;
        let right = self.check_right(right)?;
        Ok(Some(Self::binary(op, left, right)))
    }

    fn eat_sum_expression(&mut self) -> ParseResult<Option<Node>> {
        let mut expr = self.eat_product_expression()?;
        while self.peek_any(&[TokenKind::Plus, TokenKind::Minus, TokenKind::Inc]) {
            let Some(t) = self.next_token() else { break };
            let left = self.check_left(&t, expr)?;
            let right = self.eat_product_expression()?;
            let right = self.check_right(right)?;
            // `a ++ b` is an addition
            let op = if t.kind == TokenKind::Minus {
                BinaryOperator::Subtract
            } else {
                BinaryOperator::Add
            };
            expr = Some(Self::binary(op, left, right));
        }
        Ok(expr)
    }

    fn eat_product_expression(&mut self) -> ParseResult<Option<Node>> {
        let mut expr = self.eat_power_inc_dec_expression()?;
        while self.peek_any(&[TokenKind::Star, TokenKind::Div, TokenKind::Mod]) {
            let Some(t) = self.next_token() else { break };
            let left = self.check_left(&t, expr)?;
            let right = self.eat_power_inc_dec_expression()?;
            let right = self.check_right(right)?;
            let op = match t.kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Div => BinaryOperator::Divide,
                _ => BinaryOperator::Modulus,
            };
            expr = Some(Self::binary(op, left, right));
        }
        Ok(expr)
    }

    fn eat_power_inc_dec_expression(&mut self) -> ParseResult<Option<Node>> {
        let expr = self.eat_unary_expression()?;
        if let Some(t) = self.consume_if(TokenKind::Power) {
            let left = self.check_left(&t, expr)?;
            let right = self.eat_unary_expression()?;
            let right = self.check_right(right)?;
            return Ok(Some(Self::binary(BinaryOperator::Power, left, right)));
        }
        // Postfix only binds to an operand that was actually produced
        if let Some(operand) = expr {
            let postfix = match self.peek().map(|t| t.kind) {
                Some(TokenKind::Dec) => true,
                // `a ++ b` is left to the sum level
                Some(TokenKind::Inc) => !self.peek_at(1).is_some_and(starts_operand),
                _ => false,
            };
            if postfix {
                if let Some(t) = self.next_token() {
                    let op = if t.kind == TokenKind::Inc {
                        IncDecOperator::Increment
                    } else {
                        IncDecOperator::Decrement
                    };
                    let span = operand.span.to(t.span);
                    return Ok(Some(Node::new(
                        NodeKind::IncDec {
                            op,
                            prefix: false,
                            operand: Box::new(operand),
                        },
                        span,
                    )));
                }
            }
            return Ok(Some(operand));
        }
        Ok(None)
    }

    fn eat_unary_expression(&mut self) -> ParseResult<Option<Node>> {
        if self.peek_any(&[TokenKind::Not, TokenKind::Plus, TokenKind::Minus]) {
            let Some(t) = self.next_token() else {
                return Ok(None);
            };
            if t.kind == TokenKind::Minus {
                if let Some(folded) = self.maybe_fold_negative_literal(&t)? {
                    return Ok(Some(folded));
                }
            }
            let operand = self.eat_unary_expression()?;
            let operand = self.check_right(operand)?;
            let op = match t.kind {
                TokenKind::Not => UnaryOperator::Not,
                TokenKind::Plus => UnaryOperator::Positive,
                _ => UnaryOperator::Negate,
            };
            let span = t.span.to(operand.span);
            return Ok(Some(Node::new(
                NodeKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            )));
        }
        if self.peek_any(&[TokenKind::Inc, TokenKind::Dec]) {
            let Some(t) = self.next_token() else {
                return Ok(None);
            };
            let operand = self.eat_unary_expression()?;
            let operand = self.check_right(operand)?;
            let op = if t.kind == TokenKind::Inc {
                IncDecOperator::Increment
            } else {
                IncDecOperator::Decrement
            };
            let span = t.span.to(operand.span);
            return Ok(Some(Node::new(
                NodeKind::IncDec {
                    op,
                    prefix: true,
                    operand: Box::new(operand),
                },
                span,
            )));
        }
        self.eat_primary_expression()
    }

    /// Fold `-` into a directly following decimal int or long literal so the
    /// most negative values are representable
    fn maybe_fold_negative_literal(&mut self, minus: &Token) -> ParseResult<Option<Node>> {
        let Some(literal) = self.peek() else {
            return Ok(None);
        };
        if !matches!(literal.kind, TokenKind::LiteralInt | TokenKind::LiteralLong)
            || literal.span.start != minus.span.end
        {
            return Ok(None);
        }
        // `-1.foo()` and `-1[0]` negate the navigation result instead
        if self
            .peek_at(1)
            .is_some_and(|t| matches!(t.kind, TokenKind::Dot | TokenKind::SafeNavi | TokenKind::LSquare))
        {
            return Ok(None);
        }
        let Some(literal) = self.next_token() else {
            return Ok(None);
        };
        let digits = format!("-{}", literal.text());
        let value = if literal.kind == TokenKind::LiteralInt {
            LiteralValue::parse_int(&digits, 10, minus.span.start)?
        } else {
            LiteralValue::parse_long(&digits, 10, minus.span.start)?
        };
        Ok(Some(Node::new(
            NodeKind::Literal(value),
            minus.span.to(literal.span),
        )))
    }

    fn eat_primary_expression(&mut self) -> ParseResult<Option<Node>> {
        let Some(start) = self.eat_start_node()? else {
            return Ok(None);
        };
        let mut nodes = vec![start];
        while let Some(node) = self.maybe_eat_node()? {
            nodes.push(node);
        }
        if nodes.len() == 1 {
            return Ok(nodes.pop());
        }
        let span = Span::new(nodes[0].start(), nodes[nodes.len() - 1].end());
        Ok(Some(Node::new(NodeKind::Compound(nodes), span)))
    }

    fn maybe_eat_node(&mut self) -> ParseResult<Option<Node>> {
        if self.peek_any(&[TokenKind::Dot, TokenKind::SafeNavi]) {
            return self.eat_dotted_node().map(Some);
        }
        self.maybe_eat_indexer(false)
    }

    fn eat_dotted_node(&mut self) -> ParseResult<Node> {
        let Some(dot) = self.next_token() else {
            return Err(ParseError::new(
                MessageKind::Ood,
                self.expression.len(),
                NO_INSERTS,
            ));
        };
        let null_safe = dot.kind == TokenKind::SafeNavi;
        if let Some(node) = self.maybe_eat_method_or_property(null_safe, true)? {
            return Ok(node);
        }
        if let Some(node) = self.maybe_eat_function_or_var()? {
            return Ok(node);
        }
        if let Some(node) = self.maybe_eat_projection(null_safe)? {
            return Ok(node);
        }
        if let Some(node) = self.maybe_eat_selection(null_safe)? {
            return Ok(node);
        }
        if null_safe {
            if let Some(node) = self.maybe_eat_indexer(true)? {
                return Ok(node);
            }
        }
        match self.peek() {
            None => Err(ParseError::new(
                MessageKind::Ood,
                dot.span.start,
                NO_INSERTS,
            )),
            Some(t) => Err(ParseError::new(
                MessageKind::UnexpectedDataAfterDot,
                dot.span.start,
                [t.text()],
            )),
        }
    }

    // === Start nodes ===

    fn eat_start_node(&mut self) -> ParseResult<Option<Node>> {
        if let Some(node) = self.maybe_eat_literal()? {
            return Ok(Some(node));
        }
        if let Some(node) = self.maybe_eat_paren_expression()? {
            return Ok(Some(node));
        }
        if let Some(node) = self.maybe_eat_type_reference()? {
            return Ok(Some(node));
        }
        if let Some(node) = self.maybe_eat_null_reference() {
            return Ok(Some(node));
        }
        if let Some(node) = self.maybe_eat_constructor_reference()? {
            return Ok(Some(node));
        }
        if let Some(node) = self.maybe_eat_method_or_property(false, false)? {
            return Ok(Some(node));
        }
        if let Some(node) = self.maybe_eat_function_or_var()? {
            return Ok(Some(node));
        }
        if let Some(node) = self.maybe_eat_bean_reference()? {
            return Ok(Some(node));
        }
        if let Some(node) = self.maybe_eat_projection(false)? {
            return Ok(Some(node));
        }
        if let Some(node) = self.maybe_eat_selection(false)? {
            return Ok(Some(node));
        }
        if let Some(node) = self.maybe_eat_indexer(false)? {
            return Ok(Some(node));
        }
        self.maybe_eat_inline_list_or_map()
    }

    fn maybe_eat_literal(&mut self) -> ParseResult<Option<Node>> {
        let Some(t) = self.peek() else {
            return Ok(None);
        };
        let start = t.span.start;
        let value = match t.kind {
            TokenKind::LiteralInt => LiteralValue::parse_int(t.text(), 10, start)?,
            TokenKind::LiteralLong => LiteralValue::parse_long(t.text(), 10, start)?,
            TokenKind::LiteralHexInt => LiteralValue::parse_int(t.text(), 16, start)?,
            TokenKind::LiteralHexLong => LiteralValue::parse_long(t.text(), 16, start)?,
            TokenKind::LiteralReal => LiteralValue::parse_real(t.text(), false, start)?,
            TokenKind::LiteralRealFloat => LiteralValue::parse_real(t.text(), true, start)?,
            TokenKind::LiteralString => LiteralValue::String(Arc::from(t.text())),
            TokenKind::Identifier if t.is_identifier_named("true") => LiteralValue::Boolean(true),
            TokenKind::Identifier if t.is_identifier_named("false") => {
                LiteralValue::Boolean(false)
            }
            _ => return Ok(None),
        };
        let span = t.span;
        self.pos += 1;
        Ok(Some(Node::new(NodeKind::Literal(value), span)))
    }

    fn maybe_eat_paren_expression(&mut self) -> ParseResult<Option<Node>> {
        if self.consume_if(TokenKind::LParen).is_none() {
            return Ok(None);
        }
        let expr = self.eat_expression()?;
        let Some(expr) = expr else {
            return Err(self.missing_expression());
        };
        self.eat_token(TokenKind::RParen)?;
        Ok(Some(expr))
    }

    /// `T`, `new` and `null` directly before `]` are plain names, e.g. `map[new]`
    fn keyword_used_as_key(&mut self) -> Option<Node> {
        if self.peek_at(1).is_some_and(|t| t.kind == TokenKind::RSquare) {
            let t = self.next_token()?;
            return Some(Node::new(
                NodeKind::PropertyOrField {
                    name: Arc::from(t.text()),
                    null_safe: false,
                },
                t.span,
            ));
        }
        None
    }

    fn maybe_eat_type_reference(&mut self) -> ParseResult<Option<Node>> {
        let is_type = self
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Identifier && t.text() == "T");
        if !is_type {
            return Ok(None);
        }
        if let Some(key) = self.keyword_used_as_key() {
            return Ok(Some(key));
        }
        let Some(t) = self.next_token() else {
            return Ok(None);
        };
        self.eat_token(TokenKind::LParen)?;
        let (name, _) = self.eat_possibly_qualified_id()?;
        let mut dimensions = 0;
        while self.consume_if(TokenKind::LSquare).is_some() {
            self.eat_token(TokenKind::RSquare)?;
            dimensions += 1;
        }
        let close = self.eat_token(TokenKind::RParen)?;
        Ok(Some(Node::new(
            NodeKind::TypeReference {
                name: Arc::from(name),
                dimensions,
            },
            t.span.to(close.span),
        )))
    }

    fn maybe_eat_null_reference(&mut self) -> Option<Node> {
        if !self.peek_identifier_named("null") {
            return None;
        }
        if let Some(key) = self.keyword_used_as_key() {
            return Some(key);
        }
        let t = self.next_token()?;
        Some(Node::new(NodeKind::Literal(LiteralValue::Null), t.span))
    }

    fn maybe_eat_constructor_reference(&mut self) -> ParseResult<Option<Node>> {
        if !self.peek_identifier_named("new") {
            return Ok(None);
        }
        if let Some(key) = self.keyword_used_as_key() {
            return Ok(Some(key));
        }
        let Some(new_token) = self.next_token() else {
            return Ok(None);
        };
        let (type_name, name_span) = self.eat_possibly_qualified_id()?;
        let type_name: Arc<str> = Arc::from(type_name);

        if self.peek_kind(TokenKind::LSquare) {
            let mut dimensions = Vec::new();
            let mut end = name_span.end;
            while self.consume_if(TokenKind::LSquare).is_some() {
                if self.peek_kind(TokenKind::RSquare) {
                    dimensions.push(None);
                } else {
                    let size = self.eat_expression()?;
                    let Some(size) = size else {
                        return Err(self.missing_expression());
                    };
                    dimensions.push(Some(size));
                }
                end = self.eat_token(TokenKind::RSquare)?.span.end;
            }
            let initializer = match self.maybe_eat_inline_list_or_map()? {
                Some(node) if matches!(node.kind, NodeKind::InlineList(_)) => Some(Box::new(node)),
                Some(node) => {
                    return Err(ParseError::new(
                        MessageKind::NotExpectedToken,
                        node.start(),
                        ["{", "{:"],
                    ));
                }
                None => None,
            };
            if let Some(init) = &initializer {
                if dimensions.len() > 1 {
                    return Err(ParseError::new(
                        MessageKind::MultidimArrayInitializerNotSupported,
                        init.start(),
                        NO_INSERTS,
                    ));
                }
                end = init.end();
            } else if dimensions.iter().any(Option::is_none) {
                return Err(ParseError::new(
                    MessageKind::MissingArrayDimension,
                    new_token.span.start,
                    NO_INSERTS,
                ));
            }
            return Ok(Some(Node::new(
                NodeKind::ArrayConstructor {
                    type_name,
                    dimensions,
                    initializer,
                },
                Span::new(new_token.span.start, end),
            )));
        }

        if !self.peek_kind(TokenKind::LParen) {
            return Err(ParseError::new(
                MessageKind::MissingConstructorArgs,
                self.here(),
                NO_INSERTS,
            ));
        }
        let (args, close) = self.eat_method_args()?;
        Ok(Some(Node::new(
            NodeKind::ConstructorReference { type_name, args },
            Span::new(new_token.span.start, close),
        )))
    }

    /// Accumulate a dotted name such as `org.acme.Person`
    fn eat_possibly_qualified_id(&mut self) -> ParseResult<(String, Span)> {
        let mut pieces: Vec<String> = Vec::new();
        let mut span: Option<Span> = None;
        while let Some(t) = self.peek() {
            if !is_valid_qualified_id(t) {
                break;
            }
            span = Some(span.map_or(t.span, |s| s.to(t.span)));
            if t.kind != TokenKind::Dot {
                pieces.push(t.text().to_string());
            }
            self.pos += 1;
        }
        match span {
            Some(span) if !pieces.is_empty() => Ok((pieces.join("."), span)),
            _ => match self.peek() {
                None => Err(ParseError::new(
                    MessageKind::Ood,
                    self.expression.len(),
                    NO_INSERTS,
                )),
                Some(t) => Err(ParseError::new(
                    MessageKind::NotExpectedToken,
                    t.span.start,
                    ["qualified ID", t.text()],
                )),
            },
        }
    }

    fn maybe_eat_method_or_property(
        &mut self,
        null_safe: bool,
        after_dot: bool,
    ) -> ParseResult<Option<Node>> {
        let accept = self.peek().is_some_and(|t| {
            if after_dot {
                t.looks_like_identifier()
            } else {
                t.is_identifier()
            }
        });
        if !accept {
            return Ok(None);
        }
        let Some(t) = self.next_token() else {
            return Ok(None);
        };
        let name: Arc<str> = Arc::from(t.text());
        if self.peek_kind(TokenKind::LParen) {
            let (args, close) = self.eat_method_args()?;
            return Ok(Some(Node::new(
                NodeKind::MethodReference {
                    name,
                    args,
                    null_safe,
                },
                Span::new(t.span.start, close),
            )));
        }
        Ok(Some(Node::new(
            NodeKind::PropertyOrField { name, null_safe },
            t.span,
        )))
    }

    fn maybe_eat_function_or_var(&mut self) -> ParseResult<Option<Node>> {
        let Some(hash) = self.consume_if(TokenKind::Hash) else {
            return Ok(None);
        };
        let name_token = self.eat_token(TokenKind::Identifier)?;
        let name: Arc<str> = Arc::from(name_token.text());
        if self.peek_kind(TokenKind::LParen) {
            let (args, close) = self.eat_method_args()?;
            return Ok(Some(Node::new(
                NodeKind::FunctionReference { name, args },
                Span::new(hash.span.start, close),
            )));
        }
        Ok(Some(Node::new(
            NodeKind::VariableReference { name },
            hash.span.to(name_token.span),
        )))
    }

    /// Eat `( arg, arg, ... )`; returns the arguments and the closing offset
    fn eat_method_args(&mut self) -> ParseResult<(Vec<Node>, usize)> {
        let open = self.eat_token(TokenKind::LParen)?;
        let mut args = Vec::new();
        if let Some(close) = self.consume_if(TokenKind::RParen) {
            return Ok((args, close.span.end));
        }
        loop {
            if self.peek().is_none() {
                return Err(ParseError::new(
                    MessageKind::RunOutOfArguments,
                    open.span.start,
                    NO_INSERTS,
                ));
            }
            let Some(arg) = self.eat_expression()? else {
                return Err(self.missing_expression());
            };
            args.push(arg);
            match self.peek().map(|t| t.kind) {
                Some(TokenKind::Comma) => {
                    self.pos += 1;
                }
                Some(_) => break,
                None => {
                    return Err(ParseError::new(
                        MessageKind::RunOutOfArguments,
                        open.span.start,
                        NO_INSERTS,
                    ));
                }
            }
        }
        let close = self.eat_token(TokenKind::RParen)?;
        Ok((args, close.span.end))
    }

    fn maybe_eat_bean_reference(&mut self) -> ParseResult<Option<Node>> {
        if !self.peek_any(&[TokenKind::BeanRef, TokenKind::FactoryBeanRef]) {
            return Ok(None);
        }
        let Some(sigil) = self.next_token() else {
            return Ok(None);
        };
        let name_token = match self.peek() {
            Some(t) if matches!(t.kind, TokenKind::Identifier | TokenKind::LiteralString) => {
                t.clone()
            }
            _ => {
                return Err(ParseError::new(
                    MessageKind::InvalidBeanReference,
                    sigil.span.start,
                    NO_INSERTS,
                ));
            }
        };
        self.pos += 1;
        Ok(Some(Node::new(
            NodeKind::BeanReference {
                name: Arc::from(name_token.text()),
                factory: sigil.kind == TokenKind::FactoryBeanRef,
            },
            sigil.span.to(name_token.span),
        )))
    }

    fn maybe_eat_projection(&mut self, null_safe: bool) -> ParseResult<Option<Node>> {
        let Some(open) = self.consume_if(TokenKind::Project) else {
            return Ok(None);
        };
        let Some(expression) = self.eat_expression()? else {
            return Err(self.missing_expression());
        };
        let close = self.eat_token(TokenKind::RSquare)?;
        Ok(Some(Node::new(
            NodeKind::Projection {
                expression: Box::new(expression),
                null_safe,
            },
            open.span.to(close.span),
        )))
    }

    fn maybe_eat_selection(&mut self, null_safe: bool) -> ParseResult<Option<Node>> {
        let variant = match self.peek().map(|t| t.kind) {
            Some(TokenKind::Select) => SelectionVariant::All,
            Some(TokenKind::SelectFirst) => SelectionVariant::First,
            Some(TokenKind::SelectLast) => SelectionVariant::Last,
            _ => return Ok(None),
        };
        let Some(open) = self.next_token() else {
            return Ok(None);
        };
        let Some(criteria) = self.eat_expression()? else {
            return Err(ParseError::new(
                MessageKind::MissingSelectionExpression,
                open.span.start,
                NO_INSERTS,
            ));
        };
        let close = self.eat_token(TokenKind::RSquare)?;
        Ok(Some(Node::new(
            NodeKind::Selection {
                variant,
                criteria: Box::new(criteria),
                null_safe,
            },
            open.span.to(close.span),
        )))
    }

    fn maybe_eat_indexer(&mut self, null_safe: bool) -> ParseResult<Option<Node>> {
        let Some(open) = self.consume_if(TokenKind::LSquare) else {
            return Ok(None);
        };
        let Some(index) = self.eat_expression()? else {
            return Err(self.missing_expression());
        };
        let close = self.eat_token(TokenKind::RSquare)?;
        Ok(Some(Node::new(
            NodeKind::Indexer {
                index: Box::new(index),
                null_safe,
            },
            open.span.to(close.span),
        )))
    }

    /// `{}` is an empty list, `{:}` an empty map; otherwise a `:` after the
    /// first element makes it a map
    fn maybe_eat_inline_list_or_map(&mut self) -> ParseResult<Option<Node>> {
        let Some(open) = self.consume_if(TokenKind::LCurly) else {
            return Ok(None);
        };
        if let Some(close) = self.consume_if(TokenKind::RCurly) {
            return Ok(Some(Node::new(
                NodeKind::InlineList(Vec::new()),
                open.span.to(close.span),
            )));
        }
        if self.consume_if(TokenKind::Colon).is_some() {
            let close = self.eat_token(TokenKind::RCurly)?;
            return Ok(Some(Node::new(
                NodeKind::InlineMap(Vec::new()),
                open.span.to(close.span),
            )));
        }

        let Some(first) = self.eat_expression()? else {
            return Err(self.missing_expression());
        };
        if self.consume_if(TokenKind::Colon).is_some() {
            let Some(first_value) = self.eat_expression()? else {
                return Err(self.missing_expression());
            };
            let mut entries = vec![(first, first_value)];
            while self.consume_if(TokenKind::Comma).is_some() {
                let Some(key) = self.eat_expression()? else {
                    return Err(self.missing_expression());
                };
                self.eat_token(TokenKind::Colon)?;
                let Some(value) = self.eat_expression()? else {
                    return Err(self.missing_expression());
                };
                entries.push((key, value));
            }
            let close = self.eat_token(TokenKind::RCurly)?;
            return Ok(Some(Node::new(
                NodeKind::InlineMap(entries),
                open.span.to(close.span),
            )));
        }

        let mut items = vec![first];
        while self.consume_if(TokenKind::Comma).is_some() {
            let Some(item) = self.eat_expression()? else {
                return Err(self.missing_expression());
            };
            items.push(item);
        }
        if !self.peek_kind(TokenKind::RCurly) {
            return Err(match self.peek() {
                Some(t) => ParseError::new(
                    MessageKind::NotExpectedToken,
                    t.span.start,
                    ["}", t.text()],
                ),
                None => ParseError::new(MessageKind::Ood, self.expression.len(), NO_INSERTS),
            });
        }
        let close = self.eat_token(TokenKind::RCurly)?;
        Ok(Some(Node::new(
            NodeKind::InlineList(items),
            open.span.to(close.span),
        )))
    }
}

/// Tokens that can begin a primary expression
fn starts_operand(token: &Token) -> bool {
    token.kind.is_numeric_literal()
        || matches!(
            token.kind,
            TokenKind::LiteralString
                | TokenKind::Identifier
                | TokenKind::LParen
                | TokenKind::LCurly
                | TokenKind::LSquare
                | TokenKind::Hash
                | TokenKind::BeanRef
                | TokenKind::FactoryBeanRef
                | TokenKind::Not
        )
}

/// Identifier, dot, or any non-string token spelled like `[\p{L}\p{N}_$]+`
fn is_valid_qualified_id(token: &Token) -> bool {
    match token.kind {
        TokenKind::LiteralString => false,
        TokenKind::Dot | TokenKind::Identifier => true,
        _ => token.data.as_deref().is_some_and(|text| {
            !text.is_empty()
                && text
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ast(expression: &str) -> String {
        InternalParser::parse(expression).unwrap().to_string()
    }

    fn error(expression: &str) -> ParseError {
        InternalParser::parse(expression).unwrap_err()
    }

    #[test]
    fn test_precedence_shapes() {
        assert_eq!(ast("2 + 3 * 4"), "(2 + (3 * 4))");
        assert_eq!(ast("(2 + 3) * 4"), "((2 + 3) * 4)");
        assert_eq!(ast("a or b and c"), "(a or (b and c))");
        assert_eq!(ast("2 ^ 3 * 2"), "((2 ^ 3) * 2)");
        assert_eq!(ast("1 - 2 - 3"), "((1 - 2) - 3)");
    }

    #[test]
    fn test_non_looping_tail_operators() {
        assert_eq!(ast("a ? b : c ? d : e"), "(a ? b : (c ? d : e))");
        assert_eq!(ast("a ?: b ?: c"), "a ?: b ?: c");
        assert_eq!(ast("x = 1"), "x=1");
    }

    #[test]
    fn test_increment_binding() {
        assert_eq!(ast("i++"), "i++");
        assert_eq!(ast("--i"), "--i");
        assert_eq!(ast("a ++ b"), "(a + b)");
        assert!(InternalParser::parse("++").is_err());
    }

    #[test]
    fn test_keywords_as_map_keys() {
        assert_eq!(ast("map[T]"), "map[T]");
        assert_eq!(ast("map[new]"), "map[new]");
        assert_eq!(ast("map[null]"), "map[null]");
        let node = InternalParser::parse("map[null]").unwrap();
        let NodeKind::Compound(parts) = &node.kind else {
            panic!("expected compound");
        };
        let NodeKind::Indexer { index, .. } = &parts[1].kind else {
            panic!("expected indexer");
        };
        assert_eq!(index.as_property_name(), Some("null"));
    }

    #[test]
    fn test_inline_collections() {
        assert!(matches!(
            InternalParser::parse("{}").unwrap().kind,
            NodeKind::InlineList(ref items) if items.is_empty()
        ));
        assert!(matches!(
            InternalParser::parse("{:}").unwrap().kind,
            NodeKind::InlineMap(ref entries) if entries.is_empty()
        ));
        assert_eq!(ast("{1,2,3}"), "{1,2,3}");
        assert_eq!(ast("{a:1,b:2}"), "{a:1,b:2}");
    }

    #[test]
    fn test_references() {
        assert_eq!(ast("T(java.lang.String[][])"), "T(java.lang.String[][])");
        assert_eq!(ast("new org.acme.Person('x', 1)"), "new org.acme.Person('x',1)");
        assert_eq!(ast("new int[2][3]"), "new int[2][3]");
        assert_eq!(ast("new String[]{'a','b'}"), "new String[]{'a','b'}");
        assert_eq!(ast("@orders"), "@orders");
        assert_eq!(ast("&factory"), "&factory");
        assert_eq!(ast("@'a.b'"), "@'a.b'");
        assert_eq!(ast("#fn(1)"), "#fn(1)");
        assert_eq!(ast("#this"), "#this");
    }

    #[test]
    fn test_navigation_chains() {
        assert_eq!(ast("a.b[0].c()"), "a.b[0].c()");
        assert_eq!(ast("a?.b?.c"), "a?.b?.c");
        assert_eq!(ast("list.?[x > 1]"), "list.?[(x > 1)]");
        assert_eq!(ast("list?.![name]"), "list?.![name]");
        assert_eq!(ast("list.^[x]"), "list.^[x]");
        assert_eq!(ast("a.and"), "a.and");
    }

    #[test]
    fn test_relational_is_single() {
        let err = error("1 < 2 < 3");
        assert_eq!(err.kind(), MessageKind::MoreInput);
        assert_eq!(err.position(), Some(6));
    }

    #[test]
    fn test_negative_literal_folding() {
        let node = InternalParser::parse("-2147483648").unwrap();
        assert_eq!(
            node.kind,
            NodeKind::Literal(LiteralValue::Integer(i32::MIN))
        );
        assert_eq!(ast("- 5"), "-5");
    }

    #[test]
    fn test_malformed_input() {
        let err = error("(");
        assert_eq!(err.kind(), MessageKind::Ood);
        assert!(err.position().is_some_and(|p| p >= 1));

        let err = error(")");
        assert_eq!(err.kind(), MessageKind::MoreInput);
        assert_eq!(err.position(), Some(0));

        for (text, token, at) in [("]", "]", 0), (" ,", ",", 1), ("}", "}", 0)] {
            let err = error(text);
            assert_eq!(err.kind(), MessageKind::MoreInput, "{text}");
            assert_eq!(err.position(), Some(at), "{text}");
            assert_eq!(err.inserts(), [token.to_string()], "{text}");
        }
        assert_eq!(error("  /* only a comment */ ").kind(), MessageKind::Ood);

        let err = error("a +");
        assert_eq!(err.kind(), MessageKind::RightOperandProblem);
        assert!(err.position().is_some_and(|p| p >= 2));

        assert_eq!(error("").kind(), MessageKind::Ood);
        assert_eq!(error("a.").kind(), MessageKind::Ood);
        assert_eq!(error("a.'x'").kind(), MessageKind::UnexpectedDataAfterDot);
        assert_eq!(error("list.?[]").kind(), MessageKind::MissingSelectionExpression);
        assert_eq!(error("@1").kind(), MessageKind::InvalidBeanReference);
        assert_eq!(error("new Foo").kind(), MessageKind::MissingConstructorArgs);
        assert_eq!(error("new int[]").kind(), MessageKind::MissingArrayDimension);
        assert_eq!(error("foo(1,").kind(), MessageKind::RunOutOfArguments);
        assert_eq!(error("T(String").kind(), MessageKind::Ood);
    }

    #[test]
    fn test_spans_nest() {
        let node = InternalParser::parse("a.b + c").unwrap();
        assert_eq!(node.span, Span::new(0, 7));
        node.walk(&mut |n| {
            for child in n.children() {
                assert!(n.span.contains(&child.span), "{n} does not contain {child}");
            }
        });
    }
}
