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

//! Core error types.
//!
//! Every error carries a [`MessageKind`], the structured insert values used
//! to render its message, and a source offset where one applies. Callers
//! match on [`ParseError::kind`] / [`EvalError::kind`] rather than on text.

use super::error_code::{ErrorCategory, MessageKind};
use super::types::{TypeDescriptor, describe};
use std::sync::Arc;
use thiserror::Error;

/// Result type using the umbrella [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Result type for evaluation operations
pub type EvalResult<T> = std::result::Result<T, EvalError>;

fn render(kind: &MessageKind, inserts: &[String], position: &Option<usize>) -> String {
    match position {
        Some(pos) => format!("{kind}:(pos {pos}): {}", kind.format(inserts)),
        None => format!("{kind}: {}", kind.format(inserts)),
    }
}

/// Empty insert list for message kinds without placeholders
pub(crate) const NO_INSERTS: [&str; 0] = [];

fn to_inserts<I, S>(inserts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: ToString,
{
    inserts.into_iter().map(|s| s.to_string()).collect()
}

/// Error raised while tokenizing or parsing expression text
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", render(.kind, .inserts, .position))]
pub struct ParseError {
    /// Structured message kind
    kind: MessageKind,
    /// Values substituted into the message template
    inserts: Vec<String>,
    /// Byte offset of the failure within the expression
    position: Option<usize>,
    /// Expression text being parsed
    expression: Option<Arc<str>>,
}

impl ParseError {
    /// Create a parse error at `position`
    pub fn new<I, S>(kind: MessageKind, position: usize, inserts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            kind,
            inserts: to_inserts(inserts),
            position: Some(position),
            expression: None,
        }
    }

    /// Create a parse error without a source offset
    pub fn without_position<I, S>(kind: MessageKind, inserts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            kind,
            inserts: to_inserts(inserts),
            position: None,
            expression: None,
        }
    }

    /// Attach the expression text
    pub fn with_expression(mut self, expression: impl Into<Arc<str>>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    /// Move the position by `offset`, for text embedded in a larger string
    pub(crate) fn shifted(mut self, offset: usize) -> Self {
        self.position = self.position.map(|p| p + offset);
        self
    }

    /// Structured message kind
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Insert values
    pub fn inserts(&self) -> &[String] {
        &self.inserts
    }

    /// Byte offset of the failure
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Expression text, when known
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    /// Rendered message without code or position
    pub fn message(&self) -> String {
        self.kind.format(&self.inserts)
    }
}

/// Error raised by a resolver or a member body
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", render(.kind, .inserts, &None))]
pub struct AccessError {
    kind: MessageKind,
    inserts: Vec<String>,
}

impl AccessError {
    /// Create an access error of a given kind
    pub fn new<I, S>(kind: MessageKind, inserts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            kind,
            inserts: to_inserts(inserts),
        }
    }

    /// Free-form failure reported by embedder code
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::AccessFailed,
            inserts: vec![message.into()],
        }
    }

    /// Structured message kind
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Insert values
    pub fn inserts(&self) -> &[String] {
        &self.inserts
    }

    /// Rendered message
    pub fn message(&self) -> String {
        self.kind.format(&self.inserts)
    }
}

/// Error raised when a value cannot be converted between two types
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", render(.kind, .inserts, &None))]
pub struct ConversionError {
    kind: MessageKind,
    /// Source type, `None` for null
    source_type: Option<TypeDescriptor>,
    /// Requested target type
    target_type: TypeDescriptor,
    inserts: Vec<String>,
}

impl ConversionError {
    /// No conversion path exists between the two types
    pub fn no_path(source_type: Option<&TypeDescriptor>, target_type: &TypeDescriptor) -> Self {
        Self {
            kind: MessageKind::TypeConversionError,
            source_type: source_type.cloned(),
            target_type: target_type.clone(),
            inserts: vec![describe(source_type), target_type.name()],
        }
    }

    /// A conversion path exists but the value does not fit it
    pub fn failed(
        value: &str,
        source_type: Option<&TypeDescriptor>,
        target_type: &TypeDescriptor,
    ) -> Self {
        Self {
            kind: MessageKind::ConversionFailed,
            source_type: source_type.cloned(),
            target_type: target_type.clone(),
            inserts: vec![value.to_string(), describe(source_type), target_type.name()],
        }
    }

    /// Structured message kind
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Source type descriptor, `None` for null
    pub fn source_type(&self) -> Option<&TypeDescriptor> {
        self.source_type.as_ref()
    }

    /// Target type descriptor
    pub fn target_type(&self) -> &TypeDescriptor {
        &self.target_type
    }

    /// Insert values
    pub fn inserts(&self) -> &[String] {
        &self.inserts
    }
}

/// Error raised while evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", render(.kind, .inserts, .position))]
pub struct EvalError {
    kind: MessageKind,
    inserts: Vec<String>,
    position: Option<usize>,
    /// Underlying resolver or conversion failure
    #[source]
    cause: Option<Box<Error>>,
}

impl EvalError {
    /// Create an evaluation error without a position
    pub fn new<I, S>(kind: MessageKind, inserts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            kind,
            inserts: to_inserts(inserts),
            position: None,
            cause: None,
        }
    }

    /// Create an evaluation error at `position`
    pub fn at<I, S>(position: usize, kind: MessageKind, inserts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self::new(kind, inserts).with_position(position)
    }

    /// Set the source position
    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Set the source position unless one is already recorded
    pub fn or_position(mut self, position: usize) -> Self {
        if self.position.is_none() {
            self.position = Some(position);
        }
        self
    }

    /// Attach the underlying failure
    pub fn with_cause(mut self, cause: impl Into<Error>) -> Self {
        self.cause = Some(Box::new(cause.into()));
        self
    }

    /// Structured message kind
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Category of the message kind
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// True when member resolution failed
    pub fn is_access_error(&self) -> bool {
        self.category() == ErrorCategory::Access
            || matches!(self.cause.as_deref(), Some(Error::Access(_)))
    }

    /// Insert values
    pub fn inserts(&self) -> &[String] {
        &self.inserts
    }

    /// Byte offset of the failing node
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Underlying failure, if any
    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_deref()
    }

    /// Rendered message without code or position
    pub fn message(&self) -> String {
        self.kind.format(&self.inserts)
    }
}

impl From<AccessError> for EvalError {
    fn from(err: AccessError) -> Self {
        Self {
            kind: err.kind,
            inserts: err.inserts.clone(),
            position: None,
            cause: Some(Box::new(Error::Access(err))),
        }
    }
}

impl From<ConversionError> for EvalError {
    fn from(err: ConversionError) -> Self {
        Self {
            kind: err.kind,
            inserts: err.inserts.clone(),
            position: None,
            cause: Some(Box::new(Error::Conversion(err))),
        }
    }
}

/// Umbrella error for all failure kinds
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Tokenizer or parser failure
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Evaluation failure
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// Resolver failure
    #[error(transparent)]
    Access(#[from] AccessError),
    /// Type conversion failure
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl Error {
    /// Structured message kind of the wrapped error
    pub fn kind(&self) -> MessageKind {
        match self {
            Error::Parse(e) => e.kind(),
            Error::Eval(e) => e.kind(),
            Error::Access(e) => e.kind(),
            Error::Conversion(e) => e.kind(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(MessageKind::MoreInput, 4, [")"]);
        assert_eq!(
            err.to_string(),
            "EL1002:(pos 4): After parsing a valid expression, there is still more data in the expression: ')'"
        );
        assert_eq!(err.position(), Some(4));
    }

    #[test]
    fn test_access_error_converts_with_cause() {
        let access = AccessError::new(MessageKind::MethodNotFound, ["foo()", "String"]);
        let eval = EvalError::from(access.clone()).or_position(7);
        assert_eq!(eval.kind(), MessageKind::MethodNotFound);
        assert!(eval.is_access_error());
        assert_eq!(eval.position(), Some(7));
        assert_eq!(eval.cause(), Some(&Error::Access(access)));
    }

    #[test]
    fn test_conversion_error_carries_descriptors() {
        let err = ConversionError::no_path(None, &TypeDescriptor::Boolean);
        assert_eq!(err.source_type(), None);
        assert_eq!(err.target_type(), &TypeDescriptor::Boolean);
        assert_eq!(err.inserts(), &["null".to_string(), "Boolean".to_string()]);
    }
}
