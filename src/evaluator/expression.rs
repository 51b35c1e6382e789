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

//! Parsed expressions ready for evaluation

use super::config::ParserConfig;
use super::context::EvaluationContext;
use super::interpreter::{evaluate, value_ref};
use super::state::EvalState;
use super::value_ref::ValueRef;
use crate::ast::Node;
use crate::compiler::{CompilationError, CompilationSlot, CompilationState, ExpressionCompiler};
use crate::core::{EvalError, EvalResult, MessageKind, TypeDescriptor, TypedValue, Value};
use std::fmt;
use std::sync::Arc;

/// An expression parsed from text, evaluated by walking its AST or, once
/// compiled, through its compiled routine
pub struct StandardExpression {
    text: Arc<str>,
    ast: Node,
    config: Arc<ParserConfig>,
    slot: CompilationSlot,
}

impl StandardExpression {
    pub(crate) fn new(text: impl Into<Arc<str>>, ast: Node, config: Arc<ParserConfig>) -> Self {
        Self {
            text: text.into(),
            ast,
            config,
            slot: CompilationSlot::new(),
        }
    }

    /// Source text
    pub fn expression_string(&self) -> &str {
        &self.text
    }

    /// Root of the parsed tree
    pub fn ast(&self) -> &Node {
        &self.ast
    }

    /// Normalized rendering of the parsed tree
    pub fn to_string_ast(&self) -> String {
        self.ast.to_string()
    }

    /// Evaluate against the context's root object
    pub fn evaluate(&self, context: &dyn EvaluationContext) -> EvalResult<TypedValue> {
        self.run(context, None)
    }

    /// Evaluate against `root` instead of the context's root object
    pub fn evaluate_with_root(
        &self,
        context: &dyn EvaluationContext,
        root: impl Into<Value>,
    ) -> EvalResult<TypedValue> {
        self.run(context, Some(TypedValue::new(root)))
    }

    /// Evaluate and drop the declared type
    pub fn get_value(&self, context: &dyn EvaluationContext) -> EvalResult<Value> {
        self.evaluate(context).map(TypedValue::into_value)
    }

    /// Evaluate, then convert the result to `target`
    pub fn get_typed_value(
        &self,
        context: &dyn EvaluationContext,
        target: &TypeDescriptor,
    ) -> EvalResult<Value> {
        let value = self.get_value(context)?;
        Ok(context.type_converter().convert_value(&value, target)?)
    }

    /// Type of the value the expression refers to, `None` for null
    pub fn get_value_type(&self, context: &dyn EvaluationContext) -> EvalResult<Option<TypeDescriptor>> {
        let mut state = EvalState::new(context, &self.config);
        let reference = value_ref(&self.ast, &mut state)?;
        Ok(reference.get(&state)?.type_descriptor())
    }

    /// True when [`set_value`](Self::set_value) could write through this expression
    pub fn is_writable(&self, context: &dyn EvaluationContext) -> EvalResult<bool> {
        let mut state = EvalState::new(context, &self.config);
        let reference = value_ref(&self.ast, &mut state)?;
        Ok(reference.is_writable(&state))
    }

    /// Assign `value` to the reference this expression denotes
    pub fn set_value(&self, context: &dyn EvaluationContext, value: impl Into<Value>) -> EvalResult<()> {
        let state = EvalState::new(context, &self.config);
        self.write(state, value.into())
    }

    /// Assign `value`, resolving the reference against `root`
    pub fn set_value_with_root(
        &self,
        context: &dyn EvaluationContext,
        root: impl Into<Value>,
        value: impl Into<Value>,
    ) -> EvalResult<()> {
        let state = EvalState::with_root(context, &self.config, TypedValue::new(root));
        self.write(state, value.into())
    }

    /// Compile now, regardless of the configured mode
    pub fn compile_expression(&self) -> Result<(), CompilationError> {
        let compiled = ExpressionCompiler::new().compile(&self.text, &self.ast)?;
        log::debug!("compiled '{}' on request", self.text);
        self.slot.install(compiled);
        Ok(())
    }

    /// Discard any compiled form and clear the compilation counters
    pub fn revert_to_interpreted(&self) {
        self.slot.reset();
    }

    /// Current compilation state
    pub fn compilation_state(&self) -> CompilationState {
        self.slot.state()
    }

    fn write(&self, mut state: EvalState<'_>, value: Value) -> EvalResult<()> {
        if !state.context().is_assignment_enabled() {
            return Err(EvalError::new(
                MessageKind::AssignmentNotSupported,
                [self.text.to_string()],
            ));
        }
        let reference = value_ref(&self.ast, &mut state)?;
        if let ValueRef::Plain(_) = reference {
            return Err(EvalError::at(
                self.ast.start(),
                MessageKind::NotAssignable,
                [self.text.to_string()],
            ));
        }
        reference
            .set(&state, value)
            .map_err(|e| e.or_position(self.ast.start()))
    }

    fn run(&self, context: &dyn EvaluationContext, root: Option<TypedValue>) -> EvalResult<TypedValue> {
        let fresh = |root: &Option<TypedValue>| match root {
            Some(root) => EvalState::with_root(context, &self.config, root.clone()),
            None => EvalState::new(context, &self.config),
        };
        if let Some(compiled) = self.slot.routine() {
            let mut state = fresh(&root);
            // a guard miss already finished on the generic path, so the
            // result or error stands either way
            let result = compiled.run(&mut state);
            if state.guard_failed() {
                self.slot.invalidate(&self.text, &self.config);
            }
            if let Err(err) = &result {
                log::debug!("compiled run of '{}' failed: {err}", self.text);
            }
            return result;
        }
        let mut state = fresh(&root);
        let result = evaluate(&self.ast, &mut state)?;
        self.slot.record_run(
            &self.text,
            &self.ast,
            &result,
            state.is_specializable(),
            &self.config,
        );
        Ok(result)
    }
}

impl fmt::Debug for StandardExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardExpression")
            .field("text", &self.text)
            .field("state", &self.slot.state())
            .finish_non_exhaustive()
    }
}

/// Template text without any embedded expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralExpression {
    text: Arc<str>,
}

impl LiteralExpression {
    pub(crate) fn new(text: impl Into<Arc<str>>) -> Self {
        Self { text: text.into() }
    }

    pub fn expression_string(&self) -> &str {
        &self.text
    }

    pub fn get_value(&self) -> Value {
        Value::String(self.text.clone())
    }
}

/// Template mixing literal text and embedded expressions
#[derive(Debug)]
pub struct CompositeExpression {
    text: Arc<str>,
    parts: Vec<Expression>,
}

impl CompositeExpression {
    pub(crate) fn new(text: impl Into<Arc<str>>, parts: Vec<Expression>) -> Self {
        Self {
            text: text.into(),
            parts,
        }
    }

    pub fn expression_string(&self) -> &str {
        &self.text
    }

    /// Literal and embedded parts in template order
    pub fn parts(&self) -> &[Expression] {
        &self.parts
    }

    fn render(
        &self,
        context: &dyn EvaluationContext,
        root: Option<&Value>,
    ) -> EvalResult<Value> {
        let mut out = String::new();
        for part in &self.parts {
            let value = match root {
                Some(root) => part.evaluate_with_root(context, root.clone())?,
                None => part.evaluate(context)?,
            }
            .into_value();
            if value.is_null() {
                continue;
            }
            match context.type_converter().convert_value(&value, &TypeDescriptor::String)? {
                Value::String(text) => out.push_str(&text),
                other => out.push_str(&other.to_display_string()),
            }
        }
        Ok(Value::from(out))
    }
}

/// Any expression produced by the parser
#[derive(Debug)]
pub enum Expression {
    Standard(StandardExpression),
    Literal(LiteralExpression),
    Composite(CompositeExpression),
}

impl Expression {
    /// Source text
    pub fn expression_string(&self) -> &str {
        match self {
            Expression::Standard(e) => e.expression_string(),
            Expression::Literal(e) => e.expression_string(),
            Expression::Composite(e) => e.expression_string(),
        }
    }

    /// Evaluate against the context's root object
    pub fn evaluate(&self, context: &dyn EvaluationContext) -> EvalResult<TypedValue> {
        match self {
            Expression::Standard(e) => e.evaluate(context),
            Expression::Literal(e) => Ok(TypedValue::new(e.get_value())),
            Expression::Composite(e) => e.render(context, None).map(TypedValue::new),
        }
    }

    /// Evaluate against `root` instead of the context's root object
    pub fn evaluate_with_root(
        &self,
        context: &dyn EvaluationContext,
        root: impl Into<Value>,
    ) -> EvalResult<TypedValue> {
        match self {
            Expression::Standard(e) => e.evaluate_with_root(context, root),
            Expression::Literal(e) => Ok(TypedValue::new(e.get_value())),
            Expression::Composite(e) => e.render(context, Some(&root.into())).map(TypedValue::new),
        }
    }

    pub fn get_value(&self, context: &dyn EvaluationContext) -> EvalResult<Value> {
        self.evaluate(context).map(TypedValue::into_value)
    }

    /// Evaluate, then convert the result to `target`
    pub fn get_typed_value(
        &self,
        context: &dyn EvaluationContext,
        target: &TypeDescriptor,
    ) -> EvalResult<Value> {
        let value = self.get_value(context)?;
        Ok(context.type_converter().convert_value(&value, target)?)
    }

    /// Type of the value the expression refers to
    pub fn get_value_type(&self, context: &dyn EvaluationContext) -> EvalResult<Option<TypeDescriptor>> {
        match self {
            Expression::Standard(e) => e.get_value_type(context),
            _ => Ok(Some(TypeDescriptor::String)),
        }
    }

    pub fn is_writable(&self, context: &dyn EvaluationContext) -> EvalResult<bool> {
        match self {
            Expression::Standard(e) => e.is_writable(context),
            _ => Ok(false),
        }
    }

    /// Assign `value` through the expression; templates are never assignable
    pub fn set_value(&self, context: &dyn EvaluationContext, value: impl Into<Value>) -> EvalResult<()> {
        match self {
            Expression::Standard(e) => e.set_value(context, value),
            _ => Err(EvalError::new(
                MessageKind::SetValueNotSupported,
                [self.expression_string()],
            )),
        }
    }

    /// The standard expression, when this is one
    pub fn as_standard(&self) -> Option<&StandardExpression> {
        match self {
            Expression::Standard(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::StandardEvaluationContext;
    use crate::parser::parser::InternalParser;

    fn standard(text: &str) -> StandardExpression {
        let ast = InternalParser::parse(text).unwrap();
        StandardExpression::new(text, ast, Arc::new(ParserConfig::default()))
    }

    #[test]
    fn test_literal_rejects_set_value() {
        let ctx = StandardEvaluationContext::new();
        let literal = Expression::Literal(LiteralExpression::new("hello"));
        assert_eq!(literal.get_value(&ctx).unwrap(), Value::from("hello"));
        let err = literal.set_value(&ctx, 1).unwrap_err();
        assert_eq!(err.kind(), MessageKind::SetValueNotSupported);
    }

    #[test]
    fn test_composite_renders_null_as_empty() {
        let ctx = StandardEvaluationContext::new();
        let composite = CompositeExpression::new(
            "a#{null}b#{1 + 1}",
            vec![
                Expression::Literal(LiteralExpression::new("a")),
                Expression::Standard(standard("null")),
                Expression::Literal(LiteralExpression::new("b")),
                Expression::Standard(standard("1 + 1")),
            ],
        );
        let expr = Expression::Composite(composite);
        assert_eq!(expr.get_value(&ctx).unwrap(), Value::from("ab2"));
    }

    #[test]
    fn test_literal_target_is_not_assignable() {
        let ctx = StandardEvaluationContext::new();
        let err = standard("'x'").set_value(&ctx, "y").unwrap_err();
        assert_eq!(err.kind(), MessageKind::NotAssignable);
    }

    #[test]
    fn test_forced_compilation_and_revert() {
        let ctx = StandardEvaluationContext::new();
        let expr = standard("2 * 21");
        expr.compile_expression().unwrap();
        assert_eq!(expr.compilation_state(), CompilationState::Compiled);
        assert_eq!(expr.get_value(&ctx).unwrap(), Value::Integer(42));
        expr.revert_to_interpreted();
        assert_eq!(expr.compilation_state(), CompilationState::Uncompiled);
        assert_eq!(expr.get_value(&ctx).unwrap(), Value::Integer(42));
    }
}
