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

//! Operator semantics over runtime values.
//!
//! Shared by the tree-walking evaluator and the compiled routines so both
//! paths produce identical results.

use super::context::EvaluationContext;
use super::numeric;
use crate::ast::BinaryOperator;
use crate::core::{EvalError, EvalResult, MessageKind, TypeDescriptor, Value};
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use std::cmp::Ordering;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Longest string `+` may produce
pub const MAX_CONCATENATED_STRING_LENGTH: usize = 100_000;

/// Longest string `*` may produce
pub const MAX_REPEATED_TEXT_SIZE: usize = 256;

/// Longest pattern `matches` accepts
pub const MAX_REGEX_LENGTH: usize = 1000;

const REGEX_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

static PATTERNS: Lazy<Mutex<LruCache<String, Arc<Regex>>>> =
    Lazy::new(|| Mutex::new(LruCache::new(REGEX_CACHE_SIZE)));

/// Apply a binary operator to two evaluated operands.
///
/// `and` / `or` are accepted here for compiled routines; the interpreter
/// short-circuits them before reaching this point.
pub(crate) fn apply(
    ctx: &dyn EvaluationContext,
    op: BinaryOperator,
    left: &Value,
    right: &Value,
) -> EvalResult<Value> {
    use BinaryOperator::*;
    match op {
        Add => add(ctx, left, right),
        Subtract => subtract(ctx, left, right),
        Multiply => multiply(ctx, left, right),
        Divide | Modulus | Power => arithmetic_or_overload(ctx, op, left, right),
        Equal => Ok(Value::Boolean(equality(left, right))),
        NotEqual => Ok(Value::Boolean(!equality(left, right))),
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => {
            relational(ctx, op, left, right).map(Value::Boolean)
        }
        InstanceOf => instance_of(ctx, left, right).map(Value::Boolean),
        Matches => matches(left, right).map(Value::Boolean),
        Between => between(ctx, left, right).map(Value::Boolean),
        And => Ok(Value::Boolean(
            to_boolean(ctx, left, "and")? && to_boolean(ctx, right, "and")?,
        )),
        Or => Ok(Value::Boolean(
            to_boolean(ctx, left, "or")? || to_boolean(ctx, right, "or")?,
        )),
    }
}

/// Hand the operands to the context's overloader, or fail
pub(crate) fn overload(
    ctx: &dyn EvaluationContext,
    op: BinaryOperator,
    left: &Value,
    right: &Value,
) -> EvalResult<Value> {
    let overloader = ctx.operator_overloader();
    if overloader.overrides_operation(op, left, right) {
        return overloader.operate(op, left, right);
    }
    Err(EvalError::new(
        MessageKind::OperatorNotSupportedBetweenTypes,
        [op.symbol().to_string(), left.type_name(), right.type_name()],
    ))
}

fn arithmetic_or_overload(
    ctx: &dyn EvaluationContext,
    op: BinaryOperator,
    left: &Value,
    right: &Value,
) -> EvalResult<Value> {
    match numeric::arithmetic(op, left, right)? {
        Some(value) => Ok(value),
        None => overload(ctx, op, left, right),
    }
}

fn stringify(ctx: &dyn EvaluationContext, value: &Value) -> EvalResult<String> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::String(s) => Ok(s.to_string()),
        other => match ctx
            .type_converter()
            .convert_value(other, &TypeDescriptor::String)?
        {
            Value::String(s) => Ok(s.to_string()),
            converted => Ok(converted.to_display_string()),
        },
    }
}

fn add(ctx: &dyn EvaluationContext, left: &Value, right: &Value) -> EvalResult<Value> {
    if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
        let mut text = stringify(ctx, left)?;
        text.push_str(&stringify(ctx, right)?);
        if text.chars().count() > MAX_CONCATENATED_STRING_LENGTH {
            return Err(EvalError::new(
                MessageKind::MaxConcatenatedStringLengthExceeded,
                [MAX_CONCATENATED_STRING_LENGTH],
            ));
        }
        return Ok(Value::string(text));
    }
    arithmetic_or_overload(ctx, BinaryOperator::Add, left, right)
}

fn subtract(ctx: &dyn EvaluationContext, left: &Value, right: &Value) -> EvalResult<Value> {
    if let (Value::String(s), Value::Integer(n)) = (left, right) {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            let shifted = (c as i64) - i64::from(*n);
            return u32::try_from(shifted)
                .ok()
                .and_then(char::from_u32)
                .map(|c| Value::string(c.to_string()))
                .ok_or_else(|| {
                    EvalError::new(
                        MessageKind::OperatorNotSupportedBetweenTypes,
                        ["-".to_string(), left.type_name(), right.type_name()],
                    )
                });
        }
    }
    arithmetic_or_overload(ctx, BinaryOperator::Subtract, left, right)
}

fn multiply(ctx: &dyn EvaluationContext, left: &Value, right: &Value) -> EvalResult<Value> {
    if let (Value::String(s), Value::Integer(n)) = (left, right) {
        let count = usize::try_from(*n)
            .map_err(|_| EvalError::new(MessageKind::NegativeRepeatedTextCount, [*n]))?;
        if s.chars().count().saturating_mul(count) > MAX_REPEATED_TEXT_SIZE {
            return Err(EvalError::new(
                MessageKind::MaxRepeatedTextSizeExceeded,
                [MAX_REPEATED_TEXT_SIZE],
            ));
        }
        return Ok(Value::string(s.repeat(count)));
    }
    arithmetic_or_overload(ctx, BinaryOperator::Multiply, left, right)
}

/// `==` semantics: numbers by value after promotion, everything else structurally
pub(crate) fn equality(left: &Value, right: &Value) -> bool {
    numeric::equals(left, right).unwrap_or_else(|| left == right)
}

fn relational(
    ctx: &dyn EvaluationContext,
    op: BinaryOperator,
    left: &Value,
    right: &Value,
) -> EvalResult<bool> {
    let ordering = if left.is_number() && right.is_number() {
        match numeric::compare(left, right) {
            Some(ordering) => ordering,
            // NaN is unordered
            None => return Ok(false),
        }
    } else {
        ctx.type_comparator().compare(left, right)?
    };
    Ok(satisfies(op, ordering))
}

fn satisfies(op: BinaryOperator, ordering: Ordering) -> bool {
    match op {
        BinaryOperator::LessThan => ordering == Ordering::Less,
        BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
        BinaryOperator::GreaterThan => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    }
}

/// Result of `op` when both operands are numbers, `None` when the
/// operator has no numeric-only form or an operand is not a number
pub(crate) fn numeric_fast(op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<Option<Value>> {
    use BinaryOperator::*;
    if !(left.is_number() && right.is_number()) {
        return Ok(None);
    }
    Ok(match op {
        Add | Subtract | Multiply | Divide | Modulus | Power => {
            return numeric::arithmetic(op, left, right);
        }
        Equal => numeric::equals(left, right).map(Value::Boolean),
        NotEqual => numeric::equals(left, right).map(|eq| Value::Boolean(!eq)),
        LessThan | LessThanOrEqual | GreaterThan | GreaterThanOrEqual => Some(Value::Boolean(
            numeric::compare(left, right).is_some_and(|o| satisfies(op, o)),
        )),
        _ => None,
    })
}

fn instance_of(ctx: &dyn EvaluationContext, left: &Value, right: &Value) -> EvalResult<bool> {
    let Value::Type(target) = right else {
        return Err(EvalError::new(
            MessageKind::InstanceofOperatorNeedsClassOperand,
            [right.type_name()],
        ));
    };
    Ok(match left.type_descriptor() {
        None => false,
        Some(source) => ctx.type_converter().is_assignable(target, &source),
    })
}

fn compiled_pattern(pattern: &str) -> EvalResult<Arc<Regex>> {
    if let Some(regex) = PATTERNS.lock().get(pattern) {
        return Ok(regex.clone());
    }
    let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
        EvalError::new(MessageKind::InvalidPattern, [pattern.to_string(), e.to_string()])
    })?;
    let regex = Arc::new(regex);
    PATTERNS.lock().put(pattern.to_string(), regex.clone());
    Ok(regex)
}

fn matches(left: &Value, right: &Value) -> EvalResult<bool> {
    let Value::String(text) = left else {
        return Err(EvalError::new(
            MessageKind::InvalidFirstOperandForMatchesOperator,
            [left.to_display_string()],
        ));
    };
    let Value::String(pattern) = right else {
        return Err(EvalError::new(
            MessageKind::InvalidSecondOperandForMatchesOperator,
            [right.to_display_string()],
        ));
    };
    let length = pattern.chars().count();
    if length > MAX_REGEX_LENGTH {
        return Err(EvalError::new(
            MessageKind::MaxRegexLengthExceeded,
            [length, MAX_REGEX_LENGTH],
        ));
    }
    Ok(compiled_pattern(pattern)?.is_match(text))
}

fn between(ctx: &dyn EvaluationContext, left: &Value, right: &Value) -> EvalResult<bool> {
    let bounds = match right {
        Value::List(list) if list.len() == 2 => list.snapshot(),
        _ => {
            return Err(EvalError::new(
                MessageKind::BetweenRightOperandMustBeTwoElementList,
                crate::core::error::NO_INSERTS,
            ));
        }
    };
    let comparator = ctx.type_comparator();
    Ok(comparator.compare(&bounds[0], left)? != Ordering::Greater
        && comparator.compare(left, &bounds[1])? != Ordering::Greater)
}

/// Unary minus
pub(crate) fn negate(ctx: &dyn EvaluationContext, operand: &Value) -> EvalResult<Value> {
    match numeric::negate(operand) {
        Some(value) => Ok(value),
        None => unary_overload(ctx, BinaryOperator::Subtract, operand),
    }
}

/// Unary plus
pub(crate) fn positive(ctx: &dyn EvaluationContext, operand: &Value) -> EvalResult<Value> {
    if operand.is_number() {
        return Ok(operand.clone());
    }
    unary_overload(ctx, BinaryOperator::Add, operand)
}

/// Overloaders see a unary operator as `op` with a null right operand
fn unary_overload(ctx: &dyn EvaluationContext, op: BinaryOperator, operand: &Value) -> EvalResult<Value> {
    let overloader = ctx.operator_overloader();
    if overloader.overrides_operation(op, operand, &Value::Null) {
        return overloader.operate(op, operand, &Value::Null);
    }
    Err(EvalError::new(
        MessageKind::OperatorNotSupportedForType,
        [op.symbol().to_string(), operand.type_name()],
    ))
}

/// Coerce an operand of `op` to a boolean; null is an error
pub(crate) fn to_boolean(ctx: &dyn EvaluationContext, value: &Value, op: &str) -> EvalResult<bool> {
    match value {
        Value::Boolean(b) => Ok(*b),
        Value::Null => Err(EvalError::new(MessageKind::NullOperandForBoolean, [op])),
        other => match ctx
            .type_converter()
            .convert_value(other, &TypeDescriptor::Boolean)?
        {
            Value::Boolean(b) => Ok(b),
            _ => Err(EvalError::new(MessageKind::NullOperandForBoolean, [op])),
        },
    }
}
