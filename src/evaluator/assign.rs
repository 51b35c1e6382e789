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

//! Assignment and increment/decrement

use super::interpreter::{evaluate, value_ref};
use super::numeric;
use super::operators;
use super::state::EvalState;
use crate::ast::{BinaryOperator, IncDecOperator, Node};
use crate::core::{EvalError, EvalResult, MessageKind, TypedValue, Value};

fn ensure_enabled(state: &EvalState<'_>, node: &Node) -> EvalResult<()> {
    if state.context().is_assignment_enabled() {
        Ok(())
    } else {
        Err(EvalError::new(
            MessageKind::AssignmentNotSupported,
            [node.to_string()],
        ))
    }
}

/// `target = value`, returning the assigned value
pub(crate) fn assign(
    state: &mut EvalState<'_>,
    node: &Node,
    target: &Node,
    value: &Node,
) -> EvalResult<TypedValue> {
    ensure_enabled(state, node)?;
    let reference = value_ref(target, state)?;
    if let super::value_ref::ValueRef::Plain(_) = reference {
        return Err(EvalError::at(
            target.start(),
            MessageKind::NotAssignable,
            [target.to_string()],
        ));
    }
    let new_value = evaluate(value, state)?;
    reference
        .set(state, new_value.value().clone())
        .map_err(|e| e.or_position(target.start()))?;
    Ok(new_value)
}

/// `++x`, `x++`, `--x` and `x--`
pub(crate) fn inc_dec(
    state: &mut EvalState<'_>,
    node: &Node,
    op: IncDecOperator,
    prefix: bool,
    operand: &Node,
) -> EvalResult<TypedValue> {
    let not_steppable = || {
        let kind = match op {
            IncDecOperator::Increment => MessageKind::OperandNotIncrementable,
            IncDecOperator::Decrement => MessageKind::OperandNotDecrementable,
        };
        EvalError::at(operand.start(), kind, [operand.to_string()])
    };
    ensure_enabled(state, node)?;
    let reference = value_ref(operand, state)?;
    if !reference.is_writable(state) {
        return Err(not_steppable());
    }
    let old = reference.get(state)?;
    let (delta, binary) = match op {
        IncDecOperator::Increment => (1, BinaryOperator::Add),
        IncDecOperator::Decrement => (-1, BinaryOperator::Subtract),
    };
    let new_value = match numeric::step(old.value(), delta)? {
        Some(value) => value,
        None => operators::overload(state.context(), binary, old.value(), &Value::Integer(1))
            .map_err(|e| match e.kind() {
                MessageKind::OperatorNotSupportedBetweenTypes => not_steppable(),
                _ => e,
            })?,
    };
    reference
        .set(state, new_value.clone())
        .map_err(|e| match e.kind() {
            MessageKind::NotAssignable => not_steppable(),
            _ => e,
        })?;
    Ok(if prefix {
        TypedValue::new(new_value)
    } else {
        old
    })
}
