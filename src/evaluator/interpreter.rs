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

//! Tree-walking evaluation of AST nodes

use super::state::EvalState;
use super::value_ref::ValueRef;
use super::{assign, collection, indexer, operators, reference};
use crate::ast::{BinaryOperator, Node, NodeKind, UnaryOperator};
use crate::core::{EvalError, EvalResult, MessageKind, TypedValue, Value};

/// Evaluate `node`, attributing errors without a position to its start
pub(crate) fn evaluate(node: &Node, state: &mut EvalState<'_>) -> EvalResult<TypedValue> {
    eval_node(node, state).map_err(|e| e.or_position(node.start()))
}

/// True for continuation nodes written with `?.`
pub(crate) fn is_null_safe(node: &Node) -> bool {
    matches!(
        node.kind,
        NodeKind::PropertyOrField { null_safe: true, .. }
            | NodeKind::MethodReference { null_safe: true, .. }
            | NodeKind::Indexer { null_safe: true, .. }
            | NodeKind::Selection { null_safe: true, .. }
            | NodeKind::Projection { null_safe: true, .. }
    )
}

/// Arithmetic failures raised below an operator node carry the node's text
pub(crate) fn describe_failure(err: EvalError, node_text: impl FnOnce() -> String) -> EvalError {
    match err.kind() {
        MessageKind::DivisionByZero | MessageKind::NumericOverflow if err.inserts().is_empty() => {
            EvalError::new(err.kind(), [node_text()])
        }
        _ => err,
    }
}

fn eval_node(node: &Node, state: &mut EvalState<'_>) -> EvalResult<TypedValue> {
    match &node.kind {
        NodeKind::Literal(literal) => Ok(literal.to_typed_value()),
        NodeKind::PropertyOrField { name, null_safe } => {
            reference::property(state, name, *null_safe, false)
        }
        NodeKind::MethodReference {
            name,
            args,
            null_safe,
        } => reference::method(state, name, args, *null_safe),
        NodeKind::FunctionReference { name, args } => reference::function(state, name, args),
        NodeKind::VariableReference { name } => Ok(state.lookup_variable(name)),
        NodeKind::BeanReference { name, factory } => reference::bean(state, name, *factory),
        NodeKind::TypeReference { name, dimensions } => {
            reference::type_reference(state, name, *dimensions)
        }
        NodeKind::ConstructorReference { type_name, args } => {
            reference::constructor(state, type_name, args)
        }
        NodeKind::ArrayConstructor {
            type_name,
            dimensions,
            initializer,
        } => reference::array_constructor(state, type_name, dimensions, initializer.as_deref()),
        NodeKind::Indexer { index, null_safe } => {
            indexer::index_ref(state, index, *null_safe)?.get(state)
        }
        NodeKind::Selection {
            variant,
            criteria,
            null_safe,
        } => collection::select(
            state,
            *variant,
            &|state| evaluate(criteria, state),
            criteria.start(),
            *null_safe,
        ),
        NodeKind::Projection {
            expression,
            null_safe,
        } => collection::project(state, &|state| evaluate(expression, state), *null_safe),
        NodeKind::InlineList(items) => collection::inline_list(state, items),
        NodeKind::InlineMap(entries) => collection::inline_map(state, entries),
        NodeKind::Compound(parts) => {
            Ok(walk_chain(state, parts, parts.len())?.unwrap_or(TypedValue::NULL))
        }
        NodeKind::Assign { target, value } => assign::assign(state, node, target, value),
        NodeKind::Elvis { value, fallback } => {
            let result = evaluate(value, state)?;
            let absent = match result.value() {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                _ => false,
            };
            if absent { evaluate(fallback, state) } else { Ok(result) }
        }
        NodeKind::Ternary {
            condition,
            if_true,
            if_false,
        } => {
            let test = evaluate(condition, state)?;
            let test = operators::to_boolean(state.context(), test.value(), "?")
                .map_err(|e| e.or_position(condition.start()))?;
            evaluate(if test { if_true } else { if_false }, state)
        }
        NodeKind::Binary {
            op: op @ (BinaryOperator::And | BinaryOperator::Or),
            left,
            right,
        } => {
            let symbol = op.symbol();
            let lhs = evaluate(left, state)?;
            let lhs = operators::to_boolean(state.context(), lhs.value(), symbol)
                .map_err(|e| e.or_position(left.start()))?;
            // short-circuit
            if lhs == (*op == BinaryOperator::Or) {
                return Ok(TypedValue::boolean(lhs));
            }
            let rhs = evaluate(right, state)?;
            let rhs = operators::to_boolean(state.context(), rhs.value(), symbol)
                .map_err(|e| e.or_position(right.start()))?;
            Ok(TypedValue::boolean(rhs))
        }
        NodeKind::Binary { op, left, right } => {
            let lhs = evaluate(left, state)?;
            let rhs = evaluate(right, state)?;
            operators::apply(state.context(), *op, lhs.value(), rhs.value())
                .map(TypedValue::new)
                .map_err(|e| describe_failure(e, || node.to_string()))
        }
        NodeKind::Unary { op, operand } => {
            let value = evaluate(operand, state)?;
            let ctx = state.context();
            let result = match op {
                UnaryOperator::Not => {
                    Value::Boolean(!operators::to_boolean(ctx, value.value(), "!")?)
                }
                UnaryOperator::Negate => operators::negate(ctx, value.value())?,
                UnaryOperator::Positive => operators::positive(ctx, value.value())?,
            };
            Ok(TypedValue::new(result))
        }
        NodeKind::IncDec {
            op,
            prefix,
            operand,
        } => assign::inc_dec(state, node, *op, *prefix, operand),
    }
}

fn chain_step(state: &mut EvalState<'_>, node: &Node, next: Option<&Node>) -> EvalResult<TypedValue> {
    match &node.kind {
        NodeKind::PropertyOrField { name, null_safe } => {
            let grow = next.is_some_and(|n| {
                matches!(n.kind, NodeKind::Indexer { .. } | NodeKind::PropertyOrField { .. })
            });
            reference::property(state, name, *null_safe, grow)
                .map_err(|e| e.or_position(node.start()))
        }
        _ => evaluate(node, state),
    }
}

/// Evaluate `parts[..count]` left to right, each against the previous result.
///
/// `None` means a null-safe step met a null and the rest of the chain,
/// including anything after `count`, is skipped.
fn walk_chain(
    state: &mut EvalState<'_>,
    parts: &[Node],
    count: usize,
) -> EvalResult<Option<TypedValue>> {
    let Some(first) = parts.first().filter(|_| count > 0) else {
        return Ok(Some(state.active_context_object()));
    };
    let mut current = chain_step(state, first, parts.get(1))?;
    for (i, part) in parts.iter().enumerate().take(count).skip(1) {
        if current.is_null() && is_null_safe(part) {
            return Ok(None);
        }
        let next = parts.get(i + 1);
        current = state.with_active(current, |state| chain_step(state, part, next))?;
    }
    Ok(Some(current))
}

/// Resolve `node` to an assignable reference
pub(crate) fn value_ref(node: &Node, state: &mut EvalState<'_>) -> EvalResult<ValueRef> {
    resolve_ref(node, state).map_err(|e| e.or_position(node.start()))
}

fn resolve_ref(node: &Node, state: &mut EvalState<'_>) -> EvalResult<ValueRef> {
    Ok(match &node.kind {
        NodeKind::PropertyOrField { name, null_safe } => {
            let target = state.active_context_object();
            if target.is_null() && *null_safe {
                ValueRef::Null
            } else {
                ValueRef::Property {
                    target,
                    name: name.clone(),
                }
            }
        }
        NodeKind::VariableReference { name } => ValueRef::Variable(name.clone()),
        NodeKind::Indexer { index, null_safe } => indexer::index_ref(state, index, *null_safe)?,
        NodeKind::Compound(parts) => {
            let Some((last, init)) = parts.split_last() else {
                return Ok(ValueRef::Null);
            };
            if init.is_empty() {
                return value_ref(last, state);
            }
            let Some(current) = walk_chain(state, parts, init.len())? else {
                return Ok(ValueRef::Null);
            };
            if current.is_null() && is_null_safe(last) {
                return Ok(ValueRef::Null);
            }
            state.with_active(current, |state| value_ref(last, state))?
        }
        _ => ValueRef::Plain(evaluate(node, state)?),
    })
}
