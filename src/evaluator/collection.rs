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

//! Selection, projection and inline collections

use super::interpreter::evaluate;
use super::state::EvalState;
use crate::ast::{Node, NodeKind, SelectionVariant};

/// Evaluation of a nested expression, interpreted or compiled
pub(crate) type Step<'f> = &'f dyn Fn(&mut EvalState<'_>) -> EvalResult<TypedValue>;
use crate::core::{
    ArrayRef, EvalError, EvalResult, ListRef, MapRef, MessageKind, TypeDescriptor, TypedValue,
    Value,
};
use crate::model::MapEntry;

/// Elements to iterate for selection or projection, `None` for non-iterables
fn elements(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::List(list) => Some(list.snapshot()),
        Value::Array(array) => Some(array.snapshot()),
        _ => None,
    }
}

fn matches_criteria(
    state: &mut EvalState<'_>,
    element: Value,
    criteria: Step<'_>,
    position: usize,
) -> EvalResult<bool> {
    let result = state.with_scope(TypedValue::new(element), |state| criteria(state))?;
    match result.value() {
        Value::Boolean(b) => Ok(*b),
        _ => Err(EvalError::new(
            MessageKind::ResultOfSelectionCriteriaIsNotBoolean,
            crate::core::error::NO_INSERTS,
        )
        .with_position(position)),
    }
}

/// `?[...]`, `^[...]` and `$[...]` over the active context object
pub(crate) fn select(
    state: &mut EvalState<'_>,
    variant: SelectionVariant,
    criteria: Step<'_>,
    position: usize,
    null_safe: bool,
) -> EvalResult<TypedValue> {
    let operand = state.active_context_object();
    match operand.value() {
        Value::Null if null_safe => Ok(TypedValue::NULL),
        Value::Map(map) => {
            let selected = MapRef::new();
            for (key, value) in map.entries() {
                let entry = MapEntry::new(key.clone(), value.clone()).into_value();
                if matches_criteria(state, entry, criteria, position)? {
                    selected.insert(key, value);
                    if variant == SelectionVariant::First {
                        break;
                    }
                }
            }
            if variant == SelectionVariant::All {
                return Ok(TypedValue::new(Value::Map(selected)));
            }
            let entries = selected.entries();
            Ok(match entries.into_iter().last() {
                Some((key, value)) => {
                    TypedValue::new(Value::Map(MapRef::from_entries([(key, value)])))
                }
                None => TypedValue::NULL,
            })
        }
        other => {
            let Some(items) = elements(other) else {
                return Err(EvalError::new(
                    MessageKind::InvalidTypeForSelection,
                    [other.type_name()],
                ));
            };
            let mut selected = Vec::new();
            let candidates: Box<dyn Iterator<Item = Value>> = match variant {
                SelectionVariant::Last => Box::new(items.into_iter().rev()),
                _ => Box::new(items.into_iter()),
            };
            for item in candidates {
                if matches_criteria(state, item.clone(), criteria, position)? {
                    if variant != SelectionVariant::All {
                        return Ok(TypedValue::new(item));
                    }
                    selected.push(item);
                }
            }
            if variant != SelectionVariant::All {
                return Ok(TypedValue::NULL);
            }
            Ok(TypedValue::new(match other {
                Value::Array(array) => {
                    Value::Array(ArrayRef::new(array.component().clone(), selected))
                }
                _ => Value::List(ListRef::new(selected)),
            }))
        }
    }
}

/// Common element type of projected values, `Object` when they differ
fn common_type(values: &[Value]) -> TypeDescriptor {
    let mut types = values.iter().filter_map(Value::type_descriptor);
    match types.next() {
        Some(first) if types.all(|t| t == first) => first,
        _ => TypeDescriptor::Object,
    }
}

/// `![...]` over the active context object
pub(crate) fn project(
    state: &mut EvalState<'_>,
    expression: Step<'_>,
    null_safe: bool,
) -> EvalResult<TypedValue> {
    let operand = state.active_context_object();
    let items = match operand.value() {
        Value::Null if null_safe => return Ok(TypedValue::NULL),
        Value::Map(map) => map
            .entries()
            .into_iter()
            .map(|(k, v)| MapEntry::new(k, v).into_value())
            .collect(),
        other => elements(other).ok_or_else(|| {
            EvalError::new(MessageKind::ProjectionNotSupportedOnType, [other.type_name()])
        })?,
    };
    let mut projected = Vec::with_capacity(items.len());
    for item in items {
        let value = state.with_scope(TypedValue::new(item), |state| expression(state))?;
        projected.push(value.into_value());
    }
    Ok(TypedValue::new(match operand.value() {
        Value::Array(_) => {
            let component = common_type(&projected);
            Value::Array(ArrayRef::new(component, projected))
        }
        _ => Value::List(ListRef::new(projected)),
    }))
}

/// `{a, b, c}`, a fresh list each evaluation
pub(crate) fn inline_list(state: &mut EvalState<'_>, items: &[Node]) -> EvalResult<TypedValue> {
    let values = items
        .iter()
        .map(|item| evaluate(item, state).map(TypedValue::into_value))
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(TypedValue::new(Value::List(ListRef::new(values))))
}

/// `{k: v, ...}`; a bare identifier key is taken as its name
pub(crate) fn inline_map(state: &mut EvalState<'_>, entries: &[(Node, Node)]) -> EvalResult<TypedValue> {
    let map = MapRef::new();
    for (key, value) in entries {
        let key = match &key.kind {
            NodeKind::PropertyOrField { name, .. } => Value::String(name.clone()),
            _ => evaluate(key, state)?.into_value(),
        };
        let value = evaluate(value, state)?.into_value();
        map.insert(key, value);
    }
    Ok(TypedValue::new(Value::Map(map)))
}
