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

//! `target[index]` resolution

use super::interpreter::evaluate;
use super::state::EvalState;
use super::value_ref::ValueRef;
use crate::ast::{Node, NodeKind};
use crate::core::{EvalError, EvalResult, MessageKind, TypeDescriptor, TypedValue, Value};
use crate::resolver::accessors_to_try;

/// Index value; a bare identifier indexing a map is the key name itself
pub(crate) fn index_value(state: &mut EvalState<'_>, target: &Value, index: &Node) -> EvalResult<Value> {
    if let (Value::Map(_), NodeKind::PropertyOrField { name, .. }) = (target, &index.kind) {
        return Ok(Value::String(name.clone()));
    }
    let scope = state.scope_root();
    state.with_active(scope, |state| evaluate(index, state).map(TypedValue::into_value))
}

fn position(state: &EvalState<'_>, index: &Value) -> EvalResult<i64> {
    let converted = state.convert(index, &TypeDescriptor::Integer)?;
    converted.as_i64().ok_or_else(|| {
        EvalError::new(
            MessageKind::TypeConversionError,
            [index.type_name(), "Integer".to_string()],
        )
    })
}

/// Resolve `[index]` applied to the active context object.
///
/// Custom index accessors are consulted first. Lists, arrays, maps and
/// strings are then indexed natively; any other target treats the index
/// as a property name.
pub(crate) fn index_ref(state: &mut EvalState<'_>, index: &Node, null_safe: bool) -> EvalResult<ValueRef> {
    let target = state.active_context_object();
    if target.is_null() {
        if null_safe {
            return Ok(ValueRef::Null);
        }
        return Err(EvalError::new(
            MessageKind::CannotIndexIntoNullValue,
            crate::core::error::NO_INSERTS,
        ));
    }
    let key = index_value(state, target.value(), index)?;
    resolve(state, target, key)
}

/// Reference to `target[key]` for an already evaluated key
pub(crate) fn resolve(state: &EvalState<'_>, target: TypedValue, key: Value) -> EvalResult<ValueRef> {
    let ctx = state.context();

    let accessors = accessors_to_try(
        ctx.index_accessors(),
        target.value(),
        ctx.type_registry(),
        |a| a.specific_target_classes(),
    );
    let mut applicable = Vec::new();
    for accessor in accessors {
        if accessor.can_read(ctx, target.value(), &key)? || accessor.can_write(ctx, target.value(), &key)? {
            applicable.push(accessor);
        }
    }
    if !applicable.is_empty() {
        return Ok(ValueRef::Indexed {
            accessors: applicable,
            target,
            index: key,
        });
    }

    let value = target.value().clone();
    Ok(match &value {
        Value::Map(map) => ValueRef::MapEntry {
            map: map.clone(),
            key,
        },
        Value::List(list) => ValueRef::ListElement {
            list: list.clone(),
            index: position(state, &key)?,
        },
        Value::Array(array) => ValueRef::ArrayElement {
            array: array.clone(),
            index: position(state, &key)?,
        },
        Value::String(text) => ValueRef::StringChar {
            text: text.clone(),
            index: position(state, &key)?,
        },
        _ if key.is_null() => {
            return Err(EvalError::new(
                MessageKind::IndexingNotSupportedForType,
                [value.type_name()],
            ));
        }
        _ => {
            let name = match state.convert(&key, &TypeDescriptor::String)? {
                Value::String(name) => name,
                other => other.to_display_string().into(),
            };
            ValueRef::Property { target, name }
        }
    })
}
