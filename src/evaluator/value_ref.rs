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

//! Deferred get/set handles over the last step of a reference chain

use super::reference::{is_property_writable, read_property, write_property};
use super::state::EvalState;
use crate::core::{
    ArrayRef, EvalError, EvalResult, ListRef, MapRef, MessageKind, TypedValue, Value,
};
use crate::resolver::IndexAccessor;
use std::sync::Arc;

/// A resolved assignment target.
///
/// Built once per `=`, `++` or `--` so reading and writing the target
/// share one resolution of everything to its left.
pub(crate) enum ValueRef {
    /// Null-safe navigation hit a null; reads give null, writes do nothing
    Null,
    /// A computed value with no storage behind it
    Plain(TypedValue),
    Variable(Arc<str>),
    Property {
        target: TypedValue,
        name: Arc<str>,
    },
    ListElement {
        list: ListRef,
        index: i64,
    },
    ArrayElement {
        array: ArrayRef,
        index: i64,
    },
    MapEntry {
        map: MapRef,
        key: Value,
    },
    StringChar {
        text: Arc<str>,
        index: i64,
    },
    Indexed {
        accessors: Vec<Arc<dyn IndexAccessor>>,
        target: TypedValue,
        index: Value,
    },
}

fn element_index(index: i64, len: usize) -> Option<usize> {
    usize::try_from(index).ok().filter(|i| *i < len)
}

impl ValueRef {
    pub(crate) fn get(&self, state: &EvalState<'_>) -> EvalResult<TypedValue> {
        let ctx = state.context();
        match self {
            ValueRef::Null => Ok(TypedValue::NULL),
            ValueRef::Plain(value) => Ok(value.clone()),
            ValueRef::Variable(name) => Ok(state.lookup_variable(name)),
            ValueRef::Property { target, name } => read_property(ctx, target, name),
            ValueRef::ListElement { list, index } => {
                let items = list.read();
                element_index(*index, items.len())
                    .map(|i| TypedValue::new(items[i].clone()))
                    .ok_or_else(|| {
                        EvalError::new(MessageKind::CollectionIndexOutOfBounds, [items.len() as i64, *index])
                    })
            }
            ValueRef::ArrayElement { array, index } => element_index(*index, array.len())
                .and_then(|i| array.get(i))
                .map(|v| TypedValue::with_type(v, array.component().clone()))
                .ok_or_else(|| {
                    EvalError::new(MessageKind::ArrayIndexOutOfBounds, [array.len() as i64, *index])
                }),
            ValueRef::MapEntry { map, key } => {
                Ok(map.get(key).map(TypedValue::new).unwrap_or(TypedValue::NULL))
            }
            ValueRef::StringChar { text, index } => usize::try_from(*index)
                .ok()
                .and_then(|i| text.chars().nth(i))
                .map(|c| TypedValue::new(Value::string(c.to_string())))
                .ok_or_else(|| {
                    EvalError::new(
                        MessageKind::StringIndexOutOfBounds,
                        [text.chars().count() as i64, *index],
                    )
                }),
            ValueRef::Indexed {
                accessors,
                target,
                index,
            } => {
                for accessor in accessors {
                    if accessor.can_read(ctx, target.value(), index)? {
                        return accessor.read(ctx, target.value(), index);
                    }
                }
                Err(EvalError::new(
                    MessageKind::IndexingNotSupportedForType,
                    [target.value().type_name()],
                ))
            }
        }
    }

    pub(crate) fn set(&self, state: &EvalState<'_>, value: Value) -> EvalResult<()> {
        let ctx = state.context();
        match self {
            ValueRef::Null => Ok(()),
            ValueRef::Plain(current) => Err(EvalError::new(
                MessageKind::NotAssignable,
                [current.value().to_display_string()],
            )),
            ValueRef::Variable(name) if matches!(&**name, "this" | "root") => {
                Err(EvalError::new(MessageKind::NotAssignable, [format!("#{name}")]))
            }
            ValueRef::Variable(name) => state.assign_variable(name, value),
            ValueRef::Property { target, name } => write_property(ctx, target.value(), name, value),
            ValueRef::ListElement { list, index } => set_list_element(state, list, *index, value),
            ValueRef::ArrayElement { array, index } => {
                let converted = state.convert(&value, array.component())?;
                match element_index(*index, array.len()) {
                    Some(i) if array.set(i, converted) => Ok(()),
                    _ => Err(EvalError::new(
                        MessageKind::ArrayIndexOutOfBounds,
                        [array.len() as i64, *index],
                    )),
                }
            }
            ValueRef::MapEntry { map, key } => {
                map.insert(key.clone(), value);
                Ok(())
            }
            ValueRef::StringChar { .. } => Err(EvalError::new(
                MessageKind::IndexingNotSupportedForType,
                ["String"],
            )),
            ValueRef::Indexed {
                accessors,
                target,
                index,
            } => {
                for accessor in accessors {
                    if accessor.can_write(ctx, target.value(), index)? {
                        return accessor.write(ctx, target.value(), index, value);
                    }
                }
                Err(EvalError::new(
                    MessageKind::IndexingNotSupportedForType,
                    [target.value().type_name()],
                ))
            }
        }
    }

    pub(crate) fn is_writable(&self, state: &EvalState<'_>) -> bool {
        let ctx = state.context();
        match self {
            ValueRef::Null | ValueRef::Plain(_) | ValueRef::StringChar { .. } => false,
            ValueRef::Variable(name) => !matches!(&**name, "this" | "root"),
            ValueRef::Property { target, name } => is_property_writable(ctx, target.value(), name),
            ValueRef::ListElement { .. } | ValueRef::ArrayElement { .. } | ValueRef::MapEntry { .. } => true,
            ValueRef::Indexed {
                accessors,
                target,
                index,
            } => accessors
                .iter()
                .any(|a| a.can_write(ctx, target.value(), index).unwrap_or(false)),
        }
    }
}

/// Write a list element, padding with nulls when collection auto-grow is on
fn set_list_element(state: &EvalState<'_>, list: &ListRef, index: i64, value: Value) -> EvalResult<()> {
    let mut items = list.write();
    let len = items.len();
    let out_of_bounds =
        || EvalError::new(MessageKind::CollectionIndexOutOfBounds, [len as i64, index]);
    let slot = usize::try_from(index).map_err(|_| out_of_bounds())?;
    if slot < len {
        items[slot] = value;
        return Ok(());
    }
    let config = state.config();
    if !config.auto_grow_collections {
        return Err(out_of_bounds());
    }
    if slot >= config.maximum_auto_grow_size {
        return Err(EvalError::new(
            MessageKind::UnableToGrowCollection,
            [slot, config.maximum_auto_grow_size],
        ));
    }
    log::trace!("growing list from {len} to {} elements", slot + 1);
    items.resize(slot, Value::Null);
    items.push(value);
    Ok(())
}
