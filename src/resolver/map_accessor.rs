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

//! Exposes map keys as properties, so `config.timeout` reads `config['timeout']`

use super::{CompiledReader, PropertyAccessor};
use crate::core::{AccessError, EvalError, EvalResult, MessageKind, TypeDescriptor, TypedValue, Value};
use crate::evaluator::EvaluationContext;
use std::sync::Arc;

/// Property accessor over string-keyed maps
#[derive(Debug, Clone, Copy)]
pub struct MapAccessor {
    allow_write: bool,
}

impl Default for MapAccessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MapAccessor {
    /// Read-write map accessor
    pub fn new() -> Self {
        Self { allow_write: true }
    }

    /// Map accessor that never writes
    pub fn read_only() -> Self {
        Self { allow_write: false }
    }
}

fn read_key(target: &Value, name: &str) -> Result<TypedValue, AccessError> {
    match target {
        Value::Map(map) => map
            .get(&Value::string(name))
            .map(TypedValue::new)
            .ok_or_else(|| AccessError::new(MessageKind::PropertyOrFieldNotReadable, [name, "Map"])),
        other => Err(AccessError::new(
            MessageKind::PropertyOrFieldNotReadable,
            [name.to_string(), other.type_name()],
        )),
    }
}

impl PropertyAccessor for MapAccessor {
    fn specific_target_classes(&self) -> Option<Vec<TypeDescriptor>> {
        Some(vec![TypeDescriptor::Map])
    }

    fn can_read(
        &self,
        _context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Result<bool, AccessError> {
        Ok(match target {
            Value::Map(map) => map.get(&Value::string(name)).is_some(),
            _ => false,
        })
    }

    fn read(
        &self,
        _context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> EvalResult<TypedValue> {
        Ok(read_key(target, name)?)
    }

    fn can_write(
        &self,
        _context: &dyn EvaluationContext,
        target: &Value,
        _name: &str,
    ) -> Result<bool, AccessError> {
        Ok(self.allow_write && matches!(target, Value::Map(_)))
    }

    fn write(
        &self,
        _context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        value: Value,
    ) -> EvalResult<()> {
        match target {
            Value::Map(map) if self.allow_write => {
                map.insert(Value::string(name), value);
                Ok(())
            }
            other => Err(EvalError::new(
                MessageKind::PropertyOrFieldNotWritable,
                [name.to_string(), other.type_name()],
            )),
        }
    }

    fn compilable_reader(
        &self,
        _context: &dyn EvaluationContext,
        _target: &Value,
        name: &str,
    ) -> Option<CompiledReader> {
        let name: Arc<str> = Arc::from(name);
        Some(Arc::new(move |target: &Value| read_key(target, &name)))
    }
}
