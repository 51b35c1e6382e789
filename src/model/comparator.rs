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

//! Ordering of runtime values for the relational operators

use crate::core::{EvalError, EvalResult, MessageKind, Value};
use crate::evaluator::numeric;
use std::cmp::Ordering;

/// Compares two values for `<`, `<=`, `>`, `>=` and `between`
pub trait TypeComparator: Send + Sync {
    /// True when the two values can be ordered
    fn can_compare(&self, left: &Value, right: &Value) -> bool;

    /// Order `left` relative to `right`
    fn compare(&self, left: &Value, right: &Value) -> EvalResult<Ordering>;
}

/// Null first, then numbers by the promotion ladder, then strings, booleans and chars
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardTypeComparator;

impl TypeComparator for StandardTypeComparator {
    fn can_compare(&self, left: &Value, right: &Value) -> bool {
        matches!(
            (left, right),
            (Value::Null, _)
                | (_, Value::Null)
                | (Value::String(_), Value::String(_))
                | (Value::Boolean(_), Value::Boolean(_))
                | (Value::Char(_), Value::Char(_))
        ) || (left.is_number() && right.is_number())
    }

    fn compare(&self, left: &Value, right: &Value) -> EvalResult<Ordering> {
        match (left, right) {
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            (Value::Null, _) => Ok(Ordering::Less),
            (_, Value::Null) => Ok(Ordering::Greater),
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
            (Value::Char(a), Value::Char(b)) => Ok(a.cmp(b)),
            (l, r) if l.is_number() && r.is_number() => Ok(numeric::total_compare(l, r)),
            (l, r) => Err(EvalError::new(
                MessageKind::NotComparable,
                [l.type_name(), r.type_name()],
            )),
        }
    }
}
