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

//! Operator overloading hook for operands the built-in operators reject

use crate::ast::BinaryOperator;
use crate::core::{EvalError, EvalResult, MessageKind, Value};

/// Extension point for binary operators over custom value kinds
pub trait OperatorOverloader: Send + Sync {
    /// True when this overloader handles `op` for the operands
    fn overrides_operation(&self, op: BinaryOperator, left: &Value, right: &Value) -> bool;

    /// Apply `op`; only called after [`Self::overrides_operation`] returned true
    fn operate(&self, op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<Value>;
}

/// Overloader that handles nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardOperatorOverloader;

impl OperatorOverloader for StandardOperatorOverloader {
    fn overrides_operation(&self, _op: BinaryOperator, _left: &Value, _right: &Value) -> bool {
        false
    }

    fn operate(&self, op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<Value> {
        Err(EvalError::new(
            MessageKind::OperatorNotSupportedBetweenTypes,
            [op.symbol().to_string(), left.type_name(), right.type_name()],
        ))
    }
}
