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

//! Bean lookup for `@name` and `&name` references

use crate::core::{AccessError, Value};
use crate::evaluator::EvaluationContext;
use rustc_hash::FxHashMap;

/// Resolves bean names on behalf of `@name` references.
///
/// Factory references (`&name`) arrive with the `&` prefix kept in `name`.
pub trait BeanResolver: Send + Sync {
    /// Resolve the bean called `name`
    fn resolve(&self, context: &dyn EvaluationContext, name: &str) -> Result<Value, AccessError>;
}

/// Bean resolver over a fixed table
#[derive(Debug, Default, Clone)]
pub struct StaticBeanResolver {
    beans: FxHashMap<String, Value>,
}

impl StaticBeanResolver {
    /// Empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `name`; use a `&` prefix for factory beans
    pub fn with_bean(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.beans.insert(name.into(), value.into());
        self
    }
}

impl BeanResolver for StaticBeanResolver {
    fn resolve(&self, _context: &dyn EvaluationContext, name: &str) -> Result<Value, AccessError> {
        self.beans
            .get(name)
            .cloned()
            .ok_or_else(|| AccessError::failed(format!("no bean named '{name}'")))
    }
}
