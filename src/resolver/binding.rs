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

//! Restricted resolvers for data binding
//!
//! Instance members only, and nothing declared on `Object`: no `getClass`,
//! no static fields, no class values.

use super::reflective::{ReflectiveMethodResolver, ReflectivePropertyAccessor};
use super::{CompiledReader, MethodExecutor, MethodResolver, PropertyAccessor};
use crate::core::{AccessError, EvalResult, TypeDescriptor, TypedValue, Value};
use crate::evaluator::EvaluationContext;
use std::sync::Arc;

/// Property accessor for data binding
#[derive(Debug)]
pub struct DataBindingPropertyAccessor {
    inner: ReflectivePropertyAccessor,
}

impl DataBindingPropertyAccessor {
    /// Accessor that reads but never writes
    pub fn for_read_only_access() -> Self {
        Self {
            inner: ReflectivePropertyAccessor::with_options(false, true, true),
        }
    }

    /// Accessor that reads and writes
    pub fn for_read_write_access() -> Self {
        Self {
            inner: ReflectivePropertyAccessor::with_options(true, true, true),
        }
    }
}

impl PropertyAccessor for DataBindingPropertyAccessor {
    fn can_read(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Result<bool, AccessError> {
        if matches!(target, Value::Type(_)) {
            return Ok(false);
        }
        self.inner.can_read(context, target, name)
    }

    fn read(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> EvalResult<TypedValue> {
        self.inner.read(context, target, name)
    }

    fn can_write(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Result<bool, AccessError> {
        if matches!(target, Value::Type(_)) {
            return Ok(false);
        }
        self.inner.can_write(context, target, name)
    }

    fn write(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        value: Value,
    ) -> EvalResult<()> {
        self.inner.write(context, target, name, value)
    }

    fn compilable_reader(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Option<CompiledReader> {
        self.inner.compilable_reader(context, target, name)
    }
}

/// Method resolver for data binding
#[derive(Debug)]
pub struct DataBindingMethodResolver {
    inner: ReflectiveMethodResolver,
}

impl DataBindingMethodResolver {
    /// Resolver for instance methods not declared on `Object`
    pub fn for_instance_method_invocation() -> Self {
        Self {
            inner: ReflectiveMethodResolver::with_options(true, true),
        }
    }
}

impl MethodResolver for DataBindingMethodResolver {
    fn resolve(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        arg_types: &[Option<TypeDescriptor>],
    ) -> Result<Option<Arc<dyn MethodExecutor>>, AccessError> {
        if matches!(target, Value::Type(_)) {
            return Ok(None);
        }
        self.inner.resolve(context, target, name, arg_types)
    }
}
