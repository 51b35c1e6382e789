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

//! Per-evaluation state: root, active context object stack and scope roots

use super::config::ParserConfig;
use super::context::EvaluationContext;
use crate::core::{EvalResult, TypeDescriptor, TypedValue, Value};

/// Mutable state threaded through one evaluation.
///
/// `#this` is the innermost active context object; `#root` is the root the
/// evaluation started from. Selection, projection and method arguments
/// evaluate against the innermost scope root.
pub(crate) struct EvalState<'a> {
    context: &'a dyn EvaluationContext,
    config: &'a ParserConfig,
    root: TypedValue,
    active: Vec<TypedValue>,
    scope_roots: Vec<TypedValue>,
    /// Cleared when a resolver hands back a member the compiler cannot cache
    specializable: bool,
    /// Set by a compiled routine whose inline cache missed
    guard_failed: bool,
}

impl<'a> EvalState<'a> {
    pub(crate) fn new(context: &'a dyn EvaluationContext, config: &'a ParserConfig) -> Self {
        let root = context.root_object();
        Self::with_root(context, config, root)
    }

    pub(crate) fn with_root(
        context: &'a dyn EvaluationContext,
        config: &'a ParserConfig,
        root: TypedValue,
    ) -> Self {
        Self {
            context,
            config,
            root,
            active: Vec::new(),
            scope_roots: Vec::new(),
            specializable: true,
            guard_failed: false,
        }
    }

    pub(crate) fn context(&self) -> &'a dyn EvaluationContext {
        self.context
    }

    pub(crate) fn config(&self) -> &'a ParserConfig {
        self.config
    }

    pub(crate) fn root(&self) -> &TypedValue {
        &self.root
    }

    /// Innermost active object, the root when none was pushed
    pub(crate) fn active_context_object(&self) -> TypedValue {
        self.active.last().unwrap_or(&self.root).clone()
    }

    /// Innermost scope root, the root when no scope was entered
    pub(crate) fn scope_root(&self) -> TypedValue {
        self.scope_roots.last().unwrap_or(&self.root).clone()
    }

    /// Run `f` with `value` as the active context object
    pub(crate) fn with_active<T>(
        &mut self,
        value: TypedValue,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        self.active.push(value);
        let result = f(self);
        self.active.pop();
        result
    }

    /// Run `f` with `value` as both the active object and the scope root
    pub(crate) fn with_scope<T>(
        &mut self,
        value: TypedValue,
        f: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        self.scope_roots.push(value.clone());
        let result = self.with_active(value, f);
        self.scope_roots.pop();
        result
    }

    /// `#this`, `#root`, or a context variable; undefined names are null
    pub(crate) fn lookup_variable(&self, name: &str) -> TypedValue {
        match name {
            "this" => self.active_context_object(),
            "root" => self.root.clone(),
            _ => self
                .context
                .lookup_variable(name)
                .map(TypedValue::new)
                .unwrap_or(TypedValue::NULL),
        }
    }

    pub(crate) fn assign_variable(&self, name: &str, value: Value) -> EvalResult<()> {
        self.context.assign_variable(name, value)
    }

    pub(crate) fn convert(&self, value: &Value, target: &TypeDescriptor) -> EvalResult<Value> {
        Ok(self.context.type_converter().convert_value(value, target)?)
    }

    pub(crate) fn mark_unspecializable(&mut self) {
        self.specializable = false;
    }

    pub(crate) fn is_specializable(&self) -> bool {
        self.specializable
    }

    pub(crate) fn mark_guard_failure(&mut self) {
        self.guard_failed = true;
    }

    pub(crate) fn guard_failed(&self) -> bool {
        self.guard_failed
    }
}
