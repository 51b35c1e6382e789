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

//! Evaluation contexts
//!
//! A context supplies everything evaluation needs beyond the AST: the root
//! object, the resolver chains, the type services and the variable table.
//! [`StandardEvaluationContext`] exposes the whole class model;
//! [`SimpleEvaluationContext`] is restricted to data binding.

use crate::core::{EvalError, EvalResult, FunctionRef, MessageKind, TypedValue, Value};
use crate::model::{
    BeanResolver, OperatorOverloader, StandardOperatorOverloader, StandardTypeComparator,
    StandardTypeConverter, StandardTypeLocator, TypeComparator, TypeConverter, TypeLocator,
    TypeRegistry, UnsupportedTypeLocator,
};
use crate::resolver::{
    ConstructorResolver, DataBindingMethodResolver, DataBindingPropertyAccessor, IndexAccessor,
    MethodResolver, PropertyAccessor, ReflectiveConstructorResolver, ReflectiveMethodResolver,
    ReflectivePropertyAccessor,
};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Services and state an expression is evaluated against.
///
/// Implementations must be shareable across threads; the variable table
/// uses interior mutability so evaluation only needs `&self`.
pub trait EvaluationContext: Send + Sync {
    /// Default root object, used when no root is supplied at evaluation time
    fn root_object(&self) -> TypedValue;

    /// Property accessors in priority order
    fn property_accessors(&self) -> &[Arc<dyn PropertyAccessor>];

    /// Custom index accessors in priority order
    fn index_accessors(&self) -> &[Arc<dyn IndexAccessor>];

    /// Constructor resolvers in priority order
    fn constructor_resolvers(&self) -> &[Arc<dyn ConstructorResolver>];

    /// Method resolvers in priority order
    fn method_resolvers(&self) -> &[Arc<dyn MethodResolver>];

    /// Resolver for `@name` references
    fn bean_resolver(&self) -> Option<&Arc<dyn BeanResolver>>;

    fn type_locator(&self) -> &dyn TypeLocator;

    fn type_converter(&self) -> &dyn TypeConverter;

    fn type_comparator(&self) -> &dyn TypeComparator;

    fn operator_overloader(&self) -> &dyn OperatorOverloader;

    /// Class model the resolvers walk
    fn type_registry(&self) -> &Arc<TypeRegistry>;

    /// Define or replace a variable; setting null removes it
    fn set_variable(&self, name: &str, value: Value);

    /// Current value of a variable or function
    fn lookup_variable(&self, name: &str) -> Option<Value>;

    /// Assignment to a variable from within an expression
    fn assign_variable(&self, name: &str, value: Value) -> EvalResult<()> {
        self.set_variable(name, value);
        Ok(())
    }

    /// False when `=`, `++` and `--` must be rejected
    fn is_assignment_enabled(&self) -> bool {
        true
    }
}

/// Variable and function table shared by both context kinds
#[derive(Default)]
struct Variables(RwLock<FxHashMap<String, Value>>);

impl Variables {
    fn set(&self, name: &str, value: Value) {
        let mut table = self.0.write();
        if value.is_null() {
            table.remove(name);
        } else {
            table.insert(name.to_string(), value);
        }
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.0.read().get(name).cloned()
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Fully capable context: type references, constructors, static members,
/// bean references and every registered class member are reachable.
pub struct StandardEvaluationContext {
    root: TypedValue,
    registry: Arc<TypeRegistry>,
    property_accessors: Vec<Arc<dyn PropertyAccessor>>,
    index_accessors: Vec<Arc<dyn IndexAccessor>>,
    constructor_resolvers: Vec<Arc<dyn ConstructorResolver>>,
    method_resolvers: Vec<Arc<dyn MethodResolver>>,
    bean_resolver: Option<Arc<dyn BeanResolver>>,
    type_locator: Arc<dyn TypeLocator>,
    type_converter: Arc<dyn TypeConverter>,
    type_comparator: Arc<dyn TypeComparator>,
    operator_overloader: Arc<dyn OperatorOverloader>,
    variables: Variables,
}

impl StandardEvaluationContext {
    /// Context over a registry holding the built-in classes
    pub fn new() -> Self {
        Self::with_registry(Arc::new(TypeRegistry::with_builtins()))
    }

    /// Context over an existing class model
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self {
            root: TypedValue::NULL,
            property_accessors: vec![Arc::new(ReflectivePropertyAccessor::new())],
            index_accessors: Vec::new(),
            constructor_resolvers: vec![Arc::new(ReflectiveConstructorResolver::new())],
            method_resolvers: vec![Arc::new(ReflectiveMethodResolver::new())],
            bean_resolver: None,
            type_locator: Arc::new(StandardTypeLocator::new(registry.clone())),
            type_converter: Arc::new(StandardTypeConverter::new(registry.clone())),
            type_comparator: Arc::new(StandardTypeComparator),
            operator_overloader: Arc::new(StandardOperatorOverloader),
            variables: Variables::default(),
            registry,
        }
    }

    /// Set the root object
    pub fn with_root(mut self, root: impl Into<Value>) -> Self {
        self.root = TypedValue::new(root);
        self
    }

    /// Set the root object with an explicit declared type
    pub fn with_typed_root(mut self, root: TypedValue) -> Self {
        self.root = root;
        self
    }

    /// Replace the root object in place
    pub fn set_root_object(&mut self, root: impl Into<Value>) {
        self.root = TypedValue::new(root);
    }

    /// Define a variable
    pub fn with_variable(self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.set(name, value.into());
        self
    }

    /// Register a function callable as `#name(...)`.
    ///
    /// Functions and variables share one namespace.
    pub fn register_function(&self, name: &str, function: FunctionRef) {
        self.variables.set(name, Value::Function(function));
    }

    /// Names of all defined variables and functions, sorted
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.names()
    }

    pub fn with_bean_resolver(mut self, resolver: impl BeanResolver + 'static) -> Self {
        self.bean_resolver = Some(Arc::new(resolver));
        self
    }

    /// Add a property accessor ahead of the default reflective one
    pub fn with_property_accessor(mut self, accessor: impl PropertyAccessor + 'static) -> Self {
        let at = self.property_accessors.len().saturating_sub(1);
        self.property_accessors.insert(at, Arc::new(accessor));
        self
    }

    /// Replace the property accessor chain
    pub fn with_property_accessors(mut self, accessors: Vec<Arc<dyn PropertyAccessor>>) -> Self {
        self.property_accessors = accessors;
        self
    }

    /// Add a custom index accessor; these are tried before native indexing
    pub fn with_index_accessor(mut self, accessor: impl IndexAccessor + 'static) -> Self {
        self.index_accessors.push(Arc::new(accessor));
        self
    }

    /// Add a method resolver ahead of the default reflective one
    pub fn with_method_resolver(mut self, resolver: impl MethodResolver + 'static) -> Self {
        let at = self.method_resolvers.len().saturating_sub(1);
        self.method_resolvers.insert(at, Arc::new(resolver));
        self
    }

    /// Replace the method resolver chain
    pub fn with_method_resolvers(mut self, resolvers: Vec<Arc<dyn MethodResolver>>) -> Self {
        self.method_resolvers = resolvers;
        self
    }

    /// Add a constructor resolver ahead of the default reflective one
    pub fn with_constructor_resolver(
        mut self,
        resolver: impl ConstructorResolver + 'static,
    ) -> Self {
        let at = self.constructor_resolvers.len().saturating_sub(1);
        self.constructor_resolvers.insert(at, Arc::new(resolver));
        self
    }

    pub fn with_type_locator(mut self, locator: impl TypeLocator + 'static) -> Self {
        self.type_locator = Arc::new(locator);
        self
    }

    pub fn with_type_converter(mut self, converter: impl TypeConverter + 'static) -> Self {
        self.type_converter = Arc::new(converter);
        self
    }

    pub fn with_type_comparator(mut self, comparator: impl TypeComparator + 'static) -> Self {
        self.type_comparator = Arc::new(comparator);
        self
    }

    pub fn with_operator_overloader(mut self, overloader: impl OperatorOverloader + 'static) -> Self {
        self.operator_overloader = Arc::new(overloader);
        self
    }

    /// Class model shared with the resolvers
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }
}

impl Default for StandardEvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StandardEvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardEvaluationContext")
            .field("root", &self.root)
            .field("property_accessors", &self.property_accessors.len())
            .field("method_resolvers", &self.method_resolvers.len())
            .field("variables", &self.variables.names())
            .finish()
    }
}

impl EvaluationContext for StandardEvaluationContext {
    fn root_object(&self) -> TypedValue {
        self.root.clone()
    }

    fn property_accessors(&self) -> &[Arc<dyn PropertyAccessor>] {
        &self.property_accessors
    }

    fn index_accessors(&self) -> &[Arc<dyn IndexAccessor>] {
        &self.index_accessors
    }

    fn constructor_resolvers(&self) -> &[Arc<dyn ConstructorResolver>] {
        &self.constructor_resolvers
    }

    fn method_resolvers(&self) -> &[Arc<dyn MethodResolver>] {
        &self.method_resolvers
    }

    fn bean_resolver(&self) -> Option<&Arc<dyn BeanResolver>> {
        self.bean_resolver.as_ref()
    }

    fn type_locator(&self) -> &dyn TypeLocator {
        self.type_locator.as_ref()
    }

    fn type_converter(&self) -> &dyn TypeConverter {
        self.type_converter.as_ref()
    }

    fn type_comparator(&self) -> &dyn TypeComparator {
        self.type_comparator.as_ref()
    }

    fn operator_overloader(&self) -> &dyn OperatorOverloader {
        self.operator_overloader.as_ref()
    }

    fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    fn set_variable(&self, name: &str, value: Value) {
        self.variables.set(name, value);
    }

    fn lookup_variable(&self, name: &str) -> Option<Value> {
        self.variables.get(name)
    }
}

/// Context restricted to data binding.
///
/// Type references, constructors and bean references are unavailable, and
/// expressions cannot assign variables. Property access goes through the
/// configured accessors only; methods are callable only after
/// [`with_instance_methods`](Self::with_instance_methods).
pub struct SimpleEvaluationContext {
    root: TypedValue,
    registry: Arc<TypeRegistry>,
    property_accessors: Vec<Arc<dyn PropertyAccessor>>,
    index_accessors: Vec<Arc<dyn IndexAccessor>>,
    method_resolvers: Vec<Arc<dyn MethodResolver>>,
    type_converter: Arc<dyn TypeConverter>,
    type_comparator: Arc<dyn TypeComparator>,
    operator_overloader: Arc<dyn OperatorOverloader>,
    assignment_enabled: bool,
    variables: Variables,
}

impl SimpleEvaluationContext {
    /// Read-only access to public properties
    pub fn for_read_only_data_binding() -> Self {
        Self::for_property_accessors(vec![Arc::new(
            DataBindingPropertyAccessor::for_read_only_access(),
        )])
    }

    /// Read and write access to public properties
    pub fn for_read_write_data_binding() -> Self {
        Self::for_property_accessors(vec![Arc::new(
            DataBindingPropertyAccessor::for_read_write_access(),
        )])
    }

    /// Context using exactly the given property accessors
    pub fn for_property_accessors(accessors: Vec<Arc<dyn PropertyAccessor>>) -> Self {
        let registry = Arc::new(TypeRegistry::with_builtins());
        Self {
            root: TypedValue::NULL,
            property_accessors: accessors,
            index_accessors: Vec::new(),
            method_resolvers: Vec::new(),
            type_converter: Arc::new(StandardTypeConverter::new(registry.clone())),
            type_comparator: Arc::new(StandardTypeComparator),
            operator_overloader: Arc::new(StandardOperatorOverloader),
            assignment_enabled: true,
            variables: Variables::default(),
            registry,
        }
    }

    /// Use an existing class model
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.type_converter = Arc::new(StandardTypeConverter::new(registry.clone()));
        self.registry = registry;
        self
    }

    /// Allow public instance methods, excluding those declared on `Object`
    pub fn with_instance_methods(mut self) -> Self {
        self.method_resolvers = vec![Arc::new(
            DataBindingMethodResolver::for_instance_method_invocation(),
        )];
        self
    }

    /// Use the given method resolvers
    pub fn with_method_resolvers(mut self, resolvers: Vec<Arc<dyn MethodResolver>>) -> Self {
        self.method_resolvers = resolvers;
        self
    }

    pub fn with_index_accessor(mut self, accessor: impl IndexAccessor + 'static) -> Self {
        self.index_accessors.push(Arc::new(accessor));
        self
    }

    pub fn with_type_converter(mut self, converter: impl TypeConverter + 'static) -> Self {
        self.type_converter = Arc::new(converter);
        self
    }

    pub fn with_operator_overloader(mut self, overloader: impl OperatorOverloader + 'static) -> Self {
        self.operator_overloader = Arc::new(overloader);
        self
    }

    /// Reject `=`, `++` and `--`
    pub fn with_assignment_disabled(mut self) -> Self {
        self.assignment_enabled = false;
        self
    }

    pub fn with_root(mut self, root: impl Into<Value>) -> Self {
        self.root = TypedValue::new(root);
        self
    }

    pub fn with_typed_root(mut self, root: TypedValue) -> Self {
        self.root = root;
        self
    }

    /// Define a variable from outside; expressions themselves cannot
    pub fn with_variable(self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.set(name, value.into());
        self
    }
}

impl fmt::Debug for SimpleEvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleEvaluationContext")
            .field("root", &self.root)
            .field("assignment_enabled", &self.assignment_enabled)
            .field("variables", &self.variables.names())
            .finish()
    }
}

impl EvaluationContext for SimpleEvaluationContext {
    fn root_object(&self) -> TypedValue {
        self.root.clone()
    }

    fn property_accessors(&self) -> &[Arc<dyn PropertyAccessor>] {
        &self.property_accessors
    }

    fn index_accessors(&self) -> &[Arc<dyn IndexAccessor>] {
        &self.index_accessors
    }

    fn constructor_resolvers(&self) -> &[Arc<dyn ConstructorResolver>] {
        &[]
    }

    fn method_resolvers(&self) -> &[Arc<dyn MethodResolver>] {
        &self.method_resolvers
    }

    fn bean_resolver(&self) -> Option<&Arc<dyn BeanResolver>> {
        None
    }

    fn type_locator(&self) -> &dyn TypeLocator {
        &UnsupportedTypeLocator
    }

    fn type_converter(&self) -> &dyn TypeConverter {
        self.type_converter.as_ref()
    }

    fn type_comparator(&self) -> &dyn TypeComparator {
        self.type_comparator.as_ref()
    }

    fn operator_overloader(&self) -> &dyn OperatorOverloader {
        self.operator_overloader.as_ref()
    }

    fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    fn set_variable(&self, name: &str, value: Value) {
        self.variables.set(name, value);
    }

    fn lookup_variable(&self, name: &str) -> Option<Value> {
        self.variables.get(name)
    }

    fn assign_variable(&self, name: &str, _value: Value) -> EvalResult<()> {
        Err(EvalError::new(
            MessageKind::VariableAssignmentNotSupported,
            [name],
        ))
    }

    fn is_assignment_enabled(&self) -> bool {
        self.assignment_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_variable_removes_entry() {
        let ctx = StandardEvaluationContext::new().with_variable("x", 1);
        assert_eq!(ctx.lookup_variable("x"), Some(Value::Integer(1)));
        ctx.set_variable("x", Value::Null);
        assert_eq!(ctx.lookup_variable("x"), None);
    }

    #[test]
    fn test_added_accessor_precedes_default() {
        let ctx = StandardEvaluationContext::new()
            .with_property_accessor(crate::resolver::MapAccessor::new());
        assert_eq!(ctx.property_accessors().len(), 2);
        let first = ctx.property_accessors()[0].specific_target_classes();
        assert_eq!(first, Some(vec![crate::core::TypeDescriptor::Map]));
    }

    #[test]
    fn test_simple_context_rejects_variable_assignment() {
        let ctx = SimpleEvaluationContext::for_read_only_data_binding();
        let err = ctx.assign_variable("x", Value::Integer(1)).unwrap_err();
        assert_eq!(err.kind(), MessageKind::VariableAssignmentNotSupported);
        assert!(ctx.constructor_resolvers().is_empty());
        assert!(ctx.type_locator().find_type("String").is_err());
    }
}
