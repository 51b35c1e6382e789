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

//! Class descriptors: the runtime class model walked by the reflective resolvers.
//!
//! A [`ClassDescriptor`] names a class, its superclass and interfaces, and
//! lists its properties, methods and constructors. Member bodies are plain
//! closures over [`Value`]s so embedders can describe their own types without
//! any code generation.

use crate::core::{AccessError, MessageKind, TypeDescriptor, Value};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Reads a property from a target
pub type PropertyGetter = Arc<dyn Fn(&Value) -> Result<Value, AccessError> + Send + Sync>;
/// Writes a property on a target
pub type PropertySetter = Arc<dyn Fn(&Value, Value) -> Result<(), AccessError> + Send + Sync>;
/// Invokes a method on a target with already converted arguments
pub type MethodBody = Arc<dyn Fn(&Value, Vec<Value>) -> Result<Value, AccessError> + Send + Sync>;
/// Creates a new instance from already converted arguments
pub type ConstructorBody = Arc<dyn Fn(Vec<Value>) -> Result<Value, AccessError> + Send + Sync>;

pub(crate) const OBJECT_CLASS: &str = "Object";

/// A readable and optionally writable property or field
#[derive(Clone)]
pub struct PropertyDescriptor {
    name: Arc<str>,
    declared_type: TypeDescriptor,
    getter: Option<PropertyGetter>,
    setter: Option<PropertySetter>,
    is_static: bool,
    declared_on_object: bool,
}

impl PropertyDescriptor {
    /// Read-only instance property
    pub fn read_only<G>(name: impl Into<Arc<str>>, declared_type: TypeDescriptor, getter: G) -> Self
    where
        G: Fn(&Value) -> Result<Value, AccessError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            declared_type,
            getter: Some(Arc::new(getter)),
            setter: None,
            is_static: false,
            declared_on_object: false,
        }
    }

    /// Readable and writable instance property
    pub fn read_write<G, S>(
        name: impl Into<Arc<str>>,
        declared_type: TypeDescriptor,
        getter: G,
        setter: S,
    ) -> Self
    where
        G: Fn(&Value) -> Result<Value, AccessError> + Send + Sync + 'static,
        S: Fn(&Value, Value) -> Result<(), AccessError> + Send + Sync + 'static,
    {
        Self {
            setter: Some(Arc::new(setter)),
            ..Self::read_only(name, declared_type, getter)
        }
    }

    /// Static constant field
    pub fn constant(name: impl Into<Arc<str>>, declared_type: TypeDescriptor, value: Value) -> Self {
        Self {
            is_static: true,
            ..Self::read_only(name, declared_type, move |_| Ok(value.clone()))
        }
    }

    /// Mark the property as static
    pub fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value type
    pub fn declared_type(&self) -> &TypeDescriptor {
        &self.declared_type
    }

    /// True when a getter exists
    pub fn is_readable(&self) -> bool {
        self.getter.is_some()
    }

    /// True when a setter exists
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// True for static members
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// True for members declared on the universal base class
    pub fn is_declared_on_object(&self) -> bool {
        self.declared_on_object
    }

    pub(crate) fn getter(&self) -> Option<&PropertyGetter> {
        self.getter.as_ref()
    }

    /// Read the property from `target`
    pub fn get(&self, target: &Value) -> Result<Value, AccessError> {
        match &self.getter {
            Some(getter) => getter(target),
            None => Err(AccessError::new(
                MessageKind::PropertyOrFieldNotReadable,
                [self.name.to_string(), target.type_name()],
            )),
        }
    }

    /// Write the property on `target`
    pub fn set(&self, target: &Value, value: Value) -> Result<(), AccessError> {
        match &self.setter {
            Some(setter) => setter(target, value),
            None => Err(AccessError::new(
                MessageKind::PropertyOrFieldNotWritable,
                [self.name.to_string(), target.type_name()],
            )),
        }
    }
}

impl fmt::Debug for PropertyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDescriptor")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type)
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .field("static", &self.is_static)
            .finish()
    }
}

/// A method with its signature and body
#[derive(Clone)]
pub struct MethodDescriptor {
    name: Arc<str>,
    params: Vec<TypeDescriptor>,
    return_type: TypeDescriptor,
    is_static: bool,
    is_varargs: bool,
    is_bridge: bool,
    declared_on_object: bool,
    body: MethodBody,
}

impl MethodDescriptor {
    /// Instance method
    pub fn new<F>(
        name: impl Into<Arc<str>>,
        params: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
        body: F,
    ) -> Self
    where
        F: Fn(&Value, Vec<Value>) -> Result<Value, AccessError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            return_type,
            is_static: false,
            is_varargs: false,
            is_bridge: false,
            declared_on_object: false,
            body: Arc::new(body),
        }
    }

    /// Static method; the target passed to the body is the class value
    pub fn new_static<F>(
        name: impl Into<Arc<str>>,
        params: Vec<TypeDescriptor>,
        return_type: TypeDescriptor,
        body: F,
    ) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, AccessError> + Send + Sync + 'static,
    {
        Self {
            is_static: true,
            ..Self::new(name, params, return_type, move |_, args| body(args))
        }
    }

    /// The last parameter is an array collecting trailing arguments
    pub fn with_varargs(mut self) -> Self {
        self.is_varargs = true;
        self
    }

    /// Mark as a bridge member, tried after regular members
    pub fn with_bridge(mut self) -> Self {
        self.is_bridge = true;
        self
    }

    /// Method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter types
    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    /// Declared return type
    pub fn return_type(&self) -> &TypeDescriptor {
        &self.return_type
    }

    /// True for static methods
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// True when the last parameter collects trailing arguments
    pub fn is_varargs(&self) -> bool {
        self.is_varargs
    }

    /// True for bridge members
    pub fn is_bridge(&self) -> bool {
        self.is_bridge
    }

    /// True for members declared on the universal base class
    pub fn is_declared_on_object(&self) -> bool {
        self.declared_on_object
    }

    /// Invoke the body
    pub fn invoke(&self, target: &Value, args: Vec<Value>) -> Result<Value, AccessError> {
        (self.body)(target, args)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, "): {}", self.return_type)
    }
}

/// A constructor with its parameter types and body
#[derive(Clone)]
pub struct ConstructorDescriptor {
    params: Vec<TypeDescriptor>,
    is_varargs: bool,
    body: ConstructorBody,
}

impl ConstructorDescriptor {
    /// Constructor taking `params`
    pub fn new<F>(params: Vec<TypeDescriptor>, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, AccessError> + Send + Sync + 'static,
    {
        Self {
            params,
            is_varargs: false,
            body: Arc::new(body),
        }
    }

    /// The last parameter collects trailing arguments
    pub fn with_varargs(mut self) -> Self {
        self.is_varargs = true;
        self
    }

    /// Parameter types
    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    /// True when the last parameter collects trailing arguments
    pub fn is_varargs(&self) -> bool {
        self.is_varargs
    }

    /// Invoke the body
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, AccessError> {
        (self.body)(args)
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorDescriptor")
            .field("params", &self.params)
            .field("varargs", &self.is_varargs)
            .finish()
    }
}

/// Description of one class
#[derive(Clone, Debug)]
pub struct ClassDescriptor {
    name: Arc<str>,
    superclass: Option<Arc<str>>,
    interfaces: Vec<Arc<str>>,
    properties: IndexMap<Arc<str>, PropertyDescriptor>,
    methods: Vec<MethodDescriptor>,
    constructors: Vec<ConstructorDescriptor>,
}

impl ClassDescriptor {
    /// New class extending `Object`
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        let superclass = (&*name != OBJECT_CLASS).then(|| Arc::from(OBJECT_CLASS));
        Self {
            name,
            superclass,
            interfaces: Vec::new(),
            properties: IndexMap::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
        }
    }

    fn is_object(&self) -> bool {
        &*self.name == OBJECT_CLASS
    }

    /// Set the superclass
    pub fn with_superclass(mut self, name: impl Into<Arc<str>>) -> Self {
        self.superclass = Some(name.into());
        self
    }

    /// Add an implemented interface
    pub fn with_interface(mut self, name: impl Into<Arc<str>>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    /// Add a property or field
    pub fn with_property(mut self, mut property: PropertyDescriptor) -> Self {
        property.declared_on_object = self.is_object();
        self.properties.insert(property.name.clone(), property);
        self
    }

    /// Add a method; overloads keep declaration order
    pub fn with_method(mut self, mut method: MethodDescriptor) -> Self {
        method.declared_on_object = self.is_object();
        self.methods.push(method);
        self
    }

    /// Add a constructor
    pub fn with_constructor(mut self, constructor: ConstructorDescriptor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Qualified class name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        self.name.clone()
    }

    /// Superclass name, `None` only for `Object`
    pub fn superclass(&self) -> Option<&str> {
        self.superclass.as_deref()
    }

    /// Directly implemented interfaces
    pub fn interfaces(&self) -> &[Arc<str>] {
        &self.interfaces
    }

    /// Property declared directly on this class
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.get(name)
    }

    /// Properties declared directly on this class
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values()
    }

    /// Methods declared directly on this class
    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    /// Constructors
    pub fn constructors(&self) -> &[ConstructorDescriptor] {
        &self.constructors
    }

    /// Zero-argument constructor, used when auto-growing null references
    pub fn default_constructor(&self) -> Option<&ConstructorDescriptor> {
        self.constructors
            .iter()
            .find(|c| c.params.is_empty() && !c.is_varargs)
    }

    /// Type descriptor for instances of this class
    pub fn type_descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::from_builtin_name(&self.name)
            .unwrap_or_else(|| TypeDescriptor::Named(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_members_are_flagged() {
        let object = ClassDescriptor::new("Object").with_method(MethodDescriptor::new(
            "hashCode",
            vec![],
            TypeDescriptor::Integer,
            |_, _| Ok(Value::Integer(0)),
        ));
        assert!(object.superclass().is_none());
        assert!(object.methods()[0].is_declared_on_object());

        let person = ClassDescriptor::new("Person").with_property(PropertyDescriptor::read_only(
            "name",
            TypeDescriptor::String,
            |_| Ok(Value::string("x")),
        ));
        assert_eq!(person.superclass(), Some("Object"));
        assert!(!person.property("name").unwrap().is_declared_on_object());
        assert_eq!(person.type_descriptor(), TypeDescriptor::named("Person"));
    }

    #[test]
    fn test_missing_setter_is_an_access_error() {
        let prop = PropertyDescriptor::read_only("size", TypeDescriptor::Integer, |_| {
            Ok(Value::Integer(1))
        });
        let err = prop.set(&Value::Null, Value::Integer(2)).unwrap_err();
        assert_eq!(err.kind(), MessageKind::PropertyOrFieldNotWritable);
    }
}
