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

//! A value paired with its declared type

use super::types::TypeDescriptor;
use super::value::Value;
use std::fmt;

/// A runtime value together with an optional declared type.
///
/// When no declared type is supplied the runtime type of the value is used,
/// see [`TypedValue::type_descriptor`].
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TypedValue {
    value: Value,
    declared_type: Option<TypeDescriptor>,
}

impl TypedValue {
    /// The distinguished null typed value
    pub const NULL: TypedValue = TypedValue {
        value: Value::Null,
        declared_type: None,
    };

    /// Typed value whose type is the runtime type of `value`
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            declared_type: None,
        }
    }

    /// Typed value with an explicitly declared type
    pub fn with_type(value: impl Into<Value>, declared_type: TypeDescriptor) -> Self {
        Self {
            value: value.into(),
            declared_type: Some(declared_type),
        }
    }

    /// Boolean typed value
    pub fn boolean(b: bool) -> Self {
        Self::with_type(Value::Boolean(b), TypeDescriptor::Boolean)
    }

    /// The underlying value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Unwrap the underlying value
    pub fn into_value(self) -> Value {
        self.value
    }

    /// The declared type, if one was supplied
    pub fn declared_type(&self) -> Option<&TypeDescriptor> {
        self.declared_type.as_ref()
    }

    /// Declared type, narrowed to the runtime type when undeclared
    pub fn type_descriptor(&self) -> Option<TypeDescriptor> {
        match (&self.declared_type, &self.value) {
            // A concrete value is more specific than a declared Object
            (Some(TypeDescriptor::Object), value) if !value.is_null() => value.type_descriptor(),
            (Some(declared), _) => Some(declared.clone()),
            (None, value) => value.type_descriptor(),
        }
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

impl From<Value> for TypedValue {
    fn from(value: Value) -> Self {
        TypedValue::new(value)
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.declared_type {
            Some(ty) => write!(f, "TypedValue: '{}' of [{}]", self.value, ty),
            None => write!(f, "TypedValue: '{}' of [{}]", self.value, self.value.type_name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_singleton() {
        assert!(TypedValue::NULL.is_null());
        assert_eq!(TypedValue::NULL.type_descriptor(), None);
        assert_eq!(TypedValue::default(), TypedValue::NULL);
    }

    #[test]
    fn test_declared_type_narrows() {
        let tv = TypedValue::with_type(Value::from(3), TypeDescriptor::Object);
        assert_eq!(tv.type_descriptor(), Some(TypeDescriptor::Integer));

        let tv = TypedValue::with_type(Value::Null, TypeDescriptor::String);
        assert_eq!(tv.type_descriptor(), Some(TypeDescriptor::String));
    }
}
