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

//! Type descriptors for runtime values

use std::fmt;
use std::sync::Arc;

/// Describes the type of a runtime value.
///
/// Built-in kinds have dedicated variants; every other type is identified by
/// its registered, fully qualified class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeDescriptor {
    /// Universal base type
    Object,
    /// Boolean
    Boolean,
    /// Single character
    Char,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// Arbitrary precision integer
    BigInteger,
    /// Arbitrary precision decimal
    Decimal,
    /// Common supertype of the numeric kinds
    Number,
    /// String
    String,
    /// Growable list
    List,
    /// Insertion ordered map
    Map,
    /// A type used as a value
    Class,
    /// Invocable function value
    Function,
    /// Fixed-length array of a component type
    Array(Box<TypeDescriptor>),
    /// Registered class, identified by qualified name
    Named(Arc<str>),
}

impl TypeDescriptor {
    /// Descriptor for a registered class name
    pub fn named(name: impl Into<Arc<str>>) -> Self {
        TypeDescriptor::Named(name.into())
    }

    /// Descriptor for an array of `component`
    pub fn array_of(component: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(component))
    }

    /// Qualified name under which the type is registered
    pub fn name(&self) -> String {
        match self {
            TypeDescriptor::Array(component) => format!("{}[]", component.name()),
            TypeDescriptor::Named(name) => name.to_string(),
            other => other.builtin_name().unwrap_or("Object").to_string(),
        }
    }

    /// Short name, the last segment of the qualified name
    pub fn simple_name(&self) -> String {
        let name = self.name();
        match name.rsplit_once('.') {
            Some((_, simple)) => simple.to_string(),
            None => name,
        }
    }

    pub(crate) fn builtin_name(&self) -> Option<&'static str> {
        Some(match self {
            TypeDescriptor::Object => "Object",
            TypeDescriptor::Boolean => "Boolean",
            TypeDescriptor::Char => "Character",
            TypeDescriptor::Integer => "Integer",
            TypeDescriptor::Long => "Long",
            TypeDescriptor::Float => "Float",
            TypeDescriptor::Double => "Double",
            TypeDescriptor::BigInteger => "BigInteger",
            TypeDescriptor::Decimal => "BigDecimal",
            TypeDescriptor::Number => "Number",
            TypeDescriptor::String => "String",
            TypeDescriptor::List => "List",
            TypeDescriptor::Map => "Map",
            TypeDescriptor::Class => "Class",
            TypeDescriptor::Function => "Function",
            TypeDescriptor::Array(_) | TypeDescriptor::Named(_) => return None,
        })
    }

    /// Map a built-in class name back to its descriptor
    pub fn from_builtin_name(name: &str) -> Option<Self> {
        Some(match name {
            "Object" => TypeDescriptor::Object,
            "Boolean" => TypeDescriptor::Boolean,
            "Character" => TypeDescriptor::Char,
            "Integer" => TypeDescriptor::Integer,
            "Long" => TypeDescriptor::Long,
            "Float" => TypeDescriptor::Float,
            "Double" => TypeDescriptor::Double,
            "BigInteger" => TypeDescriptor::BigInteger,
            "BigDecimal" => TypeDescriptor::Decimal,
            "Number" => TypeDescriptor::Number,
            "String" => TypeDescriptor::String,
            "List" => TypeDescriptor::List,
            "Map" => TypeDescriptor::Map,
            "Class" => TypeDescriptor::Class,
            "Function" => TypeDescriptor::Function,
            _ => return None,
        })
    }

    /// True for the concrete numeric kinds
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Integer
                | TypeDescriptor::Long
                | TypeDescriptor::Float
                | TypeDescriptor::Double
                | TypeDescriptor::BigInteger
                | TypeDescriptor::Decimal
        )
    }

    /// True for list, map and array kinds
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::List | TypeDescriptor::Map | TypeDescriptor::Array(_)
        )
    }

    /// Component type when this describes an array
    pub fn component_type(&self) -> Option<&TypeDescriptor> {
        match self {
            TypeDescriptor::Array(component) => Some(component),
            _ => None,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Renders an optional descriptor, using `null` for an absent type
pub(crate) fn describe(ty: Option<&TypeDescriptor>) -> String {
    match ty {
        Some(ty) => ty.name(),
        None => "null".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_for_builtins() {
        for ty in [
            TypeDescriptor::Integer,
            TypeDescriptor::Decimal,
            TypeDescriptor::Char,
            TypeDescriptor::Map,
        ] {
            assert_eq!(TypeDescriptor::from_builtin_name(&ty.name()), Some(ty));
        }
    }

    #[test]
    fn test_array_and_named_names() {
        let ty = TypeDescriptor::array_of(TypeDescriptor::array_of(TypeDescriptor::String));
        assert_eq!(ty.name(), "String[][]");
        let person = TypeDescriptor::named("org.acme.Person");
        assert_eq!(person.simple_name(), "Person");
        assert_eq!(describe(None), "null");
    }
}
