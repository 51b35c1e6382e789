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

//! Type lookup for `T(...)`, constructors and array construction

use super::registry::TypeRegistry;
use crate::core::{EvalError, EvalResult, MessageKind, TypeDescriptor, Value};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Resolves type names to descriptors
pub trait TypeLocator: Send + Sync {
    /// Find the type named `name`, failing with `TypeNotFound`
    fn find_type(&self, name: &str) -> EvalResult<TypeDescriptor>;
}

/// Primitive keywords with the descriptor and default element value they map to
static PRIMITIVES: Lazy<FxHashMap<&'static str, (TypeDescriptor, Value)>> = Lazy::new(|| {
    let mut table = FxHashMap::default();
    table.insert("int", (TypeDescriptor::Integer, Value::Integer(0)));
    table.insert("short", (TypeDescriptor::Integer, Value::Integer(0)));
    table.insert("byte", (TypeDescriptor::Integer, Value::Integer(0)));
    table.insert("long", (TypeDescriptor::Long, Value::Long(0)));
    table.insert("float", (TypeDescriptor::Float, Value::Float(0.0)));
    table.insert("double", (TypeDescriptor::Double, Value::Double(0.0)));
    table.insert("boolean", (TypeDescriptor::Boolean, Value::Boolean(false)));
    table.insert("char", (TypeDescriptor::Char, Value::Char('\0')));
    table
});

/// Descriptor and array default for a primitive keyword such as `int`
pub fn primitive_type(name: &str) -> Option<(TypeDescriptor, Value)> {
    PRIMITIVES.get(name).cloned()
}

/// Locator backed by a [`TypeRegistry`], with import prefixes
#[derive(Debug)]
pub struct StandardTypeLocator {
    registry: Arc<TypeRegistry>,
    import_prefixes: RwLock<Vec<String>>,
    cache: DashMap<String, TypeDescriptor>,
}

impl StandardTypeLocator {
    /// Locator over `registry` with no import prefixes
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            import_prefixes: RwLock::new(Vec::new()),
            cache: DashMap::new(),
        }
    }

    /// Builder form of [`Self::register_import`]
    pub fn with_import_prefix(self, prefix: impl Into<String>) -> Self {
        self.register_import(prefix);
        self
    }

    /// Also try `prefix.Name` when `Name` is not found
    pub fn register_import(&self, prefix: impl Into<String>) {
        self.import_prefixes.write().push(prefix.into());
    }

    /// Registered import prefixes
    pub fn import_prefixes(&self) -> Vec<String> {
        self.import_prefixes.read().clone()
    }

    fn lookup(&self, name: &str) -> Option<TypeDescriptor> {
        if let Some((ty, _)) = primitive_type(name) {
            return Some(ty);
        }
        if let Some(class) = self.registry.lookup(name) {
            return Some(class.type_descriptor());
        }
        self.import_prefixes
            .read()
            .iter()
            .find_map(|prefix| self.registry.lookup(&format!("{prefix}.{name}")))
            .map(|class| class.type_descriptor())
    }
}

impl TypeLocator for StandardTypeLocator {
    fn find_type(&self, name: &str) -> EvalResult<TypeDescriptor> {
        if let Some(found) = self.cache.get(name) {
            return Ok(found.clone());
        }
        let ty = self
            .lookup(name)
            .ok_or_else(|| EvalError::new(MessageKind::TypeNotFound, [name]))?;
        self.cache.insert(name.to_string(), ty.clone());
        Ok(ty)
    }
}

/// Locator that refuses every type, used by the restricted context
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedTypeLocator;

impl TypeLocator for UnsupportedTypeLocator {
    fn find_type(&self, name: &str) -> EvalResult<TypeDescriptor> {
        Err(EvalError::new(MessageKind::TypeNotFound, [name]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::descriptor::ClassDescriptor;

    #[test]
    fn test_import_prefix_fallback() {
        let registry = Arc::new(TypeRegistry::with_builtins());
        registry.register(ClassDescriptor::new("org.acme.Person"));
        let locator = StandardTypeLocator::new(registry).with_import_prefix("org.acme");
        assert_eq!(
            locator.find_type("Person").unwrap(),
            TypeDescriptor::named("org.acme.Person")
        );
        assert_eq!(locator.find_type("String").unwrap(), TypeDescriptor::String);
        assert_eq!(locator.find_type("int").unwrap(), TypeDescriptor::Integer);
        assert_eq!(
            locator.find_type("Missing").unwrap_err().kind(),
            MessageKind::TypeNotFound
        );
    }

    #[test]
    fn test_unsupported_locator() {
        let err = UnsupportedTypeLocator.find_type("String").unwrap_err();
        assert_eq!(err.inserts(), &["String".to_string()]);
    }
}
