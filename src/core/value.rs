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

//! Runtime value model.
//!
//! [`Value`] is a closed union over the built-in kinds plus one opaque
//! [`ObjectRef`] variant for embedder-defined types. Lists, maps and arrays
//! are shared references: cloning a `Value::List` clones the handle, so a
//! write through an indexer is visible to every holder.

use super::error::AccessError;
use super::types::TypeDescriptor;
use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use rust_decimal::Decimal;
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A runtime value
#[derive(Clone, Default)]
pub enum Value {
    /// The null value
    #[default]
    Null,
    /// Boolean
    Boolean(bool),
    /// Single character
    Char(char),
    /// 32-bit integer
    Integer(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Arbitrary precision integer
    BigInteger(BigInt),
    /// Arbitrary precision decimal
    Decimal(Decimal),
    /// Immutable string
    String(Arc<str>),
    /// Shared growable list
    List(ListRef),
    /// Shared insertion-ordered map
    Map(MapRef),
    /// Shared fixed-length array
    Array(ArrayRef),
    /// A type used as a value, e.g. the result of `T(Integer)`
    Type(TypeDescriptor),
    /// Invocable function registered as a variable
    Function(FunctionRef),
    /// Embedder-defined object
    Object(ObjectRef),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// Create a new list value owning `items`
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(ListRef::new(items))
    }

    /// Create a new map value from key/value pairs
    pub fn map<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        Value::Map(MapRef::from_entries(entries))
    }

    /// Wrap an embedder object under its registered class name
    pub fn object<T: Any + Send + Sync>(class: impl Into<Arc<str>>, value: T) -> Self {
        Value::Object(ObjectRef::new(class, value))
    }

    /// Check for null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check for a numeric kind
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Integer(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
                | Value::BigInteger(_)
                | Value::Decimal(_)
        )
    }

    /// Runtime type of this value, `None` for null
    pub fn type_descriptor(&self) -> Option<TypeDescriptor> {
        Some(match self {
            Value::Null => return None,
            Value::Boolean(_) => TypeDescriptor::Boolean,
            Value::Char(_) => TypeDescriptor::Char,
            Value::Integer(_) => TypeDescriptor::Integer,
            Value::Long(_) => TypeDescriptor::Long,
            Value::Float(_) => TypeDescriptor::Float,
            Value::Double(_) => TypeDescriptor::Double,
            Value::BigInteger(_) => TypeDescriptor::BigInteger,
            Value::Decimal(_) => TypeDescriptor::Decimal,
            Value::String(_) => TypeDescriptor::String,
            Value::List(_) => TypeDescriptor::List,
            Value::Map(_) => TypeDescriptor::Map,
            Value::Array(array) => TypeDescriptor::array_of(array.component().clone()),
            Value::Type(_) => TypeDescriptor::Class,
            Value::Function(_) => TypeDescriptor::Function,
            Value::Object(object) => TypeDescriptor::Named(object.class_name_arc()),
        })
    }

    /// Name of the runtime type, `null` for null
    pub fn type_name(&self) -> String {
        super::types::describe(self.type_descriptor().as_ref())
    }

    /// Borrow the string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric payload widened to i64, truncating reals
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            Value::Float(f) => Some(*f as i64),
            Value::Double(d) => Some(*d as i64),
            Value::BigInteger(b) => b.to_i64(),
            Value::Decimal(d) => d.trunc().to_i64(),
            Value::Char(c) => Some(i64::from(u32::from(*c))),
            _ => None,
        }
    }

    /// Numeric payload as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Float(f) => Some(f64::from(*f)),
            Value::Double(d) => Some(*d),
            Value::BigInteger(b) => b.to_f64(),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Render the value the way string concatenation and templates do
    pub fn to_display_string(&self) -> String {
        self.to_string()
    }

    /// Convert a JSON document into a value tree
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    match i32::try_from(i) {
                        Ok(small) => Value::Integer(small),
                        Err(_) => Value::Long(i),
                    }
                } else if let Some(u) = n.as_u64() {
                    Value::BigInteger(BigInt::from(u))
                } else {
                    Value::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::string(s),
            serde_json::Value::Array(items) => {
                Value::list(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::map(
                fields
                    .iter()
                    .map(|(k, v)| (Value::string(k), Value::from_json(v))),
            ),
        }
    }

    /// Convert the value tree into JSON; non-JSON kinds become strings
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Boolean(b) => Json::Bool(*b),
            Value::Integer(i) => Json::from(*i),
            Value::Long(l) => Json::from(*l),
            Value::Float(f) => serde_json::Number::from_f64(f64::from(*f))
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Double(d) => serde_json::Number::from_f64(*d)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::List(list) => Json::Array(list.snapshot().iter().map(Value::to_json).collect()),
            Value::Array(array) => {
                Json::Array(array.snapshot().iter().map(Value::to_json).collect())
            }
            Value::Map(map) => Json::Object(
                map.read()
                    .iter()
                    .map(|(k, v)| (k.value().to_string(), v.to_json()))
                    .collect(),
            ),
            other => Json::String(other.to_string()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::BigInteger(a), Value::BigInteger(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.ptr_eq(b) || *a.read() == *b.read(),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b) || *a.read() == *b.read(),
            (Value::Map(a), Value::Map(b)) => {
                if a.ptr_eq(b) {
                    return true;
                }
                let (left, right) = (a.read(), b.read());
                left.len() == right.len()
                    && left.iter().all(|(k, v)| right.get(k).is_some_and(|o| o == v))
            }
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(&a.body, &b.body),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Boolean(b) => write!(f, "Boolean({b})"),
            Value::Char(c) => write!(f, "Char({c:?})"),
            Value::Integer(i) => write!(f, "Integer({i})"),
            Value::Long(l) => write!(f, "Long({l})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::Double(x) => write!(f, "Double({x:?})"),
            Value::BigInteger(b) => write!(f, "BigInteger({b})"),
            Value::Decimal(d) => write!(f, "Decimal({d})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::List(list) => f.debug_tuple("List").field(&*list.read()).finish(),
            Value::Array(array) => f
                .debug_struct("Array")
                .field("component", array.component())
                .field("elements", &*array.read())
                .finish(),
            Value::Map(map) => {
                let guard = map.read();
                f.debug_map()
                    .entries(guard.iter().map(|(k, v)| (k.value(), v)))
                    .finish()
            }
            Value::Type(ty) => write!(f, "Type({ty})"),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            Value::Object(object) => write!(f, "Object({object})"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Long(l) => write!(f, "{l}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Double(x) => write!(f, "{x:?}"),
            Value::BigInteger(b) => write!(f, "{b}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
            Value::List(list) => write_sequence(f, &list.read()),
            Value::Array(array) => write_sequence(f, &array.read()),
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.read().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", k.value(), v)?;
                }
                f.write_str("}")
            }
            Value::Type(ty) => write!(f, "class {ty}"),
            Value::Function(func) => write!(f, "function {}", func.name()),
            Value::Object(object) => write!(f, "{object}"),
        }
    }
}

fn write_sequence(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    f.write_str("[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    f.write_str("]")
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Char(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::BigInteger(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(Arc::from(value))
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::list(value)
    }
}

impl From<TypeDescriptor> for Value {
    fn from(value: TypeDescriptor) -> Self {
        Value::Type(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Shared handle to a growable list
#[derive(Clone, Default)]
pub struct ListRef(Arc<RwLock<Vec<Value>>>);

impl ListRef {
    /// Wrap `items` in a new shared list
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    /// Read guard over the elements
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<Value>> {
        self.0.read()
    }

    /// Write guard over the elements
    pub fn write(&self) -> RwLockWriteGuard<'_, Vec<Value>> {
        self.0.write()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// True when the list has no elements
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Clone of the element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// Clone of all elements, taken under a single read lock
    pub fn snapshot(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ListRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.read().iter()).finish()
    }
}

/// Shared handle to an insertion-ordered map
#[derive(Clone, Default)]
pub struct MapRef(Arc<RwLock<IndexMap<MapKey, Value>>>);

impl MapRef {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map from key/value pairs, later keys replacing earlier ones
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (MapKey::new(k), v))
            .collect::<IndexMap<_, _>>();
        Self(Arc::new(RwLock::new(map)))
    }

    /// Read guard over the entries
    pub fn read(&self) -> RwLockReadGuard<'_, IndexMap<MapKey, Value>> {
        self.0.read()
    }

    /// Write guard over the entries
    pub fn write(&self) -> RwLockWriteGuard<'_, IndexMap<MapKey, Value>> {
        self.0.write()
    }

    /// Value stored under `key`
    pub fn get(&self, key: &Value) -> Option<Value> {
        self.0.read().get(&MapKey::new(key.clone())).cloned()
    }

    /// Store `value` under `key`
    pub fn insert(&self, key: Value, value: Value) -> Option<Value> {
        self.0.write().insert(MapKey::new(key), value)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// True when the map has no entries
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Clone of all entries in insertion order
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.0
            .read()
            .iter()
            .map(|(k, v)| (k.value().clone(), v.clone()))
            .collect()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &MapRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

/// Shared handle to a fixed-length array
#[derive(Clone)]
pub struct ArrayRef {
    component: TypeDescriptor,
    elements: Arc<RwLock<Vec<Value>>>,
}

impl ArrayRef {
    /// Create an array of `component` holding `elements`
    pub fn new(component: TypeDescriptor, elements: Vec<Value>) -> Self {
        Self {
            component,
            elements: Arc::new(RwLock::new(elements)),
        }
    }

    /// Component type of the array
    pub fn component(&self) -> &TypeDescriptor {
        &self.component
    }

    /// Read guard over the elements
    pub fn read(&self) -> RwLockReadGuard<'_, Vec<Value>> {
        self.elements.read()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    /// True for a zero-length array
    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }

    /// Clone of the element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.elements.read().get(index).cloned()
    }

    /// Replace the element at `index`; returns false when out of bounds
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.elements.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Clone of all elements
    pub fn snapshot(&self) -> Vec<Value> {
        self.elements.read().clone()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Arc::ptr_eq(&self.elements, &other.elements)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.elements) as *const () as usize
    }
}

/// Body of a function value
pub type FunctionBody = Arc<dyn Fn(Vec<Value>) -> Result<Value, AccessError> + Send + Sync>;

/// A named function that can be registered as a variable and invoked as `#name(...)`
#[derive(Clone)]
pub struct FunctionRef {
    name: Arc<str>,
    params: Vec<TypeDescriptor>,
    varargs: bool,
    pub(crate) body: FunctionBody,
}

impl FunctionRef {
    /// Create a function with fixed parameter types
    pub fn new<F>(name: impl Into<Arc<str>>, params: Vec<TypeDescriptor>, body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, AccessError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            varargs: false,
            body: Arc::new(body),
        }
    }

    /// Mark the last parameter as a variable-arity array parameter
    pub fn with_varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types
    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    /// Whether the last parameter collects trailing arguments
    pub fn is_varargs(&self) -> bool {
        self.varargs
    }

    /// Invoke the body with already converted arguments
    pub fn call(&self, args: Vec<Value>) -> Result<Value, AccessError> {
        (self.body)(args)
    }
}

/// Embedder-defined object tagged with its registered class name
#[derive(Clone)]
pub struct ObjectRef {
    class: Arc<str>,
    inner: Arc<dyn Any + Send + Sync>,
}

impl ObjectRef {
    /// Wrap `value` under class name `class`
    pub fn new<T: Any + Send + Sync>(class: impl Into<Arc<str>>, value: T) -> Self {
        Self {
            class: class.into(),
            inner: Arc::new(value),
        }
    }

    /// Registered class name
    pub fn class_name(&self) -> &str {
        &self.class
    }

    pub(crate) fn class_name_arc(&self) -> Arc<str> {
        self.class.clone()
    }

    /// Borrow the wrapped value as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.class, self.addr())
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Map key with hashing by value for scalars and by identity for references
#[derive(Clone)]
pub struct MapKey(Value);

impl MapKey {
    /// Wrap a value as a key
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// The wrapped value
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Unwrap the key
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (a, b) => a == b,
        }
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(&self.0).hash(state);
        match &self.0 {
            Value::Null => {}
            Value::Boolean(b) => b.hash(state),
            Value::Char(c) => c.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Long(l) => l.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Double(d) => d.to_bits().hash(state),
            Value::BigInteger(b) => b.hash(state),
            Value::Decimal(d) => d.normalize().hash(state),
            Value::String(s) => s.hash(state),
            Value::Type(ty) => ty.hash(state),
            Value::List(list) => list.addr().hash(state),
            Value::Map(map) => map.addr().hash(state),
            Value::Array(array) => array.addr().hash(state),
            Value::Function(func) => (Arc::as_ptr(&func.body) as *const () as usize).hash(state),
            Value::Object(object) => object.addr().hash(state),
        }
    }
}

impl fmt::Debug for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_handles_share_storage() {
        let list = Value::list(vec![Value::from(1), Value::from(2)]);
        let alias = list.clone();
        if let Value::List(items) = &alias {
            items.write().push(Value::from(3));
        }
        assert_eq!(list.to_string(), "[1, 2, 3]");
    }

    #[test]
    fn test_map_keys_by_value_and_identity() {
        let map = MapRef::new();
        map.insert(Value::from("a"), Value::from(1));
        map.insert(Value::from(1.5), Value::from(2));
        assert_eq!(map.get(&Value::from("a")), Some(Value::from(1)));
        assert_eq!(map.get(&Value::from(1.5)), Some(Value::from(2)));

        let key = Value::list(vec![]);
        map.insert(key.clone(), Value::from(true));
        assert_eq!(map.get(&key), Some(Value::Boolean(true)));
        assert_eq!(map.get(&Value::list(vec![])), None);
    }

    #[test]
    fn test_display_forms() {
        assert_eq!(Value::Double(3.0).to_string(), "3.0");
        assert_eq!(Value::Null.to_string(), "null");
        let map = Value::map(vec![(Value::from("k"), Value::from("v"))]);
        assert_eq!(map.to_string(), "{k=v}");
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::json!({"name": "x", "tags": [1, 2], "big": 5000000000i64});
        let value = Value::from_json(&json);
        let Value::Map(map) = &value else {
            panic!("expected map");
        };
        assert_eq!(map.get(&Value::from("name")), Some(Value::from("x")));
        assert_eq!(map.get(&Value::from("big")), Some(Value::Long(5_000_000_000)));
        assert_eq!(value.to_json(), json);
    }
}
