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

//! Type conversion between runtime values
//!
//! Used when writing properties, binding call arguments and coercing
//! operands to boolean. The standard converter knows the built-in kinds and
//! consults the [`TypeRegistry`] for assignability of registered classes.

use super::registry::TypeRegistry;
use crate::core::{ArrayRef, ConversionError, TypeDescriptor, Value};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::Arc;

/// Converts values between type descriptors
pub trait TypeConverter: Send + Sync {
    /// True when values of `source` (`None` for null) can be converted to `target`
    fn can_convert(&self, source: Option<&TypeDescriptor>, target: &TypeDescriptor) -> bool;

    /// Convert `value`, whose type is `source`, to `target`
    fn convert(
        &self,
        value: &Value,
        source: Option<&TypeDescriptor>,
        target: &TypeDescriptor,
    ) -> Result<Value, ConversionError>;

    /// True when a `source` value can be used as a `target` without conversion
    fn is_assignable(&self, target: &TypeDescriptor, source: &TypeDescriptor) -> bool;

    /// Convert using the runtime type of `value` as the source type
    fn convert_value(&self, value: &Value, target: &TypeDescriptor) -> Result<Value, ConversionError> {
        self.convert(value, value.type_descriptor().as_ref(), target)
    }
}

/// Converter for the built-in value kinds
#[derive(Debug, Clone)]
pub struct StandardTypeConverter {
    registry: Arc<TypeRegistry>,
}

impl StandardTypeConverter {
    /// Converter checking assignability against `registry`
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }
}

/// Arbitrary-precision decimal view of a numeric value
pub(crate) fn decimal_of(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(i) => Some(Decimal::from(*i)),
        Value::Long(l) => Some(Decimal::from(*l)),
        Value::BigInteger(b) => Decimal::from_str(&b.to_string()).ok(),
        Value::Decimal(d) => Some(*d),
        Value::Float(_) | Value::Double(_) => {
            let f = value.as_f64()?;
            if !f.is_finite() {
                return None;
            }
            // Go through the shortest round-trip text, not the binary expansion
            let text = value.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        _ => None,
    }
}

/// Integral view of a numeric value, truncating reals
pub(crate) fn bigint_of(value: &Value) -> Option<BigInt> {
    match value {
        Value::Integer(i) => Some(BigInt::from(*i)),
        Value::Long(l) => Some(BigInt::from(*l)),
        Value::BigInteger(b) => Some(b.clone()),
        Value::Float(f) => BigInt::from_f32(f.trunc()),
        Value::Double(d) => BigInt::from_f64(d.trunc()),
        Value::Decimal(d) => BigInt::from_str(&d.trunc().normalize().to_string()).ok(),
        Value::Char(c) => Some(BigInt::from(u32::from(*c))),
        _ => None,
    }
}

fn is_numeric_like(ty: &TypeDescriptor) -> bool {
    ty.is_numeric() || *ty == TypeDescriptor::Number
}

fn parse_boolean(text: &str) -> Option<Option<bool>> {
    match text.trim().to_ascii_lowercase().as_str() {
        "" => Some(None),
        "true" | "on" | "yes" | "1" => Some(Some(true)),
        "false" | "off" | "no" | "0" => Some(Some(false)),
        _ => None,
    }
}

fn parse_number(text: &str, target: &TypeDescriptor) -> Option<Value> {
    let text = text.trim();
    Some(match target {
        TypeDescriptor::Integer => Value::Integer(text.parse().ok()?),
        TypeDescriptor::Long => Value::Long(text.parse().ok()?),
        TypeDescriptor::Float => Value::Float(text.parse().ok()?),
        TypeDescriptor::Double => Value::Double(text.parse().ok()?),
        TypeDescriptor::BigInteger => Value::BigInteger(BigInt::from_str(text).ok()?),
        TypeDescriptor::Decimal => Value::Decimal(
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .ok()?,
        ),
        TypeDescriptor::Number => {
            if let Ok(i) = text.parse::<i32>() {
                Value::Integer(i)
            } else if let Ok(l) = text.parse::<i64>() {
                Value::Long(l)
            } else {
                Value::Double(text.parse().ok()?)
            }
        }
        _ => return None,
    })
}

/// Numeric to numeric conversion with a range check
fn convert_number(value: &Value, target: &TypeDescriptor) -> Option<Value> {
    Some(match target {
        TypeDescriptor::Integer => Value::Integer(bigint_of(value)?.to_i32()?),
        TypeDescriptor::Long => Value::Long(bigint_of(value)?.to_i64()?),
        TypeDescriptor::BigInteger => Value::BigInteger(bigint_of(value)?),
        TypeDescriptor::Float => Value::Float(value.as_f64()? as f32),
        TypeDescriptor::Double => Value::Double(value.as_f64()?),
        TypeDescriptor::Decimal => Value::Decimal(decimal_of(value)?),
        TypeDescriptor::Number => value.clone(),
        _ => return None,
    })
}

fn join(items: &[Value]) -> String {
    items
        .iter()
        .map(Value::to_display_string)
        .collect::<Vec<_>>()
        .join(",")
}

impl StandardTypeConverter {
    fn convert_elements(
        &self,
        items: Vec<Value>,
        component: &TypeDescriptor,
    ) -> Result<Vec<Value>, ConversionError> {
        items
            .iter()
            .map(|item| self.convert_value(item, component))
            .collect()
    }
}

impl TypeConverter for StandardTypeConverter {
    fn can_convert(&self, source: Option<&TypeDescriptor>, target: &TypeDescriptor) -> bool {
        let Some(source) = source else {
            return true;
        };
        if self.is_assignable(target, source) {
            return true;
        }
        match (source, target) {
            (_, TypeDescriptor::String) => true,
            (s, t) if is_numeric_like(s) && is_numeric_like(t) => true,
            (TypeDescriptor::String, t) if is_numeric_like(t) => true,
            (TypeDescriptor::String, TypeDescriptor::Boolean | TypeDescriptor::Char) => true,
            (TypeDescriptor::Char, TypeDescriptor::Integer)
            | (TypeDescriptor::Integer, TypeDescriptor::Char) => true,
            (TypeDescriptor::String | TypeDescriptor::Array(_), TypeDescriptor::List) => true,
            (TypeDescriptor::String | TypeDescriptor::List, TypeDescriptor::Array(_)) => true,
            (TypeDescriptor::Array(s), TypeDescriptor::Array(t)) => self.can_convert(Some(s), t),
            _ => false,
        }
    }

    fn convert(
        &self,
        value: &Value,
        source: Option<&TypeDescriptor>,
        target: &TypeDescriptor,
    ) -> Result<Value, ConversionError> {
        let failed = || ConversionError::failed(&value.to_display_string(), source, target);
        if value.is_null() {
            return Ok(Value::Null);
        }
        if let Some(runtime) = value.type_descriptor() {
            if self.is_assignable(target, &runtime) {
                return Ok(value.clone());
            }
        }
        match (value, target) {
            (Value::List(list), TypeDescriptor::String) => Ok(Value::string(join(&list.read()))),
            (Value::Array(array), TypeDescriptor::String) => Ok(Value::string(join(&array.read()))),
            (other, TypeDescriptor::String) => Ok(Value::string(other.to_display_string())),
            (Value::String(s), TypeDescriptor::Boolean) => match parse_boolean(s) {
                Some(b) => Ok(b.map_or(Value::Null, Value::Boolean)),
                None => Err(failed()),
            },
            (Value::String(s), TypeDescriptor::Char) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(failed()),
                }
            }
            (Value::String(s), t) if is_numeric_like(t) => {
                parse_number(s, t).ok_or_else(failed)
            }
            (Value::Integer(i), TypeDescriptor::Char) => u32::try_from(*i)
                .ok()
                .and_then(char::from_u32)
                .map(Value::Char)
                .ok_or_else(failed),
            (Value::Char(_), TypeDescriptor::Integer) => convert_number(value, target).ok_or_else(failed),
            (v, t) if v.is_number() && is_numeric_like(t) => convert_number(v, t).ok_or_else(failed),
            (Value::String(s), TypeDescriptor::List) => Ok(Value::list(
                s.split(',')
                    .map(str::trim)
                    .filter(|piece| !piece.is_empty())
                    .map(Value::string)
                    .collect(),
            )),
            (Value::String(s), TypeDescriptor::Array(component)) => {
                let pieces = s
                    .split(',')
                    .map(str::trim)
                    .filter(|piece| !piece.is_empty())
                    .map(Value::string)
                    .collect();
                let elements = self.convert_elements(pieces, component)?;
                Ok(Value::Array(ArrayRef::new((**component).clone(), elements)))
            }
            (Value::Array(array), TypeDescriptor::List) => Ok(Value::list(array.snapshot())),
            (Value::List(list), TypeDescriptor::Array(component)) => {
                let elements = self.convert_elements(list.snapshot(), component)?;
                Ok(Value::Array(ArrayRef::new((**component).clone(), elements)))
            }
            (Value::Array(array), TypeDescriptor::Array(component)) => {
                let elements = self.convert_elements(array.snapshot(), component)?;
                Ok(Value::Array(ArrayRef::new((**component).clone(), elements)))
            }
            _ => Err(ConversionError::no_path(source, target)),
        }
    }

    fn is_assignable(&self, target: &TypeDescriptor, source: &TypeDescriptor) -> bool {
        self.registry.is_assignable(target, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MessageKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn converter() -> StandardTypeConverter {
        StandardTypeConverter::new(Arc::new(TypeRegistry::with_builtins()))
    }

    #[rstest]
    #[case(Value::string(" 42 "), TypeDescriptor::Integer, Value::Integer(42))]
    #[case(Value::Long(7), TypeDescriptor::Integer, Value::Integer(7))]
    #[case(Value::Double(3.9), TypeDescriptor::Integer, Value::Integer(3))]
    #[case(Value::Integer(3), TypeDescriptor::Double, Value::Double(3.0))]
    #[case(Value::string("yes"), TypeDescriptor::Boolean, Value::Boolean(true))]
    #[case(Value::string(""), TypeDescriptor::Boolean, Value::Null)]
    #[case(Value::string("x"), TypeDescriptor::Char, Value::Char('x'))]
    #[case(Value::Char('A'), TypeDescriptor::Integer, Value::Integer(65))]
    #[case(Value::Integer(66), TypeDescriptor::Char, Value::Char('B'))]
    #[case(Value::Double(1.5), TypeDescriptor::String, Value::string("1.5"))]
    #[case(Value::Null, TypeDescriptor::Integer, Value::Null)]
    fn test_conversions(#[case] value: Value, #[case] target: TypeDescriptor, #[case] expected: Value) {
        assert_eq!(converter().convert_value(&value, &target).unwrap(), expected);
    }

    #[test]
    fn test_out_of_range_fails() {
        let err = converter()
            .convert_value(&Value::Long(i64::MAX), &TypeDescriptor::Integer)
            .unwrap_err();
        assert_eq!(err.kind(), MessageKind::ConversionFailed);
    }

    #[test]
    fn test_no_path() {
        let target = TypeDescriptor::named("Person");
        let conv = converter();
        assert!(!conv.can_convert(Some(&TypeDescriptor::Integer), &target));
        let err = conv.convert_value(&Value::Integer(1), &target).unwrap_err();
        assert_eq!(err.kind(), MessageKind::TypeConversionError);
        assert_eq!(err.target_type(), &target);
    }

    #[test]
    fn test_string_splits_into_typed_array() {
        let converted = converter()
            .convert_value(
                &Value::string("1, 2,3"),
                &TypeDescriptor::array_of(TypeDescriptor::Integer),
            )
            .unwrap();
        let Value::Array(array) = converted else { panic!("expected array") };
        assert_eq!(array.component(), &TypeDescriptor::Integer);
        assert_eq!(
            array.snapshot(),
            vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]
        );
    }

    #[test]
    fn test_decimal_from_double_uses_shortest_text() {
        assert_eq!(decimal_of(&Value::Double(0.1)), Some(Decimal::from_str("0.1").unwrap()));
    }
}
