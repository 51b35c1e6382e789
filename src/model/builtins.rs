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

//! Built-in classes registered by [`TypeRegistry::with_builtins`]

use super::descriptor::{
    ClassDescriptor, ConstructorDescriptor, MethodDescriptor, OBJECT_CLASS, PropertyDescriptor,
};
use super::registry::{ARRAY_CLASS, TypeRegistry};
use crate::core::{AccessError, ArrayRef, MapKey, TypeDescriptor as Ty, Value};
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use regex::Regex;
use rust_decimal::Decimal;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Class of the key/value pairs visited by map selection and projection
pub const MAP_ENTRY_CLASS: &str = "MapEntry";

/// One key/value pair of a map
#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    key: Value,
    value: Value,
}

impl MapEntry {
    /// Pair `key` with `value`
    pub fn new(key: Value, value: Value) -> Self {
        Self { key, value }
    }

    /// Entry key
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Entry value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Wrap the entry as an object value
    pub fn into_value(self) -> Value {
        Value::object(MAP_ENTRY_CLASS, self)
    }
}

fn failed(message: impl Into<String>) -> AccessError {
    AccessError::failed(message)
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn str_arg(args: &[Value], index: usize) -> Result<String, AccessError> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.to_string()),
        Some(other) => Err(failed(format!("expected String argument, got {}", other.type_name()))),
        None => Err(failed("missing String argument")),
    }
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, AccessError> {
    match args.get(index) {
        Some(Value::Integer(i)) => Ok(*i),
        Some(other) => Err(failed(format!("expected Integer argument, got {}", other.type_name()))),
        None => Err(failed("missing Integer argument")),
    }
}

fn long_arg(args: &[Value], index: usize) -> Result<i64, AccessError> {
    match args.get(index) {
        Some(Value::Long(l)) => Ok(*l),
        Some(other) => other
            .as_i64()
            .ok_or_else(|| failed(format!("expected Long argument, got {}", other.type_name()))),
        None => Err(failed("missing Long argument")),
    }
}

fn double_arg(args: &[Value], index: usize) -> Result<f64, AccessError> {
    match args.get(index) {
        Some(value) => value
            .as_f64()
            .ok_or_else(|| failed(format!("expected Double argument, got {}", value.type_name()))),
        None => Err(failed("missing Double argument")),
    }
}

fn char_arg(args: &[Value], index: usize) -> Result<char, AccessError> {
    match args.get(index) {
        Some(Value::Char(c)) => Ok(*c),
        Some(other) => Err(failed(format!("expected Character argument, got {}", other.type_name()))),
        None => Err(failed("missing Character argument")),
    }
}

fn decimal_arg(args: &[Value], index: usize) -> Result<Decimal, AccessError> {
    match args.get(index) {
        Some(Value::Decimal(d)) => Ok(*d),
        Some(other) => Err(failed(format!("expected BigDecimal argument, got {}", other.type_name()))),
        None => Err(failed("missing BigDecimal argument")),
    }
}

fn bigint_arg(args: &[Value], index: usize) -> Result<BigInt, AccessError> {
    match args.get(index) {
        Some(Value::BigInteger(b)) => Ok(b.clone()),
        Some(other) => Err(failed(format!("expected BigInteger argument, got {}", other.type_name()))),
        None => Err(failed("missing BigInteger argument")),
    }
}

fn this_str(target: &Value) -> Result<&str, AccessError> {
    target
        .as_str()
        .ok_or_else(|| failed(format!("expected String target, got {}", target.type_name())))
}

fn this_decimal(target: &Value) -> Result<Decimal, AccessError> {
    match target {
        Value::Decimal(d) => Ok(*d),
        other => Err(failed(format!("expected BigDecimal target, got {}", other.type_name()))),
    }
}

fn this_bigint(target: &Value) -> Result<&BigInt, AccessError> {
    match target {
        Value::BigInteger(b) => Ok(b),
        other => Err(failed(format!("expected BigInteger target, got {}", other.type_name()))),
    }
}

fn this_type(target: &Value) -> Result<&Ty, AccessError> {
    match target {
        Value::Type(ty) => Ok(ty),
        other => Err(failed(format!("expected Class target, got {}", other.type_name()))),
    }
}

/// Character-indexed substring with bounds checks
fn char_slice(s: &str, begin: i32, end: Option<i32>) -> Result<String, AccessError> {
    let len = s.chars().count() as i64;
    let begin = i64::from(begin);
    let end = end.map_or(len, i64::from);
    if begin < 0 || end > len || begin > end {
        return Err(failed(format!("begin {begin}, end {end}, length {len}")));
    }
    Ok(s.chars()
        .skip(begin as usize)
        .take((end - begin) as usize)
        .collect())
}

fn char_index_of(haystack: &str, byte_index: Option<usize>) -> Value {
    Value::Integer(byte_index.map_or(-1, |b| haystack[..b].chars().count() as i32))
}

fn parse_number<T: FromStr>(text: &str, kind: &str) -> Result<T, AccessError> {
    text.trim()
        .parse::<T>()
        .map_err(|_| failed(format!("For input string: \"{text}\" ({kind})")))
}

fn hash_code(value: &Value) -> i32 {
    let mut hasher = FxHasher::default();
    MapKey::new(value.clone()).hash(&mut hasher);
    hasher.finish() as i32
}

fn object_class() -> ClassDescriptor {
    ClassDescriptor::new(OBJECT_CLASS)
        .with_constructor(ConstructorDescriptor::new(vec![], |_| {
            Ok(Value::object(OBJECT_CLASS, ()))
        }))
        .with_method(MethodDescriptor::new("getClass", vec![], Ty::Class, |this, _| {
            Ok(this.type_descriptor().map_or(Value::Null, Value::Type))
        }))
        .with_method(MethodDescriptor::new("toString", vec![], Ty::String, |this, _| {
            Ok(Value::string(this.to_display_string()))
        }))
        .with_method(MethodDescriptor::new("hashCode", vec![], Ty::Integer, |this, _| {
            Ok(Value::Integer(hash_code(this)))
        }))
        .with_method(MethodDescriptor::new(
            "equals",
            vec![Ty::Object],
            Ty::Boolean,
            |this, args| Ok(Value::Boolean(*this == arg(&args, 0))),
        ))
}

fn number_class() -> ClassDescriptor {
    ClassDescriptor::new("Number")
        .with_method(MethodDescriptor::new("intValue", vec![], Ty::Integer, |this, _| {
            Ok(match this {
                Value::Float(f) => Value::Integer(*f as i32),
                Value::Double(d) => Value::Integer(*d as i32),
                other => Value::Integer(other.as_i64().unwrap_or_default() as i32),
            })
        }))
        .with_method(MethodDescriptor::new("longValue", vec![], Ty::Long, |this, _| {
            Ok(match this {
                Value::Float(f) => Value::Long(*f as i64),
                Value::Double(d) => Value::Long(*d as i64),
                other => Value::Long(other.as_i64().unwrap_or_default()),
            })
        }))
        .with_method(MethodDescriptor::new("floatValue", vec![], Ty::Float, |this, _| {
            Ok(Value::Float(this.as_f64().unwrap_or_default() as f32))
        }))
        .with_method(MethodDescriptor::new("doubleValue", vec![], Ty::Double, |this, _| {
            Ok(Value::Double(this.as_f64().unwrap_or_default()))
        }))
}

fn compare_to(ty: Ty) -> MethodDescriptor {
    MethodDescriptor::new("compareTo", vec![ty], Ty::Integer, |this, args| {
        let other = arg(&args, 0);
        let ordering = match (this, &other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::BigInteger(a), Value::BigInteger(b)) => a.cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Char(a), Value::Char(b)) => a.cmp(b),
            (a, b) => {
                return Err(failed(format!(
                    "cannot compare {} with {}",
                    a.type_name(),
                    b.type_name()
                )));
            }
        };
        Ok(Value::Integer(ordering as i32))
    })
}

fn integer_class() -> ClassDescriptor {
    ClassDescriptor::new("Integer")
        .with_superclass("Number")
        .with_interface("Comparable")
        .with_property(PropertyDescriptor::constant("MAX_VALUE", Ty::Integer, Value::Integer(i32::MAX)))
        .with_property(PropertyDescriptor::constant("MIN_VALUE", Ty::Integer, Value::Integer(i32::MIN)))
        .with_method(MethodDescriptor::new_static("parseInt", vec![Ty::String], Ty::Integer, |args| {
            Ok(Value::Integer(parse_number(&str_arg(&args, 0)?, "Integer")?))
        }))
        .with_method(MethodDescriptor::new_static("valueOf", vec![Ty::Integer], Ty::Integer, |args| {
            Ok(Value::Integer(int_arg(&args, 0)?))
        }))
        .with_method(MethodDescriptor::new_static("valueOf", vec![Ty::String], Ty::Integer, |args| {
            Ok(Value::Integer(parse_number(&str_arg(&args, 0)?, "Integer")?))
        }))
        .with_method(MethodDescriptor::new_static("toHexString", vec![Ty::Integer], Ty::String, |args| {
            Ok(Value::string(format!("{:x}", int_arg(&args, 0)?)))
        }))
        .with_method(MethodDescriptor::new("toString", vec![], Ty::String, |this, _| {
            Ok(Value::string(this.to_display_string()))
        }))
        .with_method(compare_to(Ty::Integer))
}

fn long_class() -> ClassDescriptor {
    ClassDescriptor::new("Long")
        .with_superclass("Number")
        .with_interface("Comparable")
        .with_property(PropertyDescriptor::constant("MAX_VALUE", Ty::Long, Value::Long(i64::MAX)))
        .with_property(PropertyDescriptor::constant("MIN_VALUE", Ty::Long, Value::Long(i64::MIN)))
        .with_method(MethodDescriptor::new_static("parseLong", vec![Ty::String], Ty::Long, |args| {
            Ok(Value::Long(parse_number(&str_arg(&args, 0)?, "Long")?))
        }))
        .with_method(MethodDescriptor::new_static("valueOf", vec![Ty::Long], Ty::Long, |args| {
            Ok(Value::Long(long_arg(&args, 0)?))
        }))
        .with_method(compare_to(Ty::Long))
}

fn float_class() -> ClassDescriptor {
    ClassDescriptor::new("Float")
        .with_superclass("Number")
        .with_interface("Comparable")
        .with_property(PropertyDescriptor::constant("MAX_VALUE", Ty::Float, Value::Float(f32::MAX)))
        .with_method(MethodDescriptor::new_static("parseFloat", vec![Ty::String], Ty::Float, |args| {
            Ok(Value::Float(parse_number(&str_arg(&args, 0)?, "Float")?))
        }))
        .with_method(compare_to(Ty::Float))
}

fn double_class() -> ClassDescriptor {
    ClassDescriptor::new("Double")
        .with_superclass("Number")
        .with_interface("Comparable")
        .with_property(PropertyDescriptor::constant("MAX_VALUE", Ty::Double, Value::Double(f64::MAX)))
        .with_property(PropertyDescriptor::constant("MIN_VALUE", Ty::Double, Value::Double(f64::from_bits(1))))
        .with_property(PropertyDescriptor::constant("NaN", Ty::Double, Value::Double(f64::NAN)))
        .with_property(PropertyDescriptor::constant(
            "POSITIVE_INFINITY",
            Ty::Double,
            Value::Double(f64::INFINITY),
        ))
        .with_property(PropertyDescriptor::constant(
            "NEGATIVE_INFINITY",
            Ty::Double,
            Value::Double(f64::NEG_INFINITY),
        ))
        .with_method(MethodDescriptor::new_static("parseDouble", vec![Ty::String], Ty::Double, |args| {
            Ok(Value::Double(parse_number(&str_arg(&args, 0)?, "Double")?))
        }))
        .with_method(MethodDescriptor::new_static("valueOf", vec![Ty::Double], Ty::Double, |args| {
            Ok(Value::Double(double_arg(&args, 0)?))
        }))
        .with_method(MethodDescriptor::new("isNaN", vec![], Ty::Boolean, |this, _| {
            Ok(Value::Boolean(this.as_f64().is_some_and(f64::is_nan)))
        }))
        .with_method(compare_to(Ty::Double))
}

fn boolean_class() -> ClassDescriptor {
    ClassDescriptor::new("Boolean")
        .with_interface("Comparable")
        .with_property(PropertyDescriptor::constant("TRUE", Ty::Boolean, Value::Boolean(true)))
        .with_property(PropertyDescriptor::constant("FALSE", Ty::Boolean, Value::Boolean(false)))
        .with_method(MethodDescriptor::new_static("parseBoolean", vec![Ty::String], Ty::Boolean, |args| {
            Ok(Value::Boolean(str_arg(&args, 0)?.eq_ignore_ascii_case("true")))
        }))
        .with_method(MethodDescriptor::new("booleanValue", vec![], Ty::Boolean, |this, _| {
            Ok(this.clone())
        }))
        .with_method(compare_to(Ty::Boolean))
}

fn character_class() -> ClassDescriptor {
    ClassDescriptor::new("Character")
        .with_interface("Comparable")
        .with_method(MethodDescriptor::new_static("isDigit", vec![Ty::Char], Ty::Boolean, |args| {
            Ok(Value::Boolean(char_arg(&args, 0)?.is_numeric()))
        }))
        .with_method(MethodDescriptor::new_static("isLetter", vec![Ty::Char], Ty::Boolean, |args| {
            Ok(Value::Boolean(char_arg(&args, 0)?.is_alphabetic()))
        }))
        .with_method(MethodDescriptor::new_static("isUpperCase", vec![Ty::Char], Ty::Boolean, |args| {
            Ok(Value::Boolean(char_arg(&args, 0)?.is_uppercase()))
        }))
        .with_method(MethodDescriptor::new_static("toUpperCase", vec![Ty::Char], Ty::Char, |args| {
            let c = char_arg(&args, 0)?;
            Ok(Value::Char(c.to_uppercase().next().unwrap_or(c)))
        }))
        .with_method(MethodDescriptor::new("charValue", vec![], Ty::Char, |this, _| Ok(this.clone())))
        .with_method(compare_to(Ty::Char))
}

fn big_integer_class() -> ClassDescriptor {
    let binary = |name: &'static str, op: fn(&BigInt, &BigInt) -> BigInt| {
        MethodDescriptor::new(name, vec![Ty::BigInteger], Ty::BigInteger, move |this, args| {
            Ok(Value::BigInteger(op(this_bigint(this)?, &bigint_arg(&args, 0)?)))
        })
    };
    ClassDescriptor::new("BigInteger")
        .with_superclass("Number")
        .with_interface("Comparable")
        .with_property(PropertyDescriptor::constant("ZERO", Ty::BigInteger, Value::BigInteger(BigInt::zero())))
        .with_property(PropertyDescriptor::constant("ONE", Ty::BigInteger, Value::BigInteger(BigInt::from(1))))
        .with_property(PropertyDescriptor::constant("TEN", Ty::BigInteger, Value::BigInteger(BigInt::from(10))))
        .with_constructor(ConstructorDescriptor::new(vec![Ty::String], |args| {
            Ok(Value::BigInteger(parse_number(&str_arg(&args, 0)?, "BigInteger")?))
        }))
        .with_method(MethodDescriptor::new_static("valueOf", vec![Ty::Long], Ty::BigInteger, |args| {
            Ok(Value::BigInteger(BigInt::from(long_arg(&args, 0)?)))
        }))
        .with_method(binary("add", |a, b| a + b))
        .with_method(binary("subtract", |a, b| a - b))
        .with_method(binary("multiply", |a, b| a * b))
        .with_method(MethodDescriptor::new("pow", vec![Ty::Integer], Ty::BigInteger, |this, args| {
            let exponent = u32::try_from(int_arg(&args, 0)?).map_err(|_| failed("Negative exponent"))?;
            Ok(Value::BigInteger(this_bigint(this)?.pow(exponent)))
        }))
        .with_method(MethodDescriptor::new("negate", vec![], Ty::BigInteger, |this, _| {
            Ok(Value::BigInteger(-this_bigint(this)?.clone()))
        }))
        .with_method(MethodDescriptor::new("signum", vec![], Ty::Integer, |this, _| {
            Ok(Value::Integer(this_bigint(this)?.signum().to_i32().unwrap_or_default()))
        }))
        .with_method(compare_to(Ty::BigInteger))
}

fn big_decimal_class() -> ClassDescriptor {
    let binary = |name: &'static str, op: fn(Decimal, Decimal) -> Option<Decimal>| {
        MethodDescriptor::new(name, vec![Ty::Decimal], Ty::Decimal, move |this, args| {
            op(this_decimal(this)?, decimal_arg(&args, 0)?)
                .map(Value::Decimal)
                .ok_or_else(|| failed(format!("BigDecimal {name} overflow or division by zero")))
        })
    };
    ClassDescriptor::new("BigDecimal")
        .with_superclass("Number")
        .with_interface("Comparable")
        .with_property(PropertyDescriptor::constant("ZERO", Ty::Decimal, Value::Decimal(Decimal::ZERO)))
        .with_property(PropertyDescriptor::constant("ONE", Ty::Decimal, Value::Decimal(Decimal::ONE)))
        .with_property(PropertyDescriptor::constant("TEN", Ty::Decimal, Value::Decimal(Decimal::TEN)))
        .with_constructor(ConstructorDescriptor::new(vec![Ty::String], |args| {
            Ok(Value::Decimal(parse_number(&str_arg(&args, 0)?, "BigDecimal")?))
        }))
        .with_constructor(ConstructorDescriptor::new(vec![Ty::Integer], |args| {
            Ok(Value::Decimal(Decimal::from(int_arg(&args, 0)?)))
        }))
        .with_constructor(ConstructorDescriptor::new(vec![Ty::Long], |args| {
            Ok(Value::Decimal(Decimal::from(long_arg(&args, 0)?)))
        }))
        .with_constructor(ConstructorDescriptor::new(vec![Ty::Double], |args| {
            let d = double_arg(&args, 0)?;
            Decimal::from_str(&d.to_string())
                .or_else(|_| Decimal::from_scientific(&format!("{d:e}")))
                .map(Value::Decimal)
                .map_err(|e| failed(e.to_string()))
        }))
        .with_method(MethodDescriptor::new_static("valueOf", vec![Ty::Long], Ty::Decimal, |args| {
            Ok(Value::Decimal(Decimal::from(long_arg(&args, 0)?)))
        }))
        .with_method(binary("add", |a, b| a.checked_add(b)))
        .with_method(binary("subtract", |a, b| a.checked_sub(b)))
        .with_method(binary("multiply", |a, b| a.checked_mul(b)))
        .with_method(binary("divide", |a, b| a.checked_div(b)))
        .with_method(MethodDescriptor::new("scale", vec![], Ty::Integer, |this, _| {
            Ok(Value::Integer(this_decimal(this)?.scale() as i32))
        }))
        .with_method(MethodDescriptor::new("setScale", vec![Ty::Integer], Ty::Decimal, |this, args| {
            let scale = u32::try_from(int_arg(&args, 0)?).map_err(|_| failed("Negative scale"))?;
            let value = this_decimal(this)?;
            let mut rescaled = value;
            rescaled.rescale(scale);
            if rescaled != value {
                return Err(failed("Rounding necessary"));
            }
            Ok(Value::Decimal(rescaled))
        }))
        .with_method(MethodDescriptor::new("negate", vec![], Ty::Decimal, |this, _| {
            Ok(Value::Decimal(-this_decimal(this)?))
        }))
        .with_method(MethodDescriptor::new("signum", vec![], Ty::Integer, |this, _| {
            let d = this_decimal(this)?;
            Ok(Value::Integer(if d.is_zero() { 0 } else if d.is_sign_negative() { -1 } else { 1 }))
        }))
        .with_method(MethodDescriptor::new("toPlainString", vec![], Ty::String, |this, _| {
            Ok(Value::string(this_decimal(this)?.to_string()))
        }))
        .with_method(compare_to(Ty::Decimal))
}

fn string_class() -> ClassDescriptor {
    let unary = |name: &'static str, ret: Ty, op: fn(&str) -> Value| {
        MethodDescriptor::new(name, vec![], ret, move |this, _| Ok(op(this_str(this)?)))
    };
    let with_str = |name: &'static str, ret: Ty, op: fn(&str, &str) -> Value| {
        MethodDescriptor::new(name, vec![Ty::String], ret, move |this, args| {
            Ok(op(this_str(this)?, &str_arg(&args, 0)?))
        })
    };
    ClassDescriptor::new("String")
        .with_interface("Comparable")
        .with_interface("CharSequence")
        .with_constructor(ConstructorDescriptor::new(vec![], |_| Ok(Value::string(""))))
        .with_constructor(ConstructorDescriptor::new(vec![Ty::String], |args| {
            Ok(Value::string(str_arg(&args, 0)?))
        }))
        .with_method(MethodDescriptor::new_static("valueOf", vec![Ty::Object], Ty::String, |args| {
            Ok(Value::string(arg(&args, 0).to_display_string()))
        }))
        .with_method(unary("length", Ty::Integer, |s| Value::Integer(s.chars().count() as i32)))
        .with_method(unary("isEmpty", Ty::Boolean, |s| Value::Boolean(s.is_empty())))
        .with_method(unary("toUpperCase", Ty::String, |s| Value::string(s.to_uppercase())))
        .with_method(unary("toLowerCase", Ty::String, |s| Value::string(s.to_lowercase())))
        .with_method(unary("trim", Ty::String, |s| Value::string(s.trim())))
        .with_method(unary("toString", Ty::String, |s| Value::string(s)))
        .with_method(MethodDescriptor::new("charAt", vec![Ty::Integer], Ty::Char, |this, args| {
            let s = this_str(this)?;
            let index = int_arg(&args, 0)?;
            usize::try_from(index)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(Value::Char)
                .ok_or_else(|| failed(format!("String index out of range: {index}")))
        }))
        .with_method(MethodDescriptor::new("substring", vec![Ty::Integer], Ty::String, |this, args| {
            Ok(Value::string(char_slice(this_str(this)?, int_arg(&args, 0)?, None)?))
        }))
        .with_method(MethodDescriptor::new(
            "substring",
            vec![Ty::Integer, Ty::Integer],
            Ty::String,
            |this, args| {
                let end = int_arg(&args, 1)?;
                Ok(Value::string(char_slice(this_str(this)?, int_arg(&args, 0)?, Some(end))?))
            },
        ))
        .with_method(with_str("contains", Ty::Boolean, |s, p| Value::Boolean(s.contains(p))))
        .with_method(with_str("startsWith", Ty::Boolean, |s, p| Value::Boolean(s.starts_with(p))))
        .with_method(with_str("endsWith", Ty::Boolean, |s, p| Value::Boolean(s.ends_with(p))))
        .with_method(with_str("indexOf", Ty::Integer, |s, p| char_index_of(s, s.find(p))))
        .with_method(with_str("lastIndexOf", Ty::Integer, |s, p| char_index_of(s, s.rfind(p))))
        .with_method(with_str("concat", Ty::String, |s, p| Value::string(format!("{s}{p}"))))
        .with_method(with_str("equalsIgnoreCase", Ty::Boolean, |s, p| {
            Value::Boolean(s.to_lowercase() == p.to_lowercase())
        }))
        .with_method(with_str("compareTo", Ty::Integer, |s, p| Value::Integer(s.cmp(p) as i32)))
        .with_method(MethodDescriptor::new(
            "replace",
            vec![Ty::String, Ty::String],
            Ty::String,
            |this, args| {
                let from = str_arg(&args, 0)?;
                let to = str_arg(&args, 1)?;
                Ok(Value::string(this_str(this)?.replace(&from, &to)))
            },
        ))
        .with_method(MethodDescriptor::new("repeat", vec![Ty::Integer], Ty::String, |this, args| {
            let count = usize::try_from(int_arg(&args, 0)?).map_err(|_| failed("count is negative"))?;
            Ok(Value::string(this_str(this)?.repeat(count)))
        }))
        .with_method(MethodDescriptor::new("matches", vec![Ty::String], Ty::Boolean, |this, args| {
            let pattern = str_arg(&args, 0)?;
            let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| failed(e.to_string()))?;
            Ok(Value::Boolean(regex.is_match(this_str(this)?)))
        }))
        .with_method(MethodDescriptor::new("split", vec![Ty::String], Ty::array_of(Ty::String), |this, args| {
            let regex = Regex::new(&str_arg(&args, 0)?).map_err(|e| failed(e.to_string()))?;
            let mut pieces: Vec<Value> = regex.split(this_str(this)?).map(Value::string).collect();
            // Trailing empty strings are dropped
            while pieces.last().is_some_and(|p| p.as_str() == Some("")) {
                pieces.pop();
            }
            Ok(Value::Array(ArrayRef::new(Ty::String, pieces)))
        }))
}

fn list_target(target: &Value) -> Result<&crate::core::ListRef, AccessError> {
    match target {
        Value::List(list) => Ok(list),
        other => Err(failed(format!("expected List target, got {}", other.type_name()))),
    }
}

fn list_index(list: &crate::core::ListRef, index: i32) -> Result<usize, AccessError> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < list.len())
        .ok_or_else(|| failed(format!("Index {index} out of bounds for length {}", list.len())))
}

fn list_class() -> ClassDescriptor {
    ClassDescriptor::new("List")
        .with_interface("Iterable")
        .with_constructor(ConstructorDescriptor::new(vec![], |_| Ok(Value::list(Vec::new()))))
        .with_constructor(ConstructorDescriptor::new(vec![Ty::List], |args| {
            Ok(match arg(&args, 0) {
                Value::List(source) => Value::list(source.snapshot()),
                _ => Value::list(Vec::new()),
            })
        }))
        .with_method(MethodDescriptor::new("size", vec![], Ty::Integer, |this, _| {
            Ok(Value::Integer(list_target(this)?.len() as i32))
        }))
        .with_method(MethodDescriptor::new("isEmpty", vec![], Ty::Boolean, |this, _| {
            Ok(Value::Boolean(list_target(this)?.is_empty()))
        }))
        .with_method(MethodDescriptor::new("get", vec![Ty::Integer], Ty::Object, |this, args| {
            let list = list_target(this)?;
            let index = list_index(list, int_arg(&args, 0)?)?;
            Ok(list.get(index).unwrap_or_default())
        }))
        .with_method(MethodDescriptor::new(
            "set",
            vec![Ty::Integer, Ty::Object],
            Ty::Object,
            |this, args| {
                let list = list_target(this)?;
                let index = list_index(list, int_arg(&args, 0)?)?;
                let mut items = list.write();
                Ok(std::mem::replace(&mut items[index], arg(&args, 1)))
            },
        ))
        .with_method(MethodDescriptor::new("add", vec![Ty::Object], Ty::Boolean, |this, args| {
            list_target(this)?.write().push(arg(&args, 0));
            Ok(Value::Boolean(true))
        }))
        .with_method(MethodDescriptor::new("addAll", vec![Ty::List], Ty::Boolean, |this, args| {
            let Value::List(other) = arg(&args, 0) else {
                return Ok(Value::Boolean(false));
            };
            let items = other.snapshot();
            let changed = !items.is_empty();
            list_target(this)?.write().extend(items);
            Ok(Value::Boolean(changed))
        }))
        .with_method(MethodDescriptor::new("contains", vec![Ty::Object], Ty::Boolean, |this, args| {
            let needle = arg(&args, 0);
            Ok(Value::Boolean(list_target(this)?.read().contains(&needle)))
        }))
        .with_method(MethodDescriptor::new("indexOf", vec![Ty::Object], Ty::Integer, |this, args| {
            let needle = arg(&args, 0);
            let position = list_target(this)?.read().iter().position(|v| *v == needle);
            Ok(Value::Integer(position.map_or(-1, |p| p as i32)))
        }))
        .with_method(MethodDescriptor::new(
            "subList",
            vec![Ty::Integer, Ty::Integer],
            Ty::List,
            |this, args| {
                let list = list_target(this)?;
                let (from, to) = (int_arg(&args, 0)?, int_arg(&args, 1)?);
                let items = list.read();
                let range = usize::try_from(from)
                    .ok()
                    .zip(usize::try_from(to).ok())
                    .filter(|(f, t)| f <= t && *t <= items.len())
                    .ok_or_else(|| failed(format!("fromIndex {from}, toIndex {to}, size {}", items.len())))?;
                Ok(Value::list(items[range.0..range.1].to_vec()))
            },
        ))
}

fn map_target(target: &Value) -> Result<&crate::core::MapRef, AccessError> {
    match target {
        Value::Map(map) => Ok(map),
        other => Err(failed(format!("expected Map target, got {}", other.type_name()))),
    }
}

fn map_class() -> ClassDescriptor {
    ClassDescriptor::new("Map")
        .with_constructor(ConstructorDescriptor::new(vec![], |_| {
            Ok(Value::Map(crate::core::MapRef::new()))
        }))
        .with_method(MethodDescriptor::new("size", vec![], Ty::Integer, |this, _| {
            Ok(Value::Integer(map_target(this)?.len() as i32))
        }))
        .with_method(MethodDescriptor::new("isEmpty", vec![], Ty::Boolean, |this, _| {
            Ok(Value::Boolean(map_target(this)?.is_empty()))
        }))
        .with_method(MethodDescriptor::new("get", vec![Ty::Object], Ty::Object, |this, args| {
            Ok(map_target(this)?.get(&arg(&args, 0)).unwrap_or_default())
        }))
        .with_method(MethodDescriptor::new(
            "put",
            vec![Ty::Object, Ty::Object],
            Ty::Object,
            |this, args| {
                Ok(map_target(this)?
                    .insert(arg(&args, 0), arg(&args, 1))
                    .unwrap_or_default())
            },
        ))
        .with_method(MethodDescriptor::new("remove", vec![Ty::Object], Ty::Object, |this, args| {
            let key = MapKey::new(arg(&args, 0));
            Ok(map_target(this)?.write().shift_remove(&key).unwrap_or_default())
        }))
        .with_method(MethodDescriptor::new("containsKey", vec![Ty::Object], Ty::Boolean, |this, args| {
            Ok(Value::Boolean(map_target(this)?.get(&arg(&args, 0)).is_some()))
        }))
        .with_method(MethodDescriptor::new("containsValue", vec![Ty::Object], Ty::Boolean, |this, args| {
            let needle = arg(&args, 0);
            Ok(Value::Boolean(map_target(this)?.read().values().any(|v| *v == needle)))
        }))
        .with_method(MethodDescriptor::new("keySet", vec![], Ty::List, |this, _| {
            Ok(Value::list(map_target(this)?.read().keys().map(|k| k.value().clone()).collect()))
        }))
        .with_method(MethodDescriptor::new("values", vec![], Ty::List, |this, _| {
            Ok(Value::list(map_target(this)?.read().values().cloned().collect()))
        }))
        .with_method(MethodDescriptor::new("entrySet", vec![], Ty::List, |this, _| {
            Ok(Value::list(
                map_target(this)?
                    .entries()
                    .into_iter()
                    .map(|(k, v)| MapEntry::new(k, v).into_value())
                    .collect(),
            ))
        }))
}

fn map_entry_class() -> ClassDescriptor {
    fn entry(target: &Value) -> Result<&MapEntry, AccessError> {
        match target {
            Value::Object(object) => object
                .downcast_ref::<MapEntry>()
                .ok_or_else(|| failed(format!("expected MapEntry target, got {}", object.class_name()))),
            other => Err(failed(format!("expected MapEntry target, got {}", other.type_name()))),
        }
    }
    ClassDescriptor::new(MAP_ENTRY_CLASS)
        .with_method(MethodDescriptor::new("getKey", vec![], Ty::Object, |this, _| {
            Ok(entry(this)?.key().clone())
        }))
        .with_method(MethodDescriptor::new("getValue", vec![], Ty::Object, |this, _| {
            Ok(entry(this)?.value().clone())
        }))
}

fn class_class() -> ClassDescriptor {
    ClassDescriptor::new("Class")
        .with_method(MethodDescriptor::new("getName", vec![], Ty::String, |this, _| {
            Ok(Value::string(this_type(this)?.name()))
        }))
        .with_method(MethodDescriptor::new("getSimpleName", vec![], Ty::String, |this, _| {
            Ok(Value::string(this_type(this)?.simple_name()))
        }))
}

fn array_class() -> ClassDescriptor {
    ClassDescriptor::new(ARRAY_CLASS).with_property(PropertyDescriptor::read_only(
        "length",
        Ty::Integer,
        |this| match this {
            Value::Array(array) => Ok(Value::Integer(array.len() as i32)),
            other => Err(failed(format!("expected array target, got {}", other.type_name()))),
        },
    ))
}

fn math_class() -> ClassDescriptor {
    let unary_double = |name: &'static str, op: fn(f64) -> f64| {
        MethodDescriptor::new_static(name, vec![Ty::Double], Ty::Double, move |args| {
            Ok(Value::Double(op(double_arg(&args, 0)?)))
        })
    };
    let pick = |name: &'static str, max: bool| {
        [
            MethodDescriptor::new_static(name, vec![Ty::Double, Ty::Double], Ty::Double, move |args| {
                let (a, b) = (double_arg(&args, 0)?, double_arg(&args, 1)?);
                Ok(Value::Double(if max { a.max(b) } else { a.min(b) }))
            }),
            MethodDescriptor::new_static(name, vec![Ty::Integer, Ty::Integer], Ty::Integer, move |args| {
                let (a, b) = (int_arg(&args, 0)?, int_arg(&args, 1)?);
                Ok(Value::Integer(if max { a.max(b) } else { a.min(b) }))
            }),
            MethodDescriptor::new_static(name, vec![Ty::Long, Ty::Long], Ty::Long, move |args| {
                let (a, b) = (long_arg(&args, 0)?, long_arg(&args, 1)?);
                Ok(Value::Long(if max { a.max(b) } else { a.min(b) }))
            }),
        ]
    };
    let mut class = ClassDescriptor::new("Math")
        .with_property(PropertyDescriptor::constant("PI", Ty::Double, Value::Double(std::f64::consts::PI)))
        .with_property(PropertyDescriptor::constant("E", Ty::Double, Value::Double(std::f64::consts::E)))
        // Double first so a float argument widens instead of truncating
        .with_method(unary_double("abs", f64::abs))
        .with_method(MethodDescriptor::new_static("abs", vec![Ty::Integer], Ty::Integer, |args| {
            Ok(Value::Integer(int_arg(&args, 0)?.wrapping_abs()))
        }))
        .with_method(MethodDescriptor::new_static("abs", vec![Ty::Long], Ty::Long, |args| {
            Ok(Value::Long(long_arg(&args, 0)?.wrapping_abs()))
        }))
        .with_method(MethodDescriptor::new_static("abs", vec![Ty::Decimal], Ty::Decimal, |args| {
            Ok(Value::Decimal(decimal_arg(&args, 0)?.abs()))
        }))
        .with_method(MethodDescriptor::new_static("abs", vec![Ty::BigInteger], Ty::BigInteger, |args| {
            Ok(Value::BigInteger(bigint_arg(&args, 0)?.abs()))
        }))
        .with_method(unary_double("sqrt", f64::sqrt))
        .with_method(unary_double("floor", f64::floor))
        .with_method(unary_double("ceil", f64::ceil))
        .with_method(MethodDescriptor::new_static(
            "pow",
            vec![Ty::Double, Ty::Double],
            Ty::Double,
            |args| Ok(Value::Double(double_arg(&args, 0)?.powf(double_arg(&args, 1)?))),
        ))
        .with_method(MethodDescriptor::new_static("round", vec![Ty::Double], Ty::Long, |args| {
            Ok(Value::Long((double_arg(&args, 0)? + 0.5).floor() as i64))
        }));
    for method in pick("max", true).into_iter().chain(pick("min", false)) {
        class = class.with_method(method);
    }
    class
}

/// Register every built-in class and alias
pub(crate) fn register_builtins(registry: &TypeRegistry) {
    for class in [
        object_class(),
        ClassDescriptor::new("Comparable"),
        ClassDescriptor::new("CharSequence"),
        ClassDescriptor::new("Iterable"),
        number_class(),
        boolean_class(),
        character_class(),
        integer_class(),
        long_class(),
        float_class(),
        double_class(),
        big_integer_class(),
        big_decimal_class(),
        string_class(),
        list_class(),
        map_class(),
        map_entry_class(),
        class_class(),
        array_class(),
        math_class(),
        ClassDescriptor::new("Function"),
    ] {
        registry.register(class);
    }
    registry.register_alias("ArrayList", "List");
    registry.register_alias("Collection", "List");
    registry.register_alias("HashMap", "Map");
    registry.register_alias("LinkedHashMap", "Map");
    registry.register_alias("Decimal", "BigDecimal");
    log::debug!("registered built-in classes");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(registry: &TypeRegistry, class: &str, name: &str, target: Value, args: Vec<Value>) -> Value {
        let method = registry
            .methods_named(class, name)
            .into_iter()
            .find(|m| m.params().len() == args.len())
            .unwrap();
        method.invoke(&target, args).unwrap()
    }

    #[test]
    fn test_string_methods_are_char_indexed() {
        let registry = TypeRegistry::with_builtins();
        let s = Value::string("héllo");
        assert_eq!(call(&registry, "String", "length", s.clone(), vec![]), Value::Integer(5));
        assert_eq!(
            call(&registry, "String", "substring", s.clone(), vec![Value::Integer(1), Value::Integer(3)]),
            Value::string("él")
        );
        assert_eq!(
            call(&registry, "String", "indexOf", s, vec![Value::string("l")]),
            Value::Integer(2)
        );
    }

    #[test]
    fn test_split_drops_trailing_empties() {
        let registry = TypeRegistry::with_builtins();
        let parts = call(&registry, "String", "split", Value::string("a,b,,"), vec![Value::string(",")]);
        let Value::Array(array) = parts else { panic!("expected array") };
        assert_eq!(array.snapshot(), vec![Value::string("a"), Value::string("b")]);
    }

    #[test]
    fn test_list_mutation_is_shared() {
        let registry = TypeRegistry::with_builtins();
        let list = Value::list(vec![Value::Integer(1)]);
        call(&registry, "List", "add", list.clone(), vec![Value::Integer(2)]);
        assert_eq!(call(&registry, "List", "size", list, vec![]), Value::Integer(2));
    }

    #[test]
    fn test_map_entry_accessors() {
        let registry = TypeRegistry::with_builtins();
        let entry = MapEntry::new(Value::string("k"), Value::Integer(7)).into_value();
        assert_eq!(call(&registry, MAP_ENTRY_CLASS, "getValue", entry, vec![]), Value::Integer(7));
    }
}
