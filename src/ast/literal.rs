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

//! Literal value types
//!
//! This module defines the literal values that can appear directly in
//! expressions, together with the numeric parsing rules used by the parser.

use crate::core::{MessageKind, ParseError, TypeDescriptor, TypedValue, Value};
use std::fmt;
use std::sync::Arc;

/// Literal values that can appear directly in expressions
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    /// 32-bit integer literal (e.g., 42, 0x1F)
    Integer(i32),
    /// 64-bit integer literal (e.g., 42L, 0x1FL)
    Long(i64),
    /// 32-bit real literal (e.g., 3.5f)
    Float(f32),
    /// 64-bit real literal (e.g., 3.14, 1e10, 2d)
    Double(f64),
    /// String literal (e.g., 'hello', "world")
    String(Arc<str>),
    /// Boolean literal (true, false)
    Boolean(bool),
    /// The null literal
    Null,
}

impl LiteralValue {
    /// Parse a decimal or hex integer literal
    pub fn parse_int(digits: &str, radix: u32, position: usize) -> Result<Self, ParseError> {
        // Hex literals cover the full 32 bits, as two's complement
        let parsed = if radix == 16 {
            u32::from_str_radix(digits, 16).map(|v| v as i32).ok()
        } else {
            digits.parse::<i32>().ok()
        };
        parsed
            .map(Self::Integer)
            .ok_or_else(|| ParseError::new(MessageKind::NotAnInteger, position, [digits]))
    }

    /// Parse a decimal or hex long literal (suffix already stripped)
    pub fn parse_long(digits: &str, radix: u32, position: usize) -> Result<Self, ParseError> {
        let parsed = if radix == 16 {
            u64::from_str_radix(digits, 16).map(|v| v as i64).ok()
        } else {
            digits.parse::<i64>().ok()
        };
        parsed
            .map(Self::Long)
            .ok_or_else(|| ParseError::new(MessageKind::NotALong, position, [digits]))
    }

    /// Parse a real literal; `float` selects the 32-bit form
    pub fn parse_real(text: &str, float: bool, position: usize) -> Result<Self, ParseError> {
        let error = || ParseError::new(MessageKind::NotAReal, position, [text]);
        if float {
            let value = text.parse::<f32>().map_err(|_| error())?;
            Ok(Self::Float(value))
        } else {
            let value = text.parse::<f64>().map_err(|_| error())?;
            Ok(Self::Double(value))
        }
    }

    /// Negated form, used when a minus sign is folded into a numeric literal
    pub fn negated(&self) -> Option<Self> {
        Some(match self {
            Self::Integer(i) => Self::Integer(i.wrapping_neg()),
            Self::Long(l) => Self::Long(l.wrapping_neg()),
            Self::Float(f) => Self::Float(-f),
            Self::Double(d) => Self::Double(-d),
            _ => return None,
        })
    }

    /// The typed value this literal denotes
    pub fn to_typed_value(&self) -> TypedValue {
        match self {
            Self::Integer(i) => TypedValue::with_type(Value::Integer(*i), TypeDescriptor::Integer),
            Self::Long(l) => TypedValue::with_type(Value::Long(*l), TypeDescriptor::Long),
            Self::Float(f) => TypedValue::with_type(Value::Float(*f), TypeDescriptor::Float),
            Self::Double(d) => TypedValue::with_type(Value::Double(*d), TypeDescriptor::Double),
            Self::String(s) => TypedValue::with_type(Value::String(s.clone()), TypeDescriptor::String),
            Self::Boolean(b) => TypedValue::boolean(*b),
            Self::Null => TypedValue::NULL,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Long(l) => write!(f, "{l}L"),
            Self::Float(x) => write!(f, "{x:?}f"),
            Self::Double(x) => write!(f, "{x:?}"),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Null => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_radix() {
        assert_eq!(LiteralValue::parse_int("1F", 16, 0), Ok(LiteralValue::Integer(31)));
        assert_eq!(
            LiteralValue::parse_int("FFFFFFFF", 16, 0),
            Ok(LiteralValue::Integer(-1))
        );
        let err = LiteralValue::parse_int("99999999999", 10, 3).unwrap_err();
        assert_eq!(err.kind(), MessageKind::NotAnInteger);
        assert_eq!(err.position(), Some(3));
    }

    #[test]
    fn test_display_escapes_quotes() {
        let lit = LiteralValue::String(Arc::from("it's"));
        assert_eq!(lit.to_string(), "'it''s'");
        assert_eq!(LiteralValue::Long(10).to_string(), "10L");
    }
}
