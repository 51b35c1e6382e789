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

//! Numeric promotion ladder and arithmetic
//!
//! Mixed operands are promoted to the wider kind of the two, ordered
//! Integer < Long < Float < Double < BigInteger < BigDecimal. A BigInteger
//! meeting a Float or Double widens to BigDecimal so no fraction is lost.

use crate::ast::BinaryOperator;
use crate::core::{EvalError, EvalResult, MessageKind, Value};
use crate::model::converter::{bigint_of, decimal_of};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;

/// Rungs of the promotion ladder, narrowest first.
///
/// One pairing departs from picking the wider rung: BigInteger with Float
/// or Double computes in BigDecimal rather than BigInteger, since
/// truncating the real operand to an integer would drop its fraction.
/// A NaN or infinite real in that pairing raises `NumericOverflow`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum NumericKind {
    Int,
    Long,
    Float,
    Double,
    BigInteger,
    Decimal,
}

impl NumericKind {
    pub(crate) fn of(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Integer(_) => Self::Int,
            Value::Long(_) => Self::Long,
            Value::Float(_) => Self::Float,
            Value::Double(_) => Self::Double,
            Value::BigInteger(_) => Self::BigInteger,
            Value::Decimal(_) => Self::Decimal,
            _ => return None,
        })
    }

    /// Kind both operands widen to; see the type docs for the BigInteger case
    fn promote(a: Self, b: Self) -> Self {
        let wider = a.max(b);
        let real = |k: Self| matches!(k, Self::Float | Self::Double);
        if wider == Self::BigInteger && (real(a) || real(b)) {
            Self::Decimal
        } else {
            wider
        }
    }
}

/// Both operands widened to a common kind
enum Pair {
    Int(i32, i32),
    Long(i64, i64),
    Float(f32, f32),
    Double(f64, f64),
    BigInteger(BigInt, BigInt),
    Decimal(Decimal, Decimal),
}

fn overflow() -> EvalError {
    EvalError::new(MessageKind::NumericOverflow, crate::core::error::NO_INSERTS)
}

fn division_by_zero() -> EvalError {
    EvalError::new(MessageKind::DivisionByZero, crate::core::error::NO_INSERTS)
}

fn widen(left: &Value, right: &Value) -> EvalResult<Option<Pair>> {
    let (Some(lk), Some(rk)) = (NumericKind::of(left), NumericKind::of(right)) else {
        return Ok(None);
    };
    let pair = match NumericKind::promote(lk, rk) {
        NumericKind::Int => match (left, right) {
            (Value::Integer(a), Value::Integer(b)) => Pair::Int(*a, *b),
            _ => return Ok(None),
        },
        NumericKind::Long => Pair::Long(
            left.as_i64().ok_or_else(overflow)?,
            right.as_i64().ok_or_else(overflow)?,
        ),
        NumericKind::Float => Pair::Float(
            left.as_f64().ok_or_else(overflow)? as f32,
            right.as_f64().ok_or_else(overflow)? as f32,
        ),
        NumericKind::Double => Pair::Double(
            left.as_f64().ok_or_else(overflow)?,
            right.as_f64().ok_or_else(overflow)?,
        ),
        NumericKind::BigInteger => Pair::BigInteger(
            bigint_of(left).ok_or_else(overflow)?,
            bigint_of(right).ok_or_else(overflow)?,
        ),
        NumericKind::Decimal => Pair::Decimal(
            decimal_of(left).ok_or_else(overflow)?,
            decimal_of(right).ok_or_else(overflow)?,
        ),
    };
    Ok(Some(pair))
}

/// Apply `+ - * / %` when both operands are numbers, `None` otherwise
pub(crate) fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> EvalResult<Option<Value>> {
    if op == BinaryOperator::Power {
        return power(left, right);
    }
    let Some(pair) = widen(left, right)? else {
        return Ok(None);
    };
    use BinaryOperator::*;
    let value = match pair {
        Pair::Int(a, b) => Value::Integer(match op {
            Add => a.wrapping_add(b),
            Subtract => a.wrapping_sub(b),
            Multiply => a.wrapping_mul(b),
            Divide | Modulus if b == 0 => return Err(division_by_zero()),
            Divide => a.wrapping_div(b),
            Modulus => a.wrapping_rem(b),
            _ => return Ok(None),
        }),
        Pair::Long(a, b) => Value::Long(match op {
            Add => a.wrapping_add(b),
            Subtract => a.wrapping_sub(b),
            Multiply => a.wrapping_mul(b),
            Divide | Modulus if b == 0 => return Err(division_by_zero()),
            Divide => a.wrapping_div(b),
            Modulus => a.wrapping_rem(b),
            _ => return Ok(None),
        }),
        Pair::Float(a, b) => Value::Float(match op {
            Add => a + b,
            Subtract => a - b,
            Multiply => a * b,
            Divide => a / b,
            Modulus => a % b,
            _ => return Ok(None),
        }),
        Pair::Double(a, b) => Value::Double(match op {
            Add => a + b,
            Subtract => a - b,
            Multiply => a * b,
            Divide => a / b,
            Modulus => a % b,
            _ => return Ok(None),
        }),
        Pair::BigInteger(a, b) => Value::BigInteger(match op {
            Add => a + b,
            Subtract => a - b,
            Multiply => a * b,
            Divide | Modulus if b.is_zero() => return Err(division_by_zero()),
            Divide => a / b,
            Modulus => a % b,
            _ => return Ok(None),
        }),
        Pair::Decimal(a, b) => Value::Decimal(match op {
            Add => a.checked_add(b).ok_or_else(overflow)?,
            Subtract => a.checked_sub(b).ok_or_else(overflow)?,
            Multiply => a.checked_mul(b).ok_or_else(overflow)?,
            Divide | Modulus if b.is_zero() => return Err(division_by_zero()),
            Divide => {
                let scale = a.scale().max(b.scale());
                a.checked_div(b)
                    .ok_or_else(overflow)?
                    .round_dp_with_strategy(scale, RoundingStrategy::MidpointNearestEven)
            }
            Modulus => a.checked_rem(b).ok_or_else(overflow)?,
            _ => return Ok(None),
        }),
    };
    Ok(Some(value))
}

fn decimal_pow(base: Decimal, exponent: i64) -> EvalResult<Decimal> {
    let mut result = Decimal::ONE;
    let mut square = base;
    let mut remaining = exponent.unsigned_abs();
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = result.checked_mul(square).ok_or_else(overflow)?;
        }
        remaining >>= 1;
        if remaining > 0 {
            square = square.checked_mul(square).ok_or_else(overflow)?;
        }
    }
    if exponent < 0 {
        if result.is_zero() {
            return Err(division_by_zero());
        }
        result = Decimal::ONE.checked_div(result).ok_or_else(overflow)?;
    }
    Ok(result)
}

/// `^` over two numbers, `None` when either side is not a number
pub(crate) fn power(base: &Value, exponent: &Value) -> EvalResult<Option<Value>> {
    if !(base.is_number() && exponent.is_number()) {
        return Ok(None);
    }
    let value = match (base, exponent) {
        (Value::Decimal(d), e) => {
            let e = e.as_i64().ok_or_else(overflow)?;
            Value::Decimal(decimal_pow(*d, e)?)
        }
        (Value::BigInteger(b), e) => {
            let e = e
                .as_i64()
                .and_then(|e| u32::try_from(e).ok())
                .ok_or_else(overflow)?;
            Value::BigInteger(b.pow(e))
        }
        (b, e) => {
            let (bf, ef) = (
                b.as_f64().ok_or_else(overflow)?,
                e.as_f64().ok_or_else(overflow)?,
            );
            let real = |v: &Value| {
                matches!(
                    v,
                    Value::Float(_) | Value::Double(_) | Value::Decimal(_) | Value::BigInteger(_)
                )
            };
            let result = bf.powf(ef);
            if real(b) || real(e) {
                Value::Double(result)
            } else if result > f64::from(i32::MAX)
                || result < f64::from(i32::MIN)
                || matches!(b, Value::Long(_))
                || matches!(e, Value::Long(_))
            {
                Value::Long(result as i64)
            } else {
                Value::Integer(result as i32)
            }
        }
    };
    Ok(Some(value))
}

/// Compare two numbers after promotion; `None` for NaN or non-numbers
pub(crate) fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match widen(left, right).ok()?? {
        Pair::Int(a, b) => Some(a.cmp(&b)),
        Pair::Long(a, b) => Some(a.cmp(&b)),
        Pair::Float(a, b) => a.partial_cmp(&b),
        Pair::Double(a, b) => a.partial_cmp(&b),
        Pair::BigInteger(a, b) => Some(a.cmp(&b)),
        Pair::Decimal(a, b) => Some(a.cmp(&b)),
    }
}

/// Total order over numbers, NaN sorting above every other value
pub(crate) fn total_compare(left: &Value, right: &Value) -> Ordering {
    compare(left, right).unwrap_or_else(|| {
        let (l, r) = (
            left.as_f64().unwrap_or(f64::NAN),
            right.as_f64().unwrap_or(f64::NAN),
        );
        l.total_cmp(&r)
    })
}

/// Numeric equality after promotion; `None` when either side is not a number
pub(crate) fn equals(left: &Value, right: &Value) -> Option<bool> {
    if !(left.is_number() && right.is_number()) {
        return None;
    }
    Some(compare(left, right) == Some(Ordering::Equal))
}

/// Add `delta` keeping the numeric kind of `value`
pub(crate) fn step(value: &Value, delta: i32) -> EvalResult<Option<Value>> {
    Ok(Some(match value {
        Value::Integer(i) => Value::Integer(i.wrapping_add(delta)),
        Value::Long(l) => Value::Long(l.wrapping_add(i64::from(delta))),
        Value::Float(f) => Value::Float(f + delta as f32),
        Value::Double(d) => Value::Double(d + f64::from(delta)),
        Value::BigInteger(b) => Value::BigInteger(b + delta),
        Value::Decimal(d) => Value::Decimal(d.checked_add(Decimal::from(delta)).ok_or_else(overflow)?),
        _ => return Ok(None),
    }))
}

/// Unary minus keeping the numeric kind, `None` for non-numbers
pub(crate) fn negate(value: &Value) -> Option<Value> {
    Some(match value {
        Value::Integer(i) => Value::Integer(i.wrapping_neg()),
        Value::Long(l) => Value::Long(l.wrapping_neg()),
        Value::Float(f) => Value::Float(-f),
        Value::Double(d) => Value::Double(-d),
        Value::BigInteger(b) => Value::BigInteger(-b),
        Value::Decimal(d) => Value::Decimal(-*d),
        _ => return None,
    })
}

/// Integer view of an index value
pub(crate) fn as_index(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(_) | Value::Long(_) | Value::BigInteger(_) | Value::Char(_) => value.as_i64(),
        Value::Decimal(d) if d.fract().is_zero() => d.to_i64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(text: &str) -> Value {
        Value::Decimal(Decimal::from_str(text).unwrap())
    }

    #[rstest]
    #[case(BinaryOperator::Add, Value::Integer(1), Value::Long(2), Value::Long(3))]
    #[case(BinaryOperator::Multiply, Value::Integer(3), Value::Float(1.5), Value::Float(4.5))]
    #[case(BinaryOperator::Add, Value::Float(1.5), Value::Double(1.0), Value::Double(2.5))]
    #[case(BinaryOperator::Divide, Value::Integer(7), Value::Integer(2), Value::Integer(3))]
    #[case(BinaryOperator::Modulus, Value::Integer(-7), Value::Integer(2), Value::Integer(-1))]
    #[case(BinaryOperator::Add, Value::Integer(i32::MAX), Value::Integer(1), Value::Integer(i32::MIN))]
    #[case(BinaryOperator::Divide, dec("1.00"), dec("3"), dec("0.33"))]
    #[case(BinaryOperator::Add, dec("1.5"), Value::Integer(1), dec("2.5"))]
    fn test_promotion(#[case] op: BinaryOperator, #[case] l: Value, #[case] r: Value, #[case] expected: Value) {
        assert_eq!(arithmetic(op, &l, &r).unwrap(), Some(expected));
    }

    #[test]
    fn test_bigint_with_double_promotes_to_decimal() {
        let result = arithmetic(
            BinaryOperator::Add,
            &Value::BigInteger(BigInt::from(2)),
            &Value::Double(0.5),
        )
        .unwrap();
        assert_eq!(result, Some(dec("2.5")));
    }

    #[test]
    fn test_division_by_zero() {
        let err = arithmetic(BinaryOperator::Divide, &Value::Integer(1), &Value::Integer(0)).unwrap_err();
        assert_eq!(err.kind(), MessageKind::DivisionByZero);
        let inf = arithmetic(BinaryOperator::Divide, &Value::Double(1.0), &Value::Integer(0)).unwrap();
        assert_eq!(inf, Some(Value::Double(f64::INFINITY)));
    }

    #[rstest]
    #[case(Value::Integer(2), Value::Integer(10), Value::Integer(1024))]
    #[case(Value::Integer(2), Value::Integer(40), Value::Long(1 << 40))]
    #[case(Value::Long(2), Value::Integer(3), Value::Long(8))]
    #[case(Value::Double(2.0), Value::Integer(-1), Value::Double(0.5))]
    #[case(dec("1.5"), Value::Integer(2), dec("2.25"))]
    #[case(dec("2"), Value::Integer(-2), dec("0.25"))]
    fn test_power(#[case] base: Value, #[case] exponent: Value, #[case] expected: Value) {
        assert_eq!(power(&base, &exponent).unwrap(), Some(expected));
    }

    #[test]
    fn test_compare_nan() {
        assert_eq!(compare(&Value::Double(f64::NAN), &Value::Integer(1)), None);
        assert_eq!(equals(&Value::Integer(1), &Value::Double(1.0)), Some(true));
        assert_eq!(equals(&Value::Integer(1), &Value::string("1")), None);
    }

    #[test]
    fn test_step_keeps_kind() {
        assert_eq!(step(&Value::Long(4), 1).unwrap(), Some(Value::Long(5)));
        assert_eq!(step(&dec("1.50"), -1).unwrap(), Some(dec("0.50")));
        assert_eq!(step(&Value::string("x"), 1).unwrap(), None);
    }
}
