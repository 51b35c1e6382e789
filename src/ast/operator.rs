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

//! Operator definitions for expressions
//!
//! This module defines the binary, unary and increment/decrement operators
//! together with their grammar level and symbols.

use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    // Arithmetic operators
    /// Addition (+), also string concatenation
    Add,
    /// Subtraction (-)
    Subtract,
    /// Multiplication (*)
    Multiply,
    /// Division (/ or div)
    Divide,
    /// Remainder (% or mod)
    Modulus,
    /// Exponentiation (^)
    Power,

    // Relational operators
    /// Equality (== or eq)
    Equal,
    /// Inequality (!= or ne)
    NotEqual,
    /// Less than (< or lt)
    LessThan,
    /// Less than or equal (<= or le)
    LessThanOrEqual,
    /// Greater than (> or gt)
    GreaterThan,
    /// Greater than or equal (>= or ge)
    GreaterThanOrEqual,
    /// Type test (instanceof)
    InstanceOf,
    /// Regular expression match (matches)
    Matches,
    /// Inclusive range test (between)
    Between,

    // Logical operators
    /// Short-circuit conjunction (and, &&)
    And,
    /// Short-circuit disjunction (or, ||)
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// Arithmetic negation (-)
    Negate,
    /// Positive sign (+)
    Positive,
    /// Logical negation (! or not)
    Not,
}

/// Increment and decrement operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IncDecOperator {
    /// `++`
    Increment,
    /// `--`
    Decrement,
}

impl BinaryOperator {
    /// Grammar level of this operator (higher = binds tighter)
    pub fn precedence(self) -> u8 {
        match self {
            Self::Or => 1,
            Self::And => 2,
            Self::Equal
            | Self::NotEqual
            | Self::LessThan
            | Self::LessThanOrEqual
            | Self::GreaterThan
            | Self::GreaterThanOrEqual
            | Self::InstanceOf
            | Self::Matches
            | Self::Between => 3,
            Self::Add | Self::Subtract => 4,
            Self::Multiply | Self::Divide | Self::Modulus => 5,
            Self::Power => 6,
        }
    }

    /// Check if this operator is arithmetic
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulus | Self::Power
        )
    }

    /// Check if this operator is relational
    pub fn is_relational(self) -> bool {
        self.precedence() == 3
    }

    /// Check if this operator is logical
    pub fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    /// Get the symbol representation of this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulus => "%",
            Self::Power => "^",
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::InstanceOf => "instanceof",
            Self::Matches => "matches",
            Self::Between => "between",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

impl UnaryOperator {
    /// Get the symbol representation of this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Negate => "-",
            Self::Positive => "+",
            Self::Not => "!",
        }
    }
}

impl IncDecOperator {
    /// Get the symbol representation of this operator
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl fmt::Display for IncDecOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
