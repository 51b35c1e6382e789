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

//! Message catalogue shared by every error type.
//!
//! Each [`MessageKind`] has a stable numeric code rendered as `EL0001`,
//! `EL0002`, ..., a category and a message template whose `{0}`, `{1}`
//! placeholders are filled from the error's insert values.

use std::fmt;

/// Error categories for organizing message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Tokenizer and parser errors (EL1001-EL1999)
    Parse,
    /// Evaluation errors (EL2001-EL2999)
    Evaluation,
    /// Member resolution errors (EL3001-EL3999)
    Access,
    /// Type conversion errors (EL4001-EL4999)
    Conversion,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Parse => "parse",
            ErrorCategory::Evaluation => "evaluation",
            ErrorCategory::Access => "access",
            ErrorCategory::Conversion => "conversion",
        };
        f.write_str(name)
    }
}

macro_rules! message_kinds {
    ($( $(#[$doc:meta])* $variant:ident = $code:literal => $template:literal, )*) => {
        /// Structured message kind carried by every error
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageKind {
            $( $(#[$doc])* $variant, )*
        }

        impl MessageKind {
            /// Numeric code of this message kind
            pub const fn code(self) -> u16 {
                match self {
                    $( MessageKind::$variant => $code, )*
                }
            }

            /// Message template with positional `{n}` placeholders
            pub const fn template(self) -> &'static str {
                match self {
                    $( MessageKind::$variant => $template, )*
                }
            }
        }
    };
}

message_kinds! {
    /// Ran out of input while a construct was still incomplete
    Ood = 1001 => "Unexpectedly ran out of input",
    /// A complete expression was parsed but tokens remain
    MoreInput = 1002 => "After parsing a valid expression, there is still more data in the expression: '{0}'",
    /// The right operand of a binary operator is missing or malformed
    RightOperandProblem = 1003 => "Problem parsing right operand",
    /// The left operand of a binary operator is missing
    LeftOperandProblem = 1004 => "Problem parsing left operand",
    /// Something other than a name, method or selection followed a dot
    UnexpectedDataAfterDot = 1005 => "Unexpected data after '.': '{0}'",
    /// A specific token was required but something else was found
    NotExpectedToken = 1006 => "Unexpected token. Expected '{0}' but was '{1}'",
    /// An argument list was not terminated
    RunOutOfArguments = 1007 => "Unexpectedly ran out of arguments",
    /// Selection brackets were empty
    MissingSelectionExpression = 1008 => "A required selection expression has not been specified",
    /// `@` or `&` was not followed by a bean name
    InvalidBeanReference = 1009 => "Expected a bean reference name",
    /// A constructor call had no argument list
    MissingConstructorArgs = 1010 => "The arguments '(...)' for the constructor call are missing",
    /// Array construction without a dimension or initializer
    MissingArrayDimension = 1011 => "A required array dimension has not been specified",
    /// Single-quoted string with no closing quote
    NonTerminatingQuotedString = 1012 => "Cannot find terminating \"'\" for string",
    /// Double-quoted string with no closing quote
    NonTerminatingDoubleQuotedString = 1013 => "Cannot find terminating '\"' for string",
    /// Block comment with no closing marker
    NonTerminatingComment = 1014 => "Cannot find terminating '*/' for comment",
    /// A two-character operator was only half present
    MissingCharacter = 1015 => "Missing expected character '{0}'",
    /// Integer literal does not fit a 32-bit int
    NotAnInteger = 1016 => "The value '{0}' cannot be parsed as an int",
    /// Long literal does not fit a 64-bit long
    NotALong = 1017 => "The value '{0}' cannot be parsed as a long",
    /// Real literal carrying an `L` suffix
    RealCannotBeLong = 1018 => "Real number cannot be suffixed with a long (L or l) suffix",
    /// Real literal that does not parse
    NotAReal = 1019 => "The value '{0}' cannot be parsed as a real number",
    /// Hex literal with no digits
    InvalidHexLiteral = 1020 => "The value '{0}' is not a valid hexadecimal literal",
    /// A character the tokenizer does not recognize
    UnsupportedCharacter = 1021 => "Unsupported character '{0}' ({1}) encountered in the input",
    /// Expression text longer than the configured maximum
    MaxExpressionLengthExceeded = 1022 => "Expression is too long, exceeding the threshold of '{0}' characters",
    /// Template expression without a closing suffix
    TemplateMissingSuffix = 1023 => "No ending suffix '{0}' for expression starting at character {1}: {2}",
    /// Template delimiters with nothing between them
    TemplateEmptyExpression = 1024 => "No expression defined within delimiter '{0}' at character {1}",
    /// Mismatched bracket inside a template expression
    TemplateUnbalancedBracket = 1025 => "Found closing '{0}' at position {1} but expected '{2}'",
    /// Multi-dimensional array with an initializer
    MultidimArrayInitializerNotSupported = 1026 => "Using an initializer to build a multi-dimensional array is not currently supported",

    /// Operator applied to operands with no arithmetic or overload
    OperatorNotSupportedBetweenTypes = 2001 => "The operator '{0}' is not supported between objects of type '{1}' and '{2}'",
    /// Ordering requested between incomparable values
    NotComparable = 2002 => "Cannot compare instances of {0} and {1}",
    /// Assignment attempted while the context forbids it
    AssignmentNotSupported = 2003 => "Assignment is not supported in this evaluation context: '{0}'",
    /// Variable assignment forbidden by the context
    VariableAssignmentNotSupported = 2004 => "Assignment to variable '{0}' is not supported",
    /// Target of an assignment is not a writable reference
    NotAssignable = 2005 => "The expression '{0}' cannot be assigned to",
    /// Increment applied to a non-writable target
    OperandNotIncrementable = 2006 => "The expression component '{0}' does not support increment",
    /// Decrement applied to a non-writable target
    OperandNotDecrementable = 2007 => "The expression component '{0}' does not support decrement",
    /// List index outside the list bounds
    CollectionIndexOutOfBounds = 2008 => "The collection has '{0}' elements, index '{1}' is invalid",
    /// Array index outside the array bounds
    ArrayIndexOutOfBounds = 2009 => "The array has '{0}' elements, index '{1}' is invalid",
    /// String index outside the string bounds
    StringIndexOutOfBounds = 2010 => "The string has '{0}' characters, index '{1}' is invalid",
    /// Index applied to null without `?.`
    CannotIndexIntoNullValue = 2011 => "Cannot index into a null value",
    /// Index applied to a value with no indexing support
    IndexingNotSupportedForType = 2012 => "Indexing into type '{0}' is not supported",
    /// Auto-grow would exceed the configured maximum size
    UnableToGrowCollection = 2013 => "Unable to grow collection: index {0} exceeds the maximum auto-grow size of {1}",
    /// Selection applied to a non-iterable value
    InvalidTypeForSelection = 2014 => "Cannot perform selection on input data of type '{0}'",
    /// Selection criteria produced a non-boolean
    ResultOfSelectionCriteriaIsNotBoolean = 2015 => "Result of selection criteria is not boolean",
    /// Projection applied to a non-iterable value
    ProjectionNotSupportedOnType = 2016 => "Projection is not supported on the type '{0}'",
    /// A method body or getter raised while being invoked
    ExceptionDuringMethodInvocation = 2017 => "A problem occurred whilst attempting to invoke method '{0}' on object of type '{1}': '{2}'",
    /// Function reference to an unknown name
    FunctionNotDefined = 2018 => "The function '{0}' could not be found",
    /// Function reference to a variable that holds no function
    FunctionReferenceCannotBeInvoked = 2019 => "The variable '{0}' holds a '{1}', which cannot be invoked as a function",
    /// Function invoked with the wrong number of arguments
    IncorrectNumberOfArgumentsToFunction = 2020 => "Incorrect number of arguments for function '{0}': {1} supplied but function takes {2}",
    /// A registered function raised while being invoked
    ExceptionDuringFunctionCall = 2021 => "A problem occurred whilst attempting to invoke function '{0}': '{1}'",
    /// Bean reference without a bean resolver
    NoBeanResolverRegistered = 2022 => "No bean resolver registered in the context to resolve access to bean '{0}'",
    /// Bean resolver raised while resolving
    ExceptionDuringBeanResolution = 2023 => "A problem occurred when trying to resolve bean '{0}': '{1}'",
    /// Type reference that the locator cannot resolve
    TypeNotFound = 2024 => "Type cannot be found '{0}'",
    /// `instanceof` whose right operand is not a type
    InstanceofOperatorNeedsClassOperand = 2025 => "The operator 'instanceof' needs the right operand to be a class, not a '{0}'",
    /// `matches` whose left operand is not a string
    InvalidFirstOperandForMatchesOperator = 2026 => "First operand to matches operator must be a string. '{0}' is not",
    /// `matches` whose right operand is not a string
    InvalidSecondOperandForMatchesOperator = 2027 => "Second operand to matches operator must be a string. '{0}' is not",
    /// Regular expression that does not compile
    InvalidPattern = 2028 => "Pattern '{0}' is not a valid regular expression: {1}",
    /// Regular expression longer than the supported maximum
    MaxRegexLengthExceeded = 2029 => "Regular expression contains {0} characters, exceeding the threshold of {1} characters",
    /// `between` whose right operand is not a two-element list
    BetweenRightOperandMustBeTwoElementList = 2030 => "Right operand for the 'between' operator has to be a two-element list",
    /// String concatenation longer than the supported maximum
    MaxConcatenatedStringLengthExceeded = 2031 => "Concatenated string is too long, exceeding the threshold of '{0}' characters",
    /// String repetition longer than the supported maximum
    MaxRepeatedTextSizeExceeded = 2032 => "Repeated text is too long, exceeding the threshold of '{0}' characters",
    /// String repetition with a negative count
    NegativeRepeatedTextCount = 2033 => "Repeat count '{0}' must not be negative",
    /// Integer, BigInteger or decimal division by zero
    DivisionByZero = 2034 => "Division by zero in '{0}'",
    /// Arithmetic outside the representable range
    NumericOverflow = 2035 => "Numeric overflow evaluating '{0}'",
    /// Array initializer with a mismatching explicit dimension
    InitializerLengthIncorrect = 2036 => "Array initializer size does not match array dimensions",
    /// Negative array dimension
    NegativeArrayDimension = 2037 => "Array dimension '{0}' must not be negative",
    /// Constructor body raised while being invoked
    ConstructorInvocationProblem = 2038 => "A problem occurred whilst attempting to construct an object of type '{0}': '{1}'",
    /// Auto-grow could not create a default value
    UnableToDynamicallyCreateObject = 2039 => "Unable to dynamically create object of type '{0}'",
    /// `set_value` on a template or literal expression
    SetValueNotSupported = 2040 => "Cannot set value for expression '{0}'",
    /// Operand that had to be boolean was null
    NullOperandForBoolean = 2041 => "Operand of '{0}' evaluated to null, a boolean was required",
    /// Array construction above the element limit
    MaxArrayElementsThresholdExceeded = 2042 => "Array declares too many elements, exceeding the threshold of '{0}'",
    /// Unary operator applied to an operand with no arithmetic or overload
    OperatorNotSupportedForType = 2043 => "The operator '{0}' is not supported for an operand of type '{1}'",

    /// Property lookup found no accessor
    PropertyOrFieldNotReadable = 3001 => "Property or field '{0}' cannot be found on object of type '{1}' - maybe not public or not valid?",
    /// Property write found no accessor
    PropertyOrFieldNotWritable = 3002 => "Property or field '{0}' cannot be set on object of type '{1}' - maybe not public or not writable?",
    /// Property read on null without `?.`
    PropertyOrFieldNotReadableOnNull = 3003 => "Property or field '{0}' cannot be found on null",
    /// Property write on null
    PropertyOrFieldNotWritableOnNull = 3004 => "Property or field '{0}' cannot be set on null",
    /// Method lookup found no candidate
    MethodNotFound = 3005 => "Method call: Method {0} cannot be found on type {1}",
    /// Method call on null without `?.`
    MethodCallOnNullObjectNotAllowed = 3006 => "Method call: Attempted to call method {0} on null context object",
    /// Constructor lookup found no candidate
    ConstructorNotFound = 3007 => "Constructor call: No suitable constructor found on type {0} for arguments {1}",
    /// A resolver or member body reported a failure
    AccessFailed = 3008 => "{0}",
    /// A property getter raised while being read
    ExceptionDuringPropertyRead = 3009 => "A problem occurred whilst attempting to access the property '{0}': '{1}'",
    /// A property setter raised while being written
    ExceptionDuringPropertyWrite = 3010 => "A problem occurred whilst attempting to set the property '{0}': '{1}'",

    /// No conversion path between two types
    TypeConversionError = 4001 => "Type conversion problem, cannot convert from {0} to {1}",
    /// A conversion path exists but the value does not fit it
    ConversionFailed = 4002 => "Failed to convert value '{0}' from {1} to {2}",
}

impl MessageKind {
    /// Get the full code string (e.g., "EL2001")
    pub fn code_str(self) -> String {
        format!("EL{:04}", self.code())
    }

    /// Category derived from the code range
    pub fn category(self) -> ErrorCategory {
        match self.code() {
            1000..=1999 => ErrorCategory::Parse,
            3000..=3999 => ErrorCategory::Access,
            4000..=4999 => ErrorCategory::Conversion,
            _ => ErrorCategory::Evaluation,
        }
    }

    /// Render the template, substituting each `{n}` with `inserts[n]`
    pub fn format(self, inserts: &[String]) -> String {
        let template = self.template();
        let mut out = String::with_capacity(template.len() + 16);
        let mut chars = template.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            if ch == '{' {
                let rest = &template[i + 1..];
                if let Some(close) = rest.find('}') {
                    if let Ok(n) = rest[..close].parse::<usize>() {
                        match inserts.get(n) {
                            Some(value) => out.push_str(value),
                            None => out.push_str("<?>"),
                        }
                        for _ in 0..=close {
                            chars.next();
                        }
                        continue;
                    }
                }
            }
            out.push(ch);
        }
        out
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EL{:04}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_string() {
        assert_eq!(MessageKind::Ood.code_str(), "EL1001");
        assert_eq!(MessageKind::TypeConversionError.to_string(), "EL4001");
    }

    #[test]
    fn test_category_ranges() {
        assert_eq!(MessageKind::MoreInput.category(), ErrorCategory::Parse);
        assert_eq!(
            MessageKind::DivisionByZero.category(),
            ErrorCategory::Evaluation
        );
        assert_eq!(MessageKind::MethodNotFound.category(), ErrorCategory::Access);
        assert_eq!(
            MessageKind::ConversionFailed.category(),
            ErrorCategory::Conversion
        );
    }

    #[test]
    fn test_format_inserts() {
        let text = MessageKind::NotExpectedToken.format(&["]".to_string(), ")".to_string()]);
        assert_eq!(text, "Unexpected token. Expected ']' but was ')'");

        let missing = MessageKind::NotComparable.format(&["Integer".to_string()]);
        assert_eq!(missing, "Cannot compare instances of Integer and <?>");
    }
}
