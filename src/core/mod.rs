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

//! Core types shared by every layer: errors, values and type descriptors

pub mod error;
pub mod error_code;
pub mod typed_value;
pub mod types;
pub mod value;

pub use error::{AccessError, ConversionError, Error, EvalError, EvalResult, ParseError, Result};
pub use error_code::{ErrorCategory, MessageKind};
pub use typed_value::TypedValue;
pub use types::TypeDescriptor;
pub use value::{ArrayRef, FunctionRef, ListRef, MapKey, MapRef, ObjectRef, Value};
