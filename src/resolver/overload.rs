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

//! Overload selection and argument binding

use crate::core::{ArrayRef, EvalResult, TypeDescriptor, Value};
use crate::model::TypeConverter;

/// How well a supplied argument list fits a parameter list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum ArgumentsMatchKind {
    Exact,
    Close,
    RequiresConversion,
}

/// A callable member as seen by overload selection
#[derive(Debug, Clone, Copy)]
pub(crate) struct Signature<'a> {
    pub(crate) params: &'a [TypeDescriptor],
    pub(crate) varargs: bool,
    pub(crate) bridge: bool,
}

fn match_one(
    param: &TypeDescriptor,
    arg: Option<&TypeDescriptor>,
    converter: &dyn TypeConverter,
) -> Option<ArgumentsMatchKind> {
    let Some(arg) = arg else {
        return Some(ArgumentsMatchKind::Exact);
    };
    if param == arg {
        Some(ArgumentsMatchKind::Exact)
    } else if converter.is_assignable(param, arg) {
        Some(ArgumentsMatchKind::Close)
    } else if converter.can_convert(Some(arg), param) {
        Some(ArgumentsMatchKind::RequiresConversion)
    } else {
        None
    }
}

fn match_all<'a>(
    mut pairs: impl Iterator<Item = (&'a TypeDescriptor, Option<&'a TypeDescriptor>)>,
    converter: &dyn TypeConverter,
) -> Option<ArgumentsMatchKind> {
    pairs.try_fold(ArgumentsMatchKind::Exact, |worst, (param, arg)| {
        match_one(param, arg, converter).map(|kind| worst.max(kind))
    })
}

fn match_fixed(
    params: &[TypeDescriptor],
    args: &[Option<TypeDescriptor>],
    converter: &dyn TypeConverter,
) -> Option<ArgumentsMatchKind> {
    if params.len() != args.len() {
        return None;
    }
    match_all(params.iter().zip(args.iter().map(Option::as_ref)), converter)
}

fn match_varargs(
    params: &[TypeDescriptor],
    args: &[Option<TypeDescriptor>],
    converter: &dyn TypeConverter,
) -> Option<ArgumentsMatchKind> {
    let (last, fixed) = params.split_last()?;
    let component = last.component_type()?;
    if args.len() < fixed.len() {
        return None;
    }
    let head = match_all(fixed.iter().zip(args.iter().map(Option::as_ref)), converter)?;
    let rest = &args[fixed.len()..];
    let tail = match rest {
        // A single array argument is passed through as the varargs array
        [Some(ty @ TypeDescriptor::Array(_))] => match_one(last, Some(ty), converter)
            .or_else(|| match_one(component, Some(ty), converter))?,
        _ => match_all(
            rest.iter().map(|arg| (component, arg.as_ref())),
            converter,
        )?,
    };
    Some(head.max(tail))
}

/// Match an argument list against one signature
pub(crate) fn match_arguments(
    signature: Signature<'_>,
    args: &[Option<TypeDescriptor>],
    converter: &dyn TypeConverter,
) -> Option<ArgumentsMatchKind> {
    let fixed = match_fixed(signature.params, args, converter);
    if signature.varargs {
        match fixed {
            Some(ArgumentsMatchKind::Exact) => fixed,
            _ => match_varargs(signature.params, args, converter).or(fixed),
        }
    } else {
        fixed
    }
}

/// Index of the best candidate.
///
/// Non-bridge members are tried before bridge members, each group in
/// declaration order. The first exact match wins outright, otherwise the
/// first close match, otherwise the first match requiring conversion.
pub(crate) fn select_best<'a>(
    candidates: &[Signature<'a>],
    args: &[Option<TypeDescriptor>],
    converter: &dyn TypeConverter,
) -> Option<(usize, ArgumentsMatchKind)> {
    let ordered = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.bridge)
        .chain(candidates.iter().enumerate().filter(|(_, c)| c.bridge));
    let mut close = None;
    let mut conversion = None;
    for (index, candidate) in ordered {
        match match_arguments(*candidate, args, converter) {
            Some(ArgumentsMatchKind::Exact) => return Some((index, ArgumentsMatchKind::Exact)),
            Some(ArgumentsMatchKind::Close) => {
                close.get_or_insert((index, ArgumentsMatchKind::Close));
            }
            Some(ArgumentsMatchKind::RequiresConversion) => {
                conversion.get_or_insert((index, ArgumentsMatchKind::RequiresConversion));
            }
            None => {}
        }
    }
    close.or(conversion)
}

/// Convert supplied arguments to the parameter types, packing varargs
pub(crate) fn convert_arguments(
    converter: &dyn TypeConverter,
    params: &[TypeDescriptor],
    varargs: bool,
    mut args: Vec<Value>,
) -> EvalResult<Vec<Value>> {
    if varargs {
        if let Some((TypeDescriptor::Array(component), fixed)) = params.split_last() {
            let passthrough = args.len() == params.len()
                && matches!(args.last(), Some(Value::Array(_) | Value::Null));
            if !passthrough && args.len() >= fixed.len() {
                let packed = args
                    .split_off(fixed.len())
                    .iter()
                    .map(|arg| converter.convert_value(arg, component))
                    .collect::<Result<Vec<_>, _>>()?;
                args.push(Value::Array(ArrayRef::new((**component).clone(), packed)));
            }
        }
    }
    args.iter()
        .zip(params)
        .map(|(arg, param)| converter.convert_value(arg, param).map_err(Into::into))
        .collect()
}

/// Argument type list for resolution; `None` stands for a null argument
pub(crate) fn argument_types(args: &[Value]) -> smallvec::SmallVec<[Option<TypeDescriptor>; 4]> {
    args.iter().map(Value::type_descriptor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StandardTypeConverter, TypeRegistry};
    use std::sync::Arc;

    fn converter() -> StandardTypeConverter {
        StandardTypeConverter::new(Arc::new(TypeRegistry::with_builtins()))
    }

    fn sig(params: &[TypeDescriptor]) -> Signature<'_> {
        Signature {
            params,
            varargs: false,
            bridge: false,
        }
    }

    #[test]
    fn test_exact_beats_earlier_conversion() {
        let conv = converter();
        let by_double = [TypeDescriptor::Double];
        let by_int = [TypeDescriptor::Integer];
        let candidates = [sig(&by_double), sig(&by_int)];
        assert_eq!(
            select_best(&candidates, &[Some(TypeDescriptor::Integer)], &conv),
            Some((1, ArgumentsMatchKind::Exact))
        );
        assert_eq!(
            select_best(&candidates, &[Some(TypeDescriptor::Float)], &conv),
            Some((0, ArgumentsMatchKind::RequiresConversion))
        );
    }

    #[test]
    fn test_close_match_via_supertype() {
        let conv = converter();
        let object = [TypeDescriptor::Object];
        assert_eq!(
            match_arguments(sig(&object), &[Some(TypeDescriptor::String)], &conv),
            Some(ArgumentsMatchKind::Close)
        );
        assert_eq!(match_arguments(sig(&object), &[None], &conv), Some(ArgumentsMatchKind::Exact));
    }

    #[test]
    fn test_bridge_members_are_tried_last() {
        let conv = converter();
        let params = [TypeDescriptor::Object];
        let bridge = Signature {
            params: &params,
            varargs: false,
            bridge: true,
        };
        let candidates = [bridge, sig(&params)];
        assert_eq!(
            select_best(&candidates, &[Some(TypeDescriptor::String)], &conv).map(|(i, _)| i),
            Some(1)
        );
    }

    #[test]
    fn test_varargs_packing() {
        let conv = converter();
        let params = [
            TypeDescriptor::String,
            TypeDescriptor::array_of(TypeDescriptor::Integer),
        ];
        let signature = Signature {
            params: &params,
            varargs: true,
            bridge: false,
        };
        let args = [
            Some(TypeDescriptor::String),
            Some(TypeDescriptor::Integer),
            Some(TypeDescriptor::Integer),
        ];
        assert_eq!(
            match_arguments(signature, &args, &conv),
            Some(ArgumentsMatchKind::Exact)
        );

        let converted = convert_arguments(
            &conv,
            &params,
            true,
            vec![Value::string("x"), Value::Integer(1), Value::string("2")],
        )
        .unwrap();
        assert_eq!(converted.len(), 2);
        let Value::Array(packed) = &converted[1] else { panic!("expected array") };
        assert_eq!(packed.snapshot(), vec![Value::Integer(1), Value::Integer(2)]);
    }
}
