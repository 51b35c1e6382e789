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

//! Normalized string form of an AST, used in diagnostics

use super::expression::{Node, NodeKind};
use std::fmt::{self, Write};

fn write_joined(f: &mut fmt::Formatter<'_>, nodes: &[Node], separator: &str) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{node}")?;
    }
    Ok(())
}

fn dot(f: &mut fmt::Formatter<'_>, null_safe: bool) -> fmt::Result {
    if null_safe { f.write_str("?.") } else { Ok(()) }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Literal(value) => write!(f, "{value}"),
            NodeKind::PropertyOrField { name, .. } => f.write_str(name),
            NodeKind::MethodReference { name, args, .. } => {
                write!(f, "{name}(")?;
                write_joined(f, args, ",")?;
                f.write_char(')')
            }
            NodeKind::FunctionReference { name, args } => {
                write!(f, "#{name}(")?;
                write_joined(f, args, ",")?;
                f.write_char(')')
            }
            NodeKind::VariableReference { name } => write!(f, "#{name}"),
            NodeKind::BeanReference { name, factory } => {
                let sigil = if *factory { '&' } else { '@' };
                if name.contains('.') {
                    write!(f, "{sigil}'{name}'")
                } else {
                    write!(f, "{sigil}{name}")
                }
            }
            NodeKind::TypeReference { name, dimensions } => {
                write!(f, "T({name}{})", "[]".repeat(*dimensions))
            }
            NodeKind::ConstructorReference { type_name, args } => {
                write!(f, "new {type_name}(")?;
                write_joined(f, args, ",")?;
                f.write_char(')')
            }
            NodeKind::ArrayConstructor {
                type_name,
                dimensions,
                initializer,
            } => {
                write!(f, "new {type_name}")?;
                for dimension in dimensions {
                    match dimension {
                        Some(size) => write!(f, "[{size}]")?,
                        None => f.write_str("[]")?,
                    }
                }
                match initializer {
                    Some(init) => write!(f, "{init}"),
                    None => Ok(()),
                }
            }
            NodeKind::Indexer { index, null_safe } => {
                dot(f, *null_safe)?;
                write!(f, "[{index}]")
            }
            NodeKind::Selection {
                variant,
                criteria,
                null_safe,
            } => {
                dot(f, *null_safe)?;
                write!(f, "{}{criteria}]", variant.prefix())
            }
            NodeKind::Projection {
                expression,
                null_safe,
            } => {
                dot(f, *null_safe)?;
                write!(f, "![{expression}]")
            }
            NodeKind::InlineList(items) => {
                f.write_char('{')?;
                write_joined(f, items, ",")?;
                f.write_char('}')
            }
            NodeKind::InlineMap(entries) => {
                if entries.is_empty() {
                    return f.write_str("{:}");
                }
                f.write_char('{')?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_char(',')?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                f.write_char('}')
            }
            NodeKind::Compound(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        match &part.kind {
                            NodeKind::Indexer { .. } => {}
                            NodeKind::Selection { null_safe, .. }
                            | NodeKind::Projection { null_safe, .. } => {
                                if !*null_safe {
                                    f.write_char('.')?;
                                }
                            }
                            NodeKind::PropertyOrField { null_safe: true, .. }
                            | NodeKind::MethodReference { null_safe: true, .. } => {
                                f.write_str("?.")?;
                            }
                            _ => f.write_char('.')?,
                        }
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
            NodeKind::Assign { target, value } => write!(f, "{target}={value}"),
            NodeKind::Elvis { value, fallback } => write!(f, "{value} ?: {fallback}"),
            NodeKind::Ternary {
                condition,
                if_true,
                if_false,
            } => write!(f, "({condition} ? {if_true} : {if_false})"),
            NodeKind::Binary { op, left, right } => write!(f, "({left} {op} {right})"),
            NodeKind::Unary { op, operand } => write!(f, "{op}{operand}"),
            NodeKind::IncDec {
                op,
                prefix,
                operand,
            } => {
                if *prefix {
                    write!(f, "{op}{operand}")
                } else {
                    write!(f, "{operand}{op}")
                }
            }
        }
    }
}
