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

//! Compilation of hot expressions
//!
//! Each standard expression owns a [`CompilationSlot`] tracking whether it
//! runs interpreted or through a compiled routine. Evaluation only ever
//! touches the slot through `try_lock`, so a contended slot simply means
//! one more interpreted run.

#[allow(clippy::module_inception)]
pub mod compiler;
pub(crate) mod routine;

pub use compiler::{
    CompilationError, CompilationResult, CompilerConfig, ExpressionCompiler, is_compilable,
};
pub use routine::CompiledExpression;

use crate::ast::Node;
use crate::core::{TypeDescriptor, TypedValue};
use crate::evaluator::ParserConfig;
use parking_lot::Mutex;
use std::sync::Arc;

/// Where an expression currently stands with respect to compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilationState {
    /// Interpreted, still eligible for compilation
    Uncompiled,
    /// Running through a compiled routine
    Compiled,
    /// Interpreted for good, after too many failed compilations
    Interpreted,
}

#[derive(Debug)]
enum Phase {
    Uncompiled {
        /// Consecutive successful runs with an unchanged result type
        successes: u32,
        signature: Option<Option<TypeDescriptor>>,
    },
    Compiled(Arc<CompiledExpression>),
    Abandoned,
}

#[derive(Debug)]
struct SlotState {
    phase: Phase,
    failures: u32,
}

impl SlotState {
    fn fresh() -> Phase {
        Phase::Uncompiled {
            successes: 0,
            signature: None,
        }
    }

    fn fail(&mut self, source: &str, config: &ParserConfig) {
        self.failures += 1;
        if self.failures >= config.failed_compilation_threshold {
            log::debug!(
                "'{source}' failed compilation {} times, staying interpreted",
                self.failures
            );
            self.phase = Phase::Abandoned;
        } else {
            self.phase = Self::fresh();
        }
    }
}

/// Per-expression compilation state machine
#[derive(Debug)]
pub(crate) struct CompilationSlot {
    state: Mutex<SlotState>,
}

impl CompilationSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                phase: SlotState::fresh(),
                failures: 0,
            }),
        }
    }

    pub(crate) fn state(&self) -> CompilationState {
        match &self.state.lock().phase {
            Phase::Uncompiled { .. } => CompilationState::Uncompiled,
            Phase::Compiled(_) => CompilationState::Compiled,
            Phase::Abandoned => CompilationState::Interpreted,
        }
    }

    /// Compiled routine to run, if one is installed and the slot is free
    pub(crate) fn routine(&self) -> Option<Arc<CompiledExpression>> {
        match &self.state.try_lock()?.phase {
            Phase::Compiled(compiled) => Some(compiled.clone()),
            _ => None,
        }
    }

    /// Record an interpreted run and compile once the mode's threshold is met
    pub(crate) fn record_run(
        &self,
        source: &str,
        ast: &Node,
        result: &TypedValue,
        specializable: bool,
        config: &ParserConfig,
    ) {
        let Some(threshold) = config.compile_after() else {
            return;
        };
        let Some(mut slot) = self.state.try_lock() else {
            return;
        };
        let Phase::Uncompiled {
            successes,
            signature,
        } = &mut slot.phase
        else {
            return;
        };
        if !specializable {
            log::trace!("'{source}' used an unspecializable member");
            slot.fail(source, config);
            return;
        }
        let observed = result.type_descriptor();
        if signature.as_ref() == Some(&observed) {
            *successes += 1;
        } else {
            *signature = Some(observed);
            *successes = 1;
        }
        if *successes < threshold {
            return;
        }
        match ExpressionCompiler::new().compile(source, ast) {
            Ok(compiled) => {
                log::debug!("compiled '{source}'");
                slot.phase = Phase::Compiled(Arc::new(compiled));
            }
            Err(err) => {
                log::debug!("'{source}' stays interpreted: {err}");
                slot.phase = Phase::Abandoned;
            }
        }
    }

    /// Drop the compiled routine after a guard miss or a failed run
    pub(crate) fn invalidate(&self, source: &str, config: &ParserConfig) {
        let Some(mut slot) = self.state.try_lock() else {
            return;
        };
        if matches!(slot.phase, Phase::Compiled(_)) {
            log::debug!("compiled form of '{source}' invalidated");
            slot.fail(source, config);
        }
    }

    /// Install a routine compiled on request
    pub(crate) fn install(&self, compiled: CompiledExpression) {
        let mut slot = self.state.lock();
        slot.phase = Phase::Compiled(Arc::new(compiled));
    }

    /// Back to interpreted with counters cleared
    pub(crate) fn reset(&self) {
        let mut slot = self.state.lock();
        slot.phase = SlotState::fresh();
        slot.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::evaluator::CompilerMode;
    use crate::parser::parser::InternalParser;

    fn run(slot: &CompilationSlot, text: &str, result: Value, config: &ParserConfig) {
        let ast = InternalParser::parse(text).unwrap();
        slot.record_run(text, &ast, &TypedValue::new(result), true, config);
    }

    #[test]
    fn test_mixed_mode_waits_for_stable_result_type() {
        let config = ParserConfig::new()
            .with_compiler_mode(CompilerMode::Mixed)
            .with_compile_threshold(3);
        let slot = CompilationSlot::new();
        run(&slot, "a", Value::Integer(1), &config);
        run(&slot, "a", Value::Integer(2), &config);
        run(&slot, "a", Value::from("x"), &config);
        assert_eq!(slot.state(), CompilationState::Uncompiled);
        run(&slot, "a", Value::from("y"), &config);
        run(&slot, "a", Value::from("z"), &config);
        assert_eq!(slot.state(), CompilationState::Compiled);
    }

    #[test]
    fn test_off_mode_never_compiles() {
        let config = ParserConfig::new();
        let slot = CompilationSlot::new();
        for _ in 0..10 {
            run(&slot, "1", Value::Integer(1), &config);
        }
        assert_eq!(slot.state(), CompilationState::Uncompiled);
    }

    #[test]
    fn test_repeated_invalidation_abandons_compilation() {
        let config = ParserConfig::new()
            .with_compiler_mode(CompilerMode::Immediate)
            .with_failed_compilation_threshold(2);
        let slot = CompilationSlot::new();
        for _ in 0..2 {
            run(&slot, "1", Value::Integer(1), &config);
            assert_eq!(slot.state(), CompilationState::Compiled);
            slot.invalidate("1", &config);
        }
        assert_eq!(slot.state(), CompilationState::Interpreted);
        slot.reset();
        assert_eq!(slot.state(), CompilationState::Uncompiled);
    }
}
