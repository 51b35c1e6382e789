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

//! Parser and evaluation configuration

use serde::{Deserialize, Serialize};

/// When expressions are compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerMode {
    /// Always interpret
    #[default]
    Off,
    /// Compile after the first successful interpretation
    Immediate,
    /// Compile once the result type has been stable for `compile_threshold` evaluations
    Mixed,
}

/// Configuration shared by the parser and every expression it produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Compilation policy
    pub compiler_mode: CompilerMode,
    /// Interpretations before a `Mixed` expression is compiled
    pub compile_threshold: u32,
    /// Invalidations after which an expression stays interpreted
    pub failed_compilation_threshold: u32,
    /// Replace null intermediate properties with new instances during navigation
    pub auto_grow_null_references: bool,
    /// Pad lists with nulls when writing past their end
    pub auto_grow_collections: bool,
    /// Largest size a list may be grown to
    pub maximum_auto_grow_size: usize,
    /// Longest accepted expression text, in characters
    pub maximum_expression_length: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            compiler_mode: CompilerMode::Off,
            compile_threshold: 100,
            failed_compilation_threshold: 100,
            auto_grow_null_references: false,
            auto_grow_collections: false,
            maximum_auto_grow_size: usize::MAX,
            maximum_expression_length: 10_000,
        }
    }
}

impl ParserConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the compiler mode
    pub fn with_compiler_mode(mut self, mode: CompilerMode) -> Self {
        self.compiler_mode = mode;
        self
    }

    /// Set the compile threshold for `Mixed` mode
    pub fn with_compile_threshold(mut self, threshold: u32) -> Self {
        self.compile_threshold = threshold;
        self
    }

    /// Set how many invalidations are tolerated before giving up on compilation
    pub fn with_failed_compilation_threshold(mut self, threshold: u32) -> Self {
        self.failed_compilation_threshold = threshold;
        self
    }

    /// Enable or disable auto-growing null references
    pub fn with_auto_grow_null_references(mut self, enabled: bool) -> Self {
        self.auto_grow_null_references = enabled;
        self
    }

    /// Enable or disable auto-growing collections
    pub fn with_auto_grow_collections(mut self, enabled: bool) -> Self {
        self.auto_grow_collections = enabled;
        self
    }

    /// Bound collection growth
    pub fn with_maximum_auto_grow_size(mut self, size: usize) -> Self {
        self.maximum_auto_grow_size = size;
        self
    }

    /// Bound the expression text length
    pub fn with_maximum_expression_length(mut self, length: usize) -> Self {
        self.maximum_expression_length = length;
        self
    }

    /// Interpretations required before compiling, `None` when compilation is off
    pub(crate) fn compile_after(&self) -> Option<u32> {
        match self.compiler_mode {
            CompilerMode::Off => None,
            CompilerMode::Immediate => Some(1),
            CompilerMode::Mixed => Some(self.compile_threshold.max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = ParserConfig::from_json(r#"{"compiler_mode": "mixed", "compile_threshold": 5}"#).unwrap();
        assert_eq!(config.compiler_mode, CompilerMode::Mixed);
        assert_eq!(config.compile_after(), Some(5));
        assert_eq!(config.maximum_expression_length, 10_000);
        assert!(!config.auto_grow_collections);
    }
}
