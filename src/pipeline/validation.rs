// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Registry validation
//!
//! Audits declared relationships before resolution. Problems found here are
//! host configuration slips, not ordering contradictions, so they come back
//! as warnings and the resolver simply ignores the dangling names.

use crate::pipeline::registry::Registry;

/// Registry validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate relationships declared by every registered pipe
    pub fn validate(registry: &Registry) -> ValidationResult {
        let mut result = ValidationResult::new();

        for pipe in registry {
            for dependency in pipe.dependencies() {
                if !registry.contains(dependency) {
                    result.add_warning(&format!(
                        "Pipe '{}' depends on unknown pipe '{}'",
                        pipe.name(),
                        dependency
                    ));
                }
            }

            for trigger in pipe.triggers() {
                if !registry.contains(trigger) {
                    result.add_warning(&format!(
                        "Pipe '{}' triggers unknown pipe '{}'",
                        pipe.name(),
                        trigger
                    ));
                }
            }

            for replaced in pipe.replaces() {
                if !registry.contains(replaced) {
                    result.add_warning(&format!(
                        "Pipe '{}' replaces unknown pipe '{}'",
                        pipe.name(),
                        replaced
                    ));
                } else if replaced == pipe.name() {
                    result.add_warning(&format!("Pipe '{}' replaces itself and will never run", pipe.name()));
                }
            }
        }

        result
    }
}

/// Result of registry validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
