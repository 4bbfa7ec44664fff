// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Pipe resolution
//!
//! Turns the registry plus the user's selections into the ordered list of
//! pipes to run. No topological sort happens here: dependencies may only
//! point at pipes registered earlier and triggers only at pipes registered
//! later, so registration order already is a valid execution order. The
//! resolver checks that constraint, marks which pipes are scheduled, and then
//! reads the schedule off the registry front to back.

use tracing::{debug, warn};

use crate::errors::{PipeflowError, PipeflowResult};
use crate::pipeline::registry::Registry;
use crate::pipeline::state::PipeFlag;

/// Resolve the selected pipes into an ordered call list
///
/// Every selected pipe is marked `included`, every included pipe is resolved
/// in registration order, and the result is every `primed` or `triggered`
/// pipe that was not replaced or excluded, in registration order. Any
/// ordering violation aborts the whole resolution.
pub fn resolve<S: AsRef<str>>(registry: &mut Registry, selected: &[S]) -> PipeflowResult<Vec<String>> {
    for name in selected {
        let name = name.as_ref();
        match registry.get_mut(name) {
            Some(pipe) => pipe.set(PipeFlag::Included),
            None => warn!(pipe = name, "Ignoring selection of unknown pipe"),
        }
    }

    for position in 0..registry.len() {
        let pipe = registry.at(position);
        if pipe.has(PipeFlag::Included) && !pipe.has(PipeFlag::Primed) {
            resolve_pipe(registry, position)?;
        }
    }

    Ok(call_list(registry))
}

/// Pipes scheduled to run, in registration order
pub fn call_list(registry: &Registry) -> Vec<String> {
    registry
        .iter()
        .filter(|p| p.has(PipeFlag::Primed) || p.has(PipeFlag::Triggered))
        .filter(|p| !p.has(PipeFlag::Replaced) && !p.has(PipeFlag::Excluded))
        .map(|p| p.name().to_string())
        .collect()
}

fn resolve_pipe(registry: &mut Registry, position: usize) -> PipeflowResult<()> {
    if registry.at(position).has(PipeFlag::Primed) {
        return Ok(());
    }

    resolve_dependencies(registry, position)?;
    registry.at_mut(position).set(PipeFlag::Primed);
    debug!(pipe = registry.at(position).name(), "Primed");
    resolve_triggers(registry, position)?;
    resolve_replacements(registry, position);

    Ok(())
}

/// Walk the registry back to front. Until the walk reaches the pipe itself,
/// any dependency found was registered later (or is the pipe), which is an
/// ordering error.
fn resolve_dependencies(registry: &mut Registry, position: usize) -> PipeflowResult<()> {
    let name = registry.at(position).name().to_string();
    let dependencies = registry.at(position).dependencies.clone();
    if dependencies.is_empty() {
        return Ok(());
    }

    let mut passed = false;
    for candidate in (0..registry.len()).rev() {
        let target = registry.at(candidate);
        if dependencies.iter().any(|d| d == target.name()) && !target.has(PipeFlag::Primed) {
            if !passed {
                return Err(PipeflowError::DependencyOrder {
                    pipe: name,
                    dependency: target.name().to_string(),
                });
            }
            registry.at_mut(candidate).parent = Some(name.clone());
            resolve_pipe(registry, candidate)?;
        }
        if candidate == position {
            passed = true;
        }
    }

    Ok(())
}

/// Walk the registry front to back. Until the walk passes the pipe itself,
/// any trigger target found was registered earlier, which is an ordering
/// error. Targets the user selected explicitly are left to their own
/// resolution.
fn resolve_triggers(registry: &mut Registry, position: usize) -> PipeflowResult<()> {
    let name = registry.at(position).name().to_string();
    let triggers = registry.at(position).triggers.clone();
    if triggers.is_empty() {
        return Ok(());
    }

    let mut passed = false;
    for candidate in 0..registry.len() {
        let target = registry.at(candidate);
        if triggers.iter().any(|t| t == target.name())
            && !target.has(PipeFlag::Primed)
            && !target.has(PipeFlag::Included)
        {
            if !passed {
                return Err(PipeflowError::TriggerOrder {
                    pipe: name,
                    trigger: target.name().to_string(),
                });
            }
            let target = registry.at_mut(candidate);
            target.parent = Some(name.clone());
            target.set(PipeFlag::Triggered);
            resolve_pipe(registry, candidate)?;
        }
        if candidate == position {
            passed = true;
        }
    }

    Ok(())
}

fn resolve_replacements(registry: &mut Registry, position: usize) {
    let replaces = registry.at(position).replaces.clone();
    for name in &replaces {
        if let Some(target) = registry.get_mut(name) {
            target.set(PipeFlag::Replaced);
        }
    }
}
