// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Dependency tree report
//!
//! Renders the resolved graph rooted at every selected pipe. Dependencies are
//! drawn above the pipe that needed them and triggered pipes below it. A pipe
//! is expanded only under the pipe that scheduled it (its `parent`); any other
//! path gets a single collapsed line, which keeps diamonds finite.

use crate::pipeline::registry::Registry;
use crate::pipeline::resolver::call_list;
use crate::pipeline::state::PipeFlag;
use crate::pipeline::Pipe;

const INDENT: &str = "  ";
const NAME_WIDTH: usize = 30;

/// Render the tree for every selected pipe that is going to run
pub fn render(registry: &Registry) -> Vec<String> {
    call_list(registry)
        .iter()
        .filter_map(|name| registry.get(name))
        .filter(|p| p.has(PipeFlag::Included))
        .flat_map(|p| render_pipe(registry, p, 0, false))
        .collect()
}

/// Lines for one pipe and, unless it is a duplicate, its subtree
pub fn render_pipe(registry: &Registry, pipe: &Pipe, depth: usize, duplicate: bool) -> Vec<String> {
    let mut lines = Vec::new();

    if !duplicate {
        for dependency in registry.iter().filter(|p| pipe.dependencies.iter().any(|d| d == p.name())) {
            let collapsed = dependency.parent() != Some(pipe.name());
            lines.extend(render_pipe(registry, dependency, depth + 1, collapsed));
        }
    }

    let left = format!("{}{}{}", INDENT.repeat(depth), marker(pipe, duplicate), pipe.name());
    lines.push(format!("{:<width$}{}", left, pipe.description(), width = NAME_WIDTH));

    if !duplicate {
        for trigger in registry.iter().filter(|p| pipe.triggers.iter().any(|t| t == p.name())) {
            let collapsed = trigger.parent() != Some(pipe.name());
            lines.extend(render_pipe(registry, trigger, depth + 1, collapsed));
        }
    }

    lines
}

fn marker(pipe: &Pipe, duplicate: bool) -> &'static str {
    if pipe.has(PipeFlag::Replaced) || pipe.has(PipeFlag::Excluded) {
        "x "
    } else if pipe.has(PipeFlag::Triggered) && pipe.has(PipeFlag::Primed) {
        if duplicate {
            "└ "
        } else {
            "└>"
        }
    } else if pipe.has(PipeFlag::Included) {
        if duplicate {
            "- "
        } else {
            "+>"
        }
    } else if pipe.has(PipeFlag::Primed) {
        if duplicate {
            "┌ "
        } else {
            "┌>"
        }
    } else {
        "  "
    }
}
