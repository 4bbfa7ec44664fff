// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Pipeline executor
//!
//! Runs a resolved call list in order. A failure whose kind the pipe allows
//! is logged and skipped over; any other failure stops the run.

use std::time::{Duration, Instant};

use colored::Colorize;
use tracing::{debug, warn};

use crate::config::Configuration;
use crate::errors::{FailureKind, PipeflowError, PipeflowResult};
use crate::pipeline::registry::Registry;
use crate::pipeline::state::PipeFlag;
use crate::status;
use crate::utils::{create_spinner, failure_line, print_header, skipped_line, success_line, tolerated_line};

/// How a single pipe ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeStatus {
    Completed,
    /// Failed with a kind the pipe allows
    Tolerated { kind: FailureKind, message: String },
}

/// Outcome of one pipe in the call list
#[derive(Debug, Clone)]
pub struct PipeOutcome {
    pub name: String,
    pub status: PipeStatus,
    pub duration: Duration,
}

/// What the execute phase did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Pipes were run
    Executed,
    /// Execution plan printed only
    DryRun,
    /// Dependency tree printed only
    ShowTree,
    /// Registered pipe names printed only
    ListPipes,
}

/// Result of executing a pipeline
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub mode: RunMode,
    /// Outcomes in execution order
    pub outcomes: Vec<PipeOutcome>,
    /// Total execution time
    pub duration: Duration,
}

impl PipelineResult {
    pub(crate) fn report_only(mode: RunMode) -> Self {
        Self {
            mode,
            outcomes: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    /// Pipes whose failure was tolerated
    pub fn tolerated(&self) -> impl Iterator<Item = &PipeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, PipeStatus::Tolerated { .. }))
    }
}

/// Sequential pipe runner
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Run every pipe in `call`, in order
    pub fn execute(
        registry: &mut Registry,
        call: &[String],
        config: &Configuration,
    ) -> PipeflowResult<PipelineResult> {
        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(call.len());

        for name in dropped(registry) {
            println!("{}", skipped_line(name));
        }

        for name in call {
            let Some(pipe) = registry.get_mut(name) else {
                debug!(pipe = %name, "Scheduled pipe is not registered, skipping");
                continue;
            };

            let description = pipe.description();
            status!(pipe = %name, "{}", description);

            let spinner = create_spinner(&description);
            let result = pipe.run(config);
            spinner.finish_and_clear();
            let duration = pipe.elapsed();

            match result {
                Ok(()) => {
                    println!("{}", success_line(name, duration));
                    outcomes.push(PipeOutcome {
                        name: name.clone(),
                        status: PipeStatus::Completed,
                        duration,
                    });
                }
                Err(e) if pipe.allows(&e.kind) => {
                    warn!(pipe = %name, kind = %e.kind, "Tolerated failure: {}", e.message);
                    println!("{}", tolerated_line(name, &format!("({}: {})", e.kind, e.message)));
                    outcomes.push(PipeOutcome {
                        name: name.clone(),
                        status: PipeStatus::Tolerated {
                            kind: e.kind,
                            message: e.message,
                        },
                        duration,
                    });
                }
                Err(e) => {
                    println!("{}", failure_line(name, &e.message));
                    println!();
                    println!(
                        "{}",
                        format!("Pipeline failed after {:.2}s", start.elapsed().as_secs_f64()).red()
                    );
                    return Err(PipeflowError::PipeFailed {
                        pipe: name.clone(),
                        kind: e.kind,
                        message: e.message,
                    });
                }
            }
        }

        let duration = start.elapsed();

        println!();
        println!(
            "{}",
            format!("Pipeline completed successfully in {:.2}s", duration.as_secs_f64()).green()
        );

        Ok(PipelineResult {
            mode: RunMode::Executed,
            outcomes,
            duration,
        })
    }

    /// Print the execution plan
    pub fn print_execution_plan(title: &str, registry: &Registry, call: &[String]) {
        println!();
        print_header(&format!("Pipeline: {}", title));
        println!(
            "Execution plan ({} pipe{}):",
            call.len(),
            if call.len() == 1 { "" } else { "s" }
        );
        println!();

        for (i, name) in call.iter().enumerate() {
            print!("  {}. {}", i + 1, name.bold());

            if let Some(pipe) = registry.get(name) {
                let deps: Vec<&str> = pipe
                    .dependencies()
                    .iter()
                    .map(String::as_str)
                    .filter(|d| call.iter().any(|c| c == d))
                    .collect();
                if !deps.is_empty() {
                    print!(" {}", format!("[depends: {}]", deps.join(", ")).dimmed());
                }
                print!(" {}", pipe.description().dimmed());
            }

            println!();
        }

        println!();
    }
}

/// Scheduled pipes that were replaced or excluded
fn dropped(registry: &Registry) -> Vec<&str> {
    registry
        .iter()
        .filter(|p| p.has(PipeFlag::Primed) || p.has(PipeFlag::Triggered))
        .filter(|p| p.has(PipeFlag::Replaced) || p.has(PipeFlag::Excluded))
        .map(|p| p.name())
        .collect()
}
