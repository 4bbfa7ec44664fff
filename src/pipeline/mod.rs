// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Pipes, their resolution and the pipeline that runs them
//!
//! Registration order is the execution order. Dependencies must be
//! registered before the pipes that need them and triggered pipes after the
//! pipes that trigger them; the resolver enforces this instead of sorting.

mod executor;
mod orchestrator;
mod pipe;
mod registry;
pub mod resolver;
pub mod state;
pub mod tree;
mod validation;

pub use executor::{PipeOutcome, PipeStatus, PipelineExecutor, PipelineResult, RunMode};
pub use orchestrator::{keys, Pipeline, ALL, NONE};
pub use pipe::{Action, Help, Pipe, PipeBuilder, PipeProfile};
pub use registry::Registry;
pub use state::{Milestone, PipeFlag, PipeFlags, PipelineFlag, PipelineFlags};
pub use validation::{PipelineValidator, ValidationResult};
