// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! # pipeflow - Pipe Resolution Framework
//!
//! `pipeflow` turns a host program into a command-line pipeline runner. The
//! host registers named pipes, each declaring what it depends on, what it
//! triggers and what it replaces. Users pick pipes with `+name` (and skip
//! them with `-name`); pipeflow schedules everything the selection needs
//! and runs it in registration order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pipeflow::{Pipe, Pipeline};
//!
//! fn main() -> miette::Result<()> {
//!     let mut pipeline = Pipeline::new("builder")?;
//!     pipeline.register_pipe(Pipe::builder("fetch").include())?;
//!     pipeline.register_pipe(
//!         Pipe::builder("build")
//!             .include()
//!             .depends_on("fetch")
//!             .action(|config| {
//!                 let jobs: u32 = config.get_or("Build.Jobs", 1);
//!                 println!("building with {jobs} jobs");
//!                 Ok(())
//!             }),
//!     )?;
//!     pipeline.script(std::env::args_os())?;
//!     Ok(())
//! }
//! ```
//!
//! ```bash
//! builder +build            # fetch, then build
//! builder +all --dry-run    # print the plan for every included pipe
//! builder +all -fetch       # everything except fetch
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use config::{ConfigPreset, Configuration};
pub use errors::{FailureKind, PipeError, PipeflowError, PipeflowResult};
pub use pipeline::{Pipe, PipeBuilder, PipeFlag, Pipeline, PipelineResult, Registry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
