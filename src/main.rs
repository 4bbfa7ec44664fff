// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! pipeflow - reference pipeline host
//!
//! A small build-style pipeline showing how a host wires up pipes. Every
//! action only reports what it would do, so the binary is safe to run
//! anywhere.

use miette::Result;
use tracing::info;

use pipeflow::{Configuration, FailureKind, Pipe, PipeError, Pipeline};

fn fetch(config: &Configuration) -> Result<(), PipeError> {
    let source: String = config.get_or("Fetch.Source", "origin".to_string());
    info!("Fetching sources from {}", source);
    Ok(())
}

fn build(config: &Configuration) -> Result<(), PipeError> {
    let jobs: u32 = config.get_or("Build.Jobs", 1);
    let target: String = config.get_or("Build.Target", "debug".to_string());
    info!("Building {} with {} jobs", target, jobs);
    Ok(())
}

fn test(config: &Configuration) -> Result<(), PipeError> {
    if config.flag("Test.Fail") {
        return Err(PipeError::command("test suite reported failures"));
    }
    info!("All tests passed");
    Ok(())
}

fn main() -> Result<()> {
    pipeflow::utils::configure_colors();

    let mut pipeline = Pipeline::new("pipeflow")?
        .with_about("Reference pipeline host for pipeflow")
        .with_epilog("Configuration is read from pipeflow.yaml when present.")
        .with_config_file("pipeflow.yaml");

    pipeline.register_pipe(
        Pipe::builder("clean")
            .triggers("fetch")
            .help("Remove build output, then fetch again")
            .description("Cleaning build output")
            .optional(),
    )?;
    pipeline.register_pipe(
        Pipe::from_fn(fetch)
            .include()
            .help("Fetch sources")
            .description("Fetching sources"),
    )?;
    pipeline.register_pipe(
        Pipe::from_fn(build)
            .include()
            .depends_on("fetch")
            .help("Compile the project")
            .description("Compiling"),
    )?;
    pipeline.register_pipe(
        Pipe::from_fn(test)
            .include()
            .depends_on("build")
            .allow_failure(FailureKind::Command)
            .help("Run the test suite")
            .description("Testing"),
    )?;
    pipeline.register_pipe(
        Pipe::builder("package")
            .depends_on("build")
            .triggers("report")
            .help("Bundle the build output"),
    )?;
    pipeline.register_pipe(
        Pipe::builder("report")
            .hide_help()
            .description("Writing report")
            .action(|_| {
                info!("Report written");
                Ok(())
            }),
    )?;

    pipeline.script(std::env::args_os())?;
    Ok(())
}
