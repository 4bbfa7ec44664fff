// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Pipeline phases
//!
//! A [`Pipeline`] owns the registry, the configuration presets and the
//! configuration, and drives a run through its phases:
//!
//! 1. `init` registers the built-in presets and the `all`/`none` pipes
//! 2. `arguments` reads the command line
//! 3. `configure` builds the configuration
//! 4. `parse` marks selections and resolves the call list
//! 5. `execute` runs the call list, or prints a report instead
//!
//! [`Pipeline::script`] runs them all.

use std::ffi::OsString;
use std::path::PathBuf;

use serde_yaml::Value;
use tracing::{debug, warn};

use crate::cli::{self, CommandInfo, Invocation, RESERVED_OPTIONS};
use crate::config::{parse_override, ConfigPreset, Configuration};
use crate::errors::{PipeflowError, PipeflowResult};
use crate::logging;
use crate::pipeline::executor::{PipelineExecutor, PipelineResult, RunMode};
use crate::pipeline::registry::Registry;
use crate::pipeline::state::{PipeFlag, PipelineFlag, PipelineFlags};
use crate::pipeline::validation::PipelineValidator;
use crate::pipeline::{resolver, tree, Pipe, PipeBuilder};
use crate::status;

/// Name of the aggregate that depends on every `include` pipe
pub const ALL: &str = "all";
/// Name of the pipe that does nothing
pub const NONE: &str = "none";

/// Configuration keys read by the execute phase
pub mod keys {
    pub const DRY_RUN: &str = "System.DryRun";
    pub const SHOW_TREE: &str = "System.ShowTree";
    pub const LIST_PIPES: &str = "System.ListPipes";
}

/// A set of pipes plus everything needed to select and run them
pub struct Pipeline {
    info: CommandInfo,
    registry: Registry,
    presets: Vec<ConfigPreset>,
    config: Configuration,
    default_config_file: Option<PathBuf>,
    invocation: Invocation,
    flags: PipelineFlags,
    call: Option<Vec<String>>,
}

impl Pipeline {
    /// Create and initialize a pipeline
    pub fn new(name: impl Into<String>) -> PipeflowResult<Self> {
        let mut pipeline = Self {
            info: CommandInfo {
                name: name.into(),
                version: crate::VERSION.to_string(),
                about: None,
                epilog: None,
            },
            registry: Registry::new(),
            presets: Vec::new(),
            config: Configuration::new(),
            default_config_file: None,
            invocation: Invocation::default(),
            flags: PipelineFlags::new(),
            call: None,
        };
        pipeline.init()?;
        Ok(pipeline)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.info.version = version.into();
        self
    }

    /// Short description shown at the top of `--help`
    pub fn with_about(mut self, about: impl Into<String>) -> Self {
        self.info.about = Some(about.into());
        self
    }

    /// Text shown at the end of `--help`
    pub fn with_epilog(mut self, epilog: impl Into<String>) -> Self {
        self.info.epilog = Some(epilog.into());
        self
    }

    /// Configuration file loaded when `--config-file` is not given
    ///
    /// Skipped silently if it does not exist.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.default_config_file = Some(path.into());
        self
    }

    /// Register the built-in presets and aggregate pipes
    ///
    /// Called by [`Pipeline::new`]; calling it again is a no-op until the
    /// pipeline has started, after which it fails.
    pub fn init(&mut self) -> PipeflowResult<()> {
        self.ensure_not_started("built-in pipes")?;
        if self.flags.contains(PipelineFlag::Initialized) {
            return Ok(());
        }

        self.presets.push(
            ConfigPreset::new("dry-run", fragment(keys::DRY_RUN))
                .short('n')
                .help("Print the execution plan without running any pipe"),
        );
        self.presets.push(
            ConfigPreset::new("show-tree", fragment(keys::SHOW_TREE))
                .help("Print the dependency tree of the selected pipes"),
        );
        self.presets.push(
            ConfigPreset::new("list-pipes", fragment(keys::LIST_PIPES))
                .help("Print the names of all registered pipes"),
        );

        self.registry.insert(Pipe::aggregate(ALL, "Run all pipes")?)?;
        self.registry.insert(Pipe::aggregate(NONE, "Run no pipes")?)?;

        self.flags.set(PipelineFlag::Initialized);
        Ok(())
    }

    /// Register a pipe
    ///
    /// Fails once the pipeline has started resolving, for duplicate names and
    /// for invalid names. Pipes marked `include` become dependencies of `all`.
    pub fn register_pipe(&mut self, builder: PipeBuilder) -> PipeflowResult<()> {
        self.ensure_not_started("pipe")?;
        let pipe = builder.build()?;
        let name = pipe.name().to_string();
        let include = pipe.include();

        self.registry.insert(pipe)?;
        debug!(pipe = %name, "Registered pipe");

        if include {
            if let Some(all) = self.registry.get_mut(ALL) {
                all.dependencies.push(name);
            }
        }
        Ok(())
    }

    /// Register a configuration preset
    pub fn register_config(&mut self, preset: ConfigPreset) -> PipeflowResult<()> {
        self.ensure_not_started("configuration preset")?;

        let long_taken = RESERVED_OPTIONS.contains(&preset.long.as_str())
            || self.presets.iter().any(|p| p.long == preset.long);
        let short_taken = preset.short.is_some_and(|s| {
            matches!(s, 'c' | 'v' | 'q' | 'h' | 'V') || self.presets.iter().any(|p| p.short == Some(s))
        });
        if long_taken || short_taken {
            return Err(PipeflowError::DuplicateOption { flag: preset.long });
        }

        self.presets.push(preset);
        Ok(())
    }

    /// Set defaults directly, before `configure` layers presets and files on top
    pub fn configure_defaults(&mut self, defaults: &Value) -> PipeflowResult<()> {
        self.config.update(defaults)
    }

    /// Select a pipe as if `+name` had been given
    pub fn select(&mut self, name: impl Into<String>) {
        self.invocation.include.push(name.into());
    }

    /// Skip a pipe as if `-name` had been given
    pub fn exclude(&mut self, name: impl Into<String>) {
        self.invocation.exclude.push(name.into());
    }

    /// Read the command line; `args` starts with the program name
    pub fn arguments<I, T>(&mut self, args: I) -> PipeflowResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.ensure(PipelineFlag::Initialized, "arguments", "init")?;
        let invocation = cli::parse_invocation(&self.info, &self.registry, &self.presets, args)?;

        self.invocation.include.extend(invocation.include);
        self.invocation.exclude.extend(invocation.exclude);
        self.invocation.presets = invocation.presets;
        self.invocation.config_file = invocation.config_file;
        self.invocation.overrides = invocation.overrides;
        self.invocation.dump_config = invocation.dump_config;
        self.invocation.verbosity = invocation.verbosity;
        Ok(())
    }

    /// Verbosity requested on the command line
    pub fn verbosity(&self) -> i8 {
        self.invocation.verbosity
    }

    /// Build the configuration
    ///
    /// Layers, later winning: defaults, pre-configure presets, the
    /// configuration file, the remaining presets, `--configure` overrides.
    pub fn configure(&mut self) -> PipeflowResult<()> {
        self.ensure(PipelineFlag::Initialized, "configure", "init")?;

        for preset in self.given_presets(true) {
            debug!(preset = %preset.long, "Applying preset");
            self.config.update(&preset.fragment)?;
        }

        match (&self.invocation.config_file, &self.default_config_file) {
            (Some(path), _) => {
                status!(file = %path.display(), "Loading configuration");
                self.config.load(path)?;
            }
            (None, Some(path)) if path.exists() => {
                status!(file = %path.display(), "Loading configuration");
                self.config.load(path)?;
            }
            _ => {}
        }

        for preset in self.given_presets(false) {
            debug!(preset = %preset.long, "Applying preset");
            self.config.update(&preset.fragment)?;
        }

        for raw in &self.invocation.overrides {
            let (key, value) = parse_override(raw)?;
            debug!(key = %key, "Applying override");
            self.config.set(&key, value);
        }

        if let Some(path) = &self.invocation.dump_config {
            self.config.save(path)?;
            status!(file = %path.display(), "Wrote configuration");
        }

        self.flags.set(PipelineFlag::Configured);
        Ok(())
    }

    fn given_presets(&self, pre_configure: bool) -> Vec<ConfigPreset> {
        self.presets
            .iter()
            .filter(|p| p.pre_configure == pre_configure)
            .filter(|p| self.invocation.presets.contains(&p.long))
            .cloned()
            .collect()
    }

    /// Resolve the selections into the call list
    pub fn parse(&mut self) -> PipeflowResult<()> {
        self.ensure(PipelineFlag::Configured, "parse", "configure")?;

        let audit = PipelineValidator::validate(&self.registry);
        for warning in &audit.warnings {
            warn!("{}", warning);
        }

        for name in &self.invocation.exclude {
            match self.registry.get_mut(name) {
                Some(pipe) => pipe.set(PipeFlag::Excluded),
                None => warn!(pipe = %name, "Ignoring exclusion of unknown pipe"),
            }
        }

        self.resolve()?;
        self.flags.set(PipelineFlag::Parsed);
        Ok(())
    }

    /// Compute the call list; repeated calls return the first result
    pub fn resolve(&mut self) -> PipeflowResult<&[String]> {
        self.flags.set(PipelineFlag::Started);

        if self.call.is_none() {
            // `all` depends on pipes registered after it
            self.registry.move_to_end(ALL);
            let call = resolver::resolve(&mut self.registry, &self.invocation.include)?;

            for name in self.skipped() {
                warn!(pipe = %name, "Skipping excluded pipe that would have run");
            }

            debug!(call = ?call, "Resolved call list");
            self.call = Some(call);
        }

        Ok(self.call.as_deref().unwrap_or_default())
    }

    /// Run the call list, or print the report the configuration asks for
    pub fn execute(&mut self) -> PipeflowResult<PipelineResult> {
        self.ensure(PipelineFlag::Parsed, "execute", "parse")?;
        let call = self.call.clone().unwrap_or_default();

        if self.config.flag(keys::LIST_PIPES) {
            for name in self.registry.names() {
                println!("{}", name);
            }
            return Ok(PipelineResult::report_only(RunMode::ListPipes));
        }

        if self.config.flag(keys::SHOW_TREE) {
            for line in self.dependency_tree() {
                println!("{}", line);
            }
            return Ok(PipelineResult::report_only(RunMode::ShowTree));
        }

        if self.config.flag(keys::DRY_RUN) {
            PipelineExecutor::print_execution_plan(&self.info.name, &self.registry, &call);
            return Ok(PipelineResult::report_only(RunMode::DryRun));
        }

        status!(pipeline = %self.info.name, pipes = call.len(), "Starting pipeline");
        self.flags.set(PipelineFlag::Running);
        let result = PipelineExecutor::execute(&mut self.registry, &call, &self.config);
        self.flags.set(PipelineFlag::Finished);
        status!(pipeline = %self.info.name, "Pipeline finished");

        result
    }

    /// Run every phase against a command line
    pub fn script<I, T>(&mut self, args: I) -> PipeflowResult<PipelineResult>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.arguments(args)?;
        logging::init(self.invocation.verbosity);
        self.configure()?;
        self.parse()?;
        self.execute()
    }

    /// Excluded pipes that would otherwise have run, except optional ones
    pub fn skipped(&self) -> Vec<&str> {
        self.registry
            .iter()
            .filter(|p| p.has(PipeFlag::Excluded) && !p.has(PipeFlag::Replaced))
            .filter(|p| p.has(PipeFlag::Primed) || p.has(PipeFlag::Triggered))
            .filter(|p| !p.optional())
            .map(|p| p.name())
            .collect()
    }

    /// Pipes that began running
    pub fn attempted(&self) -> Vec<&str> {
        self.pipes_with_flag(PipeFlag::Started)
    }

    /// Pipes whose action returned successfully
    pub fn completed(&self) -> Vec<&str> {
        self.pipes_with_flag(PipeFlag::Completed)
    }

    pub fn pipes_with_flag(&self, flag: PipeFlag) -> Vec<&str> {
        self.registry.with_flag(flag)
    }

    /// Tree report for the resolved selections
    pub fn dependency_tree(&self) -> Vec<String> {
        tree::render(&self.registry)
    }

    /// The resolved call list, once `resolve` has succeeded
    pub fn call(&self) -> Option<&[String]> {
        self.call.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn pipe(&self, name: &str) -> Option<&Pipe> {
        self.registry.get(name)
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Configuration {
        &mut self.config
    }

    pub fn flags(&self) -> PipelineFlags {
        self.flags
    }

    fn ensure(&self, flag: PipelineFlag, phase: &'static str, requires: &'static str) -> PipeflowResult<()> {
        if self.flags.contains(flag) {
            Ok(())
        } else {
            Err(PipeflowError::PhaseOrder { phase, requires })
        }
    }

    fn ensure_not_started(&self, what: &str) -> PipeflowResult<()> {
        if self.flags.contains(PipelineFlag::Started) {
            Err(PipeflowError::RegistryStarted { what: what.into() })
        } else {
            Ok(())
        }
    }
}

/// `{Section: {Key: true}}` for a dotted key
fn fragment(path: &str) -> Value {
    let mut config = Configuration::new();
    config.set(path, true);
    config.to_value()
}
