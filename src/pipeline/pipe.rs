// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Pipe definitions
//!
//! A pipe is a single named, runnable step. Relationships to other pipes are
//! stored by name and only resolved against the registry when needed.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::Serialize;

use crate::config::Configuration;
use crate::errors::{FailureKind, PipeError, PipeflowError, PipeflowResult};
use crate::pipeline::state::{Milestone, PipeFlag, PipeFlags};

/// The work a pipe performs
pub type Action = Box<dyn FnMut(&Configuration) -> Result<(), PipeError>>;

/// Help text shown for a pipe on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Help {
    /// Generated help (`pipe <name>`)
    #[default]
    Default,
    Text(String),
    /// Hide the pipe from generated help entirely
    Suppressed,
}

/// A single pipeline step
pub struct Pipe {
    name: String,
    action: Action,
    pub(crate) dependencies: Vec<String>,
    pub(crate) triggers: Vec<String>,
    pub(crate) replaces: Vec<String>,
    include: bool,
    optional: bool,
    allowed_failures: HashSet<FailureKind>,
    help: Help,
    description: Option<String>,
    pub(crate) parent: Option<String>,
    pub(crate) flags: PipeFlags,
    started_at: Option<Instant>,
    duration: Option<Duration>,
}

impl Pipe {
    /// Start building a pipe with an explicit name
    pub fn builder(name: impl Into<String>) -> PipeBuilder {
        PipeBuilder::new(Some(name.into()))
    }

    /// Start building a pipe named after a function item
    ///
    /// `fn fetch_sources(..)` becomes the pipe `fetch_sources`. Closures have
    /// no usable name, so registering one built this way fails unless
    /// [`PipeBuilder::name`] is also called.
    pub fn from_fn<F>(action: F) -> PipeBuilder
    where
        F: FnMut(&Configuration) -> Result<(), PipeError> + 'static,
    {
        let name = derive_name::<F>();
        PipeBuilder::new(name).action(action)
    }

    /// A pipe that does nothing; used for aggregates like `all`
    pub(crate) fn aggregate(name: &str, description: &str) -> PipeflowResult<Self> {
        Self::builder(name)
            .help(description)
            .description(description)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Command-line form of the name (`fetch sources` → `fetch-sources`)
    pub fn arg(&self) -> String {
        arg_form(&self.name)
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    pub fn replaces(&self) -> &[String] {
        &self.replaces
    }

    /// Part of the default `all` aggregate
    pub fn include(&self) -> bool {
        self.include
    }

    pub fn optional(&self) -> bool {
        self.optional
    }

    pub fn allows(&self, kind: &FailureKind) -> bool {
        self.allowed_failures.contains(kind)
    }

    /// Pipe that caused this one to be scheduled
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn flags(&self) -> PipeFlags {
        self.flags
    }

    pub fn has(&self, flag: PipeFlag) -> bool {
        self.flags.contains(flag)
    }

    pub(crate) fn set(&mut self, flag: PipeFlag) {
        self.flags.set(flag);
    }

    /// Help string for generated usage, `None` when suppressed
    pub fn help(&self) -> Option<String> {
        match &self.help {
            Help::Default => Some(format!("pipe {}", self.name)),
            Help::Text(text) => Some(text.clone()),
            Help::Suppressed => None,
        }
    }

    pub fn description(&self) -> String {
        match &self.description {
            Some(desc) if !desc.is_empty() => desc.clone(),
            _ => format!("Running {}", self.name),
        }
    }

    /// Run the action, recording milestones
    ///
    /// `finished` is set on every path. Failures are handed back untouched;
    /// whether they are tolerated is the orchestrator's call.
    pub fn run(&mut self, config: &Configuration) -> Result<(), PipeError> {
        struct FinishGuard<'a> {
            flags: &'a mut PipeFlags,
            duration: &'a mut Option<Duration>,
            started_at: Instant,
        }

        impl Drop for FinishGuard<'_> {
            fn drop(&mut self) {
                *self.duration = Some(self.started_at.elapsed());
                self.flags.set(PipeFlag::Finished);
            }
        }

        let started_at = Instant::now();
        self.started_at = Some(started_at);

        let guard = FinishGuard {
            flags: &mut self.flags,
            duration: &mut self.duration,
            started_at,
        };
        guard.flags.set(PipeFlag::Started);

        let result = (self.action)(config);
        match &result {
            Ok(()) => guard.flags.set(PipeFlag::Completed),
            Err(_) => guard.flags.set(PipeFlag::Excepted),
        };
        drop(guard);

        result
    }

    /// Time spent running, or so far if still running
    pub fn elapsed(&self) -> Duration {
        match (self.duration, self.started_at) {
            (Some(duration), _) => duration,
            (None, Some(start)) => start.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    /// Snapshot of milestones and timing
    pub fn profile(&self) -> PipeProfile {
        PipeProfile {
            name: self.name.clone(),
            flags: self.flags.iter().map(|f| f.name()).collect(),
            parent: self.parent.clone(),
            seconds: self.elapsed().as_secs_f64(),
        }
    }
}

impl fmt::Debug for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipe")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("triggers", &self.triggers)
            .field("replaces", &self.replaces)
            .field("include", &self.include)
            .field("optional", &self.optional)
            .field("parent", &self.parent)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a pipe's progress
#[derive(Debug, Clone, Serialize)]
pub struct PipeProfile {
    pub name: String,
    pub flags: Vec<&'static str>,
    pub parent: Option<String>,
    pub seconds: f64,
}

/// Builder for [`Pipe`]
pub struct PipeBuilder {
    name: Option<String>,
    action: Option<Action>,
    dependencies: Vec<String>,
    triggers: Vec<String>,
    replaces: Vec<String>,
    include: bool,
    optional: bool,
    allowed_failures: HashSet<FailureKind>,
    help: Help,
    description: Option<String>,
}

impl PipeBuilder {
    fn new(name: Option<String>) -> Self {
        Self {
            name,
            action: None,
            dependencies: Vec::new(),
            triggers: Vec::new(),
            replaces: Vec::new(),
            include: false,
            optional: false,
            allowed_failures: HashSet::new(),
            help: Help::Default,
            description: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: FnMut(&Configuration) -> Result<(), PipeError> + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Pipe that must run before this one
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Pipe scheduled to run after this one whenever this one is scheduled
    pub fn triggers(mut self, name: impl Into<String>) -> Self {
        self.triggers.push(name.into());
        self
    }

    /// Pipe whose execution this one cancels
    pub fn replaces(mut self, name: impl Into<String>) -> Self {
        self.replaces.push(name.into());
        self
    }

    /// Include in the `all` aggregate
    pub fn include(mut self) -> Self {
        self.include = true;
        self
    }

    /// Skipping this pipe does not warrant a warning
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Failures of this kind are logged and the pipeline continues
    pub fn allow_failure(mut self, kind: FailureKind) -> Self {
        self.allowed_failures.insert(kind);
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Help::Text(help.into());
        self
    }

    pub fn hide_help(mut self) -> Self {
        self.help = Help::Suppressed;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn build(self) -> PipeflowResult<Pipe> {
        let name = self.name.ok_or_else(|| PipeflowError::InvalidPipeName {
            name: "<closure>".into(),
            reason: "closures cannot name a pipe; call .name(..) on the builder".into(),
        })?;
        validate_name(&name)?;

        Ok(Pipe {
            name,
            action: self.action.unwrap_or_else(|| Box::new(|_: &Configuration| Ok(()))),
            dependencies: self.dependencies,
            triggers: self.triggers,
            replaces: self.replaces,
            include: self.include,
            optional: self.optional,
            allowed_failures: self.allowed_failures,
            help: self.help,
            description: self.description,
            parent: None,
            flags: PipeFlags::new(),
            started_at: None,
            duration: None,
        })
    }
}

pub(crate) fn arg_form(name: &str) -> String {
    name.replace([' ', '_'], "-")
}

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_ -]*$").expect("Invalid pipe name pattern")
    })
}

fn validate_name(name: &str) -> PipeflowResult<()> {
    if name.chars().count() < 2 {
        return Err(PipeflowError::InvalidPipeName {
            name: name.into(),
            reason: "names need at least two characters so they cannot shadow short options".into(),
        });
    }
    if !name_pattern().is_match(name) {
        return Err(PipeflowError::InvalidPipeName {
            name: name.into(),
            reason: "use letters, digits, spaces, '_' or '-', starting with a letter or digit".into(),
        });
    }
    Ok(())
}

fn derive_name<F>() -> Option<String> {
    let path = std::any::type_name::<F>();
    if path.contains("{{closure}}") {
        return None;
    }
    path.rsplit("::").next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetch_sources(_: &Configuration) -> Result<(), PipeError> {
        Ok(())
    }

    #[test]
    fn test_name_from_fn_item() {
        let pipe = Pipe::from_fn(fetch_sources).build().unwrap();
        assert_eq!(pipe.name(), "fetch_sources");
        assert_eq!(pipe.arg(), "fetch-sources");
    }

    #[test]
    fn test_closure_needs_name() {
        let result = Pipe::from_fn(|_: &Configuration| Ok(())).build();
        assert!(matches!(result, Err(PipeflowError::InvalidPipeName { .. })));

        let pipe = Pipe::from_fn(|_: &Configuration| Ok(()))
            .name("named")
            .build()
            .unwrap();
        assert_eq!(pipe.name(), "named");
    }

    #[test]
    fn test_invalid_names() {
        assert!(Pipe::builder("n").build().is_err());
        assert!(Pipe::builder("+plus").build().is_err());
        assert!(Pipe::builder("-dash").build().is_err());
        assert!(Pipe::builder("two words").build().is_ok());
    }

    #[test]
    fn test_help_and_description_defaults() {
        let pipe = Pipe::builder("build").build().unwrap();
        assert_eq!(pipe.help().as_deref(), Some("pipe build"));
        assert_eq!(pipe.description(), "Running build");

        let pipe = Pipe::builder("build")
            .help("Compile it")
            .description("Compiling")
            .build()
            .unwrap();
        assert_eq!(pipe.help().as_deref(), Some("Compile it"));
        assert_eq!(pipe.description(), "Compiling");

        let pipe = Pipe::builder("secret").hide_help().build().unwrap();
        assert_eq!(pipe.help(), None);
    }

    #[test]
    fn test_run_success_sets_milestones() {
        let config = Configuration::new();
        let mut pipe = Pipe::builder("ok").build().unwrap();
        pipe.run(&config).unwrap();

        assert!(pipe.has(PipeFlag::Started));
        assert!(pipe.has(PipeFlag::Completed));
        assert!(pipe.has(PipeFlag::Finished));
        assert!(!pipe.has(PipeFlag::Excepted));
    }

    #[test]
    fn test_run_failure_still_finishes() {
        let config = Configuration::new();
        let mut pipe = Pipe::builder("broken")
            .action(|_: &Configuration| Err(PipeError::command("exit 2")))
            .build()
            .unwrap();

        let err = pipe.run(&config).unwrap_err();
        assert_eq!(err.kind, FailureKind::Command);
        assert!(pipe.has(PipeFlag::Started));
        assert!(pipe.has(PipeFlag::Excepted));
        assert!(pipe.has(PipeFlag::Finished));
        assert!(!pipe.has(PipeFlag::Completed));
    }

    #[test]
    fn test_profile() {
        let config = Configuration::new();
        let mut pipe = Pipe::builder("timed").build().unwrap();
        assert_eq!(pipe.elapsed(), Duration::ZERO);
        pipe.run(&config).unwrap();

        let profile = pipe.profile();
        assert_eq!(profile.name, "timed");
        assert_eq!(profile.flags, vec!["started", "completed", "finished"]);
    }
}
