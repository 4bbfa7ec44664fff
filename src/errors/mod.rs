// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Error types
//!
//! Two layers of failure live here. [`PipeflowError`] covers everything the
//! framework itself can reject: bad registrations, contradictory ordering,
//! phases called out of sequence, configuration problems. [`PipeError`] is
//! what a pipe's action returns; its [`FailureKind`] decides whether the
//! orchestrator tolerates it.

use miette::Diagnostic;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeflow operations
pub type PipeflowResult<T> = Result<T, PipeflowError>;

/// Main error type for pipeflow
#[derive(Error, Debug, Diagnostic)]
pub enum PipeflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Registration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Cannot have duplicate pipe named '{name}'")]
    #[diagnostic(
        code(pipeflow::duplicate_pipe),
        help("Each pipe name must be unique within a pipeline; rename one of them")
    )]
    DuplicatePipe { name: String },

    #[error("Cannot add {what} to the pipeline, it has already started")]
    #[diagnostic(
        code(pipeflow::registry_started),
        help("Register pipes and configuration presets before the pipeline is parsed")
    )]
    RegistryStarted { what: String },

    #[error("Invalid pipe name '{name}': {reason}")]
    #[diagnostic(code(pipeflow::invalid_pipe_name))]
    InvalidPipeName { name: String, reason: String },

    #[error("Option '--{flag}' is already registered")]
    #[diagnostic(code(pipeflow::duplicate_option))]
    DuplicateOption { flag: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Ordering Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipe {pipe} cannot depend on pipe {dependency} because {pipe} must run before {dependency}")]
    #[diagnostic(
        code(pipeflow::dependency_order),
        help("Register '{dependency}' before '{pipe}'; dependencies must be registered earlier than their dependents")
    )]
    DependencyOrder { pipe: String, dependency: String },

    #[error("Pipe {pipe} cannot trigger pipe {trigger} because {pipe} must run after {trigger}")]
    #[diagnostic(
        code(pipeflow::trigger_order),
        help("Register '{trigger}' after '{pipe}'; triggered pipes must be registered later than the pipe that triggers them")
    )]
    TriggerOrder { pipe: String, trigger: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Cannot run phase '{phase}' before '{requires}'")]
    #[diagnostic(code(pipeflow::phase_order))]
    PhaseOrder {
        phase: &'static str,
        requires: &'static str,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Execution Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipe '{pipe}' failed ({kind}): {message}")]
    #[diagnostic(
        code(pipeflow::pipe_failed),
        help("Add '{kind}' to the pipe's allowed failures if the pipeline should continue past it")
    )]
    PipeFailed {
        pipe: String,
        kind: FailureKind,
        message: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read configuration '{path}': {error}")]
    #[diagnostic(code(pipeflow::config_read))]
    ConfigRead { path: PathBuf, error: String },

    #[error("Failed to write configuration '{path}': {error}")]
    #[diagnostic(code(pipeflow::config_write))]
    ConfigWrite { path: PathBuf, error: String },

    #[error("Configuration key not found: {key}")]
    #[diagnostic(code(pipeflow::config_key))]
    ConfigKey { key: String },

    #[error("Invalid configuration override '{value}': {reason}")]
    #[diagnostic(
        code(pipeflow::invalid_override),
        help("Overrides take the form --configure Section.Key=value")
    )]
    InvalidOverride { value: String, reason: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(pipeflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON error: {message}")]
    #[diagnostic(code(pipeflow::json_error))]
    Json { message: String },

    // ─────────────────────────────────────────────────────────────────────────
    // CLI/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(pipeflow::arguments))]
    Arguments { message: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(pipeflow::io_error))]
    Io { message: String },
}

impl From<std::io::Error> for PipeflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for PipeflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for PipeflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl PipeflowError {
    /// Whether this error came from a contradictory relationship declaration
    pub fn is_ordering(&self) -> bool {
        matches!(self, Self::DependencyOrder { .. } | Self::TriggerOrder { .. })
    }

    /// Whether this error was raised while registering pipes or presets
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            Self::DuplicatePipe { .. }
                | Self::RegistryStarted { .. }
                | Self::InvalidPipeName { .. }
                | Self::DuplicateOption { .. }
        )
    }
}

/// Category of a pipe failure, matched against a pipe's allowed failures
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Filesystem or other IO problem
    Io,
    /// Missing or malformed configuration
    Config,
    /// An external command exited unsuccessfully
    Command,
    /// The pipe was interrupted before it could finish
    Interrupted,
    /// Host-defined category
    Other(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "io"),
            Self::Config => write!(f, "config"),
            Self::Command => write!(f, "command"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// Failure raised by a pipe's action
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PipeError {
    pub kind: FailureKind,
    pub message: String,
}

impl PipeError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure of a host-defined kind
    pub fn other(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Other(kind.into()), message)
    }

    pub fn command(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Command, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Config, message)
    }
}

impl From<std::io::Error> for PipeError {
    fn from(e: std::io::Error) -> Self {
        let kind = if e.kind() == std::io::ErrorKind::Interrupted {
            FailureKind::Interrupted
        } else {
            FailureKind::Io
        };
        Self::new(kind, e.to_string())
    }
}

impl From<PipeflowError> for PipeError {
    fn from(e: PipeflowError) -> Self {
        match e {
            PipeflowError::ConfigKey { .. }
            | PipeflowError::ConfigRead { .. }
            | PipeflowError::Yaml { .. } => Self::config(e.to_string()),
            PipeflowError::Io { message } => Self::new(FailureKind::Io, message),
            other => Self::other("pipeflow", other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_messages_name_both_pipes() {
        let err = PipeflowError::DependencyOrder {
            pipe: "fetch".into(),
            dependency: "build".into(),
        };
        assert!(err.is_ordering());
        assert_eq!(
            err.to_string(),
            "Pipe fetch cannot depend on pipe build because fetch must run before build"
        );

        let err = PipeflowError::TriggerOrder {
            pipe: "clean".into(),
            trigger: "build".into(),
        };
        assert!(err.is_ordering());
        assert!(err.to_string().contains("must run after build"));
    }

    #[test]
    fn test_io_error_kinds() {
        let err: PipeError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.kind, FailureKind::Io);

        let err: PipeError = std::io::Error::new(std::io::ErrorKind::Interrupted, "stop").into();
        assert_eq!(err.kind, FailureKind::Interrupted);
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Command.to_string(), "command");
        assert_eq!(FailureKind::Other("network".into()).to_string(), "network");
    }
}
