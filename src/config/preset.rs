// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Configuration presets and command-line overrides

use serde_yaml::Value;

use crate::errors::{PipeflowError, PipeflowResult};

/// A configuration fragment applied when its flag is given
///
/// Presets provide alternative defaults. Pre-configure presets are merged
/// before the configuration file is loaded, so the file can override them;
/// the rest are merged after it.
#[derive(Debug, Clone)]
pub struct ConfigPreset {
    pub(crate) long: String,
    pub(crate) short: Option<char>,
    pub(crate) fragment: Value,
    pub(crate) help: Option<String>,
    pub(crate) pre_configure: bool,
}

impl ConfigPreset {
    /// Preset bound to `--<long>`
    pub fn new(long: impl Into<String>, fragment: Value) -> Self {
        Self {
            long: long.into(),
            short: None,
            fragment,
            help: None,
            pre_configure: false,
        }
    }

    /// Preset from a YAML snippet, e.g. `System: {DryRun: true}`
    pub fn from_yaml(long: impl Into<String>, yaml: &str) -> PipeflowResult<Self> {
        let fragment: Value = serde_yaml::from_str(yaml)?;
        Ok(Self::new(long, fragment))
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Help text; presets without help are hidden from usage
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Apply before the configuration file instead of after it
    pub fn pre_configure(mut self) -> Self {
        self.pre_configure = true;
        self
    }

    pub fn long(&self) -> &str {
        &self.long
    }

    pub fn fragment(&self) -> &Value {
        &self.fragment
    }

    pub fn is_pre_configure(&self) -> bool {
        self.pre_configure
    }
}

/// Parse a `Section.Key=value` override; the value is read as YAML
pub fn parse_override(raw: &str) -> PipeflowResult<(String, Value)> {
    let (key, value) = raw.split_once('=').ok_or_else(|| PipeflowError::InvalidOverride {
        value: raw.into(),
        reason: "missing '='".into(),
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(PipeflowError::InvalidOverride {
            value: raw.into(),
            reason: "empty key".into(),
        });
    }

    let value = if value.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(value).map_err(|e| PipeflowError::InvalidOverride {
            value: raw.into(),
            reason: e.to_string(),
        })?
    };

    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override_types() {
        let (key, value) = parse_override("System.DryRun=true").unwrap();
        assert_eq!(key, "System.DryRun");
        assert_eq!(value, Value::Bool(true));

        let (_, value) = parse_override("Build.Jobs=4").unwrap();
        assert_eq!(value, Value::from(4));

        let (_, value) = parse_override("Build.Target=release").unwrap();
        assert_eq!(value, Value::from("release"));

        let (_, value) = parse_override("Build.Flags=[a, b]").unwrap();
        assert!(value.is_sequence());
    }

    #[test]
    fn test_parse_override_errors() {
        assert!(matches!(
            parse_override("System.DryRun"),
            Err(PipeflowError::InvalidOverride { .. })
        ));
        assert!(matches!(parse_override("=1"), Err(PipeflowError::InvalidOverride { .. })));
    }

    #[test]
    fn test_preset_from_yaml() {
        let preset = ConfigPreset::from_yaml("dry-run", "System: {DryRun: true}")
            .unwrap()
            .short('n')
            .help("Resolve without running");
        assert_eq!(preset.long(), "dry-run");
        assert!(!preset.is_pre_configure());
        assert!(preset.fragment().is_mapping());
    }
}
