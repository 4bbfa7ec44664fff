// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Configuration store
//!
//! A YAML mapping with deep merging and dotted-path access. Keys may
//! themselves contain the separator (`"h.i.j"`); lookups try an exact key
//! first and then each prefix split from left to right.

mod preset;

pub use preset::{parse_override, ConfigPreset};

use std::path::Path;

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::errors::{PipeflowError, PipeflowResult};

const DEFAULT_SEPARATOR: &str = ".";

/// Layered configuration for a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    store: Mapping,
    separator: String,
}

impl Configuration {
    pub fn new() -> Self {
        Self {
            store: Mapping::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    /// Build from a YAML value; `null` gives an empty configuration
    pub fn from_value(value: Value) -> PipeflowResult<Self> {
        let mut config = Self::new();
        config.update(&value)?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> PipeflowResult<Self> {
        let mut config = Self::new();
        config.load_str(yaml)?;
        Ok(config)
    }

    pub fn store(&self) -> &Mapping {
        &self.store
    }

    pub fn to_value(&self) -> Value {
        Value::Mapping(self.store.clone())
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Path separator for dotted keys. An empty separator disables nesting:
    /// every path is then a single top-level key.
    pub fn set_separator(&mut self, separator: impl Into<String>) {
        self.separator = separator.into();
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Deep merge `other` into this configuration; `other` wins
    pub fn update(&mut self, other: &Value) -> PipeflowResult<()> {
        match other {
            Value::Null => Ok(()),
            Value::Mapping(map) => {
                deep_merge(&mut self.store, map);
                Ok(())
            }
            _ => Err(PipeflowError::Yaml {
                message: "configuration must be a mapping at the top level".into(),
            }),
        }
    }

    /// Deep merge another configuration; `other` wins
    pub fn merge(&mut self, other: &Configuration) {
        deep_merge(&mut self.store, &other.store);
    }

    /// Deep merge `other` underneath this configuration; existing values win
    pub fn imerge(&mut self, other: &Value) -> PipeflowResult<()> {
        let mut base = Configuration::from_value(other.clone())?;
        base.merge(self);
        self.store = base.store;
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.store, path, &self.separator)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Deserialize the value at `path`
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> PipeflowResult<T> {
        let value = self.get(path).ok_or_else(|| PipeflowError::ConfigKey { key: path.into() })?;
        serde_yaml::from_value(value.clone()).map_err(Into::into)
    }

    /// Value at `path`, or `default` when missing or of the wrong type
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get_as(path).unwrap_or(default)
    }

    /// `true` only when the key exists and holds `true`
    pub fn flag(&self, path: &str) -> bool {
        matches!(self.get(path), Some(Value::Bool(true)))
    }

    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let separator = self.separator.clone();
        insert_path(&mut self.store, path, &separator, value.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let separator = self.separator.clone();
        remove_path(&mut self.store, path, &separator)
    }

    /// Merge a YAML file. An empty file changes nothing.
    pub fn load(&mut self, path: &Path) -> PipeflowResult<()> {
        let content = std::fs::read_to_string(path).map_err(|e| PipeflowError::ConfigRead {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        self.load_str(&content)
    }

    pub fn load_str(&mut self, yaml: &str) -> PipeflowResult<()> {
        if yaml.trim().is_empty() {
            return Ok(());
        }
        let value: Value = serde_yaml::from_str(yaml)?;
        self.update(&value)
    }

    /// Write the configuration as YAML, or JSON for `.json` paths
    pub fn save(&self, path: &Path) -> PipeflowResult<()> {
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::to_string_pretty(&self.store)?,
            _ => serde_yaml::to_string(&self.store)?,
        };
        std::fs::write(path, content).map_err(|e| PipeflowError::ConfigWrite {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    pub fn to_yaml(&self) -> PipeflowResult<String> {
        serde_yaml::to_string(&self.store).map_err(Into::into)
    }

    /// Flatten nested mappings into separator-joined keys
    pub fn flatten(&self) -> Mapping {
        let mut flat = Mapping::new();
        flatten_into(&self.store, "", &self.separator, &mut flat);
        flat
    }

    /// Inverse of [`Configuration::flatten`]
    pub fn expand(flat: &Mapping, separator: &str) -> Self {
        let mut config = Self::new();
        config.set_separator(separator);
        for (key, value) in flat {
            config.set(&key_string(key), value.clone());
        }
        config
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

fn deep_merge(target: &mut Mapping, source: &Mapping) {
    for (key, value) in source {
        if let (Some(Value::Mapping(existing)), Value::Mapping(incoming)) = (target.get_mut(key), value) {
            deep_merge(existing, incoming);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

fn lookup<'a>(map: &'a Mapping, path: &str, separator: &str) -> Option<&'a Value> {
    if let Some(value) = map.get(path) {
        return Some(value);
    }
    for i in split_points(path, separator) {
        if let Some(Value::Mapping(inner)) = map.get(&path[..i]) {
            if let Some(value) = lookup(inner, &path[i + separator.len()..], separator) {
                return Some(value);
            }
        }
    }
    None
}

fn insert_path(map: &mut Mapping, path: &str, separator: &str, value: Value) {
    if separator.is_empty() || !path.contains(separator) || map.contains_key(path) {
        map.insert(Value::String(path.to_string()), value);
        return;
    }

    // Prefer descending into an existing mapping; otherwise split at the first separator
    let split = split_points(path, separator)
        .into_iter()
        .find(|&i| matches!(map.get(&path[..i]), Some(Value::Mapping(_))));
    let Some(i) = split.or_else(|| path.find(separator)) else {
        return;
    };

    let key = Value::String(path[..i].to_string());
    if !matches!(map.get(&key), Some(Value::Mapping(_))) {
        map.insert(key.clone(), Value::Mapping(Mapping::new()));
    }
    if let Some(Value::Mapping(inner)) = map.get_mut(&key) {
        insert_path(inner, &path[i + separator.len()..], separator, value);
    }
}

fn remove_path(map: &mut Mapping, path: &str, separator: &str) -> Option<Value> {
    if map.contains_key(path) {
        return map.remove(path);
    }
    for i in split_points(path, separator) {
        if let Some(Value::Mapping(inner)) = map.get_mut(&path[..i]) {
            if let Some(value) = remove_path(inner, &path[i + separator.len()..], separator) {
                return Some(value);
            }
        }
    }
    None
}

/// Byte offsets of every separator in `path`
fn split_points(path: &str, separator: &str) -> Vec<usize> {
    if separator.is_empty() {
        return Vec::new();
    }
    path.match_indices(separator).map(|(i, _)| i).collect()
}

fn flatten_into(map: &Mapping, prefix: &str, separator: &str, out: &mut Mapping) {
    for (key, value) in map {
        let key = if prefix.is_empty() {
            key_string(key)
        } else {
            format!("{}{}{}", prefix, separator, key_string(key))
        };
        match value {
            Value::Mapping(inner) if !inner.is_empty() => flatten_into(inner, &key, separator, out),
            _ => {
                out.insert(Value::String(key), value.clone());
            }
        }
    }
}

fn key_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    fn dict_a() -> Value {
        yaml("Hi: {A: 1, B: 2, D: [1, 2], E: {F: G}}")
    }

    fn dict_b() -> Value {
        yaml("Hi: {A: 3, C: 4, D: [3, 4], E: {F: G}}")
    }

    fn dict_merged() -> Value {
        yaml("Hi: {A: 3, B: 2, C: 4, D: [3, 4], E: {F: G}}")
    }

    #[test]
    fn test_update_deep_merges() {
        let mut config = Configuration::from_value(dict_a()).unwrap();
        config.update(&dict_b()).unwrap();
        assert_eq!(config.to_value(), dict_merged());
    }

    #[test]
    fn test_imerge_keeps_existing() {
        let mut config = Configuration::from_value(dict_b()).unwrap();
        config.imerge(&dict_a()).unwrap();
        assert_eq!(config.to_value(), dict_merged());
    }

    #[test]
    fn test_update_rejects_scalar() {
        let mut config = Configuration::new();
        assert!(config.update(&Value::from(3)).is_err());
        assert!(config.update(&Value::Null).is_ok());
    }

    #[test]
    fn test_dotted_get() {
        let config = Configuration::from_yaml("g: {h.i.j: {k: 5}}\nc: {f: {}}").unwrap();
        assert_eq!(config.get("g.h.i.j.k"), Some(&Value::from(5)));
        assert_eq!(config.get("c.f"), Some(&Value::Mapping(Mapping::new())));
        assert_eq!(config.get("g.h"), None);
    }

    #[test]
    fn test_exact_key_wins() {
        let config = Configuration::from_yaml("z: {a.b: c, a: {b: d}}").unwrap();
        assert_eq!(config.get_as::<String>("z.a.b").unwrap(), "c");
        assert_eq!(config.get_as::<String>("z.a").ok(), None);
    }

    #[test]
    fn test_set_and_remove() {
        let mut config = Configuration::from_yaml("g: {h.i.j: {k: 5}}").unwrap();
        config.set("g.h", "a");
        assert_eq!(config.get_as::<String>("g.h").unwrap(), "a");

        config.set("System.DryRun", true);
        assert!(config.flag("System.DryRun"));
        assert!(!config.flag("System.ShowTree"));

        assert_eq!(config.remove("g.h.i.j.k"), Some(Value::from(5)));
        assert!(!config.contains("g.h.i.j.k"));
    }

    #[test]
    fn test_separator_change() {
        let mut config = Configuration::new();
        config.set_separator("-");
        config.set("A-B-C", 2);
        assert_eq!(config.get_as::<i64>("A-B-C").unwrap(), 2);

        config.update(&yaml("A: {B: {D: 3}}")).unwrap();
        assert_eq!(config.get_as::<i64>("A-B-D").unwrap(), 3);
        assert_eq!(config.get_as::<i64>("A-B-C").unwrap(), 2);
    }

    #[test]
    fn test_flatten_and_expand() {
        let config = Configuration::from_value(dict_merged()).unwrap();
        let flat = config.flatten();
        assert_eq!(flat.get("Hi.A"), Some(&Value::from(3)));
        assert_eq!(flat.get("Hi.E.F"), Some(&Value::from("G")));

        let expanded = Configuration::expand(&flat, ".");
        assert_eq!(expanded.to_value(), dict_merged());
    }

    #[test]
    fn test_missing_key_error() {
        let config = Configuration::new();
        let err = config.get_as::<bool>("System.DryRun").unwrap_err();
        assert!(matches!(err, PipeflowError::ConfigKey { .. }));
        assert!(!config.get_or("System.DryRun", false));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pipeline.yaml");

        let config = Configuration::from_value(dict_merged()).unwrap();
        config.save(&path).unwrap();

        let mut loaded = Configuration::new();
        loaded.load(&path).unwrap();
        assert_eq!(loaded, config);

        let json = temp.path().join("pipeline.json");
        config.save(&json).unwrap();
        let content = std::fs::read_to_string(json).unwrap();
        assert!(content.contains("\"Hi\""));
    }

    #[test]
    fn test_load_empty_file_keeps_values() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.yaml");
        std::fs::write(&path, "").unwrap();

        let mut config = Configuration::from_yaml("a: a").unwrap();
        config.load(&path).unwrap();
        assert_eq!(config.to_value(), yaml("a: a"));
    }

    #[test]
    fn test_load_missing_file() {
        let mut config = Configuration::new();
        let err = config.load(Path::new("/nonexistent/pipeflow.yaml")).unwrap_err();
        assert!(matches!(err, PipeflowError::ConfigRead { .. }));
    }

    #[test]
    fn test_empty_separator_disables_nesting() {
        let mut config = Configuration::new();
        config.set_separator("");
        config.set("Build.Jobs", 4);

        assert_eq!(config.get("Build.Jobs"), Some(&Value::from(4)));
        assert_eq!(config.to_value(), yaml("Build.Jobs: 4"));
        assert_eq!(config.remove("Build.Jobs"), Some(Value::from(4)));
        assert!(config.is_empty());
    }
}
