// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Ordered pipe registry
//!
//! Registration order is the single total order used both for execution and
//! for deciding whether a relationship is legal, so the registry is a plain
//! vector with a name index on the side.

use std::collections::HashMap;

use crate::errors::{PipeflowError, PipeflowResult};
use crate::pipeline::pipe::{arg_form, Pipe};
use crate::pipeline::state::PipeFlag;

/// Pipes in registration order, addressable by name
#[derive(Debug, Default)]
pub struct Registry {
    pipes: Vec<Pipe>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pipe; names are unique for the registry's lifetime
    pub fn insert(&mut self, pipe: Pipe) -> PipeflowResult<usize> {
        if self.index.contains_key(pipe.name()) {
            return Err(PipeflowError::DuplicatePipe {
                name: pipe.name().to_string(),
            });
        }
        let position = self.pipes.len();
        self.index.insert(pipe.name().to_string(), position);
        self.pipes.push(pipe);
        Ok(position)
    }

    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Pipe> {
        self.position(name).map(|i| &self.pipes[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Pipe> {
        self.position(name).map(move |i| &mut self.pipes[i])
    }

    /// Look a pipe up by its command-line form (`fetch-sources`)
    pub fn find_arg(&self, arg: &str) -> Option<&Pipe> {
        self.get(arg)
            .or_else(|| self.pipes.iter().find(|p| p.arg() == arg_form(arg)))
    }

    pub fn at(&self, position: usize) -> &Pipe {
        &self.pipes[position]
    }

    pub fn at_mut(&mut self, position: usize) -> &mut Pipe {
        &mut self.pipes[position]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pipe> {
        self.pipes.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.pipes.iter().map(|p| p.name()).collect()
    }

    /// Names of pipes carrying the given milestone, in registration order
    pub fn with_flag(&self, flag: PipeFlag) -> Vec<&str> {
        self.pipes
            .iter()
            .filter(|p| p.has(flag))
            .map(|p| p.name())
            .collect()
    }

    /// Move a pipe to the end of the order
    pub fn move_to_end(&mut self, name: &str) -> bool {
        let Some(position) = self.position(name) else {
            return false;
        };
        let pipe = self.pipes.remove(position);
        self.pipes.push(pipe);
        self.reindex();
        true
    }

    fn reindex(&mut self) {
        self.index = self
            .pipes
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name().to_string(), i))
            .collect();
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Pipe;
    type IntoIter = std::slice::Iter<'a, Pipe>;

    fn into_iter(self) -> Self::IntoIter {
        self.pipes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(names: &[&str]) -> Registry {
        let mut registry = Registry::new();
        for name in names {
            registry.insert(Pipe::builder(*name).build().unwrap()).unwrap();
        }
        registry
    }

    #[test]
    fn test_insert_preserves_order() {
        let registry = registry(&["fetch", "build", "test"]);
        assert_eq!(registry.names(), vec!["fetch", "build", "test"]);
        assert_eq!(registry.position("build"), Some(1));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = registry(&["fetch"]);
        let result = registry.insert(Pipe::builder("fetch").build().unwrap());
        assert!(matches!(result, Err(PipeflowError::DuplicatePipe { name }) if name == "fetch"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_move_to_end_reindexes() {
        let mut registry = registry(&["all", "fetch", "build"]);
        assert!(registry.move_to_end("all"));
        assert_eq!(registry.names(), vec!["fetch", "build", "all"]);
        assert_eq!(registry.position("all"), Some(2));
        assert_eq!(registry.position("fetch"), Some(0));
        assert!(!registry.move_to_end("missing"));
    }

    #[test]
    fn test_find_arg() {
        let registry = registry(&["fetch_sources", "build docs"]);
        assert_eq!(registry.find_arg("fetch-sources").unwrap().name(), "fetch_sources");
        assert_eq!(registry.find_arg("build-docs").unwrap().name(), "build docs");
        assert!(registry.find_arg("nope").is_none());
    }
}
