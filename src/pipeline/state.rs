// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Milestone flag sets
//!
//! Pipes and pipelines track progress as a set of milestones rather than a
//! single current state: a pipe can be `included`, `primed` and `replaced`
//! all at once. Flags only ever get set, never cleared.

use std::fmt;
use std::marker::PhantomData;

/// A named milestone that can be stored in a [`Flags`] set
pub trait Milestone: Copy + fmt::Debug + 'static {
    /// Every milestone, in display order
    const ALL: &'static [Self];

    /// Bit position of this milestone
    fn bit(self) -> u16;

    /// Lowercase display name
    fn name(self) -> &'static str;
}

/// Monotonic set of milestones
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Flags<M: Milestone> {
    bits: u16,
    _marker: PhantomData<M>,
}

impl<M: Milestone> Flags<M> {
    pub fn new() -> Self {
        Self {
            bits: 0,
            _marker: PhantomData,
        }
    }

    /// Set a milestone. Returns `true` if it was not already set.
    pub fn set(&mut self, milestone: M) -> bool {
        let mask = 1 << milestone.bit();
        let fresh = self.bits & mask == 0;
        self.bits |= mask;
        fresh
    }

    pub fn contains(&self, milestone: M) -> bool {
        self.bits & (1 << milestone.bit()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Milestones currently set, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = M> + '_ {
        M::ALL.iter().copied().filter(|m| self.contains(*m))
    }
}

impl<M: Milestone> Default for Flags<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Milestone> fmt::Debug for Flags<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|m| m.name())).finish()
    }
}

/// Milestones reached by a single pipe during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipeFlag {
    /// Selected on the command line (or via an aggregate)
    Included,
    /// Visited by the resolver and scheduled
    Primed,
    /// Scheduled because another pipe triggers it
    Triggered,
    /// Cancelled by a pipe that replaces it
    Replaced,
    /// Explicitly skipped on the command line
    Excluded,
    Started,
    Excepted,
    Completed,
    Finished,
}

impl Milestone for PipeFlag {
    const ALL: &'static [Self] = &[
        Self::Included,
        Self::Primed,
        Self::Triggered,
        Self::Replaced,
        Self::Excluded,
        Self::Started,
        Self::Excepted,
        Self::Completed,
        Self::Finished,
    ];

    fn bit(self) -> u16 {
        self as u16
    }

    fn name(self) -> &'static str {
        match self {
            Self::Included => "included",
            Self::Primed => "primed",
            Self::Triggered => "triggered",
            Self::Replaced => "replaced",
            Self::Excluded => "excluded",
            Self::Started => "started",
            Self::Excepted => "excepted",
            Self::Completed => "completed",
            Self::Finished => "finished",
        }
    }
}

/// Phase progress of a whole pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineFlag {
    Initialized,
    Configured,
    Parsed,
    /// Registry is frozen; no further registration allowed
    Started,
    Running,
    Paused,
    Finished,
}

impl Milestone for PipelineFlag {
    const ALL: &'static [Self] = &[
        Self::Initialized,
        Self::Configured,
        Self::Parsed,
        Self::Started,
        Self::Running,
        Self::Paused,
        Self::Finished,
    ];

    fn bit(self) -> u16 {
        self as u16
    }

    fn name(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Configured => "configured",
            Self::Parsed => "parsed",
            Self::Started => "started",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }
}

pub type PipeFlags = Flags<PipeFlag>;
pub type PipelineFlags = Flags<PipelineFlag>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_coexist() {
        let mut flags = PipeFlags::new();
        assert!(flags.is_empty());

        assert!(flags.set(PipeFlag::Included));
        assert!(flags.set(PipeFlag::Primed));
        assert!(flags.set(PipeFlag::Replaced));

        assert!(flags.contains(PipeFlag::Included));
        assert!(flags.contains(PipeFlag::Primed));
        assert!(flags.contains(PipeFlag::Replaced));
        assert!(!flags.contains(PipeFlag::Triggered));
    }

    #[test]
    fn test_set_is_idempotent() {
        let mut flags = PipelineFlags::new();
        assert!(flags.set(PipelineFlag::Started));
        assert!(!flags.set(PipelineFlag::Started));
        assert!(flags.contains(PipelineFlag::Started));
    }

    #[test]
    fn test_iter_in_declaration_order() {
        let mut flags = PipeFlags::new();
        flags.set(PipeFlag::Finished);
        flags.set(PipeFlag::Started);
        let names: Vec<_> = flags.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["started", "finished"]);
        assert_eq!(format!("{:?}", flags), r#"{"started", "finished"}"#);
    }
}
