// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Utility modules
//!
//! Terminal helpers shared by the pipeline reports.

pub mod colors;
pub mod spinner;

pub use colors::*;
pub use spinner::*;
