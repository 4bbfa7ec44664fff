// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Terminal color utilities
//!
//! Provides consistent styling for pipeline reports.

use colored::Colorize;
use std::time::Duration;

/// Check if colors should be disabled
pub fn should_use_colors() -> bool {
    // Respect NO_COLOR environment variable
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }

    console::Term::stdout().features().colors_supported()
}

/// Apply the color decision globally for `colored`
pub fn configure_colors() {
    colored::control::set_override(should_use_colors());
}

/// Print a styled header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "═".repeat(title.chars().count().max(40)));
}

/// Result line for a pipe that completed
pub fn success_line(name: &str, duration: Duration) -> String {
    format!(
        "  {} {} ({:.2}s)",
        "✓".green(),
        name.bold(),
        duration.as_secs_f64()
    )
}

/// Result line for a pipe whose failure was tolerated
pub fn tolerated_line(name: &str, reason: &str) -> String {
    format!("  {} {} {}", "⚠".yellow(), name.bold(), reason.dimmed())
}

/// Result line for a pipe that failed
pub fn failure_line(name: &str, reason: &str) -> String {
    format!("  {} {} failed: {}", "✗".red(), name.bold(), reason)
}

/// Line for a pipe that was scheduled but skipped
pub fn skipped_line(name: &str) -> String {
    format!("  {} {} (skipped)", "○".dimmed(), name.dimmed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_mention_pipe() {
        colored::control::set_override(false);
        assert_eq!(
            success_line("build", Duration::from_millis(1500)),
            "  ✓ build (1.50s)"
        );
        assert_eq!(failure_line("build", "exit 2"), "  ✗ build failed: exit 2");
        assert_eq!(skipped_line("lint"), "  ○ lint (skipped)");
    }
}
