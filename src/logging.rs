// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeflow contributors

//! Logging setup
//!
//! Pipelines log through `tracing`. Besides the usual levels there is a
//! "status" level for phase and pipe progress; it is an `info` event tagged
//! with `status = true` so subscribers can single it out.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Emit a status event (phase and pipe progress)
#[macro_export]
macro_rules! status {
    ($($arg:tt)+) => {
        ::tracing::info!(status = true, $($arg)+)
    };
}

/// Default filter directive for a verbosity count
///
/// Negative values quieten output, positive values add detail.
pub fn level_for(verbosity: i8) -> &'static str {
    match verbosity {
        i8::MIN..=-1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence when set.
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init(verbosity: i8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for_verbosity() {
        assert_eq!(level_for(-1), "warn");
        assert_eq!(level_for(0), "info");
        assert_eq!(level_for(1), "debug");
        assert_eq!(level_for(3), "trace");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init(0);
        init(1);
        crate::status!(phase = "test", "Status events compile");
    }
}
