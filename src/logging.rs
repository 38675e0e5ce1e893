//! Diagnostic logging
//!
//! `tracing` events go to stderr so that stub text written to stdout stays
//! clean. The level is controlled by `DEPSTUB_LOG` (same syntax as
//! `RUST_LOG`), or raised with `--verbose`.

use std::io;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the filter directives
pub const LOG_ENV: &str = "DEPSTUB_LOG";

/// Logging configuration for the CLI
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Explicit filter; takes precedence over the environment
    pub env_filter: Option<String>,
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter directives
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Filter for a verbosity count (`-v`, `-vv`)
    pub fn verbosity(verbose: u8) -> Self {
        match verbose {
            0 => Self::new(),
            1 => Self::new().with_env_filter("depstub=info"),
            _ => Self::new().with_env_filter("depstub=debug"),
        }
    }

    fn filter(&self) -> anyhow::Result<EnvFilter> {
        Ok(match &self.env_filter {
            Some(filter) => EnvFilter::try_new(filter)?,
            None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        })
    }
}

/// Install the global subscriber
///
/// # Errors
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(config.filter()?)
        .with(stderr_layer)
        .try_init()?;
    Ok(())
}
