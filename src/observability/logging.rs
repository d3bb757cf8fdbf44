//! # Logging
//!
//! `tracing` subscriber setup. `RUST_LOG` wins when set; otherwise the
//! configured `LOG_LEVEL` applies to this crate and `warn` to dependencies.

use crate::config::LogFormat;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Text => builder.try_init(),
    }
    .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}

fn default_filter(log_level: &str) -> EnvFilter {
    let level = log_level.trim().to_ascii_lowercase();
    EnvFilter::try_new(format!("warn,bucket_driver={level},s3_bucket_driver={level}"))
        .unwrap_or_else(|_| EnvFilter::new("warn,bucket_driver=info,s3_bucket_driver=info"))
}
