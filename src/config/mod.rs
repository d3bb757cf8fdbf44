//! # Configuration
//!
//! Driver-level settings loaded from environment variables.

mod driver;

pub use driver::{ConfigError, DriverConfig, LogFormat, ProviderBackend};
