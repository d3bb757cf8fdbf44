//! # Driver Configuration
//!
//! Process-wide settings. The driver keeps no per-resource state, so this is the
//! only configuration it ever holds.

use crate::constants::*;
use crate::driver::definition::{has_reserved_bucket_prefix, validate_region};
use std::time::Duration;
use thiserror::Error;

/// Which provider implementation backs the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderBackend {
    /// Real AWS S3 (or an S3-compatible endpoint)
    Aws,
    /// In-memory simulation of one provider account
    InMemory,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unable to set timeout limit to \"{0}\": must be a positive number of seconds")]
    InvalidTimeout(String),
    #[error("PROVIDER_MAX_ATTEMPTS must be at least 1")]
    NoAttempts,
    #[error("BACKOFF_START_MS ({start}) must not exceed BACKOFF_MAX_MS ({max})")]
    BackoffRange { start: u64, max: u64 },
    #[error("BUCKET_NAME_PREFIX \"{0}\" must be 1..=30 lowercase letters, digits or hyphens, starting with a letter or digit")]
    InvalidPrefix(String),
    #[error("BUCKET_NAME_PREFIX \"{0}\" would produce bucket names with a prefix reserved by S3")]
    ReservedPrefix(String),
    #[error("DEFAULT_REGION: {0}")]
    InvalidRegion(String),
    #[error("CACHE_POLL_INTERVAL_MS must be at least 1")]
    NoPollInterval,
    #[error("LOG_FORMAT \"{0}\" is not one of: text, json")]
    InvalidLogFormat(String),
}

/// Driver configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Listen port for the driver API
    pub port: u16,
    /// Timeout for a single provider call (seconds)
    pub timeout_limit_secs: u64,
    /// Provider implementation
    pub backend: ProviderBackend,
    /// Region used when `driver_params.region` is absent
    pub default_region: String,
    /// Prefix of derived bucket names
    pub bucket_name_prefix: String,
    /// Attempts per provider call, first try included
    pub provider_max_attempts: u32,
    /// Retry backoff starting value (milliseconds)
    pub backoff_start_ms: u64,
    /// Retry backoff maximum value (milliseconds)
    pub backoff_max_ms: u64,
    /// Delay between cache cluster status checks (milliseconds)
    pub cache_poll_interval_ms: u64,
    /// ElastiCache subnet group for new clusters
    pub cache_subnet_group: String,
    /// S3-compatible endpoint override
    pub s3_endpoint_url: Option<String>,
    /// Path-style addressing, needed by most S3-compatible endpoints
    pub s3_force_path_style: bool,
    /// Default log level when `RUST_LOG` is unset
    pub log_level: String,
    /// Log format
    pub log_format: LogFormat,
    /// Expose `/metrics`
    pub enable_metrics: bool,
    /// Raw `TIMEOUT_LIMIT` / `LOG_FORMAT` values that failed to parse, reported by `validate`
    invalid_timeout: Option<String>,
    invalid_log_format: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            timeout_limit_secs: DEFAULT_TIMEOUT_LIMIT_SECS,
            backend: ProviderBackend::Aws,
            default_region: DEFAULT_REGION.to_string(),
            bucket_name_prefix: DEFAULT_BUCKET_NAME_PREFIX.to_string(),
            provider_max_attempts: DEFAULT_PROVIDER_MAX_ATTEMPTS,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            cache_poll_interval_ms: DEFAULT_CACHE_POLL_INTERVAL_MS,
            cache_subnet_group: DEFAULT_CACHE_SUBNET_GROUP.to_string(),
            s3_endpoint_url: None,
            s3_force_path_style: false,
            log_level: "INFO".to_string(),
            log_format: LogFormat::Text,
            enable_metrics: true,
            invalid_timeout: None,
            invalid_log_format: None,
        }
    }
}

impl DriverConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `from_env` delegates here; tests pass a map instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("TIMEOUT_LIMIT").filter(|v| !v.is_empty()) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout_limit_secs = secs,
                _ => config.invalid_timeout = Some(raw),
            }
        }

        if let Some(raw) = lookup("LOG_FORMAT").filter(|v| !v.is_empty()) {
            match raw.to_lowercase().as_str() {
                "text" => config.log_format = LogFormat::Text,
                "json" => config.log_format = LogFormat::Json,
                _ => config.invalid_log_format = Some(raw),
            }
        }

        // Any non-empty value selects the in-memory provider
        if lookup("USE_FAKE_AWS_CLIENT").is_some_and(|v| !v.is_empty()) {
            config.backend = ProviderBackend::InMemory;
        }

        config.port = parsed_or_default(&lookup, "PORT", DEFAULT_PORT);
        config.default_region = string_or_default(&lookup, "DEFAULT_REGION", DEFAULT_REGION);
        config.bucket_name_prefix =
            string_or_default(&lookup, "BUCKET_NAME_PREFIX", DEFAULT_BUCKET_NAME_PREFIX);
        config.provider_max_attempts = parsed_or_default(
            &lookup,
            "PROVIDER_MAX_ATTEMPTS",
            DEFAULT_PROVIDER_MAX_ATTEMPTS,
        );
        config.backoff_start_ms =
            parsed_or_default(&lookup, "BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS);
        config.backoff_max_ms = parsed_or_default(&lookup, "BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS);
        config.cache_poll_interval_ms = parsed_or_default(
            &lookup,
            "CACHE_POLL_INTERVAL_MS",
            DEFAULT_CACHE_POLL_INTERVAL_MS,
        );
        config.cache_subnet_group =
            string_or_default(&lookup, "CACHE_SUBNET_GROUP", DEFAULT_CACHE_SUBNET_GROUP);
        config.s3_endpoint_url = lookup("S3_ENDPOINT_URL").filter(|v| !v.is_empty());
        config.s3_force_path_style = bool_or_default(&lookup, "S3_FORCE_PATH_STYLE", false);
        config.log_level = string_or_default(&lookup, "LOG_LEVEL", "INFO");
        config.enable_metrics = bool_or_default(&lookup, "ENABLE_METRICS", true);

        config
    }

    /// Reject values the driver cannot run with
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(raw) = &self.invalid_timeout {
            return Err(ConfigError::InvalidTimeout(raw.clone()));
        }
        if let Some(raw) = &self.invalid_log_format {
            return Err(ConfigError::InvalidLogFormat(raw.clone()));
        }
        if self.provider_max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        if self.backoff_start_ms > self.backoff_max_ms {
            return Err(ConfigError::BackoffRange {
                start: self.backoff_start_ms,
                max: self.backoff_max_ms,
            });
        }
        if self.cache_poll_interval_ms == 0 {
            return Err(ConfigError::NoPollInterval);
        }
        if !is_valid_prefix(&self.bucket_name_prefix) {
            return Err(ConfigError::InvalidPrefix(self.bucket_name_prefix.clone()));
        }
        if has_reserved_bucket_prefix(&format!("{}-", self.bucket_name_prefix)) {
            return Err(ConfigError::ReservedPrefix(self.bucket_name_prefix.clone()));
        }
        validate_region(&self.default_region).map_err(ConfigError::InvalidRegion)?;
        Ok(())
    }

    /// Get the provider call timeout
    pub fn timeout_limit(&self) -> Duration {
        Duration::from_secs(self.timeout_limit_secs)
    }

    /// Get backoff start duration
    pub fn backoff_start_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_start_ms)
    }

    /// Get backoff max duration
    pub fn backoff_max_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    /// Get the cache cluster status poll interval
    pub fn cache_poll_interval(&self) -> Duration {
        Duration::from_millis(self.cache_poll_interval_ms)
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty()
        && prefix.len() <= MAX_BUCKET_NAME_PREFIX_LEN
        && prefix
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !prefix.starts_with('-')
}

/// Read a value and parse it, or return default value
fn parsed_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a value as boolean or return default
fn bool_or_default<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read a value as string or return default
fn string_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> DriverConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        DriverConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = config_from(&[]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.timeout_limit_secs, 300);
        assert_eq!(config.backend, ProviderBackend::Aws);
        assert_eq!(config.default_region, "eu-west-1");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_fake_client_switch() {
        assert_eq!(
            config_from(&[("USE_FAKE_AWS_CLIENT", "1")]).backend,
            ProviderBackend::InMemory
        );
        assert_eq!(
            config_from(&[("USE_FAKE_AWS_CLIENT", "")]).backend,
            ProviderBackend::Aws
        );
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        for raw in ["0", "-5", "soon"] {
            let config = config_from(&[("TIMEOUT_LIMIT", raw)]);
            assert_eq!(
                config.validate(),
                Err(ConfigError::InvalidTimeout(raw.to_string())),
                "TIMEOUT_LIMIT={raw} should be rejected"
            );
        }
        let config = config_from(&[("TIMEOUT_LIMIT", "30")]);
        assert_eq!(config.timeout_limit(), Duration::from_secs(30));
    }

    #[test]
    fn test_prefix_validation() {
        assert!(config_from(&[("BUCKET_NAME_PREFIX", "team-a")]).validate().is_ok());
        let long = "x".repeat(31);
        for bad in ["Team", "-lead", "has_underscore", long.as_str()] {
            let config = config_from(&[("BUCKET_NAME_PREFIX", bad)]);
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidPrefix(_))),
                "prefix {bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_reserved_prefix_rejected() {
        for bad in ["sthree", "xn-", "amzn-s3-demo"] {
            let config = config_from(&[("BUCKET_NAME_PREFIX", bad)]);
            assert_eq!(
                config.validate(),
                Err(ConfigError::ReservedPrefix(bad.to_string())),
                "prefix {bad} should be rejected"
            );
        }
        assert!(config_from(&[("BUCKET_NAME_PREFIX", "xn")]).validate().is_ok());
        assert!(config_from(&[("BUCKET_NAME_PREFIX", "sthree3")]).validate().is_ok());
    }

    #[test]
    fn test_default_region_format() {
        assert!(config_from(&[("DEFAULT_REGION", "us-gov-west-1")]).validate().is_ok());
        let config = config_from(&[("DEFAULT_REGION", "not-a-region")]);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRegion(_))));
    }

    #[test]
    fn test_cache_settings() {
        let config = config_from(&[
            ("CACHE_POLL_INTERVAL_MS", "250"),
            ("CACHE_SUBNET_GROUP", "private-cache"),
        ]);
        assert_eq!(config.cache_poll_interval(), Duration::from_millis(250));
        assert_eq!(config.cache_subnet_group, "private-cache");

        let defaults = config_from(&[]);
        assert_eq!(defaults.cache_poll_interval_ms, 10_000);
        assert_eq!(defaults.cache_subnet_group, "default");

        let config = config_from(&[("CACHE_POLL_INTERVAL_MS", "0")]);
        assert_eq!(config.validate(), Err(ConfigError::NoPollInterval));
    }

    #[test]
    fn test_backoff_and_attempts() {
        let config = config_from(&[("BACKOFF_START_MS", "500"), ("BACKOFF_MAX_MS", "100")]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::BackoffRange { start: 500, max: 100 })
        );
        let config = config_from(&[("PROVIDER_MAX_ATTEMPTS", "0")]);
        assert_eq!(config.validate(), Err(ConfigError::NoAttempts));
    }

    #[test]
    fn test_log_format_and_flags() {
        let config = config_from(&[
            ("LOG_FORMAT", "JSON"),
            ("S3_FORCE_PATH_STYLE", "yes"),
            ("ENABLE_METRICS", "off"),
            ("S3_ENDPOINT_URL", "http://localhost:9000"),
        ]);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.s3_force_path_style);
        assert!(!config.enable_metrics);
        assert_eq!(config.s3_endpoint_url.as_deref(), Some("http://localhost:9000"));

        let config = config_from(&[("LOG_FORMAT", "xml")]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogFormat("xml".to_string()))
        );
    }
}
