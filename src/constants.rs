//! # Constants
//!
//! Shared constants used throughout the driver.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP port for the driver API, health checks and metrics
pub const DEFAULT_PORT: u16 = 8080;

/// Default timeout for a single provider call (seconds)
pub const DEFAULT_TIMEOUT_LIMIT_SECS: u64 = 300;

/// Region used when `driver_params.region` is absent
pub const DEFAULT_REGION: &str = "eu-west-1";

/// Prefix of derived bucket names
pub const DEFAULT_BUCKET_NAME_PREFIX: &str = "hd";

/// Longest accepted bucket name prefix
/// Leaves room for the hyphen and the 24 character identity digest (S3 limit is 63)
pub const MAX_BUCKET_NAME_PREFIX_LEN: usize = 30;

/// Number of hex characters of the identity digest used in derived bucket names
pub const BUCKET_DIGEST_HEX_LEN: usize = 24;

/// Prefix of derived ElastiCache cluster ids
/// `redis-` plus the digest stays within the 40 character id limit
pub const CACHE_CLUSTER_ID_PREFIX: &str = "redis";

/// Port every Redis cluster listens on
pub const REDIS_PORT: u16 = 6379;

/// Default delay between cache cluster status checks (milliseconds)
pub const DEFAULT_CACHE_POLL_INTERVAL_MS: u64 = 10_000;

/// Default ElastiCache subnet group for new clusters
pub const DEFAULT_CACHE_SUBNET_GROUP: &str = "default";

/// Days of automatic snapshots kept for new clusters
pub const CACHE_SNAPSHOT_RETENTION_DAYS: i32 = 7;

/// Default number of attempts for one provider call (first try included)
pub const DEFAULT_PROVIDER_MAX_ATTEMPTS: u32 = 3;

/// Default retry backoff starting value (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 200;

/// Default retry backoff maximum value (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 2_000;

/// Header carrying base64(JSON(driver_params)) on delete
pub const HEADER_DRIVER_PARAMS: &str = "humanitec-driver-params";

/// Header carrying base64(JSON(driver_secrets)) on delete
pub const HEADER_DRIVER_SECRETS: &str = "humanitec-driver-secrets";

/// Header carrying base64(JSON(account credentials)) on delete
pub const HEADER_DRIVER_ACCOUNT: &str = "humanitec-driver-account";

/// Driver type reported in the create response envelope
pub const DRIVER_TYPE: &str = "aws";
