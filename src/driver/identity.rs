//! # Resource Identity
//!
//! Derives the bucket name (or cache cluster id) and region from `driver_params`
//! alone, so the delete path can recompute the identity from the same params
//! without stored state.
//!
//! - bucket with `bucket` present: used as-is
//! - bucket otherwise: `<prefix>-<hex(sha256(canonical params))[..24]>`
//! - cache cluster: `redis-<hex(sha256(canonical params))[..24]>`
//!
//! The region is defaulted into the params before hashing, so `{}` and
//! `{"region": "<default>"}` name the same bucket.

use crate::constants::{BUCKET_DIGEST_HEX_LEN, CACHE_CLUSTER_ID_PREFIX};
use crate::driver::definition::{RedisDriverParams, S3DriverParams};
use crate::driver::error::ValidationError;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

/// Resolved identity of one bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketIdentity {
    pub name: String,
    pub region: String,
}

/// Resolved identity of one ElastiCache cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheClusterIdentity {
    pub cluster_id: String,
    pub region: String,
}

/// Identity recomputed on delete, where the request carries no `type`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceIdentity {
    Bucket(BucketIdentity),
    CacheCluster(CacheClusterIdentity),
}

#[derive(Debug, Clone)]
pub struct IdentityDeriver {
    prefix: String,
    default_region: String,
}

impl IdentityDeriver {
    pub fn new(prefix: impl Into<String>, default_region: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            default_region: default_region.into(),
        }
    }

    /// Derive the identity for a set of `driver_params`
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when `region` or `bucket` is malformed.
    pub fn derive(&self, driver_params: &Map<String, Value>) -> Result<BucketIdentity, ValidationError> {
        let params = S3DriverParams::from_map(driver_params)?;
        Ok(self.derive_parsed(&params, driver_params))
    }

    /// Derive from params already validated by the definition parser
    #[must_use]
    pub fn derive_parsed(
        &self,
        params: &S3DriverParams,
        driver_params: &Map<String, Value>,
    ) -> BucketIdentity {
        let region = params
            .region
            .clone()
            .unwrap_or_else(|| self.default_region.clone());

        let name = match &params.bucket {
            Some(bucket) => bucket.clone(),
            None => format!("{}-{}", self.prefix, keyed_digest(driver_params, &region)),
        };

        BucketIdentity { name, region }
    }

    /// Derive the cache cluster identity from params already validated by the parser
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidField`] when `cache_az` is not a zone of
    /// the target region.
    pub fn derive_cluster(
        &self,
        params: &RedisDriverParams,
        driver_params: &Map<String, Value>,
    ) -> Result<CacheClusterIdentity, ValidationError> {
        let region = params
            .region
            .clone()
            .unwrap_or_else(|| self.default_region.clone());

        let in_region = params
            .cache_az
            .strip_prefix(region.as_str())
            .is_some_and(|zone| !zone.is_empty());
        if !in_region {
            return Err(ValidationError::InvalidField {
                field: "driver_params.cache_az".to_string(),
                reason: format!(
                    "\"{}\" is not an availability zone of region \"{region}\"",
                    params.cache_az
                ),
            });
        }

        Ok(CacheClusterIdentity {
            cluster_id: format!(
                "{CACHE_CLUSTER_ID_PREFIX}-{}",
                keyed_digest(driver_params, &region)
            ),
            region,
        })
    }

    /// Derive the identity of whatever `driver_params` describe
    ///
    /// Params carrying `cache_node_type` or `cache_az` name a cache cluster;
    /// anything else names a bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the params are malformed.
    pub fn derive_any(
        &self,
        driver_params: &Map<String, Value>,
    ) -> Result<ResourceIdentity, ValidationError> {
        if RedisDriverParams::describes_cache_cluster(driver_params) {
            let params = RedisDriverParams::from_map(driver_params)?;
            self.derive_cluster(&params, driver_params)
                .map(ResourceIdentity::CacheCluster)
        } else {
            self.derive(driver_params).map(ResourceIdentity::Bucket)
        }
    }

    /// Params implied by the account-only delete variant
    #[must_use]
    pub fn account_only_params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert(
            "region".to_string(),
            Value::String(self.default_region.clone()),
        );
        params
    }
}

/// Digest of `driver_params` with the effective region filled in
fn keyed_digest(driver_params: &Map<String, Value>, region: &str) -> String {
    let mut keyed = driver_params.clone();
    keyed.insert("region".to_string(), Value::String(region.to_string()));
    digest_hex(&Value::Object(keyed))
}

/// Truncated hex sha256 of the canonical JSON form
fn digest_hex(value: &Value) -> String {
    let digest = Sha256::digest(canonical_json(value).as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(hex, "{byte:02x}");
    }
    hex.truncate(BUCKET_DIGEST_HEX_LEN);
    hex
}

/// Compact JSON with object keys sorted at every depth
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    sorted(value).to_string()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
