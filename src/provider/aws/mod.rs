//! # AWS Provider
//!
//! - `credentials`: the `account` credential object
//! - `auth`: SDK configuration from static credentials
//! - `s3`: bucket operations
//! - `elasticache`: Redis cache cluster operations
//! - `errors`: SDK error classification

pub mod auth;
pub mod credentials;
pub mod elasticache;
mod errors;
pub mod s3;

pub use auth::S3ClientSettings;
pub use credentials::AwsCredentials;
pub use elasticache::ElastiCacheProvider;
pub use s3::S3BucketProvider;

use crate::config::DriverConfig;
use crate::constants::DEFAULT_CACHE_SUBNET_GROUP;
use crate::provider::{BucketProvider, CacheClusterProvider, ProviderError, ProviderFactory};
use async_trait::async_trait;
use std::sync::Arc;

/// Builds AWS providers per request from the caller's credentials
#[derive(Debug, Clone)]
pub struct AwsProviderFactory {
    s3: S3ClientSettings,
    cache_subnet_group: String,
}

impl Default for AwsProviderFactory {
    fn default() -> Self {
        Self::new(S3ClientSettings::default(), DEFAULT_CACHE_SUBNET_GROUP)
    }
}

impl AwsProviderFactory {
    #[must_use]
    pub fn new(s3: S3ClientSettings, cache_subnet_group: impl Into<String>) -> Self {
        Self {
            s3,
            cache_subnet_group: cache_subnet_group.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &DriverConfig) -> Self {
        Self::new(
            S3ClientSettings::from_config(config),
            config.cache_subnet_group.clone(),
        )
    }
}

#[async_trait]
impl ProviderFactory for AwsProviderFactory {
    async fn connect(
        &self,
        region: &str,
        credentials: &AwsCredentials,
    ) -> Result<Arc<dyn BucketProvider>, ProviderError> {
        let sdk_config = auth::create_static_config(region, credentials).await;
        Ok(Arc::new(S3BucketProvider::new(
            auth::create_s3_client(&sdk_config, &self.s3),
            region,
        )))
    }

    async fn connect_cache(
        &self,
        region: &str,
        credentials: &AwsCredentials,
    ) -> Result<Arc<dyn CacheClusterProvider>, ProviderError> {
        let sdk_config = auth::create_static_config(region, credentials).await;
        Ok(Arc::new(ElastiCacheProvider::new(
            auth::create_elasticache_client(&sdk_config),
            region,
            self.cache_subnet_group.clone(),
        )))
    }
}
