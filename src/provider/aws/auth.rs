//! # AWS SDK Configuration
//!
//! Builds the S3 and ElastiCache clients for one request from the caller's
//! static credentials. The ambient credential chain (env, profile, IMDS) is never
//! consulted: the driver acts only with the account it was handed.
//!
//! SDK-level retries are disabled. The provisioning engine owns the retry loop,
//! so `PROVIDER_MAX_ATTEMPTS` is the number of requests a call can make.

use crate::config::DriverConfig;
use crate::provider::aws::AwsCredentials;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::debug;

/// Source name attached to credentials built from `driver_secrets`
const CREDENTIALS_SOURCE: &str = "driver-secrets";

/// Endpoint settings shared by every S3 client the driver builds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct S3ClientSettings {
    /// S3-compatible endpoint (MinIO, localstack); AWS when unset
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl S3ClientSettings {
    #[must_use]
    pub fn from_config(config: &DriverConfig) -> Self {
        Self {
            endpoint_url: config.s3_endpoint_url.clone(),
            force_path_style: config.s3_force_path_style,
        }
    }
}

/// Create AWS SDK config with static credentials and no SDK retries
pub async fn create_static_config(region: &str, credentials: &AwsCredentials) -> SdkConfig {
    let static_credentials = aws_credential_types::Credentials::new(
        credentials.aws_access_key_id.clone(),
        credentials.aws_secret_access_key.clone(),
        credentials.aws_session_token.clone(),
        None,
        CREDENTIALS_SOURCE,
    );

    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .credentials_provider(static_credentials)
        .retry_config(RetryConfig::disabled())
        .load()
        .await
}

/// Create an S3 client from a loaded config; the endpoint override applies here only
pub fn create_s3_client(sdk_config: &SdkConfig, settings: &S3ClientSettings) -> aws_sdk_s3::Client {
    let mut s3_builder = aws_sdk_s3::config::Builder::from(sdk_config);
    if let Some(endpoint) = &settings.endpoint_url {
        debug!(endpoint = %endpoint, "Using S3 endpoint override");
        s3_builder = s3_builder.endpoint_url(endpoint);
    }
    if settings.force_path_style {
        s3_builder = s3_builder.force_path_style(true);
    }
    aws_sdk_s3::Client::from_conf(s3_builder.build())
}

/// Create an ElastiCache client from a loaded config
pub fn create_elasticache_client(sdk_config: &SdkConfig) -> aws_sdk_elasticache::Client {
    aws_sdk_elasticache::Client::new(sdk_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::provider::ProvideCredentials;

    #[tokio::test]
    async fn test_static_config_uses_supplied_credentials() {
        let creds = AwsCredentials::new("AKIATEST", "secret-value");
        let sdk_config = create_static_config("us-west-2", &creds).await;

        assert_eq!(
            sdk_config.region().map(ToString::to_string),
            Some("us-west-2".to_string())
        );
        assert_eq!(sdk_config.endpoint_url(), None);
        assert_eq!(
            sdk_config.retry_config().map(RetryConfig::max_attempts),
            Some(1),
            "SDK retries must stay disabled"
        );

        let provider = sdk_config.credentials_provider().unwrap();
        let resolved = provider.provide_credentials().await.unwrap();
        assert_eq!(resolved.access_key_id(), "AKIATEST");
        assert_eq!(resolved.secret_access_key(), "secret-value");
    }
}
