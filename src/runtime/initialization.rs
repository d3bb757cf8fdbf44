//! # Driver Initialization
//!
//! Start-up sequence:
//! - Tracing subscriber setup
//! - Configuration validation
//! - Metrics registration
//! - Provider backend selection
//! - Provisioning engine and HTTP state

use crate::config::{DriverConfig, ProviderBackend};
use crate::driver::engine::ProvisioningEngine;
use crate::observability::{self, metrics};
use crate::provider::aws::AwsProviderFactory;
use crate::provider::fake::InMemoryProviderFactory;
use crate::provider::ProviderFactory;
use crate::server::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Initialize the driver and return the state the HTTP server runs with
///
/// # Errors
///
/// Returns an error when the configuration is invalid, the tracing subscriber
/// cannot be installed or metrics cannot be registered.
pub fn initialize(config: &DriverConfig) -> Result<AppState> {
    observability::init_tracing(&config.log_level, config.log_format)?;

    info!("Starting S3 Bucket Driver");
    info!(
        "Build info: timestamp={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_GIT_HASH")
    );

    config.validate().context("Invalid driver configuration")?;

    metrics::register_metrics().context("Failed to register metrics")?;

    let engine = ProvisioningEngine::from_config(config, provider_factory(config));
    info!(
        backend = ?config.backend,
        default_region = %config.default_region,
        bucket_name_prefix = %config.bucket_name_prefix,
        timeout_secs = config.timeout_limit_secs,
        max_attempts = config.provider_max_attempts,
        cache_poll_interval_ms = config.cache_poll_interval_ms,
        "Driver configured"
    );

    Ok(AppState::new(engine, config.enable_metrics))
}

/// Select the provider backend
pub fn provider_factory(config: &DriverConfig) -> Arc<dyn ProviderFactory> {
    match config.backend {
        ProviderBackend::Aws => {
            if let Some(endpoint) = &config.s3_endpoint_url {
                info!(endpoint = %endpoint, "Using S3-compatible endpoint");
            }
            info!(subnet_group = %config.cache_subnet_group, "Cache clusters use this subnet group");
            Arc::new(AwsProviderFactory::from_config(config))
        }
        ProviderBackend::InMemory => {
            warn!("USE_FAKE_AWS_CLIENT is set: buckets and cache clusters are simulated in memory and lost on restart");
            Arc::new(InMemoryProviderFactory::new())
        }
    }
}
