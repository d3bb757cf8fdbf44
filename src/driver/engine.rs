//! # Provisioning Engine
//!
//! Runs create and delete against the provider built for the caller's region
//! and credentials: S3 for buckets, ElastiCache for Redis clusters.
//!
//! - Every provider call is bounded by the configured timeout; an elapsed
//!   timeout counts as a transient failure.
//! - Transient failures are retried with Fibonacci backoff up to
//!   `PROVIDER_MAX_ATTEMPTS` attempts. Auth and permanent failures are not.
//! - Work runs on its own task, so a client that disconnects mid-request does not
//!   cancel a create half way.

use crate::config::DriverConfig;
use crate::driver::backoff::FibonacciBackoff;
use crate::driver::definition::{
    Backend, RedisDriverParams, ResourceDefinition, ResourceType, S3DriverParams,
};
use crate::driver::error::DriverError;
use crate::driver::identity::{
    BucketIdentity, CacheClusterIdentity, IdentityDeriver, ResourceIdentity,
};
use crate::driver::resolver::{self, ClusterWait, Resolution};
use crate::observability::metrics;
use crate::provider::aws::AwsCredentials;
use crate::provider::{
    BucketPresence, BucketProvider, CacheClusterProvider, CacheClusterSpec, CacheEndpoint,
    ClusterStatus, CreateOutcome, DeleteOutcome, ProviderError, ProviderFactory,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn, Instrument, Span};

/// Retry and timeout settings for provider calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_start: Duration,
    pub backoff_max: Duration,
    pub call_timeout: Duration,
    /// Delay between cache cluster status checks while waiting for availability
    pub cache_poll_interval: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &DriverConfig) -> Self {
        Self {
            max_attempts: config.provider_max_attempts.max(1),
            backoff_start: config.backoff_start_duration(),
            backoff_max: config.backoff_max_duration(),
            call_timeout: config.timeout_limit(),
            cache_poll_interval: config.cache_poll_interval(),
        }
    }

    /// Cache clusters get the same overall budget as a single provider call
    fn cluster_wait(&self) -> ClusterWait {
        ClusterWait {
            poll_interval: self.cache_poll_interval,
            timeout: self.call_timeout,
        }
    }
}

/// What a create produced, per resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutputs {
    Bucket(BucketIdentity),
    CacheCluster {
        identity: CacheClusterIdentity,
        endpoint: CacheEndpoint,
    },
}

/// A resource that exists after a successful create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedResource {
    pub id: String,
    pub resolution: Resolution,
    pub outputs: ResourceOutputs,
}

impl ProvisionedResource {
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        match self.outputs {
            ResourceOutputs::Bucket(_) => ResourceType::S3,
            ResourceOutputs::CacheCluster { .. } => ResourceType::Redis,
        }
    }

    /// Bucket name or cache cluster id
    #[must_use]
    pub fn name(&self) -> &str {
        match &self.outputs {
            ResourceOutputs::Bucket(identity) => &identity.name,
            ResourceOutputs::CacheCluster { identity, .. } => &identity.cluster_id,
        }
    }
}

#[derive(Clone)]
pub struct ProvisioningEngine {
    factory: Arc<dyn ProviderFactory>,
    deriver: IdentityDeriver,
    policy: RetryPolicy,
}

impl std::fmt::Debug for ProvisioningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningEngine")
            .field("deriver", &self.deriver)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ProvisioningEngine {
    pub fn new(factory: Arc<dyn ProviderFactory>, deriver: IdentityDeriver, policy: RetryPolicy) -> Self {
        Self {
            factory,
            deriver,
            policy,
        }
    }

    #[must_use]
    pub fn from_config(config: &DriverConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        Self::new(
            factory,
            IdentityDeriver::new(&config.bucket_name_prefix, &config.default_region),
            RetryPolicy::from_config(config),
        )
    }

    #[must_use]
    pub fn identity_deriver(&self) -> &IdentityDeriver {
        &self.deriver
    }

    /// Create the resource, or resolve it to the one that already exists
    ///
    /// # Errors
    ///
    /// [`DriverError::Auth`] when the provider rejects the credentials,
    /// [`DriverError::Provision`] for other provider failures.
    pub async fn create(&self, definition: ResourceDefinition) -> Result<ProvisionedResource, DriverError> {
        let engine = self.clone();
        tokio::spawn(async move { engine.run_create(definition).await }.instrument(Span::current()))
            .await
            .map_err(|e| DriverError::Internal(format!("create task failed: {e}")))?
    }

    /// Delete the bucket or cache cluster identified by `driver_params`; a
    /// missing resource is success
    ///
    /// # Errors
    ///
    /// [`DriverError::Validation`] for malformed params, otherwise as [`Self::create`].
    pub async fn delete(
        &self,
        driver_params: Map<String, Value>,
        credentials: AwsCredentials,
    ) -> Result<DeleteOutcome, DriverError> {
        let engine = self.clone();
        tokio::spawn(
            async move { engine.run_delete(driver_params, credentials).await }
                .instrument(Span::current()),
        )
        .await
        .map_err(|e| DriverError::Internal(format!("delete task failed: {e}")))?
    }

    async fn run_create(&self, definition: ResourceDefinition) -> Result<ProvisionedResource, DriverError> {
        let (resolution, outputs) = match &definition.backend {
            Backend::S3 { params, account } => {
                self.create_bucket(&definition, params, account).await?
            }
            Backend::Redis { params, account } => {
                self.create_cache_cluster(&definition, params, account).await?
            }
        };

        Ok(ProvisionedResource {
            id: definition.id.clone(),
            resolution,
            outputs,
        })
    }

    async fn create_bucket(
        &self,
        definition: &ResourceDefinition,
        params: &S3DriverParams,
        account: &AwsCredentials,
    ) -> Result<(Resolution, ResourceOutputs), DriverError> {
        let identity = self.deriver.derive_parsed(params, &definition.driver_params);
        info!(
            resource.id = %definition.id,
            bucket = %identity.name,
            region = %identity.region,
            "Provisioning bucket"
        );

        let provider = self.connect(&identity.region, account).await?;
        let resolution = resolver::resolve(&provider, &identity).await?;
        Ok((resolution, ResourceOutputs::Bucket(identity)))
    }

    async fn create_cache_cluster(
        &self,
        definition: &ResourceDefinition,
        params: &RedisDriverParams,
        account: &AwsCredentials,
    ) -> Result<(Resolution, ResourceOutputs), DriverError> {
        let identity = self.deriver.derive_cluster(params, &definition.driver_params)?;
        info!(
            resource.id = %definition.id,
            cluster = %identity.cluster_id,
            region = %identity.region,
            node_type = %params.cache_node_type,
            "Provisioning cache cluster"
        );

        let spec = CacheClusterSpec {
            cluster_id: identity.cluster_id.clone(),
            node_type: params.cache_node_type.clone(),
            availability_zone: params.cache_az.clone(),
        };
        let provider = self.connect_cache(&identity.region, account).await?;
        let resolved = resolver::resolve_cluster(&provider, &spec, self.policy.cluster_wait()).await?;
        Ok((
            resolved.resolution,
            ResourceOutputs::CacheCluster {
                identity,
                endpoint: resolved.endpoint,
            },
        ))
    }

    async fn run_delete(
        &self,
        driver_params: Map<String, Value>,
        credentials: AwsCredentials,
    ) -> Result<DeleteOutcome, DriverError> {
        let (name, outcome) = match self.deriver.derive_any(&driver_params)? {
            ResourceIdentity::Bucket(identity) => {
                info!(bucket = %identity.name, region = %identity.region, "Deleting bucket");
                let provider = self.connect(&identity.region, &credentials).await?;
                let outcome = provider.delete_bucket(&identity.name).await?;
                (identity.name, outcome)
            }
            ResourceIdentity::CacheCluster(identity) => {
                info!(cluster = %identity.cluster_id, region = %identity.region, "Deleting cache cluster");
                let provider = self.connect_cache(&identity.region, &credentials).await?;
                let outcome = provider.delete_cluster(&identity.cluster_id).await?;
                (identity.cluster_id, outcome)
            }
        };
        match outcome {
            DeleteOutcome::Deleted => info!(resource = %name, "Resource deleted"),
            DeleteOutcome::NotFound => {
                info!(resource = %name, "Resource already absent, nothing to delete");
            }
        }
        Ok(outcome)
    }

    async fn connect(
        &self,
        region: &str,
        credentials: &AwsCredentials,
    ) -> Result<RetryingProvider<dyn BucketProvider>, ProviderError> {
        let inner = self.factory.connect(region, credentials).await?;
        Ok(RetryingProvider {
            inner,
            policy: self.policy,
        })
    }

    async fn connect_cache(
        &self,
        region: &str,
        credentials: &AwsCredentials,
    ) -> Result<RetryingProvider<dyn CacheClusterProvider>, ProviderError> {
        let inner = self.factory.connect_cache(region, credentials).await?;
        Ok(RetryingProvider {
            inner,
            policy: self.policy,
        })
    }
}

/// Applies the retry policy, timeouts and metrics to every provider call
struct RetryingProvider<P: ?Sized> {
    inner: Arc<P>,
    policy: RetryPolicy,
}

impl<P: ?Sized + Send + Sync> RetryingProvider<P> {
    async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, ProviderError>> + Send,
        T: Send,
    {
        let mut backoff =
            FibonacciBackoff::from_durations(self.policy.backoff_start, self.policy.backoff_max);
        let mut attempt = 1;

        loop {
            let start = Instant::now();
            let result = match tokio::time::timeout(self.policy.call_timeout, call()).await {
                Ok(result) => result,
                Err(_elapsed) => Err(ProviderError::Transient(format!(
                    "{operation} timed out after {}s",
                    self.policy.call_timeout.as_secs()
                ))),
            };
            metrics::record_provider_operation(operation, start.elapsed().as_secs_f64());

            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            metrics::increment_provider_operation_errors(operation, error.class());

            if !error.is_transient() {
                return Err(error);
            }
            if attempt >= self.policy.max_attempts {
                warn!(operation, attempts = attempt, error = %error, "Giving up on provider call");
                return Err(ProviderError::Transient(format!(
                    "{error} (gave up after {attempt} attempts)"
                )));
            }

            let delay = backoff.next_backoff();
            warn!(
                operation,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "Transient provider error, retrying"
            );
            metrics::increment_provider_retries(operation);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl BucketProvider for RetryingProvider<dyn BucketProvider> {
    async fn bucket_presence(&self, name: &str) -> Result<BucketPresence, ProviderError> {
        let inner = &self.inner;
        self.run("head_bucket", move || inner.bucket_presence(name)).await
    }

    async fn create_bucket(&self, name: &str) -> Result<CreateOutcome, ProviderError> {
        let inner = &self.inner;
        self.run("create_bucket", move || inner.create_bucket(name)).await
    }

    async fn delete_bucket(&self, name: &str) -> Result<DeleteOutcome, ProviderError> {
        let inner = &self.inner;
        self.run("delete_bucket", move || inner.delete_bucket(name)).await
    }
}

#[async_trait]
impl CacheClusterProvider for RetryingProvider<dyn CacheClusterProvider> {
    async fn cluster_status(&self, cluster_id: &str) -> Result<ClusterStatus, ProviderError> {
        let inner = &self.inner;
        self.run("describe_cache_cluster", move || inner.cluster_status(cluster_id))
            .await
    }

    async fn create_cluster(&self, spec: &CacheClusterSpec) -> Result<CreateOutcome, ProviderError> {
        let inner = &self.inner;
        self.run("create_cache_cluster", move || inner.create_cluster(spec))
            .await
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<DeleteOutcome, ProviderError> {
        let inner = &self.inner;
        self.run("delete_cache_cluster", move || inner.delete_cluster(cluster_id))
            .await
    }
}
