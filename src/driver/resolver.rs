//! # Idempotency Resolver
//!
//! Decides whether a create request needs a provider create at all.
//!
//! 1. Ask the provider whether the derived bucket exists.
//! 2. `Owned`: reuse it, no create call.
//! 3. `Absent` or `Inaccessible`: create it. A concurrent request or another
//!    owner may win the race; the provider then reports `AlreadyExists`, which
//!    resolves to the same bucket.
//!
//! Ownership is not reconciled. A bucket that exists under other metadata is
//! treated as the requested one.
//!
//! Cache clusters follow the same steps, then wait: a cluster has no usable
//! endpoint until ElastiCache reports it `available`, which takes minutes.

use crate::driver::identity::BucketIdentity;
use crate::provider::{
    BucketPresence, BucketProvider, CacheClusterProvider, CacheClusterSpec, CacheEndpoint,
    ClusterStatus, CreateOutcome, ProviderError,
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How the bucket for a create request was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Already present and reachable; nothing created
    Existing,
    /// Created by this request
    Created,
    /// The create call reported an existing bucket
    Adopted,
}

impl Resolution {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Existing => "existing",
            Resolution::Created => "created",
            Resolution::Adopted => "adopted",
        }
    }
}

/// Resolve the bucket for `identity`, creating it when absent
///
/// # Errors
///
/// Propagates the provider's classified error from either call.
pub async fn resolve(
    provider: &dyn BucketProvider,
    identity: &BucketIdentity,
) -> Result<Resolution, ProviderError> {
    match provider.bucket_presence(&identity.name).await? {
        BucketPresence::Owned => {
            info!(bucket = %identity.name, "Bucket already exists, reusing it");
            return Ok(Resolution::Existing);
        }
        BucketPresence::Absent => {
            debug!(bucket = %identity.name, "Bucket absent, creating");
        }
        BucketPresence::Inaccessible => {
            debug!(
                bucket = %identity.name,
                "Bucket not accessible with these credentials, attempting create"
            );
        }
    }

    match provider.create_bucket(&identity.name).await? {
        CreateOutcome::Created => {
            info!(bucket = %identity.name, region = %identity.region, "Bucket created");
            Ok(Resolution::Created)
        }
        CreateOutcome::AlreadyExists => {
            warn!(
                bucket = %identity.name,
                "Provider reported the bucket already exists, treating it as this resource"
            );
            Ok(Resolution::Adopted)
        }
    }
}

/// How long to wait for a cache cluster to become available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterWait {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

/// A cache cluster that is ready for connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCluster {
    pub resolution: Resolution,
    pub endpoint: CacheEndpoint,
}

/// Resolve the cache cluster for `spec`, creating it when absent, and wait
/// until it serves an endpoint
///
/// # Errors
///
/// Propagates provider errors. A cluster being deleted or in a failed state is
/// [`ProviderError::Permanent`]; one still pending after `wait.timeout` is
/// [`ProviderError::Transient`], so a later create picks it up again.
pub async fn resolve_cluster(
    provider: &dyn CacheClusterProvider,
    spec: &CacheClusterSpec,
    wait: ClusterWait,
) -> Result<ResolvedCluster, ProviderError> {
    let id = &spec.cluster_id;
    let resolution = match provider.cluster_status(id).await? {
        ClusterStatus::Available(endpoint) => {
            info!(cluster = %id, "Cache cluster already available, reusing it");
            return Ok(ResolvedCluster {
                resolution: Resolution::Existing,
                endpoint,
            });
        }
        ClusterStatus::Pending(status) => {
            info!(cluster = %id, %status, "Cache cluster exists but is not ready yet");
            Resolution::Existing
        }
        ClusterStatus::Absent => match provider.create_cluster(spec).await? {
            CreateOutcome::Created => {
                info!(cluster = %id, node_type = %spec.node_type, "Cache cluster creation started");
                Resolution::Created
            }
            CreateOutcome::AlreadyExists => {
                warn!(cluster = %id, "Provider reported the cache cluster already exists, treating it as this resource");
                Resolution::Adopted
            }
        },
        ClusterStatus::Deleting => return Err(being_deleted(id)),
        ClusterStatus::Failed(status) => return Err(failed(id, &status)),
    };

    let endpoint = wait_until_available(provider, id, wait).await?;
    Ok(ResolvedCluster {
        resolution,
        endpoint,
    })
}

async fn wait_until_available(
    provider: &dyn CacheClusterProvider,
    id: &str,
    wait: ClusterWait,
) -> Result<CacheEndpoint, ProviderError> {
    let deadline = Instant::now() + wait.timeout;
    loop {
        tokio::time::sleep(wait.poll_interval).await;
        match provider.cluster_status(id).await? {
            ClusterStatus::Available(endpoint) => {
                info!(cluster = %id, host = %endpoint.host, "Cache cluster available");
                return Ok(endpoint);
            }
            // A fresh cluster can briefly be missing from describe results
            ClusterStatus::Pending(status) => debug!(cluster = %id, %status, "Waiting for cache cluster"),
            ClusterStatus::Absent => debug!(cluster = %id, "Waiting for cache cluster to appear"),
            ClusterStatus::Deleting => return Err(being_deleted(id)),
            ClusterStatus::Failed(status) => return Err(failed(id, &status)),
        }
        if Instant::now() >= deadline {
            return Err(ProviderError::Transient(format!(
                "cache cluster {id} not available after {}s",
                wait.timeout.as_secs()
            )));
        }
    }
}

fn being_deleted(id: &str) -> ProviderError {
    ProviderError::Permanent(format!(
        "cache cluster {id} is being deleted; retry once the deletion has finished"
    ))
}

fn failed(id: &str, status: &str) -> ProviderError {
    ProviderError::Permanent(format!("cache cluster {id} is in state \"{status}\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::aws::AwsCredentials;
    use crate::provider::fake::InMemoryProviderFactory;
    use crate::provider::{DeleteOutcome, ProviderFactory};
    use async_trait::async_trait;

    fn identity(name: &str) -> BucketIdentity {
        BucketIdentity {
            name: name.to_string(),
            region: "eu-west-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_absent_bucket_is_created_once() {
        let factory = InMemoryProviderFactory::new();
        let provider = factory
            .connect("eu-west-1", &AwsCredentials::new("AKIA1", "s"))
            .await
            .unwrap();

        let first = resolve(provider.as_ref(), &identity("hd-abc")).await.unwrap();
        let second = resolve(provider.as_ref(), &identity("hd-abc")).await.unwrap();

        assert_eq!(first, Resolution::Created);
        assert_eq!(second, Resolution::Existing);
        assert_eq!(
            factory.calls(),
            vec!["head_bucket:hd-abc", "create_bucket:hd-abc", "head_bucket:hd-abc"]
        );
    }

    #[tokio::test]
    async fn test_inaccessible_bucket_is_adopted() {
        let factory = InMemoryProviderFactory::new();
        let owner = factory
            .connect("eu-west-1", &AwsCredentials::new("AKIA1", "s"))
            .await
            .unwrap();
        owner.create_bucket("hd-shared").await.unwrap();

        let other = factory
            .connect("eu-west-1", &AwsCredentials::new("AKIA2", "s"))
            .await
            .unwrap();
        let resolution = resolve(other.as_ref(), &identity("hd-shared")).await.unwrap();
        assert_eq!(resolution, Resolution::Adopted);
    }

    #[tokio::test]
    async fn test_errors_are_propagated() {
        let factory = InMemoryProviderFactory::new();
        let provider = factory
            .connect("eu-west-1", &AwsCredentials::new("AKIA1", "s"))
            .await
            .unwrap();
        factory.fail_next(ProviderError::Permanent("InvalidBucketName".into()), 1);
        assert_eq!(
            resolve(provider.as_ref(), &identity("hd-x")).await,
            Err(ProviderError::Permanent("InvalidBucketName".into()))
        );
    }

    fn wait() -> ClusterWait {
        ClusterWait {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        }
    }

    fn spec(id: &str) -> CacheClusterSpec {
        CacheClusterSpec {
            cluster_id: id.to_string(),
            node_type: "cache.t3.micro".to_string(),
            availability_zone: "eu-west-1a".to_string(),
        }
    }

    #[tokio::test]
    async fn test_absent_cluster_is_created_and_awaited() {
        let factory = InMemoryProviderFactory::new();
        let provider = factory
            .connect_cache("eu-west-1", &AwsCredentials::new("AKIA1", "s"))
            .await
            .unwrap();

        let first = resolve_cluster(provider.as_ref(), &spec("redis-abc"), wait())
            .await
            .unwrap();
        assert_eq!(first.resolution, Resolution::Created);
        assert_eq!(first.endpoint.port, 6379);
        assert_eq!(
            factory.calls(),
            vec![
                "describe_cache_cluster:redis-abc",
                "create_cache_cluster:redis-abc",
                "describe_cache_cluster:redis-abc",
                "describe_cache_cluster:redis-abc",
            ]
        );

        let second = resolve_cluster(provider.as_ref(), &spec("redis-abc"), wait())
            .await
            .unwrap();
        assert_eq!(second.resolution, Resolution::Existing);
        assert_eq!(second.endpoint, first.endpoint);
    }

    /// Reports a fixed status forever
    struct FixedStatus(ClusterStatus);

    #[async_trait]
    impl CacheClusterProvider for FixedStatus {
        async fn cluster_status(&self, _id: &str) -> Result<ClusterStatus, ProviderError> {
            Ok(self.0.clone())
        }

        async fn create_cluster(&self, _spec: &CacheClusterSpec) -> Result<CreateOutcome, ProviderError> {
            Ok(CreateOutcome::AlreadyExists)
        }

        async fn delete_cluster(&self, _id: &str) -> Result<DeleteOutcome, ProviderError> {
            Ok(DeleteOutcome::Deleted)
        }
    }

    #[tokio::test]
    async fn test_pending_cluster_times_out_as_transient() {
        let provider = FixedStatus(ClusterStatus::Pending("creating".into()));
        let err = resolve_cluster(
            &provider,
            &spec("redis-slow"),
            ClusterWait {
                poll_interval: Duration::from_millis(1),
                timeout: Duration::from_millis(20),
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_transient());
        assert!(err.to_string().contains("not available after"), "{err}");
    }

    #[tokio::test]
    async fn test_deleting_and_failed_clusters_are_permanent() {
        for status in [ClusterStatus::Deleting, ClusterStatus::Failed("create-failed".into())] {
            let err = resolve_cluster(&FixedStatus(status), &spec("redis-gone"), wait())
                .await
                .unwrap_err();
            assert!(matches!(err, ProviderError::Permanent(_)), "{err}");
        }
    }
}
