//! # In-Memory Provider
//!
//! Simulates S3 and ElastiCache in process memory. Selected with
//! `USE_FAKE_AWS_CLIENT` so the full create/delete protocol can run without AWS,
//! and used by the test suites.
//!
//! Bucket names are global, as in S3: a bucket created with one access key is
//! `Inaccessible` to another. Cache cluster ids are scoped to the access key and
//! region, as in ElastiCache, and a new cluster reports `creating` once before it
//! becomes available. The access key `invalid` is always rejected.

use crate::constants::REDIS_PORT;
use crate::provider::aws::AwsCredentials;
use crate::provider::{
    BucketPresence, BucketProvider, CacheClusterProvider, CacheClusterSpec, CacheEndpoint,
    ClusterStatus, CreateOutcome, DeleteOutcome, ProviderError, ProviderFactory,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Access key rejected by the in-memory provider
pub const REJECTED_ACCESS_KEY: &str = "invalid";

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredBucket {
    region: String,
    owner: String,
}

/// Status checks a new cluster answers with `creating`
const PENDING_STATUS_CHECKS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredCluster {
    node_type: String,
    availability_zone: String,
    pending_checks: u32,
}

/// (access key, region, cluster id)
type ClusterKey = (String, String, String);

#[derive(Debug, Default)]
struct Store {
    buckets: BTreeMap<String, StoredBucket>,
    clusters: BTreeMap<ClusterKey, StoredCluster>,
    injected_failures: VecDeque<ProviderError>,
    calls: Vec<String>,
}

/// Shared in-memory object storage, handed out per region and credentials
#[derive(Debug, Clone, Default)]
pub struct InMemoryProviderFactory {
    store: Arc<Mutex<Store>>,
}

impl InMemoryProviderFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // A poisoned lock only means a test panicked mid-call; the map is still usable
        self.store
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Region of a stored bucket, if it exists
    #[must_use]
    pub fn bucket_region(&self, name: &str) -> Option<String> {
        self.lock().buckets.get(name).map(|b| b.region.clone())
    }

    #[must_use]
    pub fn bucket_names(&self) -> Vec<String> {
        self.lock().buckets.keys().cloned().collect()
    }

    /// Ids of all stored cache clusters, across accounts and regions
    #[must_use]
    pub fn cache_cluster_ids(&self) -> Vec<String> {
        self.lock()
            .clusters
            .keys()
            .map(|(_, _, id)| id.clone())
            .collect()
    }

    /// Node type and availability zone of a stored cache cluster
    #[must_use]
    pub fn cache_cluster_placement(&self, cluster_id: &str) -> Option<(String, String)> {
        self.lock()
            .clusters
            .iter()
            .find(|((_, _, id), _)| id == cluster_id)
            .map(|(_, cluster)| (cluster.node_type.clone(), cluster.availability_zone.clone()))
    }

    /// Make the next provider calls fail with `error`, once per queued entry
    pub fn fail_next(&self, error: ProviderError, times: usize) {
        let mut store = self.lock();
        store
            .injected_failures
            .extend(std::iter::repeat(error).take(times));
    }

    /// Operations received so far, as `<operation>:<bucket or cluster id>`
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }
}

#[async_trait]
impl ProviderFactory for InMemoryProviderFactory {
    async fn connect(
        &self,
        region: &str,
        credentials: &AwsCredentials,
    ) -> Result<Arc<dyn BucketProvider>, ProviderError> {
        Ok(Arc::new(InMemoryBucketProvider {
            factory: self.clone(),
            region: region.to_string(),
            access_key_id: credentials.aws_access_key_id.clone(),
        }))
    }

    async fn connect_cache(
        &self,
        region: &str,
        credentials: &AwsCredentials,
    ) -> Result<Arc<dyn CacheClusterProvider>, ProviderError> {
        Ok(Arc::new(InMemoryCacheProvider {
            factory: self.clone(),
            region: region.to_string(),
            access_key_id: credentials.aws_access_key_id.clone(),
        }))
    }
}

/// Record the call and apply credential checks and injected failures
fn begin<'a>(
    factory: &'a InMemoryProviderFactory,
    access_key_id: &str,
    operation: &str,
    name: &str,
) -> Result<MutexGuard<'a, Store>, ProviderError> {
    let mut store = factory.lock();
    store.calls.push(format!("{operation}:{name}"));
    if let Some(error) = store.injected_failures.pop_front() {
        return Err(error);
    }
    if access_key_id == REJECTED_ACCESS_KEY {
        return Err(ProviderError::Auth(
            "InvalidAccessKeyId: The AWS Access Key Id you provided does not exist in our records."
                .to_string(),
        ));
    }
    Ok(store)
}

/// Bucket view of the shared store for one region and access key
#[derive(Debug)]
pub struct InMemoryBucketProvider {
    factory: InMemoryProviderFactory,
    region: String,
    access_key_id: String,
}

impl InMemoryBucketProvider {
    fn begin(&self, operation: &str, name: &str) -> Result<MutexGuard<'_, Store>, ProviderError> {
        begin(&self.factory, &self.access_key_id, operation, name)
    }
}

#[async_trait]
impl BucketProvider for InMemoryBucketProvider {
    async fn bucket_presence(&self, name: &str) -> Result<BucketPresence, ProviderError> {
        let store = self.begin("head_bucket", name)?;
        let presence = match store.buckets.get(name) {
            None => BucketPresence::Absent,
            Some(bucket) if bucket.owner == self.access_key_id => BucketPresence::Owned,
            Some(_) => BucketPresence::Inaccessible,
        };
        debug!(bucket = name, ?presence, "In-memory head bucket");
        Ok(presence)
    }

    async fn create_bucket(&self, name: &str) -> Result<CreateOutcome, ProviderError> {
        let mut store = self.begin("create_bucket", name)?;
        if store.buckets.contains_key(name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        store.buckets.insert(
            name.to_string(),
            StoredBucket {
                region: self.region.clone(),
                owner: self.access_key_id.clone(),
            },
        );
        debug!(bucket = name, region = %self.region, "In-memory bucket created");
        Ok(CreateOutcome::Created)
    }

    async fn delete_bucket(&self, name: &str) -> Result<DeleteOutcome, ProviderError> {
        let mut store = self.begin("delete_bucket", name)?;
        match store.buckets.get(name) {
            None => Ok(DeleteOutcome::NotFound),
            Some(bucket) if bucket.owner != self.access_key_id => Err(ProviderError::Auth(
                "AccessDenied: Access Denied".to_string(),
            )),
            Some(_) => {
                store.buckets.remove(name);
                debug!(bucket = name, "In-memory bucket deleted");
                Ok(DeleteOutcome::Deleted)
            }
        }
    }
}

/// Cache cluster view of the shared store for one region and access key
#[derive(Debug)]
pub struct InMemoryCacheProvider {
    factory: InMemoryProviderFactory,
    region: String,
    access_key_id: String,
}

impl InMemoryCacheProvider {
    fn key(&self, cluster_id: &str) -> ClusterKey {
        (
            self.access_key_id.clone(),
            self.region.clone(),
            cluster_id.to_string(),
        )
    }

    fn endpoint(&self, cluster_id: &str) -> CacheEndpoint {
        CacheEndpoint {
            host: format!("{cluster_id}.0001.{}.cache.in-memory", self.region),
            port: REDIS_PORT,
        }
    }
}

#[async_trait]
impl CacheClusterProvider for InMemoryCacheProvider {
    async fn cluster_status(&self, cluster_id: &str) -> Result<ClusterStatus, ProviderError> {
        let mut store = begin(
            &self.factory,
            &self.access_key_id,
            "describe_cache_cluster",
            cluster_id,
        )?;
        let status = match store.clusters.get_mut(&self.key(cluster_id)) {
            None => ClusterStatus::Absent,
            Some(cluster) if cluster.pending_checks > 0 => {
                cluster.pending_checks -= 1;
                ClusterStatus::Pending("creating".to_string())
            }
            Some(_) => ClusterStatus::Available(self.endpoint(cluster_id)),
        };
        debug!(cluster = cluster_id, ?status, "In-memory describe cache cluster");
        Ok(status)
    }

    async fn create_cluster(&self, spec: &CacheClusterSpec) -> Result<CreateOutcome, ProviderError> {
        let mut store = begin(
            &self.factory,
            &self.access_key_id,
            "create_cache_cluster",
            &spec.cluster_id,
        )?;
        let key = self.key(&spec.cluster_id);
        if store.clusters.contains_key(&key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        store.clusters.insert(
            key,
            StoredCluster {
                node_type: spec.node_type.clone(),
                availability_zone: spec.availability_zone.clone(),
                pending_checks: PENDING_STATUS_CHECKS,
            },
        );
        debug!(
            cluster = %spec.cluster_id,
            node_type = %spec.node_type,
            zone = %spec.availability_zone,
            "In-memory cache cluster created"
        );
        Ok(CreateOutcome::Created)
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<DeleteOutcome, ProviderError> {
        let mut store = begin(
            &self.factory,
            &self.access_key_id,
            "delete_cache_cluster",
            cluster_id,
        )?;
        match store.clusters.remove(&self.key(cluster_id)) {
            Some(_) => {
                debug!(cluster = cluster_id, "In-memory cache cluster deleted");
                Ok(DeleteOutcome::Deleted)
            }
            None => Ok(DeleteOutcome::NotFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn provider(factory: &InMemoryProviderFactory, key: &str) -> Arc<dyn BucketProvider> {
        factory
            .connect("eu-west-1", &AwsCredentials::new(key, "secret"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_then_presence_then_delete() {
        let factory = InMemoryProviderFactory::new();
        let p = provider(&factory, "AKIA1").await;

        assert_eq!(p.bucket_presence("b-1").await.unwrap(), BucketPresence::Absent);
        assert_eq!(p.create_bucket("b-1").await.unwrap(), CreateOutcome::Created);
        assert_eq!(p.create_bucket("b-1").await.unwrap(), CreateOutcome::AlreadyExists);
        assert_eq!(p.bucket_presence("b-1").await.unwrap(), BucketPresence::Owned);
        assert_eq!(factory.bucket_region("b-1").as_deref(), Some("eu-west-1"));

        assert_eq!(p.delete_bucket("b-1").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(p.delete_bucket("b-1").await.unwrap(), DeleteOutcome::NotFound);
        assert!(factory.bucket_names().is_empty());
    }

    #[tokio::test]
    async fn test_other_accounts_see_inaccessible() {
        let factory = InMemoryProviderFactory::new();
        provider(&factory, "AKIA1").await.create_bucket("shared").await.unwrap();

        let other = provider(&factory, "AKIA2").await;
        assert_eq!(
            other.bucket_presence("shared").await.unwrap(),
            BucketPresence::Inaccessible
        );
        assert!(matches!(
            other.delete_bucket("shared").await,
            Err(ProviderError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_key_and_injected_failures() {
        let factory = InMemoryProviderFactory::new();
        let rejected = provider(&factory, REJECTED_ACCESS_KEY).await;
        assert!(matches!(
            rejected.create_bucket("b").await,
            Err(ProviderError::Auth(_))
        ));

        let p = provider(&factory, "AKIA1").await;
        factory.fail_next(ProviderError::Transient("SlowDown".into()), 1);
        assert_eq!(
            p.create_bucket("b").await,
            Err(ProviderError::Transient("SlowDown".into()))
        );
        assert_eq!(p.create_bucket("b").await.unwrap(), CreateOutcome::Created);
        assert_eq!(
            factory.calls(),
            vec!["create_bucket:b", "create_bucket:b", "create_bucket:b"]
        );
    }

    #[tokio::test]
    async fn test_cache_cluster_lifecycle() {
        let factory = InMemoryProviderFactory::new();
        let cache = factory
            .connect_cache("eu-west-1", &AwsCredentials::new("AKIA1", "secret"))
            .await
            .unwrap();
        let spec = CacheClusterSpec {
            cluster_id: "redis-1".into(),
            node_type: "cache.t3.micro".into(),
            availability_zone: "eu-west-1a".into(),
        };

        assert_eq!(cache.cluster_status("redis-1").await.unwrap(), ClusterStatus::Absent);
        assert_eq!(cache.create_cluster(&spec).await.unwrap(), CreateOutcome::Created);
        assert_eq!(cache.create_cluster(&spec).await.unwrap(), CreateOutcome::AlreadyExists);
        assert_eq!(
            cache.cluster_status("redis-1").await.unwrap(),
            ClusterStatus::Pending("creating".into())
        );
        let ClusterStatus::Available(endpoint) = cache.cluster_status("redis-1").await.unwrap() else {
            panic!("cluster should be available after one pending check");
        };
        assert_eq!(endpoint.port, 6379);
        assert_eq!(
            factory.cache_cluster_placement("redis-1"),
            Some(("cache.t3.micro".to_string(), "eu-west-1a".to_string()))
        );

        // Cluster ids are per account
        let other = factory
            .connect_cache("eu-west-1", &AwsCredentials::new("AKIA2", "secret"))
            .await
            .unwrap();
        assert_eq!(other.cluster_status("redis-1").await.unwrap(), ClusterStatus::Absent);

        assert_eq!(cache.delete_cluster("redis-1").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(cache.delete_cluster("redis-1").await.unwrap(), DeleteOutcome::NotFound);
        assert!(factory.cache_cluster_ids().is_empty());
    }
}
