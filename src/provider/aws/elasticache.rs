//! # ElastiCache Provider
//!
//! `DescribeCacheClusters`, `CreateCacheCluster` and `DeleteCacheCluster` for
//! single-node Redis clusters.

use crate::constants::{CACHE_SNAPSHOT_RETENTION_DAYS, REDIS_PORT};
use crate::provider::aws::errors::classify;
use crate::provider::{
    CacheClusterProvider, CacheClusterSpec, CacheEndpoint, ClusterStatus, CreateOutcome,
    DeleteOutcome, ProviderError,
};
use async_trait::async_trait;
use aws_sdk_elasticache::types::CacheCluster;
use aws_sdk_elasticache::Client;
use tracing::{debug, info_span, Instrument};

/// Cluster states that never turn into `available` on their own
const FAILED_STATES: &[&str] = &[
    "create-failed",
    "incompatible-network",
    "incompatible-parameters",
    "restore-failed",
];

/// ElastiCache operations for one region
pub struct ElastiCacheProvider {
    client: Client,
    region: String,
    subnet_group: String,
}

impl std::fmt::Debug for ElastiCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElastiCacheProvider")
            .field("region", &self.region)
            .field("subnet_group", &self.subnet_group)
            .finish_non_exhaustive()
    }
}

impl ElastiCacheProvider {
    #[must_use]
    pub fn new(client: Client, region: impl Into<String>, subnet_group: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
            subnet_group: subnet_group.into(),
        }
    }
}

/// Map a described cluster onto [`ClusterStatus`]
fn status_of_cluster(cluster: &CacheCluster) -> ClusterStatus {
    let status = cluster.cache_cluster_status().unwrap_or("unknown");
    match status {
        "available" => {
            let endpoint = cluster
                .cache_nodes()
                .first()
                .and_then(|node| node.endpoint())
                .and_then(|endpoint| {
                    endpoint.address().map(|host| CacheEndpoint {
                        host: host.to_string(),
                        port: endpoint
                            .port()
                            .and_then(|port| u16::try_from(port).ok())
                            .unwrap_or(REDIS_PORT),
                    })
                });
            // The node endpoint can lag the cluster status by a few seconds
            endpoint.map_or_else(
                || ClusterStatus::Pending("available, endpoint not yet assigned".to_string()),
                ClusterStatus::Available,
            )
        }
        "deleting" => ClusterStatus::Deleting,
        "deleted" => ClusterStatus::Absent,
        failed if FAILED_STATES.contains(&failed) => ClusterStatus::Failed(failed.to_string()),
        pending => ClusterStatus::Pending(pending.to_string()),
    }
}

#[async_trait]
impl CacheClusterProvider for ElastiCacheProvider {
    async fn cluster_status(&self, cluster_id: &str) -> Result<ClusterStatus, ProviderError> {
        let span = info_span!("elasticache.cluster.describe", cluster = cluster_id, region = %self.region);

        async move {
            let result = self
                .client
                .describe_cache_clusters()
                .cache_cluster_id(cluster_id)
                .show_cache_node_info(true)
                .send()
                .await;

            match result {
                Ok(output) => Ok(output
                    .cache_clusters()
                    .first()
                    .map_or(ClusterStatus::Absent, status_of_cluster)),
                Err(err)
                    if err
                        .as_service_error()
                        .is_some_and(|e| e.is_cache_cluster_not_found_fault()) =>
                {
                    Ok(ClusterStatus::Absent)
                }
                Err(err) => Err(classify("describe_cache_cluster", cluster_id, &err)),
            }
        }
        .instrument(span)
        .await
    }

    async fn create_cluster(&self, spec: &CacheClusterSpec) -> Result<CreateOutcome, ProviderError> {
        let span = info_span!(
            "elasticache.cluster.create",
            cluster = %spec.cluster_id,
            region = %self.region,
            node_type = %spec.node_type
        );

        async move {
            let result = self
                .client
                .create_cache_cluster()
                .cache_cluster_id(&spec.cluster_id)
                .cache_node_type(&spec.node_type)
                .engine("redis")
                .num_cache_nodes(1)
                .port(i32::from(REDIS_PORT))
                .preferred_availability_zone(&spec.availability_zone)
                .cache_subnet_group_name(&self.subnet_group)
                .snapshot_retention_limit(CACHE_SNAPSHOT_RETENTION_DAYS)
                .auto_minor_version_upgrade(true)
                .send()
                .await;

            match result {
                Ok(_) => Ok(CreateOutcome::Created),
                Err(err)
                    if err
                        .as_service_error()
                        .is_some_and(|e| e.is_cache_cluster_already_exists_fault()) =>
                {
                    debug!(cluster = %spec.cluster_id, "Cache cluster already exists");
                    Ok(CreateOutcome::AlreadyExists)
                }
                Err(err) => Err(classify("create_cache_cluster", &spec.cluster_id, &err)),
            }
        }
        .instrument(span)
        .await
    }

    async fn delete_cluster(&self, cluster_id: &str) -> Result<DeleteOutcome, ProviderError> {
        let span = info_span!("elasticache.cluster.delete", cluster = cluster_id, region = %self.region);

        async move {
            let result = self
                .client
                .delete_cache_cluster()
                .cache_cluster_id(cluster_id)
                .send()
                .await;

            let err = match result {
                Ok(_) => return Ok(DeleteOutcome::Deleted),
                Err(err) => err,
            };
            let Some(service_error) = err.as_service_error() else {
                return Err(classify("delete_cache_cluster", cluster_id, &err));
            };
            if service_error.is_cache_cluster_not_found_fault() {
                return Ok(DeleteOutcome::NotFound);
            }
            if service_error.is_invalid_cache_cluster_state_fault() {
                // Already deleting counts as deleted; any other state is an error
                match self.cluster_status(cluster_id).await? {
                    ClusterStatus::Deleting => return Ok(DeleteOutcome::Deleted),
                    ClusterStatus::Absent => return Ok(DeleteOutcome::NotFound),
                    _ => {}
                }
            }
            Err(classify("delete_cache_cluster", cluster_id, &err))
        }
        .instrument(span)
        .await
    }
}
