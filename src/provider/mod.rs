//! # Provider Modules
//!
//! The external cloud collaborators, behind small traits so the driver can run
//! against AWS (S3, ElastiCache) or an in-memory stand-in.
//!
//! Providers are built per request from the caller's region and credentials;
//! nothing is cached between requests.

use crate::provider::aws::AwsCredentials;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// What a presence check found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketPresence {
    /// Exists and the caller's credentials can reach it
    Owned,
    /// Does not exist
    Absent,
    /// Exists, or may exist, but the caller cannot see it (403)
    Inaccessible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Where a cache cluster accepts connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEndpoint {
    pub host: String,
    pub port: u16,
}

/// What a cache cluster lookup found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterStatus {
    /// Ready, with the endpoint of its first node
    Available(CacheEndpoint),
    /// Exists but not ready yet; carries the provider's status string
    Pending(String),
    /// Being deleted
    Deleting,
    /// Will never become available without operator action
    Failed(String),
    Absent,
}

/// Everything needed to create one single-node Redis cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheClusterSpec {
    pub cluster_id: String,
    pub node_type: String,
    pub availability_zone: String,
}

/// Classified provider failure
///
/// Only `Transient` is retried by the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("{0}")]
    Auth(String),
    #[error("{0}")]
    Transient(String),
    #[error("{0}")]
    Permanent(String),
}

impl ProviderError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }

    /// Metrics label
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            ProviderError::Auth(_) => "auth",
            ProviderError::Transient(_) => "transient",
            ProviderError::Permanent(_) => "permanent",
        }
    }
}

/// Bucket primitives the driver needs from object storage
#[async_trait]
pub trait BucketProvider: Send + Sync {
    /// Check whether a bucket exists and is reachable with these credentials
    async fn bucket_presence(&self, name: &str) -> Result<BucketPresence, ProviderError>;

    /// Create a bucket; an existing bucket is reported, not treated as an error
    async fn create_bucket(&self, name: &str) -> Result<CreateOutcome, ProviderError>;

    /// Delete a bucket; a missing bucket is reported, not treated as an error
    async fn delete_bucket(&self, name: &str) -> Result<DeleteOutcome, ProviderError>;
}

/// Cache cluster primitives the driver needs from ElastiCache
#[async_trait]
pub trait CacheClusterProvider: Send + Sync {
    async fn cluster_status(&self, cluster_id: &str) -> Result<ClusterStatus, ProviderError>;

    /// Start creating a cluster; an existing cluster is reported, not treated as an error
    async fn create_cluster(&self, spec: &CacheClusterSpec) -> Result<CreateOutcome, ProviderError>;

    /// Start deleting a cluster; a missing cluster is reported, not treated as an error
    async fn delete_cluster(&self, cluster_id: &str) -> Result<DeleteOutcome, ProviderError>;
}

/// Builds providers scoped to one region and one set of credentials
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    async fn connect(
        &self,
        region: &str,
        credentials: &AwsCredentials,
    ) -> Result<Arc<dyn BucketProvider>, ProviderError>;

    async fn connect_cache(
        &self,
        region: &str,
        credentials: &AwsCredentials,
    ) -> Result<Arc<dyn CacheClusterProvider>, ProviderError>;
}

pub mod aws;
pub mod fake;
