//! # Response Normalizer
//!
//! Shapes a provisioned resource into the create response envelope:
//!
//! ```json
//! {
//!   "id": "r1",
//!   "type": "s3",
//!   "driver_type": "aws",
//!   "data": {
//!     "values": { "bucket": "hd-...", "region": "eu-west-1" },
//!     "secrets": {}
//!   }
//! }
//! ```
//!
//! A `redis` resource reports `{ "host", "port", "cluster_id", "region" }`
//! instead. Built only from the provisioned outputs, so `driver_secrets` cannot
//! leak into it.

use crate::constants::DRIVER_TYPE;
use crate::driver::engine::{ProvisionedResource, ResourceOutputs};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: &'static str,
    pub driver_type: &'static str,
    pub data: ResourceData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceData {
    pub values: ResourceValues,
    /// Always empty; this driver returns no secret outputs
    pub secrets: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResourceValues {
    Bucket {
        bucket: String,
        region: String,
    },
    CacheCluster {
        host: String,
        port: u16,
        cluster_id: String,
        region: String,
    },
}

impl From<&ResourceOutputs> for ResourceValues {
    fn from(outputs: &ResourceOutputs) -> Self {
        match outputs {
            ResourceOutputs::Bucket(identity) => ResourceValues::Bucket {
                bucket: identity.name.clone(),
                region: identity.region.clone(),
            },
            ResourceOutputs::CacheCluster { identity, endpoint } => ResourceValues::CacheCluster {
                host: endpoint.host.clone(),
                port: endpoint.port,
                cluster_id: identity.cluster_id.clone(),
                region: identity.region.clone(),
            },
        }
    }
}

impl From<&ProvisionedResource> for ResourceEnvelope {
    fn from(resource: &ProvisionedResource) -> Self {
        Self {
            id: resource.id.clone(),
            resource_type: resource.resource_type().as_str(),
            driver_type: DRIVER_TYPE,
            data: ResourceData {
                values: ResourceValues::from(&resource.outputs),
                secrets: Map::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::identity::{BucketIdentity, CacheClusterIdentity};
    use crate::driver::resolver::Resolution;
    use crate::provider::CacheEndpoint;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let resource = ProvisionedResource {
            id: "r1x".into(),
            resolution: Resolution::Created,
            outputs: ResourceOutputs::Bucket(BucketIdentity {
                name: "hd-0123".into(),
                region: "eu-west-1".into(),
            }),
        };
        let body = serde_json::to_value(ResourceEnvelope::from(&resource)).unwrap();
        assert_eq!(
            body,
            json!({
                "id": "r1x",
                "type": "s3",
                "driver_type": "aws",
                "data": {
                    "values": {"bucket": "hd-0123", "region": "eu-west-1"},
                    "secrets": {}
                }
            })
        );
    }

    #[test]
    fn test_cache_cluster_envelope() {
        let resource = ProvisionedResource {
            id: "cache1".into(),
            resolution: Resolution::Existing,
            outputs: ResourceOutputs::CacheCluster {
                identity: CacheClusterIdentity {
                    cluster_id: "redis-0123".into(),
                    region: "eu-west-1".into(),
                },
                endpoint: CacheEndpoint {
                    host: "redis-0123.abc.0001.euw1.cache.amazonaws.com".into(),
                    port: 6379,
                },
            },
        };
        let body = serde_json::to_value(ResourceEnvelope::from(&resource)).unwrap();
        assert_eq!(body["type"], "redis");
        assert_eq!(
            body["data"]["values"],
            json!({
                "host": "redis-0123.abc.0001.euw1.cache.amazonaws.com",
                "port": 6379,
                "cluster_id": "redis-0123",
                "region": "eu-west-1"
            })
        );
        assert_eq!(body["data"]["secrets"], json!({}));
    }
}
