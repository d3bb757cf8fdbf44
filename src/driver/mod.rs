//! # Driver Core
//!
//! The create/delete protocol, independent of HTTP:
//!
//! - `definition`: parse and validate the create request body
//! - `codec`: base64(JSON) transport of params and secrets in delete headers
//! - `identity`: deterministic bucket name or cache cluster id from `driver_params`
//! - `resolver`: reuse an existing resource instead of creating a duplicate
//! - `engine`: provider calls with timeout and retry
//! - `response`: the create response envelope
//! - `error`: error taxonomy

pub mod backoff;
pub mod codec;
pub mod definition;
pub mod engine;
pub mod error;
pub mod identity;
pub mod resolver;
pub mod response;

pub use definition::{Backend, RedisDriverParams, ResourceDefinition, ResourceType, S3DriverParams};
pub use engine::{ProvisionedResource, ProvisioningEngine, ResourceOutputs, RetryPolicy};
pub use error::{DriverError, ValidationError};
pub use identity::{BucketIdentity, CacheClusterIdentity, IdentityDeriver, ResourceIdentity};
pub use resolver::Resolution;
pub use response::{ResourceEnvelope, ResourceValues};
