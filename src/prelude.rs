//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use bucket_driver::prelude::*;
//! ```

// Config types
pub use crate::config::{DriverConfig, LogFormat, ProviderBackend};

// Driver core
pub use crate::driver::{
    BucketIdentity, CacheClusterIdentity, DriverError, IdentityDeriver, ProvisionedResource,
    ProvisioningEngine, ResourceDefinition, ResourceEnvelope, ResourceIdentity, ResourceOutputs,
    RetryPolicy, ValidationError,
};

// Provider traits - needed for implementing providers
pub use crate::provider::{
    BucketPresence, BucketProvider, CacheClusterProvider, CacheClusterSpec, CacheEndpoint,
    ClusterStatus, CreateOutcome, DeleteOutcome, ProviderError, ProviderFactory,
};

// Provider implementations
pub use crate::provider::aws::{AwsCredentials, AwsProviderFactory};
pub use crate::provider::fake::InMemoryProviderFactory;

// HTTP surface
pub use crate::server::{router, AppState};
