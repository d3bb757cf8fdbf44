//! # S3 Bucket Provider
//!
//! `HeadBucket`, `CreateBucket` and `DeleteBucket` against AWS S3 or an
//! S3-compatible endpoint.

use crate::provider::aws::errors::{classify, status_of};
use crate::provider::{BucketPresence, BucketProvider, CreateOutcome, DeleteOutcome, ProviderError};
use async_trait::async_trait;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use aws_sdk_s3::Client;
use tracing::{debug, info_span, Instrument};

/// The one region that rejects an explicit location constraint
const US_EAST_1: &str = "us-east-1";

/// S3 bucket operations for one region
pub struct S3BucketProvider {
    client: Client,
    region: String,
}

impl std::fmt::Debug for S3BucketProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BucketProvider")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3BucketProvider {
    #[must_use]
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    fn create_configuration(&self) -> Option<CreateBucketConfiguration> {
        (self.region != US_EAST_1).then(|| {
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build()
        })
    }
}

#[async_trait]
impl BucketProvider for S3BucketProvider {
    async fn bucket_presence(&self, name: &str) -> Result<BucketPresence, ProviderError> {
        let span = info_span!("s3.bucket.head", bucket = name, region = %self.region);

        async move {
            match self.client.head_bucket().bucket(name).send().await {
                Ok(_) => Ok(BucketPresence::Owned),
                Err(err) => {
                    if err.as_service_error().is_some_and(|e| e.is_not_found()) {
                        return Ok(BucketPresence::Absent);
                    }
                    // HEAD responses carry no error body; 403 and 301 mean the
                    // name exists but is not reachable with this account or region
                    match status_of(&err) {
                        Some(404) => Ok(BucketPresence::Absent),
                        Some(301 | 403) => Ok(BucketPresence::Inaccessible),
                        _ => Err(classify("head_bucket", name, &err)),
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn create_bucket(&self, name: &str) -> Result<CreateOutcome, ProviderError> {
        let span = info_span!("s3.bucket.create", bucket = name, region = %self.region);

        async move {
            let mut request = self.client.create_bucket().bucket(name);
            if let Some(configuration) = self.create_configuration() {
                request = request.create_bucket_configuration(configuration);
            }

            match request.send().await {
                Ok(_) => Ok(CreateOutcome::Created),
                Err(err) => {
                    let already_exists = err.as_service_error().is_some_and(|e| {
                        e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                    });
                    if already_exists {
                        debug!(bucket = name, code = ?err.code(), "Bucket already exists");
                        Ok(CreateOutcome::AlreadyExists)
                    } else {
                        Err(classify("create_bucket", name, &err))
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn delete_bucket(&self, name: &str) -> Result<DeleteOutcome, ProviderError> {
        let span = info_span!("s3.bucket.delete", bucket = name, region = %self.region);

        async move {
            match self.client.delete_bucket().bucket(name).send().await {
                Ok(_) => Ok(DeleteOutcome::Deleted),
                Err(err) if err.code() == Some("NoSuchBucket") => Ok(DeleteOutcome::NotFound),
                Err(err) => Err(classify("delete_bucket", name, &err)),
            }
        }
        .instrument(span)
        .await
    }
}
