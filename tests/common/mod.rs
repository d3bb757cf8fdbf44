//! Common test utilities for the HTTP driver tests
//!
//! Builds the full router over the in-memory provider, wrapped in a factory
//! that counts how often a provider was requested.

#![allow(dead_code, reason = "Not every test binary uses every helper")]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bucket_driver::config::DriverConfig;
use bucket_driver::driver::codec;
use bucket_driver::driver::ProvisioningEngine;
use bucket_driver::observability::metrics;
use bucket_driver::provider::aws::AwsCredentials;
use bucket_driver::provider::fake::InMemoryProviderFactory;
use bucket_driver::provider::{BucketProvider, CacheClusterProvider, ProviderError, ProviderFactory};
use bucket_driver::server::{router, AppState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// In-memory provider that records every `connect` and `connect_cache`
#[derive(Debug, Clone, Default)]
pub struct RecordingFactory {
    pub store: InMemoryProviderFactory,
    connects: Arc<AtomicUsize>,
}

impl RecordingFactory {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderFactory for RecordingFactory {
    async fn connect(
        &self,
        region: &str,
        credentials: &AwsCredentials,
    ) -> Result<Arc<dyn BucketProvider>, ProviderError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.store.connect(region, credentials).await
    }

    async fn connect_cache(
        &self,
        region: &str,
        credentials: &AwsCredentials,
    ) -> Result<Arc<dyn CacheClusterProvider>, ProviderError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.store.connect_cache(region, credentials).await
    }
}

pub struct TestDriver {
    pub app: Router,
    pub factory: RecordingFactory,
}

pub fn test_config() -> DriverConfig {
    let mut config = DriverConfig::default();
    config.backoff_start_ms = 1;
    config.backoff_max_ms = 5;
    config.timeout_limit_secs = 5;
    config.cache_poll_interval_ms = 1;
    config
}

pub fn driver() -> TestDriver {
    metrics::register_metrics().unwrap();
    let factory = RecordingFactory::default();
    let engine = ProvisioningEngine::from_config(&test_config(), Arc::new(factory.clone()));
    let state = AppState::new(engine, true);
    state.mark_ready();
    TestDriver {
        app: router(state),
        factory,
    }
}

impl TestDriver {
    /// Send a request and return the status and raw body
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec())
    }

    /// Send a request and parse the body as JSON
    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = self.send(request).await;
        let value = serde_json::from_slice(&body)
            .unwrap_or_else(|e| panic!("body is not JSON ({e}): {}", String::from_utf8_lossy(&body)));
        (status, value)
    }

    pub async fn create(&self, definition: &Value) -> (StatusCode, Value) {
        self.send_json(create_request(definition)).await
    }
}

pub fn account() -> Value {
    json!({
        "aws_access_key_id": "AWS_ACCESS_KEY_ID-value",
        "aws_secret_access_key": "AWS_SECRET_ACCESS_KEY-value"
    })
}

pub fn definition(id: &str) -> Value {
    json!({
        "id": id,
        "type": "s3",
        "resource_params": {},
        "driver_params": {"region": "eu-west-1"},
        "driver_secrets": {"account": account()}
    })
}

pub fn redis_params() -> Value {
    json!({
        "region": "eu-west-1",
        "cache_node_type": "cache.t3.micro",
        "cache_az": "eu-west-1a"
    })
}

pub fn redis_definition(id: &str) -> Value {
    json!({
        "id": id,
        "type": "redis",
        "resource_params": {},
        "driver_params": redis_params(),
        "driver_secrets": {"account": account()}
    })
}

pub fn create_request(definition: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(definition.to_string()))
        .unwrap()
}

/// DELETE with `Humanitec-Driver-Params` and `Humanitec-Driver-Secrets`
pub fn delete_request(id: &str, driver_params: &Value, driver_secrets: &Value) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(format!("/{id}"))
        .header("Humanitec-Driver-Params", codec::encode(driver_params).unwrap())
        .header("Humanitec-Driver-Secrets", codec::encode(driver_secrets).unwrap())
        .body(Body::empty())
        .unwrap()
}

/// DELETE with only `Humanitec-Driver-Account`
pub fn delete_account_request(id: &str, account: &Value) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(format!("/{id}"))
        .header("Humanitec-Driver-Account", codec::encode(account).unwrap())
        .body(Body::empty())
        .unwrap()
}
