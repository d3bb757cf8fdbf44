//! # Metrics
//!
//! Prometheus metrics for monitoring the driver.
//!
//! ## Metrics Exposed
//!
//! - `bucket_driver_requests_total{operation,outcome}` - Driver requests by result
//! - `bucket_driver_provider_operations_total{operation}` - Provider calls attempted
//! - `bucket_driver_provider_operation_duration_seconds{operation}` - Provider call latency
//! - `bucket_driver_provider_operation_errors_total{operation,class}` - Failed provider calls
//! - `bucket_driver_provider_retries_total{operation}` - Retries of transient failures

use anyhow::Result;
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "bucket_driver_requests_total",
            "Total number of driver requests by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create REQUESTS_TOTAL metric - this should never happen")
});

static PROVIDER_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "bucket_driver_provider_operations_total",
            "Total number of object storage provider operations",
        ),
        &["operation"],
    )
    .expect("Failed to create PROVIDER_OPERATIONS_TOTAL metric - this should never happen")
});

static PROVIDER_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "bucket_driver_provider_operation_duration_seconds",
            "Duration of object storage provider operations in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .expect("Failed to create PROVIDER_OPERATION_DURATION metric - this should never happen")
});

static PROVIDER_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "bucket_driver_provider_operation_errors_total",
            "Total number of failed provider operations by error class",
        ),
        &["operation", "class"],
    )
    .expect("Failed to create PROVIDER_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static PROVIDER_RETRIES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "bucket_driver_provider_retries_total",
            "Total number of retries after transient provider errors",
        ),
        &["operation"],
    )
    .expect("Failed to create PROVIDER_RETRIES_TOTAL metric - this should never happen")
});

/// Register all collectors with the driver registry
///
/// Safe to call more than once; already registered collectors are skipped.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    let collectors: [Box<dyn prometheus::core::Collector>; 5] = [
        Box::new(REQUESTS_TOTAL.clone()),
        Box::new(PROVIDER_OPERATIONS_TOTAL.clone()),
        Box::new(PROVIDER_OPERATION_DURATION.clone()),
        Box::new(PROVIDER_OPERATION_ERRORS_TOTAL.clone()),
        Box::new(PROVIDER_RETRIES_TOTAL.clone()),
    ];
    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Render the registry in the Prometheus text exposition format
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn render() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

pub fn record_request(operation: &str, outcome: &str) {
    REQUESTS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_provider_operation(operation: &str, duration: f64) {
    PROVIDER_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
    PROVIDER_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

pub fn increment_provider_operation_errors(operation: &str, class: &str) {
    PROVIDER_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation, class])
        .inc();
}

pub fn increment_provider_retries(operation: &str) {
    PROVIDER_RETRIES_TOTAL
        .with_label_values(&[operation])
        .inc();
}
