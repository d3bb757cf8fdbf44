//! # HTTP Server
//!
//! Driver API plus health checks and metrics on one port.
//!
//! - `POST /` - create (or resolve) the resource
//! - `DELETE /{id}` - delete the resource identified by the driver headers
//! - `/alive`, `/health`, `/healthz` - liveness (always 200)
//! - `/readyz` - readiness (200 once the listener is bound)
//! - `/metrics` - Prometheus metrics in text format, when enabled

pub mod error;
pub mod handlers;
pub mod headers;

use crate::driver::engine::ProvisioningEngine;
use axum::extract::Request;
use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, info_span};
use uuid::Uuid;

/// Shared, read-only handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: ProvisioningEngine,
    pub ready: Arc<AtomicBool>,
    pub metrics_enabled: bool,
}

impl AppState {
    #[must_use]
    pub fn new(engine: ProvisioningEngine, metrics_enabled: bool) -> Self {
        Self {
            engine,
            ready: Arc::new(AtomicBool::new(false)),
            metrics_enabled,
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Relaxed);
    }
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/", post(handlers::create_resource))
        .route("/{id}", delete(handlers::delete_resource))
        .route("/alive", get(handlers::alive))
        .route("/health", get(handlers::alive))
        .route("/healthz", get(handlers::alive))
        .route("/readyz", get(handlers::ready));

    if state.metrics_enabled {
        app = app.route("/metrics", get(handlers::metrics_handler));
    }

    app.fallback(handlers::not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http().make_span_with(
            |request: &Request| {
                info_span!(
                    "request",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path()
                )
            },
        )))
        .with_state(state)
}

/// Bind and serve until Ctrl-C
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails.
pub async fn start_server(port: u16, state: AppState) -> Result<(), anyhow::Error> {
    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;

    info!("HTTP server listening on {}", addr);
    state.mark_ready();

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
