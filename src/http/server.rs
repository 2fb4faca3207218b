//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router; every method and path goes to one handler
//! - Wire up middleware (request ID, tracing)
//! - Serve on an already-bound listener until shutdown

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, ProxyConfig};
use crate::http::proxy::ProxyPipeline;
use crate::http::request::{request_id_header, MakeRequestUuidV4};
use crate::http::upstream::build_client;
use crate::lifecycle::shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ProxyPipeline>,
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let pipeline = ProxyPipeline::from_config(&config, build_client())?;

        if !pipeline.gate().is_armed() {
            tracing::warn!("No proxy token configured; every request will be rejected");
        }

        let state = AppState {
            pipeline: Arc::new(pipeline),
        };

        Ok(Self {
            router: Self::build_router(state),
            config: Arc::new(config),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(request_id_header(), MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(request_id_header())),
            )
    }

    /// Run the server on `listener` until `shutdown_rx` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            default_host = ?self.config.upstream.default_host,
            timeout_ms = self.config.upstream.timeout_ms,
            max_body_size = self.config.upstream.max_body_size,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Single entry point for every inbound request.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response<Body> {
    state.pipeline.handle(request).await
}
