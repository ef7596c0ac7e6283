//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all relay endpoints
//! - Wire up middleware (tracing, request ID, body limit, CORS)
//! - Bind the server to a listener with graceful shutdown
//! - Share the relay engine and config with handlers via AppState

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::HeaderName,
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::RelayConfig;
use crate::http::cors;
use crate::http::handlers;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::relay::UpstreamRelay;
use crate::session::SessionStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<UpstreamRelay>,
    pub config: Arc<RelayConfig>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: RelayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let store = Arc::new(SessionStore::new());
        let relay = Arc::new(UpstreamRelay::new(&config, store)?);
        let state = AppState {
            relay,
            config: Arc::new(config.clone()),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RelayConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        let mut router = Router::new()
            .route("/p", get(handlers::proxy_media))
            .route("/fetch", post(handlers::fetch))
            .route("/dispatch", post(handlers::dispatch))
            .route("/health", get(handlers::health))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                cors::cors_middleware,
            ))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::new(request_id))
                    .layer(TraceLayer::new_for_http())
                    .layer(RequestBodyLimitLayer::new(config.limits.max_body_size)),
            )
            .with_state(state);

        // No inbound deadline unless configured; streamed media relays
        // can legitimately stay open for a long time.
        if let Some(secs) = config.timeouts.request_secs {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(secs)));
        }
        router
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = shutdown.recv() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }
}
