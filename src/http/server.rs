//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router: one catch-all route for every method and path
//! - Wire up middleware (tracing)
//! - Hand each request to the bridge and write back whatever it resolves to
//! - Contain per-exchange faults so they never reach the transport

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::bridge::BridgeHandler;
use crate::http::{request, response};
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub bridge: BridgeHandler,
    pub max_body_bytes: usize,
}

/// HTTP front of the bridge.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Serve until `shutdown` fires, then finish in-flight connections.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");
        metrics::record_running(true);

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        metrics::record_running(false);
        tracing::info!(address = %addr, "HTTP server stopped");
        result
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(bridge_handler))
        .route("/{*path}", any(bridge_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Capture, publish, wait, materialize.
async fn bridge_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let data = request::capture(request, state.max_body_bytes).await;
    let completed = state.bridge.exchange(data).await;

    match response::materialize(completed.response).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %completed.request_id,
                outcome = %completed.outcome,
                error = %e,
                "Failed to write response"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
