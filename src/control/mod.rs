//! Control API for out-of-process request handlers.
//!
//! Exposes the lifecycle operations over HTTP on a separate listener, so a
//! handler that reads published events elsewhere (e.g. from the `stdout`
//! mode of the binary) can answer them.

pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use self::handlers::*;
use crate::lifecycle::WebServer;

pub use self::handlers::{ControlStatus, DeviceIp, RespondCommand, RespondResult, StopResult};

pub fn setup_control_router(server: Arc<WebServer>) -> Router {
    Router::new()
        .route("/control/status", get(get_status))
        .route("/control/respond", post(post_respond))
        .route("/control/stop", post(post_stop))
        .route("/control/device-ip", get(get_device_ip))
        .with_state(server)
}

/// Serve the control API until `shutdown` fires.
pub async fn serve_control(
    server: Arc<WebServer>,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Control API listening");
    axum::serve(listener, setup_control_router(server))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
