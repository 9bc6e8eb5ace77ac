use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::bridge::{RequestId, ResponseData};
use crate::lifecycle::WebServer;

#[derive(Debug, Serialize, Deserialize)]
pub struct ControlStatus {
    pub version: String,
    pub running: bool,
    pub address: Option<String>,
    pub pending: usize,
}

/// Body of `POST /control/respond`: the request id plus every
/// [`ResponseData`] field at the top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondCommand {
    pub request_id: RequestId,
    #[serde(flatten)]
    pub response: ResponseData,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RespondResult {
    pub delivered: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopResult {
    pub stopped: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceIp {
    pub ip: String,
}

pub async fn get_status(State(server): State<Arc<WebServer>>) -> Json<ControlStatus> {
    let address = server.local_addr().await.map(|addr| addr.to_string());
    Json(ControlStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        running: server.is_running().await,
        address,
        pending: server.pending(),
    })
}

pub async fn post_respond(
    State(server): State<Arc<WebServer>>,
    Json(command): Json<RespondCommand>,
) -> Json<RespondResult> {
    let delivered = server.respond(&command.request_id, command.response);
    Json(RespondResult { delivered })
}

pub async fn post_stop(State(server): State<Arc<WebServer>>) -> impl IntoResponse {
    match server.stop().await {
        Ok(stopped) => (StatusCode::OK, Json(StopResult { stopped })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Stop via control API failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn get_device_ip(State(server): State<Arc<WebServer>>) -> Json<DeviceIp> {
    Json(DeviceIp {
        ip: server.device_ip().to_string(),
    })
}
