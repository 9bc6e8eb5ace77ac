//! Per-request orchestration.
//!
//! # State Machine
//! ```text
//! Arrived → Registered → Published → Waiting ─┬─ delivered ──→ Resolved → Completed
//!                                             ├─ timeout ────→ 408
//!                                             └─ drained ────→ 503
//! ```
//!
//! The slot is owned by a [`PendingExchange`](crate::bridge::store::PendingExchange)
//! which removes it on drop, so every exit path (including the future being
//! dropped when the client disconnects) cleans up.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::bridge::events::EventPublisher;
use crate::bridge::exchange::{Outcome, RequestData, Resolution, ResponseData};
use crate::bridge::id::RequestId;
use crate::bridge::store::{CorrelationStore, StoreError, Wake};
use crate::observability::metrics;

/// Result of running one exchange through the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completed {
    pub request_id: RequestId,
    pub outcome: Outcome,
    pub response: ResponseData,
}

/// Bridges inbound requests to the external handler.
#[derive(Debug, Clone)]
pub struct BridgeHandler {
    store: Arc<CorrelationStore>,
    publisher: EventPublisher,
    response_timeout: Duration,
}

impl BridgeHandler {
    pub fn new(store: Arc<CorrelationStore>, publisher: EventPublisher, response_timeout: Duration) -> Self {
        Self {
            store,
            publisher,
            response_timeout,
        }
    }

    pub fn store(&self) -> &Arc<CorrelationStore> {
        &self.store
    }

    /// Publish `request` and wait for its response.
    ///
    /// Always produces a response; failures are mapped to synthetic ones.
    pub async fn exchange(&self, request: RequestData) -> Completed {
        let start = Instant::now();
        let request_id = RequestId::generate();

        let mut pending = match self.store.register(request_id.clone()) {
            Ok(pending) => pending,
            Err(StoreError::Closed) => {
                tracing::debug!(request_id = %request_id, "Server stopping, rejecting request");
                return finish(request_id, Outcome::Rejected, ResponseData::server_stopped(), start);
            }
            Err(e @ StoreError::Duplicate(_)) => {
                tracing::error!(request_id = %request_id, error = %e, "Request id collision");
                return finish(request_id, Outcome::Rejected, ResponseData::internal_error(), start);
            }
        };

        tracing::debug!(
            request_id = %request_id,
            method = %request.method,
            path = %request.path,
            "Publishing request"
        );

        if !self.publisher.publish(request.into_event(request_id.clone())) {
            tracing::warn!(request_id = %request_id, "No request handler attached");
            drop(pending);
            return finish(request_id, Outcome::Rejected, ResponseData::no_handler(), start);
        }

        let (outcome, response) = match pending.wait(self.response_timeout).await {
            Wake::Resolved(Resolution::Delivered(response)) => (Outcome::Delivered, response),
            Wake::Resolved(Resolution::Cancelled) => (Outcome::Cancelled, ResponseData::server_stopped()),
            Wake::TimedOut => {
                tracing::warn!(
                    request_id = %request_id,
                    timeout_secs = self.response_timeout.as_secs_f64(),
                    "No response within window"
                );
                (Outcome::TimedOut, ResponseData::timeout())
            }
            Wake::Abandoned => (Outcome::Abandoned, ResponseData::server_stopped()),
        };
        drop(pending);

        finish(request_id, outcome, response, start)
    }
}

fn finish(request_id: RequestId, outcome: Outcome, response: ResponseData, start: Instant) -> Completed {
    metrics::record_exchange(outcome.as_str(), start);
    tracing::debug!(
        request_id = %request_id,
        outcome = %outcome,
        status = response.status_code,
        "Exchange resolved"
    );
    Completed {
        request_id,
        outcome,
        response,
    }
}
