//! Completion sink: the entry point external handlers use to deliver a
//! response for a request id.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

use crate::bridge::exchange::ResponseData;
use crate::bridge::id::RequestId;
use crate::bridge::store::CorrelationStore;
use crate::observability::metrics;

/// Cloneable handle that resolves pending exchanges of the running server.
///
/// The sink follows the server across restarts: each `start` attaches a
/// fresh store and `stop` detaches it, so a late delivery can never reach a
/// torn-down server.
#[derive(Debug, Clone)]
pub struct CompletionSink {
    store: Arc<ArcSwapOption<CorrelationStore>>,
}

impl CompletionSink {
    pub fn new() -> Self {
        Self {
            store: Arc::new(ArcSwapOption::empty()),
        }
    }

    pub(crate) fn attach(&self, store: Arc<CorrelationStore>) {
        self.store.store(Some(store));
    }

    pub(crate) fn detach(&self) -> Option<Arc<CorrelationStore>> {
        self.store.swap(None)
    }

    /// Deliver `response` for `request_id`.
    ///
    /// Never fails: unknown, expired and already-answered ids are logged and
    /// ignored. Returns whether a waiting exchange received the response.
    pub fn respond(&self, request_id: &RequestId, response: ResponseData) -> bool {
        let Some(store) = self.store.load_full() else {
            tracing::warn!(request_id = %request_id, "Server not running, response dropped");
            metrics::record_response("unknown");
            return false;
        };

        if store.resolve(request_id, response) {
            tracing::debug!(request_id = %request_id, "Response delivered");
            metrics::record_response("delivered");
            true
        } else {
            tracing::warn!(request_id = %request_id, "No pending request found");
            metrics::record_response("unknown");
            false
        }
    }

    /// Number of exchanges currently waiting for a response.
    pub fn pending(&self) -> usize {
        self.store.load_full().map_or(0, |store| store.len())
    }
}

impl Default for CompletionSink {
    fn default() -> Self {
        Self::new()
    }
}
