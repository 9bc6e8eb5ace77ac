//! Outbound "request arrived" channel.
//!
//! Publishing never waits: the queue is unbounded, so a slow or absent
//! consumer only delays the exchanges it owes responses to, never the
//! acceptance of new connections.

use tokio::sync::mpsc;

use crate::bridge::exchange::RequestEvent;

/// Create a connected publisher/consumer pair.
pub fn channel() -> (EventPublisher, RequestEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventPublisher { tx }, RequestEvents { rx })
}

/// Sending half, held by the bridge handler.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: mpsc::UnboundedSender<RequestEvent>,
}

impl EventPublisher {
    /// Publish an event. Returns `false` when no consumer is attached.
    pub fn publish(&self, event: RequestEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn has_consumer(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Receiving half, handed to the external handler.
#[derive(Debug)]
pub struct RequestEvents {
    rx: mpsc::UnboundedReceiver<RequestEvent>,
}

impl RequestEvents {
    /// Next published request. `None` once every publisher is gone.
    pub async fn recv(&mut self) -> Option<RequestEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<RequestEvent> {
        self.rx.try_recv().ok()
    }
}
