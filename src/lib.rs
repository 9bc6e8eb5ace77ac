//! Embedded HTTP server with deferred, externally supplied responses.
//!
//! Every inbound request is published as a [`RequestEvent`](bridge::RequestEvent)
//! and parked until an external handler answers it through the
//! [`CompletionSink`](bridge::CompletionSink), the response window elapses, or
//! the server stops.

pub mod bridge;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use bridge::{CompletionSink, RequestEvent, RequestEvents, RequestId, ResponseData};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use lifecycle::{StartOutcome, WebServer};
