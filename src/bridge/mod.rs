//! Request/response correlation bridge.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → handler.rs (register slot, publish event, wait with timeout)
//!     → events.rs  (unbounded queue to the external handler)
//!     ... external handler ...
//!     → sink.rs    (respond(request_id, response))
//!     → store.rs   (remove + complete the slot)
//!     → handler.rs wakes, response handed back to the HTTP layer
//! ```
//!
//! # Design Decisions
//! - One `oneshot` channel per exchange; the map only holds senders
//! - Removal from the map is the linearization point for resolution
//! - Timeout, delivery and drain are distinct outcomes internally even where
//!   they share an HTTP status

pub mod events;
pub mod exchange;
pub mod handler;
pub mod id;
pub mod sink;
pub mod store;

pub use events::{EventPublisher, RequestEvents};
pub use exchange::{Outcome, RequestData, RequestEvent, Resolution, ResponseData, DEFAULT_CONTENT_TYPE};
pub use handler::{BridgeHandler, Completed};
pub use id::RequestId;
pub use sink::CompletionSink;
pub use store::{CorrelationStore, PendingExchange, StoreError, Wake};
