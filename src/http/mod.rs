//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (axum::serve)
//!     → server.rs (catch-all route, tracing)
//!     → request.rs (snapshot method, path, headers, params, body)
//!     → [bridge: publish and wait]
//!     → response.rs (status, headers, file/text body)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use response::MaterializeError;
pub use server::{AppState, HttpServer};
