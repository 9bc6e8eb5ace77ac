//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Start (server.rs):
//!     Probe port → Bind → Fresh correlation store → Spawn HTTP server → Attach sink
//!
//! Stop (server.rs, shutdown.rs):
//!     Trigger shutdown → Grace period → Detach sink → Drain store → Await task (hard cutoff)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → binary calls stop()
//! ```

pub mod server;
pub mod shutdown;
pub mod signals;

pub use server::{StartOutcome, WebServer};
pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
