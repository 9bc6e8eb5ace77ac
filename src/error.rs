//! Lifecycle-facing error type.
//!
//! Only `start`/`stop` surface errors to callers. Faults local to a single
//! exchange are turned into that exchange's HTTP response instead.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The requested port could not be bound. The server stays stopped.
    #[error("port {port} is unavailable: {source}")]
    PortUnavailable {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
