//! TCP listener binding.
//!
//! # Responsibilities
//! - Advisory probe that a port is free before touching server state
//! - Authoritative bind, mapping failure to `PortUnavailable`
//!
//! The probe and the bind are separate syscalls, so another process can take
//! the port in between. Only the bind result is trusted.

use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;

use crate::error::BridgeError;

/// Check whether `port` can currently be bound on `host`.
///
/// Port 0 (ephemeral) is always reported free.
pub fn probe_port(host: IpAddr, port: u16) -> bool {
    if port == 0 {
        return true;
    }
    std::net::TcpListener::bind(SocketAddr::new(host, port)).is_ok()
}

/// Bind the server socket.
pub async fn bind(host: IpAddr, port: u16) -> Result<TcpListener, BridgeError> {
    if !probe_port(host, port) {
        tracing::warn!(host = %host, port, "Port probe failed");
        return Err(BridgeError::PortUnavailable {
            port,
            source: std::io::Error::new(
                std::io::ErrorKind::AddrInUse,
                format!("port {port} is already in use, choose another port"),
            ),
        });
    }

    let listener = TcpListener::bind(SocketAddr::new(host, port))
        .await
        .map_err(|source| BridgeError::PortUnavailable { port, source })?;

    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}
