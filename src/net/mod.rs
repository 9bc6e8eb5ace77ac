//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! start(port)
//!     → listener.rs (advisory probe, authoritative bind)
//!     → Hand off to HTTP layer (axum::serve)
//!
//! getDeviceIP()
//!     → device_ip.rs (route-based discovery, ranked candidates)
//! ```

pub mod device_ip;
pub mod listener;

pub use device_ip::{device_ip, select_device_ip};
pub use listener::{bind, probe_port};
