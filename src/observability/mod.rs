//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! bridge / http / lifecycle produce:
//!     → logging.rs (structured log events, request_id on every exchange line)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```

pub mod logging;
pub mod metrics;
