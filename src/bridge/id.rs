//! Correlation id generation.
//!
//! # Format
//! ```text
//! <unix millis, hex>-<process sequence, hex>-<random u32, hex>
//! ```
//!
//! The millisecond component keeps ids readable in logs, the sequence makes
//! ids unique within one process, and the random part keeps ids from two
//! processes (or a restarted process) apart.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Process-wide sequence. Relaxed ordering is enough, only uniqueness matters.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Opaque token linking an inbound request to its eventual response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh id. No I/O, safe to call from any thread.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let random = fastrand::u32(..);
        Self(format!("{millis:x}-{seq:x}-{random:08x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
