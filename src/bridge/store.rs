//! Correlation store: request id → single-assignment completion slot.
//!
//! # Concurrency
//! Slots live in a [`DashMap`], which shards its locks by key hash, so
//! arrival (insert), delivery (resolve), timeout (discard) and shutdown
//! (drain) only contend when they touch the same shard. Every path that
//! completes or abandons a slot *removes* it first; whoever wins the removal
//! owns the sender, which is what makes resolution at-most-once per id.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::bridge::exchange::{Resolution, ResponseData};
use crate::bridge::id::RequestId;
use crate::observability::metrics;

/// Errors raised when registering a slot.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The id is already pending. Indicates an id generation bug.
    #[error("request id {0} is already pending")]
    Duplicate(RequestId),

    /// The store has been drained and accepts no new exchanges.
    #[error("correlation store is closed")]
    Closed,
}

/// Thread-safe map of pending exchanges.
#[derive(Debug, Default)]
pub struct CorrelationStore {
    slots: DashMap<RequestId, oneshot::Sender<Resolution>>,
    closed: AtomicBool,
}

impl CorrelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an empty slot for `id`.
    ///
    /// The returned [`PendingExchange`] removes its slot when dropped, so a
    /// handler that exits early (or whose client disconnects) never leaves a
    /// dangling entry behind.
    pub fn register(self: &Arc<Self>, id: RequestId) -> Result<PendingExchange, StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }

        let (tx, rx) = oneshot::channel();
        match self.slots.entry(id.clone()) {
            Entry::Occupied(_) => return Err(StoreError::Duplicate(id)),
            Entry::Vacant(slot) => {
                slot.insert(tx);
            }
        }

        // A drain that started after the first check may have missed this slot.
        if self.is_closed() {
            self.slots.remove(&id);
            return Err(StoreError::Closed);
        }

        metrics::record_pending(self.slots.len());
        Ok(PendingExchange {
            id,
            completion: rx,
            store: Arc::clone(self),
        })
    }

    /// Complete the slot for `id` with `response`.
    ///
    /// Returns `true` only if a waiter actually received the response. Unknown,
    /// already-resolved and timed-out ids return `false`.
    pub fn resolve(&self, id: &RequestId, response: ResponseData) -> bool {
        let Some((_, tx)) = self.slots.remove(id) else {
            return false;
        };
        metrics::record_pending(self.slots.len());
        tx.send(Resolution::Delivered(response)).is_ok()
    }

    /// Remove the slot for `id` without completing it.
    ///
    /// Returns `true` if this call removed the slot.
    pub fn discard(&self, id: &RequestId) -> bool {
        let removed = self.slots.remove(id).is_some();
        if removed {
            metrics::record_pending(self.slots.len());
        }
        removed
    }

    /// Close the store and wake every pending waiter with
    /// [`Resolution::Cancelled`]. Returns the number of waiters woken.
    pub fn drain_all(&self) -> usize {
        self.closed.store(true, Ordering::SeqCst);

        let ids: Vec<RequestId> = self.slots.iter().map(|entry| entry.key().clone()).collect();
        let mut woken = 0;
        for id in ids {
            if let Some((_, tx)) = self.slots.remove(&id) {
                if tx.send(Resolution::Cancelled).is_ok() {
                    woken += 1;
                }
            }
        }

        metrics::record_pending(self.slots.len());
        woken
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Result of waiting on a pending exchange.
#[derive(Debug, PartialEq, Eq)]
pub enum Wake {
    Resolved(Resolution),
    TimedOut,
    /// The sender was dropped without a resolution.
    Abandoned,
}

/// One registered, not yet resolved exchange.
#[derive(Debug)]
pub struct PendingExchange {
    id: RequestId,
    completion: oneshot::Receiver<Resolution>,
    store: Arc<CorrelationStore>,
}

impl PendingExchange {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Wait up to `window` for the slot to be resolved.
    pub async fn wait(&mut self, window: Duration) -> Wake {
        match tokio::time::timeout(window, &mut self.completion).await {
            Ok(Ok(resolution)) => Wake::Resolved(resolution),
            Ok(Err(_)) => Wake::Abandoned,
            Err(_) => {
                if self.store.discard(&self.id) {
                    return Wake::TimedOut;
                }
                // Lost the race: a resolver already removed the slot and is
                // about to send (or drop) its sender.
                match (&mut self.completion).await {
                    Ok(resolution) => Wake::Resolved(resolution),
                    Err(_) => Wake::Abandoned,
                }
            }
        }
    }
}

impl Drop for PendingExchange {
    fn drop(&mut self) {
        self.store.discard(&self.id);
    }
}
